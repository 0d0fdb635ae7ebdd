// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address API: reserved external IPs, backed by floating IPs
//!
//! Addresses are regional resources.  Allocation and release are
//! synchronous on the backend, so both mutations commit DONE.

use crate::app::base::ResourceApi;
use crate::app::operation::OperationParams;
use crate::app::operation::PendingOperation;
use crate::backend::NetworkBackend;
use crate::context::OpContext;
use crate::db::model;
use crate::db::model::Record;
use crate::db::DataStore;
use crate::external_api::params;
use async_trait::async_trait;
use chrono::Utc;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use gce_bridge_common::api::OperationType;
use gce_bridge_common::api::ResourceType;
use gce_bridge_common::api::UpdateResult;
use slog::info;
use slog::Logger;
use std::sync::Arc;
use uuid::Uuid;

pub struct AddressApi {
    log: Logger,
    datastore: Arc<DataStore>,
    network: Arc<dyn NetworkBackend>,
}

impl AddressApi {
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        network: Arc<dyn NetworkBackend>,
    ) -> AddressApi {
        AddressApi { log, datastore, network }
    }

    /// Address names are unique per region, not per project, so lookup
    /// filters a listing rather than going through the store's by-name
    /// path.
    fn find(
        &self,
        opctx: &OpContext,
        name: &str,
        region: &str,
    ) -> LookupResult<Option<model::Address>> {
        let mut matches = self
            .datastore
            .items_list::<model::Address>(&opctx.project)?
            .into_iter()
            .filter(|address| {
                address.name == name && address.region == region
            })
            .collect::<Vec<model::Address>>();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches.remove(0))),
            n => Err(Error::internal_error(&format!(
                "found {} addresses named \"{}\" in region \"{}\"",
                n, name, region
            ))),
        }
    }

    pub fn find_by_ip(
        &self,
        opctx: &OpContext,
        ip: &str,
    ) -> LookupResult<Option<model::Address>> {
        Ok(self
            .datastore
            .items_list::<model::Address>(&opctx.project)?
            .into_iter()
            .find(|address| address.address == ip))
    }

    /// Records which instance an address is serving, or frees it.
    pub fn set_instance(
        &self,
        opctx: &OpContext,
        id: &Uuid,
        instance_name: Option<String>,
    ) -> UpdateResult<model::Address> {
        self.datastore.item_update::<model::Address, _>(
            &opctx.project,
            &id.to_string(),
            |address| {
                address.instance_name = instance_name;
                Ok(())
            },
        )
    }
}

fn region_of<'a>(scope: &'a Scope) -> Result<&'a str, Error> {
    match scope {
        Scope::Region(region) => Ok(region),
        _ => Err(Error::invalid_request("addresses are regional resources")),
    }
}

#[async_trait]
impl ResourceApi for AddressApi {
    type Item = model::Address;
    type CreateParams = params::AddressCreate;

    fn resource_type(&self) -> ResourceType {
        ResourceType::Address
    }

    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<model::Address> {
        let region = region_of(scope)?;
        self.find(opctx, name, region)?.ok_or_else(|| {
            Error::not_found_by_name(ResourceType::Address, name)
        })
    }

    async fn get_items(
        &self,
        opctx: &OpContext,
        scope: &Scope,
    ) -> ListResultVec<model::Address> {
        let addresses =
            self.datastore.items_list::<model::Address>(&opctx.project)?;
        if scope.is_aggregated() {
            return Ok(addresses);
        }
        let region = region_of(scope)?;
        Ok(addresses
            .into_iter()
            .filter(|address| address.region == region)
            .collect())
    }

    async fn add_item(
        &self,
        opctx: &OpContext,
        create_params: params::AddressCreate,
        scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        let region = region_of(scope)?;
        if create_params.name.is_empty() {
            return Err(Error::InvalidValue {
                label: String::from("name"),
                message: String::from("name may not be empty"),
            });
        }
        if self.find(opctx, &create_params.name, region)?.is_some() {
            return Err(Error::ObjectAlreadyExists {
                type_name: ResourceType::Address,
                object_name: create_params.name,
            });
        }

        let fip = self.network.floating_ip_allocate().await?;
        let record = self.datastore.item_create(
            &opctx.project,
            &model::Address {
                id: Uuid::new_v4(),
                name: create_params.name,
                description: create_params.description,
                region: String::from(region),
                address: fip.ip,
                backend_id: fip.id,
                instance_name: None,
                creation_time: Utc::now(),
            },
        )?;
        info!(self.log, "reserved address";
            "address" => &record.name, "ip" => &record.address);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Insert,
                scope: scope.clone(),
                target_type: ResourceType::Address,
                target_name: record.name.clone(),
            },
        )?;
        pending.bind_item(&record.record_id());
        Ok(pending)
    }

    async fn delete_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        let region = region_of(scope)?;
        let record = self.find(opctx, name, region)?.ok_or_else(|| {
            Error::not_found_by_name(ResourceType::Address, name)
        })?;
        if let Some(instance_name) = &record.instance_name {
            return Err(Error::invalid_request(&format!(
                "address \"{}\" is in use by instance \"{}\"",
                record.name, instance_name
            )));
        }

        self.network.floating_ip_release(&record.backend_id).await?;
        self.datastore
            .item_delete::<model::Address>(&opctx.project, &record.record_id())?;
        info!(self.log, "released address"; "address" => &record.name);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Delete,
                scope: scope.clone(),
                target_type: ResourceType::Address,
                target_name: record.name.clone(),
            },
        )?;
        pending.bind_item(&record.record_id());
        Ok(pending)
    }

    async fn get_scopes(
        &self,
        _opctx: &OpContext,
        item: &model::Address,
    ) -> ListResultVec<Scope> {
        Ok(vec![item.scope()])
    }
}
