// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network API
//!
//! Networks are global resources with synchronous backend calls.  Deletion
//! is the interesting path: dependent APIs subscribe to this API's callback
//! bus, and a `CheckDelete` veto (e.g. "still in use by an instance") must
//! abort the deletion before any state is touched.

use crate::app::base::CallbackBus;
use crate::app::base::Reason;
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
use slog::info;
use slog::Logger;
use std::sync::Arc;
use uuid::Uuid;

pub struct NetworkApi {
    log: Logger,
    datastore: Arc<DataStore>,
    network: Arc<dyn NetworkBackend>,
    /// Lifecycle events other APIs subscribe to during bridge wiring
    pub callbacks: CallbackBus<model::Network>,
}

impl NetworkApi {
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        network: Arc<dyn NetworkBackend>,
    ) -> NetworkApi {
        NetworkApi { log, datastore, network, callbacks: CallbackBus::new() }
    }
}

fn check_global(scope: &Scope) -> Result<(), Error> {
    match scope {
        Scope::Global => Ok(()),
        _ => Err(Error::invalid_request("networks are global resources")),
    }
}

#[async_trait]
impl ResourceApi for NetworkApi {
    type Item = model::Network;
    type CreateParams = params::NetworkCreate;

    fn resource_type(&self) -> ResourceType {
        ResourceType::Network
    }

    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<model::Network> {
        check_global(scope)?;
        self.datastore
            .item_get_by_name::<model::Network>(&opctx.project, name)?
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Network, name)
            })
    }

    async fn get_items(
        &self,
        opctx: &OpContext,
        scope: &Scope,
    ) -> ListResultVec<model::Network> {
        if !scope.is_aggregated() {
            check_global(scope)?;
        }
        self.datastore.items_list::<model::Network>(&opctx.project)
    }

    async fn add_item(
        &self,
        opctx: &OpContext,
        create_params: params::NetworkCreate,
        scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        check_global(scope)?;
        if create_params.name.is_empty() {
            return Err(Error::InvalidValue {
                label: String::from("name"),
                message: String::from("name may not be empty"),
            });
        }
        if self
            .datastore
            .item_get_by_name::<model::Network>(
                &opctx.project,
                &create_params.name,
            )?
            .is_some()
        {
            return Err(Error::ObjectAlreadyExists {
                type_name: ResourceType::Network,
                object_name: create_params.name,
            });
        }

        let backend_network = self
            .network
            .network_create(
                &create_params.name,
                create_params.ipv4_range.as_deref(),
                create_params.gateway_ipv4.as_deref(),
            )
            .await?;
        let record = self.datastore.item_create(
            &opctx.project,
            &model::Network {
                id: Uuid::new_v4(),
                name: create_params.name,
                description: create_params.description,
                ipv4_range: create_params.ipv4_range,
                gateway_ipv4: create_params.gateway_ipv4,
                backend_id: backend_network.id,
                creation_time: Utc::now(),
            },
        )?;
        info!(self.log, "created network"; "network" => &record.name);

        self.callbacks.process(opctx, Reason::PostAdd, &record).await?;

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Insert,
                scope: scope.clone(),
                target_type: ResourceType::Network,
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
        check_global(scope)?;
        let record = self
            .datastore
            .item_get_by_name::<model::Network>(&opctx.project, name)?
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Network, name)
            })?;

        // Dependents get their say before anything is torn down: a veto
        // here must leave the network fully intact.
        self.callbacks.process(opctx, Reason::CheckDelete, &record).await?;
        self.callbacks.process(opctx, Reason::PreDelete, &record).await?;

        self.network.network_delete(&record.backend_id).await?;
        self.datastore
            .item_delete::<model::Network>(&opctx.project, &record.record_id())?;
        info!(self.log, "deleted network"; "network" => &record.name);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Delete,
                scope: scope.clone(),
                target_type: ResourceType::Network,
                target_name: record.name.clone(),
            },
        )?;
        pending.bind_item(&record.record_id());
        Ok(pending)
    }
}
