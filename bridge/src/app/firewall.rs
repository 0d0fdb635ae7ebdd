// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firewall API, backed by security groups
//!
//! Firewalls are global resources tied to a network.  Creation emits
//! `PostAdd` on this API's bus so the instance API can apply the new group
//! to running servers; the network API's `PreDelete` event cascades into
//! [`FirewallApi::delete_by_network`].

use crate::app::base::CallbackBus;
use crate::app::base::Reason;
use crate::app::base::ResourceApi;
use crate::app::operation::OperationParams;
use crate::app::operation::PendingOperation;
use crate::backend::NetworkBackend;
use crate::backend::SecurityGroupRule;
use crate::context::OpContext;
use crate::db::model;
use crate::db::model::Record;
use crate::db::DataStore;
use crate::external_api::params;
use async_trait::async_trait;
use chrono::Utc;
use gce_bridge_common::api::scope::parse_resource_url;
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

const DEFAULT_NETWORK: &str = "default";

pub struct FirewallApi {
    log: Logger,
    datastore: Arc<DataStore>,
    network: Arc<dyn NetworkBackend>,
    /// Lifecycle events other APIs subscribe to during bridge wiring
    pub callbacks: CallbackBus<model::Firewall>,
}

impl FirewallApi {
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        network: Arc<dyn NetworkBackend>,
    ) -> FirewallApi {
        FirewallApi { log, datastore, network, callbacks: CallbackBus::new() }
    }

    /// Removes every firewall attached to the named network, along with
    /// its backing security group.  Used by the network API's `PreDelete`
    /// cascade; this is internal cleanup, so no operation records are
    /// created for the individual removals.
    pub async fn delete_by_network(
        &self,
        opctx: &OpContext,
        network_name: &str,
    ) -> Result<(), Error> {
        let firewalls = self
            .datastore
            .items_list::<model::Firewall>(&opctx.project)?
            .into_iter()
            .filter(|firewall| firewall.network_name == network_name);
        for firewall in firewalls {
            self.network.security_group_delete(&firewall.backend_id).await?;
            self.datastore.item_delete::<model::Firewall>(
                &opctx.project,
                &firewall.record_id(),
            )?;
            info!(self.log, "cascaded firewall removal";
                "firewall" => &firewall.name, "network" => network_name);
        }
        Ok(())
    }
}

fn check_global(scope: &Scope) -> Result<(), Error> {
    match scope {
        Scope::Global => Ok(()),
        _ => Err(Error::invalid_request("firewalls are global resources")),
    }
}

/// Resolves the `network` field of a firewall body, which may be a
/// resource URL or a bare network name.
fn network_name_of(create_params: &params::FirewallCreate) -> Result<String, Error> {
    let network = match &create_params.network {
        None => return Ok(String::from(DEFAULT_NETWORK)),
        Some(network) => network,
    };
    if !network.contains('/') {
        return Ok(network.clone());
    }
    let (scope, collection, name) = parse_resource_url(network)?;
    if scope != Scope::Global || collection != "networks" {
        return Err(Error::invalid_request(&format!(
            "\"{}\" is not a network url",
            network
        )));
    }
    Ok(name)
}

#[async_trait]
impl ResourceApi for FirewallApi {
    type Item = model::Firewall;
    type CreateParams = params::FirewallCreate;

    fn resource_type(&self) -> ResourceType {
        ResourceType::Firewall
    }

    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<model::Firewall> {
        check_global(scope)?;
        self.datastore
            .item_get_by_name::<model::Firewall>(&opctx.project, name)?
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Firewall, name)
            })
    }

    async fn get_items(
        &self,
        opctx: &OpContext,
        scope: &Scope,
    ) -> ListResultVec<model::Firewall> {
        if !scope.is_aggregated() {
            check_global(scope)?;
        }
        self.datastore.items_list::<model::Firewall>(&opctx.project)
    }

    async fn add_item(
        &self,
        opctx: &OpContext,
        create_params: params::FirewallCreate,
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
            .item_get_by_name::<model::Firewall>(
                &opctx.project,
                &create_params.name,
            )?
            .is_some()
        {
            return Err(Error::ObjectAlreadyExists {
                type_name: ResourceType::Firewall,
                object_name: create_params.name,
            });
        }

        let mut allowed = Vec::new();
        for rule in &create_params.allowed {
            match rule.ip_protocol.as_str() {
                "tcp" | "udp" | "icmp" => (),
                other => {
                    return Err(Error::invalid_request(&format!(
                        "unsupported protocol \"{}\" in firewall rule",
                        other
                    )));
                }
            }
            allowed.push(model::FirewallRule {
                protocol: rule.ip_protocol.clone(),
                ports: rule.ports.clone().unwrap_or_default(),
            });
        }

        // The referenced network must exist; a dangling reference is a 404,
        // not a validation error.
        let network_name = network_name_of(&create_params)?;
        if self
            .datastore
            .item_get_by_name::<model::Network>(&opctx.project, &network_name)?
            .is_none()
        {
            return Err(Error::not_found_by_name(
                ResourceType::Network,
                &network_name,
            ));
        }

        let source_ranges = create_params
            .source_ranges
            .unwrap_or_else(|| vec![String::from("0.0.0.0/0")]);
        let sg_rules = allowed
            .iter()
            .map(|rule| SecurityGroupRule {
                protocol: rule.protocol.clone(),
                ports: rule.ports.clone(),
                source_ranges: source_ranges.clone(),
            })
            .collect::<Vec<SecurityGroupRule>>();
        let backend_id = self
            .network
            .security_group_create(&create_params.name, &sg_rules)
            .await?;

        let record = self.datastore.item_create(
            &opctx.project,
            &model::Firewall {
                id: Uuid::new_v4(),
                name: create_params.name,
                description: create_params.description,
                network_name,
                allowed,
                source_ranges,
                backend_id,
                creation_time: Utc::now(),
            },
        )?;
        info!(self.log, "created firewall";
            "firewall" => &record.name, "network" => &record.network_name);

        self.callbacks.process(opctx, Reason::PostAdd, &record).await?;

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Insert,
                scope: scope.clone(),
                target_type: ResourceType::Firewall,
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
            .item_get_by_name::<model::Firewall>(&opctx.project, name)?
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Firewall, name)
            })?;

        self.callbacks.process(opctx, Reason::CheckDelete, &record).await?;
        self.callbacks.process(opctx, Reason::PreDelete, &record).await?;

        self.network.security_group_delete(&record.backend_id).await?;
        self.datastore.item_delete::<model::Firewall>(
            &opctx.project,
            &record.record_id(),
        )?;
        info!(self.log, "deleted firewall"; "firewall" => &record.name);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Delete,
                scope: scope.clone(),
                target_type: ResourceType::Firewall,
                target_name: record.name.clone(),
            },
        )?;
        pending.bind_item(&record.record_id());
        Ok(pending)
    }
}
