// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instance API
//!
//! Instances are derived from the backend's servers rather than stored;
//! the bridge decorates them with its own attachment and access-config
//! records.  Creating or deleting servers through the bridge is not
//! supported; the mutations here are the instance actions (`reset`,
//! access configs) and, via [`crate::app::attached_disk`], disk
//! attachment.

use crate::app::address::AddressApi;
use crate::app::base::ResourceApi;
use crate::app::operation::OperationParams;
use crate::app::operation::PendingOperation;
use crate::backend::ComputeBackend;
use crate::backend::NetworkBackend;
use crate::backend::ServerInfo;
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

const ACCESS_CONFIG_TYPE: &str = "ONE_TO_ONE_NAT";
const DEFAULT_ACCESS_CONFIG_NAME: &str = "External NAT";

/// An instance as the external API sees it: the backend server plus the
/// bridge's own records about it
#[derive(Clone)]
pub struct InstanceData {
    pub server: ServerInfo,
    pub attached_disks: Vec<model::AttachedDisk>,
    pub access_configs: Vec<model::AccessConfig>,
}

pub struct InstanceApi {
    log: Logger,
    datastore: Arc<DataStore>,
    compute: Arc<dyn ComputeBackend>,
    network: Arc<dyn NetworkBackend>,
    addresses: Arc<AddressApi>,
}

impl InstanceApi {
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        compute: Arc<dyn ComputeBackend>,
        network: Arc<dyn NetworkBackend>,
        addresses: Arc<AddressApi>,
    ) -> InstanceApi {
        InstanceApi { log, datastore, compute, network, addresses }
    }

    fn decorate(
        &self,
        opctx: &OpContext,
        server: ServerInfo,
    ) -> LookupResult<InstanceData> {
        let attached_disks = self
            .datastore
            .items_list::<model::AttachedDisk>(&opctx.project)?
            .into_iter()
            .filter(|disk| {
                disk.instance_name == server.name && disk.zone == server.zone
            })
            .collect();
        let access_configs = self
            .datastore
            .items_list::<model::AccessConfig>(&opctx.project)?
            .into_iter()
            .filter(|config| {
                config.instance_name == server.name
                    && config.zone == server.zone
            })
            .collect();
        Ok(InstanceData { server, attached_disks, access_configs })
    }

    async fn lookup_server(
        &self,
        scope: &Scope,
        name: &str,
    ) -> LookupResult<ServerInfo> {
        let zone = match scope {
            Scope::Zone(zone) => zone,
            _ => {
                return Err(Error::invalid_request(
                    "instances are zonal resources",
                ));
            }
        };
        self.compute
            .server_get_by_name(name)
            .await?
            .filter(|server| &server.zone == zone)
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Instance, name)
            })
    }

    /// Reboots an instance.  The backend call is synchronous, so the
    /// operation commits DONE.
    pub async fn reset(
        &self,
        opctx: &OpContext,
        scope: &Scope,
        name: &str,
    ) -> CreateResult<PendingOperation> {
        let server = self.lookup_server(scope, name).await?;
        self.compute.reboot_server(&server.id).await?;
        info!(self.log, "reset instance"; "instance" => name);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::Reset,
                scope: scope.clone(),
                target_type: ResourceType::Instance,
                target_name: String::from(name),
            },
        )?;
        pending.bind_item(&server.id);
        Ok(pending)
    }

    /// Adds an external NAT binding to one of the instance's interfaces.
    /// With a `natIP` the caller designates a reserved address; without
    /// one an ephemeral floating IP is allocated.
    pub async fn add_access_config(
        &self,
        opctx: &OpContext,
        scope: &Scope,
        instance_name: &str,
        network_interface: &str,
        create_params: params::AccessConfigCreate,
    ) -> CreateResult<PendingOperation> {
        let server = self.lookup_server(scope, instance_name).await?;

        let kind = create_params
            .kind
            .as_deref()
            .unwrap_or(ACCESS_CONFIG_TYPE);
        if kind != ACCESS_CONFIG_TYPE {
            return Err(Error::invalid_request(&format!(
                "access config type \"{}\" is not supported",
                kind
            )));
        }
        if !server.networks.iter().any(|n| n == network_interface) {
            return Err(Error::invalid_request(&format!(
                "instance \"{}\" has no interface \"{}\"",
                instance_name, network_interface
            )));
        }

        let existing = self
            .datastore
            .items_list::<model::AccessConfig>(&opctx.project)?
            .into_iter()
            .any(|config| {
                config.instance_name == instance_name
                    && config.network_interface == network_interface
            });
        if existing {
            return Err(Error::invalid_request(&format!(
                "instance \"{}\" already has an access config on interface \
                 \"{}\"",
                instance_name, network_interface
            )));
        }

        // A designated NAT IP must be a reserved address that nobody else
        // is using; otherwise allocate an ephemeral floating IP.
        let (fip_id, nat_ip, address_id) = match &create_params.nat_ip {
            Some(nat_ip) => {
                let address = self
                    .addresses
                    .find_by_ip(opctx, nat_ip)?
                    .ok_or_else(|| {
                        Error::not_found_by_name(ResourceType::Address, nat_ip)
                    })?;
                if let Some(user) = &address.instance_name {
                    return Err(Error::invalid_request(&format!(
                        "address \"{}\" is in use by instance \"{}\"",
                        address.name, user
                    )));
                }
                (address.backend_id.clone(), nat_ip.clone(), Some(address.id))
            }
            None => {
                let fip = self.network.floating_ip_allocate().await?;
                (fip.id, fip.ip, None)
            }
        };

        self.network.floating_ip_associate(&fip_id, &server.id).await?;
        if let Some(address_id) = &address_id {
            self.addresses.set_instance(
                opctx,
                address_id,
                Some(String::from(instance_name)),
            )?;
        }

        let record = self.datastore.item_create(
            &opctx.project,
            &model::AccessConfig {
                id: Uuid::new_v4(),
                name: create_params
                    .name
                    .unwrap_or_else(|| String::from(DEFAULT_ACCESS_CONFIG_NAME)),
                zone: server.zone.clone(),
                instance_name: String::from(instance_name),
                network_interface: String::from(network_interface),
                nat_ip,
                fip_id,
                address_id,
                creation_time: Utc::now(),
            },
        )?;
        info!(self.log, "added access config";
            "instance" => instance_name, "interface" => network_interface);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::AddAccessConfig,
                scope: scope.clone(),
                target_type: ResourceType::Instance,
                target_name: String::from(instance_name),
            },
        )?;
        pending.bind_item(&record.record_id());
        pending.bind_item_name(&record.name);
        Ok(pending)
    }

    pub async fn delete_access_config(
        &self,
        opctx: &OpContext,
        scope: &Scope,
        instance_name: &str,
        network_interface: &str,
        access_config: &str,
    ) -> CreateResult<PendingOperation> {
        self.lookup_server(scope, instance_name).await?;

        let record = self
            .datastore
            .items_list::<model::AccessConfig>(&opctx.project)?
            .into_iter()
            .find(|config| {
                config.instance_name == instance_name
                    && config.network_interface == network_interface
                    && config.name == access_config
            })
            .ok_or_else(|| {
                Error::not_found_by_name(
                    ResourceType::AccessConfig,
                    access_config,
                )
            })?;

        self.network.floating_ip_disassociate(&record.fip_id).await?;
        match &record.address_id {
            // A reserved address goes back to the pool; an ephemeral
            // floating IP is released outright.
            Some(address_id) => {
                self.addresses.set_instance(opctx, address_id, None)?;
            }
            None => {
                self.network.floating_ip_release(&record.fip_id).await?;
            }
        }
        self.datastore.item_delete::<model::AccessConfig>(
            &opctx.project,
            &record.record_id(),
        )?;
        info!(self.log, "deleted access config";
            "instance" => instance_name, "interface" => network_interface);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::DeleteAccessConfig,
                scope: scope.clone(),
                target_type: ResourceType::Instance,
                target_name: String::from(instance_name),
            },
        )?;
        pending.bind_item(&record.record_id());
        pending.bind_item_name(&record.name);
        Ok(pending)
    }

    /// `CheckDelete` handler registered on the network API's bus: a
    /// network with servers still plugged into it cannot be deleted.
    pub async fn ensure_network_unused(
        &self,
        network_name: &str,
    ) -> Result<(), Error> {
        for server in self.compute.servers_list().await? {
            if server.networks.iter().any(|n| n == network_name) {
                return Err(Error::invalid_request(&format!(
                    "network \"{}\" is in use by instance \"{}\"",
                    network_name, server.name
                )));
            }
        }
        Ok(())
    }

    /// `PostAdd` handler registered on the firewall API's bus: apply a
    /// newly created security group to every running server on the
    /// firewall's network.
    pub async fn apply_firewall(
        &self,
        firewall: &model::Firewall,
    ) -> Result<(), Error> {
        for server in self.compute.servers_list().await? {
            if server.networks.iter().any(|n| n == &firewall.network_name) {
                self.compute
                    .add_security_group(&server.id, &firewall.name)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceApi for InstanceApi {
    type Item = InstanceData;
    type CreateParams = ();

    fn resource_type(&self) -> ResourceType {
        ResourceType::Instance
    }

    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<InstanceData> {
        let server = self.lookup_server(scope, name).await?;
        self.decorate(opctx, server)
    }

    async fn get_items(
        &self,
        opctx: &OpContext,
        scope: &Scope,
    ) -> ListResultVec<InstanceData> {
        let servers = self.compute.servers_list().await?;
        let selected = match scope {
            Scope::Aggregated => servers,
            Scope::Zone(zone) => servers
                .into_iter()
                .filter(|server| &server.zone == zone)
                .collect(),
            _ => {
                return Err(Error::invalid_request(
                    "instances are zonal resources",
                ));
            }
        };
        selected
            .into_iter()
            .map(|server| self.decorate(opctx, server))
            .collect()
    }

    async fn add_item(
        &self,
        _opctx: &OpContext,
        _create_params: (),
        _scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        Err(Error::invalid_request(
            "instance creation is not supported by this bridge",
        ))
    }

    async fn delete_item(
        &self,
        _opctx: &OpContext,
        _name: &str,
        _scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        Err(Error::invalid_request(
            "instance deletion is not supported by this bridge",
        ))
    }

    async fn get_scopes(
        &self,
        _opctx: &OpContext,
        item: &InstanceData,
    ) -> ListResultVec<Scope> {
        Ok(vec![Scope::Zone(item.server.zone.clone())])
    }
}
