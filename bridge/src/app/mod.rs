// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge's application layer
//!
//! [`Bridge`] owns one instance of every resource API, the datastore, and
//! the operation manager, and wires them together at construction: the
//! asynchronous APIs register their progress functions in the operation
//! registry, and the cross-resource callbacks are hooked up explicitly.
//! Everything downstream receives references from here; there is no global
//! singleton state.

pub mod address;
pub mod attached_disk;
pub mod base;
pub mod firewall;
pub mod instance;
pub mod network;
pub mod operation;
pub mod project;
pub mod region;
pub mod registry;
pub mod zone;

use crate::backend::Backends;
use crate::config::BridgeConfig;
use crate::context::OpContext;
use crate::db::DataStore;
use address::AddressApi;
use attached_disk::AttachedDiskApi;
use base::Reason;
use firewall::FirewallApi;
use futures::FutureExt;
use instance::InstanceApi;
use network::NetworkApi;
use operation::OperationManager;
use project::ProjectApi;
use region::RegionApi;
use registry::OperationRegistry;
use slog::o;
use slog::Logger;
use std::sync::Arc;
use zone::ZoneApi;

pub struct Bridge {
    pub log: Logger,
    pub datastore: Arc<DataStore>,
    pub operations: Arc<OperationManager>,
    pub projects: Arc<ProjectApi>,
    pub zones: Arc<ZoneApi>,
    pub regions: Arc<RegionApi>,
    pub addresses: Arc<AddressApi>,
    pub networks: Arc<NetworkApi>,
    pub firewalls: Arc<FirewallApi>,
    pub instances: Arc<InstanceApi>,
    pub attached_disks: Arc<AttachedDiskApi>,
}

impl Bridge {
    /// Constructs and wires the whole application layer.  Runs exactly
    /// once, at process start; registration conflicts abort startup.
    pub fn new(
        log: Logger,
        config: &BridgeConfig,
        backends: Backends,
    ) -> Arc<Bridge> {
        let datastore = Arc::new(DataStore::new());

        // The registry is populated while the APIs are constructed and
        // frozen when the operation manager takes ownership of it below.
        let mut registry = OperationRegistry::new();
        let attached_disks = AttachedDiskApi::new(
            log.new(o!("component" => "attached_disk_api")),
            Arc::clone(&datastore),
            Arc::clone(&backends.compute),
            Arc::clone(&backends.volume),
            &mut registry,
        );
        let operations = Arc::new(OperationManager::new(
            log.new(o!("component" => "operation_api")),
            Arc::clone(&datastore),
            registry,
        ));

        let projects = Arc::new(ProjectApi::new());
        let zones = Arc::new(ZoneApi::new(
            Arc::clone(&backends.compute),
            config.region.clone(),
        ));
        let regions = Arc::new(RegionApi::new(
            Arc::clone(&backends.compute),
            config.region.clone(),
        ));
        let addresses = Arc::new(AddressApi::new(
            log.new(o!("component" => "address_api")),
            Arc::clone(&datastore),
            Arc::clone(&backends.network),
        ));
        let networks = Arc::new(NetworkApi::new(
            log.new(o!("component" => "network_api")),
            Arc::clone(&datastore),
            Arc::clone(&backends.network),
        ));
        let firewalls = Arc::new(FirewallApi::new(
            log.new(o!("component" => "firewall_api")),
            Arc::clone(&datastore),
            Arc::clone(&backends.network),
        ));
        let instances = Arc::new(InstanceApi::new(
            log.new(o!("component" => "instance_api")),
            Arc::clone(&datastore),
            Arc::clone(&backends.compute),
            Arc::clone(&backends.network),
            Arc::clone(&addresses),
        ));

        // Cross-resource callbacks.  Deleting a network is vetoed while an
        // instance still uses it, and cascades into firewall removal
        // otherwise; creating a firewall applies its security group to the
        // running instances on its network.
        {
            let instances = Arc::clone(&instances);
            networks.callbacks.register(
                Reason::CheckDelete,
                Arc::new(move |_opctx: OpContext, network| {
                    let instances = Arc::clone(&instances);
                    async move {
                        instances.ensure_network_unused(&network.name).await
                    }
                    .boxed()
                }),
            );
        }
        {
            let firewalls = Arc::clone(&firewalls);
            networks.callbacks.register(
                Reason::PreDelete,
                Arc::new(move |opctx: OpContext, network| {
                    let firewalls = Arc::clone(&firewalls);
                    async move {
                        firewalls
                            .delete_by_network(&opctx, &network.name)
                            .await
                    }
                    .boxed()
                }),
            );
        }
        {
            let instances = Arc::clone(&instances);
            firewalls.callbacks.register(
                Reason::PostAdd,
                Arc::new(move |_opctx: OpContext, firewall| {
                    let instances = Arc::clone(&instances);
                    async move { instances.apply_firewall(&firewall).await }
                        .boxed()
                }),
            );
        }

        Arc::new(Bridge {
            log,
            datastore,
            operations,
            projects,
            zones,
            regions,
            addresses,
            networks,
            firewalls,
            instances,
            attached_disks,
        })
    }
}
