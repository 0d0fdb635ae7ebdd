// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Views are the response envelopes of the external API
//!
//! Field names reproduce the GCE wire format exactly; external GCE clients
//! key on them.  Each view is built from an internal record plus a
//! [`LinkContext`] carrying what's needed to render `selfLink` and
//! `targetLink`.

use crate::app::instance::InstanceData;
use crate::app::project::ProjectInfo;
use crate::app::region::RegionInfo;
use crate::app::zone::ZoneInfo;
use crate::db::model;
use chrono::DateTime;
use chrono::Utc;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::OperationStatus;
use gce_bridge_common::api::OperationType;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// What view construction needs to know about the enclosing request
pub struct LinkContext {
    pub base_url: String,
    pub project: String,
}

impl LinkContext {
    /// `<base>/compute/v1/projects/<project>`
    fn project_base(&self) -> String {
        format!("{}/compute/v1/projects/{}", self.base_url, self.project)
    }

    fn resource_link(
        &self,
        scope: &Scope,
        collection: &str,
        name: &str,
    ) -> String {
        format!("{}/{}/{}/{}", self.project_base(), scope.path(), collection, name)
    }

    fn scope_link(&self, scope: &Scope) -> String {
        format!("{}/{}", self.project_base(), scope.path())
    }
}

/*
 * List envelopes
 */

#[derive(Deserialize, JsonSchema, Serialize)]
pub struct ResourceList<T> {
    pub kind: String,
    pub items: Vec<T>,
}

impl<T> ResourceList<T> {
    pub fn new(kind: &str, items: Vec<T>) -> ResourceList<T> {
        ResourceList { kind: String::from(kind), items }
    }
}

/// Aggregated lists group items by scope path; the inner map holds the
/// resource collection under its GCE name (e.g. `"addresses"`).
#[derive(Deserialize, JsonSchema, Serialize)]
pub struct AggregatedList<T> {
    pub kind: String,
    pub items: BTreeMap<String, BTreeMap<String, Vec<T>>>,
}

impl<T> AggregatedList<T> {
    pub fn new(
        kind: &str,
        collection: &str,
        grouped: BTreeMap<String, Vec<T>>,
    ) -> AggregatedList<T> {
        let items = grouped
            .into_iter()
            .map(|(scope_path, items)| {
                (scope_path, BTreeMap::from([(String::from(collection), items)]))
            })
            .collect();
        AggregatedList { kind: String::from(kind), items }
    }
}

/*
 * Operations
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub kind: String,
    pub id: String,
    pub name: String,
    pub operation_type: OperationType,
    pub status: OperationStatus,
    pub user: String,
    pub progress: i64,
    pub insert_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub target_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Operation {
    pub fn new(operation: &model::Operation, ctx: &LinkContext) -> Operation {
        let scope = &operation.scope;
        let (zone, region) = match scope {
            Scope::Zone(_) => (Some(ctx.scope_link(scope)), None),
            Scope::Region(_) => (None, Some(ctx.scope_link(scope))),
            _ => (None, None),
        };
        Operation {
            kind: String::from("compute#operation"),
            id: operation.id.to_string(),
            name: operation.name.clone(),
            operation_type: operation.op_type,
            status: operation.status,
            user: operation.user.clone(),
            progress: operation.progress,
            insert_time: operation.insert_time,
            start_time: operation.start_time,
            end_time: operation.end_time,
            target_link: ctx.resource_link(
                scope,
                operation.target_type.collection(),
                &operation.target_name,
            ),
            target_id: operation.item_id.clone(),
            self_link: ctx.resource_link(scope, "operations", &operation.name),
            zone,
            region,
        }
    }
}

/*
 * Addresses
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub kind: String,
    pub id: String,
    pub creation_timestamp: DateTime<Utc>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub address: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    pub region: String,
    pub self_link: String,
}

impl Address {
    pub fn new(address: &model::Address, ctx: &LinkContext) -> Address {
        let scope = address.scope();
        Address {
            kind: String::from("compute#address"),
            id: address.id.to_string(),
            creation_timestamp: address.creation_time,
            name: address.name.clone(),
            description: address.description.clone(),
            address: address.address.clone(),
            status: String::from(match address.instance_name {
                Some(_) => "IN_USE",
                None => "RESERVED",
            }),
            users: address
                .instance_name
                .as_ref()
                .map(|instance| vec![instance.clone()]),
            region: ctx.scope_link(&scope),
            self_link: ctx.resource_link(&scope, "addresses", &address.name),
        }
    }
}

/*
 * Networks
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub kind: String,
    pub id: String,
    pub creation_timestamp: DateTime<Utc>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "IPv4Range", skip_serializing_if = "Option::is_none")]
    pub ipv4_range: Option<String>,
    #[serde(rename = "gatewayIPv4", skip_serializing_if = "Option::is_none")]
    pub gateway_ipv4: Option<String>,
    pub self_link: String,
}

impl Network {
    pub fn new(network: &model::Network, ctx: &LinkContext) -> Network {
        Network {
            kind: String::from("compute#network"),
            id: network.id.to_string(),
            creation_timestamp: network.creation_time,
            name: network.name.clone(),
            description: network.description.clone(),
            ipv4_range: network.ipv4_range.clone(),
            gateway_ipv4: network.gateway_ipv4.clone(),
            self_link: ctx.resource_link(
                &Scope::Global,
                "networks",
                &network.name,
            ),
        }
    }
}

/*
 * Firewalls
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ports: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub kind: String,
    pub id: String,
    pub creation_timestamp: DateTime<Utc>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub network: String,
    pub allowed: Vec<FirewallRule>,
    pub source_ranges: Vec<String>,
    pub self_link: String,
}

impl Firewall {
    pub fn new(firewall: &model::Firewall, ctx: &LinkContext) -> Firewall {
        Firewall {
            kind: String::from("compute#firewall"),
            id: firewall.id.to_string(),
            creation_timestamp: firewall.creation_time,
            name: firewall.name.clone(),
            description: firewall.description.clone(),
            network: ctx.resource_link(
                &Scope::Global,
                "networks",
                &firewall.network_name,
            ),
            allowed: firewall
                .allowed
                .iter()
                .map(|rule| FirewallRule {
                    ip_protocol: rule.protocol.clone(),
                    ports: rule.ports.clone(),
                })
                .collect(),
            source_ranges: firewall.source_ranges.clone(),
            self_link: ctx.resource_link(
                &Scope::Global,
                "firewalls",
                &firewall.name,
            ),
        }
    }
}

/*
 * Instances
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    pub kind: String,
    #[serde(rename = "type")]
    pub config_type: String,
    pub name: String,
    #[serde(rename = "natIP")]
    pub nat_ip: String,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub network: String,
    #[serde(rename = "networkIP", skip_serializing_if = "Option::is_none")]
    pub network_ip: Option<String>,
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    pub kind: String,
    pub index: u32,
    #[serde(rename = "type")]
    pub disk_type: String,
    pub mode: String,
    pub source: String,
    pub device_name: String,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub kind: String,
    pub id: String,
    pub name: String,
    pub status: String,
    pub zone: String,
    pub network_interfaces: Vec<NetworkInterface>,
    pub disks: Vec<AttachedDisk>,
    pub self_link: String,
}

impl Instance {
    pub fn new(instance: &InstanceData, ctx: &LinkContext) -> Instance {
        let scope = Scope::Zone(instance.server.zone.clone());
        let network_interfaces = instance
            .server
            .networks
            .iter()
            .enumerate()
            .map(|(index, network_name)| NetworkInterface {
                name: format!("nic{}", index),
                network: ctx.resource_link(
                    &Scope::Global,
                    "networks",
                    network_name,
                ),
                network_ip: instance.server.fixed_ip.clone(),
                access_configs: instance
                    .access_configs
                    .iter()
                    .filter(|config| &config.network_interface == network_name)
                    .map(|config| AccessConfig {
                        kind: String::from("compute#accessConfig"),
                        config_type: String::from("ONE_TO_ONE_NAT"),
                        name: config.name.clone(),
                        nat_ip: config.nat_ip.clone(),
                    })
                    .collect(),
            })
            .collect();
        let disks = instance
            .attached_disks
            .iter()
            .enumerate()
            .map(|(index, disk)| AttachedDisk {
                kind: String::from("compute#attachedDisk"),
                index: index as u32,
                disk_type: String::from("PERSISTENT"),
                mode: String::from("READ_WRITE"),
                source: ctx.resource_link(&scope, "disks", &disk.volume_name),
                device_name: disk.name.clone(),
            })
            .collect();
        Instance {
            kind: String::from("compute#instance"),
            id: instance.server.id.clone(),
            name: instance.server.name.clone(),
            status: instance_status(&instance.server.status),
            zone: ctx.scope_link(&scope),
            network_interfaces,
            disks,
            self_link: ctx.resource_link(
                &scope,
                "instances",
                &instance.server.name,
            ),
        }
    }
}

/// Maps a backend server status onto the GCE instance status vocabulary.
fn instance_status(backend_status: &str) -> String {
    String::from(match backend_status {
        "ACTIVE" => "RUNNING",
        "BUILD" => "PROVISIONING",
        "SHUTOFF" | "STOPPED" | "SUSPENDED" => "TERMINATED",
        _ => "STOPPING",
    })
}

/*
 * Zones, regions, projects
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub kind: String,
    pub name: String,
    pub status: String,
    pub region: String,
    pub self_link: String,
}

impl Zone {
    pub fn new(zone: &ZoneInfo, ctx: &LinkContext) -> Zone {
        Zone {
            kind: String::from("compute#zone"),
            name: zone.name.clone(),
            status: String::from("UP"),
            region: ctx.scope_link(&Scope::Region(zone.region.clone())),
            self_link: format!(
                "{}/zones/{}",
                ctx.project_base(),
                zone.name
            ),
        }
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub kind: String,
    pub name: String,
    pub status: String,
    pub zones: Vec<String>,
    pub self_link: String,
}

impl Region {
    pub fn new(region: &RegionInfo, ctx: &LinkContext) -> Region {
        Region {
            kind: String::from("compute#region"),
            name: region.name.clone(),
            status: String::from("UP"),
            zones: region
                .zones
                .iter()
                .map(|zone| {
                    format!("{}/zones/{}", ctx.project_base(), zone)
                })
                .collect(),
            self_link: format!(
                "{}/regions/{}",
                ctx.project_base(),
                region.name
            ),
        }
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub kind: String,
    pub name: String,
    pub self_link: String,
}

impl Project {
    pub fn new(project: &ProjectInfo, ctx: &LinkContext) -> Project {
        Project {
            kind: String::from("compute#project"),
            name: project.name.clone(),
            self_link: ctx.project_base(),
        }
    }
}
