// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Params define the request bodies and path/query parameters of the
//! external API
//!
//! Field names follow the GCE wire format (camelCase, with the handful of
//! historical oddities like `IPv4Range` spelled out explicitly).

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/*
 * Path parameters
 */

#[derive(Deserialize, JsonSchema)]
pub struct ProjectPathParam {
    pub project: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct ZonePathParam {
    pub project: String,
    pub zone: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct RegionPathParam {
    pub project: String,
    pub region: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct GlobalItemPathParam {
    pub project: String,
    pub name: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct ZoneItemPathParam {
    pub project: String,
    pub zone: String,
    pub name: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct RegionItemPathParam {
    pub project: String,
    pub region: String,
    pub name: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct InstancePathParam {
    pub project: String,
    pub zone: String,
    pub instance: String,
}

/*
 * Query parameters
 */

/// Common query parameters for list requests
#[derive(Deserialize, JsonSchema)]
pub struct ListQueryParams {
    /// Filter expression of the exact form `<field> (eq|ne) '<value>'`.
    /// Anything else is ignored and the full list is returned.
    pub filter: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetachDiskQueryParams {
    pub device_name: String,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddAccessConfigQueryParams {
    pub network_interface: String,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccessConfigQueryParams {
    pub access_config: String,
    pub network_interface: String,
}

/*
 * Request bodies
 */

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "IPv4Range")]
    pub ipv4_range: Option<String>,
    #[serde(rename = "gatewayIPv4")]
    pub gateway_ipv4: Option<String>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleParams {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    pub ports: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallCreate {
    pub name: String,
    pub description: Option<String>,
    /// Network the firewall applies to: a resource URL or a bare network
    /// name.  Defaults to `default`.
    pub network: Option<String>,
    pub allowed: Vec<FirewallRuleParams>,
    pub source_ranges: Option<Vec<String>>,
}

/// Body of an `attachDisk` action
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskCreate {
    /// The disk to attach: a resource URL or a bare volume name
    pub source: String,
    pub device_name: Option<String>,
}

/// Body of an `addAccessConfig` action
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfigCreate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "natIP")]
    pub nat_ip: Option<String>,
}
