// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Record types persisted in the item store
//!
//! Records are stored as semi-structured values keyed by
//! `(project, kind, id)`; the [`Record`] trait supplies the kind
//! discriminator and the identity accessors the store needs.

use chrono::DateTime;
use chrono::Utc;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::OperationStatus;
use gce_bridge_common::api::OperationType;
use gce_bridge_common::api::ResourceType;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// A value that can be persisted in the item store
pub trait Record:
    Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Kind discriminator used as part of the storage key
    const KIND: &'static str;
    /// Resource type reported in lookup errors for this record kind
    const RESOURCE_TYPE: ResourceType;

    fn record_id(&self) -> String;
    fn record_name(&self) -> &str;
}

/// An asynchronous unit of work exposed to API clients
///
/// Exactly one record exists per mutating call.  The record is written at
/// creation and thereafter mutated only by the operation manager's lazy
/// refresh on the read path.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Operation {
    pub id: Uuid,
    pub name: String,
    pub op_type: OperationType,
    pub user: String,
    pub status: OperationStatus,
    pub progress: i64,
    pub insert_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Denormalized locality; never `aggregated`
    pub scope: Scope,
    pub target_type: ResourceType,
    /// The target's display name at operation-creation time; fixed even if
    /// the resource is later renamed or deleted
    pub target_name: String,
    /// Registry key of the progress function; meaningful only while RUNNING
    pub method_key: Option<String>,
    /// Store identifier of the affected record, once known
    pub item_id: Option<String>,
    /// Overrides `target_name` as the name handed to the progress function,
    /// for sub-resources whose name differs from the target's (e.g. an
    /// attached disk's device name)
    pub item_name: Option<String>,
}

impl Record for Operation {
    const KIND: &'static str = "operation";
    const RESOURCE_TYPE: ResourceType = ResourceType::Operation;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// A reserved external IP address, backed by a floating IP
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Address {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub region: String,
    pub address: String,
    /// Floating IP id on the backend
    pub backend_id: String,
    /// Name of the instance currently using this address, if any
    pub instance_name: Option<String>,
    pub creation_time: DateTime<Utc>,
}

impl Address {
    pub fn scope(&self) -> Scope {
        Scope::Region(self.region.clone())
    }
}

impl Record for Address {
    const KIND: &'static str = "address";
    const RESOURCE_TYPE: ResourceType = ResourceType::Address;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// A network, backed by a backend network
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Network {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub ipv4_range: Option<String>,
    pub gateway_ipv4: Option<String>,
    pub backend_id: String,
    pub creation_time: DateTime<Utc>,
}

impl Record for Network {
    const KIND: &'static str = "network";
    const RESOURCE_TYPE: ResourceType = ResourceType::Network;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// One allowed traffic rule within a firewall
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FirewallRule {
    pub protocol: String,
    pub ports: Vec<String>,
}

/// A firewall, backed by a backend security group
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Firewall {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub network_name: String,
    pub allowed: Vec<FirewallRule>,
    pub source_ranges: Vec<String>,
    /// Security group id on the backend
    pub backend_id: String,
    pub creation_time: DateTime<Utc>,
}

impl Record for Firewall {
    const KIND: &'static str = "firewall";
    const RESOURCE_TYPE: ResourceType = ResourceType::Firewall;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// A disk attachment: the binding of a backend volume to an instance under
/// a device name
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AttachedDisk {
    pub id: Uuid,
    /// Device name; doubles as the record's display name
    pub name: String,
    pub zone: String,
    pub instance_name: String,
    pub volume_id: String,
    pub volume_name: String,
    pub creation_time: DateTime<Utc>,
}

impl Record for AttachedDisk {
    const KIND: &'static str = "attached_disk";
    const RESOURCE_TYPE: ResourceType = ResourceType::AttachedDisk;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// An access config: an external NAT binding between an instance's network
/// interface and a floating IP
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessConfig {
    pub id: Uuid,
    pub name: String,
    pub zone: String,
    pub instance_name: String,
    pub network_interface: String,
    pub nat_ip: String,
    /// Floating IP id on the backend
    pub fip_id: String,
    /// Backing address record, when the NAT IP was a reserved address
    /// rather than an ephemeral allocation
    pub address_id: Option<Uuid>,
    pub creation_time: DateTime<Utc>,
}

impl Record for AccessConfig {
    const KIND: &'static str = "access_config";
    const RESOURCE_TYPE: ResourceType = ResourceType::AccessConfig;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}
