// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data structures and related facilities for representing resources in the
//! API
//!
//! The contents here are all HTTP-agnostic.

mod error;
pub mod scope;

pub use error::*;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FormatResult;

/*
 * The type aliases below exist primarily to ensure consistency among return
 * types for functions in the resource APIs and the datastore.
 */

/// Result of a create operation for the specified type
pub type CreateResult<T> = Result<T, Error>;
/// Result of a delete operation for the specified type
pub type DeleteResult = Result<(), Error>;
/// Result of a list operation that returns a vector
pub type ListResultVec<T> = Result<Vec<T>, Error>;
/// Result of a lookup operation for the specified type
pub type LookupResult<T> = Result<T, Error>;
/// Result of an update operation for the specified type
pub type UpdateResult<T> = Result<T, Error>;

/*
 * General types used to implement API resources
 */

/// Identifies a type of API resource
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum ResourceType {
    Project,
    Zone,
    Region,
    Address,
    Network,
    Firewall,
    Instance,
    Disk,
    AttachedDisk,
    AccessConfig,
    Operation,
}

impl ResourceType {
    /// Returns the URL collection segment for this resource type, as used in
    /// `selfLink`/`targetLink` construction
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceType::Project => "projects",
            ResourceType::Zone => "zones",
            ResourceType::Region => "regions",
            ResourceType::Address => "addresses",
            ResourceType::Network => "networks",
            ResourceType::Firewall => "firewalls",
            ResourceType::Instance => "instances",
            ResourceType::Disk => "disks",
            ResourceType::AttachedDisk => "disks",
            ResourceType::AccessConfig => "accessConfigs",
            ResourceType::Operation => "operations",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                ResourceType::Project => "project",
                ResourceType::Zone => "zone",
                ResourceType::Region => "region",
                ResourceType::Address => "address",
                ResourceType::Network => "network",
                ResourceType::Firewall => "firewall",
                ResourceType::Instance => "instance",
                ResourceType::Disk => "disk",
                ResourceType::AttachedDisk => "attached disk",
                ResourceType::AccessConfig => "access config",
                ResourceType::Operation => "operation",
            }
        )
    }
}

/// The kind of mutation an [`Operation`] record tracks
///
/// These serialize to the camelCase strings GCE clients expect in the
/// `operationType` field.  The set is open-ended in the GCE API; we only
/// define the verbs the bridge can actually produce.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    Insert,
    Delete,
    Update,
    Reset,
    AttachDisk,
    DetachDisk,
    AddAccessConfig,
    DeleteAccessConfig,
    SetMetadata,
    CreateSnapshot,
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                OperationType::Insert => "insert",
                OperationType::Delete => "delete",
                OperationType::Update => "update",
                OperationType::Reset => "reset",
                OperationType::AttachDisk => "attachDisk",
                OperationType::DetachDisk => "detachDisk",
                OperationType::AddAccessConfig => "addAccessConfig",
                OperationType::DeleteAccessConfig => "deleteAccessConfig",
                OperationType::SetMetadata => "setMetadata",
                OperationType::CreateSnapshot => "createSnapshot",
            }
        )
    }
}

/// Status of an [`Operation`]
///
/// There is no intermediate state: an operation is either still being polled
/// for progress or it has reached its terminal state.  `DONE` is terminal;
/// no actor ever transitions an operation out of it.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationStatus {
    Running,
    Done,
}

impl Display for OperationStatus {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                OperationStatus::Running => "RUNNING",
                OperationStatus::Done => "DONE",
            }
        )
    }
}
