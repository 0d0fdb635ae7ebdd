// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces to the OpenStack services backing the bridge
//!
//! The bridge talks to the cloud exclusively through these traits; they
//! describe the slice of Nova, Neutron, and Cinder behavior the resource
//! APIs need and nothing more.  The [`sim`] module provides the in-memory
//! implementation used by the test suite and the `sim` deployment mode.

pub mod sim;

use async_trait::async_trait;
use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::DeleteResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FormatResult;
use std::sync::Arc;

/// A compute server as reported by the backend
#[derive(Clone, Debug)]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    /// Backend status string (`ACTIVE`, `SHUTOFF`, ...)
    pub status: String,
    /// Availability zone the server runs in
    pub zone: String,
    /// Names of the networks the server is plugged into
    pub networks: Vec<String>,
    /// Names of the security groups applied to the server
    pub security_groups: Vec<String>,
    /// Fixed IP on the first interface, if assigned
    pub fixed_ip: Option<String>,
}

/// A floating IP as reported by the backend
#[derive(Clone, Debug)]
pub struct FloatingIp {
    pub id: String,
    pub ip: String,
    /// Server the IP is associated with, if any
    pub server_id: Option<String>,
}

/// A backend network
#[derive(Clone, Debug)]
pub struct OsNetwork {
    pub id: String,
    pub name: String,
    pub cidr: Option<String>,
    pub gateway: Option<String>,
}

/// One ingress rule of a security group
#[derive(Clone, Debug)]
pub struct SecurityGroupRule {
    pub protocol: String,
    pub ports: Vec<String>,
    pub source_ranges: Vec<String>,
}

/// A block storage volume
#[derive(Clone, Debug)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub status: VolumeStatus,
    pub size_gb: u64,
    /// Server the volume is (or is becoming) attached to
    pub attached_to: Option<String>,
}

/// Volume lifecycle states the bridge cares about
///
/// Attach and detach are fire-and-forget on the backend; the bridge polls
/// the volume until it settles in `InUse` or `Available`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeStatus {
    Available,
    Attaching,
    InUse,
    Detaching,
}

impl Display for VolumeStatus {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                VolumeStatus::Available => "available",
                VolumeStatus::Attaching => "attaching",
                VolumeStatus::InUse => "in-use",
                VolumeStatus::Detaching => "detaching",
            }
        )
    }
}

/// The slice of Nova the bridge needs
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    async fn availability_zones(&self) -> ListResultVec<String>;

    async fn servers_list(&self) -> ListResultVec<ServerInfo>;

    async fn server_get_by_name(
        &self,
        name: &str,
    ) -> LookupResult<Option<ServerInfo>>;

    async fn reboot_server(&self, server_id: &str) -> Result<(), Error>;

    /// Issues a volume attachment.  The call returns once the backend has
    /// accepted the request; the volume transitions to `in-use`
    /// asynchronously.
    async fn attach_volume(
        &self,
        server_id: &str,
        volume_id: &str,
        device: &str,
    ) -> Result<(), Error>;

    /// Issues a volume detachment; same fire-and-forget contract as
    /// [`ComputeBackend::attach_volume`].
    async fn detach_volume(
        &self,
        server_id: &str,
        volume_id: &str,
    ) -> Result<(), Error>;

    async fn add_security_group(
        &self,
        server_id: &str,
        group: &str,
    ) -> Result<(), Error>;
}

/// The slice of Neutron the bridge needs
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    async fn floating_ip_allocate(&self) -> CreateResult<FloatingIp>;

    async fn floating_ip_release(&self, id: &str) -> DeleteResult;

    async fn floating_ip_associate(
        &self,
        id: &str,
        server_id: &str,
    ) -> Result<(), Error>;

    async fn floating_ip_disassociate(&self, id: &str) -> Result<(), Error>;

    async fn network_create(
        &self,
        name: &str,
        cidr: Option<&str>,
        gateway: Option<&str>,
    ) -> CreateResult<OsNetwork>;

    async fn network_delete(&self, id: &str) -> DeleteResult;

    async fn security_group_create(
        &self,
        name: &str,
        rules: &[SecurityGroupRule],
    ) -> CreateResult<String>;

    async fn security_group_delete(&self, id: &str) -> DeleteResult;
}

/// The slice of Cinder the bridge needs
#[async_trait]
pub trait VolumeBackend: Send + Sync {
    async fn volume_get(&self, id: &str) -> LookupResult<Option<Volume>>;

    async fn volume_get_by_name(
        &self,
        name: &str,
    ) -> LookupResult<Option<Volume>>;
}

/// The full set of backend handles the bridge is wired up with
#[derive(Clone)]
pub struct Backends {
    pub compute: Arc<dyn ComputeBackend>,
    pub network: Arc<dyn NetworkBackend>,
    pub volume: Arc<dyn VolumeBackend>,
}
