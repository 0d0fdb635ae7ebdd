// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulated cloud backend
//!
//! Implements all three backend traits over in-memory state.  Asynchronous
//! backend behavior (volume attach/detach) does not complete on its own:
//! the volume parks in its transitional state until a call to
//! [`SimCloud::volume_settle`].  Tests use this to observe the bridge's
//! operation emulation mid-flight.

use super::ComputeBackend;
use super::FloatingIp;
use super::NetworkBackend;
use super::OsNetwork;
use super::SecurityGroupRule;
use super::ServerInfo;
use super::Volume;
use super::VolumeBackend;
use super::VolumeStatus;
use async_trait::async_trait;
use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::DeleteResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

struct SimState {
    zones: Vec<String>,
    servers: BTreeMap<String, ServerInfo>,
    floating_ips: BTreeMap<String, FloatingIp>,
    networks: BTreeMap<String, OsNetwork>,
    security_groups: BTreeMap<String, String>,
    volumes: BTreeMap<String, Volume>,
    next_ip: u8,
}

pub struct SimCloud {
    inner: Mutex<SimState>,
}

impl SimCloud {
    pub fn new(zones: Vec<String>) -> Arc<SimCloud> {
        Arc::new(SimCloud {
            inner: Mutex::new(SimState {
                zones,
                servers: BTreeMap::new(),
                floating_ips: BTreeMap::new(),
                networks: BTreeMap::new(),
                security_groups: BTreeMap::new(),
                volumes: BTreeMap::new(),
                next_ip: 1,
            }),
        })
    }

    /// Returns this simulator wired into each backend slot.
    pub fn backends(self: &Arc<Self>) -> super::Backends {
        super::Backends {
            compute: Arc::clone(self) as Arc<dyn ComputeBackend>,
            network: Arc::clone(self) as Arc<dyn NetworkBackend>,
            volume: Arc::clone(self) as Arc<dyn VolumeBackend>,
        }
    }

    /// Seeds a server.
    pub fn server_create(
        &self,
        name: &str,
        zone: &str,
        networks: Vec<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let server = ServerInfo {
            id: id.clone(),
            name: String::from(name),
            status: String::from("ACTIVE"),
            zone: String::from(zone),
            networks,
            security_groups: Vec::new(),
            fixed_ip: Some(String::from("10.0.0.2")),
        };
        self.inner.lock().unwrap().servers.insert(id.clone(), server);
        id
    }

    /// Seeds an available volume.
    pub fn volume_create(&self, name: &str, size_gb: u64) -> String {
        let id = Uuid::new_v4().to_string();
        let volume = Volume {
            id: id.clone(),
            name: String::from(name),
            status: VolumeStatus::Available,
            size_gb,
            attached_to: None,
        };
        self.inner.lock().unwrap().volumes.insert(id.clone(), volume);
        id
    }

    /// Completes a pending attach or detach: `attaching` settles to
    /// `in-use`, `detaching` to `available`.  Panics if the volume is
    /// unknown (a test bug).
    pub fn volume_settle(&self, name: &str) {
        let mut state = self.inner.lock().unwrap();
        let volume = state
            .volumes
            .values_mut()
            .find(|v| v.name == name)
            .unwrap_or_else(|| panic!("no such volume: {:?}", name));
        match volume.status {
            VolumeStatus::Attaching => volume.status = VolumeStatus::InUse,
            VolumeStatus::Detaching => {
                volume.status = VolumeStatus::Available;
                volume.attached_to = None;
            }
            _ => (),
        }
    }

    /// Returns the security groups applied to the named server.
    pub fn server_security_groups(&self, name: &str) -> Vec<String> {
        let state = self.inner.lock().unwrap();
        state
            .servers
            .values()
            .find(|s| s.name == name)
            .map(|s| s.security_groups.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ComputeBackend for SimCloud {
    async fn availability_zones(&self) -> ListResultVec<String> {
        Ok(self.inner.lock().unwrap().zones.clone())
    }

    async fn servers_list(&self) -> ListResultVec<ServerInfo> {
        Ok(self.inner.lock().unwrap().servers.values().cloned().collect())
    }

    async fn server_get_by_name(
        &self,
        name: &str,
    ) -> LookupResult<Option<ServerInfo>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .servers
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn reboot_server(&self, server_id: &str) -> Result<(), Error> {
        let state = self.inner.lock().unwrap();
        if state.servers.contains_key(server_id) {
            Ok(())
        } else {
            Err(Error::unavail(&format!(
                "backend has no server {:?}",
                server_id
            )))
        }
    }

    async fn attach_volume(
        &self,
        server_id: &str,
        volume_id: &str,
        _device: &str,
    ) -> Result<(), Error> {
        let mut state = self.inner.lock().unwrap();
        if !state.servers.contains_key(server_id) {
            return Err(Error::unavail(&format!(
                "backend has no server {:?}",
                server_id
            )));
        }
        let volume = state.volumes.get_mut(volume_id).ok_or_else(|| {
            Error::unavail(&format!("backend has no volume {:?}", volume_id))
        })?;
        if volume.status != VolumeStatus::Available {
            return Err(Error::unavail(&format!(
                "volume {:?} is {}",
                volume.name, volume.status
            )));
        }
        volume.status = VolumeStatus::Attaching;
        volume.attached_to = Some(String::from(server_id));
        Ok(())
    }

    async fn detach_volume(
        &self,
        server_id: &str,
        volume_id: &str,
    ) -> Result<(), Error> {
        let mut state = self.inner.lock().unwrap();
        let volume = state.volumes.get_mut(volume_id).ok_or_else(|| {
            Error::unavail(&format!("backend has no volume {:?}", volume_id))
        })?;
        if volume.attached_to.as_deref() != Some(server_id) {
            return Err(Error::unavail(&format!(
                "volume {:?} is not attached to server {:?}",
                volume.name, server_id
            )));
        }
        volume.status = VolumeStatus::Detaching;
        Ok(())
    }

    async fn add_security_group(
        &self,
        server_id: &str,
        group: &str,
    ) -> Result<(), Error> {
        let mut state = self.inner.lock().unwrap();
        let server = state.servers.get_mut(server_id).ok_or_else(|| {
            Error::unavail(&format!("backend has no server {:?}", server_id))
        })?;
        if !server.security_groups.iter().any(|g| g == group) {
            server.security_groups.push(String::from(group));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkBackend for SimCloud {
    async fn floating_ip_allocate(&self) -> CreateResult<FloatingIp> {
        let mut state = self.inner.lock().unwrap();
        let octet = state.next_ip;
        state.next_ip = state.next_ip.wrapping_add(1);
        let id = Uuid::new_v4().to_string();
        let fip = FloatingIp {
            id: id.clone(),
            ip: format!("172.24.4.{}", octet),
            server_id: None,
        };
        state.floating_ips.insert(id, fip.clone());
        Ok(fip)
    }

    async fn floating_ip_release(&self, id: &str) -> DeleteResult {
        let mut state = self.inner.lock().unwrap();
        state.floating_ips.remove(id).ok_or_else(|| {
            Error::unavail(&format!("backend has no floating ip {:?}", id))
        })?;
        Ok(())
    }

    async fn floating_ip_associate(
        &self,
        id: &str,
        server_id: &str,
    ) -> Result<(), Error> {
        let mut state = self.inner.lock().unwrap();
        if !state.servers.contains_key(server_id) {
            return Err(Error::unavail(&format!(
                "backend has no server {:?}",
                server_id
            )));
        }
        let fip = state.floating_ips.get_mut(id).ok_or_else(|| {
            Error::unavail(&format!("backend has no floating ip {:?}", id))
        })?;
        fip.server_id = Some(String::from(server_id));
        Ok(())
    }

    async fn floating_ip_disassociate(&self, id: &str) -> Result<(), Error> {
        let mut state = self.inner.lock().unwrap();
        let fip = state.floating_ips.get_mut(id).ok_or_else(|| {
            Error::unavail(&format!("backend has no floating ip {:?}", id))
        })?;
        fip.server_id = None;
        Ok(())
    }

    async fn network_create(
        &self,
        name: &str,
        cidr: Option<&str>,
        gateway: Option<&str>,
    ) -> CreateResult<OsNetwork> {
        let mut state = self.inner.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let network = OsNetwork {
            id: id.clone(),
            name: String::from(name),
            cidr: cidr.map(String::from),
            gateway: gateway.map(String::from),
        };
        state.networks.insert(id, network.clone());
        Ok(network)
    }

    async fn network_delete(&self, id: &str) -> DeleteResult {
        let mut state = self.inner.lock().unwrap();
        state.networks.remove(id).ok_or_else(|| {
            Error::unavail(&format!("backend has no network {:?}", id))
        })?;
        Ok(())
    }

    async fn security_group_create(
        &self,
        name: &str,
        _rules: &[SecurityGroupRule],
    ) -> CreateResult<String> {
        let mut state = self.inner.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        state.security_groups.insert(id.clone(), String::from(name));
        Ok(id)
    }

    async fn security_group_delete(&self, id: &str) -> DeleteResult {
        let mut state = self.inner.lock().unwrap();
        state.security_groups.remove(id).ok_or_else(|| {
            Error::unavail(&format!("backend has no security group {:?}", id))
        })?;
        Ok(())
    }
}

#[async_trait]
impl VolumeBackend for SimCloud {
    async fn volume_get(&self, id: &str) -> LookupResult<Option<Volume>> {
        Ok(self.inner.lock().unwrap().volumes.get(id).cloned())
    }

    async fn volume_get_by_name(
        &self,
        name: &str,
    ) -> LookupResult<Option<Volume>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .volumes
            .values()
            .find(|v| v.name == name)
            .cloned())
    }
}
