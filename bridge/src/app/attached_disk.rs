// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attached disk API: the binding of a backend volume to an instance
//!
//! This is the asynchronous pair of the bridge.  The backend accepts
//! attach and detach requests and completes them in the background, so
//! both mutations commit RUNNING and register progress functions that poll
//! the volume until it settles.  The device-name allocation happens after
//! validation but before the attach call, which is why the operation is
//! begun early and the record identity bound once it exists.

use crate::app::operation::OperationParams;
use crate::app::operation::PendingOperation;
use crate::app::registry::OperationRegistry;
use crate::app::registry::Progress;
use crate::backend::ComputeBackend;
use crate::backend::ServerInfo;
use crate::backend::VolumeBackend;
use crate::backend::VolumeStatus;
use crate::context::OpContext;
use crate::db::model;
use crate::db::model::Record;
use crate::db::DataStore;
use crate::external_api::params;
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

/// Method key for deferred attach operations
pub const METHOD_ADD: &str = "attached_disk-add";
/// Method key for deferred detach operations
pub const METHOD_DELETE: &str = "attached_disk-delete";

/// Device names are drawn from a fixed pool; an instance with every slot
/// taken is over quota.
const MAX_ATTACHED_DISKS: usize = 16;

pub struct AttachedDiskApi {
    log: Logger,
    datastore: Arc<DataStore>,
    compute: Arc<dyn ComputeBackend>,
    volume: Arc<dyn VolumeBackend>,
}

impl AttachedDiskApi {
    /// Constructs the API and registers its deferred operation methods.
    /// Registration failure means two APIs claimed the same method key,
    /// which is a startup bug worth dying for.
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        compute: Arc<dyn ComputeBackend>,
        volume: Arc<dyn VolumeBackend>,
        registry: &mut OperationRegistry,
    ) -> Arc<AttachedDiskApi> {
        {
            let datastore = Arc::clone(&datastore);
            let volume = Arc::clone(&volume);
            registry
                .register(
                    METHOD_ADD,
                    Arc::new(move |opctx, args| {
                        let datastore = Arc::clone(&datastore);
                        let volume = Arc::clone(&volume);
                        Box::pin(async move {
                            attach_progress(&opctx, &datastore, &*volume, args.item_id)
                                .await
                        })
                    }),
                )
                .unwrap_or_else(|error| {
                    panic!("failed to register {}: {}", METHOD_ADD, error)
                });
        }
        {
            let datastore = Arc::clone(&datastore);
            let volume = Arc::clone(&volume);
            registry
                .register(
                    METHOD_DELETE,
                    Arc::new(move |opctx, args| {
                        let datastore = Arc::clone(&datastore);
                        let volume = Arc::clone(&volume);
                        Box::pin(async move {
                            detach_progress(&opctx, &datastore, &*volume, args.item_id)
                                .await
                        })
                    }),
                )
                .unwrap_or_else(|error| {
                    panic!("failed to register {}: {}", METHOD_DELETE, error)
                });
        }
        Arc::new(AttachedDiskApi { log, datastore, compute, volume })
    }

    pub fn list_for_instance(
        &self,
        opctx: &OpContext,
        zone: &str,
        instance_name: &str,
    ) -> ListResultVec<model::AttachedDisk> {
        Ok(self
            .datastore
            .items_list::<model::AttachedDisk>(&opctx.project)?
            .into_iter()
            .filter(|disk| {
                disk.zone == zone && disk.instance_name == instance_name
            })
            .collect())
    }

    /// Attaches a volume to an instance.  Returns a deferred operation:
    /// the attach has been issued but not completed when this returns.
    pub async fn attach(
        &self,
        opctx: &OpContext,
        scope: &Scope,
        instance_name: &str,
        create_params: params::AttachedDiskCreate,
    ) -> CreateResult<PendingOperation> {
        let (zone, server) =
            self.lookup_server(scope, instance_name).await?;

        let volume_name = volume_name_of(&create_params.source)?;
        let volume = self
            .volume
            .volume_get_by_name(&volume_name)
            .await?
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Disk, &volume_name)
            })?;
        if volume.status != VolumeStatus::Available {
            return Err(Error::invalid_request(&format!(
                "disk \"{}\" is {}",
                volume.name, volume.status
            )));
        }

        let existing = self.list_for_instance(opctx, &zone, instance_name)?;
        if existing.iter().any(|disk| disk.volume_id == volume.id) {
            return Err(Error::invalid_request(&format!(
                "disk \"{}\" is already attached to instance \"{}\"",
                volume.name, instance_name
            )));
        }

        // Begin the operation before the record exists; its identity is
        // bound below, once the device-name allocation has produced one.
        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::AttachDisk,
                scope: scope.clone(),
                target_type: ResourceType::Instance,
                target_name: String::from(instance_name),
            },
        )?;

        let device_name = match create_params.device_name {
            Some(device_name) => {
                if existing.iter().any(|disk| disk.name == device_name) {
                    return Err(Error::invalid_request(&format!(
                        "device name \"{}\" is already in use on instance \
                         \"{}\"",
                        device_name, instance_name
                    )));
                }
                device_name
            }
            None => (0..MAX_ATTACHED_DISKS)
                .map(|index| format!("persistent-disk-{}", index))
                .find(|candidate| {
                    !existing.iter().any(|disk| &disk.name == candidate)
                })
                .ok_or_else(|| {
                    Error::over_quota(&format!(
                        "instance \"{}\" has no free device names",
                        instance_name
                    ))
                })?,
        };

        let record = self.datastore.item_create(
            &opctx.project,
            &model::AttachedDisk {
                id: Uuid::new_v4(),
                name: device_name.clone(),
                zone,
                instance_name: String::from(instance_name),
                volume_id: volume.id.clone(),
                volume_name: volume.name.clone(),
                creation_time: Utc::now(),
            },
        )?;

        if let Err(error) = self
            .compute
            .attach_volume(&server.id, &volume.id, &device_name)
            .await
        {
            // The attach never started; don't leave the record behind.
            let _ = self.datastore.item_delete::<model::AttachedDisk>(
                &opctx.project,
                &record.record_id(),
            );
            return Err(error);
        }
        info!(self.log, "attaching disk";
            "instance" => instance_name,
            "disk" => &volume.name,
            "device" => &device_name);

        pending.bind_item(&record.record_id());
        pending.bind_item_name(&record.name);
        pending.defer(METHOD_ADD);
        Ok(pending)
    }

    /// Detaches the volume bound under `device_name`.  Returns a deferred
    /// operation; the record disappears when the detach completes.
    pub async fn detach(
        &self,
        opctx: &OpContext,
        scope: &Scope,
        instance_name: &str,
        device_name: &str,
    ) -> CreateResult<PendingOperation> {
        let (zone, server) =
            self.lookup_server(scope, instance_name).await?;

        let record = self
            .list_for_instance(opctx, &zone, instance_name)?
            .into_iter()
            .find(|disk| disk.name == device_name)
            .ok_or_else(|| {
                Error::not_found_by_name(
                    ResourceType::AttachedDisk,
                    device_name,
                )
            })?;

        self.compute.detach_volume(&server.id, &record.volume_id).await?;
        info!(self.log, "detaching disk";
            "instance" => instance_name, "device" => device_name);

        let mut pending = PendingOperation::new(
            opctx,
            OperationParams {
                op_type: OperationType::DetachDisk,
                scope: scope.clone(),
                target_type: ResourceType::Instance,
                target_name: String::from(instance_name),
            },
        )?;
        pending.bind_item(&record.record_id());
        pending.bind_item_name(&record.name);
        pending.defer(METHOD_DELETE);
        Ok(pending)
    }

    async fn lookup_server(
        &self,
        scope: &Scope,
        instance_name: &str,
    ) -> LookupResult<(String, ServerInfo)> {
        let zone = match scope {
            Scope::Zone(zone) => zone.clone(),
            _ => {
                return Err(Error::invalid_request(
                    "attached disks are zonal resources",
                ));
            }
        };
        let server = self
            .compute
            .server_get_by_name(instance_name)
            .await?
            .filter(|server| server.zone == zone)
            .ok_or_else(|| {
                Error::not_found_by_name(
                    ResourceType::Instance,
                    instance_name,
                )
            })?;
        Ok((zone, server))
    }
}

/// Resolves the `source` field of an attach body, which may be a resource
/// URL or a bare volume name.
fn volume_name_of(source: &str) -> Result<String, Error> {
    if !source.contains('/') {
        return Ok(String::from(source));
    }
    let (_, collection, name) = parse_resource_url(source)?;
    if collection != "disks" {
        return Err(Error::invalid_request(&format!(
            "\"{}\" is not a disk url",
            source
        )));
    }
    Ok(name)
}

/// Progress function for [`METHOD_ADD`]: complete once the volume settles
/// in `in-use`.
async fn attach_progress(
    opctx: &OpContext,
    datastore: &DataStore,
    volume_backend: &dyn VolumeBackend,
    item_id: Option<String>,
) -> Result<Option<Progress>, Error> {
    // Not bound yet: the attach has not gotten far enough to poll.
    let Some(item_id) = item_id else { return Ok(None) };
    let Some(record) = datastore
        .item_get_by_id::<model::AttachedDisk>(&opctx.project, &item_id)?
    else {
        // The record was removed underneath the operation; there is
        // nothing left to wait for.
        return Ok(Some(Progress { progress: 100, item_id: None }));
    };
    match volume_backend.volume_get(&record.volume_id).await? {
        Some(volume) if volume.status == VolumeStatus::InUse => {
            Ok(Some(Progress { progress: 100, item_id: None }))
        }
        Some(_) => Ok(None),
        None => Ok(Some(Progress { progress: 100, item_id: None })),
    }
}

/// Progress function for [`METHOD_DELETE`]: complete once the volume is
/// available again, at which point the attachment record is removed.
async fn detach_progress(
    opctx: &OpContext,
    datastore: &DataStore,
    volume_backend: &dyn VolumeBackend,
    item_id: Option<String>,
) -> Result<Option<Progress>, Error> {
    let Some(item_id) = item_id else { return Ok(None) };
    let Some(record) = datastore
        .item_get_by_id::<model::AttachedDisk>(&opctx.project, &item_id)?
    else {
        return Ok(Some(Progress { progress: 100, item_id: None }));
    };
    let settled = match volume_backend.volume_get(&record.volume_id).await? {
        Some(volume) => volume.status == VolumeStatus::Available,
        None => true,
    };
    if !settled {
        return Ok(None);
    }
    match datastore
        .item_delete::<model::AttachedDisk>(&opctx.project, &item_id)
    {
        Ok(()) => (),
        // A concurrent poll got there first; that's fine.
        Err(Error::ObjectNotFound { .. }) => (),
        Err(error) => return Err(error),
    }
    Ok(Some(Progress { progress: 100, item_id: None }))
}
