// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operation lifecycle management
//!
//! Every mutating call in the GCE API returns an Operation resource that
//! clients poll for completion.  The backend calls underneath are a mix of
//! synchronous and fire-and-forget asynchronous work, so the bridge
//! emulates the contract: an operation is created in its final state when
//! the underlying call already completed, or RUNNING with a registered
//! progress function when it did not.  The server does no work on a RUNNING
//! operation between polls; status only advances when a read triggers the
//! progress function.
//!
//! Creation is a two-phase builder.  A resource API constructs a
//! [`PendingOperation`] at whatever point in its handler it likes, binds
//! the affected record's identity once known, marks the call deferred if
//! its completion must be polled, and hands the pending operation back to
//! the controller, which commits it here.  Calls that know their record id
//! up front bind-and-return immediately; calls that learn it partway
//! through a multi-step backend interaction bind late.  Both shapes are the
//! same type.

use crate::app::registry::OperationRegistry;
use crate::app::registry::ProgressArgs;
use crate::context::OpContext;
use crate::db::model;
use crate::db::model::Record;
use crate::db::DataStore;
use chrono::Utc;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::DeleteResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use gce_bridge_common::api::OperationStatus;
use gce_bridge_common::api::OperationType;
use gce_bridge_common::api::ResourceType;
use gce_bridge_common::bail_unless;
use slog::warn;
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Fixed attributes of an operation, supplied at construction
#[derive(Clone, Debug)]
pub struct OperationParams {
    pub op_type: OperationType,
    pub scope: Scope,
    pub target_type: ResourceType,
    pub target_name: String,
}

/// An operation under construction, not yet persisted
pub struct PendingOperation {
    params: OperationParams,
    user: String,
    item_id: Option<String>,
    item_name: Option<String>,
    method_key: Option<String>,
}

impl PendingOperation {
    pub fn new(
        opctx: &OpContext,
        params: OperationParams,
    ) -> CreateResult<PendingOperation> {
        // The aggregated pseudo-scope exists only as a list-request
        // modifier and must never be attached to a stored record.
        bail_unless!(
            !params.scope.is_aggregated(),
            "operation created with aggregated scope"
        );
        Ok(PendingOperation {
            params,
            user: opctx.user.clone(),
            item_id: None,
            item_name: None,
            method_key: None,
        })
    }

    /// Binds the store identifier of the affected record.
    pub fn bind_item(&mut self, item_id: &str) {
        self.item_id = Some(String::from(item_id));
    }

    /// Overrides the name handed to the progress function, for operations
    /// whose addressed resource differs from the target (e.g. an attached
    /// disk's device name under an instance target).
    pub fn bind_item_name(&mut self, item_name: &str) {
        self.item_name = Some(String::from(item_name));
    }

    /// Marks the call asynchronous: the operation will commit RUNNING and
    /// be polled through the progress function registered under
    /// `method_key`.
    pub fn defer(&mut self, method_key: &str) {
        self.method_key = Some(String::from(method_key));
    }
}

/// Sole owner of operation records: creates them, decides sync-vs-async at
/// creation, and lazily advances their status on read
pub struct OperationManager {
    log: Logger,
    datastore: Arc<DataStore>,
    registry: OperationRegistry,
}

impl OperationManager {
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        registry: OperationRegistry,
    ) -> OperationManager {
        OperationManager { log, datastore, registry }
    }

    /// Persists a pending operation, fixing its identity and initial
    /// status.
    pub async fn commit(
        &self,
        opctx: &OpContext,
        pending: PendingOperation,
    ) -> CreateResult<model::Operation> {
        let PendingOperation { params, user, item_id, item_name, method_key } =
            pending;
        if let Some(method_key) = &method_key {
            // RUNNING implies the key was valid at creation time; a miss
            // here is a wiring bug in the resource API, not a client error.
            bail_unless!(
                self.registry.contains_key(method_key),
                "operation deferred under unregistered method key {:?}",
                method_key
            );
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let (status, progress, end_time) = match method_key {
            Some(_) => (OperationStatus::Running, 0, None),
            None => (OperationStatus::Done, 100, Some(now)),
        };
        let record = model::Operation {
            id,
            name: format!("operation-{}", id),
            op_type: params.op_type,
            user,
            status,
            progress,
            insert_time: now,
            start_time: now,
            end_time,
            scope: params.scope,
            target_type: params.target_type,
            target_name: params.target_name,
            method_key,
            item_id,
            item_name,
        };
        self.datastore.item_create(&opctx.project, &record)
    }

    pub async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<model::Operation> {
        let operation = self.lookup_by_name(opctx, name, scope)?;
        self.refresh(opctx, operation).await
    }

    pub async fn get_items(
        &self,
        opctx: &OpContext,
        scope: &Scope,
    ) -> ListResultVec<model::Operation> {
        let operations = self
            .datastore
            .items_list::<model::Operation>(&opctx.project)?
            .into_iter()
            .filter(|op| scope.is_aggregated() || op.scope == *scope);
        let mut refreshed = Vec::new();
        for operation in operations {
            refreshed.push(self.refresh(opctx, operation).await?);
        }
        Ok(refreshed)
    }

    /// Aggregated listing: refreshed operations grouped by scope path.
    pub async fn get_aggregated(
        &self,
        opctx: &OpContext,
    ) -> Result<BTreeMap<String, Vec<model::Operation>>, Error> {
        let mut grouped: BTreeMap<String, Vec<model::Operation>> =
            BTreeMap::new();
        for operation in self.get_items(opctx, &Scope::Aggregated).await? {
            grouped
                .entry(operation.scope.path())
                .or_default()
                .push(operation);
        }
        Ok(grouped)
    }

    pub async fn delete_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> DeleteResult {
        let operation = self.lookup_by_name(opctx, name, scope)?;
        self.datastore
            .item_delete::<model::Operation>(
                &opctx.project,
                &operation.record_id(),
            )
    }

    pub async fn get_scopes(
        &self,
        _opctx: &OpContext,
        operation: &model::Operation,
    ) -> ListResultVec<Scope> {
        Ok(vec![operation.scope.clone()])
    }

    fn lookup_by_name(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<model::Operation> {
        let mut matches = self
            .datastore
            .items_list::<model::Operation>(&opctx.project)?
            .into_iter()
            .filter(|op| op.name == name && op.scope == *scope)
            .collect::<Vec<model::Operation>>();
        match matches.len() {
            0 => Err(Error::not_found_by_name(ResourceType::Operation, name)),
            1 => Ok(matches.remove(0)),
            n => Err(Error::internal_error(&format!(
                "found {} operations named \"{}\"",
                n, name
            ))),
        }
    }

    /// Polls a non-terminal operation's progress function and folds the
    /// result back into the stored record.  This is the only place status
    /// transitions happen; it runs on the read path by design (there is no
    /// background poller).
    async fn refresh(
        &self,
        opctx: &OpContext,
        operation: model::Operation,
    ) -> LookupResult<model::Operation> {
        if operation.status == OperationStatus::Done {
            return Ok(operation);
        }

        let Some(method_key) = operation.method_key.clone() else {
            return Err(Error::internal_error(&format!(
                "operation \"{}\" is RUNNING but has no method key",
                operation.name
            )));
        };
        let Some(get_progress) = self.registry.lookup(&method_key) else {
            return Err(Error::internal_error(&format!(
                "operation \"{}\" refers to unregistered method key {:?}",
                operation.name, method_key
            )));
        };

        let args = ProgressArgs {
            name: operation
                .item_name
                .clone()
                .unwrap_or_else(|| operation.target_name.clone()),
            item_id: operation.item_id.clone(),
            scope: operation.scope.clone(),
        };
        let report = match get_progress(opctx.clone(), args).await {
            Ok(Some(report)) => report,
            // Nothing new to report: the record stands.
            Ok(None) => return Ok(operation),
            Err(error) => {
                // A failing poll is transient: leave the record unchanged
                // rather than failing the read or guessing a terminal
                // state.
                warn!(self.log, "operation progress poll failed";
                    "operation" => &operation.name,
                    "method_key" => &method_key,
                    "error" => %error,
                );
                return Ok(operation);
            }
        };

        self.datastore.item_update::<model::Operation, _>(
            &opctx.project,
            &operation.record_id(),
            |record| {
                // Duplicate application of the same report must be
                // harmless: progress never regresses, and DONE is final.
                if record.status == OperationStatus::Done {
                    return Ok(());
                }
                if let Some(item_id) = &report.item_id {
                    record.item_id = Some(item_id.clone());
                }
                if report.progress > record.progress {
                    record.progress = report.progress.min(100);
                }
                if report.progress >= 100 {
                    record.status = OperationStatus::Done;
                    record.end_time = Some(Utc::now());
                }
                Ok(())
            },
        )
    }
}
