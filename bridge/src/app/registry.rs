// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of deferred operation methods
//!
//! Resource APIs whose mutating methods are asynchronous register a
//! progress-polling function here under an opaque method key during
//! construction of the [`crate::app::Bridge`].  The registry is frozen
//! once the bridge is built: lookups at request time see an immutable
//! table, so no locking is needed.

use crate::context::OpContext;
use futures::future::BoxFuture;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::Error;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Arguments handed to a progress function when an operation is polled
#[derive(Clone, Debug)]
pub struct ProgressArgs {
    /// The operation's `item_name` when set, `target_name` otherwise
    pub name: String,
    /// Store identifier of the affected record, if bound
    pub item_id: Option<String>,
    pub scope: Scope,
}

/// What a progress function learned about its underlying action
///
/// Progress is absolute; reaching 100 means the action is complete.  A
/// function that has nothing new to report returns `None` instead.
#[derive(Clone, Debug)]
pub struct Progress {
    pub progress: i64,
    /// Correction of the operation's bound item id, if the resource API
    /// learned it late
    pub item_id: Option<String>,
}

/// A registered progress-polling function
///
/// Must be side-effect-free with respect to the operation record itself;
/// the operation manager, not the function, persists the merge.
pub type GetProgressFn = Arc<
    dyn Fn(
            OpContext,
            ProgressArgs,
        ) -> BoxFuture<'static, Result<Option<Progress>, Error>>
        + Send
        + Sync,
>;

pub struct OperationRegistry {
    methods: BTreeMap<String, GetProgressFn>,
}

impl OperationRegistry {
    pub fn new() -> OperationRegistry {
        OperationRegistry { methods: BTreeMap::new() }
    }

    /// Binds `method_key` to a progress function.  Each key must be unique
    /// across all resource APIs (by convention namespaced
    /// `"<resource>-<verb>"`); a duplicate registration is a startup bug
    /// and fails so the caller can abort.
    pub fn register(
        &mut self,
        method_key: &str,
        get_progress: GetProgressFn,
    ) -> Result<(), String> {
        if self.methods.contains_key(method_key) {
            return Err(format!(
                "method key {:?} already registered",
                method_key
            ));
        }
        self.methods.insert(String::from(method_key), get_progress);
        Ok(())
    }

    pub fn lookup(&self, method_key: &str) -> Option<GetProgressFn> {
        self.methods.get(method_key).map(Arc::clone)
    }

    pub fn contains_key(&self, method_key: &str) -> bool {
        self.methods.contains_key(method_key)
    }
}
