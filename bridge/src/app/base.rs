// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common contract for resource APIs, plus the callback bus that lets one
//! resource API react to another's lifecycle events without a direct
//! dependency between them

use crate::app::operation::PendingOperation;
use crate::context::OpContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use gce_bridge_common::api::ResourceType;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

/// Uniform contract implemented by the per-resource APIs
///
/// Mutations return a [`PendingOperation`] rather than a finished record:
/// the resource API performs validation and backend side effects and
/// decides whether the call completed synchronously; the controller commits
/// the pending operation through the operation manager and renders the
/// resulting envelope.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    type Item: Clone + Send + Sync;
    type CreateParams: Send + Sync;

    fn resource_type(&self) -> ResourceType;

    /// Fails `ObjectNotFound` if no item matches; an ambiguous match (more
    /// than one) is an internal error, reported rather than silently
    /// resolved.
    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<Self::Item>;

    /// Returns the empty vector when nothing matches; never fails for "no
    /// results".
    async fn get_items(
        &self,
        opctx: &OpContext,
        scope: &Scope,
    ) -> ListResultVec<Self::Item>;

    async fn add_item(
        &self,
        opctx: &OpContext,
        params: Self::CreateParams,
        scope: &Scope,
    ) -> CreateResult<PendingOperation>;

    async fn delete_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> CreateResult<PendingOperation>;

    /// Scopes the given item belongs to, for aggregated-list fan-out.  The
    /// default means "not aggregatable".
    async fn get_scopes(
        &self,
        _opctx: &OpContext,
        _item: &Self::Item,
    ) -> ListResultVec<Scope> {
        Ok(Vec::new())
    }
}

/// Groups a resource API's items by scope path for an aggregated list
/// response.
pub async fn aggregate<A: ResourceApi>(
    api: &A,
    opctx: &OpContext,
) -> Result<BTreeMap<String, Vec<A::Item>>, Error> {
    let items = api.get_items(opctx, &Scope::Aggregated).await?;
    let mut grouped: BTreeMap<String, Vec<A::Item>> = BTreeMap::new();
    for item in items {
        for scope in api.get_scopes(opctx, &item).await? {
            grouped.entry(scope.path()).or_default().push(item.clone());
        }
    }
    Ok(grouped)
}

/// Lifecycle events a dependent API can subscribe to
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reason {
    /// Veto point: a callback may fail to block the deletion entirely
    CheckDelete,
    /// Cleanup before the resource disappears
    PreDelete,
    /// Reaction after a resource was created
    PostAdd,
}

pub type CallbackFn<T> = Arc<
    dyn Fn(OpContext, T) -> BoxFuture<'static, Result<(), Error>>
        + Send
        + Sync,
>;

/// Ordered, reason-keyed list of callbacks owned by the API whose lifecycle
/// is being observed
///
/// Registration happens during bridge wiring, before requests are served;
/// the list never shrinks.  Callbacks run synchronously within the emitting
/// API's mutation, in registration order, and the first failure aborts the
/// mutation.
pub struct CallbackBus<T> {
    callbacks: RwLock<Vec<(Reason, CallbackFn<T>)>>,
}

impl<T: Clone + Send + 'static> CallbackBus<T> {
    pub fn new() -> CallbackBus<T> {
        CallbackBus { callbacks: RwLock::new(Vec::new()) }
    }

    pub fn register(&self, reason: Reason, callback: CallbackFn<T>) {
        self.callbacks.write().unwrap().push((reason, callback));
    }

    pub async fn process(
        &self,
        opctx: &OpContext,
        reason: Reason,
        item: &T,
    ) -> Result<(), Error> {
        let matching: Vec<CallbackFn<T>> = self
            .callbacks
            .read()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == reason)
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in matching {
            callback(opctx.clone(), item.clone()).await?;
        }
        Ok(())
    }
}
