// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zone API: availability zones surfaced as GCE zones

use crate::app::base::ResourceApi;
use crate::app::operation::PendingOperation;
use crate::backend::ComputeBackend;
use crate::context::OpContext;
use async_trait::async_trait;
use gce_bridge_common::api::scope::Scope;
use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use gce_bridge_common::api::ResourceType;
use std::sync::Arc;

#[derive(Clone)]
pub struct ZoneInfo {
    pub name: String,
    pub region: String,
}

pub struct ZoneApi {
    compute: Arc<dyn ComputeBackend>,
    region: String,
}

impl ZoneApi {
    pub fn new(compute: Arc<dyn ComputeBackend>, region: String) -> ZoneApi {
        ZoneApi { compute, region }
    }
}

#[async_trait]
impl ResourceApi for ZoneApi {
    type Item = ZoneInfo;
    type CreateParams = ();

    fn resource_type(&self) -> ResourceType {
        ResourceType::Zone
    }

    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<ZoneInfo> {
        self.get_items(opctx, scope)
            .await?
            .into_iter()
            .find(|zone| zone.name == name)
            .ok_or_else(|| Error::not_found_by_name(ResourceType::Zone, name))
    }

    async fn get_items(
        &self,
        _opctx: &OpContext,
        _scope: &Scope,
    ) -> ListResultVec<ZoneInfo> {
        Ok(self
            .compute
            .availability_zones()
            .await?
            .into_iter()
            .map(|name| ZoneInfo { name, region: self.region.clone() })
            .collect())
    }

    async fn add_item(
        &self,
        _opctx: &OpContext,
        _create_params: (),
        _scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        Err(Error::invalid_request("zones cannot be created"))
    }

    async fn delete_item(
        &self,
        _opctx: &OpContext,
        _name: &str,
        _scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        Err(Error::invalid_request("zones cannot be deleted"))
    }
}
