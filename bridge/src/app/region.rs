// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region API
//!
//! The backing cloud is a single region whose name comes from the bridge
//! configuration; its zones are the backend's availability zones.

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
pub struct RegionInfo {
    pub name: String,
    pub zones: Vec<String>,
}

pub struct RegionApi {
    compute: Arc<dyn ComputeBackend>,
    region: String,
}

impl RegionApi {
    pub fn new(compute: Arc<dyn ComputeBackend>, region: String) -> RegionApi {
        RegionApi { compute, region }
    }
}

#[async_trait]
impl ResourceApi for RegionApi {
    type Item = RegionInfo;
    type CreateParams = ();

    fn resource_type(&self) -> ResourceType {
        ResourceType::Region
    }

    async fn get_item(
        &self,
        opctx: &OpContext,
        name: &str,
        scope: &Scope,
    ) -> LookupResult<RegionInfo> {
        self.get_items(opctx, scope)
            .await?
            .into_iter()
            .find(|region| region.name == name)
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Region, name)
            })
    }

    async fn get_items(
        &self,
        _opctx: &OpContext,
        _scope: &Scope,
    ) -> ListResultVec<RegionInfo> {
        let zones = self.compute.availability_zones().await?;
        Ok(vec![RegionInfo { name: self.region.clone(), zones }])
    }

    async fn add_item(
        &self,
        _opctx: &OpContext,
        _create_params: (),
        _scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        Err(Error::invalid_request("regions cannot be created"))
    }

    async fn delete_item(
        &self,
        _opctx: &OpContext,
        _name: &str,
        _scope: &Scope,
    ) -> CreateResult<PendingOperation> {
        Err(Error::invalid_request("regions cannot be deleted"))
    }
}
