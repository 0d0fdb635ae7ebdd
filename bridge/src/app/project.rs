// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Project API
//!
//! Projects map to backend tenants.  The bridge performs no tenant
//! management of its own; the only operation is rendering the tenant the
//! request addressed.

use crate::context::OpContext;
use gce_bridge_common::api::LookupResult;

#[derive(Clone)]
pub struct ProjectInfo {
    pub name: String,
}

pub struct ProjectApi;

impl ProjectApi {
    pub fn new() -> ProjectApi {
        ProjectApi
    }

    pub async fn get(&self, opctx: &OpContext) -> LookupResult<ProjectInfo> {
        Ok(ProjectInfo { name: opctx.project.clone() })
    }
}
