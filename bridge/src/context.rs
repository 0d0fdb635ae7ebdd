// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared state used by API request handlers

use crate::app::Bridge;
use crate::backend::Backends;
use crate::config::Config;
use crate::external_api::views::LinkContext;
use dropshot::RequestContext;
use slog::o;
use slog::Logger;
use std::sync::Arc;

/// Shared state available to all API request handlers
pub struct ServerContext {
    /// reference to the underlying bridge
    pub bridge: Arc<Bridge>,
    /// debug log
    pub log: Logger,
    /// URL base used when rendering `selfLink`/`targetLink` fields
    pub external_url: String,
}

impl ServerContext {
    /// Create a new context with the given log.  This creates the
    /// underlying bridge as well.
    pub fn new(
        log: &Logger,
        config: &Config,
        backends: Backends,
    ) -> Arc<ServerContext> {
        Arc::new(ServerContext {
            bridge: Bridge::new(
                log.new(o!("component" => "bridge")),
                &config.bridge,
                backends,
            ),
            log: log.clone(),
            external_url: config.bridge.external_url.clone(),
        })
    }

    pub fn link_context(&self, project: &str) -> LinkContext {
        LinkContext {
            base_url: self.external_url.clone(),
            project: String::from(project),
        }
    }
}

/// Per-request context threaded through every API call
///
/// This is the explicit value that replaces ambient request-local state:
/// the tenant the request addresses and the identity of the caller, which
/// ends up in the `user` field of any operation the request creates.
#[derive(Clone)]
pub struct OpContext {
    pub log: Logger,
    pub project: String,
    pub user: String,
}

impl OpContext {
    pub fn for_external_api(
        rqctx: &RequestContext<Arc<ServerContext>>,
        project: &str,
    ) -> OpContext {
        // There is no authentication layer in front of the bridge; the
        // caller identity comes from the proxy header when present.
        let user = rqctx
            .request
            .headers()
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("admin")
            .to_string();
        OpContext {
            log: rqctx.log.new(o!("project" => String::from(project))),
            project: String::from(project),
            user,
        }
    }

    pub fn for_tests(project: &str) -> OpContext {
        OpContext {
            log: Logger::root(slog::Discard, o!()),
            project: String::from(project),
            user: String::from("test-user"),
        }
    }
}
