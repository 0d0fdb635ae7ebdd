// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Library interface to the GCE bridge
//!
//! The bridge exposes a Google Compute Engine-style REST API in front of
//! an OpenStack cloud.  GCE's API contract requires every mutating call to
//! return an asynchronous Operation resource that callers poll for
//! completion; the backend's calls are a mix of synchronous and
//! fire-and-forget asynchronous work, so the core of the bridge is the
//! operation emulation subsystem in [`app::operation`].

// Clippy's style lints are useful, but not worth running automatically.
#![allow(clippy::style)]

pub mod app;
pub mod backend;
pub mod config;
pub mod context;
pub mod db;
pub mod external_api;

pub use app::Bridge;
pub use config::Config;
pub use context::ServerContext;

use backend::sim::SimCloud;
use backend::Backends;
use config::BackendMode;
use external_api::http_entrypoints::external_api;
use slog::info;
use slog::o;
use slog::Logger;
use std::net::SocketAddr;
use std::sync::Arc;

/// A running bridge server
pub struct Server {
    /// shared state used by API request handlers
    pub apictx: Arc<ServerContext>,
    /// dropshot server for the external API
    pub http_server: dropshot::HttpServer<Arc<ServerContext>>,
}

impl Server {
    /// Start a bridge server wired up with the given backends.
    pub async fn start(
        config: &Config,
        log: &Logger,
        backends: Backends,
    ) -> Result<Server, String> {
        info!(log, "setting up bridge server");
        let apictx = ServerContext::new(log, config, backends);
        let server_starter = dropshot::HttpServerStarter::new(
            &config.dropshot,
            external_api(),
            Arc::clone(&apictx),
            &log.new(o!("component" => "dropshot_external")),
        )
        .map_err(|error| format!("initializing external server: {}", error))?;
        let http_server = server_starter.start();
        Ok(Server { apictx, http_server })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.http_server.local_addr()
    }

    /// Wait for the server to shut down
    ///
    /// Note that this doesn't initiate a graceful shutdown, so if you call
    /// this immediately after calling `start()`, the program will block
    /// indefinitely or until something else initiates a graceful shutdown.
    pub async fn wait_for_finish(self) -> Result<(), String> {
        self.http_server.await
    }

    /// Initiate a graceful shutdown and wait for it to complete.
    pub async fn close(self) -> Result<(), String> {
        self.http_server.close().await
    }
}

/// Constructs the backend set named by the configuration.
pub fn backends_from_config(config: &Config) -> Backends {
    match config.bridge.backend {
        BackendMode::Sim => {
            let sim = SimCloud::new(vec![config.bridge.region.clone()]);
            sim.backends()
        }
    }
}

/// Run an instance of the [`Server`].
pub async fn run_server(config: &Config) -> Result<(), String> {
    let log = config
        .log
        .to_logger("gce-bridge")
        .map_err(|message| format!("initializing logger: {}", message))?;
    let backends = backends_from_config(config);
    let server = Server::start(config, &log, backends).await?;
    info!(log, "bridge server listening"; "local_addr" => %server.local_addr());
    server.wait_for_finish().await
}
