// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared facilities for integration testing the bridge

pub mod http_testing;

use dropshot::test_util::ClientTestContext;
use dropshot::test_util::LogContext;
use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingLevel;
use dropshot::HttpErrorResponseBody;
use gce_bridge::backend::sim::SimCloud;
use gce_bridge::config::BackendMode;
use gce_bridge::config::BridgeConfig;
use gce_bridge::Config;
use gce_bridge::Server;
use http_testing::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::o;
use std::sync::Arc;

pub const PROJECT: &str = "fake-project";
pub const REGION: &str = "nova";
pub const ZONE: &str = "nova";
pub const BASE_URL: &str = "http://gce.example.com";

pub struct BridgeTestContext {
    pub logctx: LogContext,
    pub server: Server,
    pub external_client: ClientTestContext,
    pub sim: Arc<SimCloud>,
}

impl BridgeTestContext {
    pub async fn teardown(self) {
        self.server.close().await.expect("failed to stop server");
        self.logctx.cleanup_successful();
    }
}

/// Starts a bridge server over a fresh simulated cloud.
pub async fn test_setup(test_name: &str) -> BridgeTestContext {
    let logging =
        ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info };
    let logctx = LogContext::new(test_name, &logging);

    let config = Config {
        dropshot: ConfigDropshot {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        },
        log: logging,
        bridge: BridgeConfig {
            region: String::from(REGION),
            external_url: String::from(BASE_URL),
            backend: BackendMode::Sim,
        },
    };

    let sim = SimCloud::new(vec![String::from(ZONE)]);
    let server = Server::start(&config, &logctx.log, sim.backends())
        .await
        .expect("failed to start bridge server");
    let external_client = ClientTestContext::new(
        server.local_addr(),
        logctx.log.new(o!("component" => "external client")),
    );
    BridgeTestContext { logctx, server, external_client, sim }
}

/// Builds a URI under the test project.
pub fn project_url(suffix: &str) -> String {
    format!("/compute/v1/projects/{}{}", PROJECT, suffix)
}

pub async fn object_get<T: DeserializeOwned>(
    client: &ClientTestContext,
    uri: &str,
) -> T {
    RequestBuilder::new(client, http::Method::GET, uri)
        .expect_status(Some(http::StatusCode::OK))
        .execute()
        .await
        .unwrap_or_else(|error| panic!("GET {}: {:#}", uri, error))
        .parsed_body()
        .unwrap_or_else(|error| panic!("GET {}: {:#}", uri, error))
}

pub async fn object_post<B: Serialize, T: DeserializeOwned>(
    client: &ClientTestContext,
    uri: &str,
    body: &B,
) -> T {
    RequestBuilder::new(client, http::Method::POST, uri)
        .body(Some(body))
        .expect_status(Some(http::StatusCode::OK))
        .execute()
        .await
        .unwrap_or_else(|error| panic!("POST {}: {:#}", uri, error))
        .parsed_body()
        .unwrap_or_else(|error| panic!("POST {}: {:#}", uri, error))
}

/// POST with an empty body (instance actions like `reset`).
pub async fn action_post<T: DeserializeOwned>(
    client: &ClientTestContext,
    uri: &str,
) -> T {
    RequestBuilder::new(client, http::Method::POST, uri)
        .expect_status(Some(http::StatusCode::OK))
        .execute()
        .await
        .unwrap_or_else(|error| panic!("POST {}: {:#}", uri, error))
        .parsed_body()
        .unwrap_or_else(|error| panic!("POST {}: {:#}", uri, error))
}

/// DELETE returning a body (resource deletions return an operation).
pub async fn object_delete<T: DeserializeOwned>(
    client: &ClientTestContext,
    uri: &str,
) -> T {
    RequestBuilder::new(client, http::Method::DELETE, uri)
        .expect_status(Some(http::StatusCode::OK))
        .execute()
        .await
        .unwrap_or_else(|error| panic!("DELETE {}: {:#}", uri, error))
        .parsed_body()
        .unwrap_or_else(|error| panic!("DELETE {}: {:#}", uri, error))
}

/// Issues a request expected to fail and returns the parsed error body.
pub async fn expect_failure(
    client: &ClientTestContext,
    method: http::Method,
    uri: &str,
    expected_status: http::StatusCode,
) -> HttpErrorResponseBody {
    RequestBuilder::new(client, method, uri)
        .expect_status(Some(expected_status))
        .execute()
        .await
        .unwrap_or_else(|error| panic!("request to {}: {:#}", uri, error))
        .parsed_body()
        .unwrap_or_else(|error| panic!("request to {}: {:#}", uri, error))
}

/// Issues a request with a body expected to fail and returns the parsed
/// error body.
pub async fn expect_failure_with_body<B: Serialize>(
    client: &ClientTestContext,
    method: http::Method,
    uri: &str,
    body: &B,
    expected_status: http::StatusCode,
) -> HttpErrorResponseBody {
    RequestBuilder::new(client, method, uri)
        .body(Some(body))
        .expect_status(Some(expected_status))
        .execute()
        .await
        .unwrap_or_else(|error| panic!("request to {}: {:#}", uri, error))
        .parsed_body()
        .unwrap_or_else(|error| panic!("request to {}: {:#}", uri, error))
}
