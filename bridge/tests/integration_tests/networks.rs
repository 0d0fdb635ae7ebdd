// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for the network and firewall APIs, including the cross-resource
//! callbacks on network deletion and firewall creation

use crate::common::expect_failure;
use crate::common::expect_failure_with_body;
use crate::common::object_delete;
use crate::common::object_get;
use crate::common::object_post;
use crate::common::project_url;
use crate::common::test_setup;
use crate::common::ZONE;
use gce_bridge::external_api::params;
use http::Method;
use http::StatusCode;
use serde_json::Value;

fn network_create(name: &str) -> params::NetworkCreate {
    params::NetworkCreate {
        name: String::from(name),
        description: None,
        ipv4_range: Some(String::from("10.240.0.0/16")),
        gateway_ipv4: None,
    }
}

fn firewall_create(name: &str, network: &str) -> params::FirewallCreate {
    params::FirewallCreate {
        name: String::from(name),
        description: None,
        network: Some(String::from(network)),
        allowed: vec![params::FirewallRuleParams {
            ip_protocol: String::from("tcp"),
            ports: Some(vec![String::from("80")]),
        }],
        source_ranges: None,
    }
}

/// Deleting a network cascades into removal of its firewalls (the
/// firewall API's `PreDelete` subscription) when nothing vetoes the
/// deletion.
#[tokio::test]
async fn test_network_delete_cascades_firewalls() {
    let cptestctx = test_setup("test_network_delete_cascades_firewalls").await;
    let client = &cptestctx.external_client;

    let _: Value = object_post(
        client,
        &project_url("/global/networks"),
        &network_create("net-1"),
    )
    .await;
    let operation: Value = object_post(
        client,
        &project_url("/global/firewalls"),
        &firewall_create("fw-1", "global/networks/net-1"),
    )
    .await;
    assert_eq!(operation["operationType"], "insert");
    assert_eq!(operation["status"], "DONE");

    let firewall: Value =
        object_get(client, &project_url("/global/firewalls/fw-1")).await;
    assert_eq!(firewall["kind"], "compute#firewall");
    assert_eq!(firewall["allowed"][0]["IPProtocol"], "tcp");
    assert!(firewall["network"]
        .as_str()
        .unwrap()
        .ends_with("/global/networks/net-1"));

    let operation: Value =
        object_delete(client, &project_url("/global/networks/net-1")).await;
    assert_eq!(operation["operationType"], "delete");
    assert_eq!(operation["status"], "DONE");

    expect_failure(
        client,
        Method::GET,
        &project_url("/global/networks/net-1"),
        StatusCode::NOT_FOUND,
    )
    .await;

    // The firewall went with its network.
    let list: Value =
        object_get(client, &project_url("/global/firewalls")).await;
    assert_eq!(list["items"].as_array().unwrap().len(), 0);

    cptestctx.teardown().await;
}

/// A `CheckDelete` veto must leave the network record in place.
#[tokio::test]
async fn test_network_delete_vetoed_while_in_use() {
    let cptestctx =
        test_setup("test_network_delete_vetoed_while_in_use").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("net-db")]);

    let _: Value = object_post(
        client,
        &project_url("/global/networks"),
        &network_create("net-db"),
    )
    .await;

    let error = expect_failure(
        client,
        Method::DELETE,
        &project_url("/global/networks/net-db"),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(
        error.message,
        "network \"net-db\" is in use by instance \"inst-1\""
    );

    // The veto aborted the deletion before any state changed.
    let network: Value =
        object_get(client, &project_url("/global/networks/net-db")).await;
    assert_eq!(network["name"], "net-db");

    cptestctx.teardown().await;
}

/// Creating a firewall applies its security group to the running servers
/// on its network (the instance API's `PostAdd` subscription).
#[tokio::test]
async fn test_firewall_applies_to_running_instances() {
    let cptestctx =
        test_setup("test_firewall_applies_to_running_instances").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("net-app")]);
    cptestctx.sim.server_create("inst-2", ZONE, vec![String::from("other")]);

    let _: Value = object_post(
        client,
        &project_url("/global/networks"),
        &network_create("net-app"),
    )
    .await;
    let _: Value = object_post(
        client,
        &project_url("/global/firewalls"),
        &firewall_create("fw-app", "net-app"),
    )
    .await;

    assert_eq!(
        cptestctx.sim.server_security_groups("inst-1"),
        vec![String::from("fw-app")]
    );
    assert!(cptestctx.sim.server_security_groups("inst-2").is_empty());

    cptestctx.teardown().await;
}

#[tokio::test]
async fn test_firewall_validation() {
    let cptestctx = test_setup("test_firewall_validation").await;
    let client = &cptestctx.external_client;

    let _: Value = object_post(
        client,
        &project_url("/global/networks"),
        &network_create("net-1"),
    )
    .await;

    // Unsupported protocol.
    let mut bad_protocol = firewall_create("fw-bad", "net-1");
    bad_protocol.allowed[0].ip_protocol = String::from("sctp");
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &project_url("/global/firewalls"),
        &bad_protocol,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(
        error.message,
        "unsupported protocol \"sctp\" in firewall rule"
    );

    // A reference to a network that doesn't exist is a 404.
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &project_url("/global/firewalls"),
        &firewall_create("fw-nope", "no-such-network"),
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(
        error.message,
        "not found: network with name \"no-such-network\""
    );

    cptestctx.teardown().await;
}
