// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for the instance API: views, reset, and access configs

use crate::common::action_post;
use crate::common::expect_failure;
use crate::common::object_delete;
use crate::common::object_get;
use crate::common::object_post;
use crate::common::project_url;
use crate::common::test_setup;
use crate::common::REGION;
use crate::common::ZONE;
use gce_bridge::external_api::params;
use http::Method;
use http::StatusCode;
use serde_json::Value;

fn instance_url(instance: &str) -> String {
    project_url(&format!("/zones/{}/instances/{}", ZONE, instance))
}

#[tokio::test]
async fn test_instance_views_and_reset() {
    let cptestctx = test_setup("test_instance_views_and_reset").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);

    let list: Value = object_get(
        client,
        &project_url(&format!("/zones/{}/instances", ZONE)),
    )
    .await;
    assert_eq!(list["kind"], "compute#instanceList");
    assert_eq!(list["items"].as_array().unwrap().len(), 1);

    let instance: Value = object_get(client, &instance_url("inst-1")).await;
    assert_eq!(instance["kind"], "compute#instance");
    assert_eq!(instance["status"], "RUNNING");
    assert_eq!(instance["networkInterfaces"][0]["name"], "nic0");
    assert!(instance["zone"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/zones/{}", ZONE)));

    let aggregated: Value =
        object_get(client, &project_url("/aggregated/instances")).await;
    let scoped =
        &aggregated["items"][&format!("zones/{}", ZONE)]["instances"];
    assert_eq!(scoped.as_array().unwrap().len(), 1);

    let operation: Value =
        action_post(client, &format!("{}/reset", instance_url("inst-1")))
            .await;
    assert_eq!(operation["operationType"], "reset");
    assert_eq!(operation["status"], "DONE");
    assert!(operation["zone"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/zones/{}", ZONE)));

    expect_failure(
        client,
        Method::POST,
        &format!("{}/reset", instance_url("no-such-instance")),
        StatusCode::NOT_FOUND,
    )
    .await;

    cptestctx.teardown().await;
}

/// Access configs tie a reserved address to an instance: the address shows
/// up as IN_USE, cannot be released while bound, and goes back to RESERVED
/// once the access config is removed.
#[tokio::test]
async fn test_access_config_binds_reserved_address() {
    let cptestctx =
        test_setup("test_access_config_binds_reserved_address").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);

    let addresses_url = project_url(&format!("/regions/{}/addresses", REGION));
    let address_url = format!("{}/ip-one", addresses_url);
    let _: Value = object_post(
        client,
        &addresses_url,
        &params::AddressCreate {
            name: String::from("ip-one"),
            description: None,
        },
    )
    .await;
    let address: Value = object_get(client, &address_url).await;
    let nat_ip = address["address"].as_str().unwrap().to_string();

    let operation: Value = object_post(
        client,
        &format!(
            "{}/addAccessConfig?networkInterface=default",
            instance_url("inst-1")
        ),
        &params::AccessConfigCreate {
            name: Some(String::from("nat-1")),
            kind: None,
            nat_ip: Some(nat_ip.clone()),
        },
    )
    .await;
    assert_eq!(operation["operationType"], "addAccessConfig");
    assert_eq!(operation["status"], "DONE");

    // The instance view shows the NAT binding and the address is in use.
    let instance: Value = object_get(client, &instance_url("inst-1")).await;
    let access_configs =
        &instance["networkInterfaces"][0]["accessConfigs"];
    assert_eq!(access_configs.as_array().unwrap().len(), 1);
    assert_eq!(access_configs[0]["natIP"], nat_ip.as_str());
    assert_eq!(access_configs[0]["type"], "ONE_TO_ONE_NAT");

    let address: Value = object_get(client, &address_url).await;
    assert_eq!(address["status"], "IN_USE");
    assert_eq!(address["users"][0], "inst-1");

    let error = expect_failure(
        client,
        Method::DELETE,
        &address_url,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(
        error.message,
        "address \"ip-one\" is in use by instance \"inst-1\""
    );

    // Remove the access config; the address is free again.
    let operation: Value = action_post(
        client,
        &format!(
            "{}/deleteAccessConfig?accessConfig=nat-1\
             &networkInterface=default",
            instance_url("inst-1")
        ),
    )
    .await;
    assert_eq!(operation["operationType"], "deleteAccessConfig");
    assert_eq!(operation["status"], "DONE");

    let address: Value = object_get(client, &address_url).await;
    assert_eq!(address["status"], "RESERVED");

    let operation: Value = object_delete(client, &address_url).await;
    assert_eq!(operation["status"], "DONE");

    cptestctx.teardown().await;
}

/// Access config validation: unsupported types and unknown interfaces are
/// client errors; an ephemeral config (no natIP) allocates its own IP.
#[tokio::test]
async fn test_access_config_validation_and_ephemeral() {
    let cptestctx =
        test_setup("test_access_config_validation_and_ephemeral").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);

    let add_url = format!(
        "{}/addAccessConfig?networkInterface=default",
        instance_url("inst-1")
    );

    let error = crate::common::expect_failure_with_body(
        client,
        Method::POST,
        &add_url,
        &params::AccessConfigCreate {
            name: None,
            kind: Some(String::from("DHCP")),
            nat_ip: None,
        },
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(error.message, "access config type \"DHCP\" is not supported");

    let error = crate::common::expect_failure_with_body(
        client,
        Method::POST,
        &format!(
            "{}/addAccessConfig?networkInterface=nope",
            instance_url("inst-1")
        ),
        &params::AccessConfigCreate { name: None, kind: None, nat_ip: None },
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(
        error.message,
        "instance \"inst-1\" has no interface \"nope\""
    );

    // Ephemeral: no natIP in the request, one shows up on the instance.
    let operation: Value = object_post(
        client,
        &add_url,
        &params::AccessConfigCreate { name: None, kind: None, nat_ip: None },
    )
    .await;
    assert_eq!(operation["status"], "DONE");
    let instance: Value = object_get(client, &instance_url("inst-1")).await;
    let access_configs =
        &instance["networkInterfaces"][0]["accessConfigs"];
    assert_eq!(access_configs[0]["name"], "External NAT");
    assert!(access_configs[0]["natIP"]
        .as_str()
        .unwrap()
        .starts_with("172.24.4."));

    cptestctx.teardown().await;
}
