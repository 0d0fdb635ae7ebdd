// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for the operations collection and the operation envelope

use crate::common::expect_failure;
use crate::common::object_post;
use crate::common::project_url;
use crate::common::test_setup;
use crate::common::BASE_URL;
use crate::common::PROJECT;
use crate::common::REGION;
use gce_bridge::external_api::params;
use http::Method;
use http::StatusCode;
use serde_json::Value;

/// The operation envelope reproduces the GCE wire format field-for-field.
#[tokio::test]
async fn test_operation_envelope() {
    let cptestctx = test_setup("test_operation_envelope").await;
    let client = &cptestctx.external_client;

    let operation: Value = object_post(
        client,
        &project_url(&format!("/regions/{}/addresses", REGION)),
        &params::AddressCreate {
            name: String::from("ip-one"),
            description: None,
        },
    )
    .await;

    let object = operation.as_object().expect("operation was not an object");
    let mut keys = object.keys().map(String::as_str).collect::<Vec<&str>>();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "endTime",
            "id",
            "insertTime",
            "kind",
            "name",
            "operationType",
            "progress",
            "region",
            "selfLink",
            "startTime",
            "status",
            "targetId",
            "targetLink",
            "user",
        ]
    );

    assert_eq!(operation["kind"], "compute#operation");
    assert_eq!(operation["operationType"], "insert");
    assert_eq!(operation["status"], "DONE");
    assert_eq!(operation["progress"], 100);
    assert_eq!(operation["user"], "admin");
    let name = operation["name"].as_str().unwrap();
    assert!(name.starts_with("operation-"), "bad name: {}", name);
    assert_eq!(
        operation["targetLink"],
        format!(
            "{}/compute/v1/projects/{}/regions/{}/addresses/ip-one",
            BASE_URL, PROJECT, REGION
        )
    );
    assert_eq!(
        operation["selfLink"],
        format!(
            "{}/compute/v1/projects/{}/regions/{}/operations/{}",
            BASE_URL, PROJECT, REGION, name
        )
    );
    assert_eq!(
        operation["region"],
        format!(
            "{}/compute/v1/projects/{}/regions/{}",
            BASE_URL, PROJECT, REGION
        )
    );

    cptestctx.teardown().await;
}

/// Operations land in the scope of the mutation that created them and are
/// visible through the matching collection only (plus the aggregated
/// view).
#[tokio::test]
async fn test_operation_scopes() {
    let cptestctx = test_setup("test_operation_scopes").await;
    let client = &cptestctx.external_client;

    let _: Value = object_post(
        client,
        &project_url(&format!("/regions/{}/addresses", REGION)),
        &params::AddressCreate {
            name: String::from("ip-one"),
            description: None,
        },
    )
    .await;
    let _: Value = object_post(
        client,
        &project_url("/global/networks"),
        &params::NetworkCreate {
            name: String::from("net-1"),
            description: None,
            ipv4_range: None,
            gateway_ipv4: None,
        },
    )
    .await;

    let global: Value =
        crate::common::object_get(client, &project_url("/global/operations"))
            .await;
    assert_eq!(global["kind"], "compute#operationList");
    assert_eq!(global["items"].as_array().unwrap().len(), 1);
    assert_eq!(global["items"][0]["operationType"], "insert");
    let target_link = global["items"][0]["targetLink"].as_str().unwrap();
    assert!(
        target_link.ends_with("/global/networks/net-1"),
        "unexpected targetLink: {}",
        target_link
    );

    let regional: Value = crate::common::object_get(
        client,
        &project_url(&format!("/regions/{}/operations", REGION)),
    )
    .await;
    assert_eq!(regional["items"].as_array().unwrap().len(), 1);

    let aggregated: Value = crate::common::object_get(
        client,
        &project_url("/aggregated/operations"),
    )
    .await;
    assert_eq!(aggregated["kind"], "compute#operationAggregatedList");
    let items = aggregated["items"].as_object().unwrap();
    assert_eq!(
        items["global"]["operations"].as_array().unwrap().len(),
        1
    );
    assert_eq!(
        items[&format!("regions/{}", REGION)]["operations"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    cptestctx.teardown().await;
}

/// Operations can be deleted from their collection, and lookups honor the
/// scope they were created under.
#[tokio::test]
async fn test_operation_delete_and_lookup() {
    let cptestctx = test_setup("test_operation_delete_and_lookup").await;
    let client = &cptestctx.external_client;

    let operation: Value = object_post(
        client,
        &project_url(&format!("/regions/{}/addresses", REGION)),
        &params::AddressCreate {
            name: String::from("ip-one"),
            description: None,
        },
    )
    .await;
    let name = operation["name"].as_str().unwrap();

    // A regional operation is not visible through the global collection.
    expect_failure(
        client,
        Method::GET,
        &project_url(&format!("/global/operations/{}", name)),
        StatusCode::NOT_FOUND,
    )
    .await;

    let uri =
        project_url(&format!("/regions/{}/operations/{}", REGION, name));
    let fetched: Value = crate::common::object_get(client, &uri).await;
    assert_eq!(fetched["name"], name);

    crate::common::http_testing::RequestBuilder::new(
        client,
        Method::DELETE,
        &uri,
    )
    .expect_status(Some(StatusCode::NO_CONTENT))
    .execute()
    .await
    .expect("failed to delete operation");

    let error =
        expect_failure(client, Method::GET, &uri, StatusCode::NOT_FOUND)
            .await;
    assert!(
        error.message.contains("not found: operation"),
        "unexpected message: {}",
        error.message
    );

    cptestctx.teardown().await;
}
