// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for the address API

use crate::common::expect_failure;
use crate::common::expect_failure_with_body;
use crate::common::object_delete;
use crate::common::object_get;
use crate::common::object_post;
use crate::common::project_url;
use crate::common::test_setup;
use crate::common::REGION;
use gce_bridge::external_api::params;
use http::Method;
use http::StatusCode;
use serde_json::Value;

fn addresses_url() -> String {
    project_url(&format!("/regions/{}/addresses", REGION))
}

fn address_url(name: &str) -> String {
    project_url(&format!("/regions/{}/addresses/{}", REGION, name))
}

fn address_create(name: &str) -> params::AddressCreate {
    params::AddressCreate { name: String::from(name), description: None }
}

/// Reserving and releasing an address: both mutations are synchronous
/// underneath, so both operations come back DONE, and the released address
/// is gone on the next read.
#[tokio::test]
async fn test_address_lifecycle() {
    let cptestctx = test_setup("test_address_lifecycle").await;
    let client = &cptestctx.external_client;

    let operation: Value = object_post(
        client,
        &addresses_url(),
        &address_create("ip-172-24-4-227"),
    )
    .await;
    assert_eq!(operation["operationType"], "insert");
    assert_eq!(operation["status"], "DONE");

    let address: Value =
        object_get(client, &address_url("ip-172-24-4-227")).await;
    assert_eq!(address["kind"], "compute#address");
    assert_eq!(address["name"], "ip-172-24-4-227");
    assert_eq!(address["status"], "RESERVED");
    assert!(address["address"].as_str().unwrap().starts_with("172.24.4."));

    let operation: Value =
        object_delete(client, &address_url("ip-172-24-4-227")).await;
    assert_eq!(operation["kind"], "compute#operation");
    assert_eq!(operation["operationType"], "delete");
    assert_eq!(operation["status"], "DONE");
    assert_eq!(operation["progress"], 100);

    let error = expect_failure(
        client,
        Method::GET,
        &address_url("ip-172-24-4-227"),
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(
        error.message,
        "not found: address with name \"ip-172-24-4-227\""
    );

    let list: Value = object_get(client, &addresses_url()).await;
    assert_eq!(list["items"].as_array().unwrap().len(), 0);

    cptestctx.teardown().await;
}

#[tokio::test]
async fn test_address_duplicate_name() {
    let cptestctx = test_setup("test_address_duplicate_name").await;
    let client = &cptestctx.external_client;

    let _: Value =
        object_post(client, &addresses_url(), &address_create("ip-one"))
            .await;
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &addresses_url(),
        &address_create("ip-one"),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(error.error_code.as_deref(), Some("ObjectAlreadyExists"));

    cptestctx.teardown().await;
}

/// The filter grammar is exactly `<field> (eq|ne) '<value>'`; anything
/// else is ignored rather than rejected.
#[tokio::test]
async fn test_address_list_filtering() {
    let cptestctx = test_setup("test_address_list_filtering").await;
    let client = &cptestctx.external_client;

    for name in ["ip-one", "ip-two"] {
        let _: Value =
            object_post(client, &addresses_url(), &address_create(name))
                .await;
    }

    let list: Value = object_get(
        client,
        &format!("{}?filter=name%20eq%20'ip-one'", addresses_url()),
    )
    .await;
    let items = list["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "ip-one");

    let list: Value = object_get(
        client,
        &format!("{}?filter=name%20ne%20'ip-one'", addresses_url()),
    )
    .await;
    let items = list["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "ip-two");

    // Malformed filters return the full, unfiltered list with a 200.
    let list: Value = object_get(
        client,
        &format!("{}?filter=malformed%20garbage%20here", addresses_url()),
    )
    .await;
    assert_eq!(list["items"].as_array().unwrap().len(), 2);

    cptestctx.teardown().await;
}

#[tokio::test]
async fn test_address_aggregated_list() {
    let cptestctx = test_setup("test_address_aggregated_list").await;
    let client = &cptestctx.external_client;

    let _: Value =
        object_post(client, &addresses_url(), &address_create("ip-one"))
            .await;

    let aggregated: Value =
        object_get(client, &project_url("/aggregated/addresses")).await;
    assert_eq!(aggregated["kind"], "compute#addressAggregatedList");
    let scoped =
        &aggregated["items"][&format!("regions/{}", REGION)]["addresses"];
    assert_eq!(scoped.as_array().unwrap().len(), 1);
    assert_eq!(scoped[0]["name"], "ip-one");

    cptestctx.teardown().await;
}
