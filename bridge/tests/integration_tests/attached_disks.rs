// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for asynchronous disk attachment
//!
//! These exercise the deferred-operation path end to end: the mutation
//! returns a RUNNING operation, polling it while the backend is still
//! working changes nothing, and the operation completes only after the
//! simulated volume settles.

use crate::common::action_post;
use crate::common::expect_failure_with_body;
use crate::common::object_get;
use crate::common::object_post;
use crate::common::project_url;
use crate::common::test_setup;
use crate::common::ZONE;
use gce_bridge::external_api::params;
use http::Method;
use http::StatusCode;
use serde_json::Value;

fn instance_get_url(instance: &str) -> String {
    project_url(&format!("/zones/{}/instances/{}", ZONE, instance))
}

fn instance_url(instance: &str, action: &str) -> String {
    format!("{}/{}", instance_get_url(instance), action)
}

fn operation_url(name: &str) -> String {
    project_url(&format!("/zones/{}/operations/{}", ZONE, name))
}

fn attach_body(source: &str) -> params::AttachedDiskCreate {
    params::AttachedDiskCreate {
        source: String::from(source),
        device_name: None,
    }
}

#[tokio::test]
async fn test_attach_disk_lifecycle() {
    let cptestctx = test_setup("test_attach_disk_lifecycle").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);
    cptestctx.sim.volume_create("vol-1", 10);

    // Issue the attach.  The backend hasn't completed it, so the operation
    // is RUNNING from the start.
    let operation: Value = object_post(
        client,
        &instance_url("inst-1", "attachDisk"),
        &attach_body("vol-1"),
    )
    .await;
    assert_eq!(operation["operationType"], "attachDisk");
    assert_eq!(operation["status"], "RUNNING");
    assert_eq!(operation["progress"], 0);
    assert!(operation.get("endTime").is_none());
    let name = operation["name"].as_str().unwrap().to_string();

    // Polling while the volume is still attaching reports no change.
    let polled: Value = object_get(client, &operation_url(&name)).await;
    assert_eq!(polled["status"], "RUNNING");
    assert_eq!(polled["progress"], 0);

    // The attachment record is visible on the instance immediately.
    let instance: Value =
        object_get(client, &instance_get_url("inst-1")).await;
    let disks = instance["disks"].as_array().unwrap();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0]["deviceName"], "persistent-disk-0");

    // Once the backend settles, the next poll completes the operation.
    cptestctx.sim.volume_settle("vol-1");
    let polled: Value = object_get(client, &operation_url(&name)).await;
    assert_eq!(polled["status"], "DONE");
    assert_eq!(polled["progress"], 100);
    assert!(polled.get("endTime").is_some());

    // Detach mirrors the attach: deferred until the volume is available
    // again, at which point the attachment record disappears.
    let operation: Value = action_post(
        client,
        &format!(
            "{}?deviceName=persistent-disk-0",
            instance_url("inst-1", "detachDisk")
        ),
    )
    .await;
    assert_eq!(operation["operationType"], "detachDisk");
    assert_eq!(operation["status"], "RUNNING");
    let name = operation["name"].as_str().unwrap().to_string();

    let polled: Value = object_get(client, &operation_url(&name)).await;
    assert_eq!(polled["status"], "RUNNING");

    cptestctx.sim.volume_settle("vol-1");
    let polled: Value = object_get(client, &operation_url(&name)).await;
    assert_eq!(polled["status"], "DONE");

    let instance: Value =
        object_get(client, &instance_get_url("inst-1")).await;
    assert_eq!(instance["disks"].as_array().unwrap().len(), 0);

    cptestctx.teardown().await;
}

#[tokio::test]
async fn test_attach_disk_validation() {
    let cptestctx = test_setup("test_attach_disk_validation").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);
    cptestctx.sim.volume_create("vol-1", 10);

    // Unknown disk.
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &instance_url("inst-1", "attachDisk"),
        &attach_body("no-such-disk"),
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(error.message, "not found: disk with name \"no-such-disk\"");

    // Unknown instance.
    expect_failure_with_body(
        client,
        Method::POST,
        &instance_url("no-such-instance", "attachDisk"),
        &attach_body("vol-1"),
        StatusCode::NOT_FOUND,
    )
    .await;

    // A volume mid-attach is not available for a second attachment.
    let _: Value = object_post(
        client,
        &instance_url("inst-1", "attachDisk"),
        &attach_body("vol-1"),
    )
    .await;
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &instance_url("inst-1", "attachDisk"),
        &attach_body("vol-1"),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert!(
        error.message.contains("is attaching"),
        "unexpected message: {}",
        error.message
    );

    // Explicit device names must be free.
    cptestctx.sim.volume_create("vol-2", 10);
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &instance_url("inst-1", "attachDisk"),
        &params::AttachedDiskCreate {
            source: String::from("vol-2"),
            device_name: Some(String::from("persistent-disk-0")),
        },
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert!(
        error.message.contains("already in use"),
        "unexpected message: {}",
        error.message
    );

    cptestctx.teardown().await;
}

/// The device-name pool is finite; exhausting it is a quota error, not a
/// validation error.
#[tokio::test]
async fn test_attach_disk_device_name_exhaustion() {
    let cptestctx =
        test_setup("test_attach_disk_device_name_exhaustion").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);

    for index in 0..16 {
        let volume = format!("vol-{}", index);
        cptestctx.sim.volume_create(&volume, 1);
        let operation: Value = object_post(
            client,
            &instance_url("inst-1", "attachDisk"),
            &attach_body(&volume),
        )
        .await;
        assert_eq!(operation["status"], "RUNNING");
    }

    cptestctx.sim.volume_create("vol-16", 1);
    let error = expect_failure_with_body(
        client,
        Method::POST,
        &instance_url("inst-1", "attachDisk"),
        &attach_body("vol-16"),
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(error.error_code.as_deref(), Some("OverQuota"));
    assert!(
        error.message.contains("no free device names"),
        "unexpected message: {}",
        error.message
    );

    cptestctx.teardown().await;
}

/// A full resource URL works as the attach source too.
#[tokio::test]
async fn test_attach_disk_source_url() {
    let cptestctx = test_setup("test_attach_disk_source_url").await;
    let client = &cptestctx.external_client;
    cptestctx.sim.server_create("inst-1", ZONE, vec![String::from("default")]);
    cptestctx.sim.volume_create("vol-1", 10);

    let source = format!(
        "http://gce.example.com/compute/v1/projects/fake-project/zones/{}\
         /disks/vol-1",
        ZONE
    );
    let operation: Value = object_post(
        client,
        &instance_url("inst-1", "attachDisk"),
        &attach_body(&source),
    )
    .await;
    assert_eq!(operation["status"], "RUNNING");

    cptestctx.teardown().await;
}
