// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facilities for testing the bridge's HTTP server

use anyhow::ensure;
use anyhow::Context;
use dropshot::test_util::ClientTestContext;

/// Convenient way to make an outgoing HTTP request and verify properties
/// of the response for testing
pub struct RequestBuilder<'a> {
    testctx: &'a ClientTestContext,

    method: http::Method,
    uri: http::Uri,
    body: hyper::Body,
    error: Option<anyhow::Error>,

    expected_status: Option<http::StatusCode>,
}

impl<'a> RequestBuilder<'a> {
    /// Start building a request with the given `method` and `uri`
    pub fn new(
        testctx: &'a ClientTestContext,
        method: http::Method,
        uri: &str,
    ) -> Self {
        let uri = testctx.url(uri);
        RequestBuilder {
            testctx,
            method,
            uri,
            body: hyper::Body::empty(),
            error: None,
            expected_status: None,
        }
    }

    /// Set the outgoing request body to the result of serializing `body`
    ///
    /// If `body` is `None`, the request body will be empty.
    pub fn body<RequestBodyType: serde::Serialize>(
        mut self,
        body: Option<RequestBodyType>,
    ) -> Self {
        let new_body = body.map(|b| {
            serde_json::to_string(&b)
                .context("failed to serialize request body")
        });
        match new_body {
            Some(Err(error)) => self.error = Some(error),
            Some(Ok(new_body)) => self.body = hyper::Body::from(new_body),
            None => self.body = hyper::Body::empty(),
        };
        self
    }

    /// Record that we expect to get status code `expected_status` in the
    /// response
    pub fn expect_status(
        mut self,
        expected_status: Option<http::StatusCode>,
    ) -> Self {
        self.expected_status = expected_status;
        self
    }

    /// Make the HTTP request, verify the returned response, and make the
    /// response available to the caller
    pub async fn execute(self) -> Result<TestResponse, anyhow::Error> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let request = http::Request::builder()
            .method(self.method)
            .uri(self.uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(self.body)
            .context("failed to construct request")?;

        let mut response = self
            .testctx
            .client
            .request(request)
            .await
            .context("making request to server")?;

        let status = response.status();
        if let Some(expected_status) = self.expected_status {
            ensure!(
                expected_status == status,
                "expected status code {}, found {}",
                expected_status,
                status
            );
        }

        let request_id_header = response
            .headers()
            .get(dropshot::HEADER_REQUEST_ID)
            .context("missing request id header")?
            .to_str()
            .context("parsing request-id header as string")?
            .to_string();

        let response_body = hyper::body::to_bytes(response.body_mut())
            .await
            .context("reading response body")?;

        let test_response = TestResponse {
            status,
            headers: response.headers().clone(),
            body: response_body,
        };

        // For errors of any kind, check that the body is a well-formed
        // error envelope whose request id matches the header.
        if status.is_client_error() || status.is_server_error() {
            let error_body = test_response
                .parsed_body::<dropshot::HttpErrorResponseBody>()
                .context("parsing error body")?;
            ensure!(
                error_body.request_id == request_id_header,
                "expected error response body to have request id {:?}, \
                 but found {:?}",
                request_id_header,
                error_body.request_id
            );
        }

        Ok(test_response)
    }
}

/// Represents a response from an HTTP server
pub struct TestResponse {
    pub status: http::StatusCode,
    pub headers: http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Parse the response body as an instance of `R` and return it
    pub fn parsed_body<R: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<R, anyhow::Error> {
        serde_json::from_slice(self.body.as_ref())
            .context("parsing response body")
    }
}
