/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::config::TimeoutConfig;
use crate::conn::Standard;
use crate::BoxError;
use qsdk_http::handler::{Handler, HandlerFuture};
use qsdk_http::request::Request;
use qsdk_http::result::SdkError;
use std::time::Duration;
use thiserror::Error;
use tower::ServiceExt;
use tracing::{debug, trace};

/// Handler name of the dispatch stage in the `Send` phase
pub const SEND_HANDLER_NAME: &str = "core.SendHandler";

/// An attempt did not complete within its timeout
#[derive(Debug, Error)]
#[error("the request attempt timed out after {0:?}")]
pub struct AttemptTimeout(pub Duration);

/// `Send` phase handler that dispatches the signed request
///
/// The response body is read completely, so `Unmarshal` handlers always see a buffered body.
/// Connection failures and timeouts surface as [`SdkError::TransportError`].
#[derive(Clone, Debug)]
pub struct DispatchHandler {
    connector: Standard,
    timeout_config: TimeoutConfig,
}

impl DispatchHandler {
    pub fn new(connector: Standard, timeout_config: TimeoutConfig) -> Self {
        DispatchHandler {
            connector,
            timeout_config,
        }
    }

    async fn dispatch(&self, request: &mut Request) -> Result<(), SdkError> {
        let http_request = request
            .take_http_request()
            .ok_or_else(|| SdkError::transport("no signed HTTP request to send"))?;
        trace!(method = %http_request.method(), uri = %http_request.uri(), "dispatching request");
        let connector = self.connector.clone();
        let call = async move {
            let response = connector.oneshot(http_request).await?;
            let (parts, body) = response.into_parts();
            let body = hyper::body::to_bytes(body).await?;
            Ok::<_, BoxError>(http::Response::from_parts(parts, body))
        };
        let response = match self.timeout_config.attempt_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| SdkError::transport(AttemptTimeout(limit)))?,
            None => call.await,
        }
        .map_err(|err| {
            debug!(error = %err, "dispatch failed");
            SdkError::transport(err)
        })?;
        trace!(status = %response.status(), "received response");
        request.set_http_response(response);
        Ok(())
    }
}

impl Handler for DispatchHandler {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        Box::pin(self.dispatch(request))
    }
}
