/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::signer::{RequestConfig, SigV4Signer, SigningError};
use qsdk_auth::provider::{CredentialsError, ProvideCredentials, SharedCredentialsProvider};
use qsdk_http::handler::{Handler, HandlerFuture};
use qsdk_http::request::Request;
use qsdk_http::result::SdkError;
use qsdk_types::{SigningName, SigningRegion};
use std::time::SystemTime;
use thiserror::Error;

/// Handler name of the signing stage in the `Sign` phase
pub const SIGN_HANDLER_NAME: &str = "v4.SignRequest";

/// Signs the HTTP request of each attempt with SigV4
///
/// Everything the signature depends on is read from the request's properties:
/// - [`SharedCredentialsProvider`] (required). Called on every attempt, so a retry signs with
///   whatever credentials the provider hands out at that point.
/// - [`SigningRegion`] and [`SigningName`] override the scope from the client info, e.g.
///   `us-east-1` and `ec2`.
/// - [`SystemTime`] pins the signing time. The current time is used when it is absent.
///
/// After signing, the attempt's [`Signature`](crate::signer::Signature) is stored back in the
/// properties.
#[derive(Clone, Debug, Default)]
pub struct SigV4SigningHandler {
    signer: SigV4Signer,
}

impl SigV4SigningHandler {
    pub fn new(signer: SigV4Signer) -> Self {
        Self { signer }
    }
}

#[derive(Debug, Error)]
pub enum SigningStageError {
    #[error("No credentials provider in the property bag")]
    MissingCredentialsProvider,
    #[error("No HTTP request to sign")]
    MissingRequest,
    #[error("The request body could not be signed by this configuration")]
    InvalidBodyType,
    #[error("Signing failed")]
    SigningFailure(#[from] SigningError),
    #[error("Failed to load credentials from the credentials provider")]
    CredentialsLoadingError(#[from] CredentialsError),
}

impl SigV4SigningHandler {
    async fn sign(&self, request: &mut Request) -> Result<(), SigningStageError> {
        let provider = request
            .properties()
            .get::<SharedCredentialsProvider>()
            .cloned()
            .ok_or(SigningStageError::MissingCredentialsProvider)?;
        let credentials = provider.provide_credentials().await?;

        let region = request
            .properties()
            .get::<SigningRegion>()
            .cloned()
            .unwrap_or_else(|| request.client_info().signing_region().clone());
        let name = request
            .properties()
            .get::<SigningName>()
            .cloned()
            .unwrap_or_else(|| request.client_info().signing_name().clone());
        let request_config = RequestConfig {
            request_ts: request
                .properties()
                .get::<SystemTime>()
                .copied()
                .unwrap_or_else(SystemTime::now),
            region: &region,
            name: &name,
        };

        // A short dance is required to extract a signable body from an SdkBody, which basically
        // amounts to verifying that it is in fact a strict body based on `Bytes`
        let http_request = request
            .take_http_request()
            .ok_or(SigningStageError::MissingRequest)?;
        let (parts, body) = http_request.into_parts();
        let signable_body = body.bytes().ok_or(SigningStageError::InvalidBodyType)?;
        let mut signable_request = http::Request::from_parts(parts, signable_body);
        let signature = self
            .signer
            .sign(&request_config, &credentials, &mut signable_request)?;
        let (signed_parts, _) = signable_request.into_parts();
        request.set_http_request(http::Request::from_parts(signed_parts, body));
        request.properties_mut().insert(signature);
        Ok(())
    }
}

impl Handler for SigV4SigningHandler {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        Box::pin(async move { self.sign(request).await.map_err(SdkError::signing) })
    }
}
