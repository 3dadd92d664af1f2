/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::canonical_request::{
    CanonicalRequest, StringToSign, HMAC_256, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN,
};
use super::error::SigningError;
use crate::sign::{calculate_signature, generate_signing_key, sha256_hex_string};
use crate::{SigningOutput, SigningParams};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use http::{HeaderMap, Method, Uri};
use tracing::trace;

/// Represents all of the information necessary to sign an HTTP request.
#[derive(Debug)]
#[non_exhaustive]
pub struct SignableRequest<'a> {
    method: &'a Method,
    uri: &'a Uri,
    headers: &'a HeaderMap<HeaderValue>,
    body: &'a [u8],
}

impl<'a> SignableRequest<'a> {
    /// Creates a new `SignableRequest`. If you have an [`http::Request`], then
    /// consider using `SignableRequest::from` instead.
    pub fn new(
        method: &'a Method,
        uri: &'a Uri,
        headers: &'a HeaderMap<HeaderValue>,
        body: &'a [u8],
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn uri(&self) -> &Uri {
        self.uri
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        self.headers
    }

    pub fn body(&self) -> &[u8] {
        self.body
    }
}

impl<'a, B> From<&'a http::Request<B>> for SignableRequest<'a>
where
    B: AsRef<[u8]>,
{
    fn from(request: &'a http::Request<B>) -> SignableRequest<'a> {
        SignableRequest::new(
            request.method(),
            request.uri(),
            request.headers(),
            request.body().as_ref(),
        )
    }
}

/// Headers that must be added to a request for it to be signed
#[derive(Debug)]
pub struct SigningInstructions {
    headers: HeaderMap<HeaderValue>,
}

impl SigningInstructions {
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.headers
    }

    pub fn take_headers(self) -> HeaderMap<HeaderValue> {
        self.headers
    }

    /// Insert the signing headers into `request`, replacing any stale values
    pub fn apply_to_request<B>(self, request: &mut http::Request<B>) {
        for (name, value) in self.headers.into_iter() {
            if let Some(name) = name {
                request.headers_mut().insert(name, value);
            }
        }
    }
}

/// Produces a signature for the given `request` and returns the headers to add to it
pub fn sign(
    request: SignableRequest<'_>,
    params: &SigningParams<'_>,
) -> Result<SigningOutput<SigningInstructions>, SigningError> {
    trace!(request = ?request, params = ?params, "signing request");
    let creq = CanonicalRequest::from(&request, params.time, params.security_token)?;
    let encoded_creq = sha256_hex_string(creq.to_string().as_bytes());
    let string_to_sign =
        StringToSign::new(params.time, params.region, params.service_name, &encoded_creq)
            .to_string();
    trace!(canonical_request = %creq, string_to_sign = %string_to_sign, "calculated signing parameters");

    let signing_key = generate_signing_key(
        params.secret_key,
        params.time,
        params.region,
        params.service_name,
    );
    let signature = calculate_signature(signing_key, string_to_sign.as_bytes());

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(X_AMZ_DATE),
        HeaderValue::from_str(&creq.date_time)?,
    );
    if let Some(token) = params.security_token {
        let mut token = HeaderValue::from_str(token)?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(X_AMZ_SECURITY_TOKEN), token);
    }
    headers.insert(
        AUTHORIZATION,
        build_authorization_header(params, &creq, &signature)?,
    );
    Ok(SigningOutput::new(SigningInstructions { headers }, signature))
}

fn build_authorization_header(
    params: &SigningParams<'_>,
    creq: &CanonicalRequest<'_>,
    signature: &str,
) -> Result<HeaderValue, SigningError> {
    let scope = StringToSign::new(params.time, params.region, params.service_name, "").scope;
    let mut value = HeaderValue::from_str(&format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        HMAC_256,
        params.access_key,
        scope,
        creq.signed_headers(),
        signature
    ))?;
    value.set_sensitive(true);
    Ok(value)
}
