/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::error::SigningError;
use super::sign::SignableRequest;
use super::url_escape::percent_encode;
use crate::date_fmt::{format_date, format_date_time};
use crate::sign::sha256_hex_string;
use http::header::HOST;
use http::{Method, Uri};
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

pub(crate) const HMAC_256: &str = "AWS4-HMAC-SHA256";
pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
pub(crate) const X_AMZ_DATE: &str = "x-amz-date";

/// Never signed. The signing headers themselves are recomputed on every signature.
const SKIPPED_HEADERS: [&str; 4] = ["user-agent", "authorization", X_AMZ_DATE, X_AMZ_SECURITY_TOKEN];

#[derive(Debug, PartialEq)]
pub(super) struct CanonicalRequest<'a> {
    pub(super) method: &'a Method,
    pub(super) path: Cow<'a, str>,
    pub(super) params: Option<String>,
    /// Lowercased, sorted `(name, normalized value)` pairs; exactly the signed headers
    pub(super) headers: Vec<(String, String)>,
    pub(super) date_time: String,
    pub(super) content_sha256: String,
}

impl<'a> CanonicalRequest<'a> {
    /// Construct a CanonicalRequest from a signable request
    ///
    /// The canonical request includes headers that are not on the input. In addition to the
    /// request's own headers it signs:
    /// - `host` (from the URI authority, when the request has no host header)
    /// - `x-amz-date`
    /// - `x-amz-security-token` (when a session token is provided)
    ///
    /// `user-agent` is never signed since proxies may alter it. Signing headers left over from a
    /// previous signature are replaced.
    pub(super) fn from(
        req: &'a SignableRequest<'a>,
        time: SystemTime,
        security_token: Option<&str>,
    ) -> Result<CanonicalRequest<'a>, SigningError> {
        let path = match req.uri().path() {
            "" => Cow::Borrowed("/"),
            path => Cow::Borrowed(path),
        };
        let date_time = format_date_time(time);
        let headers = Self::headers(req, &date_time, security_token)?;
        Ok(CanonicalRequest {
            method: req.method(),
            path,
            params: Self::params(req.uri()),
            headers,
            date_time,
            content_sha256: sha256_hex_string(req.body()),
        })
    }

    fn headers(
        req: &SignableRequest<'_>,
        date_time: &str,
        security_token: Option<&str>,
    ) -> Result<Vec<(String, String)>, SigningError> {
        let mut headers: Vec<(String, String)> = Vec::with_capacity(req.headers().len() + 3);
        for name in req.headers().keys() {
            if SKIPPED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            let mut values = Vec::new();
            for value in req.headers().get_all(name) {
                let value = value.to_str().map_err(|source| SigningError::UnsignableHeader {
                    name: name.to_string(),
                    source,
                })?;
                values.push(normalize_header_value(value));
            }
            headers.push((name.as_str().to_string(), values.join(",")));
        }

        if !req.headers().contains_key(HOST) {
            let authority = req.uri().authority().ok_or(SigningError::MissingHost)?;
            headers.push((HOST.as_str().to_string(), authority.as_str().to_string()));
        }
        headers.push((X_AMZ_DATE.to_string(), date_time.to_string()));
        if let Some(token) = security_token {
            headers.push((X_AMZ_SECURITY_TOKEN.to_string(), token.to_string()));
        }
        headers.sort();
        Ok(headers)
    }

    fn params(uri: &Uri) -> Option<String> {
        let query = uri.query()?;
        let mut params: Vec<(Cow<'_, str>, Cow<'_, str>)> =
            form_urlencoded::parse(query.as_bytes()).collect();
        // Sort by param name, and then by param value
        params.sort();
        let encoded = params
            .iter()
            .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        Some(encoded)
    }

    pub(super) fn signed_headers(&self) -> String {
        self.headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Trim the value and collapse runs of whitespace into a single space
fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for CanonicalRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.params.as_deref().unwrap_or(""))?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers())?;
        write!(f, "{}", self.content_sha256)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub(super) struct Scope<'a> {
    pub(super) time: SystemTime,
    pub(super) region: &'a str,
    pub(super) service: &'a str,
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/aws4_request",
            format_date(self.time),
            self.region,
            self.service
        )
    }
}

#[derive(PartialEq, Debug)]
pub(super) struct StringToSign<'a> {
    pub(super) scope: Scope<'a>,
    pub(super) time: SystemTime,
    pub(super) hashed_creq: &'a str,
}

impl<'a> StringToSign<'a> {
    pub(super) fn new(
        time: SystemTime,
        region: &'a str,
        service: &'a str,
        hashed_creq: &'a str,
    ) -> Self {
        Self {
            scope: Scope {
                time,
                region,
                service,
            },
            time,
            hashed_creq,
        }
    }
}

impl fmt::Display for StringToSign<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            HMAC_256,
            format_date_time(self.time),
            self.scope,
            self.hashed_creq
        )
    }
}
