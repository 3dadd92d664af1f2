/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::BoxError;
use hyper::client::{HttpConnector, ResponseFuture};
use hyper_rustls::HttpsConnector;
use qsdk_http::body::SdkBody;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::trace;

type BoxFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<hyper::Body>, BoxError>> + Send>>;

type HyperClient = hyper::Client<HttpsConnector<HttpConnector>, SdkBody>;

/// A good base connection type for most use cases
///
/// This supports two options:
/// 1. HTTPS with rustls, see [`Standard::https`]
/// 2. Any implementation of the `HttpService` trait, e.g. a
///    [`TestConnection`](crate::test_connection::TestConnection)
pub enum Standard {
    Https(HyperClient),
    Dyn(Box<dyn HttpService>),
}

/// The HTTPS connector could not be configured
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectorError {
    #[error("failed to load the platform's root certificates")]
    LoadRootCertificates(#[source] std::io::Error),

    /// None of the provided certificates could be parsed, e.g. the platform has no CA bundle
    #[error("no usable root certificates found ({ignored} could not be parsed)")]
    NoRootCertificates { ignored: usize },
}

impl Standard {
    /// An HTTPS connector trusting the platform's native root certificates
    ///
    /// Plain `http` endpoints are accepted too.
    pub fn https() -> Result<Self, ConnectorError> {
        let certs =
            rustls_native_certs::load_native_certs().map_err(ConnectorError::LoadRootCertificates)?;
        Self::https_with_roots(certs.into_iter().map(|cert| cert.0).collect())
    }

    /// An HTTPS connector trusting the given DER encoded root certificates
    pub fn https_with_roots(der_certs: Vec<Vec<u8>>) -> Result<Self, ConnectorError> {
        let mut roots = rustls::RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(&der_certs);
        if added == 0 {
            return Err(ConnectorError::NoRootCertificates { ignored });
        }
        trace!(added, ignored, "loaded root certificates");
        let tls_config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        Ok(Standard::Https(hyper::Client::builder().build(https)))
    }

    pub fn new(connector: impl HttpService + 'static) -> Self {
        Standard::Dyn(Box::new(connector))
    }
}

impl Clone for Standard {
    fn clone(&self) -> Self {
        match self {
            Standard::Https(client) => Standard::Https(client.clone()),
            Standard::Dyn(box_conn) => Standard::Dyn(box_conn.clone()),
        }
    }
}

impl fmt::Debug for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standard::Https(_) => f.write_str("Standard::Https"),
            Standard::Dyn(_) => f.write_str("Standard::Dyn"),
        }
    }
}

impl Clone for Box<dyn HttpService> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An HTTP connector usable by [`Standard`]
///
/// Implemented for every cloneable `tower::Service` that accepts `http::Request<SdkBody>`
/// and returns `http::Response<hyper::Body>`.
pub trait HttpService: Send + Sync {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), BoxError>>;
    fn call(&mut self, req: http::Request<SdkBody>) -> BoxFuture;
    fn clone_box(&self) -> Box<dyn HttpService>;
}

impl<S> HttpService for S
where
    S: tower::Service<http::Request<SdkBody>, Response = http::Response<hyper::Body>>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
        <S as tower::Service<http::Request<SdkBody>>>::poll_ready(self, cx).map_err(Into::into)
    }

    fn call(&mut self, req: http::Request<SdkBody>) -> BoxFuture {
        let fut = <S as tower::Service<http::Request<SdkBody>>>::call(self, req);
        Box::pin(async move { fut.await.map_err(|err| -> BoxError { err.into() }) })
    }

    fn clone_box(&self) -> Box<dyn HttpService> {
        Box::new(self.clone())
    }
}

impl tower::Service<http::Request<SdkBody>> for Standard {
    type Response = http::Response<hyper::Body>;
    type Error = BoxError;
    type Future = StandardFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self {
            Standard::Https(https) => {
                <HyperClient as tower::Service<http::Request<SdkBody>>>::poll_ready(https, cx)
                    .map_err(|err| err.into())
            }
            Standard::Dyn(conn) => conn.poll_ready(cx),
        }
    }

    fn call(&mut self, req: http::Request<SdkBody>) -> Self::Future {
        match self {
            Standard::Https(https) => StandardFuture::Https(
                <HyperClient as tower::Service<http::Request<SdkBody>>>::call(https, req),
            ),
            Standard::Dyn(conn) => StandardFuture::Dyn(conn.call(req)),
        }
    }
}

#[pin_project::pin_project(project = FutProj)]
pub enum StandardFuture {
    Https(#[pin] ResponseFuture),
    Dyn(#[pin] BoxFuture),
}

impl Future for StandardFuture {
    type Output = Result<http::Response<hyper::Body>, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            FutProj::Https(fut) => fut.poll(cx).map_err(|err| err.into()),
            FutProj::Dyn(dyn_fut) => dyn_fut.poll(cx),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ConnectorError, Standard};

    #[test]
    fn https_requires_root_certificates() {
        assert!(matches!(
            Standard::https_with_roots(vec![]),
            Err(ConnectorError::NoRootCertificates { ignored: 0 })
        ));
        assert!(matches!(
            Standard::https_with_roots(vec![b"not a certificate".to_vec()]),
            Err(ConnectorError::NoRootCertificates { ignored: 1 })
        ));
    }
}
