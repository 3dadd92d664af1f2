/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Connectors for tests

use crate::conn::Standard;
use crate::BoxError;
use http::header::HeaderName;
use qsdk_http::body::SdkBody;
use std::future::{Pending, Ready};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

type ConnectVec = Vec<(http::Request<SdkBody>, http::Response<hyper::Body>)>;

/// A request received by a [`TestConnection`] and the request it expected
#[derive(Debug)]
pub struct ValidateRequest {
    pub expected: http::Request<SdkBody>,
    pub actual: http::Request<SdkBody>,
}

impl ValidateRequest {
    /// Asserts that the actual request has the expected method, URI and body, and carries every
    /// expected header that is not in `ignore_headers`
    pub fn assert_matches(&self, ignore_headers: &[HeaderName]) {
        let (actual, expected) = (&self.actual, &self.expected);
        for (name, value) in expected.headers() {
            if !ignore_headers.contains(name) {
                let actual_header = actual
                    .headers()
                    .get(name)
                    .unwrap_or_else(|| panic!("Header {:?} missing", name));
                assert_eq!(actual_header, value, "Header mismatch for {:?}", name);
            }
        }
        let actual_str = std::str::from_utf8(actual.body().bytes().unwrap_or(&[]));
        let expected_str = std::str::from_utf8(expected.body().bytes().unwrap_or(&[]));
        match (actual_str, expected_str) {
            (Ok(actual), Ok(expected)) => assert_eq!(actual, expected),
            _ => assert_eq!(actual.body().bytes(), expected.body().bytes()),
        };
        assert_eq!(actual.method(), expected.method());
        assert_eq!(actual.uri(), expected.uri());
    }
}

/// A connection that replays canned responses
///
/// It will:
/// - Respond to requests with a preloaded series of responses
/// - Record requests for future examination
///
/// ```rust
/// use qsdk_client::test_connection::TestConnection;
/// use qsdk_http::body::SdkBody;
///
/// let conn = TestConnection::new(vec![(
///     http::Request::new(SdkBody::from("Action=DescribeRegions&Version=2016-11-15")),
///     http::Response::builder()
///         .status(200)
///         .body("<DescribeRegionsResponse/>")
///         .unwrap(),
/// )]);
/// assert!(conn.requests().is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct TestConnection {
    data: Arc<Mutex<ConnectVec>>,
    requests: Arc<Mutex<Vec<ValidateRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TestConnection {
    pub fn new<B: Into<hyper::Body>>(
        data: Vec<(http::Request<SdkBody>, http::Response<B>)>,
    ) -> Self {
        let mut data: ConnectVec = data
            .into_iter()
            .map(|(request, response)| (request, response.map(Into::into)))
            .collect();
        data.reverse();
        TestConnection {
            data: Arc::new(Mutex::new(data)),
            requests: Default::default(),
        }
    }

    pub fn requests(&self) -> impl Deref<Target = Vec<ValidateRequest>> + '_ {
        lock(&self.requests)
    }

    /// Asserts that every canned response was used and that each request matched its
    /// expectation
    pub fn assert_requests_match(&self, ignore_headers: &[HeaderName]) {
        assert!(
            lock(&self.data).is_empty(),
            "not every expected request was sent"
        );
        for request in self.requests().iter() {
            request.assert_matches(ignore_headers);
        }
    }
}

impl tower::Service<http::Request<SdkBody>> for TestConnection {
    type Response = http::Response<hyper::Body>;
    type Error = BoxError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, actual: http::Request<SdkBody>) -> Self::Future {
        if let Some((expected, response)) = lock(&self.data).pop() {
            lock(&self.requests).push(ValidateRequest { expected, actual });
            std::future::ready(Ok(response))
        } else {
            std::future::ready(Err("No more data".into()))
        }
    }
}

impl From<TestConnection> for Standard {
    fn from(conn: TestConnection) -> Self {
        Standard::new(conn)
    }
}

/// A connection that never returns a response
///
/// Useful for testing timeouts.
#[derive(Clone, Debug, Default)]
pub struct NeverConnection {
    num_calls: Arc<AtomicUsize>,
}

impl NeverConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of requests this connection received
    pub fn num_calls(&self) -> usize {
        self.num_calls.load(Ordering::SeqCst)
    }
}

impl tower::Service<http::Request<SdkBody>> for NeverConnection {
    type Response = http::Response<hyper::Body>;
    type Error = BoxError;
    type Future = Pending<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: http::Request<SdkBody>) -> Self::Future {
        self.num_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending()
    }
}

impl From<NeverConnection> for Standard {
    fn from(conn: NeverConnection) -> Self {
        Standard::new(conn)
    }
}

#[cfg(test)]
mod test {
    use super::{NeverConnection, TestConnection};
    use qsdk_http::body::SdkBody;
    use std::time::Duration;
    use tower::{Service, ServiceExt};

    #[tokio::test]
    async fn replays_responses_in_order() {
        let mut conn = TestConnection::new(vec![
            (
                http::Request::new(SdkBody::from("first")),
                http::Response::builder().status(503).body("").unwrap(),
            ),
            (
                http::Request::new(SdkBody::from("second")),
                http::Response::builder().status(200).body("ok").unwrap(),
            ),
        ]);
        let first = conn
            .ready()
            .await
            .unwrap()
            .call(http::Request::new(SdkBody::from("first")))
            .await
            .unwrap();
        assert_eq!(first.status(), 503);
        let second = conn
            .ready()
            .await
            .unwrap()
            .call(http::Request::new(SdkBody::from("second")))
            .await
            .unwrap();
        assert_eq!(second.status(), 200);
        assert!(conn
            .ready()
            .await
            .unwrap()
            .call(http::Request::new(SdkBody::empty()))
            .await
            .is_err());
        assert_eq!(conn.requests().len(), 2);
        conn.assert_requests_match(&[]);
    }

    #[tokio::test]
    #[should_panic]
    async fn mismatched_body() {
        let mut conn = TestConnection::new(vec![(
            http::Request::new(SdkBody::from("expected")),
            http::Response::builder().status(200).body("").unwrap(),
        )]);
        let _ = conn
            .call(http::Request::new(SdkBody::from("actual")))
            .await;
        conn.assert_requests_match(&[]);
    }

    #[tokio::test(start_paused = true)]
    async fn never_responds() {
        let conn = NeverConnection::new();
        let pending = conn.clone().oneshot(http::Request::new(SdkBody::empty()));
        assert!(tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .is_err());
        assert_eq!(conn.num_calls(), 1);
    }
}
