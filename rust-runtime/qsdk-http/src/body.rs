/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::BoxError;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// SdkBody type
///
/// This is the Body used for dispatching all HTTP Requests. Query protocol bodies are always
/// fully buffered, so a body can be replayed for every retry attempt.
pub enum SdkBody {
    Once(Option<Bytes>),
    /// The body was already read by the transport
    Taken,
}

impl fmt::Debug for SdkBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkBody::Once(Some(bytes)) => f.debug_tuple("Once").field(bytes).finish(),
            SdkBody::Once(None) => f.write_str("Once(<empty>)"),
            SdkBody::Taken => f.write_str("Taken"),
        }
    }
}

impl SdkBody {
    pub fn empty() -> Self {
        SdkBody::Once(None)
    }

    /// Returns the contents of the body if it has not been consumed
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            SdkBody::Once(Some(bytes)) => Some(bytes),
            SdkBody::Once(None) => Some(&[]),
            SdkBody::Taken => None,
        }
    }

    pub fn try_clone(&self) -> Option<Self> {
        match self {
            SdkBody::Once(bytes) => Some(SdkBody::Once(bytes.clone())),
            SdkBody::Taken => None,
        }
    }

    fn poll_inner(&mut self) -> Poll<Option<Result<Bytes, BoxError>>> {
        match self {
            SdkBody::Once(ref mut opt) => {
                let data = opt.take();
                match data {
                    Some(bytes) if !bytes.is_empty() => Poll::Ready(Some(Ok(bytes))),
                    _ => Poll::Ready(None),
                }
            }
            SdkBody::Taken => Poll::Ready(Some(Err("body has already been read".into()))),
        }
    }
}

impl From<&str> for SdkBody {
    fn from(s: &str) -> Self {
        SdkBody::Once(Some(Bytes::copy_from_slice(s.as_bytes())))
    }
}

impl From<String> for SdkBody {
    fn from(s: String) -> Self {
        SdkBody::from(Bytes::from(s))
    }
}

impl From<Bytes> for SdkBody {
    fn from(bytes: Bytes) -> Self {
        SdkBody::Once(Some(bytes))
    }
}

impl From<Vec<u8>> for SdkBody {
    fn from(data: Vec<u8>) -> SdkBody {
        Self::from(Bytes::from(data))
    }
}

impl http_body::Body for SdkBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_data(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        self.poll_inner()
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap<HeaderValue>>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn is_end_stream(&self) -> bool {
        matches!(self, SdkBody::Once(None))
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            SdkBody::Once(Some(bytes)) => http_body::SizeHint::with_exact(bytes.len() as u64),
            _ => http_body::SizeHint::with_exact(0),
        }
    }
}

/// Clones a buffered request so that it can be sent again
///
/// Returns `None` if the body was already consumed.
pub fn try_clone_request(request: &http::Request<SdkBody>) -> Option<http::Request<SdkBody>> {
    let body = request.body().try_clone()?;
    let mut cloned = http::Request::new(body);
    *cloned.method_mut() = request.method().clone();
    *cloned.uri_mut() = request.uri().clone();
    *cloned.version_mut() = request.version();
    *cloned.headers_mut() = request.headers().clone();
    Some(cloned)
}

#[cfg(test)]
mod test {
    use super::{try_clone_request, SdkBody};
    use http::header::{AUTHORIZATION, CONTENT_LENGTH};
    use http::Uri;
    use http_body::Body;

    #[test]
    fn try_clone_clones_all_data() {
        let request = http::Request::builder()
            .uri(Uri::from_static("https://ec2.us-east-1.amazonaws.com/"))
            .method("POST")
            .header(CONTENT_LENGTH, 12)
            .header(AUTHORIZATION, "Token: hello")
            .body(SdkBody::from("hello world!"))
            .expect("valid request");
        let cloned = try_clone_request(&request).expect("request is cloneable");

        assert_eq!(
            cloned.uri(),
            &Uri::from_static("https://ec2.us-east-1.amazonaws.com/")
        );
        assert_eq!(cloned.method(), "POST");
        assert_eq!(cloned.headers().len(), 2);
        assert_eq!(cloned.headers().get(AUTHORIZATION).unwrap(), "Token: hello");
        assert_eq!(cloned.headers().get(CONTENT_LENGTH).unwrap(), "12");
        assert_eq!(cloned.body().bytes().unwrap(), "hello world!".as_bytes());
    }

    #[test]
    fn taken_bodies_cannot_be_replayed() {
        assert!(SdkBody::Taken.try_clone().is_none());
        assert!(SdkBody::Taken.bytes().is_none());
        assert_eq!(SdkBody::empty().bytes(), Some(&b""[..]));
    }

    #[tokio::test]
    async fn body_yields_its_data_once() {
        let mut body = SdkBody::from("Action=DescribeRegions");
        assert_eq!(body.size_hint().exact(), Some(22));
        let data = body.data().await.expect("data").expect("no error");
        assert_eq!(&data[..], b"Action=DescribeRegions");
        assert!(body.data().await.is_none());
        assert!(body.is_end_stream());
    }
}
