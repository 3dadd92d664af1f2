/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::result::{ResponseMetadata, SdkError, SdkSuccess, ServiceError};
use http::{HeaderMap, HeaderValue};

/// Implementers return the request ID the service assigned to a call
pub trait RequestId {
    /// Returns the request ID if it's available.
    fn request_id(&self) -> Option<&str>;
}

impl RequestId for ResponseMetadata {
    fn request_id(&self) -> Option<&str> {
        ResponseMetadata::request_id(self)
    }
}

impl RequestId for ServiceError {
    fn request_id(&self) -> Option<&str> {
        ServiceError::request_id(self)
    }
}

impl RequestId for SdkError {
    fn request_id(&self) -> Option<&str> {
        match self {
            SdkError::ServiceError(err) => err.request_id(),
            _ => None,
        }
    }
}

impl<O> RequestId for SdkSuccess<O> {
    fn request_id(&self) -> Option<&str> {
        self.metadata
            .request_id()
            .or_else(|| extract_request_id(self.raw.headers()))
    }
}

impl<O, E> RequestId for Result<O, E>
where
    O: RequestId,
    E: RequestId,
{
    fn request_id(&self) -> Option<&str> {
        match self {
            Ok(ok) => ok.request_id(),
            Err(err) => err.request_id(),
        }
    }
}

/// Extracts a request ID from HTTP response headers
///
/// `x-amzn-requestid` wins over `x-amz-request-id`. Values that are not UTF-8 are ignored.
pub fn extract_request_id(headers: &HeaderMap<HeaderValue>) -> Option<&str> {
    headers
        .get("x-amzn-requestid")
        .or_else(|| headers.get("x-amz-request-id"))
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;

    #[test]
    fn test_extract_request_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(None, extract_request_id(&headers));

        headers.append(
            "x-amz-request-id",
            HeaderValue::from_static("some-request-id"),
        );
        assert_eq!(Some("some-request-id"), extract_request_id(&headers));

        headers.append(
            "x-amzn-requestid",
            HeaderValue::from_static("other-request-id"),
        );
        assert_eq!(Some("other-request-id"), extract_request_id(&headers));

        headers.remove("x-amzn-requestid");
        assert_eq!(Some("some-request-id"), extract_request_id(&headers));
    }

    #[test]
    fn test_request_id_sdk_error() {
        let service_error = ServiceError::new(
            "AuthFailure",
            "",
            Some("some-request-id".to_string()),
            StatusCode::UNAUTHORIZED,
        );
        assert_eq!(
            Some("some-request-id"),
            SdkError::from(service_error).request_id()
        );
        assert_eq!(None, SdkError::transport("timed out").request_id());
    }

    #[test]
    fn test_request_id_success_falls_back_to_headers() {
        let raw = http::Response::builder()
            .header("x-amzn-requestid", "header-request-id")
            .body(Bytes::new())
            .unwrap();
        let success = SdkSuccess {
            raw,
            parsed: (),
            metadata: ResponseMetadata::default(),
        };
        assert_eq!(Some("header-request-id"), success.request_id());

        let result: Result<_, SdkError> = Ok(SdkSuccess {
            metadata: ResponseMetadata::new(Some("body-request-id".to_string()), None),
            ..success
        });
        assert_eq!(Some("body-request-id"), result.request_id());
    }
}
