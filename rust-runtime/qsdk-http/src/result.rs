/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::BoxError;
use bytes::Bytes;
use http::StatusCode;
use qsdk_types::retry::{ErrorKind, ProvideErrorKind, RetryKind};
use std::error::Error;
use std::fmt;
use std::time::Duration;

const THROTTLING_ERRORS: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];
const TRANSIENT_ERRORS: &[&str] = &["RequestTimeout", "RequestTimeoutException"];
const THROTTLING_STATUS_CODES: [u16; 2] = [429, 503];

/// Error code used when a response carries no decodable code, e.g. `ServiceUnavailable`
pub(crate) fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown")
        .replace(' ', "")
}

/// Metadata read from every response by the `UnmarshalMeta` phase
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    request_id: Option<String>,
    status: Option<StatusCode>,
}

impl ResponseMetadata {
    pub fn new(request_id: Option<String>, status: Option<StatusCode>) -> Self {
        ResponseMetadata { request_id, status }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

/// Successful result of a request
#[derive(Debug)]
pub struct SdkSuccess<O> {
    pub raw: http::Response<Bytes>,
    pub parsed: O,
    pub metadata: ResponseMetadata,
}

impl<O> SdkSuccess<O> {
    pub fn map<U>(self, f: impl FnOnce(O) -> U) -> SdkSuccess<U> {
        SdkSuccess {
            raw: self.raw,
            parsed: f(self.parsed),
            metadata: self.metadata,
        }
    }
}

/// An error response decoded from the service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceError {
    code: String,
    message: String,
    request_id: Option<String>,
    status: StatusCode,
    retry_after: Option<Duration>,
}

impl ServiceError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: Option<String>,
        status: StatusCode,
    ) -> Self {
        ServiceError {
            code: code.into(),
            message: message.into(),
            request_id,
            status,
            retry_after: None,
        }
    }

    /// Delay the service asked for before the next attempt, e.g. from a `Retry-After` header
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Classifies this error for the retry policy
    ///
    /// In order of priority:
    /// 1. The code is checked against the known throttling and transient error codes
    /// 2. `429` and `503` are throttling, any other `5xx` is a retryable server error
    ///
    /// Throttling errors that carry a [retry delay](ServiceError::retry_after) are retried
    /// after exactly that delay.
    pub fn retry_kind(&self) -> RetryKind {
        match (self.retryable_error_kind(), self.retry_after) {
            (Some(ErrorKind::ThrottlingError), Some(delay)) => RetryKind::Explicit(delay),
            (Some(kind), _) => RetryKind::Error(kind),
            (None, _) => RetryKind::NotRetryable,
        }
    }
}

impl ProvideErrorKind for ServiceError {
    fn retryable_error_kind(&self) -> Option<ErrorKind> {
        let code = self.code.as_str();
        if THROTTLING_ERRORS.contains(&code) {
            return Some(ErrorKind::ThrottlingError);
        }
        if TRANSIENT_ERRORS.contains(&code) {
            return Some(ErrorKind::TransientError);
        }
        if THROTTLING_STATUS_CODES.contains(&self.status.as_u16()) {
            return Some(ErrorKind::ThrottlingError);
        }
        if self.status.is_server_error() {
            return Some(ErrorKind::ServerError);
        }
        None
    }

    fn code(&self) -> Option<&str> {
        Some(self.code.as_str())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.status.as_u16())?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " [request id: {}]", request_id)?;
        }
        Ok(())
    }
}

impl Error for ServiceError {}

/// Failure of a single request
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SdkError {
    /// The input could not be serialized. The request was never sent.
    #[error("failed to construct request: {0}")]
    MarshalError(#[source] BoxError),

    /// Credentials could not be loaded or the request could not be signed. The request was
    /// never sent.
    #[error("failed to sign request: {0}")]
    SigningError(#[source] BoxError),

    /// No HTTP response was received, e.g. a connection failure or a timeout. The request MAY
    /// have been sent.
    #[error("failed to dispatch request: {0}")]
    TransportError(#[source] BoxError),

    /// The service returned an error response
    #[error("service error: {0}")]
    ServiceError(#[from] ServiceError),

    /// A successful response could not be parsed
    #[error("failed to parse response: {0}")]
    UnmarshalError(#[source] BoxError),
}

impl SdkError {
    pub fn marshal(err: impl Into<BoxError>) -> Self {
        SdkError::MarshalError(err.into())
    }

    pub fn signing(err: impl Into<BoxError>) -> Self {
        SdkError::SigningError(err.into())
    }

    pub fn transport(err: impl Into<BoxError>) -> Self {
        SdkError::TransportError(err.into())
    }

    pub fn unmarshal(err: impl Into<BoxError>) -> Self {
        SdkError::UnmarshalError(err.into())
    }

    /// Transport failures are transient, service errors are classified by
    /// [`ServiceError::retry_kind`], nothing else is retryable.
    pub fn retry_kind(&self) -> RetryKind {
        match self {
            SdkError::TransportError(_) => RetryKind::Error(ErrorKind::TransientError),
            SdkError::ServiceError(err) => err.retry_kind(),
            _ => RetryKind::NotRetryable,
        }
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            SdkError::ServiceError(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{SdkError, ServiceError};
    use http::StatusCode;
    use qsdk_types::retry::{ErrorKind, ProvideErrorKind, RetryKind};
    use std::time::Duration;

    fn service_error(code: &str, status: u16) -> ServiceError {
        ServiceError::new(
            code,
            "",
            None,
            StatusCode::from_u16(status).expect("valid status"),
        )
    }

    #[test]
    fn classify_by_error_code() {
        assert_eq!(
            service_error("RequestLimitExceeded", 400).retry_kind(),
            RetryKind::Error(ErrorKind::ThrottlingError)
        );
        assert_eq!(
            service_error("RequestTimeout", 400).retry_kind(),
            RetryKind::Error(ErrorKind::TransientError)
        );
        assert_eq!(
            service_error("InvalidParameterValue", 400).retry_kind(),
            RetryKind::NotRetryable
        );
    }

    #[test]
    fn classify_by_response_status() {
        assert_eq!(
            service_error("Unavailable", 503).retry_kind(),
            RetryKind::Error(ErrorKind::ThrottlingError)
        );
        assert_eq!(
            service_error("TooMany", 429).retry_kind(),
            RetryKind::Error(ErrorKind::ThrottlingError)
        );
        assert_eq!(
            service_error("InternalError", 500).retry_kind(),
            RetryKind::Error(ErrorKind::ServerError)
        );
        assert_eq!(
            service_error("AuthFailure", 401).retryable_error_kind(),
            None
        );
    }

    #[test]
    fn throttling_with_retry_after_is_explicit() {
        let delay = Duration::from_secs(3);
        assert_eq!(
            service_error("Throttling", 400)
                .with_retry_after(delay)
                .retry_kind(),
            RetryKind::Explicit(delay)
        );
        assert_eq!(
            service_error("Unavailable", 503)
                .with_retry_after(delay)
                .retry_kind(),
            RetryKind::Explicit(delay)
        );
        // only throttling honors the delay
        assert_eq!(
            service_error("InternalError", 500)
                .with_retry_after(delay)
                .retry_kind(),
            RetryKind::Error(ErrorKind::ServerError)
        );
        assert_eq!(
            service_error("AuthFailure", 401)
                .with_retry_after(delay)
                .retry_kind(),
            RetryKind::NotRetryable
        );
    }

    #[test]
    fn classify_sdk_errors() {
        assert_eq!(
            SdkError::transport("connection reset").retry_kind(),
            RetryKind::Error(ErrorKind::TransientError)
        );
        assert_eq!(SdkError::marshal("bad input").retry_kind(), RetryKind::NotRetryable);
        assert_eq!(SdkError::signing("no creds").retry_kind(), RetryKind::NotRetryable);
        assert_eq!(
            SdkError::unmarshal("bad xml").retry_kind(),
            RetryKind::NotRetryable
        );
    }

    #[test]
    fn display_service_error() {
        let err = ServiceError::new(
            "InvalidParameterValue",
            "Value (x) for parameter foo is invalid",
            Some("59dbff89-35bd-4eac-99ed-be587EXAMPLE".to_string()),
            StatusCode::BAD_REQUEST,
        );
        assert_eq!(
            err.to_string(),
            "InvalidParameterValue (400): Value (x) for parameter foo is invalid \
             [request id: 59dbff89-35bd-4eac-99ed-be587EXAMPLE]"
        );
        assert_eq!(
            SdkError::from(err.clone()).service_error(),
            Some(&err)
        );
    }
}
