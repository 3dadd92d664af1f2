/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Classification of failed attempts for retry policies.

use std::time::Duration;

/// Why an attempt failed, as far as retrying is concerned
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ErrorKind {
    /// No response was received: a connection failure or an attempt timeout
    ///
    /// The request may have reached the service.
    TransientError,

    /// The service asked the client to slow down, e.g. with `429`, `503` or a throttling code
    ThrottlingError,

    /// A `5xx` response that is not throttling
    ServerError,

    /// A `4xx` response. Never retried.
    ClientError,
}

/// Implemented by errors that know whether they can be retried
pub trait ProvideErrorKind {
    /// The kind of this error when it is retryable, `None` otherwise
    fn retryable_error_kind(&self) -> Option<ErrorKind>;

    /// The service error code, if the error carries one
    fn code(&self) -> Option<&str>;
}

/// Outcome of one attempt, handed to the retry policy
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum RetryKind {
    /// Retry after a backoff computed by the policy
    Error(ErrorKind),

    /// Retry after the given delay. The policy may still refuse, or shorten the delay to its
    /// maximum backoff.
    Explicit(Duration),

    NotRetryable,

    /// The attempt succeeded
    Unnecessary,
}
