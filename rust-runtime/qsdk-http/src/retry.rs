/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Retry policy seam of the request executor
//!
//! The executor classifies the outcome of every attempt into a [`RetryKind`] and asks the
//! request's policy whether, and after how long, to try again. Policies live outside this crate;
//! see `qsdk_client::retry::Standard` for the default.

use qsdk_types::retry::RetryKind;
use std::fmt;
use std::time::Duration;

/// Creates the retry state of a new request
pub trait NewRequestPolicy: Send + Sync + fmt::Debug {
    fn new_request_policy(&self) -> Box<dyn RequestRetryPolicy>;
}

/// Retry state of a single request
pub trait RequestRetryPolicy: Send {
    /// Called after every attempt with the classified outcome
    ///
    /// Returns the delay before the next attempt, or `None` to return the current outcome.
    /// `RetryKind::Unnecessary` is passed for successful attempts.
    fn should_retry(&mut self, kind: &RetryKind) -> Option<Duration>;
}

/// A policy that makes a single attempt
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverRetry;

impl NewRequestPolicy for NeverRetry {
    fn new_request_policy(&self) -> Box<dyn RequestRetryPolicy> {
        Box::new(NeverRetry)
    }
}

impl RequestRetryPolicy for NeverRetry {
    fn should_retry(&mut self, _kind: &RetryKind) -> Option<Duration> {
        None
    }
}
