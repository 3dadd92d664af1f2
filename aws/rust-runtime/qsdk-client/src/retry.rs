/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Standard retry behavior
//!
//! Retries are paid for from a quota shared by every request of a client. Each retry takes
//! tokens from the quota and each successful request returns the cost of its last retry (or a
//! single token when it succeeded on the first attempt), so a client facing a failing service
//! quickly stops retrying. Backoff is exponential with a random base and capped by
//! `max_backoff`.

use qsdk_http::retry::{NewRequestPolicy, RequestRetryPolicy};
use qsdk_types::retry::{ErrorKind, RetryKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_RETRY_TOKENS: usize = 500;
const RETRY_COST: usize = 5;
// keeps 2^n well inside the range of `Duration`
const MAX_BACKOFF_EXPONENT: u32 = 30;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    initial_retry_tokens: usize,
    retry_cost: usize,
    no_retry_increment: usize,
    timeout_retry_cost: usize,
    max_attempts: u32,
    max_backoff: Duration,
    base: fn() -> f64,
}

impl RetryConfig {
    /// A configuration that makes a single attempt per request
    pub fn disabled() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Maximum number of attempts per request, including the first one. Values below 1 are
    /// treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// For deterministic tests, enable using a static base instead of random base for exponential backoff
    pub fn with_static_base(mut self, base: fn() -> f64) -> Self {
        self.base = base;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_retry_tokens: INITIAL_RETRY_TOKENS,
            retry_cost: RETRY_COST,
            no_retry_increment: 1,
            timeout_retry_cost: 10,
            max_attempts: MAX_ATTEMPTS,
            max_backoff: Duration::from_secs(20),
            // by default, use a random base for exponential backoff
            base: fastrand::f64,
        }
    }
}

/// The default retry policy of a client
///
/// Cloning shares the retry quota.
#[derive(Clone, Debug)]
pub struct Standard {
    ctx: Arc<Mutex<RetryCtx>>,
}

impl Standard {
    pub fn new(config: RetryConfig) -> Self {
        Standard {
            ctx: Arc::new(Mutex::new(RetryCtx::new(config))),
        }
    }

    /// Tokens left in the shared retry quota
    pub fn retry_quota(&self) -> usize {
        lock(&self.ctx).retry_quota
    }
}

impl Default for Standard {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl NewRequestPolicy for Standard {
    fn new_request_policy(&self) -> Box<dyn RequestRetryPolicy> {
        Box::new(StandardRetryStrategy::new(self.ctx.clone()))
    }
}

fn lock(ctx: &Mutex<RetryCtx>) -> MutexGuard<'_, RetryCtx> {
    // the quota stays consistent even if a holder panicked
    ctx.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Retry state of one request
///
/// `ctx` captures cross-request retry state, whereas `attempts` captures retry state local to this
/// request
#[derive(Clone, Debug)]
struct StandardRetryStrategy {
    attempts: u32,
    ctx: Arc<Mutex<RetryCtx>>,
}

impl StandardRetryStrategy {
    fn new(ctx: Arc<Mutex<RetryCtx>>) -> Self {
        Self { attempts: 0, ctx }
    }

    #[cfg(test)]
    fn ctx(&self) -> MutexGuard<'_, RetryCtx> {
        lock(&self.ctx)
    }

    fn do_retry(&self, outcome: Result<(), ErrorKind>) -> Option<(Self, Duration)> {
        let mut ctx = lock(&self.ctx);
        let can_retry = match outcome {
            Ok(_) => {
                ctx.retry_quota_release();
                return None;
            }
            Err(e) => {
                if self.attempts + 1 >= ctx.config.max_attempts {
                    return None;
                }
                ctx.get_retry_quota(e)
            }
        };
        if !can_retry {
            return None;
        };
        let max_backoff = ctx.config.max_backoff;
        let b = (ctx.config.base)();
        let backoff = b * 2_f64.powi(self.attempts.min(MAX_BACKOFF_EXPONENT) as i32);
        let backoff = Duration::try_from_secs_f64(backoff)
            .unwrap_or(max_backoff)
            .min(max_backoff);
        let mut next = self.clone();
        next.attempts += 1;
        Some((next, backoff))
    }
}

impl RequestRetryPolicy for StandardRetryStrategy {
    fn should_retry(&mut self, kind: &RetryKind) -> Option<Duration> {
        let (next, delay) = match kind {
            RetryKind::Unnecessary => self.do_retry(Ok(()))?,
            RetryKind::NotRetryable => return None,
            RetryKind::Error(err) => self.do_retry(Err(*err))?,
            RetryKind::Explicit(delay) => {
                let max_backoff = {
                    let ctx = lock(&self.ctx);
                    if self.attempts + 1 >= ctx.config.max_attempts {
                        return None;
                    }
                    ctx.config.max_backoff
                };
                let mut next = self.clone();
                next.attempts += 1;
                (next, (*delay).min(max_backoff))
            }
        };
        *self = next;
        Some(delay)
    }
}

#[derive(Debug)]
struct RetryCtx {
    retry_quota: usize,
    last_retry: Option<usize>,
    config: RetryConfig,
}

impl RetryCtx {
    fn new(config: RetryConfig) -> Self {
        RetryCtx {
            retry_quota: config.initial_retry_tokens,
            last_retry: None,
            config,
        }
    }

    fn retry_quota_release(&mut self) {
        self.retry_quota += self.last_retry.unwrap_or(self.config.no_retry_increment);
    }

    fn get_retry_quota(&mut self, err: ErrorKind) -> bool {
        let retry_cost = if err == ErrorKind::TransientError {
            self.config.timeout_retry_cost
        } else {
            self.config.retry_cost
        };
        if retry_cost > self.retry_quota {
            false
        } else {
            self.last_retry = Some(retry_cost);
            self.retry_quota -= retry_cost;
            true
        }
    }
}
