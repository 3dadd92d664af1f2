/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::provider::{future, CredentialsError, ProvideCredentials, Result, SharedCredentialsProvider};
use crate::Credentials;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info_span, warn, Instrument};

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CREDENTIAL_EXPIRATION: Duration = Duration::from_secs(15 * 60);
const DEFAULT_BUFFER_TIME: Duration = Duration::from_secs(10);

/// `LazyCachingCredentialsProvider` implements [`ProvideCredentials`] by caching
/// credentials that it loads by calling a user-provided [`ProvideCredentials`] implementation.
///
/// For example, you can provide a [`ProvideCredentials`] implementation that exchanges a token
/// for temporary credentials, and `LazyCachingCredentialsProvider` will cache those credentials
/// until they are about to expire.
///
/// Concurrent callers that find the cache empty share one refresh: the first caller loads while
/// the rest wait on the same cell. Each caller receives a complete credentials snapshot.
#[derive(Clone)]
pub struct LazyCachingCredentialsProvider {
    time: Arc<dyn TimeSource>,
    cache: Cache,
    loader: SharedCredentialsProvider,
    load_timeout: Duration,
    buffer_time: Duration,
    default_credential_expiration: Duration,
}

impl fmt::Debug for LazyCachingCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCachingCredentialsProvider")
            .field("loader", &self.loader)
            .field("load_timeout", &self.load_timeout)
            .field("buffer_time", &self.buffer_time)
            .finish()
    }
}

impl LazyCachingCredentialsProvider {
    /// Returns a new `Builder` that can be used to construct the `LazyCachingCredentialsProvider`.
    pub fn builder() -> builder::Builder {
        builder::Builder::new()
    }

    async fn load(&self) -> Result {
        let now = self.time.now();
        let default_expiration = now + self.default_credential_expiration;
        let loader = self.loader.clone();
        let timeout = self.load_timeout;
        self.cache
            .get_or_load(|| async move {
                let credentials = tokio::time::timeout(timeout, loader.provide_credentials())
                    .await
                    .map_err(|_| CredentialsError::ProviderTimedOut(timeout))??;
                debug!(provider = credentials.provider_name(), "loaded credentials");
                // Credentials without an expiration still get cached for a bounded time
                Ok(match credentials.expiry() {
                    Some(_) => credentials,
                    None => Credentials::new(
                        credentials.access_key_id(),
                        credentials.secret_access_key(),
                        credentials.session_token().map(|s| s.to_string()),
                        Some(default_expiration),
                        credentials.provider_name(),
                    ),
                })
            })
            .await
    }

    async fn provide(&self) -> Result {
        let now = self.time.now();
        if let Some(credentials) = self.cache.get().await {
            if !expired(&credentials, now, self.buffer_time) {
                return Ok(credentials);
            }
            self.cache.clear_if_expired(now, self.buffer_time).await;
        }
        self.load()
            .instrument(info_span!("lazy_load_credentials"))
            .await
    }
}

impl ProvideCredentials for LazyCachingCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.provide())
    }
}

pub mod builder {
    use super::{
        LazyCachingCredentialsProvider, SystemTimeSource, TimeSource, DEFAULT_BUFFER_TIME,
        DEFAULT_CREDENTIAL_EXPIRATION, DEFAULT_REFRESH_TIMEOUT,
    };
    use crate::provider::{ProvideCredentials, SharedCredentialsProvider};
    use std::sync::Arc;
    use std::time::Duration;

    /// Builder for constructing a [`LazyCachingCredentialsProvider`].
    ///
    /// # Example
    ///
    /// ```
    /// use qsdk_auth::Credentials;
    /// use qsdk_auth::provider::LazyCachingCredentialsProvider;
    /// use std::time::Duration;
    ///
    /// let provider = LazyCachingCredentialsProvider::builder()
    ///     .load(Credentials::from_keys("akid", "secret", None))
    ///     .load_timeout(Duration::from_secs(2))
    ///     .build();
    /// ```
    #[derive(Default)]
    pub struct Builder {
        loader: Option<SharedCredentialsProvider>,
        time_source: Option<Arc<dyn TimeSource>>,
        load_timeout: Option<Duration>,
        buffer_time: Option<Duration>,
        default_credential_expiration: Option<Duration>,
    }

    impl Builder {
        pub fn new() -> Self {
            Default::default()
        }

        /// An implementation of [`ProvideCredentials`] that will be used to load
        /// the cached credentials once they're expired.
        pub fn load(mut self, loader: impl ProvideCredentials + 'static) -> Self {
            self.loader = Some(SharedCredentialsProvider::new(loader));
            self
        }

        /// (Optional) Timeout for the given [`ProvideCredentials`] implementation.
        /// Defaults to 5 seconds.
        pub fn load_timeout(mut self, timeout: Duration) -> Self {
            self.load_timeout = Some(timeout);
            self
        }

        /// (Optional) Amount of time before the actual credential expiration time
        /// where credentials are considered expired. For example, if credentials are expiring
        /// in 15 minutes, and the buffer time is 10 seconds, then any requests made after
        /// 14 minutes and 50 seconds will load new credentials. Defaults to 10 seconds.
        pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
            self.buffer_time = Some(buffer_time);
            self
        }

        /// (Optional) Default expiration time to set on credentials if they don't
        /// have an expiration time. Defaults to 15 minutes.
        pub fn default_credential_expiration(mut self, duration: Duration) -> Self {
            self.default_credential_expiration = Some(duration);
            self
        }

        #[cfg(test)]
        pub(super) fn time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
            self.time_source = Some(Arc::new(time_source));
            self
        }

        /// Creates the [`LazyCachingCredentialsProvider`].
        ///
        /// # Panics
        /// If no loader was given with [`Builder::load`].
        pub fn build(self) -> LazyCachingCredentialsProvider {
            LazyCachingCredentialsProvider {
                time: self
                    .time_source
                    .unwrap_or_else(|| Arc::new(SystemTimeSource)),
                cache: super::Cache::new(),
                loader: self.loader.expect("a credentials loader is required"),
                load_timeout: self.load_timeout.unwrap_or(DEFAULT_REFRESH_TIMEOUT),
                buffer_time: self.buffer_time.unwrap_or(DEFAULT_BUFFER_TIME),
                default_credential_expiration: self
                    .default_credential_expiration
                    .unwrap_or(DEFAULT_CREDENTIAL_EXPIRATION),
            }
        }
    }
}

// Allows us to abstract time for tests.
pub(crate) trait TimeSource: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Copy, Clone)]
struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Credentials are expired when `now` is within `buffer` of their expiration.
fn expired(credentials: &Credentials, now: SystemTime, buffer: Duration) -> bool {
    match credentials.expiry() {
        Some(expiration) => now + buffer >= expiration,
        None => {
            warn!("cached credentials have no expiration time");
            false
        }
    }
}

#[derive(Clone)]
struct Cache {
    value: Arc<RwLock<OnceCell<Credentials>>>,
}

impl Cache {
    fn new() -> Cache {
        Cache {
            value: Arc::new(RwLock::new(OnceCell::new())),
        }
    }

    async fn get(&self) -> Option<Credentials> {
        self.value.read().await.get().cloned()
    }

    async fn get_or_load<F, Fut>(&self, f: F) -> Result
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result>,
    {
        let lock = self.value.read().await;
        let future = lock.get_or_try_init(f);
        future.await.map(|creds| creds.clone())
    }

    /// Returns true if the cache was cleared
    async fn clear_if_expired(&self, now: SystemTime, buffer: Duration) -> bool {
        let mut lock = self.value.write().await;

        // Only clear the cache if it hasn't been cleared by another task. If it was already
        // cleared, then another task is initializing the empty cell.
        match lock.get() {
            Some(credentials) if expired(credentials, now, buffer) => {
                *lock = OnceCell::new();
                true
            }
            _ => false,
        }
    }
}
