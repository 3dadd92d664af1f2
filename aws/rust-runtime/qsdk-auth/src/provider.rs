/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

pub mod env;
pub mod lazy_caching;

use crate::Credentials;
use qsdk_types::os_shim_internal::Env;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

pub use env::EnvironmentVariableCredentialsProvider;
pub use lazy_caching::LazyCachingCredentialsProvider;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CredentialsError {
    /// No credentials were available for this provider
    #[error("The provider could not provide credentials or required configuration was not set")]
    CredentialsNotLoaded,

    /// Loading credentials from this provider exceeded the maximum allowed duration
    #[error("Credentials provider timed out after {} seconds", .0.as_secs())]
    ProviderTimedOut(Duration),

    /// The provider was given an invalid configuration
    #[error("The credentials provider was not properly configured: {0}")]
    InvalidConfiguration(#[source] BoxError),

    /// The provider experienced an error during credential resolution
    #[error("An error occurred while loading credentials: {0}")]
    ProviderError(#[source] BoxError),

    /// An unexpected error occurred during credential resolution
    #[error("Unexpected credentials error: {0}")]
    Unhandled(#[source] BoxError),
}

pub type Result = std::result::Result<Credentials, CredentialsError>;

pub mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    enum Inner<'a> {
        Ready(Option<super::Result>),
        Later(BoxFuture<'a, super::Result>),
    }

    /// Future returned by [`ProvideCredentials`](super::ProvideCredentials)
    ///
    /// Providers that already hold a value avoid the allocation by using
    /// [`ProvideCredentials::ready`].
    pub struct ProvideCredentials<'a>(Inner<'a>);

    impl<'a> ProvideCredentials<'a> {
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            ProvideCredentials(Inner::Later(Box::pin(future)))
        }

        pub fn ready(credentials: super::Result) -> Self {
            ProvideCredentials(Inner::Ready(Some(credentials)))
        }
    }

    impl Future for ProvideCredentials<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match &mut self.0 {
                Inner::Ready(value) => {
                    Poll::Ready(value.take().expect("cannot be called twice"))
                }
                Inner::Later(future) => future.as_mut().poll(cx),
            }
        }
    }
}

/// Asynchronous Credentials Provider
///
/// Providers are called repeatedly: the signing stage asks for a fresh snapshot on every attempt.
pub trait ProvideCredentials: Send + Sync + fmt::Debug {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a;
}

impl ProvideCredentials for Credentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Ok(self.clone()))
    }
}

impl ProvideCredentials for Arc<dyn ProvideCredentials> {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().provide_credentials()
    }
}

/// Credentials Provider wrapper that may be shared
///
/// Newtype wrapper around ProvideCredentials that implements Clone using an internal
/// Arc.
#[derive(Clone, Debug)]
pub struct SharedCredentialsProvider(Arc<dyn ProvideCredentials>);

impl SharedCredentialsProvider {
    /// Create a new SharedCredentials provider from `ProvideCredentials`
    ///
    /// The given provider will be wrapped in an internal `Arc`. If your
    /// provider is already in an `Arc`, use `SharedCredentialsProvider::from(provider)` instead.
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self(Arc::new(provider))
    }
}

impl AsRef<dyn ProvideCredentials> for SharedCredentialsProvider {
    fn as_ref(&self) -> &(dyn ProvideCredentials + 'static) {
        self.0.as_ref()
    }
}

impl From<Arc<dyn ProvideCredentials>> for SharedCredentialsProvider {
    fn from(provider: Arc<dyn ProvideCredentials>) -> Self {
        SharedCredentialsProvider(provider)
    }
}

impl ProvideCredentials for SharedCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.provide_credentials()
    }
}

/// A [`ProvideCredentials`] implemented by a closure.
///
/// See [`provide_credentials_fn`] for more details.
#[derive(Copy, Clone)]
pub struct ProvideCredentialsFn<'c, T> {
    f: T,
    phantom: PhantomData<&'c T>,
}

impl<T> fmt::Debug for ProvideCredentialsFn<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProvideCredentialsFn")
    }
}

impl<'c, T, F> ProvideCredentials for ProvideCredentialsFn<'c, T>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new((self.f)())
    }
}

/// Returns a new credentials provider built with the given closure. This allows you
/// to create an [`ProvideCredentials`] implementation from an async block that returns
/// a [`Result`].
///
/// # Examples
///
/// ```no_run
/// use qsdk_auth::Credentials;
/// use qsdk_auth::provider::provide_credentials_fn;
///
/// async fn load_credentials() -> Credentials {
///     todo!()
/// }
///
/// provide_credentials_fn(|| async {
///     // Async process to retrieve credentials goes here
///     let credentials = load_credentials().await;
///     Ok(credentials)
/// });
/// ```
pub fn provide_credentials_fn<'c, T, F>(f: T) -> ProvideCredentialsFn<'c, T>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    ProvideCredentialsFn {
        f,
        phantom: Default::default(),
    }
}

/// Credentials read from `env`, wrapped in a lazy cache
pub fn default_provider(env: Env) -> SharedCredentialsProvider {
    SharedCredentialsProvider::new(
        LazyCachingCredentialsProvider::builder()
            .load(EnvironmentVariableCredentialsProvider::new_with_env(env))
            .build(),
    )
}
