/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::os_shim_internal::Env;
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The region to send requests to.
///
/// The region MUST be specified on a request. It may be configured on the shared config
/// or on a per-client basis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region(
    // Regions are almost always known statically. However, as an escape hatch for when they
    // are not, allow for an owned region
    Cow<'static, str>,
);

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Region {
    pub fn new(region: impl Into<Cow<'static, str>>) -> Self {
        Self(region.into())
    }

    pub const fn from_static(region: &'static str) -> Self {
        Self(Cow::Borrowed(region))
    }
}

/// The region to use when signing requests
///
/// Generally, user code will not need to interact with `SigningRegion`. See [`Region`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningRegion(Cow<'static, str>);

impl AsRef<str> for SigningRegion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SigningRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Region> for SigningRegion {
    fn from(inp: Region) -> Self {
        SigningRegion(inp.0)
    }
}

impl From<&Region> for SigningRegion {
    fn from(inp: &Region) -> Self {
        SigningRegion(inp.0.clone())
    }
}

impl SigningRegion {
    pub const fn from_static(region: &'static str) -> Self {
        SigningRegion(Cow::Borrowed(region))
    }
}

pub struct RegionFuture<'a>(Pin<Box<dyn Future<Output = Option<Region>> + Send + 'a>>);

impl<'a> RegionFuture<'a> {
    pub fn new(f: impl Future<Output = Option<Region>> + Send + 'a) -> Self {
        RegionFuture(Box::pin(f))
    }

    pub fn ready(region: Option<Region>) -> Self {
        Self::new(std::future::ready(region))
    }
}

impl Future for RegionFuture<'_> {
    type Output = Option<Region>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

/// Provide a [`Region`] to use with signed requests
pub trait ProvideRegion: Send + Sync {
    fn region(&self) -> RegionFuture<'_>;
}

impl ProvideRegion for Region {
    fn region(&self) -> RegionFuture<'_> {
        RegionFuture::ready(Some(self.clone()))
    }
}

impl ProvideRegion for Option<Region> {
    fn region(&self) -> RegionFuture<'_> {
        RegionFuture::ready(self.clone())
    }
}

/// Region provider that tries each of its providers in order
///
/// ```rust
/// use qsdk_types::region::{ChainProvider, EnvironmentProvider, Region};
/// let provider = ChainProvider::first_try(std::env::var("CUSTOM_REGION").ok().map(Region::new))
///     .or_else(EnvironmentProvider::new())
///     .or_else(Region::new("us-east-2"));
/// ```
pub struct ChainProvider {
    providers: Vec<Box<dyn ProvideRegion>>,
}

impl ChainProvider {
    pub fn first_try(provider: impl ProvideRegion + 'static) -> Self {
        ChainProvider {
            providers: vec![Box::new(provider)],
        }
    }

    pub fn or_else(mut self, fallback: impl ProvideRegion + 'static) -> Self {
        self.providers.push(Box::new(fallback));
        self
    }

    async fn resolve(&self) -> Option<Region> {
        for provider in &self.providers {
            if let Some(region) = provider.region().await {
                return Some(region);
            }
        }
        None
    }
}

impl fmt::Debug for ChainProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl ProvideRegion for ChainProvider {
    fn region(&self) -> RegionFuture<'_> {
        RegionFuture::new(self.resolve())
    }
}

/// Loads the region from `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`
#[derive(Debug, Default)]
pub struct EnvironmentProvider {
    env: Env,
}

impl EnvironmentProvider {
    pub fn new() -> Self {
        EnvironmentProvider { env: Env::real() }
    }

    pub fn new_with_env(env: Env) -> Self {
        EnvironmentProvider { env }
    }
}

impl ProvideRegion for EnvironmentProvider {
    fn region(&self) -> RegionFuture<'_> {
        RegionFuture::ready(
            self.env
                .get("AWS_REGION")
                .or_else(|_| self.env.get("AWS_DEFAULT_REGION"))
                .ok()
                .filter(|region| !region.is_empty())
                .map(Region::new),
        )
    }
}
