/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Client configuration
//!
//! Configuration is resolved once per client: a [`ConfigProvider`] (usually a session wide
//! [`SdkConfig`]) merges its own settings with per-client [`ConfigOverrides`] and resolves the
//! endpoint for the client's service.
//!
//! ```no_run
//! # async fn docs() -> Result<(), qsdk_client::config::ConfigError> {
//! use qsdk_client::config::{ConfigOverrides, SdkConfig};
//! use qsdk_client::Client;
//! use qsdk_http::operation::ServiceInfo;
//! use qsdk_types::Region;
//!
//! let config = SdkConfig::from_env().load().await?;
//! let client = Client::new(
//!     ServiceInfo::new("ec2", "2016-11-15"),
//!     &config,
//!     &[ConfigOverrides::builder().region(Region::new("eu-west-1")).build()],
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::conn::{ConnectorError, Standard};
use crate::endpoint::{DefaultEndpointResolver, ResolveEndpoint, SharedEndpointResolver};
use crate::retry::RetryConfig;
use crate::BoxError;
use qsdk_auth::provider::{self, CredentialsError, ProvideCredentials, SharedCredentialsProvider};
use qsdk_http::operation::{ClientInfo, ServiceInfo};
use qsdk_types::os_shim_internal::Env;
use qsdk_types::region::{ChainProvider, EnvironmentProvider, ProvideRegion};
use qsdk_types::{Region, SigningRegion};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const MAX_ATTEMPTS_ENV: &str = "AWS_MAX_ATTEMPTS";

/// Failure to create a client
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no region was configured for `{service}`")]
    MissingRegion { service: String },

    /// No credentials provider was configured, or it failed to provide credentials
    #[error("credentials are unavailable: {0}")]
    CredentialsUnavailable(#[source] CredentialsError),

    #[error("failed to resolve the endpoint of `{service}` in `{region}`: {source}")]
    EndpointResolution {
        service: String,
        region: Region,
        #[source]
        source: BoxError,
    },

    /// The default HTTPS connector could not be created
    #[error("failed to create the HTTPS connector: {0}")]
    Connector(#[source] ConnectorError),

    #[error("invalid value `{value}` for `{name}`: {message}")]
    InvalidEnvironment {
        name: &'static str,
        value: String,
        message: &'static str,
    },
}

/// Timeouts applied by the `Send` phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    attempt_timeout: Option<Duration>,
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits how long a single attempt may wait for a response, including reading its body
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }
}

/// The configuration of one client, as resolved by a [`ConfigProvider`]
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub client_info: ClientInfo,
    pub credentials_provider: SharedCredentialsProvider,
    pub connector: Standard,
    pub retry_config: RetryConfig,
    pub timeout_config: TimeoutConfig,
}

/// Source of client configuration
pub trait ConfigProvider: Send + Sync {
    /// Resolves the configuration of a client of `service`
    ///
    /// Overrides are applied in order; a value set by a later override wins.
    fn client_config(
        &self,
        service: &ServiceInfo,
        overrides: &[ConfigOverrides],
    ) -> Result<ResolvedConfig, ConfigError>;
}

/// Per-client configuration that takes precedence over the [`ConfigProvider`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    region: Option<Region>,
    credentials_provider: Option<SharedCredentialsProvider>,
    endpoint_resolver: Option<SharedEndpointResolver>,
    retry_config: Option<RetryConfig>,
    timeout_config: Option<TimeoutConfig>,
}

impl ConfigOverrides {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

/// Session configuration shared by every client created from it
#[derive(Clone, Debug, Default)]
pub struct SdkConfig {
    region: Option<Region>,
    credentials_provider: Option<SharedCredentialsProvider>,
    endpoint_resolver: Option<SharedEndpointResolver>,
    connector: Option<Standard>,
    retry_config: Option<RetryConfig>,
    timeout_config: Option<TimeoutConfig>,
}

impl SdkConfig {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Loads configuration from the environment
    ///
    /// - region: `AWS_REGION`, then `AWS_DEFAULT_REGION`
    /// - credentials: `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`,
    ///   cached until they expire
    /// - maximum attempts: `AWS_MAX_ATTEMPTS`
    pub fn from_env() -> Loader {
        Loader::default()
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn credentials_provider(&self) -> Option<&SharedCredentialsProvider> {
        self.credentials_provider.as_ref()
    }

    pub fn retry_config(&self) -> Option<&RetryConfig> {
        self.retry_config.as_ref()
    }

    pub fn timeout_config(&self) -> Option<&TimeoutConfig> {
        self.timeout_config.as_ref()
    }
}

impl ConfigProvider for SdkConfig {
    fn client_config(
        &self,
        service: &ServiceInfo,
        overrides: &[ConfigOverrides],
    ) -> Result<ResolvedConfig, ConfigError> {
        let mut region = self.region.clone();
        let mut credentials_provider = self.credentials_provider.clone();
        let mut endpoint_resolver = self.endpoint_resolver.clone();
        let mut retry_config = self.retry_config.clone();
        let mut timeout_config = self.timeout_config;
        for layer in overrides {
            region = layer.region.clone().or(region);
            credentials_provider = layer.credentials_provider.clone().or(credentials_provider);
            endpoint_resolver = layer.endpoint_resolver.clone().or(endpoint_resolver);
            retry_config = layer.retry_config.clone().or(retry_config);
            timeout_config = layer.timeout_config.or(timeout_config);
        }

        let region = region.ok_or_else(|| ConfigError::MissingRegion {
            service: service.service_name().to_string(),
        })?;
        let credentials_provider = credentials_provider.ok_or(
            ConfigError::CredentialsUnavailable(CredentialsError::CredentialsNotLoaded),
        )?;
        let endpoint_resolver: SharedEndpointResolver = match endpoint_resolver {
            Some(resolver) => resolver,
            None => Arc::new(DefaultEndpointResolver::default()),
        };
        let endpoint = endpoint_resolver
            .resolve_endpoint(service, &region)
            .map_err(|source| ConfigError::EndpointResolution {
                service: service.service_name().to_string(),
                region: region.clone(),
                source,
            })?;
        debug!(
            service = service.service_name(),
            region = %region,
            endpoint = %endpoint.uri(),
            "resolved endpoint"
        );

        let scope = endpoint.credential_scope();
        let signing_region = scope
            .region()
            .cloned()
            .unwrap_or_else(|| SigningRegion::from(&region));
        let signing_name = scope
            .name()
            .cloned()
            .unwrap_or_else(|| service.signing_name().clone());
        let client_info = ClientInfo::new(
            service.clone(),
            region,
            endpoint.uri().clone(),
            signing_region,
            signing_name,
        );
        let connector = match &self.connector {
            Some(connector) => connector.clone(),
            None => Standard::https().map_err(ConfigError::Connector)?,
        };
        Ok(ResolvedConfig {
            client_info,
            credentials_provider,
            connector,
            retry_config: retry_config.unwrap_or_default(),
            timeout_config: timeout_config.unwrap_or_default(),
        })
    }
}

/// Builder for [`SdkConfig`] and [`ConfigOverrides`]
///
/// Overrides ignore the connector: every client of a session shares its connection pool.
#[derive(Debug, Default)]
pub struct Builder {
    region: Option<Region>,
    credentials_provider: Option<SharedCredentialsProvider>,
    endpoint_resolver: Option<SharedEndpointResolver>,
    connector: Option<Standard>,
    retry_config: Option<RetryConfig>,
    timeout_config: Option<TimeoutConfig>,
}

impl Builder {
    pub fn region(mut self, region: impl Into<Option<Region>>) -> Self {
        self.region = region.into();
        self
    }

    pub fn credentials_provider(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.credentials_provider = Some(SharedCredentialsProvider::new(provider));
        self
    }

    pub fn shared_credentials_provider(mut self, provider: SharedCredentialsProvider) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    pub fn endpoint_resolver(mut self, resolver: impl ResolveEndpoint + 'static) -> Self {
        self.endpoint_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn connector(mut self, connector: impl Into<Standard>) -> Self {
        self.connector = Some(connector.into());
        self
    }

    pub fn retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = Some(retry_config);
        self
    }

    pub fn timeout_config(mut self, timeout_config: TimeoutConfig) -> Self {
        self.timeout_config = Some(timeout_config);
        self
    }

    pub fn build(self) -> ConfigOverrides {
        ConfigOverrides {
            region: self.region,
            credentials_provider: self.credentials_provider,
            endpoint_resolver: self.endpoint_resolver,
            retry_config: self.retry_config,
            timeout_config: self.timeout_config,
        }
    }

    pub fn build_sdk_config(self) -> SdkConfig {
        SdkConfig {
            region: self.region,
            credentials_provider: self.credentials_provider,
            endpoint_resolver: self.endpoint_resolver,
            connector: self.connector,
            retry_config: self.retry_config,
            timeout_config: self.timeout_config,
        }
    }
}

/// Loads an [`SdkConfig`] from the environment. See [`SdkConfig::from_env`].
#[derive(Debug, Default)]
pub struct Loader {
    env: Option<Env>,
    region: Option<ChainProvider>,
    connector: Option<Standard>,
}

impl Loader {
    /// Override the process environment, e.g. for tests
    pub fn env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    /// Region provider consulted before `AWS_REGION` and `AWS_DEFAULT_REGION`
    ///
    /// Calling this more than once chains the providers in call order.
    pub fn region(mut self, provider: impl ProvideRegion + 'static) -> Self {
        self.region = Some(match self.region.take() {
            Some(chain) => chain.or_else(provider),
            None => ChainProvider::first_try(provider),
        });
        self
    }

    pub fn connector(mut self, connector: impl Into<Standard>) -> Self {
        self.connector = Some(connector.into());
        self
    }

    pub async fn load(self) -> Result<SdkConfig, ConfigError> {
        let env = self.env.unwrap_or_default();
        let from_env = EnvironmentProvider::new_with_env(env.clone());
        let region = match self.region {
            Some(chain) => chain.or_else(from_env),
            None => ChainProvider::first_try(from_env),
        }
        .region()
        .await;
        let retry_config = match env.get(MAX_ATTEMPTS_ENV) {
            Ok(value) => {
                Some(RetryConfig::default().with_max_attempts(parse_max_attempts(value)?))
            }
            Err(_) => None,
        };
        Ok(SdkConfig {
            region,
            credentials_provider: Some(provider::default_provider(env)),
            endpoint_resolver: None,
            connector: self.connector,
            retry_config,
            timeout_config: None,
        })
    }
}

fn parse_max_attempts(value: String) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(attempts) if attempts > 0 => Ok(attempts),
        _ => Err(ConfigError::InvalidEnvironment {
            name: MAX_ATTEMPTS_ENV,
            value,
            message: "expected a positive integer",
        }),
    }
}
