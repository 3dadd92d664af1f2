/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Endpoint resolution
//!
//! A client resolves its endpoint once, at construction, from the service identity and the
//! region. The resolved [`Endpoint`] may also override the region and name used for signing.

use crate::BoxError;
use http::Uri;
use qsdk_http::operation::ServiceInfo;
use qsdk_types::{Region, SigningName, SigningRegion};
use std::fmt;
use std::sync::Arc;

/// Signing scope attached to an endpoint
///
/// Unset fields fall back to the client region and the service signing name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialScope {
    region: Option<SigningRegion>,
    name: Option<SigningName>,
}

impl CredentialScope {
    pub fn builder() -> credential_scope::Builder {
        credential_scope::Builder::default()
    }

    pub fn region(&self) -> Option<&SigningRegion> {
        self.region.as_ref()
    }

    pub fn name(&self) -> Option<&SigningName> {
        self.name.as_ref()
    }
}

pub mod credential_scope {
    use super::CredentialScope;
    use qsdk_types::{SigningName, SigningRegion};

    #[derive(Debug, Default)]
    pub struct Builder {
        region: Option<SigningRegion>,
        name: Option<SigningName>,
    }

    impl Builder {
        pub fn region(mut self, region: impl Into<SigningRegion>) -> Self {
            self.region = Some(region.into());
            self
        }

        pub fn name(mut self, name: impl Into<SigningName>) -> Self {
            self.name = Some(name.into());
            self
        }

        pub fn build(self) -> CredentialScope {
            CredentialScope {
                region: self.region,
                name: self.name,
            }
        }
    }
}

/// A resolved endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    uri: Uri,
    credential_scope: CredentialScope,
}

impl Endpoint {
    pub fn new(uri: Uri, credential_scope: CredentialScope) -> Self {
        Endpoint {
            uri,
            credential_scope,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn credential_scope(&self) -> &CredentialScope {
        &self.credential_scope
    }
}

/// Resolve the endpoint of a service in a region
pub trait ResolveEndpoint: Send + Sync + fmt::Debug {
    fn resolve_endpoint(&self, service: &ServiceInfo, region: &Region) -> Result<Endpoint, BoxError>;
}

impl<T> ResolveEndpoint for Arc<T>
where
    T: ResolveEndpoint + ?Sized,
{
    fn resolve_endpoint(&self, service: &ServiceInfo, region: &Region) -> Result<Endpoint, BoxError> {
        self.as_ref().resolve_endpoint(service, region)
    }
}

pub type SharedEndpointResolver = Arc<dyn ResolveEndpoint>;

const DEFAULT_TEMPLATE: &str = "https://{service}.{region}.amazonaws.com";

/// Resolves endpoints from a URI template
///
/// `{service}` is replaced with the service's endpoints id and `{region}` with the region:
///
/// ```rust
/// use qsdk_client::endpoint::{DefaultEndpointResolver, ResolveEndpoint};
/// use qsdk_http::operation::ServiceInfo;
/// use qsdk_types::Region;
///
/// let endpoint = DefaultEndpointResolver::default()
///     .resolve_endpoint(&ServiceInfo::new("ec2", "2016-11-15"), &Region::new("eu-west-1"))
///     .unwrap();
/// assert_eq!(endpoint.uri(), "https://ec2.eu-west-1.amazonaws.com/");
/// ```
#[derive(Clone, Debug)]
pub struct DefaultEndpointResolver {
    template: String,
}

impl Default for DefaultEndpointResolver {
    fn default() -> Self {
        Self::from_template(DEFAULT_TEMPLATE)
    }
}

impl DefaultEndpointResolver {
    pub fn from_template(template: impl Into<String>) -> Self {
        DefaultEndpointResolver {
            template: template.into(),
        }
    }
}

impl ResolveEndpoint for DefaultEndpointResolver {
    fn resolve_endpoint(&self, service: &ServiceInfo, region: &Region) -> Result<Endpoint, BoxError> {
        let uri = self
            .template
            .replace("{service}", service.endpoints_id())
            .replace("{region}", region.as_ref());
        Ok(Endpoint::new(uri.parse()?, CredentialScope::default()))
    }
}

/// An endpoint that does not depend on the service or region, e.g. a VPC endpoint or a local
/// test server
#[derive(Clone, Debug)]
pub struct StaticEndpoint {
    endpoint: Endpoint,
}

impl StaticEndpoint {
    pub fn from_uri(uri: Uri) -> Self {
        Self::with_scope(uri, CredentialScope::default())
    }

    pub fn with_scope(uri: Uri, credential_scope: CredentialScope) -> Self {
        StaticEndpoint {
            endpoint: Endpoint::new(uri, credential_scope),
        }
    }
}

impl ResolveEndpoint for StaticEndpoint {
    fn resolve_endpoint(&self, _service: &ServiceInfo, _region: &Region) -> Result<Endpoint, BoxError> {
        Ok(self.endpoint.clone())
    }
}
