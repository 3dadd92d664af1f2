/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use http::{Method, Uri};
use qsdk_types::{Region, SigningName, SigningRegion};
use std::borrow::Cow;
use std::collections::HashMap;

/// Static description of an API call
///
/// Operations are declared once per API and shared by every invocation:
///
/// ```rust
/// use qsdk_http::operation::Operation;
///
/// const DESCRIBE_REGIONS: Operation = Operation::post("DescribeRegions");
/// assert_eq!(DESCRIBE_REGIONS.http_path, "/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub http_method: Method,
    pub http_path: &'static str,
}

impl Operation {
    pub const fn new(name: &'static str, http_method: Method, http_path: &'static str) -> Self {
        Operation {
            name,
            http_method,
            http_path,
        }
    }

    /// An operation sent as `POST /`, which is how every query protocol operation is modeled
    pub const fn post(name: &'static str) -> Self {
        Self::new(name, Method::POST, "/")
    }
}

/// Operations supported by a client, keyed by name
#[derive(Clone, Debug, Default)]
pub struct OperationTable {
    operations: HashMap<&'static str, Operation>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, operation: Operation) -> Self {
        self.insert(operation);
        self
    }

    /// Adds an operation, replacing any operation with the same name
    pub fn insert(&mut self, operation: Operation) -> Option<Operation> {
        self.operations.insert(operation.name, operation)
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }
}

impl FromIterator<Operation> for OperationTable {
    fn from_iter<T: IntoIterator<Item = Operation>>(iter: T) -> Self {
        let mut table = OperationTable::new();
        for operation in iter {
            table.insert(operation);
        }
        table
    }
}

/// The identity of a service: everything a client needs that does not depend on the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInfo {
    service_name: Cow<'static, str>,
    endpoints_id: Cow<'static, str>,
    signing_name: SigningName,
    api_version: Cow<'static, str>,
}

impl ServiceInfo {
    /// A service whose endpoint prefix and signing name are both `service_name`
    pub fn new(service_name: &'static str, api_version: &'static str) -> Self {
        ServiceInfo {
            service_name: Cow::Borrowed(service_name),
            endpoints_id: Cow::Borrowed(service_name),
            signing_name: SigningName::from_static(service_name),
            api_version: Cow::Borrowed(api_version),
        }
    }

    pub fn with_signing_name(mut self, signing_name: impl Into<SigningName>) -> Self {
        self.signing_name = signing_name.into();
        self
    }

    pub fn with_endpoints_id(mut self, endpoints_id: impl Into<Cow<'static, str>>) -> Self {
        self.endpoints_id = endpoints_id.into();
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Identifier used when resolving the endpoint, e.g. the `{service}` in an endpoint template
    pub fn endpoints_id(&self) -> &str {
        &self.endpoints_id
    }

    pub fn signing_name(&self) -> &SigningName {
        &self.signing_name
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

/// Resolved configuration of one service client
///
/// Immutable once built; shared by every request the client creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientInfo {
    service: ServiceInfo,
    region: Region,
    endpoint: Uri,
    signing_region: SigningRegion,
    signing_name: SigningName,
}

impl ClientInfo {
    pub fn new(
        service: ServiceInfo,
        region: Region,
        endpoint: Uri,
        signing_region: SigningRegion,
        signing_name: SigningName,
    ) -> Self {
        ClientInfo {
            service,
            region,
            endpoint,
            signing_region,
            signing_name,
        }
    }

    pub fn service(&self) -> &ServiceInfo {
        &self.service
    }

    pub fn service_name(&self) -> &str {
        self.service.service_name()
    }

    pub fn api_version(&self) -> &str {
        self.service.api_version()
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    pub fn signing_region(&self) -> &SigningRegion {
        &self.signing_region
    }

    pub fn signing_name(&self) -> &SigningName {
        &self.signing_name
    }
}
