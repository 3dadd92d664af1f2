/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::config::{ConfigError, ConfigOverrides, ConfigProvider};
use crate::dispatch::{DispatchHandler, SEND_HANDLER_NAME};
use crate::retry;
use qsdk_auth::provider::{ProvideCredentials, SharedCredentialsProvider};
use qsdk_http::handler::{Handlers, Phase};
use qsdk_http::operation::{ClientInfo, Operation, OperationTable, ServiceInfo};
use qsdk_http::protocol::{
    handler_name, BuildHandler, Ec2Query, ProtocolCodec, UnmarshalErrorHandler, UnmarshalHandler,
    UnmarshalMetaHandler,
};
use qsdk_http::request::{OutputTarget, Request, RequestInit};
use qsdk_http::result::{SdkError, SdkSuccess};
use qsdk_query::SerializeQuery;
use qsdk_sig_auth::handler::{SigV4SigningHandler, SIGN_HANDLER_NAME};
use qsdk_xml::{DeserializeXml, Node};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, debug_span, Instrument};

type ClientHook = Box<dyn FnOnce(&mut Handlers) + Send>;
type RequestHook = Arc<dyn Fn(&mut RequestInit<'_>) + Send + Sync>;

/// The operation passed to [`Client::invoke_named`] is not in the client's operation table
#[derive(Debug, Error)]
#[error("`{0}` is not an operation of this client")]
pub struct UnknownOperation(pub String);

/// A query protocol service client
///
/// A client is created once per service and shared freely: it is cheap to clone and every
/// invocation only reads the client's state. Each invocation runs a copy of the client's handler
/// chain:
///
/// | Phase            | Handler                               |
/// |------------------|---------------------------------------|
/// | `Build`          | `{protocol}.Build`                    |
/// | `Sign`           | `v4.SignRequest`                      |
/// | `Send`           | `core.SendHandler`                    |
/// | `Unmarshal`      | `{protocol}.Unmarshal`                |
/// | `UnmarshalMeta`  | `{protocol}.UnmarshalMeta`            |
/// | `UnmarshalError` | `{protocol}.UnmarshalError`           |
///
/// followed by any handlers added with [`Builder::customize_client`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    client_info: Arc<ClientInfo>,
    handlers: Handlers,
    credentials_provider: SharedCredentialsProvider,
    retry_policy: retry::Standard,
    operations: OperationTable,
    customize_request: Option<RequestHook>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_info", &self.inner.client_info)
            .field("handlers", &self.inner.handlers)
            .field("retry_policy", &self.inner.retry_policy)
            .finish()
    }
}

impl Client {
    pub fn builder(service: ServiceInfo) -> Builder {
        Builder::new(service)
    }

    /// Creates an EC2 query client for `service`. See [`Builder::build`].
    pub async fn new(
        service: ServiceInfo,
        config: &dyn ConfigProvider,
        overrides: &[ConfigOverrides],
    ) -> Result<Self, ConfigError> {
        Builder::new(service).build(config, overrides).await
    }

    pub fn client_info(&self) -> &ClientInfo {
        &self.inner.client_info
    }

    /// The handler chain every request of this client starts from
    pub fn handlers(&self) -> &Handlers {
        &self.inner.handlers
    }

    pub fn operations(&self) -> &OperationTable {
        &self.inner.operations
    }

    /// Creates a request for `operation` without sending it
    ///
    /// The request carries a copy of the client's handler chain, the credentials provider and
    /// the signing scope in its property bag, and has been through the client's request
    /// customization.
    pub fn new_request(
        &self,
        operation: &Operation,
        input: impl SerializeQuery + Send + Sync + 'static,
        output: OutputTarget,
    ) -> Request {
        let mut request = Request::new(
            operation.clone(),
            self.inner.client_info.clone(),
            self.inner.handlers.clone(),
            input,
            output,
        );
        let properties = request.properties_mut();
        properties.insert(self.inner.credentials_provider.clone());
        properties.insert(self.inner.client_info.signing_region().clone());
        properties.insert(self.inner.client_info.signing_name().clone());
        match &self.inner.customize_request {
            Some(hook) => request.customize(|init| hook(init)),
            None => request,
        }
    }

    /// Invokes `operation` and decodes its output as `O`
    pub async fn invoke<O>(
        &self,
        operation: &Operation,
        input: impl SerializeQuery + Send + Sync + 'static,
    ) -> Result<O, SdkError>
    where
        O: DeserializeXml + Send + 'static,
    {
        self.invoke_raw(operation, input)
            .await
            .map(|success| success.parsed)
    }

    /// Invokes an operation of the client's operation table by name
    ///
    /// The output is returned as an untyped XML tree.
    pub async fn invoke_named(
        &self,
        name: &str,
        input: impl SerializeQuery + Send + Sync + 'static,
    ) -> Result<Node, SdkError> {
        let operation = self
            .inner
            .operations
            .get(name)
            .cloned()
            .ok_or_else(|| SdkError::marshal(UnknownOperation(name.to_string())))?;
        self.invoke(&operation, input).await
    }

    /// Invokes `operation`, returning the raw response and its metadata with the output
    pub async fn invoke_raw<O>(
        &self,
        operation: &Operation,
        input: impl SerializeQuery + Send + Sync + 'static,
    ) -> Result<SdkSuccess<O>, SdkError>
    where
        O: DeserializeXml + Send + 'static,
    {
        let span = debug_span!(
            "invoke",
            service = %self.inner.client_info.service_name(),
            operation = operation.name,
        );
        let request = self.new_request(operation, input, OutputTarget::of::<O>());
        async move {
            let success = request.send(&self.inner.retry_policy).await?;
            let SdkSuccess {
                raw,
                parsed,
                metadata,
            } = success;
            let parsed = parsed.downcast::<O>().map_err(|_| {
                SdkError::unmarshal(format!(
                    "an unmarshal handler produced an output other than `{}`",
                    std::any::type_name::<O>()
                ))
            })?;
            debug!(request_id = ?metadata.request_id(), "invocation complete");
            Ok(SdkSuccess {
                raw,
                parsed: *parsed,
                metadata,
            })
        }
        .instrument(span)
        .await
    }
}

/// Builder for [`Client`]
pub struct Builder {
    service: ServiceInfo,
    protocol: Arc<dyn ProtocolCodec>,
    operations: OperationTable,
    customize_client: Vec<ClientHook>,
    customize_request: Option<RequestHook>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("service", &self.service)
            .field("protocol", &self.protocol)
            .field("operations", &self.operations)
            .finish()
    }
}

impl Builder {
    pub fn new(service: ServiceInfo) -> Self {
        Builder {
            service,
            protocol: Arc::new(Ec2Query),
            operations: OperationTable::new(),
            customize_client: Vec::new(),
            customize_request: None,
        }
    }

    /// Sets the wire protocol. Defaults to [`Ec2Query`].
    pub fn protocol(mut self, protocol: impl ProtocolCodec + 'static) -> Self {
        self.protocol = Arc::new(protocol);
        self
    }

    /// Sets the operations available through [`Client::invoke_named`]
    pub fn operations(mut self, operations: OperationTable) -> Self {
        self.operations = operations;
        self
    }

    /// Runs `f` against the client's handler chain once the default handlers are registered
    ///
    /// Hooks run in the order they were added. Handlers can only be appended.
    pub fn customize_client(mut self, f: impl FnOnce(&mut Handlers) + Send + 'static) -> Self {
        self.customize_client.push(Box::new(f));
        self
    }

    /// Runs `f` against every request this client creates, before it is sent
    pub fn customize_request(
        mut self,
        f: impl Fn(&mut RequestInit<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.customize_request = Some(Arc::new(f));
        self
    }

    /// Resolves the configuration of the client and registers its handler chain
    ///
    /// Credentials are requested once to validate the configuration. If they are unavailable no
    /// client is created and no request is sent.
    pub async fn build(
        self,
        config: &dyn ConfigProvider,
        overrides: &[ConfigOverrides],
    ) -> Result<Client, ConfigError> {
        let resolved = config.client_config(&self.service, overrides)?;
        resolved
            .credentials_provider
            .provide_credentials()
            .await
            .map_err(ConfigError::CredentialsUnavailable)?;

        let protocol = self.protocol;
        let mut handlers = Handlers::new();
        handlers.phase_mut(Phase::Build).push_back_named(
            handler_name(protocol.as_ref(), Phase::Build),
            BuildHandler::new(protocol.clone()),
        );
        handlers
            .phase_mut(Phase::Sign)
            .push_back_named(SIGN_HANDLER_NAME, SigV4SigningHandler::default());
        handlers.phase_mut(Phase::Send).push_back_named(
            SEND_HANDLER_NAME,
            DispatchHandler::new(resolved.connector, resolved.timeout_config),
        );
        handlers.phase_mut(Phase::Unmarshal).push_back_named(
            handler_name(protocol.as_ref(), Phase::Unmarshal),
            UnmarshalHandler::new(protocol.clone()),
        );
        handlers.phase_mut(Phase::UnmarshalMeta).push_back_named(
            handler_name(protocol.as_ref(), Phase::UnmarshalMeta),
            UnmarshalMetaHandler::new(protocol.clone()),
        );
        handlers.phase_mut(Phase::UnmarshalError).push_back_named(
            handler_name(protocol.as_ref(), Phase::UnmarshalError),
            UnmarshalErrorHandler::new(protocol),
        );
        for hook in self.customize_client {
            hook(&mut handlers);
        }

        let client_info = resolved.client_info;
        debug!(
            service = client_info.service_name(),
            endpoint = %client_info.endpoint(),
            handlers = handlers.len(),
            "created client"
        );
        Ok(Client {
            inner: Arc::new(Inner {
                client_info: Arc::new(client_info),
                handlers,
                credentials_provider: resolved.credentials_provider,
                retry_policy: retry::Standard::new(resolved.retry_config),
                operations: self.operations,
                customize_request: self.customize_request,
            }),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Client, UnknownOperation};
    use crate::config::{ConfigError, SdkConfig};
    use crate::test_connection::NeverConnection;
    use qsdk_auth::provider::{provide_credentials_fn, CredentialsError};
    use qsdk_auth::Credentials;
    use qsdk_http::handler::{handler_fn, Phase};
    use qsdk_http::operation::ServiceInfo;
    use qsdk_http::protocol::AwsQuery;
    use qsdk_http::result::SdkError;
    use qsdk_types::{Region, SigningName, SigningRegion};
    use std::error::Error;

    fn is_send_sync<T: Send + Sync + Clone>() {}

    fn config(conn: NeverConnection) -> SdkConfig {
        SdkConfig::builder()
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::for_tests())
            .connector(conn)
            .build_sdk_config()
    }

    #[test]
    fn client_is_shareable() {
        is_send_sync::<Client>();
    }

    #[tokio::test]
    async fn default_handler_chain() {
        let client = Client::builder(ServiceInfo::new("sts", "2011-06-15"))
            .protocol(AwsQuery)
            .customize_client(|handlers| {
                handlers
                    .phase_mut(Phase::Build)
                    .push_back_named("custom.UserAgent", handler_fn(|_| Ok(())));
            })
            .build(&config(NeverConnection::new()), &[])
            .await
            .expect("valid config");
        let names = |phase| {
            client
                .handlers()
                .phase(phase)
                .names()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(Phase::Build), vec!["awsquery.Build", "custom.UserAgent"]);
        assert_eq!(names(Phase::Sign), vec!["v4.SignRequest"]);
        assert_eq!(names(Phase::Send), vec!["core.SendHandler"]);
        assert_eq!(names(Phase::Unmarshal), vec!["awsquery.Unmarshal"]);
        assert_eq!(names(Phase::UnmarshalMeta), vec!["awsquery.UnmarshalMeta"]);
        assert_eq!(names(Phase::UnmarshalError), vec!["awsquery.UnmarshalError"]);
    }

    #[tokio::test]
    async fn requests_carry_signing_scope() {
        let client = Client::new(
            ServiceInfo::new("ec2", "2016-11-15"),
            &config(NeverConnection::new()),
            &[],
        )
        .await
        .expect("valid config");
        let request = client.new_request(
            &qsdk_http::operation::Operation::post("DescribeRegions"),
            (),
            qsdk_http::request::OutputTarget::of::<()>(),
        );
        assert_eq!(
            request.properties().get::<SigningRegion>(),
            Some(&SigningRegion::from_static("us-east-1"))
        );
        assert_eq!(
            request.properties().get::<SigningName>(),
            Some(&SigningName::from_static("ec2"))
        );
        assert_eq!(request.handlers().len(), client.handlers().len());
    }

    #[tokio::test]
    async fn credentials_are_validated_at_construction() {
        let conn = NeverConnection::new();
        let config = SdkConfig::builder()
            .region(Region::new("us-east-1"))
            .credentials_provider(provide_credentials_fn(|| async {
                Err(CredentialsError::CredentialsNotLoaded)
            }))
            .connector(conn.clone())
            .build_sdk_config();
        let err = Client::new(ServiceInfo::new("ec2", "2016-11-15"), &config, &[])
            .await
            .expect_err("credentials are unavailable");
        assert!(matches!(
            err,
            ConfigError::CredentialsUnavailable(CredentialsError::CredentialsNotLoaded)
        ));
        assert_eq!(conn.num_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_named_operation() {
        let conn = NeverConnection::new();
        let client = Client::new(ServiceInfo::new("ec2", "2016-11-15"), &config(conn.clone()), &[])
            .await
            .expect("valid config");
        let err = client
            .invoke_named("DescribeRegions", ())
            .await
            .expect_err("the operation table is empty");
        assert!(matches!(err, SdkError::MarshalError(_)));
        assert!(err
            .source()
            .and_then(|source| source.downcast_ref::<UnknownOperation>())
            .is_some());
        assert_eq!(conn.num_calls(), 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn construction_is_logged() {
        Client::new(
            ServiceInfo::new("ec2", "2016-11-15"),
            &config(NeverConnection::new()),
            &[],
        )
        .await
        .expect("valid config");
        assert!(logs_contain("created client"));
        assert!(logs_contain("https://ec2.us-east-1.amazonaws.com"));
    }
}
