/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Wire protocols and the handlers that plug them into a request
//!
//! A [`ProtocolCodec`] knows how to turn an operation input into a request body and how to read
//! the responses of a service. The handler types of this module wrap a shared codec so it can be
//! registered in the `Build`, `Unmarshal`, `UnmarshalMeta` and `UnmarshalError` phases.

mod aws_query;
mod ec2_query;

pub use aws_query::AwsQuery;
pub use ec2_query::Ec2Query;

use crate::body::SdkBody;
use crate::handler::{Handler, HandlerFuture, Phase};
use crate::operation::Operation;
use crate::request::{OutputTarget, Request};
use crate::request_id::extract_request_id;
use crate::result::{status_code_name, ResponseMetadata, SdkError, ServiceError};
use crate::BoxError;
use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER};
use http::uri::PathAndQuery;
use http::{Method, Uri};
use qsdk_query::{QueryFlavor, QueryWriter, SerializeQuery};
use qsdk_xml::{DeserializeXml, Document, Node, ScopedDecoder, XmlDecodeError};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const QUERY_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Serializes operation inputs and decodes responses for one wire protocol
pub trait ProtocolCodec: Send + Sync + fmt::Debug {
    /// Prefix of the names the codec's handlers are registered under, e.g. `ec2query`
    fn name(&self) -> &'static str;

    fn content_type(&self) -> &'static str {
        QUERY_CONTENT_TYPE
    }

    /// Serializes `input` into the request body of `operation`
    fn marshal(
        &self,
        operation: &Operation,
        api_version: &str,
        input: &dyn SerializeQuery,
    ) -> Result<Bytes, BoxError>;

    /// Decodes a successful response into the requested output type
    fn unmarshal(
        &self,
        operation: &Operation,
        response: &http::Response<Bytes>,
        output: &OutputTarget,
    ) -> Result<Box<dyn Any + Send>, BoxError>;

    /// Reads the metadata of any response, successful or not
    fn unmarshal_meta(&self, response: &http::Response<Bytes>) -> ResponseMetadata;

    /// Decodes an error response
    ///
    /// This never fails: a body that cannot be decoded still produces a [`ServiceError`] that
    /// carries the response status.
    fn unmarshal_error(&self, response: &http::Response<Bytes>) -> ServiceError;
}

/// The name a codec's handler is registered under in `phase`, e.g. `ec2query.Build`
pub fn handler_name(codec: &dyn ProtocolCodec, phase: Phase) -> String {
    format!("{}.{}", codec.name(), phase)
}

/// Writes the `Action`, `Version` and input parameters of a query request
fn marshal_query(
    flavor: QueryFlavor,
    operation: &Operation,
    api_version: &str,
    input: &dyn SerializeQuery,
) -> Result<Bytes, BoxError> {
    let mut out = String::new();
    let mut writer = QueryWriter::new(&mut out, flavor, operation.name, api_version);
    input.serialize_query(&mut writer)?;
    writer.finish();
    Ok(Bytes::from(out))
}

/// Opens the root element of a response and checks that it is `<{Operation}Response>`
fn response_root<'inp, 'a>(
    doc: &'a mut Document<'inp>,
    operation: &Operation,
) -> Result<ScopedDecoder<'inp, 'a>, XmlDecodeError> {
    let root = doc.root_element()?;
    let local = root.start_el().local();
    if local.len() != operation.name.len() + "Response".len()
        || !local.starts_with(operation.name)
        || !local.ends_with("Response")
    {
        return Err(XmlDecodeError::custom(format!(
            "expected <{}Response> but found <{}>",
            operation.name, local
        )));
    }
    Ok(root)
}

fn parse_body(body: &[u8]) -> Result<Node, XmlDecodeError> {
    let mut doc = Document::try_from(body)?;
    let mut root = doc.root_element()?;
    Node::deserialize_xml(&mut root)
}

/// Where a protocol puts the fields of its error documents
struct ErrorShape {
    root: &'static str,
    error: &'static [&'static str],
    request_id: &'static str,
}

fn decode_error(shape: &ErrorShape, response: &http::Response<Bytes>) -> ServiceError {
    let status = response.status();
    let header_request_id = || extract_request_id(response.headers()).map(str::to_string);
    let root = match parse_body(response.body()) {
        Ok(root) if root.name == shape.root => root,
        Ok(root) => {
            return ServiceError::new(
                status_code_name(status),
                format!("unexpected error document <{}>", root.name),
                header_request_id(),
                status,
            )
        }
        Err(err) => {
            debug!(error = %err, status = %status, "error response body could not be decoded");
            let message = if response.body().is_empty() {
                String::new()
            } else {
                format!("failed to decode error response: {}", err)
            };
            return ServiceError::new(status_code_name(status), message, header_request_id(), status);
        }
    };
    let error = root.find(shape.error);
    let text = |name: &str| {
        error
            .and_then(|error| error.child(name))
            .map(|node| node.text.clone())
            .filter(|text| !text.is_empty())
    };
    let request_id = root
        .child(shape.request_id)
        .map(|node| node.text.clone())
        .filter(|text| !text.is_empty())
        .or_else(header_request_id);
    ServiceError::new(
        text("Code").unwrap_or_else(|| status_code_name(status)),
        text("Message").unwrap_or_default(),
        request_id,
        status,
    )
}

/// Delay requested by a `Retry-After` header given in seconds
///
/// HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Reads the request ID of any response, from its headers first and then from its body
fn decode_meta(
    response: &http::Response<Bytes>,
    body_request_id: impl FnOnce(&Node) -> Option<&Node>,
) -> ResponseMetadata {
    let request_id = extract_request_id(response.headers())
        .map(str::to_string)
        .or_else(|| {
            let root = parse_body(response.body()).ok()?;
            body_request_id(&root)
                .map(|node| node.text.clone())
                .filter(|text| !text.is_empty())
        });
    ResponseMetadata::new(request_id, Some(response.status()))
}

/// Joins the endpoint with the operation path, e.g. `https://ec2.us-east-1.amazonaws.com` and
/// `/` into `https://ec2.us-east-1.amazonaws.com/`
fn operation_uri(endpoint: &Uri, path: &str, query: Option<&str>) -> Result<Uri, BoxError> {
    let parts = endpoint.clone().into_parts();
    let scheme = parts.scheme.ok_or("endpoint has no scheme")?;
    let authority = parts.authority.ok_or("endpoint has no authority")?;
    let base = parts
        .path_and_query
        .as_ref()
        .map(PathAndQuery::path)
        .unwrap_or("")
        .trim_end_matches('/');
    let mut path_and_query = format!("{}/{}", base, path.trim_start_matches('/'));
    if let Some(query) = query {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }
    Ok(Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query(path_and_query)
        .build()?)
}

/// `Build` phase: marshals the input into the HTTP request every attempt starts from
///
/// Inputs of `GET` operations are sent as the query string, every other method sends them as a
/// form encoded body.
#[derive(Clone, Debug)]
pub struct BuildHandler {
    codec: Arc<dyn ProtocolCodec>,
}

impl BuildHandler {
    pub fn new(codec: Arc<dyn ProtocolCodec>) -> Self {
        BuildHandler { codec }
    }

    fn build(&self, request: &Request) -> Result<http::Request<SdkBody>, BoxError> {
        let operation = request.operation();
        let client_info = request.client_info();
        let body = self
            .codec
            .marshal(operation, client_info.api_version(), request.input())?;
        let builder = http::Request::builder().method(operation.http_method.clone());
        let http_request = if operation.http_method == Method::GET {
            let query = std::str::from_utf8(&body)?;
            builder
                .uri(operation_uri(
                    client_info.endpoint(),
                    operation.http_path,
                    Some(query),
                )?)
                .body(SdkBody::empty())?
        } else {
            builder
                .uri(operation_uri(
                    client_info.endpoint(),
                    operation.http_path,
                    None,
                )?)
                .header(CONTENT_TYPE, self.codec.content_type())
                .header(CONTENT_LENGTH, body.len())
                .body(SdkBody::from(body))?
        };
        Ok(http_request)
    }
}

impl Handler for BuildHandler {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        let result = self
            .build(request)
            .map(|http_request| request.set_built_request(http_request))
            .map_err(SdkError::MarshalError);
        Box::pin(std::future::ready(result))
    }
}

/// `Unmarshal` phase: decodes a successful response into the request's output
#[derive(Clone, Debug)]
pub struct UnmarshalHandler {
    codec: Arc<dyn ProtocolCodec>,
}

impl UnmarshalHandler {
    pub fn new(codec: Arc<dyn ProtocolCodec>) -> Self {
        UnmarshalHandler { codec }
    }

    fn unmarshal(&self, request: &mut Request) -> Result<(), SdkError> {
        let response = request
            .http_response()
            .ok_or_else(|| SdkError::unmarshal("no response to unmarshal"))?;
        let output = self
            .codec
            .unmarshal(request.operation(), response, request.output_target())
            .map_err(SdkError::UnmarshalError)?;
        request.set_output(output);
        Ok(())
    }
}

impl Handler for UnmarshalHandler {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        Box::pin(std::future::ready(self.unmarshal(request)))
    }
}

/// `UnmarshalMeta` phase: records the request ID and status of the attempt's response
#[derive(Clone, Debug)]
pub struct UnmarshalMetaHandler {
    codec: Arc<dyn ProtocolCodec>,
}

impl UnmarshalMetaHandler {
    pub fn new(codec: Arc<dyn ProtocolCodec>) -> Self {
        UnmarshalMetaHandler { codec }
    }
}

impl Handler for UnmarshalMetaHandler {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        // attempts that failed before `Send` have no response and keep empty metadata
        if let Some(metadata) = request
            .http_response()
            .map(|response| self.codec.unmarshal_meta(response))
        {
            request.set_metadata(metadata);
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

/// `UnmarshalError` phase: decodes an error response into a [`ServiceError`]
///
/// The error is recorded on the request rather than returned, so later handlers of the phase
/// can inspect or replace it.
#[derive(Clone, Debug)]
pub struct UnmarshalErrorHandler {
    codec: Arc<dyn ProtocolCodec>,
}

impl UnmarshalErrorHandler {
    pub fn new(codec: Arc<dyn ProtocolCodec>) -> Self {
        UnmarshalErrorHandler { codec }
    }
}

impl Handler for UnmarshalErrorHandler {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        if let Some(err) = request.http_response().map(|response| {
            let err = self.codec.unmarshal_error(response);
            match retry_after(response.headers()) {
                Some(delay) => err.with_retry_after(delay),
                None => err,
            }
        }) {
            debug!(
                code = err.code(),
                status = %err.status(),
                retry_after = ?err.retry_after(),
                "service returned an error"
            );
            request.set_error(SdkError::ServiceError(err));
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

#[cfg(test)]
mod test {
    use super::{
        handler_name, operation_uri, retry_after, BuildHandler, Ec2Query, ProtocolCodec,
        UnmarshalErrorHandler,
    };
    use crate::handler::{Handler, Handlers, Phase};
    use crate::operation::{ClientInfo, Operation, ServiceInfo};
    use crate::request::{OutputTarget, Request};
    use bytes::Bytes;
    use http::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use http::{Method, Uri};
    use qsdk_query::QueryParams;
    use qsdk_types::retry::RetryKind;
    use qsdk_types::{Region, SigningName, SigningRegion};
    use std::sync::Arc;
    use std::time::Duration;

    fn request(endpoint: &'static str, operation: Operation) -> Request {
        let client_info = ClientInfo::new(
            ServiceInfo::new("ec2", "2016-11-15"),
            Region::new("us-east-1"),
            Uri::from_static(endpoint),
            SigningRegion::from_static("us-east-1"),
            SigningName::from_static("ec2"),
        );
        Request::new(
            operation,
            Arc::new(client_info),
            Handlers::new(),
            QueryParams::new().param("RegionName", vec!["us-east-1", "eu-west-1"]),
            OutputTarget::of::<()>(),
        )
    }

    #[test]
    fn join_endpoint_and_path() {
        let uri = |endpoint: &'static str, path, query| {
            operation_uri(&Uri::from_static(endpoint), path, query)
                .unwrap()
                .to_string()
        };
        assert_eq!(
            uri("https://ec2.us-east-1.amazonaws.com", "/", None),
            "https://ec2.us-east-1.amazonaws.com/"
        );
        assert_eq!(
            uri("http://localhost:8080/prefix/", "/", Some("Action=A")),
            "http://localhost:8080/prefix/?Action=A"
        );
        assert!(operation_uri(&Uri::from_static("/relative"), "/", None).is_err());
    }

    #[test]
    fn handler_names() {
        assert_eq!(handler_name(&Ec2Query, Phase::Build), "ec2query.Build");
        assert_eq!(
            handler_name(&Ec2Query, Phase::UnmarshalError),
            "ec2query.UnmarshalError"
        );
    }

    #[tokio::test]
    async fn build_post_request() {
        let mut request = request(
            "https://ec2.us-east-1.amazonaws.com",
            Operation::post("DescribeRegions"),
        );
        let codec: Arc<dyn ProtocolCodec> = Arc::new(Ec2Query);
        BuildHandler::new(codec)
            .handle(&mut request)
            .await
            .expect("input is valid");
        let built = request.built_request().expect("request was built");
        assert_eq!(built.method(), Method::POST);
        assert_eq!(built.uri(), "https://ec2.us-east-1.amazonaws.com/");
        assert_eq!(
            built.headers()["content-type"],
            "application/x-www-form-urlencoded; charset=utf-8"
        );
        let body = built.body().bytes().expect("body is in memory");
        assert_eq!(
            body,
            b"Action=DescribeRegions&Version=2016-11-15&RegionName.1=us-east-1&RegionName.2=eu-west-1"
        );
        assert_eq!(
            built.headers()["content-length"],
            body.len().to_string().as_str()
        );
    }

    #[tokio::test]
    async fn build_get_request() {
        let mut request = request(
            "https://ec2.us-east-1.amazonaws.com",
            Operation::new("DescribeRegions", Method::GET, "/"),
        );
        BuildHandler::new(Arc::new(Ec2Query))
            .handle(&mut request)
            .await
            .expect("input is valid");
        let built = request.built_request().expect("request was built");
        assert_eq!(
            built.uri(),
            "https://ec2.us-east-1.amazonaws.com/?Action=DescribeRegions&Version=2016-11-15\
             &RegionName.1=us-east-1&RegionName.2=eu-west-1"
        );
        assert!(built.headers().get("content-type").is_none());
        assert_eq!(built.body().bytes(), Some(&b""[..]));
    }

    #[test]
    fn retry_after_in_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[tokio::test]
    async fn throttling_errors_keep_the_requested_delay() {
        let mut request = request(
            "https://ec2.us-east-1.amazonaws.com",
            Operation::post("DescribeRegions"),
        );
        request.set_http_response(
            http::Response::builder()
                .status(503)
                .header(RETRY_AFTER, "2")
                .body(Bytes::from_static(
                    b"<Response><Errors><Error><Code>RequestLimitExceeded</Code>\
                      <Message>slow down</Message></Error></Errors>\
                      <RequestID>req-1</RequestID></Response>",
                ))
                .expect("valid response"),
        );
        UnmarshalErrorHandler::new(Arc::new(Ec2Query))
            .handle(&mut request)
            .await
            .expect("recorded on the request");
        let err = request.error().expect("service error");
        assert_eq!(err.retry_kind(), RetryKind::Explicit(Duration::from_secs(2)));
        assert_eq!(
            err.service_error().map(|err| err.code()),
            Some("RequestLimitExceeded")
        );
    }
}
