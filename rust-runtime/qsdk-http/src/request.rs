/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::body::SdkBody;
use crate::handler::{Handler, Handlers, Phase};
use crate::operation::{ClientInfo, Operation};
use crate::property_bag::PropertyBag;
use crate::result::{ResponseMetadata, SdkError};
use bytes::Bytes;
use qsdk_query::SerializeQuery;
use qsdk_xml::{DeserializeXml, ScopedDecoder, XmlDecodeError};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type DecodeFn =
    fn(&mut ScopedDecoder<'_, '_>) -> Result<Box<dyn Any + Send>, XmlDecodeError>;

/// The type a successful response is decoded into
///
/// The handler chain is shared by every operation of a client, so the output type is carried by
/// the request rather than by the handlers.
#[derive(Clone, Copy)]
pub struct OutputTarget {
    type_name: &'static str,
    decode: DecodeFn,
}

fn decode_boxed<O>(decoder: &mut ScopedDecoder<'_, '_>) -> Result<Box<dyn Any + Send>, XmlDecodeError>
where
    O: DeserializeXml + Send + 'static,
{
    Ok(Box::new(O::deserialize_xml(decoder)?))
}

impl OutputTarget {
    pub fn of<O: DeserializeXml + Send + 'static>() -> Self {
        OutputTarget {
            type_name: std::any::type_name::<O>(),
            decode: decode_boxed::<O>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn decode(
        &self,
        decoder: &mut ScopedDecoder<'_, '_>,
    ) -> Result<Box<dyn Any + Send>, XmlDecodeError> {
        (self.decode)(decoder)
    }
}

impl fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutputTarget").field(&self.type_name).finish()
    }
}

/// One in-flight call
///
/// A request owns a snapshot of its client's handler chain, the operation input, and the state
/// handlers exchange while it runs. It is created by the client, customized through
/// [`Request::customize`], then consumed by [`Request::send`].
pub struct Request {
    pub(crate) operation: Operation,
    pub(crate) client_info: Arc<ClientInfo>,
    pub(crate) handlers: Handlers,
    input: Box<dyn SerializeQuery + Send + Sync>,
    output_target: OutputTarget,
    properties: PropertyBag,
    pub(crate) built_request: Option<http::Request<SdkBody>>,
    pub(crate) http_request: Option<http::Request<SdkBody>>,
    pub(crate) http_response: Option<http::Response<Bytes>>,
    pub(crate) output: Option<Box<dyn Any + Send>>,
    pub(crate) error: Option<SdkError>,
    pub(crate) metadata: ResponseMetadata,
    pub(crate) attempts: u32,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("operation", &self.operation.name)
            .field("service", &self.client_info.service_name())
            .field("output_target", &self.output_target)
            .field("properties", &self.properties)
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl Request {
    pub fn new(
        operation: Operation,
        client_info: Arc<ClientInfo>,
        handlers: Handlers,
        input: impl SerializeQuery + Send + Sync + 'static,
        output_target: OutputTarget,
    ) -> Self {
        Request {
            operation,
            client_info,
            handlers,
            input: Box::new(input),
            output_target,
            properties: PropertyBag::new(),
            built_request: None,
            http_request: None,
            http_response: None,
            output: None,
            error: None,
            metadata: ResponseMetadata::default(),
            attempts: 0,
        }
    }

    /// Runs a customization hook against this request before it is sent
    pub fn customize(mut self, f: impl FnOnce(&mut RequestInit<'_>)) -> Self {
        f(&mut RequestInit { request: &mut self });
        self
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    /// The handler chain this request runs. Fixed once the request is sent.
    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn input(&self) -> &dyn SerializeQuery {
        self.input.as_ref()
    }

    pub fn output_target(&self) -> &OutputTarget {
        &self.output_target
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    /// Number of attempts started so far, including the current one
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Stores the HTTP request produced by the `Build` phase
    ///
    /// Every attempt starts from a copy of this request.
    pub fn set_built_request(&mut self, request: http::Request<SdkBody>) {
        self.built_request = Some(request);
    }

    pub fn built_request(&self) -> Option<&http::Request<SdkBody>> {
        self.built_request.as_ref()
    }

    /// The HTTP request of the current attempt, available from `Sign` until `Send` takes it
    pub fn http_request(&self) -> Option<&http::Request<SdkBody>> {
        self.http_request.as_ref()
    }

    /// Replaces the HTTP request of the current attempt
    pub fn set_http_request(&mut self, request: http::Request<SdkBody>) {
        self.http_request = Some(request);
    }

    pub fn http_request_mut(&mut self) -> Option<&mut http::Request<SdkBody>> {
        self.http_request.as_mut()
    }

    pub fn take_http_request(&mut self) -> Option<http::Request<SdkBody>> {
        self.http_request.take()
    }

    pub fn set_http_response(&mut self, response: http::Response<Bytes>) {
        self.http_response = Some(response);
    }

    pub fn http_response(&self) -> Option<&http::Response<Bytes>> {
        self.http_response.as_ref()
    }

    pub fn set_output(&mut self, output: Box<dyn Any + Send>) {
        self.output = Some(output);
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Records the error of the current attempt without stopping the phase
    ///
    /// `UnmarshalError` handlers use this so that later handlers of the phase still observe the
    /// decoded error.
    pub fn set_error(&mut self, error: SdkError) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&SdkError> {
        self.error.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: ResponseMetadata) {
        self.metadata = metadata;
    }

    pub fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }
}

/// Customization view of a [`Request`] before it is sent
///
/// Handlers may only be appended, so the order established by the client is preserved.
pub struct RequestInit<'a> {
    request: &'a mut Request,
}

impl RequestInit<'_> {
    pub fn operation(&self) -> &Operation {
        &self.request.operation
    }

    pub fn client_info(&self) -> &ClientInfo {
        &self.request.client_info
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.request.properties
    }

    pub fn push_back_named(
        &mut self,
        phase: Phase,
        name: impl Into<Cow<'static, str>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.request
            .handlers
            .phase_mut(phase)
            .push_back_named(name, handler);
        self
    }
}
