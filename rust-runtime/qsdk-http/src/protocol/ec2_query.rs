/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::{decode_error, decode_meta, marshal_query, response_root, ErrorShape, ProtocolCodec};
use crate::operation::Operation;
use crate::request::OutputTarget;
use crate::result::{ResponseMetadata, ServiceError};
use crate::BoxError;
use bytes::Bytes;
use qsdk_query::{QueryFlavor, SerializeQuery};
use qsdk_xml::Document;
use std::any::Any;

const EC2_ERROR: ErrorShape = ErrorShape {
    root: "Response",
    error: &["Errors", "Error"],
    request_id: "RequestID",
};

/// The EC2 query protocol
///
/// Requests are form encoded with flattened lists (`Name.N`). Output members are direct children
/// of `<{Operation}Response>`, next to `<requestId>`. Errors are sent as
/// `<Response><Errors><Error><Code/><Message/></Error></Errors><RequestID/></Response>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ec2Query;

impl ProtocolCodec for Ec2Query {
    fn name(&self) -> &'static str {
        "ec2query"
    }

    fn marshal(
        &self,
        operation: &Operation,
        api_version: &str,
        input: &dyn SerializeQuery,
    ) -> Result<Bytes, BoxError> {
        marshal_query(QueryFlavor::Ec2, operation, api_version, input)
    }

    fn unmarshal(
        &self,
        operation: &Operation,
        response: &http::Response<Bytes>,
        output: &OutputTarget,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        let mut doc = Document::try_from(response.body().as_ref())?;
        let mut root = response_root(&mut doc, operation)?;
        Ok(output.decode(&mut root)?)
    }

    fn unmarshal_meta(&self, response: &http::Response<Bytes>) -> ResponseMetadata {
        decode_meta(response, |root| {
            root.child("requestId").or_else(|| root.child("RequestID"))
        })
    }

    fn unmarshal_error(&self, response: &http::Response<Bytes>) -> ServiceError {
        decode_error(&EC2_ERROR, response)
    }
}
