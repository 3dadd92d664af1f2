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

const AWS_QUERY_ERROR: ErrorShape = ErrorShape {
    root: "ErrorResponse",
    error: &["Error"],
    request_id: "RequestId",
};

/// The AWS query protocol
///
/// Requests are form encoded with `Name.member.N` lists. Output members are wrapped in
/// `<{Operation}Response><{Operation}Result>`, followed by
/// `<ResponseMetadata><RequestId/></ResponseMetadata>`. Errors are sent as
/// `<ErrorResponse><Error><Type/><Code/><Message/></Error><RequestId/></ErrorResponse>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AwsQuery;

impl ProtocolCodec for AwsQuery {
    fn name(&self) -> &'static str {
        "awsquery"
    }

    fn marshal(
        &self,
        operation: &Operation,
        api_version: &str,
        input: &dyn SerializeQuery,
    ) -> Result<Bytes, BoxError> {
        marshal_query(QueryFlavor::Aws, operation, api_version, input)
    }

    fn unmarshal(
        &self,
        operation: &Operation,
        response: &http::Response<Bytes>,
        output: &OutputTarget,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        let body = response.body().as_ref();
        let result_name = format!("{}Result", operation.name);
        {
            let mut doc = Document::try_from(body)?;
            let mut root = response_root(&mut doc, operation)?;
            while let Some(mut tag) = root.next_tag() {
                if tag.start_el().local() == result_name {
                    return Ok(output.decode(&mut tag)?);
                }
            }
        }
        // operations without output members may omit the result wrapper
        let mut doc = Document::try_from(body)?;
        let mut root = response_root(&mut doc, operation)?;
        Ok(output.decode(&mut root)?)
    }

    fn unmarshal_meta(&self, response: &http::Response<Bytes>) -> ResponseMetadata {
        decode_meta(response, |root| {
            root.find(&["ResponseMetadata", "RequestId"])
                .or_else(|| root.child("RequestId"))
        })
    }

    fn unmarshal_error(&self, response: &http::Response<Bytes>) -> ServiceError {
        decode_error(&AWS_QUERY_ERROR, response)
    }
}
