/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Pull-based XML decoding for query protocol responses.

pub mod decode;
mod node;
mod unescape;

pub use decode::{try_data, Document, ScopedDecoder, StartEl, XmlDecodeError, XmlToken};
pub use node::Node;
pub use unescape::unescape;

/// Types that can be read from the children of an XML element
///
/// The decoder is scoped to the element that holds the members, for example
/// `<DescribeRegionsResponse>` for EC2 Query or `<ListUsersResult>` for AWS Query.
pub trait DeserializeXml: Sized {
    fn deserialize_xml(decoder: &mut ScopedDecoder<'_, '_>) -> Result<Self, XmlDecodeError>;
}

impl DeserializeXml for () {
    fn deserialize_xml(_decoder: &mut ScopedDecoder<'_, '_>) -> Result<Self, XmlDecodeError> {
        Ok(())
    }
}
