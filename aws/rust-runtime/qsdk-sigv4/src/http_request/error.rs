/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use http::header::{InvalidHeaderValue, ToStrError};

/// Error signing a request
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SigningError {
    /// A header on the request, or one computed while signing, is not a valid header value
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),

    /// A header on the request contains bytes that cannot be canonicalized
    #[error("header `{name}` cannot be signed: {source}")]
    UnsignableHeader {
        name: String,
        #[source]
        source: ToStrError,
    },

    /// The request URI has no authority and no `host` header was set
    #[error("request has neither a `host` header nor a URI authority")]
    MissingHost,
}
