/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/// Input that cannot be written as query parameters
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryWriteError {
    #[error("required field `{field}` was not set")]
    MissingRequiredField { field: &'static str },

    #[error("field `{field}` is invalid: {message}")]
    InvalidField { field: String, message: String },
}

impl QueryWriteError {
    pub fn missing_field(field: &'static str) -> Self {
        QueryWriteError::MissingRequiredField { field }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        QueryWriteError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
