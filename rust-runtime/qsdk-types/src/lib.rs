/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Types shared by every layer of the qsdk request pipeline.

pub mod os_shim_internal;
pub mod region;
pub mod retry;

use std::borrow::Cow;
use std::fmt;

pub use region::{Region, SigningRegion};

/// The name of the service used to sign a request
///
/// This usually matches the endpoint prefix of the service but endpoint resolution may
/// override it. Generally, user code should never interact with `SigningName` directly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SigningName(Cow<'static, str>);

impl AsRef<str> for SigningName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SigningName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SigningName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        SigningName(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        SigningName(Cow::Borrowed(name))
    }
}

impl From<&'static str> for SigningName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}
