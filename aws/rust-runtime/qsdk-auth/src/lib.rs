/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials used to sign requests, and the providers that load them.
//!
//! ## Implementing your own credentials provider
//!
//! [`Credentials`] implement [`ProvideCredentials`] directly, so static credentials need no custom
//! provider. For dynamically loaded credentials, define an inherent `async fn` on your type and
//! call it from the trait implementation:
//! ```rust
//! use qsdk_auth::provider::{self, future, CredentialsError, ProvideCredentials};
//! use qsdk_auth::Credentials;
//!
//! #[derive(Debug)]
//! struct SubprocessCredentialProvider;
//!
//! async fn invoke_command(command: &str) -> String {
//!     // implementation elided...
//!     # String::from("akid\nsecret")
//! }
//!
//! /// Parse access key and secret from the first two lines of a string
//! fn parse_credentials(creds: &str) -> provider::Result {
//!     let mut lines = creds.lines();
//!     let akid = lines.next().ok_or(CredentialsError::ProviderError("invalid credentials".into()))?;
//!     let secret = lines.next().ok_or(CredentialsError::ProviderError("invalid credentials".into()))?;
//!     Ok(Credentials::new(akid, secret, None, None, "CustomCommand"))
//! }
//!
//! impl SubprocessCredentialProvider {
//!     async fn load_credentials(&self) -> provider::Result {
//!         let creds = invoke_command("load-credentials.py").await;
//!         parse_credentials(&creds)
//!     }
//! }
//!
//! impl ProvideCredentials for SubprocessCredentialProvider {
//!     fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
//!     where
//!         Self: 'a,
//!     {
//!         future::ProvideCredentials::new(self.load_credentials())
//!     }
//! }
//! ```

pub mod provider;

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub use provider::{CredentialsError, ProvideCredentials, SharedCredentialsProvider};

/// AWS SDK Credentials
///
/// An opaque struct representing credentials that may be used in an AWS SDK, modeled on
/// the [CRT credentials implementation](https://github.com/awslabs/aws-c-auth/blob/main/source/credentials.c).
///
/// Credentials uses an interior Arc: clones are cheap and every clone is the same immutable
/// snapshot.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials(Arc<Inner>);

#[derive(Clone, Eq, PartialEq)]
struct Inner {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,

    /// Credential Expiry
    ///
    /// A timepoint at which the credentials should no longer
    /// be used because they have expired. The primary purpose of this value is to allow
    /// credentials to communicate to the caching provider when they need to be refreshed.
    ///
    /// If these credentials never expire, this value will be set to `None`
    expires_after: Option<SystemTime>,

    provider_name: &'static str,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("provider_name", &self.0.provider_name)
            .field("access_key_id", &self.0.access_key_id)
            .field("secret_access_key", &"** redacted **");
        if let Some(expiry) = self.expiry() {
            creds.field(
                "expires_after",
                &expiry
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default(),
            );
        } else {
            creds.field("expires_after", &"never");
        }
        creds.finish()
    }
}

const STATIC_CREDENTIALS: &str = "Static";

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_after: Option<SystemTime>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expires_after,
            provider_name,
        }))
    }

    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_CREDENTIALS,
        )
    }

    /// Fixed credentials for unit and integration tests
    pub fn for_tests() -> Self {
        Self::new(
            "ANOTREAL",
            "notrealrnrELgWzOk3IfjzDKtFBhDby",
            Some("notarealsessiontoken".to_string()),
            None,
            "test",
        )
    }

    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        self.0.expires_after
    }

    pub fn expiry_mut(&mut self) -> &mut Option<SystemTime> {
        &mut Arc::make_mut(&mut self.0).expires_after
    }

    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    pub fn provider_name(&self) -> &'static str {
        self.0.provider_name
    }

    /// True when the credentials carry an expiration that is at or before `now`
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        matches!(self.expiry(), Some(expiry) if expiry <= now)
    }
}

#[cfg(test)]
mod test {
    use super::Credentials;
    use std::time::{Duration, UNIX_EPOCH};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn creds_are_send_sync() {
        assert_send_sync::<Credentials>()
    }

    #[test]
    fn debug_output_redacts_secret() {
        let creds = Credentials::new(
            "akid",
            "very-secret",
            Some("token".to_string()),
            Some(UNIX_EPOCH + Duration::from_secs(100)),
            "debug",
        );
        let debug = format!("{:?}", creds);
        assert!(debug.contains("akid"));
        assert!(debug.contains("expires_after: 100"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("token"));
    }

    #[test]
    fn expiry_check() {
        let mut creds = Credentials::from_keys("akid", "secret", None);
        assert!(!creds.is_expired_at(UNIX_EPOCH + Duration::from_secs(1_000_000)));
        *creds.expiry_mut() = Some(UNIX_EPOCH + Duration::from_secs(100));
        assert!(creds.is_expired_at(UNIX_EPOCH + Duration::from_secs(100)));
        assert!(!creds.is_expired_at(UNIX_EPOCH + Duration::from_secs(99)));
    }
}
