/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use qsdk_auth::Credentials;
use qsdk_sigv4::http_request::{sign, SignableRequest};
use qsdk_sigv4::SigningParams;
use qsdk_types::{SigningName, SigningRegion};
use std::fmt;
use std::time::SystemTime;

pub use qsdk_sigv4::http_request::SigningError;

const EXPIRATION_WARNING: &str = "Request is signed with credentials that expired before the \
    signing time. The service will most likely reject it.";

/// Signing Configuration for an individual Request
///
/// These fields may vary on a per-request basis
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestConfig<'a> {
    pub request_ts: SystemTime,
    pub region: &'a SigningRegion,
    pub name: &'a SigningName,
}

/// The hex encoded signature of a signed request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    pub fn new(signature: String) -> Self {
        Self(signature)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Default)]
pub struct SigV4Signer {
    _private: (),
}

impl fmt::Debug for SigV4Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = f.debug_struct("SigV4Signer");
        formatter.finish()
    }
}

impl SigV4Signer {
    pub fn new() -> Self {
        SigV4Signer { _private: () }
    }

    fn signing_params<'a>(
        credentials: &'a Credentials,
        request_config: &'a RequestConfig<'a>,
    ) -> SigningParams<'a> {
        if credentials.is_expired_at(request_config.request_ts) {
            tracing::warn!(
                provider = credentials.provider_name(),
                "{}",
                EXPIRATION_WARNING
            );
        }

        let mut builder = SigningParams::builder()
            .access_key(credentials.access_key_id())
            .secret_key(credentials.secret_access_key())
            .region(request_config.region.as_ref())
            .service_name(request_config.name.as_ref())
            .time(request_config.request_ts);
        builder.set_security_token(credentials.session_token());
        builder.build().expect("all required fields set")
    }

    /// Sign a request using the SigV4 Protocol
    ///
    /// The `authorization`, `x-amz-date` and, for session credentials, `x-amz-security-token`
    /// headers are inserted into `request`, replacing the headers of any earlier signature.
    /// Signing is deterministic: identical requests, credentials and configs produce identical
    /// signatures.
    pub fn sign<B: AsRef<[u8]>>(
        &self,
        request_config: &RequestConfig<'_>,
        credentials: &Credentials,
        request: &mut http::Request<B>,
    ) -> Result<Signature, SigningError> {
        let signing_params = Self::signing_params(credentials, request_config);
        let (instructions, signature) =
            sign(SignableRequest::from(&*request), &signing_params)?.into_parts();
        instructions.apply_to_request(request);
        Ok(Signature::new(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestConfig, SigV4Signer};
    use proptest::prelude::*;
    use qsdk_auth::Credentials;
    use qsdk_sigv4::date_fmt::parse_date_time;
    use qsdk_types::{SigningName, SigningRegion};
    use std::time::{Duration, UNIX_EPOCH};
    use tracing_test::traced_test;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn describe_regions(body: impl Into<String>) -> http::Request<String> {
        http::Request::builder()
            .method("POST")
            .uri("https://ec2.us-east-1.amazonaws.com/")
            .header(
                "content-type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .body(body.into())
            .unwrap()
    }

    #[test]
    fn sign_ec2_query_request() {
        let region = SigningRegion::from_static("us-east-1");
        let name = SigningName::from_static("ec2");
        let config = RequestConfig {
            request_ts: parse_date_time("20150830T123600Z").unwrap(),
            region: &region,
            name: &name,
        };
        let credentials = Credentials::from_keys(
            "AKIDEXAMPLE",
            SECRET,
            Some("SESSIONTOKEN".to_string()),
        );
        let mut request = describe_regions("Action=DescribeRegions&Version=2016-11-15");
        let signature = SigV4Signer::new()
            .sign(&config, &credentials, &mut request)
            .expect("signable request");
        assert_eq!(
            signature.as_ref(),
            "c9ef7d9c64a92b648ae2c3341e17f470e1bc05851680f83c94e9b01122dc5ddd"
        );
        assert_eq!(request.headers()["x-amz-date"], "20150830T123600Z");
        assert_eq!(request.headers()["x-amz-security-token"], "SESSIONTOKEN");

        // signing again replaces the previous signature headers
        let resigned = SigV4Signer::new()
            .sign(&config, &credentials, &mut request)
            .expect("signable request");
        assert_eq!(resigned, signature);
        assert_eq!(request.headers().get_all("authorization").iter().count(), 1);
    }

    #[test]
    #[traced_test]
    fn warn_on_expired_credentials() {
        let region = SigningRegion::from_static("us-east-1");
        let name = SigningName::from_static("ec2");
        let config = RequestConfig {
            request_ts: UNIX_EPOCH + Duration::from_secs(1000),
            region: &region,
            name: &name,
        };
        let credentials = Credentials::new(
            "akid",
            "secret",
            None,
            Some(UNIX_EPOCH + Duration::from_secs(999)),
            "test",
        );
        let mut request = describe_regions("Action=DescribeRegions&Version=2016-11-15");
        SigV4Signer::new()
            .sign(&config, &credentials, &mut request)
            .expect("expired credentials still sign");
        assert!(logs_contain("expired before the signing time"));
    }

    proptest! {
        #[test]
        fn signing_is_deterministic(body in "[A-Za-z0-9=&.]{0,64}", secs in 0u64..4_000_000_000) {
            let region = SigningRegion::from_static("us-west-2");
            let name = SigningName::from_static("ec2");
            let config = RequestConfig {
                request_ts: UNIX_EPOCH + Duration::from_secs(secs),
                region: &region,
                name: &name,
            };
            let credentials = Credentials::for_tests();
            let signer = SigV4Signer::new();
            let mut first = describe_regions(body.clone());
            let mut second = describe_regions(body.clone());
            let a = signer.sign(&config, &credentials, &mut first).unwrap();
            let b = signer.sign(&config, &credentials, &mut second).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(first.headers(), second.headers());

            let mut changed = describe_regions(format!("{}X", body));
            let c = signer.sign(&config, &credentials, &mut changed).unwrap();
            prop_assert_ne!(a, c);
        }
    }
}
