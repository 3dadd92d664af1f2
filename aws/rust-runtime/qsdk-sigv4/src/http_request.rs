/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Utilities to sign HTTP requests.
//!
//! # Example: Signing an HTTP request
//!
//! ```rust
//! use qsdk_sigv4::http_request::{sign, SignableRequest};
//! use qsdk_sigv4::SigningParams;
//! use std::time::SystemTime;
//!
//! let mut request = http::Request::builder()
//!     .method("POST")
//!     .uri("https://ec2.us-east-1.amazonaws.com/")
//!     .header("content-type", "application/x-www-form-urlencoded")
//!     .body(b"Action=DescribeRegions&Version=2016-11-15".to_vec())
//!     .unwrap();
//! let params = SigningParams::builder()
//!     .access_key("example access key")
//!     .secret_key("example secret key")
//!     .region("us-east-1")
//!     .service_name("ec2")
//!     .time(SystemTime::now())
//!     .build()
//!     .expect("all required fields set");
//! let (instructions, _signature) = sign(SignableRequest::from(&request), &params)
//!     .expect("request is signable")
//!     .into_parts();
//! instructions.apply_to_request(&mut request);
//! assert!(request.headers().contains_key("authorization"));
//! ```

mod canonical_request;
mod error;
mod sign;
mod url_escape;

pub use error::SigningError;
pub use sign::{sign, SignableRequest, SigningInstructions};
