/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Query protocol service clients.
//!
//! A [`Client`] binds a service identity to resolved configuration (region, endpoint,
//! credentials, retry and timeout settings) and to a handler chain made of a protocol codec,
//! the SigV4 signer and an HTTP connector. Operations are described by
//! [`Operation`](qsdk_http::operation::Operation) values and invoked through the client:
//!
//! ```no_run
//! # async fn docs() -> Result<(), Box<dyn std::error::Error>> {
//! use qsdk_client::config::SdkConfig;
//! use qsdk_client::Client;
//! use qsdk_http::operation::{Operation, ServiceInfo};
//! use qsdk_query::QueryParams;
//! use qsdk_xml::Node;
//!
//! const DESCRIBE_REGIONS: Operation = Operation::post("DescribeRegions");
//!
//! let config = SdkConfig::from_env().load().await?;
//! let client = Client::new(ServiceInfo::new("ec2", "2016-11-15"), &config, &[]).await?;
//! let regions: Node = client
//!     .invoke(&DESCRIBE_REGIONS, QueryParams::new().param("AllRegions", true))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
pub mod conn;
pub mod dispatch;
pub mod endpoint;
pub mod retry;
#[cfg(any(test, feature = "test-util"))]
pub mod test_connection;

pub use client::{Builder, Client, UnknownOperation};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
