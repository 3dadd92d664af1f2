/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The request pipeline shared by every qsdk service client.
//!
//! A [`Request`](request::Request) carries a snapshot of the client's [`Handlers`](handler::Handlers)
//! and is driven through the `Build`, `Sign`, `Send`, `Unmarshal` / `UnmarshalError` and
//! `UnmarshalMeta` phases by [`Request::send`](request::Request::send). Protocol specific
//! behavior lives in a [`ProtocolCodec`](protocol::ProtocolCodec).

pub mod body;
mod executor;
pub mod handler;
pub mod operation;
pub mod property_bag;
pub mod protocol;
pub mod request;
pub mod request_id;
pub mod result;
pub mod retry;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
