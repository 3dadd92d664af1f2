/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! SigV4 request signing for the `Sign` phase of the qsdk request pipeline.
//!
//! [`SigV4SigningHandler`](handler::SigV4SigningHandler) loads a fresh credentials snapshot for
//! every attempt and signs the attempt's HTTP request with [`SigV4Signer`](signer::SigV4Signer).

pub mod handler;
pub mod signer;
