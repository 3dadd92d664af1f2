/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Named, ordered handlers for each phase of a request
//!
//! Handler lists are append-only: a handler can be added to the end of a phase but never
//! removed or reordered, so the execution order of a request is exactly its registration order.

use crate::request::Request;
use crate::result::SdkError;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The phases of a request, in execution order
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Serializes the input into an HTTP request. Runs once per request.
    Build,
    /// Signs the HTTP request. Runs once per attempt.
    Sign,
    /// Dispatches the HTTP request and stores the response.
    Send,
    /// Decodes a successful response into the output.
    Unmarshal,
    /// Extracts response metadata. Runs after every attempt, whether or not it succeeded.
    UnmarshalMeta,
    /// Decodes an error response.
    UnmarshalError,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Build,
        Phase::Sign,
        Phase::Send,
        Phase::Unmarshal,
        Phase::UnmarshalMeta,
        Phase::UnmarshalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Build => "Build",
            Phase::Sign => "Sign",
            Phase::Send => "Send",
            Phase::Unmarshal => "Unmarshal",
            Phase::UnmarshalMeta => "UnmarshalMeta",
            Phase::UnmarshalError => "UnmarshalError",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SdkError>> + Send + 'a>>;

/// One step of a phase
///
/// Returning an error stops the request: the remaining handlers of the phase and every later
/// phase except `UnmarshalMeta` are skipped.
pub trait Handler: Send + Sync {
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a>;
}

/// A synchronous [`Handler`] implemented by a closure. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFn")
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request) -> Result<(), SdkError> + Send + Sync,
{
    fn handle<'a>(&'a self, request: &'a mut Request) -> HandlerFuture<'a> {
        Box::pin(std::future::ready((self.f)(request)))
    }
}

/// Returns a [`Handler`] that calls `f`
///
/// ```rust
/// use qsdk_http::handler::{handler_fn, Handlers, Phase};
/// use qsdk_http::operation::Operation;
///
/// let mut handlers = Handlers::new();
/// handlers.phase_mut(Phase::Build).push_back_named(
///     "custom.AddHeader",
///     handler_fn(|request| {
///         request.properties_mut().insert(Operation::post("Tagged"));
///         Ok(())
///     }),
/// );
/// assert_eq!(handlers.phase(Phase::Build).len(), 1);
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut Request) -> Result<(), SdkError> + Send + Sync,
{
    HandlerFn { f }
}

/// A handler and the name it was registered under
#[derive(Clone)]
pub struct NamedHandler {
    name: Cow<'static, str>,
    handler: Arc<dyn Handler>,
}

impl NamedHandler {
    pub fn new(name: impl Into<Cow<'static, str>>, handler: impl Handler + 'static) -> Self {
        NamedHandler {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for NamedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedHandler").field(&self.name).finish()
    }
}

/// The ordered handlers of one phase
#[derive(Clone, Debug, Default)]
pub struct HandlerList {
    handlers: Vec<NamedHandler>,
}

impl HandlerList {
    pub fn push_back_named(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.handlers.push(NamedHandler::new(name, handler));
        self
    }

    pub fn push_back(&mut self, handler: NamedHandler) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedHandler> {
        self.handlers.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|handler| handler.name())
    }
}

/// The handler chain of a client or request: one [`HandlerList`] per [`Phase`]
///
/// Cloning is cheap; handlers are reference counted.
#[derive(Clone, Debug, Default)]
pub struct Handlers {
    build: HandlerList,
    sign: HandlerList,
    send: HandlerList,
    unmarshal: HandlerList,
    unmarshal_meta: HandlerList,
    unmarshal_error: HandlerList,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, phase: Phase) -> &HandlerList {
        match phase {
            Phase::Build => &self.build,
            Phase::Sign => &self.sign,
            Phase::Send => &self.send,
            Phase::Unmarshal => &self.unmarshal,
            Phase::UnmarshalMeta => &self.unmarshal_meta,
            Phase::UnmarshalError => &self.unmarshal_error,
        }
    }

    pub fn phase_mut(&mut self, phase: Phase) -> &mut HandlerList {
        match phase {
            Phase::Build => &mut self.build,
            Phase::Sign => &mut self.sign,
            Phase::Send => &mut self.send,
            Phase::Unmarshal => &mut self.unmarshal,
            Phase::UnmarshalMeta => &mut self.unmarshal_meta,
            Phase::UnmarshalError => &mut self.unmarshal_error,
        }
    }

    /// Total number of handlers across all phases
    pub fn len(&self) -> usize {
        Phase::ALL.iter().map(|phase| self.phase(*phase).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
