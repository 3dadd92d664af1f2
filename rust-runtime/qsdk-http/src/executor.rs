/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::body::try_clone_request;
use crate::handler::{HandlerList, Handlers, Phase};
use crate::request::Request;
use crate::result::{status_code_name, SdkError, SdkSuccess, ServiceError};
use crate::retry::NewRequestPolicy;
use qsdk_types::retry::RetryKind;
use std::any::Any;
use tracing::{debug, debug_span, trace, Instrument};

async fn run_phase(
    phase: Phase,
    handlers: &HandlerList,
    request: &mut Request,
) -> Result<(), SdkError> {
    for named in handlers.iter() {
        trace!(phase = %phase, handler = named.name(), "running handler");
        named.handler().handle(request).await.map_err(|err| {
            debug!(phase = %phase, handler = named.name(), error = %err, "handler failed");
            err
        })?;
    }
    Ok(())
}

impl Request {
    /// Drives this request through its handler chain
    ///
    /// `Build` runs once. Each attempt then runs `Sign`, `Send`, one of `Unmarshal` (2xx) or
    /// `UnmarshalError` (any other status), and finally `UnmarshalMeta`, which runs after every
    /// attempt including failed ones. The outcome of each attempt is classified and handed to
    /// the retry policy.
    pub async fn send(
        mut self,
        retry: &dyn NewRequestPolicy,
    ) -> Result<SdkSuccess<Box<dyn Any + Send>>, SdkError> {
        // the chain is fixed for the rest of the request
        let handlers = self.handlers.clone();
        let span = debug_span!(
            "request",
            service = %self.client_info.service_name(),
            operation = self.operation.name,
        );
        async move {
            let mut policy = retry.new_request_policy();
            if let Err(err) = run_phase(Phase::Build, handlers.phase(Phase::Build), &mut self).await {
                self.attempts = 1;
                self.error = Some(err);
                self.unmarshal_meta(&handlers).await;
                return self.into_result();
            }
            loop {
                self.attempts += 1;
                debug!(attempt = self.attempts, "starting attempt");
                if let Err(err) = self.attempt(&handlers).await {
                    if self.error.is_none() {
                        self.error = Some(err);
                    }
                }
                self.unmarshal_meta(&handlers).await;

                let kind = match &self.error {
                    None => RetryKind::Unnecessary,
                    Some(err) => err.retry_kind(),
                };
                match policy.should_retry(&kind) {
                    Some(delay) if kind != RetryKind::Unnecessary => {
                        debug!(retry_kind = ?kind, delay = ?delay, "retrying request");
                        tokio::time::sleep(delay).await;
                    }
                    _ => {
                        debug!(retry_kind = ?kind, attempts = self.attempts, "request complete");
                        break;
                    }
                }
            }
            self.into_result()
        }
        .instrument(span)
        .await
    }

    async fn attempt(&mut self, handlers: &Handlers) -> Result<(), SdkError> {
        self.begin_attempt()?;
        run_phase(Phase::Sign, handlers.phase(Phase::Sign), self).await?;
        run_phase(Phase::Send, handlers.phase(Phase::Send), self).await?;
        let status = self
            .http_response
            .as_ref()
            .map(|response| response.status())
            .ok_or_else(|| SdkError::transport("no send handler produced a response"))?;
        if status.is_success() {
            run_phase(Phase::Unmarshal, handlers.phase(Phase::Unmarshal), self).await?;
            if let Some(err) = self.error.take() {
                return Err(err);
            }
            if self.output.is_none() {
                return Err(SdkError::unmarshal(format!(
                    "no unmarshal handler produced a `{}`",
                    self.output_target().type_name()
                )));
            }
            Ok(())
        } else {
            run_phase(
                Phase::UnmarshalError,
                handlers.phase(Phase::UnmarshalError),
                self,
            )
            .await?;
            Err(self.error.take().unwrap_or_else(|| {
                SdkError::ServiceError(ServiceError::new(
                    status_code_name(status),
                    "",
                    None,
                    status,
                ))
            }))
        }
    }

    /// Resets per-attempt state and copies the built request into the attempt
    fn begin_attempt(&mut self) -> Result<(), SdkError> {
        self.error = None;
        self.output = None;
        self.http_response = None;
        self.metadata = Default::default();
        let built = self
            .built_request
            .as_ref()
            .ok_or_else(|| SdkError::marshal("no build handler produced an HTTP request"))?;
        let attempt = try_clone_request(built)
            .ok_or_else(|| SdkError::marshal("the request body cannot be replayed"))?;
        self.http_request = Some(attempt);
        Ok(())
    }

    async fn unmarshal_meta(&mut self, handlers: &Handlers) {
        let result = run_phase(
            Phase::UnmarshalMeta,
            handlers.phase(Phase::UnmarshalMeta),
            self,
        )
        .await;
        if let Err(err) = result {
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }

    fn into_result(mut self) -> Result<SdkSuccess<Box<dyn Any + Send>>, SdkError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        match (self.http_response.take(), self.output.take()) {
            (Some(raw), Some(parsed)) => Ok(SdkSuccess {
                raw,
                parsed,
                metadata: self.metadata,
            }),
            _ => Err(SdkError::unmarshal("the request completed without an output")),
        }
    }
}
