// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Retry loop around signed attempts.

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, warn};

use crate::body::try_clone_request;
use crate::middleware::Dispatch;
use crate::time::DateTime;
use crate::{Body, Error, Result};

/// Outcome of a [`RetryPolicy`] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run another attempt.
    Retry,
    /// Return this result to the caller.
    Stop,
}

/// RetryPolicy decides whether a finished attempt should be repeated.
///
/// `attempt` starts at 1. Backoff is not modeled here; a retry runs right
/// after the failed attempt.
pub trait RetryPolicy: Debug + Send + Sync + 'static {
    /// Judge the result of attempt number `attempt`.
    fn should_retry(
        &self,
        attempt: usize,
        result: &Result<http::Response<Bytes>>,
    ) -> RetryDecision;
}

/// Retries transport failures, interrupted bodies and throttling or server
/// errors until `max_attempts` attempts have been made.
#[derive(Debug, Clone, Copy)]
pub struct StandardRetryPolicy {
    max_attempts: usize,
}

impl Default for StandardRetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl StandardRetryPolicy {
    /// Create a policy allowing at most `max_attempts` attempts in total.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Maximum number of attempts, the first one included.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

impl RetryPolicy for StandardRetryPolicy {
    fn should_retry(
        &self,
        attempt: usize,
        result: &Result<http::Response<Bytes>>,
    ) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::Stop;
        }

        let retryable = match result {
            Ok(resp) => {
                let status = resp.status();
                status.is_server_error() || status == http::StatusCode::TOO_MANY_REQUESTS
            }
            Err(err) => err.is_retryable(),
        };

        if retryable {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// Never repeats an attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn should_retry(&self, _: usize, _: &Result<http::Response<Bytes>>) -> RetryDecision {
        RetryDecision::Stop
    }
}

/// RetryMiddleware runs the inner stages once per attempt.
///
/// Each attempt gets its own deep copy of the request, so nothing an attempt
/// does to its copy leaks into the next one. A request carrying a one-shot
/// stream cannot be copied; it is dispatched exactly once and the policy is
/// never consulted.
#[derive(Debug)]
pub struct RetryMiddleware<D> {
    pub(crate) policy: Arc<dyn RetryPolicy>,
    pub(crate) inner: D,
}

impl<D: Dispatch> RetryMiddleware<D> {
    /// Create a retry stage in front of `inner`.
    pub fn new(policy: impl RetryPolicy, inner: D) -> Self {
        Self {
            policy: Arc::new(policy),
            inner,
        }
    }

    /// Create a retry stage sharing an existing policy.
    pub fn with_policy(policy: Arc<dyn RetryPolicy>, inner: D) -> Self {
        Self { policy, inner }
    }
}

#[async_trait::async_trait]
impl<D: Dispatch> Dispatch for RetryMiddleware<D> {
    async fn dispatch(
        &self,
        req: http::Request<Body>,
        signing_time: DateTime,
    ) -> Result<http::Response<Bytes>> {
        if !req.body().is_replayable() {
            debug!(
                "body of {} {} is a one-shot stream, dispatching without retry",
                req.method(),
                req.uri()
            );
            return self.inner.dispatch(req, signing_time).await;
        }

        let mut attempt = 1;
        loop {
            let copy = try_clone_request(&req)
                .ok_or_else(|| Error::unexpected("replayable request failed to copy"))?;
            let result = self.inner.dispatch(copy, signing_time).await;

            match self.policy.should_retry(attempt, &result) {
                RetryDecision::Stop => return result,
                RetryDecision::Retry => {
                    match &result {
                        Ok(resp) => warn!("attempt {attempt} got status {}, retrying", resp.status()),
                        Err(err) => warn!("attempt {attempt} failed: {err}, retrying"),
                    }
                    attempt += 1;
                }
            }
        }
    }
}
