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

//! Retry, signing and transport composed into one client.

use std::sync::Arc;

use bytes::Bytes;
use log::debug;

use crate::middleware::{Dispatch, SigningMiddleware, Transport};
use crate::retry::{RetryMiddleware, RetryPolicy, StandardRetryPolicy};
use crate::time::{format_iso8601, now, DateTime};
use crate::{Body, Result, Signer, SigningCredential};

/// Pipeline composes retry, signing and transport for one client.
///
/// ```text
/// RetryMiddleware -> (deep copy) -> SigningMiddleware -> Transport
/// ```
///
/// ## Example
///
/// ```no_run
/// # async fn example<K: sigweave_core::SigningCredential>(
/// #     signer: sigweave_core::Signer<K>,
/// # ) -> sigweave_core::Result<()> {
/// use sigweave_core::{Body, Pipeline, StandardRetryPolicy};
///
/// let pipeline = Pipeline::new(signer).with_retry_policy(StandardRetryPolicy::new(5));
/// let req = http::Request::get("https://example.com/").body(Body::Empty)?;
/// let resp = pipeline.send(req).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pipeline<K: SigningCredential> {
    inner: RetryMiddleware<SigningMiddleware<K, Transport>>,
}

impl<K: SigningCredential> Pipeline<K> {
    /// Create a pipeline with [`StandardRetryPolicy`], dispatching through
    /// the signer's context.
    pub fn new(signer: Signer<K>) -> Self {
        Self::build(signer, Arc::new(StandardRetryPolicy::default()))
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(self, policy: impl RetryPolicy) -> Self {
        let RetryMiddleware { inner, .. } = self.inner;
        Self {
            inner: RetryMiddleware::with_policy(Arc::new(policy), inner),
        }
    }

    fn build(signer: Signer<K>, policy: Arc<dyn RetryPolicy>) -> Self {
        let transport = Transport::new(signer.context().clone());
        Self {
            inner: RetryMiddleware::with_policy(policy, SigningMiddleware::new(signer, transport)),
        }
    }

    /// Send one logical operation.
    ///
    /// The signing time is taken once here and shared by every attempt.
    pub async fn send(&self, req: http::Request<Body>) -> Result<http::Response<Bytes>> {
        self.send_at(req, now()).await
    }

    /// Send one logical operation signed at the given time.
    pub async fn send_at(
        &self,
        req: http::Request<Body>,
        signing_time: DateTime,
    ) -> Result<http::Response<Bytes>> {
        debug!(
            "sending {} {} signed at {}",
            req.method(),
            req.uri(),
            format_iso8601(signing_time)
        );
        self.inner.dispatch(req, signing_time).await
    }
}
