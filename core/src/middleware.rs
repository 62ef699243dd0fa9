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

//! Stages a request attempt flows through.

use std::fmt::Debug;

use bytes::Bytes;
use log::debug;

use crate::time::DateTime;
use crate::{Body, Context, Result, Signer, SigningCredential};

/// Dispatch is one stage of the pipeline.
///
/// A stage receives an owned request, so whatever it mutates belongs to the
/// current attempt only.
#[async_trait::async_trait]
pub trait Dispatch: Debug + Send + Sync + 'static {
    /// Dispatch the request and return the response.
    async fn dispatch(
        &self,
        req: http::Request<Body>,
        signing_time: DateTime,
    ) -> Result<http::Response<Bytes>>;
}

/// Transport is the innermost stage, handing the request to the
/// [`HttpSend`](crate::HttpSend) configured in the [`Context`].
#[derive(Debug, Clone)]
pub struct Transport {
    ctx: Context,
}

impl Transport {
    /// Create a transport stage over the given context.
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

#[async_trait::async_trait]
impl Dispatch for Transport {
    async fn dispatch(
        &self,
        req: http::Request<Body>,
        _: DateTime,
    ) -> Result<http::Response<Bytes>> {
        self.ctx.http_send(req).await
    }
}

/// SigningMiddleware signs every attempt before passing it on.
///
/// Signing failures are returned as is. Whether the attempt is repeated is
/// up to an outer [`RetryMiddleware`](crate::RetryMiddleware).
#[derive(Debug)]
pub struct SigningMiddleware<K: SigningCredential, D> {
    signer: Signer<K>,
    inner: D,
}

impl<K: SigningCredential, D: Dispatch> SigningMiddleware<K, D> {
    /// Create a signing stage in front of `inner`.
    pub fn new(signer: Signer<K>, inner: D) -> Self {
        Self { signer, inner }
    }
}

#[async_trait::async_trait]
impl<K: SigningCredential, D: Dispatch> Dispatch for SigningMiddleware<K, D> {
    async fn dispatch(
        &self,
        mut req: http::Request<Body>,
        signing_time: DateTime,
    ) -> Result<http::Response<Bytes>> {
        self.signer.sign(&mut req, signing_time).await?;
        debug!("request signed, dispatching to {}", req.uri());

        self.inner.dispatch(req, signing_time).await
    }
}
