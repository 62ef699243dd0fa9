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

use std::sync::Arc;

use log::debug;

use crate::time::DateTime;
use crate::{Body, Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};

/// Signer is the main struct used to sign the request.
///
/// The credential is fetched from the provider on every call. Signer keeps
/// no state between calls, so one instance can serve concurrent requests.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
        }
    }

    /// Get the context used by this signer.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Sign the request with a freshly provided credential.
    pub async fn sign(&self, req: &mut http::Request<Body>, signing_time: DateTime) -> Result<()> {
        let credential = self
            .loader
            .provide_credential(&self.ctx)
            .await?
            .ok_or_else(|| Error::credential_invalid("no credential available from provider"))?;
        if credential.is_expired() {
            return Err(Error::credential_expired("credential from provider has expired"));
        }
        if !credential.is_valid() {
            return Err(Error::credential_invalid("credential from provider is incomplete"));
        }
        debug!("credential resolved, signing {} {}", req.method(), req.uri());

        self.builder
            .sign_request(&self.ctx, req, &credential, signing_time)
            .await
    }
}
