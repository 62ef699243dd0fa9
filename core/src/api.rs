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

use std::fmt::Debug;

use crate::time::DateTime;
use crate::{Body, Context, Result};

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;

    /// Check if the credential has expired or is about to.
    ///
    /// Credentials without an expiration never expire.
    fn is_expired(&self) -> bool {
        false
    }
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(ctx) = self else {
            return false;
        };

        ctx.is_valid()
    }

    fn is_expired(&self) -> bool {
        self.as_ref().is_some_and(|v| v.is_expired())
    }
}

/// ProvideCredential is the trait used by signer to fetch the credential.
///
/// It is called once per attempt and may be called concurrently by many
/// in-flight requests. Caching, if any, belongs to the implementation.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Fetch the credential from current context.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign one request attempt.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Signing time
    ///
    /// `signing_time` is fixed by the caller for the whole logical operation,
    /// so every retry of the same request carries the same timestamp.
    ///
    /// ## Body
    ///
    /// Implementations may replace the body, for example to buffer a short
    /// stream or to wrap it in a signed chunk encoding.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::Request<Body>,
        credential: &Self::Credential,
        signing_time: DateTime,
    ) -> Result<()>;
}
