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

use std::mem;

use async_trait::async_trait;
use log::debug;
use sigweave_core::time::DateTime;
use sigweave_core::utils::redact_headers;
use sigweave_core::{Body, Context, SignRequest, SigningRequest, StreamBody};

use crate::apply::{apply_chunked_headers, apply_signature};
use crate::canonical::CanonicalRequest;
use crate::chunked::{encoded_length, AwsChunkedStream, ChunkSigningState};
use crate::payload::{select_payload, PayloadStrategy};
use crate::signature::{calculate_signature, generate_signing_key, scope, string_to_sign};
use crate::{Credential, SigningConfig};

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    config: SigningConfig,
}

/// Intermediate values of one signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningArtifacts {
    /// Canonical request string.
    pub canonical_request: String,
    /// String to sign.
    pub string_to_sign: String,
    /// Hex encoded signature.
    pub signature: String,
    /// Signed header names joined with `;`.
    pub signed_headers: String,
    /// Payload hash or sentinel used in the canonical request.
    pub payload_hash: String,
}

impl RequestSigner {
    /// Create a new signer for AWS V4.
    pub fn new(config: SigningConfig) -> Self {
        Self { config }
    }

    /// Config used by this signer.
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Sign `req` and return everything computed on the way.
    ///
    /// The request ends up exactly as [`SignRequest::sign_request`] leaves it.
    pub async fn sign_with_artifacts(
        &self,
        req: &mut http::Request<Body>,
        cred: &Credential,
        signing_time: DateTime,
    ) -> sigweave_core::Result<SigningArtifacts> {
        let config = &self.config;
        config.validate()?;
        let time = config.time.unwrap_or(signing_time);

        let strategy = select_payload(req.body_mut(), config).await?;

        let mut signing_req = SigningRequest::build(req)?;
        if let PayloadStrategy::Chunked { decoded_length } = strategy {
            apply_chunked_headers(&mut signing_req, decoded_length)?;
        }

        let canonical = CanonicalRequest::build(
            signing_req,
            cred,
            config,
            time,
            strategy.payload_hash().to_string(),
        )?;

        let scope = scope(time, &config.region, &config.service);
        debug!("calculated scope: {scope}");

        let string_to_sign = string_to_sign(config.algorithm, time, &scope, &canonical.hash())?;
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = generate_signing_key(
            &cred.secret_access_key,
            time,
            &config.region,
            &config.service,
        );
        let signature = calculate_signature(&signing_key, &string_to_sign);

        let artifacts = SigningArtifacts {
            canonical_request: canonical.as_str().to_string(),
            string_to_sign,
            signature: signature.clone(),
            signed_headers: canonical.signed_headers(),
            payload_hash: canonical.payload_hash().to_string(),
        };

        apply_signature(canonical, cred, config, &scope, &signature)?.apply(req)?;
        debug!("signed request headers: {}", redact_headers(req.headers()));

        if let PayloadStrategy::Chunked { decoded_length } = strategy {
            let source = mem::take(req.body_mut()).into_stream();
            let state = ChunkSigningState::new(signature, signing_key, time, scope);
            *req.body_mut() = Body::Stream(StreamBody::one_shot(
                Some(encoded_length(decoded_length)),
                AwsChunkedStream::new(source, decoded_length, state),
            ));
        }

        Ok(artifacts)
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut http::Request<Body>,
        credential: &Self::Credential,
        signing_time: DateTime,
    ) -> sigweave_core::Result<()> {
        self.sign_with_artifacts(req, credential, signing_time)
            .await
            .map(|_| ())
    }
}
