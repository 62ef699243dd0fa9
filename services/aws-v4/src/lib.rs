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

//! AWS SigV4 signer for sigweave.
//!
//! Signs requests in the `Authorization` header or in presigned query
//! parameters, and wraps long streaming bodies in signed aws-chunked
//! encoding.
//!
//! ## Example
//!
//! ```no_run
//! use anyhow::Result;
//! use sigweave_aws_v4::{EnvCredentialProvider, RequestSigner, SigningConfig};
//! use sigweave_core::{Body, Context, OsEnv, Pipeline, Signer};
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let ctx = ctx.with_env(OsEnv);
//! let config = SigningConfig::from_env("s3", &ctx)?;
//! let signer = Signer::new(ctx, EnvCredentialProvider::new(), RequestSigner::new(config));
//!
//! let req = http::Request::get("https://examplebucket.s3.amazonaws.com/test.txt")
//!     .body(Body::Empty)?;
//! let resp = Pipeline::new(signer).send(req).await?;
//! println!("status: {}", resp.status());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod constants;
pub use constants::{
    AWS4_HMAC_SHA256, CHUNK_SIZE, STREAMING_AWS4_HMAC_SHA256_PAYLOAD, UNSIGNED_PAYLOAD,
};

mod config;
pub use config::{SignatureLocation, SignedBodyHeader, SigningAlgorithm, SigningConfig};

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::{EnvCredentialProvider, StaticCredentialProvider};

mod signature;
pub use signature::{calculate_signature, generate_signing_key, scope, string_to_sign};

mod canonical;
pub use canonical::{canonical_header_value, canonical_uri, normalize_path, CanonicalRequest};

mod payload;
pub use payload::{select_payload, PayloadStrategy};

mod chunked;
pub use chunked::{encoded_length, AwsChunkedStream, ChunkSigningState};

mod apply;
pub use apply::{apply_chunked_headers, apply_signature};

mod sign_request;
pub use sign_request::{RequestSigner, SigningArtifacts};
