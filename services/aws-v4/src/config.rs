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

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use sigweave_core::time::DateTime;
use sigweave_core::{Context, Error, Result};

use crate::constants::*;

/// Where the authentication material goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureLocation {
    /// `Authorization` and `X-Amz-*` headers.
    #[default]
    Headers,
    /// `X-Amz-*` query parameters, also known as presigning.
    QueryParams,
}

/// Signing algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    /// `AWS4-HMAC-SHA256`
    #[default]
    V4,
}

impl SigningAlgorithm {
    /// Wire name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::V4 => AWS4_HMAC_SHA256,
        }
    }
}

impl Display for SigningAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            AWS4_HMAC_SHA256 => Ok(SigningAlgorithm::V4),
            v => Err(Error::config_invalid(format!(
                "signing algorithm {v} is not supported"
            ))),
        }
    }
}

/// Whether the payload hash is also sent as `x-amz-content-sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignedBodyHeader {
    /// Do not add the header.
    #[default]
    None,
    /// Always add the header in header based signing.
    ContentSha256,
}

/// Config for one AWS SigV4 signing setup.
///
/// Built once and shared by every attempt of every request.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Service name in the credential scope, e.g. `s3`.
    pub service: String,
    /// Region in the credential scope, e.g. `us-east-1`.
    pub region: String,
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,
    /// Where the signature goes.
    pub signature_location: SignatureLocation,
    /// Expiry of a presigned request. Required for query placement.
    pub expires_in: Option<Duration>,
    /// Fixed signing time, overriding the time chosen by the pipeline.
    pub time: Option<DateTime>,
    /// Percent-encode the already encoded path once more.
    ///
    /// Most services expect this. S3 does not.
    pub double_uri_encode: bool,
    /// Remove `.`, `..` and empty segments from the path before encoding.
    pub normalize_uri_path: bool,
    /// Leave the session token out of the signature and add it afterwards.
    pub omit_session_token: bool,
    /// Whether to send the payload hash header.
    pub signed_body_header: SignedBodyHeader,
    /// Use `UNSIGNED-PAYLOAD` instead of hashing the body.
    pub unsigned_payload: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            service: String::new(),
            region: String::new(),
            algorithm: SigningAlgorithm::V4,
            signature_location: SignatureLocation::Headers,
            expires_in: None,
            time: None,
            double_uri_encode: true,
            normalize_uri_path: true,
            omit_session_token: false,
            signed_body_header: SignedBodyHeader::None,
            unsigned_payload: false,
        }
    }
}

impl SigningConfig {
    /// Create a config for header based signing.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.to_string(),
            region: region.to_string(),
            ..Default::default()
        }
    }

    /// Create a config with S3 semantics: single encoded and unnormalized
    /// paths, plus the `x-amz-content-sha256` header.
    pub fn s3(region: &str) -> Self {
        Self {
            double_uri_encode: false,
            normalize_uri_path: false,
            signed_body_header: SignedBodyHeader::ContentSha256,
            ..Self::new("s3", region)
        }
    }

    /// Create a config whose region comes from `AWS_REGION` or
    /// `AWS_DEFAULT_REGION`.
    pub fn from_env(service: &str, ctx: &Context) -> Result<Self> {
        let region = ctx
            .env_var(AWS_REGION)
            .or_else(|| ctx.env_var(AWS_DEFAULT_REGION))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::config_invalid(format!(
                    "region is not set, please set {AWS_REGION} or {AWS_DEFAULT_REGION}"
                ))
            })?;

        Ok(Self::new(service, &region))
    }

    /// Sign with query parameters valid for `expires_in`.
    pub fn with_presign(mut self, expires_in: Duration) -> Self {
        self.signature_location = SignatureLocation::QueryParams;
        self.expires_in = Some(expires_in);
        self
    }

    /// Set the signing time.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Set path double encoding.
    pub fn with_double_uri_encode(mut self, v: bool) -> Self {
        self.double_uri_encode = v;
        self
    }

    /// Set path normalization.
    pub fn with_normalize_uri_path(mut self, v: bool) -> Self {
        self.normalize_uri_path = v;
        self
    }

    /// Set session token omission.
    pub fn with_omit_session_token(mut self, v: bool) -> Self {
        self.omit_session_token = v;
        self
    }

    /// Set the payload hash header policy.
    pub fn with_signed_body_header(mut self, v: SignedBodyHeader) -> Self {
        self.signed_body_header = v;
        self
    }

    /// Use `UNSIGNED-PAYLOAD` as payload hash.
    pub fn with_unsigned_payload(mut self, v: bool) -> Self {
        self.unsigned_payload = v;
        self
    }

    /// Check the config can sign anything at all.
    pub fn validate(&self) -> Result<()> {
        if self.service.is_empty() {
            return Err(Error::config_invalid("service must not be empty"));
        }
        if self.region.is_empty() {
            return Err(Error::config_invalid("region must not be empty"));
        }

        match (self.signature_location, self.expires_in) {
            (SignatureLocation::QueryParams, None) => Err(Error::config_invalid(
                "query signature requires expires_in",
            )),
            (SignatureLocation::QueryParams, Some(d)) if d.as_secs() > MAX_PRESIGN_EXPIRY_SECS => {
                Err(Error::config_invalid(format!(
                    "expires_in {}s exceeds the limit of {MAX_PRESIGN_EXPIRY_SECS}s",
                    d.as_secs()
                )))
            }
            _ => Ok(()),
        }
    }
}
