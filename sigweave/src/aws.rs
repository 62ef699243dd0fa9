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

//! AWS SigV4 support with convenience APIs.
//!
//! Re-exports everything from `sigweave-aws-v4` and adds constructors wired
//! to [`default_context`].

pub use sigweave_aws_v4::*;

use crate::{default_context, Pipeline, Signer};

/// Default AWS signer type.
pub type DefaultSigner = Signer<Credential>;

/// Default AWS pipeline type.
pub type DefaultPipeline = Pipeline<Credential>;

/// Create a signer that loads credentials from `AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> sigweave::Result<()> {
/// use sigweave::aws::{default_signer, SigningConfig};
/// use sigweave::Body;
///
/// let signer = default_signer(SigningConfig::new("sts", "us-east-1"));
/// let mut req = http::Request::get("https://sts.amazonaws.com/?Action=GetCallerIdentity")
///     .body(Body::Empty)?;
/// signer.sign(&mut req, sigweave::time::now()).await?;
/// # Ok(())
/// # }
/// ```
pub fn default_signer(config: SigningConfig) -> DefaultSigner {
    Signer::new(
        default_context(),
        EnvCredentialProvider::new(),
        RequestSigner::new(config),
    )
}

/// Create a pipeline on top of [`default_signer`] with the standard retry
/// policy.
pub fn default_pipeline(config: SigningConfig) -> DefaultPipeline {
    Pipeline::new(default_signer(config))
}
