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

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use sigweave_core::hash::hex_hmac_sha256;
use sigweave_core::time::{format_iso8601, DateTime};
use sigweave_core::{
    Body, Context, HttpSend, Pipeline, ProvideCredential, Result, SignRequest, Signer,
    SigningCredential,
};

#[derive(Clone, Debug)]
struct MyCredential {
    api_key: String,
    api_secret: String,
}

impl SigningCredential for MyCredential {
    fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[derive(Debug)]
struct MyCredentialLoader;

#[async_trait]
impl ProvideCredential for MyCredentialLoader {
    type Credential = MyCredential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let api_key = ctx.env_var("MY_API_KEY").unwrap_or_default();
        let api_secret = ctx.env_var("MY_API_SECRET").unwrap_or_default();

        // For demo purposes, use dummy credentials if none are provided
        if api_key.is_empty() || api_secret.is_empty() {
            println!("No credentials found in environment, using demo credentials");
            return Ok(Some(MyCredential {
                api_key: "demo-api-key".to_string(),
                api_secret: "demo-api-secret".to_string(),
            }));
        }

        Ok(Some(MyCredential {
            api_key,
            api_secret,
        }))
    }
}

/// Signs `<method> <path> <time>` with the api secret.
#[derive(Debug)]
struct MyRequestSigner;

#[async_trait]
impl SignRequest for MyRequestSigner {
    type Credential = MyCredential;

    async fn sign_request(
        &self,
        _ctx: &Context,
        req: &mut http::Request<Body>,
        cred: &Self::Credential,
        signing_time: DateTime,
    ) -> Result<()> {
        let time = format_iso8601(signing_time);
        let string_to_sign = format!("{} {} {time}", req.method(), req.uri().path());
        let signature = hex_hmac_sha256(cred.api_secret.as_bytes(), string_to_sign.as_bytes());

        let headers = req.headers_mut();
        headers.insert("x-api-key", cred.api_key.parse()?);
        headers.insert("x-api-time", time.parse()?);
        headers.insert("x-api-signature", signature.parse()?);
        Ok(())
    }
}

/// Fails the first attempt with 503 to show the retry.
#[derive(Debug, Default)]
struct FlakyHttpSend {
    attempts: AtomicUsize,
}

#[async_trait]
impl HttpSend for FlakyHttpSend {
    async fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Bytes>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        println!("attempt {attempt}: {:?}", req.headers());

        let status = if attempt == 1 { 503 } else { 200 };
        Ok(http::Response::builder()
            .status(status)
            .body(Bytes::from_static(b"ok"))?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();

    let ctx = Context::new().with_http_send(FlakyHttpSend::default());
    let signer = Signer::new(ctx, MyCredentialLoader, MyRequestSigner);

    let req = http::Request::get("https://api.example.com/v1/users").body(Body::Empty)?;
    let resp = Pipeline::new(signer).send(req).await?;
    println!("final status: {}", resp.status());

    Ok(())
}
