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

//! Tests against a real S3 compatible endpoint.
//!
//! Skipped unless `SIGWEAVE_AWS_V4_TEST=on`. Needs `SIGWEAVE_AWS_V4_URL`
//! pointing at a bucket plus `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
//! and `AWS_REGION`.

use std::env;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use http::{Request, StatusCode};
use log::{debug, warn};
use sigweave_aws_v4::{Credential, EnvCredentialProvider, RequestSigner, SigningConfig};
use sigweave_core::{Body, Context, OsEnv, Pipeline, Signer, StreamBody};
use sigweave_http_send_reqwest::ReqwestHttpSend;

fn init_pipeline(
    config: impl FnOnce(SigningConfig) -> SigningConfig,
) -> Option<(Pipeline<Credential>, String)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("SIGWEAVE_AWS_V4_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let url = env::var("SIGWEAVE_AWS_V4_URL").expect("env SIGWEAVE_AWS_V4_URL must set");
    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let signing_config = SigningConfig::from_env("s3", &ctx).expect("region must set");

    let signer = Signer::new(
        ctx,
        EnvCredentialProvider::new(),
        RequestSigner::new(config(signing_config)),
    );
    Some((Pipeline::new(signer), url))
}

#[tokio::test]
async fn test_head_object() -> Result<()> {
    let Some((pipeline, url)) = init_pipeline(|c| c) else {
        warn!("SIGWEAVE_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let req = Request::head(format!("{url}/not_exist_file")).body(Body::Empty)?;
    let resp = pipeline.send(req).await?;

    debug!("got response: {resp:?}");
    assert_eq!(StatusCode::NOT_FOUND, resp.status());
    Ok(())
}

#[tokio::test]
async fn test_presigned_get_object() -> Result<()> {
    let Some((pipeline, url)) =
        init_pipeline(|c| c.with_presign(Duration::from_secs(3600)).with_unsigned_payload(true))
    else {
        warn!("SIGWEAVE_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let req = Request::get(format!("{url}/not_exist_file")).body(Body::Empty)?;
    let resp = pipeline.send(req).await?;

    debug!("got response: {resp:?}");
    assert_eq!(StatusCode::NOT_FOUND, resp.status());
    Ok(())
}

#[tokio::test]
async fn test_put_object_chunked() -> Result<()> {
    let Some((pipeline, url)) = init_pipeline(|c| c) else {
        warn!("SIGWEAVE_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let content = Bytes::from(vec![b'x'; 256 * 1024]);
    let len = content.len() as u64;
    let body = StreamBody::replayable(Some(len), move || {
        let content = content.clone();
        stream::iter(vec![Ok(content)])
    });
    let req = Request::put(format!("{url}/put_chunked_object_test")).body(Body::from(body))?;
    let resp = pipeline.send(req).await?;

    debug!(
        "got response: {:?}",
        String::from_utf8_lossy(resp.body().as_ref())
    );
    assert_eq!(StatusCode::OK, resp.status());
    Ok(())
}
