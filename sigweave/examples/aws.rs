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

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use sigweave::aws::{EnvCredentialProvider, RequestSigner, SigningConfig};
use sigweave::{default_context, Body, Pipeline, Signer, StandardRetryPolicy, StreamBody};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let ctx = default_context();
    let config = SigningConfig::from_env("s3", &ctx)?;

    // Header signing with up to 5 attempts per operation.
    let signer = Signer::new(
        ctx.clone(),
        EnvCredentialProvider::new(),
        RequestSigner::new(config.clone()),
    );
    let pipeline = Pipeline::new(signer).with_retry_policy(StandardRetryPolicy::new(5));

    let req =
        http::Request::get("https://s3.amazonaws.com/my-bucket/my-object").body(Body::Empty)?;
    let resp = pipeline.send(req).await?;
    println!("GET status: {}", resp.status());

    // A long replayable stream goes out as signed aws-chunked encoding.
    let content = Bytes::from(vec![b'x'; 1024 * 1024]);
    let len = content.len() as u64;
    let body = StreamBody::replayable(Some(len), move || stream_of(content.clone()));
    let req = http::Request::put("https://s3.amazonaws.com/my-bucket/large-object")
        .body(Body::from(body))?;
    let resp = pipeline.send(req).await?;
    println!("PUT status: {}", resp.status());

    // Presigned URL, valid for one hour.
    let presigner = Signer::new(
        ctx,
        EnvCredentialProvider::new(),
        RequestSigner::new(
            config
                .with_presign(Duration::from_secs(3600))
                .with_unsigned_payload(true),
        ),
    );
    let mut req =
        http::Request::get("https://s3.amazonaws.com/my-bucket/my-object").body(Body::Empty)?;
    presigner.sign(&mut req, sigweave::time::now()).await?;
    println!("presigned url: {}", req.uri());

    Ok(())
}

fn stream_of(content: Bytes) -> impl futures::Stream<Item = sigweave::Result<Bytes>> + Send {
    futures::stream::once(async move { Ok(content) })
}
