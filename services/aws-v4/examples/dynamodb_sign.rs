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

use anyhow::Result;
use serde_json::json;
use sigweave_aws_v4::{EnvCredentialProvider, RequestSigner, SigningConfig};
use sigweave_core::{Body, Context, OsEnv, Pipeline, Signer};
use sigweave_http_send_reqwest::ReqwestHttpSend;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);

    let config = SigningConfig::from_env("dynamodb", &ctx)
        .unwrap_or_else(|_| SigningConfig::new("dynamodb", "us-east-1"));
    let endpoint = format!("https://dynamodb.{}.amazonaws.com/", config.region);

    let signer = Signer::new(ctx, EnvCredentialProvider::new(), RequestSigner::new(config));
    let pipeline = Pipeline::new(signer);

    println!("Listing DynamoDB tables");
    let body = serde_json::to_vec(&json!({}))?;
    let req = http::Request::post(&endpoint)
        .header("content-type", "application/x-amz-json-1.0")
        .header("x-amz-target", "DynamoDB_20120810.ListTables")
        .body(Body::from(body))?;

    match pipeline.send(req).await {
        Ok(resp) => {
            println!("Response status: {}", resp.status());
            println!("{}", String::from_utf8_lossy(resp.body()));
        }
        Err(e) => eprintln!("Request failed ({}): {e}", e.kind()),
    }

    Ok(())
}
