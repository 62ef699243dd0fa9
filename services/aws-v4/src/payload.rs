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

//! Body strategy selection.

use std::mem;

use bytes::Bytes;
use log::debug;
use sigweave_core::hash::{hex_sha256, EMPTY_STRING_SHA256};
use sigweave_core::{Body, Error, Result};

use crate::constants::*;
use crate::SigningConfig;

/// How the body of one attempt is hashed and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadStrategy {
    /// The body is in memory and hashed up front.
    Buffered {
        /// Hex SHA-256 of the body.
        hash: String,
    },
    /// The body is sent untouched with `UNSIGNED-PAYLOAD` as hash.
    Unsigned,
    /// The body is wrapped in aws-chunked encoding with a signature per chunk.
    Chunked {
        /// Length of the payload before encoding.
        decoded_length: u64,
    },
}

impl PayloadStrategy {
    /// The payload hash going into the canonical request.
    pub fn payload_hash(&self) -> &str {
        match self {
            PayloadStrategy::Buffered { hash } => hash,
            PayloadStrategy::Unsigned => UNSIGNED_PAYLOAD,
            PayloadStrategy::Chunked { .. } => STREAMING_AWS4_HMAC_SHA256_PAYLOAD,
        }
    }
}

/// Pick the strategy for `body`, buffering it when it is a short stream.
///
/// - Opting out of payload signing always wins.
/// - Empty and buffered bodies are hashed directly.
/// - A stream of unknown length cannot announce its decoded length, so it
///   goes unsigned.
/// - A stream at or below [`CHUNK_SIZE`] is read into memory.
/// - A longer stream, one-shot or not, goes through aws-chunked signing.
pub async fn select_payload(body: &mut Body, config: &SigningConfig) -> Result<PayloadStrategy> {
    if config.unsigned_payload {
        debug!("payload signing disabled, using {UNSIGNED_PAYLOAD}");
        return Ok(PayloadStrategy::Unsigned);
    }

    let short_stream = match &*body {
        Body::Stream(stream) => stream
            .content_length()
            .filter(|n| *n <= CHUNK_SIZE as u64),
        _ => None,
    };
    if let Some(n) = short_stream {
        let content = buffer_stream(mem::take(body), n).await?;
        *body = Body::Bytes(content);
    }

    let strategy = match &*body {
        Body::Empty => PayloadStrategy::Buffered {
            hash: EMPTY_STRING_SHA256.to_string(),
        },
        Body::Bytes(bs) => PayloadStrategy::Buffered {
            hash: hex_sha256(bs),
        },
        Body::Stream(stream) => match stream.content_length() {
            Some(n) => PayloadStrategy::Chunked { decoded_length: n },
            None => PayloadStrategy::Unsigned,
        },
    };
    debug!("selected payload strategy: {strategy:?}");

    Ok(strategy)
}

async fn buffer_stream(body: Body, expected: u64) -> Result<Bytes> {
    let content = body.collect().await?;
    if content.len() as u64 != expected {
        return Err(Error::body_interrupted(format!(
            "stream produced {} bytes but {expected} bytes were declared",
            content.len()
        )));
    }
    Ok(content)
}
