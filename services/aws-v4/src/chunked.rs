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

//! aws-chunked encoding with per-chunk signatures.
//!
//! Every chunk on the wire looks like:
//!
//! ```text
//! <hex-size>;chunk-signature=<sig>\r\n<bytes>\r\n
//! ```
//!
//! and the body ends with a zero sized chunk:
//!
//! ```text
//! 0;chunk-signature=<sig>\r\n\r\n
//! ```
//!
//! Each signature covers the previous one, starting from the signature of
//! the request itself.

use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use log::debug;
use sigweave_core::hash::{hex_sha256, EMPTY_STRING_SHA256};
use sigweave_core::time::{format_iso8601, DateTime};
use sigweave_core::{ByteStream, Error, Result};

use crate::constants::*;
use crate::signature::calculate_signature;

const CHUNK_SIGNATURE_EXT: &str = ";chunk-signature=";
const SIGNATURE_LEN: u64 = 64;
const CRLF: &[u8] = b"\r\n";

/// Signing state carried from one chunk to the next.
///
/// Each call consumes the state, so chunks can only be signed in order.
#[derive(Debug)]
pub struct ChunkSigningState {
    previous_signature: String,
    signing_key: Vec<u8>,
    timestamp: String,
    scope: String,
}

impl ChunkSigningState {
    /// Start a chain seeded by the request signature.
    pub fn new(seed_signature: String, signing_key: Vec<u8>, time: DateTime, scope: String) -> Self {
        Self {
            previous_signature: seed_signature,
            signing_key,
            timestamp: format_iso8601(time),
            scope,
        }
    }

    /// Signature the next chunk will chain from.
    pub fn previous_signature(&self) -> &str {
        &self.previous_signature
    }

    /// String to sign for `chunk`.
    ///
    /// ```text
    /// AWS4-HMAC-SHA256-PAYLOAD
    /// <timestamp>
    /// <scope>
    /// <previous signature>
    /// <hash of empty string>
    /// <hash of chunk>
    /// ```
    pub fn string_to_sign(&self, chunk: &[u8]) -> String {
        format!(
            "{AWS4_HMAC_SHA256_PAYLOAD}\n{}\n{}\n{}\n{EMPTY_STRING_SHA256}\n{}",
            self.timestamp,
            self.scope,
            self.previous_signature,
            hex_sha256(chunk)
        )
    }

    /// Sign a data chunk and move on to the next state.
    pub fn sign_chunk(mut self, chunk: &[u8]) -> (String, ChunkSigningState) {
        let signature = calculate_signature(&self.signing_key, &self.string_to_sign(chunk));
        self.previous_signature = signature.clone();
        (signature, self)
    }

    /// Sign the terminating empty chunk, ending the chain.
    pub fn sign_final(self) -> String {
        calculate_signature(&self.signing_key, &self.string_to_sign(&[]))
    }
}

/// Length of the framed chunk carrying `size` bytes of payload.
fn framed_len(size: u64) -> u64 {
    let hex_len = format!("{size:x}").len() as u64;
    hex_len + CHUNK_SIGNATURE_EXT.len() as u64 + SIGNATURE_LEN + 2 + size + 2
}

/// Exact length on the wire of an aws-chunked body carrying `decoded_length`
/// bytes.
pub fn encoded_length(decoded_length: u64) -> u64 {
    let chunk_size = CHUNK_SIZE as u64;
    let full = decoded_length / chunk_size;
    let rest = decoded_length % chunk_size;

    let mut total = full * framed_len(chunk_size) + framed_len(0);
    if rest > 0 {
        total += framed_len(rest);
    }
    total
}

fn frame(data: &[u8], signature: &str) -> Bytes {
    let header = format!("{:x}{CHUNK_SIGNATURE_EXT}{signature}", data.len());
    let mut buf = BytesMut::with_capacity(header.len() + data.len() + 4);
    buf.put_slice(header.as_bytes());
    buf.put_slice(CRLF);
    buf.put_slice(data);
    buf.put_slice(CRLF);
    buf.freeze()
}

enum EncoderState {
    /// Waiting for enough source data to emit the next chunk.
    AwaitingChunk(ChunkSigningState),
    /// Source is drained, remaining buffer and the final chunk are pending.
    SourceExhausted(ChunkSigningState),
    /// Final chunk emitted or the attempt failed.
    Done,
}

/// Stream adapter producing the aws-chunked encoding of a body.
///
/// The source is only polled while a chunk is being gathered. Dropping the
/// stream abandons the chain without emitting the final chunk.
pub struct AwsChunkedStream {
    source: ByteStream,
    buffer: BytesMut,
    state: EncoderState,
    expected_length: u64,
    read_length: u64,
}

impl AwsChunkedStream {
    /// Wrap `source`, which must yield exactly `decoded_length` bytes.
    pub fn new(source: ByteStream, decoded_length: u64, state: ChunkSigningState) -> Self {
        Self {
            source,
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            state: EncoderState::AwaitingChunk(state),
            expected_length: decoded_length,
            read_length: 0,
        }
    }

    fn emit(&mut self, state: ChunkSigningState, len: usize) -> Bytes {
        let data = self.buffer.split_to(len);
        let (signature, next) = state.sign_chunk(&data);
        debug!("emitting aws-chunked chunk of {len} bytes");
        self.state = EncoderState::AwaitingChunk(next);
        frame(&data, &signature)
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<Bytes>>> {
        self.state = EncoderState::Done;
        self.buffer.clear();
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for AwsChunkedStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match mem::replace(&mut this.state, EncoderState::Done) {
                EncoderState::Done => return Poll::Ready(None),
                EncoderState::AwaitingChunk(state) => {
                    if this.buffer.len() >= CHUNK_SIZE {
                        return Poll::Ready(Some(Ok(this.emit(state, CHUNK_SIZE))));
                    }

                    match this.source.poll_next_unpin(cx) {
                        Poll::Pending => {
                            this.state = EncoderState::AwaitingChunk(state);
                            return Poll::Pending;
                        }
                        Poll::Ready(Some(Ok(bs))) => {
                            this.read_length += bs.len() as u64;
                            if this.read_length > this.expected_length {
                                return this.fail(Error::body_interrupted(format!(
                                    "stream produced more than the declared {} bytes",
                                    this.expected_length
                                )));
                            }
                            this.buffer.extend_from_slice(&bs);
                            this.state = EncoderState::AwaitingChunk(state);
                        }
                        Poll::Ready(Some(Err(err))) => {
                            return this.fail(
                                Error::body_interrupted("body stream failed while chunk signing")
                                    .with_source(err),
                            );
                        }
                        Poll::Ready(None) => {
                            if this.read_length != this.expected_length {
                                return this.fail(Error::body_interrupted(format!(
                                    "stream ended after {} bytes but {} bytes were declared",
                                    this.read_length, this.expected_length
                                )));
                            }
                            this.state = EncoderState::SourceExhausted(state);
                        }
                    }
                }
                EncoderState::SourceExhausted(state) => {
                    if this.buffer.is_empty() {
                        let signature = state.sign_final();
                        debug!("emitting final aws-chunked chunk");
                        return Poll::Ready(Some(Ok(frame(&[], &signature))));
                    }

                    let len = this.buffer.len().min(CHUNK_SIZE);
                    let frame = this.emit(state, len);
                    if let EncoderState::AwaitingChunk(next) =
                        mem::replace(&mut this.state, EncoderState::Done)
                    {
                        this.state = EncoderState::SourceExhausted(next);
                    }
                    return Poll::Ready(Some(Ok(frame)));
                }
            }
        }
    }
}
