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

//! Request mutation after the signature is known.

use http::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::HeaderValue;
use percent_encoding::utf8_percent_encode;
use sigweave_core::{Result, SigningRequest};

use crate::canonical::CanonicalRequest;
use crate::constants::*;
use crate::{Credential, SignatureLocation, SigningConfig};

/// Put the signature into the canonical request and hand back the request
/// to send.
///
/// Existing headers are left in place; new ones are appended.
pub fn apply_signature(
    canonical: CanonicalRequest,
    cred: &Credential,
    config: &SigningConfig,
    scope: &str,
    signature: &str,
) -> Result<SigningRequest> {
    let signed_headers = canonical.signed_headers();
    let mut req = canonical.request;

    match config.signature_location {
        SignatureLocation::Headers => {
            let mut authorization = HeaderValue::from_str(&format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                config.algorithm, cred.access_key_id, scope, signed_headers, signature
            ))?;
            authorization.set_sensitive(true);
            req.headers.insert(AUTHORIZATION, authorization);

            if let (Some(token), true) = (&cred.session_token, config.omit_session_token) {
                let mut value = HeaderValue::from_str(token)?;
                value.set_sensitive(true);
                req.headers.insert(X_AMZ_SECURITY_TOKEN, value);
            }
        }
        SignatureLocation::QueryParams => {
            req.query_push(X_AMZ_SIGNATURE_QUERY, signature);

            if let (Some(token), true) = (&cred.session_token, config.omit_session_token) {
                req.query_push(
                    X_AMZ_SECURITY_TOKEN_QUERY,
                    utf8_percent_encode(token, &AWS_QUERY_ENCODE_SET).to_string(),
                );
            }
        }
    }

    Ok(req)
}

/// Switch the headers of `req` to aws-chunked transfer.
///
/// Runs before canonicalization so the new headers are signed.
pub fn apply_chunked_headers(req: &mut SigningRequest, decoded_length: u64) -> Result<()> {
    req.headers.remove(CONTENT_LENGTH);
    req.headers
        .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

    let encoding = match req.headers.get(CONTENT_ENCODING) {
        Some(v) if !v.is_empty() => HeaderValue::from_str(&format!(
            "{AWS_CHUNKED},{}",
            v.to_str()?
        ))?,
        _ => HeaderValue::from_static(AWS_CHUNKED),
    };
    req.headers.insert(CONTENT_ENCODING, encoding);
    req.headers.insert(
        X_AMZ_DECODED_CONTENT_LENGTH,
        HeaderValue::from(decoded_length),
    );
    req.headers.insert(
        X_AMZ_CONTENT_SHA_256,
        HeaderValue::from_static(STREAMING_AWS4_HMAC_SHA256_PAYLOAD),
    );

    Ok(())
}
