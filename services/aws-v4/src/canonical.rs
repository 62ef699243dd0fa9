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

//! Canonical request construction.

use std::fmt::Write;

use http::header::HOST;
use http::HeaderValue;
use log::debug;
use percent_encoding::utf8_percent_encode;
use sigweave_core::hash::hex_sha256;
use sigweave_core::time::{format_iso8601, DateTime};
use sigweave_core::{Result, SigningRequest};

use crate::constants::*;
use crate::signature::scope;
use crate::{Credential, SignatureLocation, SignedBodyHeader, SigningConfig};

/// The canonical form of one request attempt.
///
/// Holds the request with `Host`, `X-Amz-Date` and friends already applied,
/// so the signer only has to add the signature afterwards. Never reuse it
/// for another attempt since it embeds the signing time.
#[derive(Debug)]
pub struct CanonicalRequest {
    pub(crate) request: SigningRequest,
    payload_hash: String,
    signed_headers: Vec<String>,
    canonical_request: String,
}

impl CanonicalRequest {
    /// Canonicalize `request` for signing at `time`.
    ///
    /// `payload_hash` is either the hex SHA-256 of the body or one of the
    /// payload sentinels.
    pub fn build(
        mut request: SigningRequest,
        cred: &Credential,
        config: &SigningConfig,
        time: DateTime,
        payload_hash: String,
    ) -> Result<Self> {
        canonicalize_header(&mut request, cred, config, time, &payload_hash)?;
        let signed_headers = signed_header_names(&request);
        canonicalize_query(&mut request, cred, config, time, &signed_headers)?;

        let canonical_request =
            canonical_request_string(&request, config, &signed_headers, &payload_hash)?;
        debug!("calculated canonical request: {canonical_request}");

        Ok(Self {
            request,
            payload_hash,
            signed_headers,
            canonical_request,
        })
    }

    /// The full canonical request string.
    pub fn as_str(&self) -> &str {
        &self.canonical_request
    }

    /// Hex encoded SHA-256 of the canonical request string.
    pub fn hash(&self) -> String {
        hex_sha256(self.canonical_request.as_bytes())
    }

    /// Payload hash used on the last line.
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Signed header names, sorted and joined with `;`.
    pub fn signed_headers(&self) -> String {
        self.signed_headers.join(";")
    }
}

fn canonicalize_header(
    req: &mut SigningRequest,
    cred: &Credential,
    config: &SigningConfig,
    time: DateTime,
    payload_hash: &str,
) -> Result<()> {
    // Insert HOST header if not present.
    if !req.headers.contains_key(HOST) {
        let host = HeaderValue::from_str(req.authority.as_str())?;
        req.headers.insert(HOST, host);
    }

    if config.signature_location != SignatureLocation::Headers {
        return Ok(());
    }

    // The date always reflects the signing time.
    req.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(time))?);

    if config.signed_body_header == SignedBodyHeader::ContentSha256 {
        req.headers
            .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_str(payload_hash)?);
    }

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        if !config.omit_session_token {
            let mut value = HeaderValue::from_str(token)?;
            // Set token value sensitive to valid leaking.
            value.set_sensitive(true);
            req.headers.insert(X_AMZ_SECURITY_TOKEN, value);
        }
    }

    Ok(())
}

fn canonicalize_query(
    req: &mut SigningRequest,
    cred: &Credential,
    config: &SigningConfig,
    time: DateTime,
    signed_headers: &[String],
) -> Result<()> {
    if config.signature_location == SignatureLocation::QueryParams {
        let expires_in = config.expires_in.map(|v| v.as_secs()).unwrap_or_default();

        req.query_push(X_AMZ_ALGORITHM_QUERY, config.algorithm.as_str());
        req.query_push(
            X_AMZ_CREDENTIAL_QUERY,
            format!(
                "{}/{}",
                cred.access_key_id,
                scope(time, &config.region, &config.service)
            ),
        );
        req.query_push(X_AMZ_DATE_QUERY, format_iso8601(time));
        req.query_push(X_AMZ_EXPIRES_QUERY, expires_in.to_string());
        req.query_push(X_AMZ_SIGNED_HEADERS_QUERY, signed_headers.join(";"));

        if let Some(token) = &cred.session_token {
            if !config.omit_session_token {
                req.query_push(X_AMZ_SECURITY_TOKEN_QUERY, token);
            }
        }
    }

    // Sorting happens on the encoded form.
    let mut query = req
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    query.sort();
    req.query = query;

    Ok(())
}

fn signed_header_names(req: &SigningRequest) -> Vec<String> {
    req.header_name_to_vec_sorted()
        .into_iter()
        .filter(|name| !EXCLUDED_HEADERS.contains(name))
        .map(|name| name.to_string())
        .collect()
}

fn canonical_request_string(
    req: &SigningRequest,
    config: &SigningConfig,
    signed_headers: &[String],
    payload_hash: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", req.method)?;
    // Insert encoded path
    writeln!(f, "{}", canonical_uri(&req.path, config))?;
    // Insert query
    writeln!(
        f,
        "{}",
        req.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    for name in signed_headers {
        let values = req
            .headers
            .get_all(name.as_str())
            .iter()
            .map(canonical_header_value)
            .collect::<Result<Vec<_>>>()?;
        writeln!(f, "{name}:{}", values.join(","))?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;
    write!(f, "{payload_hash}")?;

    Ok(f)
}

/// Canonical URI path.
///
/// The path is taken as sent, already percent encoded. It is never decoded:
/// with double encoding every `%` is escaped again.
pub fn canonical_uri(path: &str, config: &SigningConfig) -> String {
    let path = if config.normalize_uri_path {
        normalize_path(path)
    } else if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };

    if config.double_uri_encode {
        utf8_percent_encode(&path, &AWS_URI_ENCODE_SET).to_string()
    } else {
        path
    }
}

/// Remove empty, `.` and `..` segments from a path.
///
/// A trailing slash is kept unless the result is the root.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            v => segments.push(v),
        }
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    normalized.push_str(&segments.join("/"));
    if path.ends_with('/') && normalized.len() > 1 {
        normalized.push('/');
    }
    normalized
}

/// Trim the value and collapse runs of spaces into one.
///
/// Fails if the value is not visible ASCII.
pub fn canonical_header_value(value: &HeaderValue) -> Result<String> {
    let value = value.to_str()?;
    Ok(value
        .split(' ')
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" "))
}
