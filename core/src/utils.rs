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

//! Helpers to keep secrets out of logs.

use std::fmt::Debug;

/// Debug wrapper that hides most of a secret.
///
/// Secrets shorter than 12 bytes are fully hidden. Longer ones keep their
/// first and last three characters so different keys stay distinguishable.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref().unwrap_or_default())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0;
        if s.is_empty() {
            return f.write_str("EMPTY");
        }
        if s.len() < 12 || !s.is_char_boundary(3) || !s.is_char_boundary(s.len() - 3) {
            return f.write_str("***");
        }
        write!(f, "{}***{}", &s[..3], &s[s.len() - 3..])
    }
}

/// Render headers for logging, hiding sensitive values.
///
/// Values flagged with [`http::HeaderValue::set_sensitive`] are printed as
/// `***`.
pub fn redact_headers(headers: &http::HeaderMap) -> String {
    headers
        .iter()
        .map(|(k, v)| {
            if v.is_sensitive() {
                format!("{k}: ***")
            } else {
                format!("{k}: {}", String::from_utf8_lossy(v.as_bytes()))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
