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

//! Request body representation shared by every pipeline stage.

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};

use crate::Result;

/// A boxed stream of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

type StreamFactory = Arc<dyn Fn() -> ByteStream + Send + Sync>;

/// Body of a request flowing through the pipeline.
///
/// Signing and retry logic branch on the variant only:
///
/// - [`Body::Empty`] and [`Body::Bytes`] are always replayable.
/// - [`Body::Stream`] is replayable only when it was built from a factory,
///   see [`StreamBody::replayable`].
#[derive(Default)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// Fully buffered content.
    Bytes(Bytes),
    /// Lazily read content.
    Stream(StreamBody),
}

impl Body {
    /// Create an empty body.
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Check whether this body can be sent again after a failed attempt.
    pub fn is_replayable(&self) -> bool {
        match self {
            Body::Empty | Body::Bytes(_) => true,
            Body::Stream(s) => s.is_replayable(),
        }
    }

    /// Declared length of the body, `None` if unknown.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bs) => Some(bs.len() as u64),
            Body::Stream(s) => s.content_length(),
        }
    }

    /// Copy the body for another attempt.
    ///
    /// Buffered content is shared by reference count. Replayable streams get a
    /// fresh handle on the same factory. One-shot streams return `None`.
    pub fn try_clone(&self) -> Option<Body> {
        match self {
            Body::Empty => Some(Body::Empty),
            Body::Bytes(bs) => Some(Body::Bytes(bs.clone())),
            Body::Stream(s) => s.try_clone().map(Body::Stream),
        }
    }

    /// Turn the body into a stream of chunks.
    pub fn into_stream(self) -> ByteStream {
        match self {
            Body::Empty => futures::stream::empty::<Result<Bytes>>().boxed(),
            Body::Bytes(bs) => futures::stream::once(async move { Ok(bs) }).boxed(),
            Body::Stream(s) => s.into_stream(),
        }
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bs) => Ok(bs),
            Body::Stream(s) => {
                let chunks: Vec<Bytes> = s.into_stream().try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(bs) => write!(f, "Body::Bytes({} bytes)", bs.len()),
            Body::Stream(s) => s.fmt(f),
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        if value.is_empty() {
            Body::Empty
        } else {
            Body::Bytes(value)
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Bytes::from(value).into()
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Bytes::from(value).into()
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Bytes::from_static(value.as_bytes()).into()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::Empty
    }
}

impl From<StreamBody> for Body {
    fn from(value: StreamBody) -> Self {
        Body::Stream(value)
    }
}

enum StreamSource {
    Replayable(StreamFactory),
    OneShot(ByteStream),
}

/// A lazily read body.
pub struct StreamBody {
    source: StreamSource,
    content_length: Option<u64>,
}

impl StreamBody {
    /// Build a stream body that can be read again by calling `factory` once
    /// per attempt.
    pub fn replayable<F, S>(content_length: Option<u64>, factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            source: StreamSource::Replayable(Arc::new(move || factory().boxed())),
            content_length,
        }
    }

    /// Build a stream body that can only be read once.
    pub fn one_shot<S>(content_length: Option<u64>, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            source: StreamSource::OneShot(stream.boxed()),
            content_length,
        }
    }

    /// Declared length, `None` if unknown.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Check whether the stream can be read again.
    pub fn is_replayable(&self) -> bool {
        matches!(self.source, StreamSource::Replayable(_))
    }

    /// Copy the handle. Only replayable streams can be copied.
    pub fn try_clone(&self) -> Option<StreamBody> {
        match &self.source {
            StreamSource::Replayable(factory) => Some(StreamBody {
                source: StreamSource::Replayable(factory.clone()),
                content_length: self.content_length,
            }),
            StreamSource::OneShot(_) => None,
        }
    }

    /// Start reading the stream.
    pub fn into_stream(self) -> ByteStream {
        match self.source {
            StreamSource::Replayable(factory) => factory(),
            StreamSource::OneShot(stream) => stream,
        }
    }
}

impl Debug for StreamBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBody")
            .field("replayable", &self.is_replayable())
            .field("content_length", &self.content_length)
            .finish()
    }
}

/// Deep copy a request for one attempt.
///
/// Method, uri, version, headers and extensions are always copied. The body
/// is copied per [`Body::try_clone`], so this returns `None` for a request
/// carrying a one-shot stream.
pub fn try_clone_request(req: &http::Request<Body>) -> Option<http::Request<Body>> {
    let body = req.body().try_clone()?;

    let mut cloned = http::Request::new(body);
    *cloned.method_mut() = req.method().clone();
    *cloned.uri_mut() = req.uri().clone();
    *cloned.version_mut() = req.version();
    *cloned.headers_mut() = req.headers().clone();
    *cloned.extensions_mut() = req.extensions().clone();
    Some(cloned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunks() -> impl Stream<Item = Result<Bytes>> + Send + 'static {
        futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ])
    }

    #[test]
    fn test_replayable_flags() {
        assert!(Body::Empty.is_replayable());
        assert!(Body::from("abc").is_replayable());
        assert!(Body::from(StreamBody::replayable(Some(11), chunks)).is_replayable());
        assert!(!Body::from(StreamBody::one_shot(Some(11), chunks())).is_replayable());
    }

    #[test]
    fn test_empty_bytes_become_empty() {
        assert!(matches!(Body::from(Vec::new()), Body::Empty));
        assert_eq!(Body::from("abc").content_length(), Some(3));
    }

    #[tokio::test]
    async fn test_replayable_stream_reads_fresh_each_time() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let body = Body::from(StreamBody::replayable(Some(11), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            chunks()
        }));

        let copy = body.try_clone().expect("replayable body must clone");
        assert_eq!(copy.collect().await?, Bytes::from_static(b"hello world"));
        assert_eq!(body.collect().await?, Bytes::from_static(b"hello world"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_one_shot_request_cannot_be_cloned() {
        let req = http::Request::builder()
            .uri("https://example.com/")
            .body(Body::from(StreamBody::one_shot(None, chunks())))
            .expect("request must build");
        assert!(try_clone_request(&req).is_none());
    }

    #[test]
    fn test_clone_request_is_independent() {
        let mut req = http::Request::builder()
            .method("PUT")
            .uri("https://example.com/key?a=b")
            .header("x-test", "1")
            .body(Body::from("payload"))
            .expect("request must build");

        let copy = try_clone_request(&req).expect("buffered body must clone");
        req.headers_mut().insert("x-test", http::HeaderValue::from_static("2"));

        assert_eq!(copy.method(), http::Method::PUT);
        assert_eq!(copy.uri(), "https://example.com/key?a=b");
        assert_eq!(copy.headers()["x-test"], "1");
        assert_eq!(copy.body().content_length(), Some(7));
    }
}
