//! Streaming response bodies.

pub(crate) mod pipe;

use self::pipe::{Pipe, SourceKind};
use crate::limits::BodyLimits;
use bytes::Bytes;
use futures_core::Stream;
use futures_sink::Sink;
use std::fmt::Debug;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// The streaming body of a [`Response`][crate::Response].
///
/// A body is a pass-through byte channel: every chunk written into it is forwarded unchanged to
/// whatever is reading from it. The body value itself never changes identity after the response is
/// constructed; all I/O happens through handles obtained from it:
///
/// - [`writer()`][`Self::writer()`] returns a cloneable producer handle that writes chunks into
///   the body under backpressure.
/// - [`reader()`][`Self::reader()`] returns the consumer handle that a transport drains. The body
///   has a single logical output, so create one reader and hand it to whatever serializes the
///   response.
///
/// Forwarding the first chunk to a reader permanently locks the status code and headers of the
/// owning response. Writing alone does not lock; the transition happens at the moment a chunk
/// exits toward the consumer.
pub struct Body {
    pipe: Arc<Pipe>,
}

impl Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<opaque Body>")
    }
}

impl Body {
    /// Get a new, empty body using the buffering watermark from
    /// [`BodyLimits`][crate::limits::BodyLimits].
    pub(crate) fn new() -> Self {
        Self::with_capacity(BodyLimits::get_max_buffered_bytes())
    }

    pub(crate) fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            pipe: Arc::new(Pipe::new(capacity)),
        }
    }

    /// Create a producer handle for writing chunks into this body.
    ///
    /// The handle is tied to the body's current upstream source: if
    /// [`Response::set_body()`][crate::Response::set_body()] later replaces the source, this
    /// handle is detached and its writes fail with [`SendError`].
    pub fn writer(&self) -> BodyWriter {
        let generation = self.pipe.register_writer();
        BodyWriter {
            pipe: Arc::clone(&self.pipe),
            generation,
        }
    }

    /// Create the consumer handle for reading chunks out of this body.
    pub fn reader(&self) -> BodyReader {
        BodyReader {
            pipe: Arc::clone(&self.pipe),
        }
    }

    /// Return whether the first chunk has been forwarded to a reader.
    ///
    /// Once this returns `true` it never reverts, and the status code and headers of the owning
    /// response are permanently immutable.
    pub fn is_locked(&self) -> bool {
        self.pipe.is_locked()
    }

    pub(crate) fn replace_source(&self, source: BodySource) {
        self.pipe.replace_source(source.kind);
    }
}

/// An upstream data source for a response body, used with
/// [`Response::set_body()`][crate::Response::set_body()].
///
/// A source is either a complete in-memory value or a readable stream, decided explicitly at the
/// call site. Plain payloads convert via [`From`]:
///
/// ```no_run
/// # use relay_http::Response;
/// let mut resp = Response::new();
/// resp.set_body("goodbye cruel world");
/// ```
///
/// Readable streams are attached with [`BodySource::stream()`]:
///
/// ```no_run
/// # use bytes::Bytes;
/// # use relay_http::http::BodySource;
/// # use relay_http::Response;
/// let mut resp = Response::new();
/// let upstream = futures::stream::iter(vec![Bytes::from_static(b"hello world")]);
/// resp.set_body(BodySource::stream(upstream));
/// ```
pub struct BodySource {
    kind: SourceKind,
}

impl BodySource {
    /// Attach a readable stream as the body's upstream source.
    ///
    /// The stream is pulled on demand: a chunk is only requested from it when the body's reader
    /// asks for one, so upstream production is paced by downstream consumption.
    pub fn stream(stream: impl Stream<Item = Bytes> + Send + 'static) -> Self {
        Self {
            kind: SourceKind::Stream(Box::pin(stream)),
        }
    }

    /// Use a complete in-memory payload as the body: one chunk, then end-of-input.
    pub fn value(value: impl Into<Bytes>) -> Self {
        Self {
            kind: SourceKind::Value(value.into()),
        }
    }
}

impl Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SourceKind::Value(chunk) => f.debug_tuple("BodySource::Value").field(&chunk.len()).finish(),
            SourceKind::Stream(_) => f.write_str("BodySource::Stream"),
        }
    }
}

impl From<&str> for BodySource {
    fn from(s: &str) -> Self {
        Self::value(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for BodySource {
    fn from(s: String) -> Self {
        Self::value(Bytes::from(s))
    }
}

impl From<&[u8]> for BodySource {
    fn from(s: &[u8]) -> Self {
        Self::value(Bytes::copy_from_slice(s))
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(s: Vec<u8>) -> Self {
        Self::value(Bytes::from(s))
    }
}

impl From<Bytes> for BodySource {
    fn from(s: Bytes) -> Self {
        Self::value(s)
    }
}

/// A write on a producer handle that is no longer connected to its body.
///
/// This happens when [`Response::set_body()`][crate::Response::set_body()] replaces the body's
/// upstream source after the handle was created, or after end-of-input has been signalled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("body writer is no longer connected to the response body")]
pub struct SendError;

/// A producer handle for a response body.
///
/// Chunks written through this handle are forwarded unchanged to the body's reader. Writes are
/// backpressured: when the buffered bytes reach the watermark from
/// [`BodyLimits`][crate::limits::BodyLimits], a write waits until the reader drains the buffer.
///
/// The handle implements [`Sink<Bytes>`][futures_sink::Sink], so any byte stream can be piped in
/// with the standard combinators (for example `StreamExt::forward`), which closes the body when
/// the upstream stream ends.
///
/// Dropping every writer of the current source signals end-of-input, as does an explicit
/// [`close()`][`Self::close()`].
pub struct BodyWriter {
    pipe: Arc<Pipe>,
    generation: u64,
}

impl BodyWriter {
    /// Write a chunk into the body, waiting for buffer capacity if necessary.
    ///
    /// Returns [`SendError`] if this handle has been detached by a later source replacement.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), SendError> {
        let chunk = chunk.into();
        poll_fn(|cx| self.pipe.poll_ready(self.generation, cx)).await?;
        self.pipe.push(self.generation, chunk)
    }

    /// Write a string slice into the body, waiting for buffer capacity if necessary.
    pub async fn write_str(&mut self, string: &str) -> Result<(), SendError> {
        self.write(Bytes::copy_from_slice(string.as_bytes())).await
    }

    /// Signal end-of-input for the body.
    ///
    /// A detached handle's close is a no-op.
    pub fn close(&mut self) {
        self.pipe.close(self.generation);
    }
}

impl Clone for BodyWriter {
    fn clone(&self) -> Self {
        self.pipe.clone_writer(self.generation);
        Self {
            pipe: Arc::clone(&self.pipe),
            generation: self.generation,
        }
    }
}

impl Drop for BodyWriter {
    fn drop(&mut self) {
        self.pipe.drop_writer(self.generation);
    }
}

impl Debug for BodyWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<opaque BodyWriter>")
    }
}

impl Sink<Bytes> for BodyWriter {
    type Error = SendError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), SendError>> {
        self.pipe.poll_ready(self.generation, cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), SendError> {
        self.pipe.push(self.generation, item)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), SendError>> {
        // Chunks are visible to the reader as soon as they are enqueued.
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), SendError>> {
        self.pipe.close(self.generation);
        Poll::Ready(Ok(()))
    }
}

/// The consumer handle for a response body.
///
/// Yields exactly the chunks that entered the body, in order, unmodified. Yielding the first
/// chunk flips the owning response's metadata lock, synchronously, before the chunk is returned.
///
/// The handle implements [`Stream<Item = Bytes>`][futures_core::Stream] for use with the standard
/// combinators.
pub struct BodyReader {
    pipe: Arc<Pipe>,
}

impl BodyReader {
    /// Read the next chunk from the body, or `None` at end-of-input.
    pub async fn read_chunk(&mut self) -> Option<Bytes> {
        poll_fn(|cx| self.pipe.poll_next(cx)).await
    }

    /// Read the remainder of the body into a byte vector.
    pub async fn into_bytes(mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.read_chunk().await {
            buf.extend_from_slice(&chunk);
        }
        buf
    }

    /// Read the remainder of the body into a `String`, interpreting the bytes as UTF-8.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid UTF-8.
    pub async fn into_string(self) -> String {
        String::from_utf8(self.into_bytes().await).expect("response body was not valid UTF-8")
    }
}

impl Stream for BodyReader {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.pipe.poll_next(cx)
    }
}

impl Debug for BodyReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<opaque BodyReader>")
    }
}

#[cfg(test)]
mod body_pipe_tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn chunks_pass_through_unchanged() {
        let body = Body::new();
        let mut writer = body.writer();
        let mut reader = body.reader();

        writer.write_str("hello world").await.unwrap();
        writer.close();

        let chunk = reader.read_chunk().await.unwrap();
        assert_eq!(&chunk[..], b"hello world");
        assert!(reader.read_chunk().await.is_none());
    }

    #[tokio::test]
    async fn writing_does_not_lock_but_reading_does() {
        let body = Body::new();
        let mut writer = body.writer();
        let mut reader = body.reader();

        writer.write_str("chunk").await.unwrap();
        assert!(!body.is_locked());

        reader.read_chunk().await.unwrap();
        assert!(body.is_locked());

        // The lock is one-way.
        writer.write_str("more").await.unwrap();
        reader.read_chunk().await.unwrap();
        assert!(body.is_locked());
    }

    #[tokio::test]
    async fn dropping_all_writers_ends_the_body() {
        let body = Body::new();
        let mut writer = body.writer();
        let second = writer.clone();

        writer.write_str("chunk").await.unwrap();
        drop(writer);
        drop(second);

        let mut reader = body.reader();
        assert_eq!(&reader.read_chunk().await.unwrap()[..], b"chunk");
        assert!(reader.read_chunk().await.is_none());
    }

    #[tokio::test]
    async fn fresh_body_with_no_producer_stays_open() {
        let body = Body::new();
        let mut reader = body.reader();

        let read = reader.read_chunk();
        tokio::pin!(read);
        let timeout = tokio::time::timeout(std::time::Duration::from_millis(10), &mut read).await;
        assert!(timeout.is_err(), "read should still be pending");
    }

    #[tokio::test]
    async fn writer_resumes_after_reader_drains() {
        let body = Body::with_capacity(Some(8));
        let mut writer = body.writer();
        let mut reader = body.reader();

        writer.write_str("12345678").await.unwrap();

        // The pipe is at its watermark; the next write must wait for the reader.
        let blocked = tokio::spawn(async move {
            writer.write_str("rest").await.unwrap();
            writer.close();
        });

        assert_eq!(&reader.read_chunk().await.unwrap()[..], b"12345678");
        assert_eq!(&reader.read_chunk().await.unwrap()[..], b"rest");
        assert!(reader.read_chunk().await.is_none());
        blocked.await.unwrap();
    }

    #[tokio::test]
    async fn value_source_supersedes_queued_writes() {
        let body = Body::new();
        let mut writer = body.writer();
        writer.write_str("hello world").await.unwrap();

        body.replace_source(BodySource::from("goodbye cruel world"));

        match writer.write_str("ignored").await {
            Err(SendError) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        writer.close(); // stale close must be a no-op

        let bytes = body.reader().into_bytes().await;
        assert_eq!(bytes, b"goodbye cruel world");
    }

    #[tokio::test]
    async fn stream_source_is_pulled_on_demand() {
        let body = Body::new();
        let chunks = vec![Bytes::from_static(b"hello "), Bytes::from_static(b"world")];
        body.replace_source(BodySource::stream(futures::stream::iter(chunks)));

        assert!(!body.is_locked());
        let text = body.reader().into_string().await;
        assert_eq!(text, "hello world");
        assert!(body.is_locked());
    }

    #[tokio::test]
    async fn stream_source_replaces_an_earlier_stream_source() {
        let body = Body::new();
        let old = futures::stream::iter(vec![Bytes::from_static(b"old data")]);
        let new = futures::stream::iter(vec![Bytes::from_static(b"new data")]);

        body.replace_source(BodySource::stream(old));
        body.replace_source(BodySource::stream(new));

        let bytes = body.reader().into_bytes().await;
        assert_eq!(bytes, b"new data");
    }

    #[tokio::test]
    async fn sink_forward_pipes_a_stream_in() {
        let body = Body::new();
        let upstream = futures::stream::iter(vec![
            Bytes::from_static(b"hello "),
            Bytes::from_static(b"world"),
        ])
        .map(Ok);

        upstream.forward(body.writer()).await.unwrap();

        let text = body.reader().into_string().await;
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn reader_stream_yields_chunks_in_order() {
        let body = Body::new();
        let mut writer = body.writer();
        writer.write_str("one").await.unwrap();
        writer.write_str("two").await.unwrap();
        writer.close();

        let chunks: Vec<Bytes> = body.reader().collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]);
    }

    #[tokio::test]
    async fn empty_chunks_are_not_forwarded_and_do_not_lock() {
        let body = Body::new();
        let mut writer = body.writer();
        writer.write(Bytes::new()).await.unwrap();
        writer.close();

        let mut reader = body.reader();
        assert!(reader.read_chunk().await.is_none());
        assert!(!body.is_locked());
    }
}
