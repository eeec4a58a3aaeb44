//! The shared pass-through pipe behind a response body.
//!
//! The pipe buffers chunks between producer handles and the consumer, bounded by the capacity
//! watermark from [`BodyLimits`][crate::limits::BodyLimits]. It also carries the metadata lock:
//! the flag is check-and-set inside the consumer's poll, before a chunk is returned, so no
//! observer can see a forwarded chunk while the lock still reads `false`.
//!
//! Each call to `replace_source` bumps a generation counter. Producer handles carry the
//! generation they were created under; a handle whose generation is stale has been superseded and
//! its writes fail.

use super::SendError;
use bytes::Bytes;
use futures_core::Stream;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::task::{Context, Poll, Waker};

pub(crate) type SourceStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// The two kinds of upstream source a body can draw from.
pub(crate) enum SourceKind {
    /// A complete in-memory payload: one chunk, then end-of-input.
    Value(Bytes),
    /// A readable stream attached as the upstream source, pulled on demand.
    Stream(SourceStream),
}

pub(crate) struct Pipe {
    locked: AtomicBool,
    state: Mutex<PipeState>,
}

struct PipeState {
    /// Chunks pushed by producers but not yet forwarded.
    queue: VecDeque<Bytes>,
    /// Bytes currently sitting in `queue`.
    buffered: usize,
    /// Watermark above which producers are suspended. `None` disables backpressure.
    capacity: Option<usize>,
    /// Bumped by every source replacement. Stale producer handles fail their writes.
    generation: u64,
    /// Live producer handles for the current generation.
    writers: usize,
    /// Whether a producer handle was ever created for the current generation.
    writer_attached: bool,
    /// Attached upstream stream, polled only when the queue is empty.
    source: Option<SourceStream>,
    /// End-of-input has been signalled for the current generation.
    closed: bool,
    reader_waker: Option<Waker>,
    writer_wakers: Vec<Waker>,
}

impl Pipe {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            locked: AtomicBool::new(false),
            state: Mutex::new(PipeState {
                queue: VecDeque::new(),
                buffered: 0,
                capacity,
                generation: 0,
                writers: 0,
                writer_attached: false,
                source: None,
                closed: false,
                reader_waker: None,
                writer_wakers: Vec::new(),
            }),
        }
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Idempotent check-and-set of the metadata lock. Called on the forwarding path only.
    fn trip_lock(&self) {
        if !self.locked.swap(true, Ordering::AcqRel) {
            tracing::trace!("first body chunk forwarded; response metadata is now locked");
        }
    }

    /// Create a producer handle for the current generation, returning that generation.
    pub(crate) fn register_writer(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.writers += 1;
        state.writer_attached = true;
        state.generation
    }

    pub(crate) fn clone_writer(&self, generation: u64) {
        let mut state = self.state.lock().unwrap();
        if state.generation == generation {
            state.writers += 1;
        }
    }

    pub(crate) fn drop_writer(&self, generation: u64) {
        let mut state = self.state.lock().unwrap();
        if state.generation == generation {
            state.writers -= 1;
            // The reader may now be able to observe end-of-input.
            if state.writers == 0 {
                if let Some(waker) = state.reader_waker.take() {
                    waker.wake();
                }
            }
        }
    }

    pub(crate) fn poll_ready(
        &self,
        generation: u64,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), SendError>> {
        let mut state = self.state.lock().unwrap();
        if state.generation != generation || state.closed {
            return Poll::Ready(Err(SendError));
        }
        if state.capacity.map_or(true, |max| state.buffered < max) {
            return Poll::Ready(Ok(()));
        }
        state.writer_wakers.push(cx.waker().clone());
        Poll::Pending
    }

    pub(crate) fn push(&self, generation: u64, chunk: Bytes) -> Result<(), SendError> {
        let mut state = self.state.lock().unwrap();
        if state.generation != generation || state.closed {
            return Err(SendError);
        }
        if chunk.is_empty() {
            return Ok(());
        }
        state.buffered += chunk.len();
        state.queue.push_back(chunk);
        if let Some(waker) = state.reader_waker.take() {
            waker.wake();
        }
        Ok(())
    }

    /// Signal end-of-input for the given generation. A stale generation is a no-op.
    pub(crate) fn close(&self, generation: u64) {
        let mut state = self.state.lock().unwrap();
        if state.generation == generation && !state.closed {
            state.closed = true;
            tracing::trace!("response body end-of-input signalled");
            if let Some(waker) = state.reader_waker.take() {
                waker.wake();
            }
        }
    }

    /// Replace the upstream source, discarding anything queued from the previous source.
    pub(crate) fn replace_source(&self, kind: SourceKind) {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.generation = state.generation.wrapping_add(1);
        state.queue.clear();
        state.buffered = 0;
        state.closed = false;
        state.writer_attached = false;
        state.writers = 0;
        state.source = None;
        match kind {
            SourceKind::Value(chunk) => {
                tracing::debug!(len = chunk.len(), "response body source replaced with value");
                if !chunk.is_empty() {
                    state.buffered = chunk.len();
                    state.queue.push_back(chunk);
                }
                state.closed = true;
            }
            SourceKind::Stream(source) => {
                tracing::debug!("response body source replaced with upstream stream");
                state.source = Some(source);
            }
        }
        if let Some(waker) = state.reader_waker.take() {
            waker.wake();
        }
        // Superseded producers must wake up to observe their write failing.
        for waker in state.writer_wakers.drain(..) {
            waker.wake();
        }
    }

    pub(crate) fn poll_next(&self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;

        if let Some(chunk) = state.queue.pop_front() {
            state.buffered -= chunk.len();
            for waker in state.writer_wakers.drain(..) {
                waker.wake();
            }
            drop(guard);
            self.trip_lock();
            return Poll::Ready(Some(chunk));
        }

        if let Some(mut source) = state.source.take() {
            // A producer push would wake us through this waker even while the source is pending.
            state.reader_waker = Some(cx.waker().clone());
            loop {
                match source.as_mut().poll_next(cx) {
                    Poll::Ready(Some(chunk)) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        state.source = Some(source);
                        drop(guard);
                        self.trip_lock();
                        return Poll::Ready(Some(chunk));
                    }
                    Poll::Ready(None) => {
                        state.closed = true;
                        return Poll::Ready(None);
                    }
                    Poll::Pending => {
                        state.source = Some(source);
                        return Poll::Pending;
                    }
                }
            }
        }

        if state.closed || (state.writer_attached && state.writers == 0) {
            return Poll::Ready(None);
        }
        state.reader_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}
