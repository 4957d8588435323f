// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Body tee-ing for request/response capture (spec §4.9): wraps an
//! `axum::body::Body` so that bytes keep flowing to their destination
//! unaltered while up to `max_body_size` bytes are retained on the side.
//! Used for both the request body (tee before forwarding to the backend)
//! and the response body (tee before the bytes reach the client).

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Shared sink that a [`TeeBody`] writes its retained prefix into as chunks
/// arrive, capped at `max_body_size` bytes (spec §4.9 "up to `max_body_size`
/// bytes are retained").
#[derive(Clone)]
pub struct CaptureSink {
    inner: Arc<Mutex<SinkState>>,
}

struct SinkState {
    buf: Vec<u8>,
    cap: usize,
    total_len: u64,
    truncated: bool,
}

impl CaptureSink {
    pub fn new(cap: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(SinkState { buf: Vec::new(), cap, total_len: 0, truncated: false })) }
    }

    fn push(&self, chunk: &[u8]) {
        let mut state = self.inner.lock();
        state.total_len += chunk.len() as u64;
        if state.buf.len() < state.cap {
            let remaining = state.cap - state.buf.len();
            let take = remaining.min(chunk.len());
            state.buf.extend_from_slice(&chunk[..take]);
        }
        if state.total_len > state.cap as u64 {
            state.truncated = true;
        }
    }

    /// Bytes retained so far, whether the full body exceeded the cap, and
    /// the full original length observed.
    pub fn snapshot(&self) -> (Vec<u8>, bool, u64) {
        let state = self.inner.lock();
        (state.buf.clone(), state.truncated, state.total_len)
    }
}

/// What a [`TeeBody`]'s completion hook receives once the body has been
/// fully drained (or dropped, e.g. on client disconnect mid-stream).
pub struct CaptureSnapshot {
    pub retained: Vec<u8>,
    pub truncated: bool,
    pub total_len: u64,
}

/// An `http_body::Body` wrapper that forwards every frame unchanged while
/// mirroring data frames into a [`CaptureSink`] (spec §4.9 "tee'd"). The
/// original body continues to flow to its destination byte-identical
/// regardless of the cap (Testable Property 10).
///
/// An optional completion hook fires from `Drop`, once hyper has finished
/// driving (or abandoned) the body — this is what lets a streaming response
/// (e.g. SSE, which may never naturally reach `is_end_stream`) still get its
/// capture finalized without `record()` blocking on the stream ending.
pub struct TeeBody<B> {
    inner: B,
    sink: CaptureSink,
    on_complete: Option<Box<dyn FnOnce(CaptureSnapshot) + Send>>,
}

impl<B> TeeBody<B> {
    pub fn new(inner: B, sink: CaptureSink) -> Self {
        Self { inner, sink, on_complete: None }
    }

    pub fn with_on_complete(mut self, hook: impl FnOnce(CaptureSnapshot) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }
}

impl<B> Drop for TeeBody<B> {
    fn drop(&mut self) {
        if let Some(hook) = self.on_complete.take() {
            let (retained, truncated, total_len) = self.sink.snapshot();
            hook(CaptureSnapshot { retained, truncated, total_len });
        }
    }
}

impl<B> Body for TeeBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.sink.push(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
