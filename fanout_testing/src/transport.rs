//! In-memory transport recording written frames.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use bytes::Bytes;
use fanout::Transport;

/// Frames and close state shared between a [`MemoryTransport`] and the test.
#[derive(Clone, Debug, Default)]
pub struct Recorded(Arc<Mutex<RecordedInner>>);

#[derive(Debug, Default)]
struct RecordedInner {
    frames: Vec<Bytes>,
    closed: bool,
}

impl Recorded {
    /// Frames written so far.
    pub fn frames(&self) -> Vec<Bytes> { self.lock().frames.clone() }

    /// Whether the writer closed the transport.
    pub fn is_closed(&self) -> bool { self.lock().closed }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordedInner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Transport storing frames in memory, optionally failing after a number of
/// successful writes.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    recorded: Recorded,
    fail_after: Option<usize>,
}

impl MemoryTransport {
    /// Create a transport and the view used to inspect it.
    pub fn new() -> (Self, Recorded) {
        let transport = Self::default();
        let recorded = transport.recorded.clone();
        (transport, recorded)
    }

    /// Fail every write after the first `writes` succeed.
    #[must_use]
    pub fn fail_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        let mut inner = self.recorded.lock();
        if self.fail_after.is_some_and(|limit| inner.frames.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
        }
        inner.frames.push(frame);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.recorded.lock().closed = true;
        Ok(())
    }
}
