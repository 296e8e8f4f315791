//! In-memory [`Connection`] for tests of the layers above the transport.
//!
//! Enabled with the `mock` feature. Records every frame written to it and
//! serves frames pushed with [`MockConnection::push_incoming`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::{mpsc, Notify};

use crate::{Connection, ConnectionId, TransportError};

static NEXT_MOCK_ID: AtomicU64 = AtomicU64::new(1_000_000);

/// A connection that never touches a socket.
pub struct MockConnection {
    id: ConnectionId,
    sent: Mutex<Vec<Vec<u8>>>,
    incoming_tx: mpsc::UnboundedSender<Vec<u8>>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: AtomicBool,
    close_signal: Notify,
    fail_sends: AtomicBool,
}

impl MockConnection {
    /// Creates a mock with a fresh, unique id.
    pub fn new() -> Self {
        Self::with_id(ConnectionId::new(
            NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed),
        ))
    }

    pub fn with_id(id: ConnectionId) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            id,
            sent: Mutex::new(Vec::new()),
            incoming_tx,
            incoming_rx: tokio::sync::Mutex::new(incoming_rx),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Queues a frame body for the next [`recv`](Connection::recv).
    pub fn push_incoming(&self, body: Vec<u8>) {
        let _ = self.incoming_tx.send(body);
    }

    /// Every frame sent so far, oldest first.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drains the recorded frames.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default()
    }

    /// Makes subsequent sends fail with `SendFailed`.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MockConnection {
    type Error = TransportError;

    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(self.id.to_string()));
        }
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(frame.to_vec());
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        let mut rx = self.incoming_rx.lock().await;
        tokio::select! {
            _ = self.close_signal.notified() => Ok(None),
            body = rx.recv() => Ok(body),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.close_signal.notify_one();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
