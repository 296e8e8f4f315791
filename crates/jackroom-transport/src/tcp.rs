//! TCP transport: one [`TcpConnection`] per accepted stream.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};

use crate::frame::{read_frame, DEFAULT_MAX_FRAME_LEN};
use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Caps the body size of frames read from accepted connections.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "failed to set TCP_NODELAY");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted TCP connection");

        let (read, write) = stream.into_split();
        Ok(TcpConnection {
            id,
            peer: addr,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
            max_frame_len: self.max_frame_len,
        })
    }
}

/// A single TCP connection.
///
/// Reads and writes go through separate halves, so a broadcast from
/// another task never waits behind this connection's pending read.
/// [`close`](Connection::close) wakes a pending [`recv`](Connection::recv)
/// with `Ok(None)`.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
    closed: AtomicBool,
    close_signal: Notify,
    max_frame_len: usize,
}

impl TcpConnection {
    /// The remote peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(self.id.to_string()));
        }
        self.writer
            .lock()
            .await
            .write_all(frame)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        let mut reader = self.reader.lock().await;
        tokio::select! {
            _ = self.close_signal.notified() => Ok(None),
            frame = read_frame(&mut *reader, self.max_frame_len) => frame,
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // notify_one stores a permit if no recv is waiting yet.
        self.close_signal.notify_one();
        tracing::debug!(id = %self.id, peer = %self.peer, "closing TCP connection");
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
