//! `JackroomServer` builder and accept loop.
//!
//! This is the entry point for running a Jackroom server. It ties
//! together all the layers: transport → protocol → session → room.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jackroom_protocol::ProstCodec;
use jackroom_room::RoomRegistry;
use jackroom_session::{ClientRegistry, MessageSender};
use jackroom_store::GameStore;
use jackroom_transport::{TcpConnection, TcpTransport, Transport};

use crate::handler::handle_connection;
use crate::{JackroomError, ServerConfig};

/// The room registry a TCP server runs on.
pub type TcpRooms<S> = RoomRegistry<TcpConnection, ProstCodec, S>;

/// Builder for configuring and starting a Jackroom server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use jackroom::prelude::*;
///
/// # async fn run() -> Result<(), JackroomError> {
/// let server = JackroomServerBuilder::new()
///     .bind("0.0.0.0:4000")
///     .reset_period(Duration::from_secs(60))
///     .build(MemoryStore::load("seed.json")?)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct JackroomServerBuilder {
    config: ServerConfig,
}

impl JackroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the time between periodic room resets, rounded down to whole
    /// seconds.
    pub fn reset_period(mut self, period: Duration) -> Self {
        self.config.reset_period_secs = period.as_secs();
        self
    }

    /// Binds the listener, loads every room from `store`, and starts the
    /// room timers.
    pub async fn build<S: GameStore>(self, store: S) -> Result<JackroomServer<S>, JackroomError> {
        let config = self.config;
        let transport = TcpTransport::bind(&config.bind_addr)
            .await?
            .with_max_frame_len(config.max_frame_len);

        let clients = Arc::new(ClientRegistry::new());
        let sender = Arc::new(MessageSender::new(Arc::clone(&clients), ProstCodec));
        let rooms = RoomRegistry::new(
            clients,
            sender,
            Arc::new(store),
            config.rules.clone(),
            config.timer_config(),
        );
        let loaded = rooms.initialize_rooms().await?;
        if loaded == 0 {
            tracing::warn!("no rooms configured, every join will fail");
        }

        Ok(JackroomServer { transport, rooms })
    }
}

impl Default for JackroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Jackroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct JackroomServer<S: GameStore> {
    transport: TcpTransport,
    rooms: Arc<TcpRooms<S>>,
}

impl<S: GameStore> JackroomServer<S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The live room registry, shared with every connection task.
    pub fn rooms(&self) -> &Arc<TcpRooms<S>> {
        &self.rooms
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), JackroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Jackroom server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let rooms = Arc::clone(&self.rooms);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(Arc::new(conn), rooms).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
