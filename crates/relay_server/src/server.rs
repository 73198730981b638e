//! The listener loop: turns accepted sockets into running sessions.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::relay::Relay;
use crate::stats::StatsSink;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

/// The relay server: a registry plus the accept loop that feeds it.
pub struct RelayServer {
    config: RelayConfig,
    relay: Arc<Relay>,
}

impl RelayServer {
    /// Creates a server with the given configuration and statistics sink.
    pub fn new(config: RelayConfig, stats: Arc<dyn StatsSink>) -> Self {
        let relay = Relay::new(config.quiet_mode, stats);
        Self { config, relay }
    }

    /// The registry backing this server, shared with the operator console.
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Binds the configured address and serves until the process exits.
    pub async fn run(&self) -> Result<(), RelayError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| {
                RelayError::Network(format!(
                    "failed to bind {}: {e}",
                    self.config.bind_address
                ))
            })?;

        info!("🚀 Relay server started on {}", self.config.bind_address);
        info!("Quiet mode: {}", self.relay.quiet_mode());
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener.
    ///
    /// Accept errors are transient: they are logged and the loop keeps
    /// serving.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RelayError> {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => self.accept_connection(stream, peer_addr).await,
                Err(e) => warn!("connection failed: {e}"),
            }
        }
    }

    /// Wraps one accepted socket in a session and spawns its tasks.
    async fn accept_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let stats = self.relay.stats();
        stats.record_connect();
        stats.record_origin(&origin_fingerprint(&peer_addr));

        let (reader, writer) = stream.into_split();
        let session = self
            .relay
            .register_session(
                writer,
                peer_addr,
                self.config.heartbeat_interval,
                self.config.read_poll_interval,
            )
            .await;

        tokio::spawn(session.clone().read_loop(reader));
        tokio::spawn(session.heartbeat_loop());
    }
}

/// Non-reversible fingerprint of a peer's network origin: the hex-encoded
/// SHA-256 digest of the remote IP address, without the port.
pub fn origin_fingerprint(peer_addr: &SocketAddr) -> String {
    hex::encode(Sha256::digest(peer_addr.ip().to_string().as_bytes()))
}
