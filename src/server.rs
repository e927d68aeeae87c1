use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use log::{error, info};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::connection::handle_connection;
use crate::ftp::{ConnectionId, SharedState};

/// Pausa dopo un `accept` fallito, es. file descriptor esauriti.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

pub struct Server {
    pub config: Arc<ServerConfig>,
    shared: SharedState,
    next_connection: AtomicU64,
}

impl Server {
    pub fn new(config: Arc<ServerConfig>, shared: SharedState) -> Self {
        Self {
            config,
            shared,
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub async fn run_on_address<A: ToSocketAddrs>(
        &self,
        addr: A,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.run(listener, shutdown).await
    }

    /// Accetta client finché `shutdown` non scatta, un task per connessione.
    ///
    /// All'arresto il listener viene chiuso, ogni connessione riceve l'ordine
    /// di chiudersi e la funzione ritorna quando tutte hanno terminato.
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        info!("Listening on {}", listener.local_addr()?);

        let connections = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }

                accept_result = listener.accept() => match accept_result {
                    Ok((stream, _)) => {
                        let connection: ConnectionId =
                            self.next_connection.fetch_add(1, Ordering::Relaxed);
                        connections.spawn(handle_connection(
                            stream,
                            connection,
                            self.shared.clone(),
                            self.config.max_message_size,
                            shutdown.child_token(),
                        ));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        connections.close();
        info!("Waiting for {} connection(s) to close", connections.len());
        connections.wait().await;
        Ok(())
    }
}
