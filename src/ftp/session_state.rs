use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::error::{FtpError, FtpResult};

use super::protocol::UserId;
use super::utils::path_resolver::PathResolver;

pub type ConnectionId = u64;

/// Ciclo di vita di una connessione client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Authenticated(UserId),
    Closed,
}

/// Identità autenticata legata alla sua directory radice.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub login: String,
    pub path_resolver: PathResolver,
}

impl Session {
    pub fn new(user_id: UserId, login: impl Into<String>, root_dir: PathBuf) -> Self {
        Self {
            user_id,
            login: login.into(),
            path_resolver: PathResolver::new(root_dir),
        }
    }

    pub fn root_dir(&self) -> &PathBuf {
        self.path_resolver.get_root_dir()
    }
}

/// Sessioni di tutte le connessioni attive, indicizzate per connessione.
///
/// Due connessioni autenticate come lo stesso utente hanno due voci distinte.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associa `session` a `connection`, sostituendo un eventuale login precedente.
    pub async fn bind(&self, connection: ConnectionId, session: Session) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        debug!(
            "Binding connection {} to user {} ({})",
            connection, session.user_id, session.login
        );
        sessions.insert(connection, session)
    }

    /// Cerca la sessione di `connection`; la richiesta deve indicare lo stesso utente.
    pub async fn resolve(&self, connection: ConnectionId, user_id: UserId) -> FtpResult<Session> {
        let sessions = self.sessions.lock().await;
        match sessions.get(&connection) {
            Some(session) if session.user_id == user_id => Ok(session.clone()),
            Some(session) => {
                warn!(
                    "Connection {} is logged in as {} but sent id {}",
                    connection, session.user_id, user_id
                );
                Err(FtpError::NotAuthenticated)
            }
            None => Err(FtpError::NotAuthenticated),
        }
    }

    pub async fn release(&self, connection: ConnectionId) -> Option<Session> {
        self.sessions.lock().await.remove(&connection)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
