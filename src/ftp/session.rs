use std::sync::Arc;

use log::{info, warn};
use tokio::fs;

use crate::{
    activity_log::{ActivityLog, LogEntry},
    credentials::CredentialStore,
    error::{FtpError, FtpResult},
    file_info::TransferredFile,
};

use super::{
    ConnectionId, ConnectionState, Session, SessionRegistry,
    handlers::{dir_ops, file_ops},
    protocol::{Request, Response, UserId, decode},
};

/// Separa la directory di destinazione dal contenuto del file in `set`.
pub const SET_DIR_DELIMITER: &str = "|||";

/// Stato condiviso da tutte le connessioni di un server.
#[derive(Clone)]
pub struct SharedState {
    pub sessions: Arc<SessionRegistry>,
    pub users: Arc<dyn CredentialStore>,
    pub activity: Arc<dyn ActivityLog>,
}

impl SharedState {
    pub fn new(users: Arc<dyn CredentialStore>, activity: Arc<dyn ActivityLog>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            users,
            activity,
        }
    }
}

/// Smistamento dei comandi di una singola connessione.
pub struct FtpSession {
    connection: ConnectionId,
    peer: String,
    state: ConnectionState,
    shared: SharedState,
}

impl FtpSession {
    pub fn new(connection: ConnectionId, peer: impl Into<String>, shared: SharedState) -> Self {
        Self {
            connection,
            peer: peer.into(),
            state: ConnectionState::Unauthenticated,
            shared,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Decodifica una riga di richiesta e risponde. Non fallisce mai: ogni
    /// errore diventa una risposta `error`.
    pub async fn handle_line(&mut self, line: &str) -> Response {
        match decode::<Request>(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!("Connection {}: {}", self.connection, e);
                Response::error(&e)
            }
        }
    }

    pub async fn dispatch(&mut self, request: Request) -> Response {
        match self.execute(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Connection {}: command failed: {}", self.connection, e);
                Response::error(&e)
            }
        }
    }

    /// Dimentica il login associato a questa connessione.
    pub async fn close(&mut self) {
        if let ConnectionState::Authenticated(user_id) = self.state {
            self.shared.sessions.release(self.connection).await;
            info!(
                "Connection {} closed, released session of user {}",
                self.connection, user_id
            );
        }
        self.state = ConnectionState::Closed;
    }

    async fn execute(&mut self, request: &Request) -> FtpResult<Response> {
        let (verb, argument) = split_command(&request.message);
        info!("Connection {}: processing command {:?}", self.connection, verb);

        match verb.as_str() {
            "connect" => self.connect(argument).await,
            "list" => self.list(request.id, argument).await,
            "get" => self.get(request.id, argument).await,
            "set" => self.set(request.id, argument).await,
            _ => Err(FtpError::UnknownCommand(verb)),
        }
    }

    async fn connect(&mut self, argument: &str) -> FtpResult<Response> {
        let (login, password) = match argument.split(' ').collect::<Vec<_>>()[..] {
            [login, password] if !login.is_empty() && !password.is_empty() => (login, password),
            _ => {
                return Err(FtpError::BadArgument(
                    "expected: connect <login> <password>".to_string(),
                ));
            }
        };

        let Some(credential) = self.shared.users.verify(login, password) else {
            warn!(
                "Connection {}: failed login attempt for {:?}",
                self.connection, login
            );
            return Err(FtpError::InvalidCredentials);
        };

        let root = credential.root.to_string_lossy().to_string();
        fs::create_dir_all(&credential.root)
            .await
            .map_err(|e| FtpError::from_io(e, &root))?;
        let root_dir = fs::canonicalize(&credential.root)
            .await
            .map_err(|e| FtpError::from_io(e, &root))?;

        let session = Session::new(credential.id, &credential.login, root_dir);
        self.shared.sessions.bind(self.connection, session).await;
        self.state = ConnectionState::Authenticated(credential.id);

        info!(
            "Connection {}: authenticated as {} (user {})",
            self.connection, credential.login, credential.id
        );
        self.record(credential.id, format!("connect from {}", self.peer));

        Ok(Response::authorization(credential.id))
    }

    async fn list(&self, id: UserId, path: &str) -> FtpResult<Response> {
        let session = self.authorized(id).await?;
        let entries = dir_ops::handle_list(&session, path).await?;
        let command = if path.is_empty() {
            "list".to_string()
        } else {
            format!("list {}", path)
        };
        self.record(session.user_id, command);
        Response::list(&entries)
    }

    async fn get(&self, id: UserId, path: &str) -> FtpResult<Response> {
        let session = self.authorized(id).await?;
        if path.is_empty() {
            return Err(FtpError::BadArgument("expected: get <path>".to_string()));
        }
        let file = file_ops::handle_get(&session, path).await?;
        self.record(session.user_id, format!("get {}", path));
        Response::file(&file)
    }

    async fn set(&self, id: UserId, argument: &str) -> FtpResult<Response> {
        let session = self.authorized(id).await?;
        let (target_dir, file) = parse_set_argument(argument)?;
        let message = file_ops::handle_set(&session, target_dir, &file).await?;

        let stored = if target_dir.is_empty() {
            file.name.clone()
        } else {
            format!("{}/{}", target_dir.trim_end_matches(['/', '\\']), file.name)
        };
        self.record(session.user_id, format!("set {}", stored));

        Ok(Response::success(message))
    }

    async fn authorized(&self, id: UserId) -> FtpResult<Session> {
        self.shared.sessions.resolve(self.connection, id).await
    }

    fn record(&self, user_id: UserId, command: String) {
        self.shared.activity.record(LogEntry::now(user_id, command));
    }
}

/// Separa il messaggio nel verbo (minuscolo) e nel resto invariato.
pub fn split_command(message: &str) -> (String, &str) {
    match message.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_lowercase(), rest),
        None => (message.to_lowercase(), ""),
    }
}

/// Interpreta `[<dir>|||]<TransferredFile JSON>`.
///
/// Il delimitatore ha la precedenza; se la parte dopo non è un file valido
/// si riprova con l'intero argomento, che può contenere `|||` nel JSON.
pub fn parse_set_argument(argument: &str) -> FtpResult<(&str, TransferredFile)> {
    let bare_payload = argument.trim_start().starts_with('{');

    match argument.split_once(SET_DIR_DELIMITER) {
        Some((target_dir, payload)) => match decode(payload) {
            Ok(file) => return Ok((target_dir, file)),
            Err(e) if !bare_payload => return Err(e),
            Err(_) => {}
        },
        None if !bare_payload => {
            return Err(FtpError::BadArgument(format!(
                "expected: set [<dir>{}]<file>",
                SET_DIR_DELIMITER
            )));
        }
        None => {}
    }

    Ok(("", decode(argument)?))
}
