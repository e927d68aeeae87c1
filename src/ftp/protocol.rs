//! Buste dei messaggi e codec a righe.
//!
//! Ogni messaggio è un singolo oggetto JSON su una riga. `serde_json` non
//! emette mai newline grezzi (dentro le stringhe sono escapati), quindi un
//! valore codificato è sempre un solo frame e i valori annidati (listing di
//! directory, contenuti dei file) viaggiano codificati nella stringa `Data`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{FtpError, FtpResult};
use crate::file_info::TransferredFile;

use super::utils::metadata::DirectoryEntry;

pub type UserId = i64;

/// Valore di `Id` inviato dai client non ancora autenticati.
pub const ANONYMOUS_ID: UserId = -1;

/// Busta da client a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Id")]
    pub id: UserId,
}

impl Request {
    pub fn new(message: impl Into<String>, id: UserId) -> Self {
        Self {
            message: message.into(),
            id,
        }
    }
}

/// Tipo di risposta, nel campo `Command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandTag {
    Authorization,
    List,
    File,
    Success,
    Error,
}

/// Busta da server a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Command")]
    pub command: CommandTag,
    #[serde(rename = "Data")]
    pub data: String,
}

impl Response {
    pub fn new(command: CommandTag, data: impl Into<String>) -> Self {
        Self {
            command,
            data: data.into(),
        }
    }

    pub fn authorization(user_id: UserId) -> Self {
        Self::new(CommandTag::Authorization, user_id.to_string())
    }

    pub fn list(entries: &[DirectoryEntry]) -> FtpResult<Self> {
        Ok(Self::new(CommandTag::List, encode(&entries)?))
    }

    pub fn file(file: &TransferredFile) -> FtpResult<Self> {
        Ok(Self::new(CommandTag::File, encode(file)?))
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(CommandTag::Success, message)
    }

    pub fn error(err: &FtpError) -> Self {
        Self::new(CommandTag::Error, err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.command == CommandTag::Error
    }
}

/// Codifica un valore come una riga JSON, senza terminatore.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> FtpResult<String> {
    serde_json::to_string(value).map_err(|e| FtpError::MalformedMessage(e.to_string()))
}

/// Decodifica una riga in un valore di forma nota.
pub fn decode<T: DeserializeOwned>(line: &str) -> FtpResult<T> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n']))
        .map_err(|e| FtpError::MalformedMessage(e.to_string()))
}
