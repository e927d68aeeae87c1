use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use log::info;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::fs;

use crate::error::{FtpError, FtpResult};

/// Un file completo in transito, usato da `get` e `set`.
///
/// Serializzato come `{"Name": "...", "Data": "<base64>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferredFile {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Data", with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl TransferredFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Legge in memoria l'intero file in `path`.
    pub async fn read_from(path: &Path, display: &str) -> FtpResult<Self> {
        let bytes = fs::read(path)
            .await
            .map_err(|e| FtpError::from_io(e, display))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| display.to_string());

        info!("Read file: {:?} ({} bytes)", path, bytes.len());

        Ok(Self { name, bytes })
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
