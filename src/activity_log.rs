//! Registro per utente dei comandi riusciti.
//!
//! La registrazione non blocca mai la richiesta: un errore di scrittura
//! finisce nel log diagnostico e non arriva al client.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::mpsc,
    task::JoinHandle,
};

use crate::ftp::protocol::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user_id: UserId,
    pub command: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn now(user_id: UserId, command: impl Into<String>) -> Self {
        Self {
            user_id,
            command: command.into(),
            timestamp: Utc::now(),
        }
    }
}

pub trait ActivityLog: Send + Sync {
    fn record(&self, entry: LogEntry);
}

/// Accoda le voci come righe JSON da un task in background.
pub struct FileActivityLog {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl FileActivityLog {
    /// Avvia il task di scrittura, che termina quando tutti gli handle
    /// `FileActivityLog` sono rilasciati.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_entries(path, rx));
        (Self { tx }, handle)
    }
}

impl ActivityLog for FileActivityLog {
    fn record(&self, entry: LogEntry) {
        if let Err(e) = self.tx.send(entry) {
            warn!("Activity log writer is gone, dropping entry: {:?}", e.0);
        }
    }
}

async fn write_entries(path: PathBuf, mut rx: mpsc::UnboundedReceiver<LogEntry>) {
    let mut file: Option<File> = None;

    while let Some(entry) = rx.recv().await {
        if file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&path).await {
                Ok(f) => file = Some(f),
                Err(e) => {
                    warn!("Failed to open activity log {:?}: {}", path, e);
                    continue;
                }
            }
        }

        let mut line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode activity log entry: {}", e);
                continue;
            }
        };
        line.push('\n');

        if let Some(f) = file.as_mut() {
            let written = match f.write_all(line.as_bytes()).await {
                Ok(()) => f.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                warn!("Failed to append to activity log {:?}: {}", path, e);
                // Riapre il file alla prossima voce
                file = None;
            } else {
                debug!("Activity: user {} {}", entry.user_id, entry.command);
            }
        }
    }
}

/// Tiene le voci in memoria.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, entry: LogEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_log_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activity.log");

        let (log, writer) = FileActivityLog::spawn(path.clone());
        log.record(LogEntry::now(1, "list"));
        log.record(LogEntry::now(1, "get a.txt"));
        drop(log);
        writer.await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<LogEntry> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].command, "get a.txt");
    }

    #[tokio::test]
    async fn unwritable_log_is_swallowed() {
        let dir = TempDir::new().unwrap();
        // Una directory non si può aprire in append
        let (log, writer) = FileActivityLog::spawn(dir.path().to_path_buf());
        log.record(LogEntry::now(1, "list"));
        drop(log);
        writer.await.unwrap();
    }

    #[test]
    fn memory_log_keeps_order() {
        let log = MemoryActivityLog::new();
        log.record(LogEntry::now(1, "connect"));
        log.record(LogEntry::now(1, "list"));
        let commands: Vec<_> = log.entries().into_iter().map(|e| e.command).collect();
        assert_eq!(commands, ["connect", "list"]);
    }
}
