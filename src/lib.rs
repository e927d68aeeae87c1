//! Servizio di accesso remoto ai file, orientato alle righe.
//!
//! I client inviano una richiesta JSON per riga, si autenticano con `connect`
//! e poi usano `list`, `get` e `set` sotto la propria directory radice.

pub mod activity_log;
pub mod args;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod file_info;
pub mod ftp;
pub mod server;

pub use error::{FtpError, FtpResult};
pub use server::{Server, ServerConfig};
