use std::path::PathBuf;

use clap::Parser;

use crate::server::DEFAULT_MAX_MESSAGE_SIZE;

/// Configurazione da linea di comando
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Indirizzo IP su cui ascoltare
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Porta su cui ascoltare
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// File JSON con gli utenti; creato con l'utente iniziale se non esiste
    #[arg(short, long)]
    pub users: Option<PathBuf>,

    /// Username dell'utente iniziale
    #[arg(long, default_value = "admin")]
    pub username: String,

    /// Password dell'utente iniziale
    #[arg(long, default_value = "password")]
    pub password: String,

    /// Directory radice dell'utente iniziale
    #[arg(long, default_value = "./ftp_root")]
    pub root_dir: PathBuf,

    /// File su cui registrare i comandi eseguiti dagli utenti
    #[arg(long, default_value = "activity.log")]
    pub activity_log: PathBuf,

    /// Dimensione massima di un messaggio (in bytes)
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,
}
