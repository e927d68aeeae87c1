use std::sync::Arc;

use clap::Parser;
use log::{LevelFilter, error, info, warn};
use rustedbytes_ftp::{
    Server, ServerConfig,
    activity_log::FileActivityLog,
    args::Args,
    credentials::UserStore,
    ftp::SharedState,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .init();

    // Parsing degli argomenti da linea di comando
    let args = Args::parse();

    let users = match open_user_store(&args).await {
        Ok(users) => users,
        Err(e) => {
            error!("Failed to open user store: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Activity log: {:?}", args.activity_log);
    info!("Max message size: {} bytes", args.max_message_size);

    let (activity, activity_writer) = FileActivityLog::spawn(args.activity_log.clone());
    let shared = SharedState::new(Arc::new(users), Arc::new(activity));

    let server = Server::new(
        Arc::new(ServerConfig {
            max_message_size: args.max_message_size,
        }),
        shared,
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        });
    }

    info!("Starting server on {}:{}", args.host, args.port);
    server
        .run_on_address((args.host.as_str(), args.port), shutdown)
        .await?;

    // Chiude il canale del log attività e attende la scrittura delle ultime voci
    drop(server);
    if let Err(e) = activity_writer.await {
        warn!("Activity log writer ended abnormally: {}", e);
    }

    Ok(())
}

/// Carica gli utenti, oppure crea l'utente iniziale al primo avvio.
async fn open_user_store(args: &Args) -> anyhow::Result<UserStore> {
    if let Some(path) = &args.users {
        if path.exists() {
            return UserStore::load(path).await;
        }
    }

    // Crea la directory radice dell'utente iniziale se non esiste
    tokio::fs::create_dir_all(&args.root_dir).await?;
    let root_dir = tokio::fs::canonicalize(&args.root_dir).await?;
    info!("Seeding user '{}' rooted at {:?}", args.username, root_dir);

    let store = UserStore::seeded(&args.username, &args.password, root_dir)?;

    if let Some(path) = &args.users {
        store.save(path).await?;
        info!("User store written to {:?}", path);
    }

    Ok(store)
}
