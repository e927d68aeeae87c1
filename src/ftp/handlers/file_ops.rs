use std::path::Path;

use log::{error, info, warn};
use tokio::fs;

use crate::error::{FtpError, FtpResult};
use crate::file_info::TransferredFile;
use crate::ftp::Session;

const STAGING_PREFIX: &str = ".upload.";
const STAGING_SUFFIX: &str = ".part";

/// Nome temporaneo usato da `set`: lunghezza fissa, indipendente dal nome caricato.
fn staging_name() -> String {
    format!(
        "{}{}{}",
        STAGING_PREFIX,
        uuid::Uuid::new_v4().simple(),
        STAGING_SUFFIX
    )
}

/// Riconosce i file temporanei lasciati da un `set` in corso o interrotto.
pub fn is_staging_name(name: &str) -> bool {
    name.strip_prefix(STAGING_PREFIX)
        .and_then(|rest| rest.strip_suffix(STAGING_SUFFIX))
        .is_some_and(|id| id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()))
}

pub async fn handle_get(session: &Session, path: &str) -> FtpResult<TransferredFile> {
    info!("get: {:?} (user {})", path, session.user_id);

    let resolved_path = session.path_resolver.resolve_path(path).await?;

    let metadata = fs::metadata(&resolved_path)
        .await
        .map_err(|e| FtpError::from_io(e, path))?;
    if !metadata.is_file() {
        warn!("Path is not a regular file: {:?}", resolved_path);
        return Err(FtpError::BadArgument(format!("'{}' is not a file", path)));
    }

    TransferredFile::read_from(&resolved_path, path).await
}

/// Salva `file` dentro `target_dir`, creando la directory se necessario.
///
/// I byte vengono scritti prima in un file temporaneo nella stessa directory
/// e poi rinominati sulla destinazione: lettori e scrittori concorrenti vedono
/// sempre un contenuto completo. Un file esistente con lo stesso nome viene
/// sostituito.
pub async fn handle_set(
    session: &Session,
    target_dir: &str,
    file: &TransferredFile,
) -> FtpResult<String> {
    info!(
        "set: {:?} into {:?}, data len: {} (user {})",
        file.name,
        target_dir,
        file.bytes.len(),
        session.user_id
    );

    validate_file_name(&file.name)?;

    let dir_path = session.path_resolver.resolve_path(target_dir).await?;
    fs::create_dir_all(&dir_path)
        .await
        .map_err(|e| FtpError::from_write(e, target_dir))?;

    let destination = dir_path.join(&file.name);
    let staging = dir_path.join(staging_name());

    if let Err(e) = write_then_rename(&staging, &destination, &file.bytes).await {
        error!("Failed to store {:?}: {}", destination, e);
        if let Err(cleanup) = fs::remove_file(&staging).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove staging file {:?}: {}", staging, cleanup);
            }
        }
        return Err(FtpError::from_write(e, &file.name));
    }

    info!(
        "Successfully wrote {} bytes to {:?}",
        file.bytes.len(),
        destination
    );

    Ok(format!("File '{}' uploaded successfully", file.name))
}

async fn write_then_rename(
    staging: &Path,
    destination: &Path,
    bytes: &[u8],
) -> std::io::Result<()> {
    fs::write(staging, bytes).await?;
    fs::rename(staging, destination).await
}

/// Il nome di un file deve essere un solo componente di percorso.
fn validate_file_name(name: &str) -> FtpResult<()> {
    if name.is_empty() || name == "." {
        return Err(FtpError::BadArgument("file name is empty".to_string()));
    }
    if name.split(['/', '\\']).any(|segment| segment == "..") {
        warn!("Upload name tries to leave its directory: {:?}", name);
        return Err(FtpError::PathEscape(name.to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(FtpError::BadArgument(format!(
            "file name '{}' must not contain path separators",
            name
        )));
    }
    Ok(())
}
