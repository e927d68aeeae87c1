use std::path::{Component, Path, PathBuf};

use log::warn;
use tokio::fs;

use crate::error::{FtpError, FtpResult};

/// Traduce i percorsi virtuali del client in percorsi sotto la radice della sessione.
///
/// `root_dir` deve essere già canonico.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root_dir: PathBuf,
}

impl PathResolver {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    /// Normalizza lessicalmente un percorso virtuale in un percorso relativo.
    ///
    /// Sia `/` che `\` separano i segmenti; un separatore iniziale indica la
    /// radice della sessione. Salire sopra la radice viene rifiutato qui,
    /// prima di qualsiasi accesso al filesystem.
    pub fn normalize(path: &str) -> FtpResult<PathBuf> {
        let mut normalized = PathBuf::new();

        for segment in path.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => {
                    if !normalized.pop() {
                        warn!("Attempt to climb above the root directory: {:?}", path);
                        return Err(FtpError::PathEscape(path.to_string()));
                    }
                }
                name => {
                    let mut components = Path::new(name).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(part)), None) => normalized.push(part),
                        _ => {
                            warn!("Rejected path segment {:?} in {:?}", name, path);
                            return Err(FtpError::PathEscape(path.to_string()));
                        }
                    }
                }
            }
        }

        Ok(normalized)
    }

    pub async fn resolve_path(&self, path: &str) -> FtpResult<PathBuf> {
        let resolved = self.root_dir.join(Self::normalize(path)?);

        // Controllo di sicurezza: l'antenato esistente più profondo deve restare
        // dentro root_dir dopo aver seguito i symlink
        let mut probe = resolved.as_path();
        loop {
            match fs::canonicalize(probe).await {
                Ok(canonical) => {
                    if canonical.starts_with(&self.root_dir) {
                        return Ok(resolved);
                    }
                    warn!("Access outside the root directory: {:?}", canonical);
                    return Err(FtpError::PathEscape(path.to_string()));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if probe == self.root_dir.as_path() {
                        return Err(FtpError::NotFound(path.to_string()));
                    }
                    match probe.parent() {
                        Some(parent) => probe = parent,
                        None => return Err(FtpError::NotFound(path.to_string())),
                    }
                }
                Err(e) => return Err(FtpError::from_io(e, path)),
            }
        }
    }

    pub fn get_root_dir(&self) -> &PathBuf {
        &self.root_dir
    }
}
