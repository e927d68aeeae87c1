//! Account utente: login, hash salato della password e directory radice.

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::fs;

use crate::error::{FtpError, FtpResult};
use crate::ftp::protocol::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: UserId,
    pub login: String,
    pub salt: String,
    pub password_hash: String,
    pub root: PathBuf,
}

impl Credential {
    fn matches(&self, password: &str) -> bool {
        let candidate = hash_password(&self.salt, password);
        candidate
            .as_bytes()
            .ct_eq(self.password_hash.as_bytes())
            .into()
    }
}

/// Ricerca delle identità per login e password.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, login: &str, password: &str) -> Option<Credential>;
}

/// Elenco utenti salvato in JSON.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UserStore {
    users: Vec<Credential>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archivio con un solo account, usato al primo avvio.
    pub fn seeded(login: &str, password: &str, root: PathBuf) -> FtpResult<Self> {
        let mut store = Self::new();
        store.add_user(login, password, root)?;
        Ok(store)
    }

    pub fn add_user(&mut self, login: &str, password: &str, root: PathBuf) -> FtpResult<UserId> {
        validate_token("login", login)?;
        validate_token("password", password)?;

        if self.users.iter().any(|u| u.login == login) {
            return Err(FtpError::BadArgument(format!(
                "user '{}' already exists",
                login
            )));
        }

        let id = self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(&salt, password);

        self.users.push(Credential {
            id,
            login: login.to_string(),
            salt,
            password_hash,
            root,
        });

        Ok(id)
    }

    pub fn users(&self) -> &[Credential] {
        &self.users
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading user store {:?}", path))?;
        let store: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing user store {:?}", path))?;
        info!("Loaded {} user(s) from {:?}", store.users.len(), path);
        Ok(store)
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)
            .await
            .with_context(|| format!("writing user store {:?}", path))?;
        Ok(())
    }
}

impl CredentialStore for UserStore {
    fn verify(&self, login: &str, password: &str) -> Option<Credential> {
        self.users
            .iter()
            .find(|u| u.login == login && u.matches(password))
            .cloned()
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// `connect` divide l'argomento sugli spazi: nessuno dei due valori può contenerne
fn validate_token(what: &str, value: &str) -> FtpResult<()> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(FtpError::BadArgument(format!(
            "{} must be non-empty and contain no whitespace",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn verify_accepts_matching_password() {
        let mut store = UserStore::new();
        let id = store.add_user("alice", "pw1", PathBuf::from("/srv/alice")).unwrap();
        assert_eq!(id, 1);

        let credential = store.verify("alice", "pw1").unwrap();
        assert_eq!(credential.id, 1);
        assert_eq!(credential.root, PathBuf::from("/srv/alice"));
    }

    #[test]
    fn verify_rejects_wrong_password_or_login() {
        let store = UserStore::seeded("alice", "pw1", PathBuf::from("/srv/alice")).unwrap();
        assert!(store.verify("alice", "pw2").is_none());
        assert!(store.verify("bob", "pw1").is_none());
    }

    #[test]
    fn password_is_not_stored_in_plaintext() {
        let store = UserStore::seeded("alice", "pw1", PathBuf::from("/srv/alice")).unwrap();
        let credential = &store.users()[0];
        assert_ne!(credential.password_hash, "pw1");
        assert_eq!(credential.password_hash.len(), 64);
    }

    #[test]
    fn same_password_gets_different_salts() {
        let mut store = UserStore::new();
        store.add_user("alice", "pw", PathBuf::from("/a")).unwrap();
        store.add_user("bob", "pw", PathBuf::from("/b")).unwrap();
        assert_ne!(store.users()[0].password_hash, store.users()[1].password_hash);
    }

    #[test]
    fn ids_are_sequential() {
        let mut store = UserStore::new();
        assert_eq!(store.add_user("a", "x", PathBuf::from("/a")).unwrap(), 1);
        assert_eq!(store.add_user("b", "x", PathBuf::from("/b")).unwrap(), 2);
    }

    #[test]
    fn duplicate_login_is_rejected() {
        let mut store = UserStore::seeded("alice", "pw1", PathBuf::from("/a")).unwrap();
        let err = store.add_user("alice", "pw2", PathBuf::from("/b")).unwrap_err();
        assert!(matches!(err, FtpError::BadArgument(_)));
    }

    #[test]
    fn whitespace_in_login_is_rejected() {
        let mut store = UserStore::new();
        assert!(store.add_user("al ice", "pw", PathBuf::from("/a")).is_err());
        assert!(store.add_user("alice", "", PathBuf::from("/a")).is_err());
    }

    #[tokio::test]
    async fn save_and_load_preserve_accounts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let store = UserStore::seeded("alice", "pw1", PathBuf::from("/srv/alice")).unwrap();
        store.save(&path).await.unwrap();

        let loaded = UserStore::load(&path).await.unwrap();
        assert_eq!(loaded.users(), store.users());
        assert!(loaded.verify("alice", "pw1").is_some());
    }
}
