use log::{info, warn};
use tokio::fs;

use crate::error::{FtpError, FtpResult};
use crate::ftp::{
    Session,
    handlers::file_ops::is_staging_name,
    utils::metadata::{DirectoryEntry, EntryKind, MetadataConverter},
};

/// Figli diretti di `path`: prima le cartelle, poi i file, ciascun gruppo
/// nell'ordine restituito dal filesystem.
pub async fn handle_list(session: &Session, path: &str) -> FtpResult<Vec<DirectoryEntry>> {
    info!("list: {:?} (user {})", path, session.user_id);

    let resolved_path = session.path_resolver.resolve_path(path).await?;

    let metadata = fs::metadata(&resolved_path)
        .await
        .map_err(|e| FtpError::from_io(e, path))?;
    if !metadata.is_dir() {
        return Err(FtpError::BadArgument(format!("'{}' is not a directory", path)));
    }

    let mut read_dir = fs::read_dir(&resolved_path)
        .await
        .map_err(|e| FtpError::from_io(e, path))?;

    let mut folders = Vec::new();
    let mut files = Vec::new();

    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| FtpError::from_io(e, path))?
    {
        let file_name = entry.file_name().to_string_lossy().to_string();
        // Upload non ancora completati
        if is_staging_name(&file_name) {
            continue;
        }
        match entry.metadata().await {
            Ok(metadata) => match MetadataConverter::to_directory_entry(file_name, &metadata) {
                Some(item) if item.kind == EntryKind::Folder => folders.push(item),
                Some(item) => files.push(item),
                None => {}
            },
            // La voce può sparire tra readdir e stat
            Err(e) => warn!("Failed to get metadata for {}: {}", file_name, e),
        }
    }

    folders.append(&mut files);
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        Session::new(1, "alice", dir.path().canonicalize().unwrap())
    }

    #[tokio::test]
    async fn empty_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let entries = handle_list(&session(&dir), "").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn folders_come_before_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("b.bin"), vec![0u8; 2048]).unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();

        let entries = handle_list(&session(&dir), "/").await.unwrap();
        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [EntryKind::Folder, EntryKind::Folder, EntryKind::File, EntryKind::File]
        );

        let b = entries.iter().find(|e| e.name == "b.bin").unwrap();
        assert_eq!(b.size_label, "2 KB");
        assert!(
            entries
                .iter()
                .filter(|e| e.kind == EntryKind::Folder)
                .all(|e| e.size_label.is_empty())
        );
    }

    #[tokio::test]
    async fn lists_only_immediate_children() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/deep")).unwrap();
        std::fs::write(dir.path().join("docs/deep/x.txt"), "x").unwrap();
        std::fs::write(dir.path().join("docs/y.txt"), "y").unwrap();

        let entries = handle_list(&session(&dir), "docs").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["deep", "y.txt"]);
    }

    #[tokio::test]
    async fn pending_upload_files_are_hidden() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(
            dir.path().join(".upload.0123456789abcdef0123456789abcdef.part"),
            "partial",
        )
        .unwrap();

        let entries = handle_list(&session(&dir), "").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.txt"]);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = handle_list(&session(&dir), "nope").await.unwrap_err();
        assert_eq!(err, FtpError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn listing_a_file_is_a_bad_argument() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let err = handle_list(&session(&dir), "a.txt").await.unwrap_err();
        assert!(matches!(err, FtpError::BadArgument(_)));
    }

    #[tokio::test]
    async fn escaping_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = handle_list(&session(&dir), "../../etc").await.unwrap_err();
        assert!(matches!(err, FtpError::PathEscape(_)));
    }
}
