use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// Una voce della risposta a `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: EntryKind,
    #[serde(rename = "Size")]
    pub size_label: String,
    #[serde(rename = "LastModified")]
    pub last_modified: DateTime<Utc>,
}

pub struct MetadataConverter;

impl MetadataConverter {
    /// Crea una voce del listing, oppure `None` per ciò che non è né un file
    /// regolare né una directory (symlink, socket, dispositivi).
    pub fn to_directory_entry(
        name: String,
        metadata: &std::fs::Metadata,
    ) -> Option<DirectoryEntry> {
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();

        let (kind, size_label) = if metadata.is_dir() {
            (EntryKind::Folder, String::new())
        } else if metadata.is_file() {
            (EntryKind::File, Self::format_size(metadata.len()))
        } else {
            return None;
        };

        Some(DirectoryEntry {
            name,
            kind,
            size_label,
            last_modified,
        })
    }

    /// Dimensione leggibile in multipli di 1024, es. `512 B`, `1.5 KB`.
    pub fn format_size(len: u64) -> String {
        let mut value = len as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }

        let rounded = format!("{:.2}", value);
        let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
        format!("{} {}", trimmed, SIZE_UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn format_size_ladder() {
        assert_eq!(MetadataConverter::format_size(0), "0 B");
        assert_eq!(MetadataConverter::format_size(512), "512 B");
        assert_eq!(MetadataConverter::format_size(1023), "1023 B");
        assert_eq!(MetadataConverter::format_size(1024), "1 KB");
        assert_eq!(MetadataConverter::format_size(1536), "1.5 KB");
        assert_eq!(MetadataConverter::format_size(2_359_296), "2.25 MB");
        assert_eq!(MetadataConverter::format_size(1024 * 1024 * 1024), "1 GB");
    }

    #[test]
    fn format_size_stays_in_gb_past_the_ladder() {
        assert_eq!(
            MetadataConverter::format_size(2048 * 1024 * 1024 * 1024),
            "2048 GB"
        );
    }

    #[test]
    fn format_size_rounds_to_two_decimals() {
        // 1234 / 1024 = 1.2050...
        assert_eq!(MetadataConverter::format_size(1234), "1.21 KB");
    }

    #[test]
    fn folder_entry_has_empty_size() {
        let dir = TempDir::new().unwrap();
        let metadata = std::fs::metadata(dir.path()).unwrap();
        let entry = MetadataConverter::to_directory_entry("sub".into(), &metadata).unwrap();
        assert_eq!(entry.kind, EntryKind::Folder);
        assert_eq!(entry.size_label, "");
    }

    #[test]
    fn entry_serializes_with_wire_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        let entry = MetadataConverter::to_directory_entry("a.txt".into(), &metadata).unwrap();

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["Name"], "a.txt");
        assert_eq!(value["Type"], "file");
        assert_eq!(value["Size"], "5 B");
        assert!(value["LastModified"].is_string());
    }
}
