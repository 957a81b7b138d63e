//! In-memory ZIP reading

use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read ZIP archive: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),

    #[error("failed to read ZIP entry {name}: {source}")]
    EntryRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsafe ZIP entry name '{0}'")]
    UnsafeEntryName(String),
}

/// One file of the archive, fully decompressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the archive root, `/`-separated
    pub name: String,
    pub data: Vec<u8>,
}

/// Decompress every file entry of `bytes`.
///
/// Directory entries are skipped. Entries keep archive order and duplicate
/// names are returned as-is. A name with an empty, `.` or `..` segment fails
/// the whole archive.
pub fn extract_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        if !is_safe_name(&name) {
            return Err(ArchiveError::UnsafeEntryName(name));
        }

        // Declared size is untrusted, never reserve more than the blob itself
        let mut data = Vec::with_capacity(file.size().min(bytes.len() as u64) as usize);
        file.read_to_end(&mut data)
            .map_err(|source| ArchiveError::EntryRead {
                name: name.clone(),
                source,
            })?;

        entries.push(ArchiveEntry { name, data });
    }

    debug!(entries = entries.len(), "archive extracted");
    Ok(entries)
}

/// Every `/`-separated segment must be a plain name
fn is_safe_name(name: &str) -> bool {
    name.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    /// Build a ZIP in memory from `(name, contents)` pairs
    pub(crate) fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_entries() {
        let zip = build_zip(&[
            ("test-artifact1.txt", b"test artifact 1"),
            ("nested/test-artifact2.txt", b"test artifact 2"),
        ]);

        let entries = extract_entries(&zip).unwrap();
        assert_eq!(
            entries,
            vec![
                ArchiveEntry {
                    name: "test-artifact1.txt".to_string(),
                    data: b"test artifact 1".to_vec(),
                },
                ArchiveEntry {
                    name: "nested/test-artifact2.txt".to_string(),
                    data: b"test artifact 2".to_vec(),
                },
            ]
        );
    }

    #[test]
    fn test_skips_directories() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.add_directory("reports/", FileOptions::default()).unwrap();
        writer.start_file("reports/a.txt", FileOptions::default()).unwrap();
        writer.write_all(b"a").unwrap();
        let zip = writer.finish().unwrap().into_inner();

        let entries = extract_entries(&zip).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "reports/a.txt");
    }

    #[test]
    fn test_empty_archive() {
        let zip = build_zip(&[]);
        assert!(extract_entries(&zip).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_bytes() {
        let err = extract_entries(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidArchive(_)));
    }

    #[test]
    fn test_oversized_declared_size_is_not_preallocated() {
        let mut zip = build_zip(&[("a.txt", b"a")]);

        // Central directory header: uncompressed size lives 24 bytes in
        let header = zip
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        zip[header + 24..header + 28].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

        let entries = extract_entries(&zip).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, b"a".to_vec());
    }

    #[test]
    fn test_rejects_unsafe_entry_names() {
        for name in ["../a.txt", "reports/../../a.txt", "/abs.txt", "a//b.txt", "./a.txt"] {
            let zip = build_zip(&[(name, b"x")]);
            let err = extract_entries(&zip).unwrap_err();
            assert!(
                matches!(&err, ArchiveError::UnsafeEntryName(n) if n == name),
                "name: {}",
                name
            );
        }
    }

    #[test]
    fn test_dotted_file_names_are_allowed() {
        let zip = build_zip(&[(".hidden", b"h"), ("a..b.txt", b"ab")]);
        let entries = extract_entries(&zip).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
