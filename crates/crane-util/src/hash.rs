use std::path::Path;

/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
///
/// Used to fingerprint serialized dependency manifests so the incremental
/// build layer can detect dependency changes without diffing file contents.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Compute the BLAKE3 hash of a file, returning the hex-encoded digest.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn blake3_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(blake3_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_blake3_bytes_known_digest() {
        let hash = blake3_bytes(b"hello world");
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_blake3_file_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        assert_eq!(blake3_file(file.path()).unwrap(), blake3_bytes(b"hello world"));
    }

    #[test]
    fn test_blake3_file_not_found() {
        assert!(blake3_file(Path::new("/nonexistent/file")).is_err());
    }
}
