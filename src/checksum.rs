use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Computes the hex SHA-256 digest of a file on the local filesystem.
///
/// A standalone helper: callers use it to verify content they extracted
/// from a container, but the filesystem core neither stores nor validates
/// digests.
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();

    let mut buf = [0; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }

        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_known_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        let digest = file_sha256(file.path()).unwrap();
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_empty_file_digest() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let digest = file_sha256(file.path()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(file_sha256(Path::new("/nonexistent/nowhere")).is_err());
    }
}
