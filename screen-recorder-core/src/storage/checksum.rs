use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let read_error = |e: io::Error| RecorderError::StorageError(format!("failed to read file for checksum: {}", e));
    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_error)?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn digest_of_known_content() {
        let path = std::env::temp_dir().join("screen_recorder_test_checksum.bin");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        fs::remove_file(&path).ok();
    }

    #[test]
    fn streamed_digest_matches_in_memory_digest() {
        let path = std::env::temp_dir().join(format!("screen_recorder_checksum_{}.bin", uuid::Uuid::new_v4()));
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();
        assert_eq!(sha256_file(&path).unwrap(), hex_encode(&Sha256::digest(&data)));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_storage_error() {
        let err = sha256_file(Path::new("/nonexistent/screen_recorder.bin")).unwrap_err();
        assert!(matches!(err, RecorderError::StorageError(_)));
    }
}
