#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Archive digests for formula
//!
//! Formulas pin every archive to a SHA-256 or BLAKE3 digest. This crate
//! computes those digests in streaming fashion and parses the hex form
//! written in formula files.

use formula_errors::Error;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Both supported algorithms produce 32-byte digests
const DIGEST_LEN: usize = 32;

/// Digest algorithm named by a formula checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(Error::internal(format!(
                "unknown digest algorithm '{other}'"
            ))),
        }
    }
}

enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> [u8; DIGEST_LEN] {
        match self {
            Self::Sha256(h) => h.finalize().into(),
            Self::Blake3(h) => *h.finalize().as_bytes(),
        }
    }
}

/// A digest value tagged with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    bytes: [u8; DIGEST_LEN],
}

impl Digest {
    #[must_use]
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: [u8; DIGEST_LEN]) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Lowercase hex form
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from hex string. Upper and lower case are both accepted.
    ///
    /// # Errors
    /// Returns an error if the input is not valid hexadecimal or does not
    /// decode to exactly 32 bytes.
    pub fn from_hex(algorithm: DigestAlgorithm, s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::internal(format!("invalid {algorithm} hex: {e}")))?;

        if bytes.len() != DIGEST_LEN {
            return Err(Error::internal(format!(
                "{algorithm} digest must be {DIGEST_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut array = [0u8; DIGEST_LEN];
        array.copy_from_slice(&bytes);
        Ok(Self::from_bytes(algorithm, array))
    }

    /// Compute the digest of a byte slice
    #[must_use]
    pub fn from_data(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let mut hasher = Hasher::new(algorithm);
        hasher.update(data);
        Self::from_bytes(algorithm, hasher.finalize())
    }

    /// Compute the digest of a file without loading it into memory
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub async fn hash_file(algorithm: DigestAlgorithm, path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;

        let mut hasher = Hasher::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self::from_bytes(algorithm, hasher.finalize()))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Serialized as `{ "<algorithm>": "<hex>" }`, the same shape formula files use
impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.algorithm.as_str(), &self.to_hex())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const HELLO_BLAKE3: &str = "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24";

    #[test]
    fn test_known_digests() {
        let sha = Digest::from_data(DigestAlgorithm::Sha256, b"hello world");
        assert_eq!(sha.to_hex(), HELLO_SHA256);

        let b3 = Digest::from_data(DigestAlgorithm::Blake3, b"hello world");
        assert_eq!(b3.to_hex(), HELLO_BLAKE3);
    }

    #[test]
    fn test_from_hex_case_insensitive() {
        let lower = Digest::from_hex(DigestAlgorithm::Sha256, HELLO_SHA256).unwrap();
        let upper =
            Digest::from_hex(DigestAlgorithm::Sha256, &HELLO_SHA256.to_uppercase()).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_hex(), HELLO_SHA256);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Digest::from_hex(DigestAlgorithm::Sha256, "").is_err());
        assert!(Digest::from_hex(DigestAlgorithm::Sha256, "zz").is_err());
        assert!(Digest::from_hex(DigestAlgorithm::Blake3, "abcd").is_err());
    }

    #[test]
    fn test_same_bytes_different_algorithm_not_equal() {
        let a = Digest::from_bytes(DigestAlgorithm::Sha256, [7; 32]);
        let b = Digest::from_bytes(DigestAlgorithm::Blake3, [7; 32]);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_hash_file_matches_data() {
        let mut temp = NamedTempFile::new().unwrap();
        // Larger than one chunk
        let data = vec![0xabu8; CHUNK_SIZE * 2 + 17];
        temp.write_all(&data).unwrap();

        for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Blake3] {
            let from_file = Digest::hash_file(algorithm, temp.path()).await.unwrap();
            assert_eq!(from_file, Digest::from_data(algorithm, &data));
        }
    }

    #[tokio::test]
    async fn test_hash_missing_file() {
        let err = Digest::hash_file(DigestAlgorithm::Sha256, Path::new("/nonexistent/file"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { path: Some(_), .. }));
    }

    #[test]
    fn test_serialize_shape() {
        let d = Digest::from_data(DigestAlgorithm::Sha256, b"hello world");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["sha256"], HELLO_SHA256);
        assert_eq!("BLAKE3".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Blake3);
    }
}
