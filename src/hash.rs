// src/hash.rs

//! Configurable content hashing for file identity
//!
//! Two algorithms cover the formats this tool meets in the wild:
//! - **XXH64**: 64-bit xxHash rendered as base64 of the little-endian value.
//!   This is the encoding carried by modlist file listings, so it is the
//!   default everywhere a hash identifies an installed or payload file.
//! - **SHA-256**: hex-encoded cryptographic hash for callers that need a
//!   collision-resistant identity (e.g. archive verification).
//!
//! A hash value is always paired with its algorithm; comparing values across
//! algorithms is meaningless and the string encodings do not overlap.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use xxhash_rust::xxh64::xxh64 as xxh64_digest;
use xxhash_rust::xxh64::Xxh64;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// XXH64 (64-bit non-cryptographic hash, base64-encoded)
    ///
    /// Extremely fast. The value is the little-endian u64 digest encoded as
    /// standard base64, matching the format used by modlist file listings.
    #[default]
    Xxh64,

    /// SHA-256 (256-bit cryptographic hash, hex-encoded)
    Sha256,
}

impl HashAlgorithm {
    /// Length of the encoded hash string
    #[inline]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Self::Xxh64 => 12,  // base64 of 8 bytes, padded
            Self::Sha256 => 64, // 32 bytes as hex
        }
    }

    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Xxh64 => "xxh64",
            Self::Sha256 => "sha256",
        }
    }

    /// Check if this is a cryptographic hash
    #[inline]
    pub const fn is_cryptographic(&self) -> bool {
        match self {
            Self::Xxh64 => false,
            Self::Sha256 => true,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xxh64" | "xxhash" | "xxhash64" => Ok(Self::Xxh64),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Unknown hash algorithm name
    UnknownAlgorithm(String),
    /// Encoded hash string has the wrong length for the algorithm
    InvalidLength { expected: usize, got: usize },
    /// Encoded hash string is not valid hex/base64 for the algorithm
    InvalidEncoding(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown hash algorithm: {}", name),
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid hash length: expected {}, got {}", expected, got)
            }
            Self::InvalidEncoding(s) => write!(f, "invalid hash encoding: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A hash value with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    /// The algorithm used
    pub algorithm: HashAlgorithm,
    /// The encoded hash value (base64 for xxh64, lowercase hex for sha256)
    pub value: String,
}

impl Hash {
    /// Create a hash from an encoded string, validating length and encoding
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        let expected = algorithm.encoded_len();

        if value.len() != expected {
            return Err(HashError::InvalidLength {
                expected,
                got: value.len(),
            });
        }

        let value = match algorithm {
            HashAlgorithm::Sha256 => {
                if !value.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(HashError::InvalidEncoding(value));
                }
                value.to_lowercase()
            }
            HashAlgorithm::Xxh64 => {
                // Base64 is case-sensitive; validate by decoding to 8 bytes.
                match BASE64.decode(&value) {
                    Ok(bytes) if bytes.len() == 8 => value,
                    _ => return Err(HashError::InvalidEncoding(value)),
                }
            }
        };

        Ok(Self { algorithm, value })
    }

    /// Create a hash without validation (internal use)
    fn new_unchecked(algorithm: HashAlgorithm, value: String) -> Self {
        Self { algorithm, value }
    }

    /// Get the encoded hash value
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Parse a hash string, with or without an algorithm prefix.
    ///
    /// Prefixed forms are `"xxh64:menYUTfbRu8="` and `"sha256:dffd..."`.
    /// Unprefixed strings are inferred from their shape: 64 hex characters
    /// parse as SHA-256, anything else as base64 XXH64 (the bare form file
    /// listings carry).
    pub fn parse(s: &str) -> Result<Self, HashError> {
        if let Some((algo, rest)) = s.split_once(':') {
            let algorithm = algo.parse()?;
            return Self::new(algorithm, rest);
        }

        if s.len() == HashAlgorithm::Sha256.encoded_len()
            && s.chars().all(|c| c.is_ascii_hexdigit())
        {
            Self::new(HashAlgorithm::Sha256, s)
        } else {
            Self::new(HashAlgorithm::Xxh64, s)
        }
    }

    /// Format as a prefixed string (e.g., "xxh64:menYUTfbRu8=")
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.value)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Encode an xxh64 digest the way file listings expect it
fn encode_xxh64(digest: u64) -> String {
    BASE64.encode(digest.to_le_bytes())
}

/// Streaming hasher over any supported algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Xxh64(Xxh64),
    Sha256(Sha256),
}

impl Hasher {
    /// Create a new hasher with the specified algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Xxh64 => HasherState::Xxh64(Xxh64::new(0)),
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
        };
        Self { algorithm, state }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Xxh64(hasher) => hasher.update(data),
            HasherState::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> Hash {
        let value = match self.state {
            HasherState::Xxh64(hasher) => encode_xxh64(hasher.digest()),
            HasherState::Sha256(hasher) => format!("{:x}", hasher.finalize()),
        };
        Hash::new_unchecked(self.algorithm, value)
    }

    /// Get the algorithm being used
    #[inline]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let value = match algorithm {
        HashAlgorithm::Xxh64 => encode_xxh64(xxh64_digest(data, 0)),
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(data);
            format!("{:x}", hasher.finalize())
        }
    };
    Hash::new_unchecked(algorithm, value)
}

/// Compute hash of data from a reader
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<Hash> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute the hash of a file, streaming its contents
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> io::Result<Hash> {
    let mut file = std::fs::File::open(path)?;
    hash_reader(algorithm, &mut file)
}

/// Compute the base64 XXH64 hash of a byte slice (convenience function)
#[inline]
pub fn xxh64(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Xxh64, data).value
}

/// Compute the hex SHA-256 hash of a byte slice (convenience function)
#[inline]
pub fn sha256(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data).value
}
