//! Subresource-integrity (`sha512-<base64>`) verification for downloads

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    fn prefix(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }
}

/// Expected digest of a downloaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    pub algorithm: Algorithm,
    pub digest: Vec<u8>,
}

impl Integrity {
    /// Parses an SRI string
    ///
    /// The string may hold several space-separated hashes (npm emits one);
    /// the strongest supported one is used.
    pub fn parse(sri: &str) -> Result<Self, IntegrityError> {
        let mut best: Option<Integrity> = None;

        for token in sri.split_whitespace() {
            let Some((algo, encoded)) = token.split_once('-') else {
                continue;
            };
            let algorithm = match algo {
                "sha512" => Algorithm::Sha512,
                "sha256" => Algorithm::Sha256,
                _ => continue,
            };
            // SRI allows `?options` after the digest
            let encoded = encoded.split('?').next().unwrap_or(encoded);
            let digest = STANDARD
                .decode(encoded)
                .map_err(|e| IntegrityError::InvalidEncoding {
                    value: token.to_string(),
                    reason: e.to_string(),
                })?;

            let stronger = match &best {
                None => true,
                Some(current) => {
                    current.algorithm == Algorithm::Sha256 && algorithm == Algorithm::Sha512
                }
            };
            if stronger {
                best = Some(Integrity { algorithm, digest });
            }
        }

        best.ok_or_else(|| IntegrityError::Unsupported {
            value: sri.to_string(),
        })
    }

    pub fn hasher(&self) -> IntegrityHasher {
        match self.algorithm {
            Algorithm::Sha256 => IntegrityHasher::Sha256(Sha256::new()),
            Algorithm::Sha512 => IntegrityHasher::Sha512(Sha512::new()),
        }
    }

    pub fn matches(&self, digest: &[u8]) -> bool {
        self.digest == digest
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.algorithm.prefix(),
            STANDARD.encode(&self.digest)
        )
    }
}

/// Incremental digest matching an [`Integrity`] algorithm
pub enum IntegrityHasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl IntegrityHasher {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            IntegrityHasher::Sha256(hasher) => hasher.update(bytes),
            IntegrityHasher::Sha512(hasher) => hasher.update(bytes),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            IntegrityHasher::Sha256(hasher) => hasher.finalize().to_vec(),
            IntegrityHasher::Sha512(hasher) => hasher.finalize().to_vec(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("no supported hash in integrity '{value}'")]
    Unsupported { value: String },

    #[error("invalid base64 in integrity '{value}': {reason}")]
    InvalidEncoding { value: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sri(algorithm: Algorithm, bytes: &[u8]) -> String {
        let digest = match algorithm {
            Algorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            Algorithm::Sha512 => Sha512::digest(bytes).to_vec(),
        };
        format!("{}-{}", algorithm.prefix(), STANDARD.encode(digest))
    }

    #[test]
    fn test_parse_sha512_and_verify() {
        let integrity = Integrity::parse(&sri(Algorithm::Sha512, b"payload")).unwrap();
        assert_eq!(integrity.algorithm, Algorithm::Sha512);

        let mut hasher = integrity.hasher();
        hasher.update(b"pay");
        hasher.update(b"load");
        assert!(integrity.matches(&hasher.finalize()));
    }

    #[test]
    fn test_mismatch_detected() {
        let integrity = Integrity::parse(&sri(Algorithm::Sha256, b"payload")).unwrap();
        let mut hasher = integrity.hasher();
        hasher.update(b"tampered");
        assert!(!integrity.matches(&hasher.finalize()));
    }

    #[test]
    fn test_strongest_hash_is_chosen() {
        let value = format!(
            "{} {}",
            sri(Algorithm::Sha256, b"x"),
            sri(Algorithm::Sha512, b"x")
        );
        let integrity = Integrity::parse(&value).unwrap();
        assert_eq!(integrity.algorithm, Algorithm::Sha512);
    }

    #[test]
    fn test_sha1_only_is_unsupported() {
        let err = Integrity::parse("sha1-qUqP5cyxm6YcTAhz05Hph5gvu9M=").unwrap_err();
        assert!(matches!(err, IntegrityError::Unsupported { .. }));
    }

    #[test]
    fn test_invalid_base64() {
        let err = Integrity::parse("sha512-***").unwrap_err();
        assert!(matches!(err, IntegrityError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_display_round_trips_input() {
        let value = sri(Algorithm::Sha512, b"abc");
        assert_eq!(Integrity::parse(&value).unwrap().to_string(), value);
    }
}
