//! At-rest encryption for spilled files.
//!
//! All ciphers are AEAD (Authenticated Encryption with Associated Data),
//! guaranteeing both confidentiality and integrity. Spilled files are
//! sealed whole, with the file's encryption path as associated data, so a
//! file that is renamed or swapped for another one fails to open.
//!
//! # Supported Algorithms
//!
//! | Algorithm | Speed (AES-NI) | Speed (SW) | Nonce Safety | Use Case |
//! |-----------|---------------|------------|--------------|----------|
//! | AES-256-GCM-SIV | ★★★★★ | ★★★ | Misuse-resistant | Default: modern x86/ARM |
//! | ChaCha20-Poly1305 | ★★★ | ★★★★★ | Standard | No AES-NI |
//!
//! # Wire Format
//!
//! Sealed output = `[nonce (12 bytes)] || [ciphertext + auth_tag]`
//!
//! # Example
//!
//! ```rust
//! use spillway_core::storage::encryption::EncryptionConfig;
//!
//! let config = EncryptionConfig::from_password("spill-secret").unwrap();
//! let sealed = config.seal(b"block bytes", b"/tmp/spill_0").unwrap();
//! let opened = config.open(&sealed, b"/tmp/spill_0").unwrap();
//! assert_eq!(opened, b"block bytes");
//! assert!(config.open(&sealed, b"/tmp/spill_1").is_err());
//! ```

use aes_gcm_siv::Aes256GcmSiv;
use aes_gcm_siv::aead::generic_array::GenericArray;
use aes_gcm_siv::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{SpillwayError, SpillwayResult};

/// Nonce size in bytes (96-bit, standard for both AES-GCM-SIV and ChaCha20-Poly1305).
const NONCE_SIZE: usize = 12;

/// Encryption key size in bytes (256-bit).
const KEY_SIZE: usize = 32;

/// HKDF info string for key derivation.
const HKDF_INFO: &[u8] = b"spillway-spill-v1";

/// HKDF salt for password-based key derivation.
const HKDF_SALT: &[u8] = b"spillway-default-salt-v1";

// ───────────────────────────────────────────────────────────────
// EncryptionAlgorithm
// ───────────────────────────────────────────────────────────────

/// Encryption algorithm selection.
///
/// Both algorithms provide 256-bit security with authenticated encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionAlgorithm {
    /// AES-256-GCM-SIV: **Default**. Nonce-misuse-resistant.
    #[default]
    Aes256GcmSiv,

    /// ChaCha20-Poly1305 (RFC 8439). Fast without hardware AES.
    ChaCha20Poly1305,
}

impl std::fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aes256GcmSiv => write!(f, "AES-256-GCM-SIV"),
            Self::ChaCha20Poly1305 => write!(f, "ChaCha20-Poly1305"),
        }
    }
}

impl EncryptionAlgorithm {
    /// All supported encryption algorithms.
    pub const ALL: &'static [EncryptionAlgorithm] = &[
        EncryptionAlgorithm::Aes256GcmSiv,
        EncryptionAlgorithm::ChaCha20Poly1305,
    ];
}

// ───────────────────────────────────────────────────────────────
// EncryptionConfig
// ───────────────────────────────────────────────────────────────

/// Algorithm plus derived key material.
#[derive(Clone)]
pub struct EncryptionConfig {
    algorithm: EncryptionAlgorithm,
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl EncryptionConfig {
    /// Key stretched from a password with HKDF-SHA256, default algorithm.
    pub fn from_password(password: &str) -> SpillwayResult<Self> {
        Ok(Self {
            algorithm: EncryptionAlgorithm::default(),
            key: derive_key(password.as_bytes())?,
        })
    }

    /// Raw 256-bit key, default algorithm.
    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        Self {
            algorithm: EncryptionAlgorithm::default(),
            key,
        }
    }

    /// Change the algorithm while keeping the same key.
    pub fn with_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// Encrypt `plaintext`, authenticating `aad` alongside it.
    ///
    /// A fresh random nonce is generated for every call.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> SpillwayResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);
        let payload = Payload {
            msg: plaintext,
            aad,
        };

        let key = GenericArray::from_slice(&self.key);
        let ciphertext = match self.algorithm {
            EncryptionAlgorithm::Aes256GcmSiv => Aes256GcmSiv::new(key).encrypt(nonce, payload),
            EncryptionAlgorithm::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new(key).encrypt(nonce, payload)
            }
        }
        .map_err(|e| SpillwayError::Encryption(format!("{} seal failed: {}", self.algorithm, e)))?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt data produced by [`seal`](Self::seal) with the same `aad`.
    ///
    /// Fails if the data is truncated, was tampered with, or the key or
    /// `aad` differ.
    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> SpillwayResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(SpillwayError::Encryption(
                "encrypted data too short (missing nonce)".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = GenericArray::from_slice(nonce_bytes);
        let payload = Payload {
            msg: ciphertext,
            aad,
        };

        let key = GenericArray::from_slice(&self.key);
        match self.algorithm {
            EncryptionAlgorithm::Aes256GcmSiv => Aes256GcmSiv::new(key).decrypt(nonce, payload),
            EncryptionAlgorithm::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new(key).decrypt(nonce, payload)
            }
        }
        .map_err(|e| SpillwayError::Encryption(format!("{} open failed: {}", self.algorithm, e)))
    }
}

fn derive_key(input: &[u8]) -> SpillwayResult<[u8; KEY_SIZE]> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), input);
    let mut key = [0u8; KEY_SIZE];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|e| SpillwayError::Encryption(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
