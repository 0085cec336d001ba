//! Cryptographic Primitives
//!
//! - RSA keypairs (SubjectPublicKeyInfo DER on the wire)
//! - RSA-OAEP(SHA-256) wrapping of the AES session key
//! - AES-256-CBC with PKCS#7 padding for session traffic
//!
//! Session key material is zeroized on drop.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AgoraError, Result};

/// AES-256 key size in bytes
pub const SESSION_KEY_SIZE: usize = 32;

/// AES block / IV size in bytes
pub const IV_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

// =============================================================================
// Asymmetric Keys
// =============================================================================

/// An RSA keypair used for the key exchange
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generate a keypair with a `bits`-bit modulus
    pub fn generate(bits: usize) -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| AgoraError::Crypto(format!("RSA key generation failed: {}", e)))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Public key as SubjectPublicKeyInfo DER
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        let document = self
            .public
            .to_public_key_der()
            .map_err(|e| AgoraError::Crypto(format!("public key encoding failed: {}", e)))?;
        Ok(document.as_bytes().to_vec())
    }

    /// Recover a session key wrapped with [`wrap_session_key`]
    pub fn unwrap_session_key(&self, wrapped: &[u8]) -> Result<[u8; SESSION_KEY_SIZE]> {
        let mut plain = self
            .private
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|e| AgoraError::Crypto(format!("session key unwrap failed: {}", e)))?;

        let result = <[u8; SESSION_KEY_SIZE]>::try_from(plain.as_slice()).map_err(|_| {
            AgoraError::Crypto(format!(
                "session key has {} bytes, expected {}",
                plain.len(),
                SESSION_KEY_SIZE
            ))
        });
        plain.zeroize();
        result
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair").finish_non_exhaustive()
    }
}

/// Parse a peer's SubjectPublicKeyInfo DER
pub fn parse_public_key(der: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der)
        .map_err(|e| AgoraError::Crypto(format!("invalid public key: {}", e)))
}

/// Encrypt `key` under the peer's public key
pub fn wrap_session_key(peer: &RsaPublicKey, key: &[u8; SESSION_KEY_SIZE]) -> Result<Vec<u8>> {
    peer.encrypt(&mut OsRng, Oaep::new::<Sha256>(), key)
        .map_err(|e| AgoraError::Crypto(format!("session key wrap failed: {}", e)))
}

// =============================================================================
// Randomness
// =============================================================================

/// Fresh random session key
pub fn random_session_key() -> [u8; SESSION_KEY_SIZE] {
    let mut key = [0u8; SESSION_KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}

/// Fresh random IV
pub fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

// =============================================================================
// Session Cipher
// =============================================================================

/// Symmetric key material of one established session
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionCipher {
    key: [u8; SESSION_KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl SessionCipher {
    pub fn new(key: [u8; SESSION_KEY_SIZE], iv: [u8; IV_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Build from an IV received as raw bytes
    pub fn with_iv_bytes(key: [u8; SESSION_KEY_SIZE], iv: &[u8]) -> Result<Self> {
        let iv = <[u8; IV_SIZE]>::try_from(iv).map_err(|_| {
            AgoraError::Crypto(format!("IV has {} bytes, expected {}", iv.len(), IV_SIZE))
        })?;
        Ok(Self::new(key, iv))
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &self.iv)
            .map_err(|e| AgoraError::Crypto(e.to_string()))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    /// Fails on bad length or padding, which means tampering or desync
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % IV_SIZE != 0 {
            return Err(AgoraError::Crypto(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                IV_SIZE
            )));
        }
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &self.iv)
            .map_err(|e| AgoraError::Crypto(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AgoraError::Crypto("bad padding".to_string()))
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}
