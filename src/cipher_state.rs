//! Component B — a keyed AEAD with a 64-bit nonce counter.

use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::primitives;

/// Keyed ChaCha20-Poly1305 state with an auto-incrementing nonce.
///
/// Before a key is set (`k = ⊥`), `encrypt_with_ad`/`decrypt_with_ad` are
/// no-ops on the plaintext, matching the Noise spec's treatment of an
/// unkeyed `CipherState` during the early part of the handshake.
pub struct CipherState {
    key: Option<[u8; 32]>,
    n: u64,
}

impl CipherState {
    /// A fresh, unkeyed cipher state.
    pub fn empty() -> Self {
        Self { key: None, n: 0 }
    }

    /// Sets the key and resets the nonce counter to zero.
    pub fn initialize_key(&mut self, key: [u8; 32]) {
        self.key = Some(key);
        self.n = 0;
    }

    /// Whether a key has been set.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypts `plaintext` under the current key and nonce, then advances
    /// the nonce. Returns the plaintext unchanged if unkeyed.
    pub fn encrypt_with_ad(&mut self, ad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let Some(key) = self.key else {
            return Ok(plaintext.to_vec());
        };
        let n = self.take_nonce()?;
        Ok(primitives::aead_encrypt(&key, n, ad, plaintext))
    }

    /// Decrypts `ciphertext` under the current key and nonce, then advances
    /// the nonce. Returns the ciphertext unchanged if unkeyed. An AEAD tag
    /// mismatch is fatal and non-recoverable for this `CipherState`.
    pub fn decrypt_with_ad(&mut self, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let Some(key) = self.key else {
            return Ok(ciphertext.to_vec());
        };
        let n = self.take_nonce()?;
        primitives::aead_decrypt(&key, n, ad, ciphertext)
    }

    fn take_nonce(&mut self) -> Result<u64> {
        if self.n == u64::MAX {
            return Err(Error::NonceExhausted);
        }
        let n = self.n;
        self.n += 1;
        Ok(n)
    }

    /// Current nonce counter value (number of AEAD operations performed).
    pub fn nonce(&self) -> u64 {
        self.n
    }
}

impl Drop for CipherState {
    fn drop(&mut self) {
        if let Some(mut key) = self.key.take() {
            key.zeroize();
        }
    }
}
