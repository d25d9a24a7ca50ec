//! Component C — chaining key, handshake hash, and the Mix*/EncryptAndHash
//! operations that ratchet both forward with every handshake step.

use zeroize::Zeroize;

use crate::cipher_state::CipherState;
use crate::error::Result;
use crate::primitives::{self, HASH_LEN};

/// Fixed protocol name, frozen per spec.md §6.
pub const PROTOCOL_NAME: &str = "Noise_XX_25519_ChaChaPoly_SHA256";

/// Running chaining key, handshake hash, and the single `CipherState` they
/// drive.
pub struct SymmetricState {
    ck: [u8; HASH_LEN],
    h: [u8; HASH_LEN],
    cipher: CipherState,
}

impl SymmetricState {
    /// `initialize(protocol_name)`: `h` is the name, zero-padded to 32 bytes
    /// if short enough, else SHA-256 of the name. `ck = h`.
    pub fn initialize(protocol_name: &str) -> Self {
        let name = protocol_name.as_bytes();
        let h = if name.len() <= HASH_LEN {
            let mut padded = [0u8; HASH_LEN];
            padded[..name.len()].copy_from_slice(name);
            padded
        } else {
            primitives::sha256(name)
        };
        Self {
            ck: h,
            h,
            cipher: CipherState::empty(),
        }
    }

    /// `mix_hash(data)`: `h = SHA256(h || data)`.
    pub fn mix_hash(&mut self, data: &[u8]) {
        self.h = primitives::sha256_concat(&self.h, data);
    }

    /// `mix_key(ikm)`: ratchets `ck` and keys the cipher with a fresh
    /// temporary key derived from `ck` and `ikm`.
    pub fn mix_key(&mut self, ikm: &[u8]) {
        let [new_ck, temp_k] = primitives::hkdf_n::<2>(&self.ck, ikm);
        self.ck = new_ck;
        self.cipher.initialize_key(temp_k);
    }

    /// `mix_key_and_hash(ikm)`: the 3-output variant. Unused by the XX
    /// pattern but kept for completeness, as specified.
    pub fn mix_key_and_hash(&mut self, ikm: &[u8]) {
        let [new_ck, temp_h, temp_k] = primitives::hkdf_n::<3>(&self.ck, ikm);
        self.ck = new_ck;
        self.mix_hash(&temp_h);
        self.cipher.initialize_key(temp_k);
    }

    /// `encrypt_and_hash(plaintext)`: encrypt under `h` as AD, then mix the
    /// ciphertext into `h`.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ad = self.h;
        let ciphertext = self.cipher.encrypt_with_ad(&ad, plaintext)?;
        self.mix_hash(&ciphertext);
        Ok(ciphertext)
    }

    /// `decrypt_and_hash(ciphertext)`: mirror of `encrypt_and_hash`.
    pub fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let ad = self.h;
        let plaintext = self.cipher.decrypt_with_ad(&ad, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    /// `split()`: derive the two directional `CipherState`s from the final
    /// chaining key.
    pub fn split(&self) -> (CipherState, CipherState) {
        let [k1, k2] = primitives::hkdf_n::<2>(&self.ck, &[]);
        let mut cs1 = CipherState::empty();
        cs1.initialize_key(k1);
        let mut cs2 = CipherState::empty();
        cs2.initialize_key(k2);
        (cs1, cs2)
    }

    /// The current handshake hash, usable as a channel-binding value once
    /// the handshake is complete.
    pub fn handshake_hash(&self) -> [u8; HASH_LEN] {
        self.h
    }

    pub(crate) fn has_key(&self) -> bool {
        self.cipher.has_key()
    }
}

impl Drop for SymmetricState {
    fn drop(&mut self) {
        self.ck.zeroize();
        self.h.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_pads_short_names() {
        let s = SymmetricState::initialize("short");
        assert_eq!(&s.h[..5], b"short");
        assert!(s.h[5..].iter().all(|&b| b == 0));
        assert_eq!(s.ck, s.h);
    }

    #[test]
    fn initialize_hashes_long_names() {
        let long = "x".repeat(40);
        let s = SymmetricState::initialize(&long);
        assert_eq!(s.h, primitives::sha256(long.as_bytes()));
    }

    #[test]
    fn encrypt_and_hash_is_transparent_before_first_mix_key() {
        let mut s = SymmetricState::initialize(PROTOCOL_NAME);
        assert!(!s.has_key());
        let ct = s.encrypt_and_hash(b"payload").unwrap();
        assert_eq!(ct, b"payload");
    }

    #[test]
    fn mix_key_then_round_trip() {
        let mut a = SymmetricState::initialize(PROTOCOL_NAME);
        let mut b = SymmetricState::initialize(PROTOCOL_NAME);
        a.mix_key(b"shared-secret");
        b.mix_key(b"shared-secret");
        let ct = a.encrypt_and_hash(b"hello").unwrap();
        let pt = b.decrypt_and_hash(&ct).unwrap();
        assert_eq!(pt, b"hello");
        assert_eq!(a.handshake_hash(), b.handshake_hash());
    }

    #[test]
    fn split_produces_matching_independent_keys() {
        let mut a = SymmetricState::initialize(PROTOCOL_NAME);
        let mut b = SymmetricState::initialize(PROTOCOL_NAME);
        a.mix_key(b"secret");
        b.mix_key(b"secret");
        let (mut a1, mut a2) = a.split();
        let (mut b1, mut b2) = b.split();

        let ct = a1.encrypt_with_ad(b"", b"one").unwrap();
        assert_eq!(b1.decrypt_with_ad(b"", &ct).unwrap(), b"one");
        let ct2 = b2.encrypt_with_ad(b"", b"two").unwrap();
        assert_eq!(a2.decrypt_with_ad(b"", &ct2).unwrap(), b"two");
    }
}
