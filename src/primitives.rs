//! Fixed cryptographic primitives: X25519, ChaCha20-Poly1305, SHA-256, HKDF.
//!
//! The Noise_XX pattern and this crate's scope fix the algorithm suite, so
//! there is no provider trait object here — just the small set of free
//! functions the rest of the crate calls (§9's "compile-time abstraction").

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Length in bytes of an X25519 key (public or private).
pub const DH_LEN: usize = 32;
/// Length in bytes of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;
/// Length in bytes of the SHA-256 digest.
pub const HASH_LEN: usize = 32;

/// An X25519 key pair used as either a Noise static or ephemeral key.
pub struct DhKeyPair {
    private: StaticSecret,
    public: [u8; DH_LEN],
}

impl DhKeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; DH_LEN];
        OsRng.fill_bytes(&mut seed);
        let pair = Self::from_private_bytes(seed);
        seed.zeroize();
        pair
    }

    /// Builds a key pair from an existing 32-byte private scalar.
    pub fn from_private_bytes(mut bytes: [u8; DH_LEN]) -> Self {
        let private = StaticSecret::from(bytes);
        let public = PublicKey::from(&private).to_bytes();
        bytes.zeroize();
        Self { private, public }
    }

    /// The public half of this pair, as wire-visible bytes.
    pub fn public_bytes(&self) -> [u8; DH_LEN] {
        self.public
    }

    fn private_secret(&self) -> &StaticSecret {
        &self.private
    }
}

impl Drop for DhKeyPair {
    fn drop(&mut self) {
        self.public.zeroize();
    }
}

/// Performs X25519 Diffie-Hellman between `private` and `remote_public`.
///
/// A shared secret of all zero bytes indicates `remote_public` was a
/// low-order point and is treated as a fatal, invalid key per spec.
pub fn dh(private: &DhKeyPair, remote_public: &[u8; DH_LEN]) -> Result<[u8; DH_LEN]> {
    let remote = PublicKey::from(*remote_public);
    let shared = private.private_secret().diffie_hellman(&remote);
    let bytes = shared.to_bytes();
    if bytes.ct_is_zero() {
        return Err(Error::InvalidPublicKey(
            "DH output is all-zero (low-order remote public key)".into(),
        ));
    }
    Ok(bytes)
}

trait CtIsZero {
    fn ct_is_zero(&self) -> bool;
}

impl CtIsZero for [u8; 32] {
    fn ct_is_zero(&self) -> bool {
        // Constant-time zero check: fold with OR, compare once at the end.
        self.iter().fold(0u8, |acc, b| acc | b) == 0
    }
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of the concatenation `a || b`, without an intermediate allocation.
pub fn sha256_concat(a: &[u8], b: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// `HKDF(ck, ikm, n)` as defined by the Noise spec: extract with `ck` as
/// salt, expand with empty info, split into `n` 32-byte outputs. `n` is 2 or
/// 3 for every call this crate makes.
pub fn hkdf_n<const N: usize>(chaining_key: &[u8; HASH_LEN], ikm: &[u8]) -> [[u8; HASH_LEN]; N] {
    let hk = Hkdf::<Sha256>::new(Some(chaining_key), ikm);
    let mut okm = vec![0u8; HASH_LEN * N];
    // Empty info, N*32 bytes is always within HKDF-SHA256's 255*32 byte limit.
    hk.expand(&[], &mut okm)
        .expect("okm length is a small, fixed multiple of the hash length");

    let mut out = [[0u8; HASH_LEN]; N];
    for (i, chunk) in okm.chunks_exact(HASH_LEN).enumerate() {
        out[i].copy_from_slice(chunk);
    }
    okm.zeroize();
    out
}

/// ChaCha20-Poly1305 AEAD encryption with nonce `00000000 || n_le`.
pub fn aead_encrypt(key: &[u8; 32], n: u64, ad: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = encode_nonce(n);
    cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: ad,
            },
        )
        .expect("ChaCha20-Poly1305 encryption does not fail for well-formed inputs")
}

/// ChaCha20-Poly1305 AEAD decryption. An authentication failure is reported
/// as [`Error::AeadAuthFailure`], never a panic.
pub fn aead_decrypt(key: &[u8; 32], n: u64, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = encode_nonce(n);
    cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad: ad,
            },
        )
        .map_err(|_| Error::AeadAuthFailure)
}

/// Encodes a 64-bit counter into the 96-bit nonce layout the spec requires:
/// four zero bytes followed by the little-endian counter.
fn encode_nonce(n: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[4..].copy_from_slice(&n.to_le_bytes());
    nonce
}
