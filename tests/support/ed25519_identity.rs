//! A libp2p-style Ed25519 identity for handshake integration tests.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier as DalekVerifier, VerifyingKey};
use rand_core::OsRng;

use libp2p_noise_xx::identity::Verifier;
use libp2p_noise_xx::PeerIdentity;

const ED25519_KEY_TYPE_TAG: u8 = 1;

/// An Ed25519 signing identity. Marshals its public key as a one-byte type
/// tag followed by the 32-byte verifying key, well within the 42-byte
/// inline peer-ID threshold.
pub struct Ed25519Identity {
    signing_key: SigningKey,
}

impl Ed25519Identity {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }
}

impl PeerIdentity for Ed25519Identity {
    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signing_key.sign(msg).to_bytes().to_vec()
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33);
        out.push(ED25519_KEY_TYPE_TAG);
        out.extend_from_slice(self.signing_key.verifying_key().as_bytes());
        out
    }
}

/// Verifies signatures produced by [`Ed25519Identity`].
pub struct Ed25519SignatureVerifier;

impl Verifier for Ed25519SignatureVerifier {
    fn verify(&self, public_key: &[u8], msg: &[u8], sig: &[u8]) -> bool {
        let [tag, key_bytes @ ..] = public_key else {
            return false;
        };
        if *tag != ED25519_KEY_TYPE_TAG {
            return false;
        }
        let Ok(key_bytes): Result<[u8; 32], _> = key_bytes.try_into() else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = sig.try_into() else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        verifying_key.verify(msg, &signature).is_ok()
    }
}
