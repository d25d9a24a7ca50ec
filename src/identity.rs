//! libp2p peer identity: the signing key behind a Noise static key, and the
//! peer ID derivation rule used to bind the two together.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// A libp2p identity key pair capable of signing the static-key and
/// early-data attestations carried in the handshake payload.
///
/// Implementations marshal their public key the way `go-libp2p-core/crypto`
/// does (a small protobuf envelope of `{key_type, data}`); this crate only
/// needs the marshalled bytes and a signature, not the envelope format
/// itself, so it is left to the implementer.
pub trait PeerIdentity {
    /// Signs `msg`, returning a detached signature.
    fn sign(&self, msg: &[u8]) -> Vec<u8>;

    /// The marshalled public key bytes for this identity, as they should be
    /// embedded in the handshake payload and hashed into the peer ID.
    fn public_key_bytes(&self) -> Vec<u8>;

    /// This identity's own peer ID, derived from `public_key_bytes()`.
    fn peer_id_bytes(&self) -> Vec<u8> {
        peer_id_from_public_key(&self.public_key_bytes())
    }
}

/// Verifies `sig` over `msg` under the marshalled public key `public_key`.
///
/// Implemented per concrete key type; this crate ships no signature
/// verification of its own, since the handshake payload only names the key
/// type and delegates to whichever algorithm it declares. Callers supply
/// their own implementation wired to their key type's verification routine.
pub trait Verifier {
    /// Returns `true` if `sig` is a valid signature by `public_key` over `msg`.
    fn verify(&self, public_key: &[u8], msg: &[u8], sig: &[u8]) -> bool;
}

/// `PeerId` bytes derived from a marshalled public key: multihash of the
/// marshalled key, using the "identity" multihash (the raw bytes, unhashed)
/// when the marshalled key is at most 42 bytes, and the SHA-256 multihash
/// otherwise. This mirrors libp2p's rule that short keys embed verbatim to
/// keep peer IDs human-manageable, while longer keys (e.g. RSA) are always
/// hashed.
const INLINE_PEER_ID_MAX_LEN: usize = 42;

/// Multicodec/multihash prefixes libp2p uses for peer IDs. `0x00` + length
/// prefixes the identity hash; `0x12 0x20` prefixes a 32-byte SHA-256 digest.
const IDENTITY_MULTIHASH_CODE: u8 = 0x00;
const SHA256_MULTIHASH_CODE: u8 = 0x12;
const SHA256_DIGEST_LEN: u8 = 0x20;

/// Derives the peer ID bytes for a marshalled public key.
pub fn peer_id_from_public_key(marshalled_public_key: &[u8]) -> Vec<u8> {
    if marshalled_public_key.len() <= INLINE_PEER_ID_MAX_LEN {
        let mut out = Vec::with_capacity(2 + marshalled_public_key.len());
        out.push(IDENTITY_MULTIHASH_CODE);
        out.push(marshalled_public_key.len() as u8);
        out.extend_from_slice(marshalled_public_key);
        out
    } else {
        let digest = Sha256::digest(marshalled_public_key);
        let mut out = Vec::with_capacity(2 + digest.len());
        out.push(SHA256_MULTIHASH_CODE);
        out.push(SHA256_DIGEST_LEN);
        out.extend_from_slice(&digest);
        out
    }
}

/// Checks that `expected_peer_id` is the peer ID implied by
/// `marshalled_public_key`. Returns [`Error::PeerIdMismatch`] on mismatch.
pub fn verify_peer_id(marshalled_public_key: &[u8], expected_peer_id: &[u8]) -> Result<()> {
    if peer_id_from_public_key(marshalled_public_key) == expected_peer_id {
        Ok(())
    } else {
        Err(Error::PeerIdMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_key_uses_identity_multihash() {
        let key = vec![0xAAu8; 36];
        let id = peer_id_from_public_key(&key);
        assert_eq!(id[0], IDENTITY_MULTIHASH_CODE);
        assert_eq!(id[1], 36);
        assert_eq!(&id[2..], &key[..]);
    }

    #[test]
    fn long_key_uses_sha256_multihash() {
        let key = vec![0xBBu8; 128];
        let id = peer_id_from_public_key(&key);
        assert_eq!(id[0], SHA256_MULTIHASH_CODE);
        assert_eq!(id[1], SHA256_DIGEST_LEN);
        assert_eq!(id.len(), 2 + 32);
        assert_eq!(&id[2..], Sha256::digest(&key).as_slice());
    }

    #[test]
    fn boundary_at_42_bytes_is_still_inline() {
        let key = vec![0xCCu8; INLINE_PEER_ID_MAX_LEN];
        let id = peer_id_from_public_key(&key);
        assert_eq!(id[0], IDENTITY_MULTIHASH_CODE);
    }

    #[test]
    fn verify_peer_id_rejects_mismatch() {
        let key = vec![1u8; 10];
        let other_id = peer_id_from_public_key(&[2u8; 10]);
        assert!(matches!(
            verify_peer_id(&key, &other_id),
            Err(Error::PeerIdMismatch)
        ));
    }

    struct FakeIdentity(Vec<u8>);

    impl PeerIdentity for FakeIdentity {
        fn sign(&self, _msg: &[u8]) -> Vec<u8> {
            Vec::new()
        }

        fn public_key_bytes(&self) -> Vec<u8> {
            self.0.clone()
        }
    }

    #[test]
    fn peer_id_bytes_default_method_matches_free_function() {
        let identity = FakeIdentity(vec![9u8; 12]);
        assert_eq!(
            identity.peer_id_bytes(),
            peer_id_from_public_key(&identity.public_key_bytes())
        );
    }
}
