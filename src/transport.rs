//! Component G — the post-handshake transport session: a pair of directional
//! `CipherState`s plus the identity facts established during the handshake.

use crate::cipher_state::CipherState;
use crate::error::Result;
use crate::handshake_state::Role;
use crate::identity;
use crate::payload::HandshakePayload;

/// A live, post-handshake Noise_XX session. Encrypts and decrypts
/// application records with the keys `HandshakeState::split` produced.
///
/// `send` and `recv` are assigned by role: the initiator's `cs1` becomes its
/// send cipher and the responder's `cs1` becomes its receive cipher (and
/// vice-versa for `cs2`), so each side calls `encrypt`/`decrypt` without
/// needing to know which raw `CipherState` corresponds to which direction.
pub struct TransportSession {
    send: CipherState,
    recv: CipherState,
    handshake_hash: [u8; 32],
    remote_static: [u8; 32],
    remote_payload: HandshakePayload,
}

impl TransportSession {
    pub(crate) fn new(
        role: Role,
        cs1: CipherState,
        cs2: CipherState,
        handshake_hash: [u8; 32],
        remote_static: [u8; 32],
        remote_payload: HandshakePayload,
    ) -> Self {
        let (send, recv) = match role {
            Role::Initiator => (cs1, cs2),
            Role::Responder => (cs2, cs1),
        };
        Self {
            send,
            recv,
            handshake_hash,
            remote_static,
            remote_payload,
        }
    }

    /// Encrypts one application record for sending.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.send.encrypt_with_ad(b"", plaintext)
    }

    /// Decrypts one application record received from the peer.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.recv.decrypt_with_ad(b"", ciphertext)
    }

    /// The handshake transcript hash, usable as a channel-binding token.
    pub fn handshake_hash(&self) -> [u8; 32] {
        self.handshake_hash
    }

    /// The marshalled libp2p public key the remote peer authenticated as.
    pub fn remote_identity_public_key(&self) -> &[u8] {
        &self.remote_payload.identity_public_key
    }

    /// Application early data the remote peer sent during the handshake, if
    /// any.
    pub fn remote_early_data(&self) -> Option<&[u8]> {
        self.remote_payload.early_data.as_deref()
    }

    /// The remote peer's Noise static public key, as authenticated by the
    /// handshake.
    pub fn remote_static_key(&self) -> [u8; 32] {
        self.remote_static
    }

    /// The remote peer's libp2p peer ID, derived from its authenticated
    /// identity public key.
    pub fn remote_peer_id(&self) -> Vec<u8> {
        identity::peer_id_from_public_key(&self.remote_payload.identity_public_key)
    }
}
