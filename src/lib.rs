//! `Noise_XX_25519_ChaChaPoly_SHA256` handshake core for libp2p.
//!
//! - Component A [`primitives`]: X25519, ChaCha20-Poly1305, SHA-256, HKDF.
//! - Component B [`cipher_state`]: keyed AEAD with a 64-bit nonce counter.
//! - Component C [`symmetric_state`]: chaining key, handshake hash, Mix*.
//! - Component D [`handshake_state`]: the Noise_XX message state machine.
//! - Component E [`payload`]: the libp2p identity-binding handshake payload.
//! - Component F [`xx_handshake`]: `propose`/`exchange`/`finish` orchestrator
//!   and wire framing.
//! - Component G [`transport`]: the post-handshake encrypted session.
#![forbid(unsafe_code)]

pub mod cipher_state;
pub mod error;
pub mod handshake_state;
pub mod identity;
pub mod payload;
pub mod primitives;
pub mod symmetric_state;
pub mod transport;
pub mod xx_handshake;

pub use error::{Error, Result};
pub use handshake_state::Role;
pub use identity::PeerIdentity;
pub use payload::HandshakePayload;
pub use primitives::DhKeyPair;
pub use transport::TransportSession;
pub use xx_handshake::{Transport, XxHandshake};
