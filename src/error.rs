//! Error types for the handshake core.
//!
//! Every variant here is terminal: once returned, the `HandshakeState` (or
//! `XxHandshake`) that produced it must not be reused. Callers that need to
//! retry perform a brand new handshake from scratch.

/// Errors produced while running the Noise_XX handshake or the resulting
/// transport session.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The underlying duplex transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A length prefix disagreed with the frame body, or a handshake message
    /// was shorter than the fixed minimum for its step.
    #[error("malformed handshake frame: {0}")]
    MalformedFrame(String),

    /// A received static or ephemeral public key failed X25519 validation,
    /// or a DH operation produced the all-zero output.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Poly1305 tag verification failed on an encrypted field or message.
    #[error("AEAD authentication failure")]
    AeadAuthFailure,

    /// Payload bytes did not parse as the declared tag-length-value record.
    #[error("payload decode error: {0}")]
    PayloadDecodeError(String),

    /// The derived peer id disagreed with the expected one, or with the id
    /// implied by the identity public key.
    #[error("Peer ID doesn't match libp2p public key.")]
    PeerIdMismatch,

    /// The signature over `"noise-libp2p-static-key:" || rs` did not verify.
    #[error("Static key is not signed by the given identity key.")]
    StaticKeyNotAuthenticated,

    /// The signature over `"noise-libp2p-early-data:" || early_data` did not
    /// verify.
    #[error("Early data is not signed by the given identity key.")]
    EarlyDataNotAuthenticated,

    /// The 64-bit AEAD nonce counter would overflow on the next send/receive.
    #[error("nonce counter exhausted")]
    NonceExhausted,

    /// A handshake operation was invoked out of its required order (e.g.
    /// `exchange` before `propose`, or any step called twice).
    #[error("handshake step invoked out of order: {0}")]
    StateMisuse(String),

    /// Payload verification failed; the inner error is wrapped with the
    /// stable, user-facing prefix so upstream code can pattern-match on it.
    #[error("Error occurred while verifying signed payload: {0}")]
    PayloadVerification(Box<Error>),
}

impl Error {
    /// Wraps `self` as a payload-verification failure, producing the stable
    /// `"Error occurred while verifying signed payload: "` prefix required by
    /// callers that pattern-match on the message text.
    pub fn into_payload_verification(self) -> Error {
        Error::PayloadVerification(Box::new(self))
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_verification_message_has_stable_prefix() {
        let err = Error::PeerIdMismatch.into_payload_verification();
        assert_eq!(
            err.to_string(),
            "Error occurred while verifying signed payload: Peer ID doesn't match libp2p public key."
        );
    }
}
