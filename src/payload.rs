//! Component E — the libp2p handshake payload: the identity key, the
//! signature binding it to the Noise static key, and optional early data.
//!
//! Wire format is a flat sequence of tag-length-value records, tags
//! ascending on encode, unknown tags skipped on decode so the format can
//! grow new optional fields without breaking older readers.

use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::identity::{self, PeerIdentity, Verifier};

const TAG_IDENTITY_PUBLIC_KEY: u8 = 1;
const TAG_NOISE_STATIC_SIGNATURE: u8 = 2;
const TAG_EARLY_DATA: u8 = 3;
const TAG_EARLY_DATA_SIGNATURE: u8 = 4;

/// Domain-separation prefix signed together with the Noise static public key.
pub const STATIC_KEY_SIGNATURE_PREFIX: &[u8] = b"noise-libp2p-static-key:";
/// Domain-separation prefix signed together with early application data.
pub const EARLY_DATA_SIGNATURE_PREFIX: &[u8] = b"noise-libp2p-early-data:";

/// The decoded libp2p handshake payload carried inside messages 2 and 3.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakePayload {
    /// Marshalled libp2p public key identifying this peer.
    pub identity_public_key: Vec<u8>,
    /// Signature by `identity_public_key` over
    /// `STATIC_KEY_SIGNATURE_PREFIX || noise_static_key`.
    pub noise_static_signature: Vec<u8>,
    /// Optional application data sent before the handshake completes.
    pub early_data: Option<Vec<u8>>,
    /// Signature over `EARLY_DATA_SIGNATURE_PREFIX || early_data`, required
    /// iff `early_data` is present.
    pub early_data_signature: Option<Vec<u8>>,
}

impl Drop for HandshakePayload {
    fn drop(&mut self) {
        self.identity_public_key.zeroize();
        self.noise_static_signature.zeroize();
        self.early_data.zeroize();
        self.early_data_signature.zeroize();
    }
}

impl HandshakePayload {
    /// Builds and signs a payload binding `identity` to `noise_static_key`,
    /// optionally carrying signed `early_data`.
    pub fn construct(
        identity: &dyn PeerIdentity,
        noise_static_key: &[u8; 32],
        early_data: Option<&[u8]>,
    ) -> Self {
        let mut to_sign = Vec::with_capacity(STATIC_KEY_SIGNATURE_PREFIX.len() + 32);
        to_sign.extend_from_slice(STATIC_KEY_SIGNATURE_PREFIX);
        to_sign.extend_from_slice(noise_static_key);
        let noise_static_signature = identity.sign(&to_sign);

        let (early_data, early_data_signature) = match early_data {
            Some(data) => {
                let mut ed_to_sign =
                    Vec::with_capacity(EARLY_DATA_SIGNATURE_PREFIX.len() + data.len());
                ed_to_sign.extend_from_slice(EARLY_DATA_SIGNATURE_PREFIX);
                ed_to_sign.extend_from_slice(data);
                (Some(data.to_vec()), Some(identity.sign(&ed_to_sign)))
            }
            None => (None, None),
        };

        Self {
            identity_public_key: identity.public_key_bytes(),
            noise_static_signature,
            early_data,
            early_data_signature,
        }
    }

    /// Encodes the payload as ascending-tag TLV records.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_field(&mut out, TAG_IDENTITY_PUBLIC_KEY, &self.identity_public_key);
        write_field(
            &mut out,
            TAG_NOISE_STATIC_SIGNATURE,
            &self.noise_static_signature,
        );
        if let Some(early_data) = &self.early_data {
            write_field(&mut out, TAG_EARLY_DATA, early_data);
        }
        if let Some(sig) = &self.early_data_signature {
            write_field(&mut out, TAG_EARLY_DATA_SIGNATURE, sig);
        }
        out
    }

    /// Decodes a payload from TLV bytes. Unknown tags are skipped. Missing
    /// required fields (identity key, static signature) are a decode error.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut identity_public_key = None;
        let mut noise_static_signature = None;
        let mut early_data = None;
        let mut early_data_signature = None;

        let mut cursor = bytes;
        while !cursor.is_empty() {
            let (tag, value, rest) = read_field(cursor)?;
            match tag {
                TAG_IDENTITY_PUBLIC_KEY => identity_public_key = Some(value.to_vec()),
                TAG_NOISE_STATIC_SIGNATURE => noise_static_signature = Some(value.to_vec()),
                TAG_EARLY_DATA => early_data = Some(value.to_vec()),
                TAG_EARLY_DATA_SIGNATURE => early_data_signature = Some(value.to_vec()),
                _ => {}
            }
            cursor = rest;
        }

        let identity_public_key = identity_public_key
            .ok_or_else(|| Error::PayloadDecodeError("missing identity_public_key".into()))?;
        let noise_static_signature = noise_static_signature.ok_or_else(|| {
            Error::PayloadDecodeError("missing noise_static_signature".into())
        })?;

        if early_data.is_some() != early_data_signature.is_some() {
            return Err(Error::PayloadDecodeError(
                "early_data and early_data_signature must both be present or both absent".into(),
            ));
        }

        Ok(Self {
            identity_public_key,
            noise_static_signature,
            early_data,
            early_data_signature,
        })
    }

    /// Verifies this payload against the remote's Noise static key and, if
    /// given, the peer ID the caller expected to connect to.
    ///
    /// Checks, in order: the identity key matches `expected_peer_id` (if
    /// supplied), the static-key signature verifies, and the early-data
    /// signature verifies (if early data is present). Every failure is
    /// wrapped with [`Error::into_payload_verification`].
    pub fn verify(
        &self,
        verifier: &dyn Verifier,
        noise_static_key: &[u8; 32],
        expected_peer_id: Option<&[u8]>,
    ) -> Result<()> {
        self.verify_inner(verifier, noise_static_key, expected_peer_id)
            .map_err(Error::into_payload_verification)
    }

    fn verify_inner(
        &self,
        verifier: &dyn Verifier,
        noise_static_key: &[u8; 32],
        expected_peer_id: Option<&[u8]>,
    ) -> Result<()> {
        if let Some(expected) = expected_peer_id {
            identity::verify_peer_id(&self.identity_public_key, expected)?;
        }

        let mut to_verify = Vec::with_capacity(STATIC_KEY_SIGNATURE_PREFIX.len() + 32);
        to_verify.extend_from_slice(STATIC_KEY_SIGNATURE_PREFIX);
        to_verify.extend_from_slice(noise_static_key);
        if !verifier.verify(
            &self.identity_public_key,
            &to_verify,
            &self.noise_static_signature,
        ) {
            return Err(Error::StaticKeyNotAuthenticated);
        }

        if let Some(early_data) = &self.early_data {
            let sig = self
                .early_data_signature
                .as_ref()
                .expect("decode() enforces pairing");
            let mut ed_to_verify =
                Vec::with_capacity(EARLY_DATA_SIGNATURE_PREFIX.len() + early_data.len());
            ed_to_verify.extend_from_slice(EARLY_DATA_SIGNATURE_PREFIX);
            ed_to_verify.extend_from_slice(early_data);
            if !verifier.verify(&self.identity_public_key, &ed_to_verify, sig) {
                return Err(Error::EarlyDataNotAuthenticated);
            }
        }

        Ok(())
    }
}

fn write_field(out: &mut Vec<u8>, tag: u8, value: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
}

fn read_field(bytes: &[u8]) -> Result<(u8, &[u8], &[u8])> {
    if bytes.len() < 3 {
        return Err(Error::PayloadDecodeError(
            "truncated TLV header".into(),
        ));
    }
    let tag = bytes[0];
    let len = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
    let rest = &bytes[3..];
    if rest.len() < len {
        return Err(Error::PayloadDecodeError(
            "TLV length exceeds remaining bytes".into(),
        ));
    }
    Ok((tag, &rest[..len], &rest[len..]))
}
