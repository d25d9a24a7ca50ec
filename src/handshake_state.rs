//! Component D — the Noise_XX pattern state machine.
//!
//! `HandshakeState` only knows about DH keys, the symmetric state, and raw
//! payload bytes; it has no notion of libp2p identities or wire framing —
//! those live in [`crate::payload`] and [`crate::xx_handshake`] respectively.

use zeroize::Zeroize;

use crate::cipher_state::CipherState;
use crate::error::{Error, Result};
use crate::primitives::{self, DhKeyPair, DH_LEN, TAG_LEN};
use crate::symmetric_state::{SymmetricState, PROTOCOL_NAME};

/// Which side of the handshake this state represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Sends message 1 and 3, reads message 2.
    Initiator,
    /// Reads message 1 and 3, sends message 2.
    Responder,
}

/// The step a [`HandshakeState`] is waiting on. Any deviation from the
/// expected next step is a [`Error::StateMisuse`]; any cryptographic or
/// framing failure moves the state to `Failed`, which is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Init,
    Msg1Done,
    Msg2Done,
    Done,
    Failed,
}

/// Drives the three-message Noise_XX handshake: ephemeral/static key
/// schedule, DH mixing, and message read/write. Single-use: once a step
/// fails, or `split` is called, the state must not be reused.
pub struct HandshakeState {
    role: Role,
    symmetric: SymmetricState,
    s: DhKeyPair,
    e: Option<DhKeyPair>,
    rs: Option<[u8; DH_LEN]>,
    re: Option<[u8; DH_LEN]>,
    step: Step,
}

impl HandshakeState {
    /// `initialize(protocol_name, prologue)`. XX has no pre-messages, so no
    /// static keys are pre-mixed.
    pub fn new(role: Role, prologue: &[u8], s: DhKeyPair) -> Self {
        let mut symmetric = SymmetricState::initialize(PROTOCOL_NAME);
        symmetric.mix_hash(prologue);
        Self {
            role,
            symmetric,
            s,
            e: None,
            rs: None,
            re: None,
            step: Step::Init,
        }
    }

    fn require(&mut self, expected: Step) -> Result<()> {
        if self.step == Step::Failed {
            return Err(Error::StateMisuse(
                "handshake already failed and cannot be reused".into(),
            ));
        }
        if self.step != expected {
            self.fail();
            return Err(Error::StateMisuse(format!(
                "expected step {expected:?}, got {:?}",
                self.step
            )));
        }
        Ok(())
    }

    fn fail(&mut self) {
        self.step = Step::Failed;
        self.e = None;
        self.rs = None;
        self.re = None;
    }

    fn generate_ephemeral(&mut self) -> &DhKeyPair {
        self.e = Some(DhKeyPair::generate());
        self.e.as_ref().expect("just inserted")
    }

    /// Message 1 — initiator writes `-> e`.
    pub fn write_message_1(&mut self) -> Result<Vec<u8>> {
        self.require(Step::Init)?;
        debug_assert_eq!(self.role, Role::Initiator);

        let e_pub = self.generate_ephemeral().public_bytes();
        self.symmetric.mix_hash(&e_pub);
        let payload = self
            .symmetric
            .encrypt_and_hash(&[])
            .map_err(|e| self.fail_with(e))?;

        let mut out = Vec::with_capacity(DH_LEN + payload.len());
        out.extend_from_slice(&e_pub);
        out.extend_from_slice(&payload);
        self.step = Step::Msg1Done;
        Ok(out)
    }

    /// Message 1 — responder reads `-> e`.
    pub fn read_message_1(&mut self, msg: &[u8]) -> Result<()> {
        self.require(Step::Init)?;
        debug_assert_eq!(self.role, Role::Responder);

        if msg.len() < DH_LEN {
            self.fail();
            return Err(Error::MalformedFrame("message 1 shorter than 32 bytes".into()));
        }
        let re: [u8; DH_LEN] = msg[..DH_LEN].try_into().expect("length checked above");
        self.symmetric.mix_hash(&re);
        self.re = Some(re);

        let payload = self
            .symmetric
            .decrypt_and_hash(&msg[DH_LEN..])
            .map_err(|e| self.fail_with(e))?;
        if !payload.is_empty() {
            self.fail();
            return Err(Error::MalformedFrame(
                "message 1 payload must be empty for libp2p XX".into(),
            ));
        }
        self.step = Step::Msg1Done;
        Ok(())
    }

    /// Message 2 — responder writes `<- e, ee, s, es`, attaching `payload`
    /// (the responder's signed libp2p payload).
    pub fn write_message_2(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.require(Step::Msg1Done)?;
        debug_assert_eq!(self.role, Role::Responder);

        let e_pub = self.generate_ephemeral().public_bytes();
        self.symmetric.mix_hash(&e_pub);

        let re = self.re.expect("set by read_message_1");
        let ee = primitives::dh(self.e.as_ref().expect("just generated"), &re)
            .map_err(|e| self.fail_with(e))?;
        self.symmetric.mix_key(&ee);

        let s_ct = self
            .symmetric
            .encrypt_and_hash(&self.s.public_bytes())
            .map_err(|e| self.fail_with(e))?;

        let se = primitives::dh(&self.s, &re).map_err(|e| self.fail_with(e))?;
        self.symmetric.mix_key(&se);

        let payload_ct = self
            .symmetric
            .encrypt_and_hash(payload)
            .map_err(|e| self.fail_with(e))?;

        let mut out = Vec::with_capacity(DH_LEN + s_ct.len() + payload_ct.len());
        out.extend_from_slice(&e_pub);
        out.extend_from_slice(&s_ct);
        out.extend_from_slice(&payload_ct);
        self.step = Step::Msg2Done;
        Ok(out)
    }

    /// Message 2 — initiator reads `<- e, ee, s, es`, returning the
    /// responder's static public key and its decrypted payload bytes.
    pub fn read_message_2(&mut self, msg: &[u8]) -> Result<([u8; DH_LEN], Vec<u8>)> {
        self.require(Step::Msg1Done)?;
        debug_assert_eq!(self.role, Role::Initiator);

        if msg.len() < DH_LEN + DH_LEN + TAG_LEN {
            self.fail();
            return Err(Error::MalformedFrame(
                "message 2 shorter than the minimum e + enc(s) length".into(),
            ));
        }
        let re: [u8; DH_LEN] = msg[..DH_LEN].try_into().expect("length checked above");
        self.symmetric.mix_hash(&re);
        self.re = Some(re);

        let ee = primitives::dh(self.e.as_ref().expect("set in write_message_1"), &re)
            .map_err(|e| self.fail_with(e))?;
        self.symmetric.mix_key(&ee);

        let s_field = &msg[DH_LEN..DH_LEN + DH_LEN + TAG_LEN];
        let rs_bytes = self
            .symmetric
            .decrypt_and_hash(s_field)
            .map_err(|e| self.fail_with(e))?;
        let rs: [u8; DH_LEN] = rs_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::MalformedFrame("decrypted remote static has wrong length".into()))
            .map_err(|e| self.fail_with(e))?;
        self.rs = Some(rs);

        let es = primitives::dh(self.e.as_ref().expect("set in write_message_1"), &rs)
            .map_err(|e| self.fail_with(e))?;
        self.symmetric.mix_key(&es);

        let payload = self
            .symmetric
            .decrypt_and_hash(&msg[DH_LEN + DH_LEN + TAG_LEN..])
            .map_err(|e| self.fail_with(e))?;

        self.step = Step::Msg2Done;
        Ok((rs, payload))
    }

    /// Message 3 — initiator writes `-> s, se`, attaching `payload` (the
    /// initiator's signed libp2p payload).
    pub fn write_message_3(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.require(Step::Msg2Done)?;
        debug_assert_eq!(self.role, Role::Initiator);

        let s_ct = self
            .symmetric
            .encrypt_and_hash(&self.s.public_bytes())
            .map_err(|e| self.fail_with(e))?;

        let re = self.re.expect("set in read_message_2");
        let se = primitives::dh(&self.s, &re).map_err(|e| self.fail_with(e))?;
        self.symmetric.mix_key(&se);

        let payload_ct = self
            .symmetric
            .encrypt_and_hash(payload)
            .map_err(|e| self.fail_with(e))?;

        let mut out = Vec::with_capacity(s_ct.len() + payload_ct.len());
        out.extend_from_slice(&s_ct);
        out.extend_from_slice(&payload_ct);
        self.step = Step::Done;
        Ok(out)
    }

    /// Message 3 — responder reads `-> s, se`, returning the initiator's
    /// static public key and its decrypted payload bytes.
    pub fn read_message_3(&mut self, msg: &[u8]) -> Result<([u8; DH_LEN], Vec<u8>)> {
        self.require(Step::Msg2Done)?;
        debug_assert_eq!(self.role, Role::Responder);

        if msg.len() < DH_LEN + TAG_LEN {
            self.fail();
            return Err(Error::MalformedFrame(
                "message 3 shorter than the minimum enc(s) length".into(),
            ));
        }
        let s_field = &msg[..DH_LEN + TAG_LEN];
        let rs_bytes = self
            .symmetric
            .decrypt_and_hash(s_field)
            .map_err(|e| self.fail_with(e))?;
        let rs: [u8; DH_LEN] = rs_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::MalformedFrame("decrypted remote static has wrong length".into()))
            .map_err(|e| self.fail_with(e))?;
        self.rs = Some(rs);

        let e = self.e.as_ref().expect("set in write_message_2");
        let se = primitives::dh(e, &rs).map_err(|e| self.fail_with(e))?;
        self.symmetric.mix_key(&se);

        let payload = self
            .symmetric
            .decrypt_and_hash(&msg[DH_LEN + TAG_LEN..])
            .map_err(|e| self.fail_with(e))?;

        self.step = Step::Done;
        Ok((rs, payload))
    }

    /// Consumes the completed handshake, producing `(cs1, cs2)` as defined
    /// by `SymmetricState::split`: `cs1` encrypts initiator→responder,
    /// `cs2` encrypts responder→initiator.
    pub fn split(mut self) -> Result<(CipherState, CipherState)> {
        self.require(Step::Done)?;
        Ok(self.symmetric.split())
    }

    /// The running handshake hash, usable as a channel-binding value.
    pub fn handshake_hash(&self) -> [u8; 32] {
        self.symmetric.handshake_hash()
    }

    /// Role this state was created with.
    pub fn role(&self) -> Role {
        self.role
    }

    fn fail_with(&mut self, err: Error) -> Error {
        self.fail();
        err
    }
}

impl Drop for HandshakeState {
    fn drop(&mut self) {
        if let Some(re) = self.re.as_mut() {
            re.zeroize();
        }
        if let Some(rs) = self.rs.as_mut() {
            rs.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_handshake() -> (HandshakeState, HandshakeState, Vec<u8>, Vec<u8>, Vec<u8>) {
        let i_static = DhKeyPair::generate();
        let r_static = DhKeyPair::generate();
        let mut initiator = HandshakeState::new(Role::Initiator, b"", i_static);
        let mut responder = HandshakeState::new(Role::Responder, b"", r_static);

        let msg1 = initiator.write_message_1().unwrap();
        responder.read_message_1(&msg1).unwrap();

        let msg2 = responder.write_message_2(b"responder-payload").unwrap();
        let (_, p2) = initiator.read_message_2(&msg2).unwrap();
        assert_eq!(p2, b"responder-payload");

        let msg3 = initiator.write_message_3(b"initiator-payload").unwrap();
        (initiator, responder, msg1, msg2, msg3)
    }

    #[test]
    fn full_handshake_produces_matching_cipher_pairs() {
        let (initiator, mut responder, _, _, msg3) = run_handshake();
        let (rs3, p3) = responder.read_message_3(&msg3).unwrap();
        assert_eq!(p3, b"initiator-payload");
        assert_eq!(rs3.len(), 32);

        let (mut i_cs1, mut i_cs2) = initiator.split().unwrap();
        let (mut r_cs1, mut r_cs2) = responder.split().unwrap();

        let ct = i_cs1.encrypt_with_ad(b"", b"hello").unwrap();
        assert_eq!(r_cs1.decrypt_with_ad(b"", &ct).unwrap(), b"hello");
        let ct2 = r_cs2.encrypt_with_ad(b"", b"world").unwrap();
        assert_eq!(i_cs2.decrypt_with_ad(b"", &ct2).unwrap(), b"world");
    }

    #[test]
    fn tampered_message_2_static_field_fails_auth() {
        let i_static = DhKeyPair::generate();
        let r_static = DhKeyPair::generate();
        let mut initiator = HandshakeState::new(Role::Initiator, b"", i_static);
        let mut responder = HandshakeState::new(Role::Responder, b"", r_static);

        let msg1 = initiator.write_message_1().unwrap();
        responder.read_message_1(&msg1).unwrap();
        let mut msg2 = responder.write_message_2(b"").unwrap();
        msg2[DH_LEN] ^= 1; // flip a bit inside enc(s)

        let err = initiator.read_message_2(&msg2).unwrap_err();
        assert!(matches!(err, Error::AeadAuthFailure));
    }

    #[test]
    fn low_order_ephemeral_is_rejected_before_payload() {
        let r_static = DhKeyPair::generate();
        let mut responder = HandshakeState::new(Role::Responder, b"", r_static);

        // An all-zero ephemeral is well-formed at the framing level; the
        // rejection only surfaces once it's used in a DH.
        let fake_msg1 = vec![0u8; DH_LEN];
        responder.read_message_1(&fake_msg1).unwrap();

        let err = responder.write_message_2(b"").unwrap_err();
        assert!(matches!(err, Error::InvalidPublicKey(_)));
    }

    #[test]
    fn steps_cannot_run_out_of_order() {
        let i_static = DhKeyPair::generate();
        let mut initiator = HandshakeState::new(Role::Initiator, b"", i_static);
        let err = initiator.write_message_3(b"").unwrap_err();
        assert!(matches!(err, Error::StateMisuse(_)));
    }

    #[test]
    fn handshake_state_is_single_use_after_failure() {
        let i_static = DhKeyPair::generate();
        let mut initiator = HandshakeState::new(Role::Initiator, b"", i_static);
        let _ = initiator.write_message_1().unwrap();
        // Calling write_message_1 again is out of order.
        let err = initiator.write_message_1().unwrap_err();
        assert!(matches!(err, Error::StateMisuse(_)));
        // And the state is now Failed, so every subsequent call also fails.
        let err2 = initiator.write_message_1().unwrap_err();
        assert!(matches!(err2, Error::StateMisuse(_)));
    }
}
