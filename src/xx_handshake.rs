//! Component F — the `propose`/`exchange`/`finish` orchestrator: binds the
//! raw Noise_XX message flow in [`crate::handshake_state`] to libp2p
//! payloads, peer-ID checks, and length-prefixed framing.

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::handshake_state::{HandshakeState, Role};
use crate::identity::Verifier;
use crate::payload::HandshakePayload;
use crate::primitives::DhKeyPair;
use crate::transport::TransportSession;

/// Upper bound on a single handshake message, matching the 16-bit length
/// prefix used to frame it on the wire.
pub const MAX_HANDSHAKE_MESSAGE_LEN: usize = 65535;

/// A duplex byte transport the handshake reads and writes length-prefixed
/// frames over. Implementations are synchronous; callers running inside an
/// async runtime adapt at their own boundary rather than this crate taking
/// on an executor dependency.
pub trait Transport {
    /// Writes `frame` verbatim (the caller has already length-prefixed it).
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Reads exactly one length-prefixed frame's body.
    fn read_frame(&mut self) -> Result<Vec<u8>>;
}

/// The step an [`XxHandshake`] is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Fresh,
    Proposed,
    Exchanged,
    Finished,
}

/// Drives a complete Noise_XX handshake over a [`Transport`], producing a
/// [`TransportSession`] on success.
///
/// Call order is fixed: `propose`, then `exchange`, then `finish`. Calling
/// out of order is an [`Error::StateMisuse`]. The caller prepares its own
/// libp2p handshake payload (see [`crate::payload::HandshakePayload`]) ahead
/// of time and hands over the encoded bytes; this type only knows how to
/// carry and verify them against the remote's Noise static key.
pub struct XxHandshake<'a> {
    inner: HandshakeState,
    verifier: &'a dyn Verifier,
    local_payload: Vec<u8>,
    expected_peer_id: Option<Vec<u8>>,
    step: Step,
    remote_static: Option<[u8; 32]>,
    remote_payload: Option<HandshakePayload>,
}

impl<'a> XxHandshake<'a> {
    /// Creates a new handshake. `expected_peer_id`, if given, is checked
    /// against the remote's payload during the step that receives it.
    pub fn new(
        role: Role,
        prologue: &[u8],
        noise_static_key: DhKeyPair,
        local_payload: Vec<u8>,
        verifier: &'a dyn Verifier,
        expected_peer_id: Option<Vec<u8>>,
    ) -> Self {
        Self {
            inner: HandshakeState::new(role, prologue, noise_static_key),
            verifier,
            local_payload,
            expected_peer_id,
            step: Step::Fresh,
            remote_static: None,
            remote_payload: None,
        }
    }

    fn require(&self, expected: Step) -> Result<()> {
        if self.step != expected {
            return Err(Error::StateMisuse(format!(
                "expected step {expected:?}, got {:?}",
                self.step
            )));
        }
        Ok(())
    }

    /// Message 1: initiator sends `e`; responder receives it.
    pub fn propose(&mut self, transport: &mut dyn Transport) -> Result<()> {
        self.require(Step::Fresh)?;
        match self.inner.role() {
            Role::Initiator => {
                trace!(role = "initiator", step = "propose", "sending message 1");
                let msg = self.inner.write_message_1()?;
                write_framed(transport, &msg)?;
            }
            Role::Responder => {
                trace!(role = "responder", step = "propose", "awaiting message 1");
                let msg = read_framed(transport)?;
                self.inner.read_message_1(&msg)?;
            }
        }
        self.step = Step::Proposed;
        Ok(())
    }

    /// Message 2: responder sends its payload; initiator receives and
    /// verifies it.
    pub fn exchange(&mut self, transport: &mut dyn Transport) -> Result<()> {
        self.require(Step::Proposed)?;
        match self.inner.role() {
            Role::Responder => {
                trace!(role = "responder", step = "exchange", "sending message 2");
                let msg = self.inner.write_message_2(&self.local_payload.clone())?;
                write_framed(transport, &msg)?;
            }
            Role::Initiator => {
                trace!(role = "initiator", step = "exchange", "awaiting message 2");
                let msg = read_framed(transport)?;
                let (remote_static, payload_bytes) = self.inner.read_message_2(&msg)?;
                let payload = HandshakePayload::decode(&payload_bytes).map_err(|e| {
                    warn!(role = "initiator", "message 2 payload decode failed");
                    e
                })?;
                payload.verify(
                    self.verifier,
                    &remote_static,
                    self.expected_peer_id.as_deref(),
                )?;
                self.remote_static = Some(remote_static);
                self.remote_payload = Some(payload);
            }
        }
        self.step = Step::Exchanged;
        Ok(())
    }

    /// Message 3: initiator sends its payload; responder receives and
    /// verifies it.
    pub fn finish(mut self, transport: &mut dyn Transport) -> Result<TransportSession> {
        self.require(Step::Exchanged)?;
        match self.inner.role() {
            Role::Initiator => {
                debug!(role = "initiator", "sending message 3");
                let msg = self.inner.write_message_3(&self.local_payload.clone())?;
                write_framed(transport, &msg)?;
            }
            Role::Responder => {
                debug!(role = "responder", "awaiting message 3");
                let msg = read_framed(transport)?;
                let (remote_static, payload_bytes) = self.inner.read_message_3(&msg)?;
                let payload = HandshakePayload::decode(&payload_bytes)?;
                payload.verify(
                    self.verifier,
                    &remote_static,
                    self.expected_peer_id.as_deref(),
                )?;
                self.remote_static = Some(remote_static);
                self.remote_payload = Some(payload);
            }
        }
        self.step = Step::Finished;

        let handshake_hash = self.inner.handshake_hash();
        let role = self.inner.role();
        let (cs1, cs2) = self.inner.split()?;
        let remote_static = self
            .remote_static
            .expect("set by exchange/finish on the corresponding receiving side");
        let remote_payload = self
            .remote_payload
            .expect("set by exchange/finish on the corresponding receiving side");
        debug!("handshake complete");
        Ok(TransportSession::new(
            role,
            cs1,
            cs2,
            handshake_hash,
            remote_static,
            remote_payload,
        ))
    }
}

fn write_framed(transport: &mut dyn Transport, msg: &[u8]) -> Result<()> {
    if msg.len() > MAX_HANDSHAKE_MESSAGE_LEN {
        return Err(Error::MalformedFrame(
            "handshake message exceeds 65535 bytes".into(),
        ));
    }
    let mut framed = Vec::with_capacity(2 + msg.len());
    framed.extend_from_slice(&(msg.len() as u16).to_be_bytes());
    framed.extend_from_slice(msg);
    transport.write_frame(&framed)
}

fn read_framed(transport: &mut dyn Transport) -> Result<Vec<u8>> {
    let frame = transport.read_frame()?;
    if frame.len() < 2 {
        return Err(Error::MalformedFrame(
            "frame shorter than length prefix".into(),
        ));
    }
    let len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    if frame.len() != 2 + len {
        return Err(Error::MalformedFrame(
            "length prefix disagrees with frame body".into(),
        ));
    }
    Ok(frame[2..].to_vec())
}
