//! An in-memory duplex byte pipe implementing `Transport`, for exercising a
//! full handshake within a single test process without real sockets.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use libp2p_noise_xx::error::{Error, Result};
use libp2p_noise_xx::Transport;

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// One end of an in-memory duplex pipe.
pub struct DuplexEnd {
    outbound: Queue,
    inbound: Queue,
}

/// Builds a connected pair of `DuplexEnd`s: writes on one side become reads
/// on the other.
pub fn pair() -> (DuplexEnd, DuplexEnd) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
    (
        DuplexEnd {
            outbound: a_to_b.clone(),
            inbound: b_to_a.clone(),
        },
        DuplexEnd {
            outbound: b_to_a,
            inbound: a_to_b,
        },
    )
}

impl DuplexEnd {
    /// Flips one bit of byte `index` within the most recently written
    /// frame's body (after the 2-byte length prefix), simulating an
    /// on-the-wire tamper visible to whichever end reads it next.
    pub fn corrupt_last_outbound_body_byte(&self, index: usize) {
        let mut queue = self.outbound.borrow_mut();
        let frame = queue.back_mut().expect("a frame was written");
        frame[2 + index] ^= 1;
    }
}

impl Transport for DuplexEnd {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.outbound.borrow_mut().push_back(frame.to_vec());
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>> {
        self.inbound
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::Transport("no frame available".into()))
    }
}
