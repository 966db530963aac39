//! The seam between raw peer bytes and structured messages.
//!
//! The reactor appends every chunk it reads to the peer's inbound buffer and
//! then hands that buffer to a [`MessageCodec`]. The codec removes whatever it
//! can frame and returns the decoded messages; anything it leaves behind is
//! kept for the next read. The framing itself belongs to the codec.

use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::event::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode(pub u16);

/// Identifies who a message is from or where it is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub opcode: OpCode,
    pub source: Address,
    pub destination: Address,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame from {peer}: {reason}")]
    Malformed { peer: Handle, reason: String },
}

/// Incremental decoder fed by the reactor.
pub trait MessageCodec {
    /// Consumes complete messages from the front of `inbound`.
    ///
    /// Called once per non-empty read with the peer's accumulated bytes.
    /// Returning an error closes the peer.
    fn decode(&mut self, peer: Handle, inbound: &mut Vec<u8>) -> Result<Vec<Message>, CodecError>;

    /// The peer is gone; drop any state kept for it.
    fn on_close(&mut self, peer: Handle) {
        let _ = peer;
    }
}

/// Accepts any bytes and produces no messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardCodec;

impl MessageCodec for DiscardCodec {
    fn decode(&mut self, peer: Handle, inbound: &mut Vec<u8>) -> Result<Vec<Message>, CodecError> {
        trace!(%peer, bytes = inbound.len(), "discarding inbound bytes");
        inbound.clear();
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mio::Token;

    #[test]
    fn test_discard_codec_clears_buffer() {
        let mut codec = DiscardCodec;
        let mut inbound = b"hello".to_vec();
        let messages = codec.decode(Handle::from(Token(1)), &mut inbound).unwrap();
        assert!(messages.is_empty());
        assert!(inbound.is_empty());
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address(255).to_string(), "0xff");
    }
}
