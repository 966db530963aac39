use std::net::SocketAddr;

use tracing::info;

use crate::{codec::Message, event::Handle};

/// Application callbacks driven by the reactor.
///
/// All callbacks run on the loop thread, in the middle of processing a ready
/// set. Only `on_message` is required.
pub trait MessageHandler {
    /// Called after a peer is accepted and registered.
    fn on_connect(&mut self, peer: Handle, addr: SocketAddr) {
        let _ = (peer, addr);
    }

    /// Called for each message the codec decodes.
    fn on_message(&mut self, peer: Handle, message: Message);

    /// Called after a peer's entry and socket are gone.
    fn on_disconnect(&mut self, peer: Handle) {
        let _ = peer;
    }
}

/// Logs decoded messages and otherwise does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl MessageHandler for LoggingHandler {
    fn on_message(&mut self, peer: Handle, message: Message) {
        info!(
            %peer,
            opcode = message.opcode.0,
            source = %message.source,
            destination = %message.destination,
            payload = message.payload.len(),
            "decoded message"
        );
    }
}
