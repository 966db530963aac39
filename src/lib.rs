//! # uplift-select
//! A single-threaded, readiness-based TCP event loop for the Uplift messaging layer.
//!
//! The loop accepts connections on one or more listening sockets, greets every new peer,
//! and feeds the bytes each peer sends into a pluggable [`MessageCodec`]. Decoded messages
//! are handed to a [`MessageHandler`]. Everything runs on the thread that drives the loop;
//! the only blocking call is the readiness wait.
//!
//! ## Architecture Overview
//! ```text
//! ┌──────────────┐  wait()   ┌──────────────┐  lookup   ┌────────────────────┐
//! │ Multiplexer  │──────────▶│   Reactor    │─────────▶│ ConnectionRegistry │
//! │ (mio::Poll)  │ ReadySet  │  (dispatch)  │◀─────────│ Handle → Connection│
//! └──────────────┘           └──────┬───────┘  mutate   └────────────────────┘
//!                                   │ bytes
//!                                   ▼
//!                            ┌──────────────┐ Message ┌────────────────┐
//!                            │ MessageCodec │────────▶│ MessageHandler │
//!                            └──────────────┘         └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uplift_select::{DiscardCodec, Reactor, ReactorConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reactor = Reactor::with_codec(ReactorConfig::default(), DiscardCodec)?;
//!     reactor.listen("127.0.0.1:8080".parse()?)?;
//!
//!     // Blocks until a ShutdownHandle fires or the readiness wait fails.
//!     reactor.run()?;
//!     Ok(())
//! }
//! ```
//!
//! Callers that want to own the loop can call [`Reactor::run_one_iteration`] themselves.
//!
//! - [`reactor`]: the driver and its accept / read / close transitions
//! - [`registry`]: per-handle connection entries
//! - [`poll`]: the readiness multiplexer
//! - [`codec`]: the message codec seam
//! - [`error`]: error taxonomy

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod handler;
pub mod poll;
pub mod reactor;
pub mod registry;

pub use codec::{Address, CodecError, DiscardCodec, Message, MessageCodec, OpCode};
pub use config::ReactorConfig;
pub use connection::{Connection, Role};
pub use error::{Result, SelectError};
pub use event::{Handle, ReadySet, Readiness};
pub use handler::{LoggingHandler, MessageHandler};
pub use reactor::{IterationSummary, Reactor, ShutdownHandle};
pub use registry::ConnectionRegistry;

/// Re-exports of the items most programs need.
///
/// ```rust
/// use uplift_select::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::{Message, MessageCodec};
    pub use crate::config::ReactorConfig;
    pub use crate::event::Handle;
    pub use crate::handler::MessageHandler;
    pub use crate::reactor::{Reactor, ShutdownHandle};
}
