use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::{codec::CodecError, connection::Role, event::Handle};

pub type Result<T> = StdResult<T, SelectError>;

/// Failure modes of the event loop and its registry.
///
/// Only [`SelectError::Multiplex`] is fatal to the loop. Everything else is
/// scoped to a single handle or a single call.
#[derive(Debug, Error)]
pub enum SelectError {
    /// The readiness wait failed at the OS level.
    #[error("Multiplexer Error: {0}")]
    Multiplex(#[source] io::Error),
    /// A ready handle has no registry entry.
    #[error("No connection entry attached to {0}")]
    MissingAttachment(Handle),
    /// `register` was called with a handle that already has an entry.
    #[error("{0} is already registered")]
    DuplicateHandle(Handle),
    /// The handle named a peer that has since been closed.
    #[error("{0} has already been closed")]
    StaleHandle(Handle),
    /// A role-specific operation was applied to the other role.
    #[error("{handle} is not a {expected:?}")]
    RoleMismatch { handle: Handle, expected: Role },
    /// The codec rejected a peer's bytes.
    #[error("Codec Error: {0}")]
    Codec(#[from] CodecError),
    /// The reactor configuration is unusable.
    #[error("Configuration Error: {0}")]
    Configuration(String),
    /// A socket operation failed outside the readiness wait.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
}

impl SelectError {
    /// Whether this error should close the peer it occurred on rather than
    /// propagate out of the loop.
    pub(crate) fn is_per_handle(&self) -> bool {
        matches!(self, SelectError::Io(_) | SelectError::Codec(_))
    }
}
