use mio::{event::Event, Token};
use std::{fmt, vec};

/// Opaque identifier for one registered socket.
///
/// Handles wrap the [`mio::Token`] the socket was registered under. They are
/// handed out by the multiplexer from a counter that never repeats, so a
/// handle that outlives its connection can never name a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(Token);

impl Handle {
    pub fn token(self) -> Token {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 .0
    }
}

impl From<Token> for Handle {
    fn from(token: Token) -> Self {
        Handle(token)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0 .0)
    }
}

/// Readiness of one handle, copied out of the OS event so it stays valid
/// after the handle is deregistered.
///
/// For a listener, `readable` means a connection can be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    handle: Handle,
    is_readable: bool,
    is_writable: bool,
}

impl Readiness {
    pub fn new(handle: Handle, is_readable: bool, is_writable: bool) -> Self {
        Self {
            handle,
            is_readable,
            is_writable,
        }
    }

    pub fn readable(handle: Handle) -> Self {
        Self::new(handle, true, false)
    }

    pub fn writable(handle: Handle) -> Self {
        Self::new(handle, false, true)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn is_readable(&self) -> bool {
        self.is_readable
    }

    pub fn is_writable(&self) -> bool {
        self.is_writable
    }
}

impl From<&Event> for Readiness {
    fn from(event: &Event) -> Self {
        // Hangups and socket errors surface as readable so the next read
        // observes the EOF or the error itself.
        let is_readable = event.is_readable() || event.is_read_closed() || event.is_error();
        Self {
            handle: Handle(event.token()),
            is_readable,
            is_writable: event.is_writable(),
        }
    }
}

/// The readiness snapshot produced by one wait.
///
/// A `ReadySet` is owned and consumed by value: iterating it moves each entry
/// out exactly once, and nothing carries over to the next wait.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadySet {
    entries: Vec<Readiness>,
}

impl ReadySet {
    pub fn new(entries: Vec<Readiness>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Readiness> for ReadySet {
    fn from_iter<I: IntoIterator<Item = Readiness>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ReadySet {
    type Item = Readiness;
    type IntoIter = vec::IntoIter<Readiness>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        let handle = Handle::from(Token(42));
        assert_eq!(handle.to_string(), "handle#42");
        assert_eq!(handle.as_usize(), 42);
        assert_eq!(handle.token(), Token(42));
    }

    #[test]
    fn test_ready_set_is_consumed_once() {
        let a = Handle::from(Token(1));
        let b = Handle::from(Token(2));
        let ready: ReadySet = [Readiness::readable(a), Readiness::writable(b)]
            .into_iter()
            .collect();
        assert_eq!(ready.len(), 2);

        let seen: Vec<Handle> = ready.into_iter().map(|r| r.handle()).collect();
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn test_readiness_constructors() {
        let handle = Handle::from(Token(5));
        let r = Readiness::readable(handle);
        assert!(r.is_readable() && !r.is_writable());
        let w = Readiness::writable(handle);
        assert!(!w.is_readable() && w.is_writable());
    }
}
