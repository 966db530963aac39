use std::{io, sync::Arc, time::Duration};

use mio::{event::Source, net::TcpListener, net::TcpStream, Events, Interest, Poll, Token, Waker};
use tracing::trace;

use crate::{
    error::{Result, SelectError},
    event::{Handle, ReadySet, Readiness},
};

/// Reserved for the shutdown waker; never handed out as a [`Handle`].
pub(crate) const WAKE_TOKEN: Token = Token(0);

/// Wraps the OS readiness facility behind [`mio::Poll`].
///
/// The multiplexer hands out handles, registers sockets under them, and turns
/// each wait into an owned [`ReadySet`]. Because the set is a copy,
/// deregistering a handle while a set that mentions it is still being
/// processed only affects later waits.
pub struct Multiplexer {
    poller: Poll,
    events: Events,
    timeout: Option<Duration>,
    waker: Arc<Waker>,
    next_token: usize,
}

impl Multiplexer {
    pub fn new(events_capacity: usize, timeout: Option<Duration>) -> io::Result<Self> {
        let poller = Poll::new()?;
        let waker = Waker::new(poller.registry(), WAKE_TOKEN)?;
        Ok(Multiplexer {
            poller,
            events: Events::with_capacity(events_capacity),
            timeout,
            waker: Arc::new(waker),
            next_token: WAKE_TOKEN.0 + 1,
        })
    }

    /// Blocks until at least one registered handle is ready, or until the
    /// configured timeout elapses (then the set is empty).
    ///
    /// Waker notifications are filtered out. A wait interrupted by a signal
    /// yields an empty set rather than an error.
    pub fn wait(&mut self) -> Result<ReadySet> {
        match self.poller.poll(&mut self.events, self.timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(ReadySet::default()),
            Err(e) => return Err(SelectError::Multiplex(e)),
        }

        let ready: ReadySet = self
            .events
            .iter()
            .filter(|event| event.token() != WAKE_TOKEN)
            .map(Readiness::from)
            .collect();
        trace!(ready = ready.len(), "readiness wait returned");
        Ok(ready)
    }

    /// Registers a listening socket for the acceptable interest.
    pub fn register_listener(&mut self, listener: &mut TcpListener) -> io::Result<Handle> {
        self.register(listener, Interest::READABLE)
    }

    /// Registers a connected stream. mio streams are always non-blocking.
    pub fn register_peer(&mut self, stream: &mut TcpStream, interest: Interest) -> io::Result<Handle> {
        self.register(stream, interest)
    }

    fn register<S>(&mut self, source: &mut S, interest: Interest) -> io::Result<Handle>
    where
        S: Source + ?Sized,
    {
        let token = Token(self.next_token);
        self.poller.registry().register(source, token, interest)?;
        self.next_token += 1;
        Ok(Handle::from(token))
    }

    /// Re-registers `source` with the same interest so readiness that is
    /// still pending gets reported again on the next wait.
    pub fn rearm<S>(&self, source: &mut S, handle: Handle, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller
            .registry()
            .reregister(source, handle.token(), interest)
    }

    pub fn deregister<S>(&self, source: &mut S) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.registry().deregister(source)
    }

    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }
}
