use std::{
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use mio::{net::TcpListener, Interest, Waker};
use tracing::{debug, error, info, warn};

use crate::{
    codec::MessageCodec,
    config::ReactorConfig,
    connection::{AcceptOutcome, Connection, ListenerEntry, PeerEntry, ReadOutcome, Role},
    error::{Result, SelectError},
    event::{Handle, ReadySet, Readiness},
    handler::{LoggingHandler, MessageHandler},
    poll::Multiplexer,
    registry::ConnectionRegistry,
};

/// How one ready set was consumed. `handled + skipped` always equals the size
/// of the set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IterationSummary {
    pub handled: usize,
    pub skipped: usize,
}

/// Stops a running [`Reactor`] from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Asks the loop to return after the ready set it is working on.
    pub fn shutdown(&self) -> io::Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        self.waker.wake()
    }
}

/// The single-threaded event loop driver.
///
/// Each iteration waits for one readiness snapshot and then processes every
/// entry in it exactly once:
///
/// ```text
/// Listener + readable ──▶ accept one ──▶ register Peer (read|write) ──▶ send greeting
/// Peer + writable     ──▶ flush queued outbound bytes
/// Peer + readable     ──▶ one bounded read ──▶ Data: decode ─┐
///                                          ├─▶ Empty: nothing │
///                                          └─▶ EOF: close     ▼
///                                                       on_message
/// ```
///
/// A failure on one peer closes that peer and nothing else. Only a failed
/// wait ends the loop.
pub struct Reactor<C, H = LoggingHandler> {
    multiplexer: Multiplexer,
    registry: ConnectionRegistry,
    codec: C,
    handler: H,
    config: ReactorConfig,
    read_buf: Vec<u8>,
    stop: Arc<AtomicBool>,
}

impl<C: MessageCodec> Reactor<C> {
    pub fn with_codec(config: ReactorConfig, codec: C) -> Result<Self> {
        Self::new(config, codec, LoggingHandler)
    }
}

impl<C: MessageCodec, H: MessageHandler> Reactor<C, H> {
    pub fn new(config: ReactorConfig, codec: C, handler: H) -> Result<Self> {
        config.validate()?;
        let multiplexer = Multiplexer::new(config.events_capacity, config.poll_timeout)?;
        Ok(Self {
            multiplexer,
            registry: ConnectionRegistry::new(),
            codec,
            handler,
            read_buf: vec![0; config.read_buffer_size],
            config,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Binds `addr` and registers the socket as a listener.
    pub fn listen(&mut self, addr: SocketAddr) -> Result<Handle> {
        let listener = TcpListener::bind(addr)?;
        self.add_listener(listener)
    }

    pub fn add_listener(&mut self, mut listener: TcpListener) -> Result<Handle> {
        let handle = self.multiplexer.register_listener(&mut listener)?;
        let entry = ListenerEntry::new(listener)?;
        info!(%handle, local_addr = %entry.local_addr(), "listening");
        self.registry.register(handle, Connection::Listener(entry))?;
        Ok(handle)
    }

    pub fn local_addr(&self, listener: Handle) -> Result<SocketAddr> {
        match self.registry.lookup(listener)? {
            Connection::Listener(entry) => Ok(entry.local_addr()),
            Connection::Peer(_) => Err(SelectError::RoleMismatch {
                handle: listener,
                expected: Role::Listener,
            }),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn peers(&self) -> Vec<Handle> {
        self.registry.peers().collect()
    }

    pub fn peer_count(&self) -> usize {
        self.registry.peers().count()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
            waker: self.multiplexer.waker(),
        }
    }

    /// Runs iterations until a [`ShutdownHandle`] fires or a wait fails.
    pub fn run(&mut self) -> Result<()> {
        info!("event loop running");
        while !self.stop.load(Ordering::SeqCst) {
            self.run_one_iteration()?;
        }
        info!("event loop stopped");
        Ok(())
    }

    /// Waits for one readiness snapshot and processes all of it.
    ///
    /// Returns an error only when the wait itself fails.
    pub fn run_one_iteration(&mut self) -> Result<()> {
        let ready = self.multiplexer.wait()?;
        self.dispatch(ready);
        Ok(())
    }

    /// Processes every entry of `ready` once, in the order given.
    pub fn dispatch(&mut self, ready: ReadySet) -> IterationSummary {
        let mut summary = IterationSummary::default();
        for readiness in ready {
            match self.process(readiness) {
                Ok(()) => summary.handled += 1,
                Err(e) => {
                    error!(handle = %readiness.handle(), error = %e, "skipping ready handle");
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    fn process(&mut self, readiness: Readiness) -> Result<()> {
        let handle = readiness.handle();
        match self.registry.role(handle)? {
            Role::Listener => {
                if readiness.is_readable() {
                    self.accept(handle)?;
                }
                Ok(())
            }
            Role::Peer => match self.service_peer(handle, readiness) {
                Err(e) if e.is_per_handle() => {
                    warn!(peer = %handle, error = %e, "closing peer after failure");
                    self.close_peer(handle);
                    Ok(())
                }
                other => other,
            },
        }
    }

    fn service_peer(&mut self, peer: Handle, readiness: Readiness) -> Result<()> {
        if readiness.is_writable() {
            let written = self.registry.peer_mut(peer)?.flush()?;
            if written > 0 {
                debug!(%peer, bytes = written, "flushed outbound");
            }
        }
        if readiness.is_readable() {
            self.read_peer(peer)?;
        }
        Ok(())
    }

    /// Accepts at most one pending connection.
    ///
    /// The greeting is flushed without blocking, so it is fully sent before
    /// this returns only while the new socket's send buffer has room for it.
    fn accept(&mut self, listener: Handle) -> Result<()> {
        let entry = self.registry.listener_mut(listener)?;
        let outcome = entry.accept_one();

        // Further pending connections surface on the next wait.
        if outcome.needs_rearm() {
            if let Err(e) = self
                .multiplexer
                .rearm(&mut entry.socket, listener, Interest::READABLE)
            {
                warn!(%listener, error = %e, "failed to re-arm listener");
            }
        }

        let (mut stream, peer_addr) = match outcome {
            AcceptOutcome::Accepted(stream, peer_addr) => (stream, peer_addr),
            AcceptOutcome::Empty => return Ok(()),
            AcceptOutcome::Failed(e) => {
                warn!(%listener, error = %e, "accept failed");
                return Ok(());
            }
        };

        if let Err(e) = stream.set_nodelay(self.config.no_delay) {
            warn!(%peer_addr, error = %e, "failed to set TCP_NODELAY");
        }

        let interest = Interest::READABLE | Interest::WRITABLE;
        let peer = match self.multiplexer.register_peer(&mut stream, interest) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%peer_addr, error = %e, "failed to register peer");
                return Ok(());
            }
        };

        let mut entry = PeerEntry::new(stream, peer_addr, interest);
        entry.queue(&self.config.greeting);
        self.registry.register(peer, Connection::Peer(entry))?;
        info!(%peer, %peer_addr, "accepted connection");
        self.handler.on_connect(peer, peer_addr);

        match self.registry.peer_mut(peer)?.flush() {
            Ok(written) => debug!(%peer, bytes = written, "greeting sent"),
            Err(e) => {
                warn!(%peer, error = %e, "failed to send greeting");
                self.close_peer(peer);
            }
        }
        Ok(())
    }

    fn read_peer(&mut self, peer: Handle) -> Result<()> {
        let entry = self.registry.peer_mut(peer)?;
        let outcome = entry.read_once(&mut self.read_buf)?;
        if outcome.needs_rearm() {
            // The edge is spent but the socket may still hold bytes or the EOF.
            let interest = entry.interest();
            self.multiplexer.rearm(&mut entry.stream, peer, interest)?;
        }

        let n = match outcome {
            ReadOutcome::Empty | ReadOutcome::Interrupted => return Ok(()),
            ReadOutcome::Eof => {
                debug!(%peer, "peer reached end of stream");
                self.close_peer(peer);
                return Ok(());
            }
            ReadOutcome::Data(n) => n,
        };

        let chunk = &self.read_buf[..n];
        debug!(%peer, bytes = n, data = %String::from_utf8_lossy(chunk), "read from peer");

        let entry = self.registry.peer_mut(peer)?;
        entry.inbound.extend_from_slice(chunk);
        let messages = self.codec.decode(peer, &mut entry.inbound)?;
        for message in messages {
            self.handler.on_message(peer, message);
        }
        Ok(())
    }

    /// Deregisters, removes and drops a peer. Absent handles and listeners
    /// are left alone.
    fn close_peer(&mut self, peer: Handle) {
        if !matches!(self.registry.role(peer), Ok(Role::Peer)) {
            return;
        }
        if let Some(Connection::Peer(mut entry)) = self.registry.remove(peer) {
            if let Err(e) = self.multiplexer.deregister(&mut entry.stream) {
                debug!(%peer, error = %e, "deregister failed during close");
            }
            info!(%peer, peer_addr = %entry.peer_addr(), "closed connection");
            drop(entry);
            self.codec.on_close(peer);
            self.handler.on_disconnect(peer);
        }
    }

    /// Closes a peer. Closing a peer that is already gone succeeds.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        match self.registry.role(handle) {
            Ok(Role::Peer) => {
                self.close_peer(handle);
                Ok(())
            }
            Ok(Role::Listener) => Err(SelectError::RoleMismatch {
                handle,
                expected: Role::Peer,
            }),
            Err(SelectError::MissingAttachment(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Queues `data` for `peer` and writes as much as the socket accepts now.
    /// The rest goes out on later writable events.
    pub fn send(&mut self, peer: Handle, data: &[u8]) -> Result<()> {
        let entry = self.registry.peer_mut(peer).map_err(|e| match e {
            SelectError::MissingAttachment(h) => SelectError::StaleHandle(h),
            other => other,
        })?;
        entry.queue(data);
        if let Err(e) = entry.flush() {
            warn!(%peer, error = %e, "send failed");
            self.close_peer(peer);
            return Err(e.into());
        }
        Ok(())
    }

    /// Sends `data` to every live peer and returns how many took it.
    pub fn broadcast(&mut self, data: &[u8]) -> usize {
        self.peers()
            .into_iter()
            .filter(|peer| self.send(*peer, data).is_ok())
            .count()
    }
}
