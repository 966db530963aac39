//! Per-handle connection state.
//!
//! Every registered handle maps to exactly one [`Connection`]. The variant is
//! the role: a [`ListenerEntry`] owns a listening socket, a [`PeerEntry`]
//! owns an accepted stream together with its inbound decode buffer and its
//! outbound write queue.
//!
//! ```text
//!   Connection::Listener ──accept──▶ Connection::Peer { stream, inbound, outbound }
//!                                          │
//!                                  EOF / I/O error
//!                                          ▼
//!                                 removed + socket dropped
//! ```

use mio::net::{TcpListener, TcpStream};
use mio::Interest;
use std::io::{self, Read, Write};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Listener,
    Peer,
}

#[derive(Debug)]
pub enum Connection {
    Listener(ListenerEntry),
    Peer(PeerEntry),
}

impl Connection {
    pub fn role(&self) -> Role {
        match self {
            Connection::Listener(_) => Role::Listener,
            Connection::Peer(_) => Role::Peer,
        }
    }
}

/// A listening socket. Lives for as long as the reactor does.
#[derive(Debug)]
pub struct ListenerEntry {
    pub(crate) socket: TcpListener,
    local_addr: SocketAddr,
}

impl ListenerEntry {
    pub fn new(socket: TcpListener) -> io::Result<Self> {
        let local_addr = socket.local_addr()?;
        Ok(Self { socket, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Exactly one accept call.
    pub(crate) fn accept_one(&mut self) -> AcceptOutcome {
        match self.socket.accept() {
            Ok((stream, addr)) => AcceptOutcome::Accepted(stream, addr),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => AcceptOutcome::Empty,
            Err(e) => AcceptOutcome::Failed(e),
        }
    }
}

/// Result of a single accept call.
#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted(TcpStream, SocketAddr),
    /// The backlog is empty.
    Empty,
    /// The call failed; the backlog may still hold connections.
    Failed(io::Error),
}

impl AcceptOutcome {
    /// Anything but an empty backlog consumed the readiness edge without
    /// proving the backlog drained, so the listener must be re-armed.
    pub fn needs_rearm(&self) -> bool {
        !matches!(self, AcceptOutcome::Empty)
    }
}

/// Result of a single bounded read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Nothing available right now.
    Empty,
    /// The read was cut short by a signal before any byte moved.
    Interrupted,
    /// `n` bytes were placed at the front of the buffer.
    Data(usize),
    /// The peer shut down its side of the stream.
    Eof,
}

impl ReadOutcome {
    /// Only a would-block read proves the socket is drained. After anything
    /// else more bytes or the EOF may already be queued behind the edge that
    /// was just consumed.
    pub fn needs_rearm(&self) -> bool {
        matches!(self, ReadOutcome::Data(_) | ReadOutcome::Interrupted)
    }
}

/// An accepted stream.
#[derive(Debug)]
pub struct PeerEntry {
    pub(crate) stream: TcpStream,
    peer_addr: SocketAddr,
    interest: Interest,
    pub(crate) inbound: Vec<u8>,
    outbound: Vec<u8>,
}

impl PeerEntry {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, interest: Interest) -> Self {
        Self {
            stream,
            peer_addr,
            interest,
            inbound: Vec::new(),
            outbound: Vec::new(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    /// Bytes received but not yet consumed by the codec.
    pub fn inbound(&self) -> &[u8] {
        &self.inbound
    }

    /// Bytes queued for this peer but not yet accepted by the socket.
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    pub(crate) fn queue(&mut self, data: &[u8]) {
        self.outbound.extend_from_slice(data);
    }

    /// Exactly one read call into `buf`; never loops to drain the socket.
    pub(crate) fn read_once(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        match self.stream.read(buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(ReadOutcome::Empty),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(ReadOutcome::Interrupted),
            Err(e) => Err(e),
        }
    }

    /// Writes as much of the outbound queue as the socket takes without
    /// blocking. Returns the number of bytes written by this call; whatever
    /// remains waits for the next writable event.
    pub(crate) fn flush(&mut self) -> io::Result<usize> {
        let mut written = 0;
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.outbound.drain(..n);
                    written += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    pub(crate) fn bound_listener() -> ListenerEntry {
        let socket = TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        ListenerEntry::new(socket).unwrap()
    }

    /// Connects a blocking client and spins on accept until the server side
    /// shows up.
    pub(crate) fn connected_pair(listener: &mut ListenerEntry) -> (std::net::TcpStream, PeerEntry) {
        let client = std::net::TcpStream::connect(listener.local_addr()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match listener.accept_one() {
                AcceptOutcome::Accepted(stream, addr) => {
                    let peer =
                        PeerEntry::new(stream, addr, Interest::READABLE | Interest::WRITABLE);
                    return (client, peer);
                }
                AcceptOutcome::Empty => {}
                AcceptOutcome::Failed(e) => panic!("accept failed: {e}"),
            }
            assert!(Instant::now() < deadline, "no connection accepted");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn read_until(peer: &mut PeerEntry, buf: &mut [u8]) -> ReadOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match peer.read_once(buf).unwrap() {
                ReadOutcome::Empty if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                outcome => return outcome,
            }
        }
    }

    #[test]
    fn test_accept_without_pending_connection() {
        let mut listener = bound_listener();
        let outcome = listener.accept_one();
        assert!(matches!(outcome, AcceptOutcome::Empty));
        assert!(!outcome.needs_rearm());
    }

    #[test]
    fn test_accept_outcomes_that_need_rearm() {
        let failed = AcceptOutcome::Failed(io::ErrorKind::ConnectionAborted.into());
        assert!(failed.needs_rearm());

        let mut listener = bound_listener();
        let (_client, _peer) = connected_pair(&mut listener);
        let _second = std::net::TcpStream::connect(listener.local_addr()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let accepted = loop {
            match listener.accept_one() {
                AcceptOutcome::Empty if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                outcome => break outcome,
            }
        };
        assert!(matches!(accepted, AcceptOutcome::Accepted(..)));
        assert!(accepted.needs_rearm());
    }

    #[test]
    fn test_read_outcomes_that_need_rearm() {
        assert!(ReadOutcome::Data(5).needs_rearm());
        assert!(ReadOutcome::Data(20).needs_rearm());
        assert!(ReadOutcome::Interrupted.needs_rearm());
        assert!(!ReadOutcome::Empty.needs_rearm());
        assert!(!ReadOutcome::Eof.needs_rearm());
    }

    #[test]
    fn test_read_once_is_bounded_by_buffer() {
        let mut listener = bound_listener();
        let (mut client, mut peer) = connected_pair(&mut listener);
        client.write_all(&[7u8; 50]).unwrap();

        let mut buf = [0u8; 20];
        assert_eq!(read_until(&mut peer, &mut buf), ReadOutcome::Data(20));
        assert_eq!(buf, [7u8; 20]);
    }

    #[test]
    fn test_read_once_reports_empty_then_eof() {
        let mut listener = bound_listener();
        let (client, mut peer) = connected_pair(&mut listener);

        let mut buf = [0u8; 20];
        assert_eq!(peer.read_once(&mut buf).unwrap(), ReadOutcome::Empty);

        drop(client);
        assert_eq!(read_until(&mut peer, &mut buf), ReadOutcome::Eof);
    }

    #[test]
    fn test_flush_drains_queue() {
        let mut listener = bound_listener();
        let (mut client, mut peer) = connected_pair(&mut listener);

        peer.queue(b"Welcome ");
        peer.queue(b"client!");
        assert_eq!(peer.pending_outbound(), 15);
        assert_eq!(peer.flush().unwrap(), 15);
        assert_eq!(peer.pending_outbound(), 0);

        let mut received = [0u8; 15];
        client.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"Welcome client!");
    }

    #[test]
    fn test_role() {
        let listener = Connection::Listener(bound_listener());
        assert_eq!(listener.role(), Role::Listener);
    }
}
