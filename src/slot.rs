//! Connection slot: the single peer the bridge talks to.
//!
//! The slot is `Absent` or `Connected`. Accepting always closes the previous
//! peer first, so two connections are never current at once. An
//! error/hangup on the peer simply empties the slot; the acceptor keeps
//! listening for the next client.

use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};

use crate::error::{BridgeError, IoOp, Result};

/// Source of peer connections.
///
/// [`RendezvousEndpoint`](crate::RendezvousEndpoint) is the real
/// implementation; tests and alternative transports can supply their own.
pub trait Acceptor {
    /// Connection type produced by [`accept_peer`](Self::accept_peer).
    type Peer: Read + Write + AsRawFd;

    /// Listening descriptor, or `None` when not listening.
    fn descriptor(&self) -> Option<RawFd>;

    /// Accept one pending connection without blocking.
    fn accept_peer(&mut self) -> io::Result<Self::Peer>;
}

/// Holds at most one peer connection.
#[derive(Debug)]
pub struct ConnectionSlot<P> {
    peer: Option<P>,
}

impl<P: AsRawFd> ConnectionSlot<P> {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self { peer: None }
    }

    /// Descriptor of the current peer, if connected.
    pub fn descriptor(&self) -> Option<RawFd> {
        self.peer.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// True while a peer is connected.
    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    /// Mutable access to the current peer.
    pub fn peer_mut(&mut self) -> Option<&mut P> {
        self.peer.as_mut()
    }

    /// Replace the current peer with a newly accepted one.
    ///
    /// Any existing peer is closed first, even if the accept then turns out
    /// to be spurious. A real accept failure is fatal.
    pub fn accept_if_ready<A>(&mut self, acceptor: &mut A) -> Result<()>
    where
        A: Acceptor<Peer = P>,
    {
        if let Some(old) = self.peer.take() {
            log::info!("[uart] replacing peer fd={}", old.as_raw_fd());
            drop(old);
        }

        match acceptor.accept_peer() {
            Ok(peer) => {
                log::info!("[uart] peer connected fd={}", peer.as_raw_fd());
                self.peer = Some(peer);
                Ok(())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                log::trace!("[uart] acceptor readable but no connection accepted: {e}");
                Ok(())
            }
            Err(e) => {
                log::error!("[uart] accept failed: {e}");
                Err(BridgeError::fatal(IoOp::Accept, e))
            }
        }
    }

    /// Drop the peer after an error/hangup condition. Never fails.
    pub fn close_on_error(&mut self) {
        if let Some(peer) = self.peer.take() {
            log::info!("[uart] peer disconnected fd={}", peer.as_raw_fd());
        }
    }

    /// Close the peer, if any.
    pub fn close(&mut self) {
        self.peer = None;
    }
}

impl<P: AsRawFd> Default for ConnectionSlot<P> {
    fn default() -> Self {
        Self::new()
    }
}
