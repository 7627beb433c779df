//! The socket bridge: a UART-like byte pipe over one Unix socket peer.
//!
//! # Driving the bridge
//!
//! ```text
//! loop {
//!     interest  = bridge.interest_set()        // what to watch
//!     readiness = <event loop waits>           // poll(2), reactor, test harness
//!     bridge.process(&readiness, &mut upper)?  // ≤1 accept, ≤1 read, ≤1 write
//! }
//! ```
//!
//! [`UartBridge::poll_once`] does all three steps with [`crate::poll::wait`].
//!
//! # Ordering within one `process()`
//!
//! 1. error on the acceptor: fatal
//! 2. error/hangup on the peer: close it
//! 3. peer still connected: read, then write
//! 4. acceptor readable: accept (replacing the peer)
//!
//! A peer torn down in step 2 is not serviced in step 3, and a peer accepted
//! in step 4 is not serviced until the next call.

use std::io::{self, Write};
use std::time::Duration;

use bytes::Bytes;

use crate::config::BridgeConfig;
use crate::endpoint::RendezvousEndpoint;
use crate::error::{BridgeError, IoOp, Result};
use crate::pending::{PendingWrite, Progress};
use crate::readiness::{InterestSet, Readiness};
use crate::receive::ReceiveScratch;
use crate::slot::{Acceptor, ConnectionSlot};

/// Callbacks into the protocol stack above the UART.
pub trait UpperLayer {
    /// Bytes arrived from the peer, exactly as read, as one chunk.
    fn on_received(&mut self, data: &[u8]);

    /// The last accepted [`UartBridge::send`] has been fully written.
    fn on_send_complete(&mut self);
}

/// Single-client socket bridge.
///
/// Generic over the [`Acceptor`] so tests and alternative transports can
/// supply connections; [`SocketBridge`] is the Unix socket flavour.
pub struct UartBridge<A: Acceptor> {
    acceptor: A,
    slot: ConnectionSlot<A::Peer>,
    pending: PendingWrite,
    scratch: ReceiveScratch,
    /// A zero-length send completes on the next `process()`.
    complete_empty_send: bool,
}

/// Bridge listening on a rendezvous Unix socket.
pub type SocketBridge = UartBridge<RendezvousEndpoint>;

impl<A: Acceptor> std::fmt::Debug for UartBridge<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UartBridge")
            .field("acceptor_fd", &self.acceptor.descriptor())
            .field("peer_fd", &self.slot.descriptor())
            .field("pending", &self.pending.remaining())
            .finish_non_exhaustive()
    }
}

impl SocketBridge {
    /// Open the rendezvous socket described by `config` and wrap it.
    pub fn open(config: &BridgeConfig) -> Result<Self> {
        let mut endpoint =
            RendezvousEndpoint::new(&config.rendezvous_address(), config.listen_backlog);
        endpoint.open()?;
        Ok(Self::new(endpoint, config.receive_capacity))
    }

    /// Close the peer and the rendezvous socket. Idempotent.
    pub fn close(&mut self) {
        self.slot.close();
        self.acceptor.close();
    }
}

impl<A: Acceptor> UartBridge<A> {
    /// Wrap an already listening acceptor.
    ///
    /// # Panics
    ///
    /// Panics if `receive_capacity == 0`.
    #[must_use]
    pub fn new(acceptor: A, receive_capacity: usize) -> Self {
        Self {
            acceptor,
            slot: ConnectionSlot::new(),
            pending: PendingWrite::new(),
            scratch: ReceiveScratch::new(receive_capacity),
            complete_empty_send: false,
        }
    }

    /// Queue `data` for transmission.
    ///
    /// Returns [`BridgeError::Busy`] without touching anything if a send is
    /// still in flight. Without a peer the bytes wait until one connects.
    pub fn send(&mut self, data: impl Into<Bytes>) -> Result<()> {
        if self.complete_empty_send {
            return Err(BridgeError::Busy { remaining: 0 });
        }
        let data: Bytes = data.into();
        let len = data.len();
        self.pending.begin(data)?;
        if len == 0 {
            self.complete_empty_send = true;
        }
        log::debug!(
            "[uart] send {len} bytes (peer {})",
            if self.slot.is_connected() { "connected" } else { "absent" }
        );
        Ok(())
    }

    /// Descriptors and events the event loop should watch this tick.
    pub fn interest_set(&self) -> InterestSet {
        let mut interest = InterestSet::default();
        if let Some(fd) = self.acceptor.descriptor() {
            interest.read.push(fd);
            interest.error.push(fd);
        }
        if let Some(fd) = self.slot.descriptor() {
            interest.read.push(fd);
            interest.error.push(fd);
            if !self.pending.is_idle() {
                interest.write.push(fd);
            }
        }
        interest
    }

    /// Service whatever `readiness` reports.
    ///
    /// Performs at most one accept, one read and one write. Only
    /// [`BridgeError::FatalIo`] is returned; the bridge must not be driven
    /// after that.
    pub fn process<U>(&mut self, readiness: &Readiness, upper: &mut U) -> Result<()>
    where
        U: UpperLayer + ?Sized,
    {
        let acceptor_ready = readiness.get_opt(self.acceptor.descriptor());
        if acceptor_ready.error {
            log::error!("[uart] listening socket reported an error condition");
            return Err(BridgeError::fatal(
                IoOp::Listen,
                io::Error::other("error/hangup on listening socket"),
            ));
        }

        let peer_ready = readiness.get_opt(self.slot.descriptor());
        if peer_ready.error {
            self.slot.close_on_error();
        }

        if let Some(peer) = self.slot.peer_mut() {
            if peer_ready.readable {
                self.scratch.receive_from(peer, upper);
            }
            if peer_ready.writable && !self.pending.is_idle() {
                match peer.write(self.pending.as_slice()) {
                    Ok(written) => {
                        log::debug!(
                            "[uart] wrote {written} of {} pending bytes",
                            self.pending.remaining()
                        );
                        if self.pending.advance(written)? == Progress::Complete {
                            upper.on_send_complete();
                        }
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                        ) =>
                    {
                        log::trace!("[uart] spurious write readiness");
                    }
                    Err(e) => {
                        log::error!("[uart] write failed: {e}");
                        return Err(BridgeError::fatal(IoOp::Write, e));
                    }
                }
            }
        }

        if acceptor_ready.readable {
            self.slot.accept_if_ready(&mut self.acceptor)?;
        }

        if self.complete_empty_send {
            self.complete_empty_send = false;
            upper.on_send_complete();
        }

        Ok(())
    }

    /// One full tick: interest query, `poll(2)` for up to `timeout`, process.
    pub fn poll_once<U>(&mut self, timeout: Option<Duration>, upper: &mut U) -> Result<()>
    where
        U: UpperLayer + ?Sized,
    {
        let interest = self.interest_set();
        let readiness = crate::poll::wait(&interest, timeout).map_err(|e| {
            log::error!("[uart] poll failed: {e}");
            BridgeError::fatal(IoOp::Poll, e)
        })?;
        self.process(&readiness, upper)
    }

    /// True while a peer is connected.
    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    /// True when no send is in flight, i.e. [`send`](Self::send) would
    /// succeed.
    pub fn is_idle(&self) -> bool {
        self.pending.is_idle() && !self.complete_empty_send
    }

    /// Bytes of the in-flight send not yet written.
    pub fn pending_len(&self) -> usize {
        self.pending.remaining()
    }

    /// The acceptor.
    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }
}
