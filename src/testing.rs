//! In-memory acceptor, peer and upper layer for unit tests.
//!
//! Descriptors are plain numbers that are never handed to the OS.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

use crate::bridge::UpperLayer;
use crate::slot::Acceptor;

#[derive(Default)]
struct PeerShared {
    closed: Cell<bool>,
    written: RefCell<Vec<u8>>,
    write_calls: Cell<usize>,
}

/// Observes a [`MockPeer`] after it has been moved into the bridge.
#[derive(Clone)]
pub(crate) struct PeerProbe(Rc<PeerShared>);

impl PeerProbe {
    pub(crate) fn is_closed(&self) -> bool {
        self.0.closed.get()
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.0.written.borrow().clone()
    }

    pub(crate) fn write_calls(&self) -> usize {
        self.0.write_calls.get()
    }
}

/// Scripted peer connection. Dropping it counts as closing it.
pub(crate) struct MockPeer {
    fd: RawFd,
    inbound: VecDeque<io::Result<Vec<u8>>>,
    writes: VecDeque<io::Result<usize>>,
    shared: Rc<PeerShared>,
}

impl MockPeer {
    pub(crate) fn new(fd: RawFd) -> Self {
        Self {
            fd,
            inbound: VecDeque::new(),
            writes: VecDeque::new(),
            shared: Rc::default(),
        }
    }

    pub(crate) fn probe(&self) -> PeerProbe {
        PeerProbe(Rc::clone(&self.shared))
    }

    /// Bytes the next reads will return, in order.
    pub(crate) fn push_inbound(&mut self, data: &[u8]) {
        self.inbound.push_back(Ok(data.to_vec()));
    }

    pub(crate) fn push_read_error(&mut self, err: io::Error) {
        self.inbound.push_back(Err(err));
    }

    /// Counts the next writes report. Unplanned writes take everything.
    pub(crate) fn plan_writes(&mut self, counts: impl IntoIterator<Item = usize>) {
        self.writes.extend(counts.into_iter().map(Ok));
    }

    pub(crate) fn plan_write_error(&mut self, err: io::Error) {
        self.writes.push_back(Err(err));
    }
}

impl Read for MockPeer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbound.pop_front() {
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Some(Err(e)) => Err(e),
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.inbound.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

impl Write for MockPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.shared.write_calls.set(self.shared.write_calls.get() + 1);
        let reported = match self.writes.pop_front() {
            None => buf.len(),
            Some(Err(e)) => return Err(e),
            Some(Ok(n)) => n,
        };
        let taken = reported.min(buf.len());
        self.shared.written.borrow_mut().extend_from_slice(&buf[..taken]);
        Ok(reported)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRawFd for MockPeer {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.shared.closed.set(true);
    }
}

/// Acceptor handing out queued peers; `WouldBlock` when the queue is empty.
pub(crate) struct MockAcceptor {
    fd: RawFd,
    incoming: VecDeque<io::Result<MockPeer>>,
    handed_out: Vec<PeerProbe>,
    live_at_accept: Vec<usize>,
}

impl MockAcceptor {
    pub(crate) fn new(fd: RawFd) -> Self {
        Self {
            fd,
            incoming: VecDeque::new(),
            handed_out: Vec::new(),
            live_at_accept: Vec::new(),
        }
    }

    pub(crate) fn queue(&mut self, peer: MockPeer) {
        self.incoming.push_back(Ok(peer));
    }

    pub(crate) fn queue_error(&mut self, err: io::Error) {
        self.incoming.push_back(Err(err));
    }

    /// How many previously accepted peers were still open at each accept.
    pub(crate) fn live_peers_at_accept(&self) -> Vec<usize> {
        self.live_at_accept.clone()
    }
}

impl Acceptor for MockAcceptor {
    type Peer = MockPeer;

    fn descriptor(&self) -> Option<RawFd> {
        Some(self.fd)
    }

    fn accept_peer(&mut self) -> io::Result<MockPeer> {
        let live = self.handed_out.iter().filter(|p| !p.is_closed()).count();
        self.live_at_accept.push(live);
        match self.incoming.pop_front() {
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Some(Err(e)) => Err(e),
            Some(Ok(peer)) => {
                self.handed_out.push(peer.probe());
                Ok(peer)
            }
        }
    }
}

/// Upper layer that records every callback.
#[derive(Debug, Default)]
pub(crate) struct RecordingUpper {
    pub(crate) received: Vec<Vec<u8>>,
    pub(crate) completions: usize,
}

impl UpperLayer for RecordingUpper {
    fn on_received(&mut self, data: &[u8]) {
        self.received.push(data.to_vec());
    }

    fn on_send_complete(&mut self) {
        self.completions += 1;
    }
}
