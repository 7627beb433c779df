//! Loopback upper layer used by the `simuart` binary.
//!
//! Echoes every received chunk back to the peer. Chunks are queued because
//! the bridge carries only one send at a time; [`Loopback::pump`] hands the
//! next one over whenever the bridge is idle. The queue is bounded by
//! [`MAX_QUEUED_ECHO_BYTES`]: a peer that writes but never reads gets its
//! excess input dropped rather than buffered.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::bridge::{UartBridge, UpperLayer};
use crate::constants::MAX_QUEUED_ECHO_BYTES;
use crate::error::Result;
use crate::slot::Acceptor;

/// Echoing upper layer.
#[derive(Debug)]
pub struct Loopback {
    queue: VecDeque<Bytes>,
    queued_bytes: usize,
    max_queued_bytes: usize,
    echoed_bytes: u64,
    dropped_bytes: u64,
    completed_sends: u64,
}

impl Loopback {
    /// An empty loopback holding at most [`MAX_QUEUED_ECHO_BYTES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_QUEUED_ECHO_BYTES)
    }

    /// An empty loopback holding at most `max_queued_bytes` of unsent echo.
    #[must_use]
    pub fn with_limit(max_queued_bytes: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            queued_bytes: 0,
            max_queued_bytes,
            echoed_bytes: 0,
            dropped_bytes: 0,
            completed_sends: 0,
        }
    }

    /// Start the next queued echo if the bridge can take it.
    ///
    /// Returns `true` if a send was started.
    pub fn pump<A: Acceptor>(&mut self, bridge: &mut UartBridge<A>) -> Result<bool> {
        if !bridge.is_idle() {
            return Ok(false);
        }
        let Some(chunk) = self.queue.pop_front() else {
            return Ok(false);
        };
        let len = chunk.len();
        self.queued_bytes -= len;
        bridge.send(chunk)?;
        self.echoed_bytes += len as u64;
        Ok(true)
    }

    /// Chunks received but not yet handed to the bridge.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Bytes received but not yet handed to the bridge.
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Received bytes discarded because the queue was full.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }

    /// Bytes handed to the bridge so far.
    pub fn echoed_bytes(&self) -> u64 {
        self.echoed_bytes
    }

    /// Sends the bridge has reported complete.
    pub fn completed_sends(&self) -> u64 {
        self.completed_sends
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

impl UpperLayer for Loopback {
    fn on_received(&mut self, data: &[u8]) {
        if self.queued_bytes + data.len() > self.max_queued_bytes {
            if self.dropped_bytes == 0 {
                log::warn!(
                    "[loopback] echo queue full ({} bytes), dropping input until the peer reads",
                    self.queued_bytes
                );
            }
            self.dropped_bytes += data.len() as u64;
            return;
        }
        self.queued_bytes += data.len();
        self.queue.push_back(Bytes::copy_from_slice(data));
    }

    fn on_send_complete(&mut self) {
        self.completed_sends += 1;
    }
}
