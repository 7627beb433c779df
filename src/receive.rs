//! Inbound receive path.
//!
//! One bounded read per tick; whatever arrives is forwarded to the upper
//! layer as a single opaque chunk. No reassembly happens here.

use std::io::{self, Read};

use crate::bridge::UpperLayer;
use crate::constants::DEFAULT_RECEIVE_CAPACITY;

/// Fixed-capacity staging buffer for one read.
#[derive(Debug)]
pub struct ReceiveScratch {
    buf: Box<[u8]>,
}

impl ReceiveScratch {
    /// Scratch buffer of `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ReceiveScratch capacity must be > 0");
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Largest chunk a single read can deliver.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Read once from `reader` and forward any bytes to `upper`.
    ///
    /// Returns the number of bytes forwarded. End-of-stream and read errors
    /// count as "nothing this tick"; the peer is torn down by the error/hangup
    /// readiness check, not here.
    pub fn receive_from<R, U>(&mut self, reader: &mut R, upper: &mut U) -> usize
    where
        R: Read + ?Sized,
        U: UpperLayer + ?Sized,
    {
        match reader.read(&mut self.buf) {
            Ok(0) => 0,
            Ok(n) => {
                log::debug!("[uart] received {n} bytes");
                upper.on_received(&self.buf[..n]);
                n
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                log::trace!("[uart] spurious read readiness");
                0
            }
            Err(e) => {
                log::debug!("[uart] read failed: {e}");
                0
            }
        }
    }
}

impl Default for ReceiveScratch {
    fn default() -> Self {
        Self::new(DEFAULT_RECEIVE_CAPACITY)
    }
}
