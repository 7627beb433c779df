//! Outbound write buffer.
//!
//! Holds the bytes of the single in-flight send. The caller hands them over
//! as [`Bytes`], so the bridge never copies them and nobody can mutate them
//! before completion; the bridge only advances a cursor as partial writes
//! succeed and releases its reference once the last byte is written.

use std::io;

use bytes::{Buf, Bytes};

use crate::error::{BridgeError, IoOp, Result};

/// Outcome of [`PendingWrite::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Bytes remain; keep watching for writability.
    Partial,
    /// The send finished with this write. Reported exactly once per send.
    Complete,
}

/// Cursor over the bytes of the in-flight send. Empty means idle.
#[derive(Debug, Default)]
pub struct PendingWrite {
    remaining: Bytes,
}

impl PendingWrite {
    /// An idle buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no send is in flight.
    pub fn is_idle(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Bytes not yet written.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// The unwritten bytes, starting at the cursor.
    pub fn as_slice(&self) -> &[u8] {
        &self.remaining
    }

    /// Start a new send.
    ///
    /// Fails with [`BridgeError::Busy`] and leaves the buffer untouched while
    /// a previous send is still in flight.
    pub fn begin(&mut self, data: Bytes) -> Result<()> {
        if !self.is_idle() {
            return Err(BridgeError::Busy {
                remaining: self.remaining(),
            });
        }
        self.remaining = data;
        Ok(())
    }

    /// Account for `written` bytes accepted by the transport.
    ///
    /// Zero means the connection went away mid-write; a count larger than
    /// what was offered means the transport lied. Both are fatal and leave
    /// the cursor where it was.
    pub fn advance(&mut self, written: usize) -> Result<Progress> {
        if written == 0 {
            return Err(BridgeError::fatal(
                IoOp::Write,
                io::Error::from(io::ErrorKind::WriteZero),
            ));
        }
        if written > self.remaining() {
            return Err(BridgeError::fatal(
                IoOp::Write,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "transport reported {written} bytes written, only {} pending",
                        self.remaining()
                    ),
                ),
            ));
        }

        self.remaining.advance(written);
        if self.remaining.is_empty() {
            // Drop our reference to the caller's buffer right away.
            self.remaining = Bytes::new();
            Ok(Progress::Complete)
        } else {
            Ok(Progress::Partial)
        }
    }
}
