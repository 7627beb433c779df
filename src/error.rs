//! Error taxonomy of the bridge.
//!
//! Only [`BridgeError::FatalIo`] means the bridge cannot safely continue; the
//! host decides whether that ends the process. Peer disconnects are not
//! errors at all and never surface here.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// I/O operation that failed fatally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    /// Accepting a pending connection on the acceptor.
    Accept,
    /// Writing pending bytes to the peer.
    Write,
    /// The listening socket itself reported an error condition.
    Listen,
    /// Waiting for readiness with `poll(2)`.
    Poll,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Write => write!(f, "write"),
            Self::Listen => write!(f, "listen"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// Errors reported by the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The rendezvous endpoint could not be created, bound or listened on.
    #[error("failed to bind rendezvous socket {}: {source}", path.display())]
    Bind {
        /// Socket path that was being bound.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A send is already in flight; retry after `on_send_complete`.
    #[error("send already in flight ({remaining} bytes remaining)")]
    Busy {
        /// Bytes of the in-flight send not yet written.
        remaining: usize,
    },

    /// Acceptor malfunction or a failed write on the active connection.
    #[error("fatal I/O error during {op}: {source}")]
    FatalIo {
        /// Operation that failed.
        op: IoOp,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl BridgeError {
    pub(crate) fn fatal(op: IoOp, source: io::Error) -> Self {
        Self::FatalIo { op, source }
    }

    /// True for errors after which the bridge must not be driven further.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalIo { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
