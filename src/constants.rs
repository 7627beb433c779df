//! Crate-wide constants for the simulated UART bridge.
//!
//! Constants are grouped by the component that consumes them. Values that
//! users may want to tune are also exposed through
//! [`BridgeConfig`](crate::config::BridgeConfig); the ones here are defaults.

use std::time::Duration;

// ============================================================================
// Rendezvous endpoint
// ============================================================================

/// Environment variable naming the directory that holds rendezvous sockets.
///
/// When unset, socket files are created in the working directory.
pub const BASE_DIR_ENV: &str = "UDSPATH";

/// File extension of a rendezvous socket (`<node-id>.sock`).
pub const SOCKET_EXTENSION: &str = "sock";

/// Listen backlog for the acceptor.
///
/// Only one peer is ever serviced, so a handful of queued connects is plenty.
pub const DEFAULT_LISTEN_BACKLOG: i32 = 5;

/// Maximum path length for a Unix domain socket.
///
/// `sun_path` is 104 bytes on macOS and 108 on Linux; use the smaller one.
pub const MAX_SOCKET_PATH: usize = 104;

// ============================================================================
// I/O
// ============================================================================

/// Capacity of the inbound scratch buffer, i.e. the largest chunk delivered
/// to the upper layer by a single read.
pub const DEFAULT_RECEIVE_CAPACITY: usize = 128;

/// Environment variable overriding [`DEFAULT_RECEIVE_CAPACITY`].
pub const RECEIVE_CAPACITY_ENV: &str = "SIMUART_RECEIVE_CAPACITY";

/// Upper bound on received bytes the loopback holds while waiting to echo.
///
/// A peer that writes without ever reading stalls the outbound side; past
/// this limit further inbound chunks are dropped.
pub const MAX_QUEUED_ECHO_BYTES: usize = 64 * 1024;

// ============================================================================
// Host loop
// ============================================================================

/// Poll timeout used by the host binary between ticks.
///
/// Short enough to keep echo latency low, long enough to avoid spinning.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);
