//! simuart - simulated UART transport over a Unix domain socket.
//!
//! Lets simulated devices run as separate processes and exchange serial byte
//! streams without hardware. Each node listens on a rendezvous socket named
//! after its node id; one peer process at a time connects and becomes the
//! other end of the "wire".
//!
//! # Architecture
//!
//! - **Rendezvous endpoint** - socket path construction, bind/listen, cleanup
//! - **Connection slot** - at most one peer; accept replaces, hangup empties
//! - **Pending write** - cursor over the in-flight send across partial writes
//! - **Receive path** - one bounded read per tick, forwarded as one chunk
//! - **Bridge** - interest query and process step for an external event loop
//!
//! The bridge never blocks and never owns the event loop: callers ask for an
//! [`InterestSet`], wait however they like and hand back a [`Readiness`]. The
//! [`poll`] module provides a ready-made `poll(2)` driver.
//!
//! # Modules
//!
//! - [`bridge`] - [`UartBridge`] and the [`UpperLayer`] callbacks
//! - [`endpoint`] - [`RendezvousEndpoint`] and its address
//! - [`config`] - [`BridgeConfig`] loading
//! - [`loopback`] - echoing upper layer used by the binary

pub mod bridge;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod loopback;
pub mod pending;
pub mod poll;
pub mod readiness;
pub mod receive;
pub mod slot;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use bridge::{SocketBridge, UartBridge, UpperLayer};
pub use config::BridgeConfig;
pub use endpoint::{EndpointState, RendezvousAddress, RendezvousEndpoint};
pub use error::{BridgeError, IoOp};
pub use loopback::Loopback;
pub use readiness::{InterestSet, Readiness, Ready};
pub use slot::Acceptor;
