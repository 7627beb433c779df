//! Rendezvous endpoint: the listening Unix socket peers connect to.
//!
//! The socket file is named after the simulated node id
//! (`<base_dir>/<id:04x>.sock`) so a peer process can find it without any
//! other coordination. The endpoint goes `Unopened -> Listening -> Closed`
//! exactly once; a closed endpoint is never re-opened.
//!
//! # Cleanup
//!
//! The socket file is removed by [`RendezvousEndpoint::close`], on drop, and
//! by an `atexit(3)` hook for endpoints still open when the process exits
//! through `std::process::exit` (which skips destructors).

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, TryLockError};

use socket2::{Domain, SockAddr, Socket, Type};

use crate::constants::{DEFAULT_LISTEN_BACKLOG, MAX_SOCKET_PATH, SOCKET_EXTENSION};
use crate::error::{BridgeError, Result};
use crate::slot::Acceptor;

/// Well-known address of a node's rendezvous socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendezvousAddress {
    node_id: u16,
    base_dir: Option<PathBuf>,
}

impl RendezvousAddress {
    /// Address for `node_id`, inside `base_dir` or the working directory.
    #[must_use]
    pub fn new(node_id: u16, base_dir: Option<PathBuf>) -> Self {
        Self { node_id, base_dir }
    }

    /// Node id this address belongs to.
    #[must_use]
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Socket file path, e.g. `0001.sock` or `/run/sim/0001.sock`.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        let file_name = format!("{:04x}.{SOCKET_EXTENSION}", self.node_id);
        match &self.base_dir {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Lifecycle state of a [`RendezvousEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Created but never bound.
    Unopened,
    /// Bound and accepting connections.
    Listening,
    /// Socket file removed and descriptor released.
    Closed,
}

/// Listening side of the bridge.
#[derive(Debug)]
pub struct RendezvousEndpoint {
    path: PathBuf,
    backlog: i32,
    listener: Option<UnixListener>,
    state: EndpointState,
}

impl RendezvousEndpoint {
    /// Create an unopened endpoint for `address`.
    #[must_use]
    pub fn new(address: &RendezvousAddress, backlog: i32) -> Self {
        Self {
            path: address.path(),
            backlog,
            listener: None,
            state: EndpointState::Unopened,
        }
    }

    /// Create and immediately open an endpoint with the default backlog.
    pub fn bind(address: &RendezvousAddress) -> Result<Self> {
        let mut endpoint = Self::new(address, DEFAULT_LISTEN_BACKLOG);
        endpoint.open()?;
        Ok(endpoint)
    }

    /// Bind and listen.
    ///
    /// Removes a stale socket file left at the path by an earlier run, then
    /// creates the socket, binds, listens and switches to non-blocking mode.
    /// Opening a listening endpoint again is a no-op.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            EndpointState::Listening => return Ok(()),
            EndpointState::Closed => {
                return Err(self.bind_error(io::Error::other("endpoint already closed")));
            }
            EndpointState::Unopened => {}
        }

        let listener = match self.bind_listener() {
            Ok(listener) => listener,
            Err(e) => {
                log::error!(
                    "[uart] bind/listen failed on {}: {e} (errno {:?})",
                    self.path.display(),
                    e.raw_os_error()
                );
                return Err(self.bind_error(e));
            }
        };

        log::info!("[uart] listening on {}", self.path.display());
        register_exit_cleanup(&self.path);
        self.listener = Some(listener);
        self.state = EndpointState::Listening;
        Ok(())
    }

    fn bind_listener(&self) -> io::Result<UnixListener> {
        let path_len = self.path.as_os_str().len();
        if path_len >= MAX_SOCKET_PATH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "socket path too long ({path_len} bytes, max {})",
                    MAX_SOCKET_PATH - 1
                ),
            ));
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("[uart] removed stale socket {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        socket.bind(&SockAddr::unix(&self.path)?)?;
        socket.listen(self.backlog)?;
        socket.set_nonblocking(true)?;
        Ok(UnixListener::from(OwnedFd::from(socket)))
    }

    fn bind_error(&self, source: io::Error) -> BridgeError {
        BridgeError::Bind {
            path: self.path.clone(),
            source,
        }
    }

    /// Remove the socket file and release the descriptor.
    ///
    /// Idempotent, and harmless on an endpoint that never opened.
    pub fn close(&mut self) {
        if self.state == EndpointState::Listening {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("[uart] failed to remove {}: {e}", self.path.display());
                }
            }
            unregister_exit_cleanup(&self.path);
            log::info!("[uart] closed {}", self.path.display());
        }
        self.listener = None;
        self.state = EndpointState::Closed;
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Socket file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Acceptor for RendezvousEndpoint {
    type Peer = UnixStream;

    fn descriptor(&self) -> Option<RawFd> {
        self.listener.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn accept_peer(&mut self) -> io::Result<UnixStream> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        let (stream, _addr) = listener.accept()?;
        stream.set_nonblocking(true)?;
        Ok(stream)
    }
}

impl Drop for RendezvousEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

// ─── Exit-time cleanup ─────────────────────────────────────────────────────

/// Socket files of endpoints that are currently listening.
static OPEN_SOCKETS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static EXIT_HOOK: Once = Once::new();

extern "C" fn remove_open_sockets() {
    // Never block inside exit(3): skip cleanup if another thread holds the lock.
    let paths = match OPEN_SOCKETS.try_lock() {
        Ok(paths) => paths,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => return,
    };
    for path in paths.iter() {
        let _ = std::fs::remove_file(path);
    }
}

fn open_sockets() -> std::sync::MutexGuard<'static, Vec<PathBuf>> {
    OPEN_SOCKETS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn register_exit_cleanup(path: &Path) {
    EXIT_HOOK.call_once(|| {
        // SAFETY: the handler is a plain `extern "C" fn` touching only statics.
        if unsafe { libc::atexit(remove_open_sockets) } != 0 {
            log::warn!("[uart] atexit registration failed; socket files may outlive the process");
        }
    });
    open_sockets().push(path.to_path_buf());
}

fn unregister_exit_cleanup(path: &Path) {
    let mut paths = open_sockets();
    if let Some(pos) = paths.iter().position(|p| p == path) {
        paths.swap_remove(pos);
    }
}

#[cfg(test)]
pub(crate) fn exit_cleanup_registered(path: &Path) -> bool {
    open_sockets().iter().any(|p| p == path)
}
