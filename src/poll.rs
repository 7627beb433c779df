//! `poll(2)` driver.
//!
//! Turns an [`InterestSet`] into a [`Readiness`] with one level-triggered
//! `poll(2)` call. Level triggering matters: the bridge reads at most one
//! scratch buffer per tick, so leftover bytes must be reported again on the
//! next tick.

use std::io;
use std::time::Duration;

use crate::readiness::{InterestSet, Readiness, Ready};

const ERROR_EVENTS: libc::c_short = libc::POLLERR | libc::POLLHUP | libc::POLLNVAL;

/// Wait up to `timeout` (forever if `None`) for any watched descriptor.
///
/// An interrupted wait (`EINTR`) returns empty readiness rather than an
/// error so signal-driven shutdown can be checked by the caller.
pub fn wait(interest: &InterestSet, timeout: Option<Duration>) -> io::Result<Readiness> {
    let mut pollfds: Vec<libc::pollfd> = interest
        .descriptors()
        .into_iter()
        .map(|fd| libc::pollfd {
            fd,
            events: requested_events(interest, fd),
            revents: 0,
        })
        .collect();

    let timeout_ms = timeout.map_or(-1, |d| i32::try_from(d.as_millis()).unwrap_or(i32::MAX));

    // SAFETY: `pollfds` is a live, exclusively borrowed array of exactly
    // `pollfds.len()` initialised `pollfd` structs.
    let rc = unsafe {
        libc::poll(
            pollfds.as_mut_ptr(),
            pollfds.len() as libc::nfds_t,
            timeout_ms,
        )
    };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Readiness::new());
        }
        return Err(err);
    }

    let mut readiness = Readiness::new();
    if rc > 0 {
        for pfd in &pollfds {
            readiness.insert(pfd.fd, ready_from_revents(pfd.revents));
        }
    }
    Ok(readiness)
}

fn requested_events(interest: &InterestSet, fd: libc::c_int) -> libc::c_short {
    let mut events = 0;
    if interest.wants_read(fd) {
        events |= libc::POLLIN;
    }
    if interest.wants_write(fd) {
        events |= libc::POLLOUT;
    }
    events
}

fn ready_from_revents(revents: libc::c_short) -> Ready {
    Ready {
        readable: revents & libc::POLLIN != 0,
        writable: revents & libc::POLLOUT != 0,
        error: revents & ERROR_EVENTS != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_timeout_with_nothing_ready() {
        let (a, _b) = UnixStream::pair().unwrap();
        let interest = InterestSet {
            read: vec![a.as_raw_fd()],
            ..InterestSet::default()
        };
        let readiness = wait(&interest, Some(Duration::ZERO)).unwrap();
        assert!(readiness.is_empty());
    }

    #[test]
    fn test_reports_readable_and_writable() {
        let (a, mut b) = UnixStream::pair().unwrap();
        b.write_all(b"hi").unwrap();

        let fd = a.as_raw_fd();
        let interest = InterestSet {
            read: vec![fd],
            write: vec![fd],
            error: vec![fd],
        };
        let ready = wait(&interest, Some(Duration::from_secs(1))).unwrap().get(fd);
        assert!(ready.readable);
        assert!(ready.writable);
        assert!(!ready.error);
    }

    #[test]
    fn test_write_not_reported_unless_requested() {
        let (a, _b) = UnixStream::pair().unwrap();
        let fd = a.as_raw_fd();
        let interest = InterestSet {
            read: vec![fd],
            write: Vec::new(),
            error: vec![fd],
        };
        let readiness = wait(&interest, Some(Duration::ZERO)).unwrap();
        assert!(!readiness.get(fd).writable);
    }

    #[test]
    fn test_peer_close_reports_hangup() {
        let (a, b) = UnixStream::pair().unwrap();
        drop(b);

        let fd = a.as_raw_fd();
        let interest = InterestSet {
            read: vec![fd],
            write: Vec::new(),
            error: vec![fd],
        };
        let ready = wait(&interest, Some(Duration::from_secs(1))).unwrap().get(fd);
        assert!(ready.error);
    }
}
