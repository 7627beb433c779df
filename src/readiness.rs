//! Readiness interest and readiness results.
//!
//! The bridge never waits on descriptors itself. Each tick the driving loop
//! asks for an [`InterestSet`], waits however it likes (`poll(2)`, an async
//! reactor, a test harness) and hands back a [`Readiness`] describing what
//! became ready.

use std::os::fd::RawFd;

/// Descriptors the bridge wants watched, in `select(2)` terms.
///
/// A descriptor listed in `error` should be reported when it has an error or
/// hangup condition; `poll(2)` does that implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestSet {
    /// Descriptors to watch for readability.
    pub read: Vec<RawFd>,
    /// Descriptors to watch for writability.
    pub write: Vec<RawFd>,
    /// Descriptors to watch for error/hangup conditions.
    pub error: Vec<RawFd>,
}

impl InterestSet {
    /// True if nothing is being watched.
    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty() && self.error.is_empty()
    }

    /// True if `fd` is watched for readability.
    pub fn wants_read(&self, fd: RawFd) -> bool {
        self.read.contains(&fd)
    }

    /// True if `fd` is watched for writability.
    pub fn wants_write(&self, fd: RawFd) -> bool {
        self.write.contains(&fd)
    }

    /// True if `fd` appears in any of the three sets.
    pub fn contains(&self, fd: RawFd) -> bool {
        self.wants_read(fd) || self.wants_write(fd) || self.error.contains(&fd)
    }

    /// Every watched descriptor once, in first-seen order.
    pub fn descriptors(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = Vec::new();
        for &fd in self.read.iter().chain(&self.write).chain(&self.error) {
            if !fds.contains(&fd) {
                fds.push(fd);
            }
        }
        fds
    }
}

/// Readiness of one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ready {
    /// Data (or a pending connection) can be read without blocking.
    pub readable: bool,
    /// Data can be written without blocking.
    pub writable: bool,
    /// Error, hangup or invalid-descriptor condition.
    pub error: bool,
}

impl Ready {
    /// Readable only.
    pub const READABLE: Self = Self {
        readable: true,
        writable: false,
        error: false,
    };

    /// Writable only.
    pub const WRITABLE: Self = Self {
        readable: false,
        writable: true,
        error: false,
    };

    /// Error/hangup only.
    pub const ERROR: Self = Self {
        readable: false,
        writable: false,
        error: true,
    };

    /// Union of two readiness values.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            readable: self.readable || other.readable,
            writable: self.writable || other.writable,
            error: self.error || other.error,
        }
    }

    /// True if nothing is ready.
    pub fn is_empty(self) -> bool {
        !(self.readable || self.writable || self.error)
    }
}

/// Readiness results for one tick, keyed by descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readiness {
    entries: Vec<(RawFd, Ready)>,
}

impl Readiness {
    /// No descriptor ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `fd` as `ready`, merging with anything already recorded.
    pub fn insert(&mut self, fd: RawFd, ready: Ready) {
        if ready.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(f, _)| *f == fd) {
            Some((_, existing)) => *existing = existing.union(ready),
            None => self.entries.push((fd, ready)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, fd: RawFd, ready: Ready) -> Self {
        self.insert(fd, ready);
        self
    }

    /// Readiness of `fd`; all-false when not recorded.
    pub fn get(&self, fd: RawFd) -> Ready {
        self.entries
            .iter()
            .find(|(f, _)| *f == fd)
            .map(|(_, ready)| *ready)
            .unwrap_or_default()
    }

    /// Readiness of an optional descriptor.
    pub fn get_opt(&self, fd: Option<RawFd>) -> Ready {
        fd.map(|fd| self.get(fd)).unwrap_or_default()
    }

    /// True if no descriptor is ready.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_merges_flags() {
        let mut readiness = Readiness::new();
        readiness.insert(4, Ready::READABLE);
        readiness.insert(4, Ready::WRITABLE);
        readiness.insert(5, Ready::default());

        assert_eq!(
            readiness.get(4),
            Ready {
                readable: true,
                writable: true,
                error: false
            }
        );
        assert!(readiness.get(5).is_empty());
        assert!(readiness.get_opt(None).is_empty());
    }

    #[test]
    fn test_descriptors_are_deduplicated() {
        let interest = InterestSet {
            read: vec![3, 7],
            write: vec![7],
            error: vec![3, 7],
        };
        assert_eq!(interest.descriptors(), vec![3, 7]);
        assert!(interest.wants_write(7));
        assert!(!interest.wants_write(3));
        assert!(interest.contains(3));
        assert!(!interest.contains(9));
    }
}
