//! Transport seam between the engine and the remote snapshot.
//!
//! The wire protocol is a single resource: `pull` fetches the whole remote
//! snapshot body and `push` replaces it. Both are retry-safe.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Moves snapshot bodies to and from the remote.
pub trait SnapshotTransport {
    /// Fetch the current remote body. An empty body means an empty remote.
    fn pull(&mut self) -> Result<String, TransportError>;

    /// Replace the remote body.
    fn push(&mut self, body: &str) -> Result<(), TransportError>;
}

impl<T: SnapshotTransport + ?Sized> SnapshotTransport for &mut T {
    fn pull(&mut self) -> Result<String, TransportError> {
        (**self).pull()
    }

    fn push(&mut self, body: &str) -> Result<(), TransportError> {
        (**self).push(body)
    }
}

/// Which half of the exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Pull,
    Push,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pull => "pull",
            Self::Push => "push",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote answered with a non-success status.
    #[error("{direction} failed: HTTP {status}")]
    Status { direction: Direction, status: u16 },
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("{direction} failed: {message}")]
    Network { direction: Direction, message: String },
    /// A response arrived but its body could not be read.
    #[error("{direction} failed reading body: {message}")]
    Body { direction: Direction, message: String },
}

impl TransportError {
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Status { direction, .. }
            | Self::Network { direction, .. }
            | Self::Body { direction, .. } => *direction,
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory remote
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RemoteState {
    body: String,
    offline: bool,
    fail_next_push: Option<u16>,
    pulls: usize,
    pushes: usize,
}

/// In-memory remote endpoint. Clones talk to the same remote, so several
/// engines can share it the way several devices share one endpoint.
#[derive(Debug, Clone, Default)]
pub struct SharedRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl SharedRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote preloaded with `body`.
    #[must_use]
    pub fn with_body(body: impl Into<String>) -> Self {
        let remote = Self::new();
        remote.lock().body = body.into();
        remote
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current remote body.
    #[must_use]
    pub fn body(&self) -> String {
        self.lock().body.clone()
    }

    pub fn set_body(&self, body: impl Into<String>) {
        self.lock().body = body.into();
    }

    /// While offline every request fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make the next push fail with `status`.
    pub fn fail_next_push(&self, status: u16) {
        self.lock().fail_next_push = Some(status);
    }

    #[must_use]
    pub fn pulls(&self) -> usize {
        self.lock().pulls
    }

    #[must_use]
    pub fn pushes(&self) -> usize {
        self.lock().pushes
    }
}

impl SnapshotTransport for SharedRemote {
    fn pull(&mut self) -> Result<String, TransportError> {
        let mut state = self.lock();
        if state.offline {
            return Err(TransportError::Network {
                direction: Direction::Pull,
                message: "remote offline".to_string(),
            });
        }
        state.pulls += 1;
        Ok(state.body.clone())
    }

    fn push(&mut self, body: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.offline {
            return Err(TransportError::Network {
                direction: Direction::Push,
                message: "remote offline".to_string(),
            });
        }
        if let Some(status) = state.fail_next_push.take() {
            return Err(TransportError::Status {
                direction: Direction::Push,
                status,
            });
        }
        state.pushes += 1;
        body.clone_into(&mut state.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_remote() -> Result<(), TransportError> {
        let remote = SharedRemote::new();
        let mut device = remote.clone();
        device.push(r#"{"version":1}"#)?;
        assert_eq!(remote.body(), r#"{"version":1}"#);
        assert_eq!(remote.clone().pull()?, r#"{"version":1}"#);
        assert_eq!(remote.pushes(), 1);
        assert_eq!(remote.pulls(), 1);
        Ok(())
    }

    #[test]
    fn injected_failures() {
        let mut remote = SharedRemote::with_body("{}");
        remote.fail_next_push(503);
        let err = remote.push("x").expect_err("push should fail");
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
        assert_eq!(remote.body(), "{}");

        remote.set_offline(true);
        let err = remote.pull().expect_err("offline");
        assert_eq!(err.direction(), Direction::Pull);
    }
}
