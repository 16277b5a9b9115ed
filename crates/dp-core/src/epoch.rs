//! Stale-response suppression primitives.
//!
//! The transport offers no hard cancellation, so "cancel" means "ignore the
//! eventual response". Every asynchronous operation captures a token at issue
//! time and checks it again before applying its result.
//!
//! - [`EpochClock`] / [`ProjectScope`]: bumped on every project switch. A
//!   response captured under an older epoch is never applied.
//! - [`RequestSequence`] / [`RequestTicket`]: per-manager ordering. Within one
//!   manager, the last issued request for a key wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic project epoch. Owned by the workspace coordinator, which is the
/// only writer.
#[derive(Debug, Default)]
pub struct EpochClock {
    current: Arc<AtomicU64>,
}

impl EpochClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps the epoch and returns a scope for the newly activated project.
    pub fn advance(&self, project_id: impl Into<String>) -> ProjectScope {
        let epoch = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        ProjectScope {
            project_id: project_id.into(),
            epoch,
            clock: Arc::clone(&self.current),
        }
    }

    /// Bumps the epoch without activating a project (workspace closed).
    pub fn invalidate(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// The project id and epoch under which a workspace context was created.
///
/// Cloned into every sub-manager of that context so each can check, after a
/// suspension point, whether its project is still the active one.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    project_id: String,
    epoch: u64,
    clock: Arc<AtomicU64>,
}

impl ProjectScope {
    /// A scope detached from any coordinator. Always current.
    pub fn detached(project_id: impl Into<String>) -> Self {
        let clock = Arc::new(AtomicU64::new(0));
        Self {
            project_id: project_id.into(),
            epoch: 0,
            clock,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True while no newer project has been activated.
    pub fn is_current(&self) -> bool {
        self.clock.load(Ordering::SeqCst) == self.epoch
    }
}

/// Per-manager request counter implementing last-issued-wins.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

/// Token handed out by [`RequestSequence::issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket, superseding every previously issued one.
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True if no request has been issued since `ticket`.
    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Supersedes all outstanding tickets without issuing a new request.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}
