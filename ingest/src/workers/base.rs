use std::fmt;
use std::future::Future;

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, IngestResult};

/// Identifier of a member inside its pool, from `0` to the pool size.
pub type MemberId = usize;

/// Kind of member a pool runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// Extracts entities from posts and aggregates them.
    Worker,
    /// Persists aggregated results.
    Saver,
}

impl MemberKind {
    /// Returns the error kind reported when a member of this kind panics.
    pub fn panic_error_kind(&self) -> ErrorKind {
        match self {
            MemberKind::Worker => ErrorKind::WorkerPanic,
            MemberKind::Saver => ErrorKind::SaverPanic,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Worker => write!(f, "worker"),
            MemberKind::Saver => write!(f, "saver"),
        }
    }
}

/// Trait for the long-running tasks spawned by a [`crate::workers::pool::Pool`].
///
/// A member runs until the queue it consumes yields the stop sentinel. The shutdown receiver
/// tells it that a termination request was issued. Members react by closing their input queue
/// and draining it, so every item enqueued before the request is still handled.
pub trait PoolMember: Send + 'static {
    /// Statistics returned when the member exits.
    type Stats: fmt::Debug + Send + 'static;

    /// Returns the kind of this member.
    fn kind() -> MemberKind;

    /// Runs the member to completion.
    fn run(self, shutdown_rx: ShutdownRx)
    -> impl Future<Output = IngestResult<Self::Stats>> + Send;
}

/// Counters reported by an ingest worker when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Posts dequeued from the input queue.
    pub received: u64,
    /// Posts whose extraction failed and were skipped.
    pub failed: u64,
    /// Number of cache flushes, including the final one.
    pub flushes: u64,
    /// Aggregates forwarded to the output queue.
    pub forwarded: u64,
}

/// Counters reported by a saver when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaverStats {
    /// Aggregates dequeued from the output queue.
    pub received: u64,
    /// Records persisted successfully.
    pub persisted: u64,
    /// Records the persister rejected.
    pub failed: u64,
}
