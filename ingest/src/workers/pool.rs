use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::{Id, JoinSet};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::error::{ErrorKind, IngestError, IngestResult};
use crate::ingest_error;
use crate::workers::base::{MemberId, MemberKind, PoolMember};

/// Outcome of joining a pool.
#[derive(Debug)]
pub struct PoolReport {
    /// Name of the pool.
    pub pool: String,
    /// Members that exited on their own.
    pub completed: usize,
    /// Errors of members that failed, panicked, or did not exit in time.
    pub failed: Vec<IngestError>,
    /// Members that were force terminated after the timeout.
    pub forced: usize,
}

impl PoolReport {
    fn new(pool: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            completed: 0,
            failed: Vec::new(),
            forced: 0,
        }
    }

    /// Returns `true` if every member exited on its own without error.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.forced == 0
    }
}

/// Control surface the shutdown coordinator uses to wind a pool down.
#[async_trait]
pub trait PoolControl: Send {
    /// Returns the name of the pool.
    fn name(&self) -> &str;

    /// Sends a termination request to every member of the pool.
    fn request_termination(&self);

    /// Waits for every member to exit, force terminating the ones still running once
    /// `timeout` elapses.
    async fn join(&mut self, timeout: Duration) -> PoolReport;
}

/// Fixed-size pool of independent members running on the multi-threaded runtime.
///
/// Members are spawned once, at creation, and share a single termination channel.
pub struct Pool<S> {
    name: String,
    kind: MemberKind,
    shutdown_tx: ShutdownTx,
    join_set: JoinSet<(MemberId, IngestResult<S>)>,
    members: HashMap<Id, MemberId>,
}

impl<S> Pool<S>
where
    S: fmt::Debug + Send + 'static,
{
    /// Spawns `size` members built by `factory`, which receives the id of each member.
    pub fn spawn<M, F>(name: impl Into<String>, size: usize, mut factory: F) -> Self
    where
        M: PoolMember<Stats = S>,
        F: FnMut(MemberId) -> M,
    {
        let name = name.into();
        let (shutdown_tx, _) = create_shutdown_channel();
        let mut join_set = JoinSet::new();
        let mut members = HashMap::with_capacity(size);

        for member_id in 0..size {
            let member = factory(member_id);
            let shutdown_rx = shutdown_tx.subscribe();

            let handle = join_set.spawn(async move { (member_id, member.run(shutdown_rx).await) });
            members.insert(handle.id(), member_id);
        }

        info!(pool = %name, kind = %M::kind(), size, "pool started");

        Self {
            name,
            kind: M::kind(),
            shutdown_tx,
            join_set,
            members,
        }
    }

    /// Number of members still running or not joined yet.
    pub fn len(&self) -> usize {
        self.join_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_set.is_empty()
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    fn record(
        &mut self,
        report: &mut PoolReport,
        result: Result<(MemberId, IngestResult<S>), tokio::task::JoinError>,
    ) {
        match result {
            Ok((member_id, Ok(stats))) => {
                self.members.retain(|_, id| *id != member_id);
                debug!(pool = %self.name, member_id, ?stats, "pool member exited");
                report.completed += 1;
            }
            Ok((member_id, Err(err))) => {
                self.members.retain(|_, id| *id != member_id);
                error!(pool = %self.name, member_id, error = %err, "pool member failed");
                report.failed.push(err);
            }
            Err(join_err) => {
                let member_id = self.members.remove(&join_err.id());
                if join_err.is_cancelled() {
                    debug!(pool = %self.name, ?member_id, "pool member was force terminated");
                    report.forced += 1;
                } else {
                    error!(pool = %self.name, ?member_id, "pool member panicked");
                    report.failed.push(ingest_error!(
                        self.kind.panic_error_kind(),
                        "Pool member panicked",
                        format!("{} {member_id:?} of pool `{}`: {join_err}", self.kind, self.name)
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl<S> PoolControl for Pool<S>
where
    S: fmt::Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn request_termination(&self) {
        if self.shutdown_tx.shutdown() {
            info!(pool = %self.name, "termination requested");
        }
    }

    async fn join(&mut self, timeout: Duration) -> PoolReport {
        let deadline = Instant::now() + timeout;
        let mut report = PoolReport::new(self.name.clone());

        loop {
            match timeout_at(deadline, self.join_set.join_next()).await {
                Ok(None) => break,
                Ok(Some(result)) => self.record(&mut report, result),
                Err(_) => {
                    let remaining = self.join_set.len();
                    warn!(
                        pool = %self.name,
                        remaining,
                        ?timeout,
                        "pool did not exit in time, force terminating remaining members"
                    );
                    report.failed.push(ingest_error!(
                        ErrorKind::ShutdownTimeout,
                        "Pool members did not exit in time",
                        format!("{remaining} member(s) of pool `{}` still running after {timeout:?}", self.name)
                    ));

                    self.join_set.abort_all();
                    while let Some(result) = self.join_set.join_next().await {
                        self.record(&mut report, result);
                    }
                    break;
                }
            }
        }

        info!(
            pool = %self.name,
            completed = report.completed,
            failed = report.failed.len(),
            forced = report.forced,
            "pool joined"
        );

        report
    }
}

impl<S> fmt::Debug for Pool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("running", &self.join_set.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bail;
    use crate::concurrency::shutdown::ShutdownRx;

    /// Member behaviour selected by id in tests.
    enum Behaviour {
        ExitOnTermination,
        Fail,
        Panic,
        Hang,
    }

    struct TestMember(Behaviour);

    impl PoolMember for TestMember {
        type Stats = ();

        fn kind() -> MemberKind {
            MemberKind::Worker
        }

        async fn run(self, mut shutdown_rx: ShutdownRx) -> IngestResult<()> {
            match self.0 {
                Behaviour::ExitOnTermination => {
                    shutdown_rx.wait().await;
                    Ok(())
                }
                Behaviour::Fail => bail!(ErrorKind::InvalidState, "Member failed"),
                Behaviour::Panic => panic!("member panicked"),
                Behaviour::Hang => std::future::pending().await,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_members_exit_on_termination_request() {
        let mut pool = Pool::spawn("workers", 3, |_| TestMember(Behaviour::ExitOnTermination));
        assert_eq!(pool.len(), 3);

        pool.request_termination();
        let report = pool.join(Duration::from_secs(5)).await;

        assert_eq!(report.completed, 3);
        assert!(report.is_clean());
        assert!(pool.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failures_and_panics_are_reported() {
        let mut pool = Pool::spawn("savers", 3, |id| match id {
            0 => TestMember(Behaviour::Fail),
            1 => TestMember(Behaviour::Panic),
            _ => TestMember(Behaviour::ExitOnTermination),
        });

        pool.request_termination();
        let report = pool.join(Duration::from_secs(5)).await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.forced, 0);
        let mut kinds: Vec<ErrorKind> = report.failed.iter().map(|err| err.kind()).collect();
        kinds.sort_by_key(|kind| format!("{kind:?}"));
        assert_eq!(kinds, vec![ErrorKind::InvalidState, ErrorKind::WorkerPanic]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hanging_members_are_force_terminated() {
        let mut pool = Pool::spawn("workers", 2, |id| match id {
            0 => TestMember(Behaviour::Hang),
            _ => TestMember(Behaviour::ExitOnTermination),
        });

        pool.request_termination();
        let report = pool.join(Duration::from_millis(200)).await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.forced, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind(), ErrorKind::ShutdownTimeout);
        assert!(pool.is_empty());
    }
}
