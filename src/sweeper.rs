//! Background removal of expired and stale empty sessions.
//!
//! A [`Sweeper`] owns one tokio task that runs a sweep pass every interval
//! until it is stopped. Stopping waits for the task to exit, so the database
//! handle can be closed safely right afterwards.
//!
//! A save racing a sweep pass on the same row is settled by the database:
//! a session whose expiry was just refreshed survives until the next tick.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::schema::Statements;
use crate::session::unix_now;

/// Sweep interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Rows removed by one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows past their expiry.
    pub expired: u64,
    /// Empty rows older than the empty-data threshold.
    pub empty: u64,
}

impl SweepReport {
    /// Total rows removed.
    pub fn total(&self) -> u64 {
        self.expired + self.empty
    }
}

/// The two delete statements of a sweep pass.
#[derive(Debug)]
pub(crate) struct SweepQueries {
    statements: Arc<Statements>,
    empty_data_age: i64,
}

impl SweepQueries {
    pub(crate) fn new(statements: Arc<Statements>, empty_data_age: i64) -> Self {
        Self {
            statements,
            empty_data_age,
        }
    }

    /// Runs one pass. Both deletes are attempted; the first error is returned.
    pub(crate) async fn run(&self, conn: &DatabaseConnection) -> Result<SweepReport, DbErr> {
        let now = unix_now();
        let stmts = &self.statements;

        let expired = conn
            .execute(stmts.bind(&stmts.gc_expired, [now.into()]))
            .await
            .map(|res| res.rows_affected());
        let cutoff = now.saturating_sub(self.empty_data_age);
        let empty = conn
            .execute(stmts.bind(&stmts.gc_empty, [cutoff.into()]))
            .await
            .map(|res| res.rows_affected());

        Ok(SweepReport {
            expired: expired?,
            empty: empty?,
        })
    }
}

/// Handle to a running sweep task.
///
/// Dropping the handle without calling [`stop`](Self::stop) also ends the
/// task, but without waiting for it.
#[derive(Debug)]
pub struct Sweeper {
    quit: oneshot::Sender<()>,
    done: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the sweep task and returns at once; the first pass runs after
    /// one full interval. A zero interval is replaced by [`DEFAULT_INTERVAL`].
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn start(
        conn: DatabaseConnection,
        queries: Arc<SweepQueries>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        let (quit, quit_rx) = oneshot::channel();
        let done = tokio::spawn(run(conn, queries, interval, quit_rx));
        debug!(?interval, "session sweeper started");
        Self { quit, done }
    }

    /// Signals the task to quit and waits until it has exited.
    pub async fn stop(self) {
        // The task may already be gone; the join below still settles.
        let _ = self.quit.send(());
        if let Err(e) = self.done.await {
            warn!(error = %e, "session sweeper task failed");
        }
        debug!("session sweeper stopped");
    }
}

async fn run(
    conn: DatabaseConnection,
    queries: Arc<SweepQueries>,
    interval: Duration,
    mut quit: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut quit => return,
            _ = ticker.tick() => match queries.run(&conn).await {
                Ok(report) if report.total() > 0 => {
                    info!(
                        expired = report.expired,
                        empty = report.empty,
                        "session sweep completed"
                    );
                }
                Ok(_) => debug!("session sweep: nothing to remove"),
                Err(e) => warn!(error = %e, "unable to delete expired sessions"),
            },
        }
    }
}
