//! Rivers: one fetch worker and one coordinator task per channel.
//!
//! ```text
//! timers ──url──▶ fetch queue ──▶ worker ──FetchResult──▶ coordinator
//!                                                            │
//!                   ledger ◀── dedup ◀───────────────────────┤
//!               update log ◀── ids, records ◀────────────────┤
//!                scheduler ◀── reschedule ◀──────────────────┘
//! ```
//!
//! The coordinator is the single consumer of fetch results and the only
//! place a river's feed set changes, so a [`RiverHandle`] talks to it with
//! messages rather than locks.

pub mod state;
pub mod worker;

pub use state::RiverState;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::app::{AppContext, ConfluenceError, Result};
use crate::domain::UpdatedFeed;
use crate::scheduler::Scheduler;
use crate::store::UpdateLog;

const CONTROL_QUEUE_SIZE: usize = 16;

/// Identity and counters of a running river.
#[derive(Debug)]
pub struct RiverInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub started_at: DateTime<Utc>,
    builds: AtomicU64,
}

impl RiverInfo {
    pub fn new(name: &str, title: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            started_at: Utc::now(),
            builds: AtomicU64::new(0),
        }
    }

    /// Fetch results processed so far.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub(crate) fn record_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }
}

/// Feeds added and removed by one reconcile, both sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub enum Command {
    Reconcile {
        urls: Vec<String>,
        reply: oneshot::Sender<ReconcileSummary>,
    },
    Streams {
        reply: oneshot::Sender<Vec<String>>,
    },
    Shutdown,
}

/// Read-only view of a river for renderers.
#[derive(Debug, Clone)]
pub struct RiverSnapshot {
    pub name: String,
    pub title: String,
    pub description: String,
    pub builds: u64,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub updates: Vec<UpdatedFeed>,
}

impl RiverSnapshot {
    pub fn capture(info: &RiverInfo, log: &UpdateLog) -> Result<Self> {
        Ok(Self {
            name: info.name.clone(),
            title: info.title.clone(),
            description: info.description.clone(),
            builds: info.builds(),
            started_at: info.started_at,
            generated_at: Utc::now(),
            updates: log.updates(&info.name)?,
        })
    }
}

/// Cloneable handle to a running river.
#[derive(Clone)]
pub struct RiverHandle {
    info: Arc<RiverInfo>,
    control: mpsc::Sender<Command>,
    log: UpdateLog,
}

impl RiverHandle {
    /// Creates the river's bucket, spawns its worker and coordinator and
    /// queues the first round of fetches for `urls`.
    pub fn spawn(ctx: &AppContext, info: RiverInfo, urls: Vec<String>) -> Result<Self> {
        ctx.store.create_bucket_if_absent(&info.name)?;

        let settings = &ctx.settings;
        let info = Arc::new(info);
        let (queue_tx, queue_rx) = mpsc::channel(settings.queue_size);
        let (results_tx, results_rx) = mpsc::channel(settings.queue_size);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_SIZE);

        let log = ctx.update_log();
        let mut state = RiverState::new(
            info.clone(),
            urls,
            Scheduler::new(settings.poll, queue_tx),
            ctx.ledger(),
            log.clone(),
            settings.max_body_chars,
        );
        state.start(settings.quick_start);

        tokio::spawn(worker::run(
            info.name.clone(),
            ctx.fetcher.clone(),
            queue_rx,
            results_tx,
        ));
        tokio::spawn(state.run(results_rx, control_rx));

        tracing::info!(river = %info.name, "River started");

        Ok(Self {
            info,
            control: control_tx,
            log,
        })
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &RiverInfo {
        &self.info
    }

    /// Makes the river track exactly `urls`.
    pub async fn reconcile(&self, urls: Vec<String>) -> Result<ReconcileSummary> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reconcile { urls, reply }).await?;
        rx.await.map_err(|_| self.stopped())
    }

    /// Feed URLs currently tracked, sorted.
    pub async fn streams(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Streams { reply }).await?;
        rx.await.map_err(|_| self.stopped())
    }

    pub fn snapshot(&self) -> Result<RiverSnapshot> {
        RiverSnapshot::capture(&self.info, &self.log)
    }

    /// Stops the river and waits for its coordinator to exit. Pending timers
    /// are cancelled; a fetch in flight is abandoned.
    pub async fn shutdown(&self) {
        if self.control.send(Command::Shutdown).await.is_ok() {
            self.control.closed().await;
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.control
            .send(command)
            .await
            .map_err(|_| self.stopped())
    }

    fn stopped(&self) -> ConfluenceError {
        ConfluenceError::RiverStopped(self.info.name.clone())
    }
}
