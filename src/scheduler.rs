//! Adaptive per-feed poll scheduling.
//!
//! Every fetch outcome nudges the feed's interval: down by `change` when it
//! produced new items, up otherwise, always within `[min, max]`. Lively
//! feeds drift towards `min`, quiet ones towards `max`.
//!
//! Timers never run fetch logic themselves. A timer is a task that sleeps and
//! then posts the feed URL into the river's fetch queue, so the river's
//! single fetch worker stays the only place fetches happen.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_POLL: Duration = Duration::from_secs(3600);
pub const DEFAULT_POLL_MIN: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_MAX: Duration = Duration::from_secs(3600);
pub const DEFAULT_POLL_CHANGE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub default: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Fraction of the current interval added or removed per outcome
    pub change: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            default: DEFAULT_POLL,
            min: DEFAULT_POLL_MIN,
            max: DEFAULT_POLL_MAX,
            change: DEFAULT_POLL_CHANGE,
        }
    }
}

impl PollPolicy {
    pub fn next_interval(&self, current: Duration, new_items: usize) -> Duration {
        let current = current.as_secs_f64();
        let mut delta = current * self.change;
        if new_items > 0 {
            delta = -delta;
        }

        let next = (current + delta).clamp(self.min.as_secs_f64(), self.max.as_secs_f64());
        Duration::from_secs_f64(next)
    }
}

/// Format an interval for log lines, e.g. `1h`, `5m`, `54m`, `90s`
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Intervals and pending timers for the feeds of one river.
///
/// Owned by the river's coordinator task; not shared.
pub struct Scheduler {
    policy: PollPolicy,
    queue: mpsc::Sender<String>,
    intervals: HashMap<String, Duration>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(policy: PollPolicy, queue: mpsc::Sender<String>) -> Self {
        Self {
            policy,
            queue,
            intervals: HashMap::new(),
            timers: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Starts tracking `url` at the default interval. Existing state is kept.
    pub fn track(&mut self, url: &str) {
        self.intervals
            .entry(url.to_string())
            .or_insert(self.policy.default);
    }

    pub fn interval(&self, url: &str) -> Option<Duration> {
        self.intervals.get(url).copied()
    }

    pub fn has_timer(&self, url: &str) -> bool {
        self.timers.contains_key(url)
    }

    /// Posts `url` to the fetch queue after `delay`, replacing any pending
    /// timer for it.
    pub fn arm(&mut self, url: &str, delay: Duration) {
        if let Some(previous) = self.timers.remove(url) {
            previous.abort();
        }

        let queue = self.queue.clone();
        let target = url.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.send(target).await.is_err() {
                tracing::debug!("Fetch queue closed, dropping scheduled fetch");
            }
        });

        self.timers.insert(url.to_string(), handle);
    }

    /// Queues an immediate fetch of `url`.
    pub fn enqueue_now(&mut self, url: &str) {
        self.arm(url, Duration::ZERO);
    }

    /// Adjusts the interval of `url` for an outcome with `new_items` new
    /// items and arms its next fetch. Returns the new interval.
    pub fn reschedule(&mut self, url: &str, new_items: usize) -> Duration {
        let current = self.interval(url).unwrap_or(self.policy.default);
        let next = self.policy.next_interval(current, new_items);

        self.intervals.insert(url.to_string(), next);
        self.arm(url, next);
        next
    }

    /// Cancels the pending timer of `url`.
    ///
    /// Returns `false` when there was nothing left to stop: no timer, or one
    /// that had already fired.
    pub fn cancel(&mut self, url: &str) -> bool {
        match self.timers.remove(url) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Stops tracking `url` entirely. Same return value as [`cancel`](Self::cancel).
    pub fn forget(&mut self, url: &str) -> bool {
        let stopped = self.cancel(url);
        self.intervals.remove(url);
        stopped
    }

    pub fn shutdown(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
