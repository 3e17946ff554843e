use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use futures::stream::{self, Stream};
use tokio::time::{self, Interval, MissedTickBehavior};

/// Yields once each time the modification time of `path` changes.
///
/// The file is polled every `every`. A file that disappears or reappears
/// counts as a change too.
pub fn watch(path: PathBuf, every: Duration) -> impl Stream<Item = ()> {
    let last = modified(&path);
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    stream::unfold(
        (path, ticker, last),
        |(path, mut ticker, mut last): (PathBuf, Interval, Option<SystemTime>)| async move {
            loop {
                ticker.tick().await;
                let current = modified(&path);
                if current != last {
                    tracing::debug!(path = %path.display(), "Config file changed");
                    last = current;
                    return Some(((), (path, ticker, last)));
                }
            }
        },
    )
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
