//! Long-running mode: rivers poll in the background while the config file
//! is watched for changes, until SIGTERM or SIGINT.

use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;

use crate::app::Result;
use crate::config::{self, Config};
use crate::container::Container;
use crate::scheduler::format_interval;

pub struct Daemon {
    container: Container,
    config_path: PathBuf,
    watch_interval: Duration,
}

impl Daemon {
    pub fn new(container: Container, config_path: PathBuf, watch_interval: Duration) -> Self {
        Self {
            container,
            config_path,
            watch_interval,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Run until a shutdown signal arrives, then stop every river.
    pub async fn run(mut self) -> Result<()> {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let changes = config::watch(self.config_path.clone(), self.watch_interval);
        tokio::pin!(changes);

        tracing::info!(
            rivers = self.container.rivers().count(),
            config = %self.config_path.display(),
            "Confluence running, checking config every {}",
            format_interval(self.watch_interval)
        );

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    if let Err(e) = signal {
                        tracing::error!("Could not listen for shutdown signals: {}", e);
                    }
                    break;
                }
                Some(()) = changes.next() => self.reload().await,
            }
        }

        tracing::info!("Shutting down");
        self.container.shutdown().await;
        Ok(())
    }

    /// Re-reads the config file and applies it. An unreadable or invalid
    /// file leaves the running configuration in place.
    pub async fn reload(&mut self) {
        let config = match Config::from_path(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config change: {}", e);
                return;
            }
        };

        tracing::info!(config = %self.config_path.display(), "Reloading configuration");
        if let Err(e) = self.container.apply(&config).await {
            tracing::error!("Failed to apply configuration: {}", e);
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(windows)]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
