use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::{AppContext, ConfluenceError, Result};
use crate::config::{Config, RiverConfig};
use crate::container::{resolve_feeds, Container};
use crate::daemon::Daemon;
use crate::opml::feeds_opml;
use crate::render::river_js;
use crate::river::{RiverInfo, RiverSnapshot};

fn river_config<'a>(config: &'a Config, name: &str) -> Result<&'a RiverConfig> {
    config
        .river(name)
        .ok_or_else(|| ConfluenceError::RiverNotFound(name.to_string()))
}

pub async fn run(ctx: Arc<AppContext>, config: &Config, config_path: PathBuf) -> Result<()> {
    if config.rivers.is_empty() {
        println!("No rivers configured in {}", config_path.display());
    }

    let container = Container::start(ctx, config).await?;
    Daemon::new(container, config_path, config.fetch.watch_interval())
        .run()
        .await
}

/// River.js document for the stored update log of `name`.
pub fn render_river(
    ctx: &AppContext,
    config: &Config,
    name: &str,
    callback: Option<&str>,
) -> Result<String> {
    let river = river_config(config, name)?;
    ctx.store.create_bucket_if_absent(&river.name)?;

    let info = RiverInfo::new(&river.name, river.display_title(), &river.description);
    let snapshot = RiverSnapshot::capture(&info, &ctx.update_log())?;
    river_js(&snapshot, callback)
}

pub fn show(ctx: &AppContext, config: &Config, name: &str, callback: Option<&str>) -> Result<()> {
    println!("{}", render_river(ctx, config, name, callback)?);
    Ok(())
}

pub async fn opml(ctx: &AppContext, config: &Config, name: &str) -> Result<()> {
    let river = river_config(config, name)?;
    let urls = resolve_feeds(ctx.client.as_ref(), river).await?;
    print!("{}", feeds_opml(&format!("{} feeds", river.name), &urls));
    Ok(())
}

pub fn check(config: &Config, config_path: &Path) {
    println!("Config OK: {}", config_path.display());

    if config.rivers.is_empty() {
        println!("No rivers");
        return;
    }

    for river in &config.rivers {
        match &river.opml {
            Some(url) => println!("{} (OPML)\n  {}", river.display_title(), url),
            None => println!("{} ({} feeds)", river.display_title(), river.feeds.len()),
        }
    }
}
