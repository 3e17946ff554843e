//! # Confluence
//!
//! A river-of-news feed aggregator: it polls a configured set of feeds,
//! picks out the items it has not seen before and appends them, per river,
//! to a bounded log of updates.
//!
//! ## Architecture
//!
//! Every river runs its own small pipeline:
//!
//! ```text
//! Scheduler → fetch queue → Fetcher → River coordinator → Ledger → Update log
//!     ▲                                       │
//!     └──────────── next interval ────────────┘
//! ```
//!
//! - [`fetcher`]: conditional GET with stored `ETag` / `Last-Modified`
//! - [`parser`]: RSS/Atom parsing through feed-rs
//! - [`store`]: bucketed key-value store on SQLite, dedup ledger, update log
//! - [`scheduler`]: adaptive per-feed poll intervals
//! - [`river`]: per-river worker and coordinator tasks
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate the config and list rivers
//! confluence check
//!
//! # Poll every river until interrupted
//! confluence run
//!
//! # Print a river as River.js JSONP
//! confluence show tech --callback
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, HTTP client, fetcher, settings.
pub mod app;

/// Command-line interface using clap.
///
/// - `run` - Poll all rivers, reloading the config when it changes
/// - `show <river> [--callback]` - Print a river as River.js
/// - `opml <river>` - Print a river's feeds as OPML
/// - `check` - Validate the config
pub mod cli;

/// TOML configuration and config-file watching.
pub mod config;

/// Owner of all running rivers; applies config reloads.
pub mod container;

/// Long-running mode with signal handling and hot reload.
pub mod daemon;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a parsed feed and its items
/// - [`UpdatedFeed`](domain::UpdatedFeed): one fetch worth of new items
pub mod domain;

/// HTTP fetching with conditional request support.
///
/// - [`HttpClient`](fetcher::HttpClient): Async trait for one conditional GET
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`Fetcher`](fetcher::Fetcher): cache headers, GET and parse for one feed
pub mod fetcher;

/// OPML feed list extraction and export.
pub mod opml;

/// Feed parsing.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0 into
/// [`Feed`](domain::Feed) structs.
pub mod parser;

/// River.js JSON rendering.
pub mod render;

/// Per-river fetch worker and coordinator.
pub mod river;

/// Adaptive poll intervals and fetch timers.
pub mod scheduler;

/// Persistence.
///
/// - [`Store`](store::Store): bucketed key-value store with transactions
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`FingerprintLedger`](store::FingerprintLedger): seen-item oracle
/// - [`UpdateLog`](store::UpdateLog): item ids and the bounded update log
pub mod store;

/// Plain-text bodies and date formatting.
pub mod text;
