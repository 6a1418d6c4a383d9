//! Core kgx library: streaming ingestion, reveal animation, section parsing,
//! result formatting, and backend configuration.

pub mod api;
pub mod compose;
pub mod config;
pub mod format;
pub mod reveal;
pub mod search;
pub mod sections;
pub mod stream;

/// User-Agent sent with every backend request.
pub const USER_AGENT: &str = concat!("kgx/", env!("CARGO_PKG_VERSION"));
