//! Command handlers.

pub mod backend;
pub mod config;
pub mod format;
pub mod search;
