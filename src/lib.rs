//! marketpulse: a daily batch pipeline that gathers financial news for a
//! watchlist of funds and stocks, scores sentiment with an LLM, persists
//! the results to CSV, and delivers a Telegram report.

#![deny(clippy::unwrap_used)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod delivery;
pub mod errors;
pub mod orchestrator;
pub mod registry;
pub mod storage;

pub use config::Config;
pub use errors::{PipelineError, PipelineResult};
