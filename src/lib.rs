//! yaru-bot: a Discord bot for declarations ("やるぞ宣言") and reports
//! ("やったよ報告").
//!
//! Each submission is posted to a fixed channel and appended to a Google
//! Sheets log. The two writes fail independently: a failed log append never
//! retracts the announcement and is reported to the user separately.

pub mod actions;
pub mod channels;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod sheets;
pub mod submission;

pub use error::{Error, Result};
