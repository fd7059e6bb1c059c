//! Durable log: one spreadsheet row per delivered submission.
//!
//! [`LogStore`] is the row-append collaborator; [`GoogleSheetsStore`] is the
//! production implementation. [`LogWriter`] binds a store to the configured
//! spreadsheet and sheet and runs the append off the caller's task.

pub mod auth;
mod google;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::LogError;
use crate::submission::LogRow;

pub use auth::{AccessTokenProvider, ServiceAccountKey, ServiceAccountTokens};
pub use google::{DEFAULT_SHEETS_BASE, GoogleSheetsStore};

/// Append-only row store.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append `row` after the last row of `sheet_name`. Not idempotent.
    async fn append_row(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: &[String],
    ) -> Result<(), LogError>;
}

/// Acknowledgement of a written row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

/// Writes log rows to one fixed sheet.
#[derive(Clone)]
pub struct LogWriter {
    store: Arc<dyn LogStore>,
    spreadsheet_id: String,
    sheet_name: String,
}

impl LogWriter {
    pub fn new(
        store: Arc<dyn LogStore>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// Perform exactly one append. Failures are returned, never retried.
    pub async fn append(&self, row: LogRow) -> Result<Ack, LogError> {
        let cells = row.into_cells();
        self.store
            .append_row(&self.spreadsheet_id, &self.sheet_name, &cells)
            .await?;
        Ok(Ack {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet_name: self.sheet_name.clone(),
        })
    }

    /// Run [`append`](Self::append) on its own task.
    pub fn spawn_append(&self, row: LogRow) -> JoinHandle<Result<Ack, LogError>> {
        let writer = self.clone();
        tokio::spawn(async move { writer.append(row).await })
    }
}
