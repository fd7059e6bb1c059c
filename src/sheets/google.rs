//! Google Sheets implementation of [`LogStore`].

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::error::LogError;
use crate::sheets::{AccessTokenProvider, LogStore};

pub const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com";

/// Appends rows through `spreadsheets.values.append`.
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

#[derive(Serialize)]
struct ValueRange<'a> {
    values: [&'a [String]; 1],
}

impl GoogleSheetsStore {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_base_url(tokens, DEFAULT_SHEETS_BASE)
    }

    pub fn with_base_url(tokens: Arc<dyn AccessTokenProvider>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    fn append_url(&self, spreadsheet_id: &str, sheet_name: &str) -> String {
        let range = a1_anchor(sheet_name);
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(&range),
        )
    }
}

/// `'<sheet>'!A1`. Quoting keeps names with spaces or symbols valid; an
/// embedded `'` is doubled.
fn a1_anchor(sheet_name: &str) -> String {
    format!("'{}'!A1", sheet_name.replace('\'', "''"))
}

#[async_trait]
impl LogStore for GoogleSheetsStore {
    async fn append_row(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: &[String],
    ) -> Result<(), LogError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| LogError::Auth(e.to_string()))?;

        let response = self
            .client
            .post(self.append_url(spreadsheet_id, sheet_name))
            .bearer_auth(token.expose_secret())
            .json(&ValueRange { values: [row] })
            .send()
            .await
            .map_err(|e| LogError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            // A revoked or expired token must not be reused by the next append.
            self.tokens.invalidate().await;
            return Err(LogError::Auth(format!("HTTP {}: {}", status, body)));
        }
        Err(LogError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
