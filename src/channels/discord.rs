//! Discord REST v10 client.
//!
//! Implements [`MessagingChannel`] for announcements and, through
//! [`DiscordInteraction`], [`InteractionResponder`] for a single deferred
//! interaction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::channels::payload::{AllowedMentions, ResponseData};
use crate::channels::{ChannelHandle, InteractionResponder, MessagingChannel, Visibility};
use crate::error::{ChannelError, InteractionError, PublishError};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Discord JSON error code for "Interaction has already been acknowledged".
const ALREADY_ACKNOWLEDGED: u64 = 40060;

/// Channel types that accept plain messages: guild text, announcement and threads.
const TEXT_CHANNEL_TYPES: [u8; 5] = [0, 5, 10, 11, 12];

/// Discord connection settings.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub api_base: String,
    pub bot_token: SecretString,
    pub application_id: String,
}

impl DiscordConfig {
    pub fn new(bot_token: SecretString, application_id: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token,
            application_id: application_id.into(),
        }
    }
}

/// Thin Discord REST client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DiscordRest {
    client: reqwest::Client,
    config: Arc<DiscordConfig>,
}

#[derive(Debug, Deserialize)]
struct ChannelObject {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    message: String,
}

impl DiscordRest {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(
            reqwest::header::AUTHORIZATION,
            format!("Bot {}", self.config.bot_token.expose_secret()),
        )
    }

    /// Post a message with arbitrary content and components to a channel.
    pub async fn create_message(
        &self,
        channel_id: &str,
        body: &ResponseData,
    ) -> Result<String, ChannelError> {
        let endpoint = format!("/channels/{}/messages", channel_id);
        let response = self
            .authorized(self.client.post(self.url(&endpoint)))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::RequestFailed {
                endpoint,
                reason: describe_failure(status, &body),
            });
        }

        let message: MessageObject =
            response
                .json()
                .await
                .map_err(|e| ChannelError::RequestFailed {
                    endpoint,
                    reason: format!("invalid message object: {}", e),
                })?;
        Ok(message.id)
    }

    /// Replace the application's slash commands. Global when `guild_id` is
    /// `None`. Bulk overwrite is idempotent, so running it at every start is safe.
    pub async fn overwrite_commands(
        &self,
        guild_id: Option<&str>,
        commands: &serde_json::Value,
    ) -> Result<usize, ChannelError> {
        let endpoint = match guild_id {
            Some(guild) => format!(
                "/applications/{}/guilds/{}/commands",
                self.config.application_id, guild
            ),
            None => format!("/applications/{}/commands", self.config.application_id),
        };

        let response = self
            .authorized(self.client.put(self.url(&endpoint)))
            .json(commands)
            .send()
            .await
            .map_err(|e| ChannelError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::RequestFailed {
                endpoint,
                reason: describe_failure(status, &body),
            });
        }

        let registered: Vec<serde_json::Value> =
            response
                .json()
                .await
                .map_err(|e| ChannelError::RequestFailed {
                    endpoint,
                    reason: format!("invalid command list: {}", e),
                })?;
        Ok(registered.len())
    }

    /// Replace the deferred placeholder of an interaction.
    async fn edit_original(
        &self,
        interaction_id: &str,
        token: &str,
        body: &ResponseData,
    ) -> Result<(), InteractionError> {
        // Interaction tokens authorize these calls; no bot header.
        let url = self.url(&format!(
            "/webhooks/{}/{}/messages/@original",
            self.config.application_id, token
        ));
        let response = self
            .client
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|e| InteractionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(interaction_failure(interaction_id, status, &text))
    }

    async fn create_followup(
        &self,
        interaction_id: &str,
        token: &str,
        body: &ResponseData,
    ) -> Result<(), InteractionError> {
        let url = self.url(&format!(
            "/webhooks/{}/{}",
            self.config.application_id, token
        ));
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| InteractionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(interaction_failure(interaction_id, status, &text))
    }
}

fn interaction_failure(
    interaction_id: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> InteractionError {
    let api: ApiError = serde_json::from_str(body).unwrap_or_default();
    if api.code == ALREADY_ACKNOWLEDGED {
        return InteractionError::AlreadyResponded {
            interaction_id: interaction_id.to_string(),
        };
    }
    InteractionError::Transport(describe_failure(status, body))
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    let api: ApiError = serde_json::from_str(body).unwrap_or_default();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return format!("rate limited ({})", status);
    }
    if api.message.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {} (code {}): {}", status, api.code, api.message)
    }
}

#[async_trait]
impl MessagingChannel for DiscordRest {
    async fn resolve(&self, channel_id: &str) -> Result<ChannelHandle, PublishError> {
        let unavailable = |reason: String| PublishError::ChannelUnavailable {
            channel_id: channel_id.to_string(),
            reason,
        };

        let response = self
            .authorized(self.client.get(self.url(&format!("/channels/{}", channel_id))))
            .send()
            .await
            .map_err(|e| PublishError::TransportFailure {
                cause: e.to_string(),
            })?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => return Err(unavailable("not found".to_string())),
            reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::UNAUTHORIZED => {
                return Err(unavailable("missing access".to_string()));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(PublishError::TransportFailure {
                    cause: describe_failure(status, &body),
                });
            }
        }

        let channel: ChannelObject =
            response
                .json()
                .await
                .map_err(|e| PublishError::TransportFailure {
                    cause: format!("invalid channel object: {}", e),
                })?;

        if !TEXT_CHANNEL_TYPES.contains(&channel.kind) {
            return Err(unavailable(format!(
                "channel type {} cannot hold messages",
                channel.kind
            )));
        }

        Ok(ChannelHandle {
            id: channel.id,
            name: channel.name,
        })
    }

    async fn send(&self, channel: &ChannelHandle, text: &str) -> Result<String, PublishError> {
        let body = ResponseData {
            content: Some(text.to_string()),
            allowed_mentions: Some(AllowedMentions::users_only()),
            ..ResponseData::default()
        };
        self.create_message(&channel.id, &body)
            .await
            .map_err(|e| PublishError::TransportFailure {
                cause: e.to_string(),
            })
    }
}

/// Response channel bound to one interaction that was answered with a
/// deferred placeholder. The initial reply edits that placeholder.
pub struct DiscordInteraction {
    rest: DiscordRest,
    interaction_id: String,
    token: String,
    responded: AtomicBool,
}

impl DiscordInteraction {
    pub fn new(rest: DiscordRest, interaction_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            rest,
            interaction_id: interaction_id.into(),
            token: token.into(),
            responded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl InteractionResponder for DiscordInteraction {
    async fn respond(&self, text: &str, visibility: Visibility) -> Result<(), InteractionError> {
        if self.responded.swap(true, Ordering::SeqCst) {
            return Err(InteractionError::AlreadyResponded {
                interaction_id: self.interaction_id.clone(),
            });
        }
        if !visibility.is_ephemeral() {
            tracing::debug!(interaction_id = %self.interaction_id, "Reply visibility fixed by deferral");
        }
        let body = ResponseData {
            content: Some(text.to_string()),
            ..ResponseData::default()
        };
        self.rest
            .edit_original(&self.interaction_id, &self.token, &body)
            .await
    }

    async fn follow_up(&self, text: &str, visibility: Visibility) -> Result<(), InteractionError> {
        let body = ResponseData::text(text, visibility.is_ephemeral());
        self.rest
            .create_followup(&self.interaction_id, &self.token, &body)
            .await
    }
}
