//! Discord-facing collaborators.
//!
//! The pipeline only talks to two traits: [`MessagingChannel`] for posting
//! announcements and [`InteractionResponder`] for answering the user who
//! submitted. [`DiscordRest`] implements both over the REST API; tests swap
//! in recording fakes.
//!
//! # Architecture
//!
//! ```text
//!  Discord ──POST /interactions──▶ interactions::router ──▶ Orchestrator
//!                                        │                     │
//!                                 ActionRegistry       ChannelPublisher ──▶ MessagingChannel
//!                                                              │
//!                                                   InteractionResponder (respond / follow_up)
//! ```

pub mod discord;
pub mod interactions;
pub mod payload;
mod publisher;
pub mod signature;
mod webhook_server;

use async_trait::async_trait;

use crate::error::{InteractionError, PublishError};

pub use discord::{DiscordConfig, DiscordInteraction, DiscordRest};
pub use interactions::{InteractionState, router};
pub use publisher::{ChannelPublisher, PublishReceipt};
pub use signature::SignatureVerifier;
pub use webhook_server::{WebhookServer, WebhookServerConfig};

/// A resolved, send-capable channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: Option<String>,
}

/// Real-time messaging surface the announcements go to.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Look up a channel by id.
    ///
    /// Returns [`PublishError::ChannelUnavailable`] when the channel is
    /// missing, cannot hold messages, or is not accessible to the bot.
    async fn resolve(&self, channel_id: &str) -> Result<ChannelHandle, PublishError>;

    /// Post `text` as one message. Returns the new message id.
    async fn send(&self, channel: &ChannelHandle, text: &str) -> Result<String, PublishError>;
}

/// Who can see a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only the invoking user.
    Ephemeral,
    /// Everyone in the channel.
    Public,
}

impl Visibility {
    pub fn is_ephemeral(self) -> bool {
        matches!(self, Self::Ephemeral)
    }
}

/// Response channel of a single interaction.
///
/// An interaction accepts at most one initial [`respond`](Self::respond);
/// everything after that must go through [`follow_up`](Self::follow_up).
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn respond(&self, text: &str, visibility: Visibility) -> Result<(), InteractionError>;

    async fn follow_up(&self, text: &str, visibility: Visibility)
    -> Result<(), InteractionError>;
}
