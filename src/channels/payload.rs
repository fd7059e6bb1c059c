//! Discord interaction payloads.
//!
//! Only the subset of the interaction object the bot reads is modelled.
//! Components are one recursive type: action rows, buttons and text inputs
//! share the same shape on the wire, differing only in which fields are set.

use serde::{Deserialize, Serialize};

use crate::submission::Actor;

/// Interaction type codes.
pub mod interaction_type {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
    pub const MESSAGE_COMPONENT: u8 = 3;
    pub const MODAL_SUBMIT: u8 = 5;
}

/// Interaction callback type codes.
pub mod callback_type {
    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
    pub const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;
    pub const MODAL: u8 = 9;
}

/// Component type codes.
pub mod component_type {
    pub const ACTION_ROW: u8 = 1;
    pub const BUTTON: u8 = 2;
    pub const TEXT_INPUT: u8 = 4;
}

/// Message flag that makes a response visible only to the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// An incoming interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Interaction {
    /// Name of the invoked slash command, if any.
    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref()?.name.as_deref()
    }

    /// Custom id of the clicked button or submitted modal, if any.
    pub fn custom_id(&self) -> Option<&str> {
        self.data.as_ref()?.custom_id.as_deref()
    }

    /// The invoking user. Guild interactions carry it on `member`,
    /// direct messages on `user`.
    pub fn actor(&self) -> Option<Actor> {
        if let Some(member) = &self.member
            && let Some(user) = &member.user
        {
            let display = member
                .nick
                .clone()
                .or_else(|| user.global_name.clone())
                .unwrap_or_else(|| user.username.clone());
            return Some(Actor::new(user.id.clone(), display));
        }
        self.user.as_ref().map(|user| {
            let display = user
                .global_name
                .clone()
                .unwrap_or_else(|| user.username.clone());
            Actor::new(user.id.clone(), display)
        })
    }

    /// Value of a submitted modal text input, looked up by its custom id.
    pub fn submitted_value(&self, custom_id: &str) -> Option<&str> {
        let data = self.data.as_ref()?;
        find_value(&data.components, custom_id)
    }
}

fn find_value<'a>(components: &'a [Component], custom_id: &str) -> Option<&'a str> {
    for component in components {
        if component.custom_id.as_deref() == Some(custom_id)
            && let Some(value) = component.value.as_deref()
        {
            return Some(value);
        }
        if let Some(value) = find_value(&component.components, custom_id) {
            return Some(value);
        }
    }
    None
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

/// A message component (action row, button or text input).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl Component {
    /// Wrap components in an action row.
    pub fn row(components: Vec<Component>) -> Self {
        Self {
            kind: component_type::ACTION_ROW,
            components,
            ..Self::default()
        }
    }

    /// A clickable button carrying a stable custom id.
    pub fn button(custom_id: &str, label: &str, style: u8) -> Self {
        Self {
            kind: component_type::BUTTON,
            custom_id: Some(custom_id.to_string()),
            label: Some(label.to_string()),
            style: Some(style),
            ..Self::default()
        }
    }
}

/// Response body for the interaction callback endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: callback_type::PONG,
            data: None,
        }
    }

    pub fn modal(custom_id: &str, title: &str, components: Vec<Component>) -> Self {
        Self {
            kind: callback_type::MODAL,
            data: Some(ResponseData {
                custom_id: Some(custom_id.to_string()),
                title: Some(title.to_string()),
                components,
                ..ResponseData::default()
            }),
        }
    }

    /// "Thinking..." placeholder. The real reply later edits `@original`,
    /// and its visibility is the one chosen here.
    pub fn deferred(ephemeral: bool) -> Self {
        Self {
            kind: callback_type::DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
            data: ephemeral.then(|| ResponseData {
                flags: Some(EPHEMERAL_FLAG),
                ..ResponseData::default()
            }),
        }
    }

    pub fn message(content: &str, ephemeral: bool) -> Self {
        Self {
            kind: callback_type::CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData::text(content, ephemeral)),
        }
    }
}

/// Message or modal data. Also used as the body of follow-up and channel messages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
}

impl ResponseData {
    pub fn text(content: &str, ephemeral: bool) -> Self {
        Self {
            content: Some(content.to_string()),
            flags: ephemeral.then_some(EPHEMERAL_FLAG),
            ..Self::default()
        }
    }
}

/// Restricts which mentions in a message actually ping.
#[derive(Debug, Clone, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

impl AllowedMentions {
    pub fn users_only() -> Self {
        Self {
            parse: vec!["users".to_string()],
        }
    }
}
