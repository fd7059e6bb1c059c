//! Slash command registration and the persistent button panel.

use serde::Serialize;

use crate::channels::DiscordRest;
use crate::channels::payload::{Component, ResponseData};
use crate::error::ChannelError;
use crate::submission::SubmissionKind;

/// `CHAT_INPUT` application command type.
const CHAT_INPUT: u8 = 1;

const PANEL_TEXT: &str = "ボタンから「やるぞ宣言」または「やったよ報告」ができます。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: u8,
}

/// One slash command per submission kind.
pub fn command_definitions() -> Vec<CommandDefinition> {
    SubmissionKind::ALL
        .iter()
        .map(|kind| {
            let spec = kind.spec();
            CommandDefinition {
                name: spec.command,
                description: spec.command_description,
                kind: CHAT_INPUT,
            }
        })
        .collect()
}

/// Overwrite the application's commands with [`command_definitions`].
pub async fn register_commands(
    rest: &DiscordRest,
    guild_id: Option<&str>,
) -> Result<usize, ChannelError> {
    let definitions = command_definitions();
    let body = serde_json::to_value(&definitions)
        .map_err(|e| ChannelError::InvalidPayload(e.to_string()))?;
    let count = rest.overwrite_commands(guild_id, &body).await?;
    for definition in &definitions {
        tracing::info!(command = definition.name, ?guild_id, "Registered slash command");
    }
    Ok(count)
}

/// Message carrying one button per submission kind. The buttons' custom ids
/// are stable, so a panel posted once stays usable across restarts.
pub fn panel_message() -> ResponseData {
    let buttons = SubmissionKind::ALL
        .iter()
        .map(|kind| kind.spec().button())
        .collect();
    ResponseData {
        content: Some(PANEL_TEXT.to_string()),
        components: vec![Component::row(buttons)],
        ..ResponseData::default()
    }
}

/// Post the button panel to `channel_id`.
pub async fn post_panel(rest: &DiscordRest, channel_id: &str) -> Result<String, ChannelError> {
    let message_id = rest.create_message(channel_id, &panel_message()).await?;
    tracing::info!(%channel_id, %message_id, "Posted action panel");
    Ok(message_id)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_command_definitions_json() {
        let json = serde_json::to_value(command_definitions()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "name": "yaru", "description": "やるぞ宣言をします", "type": 1 },
                { "name": "yatta", "description": "やったよ報告をします", "type": 1 },
            ])
        );
    }

    #[test]
    fn test_panel_buttons_use_stable_ids() {
        let json = serde_json::to_value(panel_message()).unwrap();
        let buttons = &json["components"][0]["components"];
        assert_eq!(buttons[0]["type"], 2);
        assert_eq!(buttons[0]["custom_id"], "yaru:open");
        assert_eq!(buttons[1]["custom_id"], "yatta:open");
        assert!(json.get("flags").is_none());
    }
}
