//! Error types for yaru-bot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Log error: {0}")]
    Log(#[from] LogError),

    #[error("Interaction error: {0}")]
    Interaction(#[from] InteractionError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load service account credentials from {path}: {reason}")]
    Credentials { path: String, reason: String },
}

/// Rejected form input.
///
/// Carries the field label so the user sees which field was wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field {field} is empty")]
    Required { field: &'static str },

    #[error("field {field} is {actual} characters long, maximum is {max}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

impl ValidationError {
    /// Field-level message shown to the submitting user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Required { field } => format!("入力エラー: 「{}」を入力してください。", field),
            Self::TooLong { field, max, actual } => format!(
                "入力エラー: 「{}」は{}文字以内で入力してください（現在{}文字）。",
                field, max, actual
            ),
        }
    }
}

/// Failure to post an announcement. Fatal to the current submission.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("Channel {channel_id} is unavailable: {reason}")]
    ChannelUnavailable { channel_id: String, reason: String },

    #[error("Failed to send announcement: {cause}")]
    TransportFailure { cause: String },
}

/// Failure to append a log row. Never retracts a published announcement.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LogError {
    #[error("Log store authentication failed: {0}")]
    Auth(String),

    #[error("Log store unreachable: {0}")]
    Unreachable(String),

    #[error("Log store rejected append ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Log append task failed: {0}")]
    Task(String),
}

/// Errors from the interaction response collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InteractionError {
    /// The interaction already received its one initial response.
    #[error("Interaction {interaction_id} was already responded to")]
    AlreadyResponded { interaction_id: String },

    #[error("Failed to deliver interaction response: {0}")]
    Transport(String),
}

/// Errors obtaining a service account access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint rejected the grant ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Discord channel-level errors outside the submission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Discord request {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Invalid request signature")]
    InvalidSignature,

    #[error("Invalid interaction payload: {0}")]
    InvalidPayload(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_message_names_field() {
        let err = ValidationError::Required { field: "やること" };
        assert!(err.user_message().contains("「やること」"));
        assert!(err.to_string().contains("やること"));
    }

    #[test]
    fn test_too_long_message_includes_bounds() {
        let err = ValidationError::TooLong {
            field: "やったこと",
            max: 500,
            actual: 501,
        };
        let msg = err.user_message();
        assert!(msg.contains("500"));
        assert!(msg.contains("501"));
    }

    #[test]
    fn test_publish_error_display() {
        let err = PublishError::ChannelUnavailable {
            channel_id: "42".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Channel 42 is unavailable: not found");
    }

    #[test]
    fn test_log_error_rejected_display() {
        let err = LogError::Rejected {
            status: 403,
            body: "quota".to_string(),
        };
        assert!(err.to_string().contains("403"));
    }

    // --- From conversions into top-level Error ---

    #[test]
    fn test_error_from_config_error() {
        let err = Error::from(ConfigError::MissingEnvVar("TARGET_CHANNEL_ID".to_string()));
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_from_log_error() {
        let err = Error::from(LogError::Unreachable("dns".to_string()));
        assert!(err.to_string().contains("Log error"));
    }

    #[test]
    fn test_error_from_interaction_error() {
        let err = Error::from(InteractionError::AlreadyResponded {
            interaction_id: "1".to_string(),
        });
        assert!(err.to_string().contains("already responded"));
    }
}
