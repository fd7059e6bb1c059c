//! Channel publisher: one announcement, one message.

use std::sync::Arc;

use crate::channels::MessagingChannel;
use crate::error::PublishError;
use crate::submission::Announcement;

/// Proof that an announcement is visible in the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub channel_id: String,
    pub message_id: String,
}

/// Posts announcements to the configured target channel.
///
/// Never retries. A retry after an ambiguous failure could post the same
/// announcement twice, so that decision is left to the caller.
#[derive(Clone)]
pub struct ChannelPublisher {
    channel: Arc<dyn MessagingChannel>,
    target_channel_id: String,
}

impl ChannelPublisher {
    pub fn new(channel: Arc<dyn MessagingChannel>, target_channel_id: impl Into<String>) -> Self {
        Self {
            channel,
            target_channel_id: target_channel_id.into(),
        }
    }

    /// Resolve the target channel and send the announcement once.
    pub async fn publish(&self, announcement: &Announcement) -> Result<PublishReceipt, PublishError> {
        let handle = match self.channel.resolve(&self.target_channel_id).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(channel_id = %self.target_channel_id, "Target channel unavailable: {}", e);
                return Err(e);
            }
        };

        let message_id = self
            .channel
            .send(&handle, announcement.as_str())
            .await
            .inspect_err(|e| {
                tracing::warn!(channel_id = %handle.id, "Announcement send failed: {}", e);
            })?;

        tracing::debug!(channel_id = %handle.id, message_id = %message_id, "Announcement posted");
        Ok(PublishReceipt {
            channel_id: handle.id,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::channels::ChannelHandle;
    use crate::submission::{Actor, RawFields, SubmissionKind, compose, validate};

    #[derive(Default)]
    struct FakeChannel {
        missing: bool,
        fail_send: bool,
        resolves: Mutex<u32>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingChannel for FakeChannel {
        async fn resolve(&self, channel_id: &str) -> Result<ChannelHandle, PublishError> {
            *self.resolves.lock().unwrap() += 1;
            if self.missing {
                return Err(PublishError::ChannelUnavailable {
                    channel_id: channel_id.to_string(),
                    reason: "not found".to_string(),
                });
            }
            Ok(ChannelHandle {
                id: channel_id.to_string(),
                name: Some("general".to_string()),
            })
        }

        async fn send(&self, _channel: &ChannelHandle, text: &str) -> Result<String, PublishError> {
            if self.fail_send {
                return Err(PublishError::TransportFailure {
                    cause: "rate limited".to_string(),
                });
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_string());
            Ok(format!("m{}", sent.len()))
        }
    }

    fn announcement() -> Announcement {
        let sub = validate(
            SubmissionKind::Declaration,
            Actor::new("7", "nana"),
            &RawFields::new("走る", None),
        )
        .unwrap();
        compose(&sub)
    }

    #[tokio::test]
    async fn test_publish_sends_exactly_once() {
        let channel = Arc::new(FakeChannel::default());
        let publisher = ChannelPublisher::new(channel.clone(), "42");

        let receipt = publisher.publish(&announcement()).await.unwrap();
        assert_eq!(receipt.channel_id, "42");
        assert_eq!(receipt.message_id, "m1");
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_channel_skips_send() {
        let channel = Arc::new(FakeChannel {
            missing: true,
            ..FakeChannel::default()
        });
        let publisher = ChannelPublisher::new(channel.clone(), "42");

        let err = publisher.publish(&announcement()).await.unwrap_err();
        assert!(matches!(err, PublishError::ChannelUnavailable { .. }));
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let channel = Arc::new(FakeChannel {
            fail_send: true,
            ..FakeChannel::default()
        });
        let publisher = ChannelPublisher::new(channel.clone(), "42");

        let err = publisher.publish(&announcement()).await.unwrap_err();
        assert!(matches!(err, PublishError::TransportFailure { .. }));
        assert_eq!(*channel.resolves.lock().unwrap(), 1);
    }
}
