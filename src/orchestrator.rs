//! Dual-sink submission pipeline.
//!
//! ```text
//! Received ──publish ok──▶ Published ──ack──▶ Acknowledged ──append──▶ LogAttempted ──▶ Done
//!    │                                                                     │
//!    └──publish failed──▶ Done (error reply, no log row)                   └─ failed: follow-up warning
//! ```
//!
//! The announcement is the primary effect. Once it is posted the user is
//! told so immediately; the log append runs on its own task afterwards and
//! its failure is reported as a separate follow-up, never as a retraction.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use crate::channels::{ChannelPublisher, InteractionResponder, PublishReceipt, Visibility};
use crate::error::{InteractionError, LogError, PublishError, ValidationError};
use crate::sheets::{Ack, LogWriter};
use crate::submission::{
    Actor, LogRow, RawFields, Submission, SubmissionKind, compose, validate,
};

/// Pipeline states, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Published,
    Acknowledged,
    LogAttempted,
    Done,
}

/// How a submission ended.
#[derive(Debug)]
pub enum Outcome {
    /// Input failed validation; nothing was published or logged.
    Rejected(ValidationError),
    /// The announcement could not be posted; nothing was logged.
    PublishFailed(PublishError),
    /// The announcement is posted. `log` carries the independent log result.
    Delivered {
        receipt: PublishReceipt,
        log: Result<Ack, LogError>,
    },
}

/// Trace of one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub submission_id: Option<Uuid>,
    pub states: Vec<PipelineState>,
    pub outcome: Outcome,
}

impl PipelineReport {
    pub fn final_state(&self) -> Option<PipelineState> {
        self.states.last().copied()
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, Outcome::Delivered { .. })
    }
}

/// User-facing texts.
pub mod messages {
    use crate::error::PublishError;
    use crate::submission::SubmissionKind;

    pub fn acknowledged(kind: SubmissionKind) -> String {
        format!("✅ {}を投稿しました！", kind.spec().title)
    }

    pub fn publish_failed(err: &PublishError) -> String {
        match err {
            PublishError::ChannelUnavailable { .. } => {
                "エラー: 投稿先のチャンネルが見つかりませんでした。".to_string()
            }
            PublishError::TransportFailure { .. } => {
                "エラー: 投稿に失敗しました。時間をおいて再度お試しください。".to_string()
            }
        }
    }

    pub fn log_failed(kind: SubmissionKind) -> String {
        format!(
            "⚠️ {}はチャンネルに投稿されましたが、スプレッドシートへの記録に失敗しました。",
            kind.spec().title
        )
    }
}

/// Runs submissions through publish and log.
#[derive(Clone)]
pub struct Orchestrator {
    publisher: ChannelPublisher,
    log_writer: LogWriter,
}

impl Orchestrator {
    pub fn new(publisher: ChannelPublisher, log_writer: LogWriter) -> Self {
        Self {
            publisher,
            log_writer,
        }
    }

    /// Validate and process one modal submission to completion.
    pub async fn run(
        &self,
        kind: SubmissionKind,
        actor: Actor,
        fields: &RawFields,
        responder: &dyn InteractionResponder,
    ) -> PipelineReport {
        let submission = match validate(kind, actor, fields) {
            Ok(submission) => submission,
            Err(e) => {
                tracing::info!(%kind, "Rejected submission: {}", e);
                reply(responder, &e.user_message()).await;
                return PipelineReport {
                    submission_id: None,
                    states: vec![PipelineState::Done],
                    outcome: Outcome::Rejected(e),
                };
            }
        };

        self.deliver(submission, responder).await
    }

    /// Publish and log an already validated submission.
    pub async fn deliver(
        &self,
        submission: Submission,
        responder: &dyn InteractionResponder,
    ) -> PipelineReport {
        let span = tracing::info_span!(
            "submission",
            id = %submission.id(),
            kind = %submission.kind(),
            actor = %submission.actor().id,
        );
        self.process(submission, responder).instrument(span).await
    }

    async fn process(
        &self,
        submission: Submission,
        responder: &dyn InteractionResponder,
    ) -> PipelineReport {
        let kind = submission.kind();
        let mut states = vec![PipelineState::Received];

        let announcement = compose(&submission);
        let row = LogRow::new(&submission, Utc::now());

        let receipt = match self.publisher.publish(&announcement).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!("Announcement not published, skipping log: {}", e);
                reply(responder, &messages::publish_failed(&e)).await;
                states.push(PipelineState::Done);
                return PipelineReport {
                    submission_id: Some(submission.id()),
                    states,
                    outcome: Outcome::PublishFailed(e),
                };
            }
        };
        states.push(PipelineState::Published);

        reply(responder, &messages::acknowledged(kind)).await;
        states.push(PipelineState::Acknowledged);
        tracing::info!(
            message_id = %receipt.message_id,
            primary = %submission.primary_text(),
            "Announcement posted"
        );

        let log = match self.log_writer.spawn_append(row).await {
            Ok(result) => result,
            Err(join_error) => Err(LogError::Task(join_error.to_string())),
        };
        states.push(PipelineState::LogAttempted);

        match &log {
            Ok(ack) => tracing::debug!(sheet = %ack.sheet_name, "Log row appended"),
            Err(e) => {
                tracing::warn!("Log append failed after announcement was posted: {}", e);
                if let Err(follow_up_error) = responder
                    .follow_up(&messages::log_failed(kind), Visibility::Ephemeral)
                    .await
                {
                    tracing::error!("Could not deliver log failure warning: {}", follow_up_error);
                }
            }
        }
        states.push(PipelineState::Done);

        PipelineReport {
            submission_id: Some(submission.id()),
            states,
            outcome: Outcome::Delivered { receipt, log },
        }
    }
}

/// Pipeline runs started outside a request/response cycle.
///
/// The interactions endpoint answers Discord before the pipeline finishes,
/// so shutdown has to wait here or a posted announcement could lose its log
/// row and its warning.
#[derive(Clone, Default)]
pub struct PipelineTasks {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl PipelineTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `run` on its own task. Finished runs are reaped first.
    pub async fn spawn<F>(&self, run: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().await;
        while let Some(finished) = set.try_join_next() {
            log_join(finished);
        }
        set.spawn(run);
    }

    /// Wait for every unreaped run. Returns how many were awaited.
    pub async fn drain(&self) -> usize {
        let mut set = std::mem::take(&mut *self.set.lock().await);
        let mut awaited = 0;
        while let Some(result) = set.join_next().await {
            log_join(result);
            awaited += 1;
        }
        awaited
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!("Pipeline task did not complete: {}", e);
    }
}

/// Send the first reply of an interaction. If something already answered it,
/// fall back to a follow-up instead of a second initial response.
async fn reply(responder: &dyn InteractionResponder, text: &str) {
    match responder.respond(text, Visibility::Ephemeral).await {
        Ok(()) => {}
        Err(InteractionError::AlreadyResponded { interaction_id }) => {
            tracing::warn!(%interaction_id, "Interaction already answered, using follow-up");
            if let Err(e) = responder.follow_up(text, Visibility::Ephemeral).await {
                tracing::error!("Follow-up reply failed: {}", e);
            }
        }
        Err(e) => tracing::error!("Interaction reply failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::channels::{ChannelHandle, MessagingChannel};
    use crate::sheets::LogStore;

    #[derive(Default)]
    struct Channel {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingChannel for Channel {
        async fn resolve(&self, channel_id: &str) -> Result<ChannelHandle, PublishError> {
            Ok(ChannelHandle {
                id: channel_id.to_string(),
                name: None,
            })
        }

        async fn send(&self, _: &ChannelHandle, text: &str) -> Result<String, PublishError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok("m1".to_string())
        }
    }

    struct PanickingStore;

    #[async_trait]
    impl LogStore for PanickingStore {
        async fn append_row(&self, _: &str, _: &str, _: &[String]) -> Result<(), LogError> {
            panic!("store blew up");
        }
    }

    #[derive(Default)]
    struct Responder {
        already: bool,
        responses: Mutex<Vec<String>>,
        follow_ups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InteractionResponder for Responder {
        async fn respond(&self, text: &str, _: Visibility) -> Result<(), InteractionError> {
            if self.already {
                return Err(InteractionError::AlreadyResponded {
                    interaction_id: "i".to_string(),
                });
            }
            self.responses.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn follow_up(&self, text: &str, _: Visibility) -> Result<(), InteractionError> {
            self.follow_ups.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn orchestrator(store: Arc<dyn LogStore>) -> Orchestrator {
        Orchestrator::new(
            ChannelPublisher::new(Arc::new(Channel::default()), "42"),
            LogWriter::new(store, "sheet", "log"),
        )
    }

    #[tokio::test]
    async fn test_panicking_log_task_is_reported_as_log_failure() {
        let orch = orchestrator(Arc::new(PanickingStore));
        let responder = Responder::default();

        let report = orch
            .run(
                SubmissionKind::Report,
                Actor::new("1", "a"),
                &RawFields::new("done", None),
                &responder,
            )
            .await;

        match report.outcome {
            Outcome::Delivered { log: Err(LogError::Task(_)), .. } => {}
            other => panic!("expected task failure, got {:?}", other),
        }
        assert_eq!(responder.follow_ups.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_already_answered_interaction_gets_follow_up() {
        let orch = orchestrator(Arc::new(PanickingStore));
        let responder = Responder {
            already: true,
            ..Responder::default()
        };

        orch.run(
            SubmissionKind::Declaration,
            Actor::new("1", "a"),
            &RawFields::new("   ", None),
            &responder,
        )
        .await;

        assert!(responder.responses.lock().unwrap().is_empty());
        let follow_ups = responder.follow_ups.lock().unwrap();
        assert_eq!(follow_ups.len(), 1);
        assert!(follow_ups[0].contains("やること"));
    }

    #[tokio::test]
    async fn test_drain_waits_for_running_pipelines() {
        let tasks = PipelineTasks::new();
        let gate = Arc::new(tokio::sync::Notify::new());
        let done = Arc::new(AtomicBool::new(false));

        let (task_gate, task_done) = (gate.clone(), done.clone());
        tasks
            .spawn(async move {
                task_gate.notified().await;
                task_done.store(true, Ordering::SeqCst);
            })
            .await;

        let drainer = tasks.clone();
        let drain = tokio::spawn(async move { drainer.drain().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!drain.is_finished());

        gate.notify_one();
        assert_eq!(drain.await.unwrap(), 1);
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tasks.drain().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_pipeline_does_not_abort_drain() {
        let tasks = PipelineTasks::new();
        tasks.spawn(async { panic!("pipeline blew up") }).await;
        assert_eq!(tasks.drain().await, 1);
    }

    #[test]
    fn test_messages_name_the_kind() {
        assert_eq!(
            messages::acknowledged(SubmissionKind::Declaration),
            "✅ やるぞ宣言を投稿しました！"
        );
        assert!(messages::log_failed(SubmissionKind::Report).contains("やったよ報告"));
    }
}
