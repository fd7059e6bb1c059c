//! Interactions endpoint and keep-alive routes.
//!
//! Discord POSTs every interaction to `/interactions`. Slash commands and
//! panel buttons are answered inline with the form modal. A modal submission
//! is validated inline: invalid input gets its error message right away,
//! valid input gets a deferred ephemeral placeholder and is handed to the
//! [`Orchestrator`] on a tracked task, which replies by editing that
//! placeholder.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::actions::{Action, ActionRegistry, Trigger};
use crate::channels::payload::{Interaction, InteractionResponse, interaction_type};
use crate::channels::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::channels::{DiscordInteraction, DiscordRest, InteractionResponder, SignatureVerifier};
use crate::orchestrator::{Orchestrator, PipelineTasks};
use crate::submission::{SubmissionKind, validate};

const UNKNOWN_ACTION: &str = "この操作は現在利用できません。";

/// Creates the response channel for a received interaction.
pub trait ResponderFactory: Send + Sync {
    fn responder(&self, interaction: &Interaction) -> Arc<dyn InteractionResponder>;
}

impl ResponderFactory for DiscordRest {
    fn responder(&self, interaction: &Interaction) -> Arc<dyn InteractionResponder> {
        Arc::new(DiscordInteraction::new(
            self.clone(),
            interaction.id.clone(),
            interaction.token.clone(),
        ))
    }
}

/// Shared state of the interactions routes.
#[derive(Clone)]
pub struct InteractionState {
    pub verifier: SignatureVerifier,
    pub registry: Arc<ActionRegistry>,
    pub orchestrator: Orchestrator,
    pub responders: Arc<dyn ResponderFactory>,
    /// Pipeline runs still in flight; drained on shutdown.
    pub tasks: PipelineTasks,
}

/// All routes served by the bot.
pub fn router(state: InteractionState) -> Router {
    Router::new()
        .route("/interactions", post(handle_interaction))
        .with_state(state)
        .route("/", get(alive))
        .route("/status", get(status))
}

async fn alive() -> &'static str {
    "Bot is alive!"
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "やる・やったBot is running",
    }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn handle_interaction(
    State(state): State<InteractionState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(signature), Some(timestamp)) = (
        header(&headers, SIGNATURE_HEADER),
        header(&headers, TIMESTAMP_HEADER),
    ) else {
        return (StatusCode::UNAUTHORIZED, "missing request signature").into_response();
    };
    if let Err(e) = state.verifier.verify(signature, timestamp, &body) {
        tracing::warn!("Rejected interaction: {}", e);
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            tracing::warn!("Malformed interaction payload: {}", e);
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };

    if interaction.kind == interaction_type::PING {
        return Json(InteractionResponse::pong()).into_response();
    }

    if !state.registry.is_ready() {
        tracing::warn!(interaction_id = %interaction.id, "Interaction before actions restored");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let trigger = match (interaction.kind, interaction.command_name(), interaction.custom_id()) {
        (interaction_type::APPLICATION_COMMAND, Some(name), _) => Trigger::command(name),
        (interaction_type::MESSAGE_COMPONENT | interaction_type::MODAL_SUBMIT, _, Some(id)) => {
            Trigger::component(id)
        }
        _ => {
            tracing::warn!(kind = interaction.kind, "Unsupported interaction");
            return (StatusCode::BAD_REQUEST, "unsupported interaction").into_response();
        }
    };

    match state.registry.resolve(&trigger).await {
        None => {
            tracing::warn!(?trigger, "No action registered");
            Json(InteractionResponse::message(UNKNOWN_ACTION, true)).into_response()
        }
        Some(Action::OpenForm(kind)) => {
            tracing::info!(%kind, ?trigger, "Opening form");
            Json(form_modal(kind)).into_response()
        }
        Some(Action::Submit(kind)) => submit(state, interaction, kind).await,
    }
}

fn form_modal(kind: SubmissionKind) -> InteractionResponse {
    let spec = kind.spec();
    InteractionResponse::modal(spec.modal_id, spec.title, spec.modal_components())
}

async fn submit(state: InteractionState, interaction: Interaction, kind: SubmissionKind) -> Response {
    let Some(actor) = interaction.actor() else {
        tracing::warn!(interaction_id = %interaction.id, "Modal submit without user");
        return (StatusCode::BAD_REQUEST, "missing user").into_response();
    };
    let fields = kind.spec().read_fields(&interaction);

    let submission = match validate(kind, actor, &fields) {
        Ok(submission) => submission,
        Err(e) => {
            tracing::info!(%kind, "Rejected submission: {}", e);
            return Json(InteractionResponse::message(&e.user_message(), true)).into_response();
        }
    };

    let responder = state.responders.responder(&interaction);
    let orchestrator = state.orchestrator.clone();
    state
        .tasks
        .spawn(async move {
            let report = orchestrator.deliver(submission, responder.as_ref()).await;
            tracing::debug!(final_state = ?report.final_state(), "Submission finished");
        })
        .await;

    Json(InteractionResponse::deferred(true)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_modal_uses_kind_table() {
        let json = serde_json::to_value(form_modal(SubmissionKind::Declaration)).unwrap();
        assert_eq!(json["type"], 9);
        assert_eq!(json["data"]["custom_id"], "yaru:modal");
        assert_eq!(json["data"]["title"], "やるぞ宣言");
        assert_eq!(
            json["data"]["components"][0]["components"][0]["custom_id"],
            "yaru_koto"
        );
        assert_eq!(
            json["data"]["components"][1]["components"][0]["max_length"],
            200
        );
    }
}
