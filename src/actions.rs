//! Persistent action surface.
//!
//! Buttons posted by an earlier process keep their `custom_id`. After a
//! restart the registry maps those stable ids (and the slash command names
//! and modal ids) back to what they trigger, so old panels keep working.
//! [`ActionRegistry::restore`] must run before the interactions endpoint
//! accepts traffic; until then [`ActionRegistry::is_ready`] is false.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::submission::SubmissionKind;

/// What an incoming interaction refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Slash command by name.
    Command(String),
    /// Button or modal by custom id.
    Component(String),
}

impl Trigger {
    pub fn command(name: &str) -> Self {
        Self::Command(name.to_string())
    }

    pub fn component(custom_id: &str) -> Self {
        Self::Component(custom_id.to_string())
    }
}

/// Handler bound to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Show the input form for a kind.
    OpenForm(SubmissionKind),
    /// Run the submission pipeline for a kind.
    Submit(SubmissionKind),
}

/// Trigger → action mapping shared by every interaction.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    entries: RwLock<HashMap<Trigger, Action>>,
    ready: AtomicBool,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `trigger` to `action`. Re-binding replaces, so a trigger never
    /// has more than one handler. Returns true if the trigger was new.
    pub async fn register(&self, trigger: Trigger, action: Action) -> bool {
        let previous = self.entries.write().await.insert(trigger.clone(), action);
        if let Some(previous) = previous
            && previous != action
        {
            tracing::warn!(?trigger, ?previous, ?action, "Rebound action trigger");
        }
        previous.is_none()
    }

    /// Install every entry point of every submission kind and mark the
    /// registry ready. Safe to call more than once.
    pub async fn restore(&self) -> usize {
        for kind in SubmissionKind::ALL {
            let spec = kind.spec();
            self.register(Trigger::command(spec.command), Action::OpenForm(kind))
                .await;
            self.register(Trigger::component(spec.button_id), Action::OpenForm(kind))
                .await;
            self.register(Trigger::component(spec.modal_id), Action::Submit(kind))
                .await;
        }
        self.ready.store(true, Ordering::SeqCst);
        let count = self.len().await;
        tracing::info!(entries = count, "Restored persistent actions");
        count
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub async fn resolve(&self, trigger: &Trigger) -> Option<Action> {
        self.entries.read().await.get(trigger).copied()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
