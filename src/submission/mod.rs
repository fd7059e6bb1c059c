//! Submissions: validated declarations and reports.
//!
//! [`form`] turns raw modal input into a [`Submission`]; [`compose`] renders
//! the channel announcement and the log row from it.

pub mod compose;
pub mod form;

pub use compose::{Announcement, LogRow, compose};
pub use form::{FieldSpec, FormSpec, RawFields, Submission, SubmissionKind, validate};

/// The user behind a submission. Owned by Discord, referenced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Discord mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
