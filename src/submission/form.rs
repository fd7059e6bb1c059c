//! Input form model.
//!
//! Both submission kinds present the same two-field form; they differ only in
//! labels, ids and length bound, which live in one static table per kind.

use uuid::Uuid;

use crate::channels::payload::{Component, Interaction, component_type};
use crate::error::ValidationError;
use crate::submission::Actor;

/// Text input styles.
const STYLE_SHORT: u8 = 1;
const STYLE_PARAGRAPH: u8 = 2;

/// Button styles.
const BUTTON_PRIMARY: u8 = 1;
const BUTTON_SUCCESS: u8 = 3;

/// What the user is submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    /// "I will do X" (やるぞ宣言).
    Declaration,
    /// "I did X" (やったよ報告).
    Report,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 2] = [SubmissionKind::Declaration, SubmissionKind::Report];

    /// The form table entry for this kind.
    pub fn spec(self) -> &'static FormSpec {
        match self {
            Self::Declaration => &DECLARATION,
            Self::Report => &REPORT,
        }
    }

    /// Label written to the log sheet.
    pub fn log_label(self) -> &'static str {
        match self {
            Self::Declaration => "Declaration",
            Self::Report => "Report",
        }
    }
}

impl std::fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.log_label())
    }
}

/// One text input of a form.
#[derive(Debug)]
pub struct FieldSpec {
    /// Stable component id inside the modal.
    pub custom_id: &'static str,
    /// Label shown in the modal.
    pub label: &'static str,
    /// Label used in the channel announcement.
    pub announce_label: &'static str,
    pub placeholder: &'static str,
    pub required: bool,
}

/// Everything kind-specific about a submission form and its entry points.
#[derive(Debug)]
pub struct FormSpec {
    pub kind: SubmissionKind,
    pub command: &'static str,
    pub command_description: &'static str,
    pub button_id: &'static str,
    pub button_label: &'static str,
    pub button_style: u8,
    pub modal_id: &'static str,
    pub title: &'static str,
    pub primary: FieldSpec,
    pub secondary: FieldSpec,
    /// Character bound applied to both fields.
    pub max_len: usize,
    pub paragraph: bool,
}

static DECLARATION: FormSpec = FormSpec {
    kind: SubmissionKind::Declaration,
    command: "yaru",
    command_description: "やるぞ宣言をします",
    button_id: "yaru:open",
    button_label: "やるぞ宣言",
    button_style: BUTTON_PRIMARY,
    modal_id: "yaru:modal",
    title: "やるぞ宣言",
    primary: FieldSpec {
        custom_id: "yaru_koto",
        label: "やること",
        announce_label: "やること",
        placeholder: "例: Pythonの勉強を1時間やる",
        required: true,
    },
    secondary: FieldSpec {
        custom_id: "shime_kiri",
        label: "締切（任意）",
        announce_label: "締切",
        placeholder: "例: 明日の18時まで",
        required: false,
    },
    max_len: 200,
    paragraph: false,
};

static REPORT: FormSpec = FormSpec {
    kind: SubmissionKind::Report,
    command: "yatta",
    command_description: "やったよ報告をします",
    button_id: "yatta:open",
    button_label: "やったよ報告",
    button_style: BUTTON_SUCCESS,
    modal_id: "yatta:modal",
    title: "やったよ報告",
    primary: FieldSpec {
        custom_id: "yatta_koto",
        label: "やったこと",
        announce_label: "やったこと",
        placeholder: "例: Pythonの勉強を1時間やりました",
        required: true,
    },
    secondary: FieldSpec {
        custom_id: "kanso",
        label: "ひとこと感想（任意）",
        announce_label: "ひとこと感想",
        placeholder: "例: 思ったより難しかったけど楽しかった！",
        required: false,
    },
    max_len: 500,
    paragraph: true,
};

impl FormSpec {
    /// Modal rows for this form, one text input per row.
    pub fn modal_components(&self) -> Vec<Component> {
        [&self.primary, &self.secondary]
            .into_iter()
            .map(|field| Component::row(vec![self.text_input(field)]))
            .collect()
    }

    fn text_input(&self, field: &FieldSpec) -> Component {
        Component {
            kind: component_type::TEXT_INPUT,
            custom_id: Some(field.custom_id.to_string()),
            label: Some(field.label.to_string()),
            style: Some(if self.paragraph {
                STYLE_PARAGRAPH
            } else {
                STYLE_SHORT
            }),
            placeholder: Some(field.placeholder.to_string()),
            required: Some(field.required),
            max_length: Some(self.max_len),
            ..Component::default()
        }
    }

    /// The panel button that opens this form.
    pub fn button(&self) -> Component {
        Component::button(self.button_id, self.button_label, self.button_style)
    }

    /// Read this form's raw field values from a modal submit.
    pub fn read_fields(&self, interaction: &Interaction) -> RawFields {
        RawFields {
            primary: interaction
                .submitted_value(self.primary.custom_id)
                .unwrap_or_default()
                .to_string(),
            secondary: interaction
                .submitted_value(self.secondary.custom_id)
                .map(str::to_string),
        }
    }
}

/// Unvalidated field values as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub primary: String,
    pub secondary: Option<String>,
}

impl RawFields {
    pub fn new(primary: impl Into<String>, secondary: Option<&str>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.map(str::to_string),
        }
    }
}

/// One validated user event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    id: Uuid,
    kind: SubmissionKind,
    actor: Actor,
    primary_text: String,
    secondary_text: Option<String>,
}

impl Submission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SubmissionKind {
        self.kind
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn primary_text(&self) -> &str {
        &self.primary_text
    }

    /// `None` when the field was absent, `Some("")` when submitted empty.
    pub fn secondary_text(&self) -> Option<&str> {
        self.secondary_text.as_deref()
    }

    /// The secondary text if it carries anything besides whitespace.
    pub fn secondary_present(&self) -> Option<&str> {
        self.secondary_text.as_deref().filter(|s| !s.is_empty())
    }
}

/// Validate raw input into a [`Submission`].
///
/// Surrounding whitespace is trimmed from both fields. The primary field
/// must be non-empty afterwards and both must fit the kind's bound.
pub fn validate(
    kind: SubmissionKind,
    actor: Actor,
    fields: &RawFields,
) -> Result<Submission, ValidationError> {
    let spec = kind.spec();

    let primary = fields.primary.trim();
    if primary.is_empty() {
        return Err(ValidationError::Required {
            field: spec.primary.announce_label,
        });
    }
    check_len(&spec.primary, primary, spec.max_len)?;

    let secondary = fields.secondary.as_deref().map(str::trim);
    if let Some(text) = secondary {
        check_len(&spec.secondary, text, spec.max_len)?;
    }

    Ok(Submission {
        id: Uuid::new_v4(),
        kind,
        actor,
        primary_text: primary.to_string(),
        secondary_text: secondary.map(str::to_string),
    })
}

fn check_len(field: &FieldSpec, text: &str, max: usize) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.announce_label,
            max,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new("1001", "taro")
    }

    #[test]
    fn test_valid_declaration() {
        let fields = RawFields::new("  Read 10 pages ", Some("tomorrow"));
        let sub = validate(SubmissionKind::Declaration, actor(), &fields).unwrap();
        assert_eq!(sub.primary_text(), "Read 10 pages");
        assert_eq!(sub.secondary_text(), Some("tomorrow"));
        assert_eq!(sub.kind(), SubmissionKind::Declaration);
    }

    #[test]
    fn test_blank_primary_rejected_regardless_of_secondary() {
        for primary in ["", "   ", "\n\t ", "\u{3000}"] {
            for secondary in [None, Some(""), Some("note")] {
                let fields = RawFields::new(primary, secondary);
                let err = validate(SubmissionKind::Report, actor(), &fields).unwrap_err();
                assert_eq!(err, ValidationError::Required { field: "やったこと" });
            }
        }
    }

    #[test]
    fn test_declaration_bound_is_200_chars() {
        let ok = RawFields::new("あ".repeat(200), None);
        assert!(validate(SubmissionKind::Declaration, actor(), &ok).is_ok());

        let long = RawFields::new("あ".repeat(201), None);
        let err = validate(SubmissionKind::Declaration, actor(), &long).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "やること",
                max: 200,
                actual: 201
            }
        );
    }

    #[test]
    fn test_report_secondary_bound_is_500_chars() {
        let fields = RawFields::new("done", Some(&"x".repeat(501)));
        let err = validate(SubmissionKind::Report, actor(), &fields).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TooLong {
                field: "ひとこと感想",
                max: 500,
                ..
            }
        ));
    }

    #[test]
    fn test_absent_secondary_distinct_from_empty() {
        let absent = validate(SubmissionKind::Report, actor(), &RawFields::new("a", None)).unwrap();
        let empty =
            validate(SubmissionKind::Report, actor(), &RawFields::new("a", Some("  "))).unwrap();
        assert_eq!(absent.secondary_text(), None);
        assert_eq!(empty.secondary_text(), Some(""));
        assert_eq!(empty.secondary_present(), None);
    }

    #[test]
    fn test_each_submission_gets_fresh_id() {
        let fields = RawFields::new("a", None);
        let a = validate(SubmissionKind::Report, actor(), &fields).unwrap();
        let b = validate(SubmissionKind::Report, actor(), &fields).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_modal_components_carry_constraints() {
        let rows = SubmissionKind::Report.spec().modal_components();
        assert_eq!(rows.len(), 2);
        let primary = &rows[0].components[0];
        assert_eq!(primary.custom_id.as_deref(), Some("yatta_koto"));
        assert_eq!(primary.required, Some(true));
        assert_eq!(primary.max_length, Some(500));
        assert_eq!(primary.style, Some(STYLE_PARAGRAPH));
        let secondary = &rows[1].components[0];
        assert_eq!(secondary.required, Some(false));
    }

    #[test]
    fn test_form_ids_are_unique_across_kinds() {
        let mut ids = Vec::new();
        for kind in SubmissionKind::ALL {
            let spec = kind.spec();
            assert_eq!(spec.kind, kind);
            ids.extend([spec.command, spec.button_id, spec.modal_id]);
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }
}
