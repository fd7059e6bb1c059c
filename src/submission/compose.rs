//! Announcement and log row rendering.
//!
//! Everything here is pure. The only time input is the instant passed to
//! [`LogRow::new`], so tests can assert exact strings.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::submission::{Submission, SubmissionKind};

/// Placeholder rendered in the announcement for a missing optional field.
pub const ANNOUNCE_PLACEHOLDER: &str = "なし";

/// Placeholder written to the log sheet for a missing optional field.
pub const LOG_PLACEHOLDER: &str = "-";

/// Asia/Tokyo has no DST, so a fixed +09:00 offset is exact.
const TOKYO_OFFSET_SECS: i32 = 9 * 3600;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Channel-facing text for a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement(String);

impl Announcement {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Announcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn header(kind: SubmissionKind) -> &'static str {
    match kind {
        SubmissionKind::Declaration => "さんが「やるぞ宣言」をしました！",
        SubmissionKind::Report => "さんが「やったよ報告」をしました！",
    }
}

/// Render the announcement for a submission.
pub fn compose(submission: &Submission) -> Announcement {
    let spec = submission.kind().spec();
    let secondary = submission
        .secondary_present()
        .unwrap_or(ANNOUNCE_PLACEHOLDER);

    Announcement(format!(
        "{} {}\n■ {}: {}\n■ {}: {}",
        submission.actor().mention(),
        header(submission.kind()),
        spec.primary.announce_label,
        submission.primary_text(),
        spec.secondary.announce_label,
        secondary,
    ))
}

/// One row of the durable log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub timestamp: String,
    pub kind: String,
    pub actor_id: String,
    pub actor_display_name: String,
    pub primary_text: String,
    pub secondary_text: String,
}

impl LogRow {
    /// Build the row for `submission`, stamping `at` in Tokyo time.
    pub fn new(submission: &Submission, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: tokyo_timestamp(at),
            kind: submission.kind().log_label().to_string(),
            actor_id: submission.actor().id.clone(),
            actor_display_name: submission.actor().display_name.clone(),
            primary_text: submission.primary_text().to_string(),
            secondary_text: submission
                .secondary_present()
                .unwrap_or(LOG_PLACEHOLDER)
                .to_string(),
        }
    }

    /// Cells in sheet column order.
    pub fn into_cells(self) -> Vec<String> {
        vec![
            self.timestamp,
            self.kind,
            self.actor_id,
            self.actor_display_name,
            self.primary_text,
            self.secondary_text,
        ]
    }
}

fn tokyo_timestamp(at: DateTime<Utc>) -> String {
    // east_opt only fails outside +-24h
    let tokyo = FixedOffset::east_opt(TOKYO_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    at.with_timezone(&tokyo).format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::submission::{Actor, RawFields, validate};

    fn submission(kind: SubmissionKind, primary: &str, secondary: Option<&str>) -> Submission {
        validate(
            kind,
            Actor::new("1001", "taro"),
            &RawFields::new(primary, secondary),
        )
        .unwrap()
    }

    #[test]
    fn test_declaration_with_empty_secondary_uses_placeholder() {
        let sub = submission(SubmissionKind::Declaration, "Read 10 pages", Some(""));
        assert_eq!(
            compose(&sub).as_str(),
            "<@1001> さんが「やるぞ宣言」をしました！\n■ やること: Read 10 pages\n■ 締切: なし"
        );
    }

    #[test]
    fn test_report_with_secondary() {
        let sub = submission(SubmissionKind::Report, "Finished reading", Some("It was fun"));
        assert_eq!(
            compose(&sub).as_str(),
            "<@1001> さんが「やったよ報告」をしました！\n■ やったこと: Finished reading\n■ ひとこと感想: It was fun"
        );
    }

    #[test]
    fn test_absent_secondary_uses_placeholder() {
        let sub = submission(SubmissionKind::Report, "done", None);
        assert!(compose(&sub).as_str().ends_with("■ ひとこと感想: なし"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let sub = submission(SubmissionKind::Declaration, "走る", Some("今夜"));
        let first = compose(&sub);
        for _ in 0..10 {
            assert_eq!(compose(&sub), first);
        }
    }

    #[test]
    fn test_log_row_for_report() {
        let sub = submission(SubmissionKind::Report, "Finished reading", Some("It was fun"));
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 15, 30, 5).unwrap();
        assert_eq!(
            LogRow::new(&sub, at).into_cells(),
            vec![
                "2024-02-01 00:30:05",
                "Report",
                "1001",
                "taro",
                "Finished reading",
                "It was fun",
            ]
        );
    }

    #[test]
    fn test_log_row_placeholder_for_missing_secondary() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let absent = LogRow::new(&submission(SubmissionKind::Declaration, "a", None), at);
        let blank = LogRow::new(&submission(SubmissionKind::Declaration, "a", Some(" ")), at);
        assert_eq!(absent.secondary_text, "-");
        assert_eq!(blank.secondary_text, "-");
        assert_eq!(absent.timestamp, "2024-06-01 09:00:00");
    }
}
