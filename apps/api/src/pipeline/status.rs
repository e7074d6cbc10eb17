//! Application lifecycle statuses and telephony call outcomes.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a candidate application. Stored as text in Postgres;
/// parse before making transition decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Rejected,
    InterviewScheduled,
    InterviewInProgress,
    NoAnswer,
    Busy,
    Failed,
    /// The call completed but the evaluator could not produce scores.
    /// Surfaced to the recruiter instead of fabricating a result.
    EvaluationFailed,
    Shortlisted,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::InterviewInProgress => "interview_in_progress",
            ApplicationStatus::NoAnswer => "no_answer",
            ApplicationStatus::Busy => "busy",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::EvaluationFailed => "evaluation_failed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Hired => "hired",
        }
    }

    pub fn parse(s: &str) -> Option<ApplicationStatus> {
        match s {
            "applied" => Some(ApplicationStatus::Applied),
            "rejected" => Some(ApplicationStatus::Rejected),
            "interview_scheduled" => Some(ApplicationStatus::InterviewScheduled),
            "interview_in_progress" => Some(ApplicationStatus::InterviewInProgress),
            "no_answer" => Some(ApplicationStatus::NoAnswer),
            "busy" => Some(ApplicationStatus::Busy),
            "failed" => Some(ApplicationStatus::Failed),
            "evaluation_failed" => Some(ApplicationStatus::EvaluationFailed),
            "shortlisted" => Some(ApplicationStatus::Shortlisted),
            "hired" => Some(ApplicationStatus::Hired),
            _ => None,
        }
    }

    /// Terminal: no further automated transition may fire. Pending call
    /// tasks for a terminal application are cancelled or no-op on firing.
    /// Recruiter override is the only way out.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Shortlisted | ApplicationStatus::Hired
        )
    }
}

/// Call outcome reported by the telephony provider webhook. Anything the
/// provider sends outside this set is ignored as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    NoAnswer,
    Busy,
    Failed,
    Answered,
    InProgress,
    Completed,
}

impl CallOutcome {
    pub fn parse(s: &str) -> Option<CallOutcome> {
        match s.to_ascii_lowercase().as_str() {
            "no_answer" => Some(CallOutcome::NoAnswer),
            "busy" => Some(CallOutcome::Busy),
            "failed" => Some(CallOutcome::Failed),
            "answered" => Some(CallOutcome::Answered),
            "in_progress" => Some(CallOutcome::InProgress),
            "completed" => Some(CallOutcome::Completed),
            _ => None,
        }
    }

    /// The application status recorded for a failed call attempt.
    pub fn failure_status(&self) -> Option<ApplicationStatus> {
        match self {
            CallOutcome::NoAnswer => Some(ApplicationStatus::NoAnswer),
            CallOutcome::Busy => Some(ApplicationStatus::Busy),
            CallOutcome::Failed => Some(ApplicationStatus::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        let all = [
            ApplicationStatus::Applied,
            ApplicationStatus::Rejected,
            ApplicationStatus::InterviewScheduled,
            ApplicationStatus::InterviewInProgress,
            ApplicationStatus::NoAnswer,
            ApplicationStatus::Busy,
            ApplicationStatus::Failed,
            ApplicationStatus::EvaluationFailed,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::Hired,
        ];
        for status in all {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_unknown_status_text_is_none() {
        assert_eq!(ApplicationStatus::parse("on_hold"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(ApplicationStatus::Shortlisted.is_terminal());
        assert!(ApplicationStatus::Hired.is_terminal());
        assert!(!ApplicationStatus::NoAnswer.is_terminal());
        assert!(!ApplicationStatus::EvaluationFailed.is_terminal());
        assert!(!ApplicationStatus::InterviewInProgress.is_terminal());
    }

    #[test]
    fn test_outcome_parse_is_case_insensitive() {
        assert_eq!(CallOutcome::parse("NO_ANSWER"), Some(CallOutcome::NoAnswer));
        assert_eq!(CallOutcome::parse("Completed"), Some(CallOutcome::Completed));
    }

    #[test]
    fn test_unknown_outcome_is_none() {
        assert_eq!(CallOutcome::parse("voicemail_detected"), None);
        assert_eq!(CallOutcome::parse(""), None);
    }

    #[test]
    fn test_failure_status_mapping() {
        assert_eq!(
            CallOutcome::Busy.failure_status(),
            Some(ApplicationStatus::Busy)
        );
        assert_eq!(CallOutcome::Completed.failure_status(), None);
        assert_eq!(CallOutcome::Answered.failure_status(), None);
    }
}
