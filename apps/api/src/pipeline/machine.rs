//! Application State Machine — pure transition decisions.
//!
//! Handlers load the rows, ask this module what should happen, then persist
//! the result under the per-application lock. Keeping the decisions pure
//! makes every lifecycle rule testable without a database or a provider.

use crate::pipeline::status::{ApplicationStatus, CallOutcome};

/// Decision after the blended resume score is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Reject,
    /// Move to `interview_scheduled` and enqueue one delayed call task.
    ScheduleInterview,
}

/// A job with no resume threshold does not gate; everyone proceeds to the
/// interview stage.
pub fn after_resume_score(final_score: i32, resume_min_score: Option<i32>) -> ResumeDecision {
    match resume_min_score {
        Some(min) if final_score < min => ResumeDecision::Reject,
        _ => ResumeDecision::ScheduleInterview,
    }
}

/// Plan for an inbound call-outcome event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomePlan {
    /// Record the failure status, bump the retry counter, enqueue a new
    /// call task after the standard delay.
    Retry {
        status: ApplicationStatus,
        retry_count: i32,
    },
    /// Record the failure status; the retry budget is spent. Terminal for
    /// automated interviewing (recruiter may still override).
    ExhaustedFailure { status: ApplicationStatus },
    /// The candidate picked up; mark the interview in progress.
    MarkInProgress,
    /// A completed call with a transcript; run the evaluator.
    Evaluate,
    /// Nothing to do. The reason is echoed back to the provider.
    Ignore(&'static str),
}

/// Decides how to react to a telephony outcome.
///
/// `already_evaluated` is the webhook-replay dedup flag: true when the
/// interview record already holds a transcript and the application carries a
/// voice score, i.e. a prior `completed` delivery was fully processed.
pub fn plan_call_outcome(
    current: ApplicationStatus,
    outcome: CallOutcome,
    retry_count: i32,
    max_retries: i32,
    already_evaluated: bool,
) -> OutcomePlan {
    if current.is_terminal() {
        return OutcomePlan::Ignore("Application is in a terminal state");
    }

    match outcome {
        CallOutcome::NoAnswer | CallOutcome::Busy | CallOutcome::Failed => {
            // failure_status is Some for exactly these three outcomes
            let status = outcome
                .failure_status()
                .unwrap_or(ApplicationStatus::Failed);
            if retry_count < max_retries {
                OutcomePlan::Retry {
                    status,
                    retry_count: retry_count + 1,
                }
            } else {
                OutcomePlan::ExhaustedFailure { status }
            }
        }
        CallOutcome::Answered | CallOutcome::InProgress => OutcomePlan::MarkInProgress,
        CallOutcome::Completed => {
            if already_evaluated {
                OutcomePlan::Ignore("Interview already evaluated")
            } else {
                OutcomePlan::Evaluate
            }
        }
    }
}

/// Final decision once the interview evaluation produced a voice score.
///
/// A job with no interview threshold does not gate: the candidate is
/// shortlisted on any score. Deliberately symmetric with
/// `after_resume_score` — a missing threshold means "no gate" on both
/// sides, never an implicit reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalDecision {
    Shortlisted,
    Rejected,
}

pub fn after_evaluation(voice_score: i32, interview_min_score: Option<i32>) -> FinalDecision {
    match interview_min_score {
        Some(min) if voice_score < min => FinalDecision::Rejected,
        _ => FinalDecision::Shortlisted,
    }
}

/// Statuses a recruiter may set manually, bypassing the automated pipeline.
/// This is the only path to `hired`.
pub fn is_allowed_override(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::Shortlisted | ApplicationStatus::Rejected | ApplicationStatus::Hired
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario A: resume_min_score=40, blended=20 -> rejected, no call.
    #[test]
    fn test_resume_below_threshold_rejects() {
        assert_eq!(after_resume_score(20, Some(40)), ResumeDecision::Reject);
    }

    // Scenario B: resume_min_score=40, blended=59 -> interview scheduled.
    #[test]
    fn test_resume_at_or_above_threshold_schedules() {
        assert_eq!(
            after_resume_score(59, Some(40)),
            ResumeDecision::ScheduleInterview
        );
        assert_eq!(
            after_resume_score(40, Some(40)),
            ResumeDecision::ScheduleInterview
        );
    }

    #[test]
    fn test_resume_without_threshold_always_schedules() {
        assert_eq!(after_resume_score(0, None), ResumeDecision::ScheduleInterview);
    }

    // Scenario C: first failure retries, second failure exhausts the budget.
    #[test]
    fn test_first_failure_schedules_retry() {
        let plan = plan_call_outcome(
            ApplicationStatus::InterviewScheduled,
            CallOutcome::NoAnswer,
            0,
            1,
            false,
        );
        assert_eq!(
            plan,
            OutcomePlan::Retry {
                status: ApplicationStatus::NoAnswer,
                retry_count: 1,
            }
        );
    }

    #[test]
    fn test_second_failure_is_exhausted() {
        let plan = plan_call_outcome(
            ApplicationStatus::NoAnswer,
            CallOutcome::Busy,
            1,
            1,
            false,
        );
        assert_eq!(
            plan,
            OutcomePlan::ExhaustedFailure {
                status: ApplicationStatus::Busy,
            }
        );
    }

    #[test]
    fn test_retry_count_never_exceeds_max() {
        // Simulate repeated failures; the planned count must stay <= max.
        let max = 1;
        let mut retry_count = 0;
        for _ in 0..5 {
            match plan_call_outcome(
                ApplicationStatus::InterviewScheduled,
                CallOutcome::Failed,
                retry_count,
                max,
                false,
            ) {
                OutcomePlan::Retry {
                    retry_count: next, ..
                } => {
                    assert!(next > retry_count, "retry count must be monotonic");
                    retry_count = next;
                }
                OutcomePlan::ExhaustedFailure { .. } => {}
                other => panic!("unexpected plan {other:?}"),
            }
            assert!(retry_count <= max);
        }
        assert_eq!(retry_count, max);
    }

    #[test]
    fn test_answered_marks_in_progress() {
        for outcome in [CallOutcome::Answered, CallOutcome::InProgress] {
            let plan = plan_call_outcome(
                ApplicationStatus::InterviewScheduled,
                outcome,
                0,
                1,
                false,
            );
            assert_eq!(plan, OutcomePlan::MarkInProgress);
        }
    }

    #[test]
    fn test_completed_evaluates_once() {
        let plan = plan_call_outcome(
            ApplicationStatus::InterviewInProgress,
            CallOutcome::Completed,
            0,
            1,
            false,
        );
        assert_eq!(plan, OutcomePlan::Evaluate);
    }

    // Replaying an identical completed event must not evaluate twice.
    #[test]
    fn test_completed_replay_is_ignored() {
        let plan = plan_call_outcome(
            ApplicationStatus::Shortlisted,
            CallOutcome::Completed,
            0,
            1,
            true,
        );
        assert_eq!(
            plan,
            OutcomePlan::Ignore("Application is in a terminal state")
        );

        // Even a non-terminal state with the dedup flag set is a no-op.
        let plan = plan_call_outcome(
            ApplicationStatus::InterviewInProgress,
            CallOutcome::Completed,
            0,
            1,
            true,
        );
        assert_eq!(plan, OutcomePlan::Ignore("Interview already evaluated"));
    }

    #[test]
    fn test_terminal_state_ignores_all_outcomes() {
        for status in [
            ApplicationStatus::Rejected,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::Hired,
        ] {
            for outcome in [
                CallOutcome::NoAnswer,
                CallOutcome::Answered,
                CallOutcome::Completed,
            ] {
                let plan = plan_call_outcome(status, outcome, 0, 1, false);
                assert!(matches!(plan, OutcomePlan::Ignore(_)), "{status:?} {outcome:?}");
            }
        }
    }

    // Scenario D: interview_min_score=60, voice=75 -> shortlisted.
    #[test]
    fn test_voice_score_at_or_above_threshold_shortlists() {
        assert_eq!(after_evaluation(75, Some(60)), FinalDecision::Shortlisted);
        assert_eq!(after_evaluation(60, Some(60)), FinalDecision::Shortlisted);
    }

    // Scenario E: voice=50 -> rejected.
    #[test]
    fn test_voice_score_below_threshold_rejects() {
        assert_eq!(after_evaluation(50, Some(60)), FinalDecision::Rejected);
    }

    #[test]
    fn test_evaluation_without_threshold_shortlists() {
        assert_eq!(after_evaluation(10, None), FinalDecision::Shortlisted);
    }

    #[test]
    fn test_override_whitelist() {
        assert!(is_allowed_override(ApplicationStatus::Shortlisted));
        assert!(is_allowed_override(ApplicationStatus::Rejected));
        assert!(is_allowed_override(ApplicationStatus::Hired));
        assert!(!is_allowed_override(ApplicationStatus::Applied));
        assert!(!is_allowed_override(ApplicationStatus::InterviewScheduled));
        assert!(!is_allowed_override(ApplicationStatus::EvaluationFailed));
    }
}
