//! Per-candidate interview rounds: a sub-pipeline of `Pending` rounds that a
//! manager resolves to `Passed` or `Failed`, strictly in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::status::{CandidateStatus, TransitionError};

pub const MAX_ROUND_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundType {
    Assessment,
    #[serde(rename = "GD")]
    GroupDiscussion,
    Technical,
    Managerial,
    #[serde(rename = "HR")]
    Hr,
}

impl RoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundType::Assessment => "Assessment",
            RoundType::GroupDiscussion => "GD",
            RoundType::Technical => "Technical",
            RoundType::Managerial => "Managerial",
            RoundType::Hr => "HR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    Pending,
    Passed,
    Failed,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Pending => "Pending",
            RoundStatus::Passed => "Passed",
            RoundStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RoundStatus::Pending),
            "Passed" => Ok(RoundStatus::Passed),
            "Failed" => Ok(RoundStatus::Failed),
            other => Err(AppError::Validation(format!(
                "Unknown round status '{other}'"
            ))),
        }
    }
}

/// Outcome a manager records for a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: RoundStatus,
    pub score: i32,
    pub feedback: String,
}

impl Evaluation {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.status == RoundStatus::Pending {
            return Err(AppError::Validation(
                "A round can only be evaluated as Passed or Failed".to_string(),
            ));
        }
        if !(0..=MAX_ROUND_SCORE).contains(&self.score) {
            return Err(AppError::Validation(format!(
                "Score must be between 0 and {MAX_ROUND_SCORE}"
            )));
        }
        Ok(())
    }
}

/// Checks that a round can be scheduled and returns the candidate status that
/// should follow. Scheduling the first round moves a shortlisted candidate
/// into `Interview`.
pub fn plan_add_round(status: CandidateStatus) -> Result<CandidateStatus, TransitionError> {
    if status.pipeline_frozen() {
        return Err(TransitionError::PipelineFrozen(status));
    }
    Ok(match status {
        CandidateStatus::Assessment => CandidateStatus::Interview,
        other => other,
    })
}

/// Checks that `round_id` may be evaluated given the candidate's rounds in
/// position order. Earlier rounds must be resolved first; re-evaluating a
/// resolved round is allowed while the pipeline is open.
pub fn check_can_evaluate(
    status: CandidateStatus,
    rounds: &[(Uuid, RoundStatus)],
    round_id: Uuid,
) -> Result<(), AppError> {
    if status.pipeline_frozen() {
        return Err(TransitionError::PipelineFrozen(status).into());
    }

    let idx = rounds
        .iter()
        .position(|(id, _)| *id == round_id)
        .ok_or_else(|| AppError::NotFound(format!("Round {round_id} not found")))?;

    if rounds[..idx]
        .iter()
        .any(|(_, s)| *s == RoundStatus::Pending)
    {
        return Err(AppError::Validation(
            "Earlier rounds must be evaluated first".to_string(),
        ));
    }
    Ok(())
}

/// Index of the round the pipeline stopped at: the first still-pending round.
pub fn current_round(rounds: &[(Uuid, RoundStatus)]) -> Option<Uuid> {
    rounds
        .iter()
        .find(|(_, s)| *s == RoundStatus::Pending)
        .map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounds(statuses: &[RoundStatus]) -> Vec<(Uuid, RoundStatus)> {
        statuses.iter().map(|s| (Uuid::new_v4(), *s)).collect()
    }

    #[test]
    fn test_round_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&RoundType::GroupDiscussion).unwrap(),
            r#""GD""#
        );
        let hr: RoundType = serde_json::from_str(r#""HR""#).unwrap();
        assert_eq!(hr, RoundType::Hr);
        assert_eq!(RoundType::Technical.as_str(), "Technical");
    }

    #[test]
    fn test_first_round_moves_assessment_to_interview() {
        assert_eq!(
            plan_add_round(CandidateStatus::Assessment),
            Ok(CandidateStatus::Interview)
        );
        assert_eq!(
            plan_add_round(CandidateStatus::Selected),
            Ok(CandidateStatus::Selected)
        );
    }

    #[test]
    fn test_cannot_add_round_after_rejection() {
        assert_eq!(
            plan_add_round(CandidateStatus::Rejected),
            Err(TransitionError::PipelineFrozen(CandidateStatus::Rejected))
        );
        assert!(plan_add_round(CandidateStatus::Offer).is_err());
    }

    #[test]
    fn test_evaluate_in_order() {
        let r = rounds(&[RoundStatus::Passed, RoundStatus::Pending, RoundStatus::Pending]);
        assert!(check_can_evaluate(CandidateStatus::Interview, &r, r[1].0).is_ok());
        let err = check_can_evaluate(CandidateStatus::Interview, &r, r[2].0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_re_evaluate_resolved_round() {
        let r = rounds(&[RoundStatus::Failed, RoundStatus::Pending]);
        assert!(check_can_evaluate(CandidateStatus::Interview, &r, r[0].0).is_ok());
    }

    #[test]
    fn test_rejected_candidate_rounds_frozen() {
        let r = rounds(&[RoundStatus::Pending]);
        let err = check_can_evaluate(CandidateStatus::Rejected, &r, r[0].0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_unknown_round_is_not_found() {
        let r = rounds(&[RoundStatus::Pending]);
        let err = check_can_evaluate(CandidateStatus::Interview, &r, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_evaluation_validation() {
        let mut e = Evaluation {
            status: RoundStatus::Passed,
            score: 78,
            feedback: "Strong fundamentals".into(),
        };
        assert!(e.validate().is_ok());
        e.score = 140;
        assert!(e.validate().is_err());
        e.score = 50;
        e.status = RoundStatus::Pending;
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_current_round_is_first_pending() {
        let r = rounds(&[RoundStatus::Passed, RoundStatus::Pending, RoundStatus::Pending]);
        assert_eq!(current_round(&r), Some(r[1].0));
        assert_eq!(current_round(&rounds(&[RoundStatus::Passed])), None);
    }
}
