//! Candidate lifecycle statuses and the rules for moving between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateStatus {
    Assessment,
    Interview,
    Selected,
    Offer,
    Onboarding,
    #[serde(rename = "Ready to Join")]
    ReadyToJoin,
    Active,
    Rejected,
}

/// All statuses in lifecycle order. Dashboard counters follow this order.
pub const ALL_STATUSES: [CandidateStatus; 8] = [
    CandidateStatus::Assessment,
    CandidateStatus::Interview,
    CandidateStatus::Selected,
    CandidateStatus::Offer,
    CandidateStatus::Onboarding,
    CandidateStatus::ReadyToJoin,
    CandidateStatus::Active,
    CandidateStatus::Rejected,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Candidate is {0} and can no longer change status")]
    Terminal(CandidateStatus),

    #[error("Status {0} can only be reached through its dedicated action")]
    Reserved(CandidateStatus),

    #[error("Cannot move candidate from {from} to {to}")]
    NotAllowed {
        from: CandidateStatus,
        to: CandidateStatus,
    },

    #[error("Interview pipeline is frozen while candidate is {0}")]
    PipelineFrozen(CandidateStatus),

    #[error("Candidate documents must be verified first")]
    DocumentsNotVerified,
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Assessment => "Assessment",
            CandidateStatus::Interview => "Interview",
            CandidateStatus::Selected => "Selected",
            CandidateStatus::Offer => "Offer",
            CandidateStatus::Onboarding => "Onboarding",
            CandidateStatus::ReadyToJoin => "Ready to Join",
            CandidateStatus::Active => "Active",
            CandidateStatus::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CandidateStatus::Active | CandidateStatus::Rejected)
    }

    /// Statuses before an offer goes out. Managers move freely between these.
    pub fn is_pre_offer(&self) -> bool {
        matches!(
            self,
            CandidateStatus::Assessment | CandidateStatus::Interview | CandidateStatus::Selected
        )
    }

    /// Rounds may not be added or evaluated once an offer is out or the
    /// candidate is terminal.
    pub fn pipeline_frozen(&self) -> bool {
        !self.is_pre_offer()
    }

    /// Validates a status change requested through the generic profile edit.
    /// Returns `Ok(false)` for a no-op.
    pub fn manual_transition(self, to: CandidateStatus) -> Result<bool, TransitionError> {
        if self == to {
            return Ok(false);
        }
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if to == CandidateStatus::Rejected || (to.is_pre_offer() && self.is_pre_offer()) {
            return Ok(true);
        }
        if to.is_pre_offer() {
            return Err(TransitionError::NotAllowed { from: self, to });
        }
        Err(TransitionError::Reserved(to))
    }

    pub fn check_can_send_offer(self) -> Result<(), TransitionError> {
        if self.is_pre_offer() || self == CandidateStatus::Offer {
            Ok(())
        } else if self.is_terminal() {
            Err(TransitionError::Terminal(self))
        } else {
            Err(TransitionError::NotAllowed {
                from: self,
                to: CandidateStatus::Offer,
            })
        }
    }

    /// Re-enabling while already onboarding re-issues the credential.
    pub fn check_can_enable_onboarding(self) -> Result<(), TransitionError> {
        match self {
            s if s.is_pre_offer() => Ok(()),
            CandidateStatus::Offer | CandidateStatus::Onboarding => Ok(()),
            s if s.is_terminal() => Err(TransitionError::Terminal(s)),
            s => Err(TransitionError::NotAllowed {
                from: s,
                to: CandidateStatus::Onboarding,
            }),
        }
    }

    pub fn check_can_start_internship(self) -> Result<(), TransitionError> {
        if self == CandidateStatus::ReadyToJoin {
            Ok(())
        } else {
            Err(TransitionError::DocumentsNotVerified)
        }
    }

    /// Documents can be (re-)uploaded while onboarding is open.
    pub fn accepts_document_uploads(&self) -> bool {
        matches!(
            self,
            CandidateStatus::Onboarding | CandidateStatus::ReadyToJoin
        )
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown candidate status '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CandidateStatus::*;

    #[test]
    fn test_ready_to_join_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReadyToJoin).unwrap(),
            r#""Ready to Join""#
        );
        let parsed: CandidateStatus = serde_json::from_str(r#""Ready to Join""#).unwrap();
        assert_eq!(parsed, ReadyToJoin);
    }

    #[test]
    fn test_from_str_round_trips_every_status() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<CandidateStatus>().unwrap(), status);
        }
        assert!("Hired".parse::<CandidateStatus>().is_err());
    }

    #[test]
    fn test_reject_from_any_non_terminal() {
        for from in [Assessment, Interview, Selected, Offer, Onboarding, ReadyToJoin] {
            assert_eq!(from.manual_transition(Rejected), Ok(true), "from {from}");
        }
    }

    #[test]
    fn test_terminal_states_are_locked() {
        assert_eq!(
            Rejected.manual_transition(Interview),
            Err(TransitionError::Terminal(Rejected))
        );
        assert_eq!(
            Active.manual_transition(Rejected),
            Err(TransitionError::Terminal(Active))
        );
    }

    #[test]
    fn test_same_status_is_noop() {
        assert_eq!(Rejected.manual_transition(Rejected), Ok(false));
        assert_eq!(Interview.manual_transition(Interview), Ok(false));
    }

    #[test]
    fn test_pre_offer_moves_freely() {
        assert_eq!(Assessment.manual_transition(Selected), Ok(true));
        assert_eq!(Selected.manual_transition(Interview), Ok(true));
    }

    #[test]
    fn test_reserved_statuses_need_dedicated_action() {
        assert_eq!(
            Selected.manual_transition(Offer),
            Err(TransitionError::Reserved(Offer))
        );
        assert_eq!(
            Onboarding.manual_transition(ReadyToJoin),
            Err(TransitionError::Reserved(ReadyToJoin))
        );
        assert_eq!(
            ReadyToJoin.manual_transition(Active),
            Err(TransitionError::Reserved(Active))
        );
    }

    #[test]
    fn test_cannot_fall_back_from_offer_to_pre_offer() {
        assert!(matches!(
            Offer.manual_transition(Interview),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_pipeline_frozen_after_offer() {
        assert!(!Assessment.pipeline_frozen());
        assert!(!Selected.pipeline_frozen());
        for s in [Offer, Onboarding, ReadyToJoin, Active, Rejected] {
            assert!(s.pipeline_frozen(), "{s} should freeze rounds");
        }
    }

    #[test]
    fn test_offer_gate() {
        assert!(Selected.check_can_send_offer().is_ok());
        assert!(Offer.check_can_send_offer().is_ok());
        assert!(Onboarding.check_can_send_offer().is_err());
        assert_eq!(
            Rejected.check_can_send_offer(),
            Err(TransitionError::Terminal(Rejected))
        );
    }

    #[test]
    fn test_onboarding_gate() {
        assert!(Offer.check_can_enable_onboarding().is_ok());
        assert!(Onboarding.check_can_enable_onboarding().is_ok());
        assert!(Interview.check_can_enable_onboarding().is_ok());
        assert!(ReadyToJoin.check_can_enable_onboarding().is_err());
        assert!(Rejected.check_can_enable_onboarding().is_err());
    }

    #[test]
    fn test_start_internship_requires_ready_to_join() {
        assert!(ReadyToJoin.check_can_start_internship().is_ok());
        assert_eq!(
            Onboarding.check_can_start_internship(),
            Err(TransitionError::DocumentsNotVerified)
        );
        assert!(Active.check_can_start_internship().is_err());
    }

    #[test]
    fn test_document_uploads_window() {
        assert!(Onboarding.accepts_document_uploads());
        assert!(ReadyToJoin.accepts_document_uploads());
        assert!(!Offer.accepts_document_uploads());
        assert!(!Active.accepts_document_uploads());
    }
}
