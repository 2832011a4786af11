// Candidate lifecycle: status transitions, interview rounds and the
// onboarding document gate. Pure logic only; handlers own the database writes.

pub mod documents;
pub mod rounds;
pub mod status;

pub use documents::{DocumentGate, DocumentStatus, DocumentType};
pub use rounds::{RoundStatus, RoundType};
pub use status::CandidateStatus;
