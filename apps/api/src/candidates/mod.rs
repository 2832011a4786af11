//! Candidate intake and the interview pipeline: resume parsing, staged batch
//! creation, listing and filters, profile edits, rounds and the hiring chat.

pub mod filters;
pub mod handlers;
pub mod parser;
pub mod repo;
pub mod stats;
