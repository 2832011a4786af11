//! Onboarding document types and the aggregate verification gate that moves
//! candidates between `Onboarding` and `Ready to Join`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::pipeline::status::CandidateStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    OfferLetter,
    /// National ID proof.
    Aadhar,
    /// Tax ID.
    Pan,
    /// Education certificate.
    Certificate,
    Other,
}

/// Every one of these must be verified before a candidate is ready to join.
pub const REQUIRED_DOCUMENTS: [DocumentType; 4] = [
    DocumentType::OfferLetter,
    DocumentType::Aadhar,
    DocumentType::Pan,
    DocumentType::Certificate,
];

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::OfferLetter => "offer_letter",
            DocumentType::Aadhar => "aadhar",
            DocumentType::Pan => "pan",
            DocumentType::Certificate => "certificate",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "offer_letter" => Ok(DocumentType::OfferLetter),
            "aadhar" => Ok(DocumentType::Aadhar),
            "pan" => Ok(DocumentType::Pan),
            "certificate" => Ok(DocumentType::Certificate),
            "other" => Ok(DocumentType::Other),
            other => Err(AppError::Validation(format!(
                "Unknown document type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Verified => "verified",
            DocumentStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "verified" => Ok(DocumentStatus::Verified),
            "rejected" => Ok(DocumentStatus::Rejected),
            other => Err(AppError::Validation(format!(
                "Unknown document status '{other}'"
            ))),
        }
    }
}

/// Snapshot of a candidate's documents as far as the gate is concerned.
#[derive(Debug, Clone, Default)]
pub struct DocumentGate {
    docs: Vec<(DocumentType, DocumentStatus)>,
}

impl DocumentGate {
    pub fn new<I>(docs: I) -> Self
    where
        I: IntoIterator<Item = (DocumentType, DocumentStatus)>,
    {
        Self {
            docs: docs.into_iter().collect(),
        }
    }

    fn is_verified(&self, doc_type: DocumentType) -> bool {
        self.docs
            .iter()
            .any(|(t, s)| *t == doc_type && *s == DocumentStatus::Verified)
    }

    pub fn all_required_verified(&self) -> bool {
        REQUIRED_DOCUMENTS.iter().all(|t| self.is_verified(*t))
    }

    /// Required documents that are missing or not yet verified.
    pub fn outstanding(&self) -> Vec<DocumentType> {
        REQUIRED_DOCUMENTS
            .iter()
            .copied()
            .filter(|t| !self.is_verified(*t))
            .collect()
    }

    /// Status to move to after a verification write, if any. Only candidates
    /// still onboarding advance; `Ready to Join` and `Active` are never moved.
    pub fn status_after_verification(&self, current: CandidateStatus) -> Option<CandidateStatus> {
        (current == CandidateStatus::Onboarding && self.all_required_verified())
            .then_some(CandidateStatus::ReadyToJoin)
    }

    /// Reverts `Ready to Join` when the gate no longer holds.
    pub fn healed_status(&self, current: CandidateStatus) -> Option<CandidateStatus> {
        (current == CandidateStatus::ReadyToJoin && !self.all_required_verified())
            .then_some(CandidateStatus::Onboarding)
    }
}
