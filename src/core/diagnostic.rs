//! Diagnostic: a non-fatal condition recorded on the result tree.
//!
//! Per the error-handling policy, every non-fatal condition (decode miss,
//! classification ambiguity, unresolved branch, procedure-detection miss)
//! is recorded with its reason and confidence rather than silently dropped.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::region::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    DecodeMiss,
    ClassificationAmbiguity,
    BranchUnresolved,
    ProcedureDetectionMiss,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiagnosticKind::DecodeMiss => "decode-miss",
            DiagnosticKind::ClassificationAmbiguity => "classification-ambiguity",
            DiagnosticKind::BranchUnresolved => "branch-unresolved",
            DiagnosticKind::ProcedureDetectionMiss => "procedure-detection-miss",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub address: Address,
    pub confidence: Confidence,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        address: Address,
        confidence: Confidence,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            address,
            confidence,
            reason: reason.into(),
        }
    }
}
