//! AnalysisResult: the tree produced by one call to [`crate::analyze`], and
//! the status tag derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::artifact::Artifact;
use crate::core::call_graph::CallGraph;
use crate::core::control_flow_graph::ControlFlowGraph;
use crate::core::diagnostic::Diagnostic;
use crate::core::instruction::Instruction;
use crate::core::procedure::Procedure;
use crate::core::region::Region;
use crate::core::statistics::Statistics;
use crate::core::unknown_span::UnknownSpan;

/// Coarse-grained outcome of a run, derived from `decode_rate`. The
/// external CLI (out of scope here) maps these to process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Partial,
    Failure,
}

impl Status {
    /// `decode_rate` thresholds are fixed at `0.80`/`0.20` and must never be
    /// conflated with the classifier's `code_threshold`/`data_threshold`
    /// (which default to `0.70`/`0.30` and are configurable).
    pub fn from_decode_rate(decode_rate: f64) -> Self {
        if decode_rate > 0.80 {
            Status::Success
        } else if decode_rate >= 0.20 {
            Status::Partial
        } else {
            Status::Failure
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

/// The complete tree produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub artifact: Artifact,
    /// Decoded instructions keyed by address, for ascending-order access.
    pub instructions: BTreeMap<Address, Instruction>,
    pub unknown_spans: Vec<UnknownSpan>,
    pub regions: Vec<Region>,
    pub cfg: ControlFlowGraph,
    pub procedures: Vec<Procedure>,
    pub call_graph: CallGraph,
    pub statistics: Statistics,
    pub diagnostics: Vec<Diagnostic>,
    pub status: Status,
}

impl AnalysisResult {
    /// An empty-but-well-formed result for a zero-length or unreadable
    /// input: the failure status with no instructions, regions, or blocks.
    pub fn empty_failure(artifact: Artifact) -> Self {
        Self {
            artifact,
            instructions: BTreeMap::new(),
            unknown_spans: Vec::new(),
            regions: Vec::new(),
            cfg: ControlFlowGraph::new(),
            procedures: Vec::new(),
            call_graph: CallGraph::new(),
            statistics: Statistics::default(),
            diagnostics: Vec::new(),
            status: Status::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds_match_fixed_spec_values() {
        assert_eq!(Status::from_decode_rate(0.81), Status::Success);
        assert_eq!(Status::from_decode_rate(0.80), Status::Partial);
        assert_eq!(Status::from_decode_rate(0.20), Status::Partial);
        assert_eq!(Status::from_decode_rate(0.19), Status::Failure);
    }

    #[test]
    fn empty_failure_has_no_analysis_content() {
        let artifact = Artifact::ingest(&[], "empty.bin");
        let result = AnalysisResult::empty_failure(artifact);
        assert_eq!(result.status, Status::Failure);
        assert!(result.instructions.is_empty());
        assert!(result.regions.is_empty());
    }
}
