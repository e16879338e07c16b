//! z/Architecture executable-artifact reconstruction: decode a raw byte
//! stream into instructions, classify it into CODE/DATA/UNKNOWN regions,
//! recover a control-flow graph and procedure boundaries, and render both
//! an HLASM-style assembler listing and a structurally-recovered
//! pseudocode listing.
//!
//! [`analyze`] is the sole entry point; everything else in this crate is
//! reachable through the `AnalysisResult` it returns or through the
//! individual stage modules for callers that want to run the pipeline
//! piecewise.

pub mod cfg;
pub mod classify;
pub mod config;
pub mod core;
pub mod decode;
pub mod error;
pub mod logging;
pub mod procedure;
pub mod render;

use crate::cfg::build_cfg;
use crate::classify::classify_section;
use crate::config::Configuration;
use crate::core::address::Address;
use crate::core::artifact::Artifact;
use crate::core::region::Region;
use crate::core::result::{AnalysisResult, Status};
use crate::decode::decode_all;
use crate::procedure::infer_procedures;

/// Run the full pipeline over one artifact's bytes.
///
/// `entry_hints` are addresses the caller already knows are procedure
/// entries (e.g. from a load module's ESD records); they are folded into
/// leader-finding and entry-candidate collection alongside what the
/// pipeline discovers on its own. An invalid `config` or an empty artifact
/// both short-circuit to a `failure`-status result with no analysis
/// content, per the ingestion-failure policy; every other condition is
/// recorded as a diagnostic and the pipeline continues.
pub fn analyze(
    bytes: &[u8],
    filename: &str,
    entry_hints: &[Address],
    config: &Configuration,
) -> AnalysisResult {
    let artifact = Artifact::ingest(bytes, filename);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration, aborting analysis");
        return AnalysisResult::empty_failure(artifact);
    }

    if artifact.sections.is_empty() {
        tracing::warn!(file = filename, "empty artifact, nothing to analyze");
        return AnalysisResult::empty_failure(artifact);
    }

    let decoded = decode_all(&artifact);

    let mut regions: Vec<Region> = Vec::new();
    for section in &artifact.sections {
        regions.extend(classify_section(section, &decoded.instructions, config));
    }

    let cfg_outcome = build_cfg(&regions, &decoded.instructions, entry_hints);

    let proc_outcome = infer_procedures(&artifact, &regions, &cfg_outcome.cfg, &decoded.instructions);

    let mut diagnostics = Vec::new();
    diagnostics.extend(cfg_outcome.diagnostics);
    diagnostics.extend(proc_outcome.diagnostics);

    let status = Status::from_decode_rate(decoded.statistics.decode_rate);

    AnalysisResult {
        artifact,
        instructions: decoded.instructions,
        unknown_spans: decoded.unknown_spans,
        regions,
        cfg: cfg_outcome.cfg,
        procedures: proc_outcome.procedures,
        call_graph: proc_outcome.call_graph,
        statistics: decoded.statistics,
        diagnostics,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_failure_with_no_content() {
        let result = analyze(&[], "empty.bin", &[], &Configuration::default());
        assert_eq!(result.status, Status::Failure);
        assert!(result.instructions.is_empty());
        assert!(result.regions.is_empty());
        assert!(result.procedures.is_empty());
    }

    #[test]
    fn invalid_configuration_is_failure() {
        let mut bad = Configuration::default();
        bad.code_threshold = 0.1;
        bad.data_threshold = 0.5;
        let result = analyze(&[0x07, 0xFE], "s.bin", &[], &bad);
        assert_eq!(result.status, Status::Failure);
    }

    #[test]
    fn two_byte_return_is_success_with_one_procedure() {
        let result = analyze(&[0x07, 0xFE], "s2.bin", &[], &Configuration::default());
        assert_eq!(result.status, Status::Success);
        assert_eq!(result.instructions.len(), 1);
        assert_eq!(result.procedures.len(), 1);
        assert_eq!(result.procedures[0].id, "PROC_00000000");
        assert_eq!(result.statistics.decode_rate, 1.0);
    }

    #[test]
    fn unknown_byte_then_return_is_partial() {
        // S6: FF (undecodable) then BCR 15,14.
        let result = analyze(&[0xFF, 0x07, 0xFE], "s6.bin", &[], &Configuration::default());
        assert_eq!(result.unknown_spans.len(), 1);
        assert_eq!(result.unknown_spans[0].start, Address::ZERO);
        assert_eq!(result.unknown_spans[0].length, 1);
        assert_eq!(result.status, Status::Partial);
    }
}
