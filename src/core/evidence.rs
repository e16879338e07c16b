//! EvidenceLink: the cross-cutting attribute that anchors a rendered line
//! back to concrete input bytes.
//!
//! This is not a pipeline phase; it is produced at every enrichment step and
//! carried through to the two renderers so every non-comment output line
//! can be traced back to the bytes that produced it.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::instruction::Instruction;
use crate::core::region::Confidence;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLink {
    pub start: Address,
    pub end: Address,
    pub raw_hex: String,
    pub confidence: Confidence,
    pub reason: String,
}

impl EvidenceLink {
    pub fn new(
        start: Address,
        end: Address,
        raw_bytes: &[u8],
        confidence: Confidence,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            raw_hex: raw_bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(""),
            confidence,
            reason: reason.into(),
        }
    }

    /// Build the evidence link for one decoded instruction: its own address
    /// range and raw bytes, tagged with the confidence and reason the
    /// calling stage assigns it.
    pub fn for_instruction(instr: &Instruction, confidence: Confidence, reason: impl Into<String>) -> Self {
        Self {
            start: instr.address,
            end: instr.end_address(),
            raw_hex: instr.hex_bytes(),
            confidence,
            reason: reason.into(),
        }
    }

    /// Build the evidence link for a raw byte span starting at `start`
    /// (an `UnknownSpan` or a data/unknown `Region`).
    pub fn for_span(start: Address, bytes: &[u8], confidence: Confidence, reason: impl Into<String>) -> Self {
        Self::new(start, start.saturating_add(bytes.len() as u64), bytes, confidence, reason)
    }

    /// The `@0x<addr>: <hex>` fragment every rendered evidence comment
    /// carries, per spec section 4.7's trailing-comment contract.
    pub fn trailing_comment(&self) -> String {
        format!("@0x{:08x}: {}", self.start.value(), self.raw_hex)
    }
}
