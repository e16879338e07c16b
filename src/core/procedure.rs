//! Procedure: a connected set of basic blocks rooted at an entry address,
//! inferred from linkage-pattern heuristics.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::region::Confidence;

/// Register-usage convention recognized at procedure entry/exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Recognizable save-area prologue (`STM R14,R12,12(R13)`) paired with
    /// a `BR 14` / `BCR 15,14` epilogue.
    Standard,
    /// Standard linkage plus base-register establishment via `R12`.
    LeConformant,
    Unknown,
}

impl std::fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Linkage::Standard => "standard",
            Linkage::LeConformant => "le-conformant",
            Linkage::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Where an entry-point candidate came from, in the priority order the
/// inferencer considers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    Declared,
    CallTarget,
    ProloguePattern,
    RegionStartFallback,
}

impl EntrySource {
    pub fn confidence(&self) -> Confidence {
        match self {
            EntrySource::Declared | EntrySource::CallTarget => Confidence::High,
            EntrySource::ProloguePattern => Confidence::Medium,
            EntrySource::RegionStartFallback => Confidence::Low,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            EntrySource::Declared => "declared",
            EntrySource::CallTarget => "call-target",
            EntrySource::ProloguePattern => "prologue-pattern",
            EntrySource::RegionStartFallback => "region-start-fallback",
        }
    }
}

/// A connected set of basic blocks rooted at an entry address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: String,
    pub entry: Address,
    pub exits: Vec<Address>,
    pub linkage: Linkage,
    pub confidence: Confidence,
    pub detection_reason: String,
    /// Leader addresses of every block this procedure owns, ascending.
    pub block_leaders: Vec<Address>,
}

impl Procedure {
    pub fn new(entry: Address, confidence: Confidence, detection_reason: &str) -> Self {
        Self {
            id: format!("PROC_{:08X}", entry.value()),
            entry,
            exits: Vec::new(),
            linkage: Linkage::Unknown,
            confidence,
            detection_reason: detection_reason.to_string(),
            block_leaders: Vec::new(),
        }
    }

    /// Orphan-block synthetic procedure, per the error-handling policy for
    /// blocks no entry-point walk ever claims.
    pub fn orphan(region_start: Address) -> Self {
        Self {
            id: format!("PROC_ORPHAN_{:08X}", region_start.value()),
            entry: region_start,
            exits: Vec::new(),
            linkage: Linkage::Unknown,
            confidence: Confidence::Low,
            detection_reason: "orphan-blocks".to_string(),
            block_leaders: Vec::new(),
        }
    }

    pub fn is_orphan(&self) -> bool {
        self.id.starts_with("PROC_ORPHAN_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_derived_from_entry_address() {
        let p = Procedure::new(Address::new(0x1000), Confidence::High, "declared");
        assert_eq!(p.id, "PROC_00001000");
    }

    #[test]
    fn orphan_id_carries_region_start() {
        let p = Procedure::orphan(Address::new(0x2000));
        assert_eq!(p.id, "PROC_ORPHAN_00002000");
        assert!(p.is_orphan());
    }

    #[test]
    fn entry_source_confidence_ordering() {
        assert_eq!(EntrySource::Declared.confidence(), Confidence::High);
        assert_eq!(EntrySource::CallTarget.confidence(), Confidence::High);
        assert_eq!(EntrySource::ProloguePattern.confidence(), Confidence::Medium);
        assert_eq!(
            EntrySource::RegionStartFallback.confidence(),
            Confidence::Low
        );
    }
}
