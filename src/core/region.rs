//! Region: a classified span of the address space, and the three-valued
//! confidence ordering used throughout the pipeline.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;

/// A three-valued ordered confidence level. Never a probability — compared
/// only via its ordering (`LOW < MEDIUM < HIGH`), never combined
/// arithmetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionKind {
    Code,
    Data,
    Unknown,
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RegionKind::Code => "CODE",
            RegionKind::Data => "DATA",
            RegionKind::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// A classified, non-overlapping span of the address space. Regions tile
/// the artifact: the union of all regions' byte ranges equals the union of
/// all sections' byte ranges, with no gap and no overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub kind: RegionKind,
    pub start: Address,
    pub end: Address,
    pub confidence: Confidence,
    pub rationale: String,
}

impl Region {
    pub fn new(
        kind: RegionKind,
        start: Address,
        end: Address,
        confidence: Confidence,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            start,
            end,
            confidence,
            rationale: rationale.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.end.checked_sub(self.start).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.value() >= self.start.value() && addr.value() < self.end.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_orders_low_medium_high() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn region_len_and_contains() {
        let r = Region::new(
            RegionKind::Code,
            Address::new(0x10),
            Address::new(0x20),
            Confidence::High,
            "decode_rate=1.0",
        );
        assert_eq!(r.len(), 0x10);
        assert!(r.contains(Address::new(0x10)));
        assert!(!r.contains(Address::new(0x20)));
    }
}
