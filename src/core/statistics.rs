//! Statistics: aggregate counters over one analysis run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate counters computed from the decoded instruction stream. Held as
/// a `BTreeMap` (not `HashMap`) for the mnemonic histogram so that
/// serialized output is byte-identical across runs regardless of hash seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub decoded_instruction_count: u64,
    pub decoded_byte_count: u64,
    pub unknown_byte_count: u64,
    pub decode_rate: f64,
    pub branch_count: u64,
    pub call_count: u64,
    pub return_count: u64,
    pub mnemonic_histogram: BTreeMap<String, u64>,
}

impl Statistics {
    /// Compute `decode_rate` from the accumulated byte counts. Returns
    /// `0.0` for a zero-length artifact rather than dividing by zero.
    pub fn recompute_decode_rate(&mut self) {
        let total = self.decoded_byte_count + self.unknown_byte_count;
        self.decode_rate = if total == 0 {
            0.0
        } else {
            self.decoded_byte_count as f64 / total as f64
        };
    }

    pub fn record_mnemonic(&mut self, mnemonic: &str) {
        *self.mnemonic_histogram.entry(mnemonic.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rate_defaults_to_zero_for_empty_input() {
        let mut s = Statistics::default();
        s.recompute_decode_rate();
        assert_eq!(s.decode_rate, 0.0);
    }

    #[test]
    fn decode_rate_is_ratio_of_decoded_to_total() {
        let mut s = Statistics {
            decoded_byte_count: 3,
            unknown_byte_count: 1,
            ..Default::default()
        };
        s.recompute_decode_rate();
        assert_eq!(s.decode_rate, 0.75);
    }

    #[test]
    fn mnemonic_histogram_counts_occurrences() {
        let mut s = Statistics::default();
        s.record_mnemonic("BCR");
        s.record_mnemonic("BCR");
        s.record_mnemonic("LR");
        assert_eq!(s.mnemonic_histogram.get("BCR"), Some(&2));
        assert_eq!(s.mnemonic_histogram.get("LR"), Some(&1));
    }
}
