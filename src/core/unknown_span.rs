//! UnknownSpan: a contiguous region of bytes the decoder or classifier
//! could not account for as code.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;

/// Why a span of bytes ended up unaccounted-for as a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownReason {
    DecodeFailed,
    ClassifiedData,
    Misaligned,
    Overlapping,
}

impl std::fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnknownReason::DecodeFailed => "decode-failed",
            UnknownReason::ClassifiedData => "classified-data",
            UnknownReason::Misaligned => "misaligned",
            UnknownReason::Overlapping => "overlapping",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownSpan {
    pub start: Address,
    pub length: u64,
    pub raw_bytes: Vec<u8>,
    pub reason: UnknownReason,
}

impl UnknownSpan {
    pub fn new(start: Address, raw_bytes: Vec<u8>, reason: UnknownReason) -> Self {
        let length = raw_bytes.len() as u64;
        Self {
            start,
            length,
            raw_bytes,
            reason,
        }
    }

    pub fn end(&self) -> Address {
        self.start.saturating_add(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_follows_length() {
        let span = UnknownSpan::new(Address::new(0x10), vec![0xff], UnknownReason::DecodeFailed);
        assert_eq!(span.end(), Address::new(0x11));
        assert_eq!(span.length, 1);
    }

    #[test]
    fn reason_display() {
        assert_eq!(UnknownReason::DecodeFailed.to_string(), "decode-failed");
        assert_eq!(UnknownReason::ClassifiedData.to_string(), "classified-data");
    }
}
