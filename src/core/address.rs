//! Address type: a byte offset within an artifact's address space.
//!
//! Unlike a general-purpose binary analysis framework that must juggle VA,
//! RVA, file-offset and symbolic addresses across relocatable images,
//! z/Architecture load modules and program objects are analyzed as a single
//! flat address space (sections carry their own base, but within the
//! artifact everything is one coordinate system). `Address` is therefore a
//! thin, ordered, serde-able newtype over `u64` rather than the teacher's
//! multi-kind `Address` — generalizing the teacher's "addresses are value
//! objects with arithmetic and total order" idiom down to what this domain
//! actually needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A byte address within an artifact's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    pub const ZERO: Address = Address(0);

    pub fn new(value: u64) -> Self {
        Address(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Add an offset, saturating at `u64::MAX` rather than wrapping or
    /// panicking — an overflowing computed branch target is simply not a
    /// valid in-artifact address, and callers treat it as out-of-range.
    pub fn saturating_add(&self, offset: u64) -> Self {
        Address(self.0.saturating_add(offset))
    }

    /// Add a signed displacement, saturating at the boundaries.
    pub fn add_signed(&self, offset: i64) -> Self {
        if offset >= 0 {
            self.saturating_add(offset as u64)
        } else {
            Address(self.0.saturating_sub(offset.unsigned_abs()))
        }
    }

    pub fn checked_sub(&self, other: Address) -> Option<u64> {
        self.0.checked_sub(other.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_eight_hex_digits() {
        assert_eq!(Address::new(0x12).to_string(), "00000012");
        assert_eq!(Address::new(0x1234_5678).to_string(), "12345678");
    }

    #[test]
    fn ordering_is_by_value() {
        assert!(Address::new(0x10) < Address::new(0x20));
    }

    #[test]
    fn add_signed_handles_negative_offsets() {
        let addr = Address::new(0x100);
        assert_eq!(addr.add_signed(-0x10).value(), 0xf0);
        assert_eq!(addr.add_signed(0x10).value(), 0x110);
    }

    #[test]
    fn add_signed_saturates_at_zero() {
        let addr = Address::new(0x5);
        assert_eq!(addr.add_signed(-0x10).value(), 0);
    }

    #[test]
    fn saturating_add_saturates_at_max() {
        let addr = Address::new(u64::MAX - 1);
        assert_eq!(addr.saturating_add(10).value(), u64::MAX);
    }
}
