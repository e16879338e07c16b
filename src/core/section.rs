//! Section: a contiguous byte range of an artifact at a known base address.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;

/// A contiguous range of bytes loaded (or to-be-loaded) at `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub base: Address,
    pub bytes: Vec<u8>,
}

impl Section {
    pub fn new(name: impl Into<String>, base: Address, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            base,
            bytes,
        }
    }

    /// Exclusive end address of this section.
    pub fn end(&self) -> Address {
        self.base.saturating_add(self.bytes.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.value() >= self.base.value() && addr.value() < self.end().value()
    }

    /// Slice of bytes starting at `addr`, or `None` if `addr` is outside
    /// this section.
    pub fn bytes_from(&self, addr: Address) -> Option<&[u8]> {
        if !self.contains(addr) {
            return None;
        }
        let offset = (addr.value() - self.base.value()) as usize;
        Some(&self.bytes[offset..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_base_plus_len() {
        let s = Section::new("code", Address::new(0x100), vec![0u8; 16]);
        assert_eq!(s.end(), Address::new(0x110));
    }

    #[test]
    fn contains_respects_bounds() {
        let s = Section::new("code", Address::new(0x100), vec![0u8; 16]);
        assert!(s.contains(Address::new(0x100)));
        assert!(s.contains(Address::new(0x10f)));
        assert!(!s.contains(Address::new(0x110)));
        assert!(!s.contains(Address::new(0xff)));
    }

    #[test]
    fn bytes_from_offsets_correctly() {
        let s = Section::new("code", Address::new(0x100), vec![1, 2, 3, 4]);
        assert_eq!(s.bytes_from(Address::new(0x102)), Some(&[3u8, 4u8][..]));
        assert_eq!(s.bytes_from(Address::new(0x200)), None);
    }
}
