//! Instruction and Operand types for decoded z/Architecture instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// Closed tagged union of operand shapes produced by the decoder's
/// operand-extraction tables. Exhaustive: every format the opcode table
/// recognizes maps to exactly one of these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Register(u8),
    Immediate(i64),
    BaseDisp { base: u8, disp: i32 },
    BaseIndexDisp { base: u8, index: u8, disp: i32 },
    PcRelative(i64),
    Opaque(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{}", r),
            Operand::Immediate(v) => write!(f, "{}", v),
            Operand::BaseDisp { base, disp } => write!(f, "{}({})", disp, base),
            Operand::BaseIndexDisp { base, index, disp } => {
                if *index == 0 {
                    write!(f, "{}({})", disp, base)
                } else {
                    write!(f, "{}({},{})", disp, index, base)
                }
            }
            Operand::PcRelative(off) => write!(f, "{:+}", off),
            Operand::Opaque(text) => write!(f, "{}", text),
        }
    }
}

/// Broad behavioral category of a decoded instruction, used to drive CFG
/// construction and the procedure inferencer without re-deriving behavior
/// from the mnemonic at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Sequential,
    ConditionalBranch,
    UnconditionalBranch,
    Call,
    Return,
    Indirect,
    Unknown,
}

/// A decoded instruction at a specific address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub address: Address,
    pub raw_bytes: Vec<u8>,
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub category: Category,
    /// Whether this instruction decoded against a recognized opcode-table
    /// entry with a complete, in-bounds operand set.
    pub valid: bool,
    /// Resolved absolute target for direct branches and calls. Always
    /// `None` for `Category::Indirect` and `Category::Return`.
    pub resolved_target: Option<Address>,
}

impl Instruction {
    pub fn len(&self) -> usize {
        self.raw_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_bytes.is_empty()
    }

    pub fn end_address(&self) -> Address {
        self.address.saturating_add(self.raw_bytes.len() as u64)
    }

    /// Whether this instruction terminates a basic block: the last
    /// instruction of a block is always one of these categories (block
    /// integrity invariant).
    pub fn is_terminator(&self) -> bool {
        !matches!(self.category, Category::Sequential | Category::Unknown)
    }

    pub fn hex_bytes(&self) -> String {
        self.raw_bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn operand_text(&self) -> String {
        self.operands
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}", self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, self.operand_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(addr: u64, bytes: Vec<u8>, mnemonic: &str, category: Category) -> Instruction {
        Instruction {
            address: Address::new(addr),
            raw_bytes: bytes,
            mnemonic: mnemonic.to_string(),
            operands: vec![],
            category,
            valid: true,
            resolved_target: None,
        }
    }

    #[test]
    fn end_address_follows_length() {
        let i = instr(0x10, vec![0x07, 0xfe], "BCR", Category::Return);
        assert_eq!(i.end_address(), Address::new(0x12));
    }

    #[test]
    fn sequential_and_unknown_are_not_terminators() {
        assert!(!instr(0, vec![0x18, 0x12], "LR", Category::Sequential).is_terminator());
    }

    #[test]
    fn branches_calls_and_returns_are_terminators() {
        for cat in [
            Category::ConditionalBranch,
            Category::UnconditionalBranch,
            Category::Call,
            Category::Return,
            Category::Indirect,
        ] {
            assert!(instr(0, vec![0], "X", cat).is_terminator());
        }
    }

    #[test]
    fn hex_bytes_are_upper_case_no_separator() {
        let i = instr(0, vec![0x07, 0xfe], "BCR", Category::Return);
        assert_eq!(i.hex_bytes(), "07FE");
    }

    #[test]
    fn display_formats_mnemonic_and_operands() {
        let mut i = instr(0, vec![0x18, 0x12], "LR", Category::Sequential);
        i.operands = vec![Operand::Register(1), Operand::Register(2)];
        assert_eq!(i.to_string(), "LR 1,2");
    }

    #[test]
    fn operand_display_variants() {
        assert_eq!(Operand::Register(14).to_string(), "14");
        assert_eq!(Operand::Immediate(-1).to_string(), "-1");
        assert_eq!(
            Operand::BaseDisp { base: 13, disp: 12 }.to_string(),
            "12(13)"
        );
        assert_eq!(
            Operand::BaseIndexDisp {
                base: 12,
                index: 0,
                disp: 0x100
            }
            .to_string(),
            "256(12)"
        );
        assert_eq!(
            Operand::BaseIndexDisp {
                base: 12,
                index: 3,
                disp: 0x100
            }
            .to_string(),
            "256(3,12)"
        );
        assert_eq!(Operand::PcRelative(16).to_string(), "+16");
        assert_eq!(Operand::Opaque("?".into()).to_string(), "?");
    }
}
