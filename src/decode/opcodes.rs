//! The opcode table: a closed mapping from opcode bytes (primary, plus
//! extension nibble for the RI/RIL families) to mnemonic, format, and
//! instruction length.
//!
//! The table is deliberately small. This is not a general-purpose
//! z/Architecture disassembler — it recognizes the subset of the instruction
//! set needed to identify control flow (branches, calls, returns) and common
//! data-movement/arithmetic instructions, per the decoder's closed-world
//! contract: any opcode byte not in this table is an unknown byte, not a
//! best-effort guess.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Instruction format, used only to size and shape operand extraction. The
/// opcode table's `length` field is authoritative; format is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Register-register: 2 bytes, two 4-bit register fields.
    Rr,
    /// Register-indexed-storage: 4 bytes, R1/X2/B2/D2.
    Rx,
    /// Register-storage: 4 bytes, R1/R3/B2/D2.
    Rs,
    /// Storage-immediate: 4 bytes, I2/B1/D1.
    Si,
    /// Storage-storage: 6 bytes, two length/base/displacement triples.
    Ss,
    /// Register-immediate: 4 bytes, R1/extension/I2 (halfword PC-relative
    /// count for the branch-class members of this family).
    Ri,
    /// Register-immediate-long: 6 bytes, R1/extension/I2 (fullword
    /// PC-relative count).
    Ril,
}

/// One opcode-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    pub format: Format,
    pub length: u8,
}

const fn entry(mnemonic: &'static str, format: Format, length: u8) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        format,
        length,
    }
}

/// Single-byte opcodes: RR, RX, RS, SI, SS formats, keyed by the first byte.
static PRIMARY: Lazy<HashMap<u8, OpcodeEntry>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // RR, 2 bytes.
    m.insert(0x05, entry("BALR", Format::Rr, 2));
    m.insert(0x06, entry("BCTR", Format::Rr, 2));
    m.insert(0x07, entry("BCR", Format::Rr, 2));
    m.insert(0x0D, entry("BASR", Format::Rr, 2));
    m.insert(0x12, entry("LTR", Format::Rr, 2));
    m.insert(0x18, entry("LR", Format::Rr, 2));
    m.insert(0x1A, entry("AR", Format::Rr, 2));
    m.insert(0x1B, entry("SR", Format::Rr, 2));
    m.insert(0x19, entry("CR", Format::Rr, 2));
    // RX, 4 bytes.
    m.insert(0x41, entry("LA", Format::Rx, 4));
    m.insert(0x45, entry("BAL", Format::Rx, 4));
    m.insert(0x47, entry("BC", Format::Rx, 4));
    m.insert(0x48, entry("LH", Format::Rx, 4));
    m.insert(0x4D, entry("BAS", Format::Rx, 4));
    m.insert(0x50, entry("ST", Format::Rx, 4));
    m.insert(0x58, entry("L", Format::Rx, 4));
    m.insert(0x59, entry("C", Format::Rx, 4));
    m.insert(0x5A, entry("A", Format::Rx, 4));
    m.insert(0x5B, entry("S", Format::Rx, 4));
    // RS, 4 bytes.
    m.insert(0x90, entry("STM", Format::Rs, 4));
    m.insert(0x98, entry("LM", Format::Rs, 4));
    // SI, 4 bytes.
    m.insert(0x91, entry("TM", Format::Si, 4));
    m.insert(0x92, entry("MVI", Format::Si, 4));
    m.insert(0x94, entry("NI", Format::Si, 4));
    m.insert(0x96, entry("OI", Format::Si, 4));
    // SS, 6 bytes.
    m.insert(0xD2, entry("MVC", Format::Ss, 6));
    m.insert(0xD5, entry("CLC", Format::Ss, 6));
    m.insert(0xD7, entry("XC", Format::Ss, 6));
    m
});

/// Opcode bytes whose full identity requires a second-byte extension
/// nibble (the RI and RIL families). Keyed by `(first_byte, extension)`.
static EXTENDED: Lazy<HashMap<(u8, u8), OpcodeEntry>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // RI family, opcode byte 0xA7, 4 bytes.
    m.insert((0xA7, 0x4), entry("BRC", Format::Ri, 4));
    m.insert((0xA7, 0x5), entry("BRAS", Format::Ri, 4));
    m.insert((0xA7, 0x8), entry("LHI", Format::Ri, 4));
    m.insert((0xA7, 0xA), entry("AHI", Format::Ri, 4));
    m.insert((0xA7, 0x9), entry("CHI", Format::Ri, 4));
    // RIL family, opcode byte 0xC0, 6 bytes.
    m.insert((0xC0, 0x0), entry("LARL", Format::Ril, 6));
    m.insert((0xC0, 0x5), entry("BRASL", Format::Ril, 6));
    m
});

/// Opcode bytes that require reading the extension nibble from the second
/// byte before a table lookup can resolve the mnemonic.
pub fn is_extended_opcode(byte0: u8) -> bool {
    byte0 == 0xA7 || byte0 == 0xC0
}

/// Look up a primary (non-extended) opcode.
pub fn lookup_primary(byte0: u8) -> Option<OpcodeEntry> {
    PRIMARY.get(&byte0).copied()
}

/// Look up an extended-family opcode by first byte and extension nibble.
pub fn lookup_extended(byte0: u8, extension: u8) -> Option<OpcodeEntry> {
    EXTENDED.get(&(byte0, extension)).copied()
}

/// The instruction length implied by the top two bits of the first opcode
/// byte, independent of whether the opcode itself is recognized. Used to
/// validate that a table entry's `length` agrees with the architecture's own
/// length-encoding rule, and to size the read when an opcode is unrecognized
/// but we still want to report the implied length in diagnostics.
pub fn length_class(byte0: u8) -> u8 {
    match byte0 >> 6 {
        0b00 => 2,
        0b01 | 0b10 => 4,
        _ => 6,
    }
}
