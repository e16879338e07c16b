//! The Decoder: a deterministic linear sweep over artifact sections that
//! turns bytes into [`Instruction`]s and [`UnknownSpan`]s.
//!
//! The sweep never backtracks and never speculates about alternative
//! alignments: at each cursor position it attempts exactly one decode
//! against the closed [`opcodes`] table, advances by the decoded length on
//! success, or advances by a single byte and extends the current unknown
//! span on failure. This mirrors the teacher's disassembler's "decode what
//! you can, account precisely for what you can't" discipline rather than
//! attempting any instruction-set-specific realignment heuristics, which
//! would not be reproducible from the bytes alone.

pub mod opcodes;

use crate::core::address::Address;
use crate::core::artifact::Artifact;
use crate::core::instruction::{Category, Instruction, Operand};
use crate::core::section::Section;
use crate::core::statistics::Statistics;
use crate::core::unknown_span::{UnknownReason, UnknownSpan};
use opcodes::{is_extended_opcode, lookup_extended, lookup_primary, OpcodeEntry};
use std::collections::BTreeMap;

/// Output of decoding one artifact: every instruction the sweep recognized,
/// every byte range it could not, and the counters derived along the way.
pub struct DecodeOutcome {
    pub instructions: BTreeMap<Address, Instruction>,
    pub unknown_spans: Vec<UnknownSpan>,
    pub statistics: Statistics,
}

/// Decode every section of `artifact` in section order, each section swept
/// independently from its base to its end.
pub fn decode_all(artifact: &Artifact) -> DecodeOutcome {
    let mut instructions = BTreeMap::new();
    let mut unknown_spans = Vec::new();
    let mut statistics = Statistics::default();

    for section in &artifact.sections {
        decode_section(section, &mut instructions, &mut unknown_spans, &mut statistics);
    }

    statistics.recompute_decode_rate();
    DecodeOutcome {
        instructions,
        unknown_spans,
        statistics,
    }
}

fn decode_section(
    section: &Section,
    instructions: &mut BTreeMap<Address, Instruction>,
    unknown_spans: &mut Vec<UnknownSpan>,
    statistics: &mut Statistics,
) {
    let mut cursor = section.base;
    let mut pending_unknown: Option<(Address, Vec<u8>)> = None;

    while section.contains(cursor) {
        let remaining = section
            .bytes_from(cursor)
            .expect("cursor checked in-bounds above");

        match decode_one(remaining, cursor) {
            Some(instr) => {
                flush_pending(&mut pending_unknown, unknown_spans, statistics);

                statistics.decoded_instruction_count += 1;
                statistics.decoded_byte_count += instr.len() as u64;
                statistics.record_mnemonic(&instr.mnemonic);
                match instr.category {
                    Category::ConditionalBranch | Category::UnconditionalBranch => {
                        statistics.branch_count += 1
                    }
                    Category::Call => statistics.call_count += 1,
                    Category::Return => statistics.return_count += 1,
                    _ => {}
                }

                cursor = instr.end_address();
                instructions.insert(instr.address, instr);
            }
            None => {
                let byte = remaining[0];
                match &mut pending_unknown {
                    Some((_, bytes)) => bytes.push(byte),
                    None => pending_unknown = Some((cursor, vec![byte])),
                }
                statistics.unknown_byte_count += 1;
                cursor = cursor.saturating_add(1);
            }
        }
    }

    flush_pending(&mut pending_unknown, unknown_spans, statistics);
}

fn flush_pending(
    pending: &mut Option<(Address, Vec<u8>)>,
    unknown_spans: &mut Vec<UnknownSpan>,
    _statistics: &mut Statistics,
) {
    if let Some((start, bytes)) = pending.take() {
        unknown_spans.push(UnknownSpan::new(start, bytes, UnknownReason::DecodeFailed));
    }
}

/// Attempt to decode a single instruction at `addr` from `bytes` (the
/// remaining bytes of the section starting at `addr`). Returns `None` when
/// the leading byte doesn't resolve to a table entry, or when the section
/// doesn't hold enough bytes for the implied length — either case is a
/// decode failure, not a partial instruction.
fn decode_one(bytes: &[u8], addr: Address) -> Option<Instruction> {
    let byte0 = *bytes.first()?;
    let declared_len = opcodes::length_class(byte0) as usize;
    if bytes.len() < declared_len {
        return None;
    }

    let entry = if is_extended_opcode(byte0) {
        let ext = bytes.get(1)? & 0x0F;
        lookup_extended(byte0, ext)?
    } else {
        lookup_primary(byte0)?
    };

    let length = entry.length as usize;
    if bytes.len() < length {
        return None;
    }
    let raw = &bytes[..length];

    let (operands, category, resolved_target) = decode_semantics(&entry, raw, addr);

    Some(Instruction {
        address: addr,
        raw_bytes: raw.to_vec(),
        mnemonic: entry.mnemonic.to_string(),
        operands,
        category,
        valid: true,
        resolved_target,
    })
}

/// Extract operands and assign a [`Category`] and resolved branch target,
/// per-mnemonic. Register-indirect branches (`BCR`/`BASR`/`BALR`/`BCTR` with
/// a non-zero target register) are `Category::Indirect` or `Category::Call`
/// with `resolved_target = None`: the target lives in a register whose
/// value this pipeline never tracks, so resolving it would mean simulating
/// execution rather than reading bytes.
fn decode_semantics(
    entry: &OpcodeEntry,
    raw: &[u8],
    addr: Address,
) -> (Vec<Operand>, Category, Option<Address>) {
    match entry.mnemonic {
        "BCR" => {
            let mask = raw[1] >> 4;
            let r2 = raw[1] & 0x0F;
            let operands = vec![Operand::Immediate(mask as i64), Operand::Register(r2)];
            let category = if r2 == 0 || mask == 0 {
                Category::Sequential
            } else if mask == 0x0F && r2 == 14 {
                Category::Return
            } else {
                Category::Indirect
            };
            (operands, category, None)
        }
        "BASR" | "BALR" => {
            let r1 = raw[1] >> 4;
            let r2 = raw[1] & 0x0F;
            let operands = vec![Operand::Register(r1), Operand::Register(r2)];
            let category = if r2 == 0 {
                Category::Sequential
            } else {
                Category::Call
            };
            (operands, category, None)
        }
        "BCTR" => {
            let r1 = raw[1] >> 4;
            let r2 = raw[1] & 0x0F;
            let operands = vec![Operand::Register(r1), Operand::Register(r2)];
            let category = if r2 == 0 {
                Category::Sequential
            } else {
                Category::Indirect
            };
            (operands, category, None)
        }
        "LTR" | "LR" | "AR" | "SR" | "CR" => {
            let r1 = raw[1] >> 4;
            let r2 = raw[1] & 0x0F;
            (
                vec![Operand::Register(r1), Operand::Register(r2)],
                Category::Sequential,
                None,
            )
        }
        "BC" => {
            let (mask, bid) = rx_fields(raw);
            let operands = vec![Operand::Immediate(mask as i64), bid.clone()];
            let disp = base_index_disp_value(&bid);
            let target = addr.add_signed(disp);
            let category = if mask == 0 {
                return (operands, Category::Sequential, None);
            } else if mask == 0x0F {
                Category::UnconditionalBranch
            } else {
                Category::ConditionalBranch
            };
            (operands, category, Some(target))
        }
        "BAL" | "BAS" => {
            let (r1, bid) = rx_fields(raw);
            let disp = base_index_disp_value(&bid);
            let target = addr.add_signed(disp);
            (
                vec![Operand::Register(r1), bid],
                Category::Call,
                Some(target),
            )
        }
        "LA" | "L" | "ST" | "C" | "A" | "S" | "LH" => {
            let (r1, bid) = rx_fields(raw);
            (
                vec![Operand::Register(r1), bid],
                Category::Sequential,
                None,
            )
        }
        "STM" | "LM" => {
            let r1 = raw[1] >> 4;
            let r3 = raw[1] & 0x0F;
            let (base, disp) = bd_fields(raw[2], raw[3]);
            (
                vec![
                    Operand::Register(r1),
                    Operand::Register(r3),
                    Operand::BaseDisp { base, disp },
                ],
                Category::Sequential,
                None,
            )
        }
        "TM" | "MVI" | "NI" | "OI" => {
            let imm = raw[1];
            let (base, disp) = bd_fields(raw[2], raw[3]);
            (
                vec![
                    Operand::Immediate(imm as i64),
                    Operand::BaseDisp { base, disp },
                ],
                Category::Sequential,
                None,
            )
        }
        "MVC" | "CLC" | "XC" => {
            let len = raw[1] as i64 + 1;
            let (b1, d1) = bd_fields(raw[2], raw[3]);
            let (b2, d2) = bd_fields(raw[4], raw[5]);
            (
                vec![
                    Operand::Immediate(len),
                    Operand::BaseDisp { base: b1, disp: d1 },
                    Operand::BaseDisp { base: b2, disp: d2 },
                ],
                Category::Sequential,
                None,
            )
        }
        "BRC" => {
            let mask = raw[1] >> 4;
            let i2 = i16::from_be_bytes([raw[2], raw[3]]);
            let operands = vec![Operand::Immediate(mask as i64), Operand::PcRelative(i2 as i64)];
            let target = addr.add_signed(2 * i2 as i64);
            let category = if mask == 0 {
                return (operands, Category::Sequential, None);
            } else if mask == 0x0F {
                Category::UnconditionalBranch
            } else {
                Category::ConditionalBranch
            };
            (operands, category, Some(target))
        }
        "BRAS" => {
            let r1 = raw[1] >> 4;
            let i2 = i16::from_be_bytes([raw[2], raw[3]]);
            let target = addr.add_signed(2 * i2 as i64);
            (
                vec![Operand::Register(r1), Operand::PcRelative(i2 as i64)],
                Category::Call,
                Some(target),
            )
        }
        "LHI" | "AHI" | "CHI" => {
            let r1 = raw[1] >> 4;
            let i2 = i16::from_be_bytes([raw[2], raw[3]]);
            (
                vec![Operand::Register(r1), Operand::Immediate(i2 as i64)],
                Category::Sequential,
                None,
            )
        }
        "LARL" => {
            let r1 = raw[1] >> 4;
            let i2 = i32::from_be_bytes([raw[2], raw[3], raw[4], raw[5]]);
            (
                vec![Operand::Register(r1), Operand::PcRelative(i2 as i64)],
                Category::Sequential,
                None,
            )
        }
        "BRASL" => {
            let r1 = raw[1] >> 4;
            let i2 = i32::from_be_bytes([raw[2], raw[3], raw[4], raw[5]]);
            let target = addr.add_signed(2 * i2 as i64);
            (
                vec![Operand::Register(r1), Operand::PcRelative(i2 as i64)],
                Category::Call,
                Some(target),
            )
        }
        other => unreachable!("opcode table entry {other} has no decode_semantics arm"),
    }
}

/// Decode the R1 (or mask) and X2/B2/D2 fields of an RX-format instruction,
/// per `entry.format == Format::Rx`.
fn rx_fields(raw: &[u8]) -> (u8, Operand) {
    let r1 = raw[1] >> 4;
    let x2 = raw[1] & 0x0F;
    let (base, disp) = bd_fields(raw[2], raw[3]);
    (
        r1,
        Operand::BaseIndexDisp {
            base,
            index: x2,
            disp,
        },
    )
}

fn bd_fields(byte2: u8, byte3: u8) -> (u8, i32) {
    let base = byte2 >> 4;
    let disp = (((byte2 & 0x0F) as i32) << 8) | byte3 as i32;
    (base, disp)
}

/// Direct-branch target resolution for RX-format branch/call instructions
/// (`BC`, `BAL`, `BAS`) uses the instruction's own address plus the raw
/// displacement field, deliberately ignoring the base and index registers
/// named in the operand. Tracking what a base register "currently holds"
/// would mean simulating execution state across instructions — exactly the
/// speculative indirect-branch resolution ruled out for this pipeline. The
/// true target of a `B2`-relative RX branch depends on run-time base-register
/// contents this pipeline never observes; using the displacement alone keeps
/// every target a pure, deterministic function of the two bytes at `addr`.
fn base_index_disp_value(operand: &Operand) -> i64 {
    match operand {
        Operand::BaseIndexDisp { disp, .. } => *disp as i64,
        _ => 0,
    }
}
