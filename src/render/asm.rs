//! The Assembler Renderer: an HLASM-style listing with synthetic labels and
//! hex evidence, per spec section 4.6.
//!
//! Output lines are emitted in ascending address order across the whole
//! artifact; every non-comment line carries the address and raw-byte hex of
//! the bytes that produced it (the evidence-chain invariant).

use std::collections::BTreeMap;

use crate::core::address::Address;
use crate::core::evidence::EvidenceLink;
use crate::core::instruction::{Category, Instruction};
use crate::core::region::{Confidence, Region, RegionKind};
use crate::core::result::AnalysisResult;

const UNRESOLVED_TARGET: &str = "UNRESOLVED_TARGET";
const HEX_DUMP_WIDTH: usize = 16;

/// Render the full assembler listing for one analysis result.
pub fn render_asm(result: &AnalysisResult) -> String {
    let label_map = build_label_map(result);

    let mut regions: Vec<&Region> = result.regions.iter().collect();
    regions.sort_by_key(|r| r.start);

    let mut lines: Vec<String> = Vec::new();
    for region in regions {
        match region.kind {
            RegionKind::Code => render_code_region(result, region, &label_map, &mut lines),
            RegionKind::Data => render_raw_region(result, region, &label_map, "Data Region", &mut lines),
            RegionKind::Unknown => {
                render_raw_region(result, region, &label_map, "Unknown/Undecodable Region", &mut lines)
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn build_label_map(result: &AnalysisResult) -> BTreeMap<Address, String> {
    let mut labels = BTreeMap::new();
    for proc in &result.procedures {
        labels.insert(proc.entry, proc.id.clone());
    }
    for block in result.cfg.blocks() {
        if block.is_external_ref() {
            continue;
        }
        labels
            .entry(block.leader)
            .or_insert_with(|| format!("LOC_{:08X}", block.leader.value()));
    }
    for region in &result.regions {
        if region.kind == RegionKind::Data {
            labels
                .entry(region.start)
                .or_insert_with(|| format!("DATA_{:08X}", region.start.value()));
        }
    }
    labels
}

fn render_code_region(
    result: &AnalysisResult,
    region: &Region,
    labels: &BTreeMap<Address, String>,
    lines: &mut Vec<String>,
) {
    let mut cursor = region.start;
    while cursor < region.end {
        if let Some(instr) = result.instructions.get(&cursor) {
            lines.push(render_instruction_line(instr, labels));
            cursor = instr.end_address();
        } else if let Some(span) = result
            .unknown_spans
            .iter()
            .find(|s| s.start == cursor)
        {
            render_hex_block(
                cursor,
                &span.raw_bytes,
                "Undecodable bytes",
                labels,
                lines,
            );
            cursor = span.end();
        } else {
            // No instruction or span begins exactly here; advance by one
            // byte to keep total byte accounting (should not happen given
            // the decoder's byte-accounting invariant, but never stalls).
            cursor = cursor.saturating_add(1);
        }
    }
}

fn render_raw_region(
    result: &AnalysisResult,
    region: &Region,
    labels: &BTreeMap<Address, String>,
    caption: &str,
    lines: &mut Vec<String>,
) {
    let section = result.artifact.section_containing(region.start);
    let bytes = match section.and_then(|s| s.bytes_from(region.start)) {
        Some(b) => {
            let len = (region.end.value() - region.start.value()) as usize;
            &b[..len.min(b.len())]
        }
        None => &[],
    };
    render_hex_block(region.start, bytes, caption, labels, lines);
}

fn render_hex_block(
    start: Address,
    bytes: &[u8],
    caption: &str,
    labels: &BTreeMap<Address, String>,
    lines: &mut Vec<String>,
) {
    let link = EvidenceLink::for_span(start, bytes, Confidence::Low, caption);
    let label = labels.get(&start).cloned().unwrap_or_default();
    lines.push(format!(
        "{:08X} {:<12} {:<14} * {}: 0x{:x}-0x{:x} ({} bytes)",
        start.value(),
        "",
        label,
        caption,
        link.start.value(),
        link.end.value(),
        bytes.len()
    ));
    for (i, chunk) in bytes.chunks(HEX_DUMP_WIDTH).enumerate() {
        let chunk_addr = start.saturating_add((i * HEX_DUMP_WIDTH) as u64);
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        lines.push(format!("{:08X} {}", chunk_addr.value(), hex.join(" ")));
    }
}

fn render_instruction_line(instr: &Instruction, labels: &BTreeMap<Address, String>) -> String {
    let label = labels.get(&instr.address).cloned().unwrap_or_default();
    let (operand_text, comment) = render_operands(instr, labels);

    let mnemonic_operands = if operand_text.is_empty() {
        instr.mnemonic.clone()
    } else {
        format!("{} {}", instr.mnemonic, operand_text)
    };

    let link = EvidenceLink::for_instruction(instr, Confidence::High, "decoded");
    let base = format!(
        "{:08X} {:<12} {:<14} {}",
        instr.address.value(),
        link.raw_hex,
        label,
        mnemonic_operands
    );

    match comment {
        Some(c) => format!("{}   * {}", base, c),
        None => base,
    }
}

/// Render an instruction's operand list, substituting labels for resolved
/// branch/call targets and `UNRESOLVED_TARGET` for indirect ones, per spec
/// section 4.6's rules. Returns the operand text and an optional trailing
/// comment (carrying the original operand encoding for unresolved targets).
fn render_operands(instr: &Instruction, labels: &BTreeMap<Address, String>) -> (String, Option<String>) {
    let is_indirect_unresolved = matches!(instr.category, Category::Indirect)
        || (instr.category == Category::Call && instr.resolved_target.is_none());

    if is_indirect_unresolved && !instr.operands.is_empty() {
        let target_index = instr.operands.len() - 1;
        let original = instr.operands[target_index].to_string();
        let mut parts: Vec<String> = instr.operands.iter().map(|o| o.to_string()).collect();
        parts[target_index] = UNRESOLVED_TARGET.to_string();
        return (parts.join(","), Some(format!("orig-operand={}", original)));
    }

    let is_resolved_branch = matches!(
        instr.category,
        Category::ConditionalBranch | Category::UnconditionalBranch | Category::Call
    ) && instr.resolved_target.is_some();

    if is_resolved_branch && !instr.operands.is_empty() {
        let target = instr.resolved_target.unwrap();
        let target_index = instr.operands.len() - 1;
        let label = labels
            .get(&target)
            .cloned()
            .unwrap_or_else(|| format!("0x{:08X}", target.value()));
        let mut parts: Vec<String> = instr.operands.iter().map(|o| o.to_string()).collect();
        parts[target_index] = label;
        return (parts.join(","), None);
    }

    (instr.operand_text(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use crate::config::Configuration;

    #[test]
    fn return_only_listing_contains_mnemonic_and_hex() {
        let result = analyze(&[0x07, 0xFE], "s2.bin", &[], &Configuration::default());
        let asm = render_asm(&result);
        assert!(asm.contains("07FE"));
        assert!(asm.contains("BCR"));
        assert!(asm.contains("PROC_00000000"));
    }

    #[test]
    fn unresolved_indirect_call_uses_literal_marker() {
        let result = analyze(&[0x05, 0xEF, 0x07, 0xFE], "s3.bin", &[], &Configuration::default());
        let asm = render_asm(&result);
        assert!(asm.contains(UNRESOLVED_TARGET));
        assert!(asm.contains("orig-operand="));
    }

    #[test]
    fn resolved_branch_prints_label_not_displacement() {
        // BC 15,4(0,0) at 0 -> unconditional branch to 4; LR at 4.
        let bytes = vec![0x47, 0xF0, 0x00, 0x04, 0x18, 0x12];
        let result = analyze(&bytes, "s.bin", &[], &Configuration::default());
        let asm = render_asm(&result);
        assert!(asm.contains("LOC_00000004") || asm.contains("PROC_00000004"));
        assert!(!asm.contains("BC 15,4"));
    }

    #[test]
    fn unknown_region_renders_caption_and_hexdump() {
        let bytes = vec![0xFFu8; 64];
        let result = analyze(&bytes, "s6.bin", &[], &Configuration::default());
        let asm = render_asm(&result);
        assert!(asm.contains("Unknown/Undecodable Region") || asm.contains("Data Region"));
    }
}
