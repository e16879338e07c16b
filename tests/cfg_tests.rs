//! Integration coverage for CFG construction: block integrity and the
//! fixed edge-kind emission order.

use zarch_recon::classify::classify_section;
use zarch_recon::config::Configuration;
use zarch_recon::core::address::Address;
use zarch_recon::core::artifact::Artifact;
use zarch_recon::core::basic_block::TerminatorKind;
use zarch_recon::core::edge::EdgeKind;
use zarch_recon::decode::decode_all;
use zarch_recon::cfg::build_cfg;

fn build(bytes: &[u8]) -> zarch_recon::cfg::CfgOutcome {
    let artifact = Artifact::ingest(bytes, "sample.bin");
    let decoded = decode_all(&artifact);
    let config = Configuration::default();
    let mut regions = Vec::new();
    for section in &artifact.sections {
        regions.extend(classify_section(section, &decoded.instructions, &config));
    }
    build_cfg(&regions, &decoded.instructions, &[])
}

#[test]
fn conditional_branch_yields_taken_before_not_taken() {
    // BC 8,12(0,0) at 0 -> conditional; fallthrough LR at 4; filler to 12;
    // BCR return at 12 is the taken target.
    let mut bytes = vec![0x47, 0x80, 0x00, 0x0C];
    bytes.extend(vec![0x18, 0x12]);
    bytes.extend(vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    bytes.extend(vec![0x07, 0xFE]);
    let outcome = build(&bytes);
    let entry = outcome.cfg.get(Address::ZERO).unwrap();
    assert_eq!(entry.terminator_kind, TerminatorKind::Conditional);
    assert_eq!(entry.successors[0].kind, EdgeKind::BranchTaken);
    assert_eq!(entry.successors[1].kind, EdgeKind::BranchNotTaken);
    assert_eq!(entry.successors[0].target, Some(Address::new(0x0C)));
}

#[test]
fn only_first_instruction_of_a_block_is_a_leader() {
    // call-then-return: two blocks, each block's own instruction list has
    // no interior leader (no instruction besides the first is itself a
    // block leader elsewhere in the graph).
    let outcome = build(&[0x05, 0xEF, 0x07, 0xFE]);
    let leaders: Vec<Address> = outcome.cfg.blocks().map(|b| b.leader).collect();
    for block in outcome.cfg.blocks() {
        for addr in block.instruction_addrs.iter().skip(1) {
            assert!(!leaders.contains(addr), "interior address {addr} is also a leader");
        }
    }
}

#[test]
fn only_last_instruction_of_a_block_is_a_terminator_category() {
    let outcome = build(&[0x05, 0xEF, 0x07, 0xFE]);
    for block in outcome.cfg.blocks() {
        if block.is_external_ref() {
            continue;
        }
        assert_eq!(*block.instruction_addrs.last().unwrap(), block.terminator_address);
    }
}

#[test]
fn indirect_call_produces_unresolved_edge_and_diagnostic() {
    let outcome = build(&[0x05, 0xEF, 0x07, 0xFE]);
    let entry = outcome.cfg.get(Address::ZERO).unwrap();
    assert!(entry.successors.iter().any(|e| e.kind == EdgeKind::Unresolved));
    assert!(!outcome.diagnostics.is_empty());
}
