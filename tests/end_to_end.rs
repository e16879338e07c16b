//! End-to-end scenarios S1-S6 and the universally-quantified invariants,
//! run through the single `analyze` entry point.

use zarch_recon::analyze;
use zarch_recon::config::Configuration;
use zarch_recon::core::address::Address;
use zarch_recon::core::region::RegionKind;
use zarch_recon::core::result::Status;
use zarch_recon::render::{render_asm, render_pseudocode};

#[test]
fn s1_empty_input() {
    let result = analyze(&[], "empty.bin", &[], &Configuration::default());
    assert_eq!(result.status, Status::Failure);
    assert!(result.instructions.is_empty());
    assert!(result.regions.is_empty());
    assert_eq!(render_asm(&result), "\n");
}

#[test]
fn s2_two_byte_return() {
    let result = analyze(&[0x07, 0xFE], "s2.bin", &[], &Configuration::default());
    assert_eq!(result.instructions.len(), 1);
    let i = result.instructions.get(&Address::ZERO).unwrap();
    assert_eq!(i.to_string(), "BCR 15,14");
    assert_eq!(result.regions.len(), 1);
    assert_eq!(result.regions[0].kind, RegionKind::Code);
    assert_eq!(result.cfg.len(), 1);
    assert_eq!(result.procedures.len(), 1);
    assert_eq!(result.procedures[0].id, "PROC_00000000");
    assert_eq!(result.status, Status::Success);
    assert_eq!(result.statistics.decode_rate, 1.0);
    let asm = render_asm(&result);
    assert!(asm.contains("07FE"));
    assert!(asm.contains("BCR"));
}

#[test]
fn s3_branch_and_link_then_return() {
    let result = analyze(&[0x05, 0xEF, 0x07, 0xFE], "s3.bin", &[], &Configuration::default());
    let call = result.instructions.get(&Address::ZERO).unwrap();
    assert_eq!(call.mnemonic, "BALR");
    assert_eq!(call.category, zarch_recon::core::instruction::Category::Call);
    assert_eq!(call.resolved_target, None);
    let ret = result.instructions.get(&Address::new(2)).unwrap();
    assert_eq!(ret.to_string(), "BCR 15,14");
    assert_eq!(result.procedures.len(), 1);
    let edges = result.call_graph.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].callee, None);
    assert_eq!(result.status, Status::Success);
}

#[test]
fn s4_conditional_forward_branch_sample() {
    let hex = "05CF90ECD00C5820C1005920C1044780C0204120000147F0C028412000025020C10898ECD00C07FE";
    let bytes: Vec<u8> = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect();
    assert_eq!(bytes.len(), 40);
    let result = analyze(&bytes, "s4.bin", &[], &Configuration::default());
    assert_eq!(result.instructions.len(), 11);
    assert_eq!(result.statistics.decode_rate, 1.0);
    assert_eq!(result.procedures.len(), 1);
    let bc_edges: Vec<_> = result
        .instructions
        .values()
        .filter(|i| i.mnemonic == "BC" && i.resolved_target.is_some())
        .collect();
    assert_eq!(bc_edges.len(), 2);
}

#[test]
fn s5_mixed_code_data_tiles_without_gap_or_overlap() {
    let mut bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(32).flatten().collect();
    bytes.extend(std::iter::repeat(0u8).take(64));
    let result = analyze(&bytes, "s5.bin", &[], &Configuration::default());
    assert_eq!(result.regions[0].start, Address::ZERO);
    for pair in result.regions.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert_eq!(result.regions.last().unwrap().end, Address::new(bytes.len() as u64));
    assert_eq!(result.regions[0].kind, RegionKind::Code);
}

#[test]
fn s6_unknown_single_byte_then_return() {
    let result = analyze(&[0xFF, 0x07, 0xFE], "s6.bin", &[], &Configuration::default());
    assert_eq!(result.unknown_spans.len(), 1);
    assert_eq!(result.unknown_spans[0].start, Address::ZERO);
    assert_eq!(result.unknown_spans[0].reason.to_string(), "decode-failed");
    let ret = result.instructions.get(&Address::new(1)).unwrap();
    assert_eq!(ret.to_string(), "BCR 15,14");
    assert_eq!(result.status, Status::Partial);
}

#[test]
fn invariant_byte_accounting_holds() {
    let bytes = vec![0x90, 0xEC, 0xD0, 0x0C, 0x47, 0x80, 0x00, 0x0A, 0x00, 0x07, 0xFE];
    let result = analyze(&bytes, "acct.bin", &[], &Configuration::default());
    let decoded_bytes: u64 = result.instructions.values().map(|i| i.len() as u64).sum();
    let unknown_bytes: u64 = result.unknown_spans.iter().map(|s| s.length).sum();
    assert_eq!(decoded_bytes + unknown_bytes, bytes.len() as u64);
}

#[test]
fn invariant_determinism_across_repeated_runs() {
    let bytes = vec![0x90, 0xEC, 0xD0, 0x0C, 0x47, 0x80, 0x00, 0x0A, 0x00, 0x07, 0xFE];
    let r1 = analyze(&bytes, "det.bin", &[], &Configuration::default());
    let r2 = analyze(&bytes, "det.bin", &[], &Configuration::default());
    assert_eq!(render_asm(&r1), render_asm(&r2));
    assert_eq!(
        render_pseudocode(&r1, Configuration::default().pseudocode_style),
        render_pseudocode(&r2, Configuration::default().pseudocode_style)
    );
    assert_eq!(r1.statistics.decode_rate, r2.statistics.decode_rate);
}

#[test]
fn invariant_unresolved_targets_never_leak_a_speculative_address() {
    let result = analyze(&[0x05, 0xEF, 0x07, 0xFE], "ind.bin", &[], &Configuration::default());
    let asm = render_asm(&result);
    let pseudo = render_pseudocode(&result, Configuration::default().pseudocode_style);
    assert!(asm.contains("UNRESOLVED_TARGET"));
    assert!(pseudo.contains("UNRESOLVED_TARGET"));
}
