//! The Region Classifier: partitions a section's address space into CODE,
//! DATA, and UNKNOWN regions from the decoder's output.
//!
//! The algorithm is a fixed-size sliding window over decode density, then a
//! coalescing pass that merges same-kind neighbors and snaps every boundary
//! onto a real instruction start so no Region ever splits an instruction.

use std::collections::BTreeMap;

use crate::config::Configuration;
use crate::core::address::Address;
use crate::core::instruction::Instruction;
use crate::core::region::{Confidence, Region, RegionKind};
use crate::core::section::Section;

const CONSTANT_POOL_MIN_BYTES: u64 = 16;

/// Classify one section's bytes into an ordered, gapless, non-overlapping
/// list of regions, using `instructions` (this section's decode output) to
/// compute window decode rates and to align region boundaries.
pub fn classify_section(
    section: &Section,
    instructions: &BTreeMap<Address, Instruction>,
    config: &Configuration,
) -> Vec<Region> {
    if section.is_empty() {
        return Vec::new();
    }

    let windows = windows_for(section, instructions, config);
    let coalesced = coalesce(instructions, &windows);
    split_constant_pools(section, coalesced)
}

struct Window {
    start: Address,
    end: Address,
    kind: RegionKind,
    confidence: Confidence,
    decode_rate: f64,
}

/// Compute the fixed-size window partition and each window's classification.
fn windows_for(
    section: &Section,
    instructions: &BTreeMap<Address, Instruction>,
    config: &Configuration,
) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut cursor = section.base.value();
    let section_end = section.end().value();
    let window_size = config.decode_window_size as u64;
    let mut prev_kind: Option<RegionKind> = None;

    while cursor < section_end {
        let window_end = (cursor + window_size).min(section_end);
        let start = Address::new(cursor);
        let end = Address::new(window_end);

        let decoded_bytes: u64 = instructions
            .range(start..end)
            .map(|(_, instr)| instr.len() as u64)
            .sum();
        let window_bytes = window_end - cursor;
        let decode_rate = decoded_bytes as f64 / window_bytes as f64;

        // On an exact threshold boundary, prefer the prior window's kind
        // (deterministic, favors stability) rather than always resolving to
        // CODE/DATA; a window with no predecessor falls through to the
        // ordinary threshold comparisons below.
        let on_boundary =
            decode_rate == config.code_threshold || decode_rate == config.data_threshold;
        let (kind, confidence) = match (on_boundary, prev_kind) {
            (true, Some(prev)) => (prev, confidence_for_kind(prev)),
            _ if decode_rate >= config.code_threshold => (RegionKind::Code, Confidence::High),
            _ if decode_rate <= config.data_threshold => (RegionKind::Data, Confidence::Medium),
            _ => (RegionKind::Unknown, Confidence::Low),
        };

        windows.push(Window {
            start,
            end,
            kind,
            confidence,
            decode_rate,
        });
        prev_kind = Some(kind);
        cursor = window_end;
    }

    windows
}

fn confidence_for_kind(kind: RegionKind) -> Confidence {
    match kind {
        RegionKind::Code => Confidence::High,
        RegionKind::Data => Confidence::Medium,
        RegionKind::Unknown => Confidence::Low,
    }
}

/// Merge adjacent same-kind windows, snapping every kind-change boundary to
/// the first instruction start at or after the new window's beginning (or to
/// the raw window edge, when the new window decoded nothing to snap to). The
/// fixed-size window edges otherwise have no relationship to instruction
/// boundaries, so every kind change must realign before becoming a `Region`
/// edge — this is what keeps the "never splits an instruction" invariant.
fn coalesce(instructions: &BTreeMap<Address, Instruction>, windows: &[Window]) -> Vec<Region> {
    let mut regions: Vec<Region> = Vec::new();

    for window in windows {
        match regions.last_mut() {
            Some(prev) if prev.kind == window.kind => {
                prev.end = window.end;
            }
            _ => {
                let boundary = if regions.is_empty() {
                    window.start
                } else {
                    first_instruction_boundary(instructions, window.start, window.end)
                };
                if let Some(prev) = regions.last_mut() {
                    prev.end = boundary;
                }
                regions.push(Region::new(
                    window.kind,
                    boundary,
                    window.end,
                    window.confidence,
                    rationale(window.kind, window.decode_rate),
                ));
            }
        }
    }

    regions
}

fn rationale(kind: RegionKind, decode_rate: f64) -> String {
    format!("kind={kind} decode_rate={decode_rate:.2}")
}

/// The first instruction address within `[start, end)`, used as a boundary
/// that is guaranteed not to cut an instruction in half. Falls back to
/// `start` when no instruction begins in that span (nothing to align to, so
/// the raw window edge cannot be mid-instruction either).
fn first_instruction_boundary(
    instructions: &BTreeMap<Address, Instruction>,
    start: Address,
    end: Address,
) -> Address {
    instructions
        .range(start..end)
        .next()
        .map(|(addr, _)| *addr)
        .unwrap_or(start)
}

/// Find CODE sub-spans that look like constant pools (runs of 4-byte-aligned
/// words whose big-endian value looks like a plausible address into this
/// section) and split them out as DATA regions with rationale
/// `constant-pool`.
fn split_constant_pools(section: &Section, regions: Vec<Region>) -> Vec<Region> {
    let mut out = Vec::new();
    for region in regions {
        if region.kind != RegionKind::Code {
            out.push(region);
            continue;
        }
        let pools = find_constant_pools(section, &region);
        if pools.is_empty() {
            out.push(region);
            continue;
        }
        out.extend(split_region_around_pools(region, pools));
    }
    out
}

/// Scan `region` for runs of 4-byte-aligned words (relative to `region.start`)
/// that each look like a section-relative address, of total length at least
/// [`CONSTANT_POOL_MIN_BYTES`].
fn find_constant_pools(section: &Section, region: &Region) -> Vec<(Address, Address)> {
    let mut pools = Vec::new();
    let section_len = section.len() as u64;
    let mut run_start: Option<u64> = None;
    let region_start = region.start.value();
    let region_end = region.end.value();

    let mut offset = region_start;
    while offset + 4 <= region_end {
        let word = section
            .bytes_from(Address::new(offset))
            .and_then(|b| b.get(0..4))
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64);

        let looks_like_address = word.map(|v| v < section_len).unwrap_or(false);

        if looks_like_address {
            if run_start.is_none() {
                run_start = Some(offset);
            }
        } else if let Some(start) = run_start.take() {
            push_pool_if_long_enough(&mut pools, start, offset);
        }
        offset += 4;
    }
    if let Some(start) = run_start {
        push_pool_if_long_enough(&mut pools, start, offset);
    }

    pools
}

fn push_pool_if_long_enough(pools: &mut Vec<(Address, Address)>, start: u64, end: u64) {
    if end - start >= CONSTANT_POOL_MIN_BYTES {
        pools.push((Address::new(start), Address::new(end)));
    }
}

fn split_region_around_pools(region: Region, pools: Vec<(Address, Address)>) -> Vec<Region> {
    let mut out = Vec::new();
    let mut cursor = region.start;

    for (pool_start, pool_end) in pools {
        if cursor < pool_start {
            out.push(Region::new(
                region.kind,
                cursor,
                pool_start,
                region.confidence,
                region.rationale.clone(),
            ));
        }
        out.push(Region::new(
            RegionKind::Data,
            pool_start,
            pool_end,
            Confidence::Medium,
            "constant-pool",
        ));
        cursor = pool_end;
    }
    if cursor < region.end {
        out.push(Region::new(
            region.kind,
            cursor,
            region.end,
            region.confidence,
            region.rationale.clone(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_all;
    use crate::core::artifact::Artifact;

    fn classify_bytes(bytes: &[u8], config: &Configuration) -> Vec<Region> {
        let artifact = Artifact::ingest(bytes, "sample.bin");
        let outcome = decode_all(&artifact);
        let section = &artifact.sections[0];
        classify_section(section, &outcome.instructions, config)
    }

    #[test]
    fn fully_decodable_window_is_code() {
        let bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(32).flatten().collect();
        let regions = classify_bytes(&bytes, &Configuration::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Code);
        assert_eq!(regions[0].confidence, Confidence::High);
    }

    #[test]
    fn all_zero_window_is_data() {
        let bytes = vec![0u8; 64];
        let regions = classify_bytes(&bytes, &Configuration::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Data);
    }

    #[test]
    fn regions_tile_the_section_without_gap_or_overlap() {
        let mut bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(32).flatten().collect();
        bytes.extend(std::iter::repeat(0u8).take(64));
        let regions = classify_bytes(&bytes, &Configuration::default());
        assert_eq!(regions[0].start, Address::ZERO);
        for pair in regions.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(regions.last().unwrap().end, Address::new(bytes.len() as u64));
    }

    #[test]
    fn exact_threshold_boundary_prefers_prior_window_kind() {
        // Window 1 (bytes 0..4): all-unknown -> decode_rate 0.0 -> DATA.
        // Window 2 (bytes 4..8): one 2-byte LR plus 2 unknown bytes ->
        // decode_rate exactly 0.5, tied with code_threshold. Without the
        // tie-break this window would flip to CODE; with it, it stays DATA
        // like its predecessor and the two windows coalesce into one region.
        let bytes = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x18, 0x12, 0xFF, 0xFF];
        let config = Configuration {
            decode_window_size: 4,
            code_threshold: 0.5,
            data_threshold: 0.25,
            ..Configuration::default()
        };
        let regions = classify_bytes(&bytes, &config);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Data);
        assert_eq!(regions[0].start, Address::ZERO);
        assert_eq!(regions[0].end, Address::new(8));
    }

    #[test]
    fn mixed_code_then_data_yields_two_regions() {
        // 64 bytes of LR (fully decodable) then 64 bytes of zero.
        let mut bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(32).flatten().collect();
        bytes.extend(std::iter::repeat(0u8).take(64));
        let regions = classify_bytes(&bytes, &Configuration::default());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, RegionKind::Code);
        assert_eq!(regions[1].kind, RegionKind::Data);
    }
}
