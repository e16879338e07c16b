//! Integration coverage for the region-tiling invariant: regions must be
//! non-overlapping, contiguous, and cover exactly the section byte space.

use zarch_recon::classify::classify_section;
use zarch_recon::config::Configuration;
use zarch_recon::core::address::Address;
use zarch_recon::core::artifact::Artifact;
use zarch_recon::core::region::RegionKind;
use zarch_recon::decode::decode_all;

fn classify(bytes: &[u8]) -> Vec<zarch_recon::core::region::Region> {
    let artifact = Artifact::ingest(bytes, "sample.bin");
    let decoded = decode_all(&artifact);
    let config = Configuration::default();
    let section = &artifact.sections[0];
    classify_section(section, &decoded.instructions, &config)
}

fn assert_tiles(bytes: &[u8], regions: &[zarch_recon::core::region::Region]) {
    assert_eq!(regions[0].start, Address::ZERO);
    for pair in regions.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "regions must be contiguous");
    }
    assert_eq!(regions.last().unwrap().end, Address::new(bytes.len() as u64));
}

#[test]
fn mixed_code_then_data_tiles_the_section() {
    // S5: 64 bytes of valid instructions, then 64 bytes of zero.
    let mut bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(32).flatten().collect();
    bytes.extend(std::iter::repeat(0u8).take(64));
    let regions = classify(&bytes);
    assert_tiles(&bytes, &regions);
    assert_eq!(regions[0].kind, RegionKind::Code);
    assert!(regions.iter().skip(1).any(|r| r.kind != RegionKind::Code));
}

#[test]
fn all_decodable_stream_is_one_code_region() {
    let bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(16).flatten().collect();
    let regions = classify(&bytes);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].kind, RegionKind::Code);
    assert_tiles(&bytes, &regions);
}

#[test]
fn region_boundaries_never_split_an_instruction() {
    let mut bytes: Vec<u8> = std::iter::repeat([0x18u8, 0x12]).take(40).flatten().collect();
    bytes.extend(std::iter::repeat(0u8).take(40));
    let artifact = Artifact::ingest(&bytes, "sample.bin");
    let decoded = decode_all(&artifact);
    let regions = classify(&bytes);
    for region in &regions {
        for (addr, instr) in decoded.instructions.range(..region.end) {
            if *addr < region.start {
                continue;
            }
            assert!(
                instr.end_address() <= region.end || *addr >= region.end,
                "instruction at {addr} straddles region boundary {}",
                region.end
            );
        }
    }
}
