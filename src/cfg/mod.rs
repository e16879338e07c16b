//! The CFG Builder: splits a CODE region's instruction stream into basic
//! blocks and resolves direct-branch/call edges between them.
//!
//! Leader identification and edge construction follow spec section 4.4
//! exactly; the one piece of bookkeeping this module owns beyond that is
//! synthesizing `external-ref` stub blocks for resolved targets that land
//! outside every CODE region, so an edge's target always resolves to some
//! block in the returned graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::address::Address;
use crate::core::basic_block::{BasicBlock, TerminatorKind};
use crate::core::control_flow_graph::ControlFlowGraph;
use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
use crate::core::edge::{Edge, EdgeKind};
use crate::core::instruction::{Category, Instruction};
use crate::core::region::{Confidence, Region, RegionKind};

/// One CODE region's recovered control-flow graph, plus any diagnostics
/// raised while resolving its edges (principally unresolved indirect
/// branches/calls).
pub struct CfgOutcome {
    pub cfg: ControlFlowGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a CFG covering every CODE region in `regions`, using `instructions`
/// (the full artifact's decoded instruction stream, keyed by address) to
/// resolve block contents and branch targets.
pub fn build_cfg(
    regions: &[Region],
    instructions: &BTreeMap<Address, Instruction>,
    entry_hints: &[Address],
) -> CfgOutcome {
    let mut diagnostics = Vec::new();
    let mut cfg = ControlFlowGraph::new();

    let code_regions: Vec<&Region> = regions.iter().filter(|r| r.kind == RegionKind::Code).collect();

    // Targets of resolved direct branches/calls anywhere in the artifact
    // that land inside some CODE region are leaders of that region's block
    // split, even when the branching instruction lives in a different
    // region — a cross-region target is still a real entry into straight
    // line code. Declared/injected entry points are folded in the same way:
    // a procedure entry must be a block leader even when nothing branches
    // to it from within the decoded stream.
    let global_targets: BTreeSet<Address> = instructions
        .values()
        .filter_map(|i| i.resolved_target)
        .filter(|t| in_any_code_region(*t, &code_regions) && instructions.contains_key(t))
        .chain(
            entry_hints
                .iter()
                .copied()
                .filter(|t| in_any_code_region(*t, &code_regions) && instructions.contains_key(t)),
        )
        .collect();

    for region in &code_regions {
        let region_instrs = instructions_in(instructions, region);
        if region_instrs.is_empty() {
            continue;
        }

        let leaders = find_leaders(&region_instrs, instructions, &global_targets);
        let blocks = split_blocks(&region_instrs, &leaders);

        for block in blocks {
            cfg.insert(block);
        }
    }

    // Second pass: now that every in-region block exists, wire edges and
    // materialize external-ref stubs for out-of-region targets.
    let leaders_snapshot: Vec<Address> = cfg.blocks().map(|b| b.leader).collect();
    for leader in leaders_snapshot {
        wire_block_edges(&mut cfg, leader, instructions, &mut diagnostics);
    }

    CfgOutcome { cfg, diagnostics }
}

fn instructions_in<'a>(
    instructions: &'a BTreeMap<Address, Instruction>,
    region: &Region,
) -> Vec<&'a Instruction> {
    instructions
        .range(region.start..region.end)
        .map(|(_, instr)| instr)
        .collect()
}

/// Identify leader addresses per spec section 4.4: region start, any
/// resolved direct-branch/call target landing inside this region (from
/// anywhere in the artifact, via `global_targets`), and whatever
/// immediately follows a branch/call/return within this region.
fn find_leaders(
    region_instrs: &[&Instruction],
    all_instructions: &BTreeMap<Address, Instruction>,
    global_targets: &BTreeSet<Address>,
) -> BTreeSet<Address> {
    let mut leaders = BTreeSet::new();
    leaders.insert(region_instrs[0].address);

    let region_start = region_instrs[0].address;
    let region_end = region_instrs.last().unwrap().end_address();
    for target in global_targets.range(region_start..region_end) {
        leaders.insert(*target);
    }

    for instr in region_instrs {
        if instr.is_terminator() {
            if let Some(next) = all_instructions.range(instr.end_address()..).next() {
                if *next.0 == instr.end_address() {
                    leaders.insert(instr.end_address());
                }
            }
        }
    }

    leaders
}

fn in_any_code_region(addr: Address, code_regions: &[&Region]) -> bool {
    code_regions.iter().any(|r| r.contains(addr))
}

/// Split `region_instrs` into basic blocks at `leaders`, each block running
/// from one leader up to (and including) the next terminator or the
/// instruction immediately before the next leader, whichever comes first.
fn split_blocks(region_instrs: &[&Instruction], leaders: &BTreeSet<Address>) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current_leader: Option<Address> = None;
    let mut current_addrs: Vec<Address> = Vec::new();

    for instr in region_instrs {
        if leaders.contains(&instr.address) && current_leader.is_some() {
            close_block(&mut blocks, &mut current_leader, &mut current_addrs);
        }
        if current_leader.is_none() {
            current_leader = Some(instr.address);
        }
        current_addrs.push(instr.address);

        if instr.is_terminator() {
            close_block(&mut blocks, &mut current_leader, &mut current_addrs);
        }
    }
    close_block(&mut blocks, &mut current_leader, &mut current_addrs);

    blocks
}

fn close_block(
    blocks: &mut Vec<BasicBlock>,
    current_leader: &mut Option<Address>,
    current_addrs: &mut Vec<Address>,
) {
    if let Some(leader) = current_leader.take() {
        if !current_addrs.is_empty() {
            let terminator_address = *current_addrs.last().unwrap();
            blocks.push(BasicBlock::new(
                leader,
                terminator_address,
                std::mem::take(current_addrs),
                TerminatorKind::Fallthrough, // placeholder; corrected by wire_block_edges
            ));
        }
    }
}

/// Attach outgoing edges for the block whose leader is `leader`, resolving
/// its terminator kind from the terminating instruction's category and
/// filling in target blocks (creating `external-ref` stubs as needed).
fn wire_block_edges(
    cfg: &mut ControlFlowGraph,
    leader: Address,
    instructions: &BTreeMap<Address, Instruction>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let terminator_addr = match cfg.get(leader) {
        Some(b) => b.terminator_address,
        None => return,
    };
    let terminator = match instructions.get(&terminator_addr) {
        Some(i) => i.clone(),
        None => return,
    };
    let fallthrough_addr = terminator.end_address();

    let (kind, edges) = match terminator.category {
        Category::Sequential | Category::Unknown => {
            let edge = fallthrough_edge(cfg, fallthrough_addr, EdgeKind::Fallthrough);
            (TerminatorKind::Fallthrough, vec![edge])
        }
        Category::UnconditionalBranch => {
            let target = terminator.resolved_target.expect("unconditional branch always resolves");
            (
                TerminatorKind::Unconditional,
                vec![Edge::new(EdgeKind::Unconditional, ensure_block(cfg, target))],
            )
        }
        Category::ConditionalBranch => {
            let target = terminator.resolved_target.expect("conditional branch always resolves");
            let taken = Edge::new(EdgeKind::BranchTaken, ensure_block(cfg, target));
            let not_taken = fallthrough_edge(cfg, fallthrough_addr, EdgeKind::BranchNotTaken);
            (TerminatorKind::Conditional, vec![taken, not_taken])
        }
        Category::Call => match terminator.resolved_target {
            Some(target) => {
                let call_edge = Edge::new(EdgeKind::Call, ensure_block(cfg, target));
                let fallthrough = fallthrough_edge(cfg, fallthrough_addr, EdgeKind::Fallthrough);
                (TerminatorKind::CallWithFallthrough, vec![call_edge, fallthrough])
            }
            None => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::BranchUnresolved,
                    terminator_addr,
                    Confidence::Low,
                    "indirect call target unknown",
                ));
                let fallthrough = fallthrough_edge(cfg, fallthrough_addr, EdgeKind::Fallthrough);
                (TerminatorKind::Indirect, vec![Edge::unresolved(), fallthrough])
            }
        },
        Category::Return => (TerminatorKind::Return, Vec::new()),
        Category::Indirect => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::BranchUnresolved,
                terminator_addr,
                Confidence::Low,
                "indirect branch target unknown",
            ));
            (TerminatorKind::Indirect, vec![Edge::unresolved()])
        }
    };

    if let Some(block) = cfg.get_mut(leader) {
        block.terminator_kind = kind;
        for edge in edges {
            block.add_edge(edge);
        }
    }
}

fn fallthrough_edge(cfg: &mut ControlFlowGraph, addr: Address, kind: EdgeKind) -> Edge {
    Edge::new(kind, ensure_block(cfg, addr))
}

/// Return `target`, guaranteeing a block (real or `external-ref` stub)
/// exists in `cfg` at that address, per spec section 4.4's cross-region
/// target rule.
fn ensure_block(cfg: &mut ControlFlowGraph, target: Address) -> Address {
    if !cfg.contains(target) {
        cfg.insert(BasicBlock::external_ref(target));
    }
    target
}
