//! The Procedure Inferencer: detects call/return linkage patterns, groups
//! basic blocks into procedures, and builds the call graph.
//!
//! Entry-point candidates are gathered in the priority order spec section
//! 4.5 lists (declared, call-target, prologue-pattern, region-start
//! fallback), deduplicated by address and processed in ascending address
//! order so body ownership is first-come-first-served as the spec requires.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::address::Address;
use crate::core::artifact::Artifact;
use crate::core::basic_block::TerminatorKind;
use crate::core::call_graph::{CallGraph, CallGraphEdge};
use crate::core::control_flow_graph::ControlFlowGraph;
use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
use crate::core::edge::EdgeKind;
use crate::core::instruction::Instruction;
use crate::core::procedure::{EntrySource, Linkage, Procedure};
use crate::core::region::{Confidence, Region, RegionKind};

pub struct ProcedureOutcome {
    pub procedures: Vec<Procedure>,
    pub call_graph: CallGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Infer procedures and the call graph from a built CFG.
pub fn infer_procedures(
    artifact: &Artifact,
    regions: &[Region],
    cfg: &ControlFlowGraph,
    instructions: &BTreeMap<Address, Instruction>,
) -> ProcedureOutcome {
    let mut diagnostics = Vec::new();
    let entries = collect_entry_candidates(artifact, regions, cfg, instructions);

    let mut procedures = Vec::new();
    let mut claimed: BTreeSet<Address> = BTreeSet::new();

    for (entry, source) in &entries {
        if claimed.contains(entry) || !cfg.contains(*entry) {
            continue;
        }
        let mut proc = Procedure::new(*entry, source.confidence(), source.reason());
        let body = walk_body(cfg, *entry, &claimed);
        for leader in &body {
            claimed.insert(*leader);
        }
        proc.block_leaders = body;
        proc.exits = exits_of(cfg, &proc.block_leaders);
        proc.linkage = classify_linkage(&proc, cfg, instructions);
        procedures.push(proc);
    }

    // Orphan synthesis: any block never claimed by a real procedure walk is
    // grouped by its owning CODE region into a `PROC_ORPHAN_<region-start>`
    // synthetic procedure, per the error-handling policy.
    attach_orphans(cfg, regions, &claimed, &mut procedures, &mut diagnostics);

    procedures.sort_by_key(|p| p.entry);

    let call_graph = build_call_graph(&procedures, cfg, instructions);

    ProcedureOutcome {
        procedures,
        call_graph,
        diagnostics,
    }
}

/// Gather entry-point candidates in spec section 4.5's priority order,
/// paired with the source that first produced each address (duplicates
/// from a lower-priority source are dropped once a higher-priority source
/// has already claimed the same address).
fn collect_entry_candidates(
    artifact: &Artifact,
    regions: &[Region],
    cfg: &ControlFlowGraph,
    instructions: &BTreeMap<Address, Instruction>,
) -> Vec<(Address, EntrySource)> {
    let mut seen: BTreeSet<Address> = BTreeSet::new();
    let mut out = Vec::new();

    let mut push = |addr: Address, source: EntrySource, seen: &mut BTreeSet<Address>| {
        if seen.insert(addr) {
            out.push((addr, source));
        }
    };

    // 1. Declared entry points.
    for &addr in &artifact.entry_points {
        if cfg.contains(addr) {
            push(addr, EntrySource::Declared, &mut seen);
        }
    }

    // 2. Targets of CALL edges in the CFG, in ascending block order.
    for block in cfg.blocks() {
        for edge in &block.successors {
            if edge.kind == EdgeKind::Call {
                if let Some(target) = edge.target {
                    push(target, EntrySource::CallTarget, &mut seen);
                }
            }
        }
    }

    // 3. Prologue-pattern matches: `STM R14,R12,12(R13)` at block start.
    for block in cfg.blocks() {
        if block.is_external_ref() {
            continue;
        }
        if matches_prologue(block.leader, instructions) {
            push(block.leader, EntrySource::ProloguePattern, &mut seen);
        }
    }

    // 4. Fallback: first leader of each CODE region.
    for region in regions.iter().filter(|r| r.kind == RegionKind::Code) {
        if let Some(block) = cfg.block_containing(region.start) {
            push(block.leader, EntrySource::RegionStartFallback, &mut seen);
        }
    }

    // Each address keeps whichever source claimed it first (the priority
    // order above), but the walk itself must proceed in ascending address
    // order so body ownership is first-come-first-served by address, not
    // by which priority tier happened to enumerate it first.
    out.sort_by_key(|(addr, _)| *addr);
    out
}

/// Whether the instruction at `leader` is `STM R14,R12,12(R13)`: opcode
/// 0x90 with R1=14, R3=12, base=13, displacement=12.
fn matches_prologue(leader: Address, instructions: &BTreeMap<Address, Instruction>) -> bool {
    use crate::core::instruction::Operand;
    let instr = match instructions.get(&leader) {
        Some(i) => i,
        None => return false,
    };
    if instr.mnemonic != "STM" {
        return false;
    }
    matches!(
        instr.operands.as_slice(),
        [Operand::Register(14), Operand::Register(12), Operand::BaseDisp { base: 13, disp: 12 }]
    )
}

/// Forward reachability walk over FALLTHROUGH/BRANCH_*/UNCONDITIONAL edges
/// starting at `entry`, stopping at RETURN terminators and at blocks already
/// claimed by an earlier entry. CALL edges never extend a procedure body.
fn walk_body(cfg: &ControlFlowGraph, entry: Address, claimed: &BTreeSet<Address>) -> Vec<Address> {
    let mut body = Vec::new();
    let mut visited: BTreeSet<Address> = BTreeSet::new();
    let mut stack = vec![entry];

    while let Some(addr) = stack.pop() {
        if claimed.contains(&addr) || !visited.insert(addr) {
            continue;
        }
        let block = match cfg.get(addr) {
            Some(b) => b,
            None => continue,
        };
        if block.is_external_ref() {
            continue;
        }
        body.push(addr);

        for edge in &block.successors {
            let follow = matches!(
                edge.kind,
                EdgeKind::Fallthrough
                    | EdgeKind::BranchTaken
                    | EdgeKind::BranchNotTaken
                    | EdgeKind::Unconditional
            );
            if follow {
                if let Some(target) = edge.target {
                    if !claimed.contains(&target) {
                        stack.push(target);
                    }
                }
            }
        }
    }

    body.sort();
    body
}

fn exits_of(cfg: &ControlFlowGraph, block_leaders: &[Address]) -> Vec<Address> {
    let mut exits: Vec<Address> = block_leaders
        .iter()
        .filter_map(|leader| cfg.get(*leader))
        .filter(|b| matches!(b.terminator_kind, TerminatorKind::Return))
        .map(|b| b.terminator_address)
        .collect();
    exits.sort();
    exits
}

/// Classify linkage per spec section 4.5: `standard` when both a
/// recognisable prologue and a `BR 14`/`BCR 15,14` epilogue are present;
/// `le-conformant` when the prologue additionally establishes a base
/// register via R12 (`LR 12,15` or `BALR 12,0`); `unknown` otherwise.
fn classify_linkage(
    proc: &Procedure,
    cfg: &ControlFlowGraph,
    instructions: &BTreeMap<Address, Instruction>,
) -> Linkage {
    let has_prologue = matches_prologue(proc.entry, instructions);
    let has_epilogue = proc
        .block_leaders
        .iter()
        .filter_map(|leader| cfg.get(*leader))
        .any(|b| b.terminator_kind == TerminatorKind::Return);

    if !has_prologue || !has_epilogue {
        return Linkage::Unknown;
    }

    if establishes_base_register_12(proc.entry, instructions) {
        Linkage::LeConformant
    } else {
        Linkage::Standard
    }
}

/// Whether the instruction following the prologue at `entry` establishes
/// R12 as a base register: `LR 12,15` or `BALR 12,0`.
fn establishes_base_register_12(entry: Address, instructions: &BTreeMap<Address, Instruction>) -> bool {
    use crate::core::instruction::Operand;
    let prologue = match instructions.get(&entry) {
        Some(i) => i,
        None => return false,
    };
    let next_addr = prologue.end_address();
    let next = match instructions.get(&next_addr) {
        Some(i) => i,
        None => return false,
    };
    match next.mnemonic.as_str() {
        "LR" => matches!(next.operands.as_slice(), [Operand::Register(12), Operand::Register(15)]),
        "BALR" => matches!(next.operands.as_slice(), [Operand::Register(12), Operand::Register(0)]),
        _ => false,
    }
}

/// Group every block no entry-point walk claimed into one orphan procedure
/// per owning CODE region, recording a `procedure-detection-miss`
/// diagnostic for each orphaned region.
fn attach_orphans(
    cfg: &ControlFlowGraph,
    regions: &[Region],
    claimed: &BTreeSet<Address>,
    procedures: &mut Vec<Procedure>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut by_region: BTreeMap<Address, Vec<Address>> = BTreeMap::new();

    for block in cfg.blocks() {
        if block.is_external_ref() || claimed.contains(&block.leader) {
            continue;
        }
        let region_start = regions
            .iter()
            .filter(|r| r.kind == RegionKind::Code && r.contains(block.leader))
            .map(|r| r.start)
            .next()
            .unwrap_or(block.leader);
        by_region.entry(region_start).or_default().push(block.leader);
    }

    for (region_start, leaders) in by_region {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::ProcedureDetectionMiss,
            region_start,
            Confidence::Low,
            "unclaimed blocks grouped into orphan procedure",
        ));
        let mut proc = Procedure::orphan(region_start);
        let mut leaders = leaders;
        leaders.sort();
        proc.exits = exits_of(cfg, &leaders);
        proc.block_leaders = leaders;
        procedures.push(proc);
    }
}

/// Emit one call-graph edge per CALL edge whose block lies in some
/// procedure, labeled by call-site address (the calling block's terminator
/// address) and the calling procedure's confidence.
fn build_call_graph(
    procedures: &[Procedure],
    cfg: &ControlFlowGraph,
    instructions: &BTreeMap<Address, Instruction>,
) -> CallGraph {
    let mut graph = CallGraph::new();
    let owner_of: BTreeMap<Address, &Procedure> = procedures
        .iter()
        .flat_map(|p| p.block_leaders.iter().map(move |l| (*l, p)))
        .collect();
    let proc_of_entry: BTreeMap<Address, &Procedure> =
        procedures.iter().map(|p| (p.entry, p)).collect();

    for block in cfg.blocks() {
        let caller = match owner_of.get(&block.leader) {
            Some(p) => p,
            None => continue,
        };
        for edge in &block.successors {
            if edge.kind != EdgeKind::Call {
                continue;
            }
            let call_site = block.terminator_address;
            let _ = instructions; // call-site address alone anchors the edge
            let callee = edge.target.and_then(|t| proc_of_entry.get(&t)).map(|p| p.id.clone());
            graph.add_edge(CallGraphEdge {
                caller: caller.id.clone(),
                callee,
                call_site,
                confidence: caller.confidence,
            });
        }
        // Indirect calls contribute a call-graph entry with target unresolved.
        if block
            .successors
            .iter()
            .any(|e| e.kind == EdgeKind::Unresolved)
            && matches!(block.terminator_kind, TerminatorKind::Indirect)
        {
            if let Some(instr) = instructions.get(&block.terminator_address) {
                if instr.category == crate::core::instruction::Category::Call {
                    graph.add_edge(CallGraphEdge {
                        caller: caller.id.clone(),
                        callee: None,
                        call_site: block.terminator_address,
                        confidence: Confidence::Low,
                    });
                }
            }
        }
    }

    graph
}
