//! The Pseudocode Renderer: structural recovery over a procedure's CFG,
//! per spec section 4.7.
//!
//! Structure is recovered by iterative pattern matching rather than a
//! general decompiler's interval analysis: IF/ELSE from a conditional
//! block's two out-edges reconverging at a common successor, LOOP from a
//! back-edge discovered during a one-pass DFS over the procedure's own
//! blocks. Whatever a block's shape doesn't fit falls back to a labeled
//! `goto` carrying the reason, so every block still renders even when the
//! heuristics don't recognize it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::PseudocodeStyle;
use crate::core::address::Address;
use crate::core::basic_block::TerminatorKind;
use crate::core::control_flow_graph::ControlFlowGraph;
use crate::core::edge::EdgeKind;
use crate::core::evidence::EvidenceLink;
use crate::core::instruction::{Category, Instruction};
use crate::core::procedure::Procedure;
use crate::core::region::Confidence;
use crate::core::result::AnalysisResult;

const RECONVERGENCE_BOUND: usize = 512;

/// Render pseudocode for every procedure in `result`, in ascending entry
/// order (procedures are already kept sorted by entry elsewhere in the
/// pipeline, but this does not rely on that).
pub fn render_pseudocode(result: &AnalysisResult, style: PseudocodeStyle) -> String {
    let label_map = build_label_map(result);

    let mut procs: Vec<&Procedure> = result.procedures.iter().collect();
    procs.sort_by_key(|p| p.entry);

    let mut out = String::new();
    for proc in procs {
        out.push_str(&render_procedure(result, proc, &label_map, style));
        out.push('\n');
    }
    strip_trailing_whitespace(&out)
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
    labels
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    While,
    DoWhile,
}

#[derive(Clone)]
struct LoopCtx {
    header: Address,
    header_indent: usize,
    kind: LoopKind,
    outer: Option<Box<LoopCtx>>,
}

struct Ctx<'a> {
    cfg: &'a ControlFlowGraph,
    instructions: &'a BTreeMap<Address, Instruction>,
    labels: &'a BTreeMap<Address, String>,
    body: BTreeSet<Address>,
    style: PseudocodeStyle,
}

impl<'a> Ctx<'a> {
    fn label_for(&self, addr: Address) -> String {
        self.labels
            .get(&addr)
            .cloned()
            .unwrap_or_else(|| format!("0x{:08X}", addr.value()))
    }
}

fn render_procedure(
    result: &AnalysisResult,
    proc: &Procedure,
    labels: &BTreeMap<Address, String>,
    style: PseudocodeStyle,
) -> String {
    let body: BTreeSet<Address> = proc.block_leaders.iter().copied().collect();
    let ctx = Ctx {
        cfg: &result.cfg,
        instructions: &result.instructions,
        labels,
        body,
        style,
    };

    let last_exit = proc
        .exits
        .iter()
        .copied()
        .max()
        .unwrap_or(proc.entry);

    let mut s = String::new();
    s.push_str(&format!(
        "// {} [0x{:08x}-0x{:08x}] confidence={} linkage={}\n",
        proc.id,
        proc.entry.value(),
        last_exit.value(),
        proc.confidence,
        proc.linkage
    ));
    s.push_str(&func_header(style, proc));

    if proc.block_leaders.is_empty() {
        s.push_str(&indent_line(1, "// no recovered blocks"));
        s.push_str(&func_footer(style));
        return s;
    }

    let back_edges = detect_back_edges(&ctx, proc.entry);
    let mut path = Vec::new();
    let mut emitted = BTreeSet::new();
    s.push_str(&render_chain(
        &ctx,
        proc.entry,
        1,
        None,
        None,
        &back_edges,
        &mut path,
        &mut emitted,
    ));
    s.push_str(&func_footer(style));
    s
}

fn func_header(style: PseudocodeStyle, proc: &Procedure) -> String {
    match style {
        PseudocodeStyle::CLike => format!("void {}() {{\n", proc.id),
        PseudocodeStyle::PythonLike => format!("def {}():\n", proc.id),
    }
}

fn func_footer(style: PseudocodeStyle) -> String {
    match style {
        PseudocodeStyle::CLike => "}\n".to_string(),
        PseudocodeStyle::PythonLike => String::new(),
    }
}

fn indent_line(indent: usize, text: impl AsRef<str>) -> String {
    format!("{}{}\n", "    ".repeat(indent), text.as_ref())
}

fn evidence(instr: &Instruction) -> String {
    let link = EvidenceLink::for_instruction(instr, Confidence::High, "decoded");
    format!("// {}", link.trailing_comment())
}

/// Render `addr`'s straight-line chain: its own instructions, its
/// terminator's structural recovery, and (unless stopped) everything that
/// follows. Returns immediately without descending when `addr == stop`, or
/// when `addr` closes the loop named by `loop_ctx`.
fn render_chain(
    ctx: &Ctx,
    addr: Address,
    indent: usize,
    stop: Option<Address>,
    loop_ctx: Option<LoopCtx>,
    back_edges: &BTreeMap<Address, Address>,
    path: &mut Vec<Address>,
    emitted: &mut BTreeSet<Address>,
) -> String {
    if Some(addr) == stop {
        return String::new();
    }
    if let Some(lc) = &loop_ctx {
        if addr == lc.header && lc.kind == LoopKind::While {
            return String::new();
        }
    }
    if !ctx.body.contains(&addr) {
        return indent_line(
            indent,
            format!("goto {};  // target outside procedure", ctx.label_for(addr)),
        );
    }
    if path.contains(&addr) {
        return indent_line(
            indent,
            format!("goto {};  // reason=unrecovered-loop-shape", ctx.label_for(addr)),
        );
    }
    if emitted.contains(&addr) {
        return indent_line(
            indent,
            format!("goto {};  // merge point already rendered", ctx.label_for(addr)),
        );
    }

    emitted.insert(addr);
    path.push(addr);

    let is_while_header = back_edges.values().any(|h| *h == addr)
        && ctx.cfg.get(addr).map(|b| b.terminator_kind) == Some(TerminatorKind::Conditional);
    let is_do_while_header = back_edges.values().any(|h| *h == addr) && !is_while_header;

    let result = if is_do_while_header {
        let new_ctx = LoopCtx {
            header: addr,
            header_indent: indent,
            kind: LoopKind::DoWhile,
            outer: loop_ctx.clone().map(Box::new),
        };
        let body = dispatch_terminator(ctx, addr, indent + 1, None, Some(new_ctx), back_edges, path, emitted);
        format!("{}{}", indent_line(indent, "do {"), body)
    } else {
        dispatch_terminator(ctx, addr, indent, stop, loop_ctx, back_edges, path, emitted)
    };

    path.pop();
    result
}

/// Emit `addr`'s own non-terminator instructions plus the structural
/// recovery for its terminator. Split out of [`render_chain`] so a
/// do-while header can be opened (`do {`) without re-running the
/// leader/merge guards in that function.
fn dispatch_terminator(
    ctx: &Ctx,
    addr: Address,
    indent: usize,
    stop: Option<Address>,
    loop_ctx: Option<LoopCtx>,
    back_edges: &BTreeMap<Address, Address>,
    path: &mut Vec<Address>,
    emitted: &mut BTreeSet<Address>,
) -> String {
    let block = match ctx.cfg.get(addr) {
        Some(b) => b,
        None => return indent_line(indent, format!("goto {};  // missing block", ctx.label_for(addr))),
    };

    let mut s = String::new();
    for ia in &block.instruction_addrs {
        if *ia == block.terminator_address {
            break;
        }
        if let Some(instr) = ctx.instructions.get(ia) {
            s.push_str(&indent_line(indent, format!("{};  {}", instr, evidence(instr))));
        }
    }

    let terminator = match ctx.instructions.get(&block.terminator_address) {
        Some(i) => i,
        None => return s,
    };

    match block.terminator_kind {
        TerminatorKind::Return => {
            s.push_str(&indent_line(indent, format!("return;  {}", evidence(terminator))));
        }
        TerminatorKind::Fallthrough => {
            if let Some(target) = single_target(block) {
                s.push_str(&render_chain(
                    ctx, target, indent, stop, loop_ctx, back_edges, path, emitted,
                ));
            }
        }
        TerminatorKind::Unconditional => {
            if let Some(target) = single_target(block) {
                s.push_str(&render_chain(
                    ctx, target, indent, stop, loop_ctx, back_edges, path, emitted,
                ));
            }
        }
        TerminatorKind::CallWithFallthrough => {
            let callee = terminator
                .resolved_target
                .map(|t| ctx.label_for(t))
                .unwrap_or_else(|| "UNRESOLVED_TARGET".to_string());
            s.push_str(&indent_line(
                indent,
                format!("call {}();  {}", callee, evidence(terminator)),
            ));
            let fallthrough = block
                .successors
                .iter()
                .find(|e| e.kind == EdgeKind::Fallthrough)
                .and_then(|e| e.target);
            if let Some(target) = fallthrough {
                s.push_str(&render_chain(
                    ctx, target, indent, stop, loop_ctx, back_edges, path, emitted,
                ));
            }
        }
        TerminatorKind::Indirect => {
            if terminator.category == Category::Call {
                s.push_str(&indent_line(
                    indent,
                    format!("call UNRESOLVED_TARGET();  {}", evidence(terminator)),
                ));
                let fallthrough = block
                    .successors
                    .iter()
                    .find(|e| e.kind == EdgeKind::Fallthrough)
                    .and_then(|e| e.target);
                if let Some(target) = fallthrough {
                    s.push_str(&render_chain(
                        ctx, target, indent, stop, loop_ctx, back_edges, path, emitted,
                    ));
                }
            } else {
                s.push_str(&indent_line(
                    indent,
                    format!(
                        "goto UNRESOLVED_TARGET;  {} reason=indirect-branch-unresolved",
                        evidence(terminator)
                    ),
                ));
            }
        }
        TerminatorKind::Conditional => {
            s.push_str(&render_conditional(
                ctx, addr, block.terminator_address, indent, stop, loop_ctx, back_edges, path, emitted,
            ));
        }
        TerminatorKind::ExternalRef => {}
    }

    s
}

fn single_target(block: &crate::core::basic_block::BasicBlock) -> Option<Address> {
    block.successors.first().and_then(|e| e.target)
}

fn cond_text(instr: &Instruction) -> String {
    instr.to_string()
}

fn render_conditional(
    ctx: &Ctx,
    addr: Address,
    terminator_addr: Address,
    indent: usize,
    stop: Option<Address>,
    loop_ctx: Option<LoopCtx>,
    back_edges: &BTreeMap<Address, Address>,
    path: &mut Vec<Address>,
    emitted: &mut BTreeSet<Address>,
) -> String {
    let block = ctx.cfg.get(addr).unwrap();
    let terminator = ctx.instructions.get(&terminator_addr).unwrap();
    let cond = cond_text(terminator);

    let taken = block
        .successors
        .iter()
        .find(|e| e.kind == EdgeKind::BranchTaken)
        .and_then(|e| e.target);
    let not_taken = block
        .successors
        .iter()
        .find(|e| e.kind == EdgeKind::BranchNotTaken)
        .and_then(|e| e.target);
    let (taken, not_taken) = match (taken, not_taken) {
        (Some(t), Some(n)) => (t, n),
        _ => {
            return indent_line(
                indent,
                format!("if ({}) {{ /* unresolved edges */ }}  {}", cond, evidence(terminator)),
            );
        }
    };

    // Do-while closure: one of our edges targets the loop this conditional
    // is the tail of.
    if let Some(lc) = &loop_ctx {
        if lc.kind == LoopKind::DoWhile && (taken == lc.header || not_taken == lc.header) {
            let exit = if taken == lc.header { not_taken } else { taken };
            let mut s = indent_line(lc.header_indent, format!("}} while ({});", cond));
            let outer = lc.outer.as_deref().cloned();
            s.push_str(&render_chain(
                ctx,
                exit,
                lc.header_indent,
                stop,
                outer,
                back_edges,
                path,
                emitted,
            ));
            return s;
        }
    }

    // While loop: this conditional is itself a recognized back-edge target,
    // and one of its own edges leads back into the loop body.
    if back_edges.values().any(|h| *h == addr) {
        let into_loop = reaches_back_to(ctx, taken, addr).then_some(taken).or_else(|| {
            reaches_back_to(ctx, not_taken, addr).then_some(not_taken)
        });
        if let Some(into_loop) = into_loop {
            let exit = if into_loop == taken { not_taken } else { taken };
            let mut s = indent_line(indent, format!("while ({}) {{", cond));
            let new_ctx = LoopCtx {
                header: addr,
                header_indent: indent,
                kind: LoopKind::While,
                outer: loop_ctx.clone().map(Box::new),
            };
            s.push_str(&render_chain(
                ctx,
                into_loop,
                indent + 1,
                None,
                Some(new_ctx),
                back_edges,
                path,
                emitted,
            ));
            s.push_str(&indent_line(indent, "}"));
            s.push_str(&render_chain(
                ctx, exit, indent, stop, loop_ctx, back_edges, path, emitted,
            ));
            return s;
        }
    }

    // IF/ELSE via bounded reconvergence search.
    match find_merge(ctx, taken, not_taken) {
        Some(merge) => {
            let mut s = indent_line(indent, format!("if ({}) {{", cond));
            s.push_str(&render_chain(
                ctx,
                taken,
                indent + 1,
                Some(merge),
                loop_ctx.clone(),
                back_edges,
                path,
                emitted,
            ));
            s.push_str(&indent_line(indent, "} else {"));
            s.push_str(&render_chain(
                ctx,
                not_taken,
                indent + 1,
                Some(merge),
                loop_ctx.clone(),
                back_edges,
                path,
                emitted,
            ));
            s.push_str(&indent_line(indent, "}"));
            s.push_str(&render_chain(
                ctx, merge, indent, stop, loop_ctx, back_edges, path, emitted,
            ));
            s
        }
        None => {
            let mut s = indent_line(
                indent,
                format!(
                    "if ({}) goto {};  // reason=unrecovered-if-shape (no common reconvergence point)",
                    cond,
                    ctx.label_for(taken)
                ),
            );
            s.push_str(&indent_line(
                indent,
                format!("goto {};  // not-taken path", ctx.label_for(not_taken)),
            ));
            s
        }
    }
}

/// Addresses reachable from `start` by following only structural
/// (non-call) edges, bounded to keep the search finite and deterministic.
fn reachable_set(ctx: &Ctx, start: Address) -> BTreeSet<Address> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(a) = queue.pop_front() {
        if seen.contains(&a) || seen.len() >= RECONVERGENCE_BOUND {
            continue;
        }
        if !ctx.body.contains(&a) {
            continue;
        }
        seen.insert(a);
        if let Some(block) = ctx.cfg.get(a) {
            if block.terminator_kind == TerminatorKind::Return {
                continue;
            }
            for edge in &block.successors {
                if matches!(
                    edge.kind,
                    EdgeKind::Fallthrough | EdgeKind::BranchTaken | EdgeKind::BranchNotTaken | EdgeKind::Unconditional
                ) {
                    if let Some(t) = edge.target {
                        queue.push_back(t);
                    }
                }
            }
        }
    }
    seen
}

fn reaches_back_to(ctx: &Ctx, start: Address, header: Address) -> bool {
    reachable_set(ctx, start).contains(&header)
}

fn find_merge(ctx: &Ctx, from_a: Address, from_b: Address) -> Option<Address> {
    let set_a = reachable_set(ctx, from_a);
    let set_b = reachable_set(ctx, from_b);
    set_a.intersection(&set_b).min().copied()
}

/// One DFS pass over the procedure's structural edges, from `entry`,
/// recording every edge whose target is still on the current path as a
/// back edge (tail -> header).
fn detect_back_edges(ctx: &Ctx, entry: Address) -> BTreeMap<Address, Address> {
    let mut back_edges = BTreeMap::new();
    let mut visited = BTreeSet::new();
    let mut on_stack = BTreeSet::new();
    visit_for_back_edges(ctx, entry, &mut visited, &mut on_stack, &mut back_edges);
    back_edges
}

fn visit_for_back_edges(
    ctx: &Ctx,
    addr: Address,
    visited: &mut BTreeSet<Address>,
    on_stack: &mut BTreeSet<Address>,
    back_edges: &mut BTreeMap<Address, Address>,
) {
    if !ctx.body.contains(&addr) || visited.contains(&addr) {
        return;
    }
    visited.insert(addr);
    on_stack.insert(addr);

    if let Some(block) = ctx.cfg.get(addr) {
        for edge in &block.successors {
            if !matches!(
                edge.kind,
                EdgeKind::Fallthrough | EdgeKind::BranchTaken | EdgeKind::BranchNotTaken | EdgeKind::Unconditional
            ) {
                continue;
            }
            let Some(target) = edge.target else { continue };
            if !ctx.body.contains(&target) {
                continue;
            }
            if on_stack.contains(&target) {
                back_edges.entry(addr).or_insert(target);
            } else if !visited.contains(&target) {
                visit_for_back_edges(ctx, target, visited, on_stack, back_edges);
            }
        }
    }

    on_stack.remove(&addr);
}

fn strip_trailing_whitespace(text: &str) -> String {
    text.lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}
