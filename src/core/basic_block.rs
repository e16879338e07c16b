//! BasicBlock: a maximal straight-line instruction sequence.
//!
//! Following the teacher's arena-by-address idiom (`glaurung`'s
//! `BasicBlock` keys relationships by address/id rather than live
//! references, to avoid owning cycles), blocks are keyed by their leader
//! address and store only addresses for instructions and edge targets. The
//! owning `ControlFlowGraph` resolves those addresses through its own
//! ordered map.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::edge::Edge;

/// How a basic block's last instruction terminates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminatorKind {
    Fallthrough,
    Conditional,
    Unconditional,
    CallWithFallthrough,
    Return,
    Indirect,
    /// Not a real terminator: this marks a synthetic stub block created for
    /// a resolved branch/call target that falls outside every CODE region.
    /// Such a block has no instructions and no successors.
    ExternalRef,
}

/// A maximal straight-line instruction sequence within a CODE region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Address of the first instruction; unique identifier for this block.
    pub leader: Address,
    /// Address of the last (terminating) instruction.
    pub terminator_address: Address,
    /// Addresses of every instruction in the block, in order.
    pub instruction_addrs: Vec<Address>,
    /// Outgoing edges, always kept in [`crate::core::edge::EdgeKind::rank`] order.
    pub successors: Vec<Edge>,
    pub terminator_kind: TerminatorKind,
}

impl BasicBlock {
    pub fn new(
        leader: Address,
        terminator_address: Address,
        instruction_addrs: Vec<Address>,
        terminator_kind: TerminatorKind,
    ) -> Self {
        Self {
            leader,
            terminator_address,
            instruction_addrs,
            successors: Vec::new(),
            terminator_kind,
        }
    }

    /// Append an edge, keeping `successors` sorted by the fixed edge-kind
    /// order required for deterministic rendering.
    pub fn add_edge(&mut self, edge: Edge) {
        self.successors.push(edge);
        self.successors.sort_by_key(|e| e.kind.rank());
    }

    pub fn instruction_count(&self) -> usize {
        self.instruction_addrs.len()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.instruction_addrs.contains(&addr)
    }

    /// Construct a synthetic stub block for a resolved branch/call target
    /// that falls outside every CODE region.
    pub fn external_ref(target: Address) -> Self {
        Self {
            leader: target,
            terminator_address: target,
            instruction_addrs: Vec::new(),
            successors: Vec::new(),
            terminator_kind: TerminatorKind::ExternalRef,
        }
    }

    pub fn is_external_ref(&self) -> bool {
        matches!(self.terminator_kind, TerminatorKind::ExternalRef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::edge::EdgeKind;

    #[test]
    fn add_edge_keeps_fixed_order() {
        let mut b = BasicBlock::new(
            Address::new(0),
            Address::new(4),
            vec![Address::new(0)],
            TerminatorKind::Conditional,
        );
        b.add_edge(Edge::new(EdgeKind::BranchNotTaken, Address::new(8)));
        b.add_edge(Edge::new(EdgeKind::BranchTaken, Address::new(0x20)));
        assert_eq!(b.successors[0].kind, EdgeKind::BranchTaken);
        assert_eq!(b.successors[1].kind, EdgeKind::BranchNotTaken);
    }

    #[test]
    fn external_ref_has_no_instructions_or_successors() {
        let b = BasicBlock::external_ref(Address::new(0x9000));
        assert!(b.is_external_ref());
        assert!(b.instruction_addrs.is_empty());
        assert!(b.successors.is_empty());
    }
}
