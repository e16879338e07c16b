//! Edge: a directed relation between two basic blocks.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;

/// The type of a directed control-flow edge.
///
/// Variants are declared in the fixed emission order the CFG builder must
/// use when listing a block's outgoing edges (spec section on determinism):
/// TAKEN, NOT_TAKEN, FALLTHROUGH, UNCONDITIONAL, CALL, UNRESOLVED, RETURN.
/// `rank()` returns that order as an integer so callers can sort by it
/// instead of re-deriving the order ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    BranchTaken,
    BranchNotTaken,
    Fallthrough,
    Unconditional,
    Call,
    Unresolved,
    /// Retained for data-model completeness (a return conceptually
    /// "targets" the caller) even though the CFG builder never attaches an
    /// outgoing edge of this kind to a block — a return terminator has no
    /// out-edge at all, per the CFG builder's edge-construction rules.
    Return,
}

impl EdgeKind {
    pub fn rank(&self) -> u8 {
        match self {
            EdgeKind::BranchTaken => 0,
            EdgeKind::BranchNotTaken => 1,
            EdgeKind::Fallthrough => 2,
            EdgeKind::Unconditional => 3,
            EdgeKind::Call => 4,
            EdgeKind::Unresolved => 5,
            EdgeKind::Return => 6,
        }
    }
}

/// A directed edge from one basic block (implicit: the owning block) to
/// another, identified by the target block's leader address. `target` is
/// `None` exactly when `kind == EdgeKind::Unresolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub target: Option<Address>,
}

impl Edge {
    pub fn new(kind: EdgeKind, target: Address) -> Self {
        debug_assert!(kind != EdgeKind::Unresolved, "use Edge::unresolved");
        Self {
            kind,
            target: Some(target),
        }
    }

    pub fn unresolved() -> Self {
        Self {
            kind: EdgeKind::Unresolved,
            target: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_matches_fixed_order() {
        let mut kinds = [
            EdgeKind::Return,
            EdgeKind::Unresolved,
            EdgeKind::Call,
            EdgeKind::BranchTaken,
            EdgeKind::Unconditional,
            EdgeKind::BranchNotTaken,
            EdgeKind::Fallthrough,
        ];
        kinds.sort_by_key(|k| k.rank());
        assert_eq!(
            kinds,
            [
                EdgeKind::BranchTaken,
                EdgeKind::BranchNotTaken,
                EdgeKind::Fallthrough,
                EdgeKind::Unconditional,
                EdgeKind::Call,
                EdgeKind::Unresolved,
                EdgeKind::Return,
            ]
        );
    }

    #[test]
    fn unresolved_has_no_target() {
        assert_eq!(Edge::unresolved().target, None);
    }
}
