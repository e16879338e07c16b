//! ControlFlowGraph: the set of basic blocks recovered from one CODE
//! region, keyed by leader address.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::basic_block::BasicBlock;

/// Blocks keyed and iterated by ascending leader address — a `BTreeMap`
/// gives the determinism invariant (ascending-address iteration) for free,
/// generalizing the teacher's "arena + ordered id list" idiom without a
/// parallel `Vec<Address>` to keep in sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    blocks: BTreeMap<Address, BasicBlock>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: BasicBlock) {
        self.blocks.insert(block.leader, block);
    }

    pub fn get(&self, leader: Address) -> Option<&BasicBlock> {
        self.blocks.get(&leader)
    }

    pub fn get_mut(&mut self, leader: Address) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&leader)
    }

    pub fn contains(&self, leader: Address) -> bool {
        self.blocks.contains_key(&leader)
    }

    /// Blocks in ascending leader-address order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block, if any, whose instruction range contains `addr`.
    pub fn block_containing(&self, addr: Address) -> Option<&BasicBlock> {
        self.blocks
            .range(..=addr)
            .next_back()
            .map(|(_, b)| b)
            .filter(|b| b.contains(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::basic_block::TerminatorKind;

    fn block(leader: u64, term: u64) -> BasicBlock {
        BasicBlock::new(
            Address::new(leader),
            Address::new(term),
            vec![Address::new(leader)],
            TerminatorKind::Fallthrough,
        )
    }

    #[test]
    fn blocks_iterate_in_ascending_order() {
        let mut cfg = ControlFlowGraph::new();
        cfg.insert(block(0x20, 0x20));
        cfg.insert(block(0x0, 0x0));
        cfg.insert(block(0x10, 0x10));
        let leaders: Vec<u64> = cfg.blocks().map(|b| b.leader.value()).collect();
        assert_eq!(leaders, vec![0x0, 0x10, 0x20]);
    }

    #[test]
    fn block_containing_finds_owning_block() {
        let mut cfg = ControlFlowGraph::new();
        let mut b = block(0x0, 0x4);
        b.instruction_addrs = vec![Address::new(0x0), Address::new(0x2), Address::new(0x4)];
        cfg.insert(b);
        assert_eq!(
            cfg.block_containing(Address::new(0x2)).unwrap().leader,
            Address::new(0x0)
        );
        assert!(cfg.block_containing(Address::new(0x100)).is_none());
    }
}
