use std::collections::HashMap;

use crate::state::{Condition, Operand};
use crate::value::VarId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl BlockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Opaque handle of the source construct an instruction or branch came from.
///
/// Hosts decide what an anchor denotes (a statement, a condition expression);
/// the interpreter only reports facts keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `target = value`.
    Assign { target: VarId, value: Operand },
    /// `target` receives an unknown value (call result, external write).
    Havoc(VarId),
    /// Paths where `condition` is false are dropped.
    Assume(Condition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Straight-line instructions; control flow lives in the `terminator`.
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump.
    Goto { target: BlockId },
    /// Conditional branch.
    If {
        condition: Condition,
        then_target: BlockId,
        else_target: BlockId,
        anchor: Option<AnchorId>,
    },
    Return,
    Exit,
}

/// Control flow of one analyzable code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlow {
    pub entry: BlockId,
    pub blocks: Vec<BasicBlock>,
    anchors: HashMap<AnchorId, BlockId>,
}

impl ControlFlow {
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Block where execution of the construct `anchor` begins, if the
    /// construct is part of this flow.
    #[must_use]
    pub fn start_block(&self, anchor: AnchorId) -> Option<BlockId> {
        self.anchors.get(&anchor).copied()
    }
}

#[derive(Debug, Default)]
pub struct ControlFlowBuilder {
    blocks: Vec<BasicBlock>,
    anchors: HashMap<AnchorId, BlockId>,
}

impl ControlFlowBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            instructions: Vec::new(),
            terminator: Terminator::Exit,
        });
        id
    }

    pub fn push(&mut self, bb: BlockId, instruction: Instruction) {
        self.blocks[bb.index()].instructions.push(instruction);
    }

    pub fn set_terminator(&mut self, bb: BlockId, term: Terminator) {
        self.blocks[bb.index()].terminator = term;
    }

    /// Records that the construct `anchor` starts at the beginning of `bb`.
    pub fn bind_anchor(&mut self, anchor: AnchorId, bb: BlockId) {
        self.anchors.insert(anchor, bb);
    }

    #[must_use]
    pub fn build(self, entry: BlockId) -> ControlFlow {
        ControlFlow {
            entry,
            blocks: self.blocks,
            anchors: self.anchors,
        }
    }
}
