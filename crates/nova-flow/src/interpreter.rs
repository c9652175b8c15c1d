use std::collections::VecDeque;

use crate::cfg::{AnchorId, BasicBlock, BlockId, ControlFlow, Instruction, Terminator};
use crate::dftype::DfType;
use crate::state::{MemoryState, Operand};
use crate::value::{ValueFactory, VarId};

pub const DEFAULT_MAX_STEPS: usize = 10_000;
const MAX_STATES_PER_BLOCK: usize = 64;

/// Receives facts discovered while interpreting.
///
/// Callbacks fire once per explored path, so implementations must merge
/// repeated reports for the same anchor.
pub trait DfaListener {
    fn on_condition(&mut self, _anchor: AnchorId, _then_feasible: bool, _else_feasible: bool) {}

    fn on_assignment(&mut self, _target: VarId, _value: &DfType) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerResult {
    /// Every path was explored.
    Ok,
    /// The step or state budget ran out.
    TooComplex,
    Cancelled,
    /// No path from the starting state is feasible.
    Aborted,
}

/// Worklist interpreter over a [`ControlFlow`].
pub struct DataFlowInterpreter<'a> {
    flow: &'a ControlFlow,
    factory: &'a ValueFactory,
    max_steps: usize,
}

impl<'a> DataFlowInterpreter<'a> {
    #[must_use]
    pub fn new(flow: &'a ControlFlow, factory: &'a ValueFactory) -> Self {
        Self {
            flow,
            factory,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Interprets the flow from the beginning of `start` in `state`.
    ///
    /// `is_cancelled` is polled before every step.
    pub fn interpret(
        &self,
        start: BlockId,
        state: MemoryState,
        listener: &mut dyn DfaListener,
        is_cancelled: &mut dyn FnMut() -> bool,
    ) -> RunnerResult {
        let mut queue = VecDeque::from([(start, state)]);
        let mut seen: Vec<Vec<MemoryState>> = vec![Vec::new(); self.flow.blocks.len()];
        let mut steps = 0usize;
        let mut completed = false;

        while let Some((bb, mut state)) = queue.pop_front() {
            if is_cancelled() {
                return RunnerResult::Cancelled;
            }
            steps += 1;
            if steps > self.max_steps {
                tracing::trace!(steps, "data-flow step budget exhausted");
                return RunnerResult::TooComplex;
            }

            let seen_here = &mut seen[bb.index()];
            if seen_here.contains(&state) {
                // Joined a path that was already explored from here.
                completed = true;
                continue;
            }
            if seen_here.len() >= MAX_STATES_PER_BLOCK {
                tracing::trace!(block = bb.index(), "too many distinct states");
                return RunnerResult::TooComplex;
            }
            seen_here.push(state.clone());

            let block = self.flow.block(bb);
            if !self.execute(block, &mut state, listener) {
                continue;
            }

            match &block.terminator {
                Terminator::Goto { target } => queue.push_back((*target, state)),
                Terminator::If {
                    condition,
                    then_target,
                    else_target,
                    anchor,
                } => {
                    let mut then_state = state.clone();
                    let then_feasible = then_state.apply_condition(self.factory, condition);
                    let mut else_state = state;
                    let else_feasible =
                        else_state.apply_condition(self.factory, &condition.negate());
                    if let Some(anchor) = anchor {
                        listener.on_condition(*anchor, then_feasible, else_feasible);
                    }
                    if then_feasible {
                        queue.push_back((*then_target, then_state));
                    }
                    if else_feasible {
                        queue.push_back((*else_target, else_state));
                    }
                }
                Terminator::Return | Terminator::Exit => completed = true,
            }
        }

        if completed {
            RunnerResult::Ok
        } else {
            RunnerResult::Aborted
        }
    }

    /// Runs the straight-line part of `block`; `false` when the path dies.
    fn execute(
        &self,
        block: &BasicBlock,
        state: &mut MemoryState,
        listener: &mut dyn DfaListener,
    ) -> bool {
        for instruction in &block.instructions {
            match instruction {
                Instruction::Assign { target, value } => {
                    if *value == Operand::Var(*target) {
                        continue;
                    }
                    state.flush_variable(self.factory, *target);
                    let feasible = match value {
                        Operand::Var(source) => state.assume_same(self.factory, *target, *source),
                        Operand::Const(ty) => state.meet_df_type(self.factory, *target, ty),
                    };
                    if !feasible {
                        return false;
                    }
                    listener.on_assignment(*target, &state.df_type(self.factory, *target));
                }
                Instruction::Havoc(target) => state.flush_variable(self.factory, *target),
                Instruction::Assume(condition) => {
                    if !state.apply_condition(self.factory, condition) {
                        return false;
                    }
                }
            }
        }
        true
    }
}
