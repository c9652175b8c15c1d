use std::collections::BTreeMap;
use std::fmt;

use nova_flow::{AnchorId, DfaListener};

/// Interpreter listener whose collected facts are handed to the debugger UI.
pub trait DebuggerDfaListener: DfaListener + Send {
    /// Facts worth rendering inline, ordered by anchor.
    fn hints(&self) -> Vec<DfaHint>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintKind {
    AlwaysTrue,
    AlwaysFalse,
}

impl fmt::Display for HintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlwaysTrue => "is always true",
            Self::AlwaysFalse => "is always false",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DfaHint {
    pub anchor: AnchorId,
    pub kind: HintKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    AlwaysTrue,
    AlwaysFalse,
    Unknown,
    /// Never evaluated on a feasible path.
    Unreachable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Reached {
    then_branch: bool,
    else_branch: bool,
}

/// Merges branch feasibility over every path that evaluated a condition.
#[derive(Debug, Clone, Default)]
pub struct ConstantConditionListener {
    conditions: BTreeMap<AnchorId, Reached>,
}

impl ConstantConditionListener {
    pub fn outcome(&self, anchor: AnchorId) -> Option<ConditionOutcome> {
        let reached = self.conditions.get(&anchor)?;
        Some(match (reached.then_branch, reached.else_branch) {
            (true, false) => ConditionOutcome::AlwaysTrue,
            (false, true) => ConditionOutcome::AlwaysFalse,
            (true, true) => ConditionOutcome::Unknown,
            (false, false) => ConditionOutcome::Unreachable,
        })
    }
}

impl DfaListener for ConstantConditionListener {
    fn on_condition(&mut self, anchor: AnchorId, then_feasible: bool, else_feasible: bool) {
        let reached = self.conditions.entry(anchor).or_default();
        reached.then_branch |= then_feasible;
        reached.else_branch |= else_feasible;
    }
}

impl DebuggerDfaListener for ConstantConditionListener {
    fn hints(&self) -> Vec<DfaHint> {
        self.conditions
            .keys()
            .filter_map(|anchor| {
                let kind = match self.outcome(*anchor)? {
                    ConditionOutcome::AlwaysTrue => HintKind::AlwaysTrue,
                    ConditionOutcome::AlwaysFalse => HintKind::AlwaysFalse,
                    ConditionOutcome::Unknown | ConditionOutcome::Unreachable => return None,
                };
                Some(DfaHint {
                    anchor: *anchor,
                    kind,
                })
            })
            .collect()
    }
}
