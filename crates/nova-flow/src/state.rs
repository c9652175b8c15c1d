use std::collections::{BTreeMap, BTreeSet};

use crate::dftype::{DfType, Nullability, PrimitiveValue};
use crate::types::{PrimitiveKind, TypeConstraint};
use crate::value::{ValueFactory, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    Eq,
    Ne,
}

impl RelationType {
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Var(VarId),
    Const(DfType),
}

impl From<VarId> for Operand {
    fn from(var: VarId) -> Self {
        Self::Var(var)
    }
}

impl From<DfType> for Operand {
    fn from(ty: DfType) -> Self {
        Self::Const(ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub left: VarId,
    pub relation: RelationType,
    pub right: Operand,
}

impl Condition {
    pub fn equal(left: VarId, right: impl Into<Operand>) -> Self {
        Self {
            left,
            relation: RelationType::Eq,
            right: right.into(),
        }
    }

    pub fn not_equal(left: VarId, right: impl Into<Operand>) -> Self {
        Self {
            left,
            relation: RelationType::Ne,
            right: right.into(),
        }
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            left: self.left,
            relation: self.relation.negated(),
            right: self.right.clone(),
        }
    }
}

/// Constraint store of one interpreter path.
///
/// Variables known to be equal share an equivalence class (union-find over
/// `parent`). Type facts, excluded constants and inequalities are keyed by
/// class roots only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    parent: BTreeMap<VarId, VarId>,
    facts: BTreeMap<VarId, DfType>,
    distinct: BTreeSet<(VarId, VarId)>,
    excluded: BTreeMap<VarId, Vec<DfType>>,
}

fn ordered(a: VarId, b: VarId) -> (VarId, VarId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl MemoryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn root(&self, var: VarId) -> VarId {
        let mut current = var;
        while let Some(parent) = self.parent.get(&current) {
            current = *parent;
        }
        current
    }

    #[must_use]
    pub fn are_equal(&self, a: VarId, b: VarId) -> bool {
        self.root(a) == self.root(b)
    }

    #[must_use]
    pub fn are_distinct(&self, a: VarId, b: VarId) -> bool {
        self.distinct
            .contains(&ordered(self.root(a), self.root(b)))
    }

    /// Current knowledge about `var`: its declared type met with every fact
    /// asserted on its equivalence class.
    #[must_use]
    pub fn df_type(&self, factory: &ValueFactory, var: VarId) -> DfType {
        self.class_type(factory, self.root(var))
    }

    fn class_type(&self, factory: &ValueFactory, root: VarId) -> DfType {
        self.facts
            .get(&root)
            .cloned()
            .unwrap_or_else(|| factory.data(root).df_type.clone())
    }

    fn is_excluded(&self, root: VarId, ty: &DfType) -> bool {
        ty.is_constant()
            && self
                .excluded
                .get(&root)
                .is_some_and(|excluded| excluded.contains(ty))
    }

    /// Pairs of class roots known to hold different values.
    pub fn distinct_pairs(&self) -> impl Iterator<Item = (VarId, VarId)> + '_ {
        self.distinct.iter().copied()
    }

    /// Narrows `var` to `ty`. Returns `false` if the state becomes contradictory.
    pub fn meet_df_type(&mut self, factory: &ValueFactory, var: VarId, ty: &DfType) -> bool {
        let root = self.root(var);
        let met = self.class_type(factory, root).meet(ty, factory.table());
        if met.is_bottom() || self.is_excluded(root, &met) {
            return false;
        }
        self.facts.insert(root, met);
        true
    }

    /// Applies `condition`. Returns `false` if it contradicts the state, in
    /// which case the state must be discarded.
    pub fn apply_condition(&mut self, factory: &ValueFactory, condition: &Condition) -> bool {
        if self.df_type(factory, condition.left).is_floating() {
            return self.apply_floating_condition(factory, condition);
        }
        match (condition.relation, &condition.right) {
            (RelationType::Eq, Operand::Var(right)) => self.unite(factory, condition.left, *right),
            (RelationType::Eq, Operand::Const(ty)) => {
                self.meet_df_type(factory, condition.left, ty)
            }
            (RelationType::Ne, Operand::Var(right)) => {
                self.separate(factory, condition.left, *right)
            }
            (RelationType::Ne, Operand::Const(ty)) => {
                self.exclude_constant(factory, condition.left, ty)
            }
        }
    }

    /// Records that `a` and `b` hold the very same value (aliasing or a copy),
    /// as opposed to comparing equal under `==`.
    pub fn assume_same(&mut self, factory: &ValueFactory, a: VarId, b: VarId) -> bool {
        self.unite(factory, a, b)
    }

    /// `==` on `float`/`double` is numeric: `-0.0 == 0.0`, and `NaN` equals
    /// nothing, itself included. Bit-level facts therefore only decide a
    /// comparison when both sides are known constants.
    fn apply_floating_condition(&mut self, factory: &ValueFactory, condition: &Condition) -> bool {
        let left = self.df_type(factory, condition.left).floating_constant();
        let (right, right_type) = match &condition.right {
            Operand::Var(var) => (self.df_type(factory, *var).floating_constant(), None),
            Operand::Const(ty) => (ty.floating_constant(), Some(ty)),
        };
        if let (Some(l), Some(r)) = (left, right) {
            return (l == r) == (condition.relation == RelationType::Eq);
        }
        if left.or(right).is_some_and(f64::is_nan) {
            return condition.relation == RelationType::Ne;
        }
        // Comparing against a non-zero constant pins (or rules out) its bits;
        // a zero stands for both signed zeros.
        let Some(ty) = right_type.filter(|_| right.is_some_and(|r| r != 0.0)) else {
            return true;
        };
        match condition.relation {
            RelationType::Eq => self.meet_df_type(factory, condition.left, ty),
            RelationType::Ne => self.exclude_constant(factory, condition.left, ty),
        }
    }

    fn unite(&mut self, factory: &ValueFactory, a: VarId, b: VarId) -> bool {
        let (ra, rb) = (self.root(a), self.root(b));
        if ra == rb {
            return true;
        }
        if self.distinct.contains(&ordered(ra, rb)) {
            return false;
        }
        let met = self
            .class_type(factory, ra)
            .meet(&self.class_type(factory, rb), factory.table());
        if met.is_bottom() || self.is_excluded(ra, &met) || self.is_excluded(rb, &met) {
            return false;
        }

        self.parent.insert(rb, ra);
        self.facts.remove(&rb);
        self.facts.insert(ra, met);
        if let Some(moved) = self.excluded.remove(&rb) {
            let target = self.excluded.entry(ra).or_default();
            for ty in moved {
                if !target.contains(&ty) {
                    target.push(ty);
                }
            }
        }
        self.rename_distinct(rb, ra);
        true
    }

    fn separate(&mut self, factory: &ValueFactory, a: VarId, b: VarId) -> bool {
        let (ra, rb) = (self.root(a), self.root(b));
        if ra == rb {
            return false;
        }
        let (ta, tb) = (self.class_type(factory, ra), self.class_type(factory, rb));
        if ta.is_identity_constant() && ta == tb {
            return false;
        }
        self.distinct.insert(ordered(ra, rb));
        true
    }

    fn exclude_constant(&mut self, factory: &ValueFactory, var: VarId, ty: &DfType) -> bool {
        let root = self.root(var);
        let current = self.class_type(factory, root);
        if current.is_constant() && current == *ty {
            return false;
        }
        match ty {
            DfType::Primitive {
                kind: PrimitiveKind::Boolean,
                value: Some(PrimitiveValue::Boolean(value)),
            } => self.meet_df_type(factory, var, &DfType::boolean(!value)),
            DfType::Reference(r) if r.nullability == Nullability::Null => {
                self.meet_df_type(factory, var, &DfType::not_null(TypeConstraint::Top))
            }
            ty if ty.is_constant() => {
                let excluded = self.excluded.entry(root).or_default();
                if !excluded.contains(ty) {
                    excluded.push(ty.clone());
                }
                true
            }
            _ => true,
        }
    }

    fn rename_distinct(&mut self, from: VarId, to: VarId) {
        let renamed: Vec<_> = self
            .distinct
            .iter()
            .filter(|(a, b)| *a == from || *b == from)
            .copied()
            .collect();
        for pair in renamed {
            self.distinct.remove(&pair);
            let other = if pair.0 == from { pair.1 } else { pair.0 };
            self.distinct.insert(ordered(to, other));
        }
    }

    /// Forgets everything known about `var` (and variables qualified by it),
    /// e.g. because it was reassigned. Facts of the other class members survive.
    pub fn flush_variable(&mut self, factory: &ValueFactory, var: VarId) {
        let dependents: Vec<_> = factory.dependents(var).collect();
        for dependent in dependents {
            self.flush_variable(factory, dependent);
        }
        self.detach(var);
    }

    fn detach(&mut self, var: VarId) {
        let root = self.root(var);
        if root != var {
            if let Some(parent) = self.parent.remove(&var) {
                for link in self.parent.values_mut() {
                    if *link == var {
                        *link = parent;
                    }
                }
            }
            return;
        }

        let members: Vec<_> = self
            .parent
            .keys()
            .copied()
            .filter(|member| self.root(*member) == root)
            .collect();
        let Some(&new_root) = members.first() else {
            self.facts.remove(&var);
            self.excluded.remove(&var);
            self.distinct.retain(|(a, b)| *a != var && *b != var);
            return;
        };

        for member in &members[1..] {
            self.parent.insert(*member, new_root);
        }
        self.parent.remove(&new_root);
        if let Some(fact) = self.facts.remove(&var) {
            self.facts.insert(new_root, fact);
        }
        if let Some(excluded) = self.excluded.remove(&var) {
            self.excluded.insert(new_root, excluded);
        }
        self.rename_distinct(var, new_root);
    }
}
