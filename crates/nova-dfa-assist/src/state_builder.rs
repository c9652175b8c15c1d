use nova_flow::{
    Condition, DfType, JvmType, MemoryState, TypeConstraint, ValueFactory, VarId,
    JAVA_LANG_STRING,
};

use crate::resolve::AliasMap;
use crate::signature::type_from_signature;
use crate::snapshot::{SnapshotMap, ValueSnapshot};

/// Seeds a memory state with what the debugger observed.
///
/// Variables sharing a live value are made equal to the group's first
/// variable, snapshots narrow types and pin constants, and canonical
/// variables holding different objects are made pairwise distinct (at most
/// `max_distinct_pairs` pairs, in alias-map order).
///
/// Special-field variables that snapshots refer to are created in `factory`.
pub fn build_memory_state(
    factory: &mut ValueFactory,
    aliases: &AliasMap,
    snapshots: &SnapshotMap,
    max_distinct_pairs: usize,
) -> MemoryState {
    let mut state = MemoryState::new();
    let mut distinct = Vec::new();

    for (value, vars) in aliases {
        let Some(&canonical) = vars.first() else {
            continue;
        };
        let declared = &factory.data(canonical).df_type;
        if declared.is_reference()
            && !declared.constraint().is_compared_by_equals(factory.table())
        {
            distinct.push(canonical);
        }
        let snapshot = snapshots.get(value);
        for &var in vars {
            if !state.assume_same(factory, var, canonical) {
                tracing::trace!(var = var.index(), "alias contradicts declared types");
                continue;
            }
            if let Some(snapshot) = snapshot {
                add_conditions(factory, &mut state, var, snapshot);
            }
        }
    }

    let mut asserted = 0;
    'pairs: for (idx, &left) in distinct.iter().enumerate() {
        for &right in &distinct[idx + 1..] {
            if asserted >= max_distinct_pairs {
                break 'pairs;
            }
            let overlap = state
                .df_type(factory, left)
                .meet(&state.df_type(factory, right), factory.table());
            if overlap.is_bottom() {
                continue;
            }
            if state.apply_condition(factory, &Condition::not_equal(left, right)) {
                asserted += 1;
            }
        }
    }
    state
}

fn add_conditions(
    factory: &mut ValueFactory,
    state: &mut MemoryState,
    var: VarId,
    snapshot: &ValueSnapshot,
) {
    match snapshot {
        ValueSnapshot::PrimitiveConstant(ty) => {
            assume_value(factory, state, var, ty);
        }
        ValueSnapshot::StringConstant(text) => match factory.table().lookup(JAVA_LANG_STRING) {
            Some(string) => {
                let constant = DfType::string_constant(text, string);
                assume_value(factory, state, var, &constant);
            }
            None => tracing::trace!("java.lang.String is not resolvable"),
        },
        ValueSnapshot::ObjectRef { signature }
        | ValueSnapshot::EnumConstant { signature, .. }
        | ValueSnapshot::ObjectWithSpecialField { signature, .. } => {
            let Some(ty) = type_from_signature(signature, factory.table()) else {
                tracing::trace!(%signature, "unresolvable runtime type");
                return;
            };
            let exact = DfType::not_null(TypeConstraint::exact(ty.clone()));
            if !state.meet_df_type(factory, var, &exact) {
                tracing::trace!(
                    %signature,
                    var = var.index(),
                    "runtime type contradicts declared type"
                );
                return;
            }

            match snapshot {
                ValueSnapshot::EnumConstant { name, .. } => {
                    if let Some(case) = enum_case(factory, &ty, name) {
                        assume_value(factory, state, var, &case);
                    }
                }
                ValueSnapshot::ObjectWithSpecialField { field, value, .. } => {
                    let qualifier_type = state.df_type(factory, var);
                    if let Some(field_var) = field.create_value(factory, var, &qualifier_type) {
                        add_conditions(factory, state, field_var, value);
                    }
                }
                _ => {}
            }
        }
    }
}

/// The constant for enum case `name`, if `ty` resolves to an enum declaring it.
fn enum_case(factory: &ValueFactory, ty: &JvmType, name: &str) -> Option<DfType> {
    let JvmType::Class(id) = ty else {
        return None;
    };
    let class = factory.table().class(*id);
    if !class.is_enum() || !class.enum_constants.iter().any(|c| c == name) {
        tracing::trace!(class = %class.name, name, "unknown enum case");
        return None;
    }
    Some(DfType::enum_constant(*id, name))
}

/// `var` holds exactly the observed value `ty`.
fn assume_value(factory: &ValueFactory, state: &mut MemoryState, var: VarId, ty: &DfType) {
    if !state.meet_df_type(factory, var, ty) {
        tracing::trace!(var = var.index(), "observed constant contradicts the analysis");
    }
}
