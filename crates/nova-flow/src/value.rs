use std::collections::HashMap;
use std::sync::Arc;

use crate::dftype::DfType;
use crate::types::{ClassTable, JvmType, PrimitiveKind, TypeConstraint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl VarId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A synthetic property of an object that the analysis tracks like a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialField {
    ArrayLength,
    CollectionSize,
    /// The primitive inside a boxed value (`Integer.value`).
    Unbox,
}

impl SpecialField {
    /// Declared type of the special field on a qualifier of type `qualifier`.
    ///
    /// `None` when the field makes no sense for the qualifier (e.g. unboxing a
    /// non-box type).
    #[must_use]
    pub fn declared_type(self, qualifier: &DfType, table: &ClassTable) -> Option<DfType> {
        match self {
            Self::ArrayLength | Self::CollectionSize => {
                Some(DfType::from_type(&JvmType::Primitive(PrimitiveKind::Int)))
            }
            Self::Unbox => match qualifier.constraint() {
                TypeConstraint::Exact(JvmType::Class(id))
                | TypeConstraint::InstanceOf(JvmType::Class(id)) => {
                    PrimitiveKind::from_box_class_name(&table.class(id).name)
                        .map(|kind| DfType::from_type(&JvmType::Primitive(kind)))
                }
                // The box type may only become known after narrowing.
                TypeConstraint::Top => Some(DfType::Top),
                _ => None,
            },
        }
    }

    /// Creates (or finds) the variable denoting this special field of
    /// `qualifier`, whose currently known type is `qualifier_type`.
    pub fn create_value(
        self,
        factory: &mut ValueFactory,
        qualifier: VarId,
        qualifier_type: &DfType,
    ) -> Option<VarId> {
        if !matches!(qualifier_type, DfType::Reference(_) | DfType::Top) {
            return None;
        }
        let df_type = self.declared_type(qualifier_type, factory.table())?;
        Some(factory.variable(
            VariableDescriptor::Special {
                qualifier,
                field: self,
            },
            df_type,
        ))
    }
}

/// How an analysis variable maps back to a source construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableDescriptor {
    Local(String),
    This,
    Field { qualifier: VarId, name: String },
    Special { qualifier: VarId, field: SpecialField },
    /// The synthetic `$assertionsDisabled` flag of the enclosing class.
    AssertionsDisabled,
}

impl VariableDescriptor {
    #[must_use]
    pub fn qualifier(&self) -> Option<VarId> {
        match self {
            Self::Field { qualifier, .. } | Self::Special { qualifier, .. } => Some(*qualifier),
            Self::Local(_) | Self::This | Self::AssertionsDisabled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableData {
    pub descriptor: VariableDescriptor,
    /// Declared type of the variable.
    pub df_type: DfType,
}

/// Interning factory for analysis variables of one control flow.
#[derive(Debug, Clone)]
pub struct ValueFactory {
    table: Arc<ClassTable>,
    vars: Vec<VariableData>,
    by_descriptor: HashMap<VariableDescriptor, VarId>,
}

impl ValueFactory {
    #[must_use]
    pub fn new(table: Arc<ClassTable>) -> Self {
        Self {
            table,
            vars: Vec::new(),
            by_descriptor: HashMap::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &ClassTable {
        &self.table
    }

    /// Returns the variable for `descriptor`, creating it with `df_type` on
    /// first use.
    pub fn variable(&mut self, descriptor: VariableDescriptor, df_type: DfType) -> VarId {
        if let Some(id) = self.by_descriptor.get(&descriptor) {
            return *id;
        }
        let id = VarId(self.vars.len() as u32);
        self.by_descriptor.insert(descriptor.clone(), id);
        self.vars.push(VariableData {
            descriptor,
            df_type,
        });
        id
    }

    pub fn local(&mut self, name: &str, ty: &JvmType) -> VarId {
        self.variable(
            VariableDescriptor::Local(name.to_string()),
            DfType::from_type(ty),
        )
    }

    pub fn assertions_disabled(&mut self) -> VarId {
        self.variable(
            VariableDescriptor::AssertionsDisabled,
            DfType::from_type(&JvmType::Primitive(PrimitiveKind::Boolean)),
        )
    }

    #[must_use]
    pub fn data(&self, id: VarId) -> &VariableData {
        &self.vars[id.index()]
    }

    #[must_use]
    pub fn find(&self, descriptor: &VariableDescriptor) -> Option<VarId> {
        self.by_descriptor.get(descriptor).copied()
    }

    /// All variables in creation order.
    pub fn variables(&self) -> impl Iterator<Item = VarId> {
        (0..self.vars.len() as u32).map(VarId)
    }

    /// Variables whose descriptor is qualified by `qualifier`.
    pub fn dependents(&self, qualifier: VarId) -> impl Iterator<Item = VarId> + '_ {
        self.vars
            .iter()
            .enumerate()
            .filter(move |(_, data)| data.descriptor.qualifier() == Some(qualifier))
            .map(|(idx, _)| VarId(idx as u32))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
