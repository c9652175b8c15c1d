use crate::types::{ClassId, ClassTable, JvmType, PrimitiveKind, TypeConstraint};

/// A primitive constant. Floating point values are kept as raw bits so the
/// lattice stays `Eq`; the lattice tracks which bits a variable holds, while
/// `==` conditions compare numerically (see [`DfType::floating_constant`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveValue {
    Boolean(bool),
    Integral(i64),
    Char(char),
    Floating(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    Null,
    NotNull,
    Nullable,
}

impl Nullability {
    fn meet(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Null, Self::NotNull) | (Self::NotNull, Self::Null) => None,
            (Self::Nullable, x) | (x, Self::Nullable) => Some(x),
            (x, _) => Some(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceConstant {
    String(String),
    EnumCase { class: ClassId, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceType {
    pub nullability: Nullability,
    pub constraint: TypeConstraint,
    pub constant: Option<ReferenceConstant>,
}

/// Abstract value of a variable: the set of runtime values it may hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DfType {
    /// No value (contradiction).
    Bottom,
    /// Any value.
    Top,
    Primitive {
        kind: PrimitiveKind,
        value: Option<PrimitiveValue>,
    },
    Reference(ReferenceType),
}

impl DfType {
    /// Type of a variable declared with `ty`, before anything is known about it.
    #[must_use]
    pub fn from_type(ty: &JvmType) -> Self {
        match ty {
            JvmType::Primitive(kind) => Self::Primitive {
                kind: *kind,
                value: None,
            },
            reference => Self::Reference(ReferenceType {
                nullability: Nullability::Nullable,
                constraint: TypeConstraint::instance_of(reference.clone()),
                constant: None,
            }),
        }
    }

    #[must_use]
    pub fn primitive(kind: PrimitiveKind, value: PrimitiveValue) -> Self {
        Self::Primitive {
            kind,
            value: Some(value),
        }
    }

    #[must_use]
    pub fn int(value: i32) -> Self {
        Self::primitive(PrimitiveKind::Int, PrimitiveValue::Integral(value.into()))
    }

    #[must_use]
    pub fn float(value: f32) -> Self {
        Self::primitive(
            PrimitiveKind::Float,
            PrimitiveValue::Floating(value.to_bits().into()),
        )
    }

    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::primitive(PrimitiveKind::Double, PrimitiveValue::Floating(value.to_bits()))
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::primitive(PrimitiveKind::Boolean, PrimitiveValue::Boolean(value))
    }

    #[must_use]
    pub fn null() -> Self {
        Self::Reference(ReferenceType {
            nullability: Nullability::Null,
            constraint: TypeConstraint::Top,
            constant: None,
        })
    }

    #[must_use]
    pub fn not_null(constraint: TypeConstraint) -> Self {
        Self::Reference(ReferenceType {
            nullability: Nullability::NotNull,
            constraint,
            constant: None,
        })
    }

    #[must_use]
    pub fn string_constant(text: impl Into<String>, string_class: ClassId) -> Self {
        Self::Reference(ReferenceType {
            nullability: Nullability::NotNull,
            constraint: TypeConstraint::exact(JvmType::Class(string_class)),
            constant: Some(ReferenceConstant::String(text.into())),
        })
    }

    #[must_use]
    pub fn enum_constant(class: ClassId, name: impl Into<String>) -> Self {
        Self::Reference(ReferenceType {
            nullability: Nullability::NotNull,
            constraint: TypeConstraint::exact(JvmType::Class(class)),
            constant: Some(ReferenceConstant::EnumCase {
                class,
                name: name.into(),
            }),
        })
    }

    #[must_use]
    pub fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    /// Whether this type denotes exactly one value.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Primitive { value, .. } => value.is_some(),
            Self::Reference(r) => r.nullability == Nullability::Null || r.constant.is_some(),
            Self::Bottom | Self::Top => false,
        }
    }

    /// Whether two equal constants of this type are necessarily the same
    /// object. Strings are excluded: equal text may live in different instances.
    #[must_use]
    pub fn is_identity_constant(&self) -> bool {
        match self {
            Self::Primitive { value, .. } => value.is_some(),
            Self::Reference(r) => match &r.constant {
                Some(ReferenceConstant::EnumCase { .. }) => true,
                Some(ReferenceConstant::String(_)) => false,
                None => r.nullability == Nullability::Null,
            },
            Self::Bottom | Self::Top => false,
        }
    }

    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            Self::Primitive {
                kind: PrimitiveKind::Float | PrimitiveKind::Double,
                ..
            }
        )
    }

    /// Numeric value of a `float` or `double` constant, widened to `f64`.
    #[must_use]
    pub fn floating_constant(&self) -> Option<f64> {
        match self {
            Self::Primitive {
                kind: PrimitiveKind::Float,
                value: Some(PrimitiveValue::Floating(bits)),
            } => u32::try_from(*bits).ok().map(|bits| f32::from_bits(bits).into()),
            Self::Primitive {
                kind: PrimitiveKind::Double,
                value: Some(PrimitiveValue::Floating(bits)),
            } => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    #[must_use]
    pub fn constraint(&self) -> TypeConstraint {
        match self {
            Self::Reference(r) => r.constraint.clone(),
            Self::Bottom => TypeConstraint::Bottom,
            Self::Top | Self::Primitive { .. } => TypeConstraint::Top,
        }
    }

    #[must_use]
    pub fn meet(&self, other: &Self, table: &ClassTable) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Top, x) | (x, Self::Top) => x.clone(),
            (
                Self::Primitive { kind: k1, value: v1 },
                Self::Primitive { kind: k2, value: v2 },
            ) => {
                if k1 != k2 {
                    return Self::Bottom;
                }
                match (v1, v2) {
                    (Some(a), Some(b)) if a != b => Self::Bottom,
                    _ => Self::Primitive {
                        kind: *k1,
                        value: v1.or(*v2),
                    },
                }
            }
            (Self::Reference(a), Self::Reference(b)) => meet_references(a, b, table),
            _ => Self::Bottom,
        }
    }
}

fn meet_references(a: &ReferenceType, b: &ReferenceType, table: &ClassTable) -> DfType {
    let Some(nullability) = a.nullability.meet(b.nullability) else {
        return DfType::Bottom;
    };
    let constant = match (&a.constant, &b.constant) {
        (Some(x), Some(y)) if x != y => return DfType::Bottom,
        (x, y) => x.clone().or_else(|| y.clone()),
    };
    if nullability == Nullability::Null {
        return if constant.is_some() {
            DfType::Bottom
        } else {
            DfType::null()
        };
    }
    let constraint = a.constraint.meet(&b.constraint, table);
    if constraint == TypeConstraint::Bottom {
        // Only `null` inhabits two disjoint reference types.
        return if nullability == Nullability::Nullable && constant.is_none() {
            DfType::null()
        } else {
            DfType::Bottom
        };
    }
    let nullability = if constant.is_some() {
        Nullability::NotNull
    } else {
        nullability
    };
    DfType::Reference(ReferenceType {
        nullability,
        constraint,
        constant,
    })
}
