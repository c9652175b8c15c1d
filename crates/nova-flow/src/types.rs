use std::collections::{HashMap, HashSet};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const ENUM: &str = "java.lang.Enum";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    /// Parses a one-character JVM field descriptor (`I`, `Z`, ...).
    #[must_use]
    pub fn from_descriptor(descriptor: char) -> Option<Self> {
        Some(match descriptor {
            'Z' => Self::Boolean,
            'B' => Self::Byte,
            'C' => Self::Char,
            'S' => Self::Short,
            'I' => Self::Int,
            'J' => Self::Long,
            'F' => Self::Float,
            'D' => Self::Double,
            _ => return None,
        })
    }

    #[must_use]
    pub fn box_class_name(self) -> &'static str {
        match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Char => "java.lang.Character",
            Self::Short => "java.lang.Short",
            Self::Int => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Float => "java.lang.Float",
            Self::Double => "java.lang.Double",
        }
    }

    #[must_use]
    pub fn from_box_class_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.box_class_name() == name)
    }

    pub const ALL: [Self; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JvmType {
    Primitive(PrimitiveKind),
    Class(ClassId),
    Array(Box<JvmType>),
}

impl JvmType {
    #[must_use]
    pub fn array_of(self) -> Self {
        Self::Array(Box::new(self))
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Primitive(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Binary name using `.` separators (`java.util.Map$Entry`).
    pub name: String,
    pub kind: ClassKind,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_final: bool,
    pub enum_constants: Vec<String>,
}

impl ClassInfo {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            super_class: None,
            interfaces: Vec::new(),
            is_final: false,
            enum_constants: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn enumeration(name: impl Into<String>, constants: &[&str]) -> Self {
        Self {
            kind: ClassKind::Enum,
            is_final: true,
            enum_constants: constants.iter().map(|c| (*c).to_string()).collect(),
            ..Self::class(name)
        }
    }

    #[must_use]
    pub fn with_super(mut self, super_class: ClassId) -> Self {
        self.super_class = Some(super_class);
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: ClassId) -> Self {
        self.interfaces.push(interface);
        self
    }

    #[must_use]
    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }
}

/// The classes visible from an analysis resolve scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTable {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, ClassId>,
}

impl ClassTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pre-populated with the handful of JDK types the debugger assist
    /// needs to reason about (Object, String, Enum, the primitive boxes and a
    /// couple of collections).
    #[must_use]
    pub fn with_well_known() -> Self {
        let mut table = Self::new();
        let object = table.add_class(ClassInfo::class(OBJECT));
        table.add_class(ClassInfo::class(STRING).with_super(object).final_class());
        table.add_class(ClassInfo::class(ENUM).with_super(object));
        for kind in PrimitiveKind::ALL {
            table.add_class(
                ClassInfo::class(kind.box_class_name())
                    .with_super(object)
                    .final_class(),
            );
        }
        let collection = table.add_class(ClassInfo::interface("java.util.Collection"));
        let list =
            table.add_class(ClassInfo::interface("java.util.List").with_interface(collection));
        table.add_class(
            ClassInfo::class("java.util.ArrayList")
                .with_super(object)
                .with_interface(list),
        );
        table.add_class(
            ClassInfo::class("java.util.LinkedList")
                .with_super(object)
                .with_interface(list),
        );
        table
    }

    /// Inserts a class, replacing any previous definition with the same name.
    ///
    /// Enums without an explicit superclass extend `java.lang.Enum`; other
    /// classes extend `java.lang.Object` when it is known.
    pub fn add_class(&mut self, mut info: ClassInfo) -> ClassId {
        if info.super_class.is_none() && !info.is_interface() && info.name != OBJECT {
            let implicit = if info.is_enum() { ENUM } else { OBJECT };
            info.super_class = self.lookup(implicit);
        }
        if let Some(id) = self.lookup(&info.name) {
            self.classes[id.index()] = info;
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(info.name.clone(), id);
        self.classes.push(info);
        id
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    #[must_use]
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![sub];
        while let Some(current) = stack.pop() {
            if current == sup {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            let info = self.class(current);
            stack.extend(info.super_class);
            stack.extend(info.interfaces.iter().copied());
        }
        false
    }

    fn is_object(&self, id: ClassId) -> bool {
        self.class(id).name == OBJECT
    }

    #[must_use]
    pub fn is_assignable(&self, sub: &JvmType, sup: &JvmType) -> bool {
        match (sub, sup) {
            (JvmType::Primitive(a), JvmType::Primitive(b)) => a == b,
            (JvmType::Class(a), JvmType::Class(b)) => self.is_subclass(*a, *b),
            (JvmType::Array(_), JvmType::Class(b)) => self.is_object(*b),
            (JvmType::Array(a), JvmType::Array(b)) => {
                if a.is_reference() && b.is_reference() {
                    self.is_assignable(a, b)
                } else {
                    a == b
                }
            }
            _ => false,
        }
    }

    /// Whether some runtime type could be assignable to both `a` and `b`.
    #[must_use]
    pub fn may_share_subtype(&self, a: &JvmType, b: &JvmType) -> bool {
        if self.is_assignable(a, b) || self.is_assignable(b, a) {
            return true;
        }
        match (a, b) {
            (JvmType::Class(x), JvmType::Class(y)) => {
                let (x, y) = (self.class(*x), self.class(*y));
                match (x.is_interface(), y.is_interface()) {
                    (true, true) => true,
                    (true, false) => !y.is_final,
                    (false, true) => !x.is_final,
                    (false, false) => false,
                }
            }
            (JvmType::Array(x), JvmType::Array(y)) => {
                x.is_reference() && y.is_reference() && self.may_share_subtype(x, y)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn display(&self, ty: &JvmType) -> String {
        match ty {
            JvmType::Primitive(kind) => format!("{kind:?}").to_ascii_lowercase(),
            JvmType::Class(id) => self.class(*id).name.clone(),
            JvmType::Array(inner) => format!("{}[]", self.display(inner)),
        }
    }
}

/// Runtime type knowledge about a reference value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeConstraint {
    /// Nothing is known.
    Top,
    /// The runtime class is exactly this type.
    Exact(JvmType),
    /// The runtime class is this type or one of its subtypes.
    InstanceOf(JvmType),
    /// No runtime type satisfies the constraint.
    Bottom,
}

impl TypeConstraint {
    #[must_use]
    pub fn exact(ty: JvmType) -> Self {
        Self::Exact(ty)
    }

    #[must_use]
    pub fn instance_of(ty: JvmType) -> Self {
        Self::InstanceOf(ty)
    }

    #[must_use]
    pub fn meet(&self, other: &Self, table: &ClassTable) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Top, x) | (x, Self::Top) => x.clone(),
            (Self::Exact(a), Self::Exact(b)) => {
                if a == b {
                    self.clone()
                } else {
                    Self::Bottom
                }
            }
            (Self::Exact(a), Self::InstanceOf(b)) | (Self::InstanceOf(b), Self::Exact(a)) => {
                if table.is_assignable(a, b) {
                    Self::Exact(a.clone())
                } else {
                    Self::Bottom
                }
            }
            (Self::InstanceOf(a), Self::InstanceOf(b)) => {
                if table.is_assignable(a, b) {
                    self.clone()
                } else if table.is_assignable(b, a) {
                    other.clone()
                } else if table.may_share_subtype(a, b) {
                    self.clone()
                } else {
                    Self::Bottom
                }
            }
        }
    }

    /// Values of these types are conventionally compared with `equals`, so two
    /// distinct instances say nothing about value inequality.
    #[must_use]
    pub fn is_compared_by_equals(&self, table: &ClassTable) -> bool {
        let (Self::Exact(JvmType::Class(id)) | Self::InstanceOf(JvmType::Class(id))) = self else {
            return false;
        };
        let name = table.class(*id).name.as_str();
        name == STRING || PrimitiveKind::from_box_class_name(name).is_some()
    }
}
