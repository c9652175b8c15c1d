//! Java Debug Wire Protocol (JDWP) client façade for Nova's data-flow assist.
//!
//! `nova-dfa-assist` consumes this crate to read live values out of a paused
//! JVM: frame locals, `this`, instance fields, class-loader ancestry, and the
//! effective assertion status at the current location.
//!
//! The client trait is synchronous. Every call may
//! block on the debuggee and may fail once the VM resumes or dies; callers are
//! expected to treat any [`JdwpError`] other than a collected object as fatal
//! for the current pause.

mod mock;

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use thiserror::Error;

pub use mock::{MockFrame, MockJdwpClient};

pub type ThreadId = u64;
pub type FrameId = u64;
pub type ObjectId = u64;
pub type ReferenceTypeId = u64;
pub type FieldId = u64;

/// JDWP `Error.INVALID_OBJECT` (the object has already been garbage collected).
pub const ERROR_INVALID_OBJECT: u16 = 20;

pub const STRING_SIGNATURE: &str = "Ljava/lang/String;";
pub const CLASS_LOADER_TYPE_NAME: &str = "java.lang.ClassLoader";

/// A value living inside the debuggee.
///
/// Two values are equal when they denote the same runtime entity: object
/// references compare by object id, primitives by value (floating point
/// values by bit pattern, so `NaN` keys are stable).
#[derive(Clone, Debug)]
pub enum JdwpValue {
    Null,
    Void,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Object(ObjectRef),
}

impl PartialEq for JdwpValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Void, Self::Void) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Eq for JdwpValue {}

impl Hash for JdwpValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null | Self::Void => {}
            Self::Boolean(v) => v.hash(state),
            Self::Byte(v) => v.hash(state),
            Self::Short(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Long(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::Char(v) => v.hash(state),
            Self::Object(obj) => obj.id.hash(state),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub runtime_type: String,
}

/// A paused stack frame of a suspended thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRef {
    pub thread: ThreadId,
    pub frame: FrameId,
}

/// Execution location of a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// JVM signature of the declaring type, e.g. `Lcom/example/Foo;`.
    pub class_signature: String,
    pub method: String,
    pub line: u32,
    pub code_index: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceTypeInfo {
    pub id: ReferenceTypeId,
    pub signature: String,
    /// Defining class loader; `None` for the bootstrap loader.
    pub class_loader: Option<ObjectId>,
    pub superclass: Option<ReferenceTypeId>,
    pub is_enum: bool,
}

impl ReferenceTypeInfo {
    pub fn type_name(&self) -> String {
        signature_to_type_name(&self.signature)
    }
}

#[derive(Debug, Error)]
pub enum JdwpError {
    #[error("JDWP client is not connected")]
    NotConnected,
    #[error("JDWP command failed with error code {error_code}")]
    CommandFailed { error_code: u16 },
    #[error("invalid object id {0}")]
    InvalidObjectId(ObjectId),
    #[error("invalid frame {0:?}")]
    InvalidFrame(FrameRef),
    #[error("{0}")]
    Other(String),
}

impl JdwpError {
    /// Whether the failure only concerns one (already collected) object rather
    /// than the connection as a whole.
    pub fn is_object_collected(&self) -> bool {
        matches!(
            self,
            JdwpError::InvalidObjectId(_)
                | JdwpError::CommandFailed {
                    error_code: ERROR_INVALID_OBJECT
                }
        )
    }
}

/// Minimal, mock-friendly interface for reading a suspended JVM.
///
/// Only the queries needed to seed data-flow analysis with runtime values are
/// exposed. Field lookups are by name because analysis variables carry source
/// names, not JDWP field ids.
pub trait JdwpClient: Send {
    fn location(&mut self, frame: FrameRef) -> Result<Location, JdwpError>;

    /// Class loader that defined the frame's declaring type (`None` = bootstrap).
    fn frame_class_loader(&mut self, frame: FrameRef) -> Result<Option<ObjectId>, JdwpError>;

    /// Value of a visible local variable, or `None` when the variable is not in
    /// scope (or not yet initialized) at the current code index.
    fn local_value(&mut self, frame: FrameRef, name: &str) -> Result<Option<JdwpValue>, JdwpError>;

    fn this_object(&mut self, frame: FrameRef) -> Result<Option<ObjectRef>, JdwpError>;

    fn object_type(&mut self, object: ObjectId) -> Result<ReferenceTypeId, JdwpError>;

    fn reference_type(&mut self, type_id: ReferenceTypeId) -> Result<ReferenceTypeInfo, JdwpError>;

    /// Looks up a field declared directly in `type_id` (supertypes are not searched).
    fn field_by_name(
        &mut self,
        type_id: ReferenceTypeId,
        name: &str,
    ) -> Result<Option<FieldId>, JdwpError>;

    fn object_field_value(
        &mut self,
        object: ObjectId,
        field: FieldId,
    ) -> Result<JdwpValue, JdwpError>;

    fn string_value(&mut self, object: ObjectId) -> Result<String, JdwpError>;

    fn array_length(&mut self, object: ObjectId) -> Result<i32, JdwpError>;

    /// Effective `-ea` status for the class executing at `location`.
    ///
    /// `None` when the status cannot be determined (for instance because the
    /// class has not finished initialization).
    fn effective_assertion_status(
        &mut self,
        location: &Location,
    ) -> Result<Option<bool>, JdwpError>;

    /// `VirtualMachine.mirrorOf(boolean)`.
    fn mirror_of_bool(&mut self, value: bool) -> JdwpValue {
        JdwpValue::Boolean(value)
    }

    /// Walks the superclass chain of `type_id` (inclusive) until a type named
    /// `type_name` is found.
    fn find_supertype(
        &mut self,
        type_id: ReferenceTypeId,
        type_name: &str,
    ) -> Result<Option<ReferenceTypeInfo>, JdwpError> {
        let mut seen = HashSet::new();
        let mut current = Some(type_id);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let info = self.reference_type(id)?;
            if info.type_name() == type_name {
                return Ok(Some(info));
            }
            current = info.superclass;
        }
        Ok(None)
    }

    /// Reads an instance field by name, searching the object's class hierarchy.
    ///
    /// Subclass declarations win, mirroring Java name hiding.
    fn read_field(&mut self, object: ObjectId, name: &str) -> Result<Option<JdwpValue>, JdwpError> {
        let mut seen = HashSet::new();
        let mut current = Some(self.object_type(object)?);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            if let Some(field) = self.field_by_name(id, name)? {
                return self.object_field_value(object, field).map(Some);
            }
            current = self.reference_type(id)?.superclass;
        }
        Ok(None)
    }
}

/// Converts a JVM type signature (`[Ljava/lang/String;`) into a Java source
/// type name (`java.lang.String[]`).
pub fn signature_to_type_name(signature: &str) -> String {
    let mut sig = signature;
    let mut dims = 0usize;
    while let Some(rest) = sig.strip_prefix('[') {
        dims += 1;
        sig = rest;
    }

    let base = if let Some(class) = sig.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        class.replace('/', ".")
    } else {
        match sig.as_bytes() {
            [b'B'] => "byte".to_string(),
            [b'C'] => "char".to_string(),
            [b'D'] => "double".to_string(),
            [b'F'] => "float".to_string(),
            [b'I'] => "int".to_string(),
            [b'J'] => "long".to_string(),
            [b'S'] => "short".to_string(),
            [b'Z'] => "boolean".to_string(),
            [b'V'] => "void".to_string(),
            _ => "<unknown>".to_string(),
        }
    };

    let mut out = base;
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}
