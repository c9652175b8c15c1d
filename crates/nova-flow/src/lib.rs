//! Data-flow analysis core used by the debugger assist: a small JVM type
//! lattice, analysis variables, constraint memory states, a block-based
//! control-flow IR and a worklist interpreter.

mod cfg;
mod dftype;
mod interpreter;
mod state;
mod types;
mod value;

pub use crate::cfg::{
    AnchorId, BasicBlock, BlockId, ControlFlow, ControlFlowBuilder, Instruction, Terminator,
};
pub use crate::dftype::{DfType, Nullability, PrimitiveValue, ReferenceConstant, ReferenceType};
pub use crate::interpreter::{DataFlowInterpreter, DfaListener, RunnerResult, DEFAULT_MAX_STEPS};
pub use crate::state::{Condition, MemoryState, Operand, RelationType};
pub use crate::types::{
    ClassId, ClassInfo, ClassKind, ClassTable, JvmType, PrimitiveKind, TypeConstraint,
    ENUM as JAVA_LANG_ENUM, OBJECT as JAVA_LANG_OBJECT, STRING as JAVA_LANG_STRING,
};
pub use crate::value::{SpecialField, ValueFactory, VarId, VariableData, VariableDescriptor};
