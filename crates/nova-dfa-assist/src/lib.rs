//! Debugger data-flow assist.
//!
//! When the debugger pauses, the live values of the variables around the
//! pause point are read over JDWP, turned into facts about the analysis
//! variables of the enclosing code block, and the data-flow interpreter is
//! re-run from the current statement with those facts. Conditions that can
//! only go one way are reported back as inline hints.
//!
//! The pipeline is split in stages by the locks they need, see [`runner`].

mod config;
mod error;
mod host;
mod java;
mod listener;
mod lock;
mod provider;
mod resolve;
pub mod runner;
mod signature;
mod snapshot;
mod stamp;
mod state_builder;

pub use crate::config::{
    init_tracing, ConfigError, DfaAssistConfig, LoggingConfig, DEFAULT_MAX_DISTINCT_PAIRS,
};
pub use crate::error::{DfaAssistError, DfaAssistResult};
pub use crate::host::{AnalysisHost, CodeBlockId};
pub use crate::java::JavaDfaAssistProvider;
pub use crate::listener::{
    ConditionOutcome, ConstantConditionListener, DebuggerDfaListener, DfaHint, HintKind,
};
pub use crate::lock::{
    assert_read_access_not_allowed, is_read_access_held, AnalysisLock, ReadAccess,
};
pub use crate::provider::{DfaAssistProvider, LanguageId, ProviderRegistry, SourceElement};
pub use crate::resolve::{resolve_live_values, AliasMap};
pub use crate::runner::{run_dfa_assist, DebuggerDfaRunner, Larva, Pupa};
pub use crate::signature::type_from_signature;
pub use crate::snapshot::{classify, fetch_snapshots, ClassLoaderFilter, SnapshotMap, ValueSnapshot};
pub use crate::stamp::{Freshness, ModificationTracker, StaleGuard};
pub use crate::state_builder::build_memory_state;
