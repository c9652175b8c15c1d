use std::sync::Arc;

use nova_flow::{ClassTable, ControlFlow, ValueFactory};

use crate::provider::ProviderRegistry;
use crate::stamp::ModificationTracker;

/// Identifies an analyzable code block (a method or initializer body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeBlockId(pub u32);

/// What the assist needs from the editor side: project state, language
/// providers and the static analyzer.
pub trait AnalysisHost: Send + Sync {
    /// Indices are being rebuilt; analysis results would be unreliable.
    fn is_dumb(&self) -> bool {
        false
    }

    fn modification_tracker(&self) -> Arc<ModificationTracker>;

    fn providers(&self) -> &ProviderRegistry;

    /// Classes resolvable from the scope of `block`.
    fn class_table(&self, block: CodeBlockId) -> Arc<ClassTable>;

    /// Builds the control flow of `block`, registering its variables in
    /// `factory`. `None` when the block cannot be analyzed.
    fn build_flow(&self, block: CodeBlockId, factory: &mut ValueFactory) -> Option<ControlFlow>;
}
