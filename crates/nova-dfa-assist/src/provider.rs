use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nova_flow::{AnchorId, ValueFactory, VarId};
use nova_jdwp::{FrameRef, JdwpClient, JdwpValue, Location};

use crate::error::DfaAssistResult;
use crate::host::CodeBlockId;
use crate::java::JavaDfaAssistProvider;
use crate::listener::DebuggerDfaListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageId(pub &'static str);

impl LanguageId {
    pub const JAVA: LanguageId = LanguageId("java");
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The source construct at the caret/pause position, as seen by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceElement {
    pub language: LanguageId,
    /// `false` once the element was invalidated by an edit.
    pub valid: bool,
    /// Binary name of the innermost enclosing top-level or member class
    /// (`com.example.Outer$Inner`).
    pub enclosing_class: String,
    /// 1-based source line.
    pub line: u32,
    pub anchor: Option<AnchorId>,
    pub code_block: Option<CodeBlockId>,
}

/// Language-specific half of the assist.
pub trait DfaAssistProvider: Send + Sync {
    fn language(&self) -> LanguageId;

    /// Whether the debugger is paused at `element`.
    ///
    /// Errors when the location itself is malformed.
    fn location_matches(&self, element: &SourceElement, location: &Location)
        -> DfaAssistResult<bool>;

    /// The construct the interpreter should start at.
    fn anchor(&self, element: &SourceElement) -> Option<AnchorId>;

    /// The analyzable block enclosing `anchor`.
    fn code_block(&self, anchor: AnchorId, element: &SourceElement) -> Option<CodeBlockId>;

    /// Reads the live value denoted by `var` in the paused `frame`.
    ///
    /// `Ok(None)` when the variable is out of scope, uninitialized or cannot
    /// be mapped to the runtime.
    fn live_value(
        &self,
        client: &mut dyn JdwpClient,
        frame: FrameRef,
        factory: &ValueFactory,
        var: VarId,
        anchor: AnchorId,
    ) -> DfaAssistResult<Option<JdwpValue>>;

    fn create_listener(&self) -> Box<dyn DebuggerDfaListener>;
}

/// Providers keyed by source language.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<LanguageId, Arc<dyn DfaAssistProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JavaDfaAssistProvider));
        registry
    }

    /// Registers `provider`, replacing any provider for the same language.
    pub fn register(&mut self, provider: Arc<dyn DfaAssistProvider>) {
        self.providers.insert(provider.language(), provider);
    }

    pub fn for_language(&self, language: LanguageId) -> Option<Arc<dyn DfaAssistProvider>> {
        self.providers.get(&language).cloned()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut languages: Vec<_> = self.providers.keys().map(|l| l.0).collect();
        languages.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("languages", &languages)
            .finish()
    }
}
