//! The three-stage assist pipeline.
//!
//! ```text
//! Larva::hatch   (read access, a few JDWP queries)  resolve live values
//! Larva::pupate  (no read access, JDWP)             snapshot live values
//! Pupa::transform (read access, no JDWP)            seed the memory state
//! DebuggerDfaRunner::interpret (read access)        run the interpreter
//! ```
//!
//! Each stage consumes the previous one, so a stage cannot run out of order
//! or twice for the same pause.

use std::sync::Arc;

use nova_flow::{BlockId, ControlFlow, DataFlowInterpreter, MemoryState, RunnerResult, ValueFactory};
use nova_jdwp::{FrameRef, JdwpClient};
use tokio_util::sync::CancellationToken;

use crate::config::DfaAssistConfig;
use crate::error::{DfaAssistError, DfaAssistResult};
use crate::host::AnalysisHost;
use crate::listener::DebuggerDfaListener;
use crate::lock::{assert_read_access_not_allowed, AnalysisLock, ReadAccess};
use crate::provider::{DfaAssistProvider, SourceElement};
use crate::resolve::{resolve_live_values, AliasMap};
use crate::snapshot::{fetch_snapshots, SnapshotMap};
use crate::stamp::StaleGuard;
use crate::state_builder::build_memory_state;

/// First stage: the flow of the paused code block and the live value of
/// each of its variables.
pub struct Larva {
    provider: Arc<dyn DfaAssistProvider>,
    flow: ControlFlow,
    factory: ValueFactory,
    start: BlockId,
    guard: StaleGuard,
    aliases: AliasMap,
    frame: FrameRef,
}

impl Larva {
    /// Returns `Ok(None)` whenever the assist does not apply at this pause.
    pub fn hatch(
        _read: &ReadAccess<'_>,
        host: &dyn AnalysisHost,
        client: &mut dyn JdwpClient,
        frame: FrameRef,
        element: Option<&SourceElement>,
    ) -> DfaAssistResult<Option<Self>> {
        let Some(element) = element.filter(|element| element.valid) else {
            return Ok(None);
        };
        if host.is_dumb() {
            tracing::debug!("indices are not ready");
            return Ok(None);
        }
        let Some(provider) = host.providers().for_language(element.language) else {
            tracing::debug!(language = %element.language, "no data-flow assist provider");
            return Ok(None);
        };
        let location = client.location(frame)?;
        if !provider.location_matches(element, &location)? {
            tracing::debug!(?location, "paused outside the element");
            return Ok(None);
        }
        let Some(anchor) = provider.anchor(element) else {
            return Ok(None);
        };
        let Some(block) = provider.code_block(anchor, element) else {
            return Ok(None);
        };

        let mut factory = ValueFactory::new(host.class_table(block));
        let Some(flow) = host.build_flow(block, &mut factory) else {
            tracing::debug!(?block, "no control flow");
            return Ok(None);
        };
        let guard = StaleGuard::capture(host.modification_tracker());
        let Some(start) = flow.start_block(anchor) else {
            tracing::debug!(?anchor, "anchor is not part of the flow");
            return Ok(None);
        };

        let aliases = resolve_live_values(provider.as_ref(), client, frame, &factory, anchor)?;
        if aliases.is_empty() {
            tracing::debug!("no live values resolved");
            return Ok(None);
        }
        tracing::debug!(groups = aliases.len(), "hatched");
        Ok(Some(Self {
            provider,
            flow,
            factory,
            start,
            guard,
            aliases,
            frame,
        }))
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn stamp(&self) -> u64 {
        self.guard.stamp()
    }

    /// Snapshots the resolved live values. Must not be called with read access.
    pub fn pupate(
        self,
        client: &mut dyn JdwpClient,
        cancel: &CancellationToken,
    ) -> DfaAssistResult<Pupa> {
        assert_read_access_not_allowed()?;
        let snapshots = fetch_snapshots(client, self.frame, &self.aliases, cancel)?;
        tracing::debug!(snapshots = snapshots.len(), "pupated");
        Ok(Pupa {
            larva: self,
            snapshots,
        })
    }
}

/// Second stage: everything the state builder needs, detached from the debuggee.
pub struct Pupa {
    larva: Larva,
    snapshots: SnapshotMap,
}

impl Pupa {
    pub fn snapshots(&self) -> &SnapshotMap {
        &self.snapshots
    }

    /// `None` if the sources changed since hatching.
    pub fn transform(
        self,
        _read: &ReadAccess<'_>,
        config: &DfaAssistConfig,
    ) -> Option<DebuggerDfaRunner> {
        if !self.larva.guard.is_fresh() {
            tracing::debug!(stamp = self.larva.guard.stamp(), "sources changed while fetching");
            return None;
        }
        let Larva {
            provider,
            flow,
            mut factory,
            start,
            guard,
            aliases,
            ..
        } = self.larva;
        let starting_state = build_memory_state(
            &mut factory,
            &aliases,
            &self.snapshots,
            config.max_distinct_pairs,
        );
        Some(DebuggerDfaRunner {
            provider,
            flow,
            factory,
            start,
            starting_state,
            guard,
            max_steps: config.max_interpreter_steps,
        })
    }
}

/// Final stage: a seeded interpreter run that can be repeated.
pub struct DebuggerDfaRunner {
    provider: Arc<dyn DfaAssistProvider>,
    flow: ControlFlow,
    factory: ValueFactory,
    start: BlockId,
    starting_state: MemoryState,
    guard: StaleGuard,
    max_steps: usize,
}

impl DebuggerDfaRunner {
    pub fn starting_state(&self) -> &MemoryState {
        &self.starting_state
    }

    pub fn factory(&self) -> &ValueFactory {
        &self.factory
    }

    /// Runs the interpreter from a copy of the seeded state.
    ///
    /// Returns the listener only when interpretation completed normally.
    pub fn interpret(
        &self,
        _read: &ReadAccess<'_>,
        cancel: &CancellationToken,
    ) -> Option<Box<dyn DebuggerDfaListener>> {
        if !self.guard.is_fresh() {
            tracing::debug!("sources changed before interpretation");
            return None;
        }
        let mut listener = self.provider.create_listener();
        let result = DataFlowInterpreter::new(&self.flow, &self.factory)
            .with_max_steps(self.max_steps)
            .interpret(
                self.start,
                self.starting_state.clone(),
                listener.as_mut(),
                &mut || cancel.is_cancelled(),
            );
        tracing::debug!(?result, "interpreted");
        (result == RunnerResult::Ok).then_some(listener)
    }
}

/// Runs the whole pipeline for one pause, taking and releasing read access
/// around each stage.
///
/// `Ok(None)` covers every "not applicable" outcome, staleness and
/// cancellation. Errors are JDWP failures.
pub fn run_dfa_assist(
    lock: &AnalysisLock,
    host: &dyn AnalysisHost,
    client: &mut dyn JdwpClient,
    frame: FrameRef,
    element: Option<&SourceElement>,
    config: &DfaAssistConfig,
    cancel: &CancellationToken,
) -> DfaAssistResult<Option<Box<dyn DebuggerDfaListener>>> {
    if !config.enabled {
        return Ok(None);
    }
    let span = tracing::debug_span!("dfa_assist", thread = frame.thread, frame = frame.frame);
    let _enter = span.enter();

    let larva = {
        let read = lock.read();
        Larva::hatch(&read, host, client, frame, element)?
    };
    let Some(larva) = larva else {
        return Ok(None);
    };

    let pupa = match larva.pupate(client, cancel) {
        Ok(pupa) => pupa,
        Err(DfaAssistError::Cancelled) => return Ok(None),
        Err(err) => return Err(err),
    };

    let read = lock.read();
    let Some(runner) = pupa.transform(&read, config) else {
        return Ok(None);
    };
    if cancel.is_cancelled() {
        return Ok(None);
    }
    Ok(runner.interpret(&read, cancel))
}
