//! Read-lock discipline for the analysis model.
//!
//! Building the analysis (hatching, state building, interpretation) needs
//! shared read access. Talking to the debuggee must happen without it, since a
//! blocked JDWP round-trip would otherwise stall every other analysis reader.

use std::cell::Cell;
use std::marker::PhantomData;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{DfaAssistError, DfaAssistResult};

thread_local! {
    static READ_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Guards the analysis model shared between the editor and the debugger.
#[derive(Debug, Default)]
pub struct AnalysisLock {
    inner: RwLock<()>,
}

impl AnalysisLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires shared access. Re-entrant on the current thread.
    pub fn read(&self) -> ReadAccess<'_> {
        let guard = self.inner.read_recursive();
        READ_DEPTH.with(|depth| depth.set(depth.get() + 1));
        ReadAccess {
            _guard: guard,
            _not_send: PhantomData,
        }
    }

    /// Exclusive access for model mutations (edits, re-indexing).
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write()
    }
}

/// Proof that the current thread holds analysis read access.
#[must_use = "read access is released as soon as the token is dropped"]
pub struct ReadAccess<'a> {
    _guard: RwLockReadGuard<'a, ()>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadAccess<'_> {
    fn drop(&mut self) {
        READ_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub fn is_read_access_held() -> bool {
    READ_DEPTH.with(|depth| depth.get() > 0)
}

/// Fails when the current thread holds read access.
pub fn assert_read_access_not_allowed() -> DfaAssistResult<()> {
    if is_read_access_held() {
        return Err(DfaAssistError::ReadAccessHeld);
    }
    Ok(())
}
