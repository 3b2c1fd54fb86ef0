//! Single-flight guard for reconciliation passes
//!
//! Store notifications can arrive while a pass of the same kind is still
//! suspended on a write. Rather than start a second overlapping pass, the
//! late arrival marks the running pass dirty and the running pass repeats
//! once against fresh store values before it returns.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Kind of reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Authority changed; update the mirror
    MirrorFromAuthority,
    /// Mirror changed; update the authority
    AuthorityFromMirror,
}

#[derive(Debug, Default)]
struct PassState {
    running: bool,
    dirty: bool,
}

#[derive(Debug, Default)]
pub struct SingleFlight {
    state: Mutex<HashMap<Pass, PassState>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pass. Returns `None` and marks the pass dirty when one of the
    /// same kind is already running.
    pub fn enter(&self, pass: Pass) -> Option<PassGuard<'_>> {
        let mut state = self.state.lock();
        let entry = state.entry(pass).or_default();
        if entry.running {
            entry.dirty = true;
            return None;
        }
        entry.running = true;
        entry.dirty = false;
        Some(PassGuard { flight: self, pass })
    }

    /// Clear and return the dirty flag for a running pass
    pub fn take_dirty(&self, pass: Pass) -> bool {
        let mut state = self.state.lock();
        match state.get_mut(&pass) {
            Some(entry) => std::mem::take(&mut entry.dirty),
            None => false,
        }
    }

    pub fn is_running(&self, pass: Pass) -> bool {
        self.state
            .lock()
            .get(&pass)
            .map(|entry| entry.running)
            .unwrap_or(false)
    }
}

/// Marks a pass finished when dropped
pub struct PassGuard<'a> {
    flight: &'a SingleFlight,
    pass: Pass,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.flight.state.lock();
        if let Some(entry) = state.get_mut(&self.pass) {
            entry.running = false;
            entry.dirty = false;
        }
    }
}
