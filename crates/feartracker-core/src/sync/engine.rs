//! Synchronization engine
//!
//! Reconciles the game system's authoritative fear value with this module's
//! mirror (`leftSideCount`, the inactive pip count) in both directions.
//!
//! ```text
//!  authority change ──► sync_mirror_from_authority ──► write mirror
//!                                                          │
//!                       store notification ◄───────────────┘
//!                                │
//!  mirror change ────► sync_authority_from_mirror ──► write authority
//!                                                          │
//!                       store notification ◄───────────────┘
//!                                │
//!                       compare: equal, stop
//! ```
//!
//! Each direction re-reads the store, compares, and only writes when the
//! value differs. That exact comparison is what ends the ping-pong between
//! the two directions. Only the gamemaster ever writes.

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::flight::{Pass, SingleFlight};
use crate::bounds::resolve_max;
use crate::store::SettingsStore;
use crate::types::Role;
use crate::value::{clamp_count, AuthoritativeValue, ValueAdapter};

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Store already held the target value; nothing written
    Unchanged,
    /// Wrote the given count (mirror: inactive count, authority: active count)
    Written(u32),
    /// A write was needed but this client may not originate it
    NotPermitted,
    /// A pass of the same kind was running; it will pick this change up
    Deferred,
    /// The store rejected the write
    Failed,
}

impl SyncOutcome {
    pub fn written(&self) -> Option<u32> {
        match self {
            SyncOutcome::Written(n) => Some(*n),
            _ => None,
        }
    }
}

/// Snapshot of the reconciled state, for display
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    pub max: u32,
    pub left_side_count: u32,
    pub active_count: u32,
    pub authority: Option<AuthoritativeValue>,
}

pub struct SyncEngine<S> {
    world: S,
    adapter: ValueAdapter<S>,
    passes: SingleFlight,
    modify_lock: AsyncMutex<()>,
}

impl<S: SettingsStore> SyncEngine<S> {
    pub fn new(world: S, role: Role) -> Self {
        Self {
            adapter: ValueAdapter::new(world.clone(), role),
            world,
            passes: SingleFlight::new(),
            modify_lock: AsyncMutex::new(()),
        }
    }

    pub fn role(&self) -> Role {
        self.adapter.role()
    }

    pub fn adapter(&self) -> &ValueAdapter<S> {
        &self.adapter
    }

    /// Current bounds, re-read from the world store
    pub fn max(&self) -> u32 {
        resolve_max(&self.world)
    }

    /// Current mirror value clamped to the current bounds
    pub fn left_side_count(&self) -> u32 {
        self.adapter.read_mirror(self.max())
    }

    pub fn snapshot(&self) -> TrackerState {
        let max = self.max();
        let left_side_count = self.adapter.read_mirror(max);
        TrackerState {
            max,
            left_side_count,
            active_count: max - left_side_count,
            authority: self.adapter.read_authoritative(),
        }
    }

    /// Authority → mirror.
    ///
    /// Clamps `raw` into the current bounds, derives the inactive count and
    /// writes it to the mirror when it differs. Unprivileged clients return
    /// [`SyncOutcome::NotPermitted`] and wait for the replicated mirror.
    pub async fn sync_mirror_from_authority(&self, raw: f64) -> SyncOutcome {
        let Some(_guard) = self.passes.enter(Pass::MirrorFromAuthority) else {
            debug!(raw, "Mirror pass already running, deferring");
            return SyncOutcome::Deferred;
        };

        let mut outcome = self.mirror_pass(raw).await;
        let mut written = outcome.written();
        while self.passes.take_dirty(Pass::MirrorFromAuthority) {
            let Some(latest) = self.adapter.read_authoritative().and_then(|a| a.number()) else {
                break;
            };
            outcome = self.mirror_pass(latest).await;
            written = outcome.written().or(written);
        }

        written.map(SyncOutcome::Written).unwrap_or(outcome)
    }

    async fn mirror_pass(&self, raw: f64) -> SyncOutcome {
        if raw.is_nan() {
            return SyncOutcome::Unchanged;
        }

        let max = self.max();
        let active = clamp_count(raw, max);
        let candidate = max - active;

        if self.adapter.read_mirror_raw() == Some(candidate as f64) {
            return SyncOutcome::Unchanged;
        }
        if !self.role().is_privileged() {
            debug!(candidate, "Mirror differs; waiting for gamemaster");
            return SyncOutcome::NotPermitted;
        }

        match self.adapter.write_mirror(candidate, max).await {
            Ok(true) => {
                info!(raw, left = candidate, "Mirror updated from authority");
                SyncOutcome::Written(candidate)
            }
            Ok(false) => SyncOutcome::Unchanged,
            Err(e) => {
                warn!(error = %e, "Failed to write mirror");
                SyncOutcome::Failed
            }
        }
    }

    /// Mirror → authority.
    ///
    /// Writes `active` back to the game system, keeping its wrapper shape,
    /// when it differs from the stored number. Gamemaster only.
    pub async fn sync_authority_from_mirror(&self, active: u32) -> SyncOutcome {
        if !self.role().is_privileged() {
            return SyncOutcome::NotPermitted;
        }
        let Some(_guard) = self.passes.enter(Pass::AuthorityFromMirror) else {
            debug!(active, "Authority pass already running, deferring");
            return SyncOutcome::Deferred;
        };

        let mut outcome = self.authority_pass(active).await;
        let mut written = outcome.written();
        while self.passes.take_dirty(Pass::AuthorityFromMirror) {
            let max = self.max();
            let latest = max - self.adapter.read_mirror(max);
            outcome = self.authority_pass(latest).await;
            written = outcome.written().or(written);
        }

        written.map(SyncOutcome::Written).unwrap_or(outcome)
    }

    async fn authority_pass(&self, active: u32) -> SyncOutcome {
        match self.adapter.write_authoritative(active).await {
            Ok(true) => SyncOutcome::Written(active),
            Ok(false) => SyncOutcome::Unchanged,
            Err(e) => {
                warn!(active, error = %e, "Failed to write fear back to game system");
                SyncOutcome::Failed
            }
        }
    }

    /// Rewrite a stored mirror that is fractional, out of range or not a
    /// number as its clamped whole count
    pub async fn normalize_mirror(&self) -> SyncOutcome {
        let max = self.max();
        let left = self.adapter.read_mirror(max);
        if self.adapter.read_mirror_raw() == Some(left as f64) {
            return SyncOutcome::Unchanged;
        }
        if !self.role().is_privileged() {
            return SyncOutcome::NotPermitted;
        }

        match self.adapter.write_mirror(left, max).await {
            Ok(true) => {
                info!(left, "Normalized stored mirror");
                SyncOutcome::Written(left)
            }
            Ok(false) => SyncOutcome::Unchanged,
            Err(e) => {
                warn!(error = %e, "Failed to normalize mirror");
                SyncOutcome::Failed
            }
        }
    }

    /// Shift `delta` pips to the inactive side (negative activates pips).
    ///
    /// Each call reads the stored mirror after acquiring the modify lock, so
    /// rapid calls on one client never lose an update. Across clients the
    /// last write wins.
    pub async fn modify_count(&self, delta: i32) -> SyncOutcome {
        if !self.role().is_privileged() {
            return SyncOutcome::NotPermitted;
        }
        let _lock = self.modify_lock.lock().await;

        let max = self.max();
        let current = self.adapter.read_mirror(max);
        let next = (current as i64 + delta as i64).clamp(0, max as i64) as u32;
        if next == current {
            return SyncOutcome::Unchanged;
        }

        match self.adapter.write_mirror(next, max).await {
            Ok(true) => SyncOutcome::Written(next),
            Ok(false) => SyncOutcome::Unchanged,
            Err(e) => {
                warn!(delta, error = %e, "Failed to write mirror");
                SyncOutcome::Failed
            }
        }
    }

    /// Activate `n` more pips
    pub async fn add_fear(&self, n: u32) -> SyncOutcome {
        self.modify_count(-(n.min(i32::MAX as u32) as i32)).await
    }

    /// Deactivate `n` pips
    pub async fn remove_fear(&self, n: u32) -> SyncOutcome {
        self.modify_count(n.min(i32::MAX as u32) as i32).await
    }
}
