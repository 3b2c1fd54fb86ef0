//! Value store adapter
//!
//! Reads and writes the two persisted integers the tracker reconciles:
//!
//! - the **authoritative** fear value in the game system's namespace, stored
//!   either as a bare number or as an object with a `value` field plus
//!   fields owned by the system
//! - the **mirror** `leftSideCount` in this module's namespace, the number of
//!   inactive pips
//!
//! Raw settings are decoded once at this boundary into [`AuthoritativeValue`];
//! everything past it works on the decoded variant. Both writes compare
//! against the currently stored value first and skip identical values.

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::FearResult;
use crate::settings::{ACTIVE_FEAR, LEFT_SIDE_COUNT, SYSTEM_FEAR};
use crate::store::SettingsStore;
use crate::types::{Role, SettingKey};

const VALUE_FIELD: &str = "value";

/// Numeric coercion for loosely typed settings
///
/// Numbers pass through, numeric strings parse (an empty string is zero),
/// booleans are 1/0 and null is zero. Objects and arrays do not coerce.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Clamp a raw count into `[0, max]`, rounding to the nearest whole pip
pub fn clamp_count(raw: f64, max: u32) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, max as f64).round() as u32
}

/// Decoded authoritative fear setting
#[derive(Debug, Clone, PartialEq)]
pub enum AuthoritativeValue {
    /// Stored as a bare number
    Number(f64),
    /// Stored as `{ value, ..rest }`; `rest` belongs to the game system
    Wrapped {
        value: Option<f64>,
        rest: Map<String, Value>,
    },
    /// Stored in a shape that carries no number; replaced on write
    Malformed(Value),
}

impl AuthoritativeValue {
    /// Decode a raw setting value
    pub fn decode(raw: &Value) -> Self {
        match raw {
            Value::Object(fields) if fields.contains_key(VALUE_FIELD) => {
                let mut rest = fields.clone();
                let value = rest.remove(VALUE_FIELD).and_then(|v| coerce_number(&v));
                AuthoritativeValue::Wrapped { value, rest }
            }
            other => match coerce_number(other) {
                Some(n) => AuthoritativeValue::Number(n),
                None => AuthoritativeValue::Malformed(other.clone()),
            },
        }
    }

    /// The fear quantity, if the setting carries one
    pub fn number(&self) -> Option<f64> {
        match self {
            AuthoritativeValue::Number(n) => Some(*n),
            AuthoritativeValue::Wrapped { value, .. } => *value,
            AuthoritativeValue::Malformed(_) => None,
        }
    }

    /// Encode `count` in this setting's shape, keeping sibling fields
    pub fn with_count(&self, count: u32) -> Value {
        match self {
            AuthoritativeValue::Wrapped { rest, .. } => {
                let mut fields = rest.clone();
                fields.insert(VALUE_FIELD.to_string(), json!(count));
                Value::Object(fields)
            }
            AuthoritativeValue::Number(_) | AuthoritativeValue::Malformed(_) => json!(count),
        }
    }
}

/// Reads and writes the authoritative and mirror values for one client
#[derive(Clone)]
pub struct ValueAdapter<S> {
    world: S,
    role: Role,
}

impl<S: SettingsStore> ValueAdapter<S> {
    pub fn new(world: S, role: Role) -> Self {
        Self { world, role }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn authority_key() -> SettingKey {
        SettingKey::system(SYSTEM_FEAR)
    }

    fn mirror_key() -> SettingKey {
        SettingKey::module(LEFT_SIDE_COUNT)
    }

    /// Whether the game system registered its fear setting
    pub fn authority_registered(&self) -> bool {
        self.world.is_registered(&Self::authority_key())
    }

    /// Decoded authoritative value, `None` when the system has none
    pub fn read_authoritative(&self) -> Option<AuthoritativeValue> {
        self.world
            .get(&Self::authority_key())
            .map(|raw| AuthoritativeValue::decode(&raw))
    }

    /// Write the active count back to the game system.
    ///
    /// Returns `Ok(false)` without touching the store when the caller is not
    /// privileged, the system setting is missing, or the stored number
    /// already equals `active`.
    pub async fn write_authoritative(&self, active: u32) -> FearResult<bool> {
        if !self.role.is_privileged() {
            debug!(active, "Ignoring authority write from unprivileged client");
            return Ok(false);
        }
        if !self.authority_registered() {
            return Ok(false);
        }

        let current = self.read_authoritative();
        if current.as_ref().and_then(|c| c.number()) == Some(active as f64) {
            debug!(active, "Authority already holds active count");
            return Ok(false);
        }

        let encoded = match &current {
            Some(current) => current.with_count(active),
            None => json!(active),
        };
        self.world.set(&Self::authority_key(), encoded).await?;
        info!(active, "Wrote active count to game system");
        Ok(true)
    }

    /// Stored mirror value exactly as persisted, coerced to a number
    pub fn read_mirror_raw(&self) -> Option<f64> {
        self.world
            .get(&Self::mirror_key())
            .and_then(|raw| coerce_number(&raw))
    }

    /// Mirror value clamped into `[0, max]`; a missing mirror is all inactive
    pub fn read_mirror(&self, max: u32) -> u32 {
        match self.read_mirror_raw() {
            Some(raw) => clamp_count(raw, max),
            None => max,
        }
    }

    /// Persist a new inactive count and its `activeFear` shadow.
    ///
    /// Only a failed mirror write is an error; the shadow is best effort.
    ///
    /// Returns `Ok(false)` without touching the store when the caller is not
    /// privileged or the stored mirror already equals the clamped count.
    pub async fn write_mirror(&self, left: u32, max: u32) -> FearResult<bool> {
        if !self.role.is_privileged() {
            debug!(left, "Ignoring mirror write from unprivileged client");
            return Ok(false);
        }

        let left = left.min(max);
        if self.read_mirror_raw() == Some(left as f64) {
            return Ok(false);
        }

        self.world.set(&Self::mirror_key(), json!(left)).await?;

        // Shadow only; the mirror is already written.
        let shadow = SettingKey::module(ACTIVE_FEAR);
        if self.world.is_registered(&shadow) {
            if let Err(e) = self.world.set(&shadow, json!(max - left)).await {
                warn!(error = %e, "Could not update activeFear");
            }
        }
        info!(left, active = max - left, "Wrote mirror value");
        Ok(true)
    }
}
