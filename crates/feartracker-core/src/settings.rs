//! Settings registry
//!
//! Every setting the tracker reads or writes, with its scope and default.
//! World settings live in the store shared by every client; client settings
//! live in each client's own store.

use serde_json::{json, Value};

use crate::store::SettingsStore;
use crate::types::{Position, SettingKey, MODULE_ID};

/// Authoritative fear value owned by the game system
pub const SYSTEM_FEAR: &str = "ResourcesFear";
/// Game system homebrew blob carrying `maxFear`
pub const SYSTEM_HOMEBREW: &str = "Homebrew";

pub const LEFT_SIDE_COUNT: &str = "leftSideCount";
pub const ACTIVE_FEAR: &str = "activeFear";
pub const VISIBILITY: &str = "trackerVisible_v3";
pub const POSITION: &str = "largeTrackerPosition";
pub const THEME: &str = "theme";
pub const ENABLE_PULSE: &str = "enablePulse";
pub const PULSE_COLOR: &str = "pulseColor";
pub const ENABLE_SCALE_ANIMATION: &str = "enableScaleAnimation";
pub const TRACKER_SIZE: &str = "trackerSize";
pub const TRACKER_WIDTH: &str = "trackerWidth";
pub const HIDE_TRACKER_CLIENT: &str = "hideTrackerClient";
pub const HIDE_SYSTEM_BAR: &str = "hideSystemBar";

pub const SLIDER_IMAGE: &str = "sliderImage";
pub const PIP_ACTIVE_IMAGE: &str = "pipActiveImage";
pub const PIP_INACTIVE_IMAGE: &str = "pipInactiveImage";
pub const PLUS_IMAGE: &str = "plusImage";
pub const MINUS_IMAGE: &str = "minusImage";

/// Custom image settings paired with the stone theme file they default to
pub const CUSTOM_IMAGES: [(&str, &str); 5] = [
    (SLIDER_IMAGE, "slider.png"),
    (PIP_ACTIVE_IMAGE, "pip-active.png"),
    (PIP_INACTIVE_IMAGE, "pip-inactive.png"),
    (PLUS_IMAGE, "plus.png"),
    (MINUS_IMAGE, "minus.png"),
];

pub const DEFAULT_THEME: &str = "skull";
pub const DEFAULT_PULSE_COLOR: &str = "#6a0dad";
pub const DEFAULT_TRACKER_WIDTH: f64 = 700.0;
pub const MIN_TRACKER_WIDTH: f64 = 400.0;
pub const MAX_TRACKER_WIDTH: f64 = 2000.0;

/// Themes shipped with the module
pub const THEMES: [&str; 11] = [
    "blood-drop",
    "bones",
    "capybara",
    "custom",
    "demon",
    "fire",
    "ghost",
    "nuclear",
    "skull",
    "stone",
    "stone-red",
];

/// Where a setting is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Shared by every client; written only by the gamemaster
    World,
    /// Private to one client
    Client,
}

/// A registered module setting
#[derive(Debug, Clone)]
pub struct SettingSpec {
    pub key: &'static str,
    pub scope: Scope,
    pub default: Value,
}

/// All settings this module registers
pub fn module_settings() -> Vec<SettingSpec> {
    let world = |key, default| SettingSpec {
        key,
        scope: Scope::World,
        default,
    };
    let client = |key, default| SettingSpec {
        key,
        scope: Scope::Client,
        default,
    };

    let mut specs = vec![
        world(THEME, json!(DEFAULT_THEME)),
        world(ENABLE_PULSE, json!(true)),
        world(PULSE_COLOR, json!(DEFAULT_PULSE_COLOR)),
        world(ENABLE_SCALE_ANIMATION, json!(true)),
        client(TRACKER_SIZE, json!("normal")),
        client(TRACKER_WIDTH, json!(DEFAULT_TRACKER_WIDTH)),
    ];
    specs.extend(CUSTOM_IMAGES.iter().map(|(key, file)| {
        world(*key, json!(format!("modules/{}/images/stone/{}", MODULE_ID, file)))
    }));
    specs.extend([
        client(HIDE_TRACKER_CLIENT, json!(false)),
        client(HIDE_SYSTEM_BAR, json!(true)),
        world(LEFT_SIDE_COUNT, json!(crate::bounds::DEFAULT_MAX_FEAR)),
        world(ACTIVE_FEAR, json!(0)),
        world(VISIBILITY, json!(true)),
        client(POSITION, json!(Position::default())),
    ]);
    specs
}

/// Register every module setting in the store matching its scope
pub fn register_module_settings<S: SettingsStore>(world: &S, client: &S) {
    for spec in module_settings() {
        let store = match spec.scope {
            Scope::World => world,
            Scope::Client => client,
        };
        store.register(&SettingKey::module(spec.key), spec.default);
    }
}

/// Register the game system's settings, for hosts that stand in for it
pub fn register_system_settings<S: SettingsStore>(world: &S) {
    world.register(&SettingKey::system(SYSTEM_FEAR), json!(0));
    world.register(&SettingKey::system(SYSTEM_HOMEBREW), json!({}));
}

/// Read a boolean module setting, falling back when missing or mistyped
pub fn module_bool<S: SettingsStore>(store: &S, key: &str, fallback: bool) -> bool {
    store
        .get(&SettingKey::module(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(fallback)
}

/// Read a string module setting, falling back when missing or mistyped
pub fn module_string<S: SettingsStore>(store: &S, key: &str, fallback: &str) -> String {
    store
        .get(&SettingKey::module(key))
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

/// Read a numeric module setting, falling back when missing or mistyped
pub fn module_number<S: SettingsStore>(store: &S, key: &str, fallback: f64) -> f64 {
    store
        .get(&SettingKey::module(key))
        .and_then(|v| v.as_f64())
        .unwrap_or(fallback)
}

/// Read the stored overlay position
pub fn module_position<S: SettingsStore>(store: &S) -> Position {
    store
        .get(&SettingKey::module(POSITION))
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
