//! Theme assets and size presets

use crate::settings::{
    module_string, DEFAULT_THEME, MINUS_IMAGE, PIP_ACTIVE_IMAGE, PIP_INACTIVE_IMAGE, PLUS_IMAGE,
    SLIDER_IMAGE, THEME, THEMES,
};
use crate::store::SettingsStore;
use crate::types::MODULE_ID;

const CUSTOM_THEME: &str = "custom";
const FALLBACK_THEME_DIR: &str = "stone";

/// A themed image slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Slider,
    PipActive,
    PipInactive,
    Plus,
    Minus,
}

impl AssetKind {
    fn file(&self) -> &'static str {
        match self {
            AssetKind::Slider => "slider.png",
            AssetKind::PipActive => "pip-active.png",
            AssetKind::PipInactive => "pip-inactive.png",
            AssetKind::Plus => "plus.png",
            AssetKind::Minus => "minus.png",
        }
    }

    fn custom_setting(&self) -> &'static str {
        match self {
            AssetKind::Slider => SLIDER_IMAGE,
            AssetKind::PipActive => PIP_ACTIVE_IMAGE,
            AssetKind::PipInactive => PIP_INACTIVE_IMAGE,
            AssetKind::Plus => PLUS_IMAGE,
            AssetKind::Minus => MINUS_IMAGE,
        }
    }
}

fn bundled(theme: &str, kind: AssetKind) -> String {
    format!("modules/{}/images/{}/{}", MODULE_ID, theme, kind.file())
}

/// Image path for one asset under the configured theme
pub fn theme_asset<S: SettingsStore>(world: &S, kind: AssetKind) -> String {
    let theme = module_string(world, THEME, DEFAULT_THEME);
    if theme == CUSTOM_THEME {
        let fallback = bundled(FALLBACK_THEME_DIR, kind);
        return module_string(world, kind.custom_setting(), &fallback);
    }
    if THEMES.contains(&theme.as_str()) {
        bundled(&theme, kind)
    } else {
        bundled(DEFAULT_THEME, kind)
    }
}

/// Resolved images for one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeAssets {
    pub slider: String,
    pub pip_active: String,
    pub pip_inactive: String,
    pub plus: String,
    pub minus: String,
}

impl ThemeAssets {
    pub fn resolve<S: SettingsStore>(world: &S) -> Self {
        Self {
            slider: theme_asset(world, AssetKind::Slider),
            pip_active: theme_asset(world, AssetKind::PipActive),
            pip_inactive: theme_asset(world, AssetKind::PipInactive),
            plus: theme_asset(world, AssetKind::Plus),
            minus: theme_asset(world, AssetKind::Minus),
        }
    }
}

/// Client-side size preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerSize {
    Small,
    Normal,
    Large,
}

impl TrackerSize {
    /// Unknown values fall back to normal
    pub fn from_setting(value: &str) -> Self {
        match value {
            "small" => TrackerSize::Small,
            "large" => TrackerSize::Large,
            _ => TrackerSize::Normal,
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            TrackerSize::Small => 0.6,
            TrackerSize::Normal => 1.0,
            TrackerSize::Large => 1.4,
        }
    }

    /// Vertical nudge that keeps pips centered on the slider art
    pub fn pip_margin_top(&self) -> &'static str {
        match self {
            TrackerSize::Small => "-1px",
            TrackerSize::Normal => "-2px",
            TrackerSize::Large => "-1px",
        }
    }
}
