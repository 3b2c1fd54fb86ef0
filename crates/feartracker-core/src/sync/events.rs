//! Typed change dispatch and session notifications
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  TrackerEvent: what a setting change means to the tracker       │
//! │  ├── AuthorityChanged: game system fear value written           │
//! │  ├── BoundsChanged: homebrew blob (maxFear) written             │
//! │  ├── MirrorChanged: leftSideCount written                       │
//! │  ├── VisibilityChanged / PulseColorChanged / AppearanceChanged  │
//! │  ├── SystemBarPreferenceChanged / PositionChanged               │
//! │  └── Unrelated                                                  │
//! │                                                                 │
//! │  SessionEvent: what the session did, for hosts and tests        │
//! │  ├── Rendered: full rebuild or incremental update               │
//! │  └── Notice: user-facing message                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;

use crate::render::RenderAction;
use crate::settings::{
    ENABLE_PULSE, ENABLE_SCALE_ANIMATION, HIDE_SYSTEM_BAR, HIDE_TRACKER_CLIENT, LEFT_SIDE_COUNT,
    MINUS_IMAGE, PIP_ACTIVE_IMAGE, PIP_INACTIVE_IMAGE, PLUS_IMAGE, POSITION, PULSE_COLOR,
    SLIDER_IMAGE, SYSTEM_FEAR, SYSTEM_HOMEBREW, THEME, TRACKER_SIZE, TRACKER_WIDTH, VISIBILITY,
};
use crate::store::SettingChange;
use crate::value::AuthoritativeValue;

/// A setting change classified by what it means to the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    AuthorityChanged(AuthoritativeValue),
    BoundsChanged,
    MirrorChanged(Value),
    VisibilityChanged,
    PulseColorChanged,
    AppearanceChanged,
    SystemBarPreferenceChanged,
    PositionChanged,
    Unrelated,
}

impl TrackerEvent {
    pub fn classify(change: &SettingChange) -> Self {
        let key = &change.key;

        if key.is_system() {
            return match key.key.as_str() {
                SYSTEM_FEAR => TrackerEvent::AuthorityChanged(AuthoritativeValue::decode(
                    &change.value,
                )),
                SYSTEM_HOMEBREW => TrackerEvent::BoundsChanged,
                _ => TrackerEvent::Unrelated,
            };
        }
        if !key.is_module() {
            return TrackerEvent::Unrelated;
        }

        match key.key.as_str() {
            LEFT_SIDE_COUNT => TrackerEvent::MirrorChanged(change.value.clone()),
            VISIBILITY => TrackerEvent::VisibilityChanged,
            PULSE_COLOR => TrackerEvent::PulseColorChanged,
            THEME | ENABLE_PULSE | ENABLE_SCALE_ANIMATION | TRACKER_SIZE | TRACKER_WIDTH
            | HIDE_TRACKER_CLIENT | SLIDER_IMAGE | PIP_ACTIVE_IMAGE | PIP_INACTIVE_IMAGE
            | PLUS_IMAGE | MINUS_IMAGE => TrackerEvent::AppearanceChanged,
            HIDE_SYSTEM_BAR => TrackerEvent::SystemBarPreferenceChanged,
            POSITION => TrackerEvent::PositionChanged,
            _ => TrackerEvent::Unrelated,
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Events emitted by a tracker session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The surface was redrawn
    Rendered {
        action: RenderAction,
        left_side_count: u32,
        max: u32,
    },
    /// A message meant for the user
    Notice { level: NoticeLevel, message: String },
}
