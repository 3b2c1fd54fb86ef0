//! Core types for Fear Tracker

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Namespace owned by this module
pub const MODULE_ID: &str = "daggerheart-fear-tracker";

/// Namespace owned by the game system
pub const SYSTEM_ID: &str = "daggerheart";

/// Unique identifier for a connected client
///
/// Uses ULID so ids sort by connection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Ulid);

impl ClientId {
    /// Create a new ClientId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client_{}", self.0)
    }
}

/// Role of the user behind a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Host of the table; the only role allowed to write world state
    Gamemaster,
    /// Everyone else
    Player,
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Gamemaster)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gm" | "gamemaster" => Ok(Role::Gamemaster),
            "player" => Ok(Role::Player),
            _ => Err(format!("Unknown role: {}. Valid options: gm, player", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Gamemaster => write!(f, "gm"),
            Role::Player => write!(f, "player"),
        }
    }
}

/// A namespaced setting key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettingKey {
    pub namespace: String,
    pub key: String,
}

impl SettingKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Key in this module's namespace
    pub fn module(key: impl Into<String>) -> Self {
        Self::new(MODULE_ID, key)
    }

    /// Key in the game system's namespace
    pub fn system(key: impl Into<String>) -> Self {
        Self::new(SYSTEM_ID, key)
    }

    /// Parse a `namespace.key` string. The key may itself contain dots.
    pub fn parse(full: &str) -> Option<Self> {
        let (namespace, key) = full.split_once('.')?;
        if namespace.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(namespace, key))
    }

    pub fn is_module(&self) -> bool {
        self.namespace == MODULE_ID
    }

    pub fn is_system(&self) -> bool {
        self.namespace == SYSTEM_ID
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// Overlay position as CSS lengths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub left: String,
    pub top: String,
}

impl Position {
    pub fn new(left: impl Into<String>, top: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            top: top.into(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new("100px", "100px")
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "left: {}, top: {}", self.left, self.top)
    }
}

/// A coordinate passed to the reposition API
#[derive(Debug, Clone, PartialEq)]
pub enum Length {
    /// Pixels
    Px(f64),
    /// Any CSS length, used verbatim
    Css(String),
}

impl Length {
    pub fn to_css(&self) -> String {
        match self {
            Length::Px(px) => format_px(*px),
            Length::Css(s) => s.clone(),
        }
    }
}

impl From<f64> for Length {
    fn from(px: f64) -> Self {
        Length::Px(px)
    }
}

impl From<&str> for Length {
    fn from(s: &str) -> Self {
        Length::Css(s.to_string())
    }
}

/// Format a pixel amount the way CSS style strings are written
pub fn format_px(px: f64) -> String {
    format!("{}px", px)
}
