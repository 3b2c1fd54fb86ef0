//! Bounds resolver
//!
//! Derives the maximum fear from the game system's homebrew blob. The blob
//! may be missing, a JSON string, or an object, and it can change at any time
//! without telling us, so it is re-read on every call and never cached.
//! Nothing here fails: every malformed input resolves to [`DEFAULT_MAX_FEAR`].

use serde_json::Value;
use tracing::debug;

use crate::settings::SYSTEM_HOMEBREW;
use crate::store::SettingsStore;
use crate::types::SettingKey;
use crate::value::coerce_number;

/// Maximum fear when the system does not configure one
pub const DEFAULT_MAX_FEAR: u32 = 12;

/// Largest maximum accepted from the homebrew blob; anything above it is
/// treated as malformed
pub const MAX_FEAR_LIMIT: u32 = 500;

const MAX_FEAR_FIELD: &str = "maxFear";

/// Current maximum fear, read fresh from the world store
pub fn resolve_max<S: SettingsStore>(world: &S) -> u32 {
    let key = SettingKey::system(SYSTEM_HOMEBREW);
    if !world.is_registered(&key) {
        return DEFAULT_MAX_FEAR;
    }
    max_from_config(world.get(&key).as_ref())
}

/// Maximum fear from a raw homebrew value
pub fn max_from_config(raw: Option<&Value>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_MAX_FEAR;
    };

    let parsed;
    let config = match raw {
        Value::String(text) if text.is_empty() => return DEFAULT_MAX_FEAR,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(e) => {
                debug!(error = %e, "Homebrew setting is not valid JSON");
                return DEFAULT_MAX_FEAR;
            }
        },
        other => other,
    };

    let Some(field) = config.as_object().and_then(|o| o.get(MAX_FEAR_FIELD)) else {
        return DEFAULT_MAX_FEAR;
    };

    match coerce_number(field) {
        Some(n) if (1.0..(MAX_FEAR_LIMIT + 1) as f64).contains(&n) => n.floor() as u32,
        _ => {
            debug!(%field, "Homebrew maxFear is not a usable number");
            DEFAULT_MAX_FEAR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_missing_config_uses_default() {
        assert_eq!(max_from_config(None), 12);
        assert_eq!(max_from_config(Some(&Value::Null)), 12);
        assert_eq!(max_from_config(Some(&json!(""))), 12);
        assert_eq!(max_from_config(Some(&json!(false))), 12);
    }

    #[test]
    fn test_object_config() {
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 20 }))), 20);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": "15" }))), 15);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 9.8 }))), 9);
        assert_eq!(max_from_config(Some(&json!({ "maxHope": 6 }))), 12);
    }

    #[test]
    fn test_unusable_max_fear_uses_default() {
        assert_eq!(max_from_config(Some(&json!({ "maxFear": "oops" }))), 12);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 0 }))), 12);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": -4 }))), 12);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": null }))), 12);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": {} }))), 12);
    }

    #[test]
    fn test_oversized_max_fear_uses_default() {
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 500 }))), 500);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 500.9 }))), 500);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 501 }))), 12);
        assert_eq!(max_from_config(Some(&json!({ "maxFear": 1e12 }))), 12);
        assert_eq!(max_from_config(Some(&json!("{\"maxFear\": \"4294967296\"}"))), 12);
    }

    #[test]
    fn test_json_string_config() {
        assert_eq!(max_from_config(Some(&json!("{\"maxFear\": 8}"))), 8);
        assert_eq!(max_from_config(Some(&json!("{not json"))), 12);
        assert_eq!(max_from_config(Some(&json!("[1, 2]"))), 12);
    }

    #[test]
    fn test_non_object_config() {
        assert_eq!(max_from_config(Some(&json!(42))), 12);
        assert_eq!(max_from_config(Some(&json!([{ "maxFear": 3 }]))), 12);
    }

    #[tokio::test]
    async fn test_resolve_is_never_cached() {
        let world = MemoryStore::new();
        assert_eq!(resolve_max(&world), 12, "unregistered homebrew");

        let key = SettingKey::system(SYSTEM_HOMEBREW);
        world.register(&key, json!({}));
        assert_eq!(resolve_max(&world), 12);

        world.set(&key, json!({ "maxFear": 20 })).await.unwrap();
        assert_eq!(resolve_max(&world), 20);

        world.set(&key, json!({ "maxFear": 5 })).await.unwrap();
        assert_eq!(resolve_max(&world), 5);
    }
}
