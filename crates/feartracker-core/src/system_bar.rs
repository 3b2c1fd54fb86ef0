//! Hide the game system's own fear bar
//!
//! The system keeps a client-side `displayFear` preference inside one of its
//! settings blobs. When `hideSystemBar` is on, every client-scope entry that
//! carries that field is rewritten to `"hide"`, keeping the blob's shape
//! (JSON text stays JSON text, objects stay objects).

use serde_json::Value;
use tracing::{debug, warn};

use crate::settings::{module_bool, HIDE_SYSTEM_BAR};
use crate::store::SettingsStore;

const DISPLAY_FEAR: &str = "displayFear";
const HIDE: &str = "hide";

/// Rewrite `displayFear` to `"hide"` in a raw entry, if it needs it
fn hidden_variant(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(text) if text.contains(DISPLAY_FEAR) => {
            let parsed: Value = serde_json::from_str(text).ok()?;
            let rewritten = hidden_variant(&parsed)?;
            serde_json::to_string(&rewritten).ok().map(Value::String)
        }
        Value::Object(fields) => {
            let current = fields.get(DISPLAY_FEAR)?;
            if current.as_str() == Some(HIDE) {
                return None;
            }
            let mut fields = fields.clone();
            fields.insert(DISPLAY_FEAR.to_string(), Value::String(HIDE.to_string()));
            Some(Value::Object(fields))
        }
        _ => None,
    }
}

/// Hide the system bar when the client asks for it.
///
/// Returns how many entries were rewritten. Entries the store refuses are
/// logged and skipped.
pub async fn hide_system_bar<S: SettingsStore>(client: &S) -> usize {
    if !module_bool(client, HIDE_SYSTEM_BAR, true) {
        return 0;
    }

    let mut rewritten = 0;
    for (key, raw) in client.entries() {
        let Some(hidden) = hidden_variant(&raw) else {
            continue;
        };
        match client.set(&key, hidden).await {
            Ok(()) => {
                debug!(%key, "Set system fear display to hide");
                rewritten += 1;
            }
            Err(e) => warn!(%key, error = %e, "Could not hide system fear bar"),
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::register_module_settings;
    use crate::store::MemoryStore;
    use crate::types::SettingKey;
    use serde_json::json;

    fn client() -> MemoryStore {
        let client = MemoryStore::new();
        register_module_settings(&MemoryStore::new(), &client);
        client
    }

    #[test]
    fn test_hidden_variant_shapes() {
        assert_eq!(
            hidden_variant(&json!({ "displayFear": "token", "other": 1 })),
            Some(json!({ "displayFear": "hide", "other": 1 }))
        );
        assert_eq!(hidden_variant(&json!({ "displayFear": "hide" })), None);
        assert_eq!(
            hidden_variant(&json!("{\"displayFear\":\"bar\"}")),
            Some(json!("{\"displayFear\":\"hide\"}"))
        );
        assert_eq!(hidden_variant(&json!("displayFear is not json")), None);
        assert_eq!(hidden_variant(&json!({ "display": "bar" })), None);
    }

    #[tokio::test]
    async fn test_rewrites_system_preferences() {
        let client = client();
        let appearance = SettingKey::system("appearance");
        client.register(&appearance, json!({ "displayFear": "token", "dice": "3d" }));

        assert_eq!(hide_system_bar(&client).await, 1);
        assert_eq!(
            client.get(&appearance),
            Some(json!({ "displayFear": "hide", "dice": "3d" }))
        );
        assert_eq!(hide_system_bar(&client).await, 0);
    }

    #[tokio::test]
    async fn test_respects_preference() {
        let client = client();
        let appearance = SettingKey::system("appearance");
        client.register(&appearance, json!({ "displayFear": "token" }));
        client
            .set(&SettingKey::module(HIDE_SYSTEM_BAR), json!(false))
            .await
            .unwrap();

        assert_eq!(hide_system_bar(&client).await, 0);
        assert_eq!(client.get(&appearance), Some(json!({ "displayFear": "token" })));
    }
}
