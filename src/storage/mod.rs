use serde::{Deserialize, Serialize};

pub(crate) const WORKSPACE_SNAPSHOT_KEY: &str = "vault_notes_workspace_snapshot";

#[cfg(target_arch = "wasm32")]
mod backend {
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }

    pub(super) fn get(key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }

    pub(super) fn set(key: &str, value: &str) {
        if let Some(storage) = local_storage() {
            if let Err(e) = storage.set_item(key, value) {
                // Usually quota exhaustion; the in-memory copy is still authoritative.
                tracing::warn!(key, error = ?e, "localStorage write failed");
            }
        }
    }

    pub(super) fn remove(key: &str) {
        if let Some(storage) = local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Process-local stand-in for `localStorage` outside the browser.
#[cfg(not(target_arch = "wasm32"))]
mod backend {
    use std::collections::BTreeMap;
    use std::sync::{Mutex, OnceLock};

    fn map() -> &'static Mutex<BTreeMap<String, String>> {
        static MAP: OnceLock<Mutex<BTreeMap<String, String>>> = OnceLock::new();
        MAP.get_or_init(|| Mutex::new(BTreeMap::new()))
    }

    pub(super) fn get(key: &str) -> Option<String> {
        map().lock().ok()?.get(key).cloned()
    }

    pub(super) fn set(key: &str, value: &str) {
        if let Ok(mut m) = map().lock() {
            m.insert(key.to_string(), value.to_string());
        }
    }

    pub(super) fn remove(key: &str) {
        if let Ok(mut m) = map().lock() {
            m.remove(key);
        }
    }
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let json = backend::get(key)?;
    match serde_json::from_str(&json) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable stored value");
            None
        }
    }
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => backend::set(key, &json),
        Err(e) => tracing::warn!(key, error = %e, "failed to serialize value for storage"),
    }
}

pub(crate) fn remove_from_storage(key: &str) {
    backend::remove(key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn json_round_trip_and_remove() {
        let key = "vault_notes_storage_test_round_trip";
        save_json_to_storage(key, &Sample { n: 7 });
        assert_eq!(load_json_from_storage::<Sample>(key), Some(Sample { n: 7 }));
        remove_from_storage(key);
        assert_eq!(load_json_from_storage::<Sample>(key), None);
    }

    #[test]
    fn unreadable_value_is_none() {
        let key = "vault_notes_storage_test_garbage";
        backend::set(key, "{not json");
        assert_eq!(load_json_from_storage::<Sample>(key), None);
    }
}
