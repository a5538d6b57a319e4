use crate::models::WorkspaceSnapshot;
use crate::storage::{load_json_from_storage, remove_from_storage, save_json_to_storage};
use serde::{Deserialize, Serialize};

/// Last known workspace, kept so the app can boot with the backend down.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OfflineSnapshot {
    pub saved_ms: i64,
    pub workspace: WorkspaceSnapshot,
}

pub(crate) fn save_workspace_snapshot(key: &str, workspace: WorkspaceSnapshot, saved_ms: i64) {
    if key.trim().is_empty() {
        return;
    }
    let snap = OfflineSnapshot {
        saved_ms,
        workspace,
    };
    save_json_to_storage(key, &snap);
}

pub(crate) fn load_workspace_snapshot(key: &str) -> Option<OfflineSnapshot> {
    if key.trim().is_empty() {
        return None;
    }
    load_json_from_storage::<OfflineSnapshot>(key)
}

pub(crate) fn clear_workspace_snapshot(key: &str) {
    remove_from_storage(key);
}
