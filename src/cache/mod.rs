pub(crate) mod workspace_snapshot;

pub(crate) use workspace_snapshot::{
    clear_workspace_snapshot, load_workspace_snapshot, save_workspace_snapshot, OfflineSnapshot,
};
