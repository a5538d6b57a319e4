pub mod drag;
pub mod nested;
pub mod sync;
pub mod templates;
pub mod workspace;

use crate::api::{ApiError, EnvConfig};
use crate::cache::{
    clear_workspace_snapshot, load_workspace_snapshot, save_workspace_snapshot, OfflineSnapshot,
};
use crate::errors::{StoreError, StoreResult};
use crate::models::nested::{LayoutSizes, LayoutTemplate};
use crate::models::{
    Block, BlockType, Category, Page, PageMetaPatch, PageTemplate, WorkspaceSnapshot,
};
use crate::reorder::DropTarget;
use crate::storage::WORKSPACE_SNAPSHOT_KEY;
use crate::util::{is_tmp_id, Clock, SystemClock};
use leptos::prelude::*;
use std::sync::Arc;
use sync::{Outbound, SyncCoalescer, SyncNotice};
use workspace::{BlockDeletion, CategoryDeletion, ColumnDeletion, PageDeletion, Workspace};

/// Sole writer of pages, blocks and categories.
///
/// Every mutation lands in the `RwSignal` synchronously and then tells the
/// coalescer what to persist; nothing here awaits the network. Clones share
/// the same state.
#[derive(Clone)]
pub struct DocumentStore {
    state: RwSignal<Workspace>,
    sync: SyncCoalescer,

    /// Page templates as last fetched; not part of the workspace snapshot.
    templates: RwSignal<Vec<PageTemplate>>,
    clock: Arc<dyn Clock>,

    /// Server-side refusals waiting to be shown.
    notices: RwSignal<Vec<SyncNotice>>,

    /// Connectivity state to backend API.
    backend_online: RwSignal<bool>,
    last_backend_error: RwSignal<Option<String>>,

    cache_key: Arc<str>,
}

impl DocumentStore {
    pub fn new(config: &EnvConfig) -> Self {
        Self::with_clock(config.autosave_ms, Arc::new(SystemClock), WORKSPACE_SNAPSHOT_KEY)
    }

    pub fn with_clock(quiet_ms: u32, clock: Arc<dyn Clock>, cache_key: &str) -> Self {
        Self {
            state: RwSignal::new(Workspace::default()),
            sync: SyncCoalescer::new(quiet_ms),
            templates: RwSignal::new(vec![]),
            clock,
            notices: RwSignal::new(vec![]),
            backend_online: RwSignal::new(true),
            last_backend_error: RwSignal::new(None),
            cache_key: Arc::from(cache_key),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn sync(&self) -> &SyncCoalescer {
        &self.sync
    }

    /// Reactive read-only handle for the rendering surface.
    pub fn workspace(&self) -> ReadSignal<Workspace> {
        self.state.read_only()
    }

    /// Tracked read.
    pub fn read<R>(&self, f: impl FnOnce(&Workspace) -> R) -> R {
        self.state.with(f)
    }

    /// Untracked read of the live state, for event handlers and the worker.
    pub fn read_untracked<R>(&self, f: impl FnOnce(&Workspace) -> R) -> R {
        self.state.with_untracked(f)
    }

    pub fn page_snapshot(&self, page_id: &str) -> Option<Page> {
        self.read_untracked(|ws| ws.page(page_id).ok().cloned())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Workspace) -> StoreResult<R>) -> StoreResult<R> {
        self.state.try_update(f).unwrap_or(Err(StoreError::Disposed))
    }

    /// Schedules a save for an edited page; a temp page also needs its create.
    fn page_touched(&self, page_id: &str, now_ms: i64) {
        self.sync.notify(page_id, now_ms);
        if is_tmp_id(page_id) {
            let category = self.read_untracked(|ws| ws.category_of(page_id).map(String::from));
            self.sync.ensure_page_created(page_id, category);
        }
    }

    /// Runs a content edit on one page and schedules its save.
    fn edit_page<R>(
        &self,
        page_id: &str,
        f: impl FnOnce(&mut Workspace, i64) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let now = self.now_ms();
        let out = self.mutate(|ws| f(ws, now))?;
        self.page_touched(page_id, now);
        Ok(out)
    }

    // ---- loading ----

    /// Replaces the whole workspace with a fetch-all payload.
    pub fn hydrate(&self, snapshot: WorkspaceSnapshot) {
        let now = self.now_ms();
        let ws = Workspace::from_snapshot(snapshot, now);
        let tmp_categories: Vec<String> = ws
            .category_order
            .iter()
            .filter(|id| is_tmp_id(id))
            .cloned()
            .collect();
        let tmp_pages: Vec<String> = ws
            .pages
            .iter()
            .map(|p| p.id.clone())
            .filter(|id| is_tmp_id(id))
            .collect();
        tracing::info!(
            pages = ws.pages.len(),
            categories = ws.categories.len(),
            "workspace hydrated"
        );
        self.state.set(ws);

        for id in tmp_categories {
            self.sync.ensure_category_created(&id);
        }
        for id in tmp_pages {
            self.page_touched(&id, now);
        }
    }

    /// Hydrates from the offline snapshot. Every page is rescheduled since
    /// edits made while offline may never have reached the server.
    pub fn hydrate_offline(&self, snapshot: WorkspaceSnapshot) {
        self.hydrate(snapshot);
        let now = self.now_ms();
        let ids: Vec<String> = self.read_untracked(|ws| ws.pages.iter().map(|p| p.id.clone()).collect());
        for id in ids {
            self.page_touched(&id, now);
        }
    }

    // ---- pages ----

    pub fn create_page(&self, title: Option<&str>, category: Option<&str>) -> StoreResult<String> {
        let now = self.now_ms();
        let id = self.mutate(|ws| ws.create_page(title, category, now))?;
        tracing::debug!(page_id = %id, "page created locally");
        self.sync
            .ensure_page_created(&id, category.map(String::from));
        Ok(id)
    }

    pub fn update_page_meta(&self, page_id: &str, patch: PageMetaPatch) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.update_page_meta(page_id, patch, now))
    }

    pub fn set_active_page(&self, page_id: &str) -> StoreResult<()> {
        self.mutate(|ws| ws.set_active_page(page_id))?;
        self.sync.enqueue(Outbound::SetActivePage {
            page_id: Some(page_id.to_string()),
        });
        Ok(())
    }

    pub fn delete_page(&self, page_id: &str) -> StoreResult<PageDeletion> {
        let now = self.now_ms();
        let outcome = self.mutate(|ws| ws.delete_page(page_id, now))?;
        self.sync.cancel(page_id);
        if !is_tmp_id(page_id) || self.sync.forget_local(page_id) {
            self.sync.enqueue(Outbound::DeletePage {
                page_id: page_id.to_string(),
            });
        }
        if let PageDeletion::ReplacedWithDefault { new_page_id } = &outcome {
            self.sync.ensure_page_created(new_page_id, None);
        }
        Ok(outcome)
    }

    pub fn reorder_pages(&self, from: usize, to: usize) -> StoreResult<bool> {
        let changed = self.mutate(|ws| ws.reorder_pages(from, to))?;
        if changed {
            self.sync.enqueue(Outbound::ReorderPages);
        }
        Ok(changed)
    }

    pub fn move_page(&self, active_id: &str, over_id: &str) -> StoreResult<bool> {
        let changed = self.mutate(|ws| ws.move_page(active_id, over_id))?;
        if changed {
            self.sync.enqueue(Outbound::ReorderPages);
        }
        Ok(changed)
    }

    pub fn reorder_page_list(&self, category: Option<&str>, order: &[String]) -> StoreResult<bool> {
        let changed = self.mutate(|ws| ws.reorder_page_list(category, order))?;
        if changed {
            self.sync.enqueue(Outbound::ReorderPages);
        }
        Ok(changed)
    }

    pub fn move_page_to_category(
        &self,
        page_id: &str,
        category: Option<&str>,
        target: &DropTarget,
    ) -> StoreResult<()> {
        let now = self.now_ms();
        self.mutate(|ws| ws.move_page_to_category(page_id, category, target, now))?;
        self.sync.enqueue(Outbound::MovePageToCategory {
            page_id: page_id.to_string(),
            category_id: category.map(String::from),
        });
        self.sync.enqueue(Outbound::ReorderPages);
        if is_tmp_id(page_id) {
            self.sync
                .ensure_page_created(page_id, category.map(String::from));
        }
        Ok(())
    }

    // ---- blocks ----

    pub fn add_block(&self, page_id: &str, after: Option<&str>, block_type: BlockType) -> StoreResult<String> {
        self.edit_page(page_id, |ws, now| ws.add_block(page_id, after, block_type, now))
    }

    /// The hot path: called on every content change in the editor.
    pub fn update_block(&self, page_id: &str, block_id: &str, content: &str) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.update_block(page_id, block_id, content, now))
    }

    pub fn change_block_type(&self, page_id: &str, block_id: &str, block_type: BlockType) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| {
            ws.change_block_type(page_id, block_id, block_type, now)
        })
    }

    pub fn delete_block(&self, page_id: &str, block_id: &str) -> StoreResult<BlockDeletion> {
        self.edit_page(page_id, |ws, now| ws.delete_block(page_id, block_id, now))
    }

    pub fn reorder_blocks(&self, page_id: &str, from: usize, to: usize) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, _| ws.reorder_blocks(page_id, from, to))
    }

    pub fn move_block(&self, page_id: &str, active_id: &str, over: Option<&str>) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, now| ws.move_block(page_id, active_id, over, now))
    }

    /// Swaps in a whole block sequence; the hook a caller-side undo stack uses.
    pub fn replace_blocks(&self, page_id: &str, blocks: Vec<Block>) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.replace_blocks(page_id, blocks, now))
    }

    // ---- categories ----

    pub fn create_category(&self, name: &str) -> StoreResult<String> {
        let now = self.now_ms();
        let id = self.mutate(|ws| ws.create_category(name, now))?;
        self.sync.ensure_category_created(&id);
        Ok(id)
    }

    pub fn rename_category(&self, category_id: &str, name: &str) -> StoreResult<bool> {
        let changed = self.mutate(|ws| ws.rename_category(category_id, name))?;
        if changed {
            if is_tmp_id(category_id) {
                // The create sends the current name.
                self.sync.ensure_category_created(category_id);
            } else {
                self.sync.enqueue(Outbound::RenameCategory {
                    category_id: category_id.to_string(),
                });
            }
        }
        Ok(changed)
    }

    /// Refused locally, before any network call, while pages remain assigned.
    pub fn delete_category(&self, category_id: &str) -> StoreResult<CategoryDeletion> {
        let outcome = self.mutate(|ws| ws.delete_category(category_id))?;
        if outcome == CategoryDeletion::Deleted
            && (!is_tmp_id(category_id) || self.sync.forget_local(category_id))
        {
            self.sync.enqueue(Outbound::DeleteCategory {
                category_id: category_id.to_string(),
            });
        }
        Ok(outcome)
    }

    pub fn reorder_categories(&self, from: usize, to: usize) -> StoreResult<bool> {
        let changed = self.mutate(|ws| ws.reorder_categories(from, to))?;
        if changed {
            self.sync.enqueue(Outbound::ReorderCategories);
        }
        Ok(changed)
    }

    pub fn move_category(&self, active_id: &str, over: Option<&str>) -> StoreResult<bool> {
        let changed = self.mutate(|ws| ws.move_category(active_id, over))?;
        if changed {
            self.sync.enqueue(Outbound::ReorderCategories);
        }
        Ok(changed)
    }

    // ---- nested: kanban ----

    pub fn add_card(&self, page_id: &str, block_id: &str, column_id: &str, title: &str) -> StoreResult<String> {
        self.edit_page(page_id, |ws, now| ws.add_card(page_id, block_id, column_id, title, now))
    }

    pub fn rename_card(&self, page_id: &str, block_id: &str, card_id: &str, title: &str) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.rename_card(page_id, block_id, card_id, title, now))
    }

    pub fn delete_card(&self, page_id: &str, block_id: &str, card_id: &str) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.delete_card(page_id, block_id, card_id, now))
    }

    pub fn add_column(&self, page_id: &str, block_id: &str, title: &str) -> StoreResult<String> {
        self.edit_page(page_id, |ws, now| ws.add_column(page_id, block_id, title, now))
    }

    pub fn rename_column(&self, page_id: &str, block_id: &str, column_id: &str, title: &str) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| {
            ws.rename_column(page_id, block_id, column_id, title, now)
        })
    }

    pub fn delete_column(&self, page_id: &str, block_id: &str, column_id: &str) -> StoreResult<ColumnDeletion> {
        self.edit_page(page_id, |ws, now| ws.delete_column(page_id, block_id, column_id, now))
    }

    pub fn reorder_columns(&self, page_id: &str, block_id: &str, from: usize, to: usize) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, now| ws.reorder_columns(page_id, block_id, from, to, now))
    }

    pub fn move_column(&self, page_id: &str, block_id: &str, column_id: &str, over: Option<&str>) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, now| ws.move_column(page_id, block_id, column_id, over, now))
    }

    pub fn reorder_cards(
        &self,
        page_id: &str,
        block_id: &str,
        column_id: &str,
        from: usize,
        to: usize,
    ) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, now| {
            ws.reorder_cards(page_id, block_id, column_id, from, to, now)
        })
    }

    pub fn move_card(
        &self,
        page_id: &str,
        block_id: &str,
        card_id: &str,
        to_column: &str,
        over: Option<&str>,
    ) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, now| {
            ws.move_card(page_id, block_id, card_id, to_column, over, now)
        })
    }

    // ---- nested: layout ----

    pub fn set_layout_template(&self, page_id: &str, block_id: &str, template: LayoutTemplate) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.set_layout_template(page_id, block_id, template, now))
    }

    pub fn set_layout_sizes(&self, page_id: &str, block_id: &str, sizes: Option<LayoutSizes>) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.set_layout_sizes(page_id, block_id, sizes, now))
    }

    pub fn add_slot_block(
        &self,
        page_id: &str,
        block_id: &str,
        slot: &str,
        after: Option<&str>,
        block_type: BlockType,
    ) -> StoreResult<String> {
        self.edit_page(page_id, |ws, now| {
            ws.add_slot_block(page_id, block_id, slot, after, block_type, now)
        })
    }

    pub fn update_slot_block(
        &self,
        page_id: &str,
        block_id: &str,
        slot: &str,
        inner_id: &str,
        content: &str,
    ) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| {
            ws.update_slot_block(page_id, block_id, slot, inner_id, content, now)
        })
    }

    pub fn delete_slot_block(
        &self,
        page_id: &str,
        block_id: &str,
        slot: &str,
        inner_id: &str,
    ) -> StoreResult<BlockDeletion> {
        self.edit_page(page_id, |ws, now| {
            ws.delete_slot_block(page_id, block_id, slot, inner_id, now)
        })
    }

    pub fn move_slot_block(
        &self,
        page_id: &str,
        block_id: &str,
        inner_id: &str,
        to_slot: &str,
        over: Option<&str>,
    ) -> StoreResult<bool> {
        self.edit_page(page_id, |ws, now| {
            ws.move_slot_block(page_id, block_id, inner_id, to_slot, over, now)
        })
    }

    // ---- nested: toggle ----

    pub fn set_toggle_header(&self, page_id: &str, block_id: &str, header: &str) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| ws.set_toggle_header(page_id, block_id, header, now))
    }

    pub fn add_toggle_block(
        &self,
        page_id: &str,
        block_id: &str,
        after: Option<&str>,
        block_type: BlockType,
    ) -> StoreResult<String> {
        self.edit_page(page_id, |ws, now| {
            ws.add_toggle_block(page_id, block_id, after, block_type, now)
        })
    }

    pub fn update_toggle_block(&self, page_id: &str, block_id: &str, inner_id: &str, content: &str) -> StoreResult<()> {
        self.edit_page(page_id, |ws, now| {
            ws.update_toggle_block(page_id, block_id, inner_id, content, now)
        })
    }

    pub fn delete_toggle_block(&self, page_id: &str, block_id: &str, inner_id: &str) -> StoreResult<BlockDeletion> {
        self.edit_page(page_id, |ws, now| {
            ws.delete_toggle_block(page_id, block_id, inner_id, now)
        })
    }

    // ---- reconciliation intake ----

    /// Full replace of one page with the server's copy; nothing is scheduled.
    pub fn reconcile_page(&self, page: Page) -> StoreResult<()> {
        let now = self.now_ms();
        let id = page.id.clone();
        self.mutate(|ws| ws.reconcile_page(page, now))?;
        tracing::info!(page_id = %id, "page reconciled from server");
        Ok(())
    }

    /// Applies a renamed-save response; see [`Workspace::reconcile_saved_page`].
    pub fn reconcile_saved_page(&self, sent: &Page, corrected: Page) -> StoreResult<()> {
        let now = self.now_ms();
        let id = corrected.id.clone();
        let merged = self.mutate(|ws| ws.reconcile_saved_page(sent, corrected, now))?;
        if merged {
            // The pending save now uploads the local edits under the new prefix.
            self.sync.notify(&id, now);
            tracing::info!(page_id = %id, "renamed page merged into newer local edits");
        } else {
            tracing::info!(page_id = %id, "page reconciled from server");
        }
        Ok(())
    }

    pub fn reconcile_category(&self, category: Category) -> StoreResult<Vec<String>> {
        let id = category.id.clone();
        let touched = self.mutate(|ws| ws.reconcile_category(category))?;
        tracing::info!(category_id = %id, pages = touched.len(), "category reconciled from server");
        Ok(touched)
    }

    /// Adopts the server id of a page created optimistically and schedules what
    /// the create alone did not persist.
    pub fn resolve_created_page(&self, local_id: &str, created: Page) {
        let real = created.id;
        self.sync.resolve_alias(local_id, &real);
        if let Err(e) = self.mutate(|ws| ws.resolve_created_page(local_id, &real)) {
            // Deleted while the create was in flight; the queued delete now targets `real`.
            tracing::debug!(local_id, error = %e, "created page no longer present");
            return;
        }
        tracing::info!(local_id, page_id = %real, "page create confirmed");

        let now = self.now_ms();
        self.sync.notify(&real, now);
        self.sync.enqueue(Outbound::ReorderPages);
        let (category, is_current) = self.read_untracked(|ws| {
            (
                ws.category_of(&real).map(String::from),
                ws.current_page_id.as_deref() == Some(real.as_str()),
            )
        });
        if category.is_some() {
            self.sync.enqueue(Outbound::MovePageToCategory {
                page_id: real.clone(),
                category_id: category,
            });
        }
        if is_current {
            self.sync.enqueue(Outbound::SetActivePage {
                page_id: Some(real),
            });
        }
    }

    pub fn resolve_created_category(&self, local_id: &str, created: Category) {
        self.sync.resolve_alias(local_id, &created.id);
        match self.mutate(|ws| ws.resolve_created_category(local_id, &created)) {
            Ok(renamed_meanwhile) => {
                tracing::info!(local_id, category_id = %created.id, "category create confirmed");
                if renamed_meanwhile {
                    self.sync.enqueue(Outbound::RenameCategory {
                        category_id: created.id.clone(),
                    });
                }
                self.sync.enqueue(Outbound::ReorderCategories);
            }
            Err(e) => tracing::debug!(local_id, error = %e, "created category no longer present"),
        }
    }

    // ---- notices & connectivity ----

    pub fn notices(&self) -> ReadSignal<Vec<SyncNotice>> {
        self.notices.read_only()
    }

    pub fn push_notice(&self, notice: SyncNotice) {
        self.notices.update(|n| n.push(notice));
    }

    pub fn take_notices(&self) -> Vec<SyncNotice> {
        let mut out = vec![];
        self.notices.update(|n| out = std::mem::take(n));
        out
    }

    pub fn is_backend_online(&self) -> bool {
        self.backend_online.get_untracked()
    }

    pub fn last_backend_error(&self) -> Option<String> {
        self.last_backend_error.get_untracked()
    }

    pub(crate) fn mark_online(&self) {
        if !self.backend_online.get_untracked() {
            tracing::info!("backend reachable again");
        }
        self.backend_online.set(true);
        self.last_backend_error.set(None);
    }

    pub(crate) fn mark_offline(&self, e: &ApiError) {
        self.last_backend_error.set(Some(e.to_string()));
        if e.is_network() {
            self.backend_online.set(false);
        }
    }

    // ---- offline snapshot ----

    pub fn save_offline_snapshot(&self) {
        let snapshot = self.read_untracked(Workspace::to_snapshot);
        save_workspace_snapshot(&self.cache_key, snapshot, self.now_ms());
    }

    pub(crate) fn load_offline_snapshot(&self) -> Option<OfflineSnapshot> {
        load_workspace_snapshot(&self.cache_key)
    }

    pub fn clear_offline_snapshot(&self) {
        clear_workspace_snapshot(&self.cache_key);
    }
}

/// Makes the store available to every component below the caller.
pub fn provide_store(store: DocumentStore) {
    provide_context(store);
}

pub fn use_store() -> Option<DocumentStore> {
    use_context::<DocumentStore>()
}


#[cfg(test)]
mod tests {
    use super::test_support::test_store;
    use super::*;

    #[test]
    fn create_page_is_active_and_scheduled_for_create() {
        let (store, _clock) = test_store(1000);
        let id = store.create_page(Some("Inbox"), None).unwrap();
        assert!(is_tmp_id(&id));
        assert!(store.sync().is_creating(&id));
        store.read_untracked(|ws| {
            assert_eq!(ws.current_page_id.as_deref(), Some(id.as_str()));
            assert_eq!(ws.page(&id).unwrap().title, "Inbox");
            assert_eq!(ws.page(&id).unwrap().blocks.len(), 1);
        });
    }

    #[test]
    fn block_move_scenario_schedules_save() {
        let (store, clock) = test_store(1000);
        let page = store.create_page(None, None).unwrap();
        let first = store.read_untracked(|ws| ws.page(&page).unwrap().blocks[0].id.clone());
        let second = store.add_block(&page, Some(&first), BlockType::Paragraph).unwrap();
        let third = store.add_block(&page, Some(&second), BlockType::Paragraph).unwrap();

        clock.advance(10);
        assert_eq!(store.reorder_blocks(&page, 0, 2), Ok(true));
        let ids = store.read_untracked(|ws| ws.block_ids(&page).unwrap());
        assert_eq!(ids, vec![second, third, first]);
        assert_eq!(store.sync().pending_save(&page), Some(clock.now_ms() + 1000));
    }

    #[test]
    fn populated_category_delete_is_refused_without_network_call() {
        let (store, _clock) = test_store(1000);
        let cat = store.create_category("Work").unwrap();
        store.create_page(Some("P"), Some(&cat)).unwrap();
        let queued = store.sync().outbox_len();

        assert_eq!(
            store.delete_category(&cat),
            Ok(CategoryDeletion::Refused { member_count: 1 })
        );
        assert_eq!(store.sync().outbox_len(), queued);
        store.read_untracked(|ws| {
            assert_eq!(ws.category_order, vec![cat.clone()]);
            assert_eq!(ws.member_count(&cat), 1);
        });
    }

    #[test]
    fn deleting_last_page_synthesizes_default_and_drops_unsent_create() {
        let (store, _clock) = test_store(1000);
        let page = store.create_page(None, None).unwrap();
        let PageDeletion::ReplacedWithDefault { new_page_id } = store.delete_page(&page).unwrap()
        else {
            panic!("expected a synthesized page");
        };
        assert!(!store.sync().is_creating(&page));
        assert!(store.sync().is_creating(&new_page_id));
        assert_eq!(store.sync().outbox_len(), 1);
    }

    #[test]
    fn lookups_that_miss_are_errors() {
        let (store, _clock) = test_store(1000);
        assert_eq!(
            store.update_block("nope", "b", "x"),
            Err(StoreError::PageNotFound("nope".into()))
        );
        assert!(store.sync().is_idle());
    }

    #[test]
    fn take_notices_drains() {
        let (store, _clock) = test_store(1000);
        store.push_notice(SyncNotice::CategoryNotEmpty {
            category_id: "c".into(),
            count: 2,
        });
        assert_eq!(store.take_notices().len(), 1);
        assert!(store.take_notices().is_empty());
    }

    #[test]
    fn offline_snapshot_round_trip() {
        let (store, _clock) = test_store(1000);
        store.create_page(Some("Keep me"), None).unwrap();
        store.save_offline_snapshot();
        let cached = store.load_offline_snapshot().expect("snapshot");
        assert_eq!(cached.workspace.pages[0].title, "Keep me");
        store.clear_offline_snapshot();
        assert!(store.load_offline_snapshot().is_none());
    }
}
