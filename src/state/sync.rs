//! Coalesced, fire-and-forget persistence.
//!
//! Two queues feed the persistence service:
//! - per-page save deadlines, reset by every edit and flushed once quiet
//!   (the upsert sends the page as it is at flush time, not at edit time);
//! - a FIFO outbox of structural calls (creates, deletes, reorders, moves).
//!
//! Optimistic creates carry `tmp-*` ids until the server allocates real ones.
//! Outbox entries that mention an unresolved temp id wait, and so does every
//! later entry touching the same ids. Failures are logged and dropped; local
//! state is never rolled back.

use super::DocumentStore;
use crate::api::{ApiError, ApiResult, CreatePageRequest, PersistenceService};
use crate::models::{PageTemplate, TemplateBody};
use crate::util::is_tmp_id;
use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(target_arch = "wasm32")]
use leptos::ev;
#[cfg(target_arch = "wasm32")]
use leptos::prelude::*;

/// A structural call waiting to be sent. Values the server needs are read
/// from the store at send time unless they are part of the call's identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    CreatePage { local_id: String, category_id: Option<String> },
    DeletePage { page_id: String },
    SetActivePage { page_id: Option<String> },
    ReorderPages,
    MovePageToCategory { page_id: String, category_id: Option<String> },
    CreateCategory { local_id: String },
    RenameCategory { category_id: String },
    DeleteCategory { category_id: String },
    ReorderCategories,
}

impl Outbound {
    /// Ids that must be server ids before this call can go out.
    fn dependencies(&self) -> Vec<&str> {
        match self {
            Outbound::CreatePage { category_id, .. } => category_id.iter().map(String::as_str).collect(),
            Outbound::DeletePage { page_id } => vec![page_id.as_str()],
            Outbound::SetActivePage { page_id } => page_id.iter().map(String::as_str).collect(),
            Outbound::MovePageToCategory {
                page_id,
                category_id,
            } => std::iter::once(page_id.as_str())
                .chain(category_id.as_deref())
                .collect(),
            Outbound::RenameCategory { category_id } | Outbound::DeleteCategory { category_id } => {
                vec![category_id.as_str()]
            }
            Outbound::CreateCategory { .. } | Outbound::ReorderPages | Outbound::ReorderCategories => {
                vec![]
            }
        }
    }

    fn mentions(&self, id: &str) -> bool {
        match self {
            Outbound::CreatePage { local_id, .. } | Outbound::CreateCategory { local_id } => {
                local_id == id || self.dependencies().contains(&id)
            }
            _ => self.dependencies().contains(&id),
        }
    }

    fn resolve_aliases(&mut self, aliases: &HashMap<String, String>) {
        let swap = |id: &mut String| {
            if let Some(real) = aliases.get(id.as_str()) {
                *id = real.clone();
            }
        };
        match self {
            Outbound::CreatePage { category_id, .. } => {
                if let Some(c) = category_id.as_mut() {
                    swap(c);
                }
            }
            Outbound::DeletePage { page_id } => swap(page_id),
            Outbound::SetActivePage { page_id } => {
                if let Some(p) = page_id.as_mut() {
                    swap(p);
                }
            }
            Outbound::MovePageToCategory {
                page_id,
                category_id,
            } => {
                swap(page_id);
                if let Some(c) = category_id.as_mut() {
                    swap(c);
                }
            }
            Outbound::RenameCategory { category_id } | Outbound::DeleteCategory { category_id } => {
                swap(category_id)
            }
            Outbound::CreateCategory { .. } | Outbound::ReorderPages | Outbound::ReorderCategories => {}
        }
    }

    /// Whether a queued `self` makes a newly queued `other` redundant or stale.
    fn supersedes(&self, other: &Outbound) -> bool {
        match (self, other) {
            (Outbound::ReorderPages, Outbound::ReorderPages)
            | (Outbound::ReorderCategories, Outbound::ReorderCategories)
            | (Outbound::SetActivePage { .. }, Outbound::SetActivePage { .. }) => true,
            (Outbound::RenameCategory { category_id: a }, Outbound::RenameCategory { category_id: b }) => a == b,
            (
                Outbound::MovePageToCategory { page_id: a, .. },
                Outbound::MovePageToCategory { page_id: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

/// Messages for the user that come back from the persistence service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncNotice {
    /// The server refused to delete a category that still has pages there.
    CategoryNotEmpty { category_id: String, count: usize },
}

#[derive(Debug, Default)]
struct SyncQueue {
    deadlines: HashMap<String, i64>,
    in_flight: HashSet<String>,
    outbox: VecDeque<Outbound>,
    /// Temp ids whose create is queued or in flight.
    creating: HashSet<String>,
    aliases: HashMap<String, String>,
}

impl SyncQueue {
    fn create_queued(&self, local_id: &str) -> bool {
        self.outbox.iter().any(|op| {
            matches!(op, Outbound::CreatePage { local_id: l, .. } | Outbound::CreateCategory { local_id: l } if l == local_id)
        })
    }

    fn resolve(&self, id: &str) -> String {
        self.aliases.get(id).cloned().unwrap_or_else(|| id.to_string())
    }
}

/// Debounce scheduler and outbox. Cheap to clone; all clones share one queue.
#[derive(Clone, Debug)]
pub struct SyncCoalescer {
    quiet_ms: i64,
    queue: Arc<Mutex<SyncQueue>>,
}

impl SyncCoalescer {
    pub fn new(quiet_ms: u32) -> Self {
        Self {
            quiet_ms: i64::from(quiet_ms),
            queue: Arc::new(Mutex::new(SyncQueue::default())),
        }
    }

    pub fn quiet_ms(&self) -> i64 {
        self.quiet_ms
    }

    fn lock(&self) -> MutexGuard<'_, SyncQueue> {
        // Queue mutations never panic midway, so a poisoned lock still holds a consistent queue.
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// (Re)starts the page's quiet-interval countdown.
    pub fn notify(&self, page_id: &str, now_ms: i64) {
        let mut q = self.lock();
        let page_id = q.resolve(page_id);
        let due = now_ms + self.quiet_ms;
        tracing::debug!(page_id = %page_id, due_ms = due, "page save scheduled");
        q.deadlines.insert(page_id, due);
    }

    /// Pages whose countdown elapsed and that have no save in flight. They are
    /// marked in flight; call [`finish_upsert`](Self::finish_upsert) when done.
    pub fn take_due(&self, now_ms: i64) -> Vec<String> {
        let mut q = self.lock();
        let mut due: Vec<String> = q
            .deadlines
            .iter()
            .filter(|(id, at)| **at <= now_ms && !is_tmp_id(id))
            .map(|(id, _)| id.clone())
            .filter(|id| !q.in_flight.contains(id))
            .collect();
        due.sort();
        for id in &due {
            q.deadlines.remove(id);
            q.in_flight.insert(id.clone());
        }
        due
    }

    /// Makes every scheduled save due at `now_ms`.
    pub fn expedite(&self, now_ms: i64) {
        let mut q = self.lock();
        for due in q.deadlines.values_mut() {
            *due = (*due).min(now_ms);
        }
    }

    pub fn finish_upsert(&self, page_id: &str) {
        self.lock().in_flight.remove(page_id);
    }

    /// Drops a pending save (the page is gone).
    pub fn cancel(&self, page_id: &str) {
        let mut q = self.lock();
        let page_id = q.resolve(page_id);
        q.deadlines.remove(&page_id);
    }

    pub fn enqueue(&self, op: Outbound) {
        let mut q = self.lock();
        if let Outbound::CreatePage { local_id, .. } | Outbound::CreateCategory { local_id } = &op {
            q.creating.insert(local_id.clone());
        }
        match op {
            Outbound::ReorderPages | Outbound::ReorderCategories => {
                // The order is read at send time, so one queued entry is enough.
                if q.outbox.iter().any(|queued| queued.supersedes(&op)) {
                    return;
                }
            }
            _ => q.outbox.retain(|queued| !queued.supersedes(&op)),
        }
        tracing::debug!(op = ?op, "outbound call queued");
        q.outbox.push_back(op);
    }

    /// Queues a create for a temp page unless one is already queued or in flight.
    pub fn ensure_page_created(&self, local_id: &str, category_id: Option<String>) {
        if !is_tmp_id(local_id) || self.is_creating(local_id) || self.alias_of(local_id).is_some() {
            return;
        }
        self.enqueue(Outbound::CreatePage {
            local_id: local_id.to_string(),
            category_id,
        });
    }

    pub fn ensure_category_created(&self, local_id: &str) {
        if !is_tmp_id(local_id) || self.is_creating(local_id) || self.alias_of(local_id).is_some() {
            return;
        }
        self.enqueue(Outbound::CreateCategory {
            local_id: local_id.to_string(),
        });
    }

    /// Next sendable call. Entries blocked on an unresolved temp id stay
    /// queued, and later entries sharing any of their ids stay behind them.
    pub fn pop_ready(&self) -> Option<Outbound> {
        let mut q = self.lock();
        let SyncQueue {
            outbox, aliases, ..
        } = &mut *q;

        let mut blocked: HashSet<String> = HashSet::new();
        let mut ready = None;
        for (ix, op) in outbox.iter_mut().enumerate() {
            op.resolve_aliases(aliases);
            let deps = op.dependencies();
            let waits = deps
                .iter()
                .any(|id| is_tmp_id(id) || blocked.contains(*id));
            if waits {
                blocked.extend(deps.iter().map(|s| s.to_string()));
                if let Outbound::CreatePage { local_id, .. } | Outbound::CreateCategory { local_id } = op {
                    blocked.insert(local_id.clone());
                }
                continue;
            }
            ready = Some(ix);
            break;
        }
        ready.and_then(|ix| outbox.remove(ix))
    }

    /// Records the server id for a temp id and moves its pending save over.
    pub fn resolve_alias(&self, local_id: &str, server_id: &str) {
        let mut q = self.lock();
        q.creating.remove(local_id);
        q.aliases.insert(local_id.to_string(), server_id.to_string());
        if let Some(due) = q.deadlines.remove(local_id) {
            q.deadlines.insert(server_id.to_string(), due);
        }
    }

    /// The create call failed; the next mutation of the entity queues a new one.
    pub fn create_failed(&self, local_id: &str) {
        self.lock().creating.remove(local_id);
    }

    /// Forgets a temp entity that was deleted locally.
    ///
    /// Returns `true` when its create is already in flight, in which case the
    /// caller must queue a delete that will run against the resolved id.
    pub fn forget_local(&self, local_id: &str) -> bool {
        let mut q = self.lock();
        q.deadlines.remove(local_id);
        if q.creating.contains(local_id) && !q.create_queued(local_id) {
            return true;
        }
        q.creating.remove(local_id);
        q.outbox.retain(|op| !op.mentions(local_id));
        false
    }

    pub fn alias_of(&self, local_id: &str) -> Option<String> {
        self.lock().aliases.get(local_id).cloned()
    }

    pub fn is_creating(&self, local_id: &str) -> bool {
        self.lock().creating.contains(local_id)
    }

    pub fn pending_save(&self, page_id: &str) -> Option<i64> {
        self.lock().deadlines.get(page_id).copied()
    }

    pub fn outbox_len(&self) -> usize {
        self.lock().outbox.len()
    }

    /// Drops every scheduled save, queued call and alias.
    pub fn clear(&self) {
        let mut q = self.lock();
        *q = SyncQueue::default();
        tracing::debug!("sync queue cleared");
    }

    pub fn is_idle(&self) -> bool {
        let q = self.lock();
        q.deadlines.is_empty() && q.in_flight.is_empty() && q.outbox.is_empty()
    }
}

/// Drives the coalescer against a persistence service.
///
/// Lives on the UI thread (`Rc`), outside the store, so the store stays
/// `Send + Sync` for context.
#[derive(Clone)]
pub struct SyncWorker {
    store: DocumentStore,
    backend: Rc<dyn PersistenceService>,
    draining: Rc<Cell<bool>>,

    /// Global listeners (keep handles alive).
    #[cfg(target_arch = "wasm32")]
    _online_handle: StoredValue<Option<WindowListenerHandle>>,
    #[cfg(target_arch = "wasm32")]
    _pagehide_handle: StoredValue<Option<WindowListenerHandle>>,
}

impl SyncWorker {
    pub fn new(store: DocumentStore, backend: Rc<dyn PersistenceService>) -> Self {
        Self {
            store,
            backend,
            draining: Rc::new(Cell::new(false)),
            #[cfg(target_arch = "wasm32")]
            _online_handle: StoredValue::new(None),
            #[cfg(target_arch = "wasm32")]
            _pagehide_handle: StoredValue::new(None),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    fn failed(&self, what: &str, e: &ApiError) {
        tracing::warn!(call = what, kind = ?e.kind, error = %e, "persistence call failed; keeping local state");
        self.store.mark_offline(e);
    }

    /// Loads the workspace: from the server, else from the offline snapshot.
    /// A workspace without pages gets a default one.
    pub async fn bootstrap(&self) {
        match self.backend.fetch_all().await {
            Ok(snapshot) => {
                self.store.mark_online();
                self.store.hydrate(snapshot);
            }
            Err(e) => {
                self.failed("fetch_all", &e);
                match self.store.load_offline_snapshot() {
                    Some(cached) => {
                        tracing::info!(saved_ms = cached.saved_ms, "booting from offline snapshot");
                        self.store.hydrate_offline(cached.workspace);
                    }
                    None => tracing::info!("no offline snapshot; starting empty"),
                }
            }
        }
        if self.store.read_untracked(|ws| ws.pages.is_empty()) {
            if let Err(e) = self.store.create_page(None, None) {
                tracing::warn!(error = %e, "could not create default page");
            }
        }
    }

    /// One scheduling round: drain the outbox in order and, concurrently,
    /// flush every page whose quiet interval elapsed.
    pub async fn tick(&self) {
        let (sent, flushed) = futures::join!(self.drain_outbox(), self.flush_due());
        if sent + flushed > 0 {
            self.store.save_offline_snapshot();
        }
    }

    async fn drain_outbox(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let mut sent = 0;
        while let Some(op) = self.store.sync().pop_ready() {
            self.send(op).await;
            sent += 1;
        }
        self.draining.set(false);
        sent
    }

    async fn flush_due(&self) -> usize {
        let now = self.store.now_ms();
        let due = self.store.sync().take_due(now);
        let n = due.len();
        futures::future::join_all(due.into_iter().map(|id| self.flush_page(id))).await;
        n
    }

    async fn flush_page(&self, page_id: String) {
        // Freshest state at fire time.
        let Some(page) = self.store.page_snapshot(&page_id) else {
            self.store.sync().finish_upsert(&page_id);
            return;
        };
        match self.backend.upsert_page(page.clone()).await {
            Ok(resp) => {
                self.store.mark_online();
                if let (true, Some(corrected)) = (resp.renamed, resp.page) {
                    tracing::info!(page_id = %page_id, "page storage renamed; adopting server copy");
                    if let Err(e) = self.store.reconcile_saved_page(&page, corrected) {
                        tracing::debug!(error = %e, "renamed page no longer present");
                    }
                }
            }
            Err(e) => self.failed("upsert_page", &e),
        }
        self.store.sync().finish_upsert(&page_id);
    }

    async fn send(&self, op: Outbound) {
        let sync = self.store.sync();
        match op {
            Outbound::CreatePage {
                local_id,
                category_id,
            } => {
                let Some(page) = self.store.page_snapshot(&local_id) else {
                    sync.forget_local(&local_id);
                    return;
                };
                let req = CreatePageRequest {
                    title: page.title,
                    icon: page.icon,
                    category_id,
                };
                match self.backend.create_page(req).await {
                    Ok(created) => {
                        self.store.mark_online();
                        self.store.resolve_created_page(&local_id, created);
                    }
                    Err(e) => {
                        self.failed("create_page", &e);
                        sync.create_failed(&local_id);
                        if self.store.page_snapshot(&local_id).is_none() {
                            sync.forget_local(&local_id);
                        }
                    }
                }
            }
            Outbound::DeletePage { page_id } => match self.backend.delete_page(page_id).await {
                Ok(()) => self.store.mark_online(),
                Err(e) => self.failed("delete_page", &e),
            },
            Outbound::SetActivePage { page_id } => match self.backend.set_active_page(page_id).await {
                Ok(()) => self.store.mark_online(),
                Err(e) => self.failed("set_active_page", &e),
            },
            Outbound::ReorderPages => {
                let order = self.store.read_untracked(|ws| {
                    ws.pages
                        .iter()
                        .map(|p| p.id.clone())
                        .filter(|id| !is_tmp_id(id))
                        .collect::<Vec<_>>()
                });
                match self.backend.reorder_pages(order).await {
                    Ok(()) => self.store.mark_online(),
                    Err(e) => self.failed("reorder_pages", &e),
                }
            }
            Outbound::MovePageToCategory {
                page_id,
                category_id,
            } => {
                let sent = self.store.page_snapshot(&page_id);
                match self.backend.move_page_to_category(page_id, category_id).await {
                    Ok(resp) => {
                        self.store.mark_online();
                        if let (true, Some(corrected), Some(sent)) = (resp.moved, resp.page, sent) {
                            if let Err(e) = self.store.reconcile_saved_page(&sent, corrected) {
                                tracing::debug!(error = %e, "moved page no longer present");
                            }
                        }
                    }
                    Err(e) => self.failed("move_page_to_category", &e),
                }
            }
            Outbound::CreateCategory { local_id } => {
                let Some(name) = self
                    .store
                    .read_untracked(|ws| ws.category(&local_id).ok().map(|c| c.name.clone()))
                else {
                    sync.forget_local(&local_id);
                    return;
                };
                match self.backend.create_category(name).await {
                    Ok(created) => {
                        self.store.mark_online();
                        self.store.resolve_created_category(&local_id, created);
                    }
                    Err(e) => {
                        self.failed("create_category", &e);
                        sync.create_failed(&local_id);
                        if self.store.read_untracked(|ws| ws.category(&local_id).is_err()) {
                            sync.forget_local(&local_id);
                        }
                    }
                }
            }
            Outbound::RenameCategory { category_id } => {
                let Some(name) = self
                    .store
                    .read_untracked(|ws| ws.category(&category_id).ok().map(|c| c.name.clone()))
                else {
                    return;
                };
                match self.backend.rename_category(category_id, name).await {
                    Ok(resp) => {
                        self.store.mark_online();
                        if let Some(category) = resp.category {
                            if let Err(e) = self.store.reconcile_category(category) {
                                tracing::debug!(error = %e, "renamed category no longer present");
                            }
                        }
                    }
                    Err(e) => self.failed("rename_category", &e),
                }
            }
            Outbound::DeleteCategory { category_id } => {
                match self.backend.delete_category(category_id.clone()).await {
                    Ok(resp) => {
                        self.store.mark_online();
                        if resp.has_pages {
                            let count = resp.count.unwrap_or(0);
                            tracing::warn!(category_id = %category_id, count, "server refused category delete");
                            self.store
                                .push_notice(SyncNotice::CategoryNotEmpty { category_id, count });
                        }
                    }
                    Err(e) => self.failed("delete_category", &e),
                }
            }
            Outbound::ReorderCategories => {
                let order = self.store.read_untracked(|ws| {
                    ws.category_order
                        .iter()
                        .filter(|id| !is_tmp_id(id))
                        .cloned()
                        .collect::<Vec<_>>()
                });
                match self.backend.reorder_categories(order).await {
                    Ok(()) => self.store.mark_online(),
                    Err(e) => self.failed("reorder_categories", &e),
                }
            }
        }
    }

    // ---- templates ----

    /// Replaces the store's template list with the server's.
    pub async fn refresh_templates(&self) {
        match self.backend.list_templates().await {
            Ok(templates) => {
                self.store.mark_online();
                self.store.set_templates(templates);
            }
            Err(e) => self.failed("list_templates", &e),
        }
    }

    /// Creates a template, or overwrites `template_id` when given.
    pub async fn save_template(
        &self,
        template_id: Option<String>,
        body: TemplateBody,
    ) -> ApiResult<PageTemplate> {
        let body = body.normalized();
        let res = match template_id {
            Some(id) => self.backend.update_template(id, body).await,
            None => self.backend.create_template(body).await,
        };
        match res {
            Ok(template) => {
                self.store.mark_online();
                tracing::info!(template_id = %template.id, "template saved");
                self.store.upsert_template(template.clone());
                Ok(template)
            }
            Err(e) => {
                self.failed("save_template", &e);
                Err(e)
            }
        }
    }

    pub async fn delete_template(&self, template_id: &str) -> ApiResult<()> {
        match self.backend.delete_template(template_id.to_string()).await {
            Ok(()) => {
                self.store.mark_online();
                self.store.remove_template(template_id);
                Ok(())
            }
            Err(e) => {
                self.failed("delete_template", &e);
                Err(e)
            }
        }
    }

    // ---- backup ----

    /// Full vault backup, taken after every pending save has been sent.
    pub async fn export_backup(&self) -> ApiResult<serde_json::Value> {
        self.flush_now().await;
        self.backend.export_backup().await.inspect_err(|e| self.failed("export_backup", e))
    }

    /// Replaces the vault with `data`. Local state, including unsent edits, is
    /// discarded and reloaded from the server. Returns the restored page count.
    pub async fn import_backup(&self, data: serde_json::Value) -> ApiResult<usize> {
        let imported = self
            .backend
            .import_backup(data)
            .await
            .inspect_err(|e| self.failed("import_backup", e))?;
        self.store.mark_online();
        tracing::info!(pages = imported, "backup imported; reloading workspace");
        self.store.sync().clear();
        let snapshot = self
            .backend
            .fetch_all()
            .await
            .inspect_err(|e| self.failed("fetch_all", e))?;
        self.store.hydrate(snapshot);
        self.store.save_offline_snapshot();
        self.refresh_templates().await;
        Ok(imported)
    }

    /// Sends every pending page save on the next tick, quiet or not.
    pub async fn flush_now(&self) {
        self.store.sync().expedite(self.store.now_ms());
        self.tick().await;
    }

    /// Ticks on an interval, and kicks a tick when the browser comes back
    /// online. Pending saves are flushed when the page is hidden.
    #[cfg(target_arch = "wasm32")]
    pub fn start(&self) {
        use leptos::task::spawn_local;
        use wasm_bindgen::JsCast;

        let Some(win) = web_sys::window() else {
            return;
        };
        let interval_ms = (self.store.sync().quiet_ms() / 4).clamp(50, 250) as i32;

        let w = self.clone();
        let cb = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            let w = w.clone();
            spawn_local(async move { w.tick().await });
        }) as Box<dyn FnMut()>);
        if let Err(e) = win.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            interval_ms,
        ) {
            tracing::warn!(error = ?e, "could not start sync interval");
        }
        // The worker lives for the app lifetime.
        cb.forget();

        let w = self.clone();
        let online = window_event_listener(ev::online, move |_ev: web_sys::Event| {
            tracing::info!("network back online");
            let w = w.clone();
            spawn_local(async move { w.tick().await });
        });
        self._online_handle.set_value(Some(online));

        let w = self.clone();
        let pagehide = window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
            let w = w.clone();
            spawn_local(async move { w.flush_now().await });
        });
        self._pagehide_handle.set_value(Some(pagehide));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn repeated_notify_collapses_into_one_due_page() {
        let c = SyncCoalescer::new(1000);
        for i in 0..10 {
            c.notify("p1", 100 * i);
        }
        assert!(c.take_due(1_800).is_empty());
        assert_eq!(c.take_due(1_900), ids(&["p1"]));
        assert!(c.take_due(10_000).is_empty());
    }

    #[test]
    fn pages_have_independent_countdowns() {
        let c = SyncCoalescer::new(1000);
        c.notify("a", 0);
        c.notify("b", 500);
        assert_eq!(c.take_due(1_000), ids(&["a"]));
        c.notify("a", 1_000);
        assert_eq!(c.take_due(1_500), ids(&["b"]));
    }

    #[test]
    fn in_flight_page_stays_scheduled() {
        let c = SyncCoalescer::new(100);
        c.notify("p", 0);
        assert_eq!(c.take_due(100), ids(&["p"]));
        c.notify("p", 150);
        assert!(c.take_due(1_000).is_empty());
        c.finish_upsert("p");
        assert_eq!(c.take_due(1_000), ids(&["p"]));
    }

    #[test]
    fn temp_pages_are_never_upserted() {
        let c = SyncCoalescer::new(100);
        c.notify("tmp-1-aa", 0);
        assert!(c.take_due(1_000).is_empty());
        c.resolve_alias("tmp-1-aa", "real");
        assert_eq!(c.pending_save("real"), Some(100));
        assert_eq!(c.take_due(1_000), ids(&["real"]));
    }

    #[test]
    fn reorders_and_renames_are_deduplicated() {
        let c = SyncCoalescer::new(100);
        c.enqueue(Outbound::ReorderPages);
        c.enqueue(Outbound::ReorderPages);
        c.enqueue(Outbound::RenameCategory { category_id: "c".into() });
        c.enqueue(Outbound::RenameCategory { category_id: "c".into() });
        c.enqueue(Outbound::SetActivePage { page_id: Some("a".into()) });
        c.enqueue(Outbound::SetActivePage { page_id: Some("b".into()) });
        assert_eq!(c.outbox_len(), 3);
        assert_eq!(c.pop_ready(), Some(Outbound::ReorderPages));
        assert_eq!(c.pop_ready(), Some(Outbound::RenameCategory { category_id: "c".into() }));
        assert_eq!(c.pop_ready(), Some(Outbound::SetActivePage { page_id: Some("b".into()) }));
        assert_eq!(c.pop_ready(), None);
    }

    #[test]
    fn calls_on_unresolved_temp_ids_wait_for_the_create() {
        let c = SyncCoalescer::new(100);
        c.ensure_category_created("tmp-1-cat");
        c.enqueue(Outbound::MovePageToCategory {
            page_id: "p".into(),
            category_id: Some("tmp-1-cat".into()),
        });
        c.enqueue(Outbound::DeletePage { page_id: "p".into() });
        c.enqueue(Outbound::ReorderCategories);

        assert_eq!(c.pop_ready(), Some(Outbound::CreateCategory { local_id: "tmp-1-cat".into() }));
        // The move waits on the category; the delete shares its page id.
        assert_eq!(c.pop_ready(), Some(Outbound::ReorderCategories));
        assert_eq!(c.pop_ready(), None);

        c.resolve_alias("tmp-1-cat", "cat-1");
        assert_eq!(
            c.pop_ready(),
            Some(Outbound::MovePageToCategory {
                page_id: "p".into(),
                category_id: Some("cat-1".into()),
            })
        );
        assert_eq!(c.pop_ready(), Some(Outbound::DeletePage { page_id: "p".into() }));
    }

    #[test]
    fn forgetting_unsent_temp_page_drops_its_calls() {
        let c = SyncCoalescer::new(100);
        c.ensure_page_created("tmp-1-p", None);
        c.enqueue(Outbound::SetActivePage { page_id: Some("tmp-1-p".into()) });
        c.notify("tmp-1-p", 0);

        assert!(!c.forget_local("tmp-1-p"));
        assert!(c.is_idle());
        assert!(!c.is_creating("tmp-1-p"));
    }

    #[test]
    fn forgetting_in_flight_temp_page_asks_for_delete() {
        let c = SyncCoalescer::new(100);
        c.ensure_page_created("tmp-1-p", None);
        assert!(matches!(c.pop_ready(), Some(Outbound::CreatePage { .. })));
        assert!(c.forget_local("tmp-1-p"));

        c.enqueue(Outbound::DeletePage { page_id: "tmp-1-p".into() });
        assert_eq!(c.pop_ready(), None);
        c.resolve_alias("tmp-1-p", "srv");
        assert_eq!(c.pop_ready(), Some(Outbound::DeletePage { page_id: "srv".into() }));
    }

    #[test]
    fn clear_forgets_saves_calls_and_aliases() {
        let c = SyncCoalescer::new(100);
        c.notify("p", 0);
        c.ensure_page_created("tmp-1-p", None);
        c.resolve_alias("tmp-1-p", "srv");
        c.enqueue(Outbound::ReorderPages);

        c.clear();
        assert!(c.is_idle());
        assert_eq!(c.alias_of("tmp-1-p"), None);
    }

    #[test]
    fn failed_create_is_requeued_by_next_mutation() {
        let c = SyncCoalescer::new(100);
        c.ensure_page_created("tmp-1-p", None);
        c.ensure_page_created("tmp-1-p", None);
        assert_eq!(c.outbox_len(), 1);
        assert!(c.pop_ready().is_some());
        c.create_failed("tmp-1-p");
        c.ensure_page_created("tmp-1-p", None);
        assert_eq!(c.outbox_len(), 1);
    }
}
