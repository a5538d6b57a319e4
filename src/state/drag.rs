//! One pointer-drag gesture at a time: Idle → Dragging → (Idle | Committing).
//!
//! While dragging, every hover recomputes the provisional ordering from the
//! store's live contents and writes it to a preview overlay. Only `end` with a
//! compatible target touches the store.

use super::workspace::Workspace;
use super::DocumentStore;
use crate::errors::{StoreError, StoreResult};
use crate::models::nested::{KanbanBoard, LayoutContent};
use crate::reorder::{self, DropTarget, Keyed};
use leptos::prelude::*;
use std::collections::HashMap;

/// Identifies one ordered container the surface can drop into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerId {
    CategoryList,
    /// Pages of one category; `None` is the uncategorized list.
    PageList { category: Option<String> },
    BlockList { page: String },
    KanbanColumns { page: String, block: String },
    KanbanColumn { page: String, block: String, column: String },
    LayoutSlot { page: String, block: String, slot: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum ItemKind {
    Category,
    Page,
    Block,
    Column,
    Card,
}

impl ContainerId {
    /// The kind of item this container holds.
    pub fn item_kind(&self) -> ItemKind {
        match self {
            ContainerId::CategoryList => ItemKind::Category,
            ContainerId::PageList { .. } => ItemKind::Page,
            ContainerId::BlockList { .. } | ContainerId::LayoutSlot { .. } => ItemKind::Block,
            ContainerId::KanbanColumns { .. } => ItemKind::Column,
            ContainerId::KanbanColumn { .. } => ItemKind::Card,
        }
    }

    /// Whether an item dragged out of `origin` may be dropped here.
    pub fn accepts_from(&self, origin: &ContainerId) -> bool {
        use ContainerId::*;
        match (origin, self) {
            (CategoryList, CategoryList) => true,
            (PageList { .. }, PageList { .. }) => true,
            (BlockList { page: a }, BlockList { page: b }) => a == b,
            (KanbanColumns { page: a, block: x }, KanbanColumns { page: b, block: y })
            | (KanbanColumn { page: a, block: x, .. }, KanbanColumn { page: b, block: y, .. })
            | (LayoutSlot { page: a, block: x, .. }, LayoutSlot { page: b, block: y, .. }) => {
                a == b && x == y
            }
            _ => false,
        }
    }
}

/// What the pointer is currently over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoverTarget {
    /// A sibling item inside a container.
    Item { id: String, container: ContainerId },
    /// The container itself (empty area, column body, list footer).
    Container(ContainerId),
}

/// A computed but not yet committed move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionalMove {
    pub item: String,
    pub from: ContainerId,
    pub to: ContainerId,
    /// Sibling the item is dropped on; `None` means the end of `to`.
    pub over: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        item: String,
        kind: ItemKind,
        origin: ContainerId,
    },
    Committing,
}

/// Local-only overlay the surface reads instead of canonical state mid-gesture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DragPreview {
    pub pending: Option<ProvisionalMove>,
    orders: HashMap<ContainerId, Vec<String>>,
}

impl DragPreview {
    pub fn order(&self, container: &ContainerId) -> Option<&Vec<String>> {
        self.orders.get(container)
    }
}

#[derive(Clone)]
pub struct DragSession {
    store: DocumentStore,
    phase: RwSignal<DragPhase>,
    preview: RwSignal<Option<DragPreview>>,
}

impl DragSession {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            phase: RwSignal::new(DragPhase::Idle),
            preview: RwSignal::new(None),
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase.get_untracked()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase.get_untracked(), DragPhase::Dragging { .. })
    }

    pub fn preview(&self) -> ReadSignal<Option<DragPreview>> {
        self.preview.read_only()
    }

    /// Starts a gesture. The item must currently sit in `container`, and no
    /// other gesture may be active.
    pub fn begin(&self, item: &str, kind: ItemKind, container: ContainerId) -> StoreResult<()> {
        let active = self.phase.with_untracked(|phase| match phase {
            DragPhase::Idle => None,
            DragPhase::Dragging { item, .. } => Some(item.clone()),
            DragPhase::Committing => Some("pending drop".to_string()),
        });
        if let Some(active) = active {
            return Err(StoreError::DragInProgress(active));
        }
        let members = self.store.container_ids(&container)?;
        if kind != container.item_kind() || !members.iter().any(|id| id == item) {
            return Err(missing(kind, item));
        }
        tracing::debug!(item, %kind, container = ?container, "drag started");
        self.phase.set(DragPhase::Dragging {
            item: item.to_string(),
            kind,
            origin: container,
        });
        self.preview.set(Some(DragPreview::default()));
        Ok(())
    }

    /// Recomputes the preview for a new hover target. Returns whether the
    /// preview changed; incompatible targets are ignored.
    pub fn hover(&self, target: &HoverTarget) -> bool {
        let Some(next) = self.provisional(target) else {
            return false;
        };
        let changed = self.preview.with_untracked(|p| p.as_ref() != Some(&next));
        if changed {
            self.preview.set(Some(next));
        }
        changed
    }

    /// Finishes the gesture. With a compatible target the move is committed to
    /// the store; otherwise the preview is dropped and nothing changes.
    pub fn end(&self, target: Option<&HoverTarget>) -> StoreResult<bool> {
        let pending = target
            .and_then(|t| self.provisional(t))
            .and_then(|p| p.pending);
        let Some(mv) = pending else {
            tracing::debug!("drag released without a valid target");
            self.reset();
            return Ok(false);
        };

        self.phase.set(DragPhase::Committing);
        let result = self.store.apply_move(&mv);
        self.reset();
        if let Err(e) = &result {
            tracing::warn!(item = %mv.item, error = %e, "drop could not be applied");
        }
        result
    }

    pub fn cancel(&self) {
        self.reset();
    }

    fn reset(&self) {
        self.preview.set(None);
        self.phase.set(DragPhase::Idle);
    }

    /// Ordering the surface should render for `container`: the preview while
    /// a gesture moves items through it, the canonical order otherwise.
    pub fn order_for(&self, container: &ContainerId) -> Vec<String> {
        let previewed = self
            .preview
            .with(|p| p.as_ref().and_then(|p| p.order(container)).cloned());
        match previewed {
            Some(order) => order,
            None => {
                let now = self.store.now_ms();
                self.store
                    .read(|ws| ws.container_ids(container, now))
                    .unwrap_or_default()
            }
        }
    }

    /// Builds the preview for `target` from the store's current contents.
    fn provisional(&self, target: &HoverTarget) -> Option<DragPreview> {
        let DragPhase::Dragging { item, kind, origin } = self.phase.get_untracked() else {
            return None;
        };
        let (to, over) = resolve_target(kind, target)?;
        if !to.accepts_from(&origin) || over.as_deref() == Some(item.as_str()) {
            return None;
        }

        // Fresh read on every hover: membership may have changed since `begin`.
        let mut source = self.store.container_ids(&origin).ok()?;
        let mut orders = HashMap::new();
        if to == origin {
            reorder::reposition(&mut source, &item, over.as_deref());
        } else {
            let mut dest = self.store.container_ids(&to).ok()?;
            if !reorder::transfer(&mut source, &mut dest, &item, &DropTarget::from_over(over.as_deref())) {
                return None;
            }
            orders.insert(to.clone(), dest);
        }
        orders.insert(origin.clone(), source);

        Some(DragPreview {
            pending: Some(ProvisionalMove {
                item,
                from: origin,
                to,
                over,
            }),
            orders,
        })
    }
}

/// Maps a raw hover target to `(destination container, sibling)` for the
/// dragged kind. A card over a column header lands in that column; a page over
/// a category row lands in that category.
fn resolve_target(kind: ItemKind, target: &HoverTarget) -> Option<(ContainerId, Option<String>)> {
    match target {
        HoverTarget::Container(c) => Some((c.clone(), None)),
        HoverTarget::Item { id, container } => match (kind, container) {
            (ItemKind::Card, ContainerId::KanbanColumns { page, block }) => Some((
                ContainerId::KanbanColumn {
                    page: page.clone(),
                    block: block.clone(),
                    column: id.clone(),
                },
                None,
            )),
            (ItemKind::Page, ContainerId::CategoryList) => Some((
                ContainerId::PageList {
                    category: Some(id.clone()),
                },
                None,
            )),
            _ => Some((container.clone(), Some(id.clone()))),
        },
    }
}

fn missing(kind: ItemKind, id: &str) -> StoreError {
    let id = id.to_string();
    match kind {
        ItemKind::Category => StoreError::CategoryNotFound(id),
        ItemKind::Page => StoreError::PageNotFound(id),
        ItemKind::Block => StoreError::BlockNotFound(id),
        ItemKind::Column => StoreError::ColumnNotFound(id),
        ItemKind::Card => StoreError::CardNotFound(id),
    }
}

fn keys<T: Keyed>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.key().to_string()).collect()
}

impl Workspace {
    /// Current member ids of one container.
    pub fn container_ids(&self, container: &ContainerId, now_ms: i64) -> StoreResult<Vec<String>> {
        match container {
            ContainerId::CategoryList => Ok(self.category_order.clone()),
            ContainerId::PageList { category } => {
                if let Some(cat) = category {
                    self.category(cat)?;
                }
                Ok(self.page_list(category.as_deref()))
            }
            ContainerId::BlockList { page } => self.block_ids(page),
            ContainerId::KanbanColumns { page, block } => {
                let board: KanbanBoard = self.block_content(page, block, now_ms)?;
                Ok(keys(&board.columns))
            }
            ContainerId::KanbanColumn {
                page,
                block,
                column,
            } => {
                let board: KanbanBoard = self.block_content(page, block, now_ms)?;
                board
                    .column(column)
                    .map(|c| keys(&c.cards))
                    .ok_or_else(|| StoreError::ColumnNotFound(column.clone()))
            }
            ContainerId::LayoutSlot { page, block, slot } => {
                let layout: LayoutContent = self.block_content(page, block, now_ms)?;
                layout
                    .slot(slot)
                    .map(|blocks| keys(blocks))
                    .ok_or_else(|| StoreError::SlotNotFound(slot.clone()))
            }
        }
    }
}

impl DocumentStore {
    /// Live member ids of one container.
    pub fn container_ids(&self, container: &ContainerId) -> StoreResult<Vec<String>> {
        let now = self.now_ms();
        self.read_untracked(|ws| ws.container_ids(container, now))
    }

    /// Commits a drag move through the regular mutation operations, so the
    /// coalescer sees it like any other edit.
    pub fn apply_move(&self, mv: &ProvisionalMove) -> StoreResult<bool> {
        use ContainerId::*;
        let over = mv.over.as_deref();
        match (&mv.from, &mv.to) {
            (CategoryList, CategoryList) => self.move_category(&mv.item, over),
            (PageList { category: a }, PageList { category: b }) if a == b => {
                let mut order = self.container_ids(&mv.from)?;
                if !reorder::reposition(&mut order, &mv.item, over) {
                    return Ok(false);
                }
                self.reorder_page_list(a.as_deref(), &order)
            }
            (PageList { .. }, PageList { category }) => {
                self.move_page_to_category(&mv.item, category.as_deref(), &DropTarget::from_over(over))?;
                Ok(true)
            }
            (BlockList { page }, BlockList { .. }) => self.move_block(page, &mv.item, over),
            (KanbanColumns { page, block }, KanbanColumns { .. }) => {
                self.move_column(page, block, &mv.item, over)
            }
            (KanbanColumn { page, block, .. }, KanbanColumn { column, .. }) => {
                self.move_card(page, block, &mv.item, column, over)
            }
            (LayoutSlot { page, block, .. }, LayoutSlot { slot, .. }) => {
                self.move_slot_block(page, block, &mv.item, slot, over)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockType;
    use crate::state::test_support::test_store;

    struct Board {
        store: DocumentStore,
        page: String,
        block: String,
        todo: String,
        done: String,
    }

    fn column(page: &str, block: &str, column: &str) -> ContainerId {
        ContainerId::KanbanColumn {
            page: page.into(),
            block: block.into(),
            column: column.into(),
        }
    }

    fn board() -> Board {
        let (store, _clock) = test_store(1000);
        let page = store.create_page(Some("Board"), None).unwrap();
        let first = store.read_untracked(|ws| ws.page(&page).unwrap().blocks[0].id.clone());
        store.change_block_type(&page, &first, BlockType::Kanban).unwrap();
        let ids = store
            .container_ids(&ContainerId::KanbanColumns {
                page: page.clone(),
                block: first.clone(),
            })
            .unwrap();
        Board {
            todo: ids[0].clone(),
            done: ids[2].clone(),
            store,
            page,
            block: first,
        }
    }

    #[test]
    fn card_dragged_between_columns_lands_once_where_dropped() {
        let b = board();
        let task_a = b.store.add_card(&b.page, &b.block, &b.todo, "Task A").unwrap();
        let x = b.store.add_card(&b.page, &b.block, &b.done, "X").unwrap();
        let y = b.store.add_card(&b.page, &b.block, &b.done, "Y").unwrap();
        let todo = column(&b.page, &b.block, &b.todo);
        let done = column(&b.page, &b.block, &b.done);

        let session = DragSession::new(b.store.clone());
        session.begin(&task_a, ItemKind::Card, todo.clone()).unwrap();
        let over_y = HoverTarget::Item {
            id: y.clone(),
            container: done.clone(),
        };
        assert!(session.hover(&over_y));

        // Preview only; canonical state untouched.
        assert_eq!(session.order_for(&done), vec![x.clone(), task_a.clone(), y.clone()]);
        assert!(session.order_for(&todo).is_empty());
        assert_eq!(b.store.container_ids(&todo).unwrap(), vec![task_a.clone()]);

        assert_eq!(session.end(Some(&over_y)), Ok(true));
        assert_eq!(session.phase(), DragPhase::Idle);
        assert!(b.store.container_ids(&todo).unwrap().is_empty());
        assert_eq!(b.store.container_ids(&done).unwrap(), vec![x, task_a, y]);
    }

    #[test]
    fn card_over_column_header_goes_to_the_end() {
        let b = board();
        let task_a = b.store.add_card(&b.page, &b.block, &b.todo, "Task A").unwrap();
        let x = b.store.add_card(&b.page, &b.block, &b.done, "X").unwrap();
        let session = DragSession::new(b.store.clone());
        session
            .begin(&task_a, ItemKind::Card, column(&b.page, &b.block, &b.todo))
            .unwrap();

        let header = HoverTarget::Item {
            id: b.done.clone(),
            container: ContainerId::KanbanColumns {
                page: b.page.clone(),
                block: b.block.clone(),
            },
        };
        assert_eq!(session.end(Some(&header)), Ok(true));
        assert_eq!(
            b.store.container_ids(&column(&b.page, &b.block, &b.done)).unwrap(),
            vec![x, task_a]
        );
    }

    #[test]
    fn release_without_target_leaves_store_alone() {
        let b = board();
        let task_a = b.store.add_card(&b.page, &b.block, &b.todo, "Task A").unwrap();
        let todo = column(&b.page, &b.block, &b.todo);
        let done = column(&b.page, &b.block, &b.done);
        let before = b.store.page_snapshot(&b.page);

        let session = DragSession::new(b.store.clone());
        session.begin(&task_a, ItemKind::Card, todo.clone()).unwrap();
        session.hover(&HoverTarget::Container(done));
        assert_eq!(session.end(None), Ok(false));

        assert_eq!(session.phase(), DragPhase::Idle);
        assert!(session.preview().get_untracked().is_none());
        assert_eq!(b.store.page_snapshot(&b.page), before);
        assert_eq!(session.order_for(&todo), vec![task_a]);
    }

    #[test]
    fn hover_reads_membership_added_mid_gesture() {
        let (store, _clock) = test_store(1000);
        let page = store.create_page(None, None).unwrap();
        let first = store.read_untracked(|ws| ws.page(&page).unwrap().blocks[0].id.clone());
        let second = store.add_block(&page, None, BlockType::Paragraph).unwrap();
        let list = ContainerId::BlockList { page: page.clone() };

        let session = DragSession::new(store.clone());
        session.begin(&first, ItemKind::Block, list.clone()).unwrap();
        let late = store.add_block(&page, None, BlockType::Paragraph).unwrap();

        session.hover(&HoverTarget::Container(list.clone()));
        assert_eq!(session.order_for(&list), vec![second.clone(), late.clone(), first.clone()]);
        assert_eq!(session.end(Some(&HoverTarget::Container(list.clone()))), Ok(true));
        assert_eq!(store.container_ids(&list).unwrap(), vec![second, late, first]);
    }

    #[test]
    fn incompatible_targets_are_ignored() {
        let (store, _clock) = test_store(1000);
        let cat = store.create_category("Work").unwrap();
        let page = store.create_page(None, None).unwrap();
        let session = DragSession::new(store.clone());
        session.begin(&cat, ItemKind::Category, ContainerId::CategoryList).unwrap();

        let block_list = HoverTarget::Container(ContainerId::BlockList { page });
        assert!(!session.hover(&block_list));
        assert_eq!(session.end(Some(&block_list)), Ok(false));
        assert_eq!(store.read_untracked(|ws| ws.category_order.clone()), vec![cat]);
    }

    #[test]
    fn begin_requires_the_item_in_its_container() {
        let (store, _clock) = test_store(1000);
        let session = DragSession::new(store);
        assert_eq!(
            session.begin("ghost", ItemKind::Category, ContainerId::CategoryList),
            Err(StoreError::CategoryNotFound("ghost".into()))
        );
        assert!(!session.is_dragging());
    }

    #[test]
    fn second_begin_is_refused_while_a_gesture_is_active() {
        let b = board();
        let task_a = b.store.add_card(&b.page, &b.block, &b.todo, "Task A").unwrap();
        let todo = column(&b.page, &b.block, &b.todo);
        let session = DragSession::new(b.store.clone());
        session.begin(&task_a, ItemKind::Card, todo.clone()).unwrap();
        session.hover(&HoverTarget::Container(column(&b.page, &b.block, &b.done)));
        let preview = session.preview().get_untracked();

        let columns = ContainerId::KanbanColumns {
            page: b.page.clone(),
            block: b.block.clone(),
        };
        assert_eq!(
            session.begin(&b.done, ItemKind::Column, columns),
            Err(StoreError::DragInProgress(task_a.clone()))
        );
        assert_eq!(session.preview().get_untracked(), preview);
        assert!(matches!(session.phase(), DragPhase::Dragging { origin, .. } if origin == todo));

        session.cancel();
        assert!(session.begin(&task_a, ItemKind::Card, todo).is_ok());
    }

    #[test]
    fn corrupt_board_columns_can_be_dragged_into() {
        let b = board();
        b.store.update_block(&b.page, &b.block, "<<garbage>>").unwrap();
        let columns = ContainerId::KanbanColumns {
            page: b.page.clone(),
            block: b.block.clone(),
        };
        let ids = b.store.container_ids(&columns).unwrap();
        let first = column(&b.page, &b.block, &ids[0]);
        let last = column(&b.page, &b.block, &ids[2]);
        let card = b.store.add_card(&b.page, &b.block, &ids[0], "Task A").unwrap();

        let session = DragSession::new(b.store.clone());
        session.begin(&card, ItemKind::Card, first.clone()).unwrap();
        assert_eq!(session.end(Some(&HoverTarget::Container(last.clone()))), Ok(true));
        assert_eq!(b.store.container_ids(&last).unwrap(), vec![card]);
        assert!(b.store.container_ids(&first).unwrap().is_empty());
    }

    #[test]
    fn page_dropped_on_category_row_is_reassigned() {
        let (store, _clock) = test_store(1000);
        let cat = store.create_category("Work").unwrap();
        let page = store.create_page(Some("Loose"), None).unwrap();
        let session = DragSession::new(store.clone());
        session
            .begin(&page, ItemKind::Page, ContainerId::PageList { category: None })
            .unwrap();

        let row = HoverTarget::Item {
            id: cat.clone(),
            container: ContainerId::CategoryList,
        };
        assert_eq!(session.end(Some(&row)), Ok(true));
        assert_eq!(
            store.read_untracked(|ws| ws.category_of(&page).map(String::from)),
            Some(cat)
        );
    }

    #[test]
    fn page_reordered_within_its_list() {
        let (store, _clock) = test_store(1000);
        let p1 = store.create_page(Some("1"), None).unwrap();
        let p2 = store.create_page(Some("2"), None).unwrap();
        let p3 = store.create_page(Some("3"), None).unwrap();
        let list = ContainerId::PageList { category: None };
        let session = DragSession::new(store.clone());
        session.begin(&p3, ItemKind::Page, list.clone()).unwrap();

        let over_p1 = HoverTarget::Item {
            id: p1.clone(),
            container: list.clone(),
        };
        assert_eq!(session.end(Some(&over_p1)), Ok(true));
        assert_eq!(store.container_ids(&list).unwrap(), vec![p3, p1, p2]);
    }

    #[test]
    fn block_moves_between_layout_slots() {
        let (store, _clock) = test_store(1000);
        let page = store.create_page(None, None).unwrap();
        let layout = store.read_untracked(|ws| ws.page(&page).unwrap().blocks[0].id.clone());
        store.change_block_type(&page, &layout, BlockType::Layout).unwrap();
        let slot = |s: &str| ContainerId::LayoutSlot {
            page: page.clone(),
            block: layout.clone(),
            slot: s.into(),
        };
        let moving = store
            .add_slot_block(&page, &layout, "a", None, BlockType::Paragraph)
            .unwrap();
        let stays_b = store.container_ids(&slot("b")).unwrap();

        let session = DragSession::new(store.clone());
        session.begin(&moving, ItemKind::Block, slot("a")).unwrap();
        assert_eq!(session.end(Some(&HoverTarget::Container(slot("b")))), Ok(true));

        let mut expected = stays_b;
        expected.push(moving.clone());
        assert_eq!(store.container_ids(&slot("b")).unwrap(), expected);
        assert!(!store.container_ids(&slot("a")).unwrap().contains(&moving));
    }
}
