//! Mutations inside composite blocks (kanban, layout, toggle).
//!
//! Each operation parses the owning block's payload, edits the typed view and
//! writes it back, so the top-level block sequence is never flattened.

use super::workspace::{remove_block, touch, BlockDeletion, ColumnDeletion, Workspace};
use crate::errors::{StoreError, StoreResult};
use crate::models::nested::{
    default_content_for, Ids, KanbanBoard, KanbanCard, KanbanColumn, LayoutContent, LayoutSizes,
    LayoutTemplate, NestedContent, ToggleContent,
};
use crate::models::{Block, BlockType};
use crate::reorder::{self, DropTarget};
use crate::util::iso_from_ms;

fn check_index(index: usize, len: usize) -> StoreResult<()> {
    if index >= len {
        return Err(StoreError::IndexOutOfRange { index, len });
    }
    Ok(())
}

fn find_block_mut<'a>(blocks: &'a mut [Block], block_id: &str) -> StoreResult<&'a mut Block> {
    blocks
        .iter_mut()
        .find(|b| b.id == block_id)
        .ok_or_else(|| StoreError::BlockNotFound(block_id.to_string()))
}

impl Workspace {
    /// Parses a composite block, applies `f`, and stores the result only when
    /// `f` succeeds.
    pub(crate) fn with_block_content<T, R>(
        &mut self,
        page_id: &str,
        block_id: &str,
        now_ms: i64,
        f: impl FnOnce(&mut T) -> StoreResult<R>,
    ) -> StoreResult<R>
    where
        T: NestedContent,
    {
        let page = self.page_mut(page_id)?;
        let block = find_block_mut(&mut page.blocks, block_id)?;
        if block.block_type != T::BLOCK_TYPE {
            return Err(StoreError::WrongBlockType {
                block_id: block_id.to_string(),
                expected: T::BLOCK_TYPE,
                actual: block.block_type,
            });
        }
        let mut content = T::parse(block_id, &block.content, now_ms);
        let out = f(&mut content)?;
        block.content = content.to_content();
        block.updated_at = iso_from_ms(now_ms);
        touch(page, now_ms);
        Ok(out)
    }

    /// Read-only parsed view of a composite block.
    pub fn block_content<T: NestedContent>(&self, page_id: &str, block_id: &str, now_ms: i64) -> StoreResult<T> {
        let page = self.page(page_id)?;
        let block = page
            .block(block_id)
            .ok_or_else(|| StoreError::BlockNotFound(block_id.to_string()))?;
        if block.block_type != T::BLOCK_TYPE {
            return Err(StoreError::WrongBlockType {
                block_id: block_id.to_string(),
                expected: T::BLOCK_TYPE,
                actual: block.block_type,
            });
        }
        Ok(T::parse(block_id, &block.content, now_ms))
    }

    // ---- kanban ----

    pub fn add_card(
        &mut self,
        page_id: &str,
        block_id: &str,
        column_id: &str,
        title: &str,
        now_ms: i64,
    ) -> StoreResult<String> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let column = board
                .column_mut(column_id)
                .ok_or_else(|| StoreError::ColumnNotFound(column_id.to_string()))?;
            let card = KanbanCard::new(title);
            let id = card.id.clone();
            column.cards.push(card);
            Ok(id)
        })
    }

    pub fn rename_card(
        &mut self,
        page_id: &str,
        block_id: &str,
        card_id: &str,
        title: &str,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let card = board
                .columns
                .iter_mut()
                .flat_map(|c| c.cards.iter_mut())
                .find(|c| c.id == card_id)
                .ok_or_else(|| StoreError::CardNotFound(card_id.to_string()))?;
            card.title = title.to_string();
            Ok(())
        })
    }

    /// Columns may become empty; the board keeps its column sequence.
    pub fn delete_card(&mut self, page_id: &str, block_id: &str, card_id: &str, now_ms: i64) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            board
                .columns
                .iter_mut()
                .find_map(|c| reorder::take_by_id(&mut c.cards, card_id))
                .map(|_| ())
                .ok_or_else(|| StoreError::CardNotFound(card_id.to_string()))
        })
    }

    pub fn add_column(&mut self, page_id: &str, block_id: &str, title: &str, now_ms: i64) -> StoreResult<String> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let column = KanbanColumn::new(title);
            let id = column.id.clone();
            board.columns.push(column);
            Ok(id)
        })
    }

    pub fn rename_column(
        &mut self,
        page_id: &str,
        block_id: &str,
        column_id: &str,
        title: &str,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let column = board
                .column_mut(column_id)
                .ok_or_else(|| StoreError::ColumnNotFound(column_id.to_string()))?;
            column.title = title.to_string();
            Ok(())
        })
    }

    pub fn delete_column(
        &mut self,
        page_id: &str,
        block_id: &str,
        column_id: &str,
        now_ms: i64,
    ) -> StoreResult<ColumnDeletion> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let ix = board
                .column_index(column_id)
                .ok_or_else(|| StoreError::ColumnNotFound(column_id.to_string()))?;
            if board.columns.len() == 1 {
                return Ok(ColumnDeletion::RefusedLastColumn);
            }
            board.columns.remove(ix);
            Ok(ColumnDeletion::Deleted)
        })
    }

    pub fn reorder_columns(
        &mut self,
        page_id: &str,
        block_id: &str,
        from: usize,
        to: usize,
        now_ms: i64,
    ) -> StoreResult<bool> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            check_index(from, board.columns.len())?;
            check_index(to, board.columns.len())?;
            Ok(reorder::move_index(&mut board.columns, from, to))
        })
    }

    /// Same-board column move by id; `over = None` moves to the end.
    pub fn move_column(
        &mut self,
        page_id: &str,
        block_id: &str,
        column_id: &str,
        over: Option<&str>,
        now_ms: i64,
    ) -> StoreResult<bool> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            for id in std::iter::once(column_id).chain(over) {
                board
                    .column_index(id)
                    .ok_or_else(|| StoreError::ColumnNotFound(id.to_string()))?;
            }
            Ok(reorder::reposition(&mut board.columns, column_id, over))
        })
    }

    pub fn reorder_cards(
        &mut self,
        page_id: &str,
        block_id: &str,
        column_id: &str,
        from: usize,
        to: usize,
        now_ms: i64,
    ) -> StoreResult<bool> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let column = board
                .column_mut(column_id)
                .ok_or_else(|| StoreError::ColumnNotFound(column_id.to_string()))?;
            check_index(from, column.cards.len())?;
            check_index(to, column.cards.len())?;
            Ok(reorder::move_index(&mut column.cards, from, to))
        })
    }

    /// Moves a card within its column or into another column of the same board.
    ///
    /// Within one column `over` is array-move semantics (take the sibling's
    /// slot); across columns the card lands before `over`, or last when `None`.
    pub fn move_card(
        &mut self,
        page_id: &str,
        block_id: &str,
        card_id: &str,
        to_column: &str,
        over: Option<&str>,
        now_ms: i64,
    ) -> StoreResult<bool> {
        self.with_block_content(page_id, block_id, now_ms, |board: &mut KanbanBoard| {
            let from_ix = board
                .columns
                .iter()
                .position(|c| reorder::position_of(&c.cards, card_id).is_some())
                .ok_or_else(|| StoreError::CardNotFound(card_id.to_string()))?;
            let to_ix = board
                .column_index(to_column)
                .ok_or_else(|| StoreError::ColumnNotFound(to_column.to_string()))?;

            if from_ix == to_ix {
                return Ok(reorder::reposition(&mut board.columns[from_ix].cards, card_id, over));
            }
            let Some((source, dest)) = reorder::pair_mut(&mut board.columns, from_ix, to_ix) else {
                return Ok(false);
            };
            let target = DropTarget::from_over(over);
            Ok(reorder::transfer(&mut source.cards, &mut dest.cards, card_id, &target))
        })
    }

    // ---- layout ----

    pub fn set_layout_template(
        &mut self,
        page_id: &str,
        block_id: &str,
        template: LayoutTemplate,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |layout: &mut LayoutContent| {
            layout.set_template(template, now_ms);
            Ok(())
        })
    }

    pub fn set_layout_sizes(
        &mut self,
        page_id: &str,
        block_id: &str,
        sizes: Option<LayoutSizes>,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |layout: &mut LayoutContent| {
            layout.sizes = sizes;
            Ok(())
        })
    }

    pub fn add_slot_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        slot: &str,
        after: Option<&str>,
        block_type: BlockType,
        now_ms: i64,
    ) -> StoreResult<String> {
        self.with_block_content(page_id, block_id, now_ms, |layout: &mut LayoutContent| {
            let blocks = layout
                .slot_mut(slot)
                .ok_or_else(|| StoreError::SlotNotFound(slot.to_string()))?;
            insert_block(blocks, after, block_type, now_ms)
        })
    }

    pub fn update_slot_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        slot: &str,
        inner_id: &str,
        content: &str,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |layout: &mut LayoutContent| {
            let blocks = layout
                .slot_mut(slot)
                .ok_or_else(|| StoreError::SlotNotFound(slot.to_string()))?;
            set_block_content(blocks, inner_id, content, now_ms)
        })
    }

    pub fn delete_slot_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        slot: &str,
        inner_id: &str,
        now_ms: i64,
    ) -> StoreResult<BlockDeletion> {
        self.with_block_content(page_id, block_id, now_ms, |layout: &mut LayoutContent| {
            let blocks = layout
                .slot_mut(slot)
                .ok_or_else(|| StoreError::SlotNotFound(slot.to_string()))?;
            remove_block(blocks, inner_id, now_ms)
        })
    }

    /// Moves a block within one slot or to another slot of the same layout.
    /// A slot emptied by the move gets a fresh empty paragraph.
    pub fn move_slot_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        inner_id: &str,
        to_slot: &str,
        over: Option<&str>,
        now_ms: i64,
    ) -> StoreResult<bool> {
        self.with_block_content(page_id, block_id, now_ms, |layout: &mut LayoutContent| {
            let from_slot = layout
                .slots
                .iter()
                .find(|(_, blocks)| reorder::position_of(blocks.as_slice(), inner_id).is_some())
                .map(|(slot, _)| slot.clone())
                .ok_or_else(|| StoreError::BlockNotFound(inner_id.to_string()))?;
            if layout.slot(to_slot).is_none() {
                return Err(StoreError::SlotNotFound(to_slot.to_string()));
            }

            if from_slot == to_slot {
                let blocks = layout
                    .slot_mut(to_slot)
                    .ok_or_else(|| StoreError::SlotNotFound(to_slot.to_string()))?;
                return Ok(reorder::reposition(blocks, inner_id, over));
            }

            let Some(moving) = layout
                .slot_mut(&from_slot)
                .and_then(|blocks| reorder::take_by_id(blocks, inner_id))
            else {
                return Ok(false);
            };
            let dest = layout
                .slot_mut(to_slot)
                .ok_or_else(|| StoreError::SlotNotFound(to_slot.to_string()))?;
            reorder::insert_at(dest, moving, &DropTarget::from_over(over));
            layout.repair(Ids::Fresh, now_ms);
            Ok(true)
        })
    }

    // ---- toggle ----

    pub fn set_toggle_header(&mut self, page_id: &str, block_id: &str, header: &str, now_ms: i64) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |toggle: &mut ToggleContent| {
            toggle.header = header.to_string();
            Ok(())
        })
    }

    pub fn add_toggle_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        after: Option<&str>,
        block_type: BlockType,
        now_ms: i64,
    ) -> StoreResult<String> {
        self.with_block_content(page_id, block_id, now_ms, |toggle: &mut ToggleContent| {
            insert_block(&mut toggle.body, after, block_type, now_ms)
        })
    }

    pub fn update_toggle_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        inner_id: &str,
        content: &str,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.with_block_content(page_id, block_id, now_ms, |toggle: &mut ToggleContent| {
            set_block_content(&mut toggle.body, inner_id, content, now_ms)
        })
    }

    pub fn delete_toggle_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        inner_id: &str,
        now_ms: i64,
    ) -> StoreResult<BlockDeletion> {
        self.with_block_content(page_id, block_id, now_ms, |toggle: &mut ToggleContent| {
            remove_block(&mut toggle.body, inner_id, now_ms)
        })
    }
}

fn insert_block(
    blocks: &mut Vec<Block>,
    after: Option<&str>,
    block_type: BlockType,
    now_ms: i64,
) -> StoreResult<String> {
    let ix = match after {
        Some(after_id) => {
            reorder::position_of(blocks, after_id)
                .ok_or_else(|| StoreError::BlockNotFound(after_id.to_string()))?
                + 1
        }
        None => blocks.len(),
    };
    let block = Block::new(block_type, default_content_for(block_type, now_ms), now_ms);
    let id = block.id.clone();
    blocks.insert(ix, block);
    Ok(id)
}

fn set_block_content(blocks: &mut [Block], block_id: &str, content: &str, now_ms: i64) -> StoreResult<()> {
    let block = find_block_mut(blocks, block_id)?;
    block.content = content.to_string();
    block.updated_at = iso_from_ms(now_ms);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;

    const NOW: i64 = 1_700_000_000_000;

    fn board_page(raw: &str) -> Workspace {
        let mut page = Page::new_local("Board", "📋", NOW);
        page.id = "P".into();
        let mut block = Block::new(BlockType::Kanban, raw, NOW);
        block.id = "K".into();
        page.blocks = vec![block];
        Workspace {
            pages: vec![page],
            current_page_id: Some("P".into()),
            ..Default::default()
        }
    }

    const BOARD: &str = r#"{"columns":[
        {"id":"todo","title":"To Do","cards":[{"id":"a","title":"Task A"},{"id":"b","title":"Task B"}]},
        {"id":"doing","title":"In Progress","cards":[]},
        {"id":"done","title":"Done","cards":[{"id":"z","title":"Shipped"}]}
    ]}"#;

    fn card_ids(ws: &Workspace, column: &str) -> Vec<String> {
        let board: KanbanBoard = ws.block_content("P", "K", NOW).unwrap();
        board
            .column(column)
            .map(|c| c.cards.iter().map(|card| card.id.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn card_moves_across_columns_exactly_once() {
        let mut ws = board_page(BOARD);
        assert_eq!(ws.move_card("P", "K", "a", "done", None, NOW), Ok(true));
        assert_eq!(card_ids(&ws, "todo"), vec!["b"]);
        assert_eq!(card_ids(&ws, "done"), vec!["z", "a"]);

        assert_eq!(ws.move_card("P", "K", "b", "done", Some("z"), NOW), Ok(true));
        assert!(card_ids(&ws, "todo").is_empty());
        assert_eq!(card_ids(&ws, "done"), vec!["b", "z", "a"]);
    }

    #[test]
    fn card_reorder_within_column() {
        let mut ws = board_page(BOARD);
        assert_eq!(ws.move_card("P", "K", "a", "todo", Some("b"), NOW), Ok(true));
        assert_eq!(card_ids(&ws, "todo"), vec!["b", "a"]);
        assert_eq!(ws.reorder_cards("P", "K", "todo", 1, 0, NOW), Ok(true));
        assert_eq!(card_ids(&ws, "todo"), vec!["a", "b"]);
    }

    #[test]
    fn last_column_cannot_be_deleted() {
        let mut ws = board_page(r#"{"columns":[{"id":"only","title":"Only","cards":[]}]}"#);
        assert_eq!(
            ws.delete_column("P", "K", "only", NOW),
            Ok(ColumnDeletion::RefusedLastColumn)
        );
        let board: KanbanBoard = ws.block_content("P", "K", NOW).unwrap();
        assert_eq!(board.columns.len(), 1);
    }

    #[test]
    fn malformed_board_is_editable_from_defaults() {
        let mut ws = board_page("<<garbage>>");
        ws.add_column("P", "K", "Backlog", NOW).unwrap();
        let board: KanbanBoard = ws.block_content("P", "K", NOW).unwrap();
        let titles: Vec<_> = board.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done", "Backlog"]);
        let first = board.columns[0].id.clone();
        let card = ws.add_card("P", "K", &first, "Fresh", NOW).unwrap();
        assert_eq!(card_ids(&ws, &first), vec![card]);
    }

    #[test]
    fn repaired_content_is_addressable_by_the_ids_it_was_read_with() {
        let mut ws = board_page("<<garbage>>");
        let board: KanbanBoard = ws.block_content("P", "K", NOW).unwrap();
        let card = ws.add_card("P", "K", &board.columns[0].id, "Task A", NOW).unwrap();
        assert_eq!(card_ids(&ws, &board.columns[0].id), vec![card]);

        let mut ws = board_page("");
        let block = &mut ws.pages[0].blocks[0];
        block.block_type = BlockType::Toggle;
        block.content = r#"{"header":"h","body":[]}"#.into();
        let toggle: ToggleContent = ws.block_content("P", "K", NOW).unwrap();
        ws.update_toggle_block("P", "K", &toggle.body[0].id, "typed", NOW).unwrap();
        let toggle: ToggleContent = ws.block_content("P", "K", NOW).unwrap();
        assert_eq!(toggle.body[0].content, "typed");

        let mut ws = layout_page();
        ws.pages[0].blocks[0].content = r#"{"template":"three-column","slots":{}}"#.into();
        let layout: LayoutContent = ws.block_content("P", "K", NOW).unwrap();
        let c = layout.slot("c").unwrap()[0].id.clone();
        ws.update_slot_block("P", "K", "c", &c, "third", NOW).unwrap();
        let layout: LayoutContent = ws.block_content("P", "K", NOW).unwrap();
        assert_eq!(layout.slot("c").unwrap()[0].content, "third");
    }

    #[test]
    fn delete_card_keeps_empty_column() {
        let mut ws = board_page(BOARD);
        ws.delete_card("P", "K", "z", NOW).unwrap();
        let board: KanbanBoard = ws.block_content("P", "K", NOW).unwrap();
        assert_eq!(board.columns.len(), 3);
        assert!(board.column("done").unwrap().cards.is_empty());
        assert_eq!(
            ws.delete_card("P", "K", "z", NOW),
            Err(StoreError::CardNotFound("z".into()))
        );
    }

    #[test]
    fn wrong_block_type_is_rejected() {
        let mut ws = board_page(BOARD);
        let err = ws.set_toggle_header("P", "K", "x", NOW).unwrap_err();
        assert!(matches!(err, StoreError::WrongBlockType { .. }));
    }

    fn layout_page() -> Workspace {
        let mut ws = board_page("");
        let block = &mut ws.pages[0].blocks[0];
        block.block_type = BlockType::Layout;
        block.content = r#"{"template":"two-column","slots":{
            "a":[{"id":"a1","type":"paragraph","content":"left","createdAt":"","updatedAt":""}],
            "b":[{"id":"b1","type":"paragraph","content":"right","createdAt":"","updatedAt":""}]
        }}"#
        .into();
        ws
    }

    #[test]
    fn slot_block_move_refills_emptied_slot() {
        let mut ws = layout_page();
        assert_eq!(ws.move_slot_block("P", "K", "a1", "b", Some("b1"), NOW), Ok(true));
        let layout: LayoutContent = ws.block_content("P", "K", NOW).unwrap();
        let b: Vec<_> = layout.slot("b").unwrap().iter().map(|x| x.id.as_str()).collect();
        assert_eq!(b, vec!["a1", "b1"]);
        let a = layout.slot("a").unwrap();
        assert_eq!(a.len(), 1);
        assert!(a[0].content.is_empty());
    }

    #[test]
    fn deleting_last_slot_block_leaves_placeholder() {
        let mut ws = layout_page();
        let outcome = ws.delete_slot_block("P", "K", "a", "a1", NOW).unwrap();
        assert!(matches!(outcome, BlockDeletion::ReplacedWithEmpty { .. }));
        assert_eq!(
            ws.delete_slot_block("P", "K", "c", "a1", NOW),
            Err(StoreError::SlotNotFound("c".into()))
        );
    }

    #[test]
    fn toggle_body_never_empties() {
        let mut ws = board_page("");
        ws.change_block_type("P", "K", BlockType::Toggle, NOW).unwrap();
        let toggle: ToggleContent = ws.block_content("P", "K", NOW).unwrap();
        let only = toggle.body[0].id.clone();

        ws.update_toggle_block("P", "K", &only, "inside", NOW).unwrap();
        let added = ws.add_toggle_block("P", "K", Some(&only), BlockType::Code, NOW).unwrap();
        assert_eq!(ws.delete_toggle_block("P", "K", &only, NOW), Ok(BlockDeletion::Removed));
        let outcome = ws.delete_toggle_block("P", "K", &added, NOW).unwrap();
        assert!(matches!(outcome, BlockDeletion::ReplacedWithEmpty { .. }));

        let toggle: ToggleContent = ws.block_content("P", "K", NOW).unwrap();
        assert_eq!(toggle.body.len(), 1);
    }
}
