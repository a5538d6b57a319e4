//! Parsed views over the content of composite blocks.
//!
//! Toggle, layout and kanban blocks store a JSON document inside the opaque
//! `Block::content` string. These types own that structure. A payload that does
//! not parse yields a default value, so one corrupt block never poisons the page.

use crate::models::{Block, BlockType};
use crate::reorder::Keyed;
use crate::util::new_id;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where ids for repaired or defaulted structure come from.
///
/// A payload parsed from storage is parsed again on every read, so anything
/// a repair invents must get the same id each time or the ids a view renders
/// would not address anything on the next edit.
#[derive(Clone, Copy, Debug)]
pub enum Ids<'a> {
    /// Random ids, for structure that is written back at once.
    Fresh,
    /// `<owner>-<part>`, stable across parses of the same block.
    DerivedFrom(&'a str),
}

impl Ids<'_> {
    pub fn make(&self, part: &str) -> String {
        match self {
            Ids::Fresh => new_id(),
            Ids::DerivedFrom(owner) => format!("{owner}-{part}"),
        }
    }
}

/// Shared parse/serialize contract for composite block payloads.
pub trait NestedContent: Serialize + DeserializeOwned + Sized {
    const BLOCK_TYPE: BlockType;

    fn fallback(ids: Ids<'_>, now_ms: i64) -> Self;

    /// Repairs a parsed value so its structural invariants hold.
    fn repair(&mut self, _ids: Ids<'_>, _now_ms: i64) {}

    fn default_content(now_ms: i64) -> Self {
        Self::fallback(Ids::Fresh, now_ms)
    }

    /// Parses the payload of block `owner_id`.
    fn parse(owner_id: &str, raw: &str, now_ms: i64) -> Self {
        let ids = Ids::DerivedFrom(owner_id);
        if raw.trim().is_empty() {
            return Self::fallback(ids, now_ms);
        }
        match serde_json::from_str::<Self>(raw) {
            Ok(mut value) => {
                value.repair(ids, now_ms);
                value
            }
            Err(e) => {
                tracing::warn!(
                    block_type = %Self::BLOCK_TYPE,
                    block_id = %owner_id,
                    error = %e,
                    "malformed nested content; falling back to default"
                );
                Self::fallback(ids, now_ms)
            }
        }
    }

    fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Initial payload for a freshly created block of `block_type`.
pub fn default_content_for(block_type: BlockType, now_ms: i64) -> String {
    match block_type {
        BlockType::Toggle => ToggleContent::default_content(now_ms).to_content(),
        BlockType::Layout => LayoutContent::default_content(now_ms).to_content(),
        BlockType::Kanban => KanbanBoard::default_content(now_ms).to_content(),
        _ => String::new(),
    }
}

/// Keeps a nested block sequence from ever being left empty.
pub(crate) fn ensure_blocks(blocks: &mut Vec<Block>, id: impl FnOnce() -> String, now_ms: i64) -> bool {
    if blocks.is_empty() {
        let mut placeholder = Block::empty_paragraph(now_ms);
        placeholder.id = id();
        blocks.push(placeholder);
        return true;
    }
    false
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToggleContent {
    #[serde(default)]
    pub header: String,

    #[serde(default)]
    pub body: Vec<Block>,
}

impl NestedContent for ToggleContent {
    const BLOCK_TYPE: BlockType = BlockType::Toggle;

    fn fallback(ids: Ids<'_>, now_ms: i64) -> Self {
        let mut toggle = Self {
            header: String::new(),
            body: vec![],
        };
        toggle.repair(ids, now_ms);
        toggle
    }

    fn repair(&mut self, ids: Ids<'_>, now_ms: i64) {
        ensure_blocks(&mut self.body, || ids.make("body"), now_ms);
    }
}

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LayoutTemplate {
    #[default]
    TwoColumn,
    ThreeColumn,
    SidebarLeft,
    SidebarRight,
    TwoRow,
}

impl LayoutTemplate {
    pub fn slot_ids(&self) -> &'static [&'static str] {
        match self {
            LayoutTemplate::ThreeColumn => &["a", "b", "c"],
            LayoutTemplate::TwoColumn
            | LayoutTemplate::SidebarLeft
            | LayoutTemplate::SidebarRight
            | LayoutTemplate::TwoRow => &["a", "b"],
        }
    }

    pub fn has_slot(&self, slot: &str) -> bool {
        self.slot_ids().contains(&slot)
    }
}

/// User-adjusted proportions; absent values mean "template default".
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LayoutSizes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LayoutContent {
    #[serde(default)]
    pub template: LayoutTemplate,

    #[serde(default)]
    pub slots: BTreeMap<String, Vec<Block>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<LayoutSizes>,
}

impl LayoutContent {
    pub fn slot(&self, slot: &str) -> Option<&Vec<Block>> {
        self.slots.get(slot)
    }

    pub fn slot_mut(&mut self, slot: &str) -> Option<&mut Vec<Block>> {
        self.slots.get_mut(slot)
    }

    /// Switches template. Blocks of slots the new template lacks are appended
    /// to its last slot.
    pub fn set_template(&mut self, template: LayoutTemplate, now_ms: i64) {
        self.template = template;
        self.repair(Ids::Fresh, now_ms);
    }
}

impl NestedContent for LayoutContent {
    const BLOCK_TYPE: BlockType = BlockType::Layout;

    fn fallback(ids: Ids<'_>, now_ms: i64) -> Self {
        let mut layout = Self {
            template: LayoutTemplate::default(),
            slots: BTreeMap::new(),
            sizes: None,
        };
        layout.repair(ids, now_ms);
        layout
    }

    fn repair(&mut self, ids: Ids<'_>, now_ms: i64) {
        let keep = self.template.slot_ids();
        let last = keep[keep.len() - 1];

        let stray: Vec<String> = self
            .slots
            .keys()
            .filter(|k| !keep.contains(&k.as_str()))
            .cloned()
            .collect();
        let mut orphaned = Vec::new();
        for key in stray {
            if let Some(blocks) = self.slots.remove(&key) {
                orphaned.extend(blocks);
            }
        }

        for slot in keep {
            ensure_blocks(
                self.slots.entry(slot.to_string()).or_default(),
                || ids.make(&format!("slot-{slot}")),
                now_ms,
            );
        }
        if !orphaned.is_empty() {
            if let Some(target) = self.slots.get_mut(last) {
                // Drop the placeholder if it was only created to satisfy the invariant.
                if target.len() == 1
                    && target[0].block_type == BlockType::Paragraph
                    && target[0].content.is_empty()
                {
                    target.clear();
                }
                target.extend(orphaned);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KanbanCard {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

impl KanbanCard {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
        }
    }
}

impl Keyed for KanbanCard {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KanbanColumn {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cards: Vec<KanbanCard>,
}

impl KanbanColumn {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(new_id(), title)
    }

    pub fn with_id(id: String, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            cards: vec![],
        }
    }
}

impl Keyed for KanbanColumn {
    fn key(&self) -> &str {
        &self.id
    }
}

pub const DEFAULT_KANBAN_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KanbanBoard {
    #[serde(default)]
    pub columns: Vec<KanbanColumn>,
}

impl KanbanBoard {
    pub fn column(&self, column_id: &str) -> Option<&KanbanColumn> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn column_mut(&mut self, column_id: &str) -> Option<&mut KanbanColumn> {
        self.columns.iter_mut().find(|c| c.id == column_id)
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }
}

impl NestedContent for KanbanBoard {
    const BLOCK_TYPE: BlockType = BlockType::Kanban;

    fn fallback(ids: Ids<'_>, _now_ms: i64) -> Self {
        Self {
            columns: DEFAULT_KANBAN_COLUMNS
                .iter()
                .enumerate()
                .map(|(i, t)| KanbanColumn::with_id(ids.make(&format!("col-{i}")), *t))
                .collect(),
        }
    }

    fn repair(&mut self, ids: Ids<'_>, now_ms: i64) {
        if self.columns.is_empty() {
            *self = Self::fallback(ids, now_ms);
        }
    }
}
