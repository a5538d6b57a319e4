pub mod nested;

use crate::reorder::Keyed;
use crate::util::{iso_from_ms, new_id, new_tmp_id};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_TITLE: &str = "Untitled";
pub const DEFAULT_PAGE_ICON: &str = "📝";
pub const DEFAULT_COVER_POSITION: i32 = 50;

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_cover_position() -> i32 {
    DEFAULT_COVER_POSITION
}

fn cover_position_or_default<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or(DEFAULT_COVER_POSITION))
}

/// Closed set of block kinds understood by the editor surface.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum BlockType {
    #[default]
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletList,
    OrderedList,
    TaskList,
    Quote,
    Code,
    Divider,
    Table,
    Image,
    Video,
    Toggle,
    Kanban,
    Layout,
    Callout,
    Embed,
    Math,
    Mermaid,
    Bookmark,
}

impl BlockType {
    /// Block kinds whose content embeds further block or card sequences.
    pub fn is_composite(&self) -> bool {
        matches!(self, BlockType::Toggle | BlockType::Kanban | BlockType::Layout)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    /// Opaque payload owned by the rendering surface.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    pub created_at: String,
    pub updated_at: String,

    /// Fields the editor attaches that this crate does not interpret (e.g. `checked`).
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    pub fn new(block_type: BlockType, content: impl Into<String>, now_ms: i64) -> Self {
        let now = iso_from_ms(now_ms);
        Self {
            id: new_id(),
            block_type,
            content: content.into(),
            created_at: now.clone(),
            updated_at: now,
            extra: serde_json::Map::new(),
        }
    }

    pub fn empty_paragraph(now_ms: i64) -> Self {
        Self::new(BlockType::Paragraph, String::new(), now_ms)
    }
}

impl Keyed for Block {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Typed cell value for the tabular page view.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Checkbox(bool),
    Date(String),
    Select(String),
    MultiSelect(Vec<String>),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PageProperty {
    pub key: String,
    pub value: PropertyValue,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    pub icon: String,

    #[serde(default)]
    pub cover: Option<String>,

    #[serde(
        default = "default_cover_position",
        deserialize_with = "cover_position_or_default"
    )]
    pub cover_position: i32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub starred: bool,

    #[serde(default)]
    pub blocks: Vec<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PageProperty>>,

    pub created_at: String,
    pub updated_at: String,
}

impl Page {
    /// A fresh local page: temporary id, one empty paragraph.
    pub fn new_local(title: &str, icon: &str, now_ms: i64) -> Self {
        let now = iso_from_ms(now_ms);
        Self {
            id: new_tmp_id(now_ms),
            title: title.to_string(),
            icon: icon.to_string(),
            cover: None,
            cover_position: DEFAULT_COVER_POSITION,
            tags: vec![],
            starred: false,
            blocks: vec![Block::empty_paragraph(now_ms)],
            properties: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    pub fn block_mut(&mut self, block_id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == block_id)
    }

    /// Restores the at-least-one-block invariant.
    pub fn ensure_non_empty(&mut self, now_ms: i64) -> bool {
        if self.blocks.is_empty() {
            self.blocks.push(Block::empty_paragraph(now_ms));
            return true;
        }
        false
    }
}

impl Keyed for Page {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial page metadata update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageMetaPatch {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub cover: Option<Option<String>>,
    pub cover_position: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub starred: Option<bool>,
    pub properties: Option<Option<Vec<PageProperty>>>,
}

impl PageMetaPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,

    /// Storage-location name derived from `name` by the persistence service.
    #[serde(default)]
    pub folder_name: String,
}

impl Keyed for Category {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Fetch-all payload of the persistence service.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    #[serde(default)]
    pub pages: Vec<Page>,

    #[serde(default)]
    pub current_page_id: Option<String>,

    #[serde(default)]
    pub categories: Vec<Category>,

    /// page id -> category id; `null` or absence means uncategorized.
    #[serde(default)]
    pub category_map: BTreeMap<String, Option<String>>,

    #[serde(default)]
    pub category_order: Vec<String>,
}

pub const DEFAULT_TEMPLATE_NAME: &str = "Untitled template";
pub const DEFAULT_TEMPLATE_ICON: &str = "📄";

/// A user-defined page template. `content` is markdown, turned into blocks
/// when a page is created from it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PageTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

impl Keyed for PageTemplate {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Create/update payload for a template.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TemplateBody {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub content: String,
}

impl TemplateBody {
    /// Blank names and icons fall back to the defaults, as the server stores them.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            self.name = DEFAULT_TEMPLATE_NAME.to_string();
        }
        if self.icon.is_empty() {
            self.icon = DEFAULT_TEMPLATE_ICON.to_string();
        }
        self
    }
}
