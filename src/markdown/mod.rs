//! Markdown in and out of the block model.
//!
//! Templates are stored as markdown and become blocks when a page is created
//! from one; the whole workspace can be exported as one markdown file per page.

use crate::models::nested::{KanbanBoard, LayoutContent, NestedContent, ToggleContent};
use crate::models::{Block, BlockType, Page};
use crate::state::workspace::Workspace;
use crate::state::DocumentStore;
use crate::util::{dedupe_name, sanitize_name};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

const CHECKED_KEY: &str = "checked";
const UNTITLED_FILE: &str = "untitled";
const LAYOUT_PLACEHOLDER: &str = "[Layout block]";
const KANBAN_PLACEHOLDER: &str = "[Kanban board]";

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,3})\s+(.*)$").expect("valid heading regex"));
static TASK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+]\s+\[([ xX])\]\s?(.*)$").expect("valid task regex"));
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+](?:\s+(.*))?$").expect("valid bullet regex"));
static ORDERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.(?:\s+(.*))?$").expect("valid ordered regex"));
static QUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s?(.*)$").expect("valid quote regex"));
static DIVIDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-{3,}|\*{3,})$").expect("valid divider regex"));

fn text_block(block_type: BlockType, content: &str, now_ms: i64) -> Block {
    Block::new(block_type, content.trim(), now_ms)
}

fn line_to_block(line: &str, now_ms: i64) -> Block {
    if DIVIDER_RE.is_match(line) {
        return Block::new(BlockType::Divider, "", now_ms);
    }
    if let Some(c) = HEADING_RE.captures(line) {
        let block_type = match c[1].len() {
            1 => BlockType::Heading1,
            2 => BlockType::Heading2,
            _ => BlockType::Heading3,
        };
        return text_block(block_type, &c[2], now_ms);
    }
    if let Some(c) = TASK_RE.captures(line) {
        let mut block = text_block(BlockType::TaskList, &c[2], now_ms);
        block
            .extra
            .insert(CHECKED_KEY.to_string(), serde_json::Value::Bool(&c[1] != " "));
        return block;
    }
    if let Some(c) = BULLET_RE.captures(line) {
        return text_block(BlockType::BulletList, c.get(1).map_or("", |m| m.as_str()), now_ms);
    }
    if let Some(c) = ORDERED_RE.captures(line) {
        return text_block(BlockType::OrderedList, c.get(1).map_or("", |m| m.as_str()), now_ms);
    }
    if let Some(c) = QUOTE_RE.captures(line) {
        return text_block(BlockType::Quote, &c[1], now_ms);
    }
    text_block(BlockType::Paragraph, line, now_ms)
}

/// One block per non-blank line; fenced code becomes a single code block.
/// Never returns an empty sequence.
pub fn blocks_from_markdown(markdown: &str, now_ms: i64) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut fence: Option<Vec<&str>> = None;

    for raw in markdown.lines() {
        let line = raw.trim_end();
        if line.trim_start().starts_with("```") {
            match fence.take() {
                Some(code) => blocks.push(Block::new(BlockType::Code, code.join("\n"), now_ms)),
                None => fence = Some(Vec::new()),
            }
            continue;
        }
        if let Some(code) = fence.as_mut() {
            code.push(raw);
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        blocks.push(line_to_block(line.trim_start(), now_ms));
    }
    // An unterminated fence keeps what it collected.
    if let Some(code) = fence {
        blocks.push(Block::new(BlockType::Code, code.join("\n"), now_ms));
    }
    if blocks.is_empty() {
        blocks.push(Block::empty_paragraph(now_ms));
    }
    blocks
}

fn is_checked(block: &Block) -> bool {
    block
        .extra
        .get(CHECKED_KEY)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

fn block_to_markdown(block: &Block, now_ms: i64) -> String {
    let content = block.content.as_str();
    match block.block_type {
        BlockType::Heading1 => format!("# {content}"),
        BlockType::Heading2 => format!("## {content}"),
        BlockType::Heading3 => format!("### {content}"),
        BlockType::BulletList => format!("- {content}"),
        BlockType::OrderedList => format!("1. {content}"),
        BlockType::TaskList => {
            let mark = if is_checked(block) { "x" } else { " " };
            format!("- [{mark}] {content}")
        }
        BlockType::Quote => format!("> {content}"),
        BlockType::Code => format!("```\n{content}\n```"),
        BlockType::Divider => "---".to_string(),
        BlockType::Kanban => {
            let board = KanbanBoard::parse(&block.id, content, now_ms);
            let mut lines = vec![KANBAN_PLACEHOLDER.to_string()];
            for column in &board.columns {
                lines.push(format!("- {}", column.title));
                lines.extend(column.cards.iter().map(|card| format!("  - {}", card.title)));
            }
            lines.join("\n")
        }
        BlockType::Layout => {
            let layout = LayoutContent::parse(&block.id, content, now_ms);
            let parts: Vec<String> = layout
                .template
                .slot_ids()
                .iter()
                .filter_map(|slot| layout.slot(slot))
                .map(|blocks| blocks_to_markdown(blocks, now_ms).trim().to_string())
                .filter(|md| !md.is_empty())
                .collect();
            if parts.is_empty() {
                LAYOUT_PLACEHOLDER.to_string()
            } else {
                parts.join("\n\n---\n\n")
            }
        }
        BlockType::Toggle => {
            let toggle = ToggleContent::parse(&block.id, content, now_ms);
            let body = blocks_to_markdown(&toggle.body, now_ms);
            format!("{}\n\n{}", toggle.header, body.trim_end())
        }
        _ => content.to_string(),
    }
}

/// Blocks separated by blank lines. Layout slots are linearized in slot order.
pub fn blocks_to_markdown(blocks: &[Block], now_ms: i64) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&block_to_markdown(block, now_ms));
        out.push_str("\n\n");
    }
    out
}

pub fn page_to_markdown(page: &Page, now_ms: i64) -> String {
    format!("# {}\n\n{}", page.title, blocks_to_markdown(&page.blocks, now_ms))
}

/// One exported page: `path` is relative, with `/` separators.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MarkdownFile {
    pub path: String,
    pub content: String,
}

impl Workspace {
    /// One file per page in display order. Pages in a category go under the
    /// category's folder; clashing file names get numeric suffixes.
    pub fn export_markdown(&self, now_ms: i64) -> Vec<MarkdownFile> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut files = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let dir = self
                .category_of(&page.id)
                .and_then(|id| self.category(id).ok())
                .map(|c| {
                    if c.folder_name.is_empty() {
                        sanitize_name(&c.name, UNTITLED_FILE)
                    } else {
                        c.folder_name.clone()
                    }
                });
            let stem = sanitize_name(&page.title, UNTITLED_FILE);
            let base = match &dir {
                Some(dir) => format!("{dir}/{stem}"),
                None => stem,
            };
            let unique = dedupe_name(&base, |candidate| taken.contains(candidate));
            taken.insert(unique.clone());
            files.push(MarkdownFile {
                path: format!("{unique}.md"),
                content: page_to_markdown(page, now_ms),
            });
        }
        files
    }
}

impl DocumentStore {
    pub fn export_markdown(&self) -> Vec<MarkdownFile> {
        let now = self.now_ms();
        self.read_untracked(|ws| ws.export_markdown(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DEFAULT_PAGE_ICON};

    const NOW: i64 = 1_700_000_000_000;

    fn kinds(blocks: &[Block]) -> Vec<(BlockType, &str)> {
        blocks.iter().map(|b| (b.block_type, b.content.as_str())).collect()
    }

    #[test]
    fn template_markdown_becomes_blocks() {
        let md = "## 📅 Date\n\n## 👥 Attendees\n- \n\n## ✅ Actions\n- [ ] call Bob\n- [x] book room\n> quoted\n1. first\n---\nplain text\n";
        let blocks = blocks_from_markdown(md, NOW);
        assert_eq!(
            kinds(&blocks),
            vec![
                (BlockType::Heading2, "📅 Date"),
                (BlockType::Heading2, "👥 Attendees"),
                (BlockType::BulletList, ""),
                (BlockType::Heading2, "✅ Actions"),
                (BlockType::TaskList, "call Bob"),
                (BlockType::TaskList, "book room"),
                (BlockType::Quote, "quoted"),
                (BlockType::OrderedList, "first"),
                (BlockType::Divider, ""),
                (BlockType::Paragraph, "plain text"),
            ]
        );
        assert!(!is_checked(&blocks[4]));
        assert!(is_checked(&blocks[5]));
    }

    #[test]
    fn fenced_code_is_one_block_and_empty_input_one_paragraph() {
        let blocks = blocks_from_markdown("```\nfn main() {}\n\n  x\n```\nafter", NOW);
        assert_eq!(
            kinds(&blocks),
            vec![(BlockType::Code, "fn main() {}\n\n  x"), (BlockType::Paragraph, "after")]
        );

        let blocks = blocks_from_markdown("  \n\n", NOW);
        assert_eq!(kinds(&blocks), vec![(BlockType::Paragraph, "")]);
    }

    #[test]
    fn blocks_render_back_to_markdown() {
        let mut task = Block::new(BlockType::TaskList, "done", NOW);
        task.extra.insert(CHECKED_KEY.into(), serde_json::Value::Bool(true));
        let mut layout = LayoutContent::default_content(NOW);
        layout.slots.insert("a".into(), vec![Block::new(BlockType::Heading1, "Left", NOW)]);
        layout.slots.insert("b".into(), vec![Block::new(BlockType::Paragraph, "Right", NOW)]);
        let blocks = vec![
            Block::new(BlockType::Heading2, "Plan", NOW),
            task,
            Block::new(BlockType::Code, "let x = 1;", NOW),
            Block::new(BlockType::Layout, layout.to_content(), NOW),
            Block::new(BlockType::Layout, "{broken", NOW),
        ];
        assert_eq!(
            blocks_to_markdown(&blocks, NOW),
            "## Plan\n\n- [x] done\n\n```\nlet x = 1;\n```\n\n# Left\n\n---\n\nRight\n\n[Layout block]\n\n"
        );
    }

    #[test]
    fn export_places_pages_under_category_folders() {
        let mut notes = Page::new_local("Meeting notes", DEFAULT_PAGE_ICON, NOW);
        notes.id = "p1".into();
        let mut twin = Page::new_local("Meeting notes", DEFAULT_PAGE_ICON, NOW);
        twin.id = "p2".into();
        let mut trip = Page::new_local("Trip: Jeju?", DEFAULT_PAGE_ICON, NOW);
        trip.id = "p3".into();
        trip.blocks[0].content = "pack".into();

        let ws = Workspace {
            pages: vec![notes, twin, trip],
            categories: vec![Category {
                id: "c1".into(),
                name: "Travel".into(),
                folder_name: "Travel".into(),
            }],
            category_order: vec!["c1".into()],
            category_map: [("p3".to_string(), "c1".to_string())].into_iter().collect(),
            ..Default::default()
        };

        let files = ws.export_markdown(NOW);
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Meeting_notes.md", "Meeting_notes_2.md", "Travel/Trip_Jeju.md"]);
        assert_eq!(files[2].content, "# Trip: Jeju?\n\npack\n\n");
    }
}
