//! Local full-text search over page titles and block text.

use crate::models::nested::{KanbanBoard, LayoutContent, NestedContent, ToggleContent};
use crate::models::{Block, BlockType, Page};
use crate::state::workspace::Workspace;
use crate::state::DocumentStore;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const SNIPPET_RADIUS: usize = 60;
pub const MAX_SEARCH_RESULTS: usize = 20;
const SNIPPET_FALLBACK_LEN: usize = 120;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Title,
    Content,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub page_id: String,
    pub page_title: String,
    pub page_icon: String,
    pub block_id: Option<String>,
    pub block_type: Option<BlockType>,
    pub snippet: String,
    pub match_type: MatchType,
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Drops markup, decodes the common entities and collapses whitespace.
pub fn strip_html(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"");
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Case-insensitive char index of `needle` in `haystack`.
fn find_folded(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().map(fold).collect();
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|w| w.iter().map(|c| fold(*c)).eq(needle.iter().copied()))
}

fn contains_folded(text: &str, needle: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    find_folded(&chars, needle).is_some()
}

/// `radius` characters of context on each side of the first match.
pub fn make_snippet(text: &str, keyword: &str, radius: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let Some(ix) = find_folded(&chars, keyword) else {
        let head: String = chars.iter().take(SNIPPET_FALLBACK_LEN).collect();
        return if chars.len() > SNIPPET_FALLBACK_LEN {
            format!("{head}...")
        } else {
            head
        };
    };
    let start = ix.saturating_sub(radius);
    let end = (ix + keyword.chars().count() + radius).min(chars.len());
    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < chars.len() {
        snippet.push_str("...");
    }
    snippet
}

struct Collector<'a> {
    query: &'a str,
    now_ms: i64,
    hits: Vec<SearchHit>,
}

impl Collector<'_> {
    fn full(&self) -> bool {
        self.hits.len() >= MAX_SEARCH_RESULTS
    }

    fn push(&mut self, page: &Page, block: Option<&Block>, text: &str, match_type: MatchType) {
        if self.full() || !contains_folded(text, self.query) {
            return;
        }
        self.hits.push(SearchHit {
            page_id: page.id.clone(),
            page_title: page.title.clone(),
            page_icon: page.icon.clone(),
            block_id: block.map(|b| b.id.clone()),
            block_type: block.map(|b| b.block_type),
            snippet: make_snippet(text, self.query, SNIPPET_RADIUS),
            match_type,
        });
    }

    /// Composite blocks are searched through their parsed structure, not the raw JSON.
    fn block(&mut self, page: &Page, block: &Block) {
        match block.block_type {
            BlockType::Toggle => {
                let toggle = ToggleContent::parse(&block.id, &block.content, self.now_ms);
                self.push(page, Some(block), &strip_html(&toggle.header), MatchType::Content);
                for child in &toggle.body {
                    self.block(page, child);
                }
            }
            BlockType::Layout => {
                let layout = LayoutContent::parse(&block.id, &block.content, self.now_ms);
                for child in layout.slots.values().flatten() {
                    self.block(page, child);
                }
            }
            BlockType::Kanban => {
                let board = KanbanBoard::parse(&block.id, &block.content, self.now_ms);
                for card in board.columns.iter().flat_map(|c| &c.cards) {
                    self.push(page, Some(block), &card.title, MatchType::Content);
                }
            }
            _ => self.push(page, Some(block), &strip_html(&block.content), MatchType::Content),
        }
    }
}

impl Workspace {
    /// Title and content matches in display order, capped at [`MAX_SEARCH_RESULTS`].
    pub fn search(&self, query: &str, now_ms: i64) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() {
            return vec![];
        }
        let mut collector = Collector {
            query,
            now_ms,
            hits: vec![],
        };
        for page in &self.pages {
            if collector.full() {
                break;
            }
            collector.push(page, None, &page.title, MatchType::Title);
            for block in &page.blocks {
                collector.block(page, block);
            }
        }
        collector.hits
    }
}

impl DocumentStore {
    /// Tracked, so a search view re-runs as pages change.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let now = self.now_ms();
        self.read(|ws| ws.search(query, now))
    }
}
