//! Page templates: the fetched list, and pages created from an entry of it.

use super::workspace::Workspace;
use super::DocumentStore;
use crate::errors::{StoreError, StoreResult};
use crate::markdown::blocks_from_markdown;
use crate::models::{PageTemplate, DEFAULT_TEMPLATE_ICON};
use leptos::prelude::*;

impl Workspace {
    /// A new active page titled after the template, with its markdown as blocks.
    pub fn create_page_from_template(
        &mut self,
        template: &PageTemplate,
        category: Option<&str>,
        now_ms: i64,
    ) -> StoreResult<String> {
        let id = self.create_page(Some(&template.name), category, now_ms)?;
        let page = self.page_mut(&id)?;
        page.icon = if template.icon.is_empty() {
            DEFAULT_TEMPLATE_ICON.to_string()
        } else {
            template.icon.clone()
        };
        page.blocks = blocks_from_markdown(&template.content, now_ms);
        Ok(id)
    }
}

impl DocumentStore {
    pub fn templates(&self) -> ReadSignal<Vec<PageTemplate>> {
        self.templates.read_only()
    }

    pub fn template(&self, template_id: &str) -> Option<PageTemplate> {
        self.templates
            .with_untracked(|ts| ts.iter().find(|t| t.id == template_id).cloned())
    }

    pub fn set_templates(&self, templates: Vec<PageTemplate>) {
        tracing::debug!(count = templates.len(), "templates loaded");
        self.templates.set(templates);
    }

    /// Inserts or replaces by id.
    pub fn upsert_template(&self, template: PageTemplate) {
        self.templates.update(|ts| match ts.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => ts.push(template),
        });
    }

    pub fn remove_template(&self, template_id: &str) -> bool {
        let mut removed = false;
        self.templates.update(|ts| {
            let before = ts.len();
            ts.retain(|t| t.id != template_id);
            removed = ts.len() != before;
        });
        removed
    }

    pub fn create_page_from_template(&self, template_id: &str, category: Option<&str>) -> StoreResult<String> {
        let template = self
            .template(template_id)
            .ok_or_else(|| StoreError::TemplateNotFound(template_id.to_string()))?;
        let now = self.now_ms();
        let id = self.mutate(|ws| ws.create_page_from_template(&template, category, now))?;
        tracing::debug!(page_id = %id, template_id, "page created from template");
        self.sync.ensure_page_created(&id, category.map(String::from));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::StoreError;
    use crate::models::{BlockType, PageTemplate};
    use crate::state::test_support::test_store;
    use crate::util::is_tmp_id;
    use leptos::prelude::*;

    fn journal() -> PageTemplate {
        PageTemplate {
            id: "t1".into(),
            name: "Daily journal".into(),
            icon: "📅".into(),
            description: "mood and todos".into(),
            content: "## Mood\n\n## Todo\n- [ ] \n- [ ] \n".into(),
        }
    }

    #[test]
    fn page_from_template_takes_name_icon_and_blocks() {
        let (store, _clock) = test_store(1000);
        let cat = store.create_category("Journal").unwrap();
        store.set_templates(vec![journal()]);

        let id = store.create_page_from_template("t1", Some(&cat)).unwrap();
        assert!(is_tmp_id(&id));
        assert!(store.sync().is_creating(&id));
        store.read_untracked(|ws| {
            let page = ws.page(&id).unwrap();
            assert_eq!(page.title, "Daily journal");
            assert_eq!(page.icon, "📅");
            let types: Vec<_> = page.blocks.iter().map(|b| b.block_type).collect();
            assert_eq!(
                types,
                vec![BlockType::Heading2, BlockType::Heading2, BlockType::TaskList, BlockType::TaskList]
            );
            assert_eq!(ws.category_of(&id), Some(cat.as_str()));
            assert_eq!(ws.current_page_id.as_deref(), Some(id.as_str()));
        });
    }

    #[test]
    fn blank_template_still_yields_a_usable_page() {
        let (store, _clock) = test_store(1000);
        store.set_templates(vec![PageTemplate {
            id: "t2".into(),
            name: "  ".into(),
            icon: String::new(),
            description: String::new(),
            content: String::new(),
        }]);
        let id = store.create_page_from_template("t2", None).unwrap();
        store.read_untracked(|ws| {
            let page = ws.page(&id).unwrap();
            assert_eq!(page.title, "Untitled");
            assert_eq!(page.icon, "📄");
            assert_eq!(page.blocks.len(), 1);
        });
    }

    #[test]
    fn unknown_template_changes_nothing() {
        let (store, _clock) = test_store(1000);
        assert_eq!(
            store.create_page_from_template("missing", None),
            Err(StoreError::TemplateNotFound("missing".into()))
        );
        assert!(store.read_untracked(|ws| ws.pages.is_empty()));
        assert!(store.sync().is_idle());
    }

    #[test]
    fn template_list_upserts_and_removes_by_id() {
        let (store, _clock) = test_store(1000);
        store.set_templates(vec![journal()]);
        let mut renamed = journal();
        renamed.name = "Evening journal".into();
        store.upsert_template(renamed);
        store.upsert_template(PageTemplate { id: "t9".into(), ..journal() });

        let names: Vec<String> = store.templates().get_untracked().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Evening journal", "Daily journal"]);
        assert!(store.remove_template("t1"));
        assert!(!store.remove_template("t1"));
        assert_eq!(store.template("t9").map(|t| t.id), Some("t9".to_string()));
    }
}
