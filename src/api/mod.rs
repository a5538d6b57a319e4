use crate::models::{Category, Page, PageTemplate, TemplateBody, WorkspaceSnapshot};
use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_AUTOSAVE_MS: u32 = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            status: None,
            message: e.to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            status: Some(status.as_u16()),
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    /// Backend could not be reached at all (as opposed to answering with an error).
    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnvConfig {
    pub api_url: String,
    /// Quiet interval of the page-save debounce.
    pub autosave_ms: u32,
}

impl EnvConfig {
    pub fn new() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            Self::from_lookup(window_env)
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::from_lookup(|key| std::env::var(format!("VAULT_NOTES_{key}")).ok())
        }
    }

    /// Builds a config from a key lookup (`API_URL`, `api_url`, `AUTOSAVE_MS`),
    /// falling back to defaults for missing or unusable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("API_URL")
            .or_else(|| lookup("api_url"))
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let autosave_ms = lookup("AUTOSAVE_MS")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_AUTOSAVE_MS);

        Self {
            api_url,
            autosave_ms,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            autosave_ms: DEFAULT_AUTOSAVE_MS,
        }
    }
}

/// Reads `window.ENV[key]`, accepting strings and numbers.
#[cfg(target_arch = "wasm32")]
fn window_env(key: &str) -> Option<String> {
    let env = web_sys::window()?.get("ENV")?;
    if env.is_undefined() || !env.is_object() {
        return None;
    }
    let value = js_sys::Reflect::get(&env, &key.into()).ok()?;
    value
        .as_string()
        .or_else(|| value.as_f64().map(|n| format!("{}", n as i64)))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    pub title: String,
    pub icon: String,
    pub category_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OkResponse {
    #[serde(default)]
    pub ok: bool,
}

/// `renamed` with a `page` means the server moved the page's storage folder
/// and rewrote resource URLs; the returned page replaces the local one.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UpsertPageResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub renamed: bool,
    #[serde(default)]
    pub page: Option<Page>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentRequest {
    pub page_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReorderRequest {
    pub order: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveCategoryRequest {
    pub category_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MovePageResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub moved: bool,
    #[serde(default)]
    pub page: Option<Page>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CategoryNameRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RenameCategoryResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub renamed: bool,
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCategoryResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub has_pages: bool,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TemplateListResponse {
    #[serde(default)]
    pub templates: Vec<PageTemplate>,
}

/// Body of `POST /api/import`; `data` is a backup as produced by the export.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImportRequest {
    pub data: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ImportResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub imported: usize,
}

/// The remote persistence boundary.
///
/// Futures are `!Send`: in the browser everything runs on one thread, and the
/// worker holds the service as `Rc<dyn PersistenceService>`.
pub trait PersistenceService {
    fn fetch_all(&self) -> LocalBoxFuture<'_, ApiResult<WorkspaceSnapshot>>;

    fn create_page(&self, req: CreatePageRequest) -> LocalBoxFuture<'_, ApiResult<Page>>;

    fn upsert_page(&self, page: Page) -> LocalBoxFuture<'_, ApiResult<UpsertPageResponse>>;

    fn delete_page(&self, page_id: String) -> LocalBoxFuture<'_, ApiResult<()>>;

    fn set_active_page(&self, page_id: Option<String>) -> LocalBoxFuture<'_, ApiResult<()>>;

    fn reorder_pages(&self, order: Vec<String>) -> LocalBoxFuture<'_, ApiResult<()>>;

    fn move_page_to_category(
        &self,
        page_id: String,
        category_id: Option<String>,
    ) -> LocalBoxFuture<'_, ApiResult<MovePageResponse>>;

    fn create_category(&self, name: String) -> LocalBoxFuture<'_, ApiResult<Category>>;

    fn rename_category(
        &self,
        category_id: String,
        name: String,
    ) -> LocalBoxFuture<'_, ApiResult<RenameCategoryResponse>>;

    fn delete_category(&self, category_id: String)
        -> LocalBoxFuture<'_, ApiResult<DeleteCategoryResponse>>;

    fn reorder_categories(&self, order: Vec<String>) -> LocalBoxFuture<'_, ApiResult<()>>;

    fn list_templates(&self) -> LocalBoxFuture<'_, ApiResult<Vec<PageTemplate>>>;

    fn create_template(&self, body: TemplateBody) -> LocalBoxFuture<'_, ApiResult<PageTemplate>>;

    fn update_template(
        &self,
        template_id: String,
        body: TemplateBody,
    ) -> LocalBoxFuture<'_, ApiResult<PageTemplate>>;

    fn delete_template(&self, template_id: String) -> LocalBoxFuture<'_, ApiResult<()>>;

    /// The whole vault as one JSON document.
    fn export_backup(&self) -> LocalBoxFuture<'_, ApiResult<serde_json::Value>>;

    /// Replaces the whole vault with a backup. Returns the number of pages restored.
    fn import_backup(&self, data: serde_json::Value) -> LocalBoxFuture<'_, ApiResult<usize>>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> ApiResult<T> {
        let ctx = format!("{method} {path}");
        let mut req = self.client.request(method, self.url(path));
        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, &ctx))
        }
    }

    async fn request_ok(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> ApiResult<()> {
        let _: OkResponse = self.request_api(method, path, body).await?;
        Ok(())
    }
}

fn page_path(page_id: &str) -> String {
    format!("/api/pages/{}", urlencoding::encode(page_id))
}

fn category_path(category_id: &str) -> String {
    format!("/api/categories/{}", urlencoding::encode(category_id))
}

fn template_path(template_id: &str) -> String {
    format!("/api/templates/{}", urlencoding::encode(template_id))
}

const NO_BODY: Option<&()> = None;

impl PersistenceService for ApiClient {
    fn fetch_all(&self) -> LocalBoxFuture<'_, ApiResult<WorkspaceSnapshot>> {
        async move {
            self.request_api(reqwest::Method::GET, "/api/pages", NO_BODY)
                .await
        }
        .boxed_local()
    }

    fn create_page(&self, req: CreatePageRequest) -> LocalBoxFuture<'_, ApiResult<Page>> {
        async move {
            self.request_api(reqwest::Method::POST, "/api/pages", Some(&req))
                .await
        }
        .boxed_local()
    }

    fn upsert_page(&self, page: Page) -> LocalBoxFuture<'_, ApiResult<UpsertPageResponse>> {
        async move {
            self.request_api(reqwest::Method::PUT, &page_path(&page.id), Some(&page))
                .await
        }
        .boxed_local()
    }

    fn delete_page(&self, page_id: String) -> LocalBoxFuture<'_, ApiResult<()>> {
        async move {
            self.request_ok(reqwest::Method::DELETE, &page_path(&page_id), NO_BODY)
                .await
        }
        .boxed_local()
    }

    fn set_active_page(&self, page_id: Option<String>) -> LocalBoxFuture<'_, ApiResult<()>> {
        async move {
            self.request_ok(
                reqwest::Method::PATCH,
                "/api/current",
                Some(&SetCurrentRequest { page_id }),
            )
            .await
        }
        .boxed_local()
    }

    fn reorder_pages(&self, order: Vec<String>) -> LocalBoxFuture<'_, ApiResult<()>> {
        async move {
            self.request_ok(
                reqwest::Method::PATCH,
                "/api/pages/reorder",
                Some(&ReorderRequest { order }),
            )
            .await
        }
        .boxed_local()
    }

    fn move_page_to_category(
        &self,
        page_id: String,
        category_id: Option<String>,
    ) -> LocalBoxFuture<'_, ApiResult<MovePageResponse>> {
        async move {
            self.request_api(
                reqwest::Method::PATCH,
                &format!("{}/category", page_path(&page_id)),
                Some(&MoveCategoryRequest { category_id }),
            )
            .await
        }
        .boxed_local()
    }

    fn create_category(&self, name: String) -> LocalBoxFuture<'_, ApiResult<Category>> {
        async move {
            self.request_api(
                reqwest::Method::POST,
                "/api/categories",
                Some(&CategoryNameRequest { name }),
            )
            .await
        }
        .boxed_local()
    }

    fn rename_category(
        &self,
        category_id: String,
        name: String,
    ) -> LocalBoxFuture<'_, ApiResult<RenameCategoryResponse>> {
        async move {
            self.request_api(
                reqwest::Method::PUT,
                &category_path(&category_id),
                Some(&CategoryNameRequest { name }),
            )
            .await
        }
        .boxed_local()
    }

    fn delete_category(
        &self,
        category_id: String,
    ) -> LocalBoxFuture<'_, ApiResult<DeleteCategoryResponse>> {
        async move {
            self.request_api(reqwest::Method::DELETE, &category_path(&category_id), NO_BODY)
                .await
        }
        .boxed_local()
    }

    fn reorder_categories(&self, order: Vec<String>) -> LocalBoxFuture<'_, ApiResult<()>> {
        async move {
            self.request_ok(
                reqwest::Method::PATCH,
                "/api/categories/reorder",
                Some(&ReorderRequest { order }),
            )
            .await
        }
        .boxed_local()
    }

    fn list_templates(&self) -> LocalBoxFuture<'_, ApiResult<Vec<PageTemplate>>> {
        async move {
            let res: TemplateListResponse = self
                .request_api(reqwest::Method::GET, "/api/templates", NO_BODY)
                .await?;
            Ok(res.templates)
        }
        .boxed_local()
    }

    fn create_template(&self, body: TemplateBody) -> LocalBoxFuture<'_, ApiResult<PageTemplate>> {
        async move {
            self.request_api(reqwest::Method::POST, "/api/templates", Some(&body))
                .await
        }
        .boxed_local()
    }

    fn update_template(
        &self,
        template_id: String,
        body: TemplateBody,
    ) -> LocalBoxFuture<'_, ApiResult<PageTemplate>> {
        async move {
            self.request_api(reqwest::Method::PUT, &template_path(&template_id), Some(&body))
                .await
        }
        .boxed_local()
    }

    fn delete_template(&self, template_id: String) -> LocalBoxFuture<'_, ApiResult<()>> {
        async move {
            self.request_ok(reqwest::Method::DELETE, &template_path(&template_id), NO_BODY)
                .await
        }
        .boxed_local()
    }

    fn export_backup(&self) -> LocalBoxFuture<'_, ApiResult<serde_json::Value>> {
        async move {
            self.request_api(reqwest::Method::GET, "/api/export/json", NO_BODY)
                .await
        }
        .boxed_local()
    }

    fn import_backup(&self, data: serde_json::Value) -> LocalBoxFuture<'_, ApiResult<usize>> {
        async move {
            let res: ImportResponse = self
                .request_api(reqwest::Method::POST, "/api/import", Some(&ImportRequest { data }))
                .await?;
            Ok(res.imported)
        }
        .boxed_local()
    }
}
