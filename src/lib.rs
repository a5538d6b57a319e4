//! Local-first document store for a block-based notes app.
//!
//! The [`state::DocumentStore`] owns every page, block and category and
//! applies edits synchronously; [`state::sync`] coalesces them into deferred
//! calls to a [`api::PersistenceService`]; [`state::drag`] turns pointer
//! gestures into reorder moves. [`markdown`] converts between blocks and
//! markdown for templates and export. Rendering is left to the embedding app,
//! which reads the store's signals.

pub mod api;
mod cache;
pub mod errors;
pub mod markdown;
pub mod models;
pub mod reorder;
pub mod search;
pub mod state;
mod storage;
pub mod util;

pub use api::{ApiClient, ApiError, EnvConfig, PersistenceService};
pub use errors::{StoreError, StoreResult};
pub use markdown::{blocks_from_markdown, blocks_to_markdown, MarkdownFile};
pub use state::drag::{ContainerId, DragSession, HoverTarget, ItemKind};
pub use state::sync::{SyncCoalescer, SyncNotice, SyncWorker};
pub use state::{provide_store, use_store, DocumentStore};

#[cfg(target_arch = "wasm32")]
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

/// `tracing` output for the browser console, one `console.log` per event.
#[cfg(target_arch = "wasm32")]
mod console_log {
    use std::io;
    use tracing_subscriber::fmt::MakeWriter;

    pub(crate) struct ConsoleWriter(Vec<u8>);

    impl io::Write for ConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.0);
            let line = line.trim_end();
            if !line.is_empty() {
                web_sys::console::log_1(&line.into());
            }
        }
    }

    pub(crate) struct Console;

    impl<'a> MakeWriter<'a> for Console {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter(Vec::new())
        }
    }
}

/// Installs the global `tracing` subscriber. Safe to call more than once.
///
/// Natively the filter comes from `RUST_LOG` (default `info`); in the browser
/// it is fixed at `info` and panics are routed to the console as well.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_writer(console_log::Console)
            .without_time()
            .with_ansi(false)
            .try_init();
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}

/// Builds the store and starts syncing it against the configured backend.
///
/// Loading runs in the background; the returned store is usable at once and
/// fills in when the fetch (or the offline snapshot) arrives.
#[cfg(target_arch = "wasm32")]
pub fn boot(config: &EnvConfig) -> DocumentStore {
    use std::rc::Rc;

    let store = DocumentStore::new(config);
    let worker = SyncWorker::new(store.clone(), Rc::new(ApiClient::from_config(config)));
    tracing::info!(api_url = %config.api_url, autosave_ms = config.autosave_ms, "booting");
    leptos::task::spawn_local(async move {
        worker.bootstrap().await;
        worker.refresh_templates().await;
        worker.start();
    });
    store
}

#[cfg(target_arch = "wasm32")]
#[cfg_attr(not(test), wasm_bindgen(start))]
pub fn main() {
    init_logging();
    let store = boot(&EnvConfig::new());
    mount_to_body(move || provide_store(store));
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn env_config_defaults_without_window_env() {
        let config = EnvConfig::new();
        assert!(!config.api_url.is_empty());
        assert!(config.autosave_ms > 0);
    }
}
