use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

pub(crate) const TMP_ID_PREFIX: &str = "tmp-";

/// Time source for debounce deadlines and entity timestamps.
///
/// The store never reads the wall clock directly so the coalescing window can be
/// driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// A clock that only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start_ms)))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) fn now_ms() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now().round() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Utc::now().timestamp_millis()
    }
}

/// RFC 3339 timestamp (millisecond precision, `Z` suffix) for a unix-ms instant.
pub(crate) fn iso_from_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

static TMP_COUNTER: AtomicU32 = AtomicU32::new(1);

fn random_suffix() -> u32 {
    let mut buf = [0u8; 4];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u32::from_le_bytes(buf),
        Err(_) => TMP_COUNTER.fetch_add(1, Ordering::SeqCst),
    }
}

/// Optimistic local id for an entity whose real id the server allocates.
pub(crate) fn new_tmp_id(now_ms: i64) -> String {
    format!("{TMP_ID_PREFIX}{now_ms}-{:08x}", random_suffix())
}

pub fn is_tmp_id(id: &str) -> bool {
    id.starts_with(TMP_ID_PREFIX)
}

const NAME_MAX_CHARS: usize = 30;

static FORBIDDEN_NAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid forbidden-char regex"));
static DOTS_ONLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.+$").expect("valid dots regex"));
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static UNDERSCORE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid underscore regex"));

/// Filesystem-safe folder name derived from a user-facing name.
pub(crate) fn sanitize_name(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    let source = if trimmed.is_empty() { fallback } else { trimmed };

    let stripped = FORBIDDEN_NAME_CHARS_RE.replace_all(source, "");
    if DOTS_ONLY_RE.is_match(&stripped) {
        return fallback.to_string();
    }
    let spaced = WHITESPACE_RUN_RE.replace_all(&stripped, "_");
    let collapsed = UNDERSCORE_RUN_RE.replace_all(&spaced, "_");

    let out: String = collapsed.trim_matches('_').chars().take(NAME_MAX_CHARS).collect();
    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}

/// Appends `_2`, `_3`, ... until `taken` no longer reports a clash.
pub(crate) fn dedupe_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base}_{counter}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
