//! Application configuration. Data store selection, paths, current user.

use serde::Deserialize;
use std::path::PathBuf;

/// Default capacity of the change feed between stores and the watcher.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Default number of buckets shown in the workload table.
pub const DEFAULT_WORKLOAD_BUCKETS: usize = 12;

/// Which data store adapter to wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
    Supabase,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Local data directory (SQLite file, reports). Read from CHANTIER_DATA_DIR.
    pub data_dir: Option<String>,

    /// Reports output directory. Defaults to `<data_dir>/reports`.
    #[serde(default)]
    pub reports_dir: Option<String>,

    /// "sqlite" (default), "memory" or "supabase". Read from CHANTIER_STORE.
    #[serde(default)]
    pub store: Option<String>,

    /// JSON seed applied at startup. Read from CHANTIER_SEED_FILE.
    #[serde(default)]
    pub seed_file: Option<String>,

    /// Current user id, passed explicitly to every mutation. Read from CHANTIER_USER_ID.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Buckets shown in the workload table (default 12). Read from CHANTIER_WORKLOAD_BUCKETS.
    #[serde(default)]
    pub workload_buckets: Option<usize>,

    /// Change feed capacity (default 256). Read from CHANTIER_FEED_CAPACITY.
    #[serde(default)]
    pub feed_capacity: Option<usize>,

    // ─────────────────────────────────────────────────────────────────────────
    // Hosted data store (Supabase)
    // ─────────────────────────────────────────────────────────────────────────
    /// Project URL, e.g. https://abcd.supabase.co. Read from SUPABASE_URL.
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// Anon or service key. Read from SUPABASE_KEY.
    #[serde(default)]
    pub supabase_key: Option<String>,

    /// User access token (JWT) for row-level security. Read from SUPABASE_ACCESS_TOKEN.
    #[serde(default)]
    pub supabase_access_token: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("CHANTIER"));
        if let Ok(path) = std::env::var("CHANTIER_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    pub fn reports_dir_or_default(&self) -> PathBuf {
        self.reports_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("reports"))
    }

    /// Returns the current user id. Defaults to the OS user name, then "local".
    pub fn user_id_or_default(&self) -> String {
        self.user_id
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "local".to_string())
    }

    pub fn workload_buckets_or_default(&self) -> usize {
        self.workload_buckets
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_WORKLOAD_BUCKETS)
    }

    pub fn feed_capacity_or_default(&self) -> usize {
        self.feed_capacity
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_FEED_CAPACITY)
    }

    /// Store selected by CHANTIER_STORE. Falls back to Supabase when it is
    /// configured, SQLite otherwise.
    pub fn store_kind(&self) -> StoreKind {
        match self.store.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("memory") => StoreKind::Memory,
            Some("supabase") => StoreKind::Supabase,
            Some("sqlite") => StoreKind::Sqlite,
            _ if self.is_supabase_configured() => StoreKind::Supabase,
            _ => StoreKind::Sqlite,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Supabase Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the project URL from config or SUPABASE_URL env.
    pub fn supabase_url(&self) -> Option<String> {
        self.supabase_url
            .clone()
            .or_else(|| std::env::var("SUPABASE_URL").ok())
    }

    /// Returns the API key from config or SUPABASE_KEY env.
    pub fn supabase_key(&self) -> Option<String> {
        self.supabase_key
            .clone()
            .or_else(|| std::env::var("SUPABASE_KEY").ok())
    }

    /// Returns the user access token from config or SUPABASE_ACCESS_TOKEN env.
    pub fn supabase_access_token(&self) -> Option<String> {
        self.supabase_access_token
            .clone()
            .or_else(|| std::env::var("SUPABASE_ACCESS_TOKEN").ok())
    }

    /// Returns true if URL and key are both present.
    pub fn is_supabase_configured(&self) -> bool {
        self.supabase_url().is_some() && self.supabase_key().is_some()
    }
}
