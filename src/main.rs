//! Wiring & DI. Entry point: pick the data store, inject it into services, run UI.
//! No business logic here.

use chantier_board::adapters::persistence::{MemoryStore, SeedData, SqliteStore};
use chantier_board::adapters::remote::PostgrestStore;
use chantier_board::adapters::ui::tui::{TuiInputPort, TuiServices};
use chantier_board::domain::UserContext;
use chantier_board::ports::{
    BillingRepoPort, ChangeFeedPort, ChantierRepoPort, DataStore, InputPort, NotificationPort,
    TaskRepoPort,
};
use chantier_board::shared::config::{AppConfig, StoreKind};
use chantier_board::usecases::{
    BillingService, DashboardService, PlanningService, ReportService, TaskService, WatcherService,
};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, using defaults");
        AppConfig::default()
    });
    let ctx = UserContext::new(cfg.user_id_or_default());
    chantier_board::adapters::ui::init_ui(&ctx.user_id);

    let feed_capacity = cfg.feed_capacity_or_default();
    match cfg.store_kind() {
        StoreKind::Sqlite => {
            let data_dir = cfg.data_dir_or_default();
            info!(path = %data_dir.display(), "data directory");
            let store = SqliteStore::connect(&data_dir, feed_capacity)
                .await
                .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?;
            run(Arc::new(store), &cfg, ctx).await
        }
        StoreKind::Memory => {
            info!("in-memory data store; nothing is persisted");
            run(Arc::new(MemoryStore::with_feed_capacity(feed_capacity)), &cfg, ctx).await
        }
        StoreKind::Supabase => {
            let url = cfg
                .supabase_url()
                .ok_or_else(|| anyhow::anyhow!("Set SUPABASE_URL to use the Supabase store"))?;
            let key = cfg
                .supabase_key()
                .ok_or_else(|| anyhow::anyhow!("Set SUPABASE_KEY to use the Supabase store"))?;
            let store = PostgrestStore::new(&url, key, cfg.supabase_access_token(), feed_capacity);
            run(Arc::new(store), &cfg, ctx).await
        }
    }
}

/// Seed, build services, start the watcher and run the dashboard on `store`.
async fn run<S: DataStore + 'static>(
    store: Arc<S>,
    cfg: &AppConfig,
    ctx: UserContext,
) -> anyhow::Result<()> {
    if let Some(seed_file) = cfg.seed_file.as_deref() {
        let seed = SeedData::load(seed_file)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        info!(seed_file, "applying seed file");
        seed.apply(store.as_ref())
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    let chantiers: Arc<dyn ChantierRepoPort> = Arc::clone(&store) as Arc<dyn ChantierRepoPort>;
    let tasks: Arc<dyn TaskRepoPort> = Arc::clone(&store) as Arc<dyn TaskRepoPort>;
    let billing_repo: Arc<dyn BillingRepoPort> = Arc::clone(&store) as Arc<dyn BillingRepoPort>;
    let notifications: Arc<dyn NotificationPort> =
        Arc::clone(&store) as Arc<dyn NotificationPort>;

    // --- Services ---
    let dashboard = Arc::new(DashboardService::new(
        Arc::clone(&chantiers),
        Arc::clone(&tasks),
    ));
    let task_service = Arc::new(TaskService::new(
        Arc::clone(&chantiers),
        Arc::clone(&tasks),
        Arc::clone(&notifications),
        Arc::clone(&dashboard),
    ));
    let planning = Arc::new(PlanningService::new(
        Arc::clone(&chantiers),
        Arc::clone(&tasks),
    ));
    let billing = Arc::new(BillingService::new(
        Arc::clone(&chantiers),
        Arc::clone(&billing_repo),
    ));
    let reports_dir = cfg.reports_dir_or_default();
    info!(path = %reports_dir.display(), "reports directory");
    let reports = Arc::new(ReportService::new(
        Arc::clone(&chantiers),
        Arc::clone(&dashboard),
        Arc::clone(&billing),
        reports_dir,
    ));

    // --- Watcher: follows the store's change feed in the background ---
    let watcher = WatcherService::new(Arc::clone(&dashboard), Arc::clone(&notifications));
    let feed = store.subscribe();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run(feed).await {
            warn!(error = %e, "watcher stopped");
        }
    });

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        ctx,
        TuiServices {
            dashboard,
            tasks: task_service,
            planning,
            billing,
            reports,
            notifications,
        },
        cfg.workload_buckets_or_default(),
    ));

    // --- Run (main menu until Quit) ---
    let result = input_port.run().await;
    watcher_handle.abort();
    result.map_err(|e| anyhow::anyhow!("{}", e))
}
