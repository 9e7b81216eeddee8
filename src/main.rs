//! PulseWatch - market snapshot freshness monitor
//!
//! Watches the snapshot store for expected periodic market data and alerts
//! via Telegram when an occurrence's data has not landed within tolerance.
//! Everything is wired here once and passed down explicitly.

use std::{env, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulsewatch_backend::{
    api::{router, AppState},
    monitoring::{
        AlertDispatcher, CycleMonitor, DailyPresenceMonitor, FreshnessChecker, MonitoringConfig,
        MonitoringScheduler, NotificationChannel,
    },
    notify::TelegramNotifier,
    storage::SnapshotDb,
};

#[tokio::main]
async fn main() -> Result<()> {
    // No .env file is fine; environment variables may be set directly
    dotenv().ok();
    init_tracing();

    info!("PulseWatch snapshot monitor starting");

    let config = MonitoringConfig::from_env();
    info!(
        symbols = config.expected_symbols.len(),
        cadences = config.cadences.len(),
        interval_secs = config.check_interval_secs,
        tolerance_minutes = config.tolerance_minutes,
        "Monitoring configuration loaded"
    );

    let db_path = env::var("DB_PATH").unwrap_or_else(|_| "pulsewatch_snapshots.db".to_string());
    let store = Arc::new(SnapshotDb::new(&db_path).context("Failed to open snapshot database")?);
    let snapshot_count = store.len().await?;
    info!(path = %db_path, snapshots = snapshot_count, "Snapshot database ready");

    let notifier = Arc::new(TelegramNotifier::from_env());
    let notifications_configured = notifier.is_configured();

    // Dedup spans the tolerance window so one missed occurrence alerts once
    let dedup_ttl = Duration::from_secs(config.tolerance_minutes.unsigned_abs() * 60);
    let channel: Arc<dyn NotificationChannel> = notifier;
    let dispatcher = Arc::new(AlertDispatcher::new(channel, dedup_ttl));

    let checker = FreshnessChecker::new(store.clone());
    let interval_secs = config.check_interval_secs;
    let daily = Arc::new(DailyPresenceMonitor::new(
        store.clone(),
        config.expected_symbols.clone(),
    ));
    let monitor = Arc::new(CycleMonitor::new(config, checker, dispatcher));
    let scheduler = Arc::new(MonitoringScheduler::new(monitor.clone(), interval_secs));

    scheduler.start().await;

    let state = AppState {
        scheduler,
        monitor,
        daily,
        notifications_configured,
    };
    let app = router(state).layer(CorsLayer::permissive());

    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsewatch_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
