//! ThreatSentry API Server
//!
//! Usage:
//!   cargo run --bin threat_sentry
//!
//! Environment (also read from .env):
//!   HOST / PORT                 - Bind address (default: 0.0.0.0:5000)
//!   ABUSEIPDB_API_KEY           - AbuseIPDB key (IP lookups)
//!   VIRUSTOTAL_API_KEY          - VirusTotal key
//!   ALIENVAULT_API_KEY          - AlienVault OTX key (optional)
//!   FRONTEND_URL                - Extra allowed CORS origin
//!   SNAPSHOT_PATH               - Persist records and stats across restarts
//!   RUST_LOG                    - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use threat_sentry::api::{create_router, spawn_maintenance, AppState};
use threat_sentry::utils::constants::APP_VERSION;
use threat_sentry::AppConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr();

    let state = Arc::new(AppState::new(config)?);

    match state.restore_snapshot() {
        Ok(()) if state.config.snapshot_path.is_some() => {
            info!("💾 Restored {} records from snapshot", state.store.len());
        }
        Ok(()) => {}
        Err(e) => warn!("⚠️ Snapshot not restored: {}", e),
    }

    let _maintenance = spawn_maintenance(state.clone());
    info!("🧹 Background maintenance task started");

    let app = create_router(state.clone());

    info!("🚀 ThreatSentry API starting on http://{}", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /api/ioc/lookup      - Analyze an IP, domain, hash or URL");
    info!("  GET  /api/ioc/recent      - Most recently analyzed indicators");
    info!("  GET  /api/ioc/:id         - Stored record by id");
    info!("  GET  /api/stats           - Lookup counters");
    info!("  POST /api/stats/reset     - Reset lookup counters");
    info!("  GET  /api/health          - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(&addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("");
    info!("🛑 Shutdown signal received, cleaning up...");

    let stats = state.stats.get_stats();
    info!("   Total lookups: {}", stats.total_lookups);
    info!("   Threats detected: {}", stats.threats_detected);
    info!("   Critical threats: {}", stats.critical_threats);

    match state.persist_snapshot() {
        Ok(Some(saved)) => info!("   ✅ Snapshot saved ({} records)", saved),
        Ok(None) => {}
        Err(e) => warn!("   ⚠️ Failed to save snapshot: {}", e),
    }

    info!("👋 ThreatSentry shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════╗
    ║                                                      ║
    ║        T H R E A T   S E N T R Y   v{:<8}         ║
    ║     IOC reputation: AbuseIPDB · VirusTotal · OTX     ║
    ║                                                      ║
    ╚══════════════════════════════════════════════════════╝
    "#,
        APP_VERSION
    );
}
