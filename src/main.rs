//! Smokefree - cessation metrics and progress tracking for people quitting smoking.
//!
//! # API Endpoints
//!
//! - `GET /survey/questions` - FTND questions and price tiers
//! - `POST /survey/:user_id` - Submit a survey and store its metrics snapshot
//! - `GET /survey/:user_id` - The stored snapshot
//! - `POST /legacy/survey/:user_id` - Import a legacy PascalCase survey
//! - `POST /progress/:user_id` - Log a day of progress
//! - `GET /progress/:user_id` - List logged days
//! - `GET /progress/:user_id/summary` - Streaks, savings and achievement score
//! - `GET /health-timeline?days=N` - Health milestones reached after N days
//! - `GET /coach/members/:user_id` - Coach view of one member
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use smokefree::api::{AppState, router};
use smokefree::config::AppConfig;
use smokefree::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("smokefree=info".parse()?))
        .init();

    let config = AppConfig::from_env();

    info!(port = config.port, db_url = %config.database_url, "Starting Smokefree server");

    let tables = config.load_tables()?;
    info!(
        ftnd_questions = tables.ftnd_questions.len(),
        price_tiers = tables.price_tiers.len(),
        "Scoring tables ready"
    );

    let storage = Storage::new(&config.database_url).await?;
    info!("Database initialized");

    let state = AppState {
        storage,
        tables: Arc::new(tables),
    };

    let app = router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Smokefree is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
