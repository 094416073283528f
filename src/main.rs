// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chat_session::ChatSession;
use crate::application::dashboard_service::DashboardService;
use crate::application::metrics_simulator::{IntervalTicker, MetricsSimulator, SystemClock};
use crate::application::streaming_service::StreamingDashboardService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::gemini_client::GeminiClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_enhancement, get_chat, get_dashboard, health_check, list_enhancements, post_message,
    reset_chat, select_enhancement, stream_dashboard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netpulse=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Completion client (infrastructure layer)
    let completion = Arc::new(GeminiClient::from_settings(&config.gemini)?);

    // Simulation and services (application layer)
    let simulator = MetricsSimulator::new(
        config.simulator.history_cap,
        Arc::new(SystemClock),
        config.simulator.rng(),
    );
    let simulation = simulator.start(IntervalTicker::new(config.simulator.interval()));

    let dashboard_service = DashboardService::new(simulator.clone());
    let streaming_service = StreamingDashboardService::new(simulator, dashboard_service.clone());
    let chat_session = ChatSession::new(completion);

    let state = Arc::new(AppState {
        dashboard_service,
        streaming_service,
        chat_session,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .route("/chat", get(get_chat).delete(reset_chat))
        .route("/chat/messages", post(post_message))
        .route("/chat/enhancements", get(list_enhancements))
        .route(
            "/chat/enhancements/:kind",
            put(select_enhancement).delete(clear_enhancement),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.server.socket_addr()?;
    tracing::info!("Starting netpulse on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    simulation.stop();
    Ok(())
}
