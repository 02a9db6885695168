use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::league::{load_league, League};
use crate::simulation::MatchSimulator;

pub mod api;
pub mod routes;

/// Shared handler state. The league lock is never held across the remote
/// simulation call.
#[derive(Clone)]
pub struct AppState {
    league: Arc<RwLock<League>>,
    simulator: Arc<MatchSimulator>,
}

impl AppState {
    pub fn new(league: League, simulator: MatchSimulator) -> Self {
        Self {
            league: Arc::new(RwLock::new(league)),
            simulator: Arc::new(simulator),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let league = load_league(&config.server.data_path);
        let simulator = MatchSimulator::from_config(config)?;
        Ok(Self::new(league, simulator))
    }

    pub fn league(&self) -> RwLockReadGuard<'_, League> {
        self.league.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn league_mut(&self) -> RwLockWriteGuard<'_, League> {
        self.league.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn simulator(&self) -> &MatchSimulator {
        &self.simulator
    }
}

pub async fn run_server(config: AppConfig) -> Result<(), StartupError> {
    let state = AppState::from_config(&config)?;
    if !state.simulator().remote_configured() {
        tracing::warn!("OPENAI_API_KEY not set - matches will use the local simulator");
    }

    let app = routes::router(state, &config.server);
    let listener = tokio::net::TcpListener::bind(config.server.bind_addr.as_str()).await?;
    tracing::info!("calcio server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
