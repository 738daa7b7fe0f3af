//! REST API over one billing recomputation.
//!
//! Provides four GET endpoints:
//! - `/periods`: derived periods and the selected one
//! - `/results`: every period result
//! - `/state`: selected period, its result, carried credit and summary
//! - `/projection`: cumulative series, optionally for `?period=N`

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use chrono::NaiveDate;

use crate::billing::engine::{BillingEngine, Recomputation};
use crate::reading::Reading;

pub use types::{ErrorResponse, PeriodsResponse, ProjectionQuery, StateResponse};

/// Immutable application state shared across all request handlers.
///
/// Constructed once from a completed recomputation and wrapped in `Arc`;
/// no locks needed since all data is read-only.
pub struct AppState {
    /// Engine used to rebuild projections for explicitly requested periods.
    pub engine: BillingEngine,
    /// Readings the recomputation was built from.
    pub readings: Vec<Reading>,
    /// Reference day.
    pub today: NaiveDate,
    /// Result of the recomputation.
    pub recomputation: Recomputation,
}

impl AppState {
    /// Recomputes from `readings` and wraps everything for serving.
    pub fn new(engine: BillingEngine, readings: Vec<Reading>, today: NaiveDate) -> Self {
        let recomputation = engine.recompute(&readings, today);
        Self {
            engine,
            readings,
            today,
            recomputation,
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/periods", get(handlers::get_periods))
        .route("/results", get(handlers::get_results))
        .route("/state", get(handlers::get_state))
        .route("/projection", get(handlers::get_projection))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
