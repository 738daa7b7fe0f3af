//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, PeriodsResponse, ProjectionQuery, StateResponse};
use crate::billing::aggregator::PeriodResult;
use crate::billing::period::PeriodSelector;

/// `GET /periods` → 200 + `PeriodsResponse` JSON (empty list when no cut markers)
pub async fn get_periods(State(state): State<Arc<AppState>>) -> Json<PeriodsResponse> {
    let r = &state.recomputation;
    Json(PeriodsResponse {
        periods: r.periods.clone(),
        active: r.active,
    })
}

/// `GET /results` → 200 + `Vec<PeriodResult>` JSON
pub async fn get_results(State(state): State<Arc<AppState>>) -> Json<Vec<PeriodResult>> {
    Json(state.recomputation.results.clone())
}

/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let r = &state.recomputation;
    Json(StateResponse {
        today: state.today.to_string(),
        active_period: r.active_period().cloned(),
        active_result: r.active_result().cloned(),
        carried: r.carried,
        summary: r.summary.clone(),
    })
}

/// Returns the cumulative series of the active or requested period.
///
/// `GET /projection` → active period's series
/// `GET /projection?period=N` → series of period `N`
/// `GET /projection?period=99` → 404 + `ErrorResponse`
pub async fn get_projection(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectionQuery>,
) -> impl IntoResponse {
    let Some(index) = query.period else {
        return Ok(Json(state.recomputation.projection.clone()));
    };

    if index >= state.recomputation.periods.len() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!(
                    "period {index} does not exist ({} periods)",
                    state.recomputation.periods.len()
                ),
            }),
        ));
    }

    let selected = state.engine.recompute_with(
        &state.readings,
        state.today,
        &PeriodSelector::Index(index),
    );
    Ok(Json(selected.projection))
}
