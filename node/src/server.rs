// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::api::{DebugVars, SearchParams, TxParams};
use crate::config::NodeConfig;
use crate::ledger::Accumulator;
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    pub accumulator: Accumulator,
    pub config: Arc<NodeConfig>,
}

impl AppState {
    pub fn new(accumulator: Accumulator, config: NodeConfig) -> Self {
        Self {
            accumulator,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/tx", get(submit_tx).post(submit_tx))
        .route("/searchtx", get(search_tx).post(search_tx))
        .route("/metrics", get(metrics_handler));

    if state.config.expose_vars {
        tracing::info!("Exposing live counters at /debug/vars");
        app = app.route("/debug/vars", get(debug_vars));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

// A body that is absent or not form-encoded leaves the query as the only source.
async fn submit_tx(
    State(state): State<AppState>,
    Query(query): Query<TxParams>,
    body: Option<Form<TxParams>>,
) -> Response {
    let params = query.merged(body.map(|Form(b)| b));
    match state.accumulator.submit(params.key, params.value).await {
        Ok(tx) => (StatusCode::CREATED, Json(tx)).into_response(),
        Err(e) => {
            if e.is_fatal() {
                tracing::error!(error = %e, "Transaction rejected by ledger");
            } else {
                tracing::debug!(error = %e, "Transaction rejected");
            }
            e.to_response(state.config.dev_mode)
        }
    }
}

async fn search_tx(
    State(state): State<AppState>,
    Query(query): Query<SearchParams>,
    body: Option<Form<SearchParams>>,
) -> Response {
    let params = query.merged(body.map(|Form(b)| b));
    match state.accumulator.search(&params.key).await {
        Ok(hits) => Json(hits).into_response(),
        Err(e) => e.to_response(state.config.dev_mode),
    }
}

async fn debug_vars(State(state): State<AppState>) -> Json<DebugVars> {
    let snapshot = state.accumulator.stats().snapshot();
    Json(DebugVars::new(&state.config, &snapshot))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    telemetry::refresh_ledger_gauges(&state.accumulator.stats().snapshot());
    telemetry::get_metrics()
}
