use crate::api::api_error::APIError;
use crate::api::auth::require_basic_auth;
use crate::api::model::UpdateRecordRequest;
use crate::api::server::AppState;
use axum::extract::State;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Upper bound on the share of the request timeout kept back for the rewrite, so a lock wait
/// that runs out is answered with a conflict before the timeout layer drops the request.
const LOCK_WAIT_MARGIN: Duration = Duration::from_secs(1);

pub(super) fn new(state: AppState) -> Router {
    let prefix = &state.config.url_prefix;
    let updates = Router::new()
        .route(&format!("{prefix}/present"), post(present))
        .route(&format!("{prefix}/cleanup"), post(cleanup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    let mut router = Router::new()
        .route("/healthcheck", get(health_check))
        .merge(updates);
    if state.config.robots_txt {
        router = router.route("/robots.txt", get(robots_txt));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

#[allow(clippy::unused_async)]
async fn robots_txt() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn present(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateRecordRequest>, APIError>,
) -> Result<&'static str, APIError> {
    update(&state, payload, false).await
}

async fn cleanup(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateRecordRequest>, APIError>,
) -> Result<&'static str, APIError> {
    update(&state, payload, true).await
}

async fn update(
    state: &AppState,
    payload: UpdateRecordRequest,
    disable: bool,
) -> Result<&'static str, APIError> {
    let request = payload.into_update(disable)?;
    let fqdn = request.fqdn.clone();
    let deadline = Instant::now() + lock_wait(state.config.api_timeout);

    match state.updater.update(request, deadline).await {
        Ok(outcome) => {
            tracing::debug!("update for \"{fqdn}\" (disable={disable}) finished: {outcome:?}");
            Ok("OK")
        }
        Err(err) => {
            tracing::debug!("update for \"{fqdn}\" (disable={disable}) failed: {err}");
            Err(err.into())
        }
    }
}

fn lock_wait(api_timeout: Duration) -> Duration {
    api_timeout - LOCK_WAIT_MARGIN.min(api_timeout / 10)
}
