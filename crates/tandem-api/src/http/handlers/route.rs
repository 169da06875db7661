//! Intent routing HTTP handler.
//!
//! `POST /api/v1/route` takes the utterance plus the routing state returned by
//! the previous turn and answers with the routing result and the next state.
//! The server keeps no routing state of its own.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use tandem_types::routing::{RoutingResult, RoutingState};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RouteBody {
    pub twin_id: String,
    pub message: String,
    #[serde(default)]
    pub state: RoutingState,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    #[serde(flatten)]
    pub result: RoutingResult,
    /// State to send back with the next utterance.
    pub state: RoutingState,
}

/// POST /api/v1/route - Route one utterance.
pub async fn route(
    State(state): State<AppState>,
    Json(body): Json<RouteBody>,
) -> Result<Json<ApiResponse<RouteResponse>>, AppError> {
    let clock = RequestClock::start();

    let result = state
        .router
        .route_state(&body.twin_id, &body.message, &body.state)
        .await?;
    let next = result.state();

    Ok(Json(clock.respond(RouteResponse {
        result,
        state: next,
    })))
}
