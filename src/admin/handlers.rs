use axum::{extract::State, Json};

use crate::admin::AdminState;
use crate::status::{EndpointSnapshot, StatusSummary};

pub async fn get_status(State(state): State<AdminState>) -> Json<StatusSummary> {
    Json(state.manager.summary())
}

pub async fn get_endpoints(State(state): State<AdminState>) -> Json<Vec<EndpointSnapshot>> {
    Json(state.manager.summary().endpoints)
}
