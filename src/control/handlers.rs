use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::control::ControlState;
use crate::engine::{Command, CommandOutcome, EngineError};
use crate::profile::Profile;

#[derive(Deserialize)]
pub struct UpdateRulesRequest {
    pub enabled: bool,
    pub profile: Profile,
}

#[derive(Deserialize)]
pub struct SetTimerRequest {
    pub minutes: u64,
}

pub async fn get_status(State(state): State<ControlState>) -> Response {
    respond(state.engine.execute(Command::Status).await)
}

pub async fn update_rules(
    State(state): State<ControlState>,
    Json(req): Json<UpdateRulesRequest>,
) -> Response {
    respond(
        state
            .engine
            .execute(Command::UpdateRules {
                enabled: req.enabled,
                profile: req.profile,
            })
            .await,
    )
}

pub async fn get_count(State(state): State<ControlState>) -> Response {
    respond(state.engine.execute(Command::GetCount).await)
}

pub async fn reset_count(State(state): State<ControlState>) -> Response {
    respond(state.engine.execute(Command::ResetCount).await)
}

pub async fn set_timer(
    State(state): State<ControlState>,
    Json(req): Json<SetTimerRequest>,
) -> Response {
    respond(
        state
            .engine
            .execute(Command::SetTimer {
                minutes: req.minutes,
            })
            .await,
    )
}

pub async fn clear_timer(State(state): State<ControlState>) -> Response {
    respond(state.engine.execute(Command::ClearTimer).await)
}

pub async fn export_profiles(State(state): State<ControlState>) -> Response {
    respond(state.engine.execute(Command::ExportProfiles).await)
}

pub async fn import_profiles(State(state): State<ControlState>, payload: String) -> Response {
    respond(
        state
            .engine
            .execute(Command::ImportProfiles { payload })
            .await,
    )
}

/// Map a command result onto an HTTP response. Caller mistakes (bad
/// bundle, bad pattern) are 400s; layer and storage failures are 500s.
fn respond(result: Result<CommandOutcome, EngineError>) -> Response {
    match result {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            let status = match &e {
                EngineError::Import(_) | EngineError::Pattern(_) => StatusCode::BAD_REQUEST,
                EngineError::Install(_) | EngineError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let body = serde_json::json!({
                "success": false,
                "error": e.to_string(),
            });
            (status, Json(body)).into_response()
        }
    }
}
