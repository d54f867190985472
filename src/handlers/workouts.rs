// src/handlers/workouts.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        rbac::{Coach, RequireRole},
        tenancy::TenantContext,
    },
    models::pt::Actor,
    services::workout_service::{LogSet, PlanExercise},
};

#[derive(Debug, Deserialize, Validate)]
pub struct PlanExercisePayload {
    pub client_id: Option<String>,
    pub exercise_id: Uuid,
    #[validate(range(min = 1, max = 20, message = "Entre 1 e 20 séries"))]
    pub target_sets: i32,
    #[validate(range(min = 1, max = 100, message = "Entre 1 e 100 repetições"))]
    pub target_reps: i32,
    #[validate(range(min = 0, message = "O descanso não pode ser negativo"))]
    pub rest_seconds: Option<i32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogSetPayload {
    pub client_id: Option<String>,
    pub planned_exercise_id: Uuid,
    #[validate(range(min = 1, message = "set_index começa em 1"))]
    pub set_index: i32,
    #[validate(range(min = 0.0, message = "O peso não pode ser negativo"))]
    pub weight: f64,
    #[validate(range(min = 0, message = "As repetições não podem ser negativas"))]
    pub reps: i32,
    pub remarks: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

// POST /api/schedules/{id}/exercises
pub async fn add_planned_exercise(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Path(key): Path<String>,
    Json(payload): Json<PlanExercisePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let plan = PlanExercise {
        client_id: payload.client_id,
        exercise_id: payload.exercise_id,
        target_sets: payload.target_sets,
        target_reps: payload.target_reps,
        rest_seconds: payload.rest_seconds,
        notes: payload.notes,
        position: payload.position,
    };
    let planned = app_state
        .workout_service
        .add_planned_exercise(&actor, &key, plan)
        .await?;

    Ok((StatusCode::CREATED, Json(planned)))
}

// GET /api/schedules/{id}/exercises
pub async fn list_planned_exercises(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let planned = app_state
        .workout_service
        .list_planned_exercises(tenant.0, &key)
        .await?;
    Ok(Json(planned))
}

// POST /api/schedules/{id}/set-logs
pub async fn log_set(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Path(key): Path<String>,
    Json(payload): Json<LogSetPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let set = LogSet {
        client_id: payload.client_id,
        planned_exercise_id: payload.planned_exercise_id,
        set_index: payload.set_index,
        weight: payload.weight,
        reps: payload.reps,
        remarks: payload.remarks,
        completed: payload.completed,
    };
    let log = app_state.workout_service.log_set(&actor, &key, set).await?;

    Ok((StatusCode::CREATED, Json(log)))
}

// GET /api/schedules/{id}/set-logs
pub async fn list_set_logs(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let logs = app_state.workout_service.list_set_logs(tenant.0, &key).await?;
    Ok(Json(logs))
}

// GET /api/members/{id}/personal-bests
pub async fn list_personal_bests(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let pbs = app_state
        .workout_service
        .list_personal_bests(actor.tenant_id, member_id)
        .await?;
    Ok(Json(pbs))
}
