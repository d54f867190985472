// src/handlers/schedules.rs

// O {id} das rotas aceita tanto o id durável quanto o client_id do agendamento.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        rbac::{Coach, CoachOrAdmin, CoachOrMember, RequireRole},
        tenancy::TenantContext,
    },
    models::pt::{BookingRequest, ManualTransition, ScheduleFilter},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSchedulePayload {
    pub contract_id: Option<Uuid>,
    pub member_id: Uuid,
    pub branch_id: Uuid,
    #[validate(length(min = 1, max = 64, message = "client_id deve ter entre 1 e 64 caracteres"))]
    pub client_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(max = 500, message = "O objetivo da sessão é muito longo"))]
    pub session_goal: Option<String>,
    #[validate(length(max = 1000, message = "As observações são muito longas"))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReschedulePayload {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionPayload {
    pub action: ManualTransition,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// POST /api/schedules
pub async fn create_schedule(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Json(payload): Json<CreateSchedulePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let request = BookingRequest {
        contract_id: payload.contract_id,
        member_id: payload.member_id,
        branch_id: payload.branch_id,
        client_id: payload.client_id,
        start_time: payload.start_time,
        end_time: payload.end_time,
        session_goal: payload.session_goal,
        remarks: payload.remarks,
    };
    let schedule = app_state.session_service.create_schedule(&actor, request).await?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

// GET /api/schedules?status=&coach_id=&member_id=&contract_id=&from=&to=
pub async fn list_schedules(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filter): Query<ScheduleFilter>,
) -> Result<impl IntoResponse, AppError> {
    let schedules = app_state.session_service.list_schedules(tenant.0, filter).await?;
    Ok(Json(schedules))
}

// GET /api/schedules/mine?from=&to=
pub async fn list_my_schedules(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<CoachOrMember>,
    Query(window): Query<WindowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let schedules = app_state
        .session_service
        .list_mine(&actor, window.from, window.to)
        .await?;
    Ok(Json(schedules))
}

// GET /api/schedules/{id}
pub async fn get_schedule(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = app_state.session_service.get_schedule(tenant.0, &key).await?;
    Ok(Json(schedule))
}

// DELETE /api/schedules/{id}
pub async fn delete_schedule(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.session_service.delete_schedule(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PATCH /api/schedules/{id}/reschedule
pub async fn reschedule(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<CoachOrMember>,
    Path(key): Path<String>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = app_state
        .session_service
        .reschedule(&actor, &key, payload.start_time, payload.end_time)
        .await?;
    Ok(Json(schedule))
}

// POST /api/schedules/{id}/confirm
pub async fn confirm_reschedule(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = app_state.session_service.confirm_reschedule(&actor, &key).await?;
    Ok(Json(schedule))
}

// POST /api/schedules/{id}/complete
pub async fn complete_session(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let completed = app_state.session_service.complete_session(&actor, &key).await?;
    Ok(Json(completed))
}

// POST /api/schedules/{id}/transition
pub async fn transition_schedule(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<CoachOrAdmin>,
    Path(key): Path<String>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = app_state
        .session_service
        .transition(&actor, &key, payload.action)
        .await?;
    Ok(Json(schedule))
}
