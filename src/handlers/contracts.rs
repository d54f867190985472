// src/handlers/contracts.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        rbac::{Coach, Member, RequireRole, TenantAdmin},
        tenancy::TenantContext,
    },
    models::pt::ContractStatus,
};

#[derive(Debug, Deserialize)]
pub struct CreateContractPayload {
    pub package_id: Uuid,
    pub member_id: Uuid,
    pub coach_id: Uuid,
    pub branch_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractStatusPayload {
    pub status: ContractStatus,
}

#[derive(Debug, Deserialize)]
pub struct CoachContractsQuery {
    pub low_sessions_threshold: Option<i32>,
}

// POST /api/contracts
pub async fn create_contract(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<TenantAdmin>,
    Json(payload): Json<CreateContractPayload>,
) -> Result<impl IntoResponse, AppError> {
    let contract = app_state
        .contract_service
        .create_contract(
            actor.tenant_id,
            payload.package_id,
            payload.member_id,
            payload.coach_id,
            payload.branch_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(contract)))
}

// GET /api/contracts
pub async fn list_contracts(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<TenantAdmin>,
) -> Result<impl IntoResponse, AppError> {
    let contracts = app_state.contract_service.list_contracts(actor.tenant_id).await?;
    Ok(Json(contracts))
}

// GET /api/contracts/mine
pub async fn list_my_contracts(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Member>,
) -> Result<impl IntoResponse, AppError> {
    let contracts = app_state
        .contract_service
        .list_active_for_member(actor.tenant_id, actor.actor_id)
        .await?;
    Ok(Json(contracts))
}

// GET /api/contracts/coach?low_sessions_threshold=2
pub async fn list_coach_contracts(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<Coach>,
    Query(query): Query<CoachContractsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let contracts = app_state
        .contract_service
        .list_for_coach(actor.tenant_id, actor.actor_id, query.low_sessions_threshold)
        .await?;
    Ok(Json(contracts))
}

// GET /api/contracts/{id}
pub async fn get_contract(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let contract = app_state.contract_service.get_contract(tenant.0, id).await?;
    Ok(Json(contract))
}

// PATCH /api/contracts/{id}/status
pub async fn update_contract_status(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<TenantAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContractStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let contract = app_state
        .contract_service
        .update_status(actor.tenant_id, id, payload.status)
        .await?;
    Ok(Json(contract))
}

// GET /api/contracts/{id}/active-schedules
pub async fn count_active_schedules(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let count = app_state
        .session_service
        .active_reservation_count(tenant.0, id)
        .await?;
    Ok(Json(json!({ "contract_id": id, "active_schedules": count })))
}

// POST /api/ledger/reconcile
pub async fn reconcile_ledger(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<TenantAdmin>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .reconciliation_service
        .reconcile(actor.tenant_id)
        .await?;
    Ok(Json(report))
}
