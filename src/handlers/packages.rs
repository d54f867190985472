// src/handlers/packages.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        rbac::{RequireRole, TenantAdmin},
        tenancy::TenantContext,
    },
    models::pt::PackageTemplateChanges,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackagePayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres"))]
    pub name: String,
    pub total_sessions: i32,
    pub price: Decimal,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePackagePayload {
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres"))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

// POST /api/packages
pub async fn create_package(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<TenantAdmin>,
    Json(payload): Json<CreatePackagePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let template = app_state
        .package_service
        .create_template(
            actor.tenant_id,
            payload.branch_id,
            payload.name,
            payload.total_sessions,
            payload.price,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(template)))
}

// GET /api/packages
pub async fn list_packages(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let templates = app_state.package_service.list_templates(tenant.0).await?;
    Ok(Json(templates))
}

// GET /api/packages/{id}
pub async fn get_package(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.package_service.get_template(tenant.0, id).await?;
    Ok(Json(template))
}

// PATCH /api/packages/{id}
pub async fn update_package(
    State(app_state): State<AppState>,
    RequireRole(actor, _): RequireRole<TenantAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePackagePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let changes = PackageTemplateChanges {
        name: payload.name,
        price: payload.price,
        active: payload.active,
    };
    let template = app_state
        .package_service
        .update_template(actor.tenant_id, id, changes)
        .await?;

    Ok(Json(template))
}
