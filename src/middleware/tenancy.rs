// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// O tenant (academia) que a requisição quer acessar
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

/// Lê um cabeçalho obrigatório e o converte para UUID.
pub(crate) fn uuid_header(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::MissingActorContext(format!("o cabeçalho {} é obrigatório", name)))?;

    let value_str = value.to_str().map_err(|_| {
        AppError::MissingActorContext(format!("o cabeçalho {} contém caracteres inválidos", name))
    })?;

    Uuid::parse_str(value_str.trim())
        .map_err(|_| AppError::MissingActorContext(format!("o cabeçalho {} não é um UUID", name)))
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        uuid_header(parts, TENANT_ID_HEADER).map(TenantContext)
    }
}
