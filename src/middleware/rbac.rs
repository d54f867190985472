// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::pt::{Actor, ActorRole},
};

/// 1. O Trait que define quais papéis podem passar
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [ActorRole];
    fn name() -> &'static str;
}

/// 2. O Extractor (Guardião). Entrega o ator já validado.
pub struct RequireRole<T>(pub Actor, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;

        if !T::allowed().contains(&actor.role) {
            return Err(AppError::InsufficientRole(T::name()));
        }

        Ok(RequireRole(actor, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct Coach;
impl RoleDef for Coach {
    fn allowed() -> &'static [ActorRole] { &[ActorRole::Coach] }
    fn name() -> &'static str { "coach" }
}

pub struct Member;
impl RoleDef for Member {
    fn allowed() -> &'static [ActorRole] { &[ActorRole::Member] }
    fn name() -> &'static str { "member" }
}

pub struct TenantAdmin;
impl RoleDef for TenantAdmin {
    fn allowed() -> &'static [ActorRole] { &[ActorRole::TenantAdmin] }
    fn name() -> &'static str { "tenant_admin" }
}

pub struct CoachOrMember;
impl RoleDef for CoachOrMember {
    fn allowed() -> &'static [ActorRole] { &[ActorRole::Coach, ActorRole::Member] }
    fn name() -> &'static str { "coach ou member" }
}

pub struct CoachOrAdmin;
impl RoleDef for CoachOrAdmin {
    fn allowed() -> &'static [ActorRole] { &[ActorRole::Coach, ActorRole::TenantAdmin] }
    fn name() -> &'static str { "coach ou tenant_admin" }
}
