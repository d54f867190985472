// src/middleware/actor.rs

// A identidade vem do gateway (que já autenticou o usuário) em cabeçalhos.
// Aqui só lemos e validamos o formato.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::tenancy::{uuid_header, TENANT_ID_HEADER},
    models::pt::{Actor, ActorRole},
};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = uuid_header(parts, TENANT_ID_HEADER)?;
        let actor_id = uuid_header(parts, ACTOR_ID_HEADER)?;

        let role = parts
            .headers
            .get(ACTOR_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::MissingActorContext(format!(
                    "o cabeçalho {} é obrigatório",
                    ACTOR_ROLE_HEADER
                ))
            })?
            .parse::<ActorRole>()?;

        Ok(Actor {
            tenant_id,
            actor_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn reads_actor_from_headers() {
        let tenant = uuid::Uuid::new_v4();
        let actor_id = uuid::Uuid::new_v4();
        let (t, a) = (tenant.to_string(), actor_id.to_string());
        let mut p = parts(&[
            (TENANT_ID_HEADER, t.as_str()),
            (ACTOR_ID_HEADER, a.as_str()),
            (ACTOR_ROLE_HEADER, "coach"),
        ]);

        let actor = Actor::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(actor.tenant_id, tenant);
        assert_eq!(actor.actor_id, actor_id);
        assert_eq!(actor.role, ActorRole::Coach);
    }

    #[tokio::test]
    async fn missing_role_is_rejected() {
        let (t, a) = (uuid::Uuid::new_v4().to_string(), uuid::Uuid::new_v4().to_string());
        let mut p = parts(&[(TENANT_ID_HEADER, t.as_str()), (ACTOR_ID_HEADER, a.as_str())]);
        let err = Actor::from_request_parts(&mut p, &()).await.unwrap_err();
        assert!(matches!(err, AppError::MissingActorContext(_)));
    }

    #[tokio::test]
    async fn malformed_tenant_is_rejected() {
        let a = uuid::Uuid::new_v4().to_string();
        let mut p = parts(&[
            (TENANT_ID_HEADER, "loja-1"),
            (ACTOR_ID_HEADER, a.as_str()),
            (ACTOR_ROLE_HEADER, "member"),
        ]);
        assert!(Actor::from_request_parts(&mut p, &()).await.is_err());
    }
}
