// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::pt::ScheduleStatus;

/// Categoria estável de cada erro de domínio.
///
/// Os handlers usam a categoria para escolher o status HTTP, e os clientes
/// usam o `code()` para distinguir "tentar de novo não adianta" de falhas
/// transitórias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Unauthorized,
    Conflict,
    Inconsistency,
    Validation,
    Storage,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    // --- NotFound ---
    #[error("Modelo de pacote não encontrado")]
    PackageTemplateNotFound,

    #[error("Contrato de PT não encontrado")]
    ContractNotFound,

    #[error("Agendamento não encontrado")]
    ScheduleNotFound,

    // --- InvalidState ---
    #[error("O contrato de PT não possui sessões restantes")]
    PackageDepleted,

    #[error("Limite do pacote atingido: todas as sessões restantes já estão reservadas")]
    ReservationLimitReached,

    #[error("Sessão já concluída")]
    AlreadyCompleted,

    #[error("Transição inválida: {from} -> {to}")]
    InvalidTransition {
        from: ScheduleStatus,
        to: ScheduleStatus,
    },

    #[error("Só é possível apagar sessões agendadas (status atual: {0})")]
    ScheduleNotDeletable(ScheduleStatus),

    #[error("Não é possível criar contrato a partir de um modelo de pacote inativo")]
    InactivePackageTemplate,

    #[error("O status '{0}' é derivado do saldo e não pode ser definido diretamente")]
    DerivedStatus(String),

    // --- Unauthorized ---
    #[error("Acesso proibido: você não é dono deste recurso")]
    Forbidden,

    #[error("Sem permissão para reagendar esta sessão")]
    UnauthorizedReschedule,

    #[error("O contrato não pertence a este aluno")]
    ContractMemberMismatch,

    #[error("Contexto do ator ausente ou inválido: {0}")]
    MissingActorContext(String),

    #[error("O papel '{0}' é necessário para esta ação")]
    InsufficientRole(&'static str),

    // --- Conflict ---
    #[error("Unidade divergente: pacote, aluno e coach devem pertencer à mesma unidade")]
    BranchMismatch,

    #[error("Já existe um agendamento com o client_id '{0}'")]
    DuplicateClientId(String),

    // --- Inconsistency ---
    #[error("Sessão {schedule_id} concluída, mas o débito no contrato falhou: {source}")]
    LedgerInconsistency {
        schedule_id: Uuid,
        #[source]
        source: Box<AppError>,
    },

    // --- Validation ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Quantidade de sessões inválida: {0} (deve ser 10, 20, 30, 40 ou 50)")]
    InvalidSessionAmount(i32),

    #[error("Intervalo de horário inválido: o fim deve ser depois do início")]
    InvalidTimeRange,

    #[error("Requisição inválida: {0}")]
    InvalidRequest(String),

    // --- Storage ---
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Armazenamento indisponível: {0}")]
    StorageUnavailable(String),

    #[error("Tempo limite da requisição excedido")]
    RequestTimeout,

    // `anyhow::Error` só aparece na inicialização e em falhas inesperadas.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::PackageTemplateNotFound
            | AppError::ContractNotFound
            | AppError::ScheduleNotFound => ErrorKind::NotFound,

            AppError::PackageDepleted
            | AppError::ReservationLimitReached
            | AppError::AlreadyCompleted
            | AppError::InvalidTransition { .. }
            | AppError::ScheduleNotDeletable(_)
            | AppError::InactivePackageTemplate
            | AppError::DerivedStatus(_) => ErrorKind::InvalidState,

            AppError::Forbidden
            | AppError::UnauthorizedReschedule
            | AppError::ContractMemberMismatch
            | AppError::MissingActorContext(_)
            | AppError::InsufficientRole(_) => ErrorKind::Unauthorized,

            AppError::BranchMismatch | AppError::DuplicateClientId(_) => ErrorKind::Conflict,

            AppError::LedgerInconsistency { .. } => ErrorKind::Inconsistency,

            AppError::ValidationError(_)
            | AppError::InvalidSessionAmount(_)
            | AppError::InvalidTimeRange
            | AppError::InvalidRequest(_) => ErrorKind::Validation,

            AppError::DatabaseError(_)
            | AppError::StorageUnavailable(_)
            | AppError::RequestTimeout => ErrorKind::Storage,

            AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    /// Código estável exposto aos clientes.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::PackageTemplateNotFound => "PACKAGE_TEMPLATE_NOT_FOUND",
            AppError::ContractNotFound => "CONTRACT_NOT_FOUND",
            AppError::ScheduleNotFound => "SCHEDULE_NOT_FOUND",
            AppError::PackageDepleted => "PACKAGE_DEPLETED",
            AppError::ReservationLimitReached => "RESERVATION_LIMIT_REACHED",
            AppError::AlreadyCompleted => "ALREADY_COMPLETED",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::ScheduleNotDeletable(_) => "SCHEDULE_NOT_DELETABLE",
            AppError::InactivePackageTemplate => "INACTIVE_PACKAGE_TEMPLATE",
            AppError::DerivedStatus(_) => "DERIVED_STATUS",
            AppError::Forbidden => "FORBIDDEN",
            AppError::UnauthorizedReschedule => "UNAUTHORIZED_RESCHEDULE",
            AppError::ContractMemberMismatch => "CONTRACT_MEMBER_MISMATCH",
            AppError::MissingActorContext(_) => "MISSING_ACTOR_CONTEXT",
            AppError::InsufficientRole(_) => "INSUFFICIENT_ROLE",
            AppError::BranchMismatch => "BRANCH_MISMATCH",
            AppError::DuplicateClientId(_) => "DUPLICATE_CLIENT_ID",
            AppError::LedgerInconsistency { .. } => "LEDGER_INCONSISTENCY",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidSessionAmount(_) => "INVALID_SESSION_AMOUNT",
            AppError::InvalidTimeRange => "INVALID_TIME_RANGE",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    /// Só falhas de armazenamento são transitórias.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingActorContext(_) => StatusCode::UNAUTHORIZED,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            _ => match self.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Inconsistency | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "code": self.code(),
                "retryable": false,
                "details": details,
            }));
            return (status, body).into_response();
        }

        // Detalhes de banco e erros internos ficam só no log.
        let message = match self.kind() {
            ErrorKind::Storage | ErrorKind::Internal => {
                tracing::error!(code = self.code(), "Erro Interno do Servidor: {:?}", self);
                if matches!(self, AppError::RequestTimeout) {
                    self.to_string()
                } else {
                    "Ocorreu um erro inesperado.".to_string()
                }
            }
            ErrorKind::Inconsistency => {
                tracing::error!(code = self.code(), "{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::ContractNotFound, ErrorKind::NotFound, StatusCode::NOT_FOUND)]
    #[case(AppError::PackageDepleted, ErrorKind::InvalidState, StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(AppError::ReservationLimitReached, ErrorKind::InvalidState, StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(AppError::UnauthorizedReschedule, ErrorKind::Unauthorized, StatusCode::FORBIDDEN)]
    #[case(AppError::MissingActorContext("x-actor-id".into()), ErrorKind::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(AppError::BranchMismatch, ErrorKind::Conflict, StatusCode::CONFLICT)]
    #[case(AppError::InvalidSessionAmount(15), ErrorKind::Validation, StatusCode::BAD_REQUEST)]
    #[case(AppError::StorageUnavailable("lock".into()), ErrorKind::Storage, StatusCode::SERVICE_UNAVAILABLE)]
    fn maps_kind_and_status(
        #[case] err: AppError,
        #[case] kind: ErrorKind,
        #[case] status: StatusCode,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.into_response().status(), status);
    }

    #[test]
    fn only_storage_errors_are_retryable() {
        assert!(AppError::StorageUnavailable("x".into()).is_retryable());
        assert!(AppError::RequestTimeout.is_retryable());
        assert!(!AppError::PackageDepleted.is_retryable());
        assert!(!AppError::Forbidden.is_retryable());
    }

    #[rstest]
    #[case(AppError::StorageUnavailable("offline".into()), true)]
    #[case(AppError::RequestTimeout, true)]
    #[case(AppError::PackageDepleted, false)]
    #[case(AppError::ScheduleNotFound, false)]
    #[tokio::test]
    async fn body_tells_clients_when_to_retry(#[case] err: AppError, #[case] retryable: bool) {
        let code = err.code();
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryable"], retryable);
        assert_eq!(body["code"], code);
    }

    #[test]
    fn inconsistency_keeps_the_ledger_cause() {
        let err = AppError::LedgerInconsistency {
            schedule_id: Uuid::nil(),
            source: Box::new(AppError::PackageDepleted),
        };
        assert_eq!(err.kind(), ErrorKind::Inconsistency);
        assert_eq!(err.code(), "LEDGER_INCONSISTENCY");
        assert!(err.to_string().contains("sessões restantes"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
