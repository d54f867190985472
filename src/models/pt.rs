// src/models/pt.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contract_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    Depleted,
    Expired,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractStatus::Active => "Active",
            ContractStatus::Depleted => "Depleted",
            ContractStatus::Expired => "Expired",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "schedule_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Scheduled,
    #[serde(rename = "Pending_Confirmation")]
    PendingConfirmation,
    Completed,
    Cancelled,
    #[serde(rename = "No-Show")]
    NoShow,
}

impl ScheduleStatus {
    /// Estados que ainda seguram uma reserva no contrato.
    pub const RESERVING: [ScheduleStatus; 2] =
        [ScheduleStatus::Scheduled, ScheduleStatus::PendingConfirmation];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScheduleStatus::Completed | ScheduleStatus::Cancelled | ScheduleStatus::NoShow
        )
    }

    pub fn holds_reservation(self) -> bool {
        Self::RESERVING.contains(&self)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleStatus::Scheduled => "Scheduled",
            ScheduleStatus::PendingConfirmation => "Pending_Confirmation",
            ScheduleStatus::Completed => "Completed",
            ScheduleStatus::Cancelled => "Cancelled",
            ScheduleStatus::NoShow => "No-Show",
        };
        f.write_str(s)
    }
}

/// Quantidades de sessões vendáveis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTier(i32);

impl SessionTier {
    pub const ALLOWED: [i32; 5] = [10, 20, 30, 40, 50];

    pub fn sessions(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for SessionTier {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&value) {
            Ok(SessionTier(value))
        } else {
            Err(AppError::InvalidSessionAmount(value))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Coach,
    Member,
    TenantAdmin,
}

impl std::str::FromStr for ActorRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coach" => Ok(ActorRole::Coach),
            "member" => Ok(ActorRole::Member),
            "tenant_admin" | "admin" => Ok(ActorRole::TenantAdmin),
            other => Err(AppError::MissingActorContext(format!(
                "papel desconhecido '{}'",
                other
            ))),
        }
    }
}

/// Quem está chamando, repassado pelo gateway a cada requisição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
    pub role: ActorRole,
}

// --- 1. Modelo de Pacote ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PackageTemplate {
    pub id: Uuid,
    pub tenant_id: Uuid,
    // Pacotes costumam ser por unidade (preço e disponibilidade)
    pub branch_id: Option<Uuid>,
    pub name: String,
    pub total_sessions: i32,
    pub price: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPackageTemplate {
    pub tenant_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub name: String,
    pub tier: SessionTier,
    pub price: Decimal,
}

/// Campos alteráveis depois da publicação. A quantidade de sessões não muda.
#[derive(Debug, Clone, Default)]
pub struct PackageTemplateChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

// --- 2. Contrato (o ledger) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub package_id: Uuid,
    pub member_id: Uuid,
    pub coach_id: Uuid,
    // Copiados do modelo no momento da compra
    pub total_sessions: i32,
    pub remaining_sessions: i32,
    // Reservas abertas (agendamentos Scheduled / Pending_Confirmation)
    pub reserved_sessions: i32,
    pub price: Decimal,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Saldo ainda não comprometido por reservas.
    pub fn available_sessions(&self) -> i32 {
        self.remaining_sessions - self.reserved_sessions
    }

    pub fn is_bookable(&self) -> bool {
        self.status == ContractStatus::Active && self.remaining_sessions > 0
    }
}

#[derive(Debug, Clone)]
pub struct NewContract {
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub package_id: Uuid,
    pub member_id: Uuid,
    pub coach_id: Uuid,
    pub total_sessions: i32,
    pub price: Decimal,
}

// --- 3. Agendamento ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Schedule {
    pub id: Uuid,
    // ULID gerado pelo frontend antes da persistência
    pub client_id: Option<String>,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub contract_id: Uuid,
    pub coach_id: Uuid,
    pub member_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScheduleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub contract_id: Uuid,
    pub coach_id: Uuid,
    pub member_id: Uuid,
    pub client_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub session_goal: Option<String>,
    pub remarks: Option<String>,
}

/// Pedido de agendamento. Sem `contract_id`, o primeiro contrato ativo do par
/// coach/aluno é usado; sem `end_time`, a sessão dura uma hora.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub contract_id: Option<Uuid>,
    pub member_id: Uuid,
    pub branch_id: Uuid,
    pub client_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub session_goal: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleFilter {
    pub status: Option<ScheduleStatus>,
    pub coach_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.status.is_none_or(|s| schedule.status == s)
            && self.coach_id.is_none_or(|c| schedule.coach_id == c)
            && self.member_id.is_none_or(|m| schedule.member_id == m)
            && self.contract_id.is_none_or(|c| schedule.contract_id == c)
            && self.from.is_none_or(|f| schedule.start_time >= f)
            && self.to.is_none_or(|t| schedule.start_time <= t)
    }
}

/// Transições manuais (administrativas) a partir de `Scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualTransition {
    Cancel,
    NoShow,
}

impl ManualTransition {
    pub fn target(self) -> ScheduleStatus {
        match self {
            ManualTransition::Cancel => ScheduleStatus::Cancelled,
            ManualTransition::NoShow => ScheduleStatus::NoShow,
        }
    }
}
