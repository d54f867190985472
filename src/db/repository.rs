// src/db/repository.rs

// Contratos de persistência usados pelos serviços.
// Cada trait tem duas implementações: Postgres (sqlx) e memória (db/memory.rs).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        pt::{
            Contract, ContractStatus, NewContract, NewPackageTemplate, NewSchedule,
            PackageTemplate, PackageTemplateChanges, Schedule, ScheduleFilter, ScheduleStatus,
        },
        workout::{
            NewPlannedExercise, NewSetLog, PersonalBest, PersonalBestCandidate, PlannedExercise,
            SetLog,
        },
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PackageRepository: Send + Sync {
    async fn create(&self, new: NewPackageTemplate) -> Result<PackageTemplate, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PackageTemplate>, AppError>;
    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<PackageTemplate>, AppError>;
    async fn update(
        &self,
        id: Uuid,
        changes: PackageTemplateChanges,
    ) -> Result<Option<PackageTemplate>, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContractRepository: Send + Sync {
    async fn create(&self, new: NewContract) -> Result<Contract, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contract>, AppError>;
    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError>;
    async fn list_active_by_member(&self, member_id: Uuid) -> Result<Vec<Contract>, AppError>;
    async fn list_active_by_coach(&self, coach_id: Uuid) -> Result<Vec<Contract>, AppError>;
    async fn find_first_active_by_coach_and_member(
        &self,
        coach_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Contract>, AppError>;
    /// Contratos ativos do coach com `remaining_sessions <= threshold`.
    async fn list_low_sessions_by_coach(
        &self,
        coach_id: Uuid,
        threshold: i32,
    ) -> Result<Vec<Contract>, AppError>;

    /// Recalcula `reserved_sessions` dos contratos do tenant a partir dos
    /// agendamentos que ainda seguram reserva. Devolve os contratos corrigidos.
    async fn resync_reservations(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError>;

    /// Débito condicional (`remaining > 0`) que consome a reserva da sessão e
    /// grava o consumo de `schedule_id` na mesma operação atômica. Se o saldo
    /// chegar a zero o status vira `Depleted` no mesmo passo. Repetir para um
    /// agendamento já consumido não altera nada e devolve o contrato atual.
    ///
    /// Falha com `PackageDepleted` quando o predicado não é satisfeito
    /// (saldo zerado ou contrato inexistente).
    async fn decrement_session(
        &self,
        contract_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Contract, AppError>;

    async fn update_status(
        &self,
        contract_id: Uuid,
        status: ContractStatus,
    ) -> Result<Option<Contract>, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Reserva uma sessão do contrato e grava o agendamento como `Scheduled`
    /// na mesma operação atômica. A reserva exige contrato ativo e
    /// `reserved < remaining`; `None` quando não há capacidade.
    async fn create_reserving(&self, new: NewSchedule) -> Result<Option<Schedule>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>, AppError>;
    /// Chave provisória emitida pelo cliente antes da persistência, única por tenant.
    async fn find_by_client_id(
        &self,
        tenant_id: Uuid,
        client_id: &str,
    ) -> Result<Option<Schedule>, AppError>;
    async fn list_by_coach(
        &self,
        coach_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, AppError>;
    async fn list_by_member(
        &self,
        member_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, AppError>;
    async fn list(&self, tenant_id: Uuid, filter: ScheduleFilter)
        -> Result<Vec<Schedule>, AppError>;

    /// Compare-and-set de status: só grava se o status atual estiver em `expected`.
    async fn update_status_if(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError>;

    /// Compare-and-set de horário + status.
    async fn reschedule_if(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError>;

    /// Compare-and-set para um estado final sem consumo (cancelado, no-show).
    /// A reserva do contrato é devolvida no mesmo passo.
    async fn close_releasing(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError>;

    /// Apaga apenas se o status atual for `expected`, devolvendo a reserva no
    /// mesmo passo. Retorna se apagou.
    async fn delete_releasing(&self, id: Uuid, expected: ScheduleStatus)
        -> Result<bool, AppError>;

    async fn count_by_contract_and_status(
        &self,
        contract_id: Uuid,
        statuses: &[ScheduleStatus],
    ) -> Result<i64, AppError>;

    /// Agendamentos `Completed` do tenant sem consumo registrado no ledger.
    async fn list_completed_without_consumption(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Schedule>, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SetLogRepository: Send + Sync {
    async fn create(&self, new: NewSetLog) -> Result<SetLog, AppError>;
    async fn find_by_schedule(&self, schedule_id: Uuid) -> Result<Vec<SetLog>, AppError>;
    async fn delete_by_schedule(&self, schedule_id: Uuid) -> Result<u64, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlannedExerciseRepository: Send + Sync {
    async fn create(&self, new: NewPlannedExercise) -> Result<PlannedExercise, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlannedExercise>, AppError>;
    async fn list_by_schedule(&self, schedule_id: Uuid) -> Result<Vec<PlannedExercise>, AppError>;
    async fn delete_by_schedule(&self, schedule_id: Uuid) -> Result<u64, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersonalBestRepository: Send + Sync {
    /// Grava o candidato só se o peso for estritamente maior que o recorde atual.
    /// Retorna `true` quando um novo recorde foi gravado.
    async fn upsert(&self, candidate: PersonalBestCandidate) -> Result<bool, AppError>;
    async fn list_by_member(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<PersonalBest>, AppError>;
}
