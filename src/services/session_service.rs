// src/services/session_service.rs

// Orquestrador de sessões: junta o ledger de contratos e a máquina de estados
// dos agendamentos. Os efeitos colaterais (recordes, limpeza de registros)
// também passam por aqui.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::{
        PersonalBestRepository, PlannedExerciseRepository, ScheduleRepository, SetLogRepository,
    },
    models::{
        pt::{
            Actor, ActorRole, BookingRequest, Contract, ManualTransition, NewSchedule, Schedule,
            ScheduleFilter, ScheduleStatus,
        },
        workout::{PersonalBestCandidate, SetLog},
    },
    services::contract_service::ContractService,
};

/// Janela padrão das listagens "minhas sessões".
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Resultado de uma conclusão bem-sucedida.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedSession {
    pub schedule: Schedule,
    pub contract: Contract,
    /// Exercícios em que o aluno bateu recorde nesta sessão.
    pub new_personal_bests: Vec<Uuid>,
}

/// Resolve um agendamento pelo id durável e, na falta dele, pela chave do
/// cliente. Agendamentos de outro tenant não existem para quem pergunta.
pub async fn resolve_schedule(
    repo: &dyn ScheduleRepository,
    tenant_id: Uuid,
    key: &str,
) -> Result<Schedule, AppError> {
    let by_id = match Uuid::parse_str(key) {
        Ok(id) => repo.find_by_id(id).await?,
        Err(_) => None,
    };
    let found = match by_id {
        Some(schedule) => Some(schedule),
        None => repo.find_by_client_id(tenant_id, key).await?,
    };
    found
        .filter(|s| s.tenant_id == tenant_id)
        .ok_or(AppError::ScheduleNotFound)
}

/// Maior carga por (aluno, exercício) entre as séries concluídas com peso.
pub fn best_sets(schedule: &Schedule, logs: &[SetLog]) -> Vec<PersonalBestCandidate> {
    let mut best: BTreeMap<(Uuid, Uuid), &SetLog> = BTreeMap::new();
    for log in logs.iter().filter(|l| l.completed && l.weight > 0.0) {
        best.entry((log.member_id, log.exercise_id))
            .and_modify(|current| {
                if log.weight > current.weight {
                    *current = log;
                }
            })
            .or_insert(log);
    }

    best.into_values()
        .map(|log| PersonalBestCandidate {
            tenant_id: schedule.tenant_id,
            member_id: log.member_id,
            exercise_id: log.exercise_id,
            weight: log.weight,
            reps: log.reps,
            schedule_id: schedule.id,
        })
        .collect()
}

#[derive(Clone)]
pub struct SessionService {
    contracts: ContractService,
    schedules: Arc<dyn ScheduleRepository>,
    set_logs: Arc<dyn SetLogRepository>,
    planned_exercises: Arc<dyn PlannedExerciseRepository>,
    personal_bests: Arc<dyn PersonalBestRepository>,
    pb_detection_enabled: bool,
}

impl SessionService {
    pub fn new(
        contracts: ContractService,
        schedules: Arc<dyn ScheduleRepository>,
        set_logs: Arc<dyn SetLogRepository>,
        planned_exercises: Arc<dyn PlannedExerciseRepository>,
        personal_bests: Arc<dyn PersonalBestRepository>,
        pb_detection_enabled: bool,
    ) -> Self {
        Self {
            contracts,
            schedules,
            set_logs,
            planned_exercises,
            personal_bests,
            pb_detection_enabled,
        }
    }

    // =========================================================================
    //  1. AGENDAMENTO
    // =========================================================================

    /// Cria o agendamento como `Scheduled`, reservando uma sessão do contrato.
    /// O coach que agenda é o ator.
    pub async fn create_schedule(
        &self,
        actor: &Actor,
        request: BookingRequest,
    ) -> Result<Schedule, AppError> {
        let end_time = request
            .end_time
            .unwrap_or(request.start_time + Duration::hours(1));
        if end_time <= request.start_time {
            return Err(AppError::InvalidTimeRange);
        }

        let contract = match request.contract_id {
            Some(id) => self.contracts.get_contract(actor.tenant_id, id).await?,
            None => self
                .contracts
                .find_first_active(actor.tenant_id, actor.actor_id, request.member_id)
                .await?
                .ok_or(AppError::ContractNotFound)?,
        };

        if !contract.is_bookable() {
            return Err(AppError::PackageDepleted);
        }
        if contract.member_id != request.member_id {
            return Err(AppError::ContractMemberMismatch);
        }
        if contract.branch_id != request.branch_id {
            return Err(AppError::BranchMismatch);
        }
        if contract.coach_id != actor.actor_id {
            return Err(AppError::Forbidden);
        }

        // Guarda de overbooking: reserva e agendamento são gravados juntos
        let schedule = self
            .schedules
            .create_reserving(NewSchedule {
                tenant_id: contract.tenant_id,
                branch_id: contract.branch_id,
                contract_id: contract.id,
                coach_id: contract.coach_id,
                member_id: contract.member_id,
                client_id: request.client_id,
                start_time: request.start_time,
                end_time,
                session_goal: request.session_goal,
                remarks: request.remarks,
            })
            .await?
            .ok_or(AppError::ReservationLimitReached)?;

        tracing::info!(
            schedule_id = %schedule.id,
            contract_id = %contract.id,
            "📅 Sessão agendada"
        );
        Ok(schedule)
    }

    // =========================================================================
    //  2. REAGENDAMENTO
    // =========================================================================

    pub async fn reschedule(
        &self,
        actor: &Actor,
        key: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Schedule, AppError> {
        if end_time <= start_time {
            return Err(AppError::InvalidTimeRange);
        }

        let schedule = resolve_schedule(self.schedules.as_ref(), actor.tenant_id, key).await?;

        // Coach confirma o próprio reagendamento; o aluno precisa de aprovação
        let next = match actor.role {
            ActorRole::Coach if schedule.coach_id == actor.actor_id => ScheduleStatus::Scheduled,
            ActorRole::Member if schedule.member_id == actor.actor_id => {
                ScheduleStatus::PendingConfirmation
            }
            _ => return Err(AppError::UnauthorizedReschedule),
        };

        if schedule.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: schedule.status,
                to: next,
            });
        }

        match self
            .schedules
            .reschedule_if(schedule.id, &ScheduleStatus::RESERVING, start_time, end_time, next)
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(self.lost_race(schedule.id, next).await),
        }
    }

    /// O coach aprova um reagendamento pedido pelo aluno.
    pub async fn confirm_reschedule(&self, actor: &Actor, key: &str) -> Result<Schedule, AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), actor.tenant_id, key).await?;
        if schedule.coach_id != actor.actor_id {
            return Err(AppError::Forbidden);
        }

        let next = ScheduleStatus::Scheduled;
        if schedule.status != ScheduleStatus::PendingConfirmation {
            return Err(AppError::InvalidTransition {
                from: schedule.status,
                to: next,
            });
        }

        match self
            .schedules
            .update_status_if(schedule.id, &[ScheduleStatus::PendingConfirmation], next)
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(self.lost_race(schedule.id, next).await),
        }
    }

    // =========================================================================
    //  3. CONCLUSÃO
    // =========================================================================

    /// Marca a sessão como concluída e debita o contrato.
    ///
    /// São dois passos. Se o débito falhar depois da troca de status, a sessão
    /// continua `Completed` e o erro volta como `LedgerInconsistency`; a
    /// reconciliação repõe o débito depois.
    pub async fn complete_session(
        &self,
        actor: &Actor,
        key: &str,
    ) -> Result<CompletedSession, AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), actor.tenant_id, key).await?;

        if schedule.coach_id != actor.actor_id {
            return Err(AppError::Forbidden);
        }
        match schedule.status {
            ScheduleStatus::Completed => return Err(AppError::AlreadyCompleted),
            ScheduleStatus::Cancelled | ScheduleStatus::NoShow => {
                return Err(AppError::InvalidTransition {
                    from: schedule.status,
                    to: ScheduleStatus::Completed,
                });
            }
            ScheduleStatus::Scheduled | ScheduleStatus::PendingConfirmation => {}
        }

        // Passo 1: compare-and-set. Quem perder a corrida vê AlreadyCompleted.
        let completed = match self
            .schedules
            .update_status_if(
                schedule.id,
                &ScheduleStatus::RESERVING,
                ScheduleStatus::Completed,
            )
            .await?
        {
            Some(s) => s,
            None => return Err(self.lost_race(schedule.id, ScheduleStatus::Completed).await),
        };

        // Passo 2: débito no ledger
        let contract = match self
            .contracts
            .decrement_session(completed.contract_id, completed.id)
            .await
        {
            Ok(contract) => contract,
            Err(e) => {
                tracing::error!(
                    schedule_id = %completed.id,
                    contract_id = %completed.contract_id,
                    error = %e,
                    "❌ Sessão concluída sem débito no contrato"
                );
                return Err(AppError::LedgerInconsistency {
                    schedule_id: completed.id,
                    source: Box::new(e),
                });
            }
        };

        let new_personal_bests = if self.pb_detection_enabled {
            self.detect_personal_bests(&completed).await
        } else {
            Vec::new()
        };

        Ok(CompletedSession {
            schedule: completed,
            contract,
            new_personal_bests,
        })
    }

    /// Melhor esforço: nenhuma falha aqui derruba a conclusão.
    async fn detect_personal_bests(&self, schedule: &Schedule) -> Vec<Uuid> {
        let logs = match self.set_logs.find_by_schedule(schedule.id).await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    error = %e,
                    "Falha ao buscar séries para detecção de recordes"
                );
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for candidate in best_sets(schedule, &logs) {
            let exercise_id = candidate.exercise_id;
            let weight = candidate.weight;
            match self.personal_bests.upsert(candidate).await {
                Ok(true) => {
                    tracing::info!(
                        member_id = %schedule.member_id,
                        exercise_id = %exercise_id,
                        weight,
                        "🏆 Novo recorde pessoal"
                    );
                    records.push(exercise_id);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    exercise_id = %exercise_id,
                    error = %e,
                    "Falha ao gravar recorde pessoal"
                ),
            }
        }
        records
    }

    // =========================================================================
    //  4. CANCELAMENTO / NO-SHOW
    // =========================================================================

    pub async fn transition(
        &self,
        actor: &Actor,
        key: &str,
        transition: ManualTransition,
    ) -> Result<Schedule, AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), actor.tenant_id, key).await?;

        let allowed = match actor.role {
            ActorRole::TenantAdmin => true,
            ActorRole::Coach => schedule.coach_id == actor.actor_id,
            ActorRole::Member => false,
        };
        if !allowed {
            return Err(AppError::Forbidden);
        }

        let next = transition.target();
        if schedule.status != ScheduleStatus::Scheduled {
            return Err(AppError::InvalidTransition {
                from: schedule.status,
                to: next,
            });
        }

        // A reserva volta ao contrato na mesma escrita
        let updated = match self
            .schedules
            .close_releasing(schedule.id, &[ScheduleStatus::Scheduled], next)
            .await?
        {
            Some(s) => s,
            None => return Err(self.lost_race(schedule.id, next).await),
        };

        tracing::info!(schedule_id = %updated.id, status = %next, "Sessão encerrada sem consumo");
        Ok(updated)
    }

    // =========================================================================
    //  5. EXCLUSÃO EM CASCATA
    // =========================================================================

    /// Apaga séries, exercícios planejados e o agendamento, nessa ordem.
    pub async fn delete_schedule(&self, actor: &Actor, key: &str) -> Result<(), AppError> {
        let schedule = resolve_schedule(self.schedules.as_ref(), actor.tenant_id, key).await?;

        if schedule.coach_id != actor.actor_id {
            return Err(AppError::Forbidden);
        }
        if schedule.status != ScheduleStatus::Scheduled {
            return Err(AppError::ScheduleNotDeletable(schedule.status));
        }

        let set_logs = self.set_logs.delete_by_schedule(schedule.id).await?;
        let exercises = self.planned_exercises.delete_by_schedule(schedule.id).await?;

        let deleted = self
            .schedules
            .delete_releasing(schedule.id, ScheduleStatus::Scheduled)
            .await?;
        if !deleted {
            // O status mudou entre a leitura e a exclusão
            let current = self.schedules.find_by_id(schedule.id).await?;
            return Err(match current {
                Some(s) => AppError::ScheduleNotDeletable(s.status),
                None => AppError::ScheduleNotFound,
            });
        }

        tracing::info!(
            schedule_id = %schedule.id,
            set_logs,
            exercises,
            "🗑️ Agendamento apagado"
        );
        Ok(())
    }

    // =========================================================================
    //  6. CONSULTAS
    // =========================================================================

    pub async fn get_schedule(&self, tenant_id: Uuid, key: &str) -> Result<Schedule, AppError> {
        resolve_schedule(self.schedules.as_ref(), tenant_id, key).await
    }

    /// Agenda do próprio ator (coach ou aluno). Sem janela, usa os próximos 30 dias.
    pub async fn list_mine(
        &self,
        actor: &Actor,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Schedule>, AppError> {
        let from = from.unwrap_or_else(Utc::now);
        let to = to.unwrap_or(from + Duration::days(DEFAULT_WINDOW_DAYS));
        if to < from {
            return Err(AppError::InvalidTimeRange);
        }

        let schedules = match actor.role {
            ActorRole::Coach => self.schedules.list_by_coach(actor.actor_id, from, to).await?,
            ActorRole::Member => self.schedules.list_by_member(actor.actor_id, from, to).await?,
            ActorRole::TenantAdmin => return Err(AppError::InsufficientRole("coach")),
        };
        Ok(schedules
            .into_iter()
            .filter(|s| s.tenant_id == actor.tenant_id)
            .collect())
    }

    pub async fn list_schedules(
        &self,
        tenant_id: Uuid,
        filter: ScheduleFilter,
    ) -> Result<Vec<Schedule>, AppError> {
        self.schedules.list(tenant_id, filter).await
    }

    /// Agendamentos que ainda seguram reserva no contrato.
    pub async fn active_reservation_count(
        &self,
        tenant_id: Uuid,
        contract_id: Uuid,
    ) -> Result<i64, AppError> {
        self.contracts.get_contract(tenant_id, contract_id).await?;
        self.schedules
            .count_by_contract_and_status(contract_id, &ScheduleStatus::RESERVING)
            .await
    }

    // Outro pedido mudou o status entre a leitura e o compare-and-set.
    async fn lost_race(&self, schedule_id: Uuid, to: ScheduleStatus) -> AppError {
        match self.schedules.find_by_id(schedule_id).await {
            Ok(Some(s)) if s.status == ScheduleStatus::Completed && to == ScheduleStatus::Completed => {
                AppError::AlreadyCompleted
            }
            Ok(Some(s)) => AppError::InvalidTransition { from: s.status, to },
            Ok(None) => AppError::ScheduleNotFound,
            Err(e) => e,
        }
    }
}
