// src/db/memory.rs

// Armazenamento em memória que implementa todos os repositórios.
// Todas as tabelas ficam atrás de um único Mutex, então cada método é atômico
// em relação aos outros (o equivalente a uma única instrução no Postgres).

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::{
        ContractRepository, PackageRepository, PersonalBestRepository, PlannedExerciseRepository,
        ScheduleRepository, SetLogRepository,
    },
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

#[derive(Debug, Default)]
struct Tables {
    packages: HashMap<Uuid, PackageTemplate>,
    contracts: HashMap<Uuid, Contract>,
    schedules: HashMap<Uuid, Schedule>,
    // schedule_id -> contract_id
    consumptions: HashMap<Uuid, Uuid>,
    planned_exercises: HashMap<Uuid, PlannedExercise>,
    set_logs: HashMap<Uuid, SetLog>,
    // (tenant_id, member_id, exercise_id) -> recorde
    personal_bests: HashMap<(Uuid, Uuid, Uuid), PersonalBest>,
}

impl Tables {
    // Devolve uma reserva do contrato sem deixar o contador negativo
    fn release(&mut self, contract_id: Uuid) {
        if let Some(c) = self.contracts.get_mut(&contract_id) {
            if c.reserved_sessions > 0 {
                c.reserved_sessions -= 1;
                c.updated_at = Utc::now();
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        Ok(self.tables.lock()?)
    }
}

// `PoisonError` guarda o MutexGuard, que não é Send; só a mensagem é mantida.
impl<T> From<PoisonError<T>> for AppError {
    fn from(err: PoisonError<T>) -> Self {
        AppError::StorageUnavailable(format!("poison error: {}", err))
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

// =========================================================================
//  PACOTES
// =========================================================================

#[async_trait::async_trait]
impl PackageRepository for MemoryStore {
    async fn create(&self, new: NewPackageTemplate) -> Result<PackageTemplate, AppError> {
        let now = Utc::now();
        let template = PackageTemplate {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            branch_id: new.branch_id,
            name: new.name,
            total_sessions: new.tier.sessions(),
            price: new.price,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.packages.insert(template.id, template.clone());
        Ok(template)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PackageTemplate>, AppError> {
        Ok(self.lock()?.packages.get(&id).cloned())
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<PackageTemplate>, AppError> {
        let items = self
            .lock()?
            .packages
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |p: &PackageTemplate| p.name.clone()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: PackageTemplateChanges,
    ) -> Result<Option<PackageTemplate>, AppError> {
        let mut tables = self.lock()?;
        let Some(template) = tables.packages.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            template.name = name;
        }
        if let Some(price) = changes.price {
            template.price = price;
        }
        if let Some(active) = changes.active {
            template.active = active;
        }
        template.updated_at = Utc::now();
        Ok(Some(template.clone()))
    }
}

// =========================================================================
//  CONTRATOS
// =========================================================================

#[async_trait::async_trait]
impl ContractRepository for MemoryStore {
    async fn create(&self, new: NewContract) -> Result<Contract, AppError> {
        let now = Utc::now();
        let contract = Contract {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            branch_id: new.branch_id,
            package_id: new.package_id,
            member_id: new.member_id,
            coach_id: new.coach_id,
            total_sessions: new.total_sessions,
            remaining_sessions: new.total_sessions,
            reserved_sessions: 0,
            price: new.price,
            status: ContractStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contract>, AppError> {
        Ok(self.lock()?.contracts.get(&id).cloned())
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let items = self
            .lock()?
            .contracts
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |c: &Contract| c.created_at))
    }

    async fn list_active_by_member(&self, member_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let items = self
            .lock()?
            .contracts
            .values()
            .filter(|c| c.member_id == member_id && c.is_bookable())
            .cloned()
            .collect();
        Ok(sorted_by(items, |c: &Contract| c.created_at))
    }

    async fn list_active_by_coach(&self, coach_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let items = self
            .lock()?
            .contracts
            .values()
            .filter(|c| c.coach_id == coach_id && c.is_bookable())
            .cloned()
            .collect();
        Ok(sorted_by(items, |c: &Contract| c.created_at))
    }

    async fn find_first_active_by_coach_and_member(
        &self,
        coach_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Contract>, AppError> {
        Ok(self
            .lock()?
            .contracts
            .values()
            .filter(|c| c.coach_id == coach_id && c.member_id == member_id && c.is_bookable())
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn list_low_sessions_by_coach(
        &self,
        coach_id: Uuid,
        threshold: i32,
    ) -> Result<Vec<Contract>, AppError> {
        let items = self
            .lock()?
            .contracts
            .values()
            .filter(|c| {
                c.coach_id == coach_id
                    && c.status == ContractStatus::Active
                    && c.remaining_sessions <= threshold
            })
            .cloned()
            .collect();
        Ok(sorted_by(items, |c: &Contract| c.remaining_sessions))
    }

    async fn resync_reservations(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let mut tables = self.lock()?;

        let mut open: HashMap<Uuid, i32> = HashMap::new();
        for s in tables
            .schedules
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.status.holds_reservation())
        {
            *open.entry(s.contract_id).or_default() += 1;
        }

        let now = Utc::now();
        let mut fixed = Vec::new();
        for c in tables.contracts.values_mut().filter(|c| c.tenant_id == tenant_id) {
            let expected = open
                .get(&c.id)
                .copied()
                .unwrap_or(0)
                .min(c.remaining_sessions);
            if c.reserved_sessions != expected {
                c.reserved_sessions = expected;
                c.updated_at = now;
                fixed.push(c.clone());
            }
        }
        Ok(sorted_by(fixed, |c: &Contract| c.created_at))
    }

    async fn decrement_session(
        &self,
        contract_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Contract, AppError> {
        let mut tables = self.lock()?;

        if tables.consumptions.contains_key(&schedule_id) {
            return tables
                .contracts
                .get(&contract_id)
                .cloned()
                .ok_or(AppError::PackageDepleted);
        }

        let contract = match tables.contracts.get_mut(&contract_id) {
            Some(c) if c.remaining_sessions > 0 => {
                c.remaining_sessions -= 1;
                c.reserved_sessions = (c.reserved_sessions - 1).max(0);
                if c.remaining_sessions == 0 {
                    c.status = ContractStatus::Depleted;
                }
                c.updated_at = Utc::now();
                c.clone()
            }
            _ => return Err(AppError::PackageDepleted),
        };

        tables.consumptions.insert(schedule_id, contract_id);
        Ok(contract)
    }

    async fn update_status(
        &self,
        contract_id: Uuid,
        status: ContractStatus,
    ) -> Result<Option<Contract>, AppError> {
        let mut tables = self.lock()?;
        let Some(contract) = tables.contracts.get_mut(&contract_id) else {
            return Ok(None);
        };
        contract.status = status;
        contract.updated_at = Utc::now();
        Ok(Some(contract.clone()))
    }
}

// =========================================================================
//  AGENDAMENTOS
// =========================================================================

#[async_trait::async_trait]
impl ScheduleRepository for MemoryStore {
    async fn create_reserving(&self, new: NewSchedule) -> Result<Option<Schedule>, AppError> {
        let mut tables = self.lock()?;

        if let Some(client_id) = &new.client_id {
            let taken = tables.schedules.values().any(|s| {
                s.tenant_id == new.tenant_id && s.client_id.as_deref() == Some(client_id.as_str())
            });
            if taken {
                return Err(AppError::DuplicateClientId(client_id.clone()));
            }
        }

        let now = Utc::now();
        match tables.contracts.get_mut(&new.contract_id) {
            Some(c) if c.status == ContractStatus::Active && c.available_sessions() > 0 => {
                c.reserved_sessions += 1;
                c.updated_at = now;
            }
            _ => return Ok(None),
        }

        let schedule = Schedule {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            tenant_id: new.tenant_id,
            branch_id: new.branch_id,
            contract_id: new.contract_id,
            coach_id: new.coach_id,
            member_id: new.member_id,
            start_time: new.start_time,
            end_time: new.end_time,
            status: ScheduleStatus::Scheduled,
            session_goal: new.session_goal,
            remarks: new.remarks,
            created_at: now,
            updated_at: now,
        };
        tables.schedules.insert(schedule.id, schedule.clone());
        Ok(Some(schedule))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>, AppError> {
        Ok(self.lock()?.schedules.get(&id).cloned())
    }

    async fn find_by_client_id(
        &self,
        tenant_id: Uuid,
        client_id: &str,
    ) -> Result<Option<Schedule>, AppError> {
        Ok(self
            .lock()?
            .schedules
            .values()
            .find(|s| s.tenant_id == tenant_id && s.client_id.as_deref() == Some(client_id))
            .cloned())
    }

    async fn list_by_coach(
        &self,
        coach_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, AppError> {
        let items = self
            .lock()?
            .schedules
            .values()
            .filter(|s| s.coach_id == coach_id && s.start_time >= from && s.start_time <= to)
            .cloned()
            .collect();
        Ok(sorted_by(items, |s: &Schedule| s.start_time))
    }

    async fn list_by_member(
        &self,
        member_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, AppError> {
        let items = self
            .lock()?
            .schedules
            .values()
            .filter(|s| s.member_id == member_id && s.start_time >= from && s.start_time <= to)
            .cloned()
            .collect();
        Ok(sorted_by(items, |s: &Schedule| s.start_time))
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: ScheduleFilter,
    ) -> Result<Vec<Schedule>, AppError> {
        let items = self
            .lock()?
            .schedules
            .values()
            .filter(|s| s.tenant_id == tenant_id && filter.matches(s))
            .cloned()
            .collect();
        Ok(sorted_by(items, |s: &Schedule| s.start_time))
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError> {
        let mut tables = self.lock()?;
        match tables.schedules.get_mut(&id) {
            Some(s) if expected.contains(&s.status) => {
                s.status = next;
                s.updated_at = Utc::now();
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn reschedule_if(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError> {
        let mut tables = self.lock()?;
        match tables.schedules.get_mut(&id) {
            Some(s) if expected.contains(&s.status) => {
                s.start_time = start_time;
                s.end_time = end_time;
                s.status = next;
                s.updated_at = Utc::now();
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn close_releasing(
        &self,
        id: Uuid,
        expected: &[ScheduleStatus],
        next: ScheduleStatus,
    ) -> Result<Option<Schedule>, AppError> {
        let mut tables = self.lock()?;
        let closed = match tables.schedules.get_mut(&id) {
            Some(s) if expected.contains(&s.status) => {
                s.status = next;
                s.updated_at = Utc::now();
                s.clone()
            }
            _ => return Ok(None),
        };
        tables.release(closed.contract_id);
        Ok(Some(closed))
    }

    async fn delete_releasing(
        &self,
        id: Uuid,
        expected: ScheduleStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let contract_id = match tables.schedules.get(&id) {
            Some(s) if s.status == expected => s.contract_id,
            _ => return Ok(false),
        };
        tables.schedules.remove(&id);
        tables.release(contract_id);
        Ok(true)
    }

    async fn count_by_contract_and_status(
        &self,
        contract_id: Uuid,
        statuses: &[ScheduleStatus],
    ) -> Result<i64, AppError> {
        let count = self
            .lock()?
            .schedules
            .values()
            .filter(|s| s.contract_id == contract_id && statuses.contains(&s.status))
            .count();
        Ok(count as i64)
    }

    async fn list_completed_without_consumption(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Schedule>, AppError> {
        let tables = self.lock()?;
        let items = tables
            .schedules
            .values()
            .filter(|s| {
                s.tenant_id == tenant_id
                    && s.status == ScheduleStatus::Completed
                    && !tables.consumptions.contains_key(&s.id)
            })
            .cloned()
            .collect();
        Ok(sorted_by(items, |s: &Schedule| s.start_time))
    }
}

// =========================================================================
//  REGISTROS DE TREINO
// =========================================================================

#[async_trait::async_trait]
impl SetLogRepository for MemoryStore {
    async fn create(&self, new: NewSetLog) -> Result<SetLog, AppError> {
        let now = Utc::now();
        let log = SetLog {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            planned_exercise_id: new.planned_exercise_id,
            schedule_id: new.schedule_id,
            member_id: new.member_id,
            exercise_id: new.exercise_id,
            set_index: new.set_index,
            weight: new.weight,
            reps: new.reps,
            remarks: new.remarks,
            completed: new.completed,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.set_logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn find_by_schedule(&self, schedule_id: Uuid) -> Result<Vec<SetLog>, AppError> {
        let items = self
            .lock()?
            .set_logs
            .values()
            .filter(|l| l.schedule_id == schedule_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |l: &SetLog| (l.planned_exercise_id, l.set_index)))
    }

    async fn delete_by_schedule(&self, schedule_id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let before = tables.set_logs.len();
        tables.set_logs.retain(|_, l| l.schedule_id != schedule_id);
        Ok((before - tables.set_logs.len()) as u64)
    }
}

#[async_trait::async_trait]
impl PlannedExerciseRepository for MemoryStore {
    async fn create(&self, new: NewPlannedExercise) -> Result<PlannedExercise, AppError> {
        let planned = PlannedExercise {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            schedule_id: new.schedule_id,
            member_id: new.member_id,
            exercise_id: new.exercise_id,
            target_sets: new.target_sets,
            target_reps: new.target_reps,
            rest_seconds: new.rest_seconds,
            notes: new.notes,
            position: new.position,
            created_at: Utc::now(),
        };
        self.lock()?
            .planned_exercises
            .insert(planned.id, planned.clone());
        Ok(planned)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlannedExercise>, AppError> {
        Ok(self.lock()?.planned_exercises.get(&id).cloned())
    }

    async fn list_by_schedule(&self, schedule_id: Uuid) -> Result<Vec<PlannedExercise>, AppError> {
        let items = self
            .lock()?
            .planned_exercises
            .values()
            .filter(|p| p.schedule_id == schedule_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |p: &PlannedExercise| p.position))
    }

    async fn delete_by_schedule(&self, schedule_id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let before = tables.planned_exercises.len();
        tables
            .planned_exercises
            .retain(|_, p| p.schedule_id != schedule_id);
        Ok((before - tables.planned_exercises.len()) as u64)
    }
}

#[async_trait::async_trait]
impl PersonalBestRepository for MemoryStore {
    async fn upsert(&self, candidate: PersonalBestCandidate) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let key = (candidate.tenant_id, candidate.member_id, candidate.exercise_id);
        let now = Utc::now();

        match tables.personal_bests.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                // Empate não é recorde
                if candidate.weight <= existing.weight {
                    return Ok(false);
                }
                existing.weight = candidate.weight;
                existing.reps = candidate.reps;
                existing.schedule_id = candidate.schedule_id;
                existing.achieved_at = now;
                existing.updated_at = now;
                Ok(true)
            }
            Entry::Vacant(entry) => {
                entry.insert(PersonalBest {
                    id: Uuid::new_v4(),
                    tenant_id: candidate.tenant_id,
                    member_id: candidate.member_id,
                    exercise_id: candidate.exercise_id,
                    weight: candidate.weight,
                    reps: candidate.reps,
                    schedule_id: candidate.schedule_id,
                    achieved_at: now,
                    created_at: now,
                    updated_at: now,
                });
                Ok(true)
            }
        }
    }

    async fn list_by_member(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<PersonalBest>, AppError> {
        let items = self
            .lock()?
            .personal_bests
            .values()
            .filter(|pb| pb.tenant_id == tenant_id && pb.member_id == member_id)
            .cloned()
            .collect();
        Ok(sorted_by(items, |pb: &PersonalBest| pb.exercise_id))
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Sobrescreve o contador de reservas, deixando-o fora de sincronia.
    pub(crate) fn force_reserved(&self, contract_id: Uuid, reserved: i32) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(c) = tables.contracts.get_mut(&contract_id) {
            c.reserved_sessions = reserved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    async fn seed_contract(store: &MemoryStore, total: i32) -> Contract {
        seed_contract_in(store, Uuid::new_v4(), total).await
    }

    async fn seed_contract_in(store: &MemoryStore, tenant_id: Uuid, total: i32) -> Contract {
        ContractRepository::create(
            store,
            NewContract {
                tenant_id,
                branch_id: Uuid::new_v4(),
                package_id: Uuid::new_v4(),
                member_id: Uuid::new_v4(),
                coach_id: Uuid::new_v4(),
                total_sessions: total,
                price: Decimal::new(50000, 2),
            },
        )
        .await
        .unwrap()
    }

    fn new_schedule(contract: &Contract, client_id: Option<&str>) -> NewSchedule {
        let start = Utc::now();
        NewSchedule {
            tenant_id: contract.tenant_id,
            branch_id: contract.branch_id,
            contract_id: contract.id,
            coach_id: contract.coach_id,
            member_id: contract.member_id,
            client_id: client_id.map(str::to_string),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            session_goal: None,
            remarks: None,
        }
    }

    async fn reserved(store: &MemoryStore, contract_id: Uuid) -> i32 {
        ContractRepository::find_by_id(store, contract_id)
            .await
            .unwrap()
            .unwrap()
            .reserved_sessions
    }

    #[tokio::test]
    async fn decrement_flips_to_depleted_at_zero() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;

        // Consome 9 das 10 sessões
        for _ in 0..9 {
            let c = store.decrement_session(contract.id, Uuid::new_v4()).await.unwrap();
            assert_eq!(c.status, ContractStatus::Active);
        }
        let last = store.decrement_session(contract.id, Uuid::new_v4()).await.unwrap();
        assert_eq!(last.remaining_sessions, 0);
        assert_eq!(last.status, ContractStatus::Depleted);

        let err = store.decrement_session(contract.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::PackageDepleted));
        let stored = ContractRepository::find_by_id(&store, contract.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_sessions, 0);
    }

    #[tokio::test]
    async fn decrement_is_idempotent_per_schedule() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;
        let schedule_id = Uuid::new_v4();

        store.decrement_session(contract.id, schedule_id).await.unwrap();
        let replay = store.decrement_session(contract.id, schedule_id).await.unwrap();
        assert_eq!(replay.remaining_sessions, 9);
    }

    #[tokio::test]
    async fn decrement_on_missing_contract_is_depleted() {
        let store = MemoryStore::new();
        let err = store
            .decrement_session(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PackageDepleted));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_decrements_on_last_session_only_one_wins() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;
        for _ in 0..9 {
            store.decrement_session(contract.id, Uuid::new_v4()).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let id = contract.id;
            handles.push(tokio::spawn(async move {
                store.decrement_session(id, Uuid::new_v4()).await
            }));
        }

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_never_exceed_remaining() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let store = store.clone();
            let new = new_schedule(&contract, None);
            handles.push(tokio::spawn(async move { store.create_reserving(new).await }));
        }

        let mut granted = 0;
        for h in handles {
            if h.await.unwrap().unwrap().is_some() {
                granted += 1;
            }
        }
        assert_eq!(granted, 10);
        let stored = ContractRepository::find_by_id(&store, contract.id).await.unwrap().unwrap();
        assert_eq!(stored.reserved_sessions, 10);
        assert_eq!(stored.available_sessions(), 0);
        assert_eq!(
            store
                .count_by_contract_and_status(contract.id, &ScheduleStatus::RESERVING)
                .await
                .unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn closing_and_deleting_give_the_reservation_back() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;

        let a = store.create_reserving(new_schedule(&contract, None)).await.unwrap().unwrap();
        let b = store.create_reserving(new_schedule(&contract, None)).await.unwrap().unwrap();
        assert_eq!(reserved(&store, contract.id).await, 2);

        let cancelled = store
            .close_releasing(a.id, &[ScheduleStatus::Scheduled], ScheduleStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.unwrap().status, ScheduleStatus::Cancelled);
        assert_eq!(reserved(&store, contract.id).await, 1);

        // Segunda tentativa não casa o status e não mexe no contador
        assert!(store
            .close_releasing(a.id, &[ScheduleStatus::Scheduled], ScheduleStatus::NoShow)
            .await
            .unwrap()
            .is_none());
        assert_eq!(reserved(&store, contract.id).await, 1);

        assert!(store.delete_releasing(b.id, ScheduleStatus::Scheduled).await.unwrap());
        assert_eq!(reserved(&store, contract.id).await, 0);
        assert!(!store.delete_releasing(b.id, ScheduleStatus::Scheduled).await.unwrap());
        assert_eq!(reserved(&store, contract.id).await, 0);
    }

    #[tokio::test]
    async fn booking_without_capacity_changes_nothing() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;
        store
            .update_status(contract.id, ContractStatus::Expired)
            .await
            .unwrap();

        assert!(store
            .create_reserving(new_schedule(&contract, None))
            .await
            .unwrap()
            .is_none());
        assert_eq!(reserved(&store, contract.id).await, 0);
        assert!(store
            .list(contract.tenant_id, ScheduleFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn client_id_is_unique_per_tenant_only() {
        let store = MemoryStore::new();
        let first = seed_contract(&store, 10).await;
        let second = seed_contract(&store, 10).await;

        let a = store
            .create_reserving(new_schedule(&first, Some("01HZXSHARED")))
            .await
            .unwrap()
            .unwrap();
        let b = store
            .create_reserving(new_schedule(&second, Some("01HZXSHARED")))
            .await
            .unwrap()
            .unwrap();

        let found_a = store.find_by_client_id(first.tenant_id, "01HZXSHARED").await.unwrap();
        let found_b = store.find_by_client_id(second.tenant_id, "01HZXSHARED").await.unwrap();
        assert_eq!(found_a.unwrap().id, a.id);
        assert_eq!(found_b.unwrap().id, b.id);

        let err = store
            .create_reserving(new_schedule(&first, Some("01HZXSHARED")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateClientId(_)));
        assert_eq!(reserved(&store, first.id).await, 1);
    }

    #[tokio::test]
    async fn resync_rebuilds_reservation_counter() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let drifted = seed_contract_in(&store, tenant_id, 10).await;
        let healthy = seed_contract_in(&store, tenant_id, 10).await;
        let other_tenant = seed_contract(&store, 10).await;

        store.create_reserving(new_schedule(&drifted, None)).await.unwrap();
        store.create_reserving(new_schedule(&healthy, None)).await.unwrap();
        store.force_reserved(drifted.id, 5);
        store.force_reserved(other_tenant.id, 3);

        let fixed = store.resync_reservations(tenant_id).await.unwrap();
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].id, drifted.id);
        assert_eq!(reserved(&store, drifted.id).await, 1);
        assert_eq!(reserved(&store, healthy.id).await, 1);
        // Outro tenant não é tocado
        assert_eq!(reserved(&store, other_tenant.id).await, 3);
    }

    #[tokio::test]
    async fn personal_best_only_moves_up() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();
        let exercise_id = Uuid::new_v4();
        let candidate = |weight: f64| PersonalBestCandidate {
            tenant_id,
            member_id,
            exercise_id,
            weight,
            reps: 5,
            schedule_id: Uuid::new_v4(),
        };

        assert!(store.upsert(candidate(100.0)).await.unwrap());
        assert!(!store.upsert(candidate(100.0)).await.unwrap());
        assert!(!store.upsert(candidate(90.0)).await.unwrap());
        assert!(store.upsert(candidate(102.5)).await.unwrap());

        let pbs = PersonalBestRepository::list_by_member(&store, tenant_id, member_id)
            .await
            .unwrap();
        assert_eq!(pbs.len(), 1);
        assert_eq!(pbs[0].weight, 102.5);
        let foreign = PersonalBestRepository::list_by_member(&store, Uuid::new_v4(), member_id)
            .await
            .unwrap();
        assert!(foreign.is_empty());
    }

    #[tokio::test]
    async fn schedule_status_compare_and_set() {
        let store = MemoryStore::new();
        let contract = seed_contract(&store, 10).await;
        let schedule = store
            .create_reserving(new_schedule(&contract, Some("01HZXCLIENT")))
            .await
            .unwrap()
            .unwrap();

        let open = ScheduleStatus::RESERVING;
        let first = store
            .update_status_if(schedule.id, &open, ScheduleStatus::Completed)
            .await
            .unwrap();
        let second = store
            .update_status_if(schedule.id, &open, ScheduleStatus::Completed)
            .await
            .unwrap();
        assert!(first.is_some());
        assert!(second.is_none());

        let by_client = store
            .find_by_client_id(contract.tenant_id, "01HZXCLIENT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_client.id, schedule.id);
        assert!(!store
            .delete_releasing(schedule.id, ScheduleStatus::Scheduled)
            .await
            .unwrap());
    }
}
