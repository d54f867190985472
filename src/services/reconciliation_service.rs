// src/services/reconciliation_service.rs

// Repõe débitos de sessões concluídas cujo consumo nunca foi gravado
// (falha no segundo passo da conclusão) e realinha o contador de reservas.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError, db::repository::ScheduleRepository,
    services::contract_service::ContractService,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub replayed: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    /// Contratos cujo `reserved_sessions` foi recalculado.
    pub reservations_resynced: Vec<Uuid>,
}

#[derive(Clone)]
pub struct ReconciliationService {
    contracts: ContractService,
    schedules: Arc<dyn ScheduleRepository>,
}

impl ReconciliationService {
    pub fn new(contracts: ContractService, schedules: Arc<dyn ScheduleRepository>) -> Self {
        Self {
            contracts,
            schedules,
        }
    }

    pub async fn reconcile(&self, tenant_id: Uuid) -> Result<ReconciliationReport, AppError> {
        let pending = self
            .schedules
            .list_completed_without_consumption(tenant_id)
            .await?;

        let mut report = ReconciliationReport::default();
        for schedule in pending {
            // O débito é idempotente por agendamento
            match self
                .contracts
                .decrement_session(schedule.contract_id, schedule.id)
                .await
            {
                Ok(_) => report.replayed.push(schedule.id),
                Err(e) => {
                    tracing::warn!(
                        schedule_id = %schedule.id,
                        contract_id = %schedule.contract_id,
                        error = %e,
                        "Não foi possível repor o débito"
                    );
                    report.failed.push(schedule.id);
                }
            }
        }

        // Depois dos débitos: reserva = agendamentos que ainda a seguram
        report.reservations_resynced = self
            .contracts
            .resync_reservations(tenant_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        tracing::info!(
            tenant_id = %tenant_id,
            replayed = report.replayed.len(),
            failed = report.failed.len(),
            resynced = report.reservations_resynced.len(),
            "🔁 Reconciliação do ledger concluída"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{repository::ContractRepository, MemoryStore},
        models::pt::{NewContract, NewSchedule, ScheduleStatus},
    };
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    async fn completed_schedule(store: &MemoryStore, remaining_after: i32) -> (Uuid, Uuid, Uuid) {
        let tenant_id = Uuid::new_v4();
        let contract = ContractRepository::create(
            store,
            NewContract {
                tenant_id,
                branch_id: Uuid::new_v4(),
                package_id: Uuid::new_v4(),
                member_id: Uuid::new_v4(),
                coach_id: Uuid::new_v4(),
                total_sessions: 10,
                price: Decimal::ONE,
            },
        )
        .await
        .unwrap();
        let start = Utc::now();
        let schedule = store
            .create_reserving(NewSchedule {
                tenant_id,
                branch_id: contract.branch_id,
                contract_id: contract.id,
                coach_id: contract.coach_id,
                member_id: contract.member_id,
                client_id: None,
                start_time: start,
                end_time: start + Duration::hours(1),
                session_goal: None,
                remarks: None,
            })
            .await
            .unwrap()
            .unwrap();
        // Simula a falha do segundo passo: status trocado, débito ausente
        store
            .update_status_if(schedule.id, &ScheduleStatus::RESERVING, ScheduleStatus::Completed)
            .await
            .unwrap();
        for _ in remaining_after..10 {
            store.decrement_session(contract.id, Uuid::new_v4()).await.unwrap();
        }

        (tenant_id, contract.id, schedule.id)
    }

    fn service(store: Arc<MemoryStore>) -> ReconciliationService {
        ReconciliationService::new(ContractService::new(store.clone(), store.clone()), store)
    }

    #[tokio::test]
    async fn replays_missing_consumption_once() {
        let store = Arc::new(MemoryStore::new());
        let (tenant_id, contract_id, schedule_id) = completed_schedule(&store, 10).await;
        let svc = service(store.clone());

        let report = svc.reconcile(tenant_id).await.unwrap();
        assert_eq!(report.replayed, vec![schedule_id]);
        assert!(report.failed.is_empty());

        let again = svc.reconcile(tenant_id).await.unwrap();
        assert!(again.replayed.is_empty());

        let contract = ContractRepository::find_by_id(store.as_ref(), contract_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contract.remaining_sessions, 9);
    }

    #[tokio::test]
    async fn reports_schedules_it_cannot_repair() {
        let store = Arc::new(MemoryStore::new());
        let (tenant_id, _, schedule_id) = completed_schedule(&store, 0).await;

        let report = service(store).reconcile(tenant_id).await.unwrap();
        assert!(report.replayed.is_empty());
        assert_eq!(report.failed, vec![schedule_id]);
    }

    #[tokio::test]
    async fn leaked_reservation_is_returned() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = Uuid::new_v4();
        let contract = ContractRepository::create(
            store.as_ref(),
            NewContract {
                tenant_id,
                branch_id: Uuid::new_v4(),
                package_id: Uuid::new_v4(),
                member_id: Uuid::new_v4(),
                coach_id: Uuid::new_v4(),
                total_sessions: 1,
                price: Decimal::ONE,
            },
        )
        .await
        .unwrap();
        // Reserva presa sem agendamento nenhum
        store.force_reserved(contract.id, 1);

        let start = Utc::now();
        let booking = NewSchedule {
            tenant_id,
            branch_id: contract.branch_id,
            contract_id: contract.id,
            coach_id: contract.coach_id,
            member_id: contract.member_id,
            client_id: None,
            start_time: start,
            end_time: start + Duration::hours(1),
            session_goal: None,
            remarks: None,
        };
        assert!(store.create_reserving(booking.clone()).await.unwrap().is_none());

        let report = service(store.clone()).reconcile(tenant_id).await.unwrap();
        assert_eq!(report.reservations_resynced, vec![contract.id]);

        assert!(store.create_reserving(booking).await.unwrap().is_some());
        let after = ContractRepository::find_by_id(store.as_ref(), contract.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.reserved_sessions, 1);
    }
}
