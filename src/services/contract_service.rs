// src/services/contract_service.rs

// O ledger de sessões: criação de contratos, débitos e contador de reservas.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::{ContractRepository, PackageRepository},
    models::pt::{Contract, ContractStatus, NewContract},
};

#[derive(Clone)]
pub struct ContractService {
    contracts: Arc<dyn ContractRepository>,
    packages: Arc<dyn PackageRepository>,
}

impl ContractService {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        packages: Arc<dyn PackageRepository>,
    ) -> Self {
        Self {
            contracts,
            packages,
        }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_contract(
        &self,
        tenant_id: Uuid,
        package_id: Uuid,
        member_id: Uuid,
        coach_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Contract, AppError> {
        let template = self
            .packages
            .find_by_id(package_id)
            .await?
            .filter(|t| t.tenant_id == tenant_id)
            .ok_or(AppError::PackageTemplateNotFound)?;

        if !template.active {
            return Err(AppError::InactivePackageTemplate);
        }

        // Modelo restrito a uma unidade só pode ser vendido nela
        if template.branch_id.is_some_and(|b| b != branch_id) {
            return Err(AppError::BranchMismatch);
        }

        let contract = self
            .contracts
            .create(NewContract {
                tenant_id,
                branch_id,
                package_id,
                member_id,
                coach_id,
                total_sessions: template.total_sessions,
                price: template.price,
            })
            .await?;

        tracing::info!(
            contract_id = %contract.id,
            member_id = %member_id,
            coach_id = %coach_id,
            sessions = contract.total_sessions,
            "📝 Contrato de PT criado"
        );
        Ok(contract)
    }

    // =========================================================================
    //  SALDO
    // =========================================================================

    /// Debita uma sessão para o agendamento dado. Repetir para o mesmo
    /// agendamento não debita de novo.
    pub async fn decrement_session(
        &self,
        contract_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Contract, AppError> {
        let contract = self
            .contracts
            .decrement_session(contract_id, schedule_id)
            .await?;

        tracing::info!(
            contract_id = %contract.id,
            schedule_id = %schedule_id,
            remaining = contract.remaining_sessions,
            "✅ Sessão consumida"
        );
        if contract.status == ContractStatus::Depleted {
            tracing::info!(contract_id = %contract.id, "Contrato esgotado");
        }
        Ok(contract)
    }

    /// Realinha o contador de reservas com os agendamentos abertos do tenant.
    pub async fn resync_reservations(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError> {
        let fixed = self.contracts.resync_reservations(tenant_id).await?;
        for contract in &fixed {
            tracing::warn!(
                contract_id = %contract.id,
                reserved = contract.reserved_sessions,
                "Contador de reservas corrigido"
            );
        }
        Ok(fixed)
    }

    /// Mudança manual de status. `Depleted` é derivado do saldo e não pode
    /// ser pedido; `Active` exige saldo.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        contract_id: Uuid,
        status: ContractStatus,
    ) -> Result<Contract, AppError> {
        let contract = self.get_contract(tenant_id, contract_id).await?;

        match status {
            ContractStatus::Depleted => {
                return Err(AppError::DerivedStatus(status.to_string()));
            }
            ContractStatus::Active if contract.remaining_sessions == 0 => {
                return Err(AppError::PackageDepleted);
            }
            _ => {}
        }

        let updated = self
            .contracts
            .update_status(contract_id, status)
            .await?
            .ok_or(AppError::ContractNotFound)?;

        tracing::info!(contract_id = %contract_id, status = %status, "Status do contrato alterado");
        Ok(updated)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn get_contract(&self, tenant_id: Uuid, contract_id: Uuid) -> Result<Contract, AppError> {
        self.contracts
            .find_by_id(contract_id)
            .await?
            .filter(|c| c.tenant_id == tenant_id)
            .ok_or(AppError::ContractNotFound)
    }

    pub async fn list_contracts(&self, tenant_id: Uuid) -> Result<Vec<Contract>, AppError> {
        self.contracts.list_by_tenant(tenant_id).await
    }

    pub async fn list_active_for_member(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<Contract>, AppError> {
        let contracts = self.contracts.list_active_by_member(member_id).await?;
        Ok(contracts.into_iter().filter(|c| c.tenant_id == tenant_id).collect())
    }

    /// Contratos ativos do coach; com `threshold`, só os de saldo baixo.
    pub async fn list_for_coach(
        &self,
        tenant_id: Uuid,
        coach_id: Uuid,
        threshold: Option<i32>,
    ) -> Result<Vec<Contract>, AppError> {
        let contracts = match threshold {
            Some(t) if t < 0 => {
                return Err(AppError::InvalidRequest(
                    "low_sessions_threshold não pode ser negativo".into(),
                ));
            }
            Some(t) => self.contracts.list_low_sessions_by_coach(coach_id, t).await?,
            None => self.contracts.list_active_by_coach(coach_id).await?,
        };
        Ok(contracts.into_iter().filter(|c| c.tenant_id == tenant_id).collect())
    }

    pub async fn find_first_active(
        &self,
        tenant_id: Uuid,
        coach_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Contract>, AppError> {
        Ok(self
            .contracts
            .find_first_active_by_coach_and_member(coach_id, member_id)
            .await?
            .filter(|c| c.tenant_id == tenant_id))
    }
}
