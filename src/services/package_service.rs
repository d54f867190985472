// src/services/package_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::PackageRepository,
    models::pt::{NewPackageTemplate, PackageTemplate, PackageTemplateChanges, SessionTier},
};

#[derive(Clone)]
pub struct PackageService {
    repo: Arc<dyn PackageRepository>,
}

impl PackageService {
    pub fn new(repo: Arc<dyn PackageRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_template(
        &self,
        tenant_id: Uuid,
        branch_id: Option<Uuid>,
        name: String,
        total_sessions: i32,
        price: Decimal,
    ) -> Result<PackageTemplate, AppError> {
        let tier = SessionTier::try_from(total_sessions)?;
        if price.is_sign_negative() {
            return Err(AppError::InvalidRequest("o preço não pode ser negativo".into()));
        }

        let template = self
            .repo
            .create(NewPackageTemplate {
                tenant_id,
                branch_id,
                name,
                tier,
                price,
            })
            .await?;

        tracing::info!(
            template_id = %template.id,
            sessions = template.total_sessions,
            "📦 Modelo de pacote criado"
        );
        Ok(template)
    }

    /// Modelos de outro tenant são tratados como inexistentes.
    pub async fn get_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
    ) -> Result<PackageTemplate, AppError> {
        self.repo
            .find_by_id(template_id)
            .await?
            .filter(|t| t.tenant_id == tenant_id)
            .ok_or(AppError::PackageTemplateNotFound)
    }

    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<PackageTemplate>, AppError> {
        self.repo.list_by_tenant(tenant_id).await
    }

    pub async fn update_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        changes: PackageTemplateChanges,
    ) -> Result<PackageTemplate, AppError> {
        if changes.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(AppError::InvalidRequest("o preço não pode ser negativo".into()));
        }

        // Garante o escopo do tenant antes de alterar
        self.get_template(tenant_id, template_id).await?;

        self.repo
            .update(template_id, changes)
            .await?
            .ok_or(AppError::PackageTemplateNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> PackageService {
        PackageService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn creates_active_template_for_sellable_tier() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let t = svc
            .create_template(tenant, None, "Pacote 20".into(), 20, Decimal::new(120000, 2))
            .await
            .unwrap();
        assert!(t.active);
        assert_eq!(t.total_sessions, 20);
        assert_eq!(svc.list_templates(tenant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_non_tier_amounts() {
        let err = service()
            .create_template(Uuid::new_v4(), None, "Pacote 15".into(), 15, Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSessionAmount(15)));
    }

    #[tokio::test]
    async fn other_tenant_cannot_see_or_update() {
        let svc = service();
        let t = svc
            .create_template(Uuid::new_v4(), None, "Pacote 10".into(), 10, Decimal::ONE)
            .await
            .unwrap();

        let other = Uuid::new_v4();
        assert!(matches!(
            svc.get_template(other, t.id).await,
            Err(AppError::PackageTemplateNotFound)
        ));
        let changes = PackageTemplateChanges {
            active: Some(false),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_template(other, t.id, changes).await,
            Err(AppError::PackageTemplateNotFound)
        ));
    }

    #[tokio::test]
    async fn update_keeps_session_tier() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let t = svc
            .create_template(tenant, None, "Pacote 30".into(), 30, Decimal::ONE)
            .await
            .unwrap();

        let updated = svc
            .update_template(
                tenant,
                t.id,
                PackageTemplateChanges {
                    name: Some("Pacote 30 Premium".into()),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Pacote 30 Premium");
        assert!(!updated.active);
        assert_eq!(updated.total_sessions, 30);
        assert_eq!(updated.price, Decimal::ONE);
    }
}
