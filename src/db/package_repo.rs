// src/db/package_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::PackageRepository,
    models::pt::{NewPackageTemplate, PackageTemplate, PackageTemplateChanges},
};

#[derive(Clone)]
pub struct PgPackageRepository {
    pool: PgPool,
}

impl PgPackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PackageRepository for PgPackageRepository {
    async fn create(&self, new: NewPackageTemplate) -> Result<PackageTemplate, AppError> {
        let template = sqlx::query_as::<_, PackageTemplate>(
            r#"
            INSERT INTO package_templates (tenant_id, branch_id, name, total_sessions, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.branch_id)
        .bind(&new.name)
        .bind(new.tier.sessions())
        .bind(new.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(template)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PackageTemplate>, AppError> {
        let template =
            sqlx::query_as::<_, PackageTemplate>("SELECT * FROM package_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(template)
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<PackageTemplate>, AppError> {
        let templates = sqlx::query_as::<_, PackageTemplate>(
            "SELECT * FROM package_templates WHERE tenant_id = $1 ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: PackageTemplateChanges,
    ) -> Result<Option<PackageTemplate>, AppError> {
        // COALESCE mantém o valor atual quando o campo não veio
        let template = sqlx::query_as::<_, PackageTemplate>(
            r#"
            UPDATE package_templates
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                active = COALESCE($4, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.price)
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }
}
