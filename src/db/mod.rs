mod models;

pub use models::*;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::{
    CertificateRecord, CertificateRecords, CertificateStatus, EligibleParticipant,
    RegistrationSource, TemplateStore,
};
use crate::template::PartialTemplate;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Single active template per installation, stored as JSON text so partially
/// specified templates round-trip exactly as authored.
pub struct PgTemplateStore {
    pool: DbPool,
}

impl PgTemplateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn get_template(&self) -> Result<PartialTemplate, StoreError> {
        let data: Option<String> =
            sqlx::query_scalar("SELECT data FROM certificate_templates WHERE id = 1")
                .fetch_optional(self.pool.as_ref())
                .await?;

        match data {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| StoreError(format!("stored template is unreadable: {}", e))),
            None => Ok(PartialTemplate::default()),
        }
    }

    async fn put_template(&self, template: &PartialTemplate) -> Result<(), StoreError> {
        let json = serde_json::to_string(template)
            .map_err(|e| StoreError(format!("template serialization: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO certificate_templates (id, data, updated_at)
            VALUES (1, $1, now())
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(&json)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}

pub struct PgRegistrationSource {
    pool: DbPool,
}

impl PgRegistrationSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationSource for PgRegistrationSource {
    async fn list_eligible(&self, event_id: &str) -> Result<Vec<EligibleParticipant>, StoreError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT * FROM eligible_registrations
            WHERE event_id = $1 AND status = 'confirmed'
            ORDER BY participant_id
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(RegistrationRow::into_participant).collect())
    }

    async fn eligible_participant(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<Option<EligibleParticipant>, StoreError> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT * FROM eligible_registrations
            WHERE event_id = $1 AND participant_id = $2 AND status = 'confirmed'
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(RegistrationRow::into_participant))
    }
}

pub struct PgCertificateRecords {
    pool: DbPool,
}

impl PgCertificateRecords {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateRecords for PgCertificateRecords {
    async fn upsert(&self, record: &CertificateRecord) -> Result<(), StoreError> {
        // The unique (event_id, participant_id) index makes regeneration an
        // overwrite, never a duplicate row.
        sqlx::query(
            r#"
            INSERT INTO generated_certificates
                (event_id, participant_id, participant_name, certificate_number,
                 status, document_filename, generated_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            ON CONFLICT (event_id, participant_id) DO UPDATE SET
                participant_name = EXCLUDED.participant_name,
                certificate_number = EXCLUDED.certificate_number,
                status = EXCLUDED.status,
                document_filename = EXCLUDED.document_filename,
                generated_at = EXCLUDED.generated_at,
                updated_at = now()
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.participant_id)
        .bind(&record.participant_name)
        .bind(&record.certificate_number)
        .bind(record.status.as_str())
        .bind(&record.document_filename)
        .bind(record.generated_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<Option<CertificateRecord>, StoreError> {
        let row = sqlx::query_as::<_, CertificateRow>(
            "SELECT * FROM generated_certificates WHERE event_id = $1 AND participant_id = $2",
        )
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(CertificateRow::into_record).transpose()
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<CertificateRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CertificateRow>(
            "SELECT * FROM generated_certificates WHERE event_id = $1 ORDER BY participant_id",
        )
        .bind(event_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(CertificateRow::into_record).collect()
    }

    async fn mark_issued(&self, event_id: &str, participant_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE generated_certificates
            SET status = $3, updated_at = now()
            WHERE event_id = $1 AND participant_id = $2 AND status = $4
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(CertificateStatus::Issued.as_str())
        .bind(CertificateStatus::Generated.as_str())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
