//! Ports for the external collaborators this engine consumes. Production
//! adapters live in `db` (Postgres) and `export` (PDF); tests plug in
//! in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::template::PartialTemplate;

/// Raw per-participant data handed over by the registration collaborator.
/// Fields are optional because the source may hold incomplete records; the
/// coordinator rejects incomplete ones per participant, never renders blanks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibleParticipant {
    pub participant_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub event_title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_city: Option<String>,
    pub organizer_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Generated,
    Issued,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Generated => "generated",
            CertificateStatus::Issued => "issued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generated" => Some(CertificateStatus::Generated),
            "issued" => Some(CertificateStatus::Issued),
            _ => None,
        }
    }
}

/// One generated certificate. At most one exists per
/// `(event_id, participant_id)`; regeneration overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub event_id: String,
    pub participant_id: String,
    pub participant_name: String,
    pub certificate_number: String,
    pub status: CertificateStatus,
    pub document_filename: String,
    pub generated_at: DateTime<Utc>,
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self) -> Result<PartialTemplate, StoreError>;
    async fn put_template(&self, template: &PartialTemplate) -> Result<(), StoreError>;
}

/// Registration collaborator: the single authority on eligibility. The
/// coordinator never second-guesses what it returns.
#[async_trait]
pub trait RegistrationSource: Send + Sync {
    async fn list_eligible(&self, event_id: &str) -> Result<Vec<EligibleParticipant>, StoreError>;

    async fn eligible_participant(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<Option<EligibleParticipant>, StoreError>;
}

#[async_trait]
pub trait CertificateRecords: Send + Sync {
    /// Insert or overwrite the record for the record's key.
    async fn upsert(&self, record: &CertificateRecord) -> Result<(), StoreError>;

    async fn get(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<Option<CertificateRecord>, StoreError>;

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<CertificateRecord>, StoreError>;

    /// `generated -> issued`; returns false when no record exists.
    async fn mark_issued(&self, event_id: &str, participant_id: &str) -> Result<bool, StoreError>;
}
