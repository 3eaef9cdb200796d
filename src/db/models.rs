use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StoreError;
use crate::store::{CertificateRecord, CertificateStatus, EligibleParticipant};

#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct CertificateRow {
    pub id: i32,
    pub event_id: String,
    pub participant_id: String,
    pub participant_name: String,
    pub certificate_number: String,
    pub status: String,
    pub document_filename: String,
    pub generated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateRow {
    pub fn into_record(self) -> Result<CertificateRecord, StoreError> {
        let status = CertificateStatus::parse(&self.status)
            .ok_or_else(|| StoreError(format!("unknown certificate status '{}'", self.status)))?;
        Ok(CertificateRecord {
            event_id: self.event_id,
            participant_id: self.participant_id,
            participant_name: self.participant_name,
            certificate_number: self.certificate_number,
            status,
            document_filename: self.document_filename,
            generated_at: self.generated_at,
        })
    }
}

/// Flattened view of the registration collaborator's data. Binding columns
/// are nullable: an incomplete row surfaces later as a per-participant
/// failure, not as a query error.
#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub id: i32,
    pub event_id: String,
    pub participant_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub event_title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_city: Option<String>,
    pub organizer_name: Option<String>,
    pub status: String,
}

impl RegistrationRow {
    pub fn into_participant(self) -> EligibleParticipant {
        EligibleParticipant {
            participant_id: self.participant_id,
            full_name: self.full_name,
            email: self.email,
            event_title: self.event_title,
            event_date: self.event_date,
            event_city: self.event_city,
            organizer_name: self.organizer_name,
        }
    }
}
