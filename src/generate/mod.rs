//! Generation coordinator: single and bulk certificate creation on top of the
//! collaborator ports. Bulk runs fan out with bounded concurrency and fan in
//! to one `BulkResult`; a participant's failure never touches the rest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::GenerateError;
use crate::export::DocumentExporter;
use crate::render::render;
use crate::storage;
use crate::store::{
    CertificateRecord, CertificateRecords, CertificateStatus, EligibleParticipant,
    RegistrationSource, TemplateStore,
};
use crate::template::{normalize, resolve_template, ParticipantBinding};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub participant_id: String,
    pub reason: String,
}

/// Outcome of one bulk run. `generated` counts the participants whose
/// certificate is in state `generated` after this call; a re-run regenerates
/// everything and reports the full count again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
    pub generated: usize,
    pub failed: Vec<BulkFailure>,
}

pub struct Coordinator {
    templates: Arc<dyn TemplateStore>,
    registrations: Arc<dyn RegistrationSource>,
    certificates: Arc<dyn CertificateRecords>,
    exporter: Arc<dyn DocumentExporter>,
    bulk_concurrency: usize,
    // One async mutex per (event_id, participant_id); entries are never
    // reclaimed, they are a few words each.
    key_locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl Coordinator {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        registrations: Arc<dyn RegistrationSource>,
        certificates: Arc<dyn CertificateRecords>,
        exporter: Arc<dyn DocumentExporter>,
        bulk_concurrency: usize,
    ) -> Self {
        Self {
            templates,
            registrations,
            certificates,
            exporter,
            bulk_concurrency: bulk_concurrency.max(1),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, event_id: &str, participant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry((event_id.to_string(), participant_id.to_string()))
            .or_default()
            .clone()
    }

    /// Generate (or regenerate) the certificate for one participant.
    /// Concurrent calls for the same key serialize on a per-key lock;
    /// last writer wins on the persisted record.
    pub async fn generate_one(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<CertificateRecord, GenerateError> {
        let lock = self.key_lock(event_id, participant_id);
        let _guard = lock.lock().await;

        let raw = self
            .templates
            .get_template()
            .await
            .map_err(GenerateError::TemplateStore)?;
        let template = normalize(raw);

        let profile = self
            .registrations
            .eligible_participant(event_id, participant_id)
            .await
            .map_err(GenerateError::Registrations)?
            .ok_or_else(|| GenerateError::NotEligible {
                event_id: event_id.to_string(),
                participant_id: participant_id.to_string(),
            })?;

        let binding = build_binding(profile)?;
        let resolved = resolve_template(&template, &binding);
        let spec = render(&template, &resolved);

        let filename = storage::certificate_filename(event_id, participant_id);
        let handle = self.exporter.export(&spec, &filename).await?;

        let record = CertificateRecord {
            event_id: event_id.to_string(),
            participant_id: participant_id.to_string(),
            participant_name: binding.participant_name.clone(),
            certificate_number: binding.certificate_number.clone(),
            status: CertificateStatus::Generated,
            document_filename: handle.filename,
            generated_at: Utc::now(),
        };
        self.certificates
            .upsert(&record)
            .await
            .map_err(GenerateError::Records)?;

        Ok(record)
    }

    /// Generate certificates for every eligible participant of an event.
    /// Dispatch is bounded by the configured concurrency and stops at the
    /// next iteration once `cancel` fires; in-flight items run to completion
    /// and are still counted.
    pub async fn generate_bulk(
        self: &Arc<Self>,
        event_id: &str,
        cancel: CancellationToken,
    ) -> Result<BulkResult, GenerateError> {
        let participants = self
            .registrations
            .list_eligible(event_id)
            .await
            .map_err(GenerateError::Registrations)?;

        tracing::info!(
            event_id,
            participants = participants.len(),
            "starting bulk generation"
        );

        let semaphore = Arc::new(Semaphore::new(self.bulk_concurrency));
        let mut tasks = JoinSet::new();

        for participant in participants {
            // Waiting for a permit keeps dispatch itself bounded; racing the
            // wait against the token means cancellation cuts off dispatch even
            // while all permits are held by in-flight items.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(event_id, "bulk generation cancelled, not dispatching further");
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let coordinator = Arc::clone(self);
            let event_id = event_id.to_string();
            let participant_id = participant.participant_id.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = coordinator.generate_one(&event_id, &participant_id).await;
                (participant_id, outcome)
            });
        }

        let mut generated = 0usize;
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => generated += 1,
                Ok((participant_id, Err(e))) => {
                    tracing::error!(%participant_id, error = %e, "certificate generation failed");
                    failed.push(BulkFailure {
                        participant_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    failed.push(BulkFailure {
                        participant_id: "<unknown>".to_string(),
                        reason: format!("generation task aborted: {}", e),
                    });
                }
            }
        }

        failed.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));

        tracing::info!(event_id, generated, failed = failed.len(), "bulk generation finished");
        Ok(BulkResult { generated, failed })
    }
}

/// Turn a raw registration row into a complete binding, rejecting the
/// participant if any required value is missing or blank. A certificate is
/// never rendered with silently empty fields.
fn build_binding(profile: EligibleParticipant) -> Result<ParticipantBinding, GenerateError> {
    fn required(
        value: Option<String>,
        field: &'static str,
    ) -> Result<String, GenerateError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(GenerateError::MissingBinding { field }),
        }
    }

    Ok(ParticipantBinding {
        participant_name: required(profile.full_name, "full name")?,
        participant_email: required(profile.email, "email")?,
        event_title: required(profile.event_title, "event title")?,
        event_date: profile
            .event_date
            .ok_or(GenerateError::MissingBinding { field: "event date" })?,
        event_city: required(profile.event_city, "event city")?,
        organizer_name: required(profile.organizer_name, "organizer name")?,
        certificate_number: storage::generate_certificate_number(),
        issued_on: Utc::now().date_naive(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExportError, StoreError};
    use crate::export::DocumentHandle;
    use crate::render::RenderSpec;
    use crate::template::PartialTemplate;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    struct FakeTemplates;

    #[async_trait]
    impl TemplateStore for FakeTemplates {
        async fn get_template(&self) -> Result<PartialTemplate, StoreError> {
            Ok(PartialTemplate::default())
        }

        async fn put_template(&self, _template: &PartialTemplate) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct FakeRegistrations {
        rows: Vec<EligibleParticipant>,
    }

    #[async_trait]
    impl RegistrationSource for FakeRegistrations {
        async fn list_eligible(
            &self,
            _event_id: &str,
        ) -> Result<Vec<EligibleParticipant>, StoreError> {
            Ok(self.rows.clone())
        }

        async fn eligible_participant(
            &self,
            _event_id: &str,
            participant_id: &str,
        ) -> Result<Option<EligibleParticipant>, StoreError> {
            Ok(self
                .rows
                .iter()
                .find(|p| p.participant_id == participant_id)
                .cloned())
        }
    }

    #[derive(Default)]
    struct MemoryRecords {
        map: Mutex<HashMap<(String, String), CertificateRecord>>,
    }

    #[async_trait]
    impl CertificateRecords for MemoryRecords {
        async fn upsert(&self, record: &CertificateRecord) -> Result<(), StoreError> {
            self.map.lock().unwrap().insert(
                (record.event_id.clone(), record.participant_id.clone()),
                record.clone(),
            );
            Ok(())
        }

        async fn get(
            &self,
            event_id: &str,
            participant_id: &str,
        ) -> Result<Option<CertificateRecord>, StoreError> {
            Ok(self
                .map
                .lock()
                .unwrap()
                .get(&(event_id.to_string(), participant_id.to_string()))
                .cloned())
        }

        async fn list_by_event(
            &self,
            event_id: &str,
        ) -> Result<Vec<CertificateRecord>, StoreError> {
            Ok(self
                .map
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.event_id == event_id)
                .cloned()
                .collect())
        }

        async fn mark_issued(
            &self,
            event_id: &str,
            participant_id: &str,
        ) -> Result<bool, StoreError> {
            let mut map = self.map.lock().unwrap();
            match map.get_mut(&(event_id.to_string(), participant_id.to_string())) {
                Some(r) if r.status == CertificateStatus::Generated => {
                    r.status = CertificateStatus::Issued;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    #[derive(Default)]
    struct FakeExporter {
        fail_filenames: HashSet<String>,
    }

    #[async_trait]
    impl DocumentExporter for FakeExporter {
        async fn export(
            &self,
            _spec: &RenderSpec,
            filename: &str,
        ) -> Result<DocumentHandle, ExportError> {
            if self.fail_filenames.contains(filename) {
                return Err(ExportError("export collaborator unavailable".to_string()));
            }
            Ok(DocumentHandle {
                filename: filename.to_string(),
                path: std::path::PathBuf::from(filename),
            })
        }
    }

    fn participant(id: &str) -> EligibleParticipant {
        EligibleParticipant {
            participant_id: id.to_string(),
            full_name: Some(format!("Peserta {}", id)),
            email: Some(format!("{}@example.com", id)),
            event_title: Some("Tech Summit".to_string()),
            event_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            event_city: Some("Jakarta".to_string()),
            organizer_name: Some("Komunitas Dev".to_string()),
        }
    }

    fn coordinator(
        rows: Vec<EligibleParticipant>,
        records: Arc<MemoryRecords>,
        exporter: FakeExporter,
    ) -> Arc<Coordinator> {
        Arc::new(Coordinator::new(
            Arc::new(FakeTemplates),
            Arc::new(FakeRegistrations { rows }),
            records,
            Arc::new(exporter),
            4,
        ))
    }

    #[tokio::test]
    async fn generate_one_creates_a_generated_record() {
        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(vec![participant("p1")], records.clone(), FakeExporter::default());

        let record = coord.generate_one("ev1", "p1").await.unwrap();
        assert_eq!(record.status, CertificateStatus::Generated);
        assert_eq!(record.participant_name, "Peserta p1");
        assert!(records.get("ev1", "p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn generate_one_rejects_unknown_participant() {
        let coord = coordinator(
            vec![participant("p1")],
            Arc::new(MemoryRecords::default()),
            FakeExporter::default(),
        );
        let err = coord.generate_one("ev1", "ghost").await.unwrap_err();
        assert!(matches!(err, GenerateError::NotEligible { .. }));
    }

    #[tokio::test]
    async fn bulk_isolates_a_participant_with_missing_binding_data() {
        let mut rows: Vec<_> = (1..=9).map(|i| participant(&format!("p{:02}", i))).collect();
        let mut broken = participant("p10");
        broken.event_date = None;
        rows.push(broken);

        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(rows, records.clone(), FakeExporter::default());

        let result = coord
            .generate_bulk("ev1", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.generated, 9);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].participant_id, "p10");
        assert!(result.failed[0].reason.contains("event date"));
        assert_eq!(records.list_by_event("ev1").await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn bulk_isolates_export_failures() {
        let rows: Vec<_> = (1..=5).map(|i| participant(&format!("p{:02}", i))).collect();
        let mut exporter = FakeExporter::default();
        exporter
            .fail_filenames
            .insert(storage::certificate_filename("ev1", "p03"));

        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(rows, records.clone(), exporter);

        let result = coord
            .generate_bulk("ev1", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.generated, 4);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].participant_id, "p03");
        assert!(records.get("ev1", "p03").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bulk_rerun_regenerates_and_reports_full_count() {
        let rows: Vec<_> = (1..=6).map(|i| participant(&format!("p{:02}", i))).collect();
        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(rows, records.clone(), FakeExporter::default());

        let first = coord
            .generate_bulk("ev1", CancellationToken::new())
            .await
            .unwrap();
        let second = coord
            .generate_bulk("ev1", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(first.generated, 6);
        assert_eq!(second.generated, 6);
        assert_eq!(records.list_by_event("ev1").await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn same_key_stays_unique_under_concurrent_generation() {
        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(vec![participant("p1")], records.clone(), FakeExporter::default());

        let a = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.generate_one("ev1", "p1").await })
        };
        let b = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.generate_one("ev1", "p1").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(records.list_by_event("ev1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_dispatch_before_it_starts() {
        let rows: Vec<_> = (1..=20).map(|i| participant(&format!("p{:02}", i))).collect();
        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(rows, records.clone(), FakeExporter::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = coord.generate_bulk("ev1", cancel).await.unwrap();

        assert_eq!(result.generated, 0);
        assert!(result.failed.is_empty());
        assert!(records.list_by_event("ev1").await.unwrap().is_empty());
    }

    struct CancellingExporter {
        cancel: CancellationToken,
    }

    #[async_trait]
    impl DocumentExporter for CancellingExporter {
        async fn export(
            &self,
            _spec: &RenderSpec,
            filename: &str,
        ) -> Result<DocumentHandle, ExportError> {
            self.cancel.cancel();
            Ok(DocumentHandle {
                filename: filename.to_string(),
                path: std::path::PathBuf::from(filename),
            })
        }
    }

    #[tokio::test]
    async fn cancellation_mid_run_finishes_in_flight_and_stops_dispatch() {
        let rows: Vec<_> = (1..=5).map(|i| participant(&format!("p{:02}", i))).collect();
        let records = Arc::new(MemoryRecords::default());
        let cancel = CancellationToken::new();
        // Concurrency 1: the first participant holds the only permit while
        // its export fires the token, so dispatch must stop right after it.
        let coord = Arc::new(Coordinator::new(
            Arc::new(FakeTemplates),
            Arc::new(FakeRegistrations { rows }),
            records.clone(),
            Arc::new(CancellingExporter {
                cancel: cancel.clone(),
            }),
            1,
        ));

        let result = coord.generate_bulk("ev1", cancel).await.unwrap();

        assert_eq!(result.generated, 1);
        assert!(result.failed.is_empty());
        assert_eq!(records.list_by_event("ev1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn issued_transition_only_applies_to_generated_records() {
        let records = Arc::new(MemoryRecords::default());
        let coord = coordinator(vec![participant("p1")], records.clone(), FakeExporter::default());

        assert!(!records.mark_issued("ev1", "p1").await.unwrap());
        coord.generate_one("ev1", "p1").await.unwrap();
        assert!(records.mark_issued("ev1", "p1").await.unwrap());
        // Already issued: no second transition.
        assert!(!records.mark_issued("ev1", "p1").await.unwrap());
    }
}
