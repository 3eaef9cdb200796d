use thiserror::Error;

/// Failure of one collaborator call (template store, registration source,
/// certificate records). Backend-agnostic so ports stay object-safe.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError(e.to_string())
    }
}

#[derive(Debug, Error)]
#[error("export failed: {0}")]
pub struct ExportError(pub String);

/// Everything that can go wrong while generating one certificate. In a bulk
/// run each of these stays scoped to its participant.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("template store: {0}")]
    TemplateStore(StoreError),

    #[error("participant {participant_id} is not eligible for event {event_id}")]
    NotEligible {
        event_id: String,
        participant_id: String,
    },

    #[error("participant data is missing {field}")]
    MissingBinding { field: &'static str },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("certificate record store: {0}")]
    Records(StoreError),

    #[error("registration source: {0}")]
    Registrations(StoreError),
}
