use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::io::Write;

use crate::state::AppState;

pub async fn download_certificate(
    State(state): State<AppState>,
    Path((event_id, participant_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let record = match state.certificates.get(&event_id, &participant_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return not_found("no certificate for this participant"),
        Err(_) => return not_found("certificate lookup failed"),
    };

    let cert_path = state.config.results_folder.join(&record.document_filename);
    if !cert_path.exists() {
        return not_found("certificate document is missing");
    }

    let content = match std::fs::read(&cert_path) {
        Ok(c) => c,
        Err(_) => return not_found("certificate document is unreadable"),
    };

    let mime = mime_guess::from_path(&record.document_filename)
        .first_raw()
        .unwrap_or("application/pdf");
    let download_name = format!(
        "{}_Sertifikat.pdf",
        record.participant_name.replace(' ', "_")
    );

    axum::response::Response::builder()
        .header("Content-Type", mime)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(axum::body::Body::from(content))
        .unwrap()
        .into_response()
}

pub async fn download_all(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> impl IntoResponse {
    let records = match state.certificates.list_by_event(&event_id).await {
        Ok(r) if !r.is_empty() => r,
        Ok(_) => return not_found("no certificates generated for this event"),
        Err(_) => return not_found("certificate lookup failed"),
    };

    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);

        for record in &records {
            let cert_path = state.config.results_folder.join(&record.document_filename);
            if cert_path.exists() {
                if let Ok(content) = std::fs::read(&cert_path) {
                    let _ = zip.start_file(&record.document_filename, options);
                    let _ = zip.write_all(&content);
                }
            }
        }

        let _ = zip.finish();
    }

    let download_name = format!("{}_Sertifikat.zip", event_id.replace(' ', "_"));

    axum::response::Response::builder()
        .header("Content-Type", "application/zip")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(axum::body::Body::from(zip_data))
        .unwrap()
        .into_response()
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}
