use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

pub fn generate_certificate_number() -> String {
    format!(
        "CERT/{}/{}",
        Utc::now().format("%Y%m%d"),
        Uuid::new_v4().to_string()[..8].to_string()
    )
}

/// Stable per-key filename so regeneration overwrites the previous document.
pub fn certificate_filename(event_id: &str, participant_id: &str) -> String {
    format!(
        "{}_{}_certificate.pdf",
        sanitize(event_id),
        sanitize(participant_id)
    )
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

pub fn ensure_dirs(results_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(results_folder)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_stable_and_safe() {
        let a = certificate_filename("ev/1", "p 9");
        let b = certificate_filename("ev/1", "p 9");
        assert_eq!(a, b);
        assert_eq!(a, "ev_1_p_9_certificate.pdf");
    }

    #[test]
    fn certificate_numbers_differ_per_call() {
        assert_ne!(generate_certificate_number(), generate_certificate_number());
    }
}
