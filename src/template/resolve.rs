use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::CertificateTemplate;

/// The concrete per-participant values placeholders resolve against. Built
/// once per participant by the coordinator; never mutated by resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantBinding {
    pub participant_name: String,
    pub participant_email: String,
    pub event_title: String,
    pub event_date: NaiveDate,
    pub event_city: String,
    pub organizer_name: String,
    pub certificate_number: String,
    pub issued_on: NaiveDate,
}

impl ParticipantBinding {
    /// Placeholder values for live preview, where no real participant exists.
    pub fn sample() -> Self {
        ParticipantBinding {
            participant_name: "Nama Peserta".to_string(),
            participant_email: "peserta@contoh.id".to_string(),
            event_title: "Nama Event".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap_or_default(),
            event_city: "Jakarta".to_string(),
            organizer_name: "Penyelenggara".to_string(),
            certificate_number: "CERT/20250110/contoh01".to_string(),
            issued_on: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap_or_default(),
        }
    }
}

/// All template text fields after placeholder resolution, ready for layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedText {
    pub title: String,
    pub subtitle: String,
    pub presented_line: String,
    pub participant_name: String,
    pub body: String,
    pub footer: String,
    pub signature: String,
}

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// "2025-01-10" renders as "10 Januari 2025".
pub fn format_date_id(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_ID[date.month0() as usize],
        date.year()
    )
}

/// Replace every recognized `[TOKEN]` in `text` with its bound value in a
/// single left-to-right pass. Unrecognized bracketed tokens stay verbatim so a
/// template author sees the typo instead of losing content. Pure and total:
/// never fails, never touches the binding.
pub fn resolve(text: &str, binding: &ParticipantBinding) -> String {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let token = TOKEN.get_or_init(|| Regex::new(r"\[([A-Z_]+)\]").unwrap());

    token
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "NAMA_PESERTA" => binding.participant_name.clone(),
            "EMAIL_PESERTA" => binding.participant_email.clone(),
            "NAMA_EVENT" => binding.event_title.clone(),
            "TANGGAL_EVENT" => format_date_id(binding.event_date),
            "TANGGAL_TERBIT" => format_date_id(binding.issued_on),
            "KOTA_EVENT" => binding.event_city.clone(),
            "NOMOR_SERTIFIKAT" => binding.certificate_number.clone(),
            "PENYELENGGARA" => binding.organizer_name.clone(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// Resolve every text field of a normalized template for one participant.
/// The certificate-type subtitle applies here, only when the template's own
/// subtitle is empty; this is the single place certificate type reaches text.
pub fn resolve_template(template: &CertificateTemplate, binding: &ParticipantBinding) -> ResolvedText {
    let subtitle = if template.subtitle.is_empty() {
        template.certificate_type.default_subtitle().to_string()
    } else {
        resolve(&template.subtitle, binding)
    };

    ResolvedText {
        title: resolve(&template.title, binding),
        subtitle,
        presented_line: resolve(&template.presented_text, binding),
        participant_name: binding.participant_name.clone(),
        body: resolve(&template.body_content, binding),
        footer: resolve(&template.footer_text, binding),
        signature: resolve(&template.signature_text, binding),
    }
}
