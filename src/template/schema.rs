use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// Documented bounds for the numeric template fields. Values outside a range are
// clamped to the nearest bound, never rejected.
pub const TITLE_FONT_SIZE_RANGE: (i64, i64) = (32, 96);
pub const SUBTITLE_FONT_SIZE_RANGE: (i64, i64) = (14, 36);
pub const NAME_FONT_SIZE_RANGE: (i64, i64) = (24, 72);
pub const BODY_FONT_SIZE_RANGE: (i64, i64) = (12, 28);
pub const BORDER_WIDTH_RANGE: (i64, i64) = (1, 12);
pub const SECTION_SPACING_RANGE: (i64, i64) = (8, 96);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Serif,
    SansSerif,
    Cursive,
    Monospace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    Elegant,
    Simple,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateType {
    Achievement,
    Participation,
    Completion,
}

impl CertificateType {
    /// Subtitle used when the template's own subtitle is the empty string.
    pub fn default_subtitle(&self) -> &'static str {
        match self {
            CertificateType::Achievement => "PENGHARGAAN",
            CertificateType::Participation => "PARTISIPASI",
            CertificateType::Completion => "PENYELESAIAN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    TopCenter,
    TopRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStyle {
    Classic,
    Modern,
    Formal,
}

/// Template as authored: every field optional. A field that is missing, null,
/// or of the wrong JSON type deserializes to `None` and picks up the schema
/// default during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialTemplate {
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub subtitle: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub presented_text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub body_content: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub footer_text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub signature_text: Option<String>,

    #[serde(deserialize_with = "lenient")]
    pub title_font_size: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub subtitle_font_size: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub name_font_size: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub body_font_size: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub title_font_family: Option<FontFamily>,
    #[serde(deserialize_with = "lenient")]
    pub body_font_family: Option<FontFamily>,

    #[serde(deserialize_with = "lenient")]
    pub background_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub primary_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub accent_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub text_color: Option<String>,

    #[serde(deserialize_with = "lenient")]
    pub border_style: Option<BorderStyle>,
    #[serde(deserialize_with = "lenient")]
    pub border_width: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub corner_ornaments: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub top_flourish: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub bottom_flourish: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub name_underline: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub show_seal: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub header_spacing: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub body_spacing: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub footer_spacing: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub logo_position: Option<LogoPosition>,
    #[serde(deserialize_with = "lenient")]
    pub layout_style: Option<LayoutStyle>,
    #[serde(deserialize_with = "lenient")]
    pub certificate_type: Option<CertificateType>,
}

/// Fully-populated template. Invariant: every field holds a value within its
/// documented range, so no renderer code path ever needs a fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateTemplate {
    pub title: String,
    pub subtitle: String,
    pub presented_text: String,
    pub body_content: String,
    pub footer_text: String,
    pub signature_text: String,

    pub title_font_size: u32,
    pub subtitle_font_size: u32,
    pub name_font_size: u32,
    pub body_font_size: u32,
    pub title_font_family: FontFamily,
    pub body_font_family: FontFamily,

    pub background_color: String,
    pub primary_color: String,
    pub accent_color: String,
    pub text_color: String,

    pub border_style: BorderStyle,
    pub border_width: u32,
    pub corner_ornaments: bool,
    pub top_flourish: bool,
    pub bottom_flourish: bool,
    pub name_underline: bool,
    pub show_seal: bool,

    pub header_spacing: u32,
    pub body_spacing: u32,
    pub footer_spacing: u32,
    pub logo_position: LogoPosition,
    pub layout_style: LayoutStyle,
    pub certificate_type: CertificateType,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            title: "SERTIFIKAT".to_string(),
            // Empty on purpose: the renderer substitutes the certificate-type
            // subtitle when this stays empty.
            subtitle: String::new(),
            presented_text: "Diberikan kepada:".to_string(),
            body_content: "Atas partisipasinya dalam [NAMA_EVENT] yang diselenggarakan pada [TANGGAL_EVENT] di [KOTA_EVENT]."
                .to_string(),
            footer_text: "[KOTA_EVENT], [TANGGAL_TERBIT]".to_string(),
            signature_text: "[PENYELENGGARA]".to_string(),

            title_font_size: 48,
            subtitle_font_size: 20,
            name_font_size: 36,
            body_font_size: 16,
            title_font_family: FontFamily::Serif,
            body_font_family: FontFamily::SansSerif,

            background_color: "#ffffff".to_string(),
            primary_color: "#1e3a5f".to_string(),
            accent_color: "#c9a227".to_string(),
            text_color: "#333333".to_string(),

            border_style: BorderStyle::Elegant,
            border_width: 3,
            corner_ornaments: true,
            top_flourish: false,
            bottom_flourish: false,
            name_underline: true,
            show_seal: false,

            header_spacing: 24,
            body_spacing: 20,
            footer_spacing: 28,
            logo_position: LogoPosition::TopCenter,
            layout_style: LayoutStyle::Classic,
            certificate_type: CertificateType::Participation,
        }
    }
}

impl From<CertificateTemplate> for PartialTemplate {
    fn from(t: CertificateTemplate) -> Self {
        PartialTemplate {
            title: Some(t.title),
            subtitle: Some(t.subtitle),
            presented_text: Some(t.presented_text),
            body_content: Some(t.body_content),
            footer_text: Some(t.footer_text),
            signature_text: Some(t.signature_text),
            title_font_size: Some(t.title_font_size as i64),
            subtitle_font_size: Some(t.subtitle_font_size as i64),
            name_font_size: Some(t.name_font_size as i64),
            body_font_size: Some(t.body_font_size as i64),
            title_font_family: Some(t.title_font_family),
            body_font_family: Some(t.body_font_family),
            background_color: Some(t.background_color),
            primary_color: Some(t.primary_color),
            accent_color: Some(t.accent_color),
            text_color: Some(t.text_color),
            border_style: Some(t.border_style),
            border_width: Some(t.border_width as i64),
            corner_ornaments: Some(t.corner_ornaments),
            top_flourish: Some(t.top_flourish),
            bottom_flourish: Some(t.bottom_flourish),
            name_underline: Some(t.name_underline),
            show_seal: Some(t.show_seal),
            header_spacing: Some(t.header_spacing as i64),
            body_spacing: Some(t.body_spacing as i64),
            footer_spacing: Some(t.footer_spacing as i64),
            logo_position: Some(t.logo_position),
            layout_style: Some(t.layout_style),
            certificate_type: Some(t.certificate_type),
        }
    }
}

/// Fill every missing or invalid field with its schema default and clamp the
/// numeric fields to their documented bounds. Total: any partial template,
/// including the empty one, normalizes to a renderable template. Idempotent:
/// normalizing an already-normalized template changes nothing.
pub fn normalize(raw: PartialTemplate) -> CertificateTemplate {
    let d = CertificateTemplate::default();

    CertificateTemplate {
        title: raw.title.unwrap_or(d.title),
        subtitle: raw.subtitle.unwrap_or(d.subtitle),
        presented_text: raw.presented_text.unwrap_or(d.presented_text),
        body_content: raw.body_content.unwrap_or(d.body_content),
        footer_text: raw.footer_text.unwrap_or(d.footer_text),
        signature_text: raw.signature_text.unwrap_or(d.signature_text),

        title_font_size: clamp_or(raw.title_font_size, TITLE_FONT_SIZE_RANGE, d.title_font_size),
        subtitle_font_size: clamp_or(
            raw.subtitle_font_size,
            SUBTITLE_FONT_SIZE_RANGE,
            d.subtitle_font_size,
        ),
        name_font_size: clamp_or(raw.name_font_size, NAME_FONT_SIZE_RANGE, d.name_font_size),
        body_font_size: clamp_or(raw.body_font_size, BODY_FONT_SIZE_RANGE, d.body_font_size),
        title_font_family: raw.title_font_family.unwrap_or(d.title_font_family),
        body_font_family: raw.body_font_family.unwrap_or(d.body_font_family),

        background_color: color_or(raw.background_color, d.background_color),
        primary_color: color_or(raw.primary_color, d.primary_color),
        accent_color: color_or(raw.accent_color, d.accent_color),
        text_color: color_or(raw.text_color, d.text_color),

        border_style: raw.border_style.unwrap_or(d.border_style),
        border_width: clamp_or(raw.border_width, BORDER_WIDTH_RANGE, d.border_width),
        corner_ornaments: raw.corner_ornaments.unwrap_or(d.corner_ornaments),
        top_flourish: raw.top_flourish.unwrap_or(d.top_flourish),
        bottom_flourish: raw.bottom_flourish.unwrap_or(d.bottom_flourish),
        name_underline: raw.name_underline.unwrap_or(d.name_underline),
        show_seal: raw.show_seal.unwrap_or(d.show_seal),

        header_spacing: clamp_or(raw.header_spacing, SECTION_SPACING_RANGE, d.header_spacing),
        body_spacing: clamp_or(raw.body_spacing, SECTION_SPACING_RANGE, d.body_spacing),
        footer_spacing: clamp_or(raw.footer_spacing, SECTION_SPACING_RANGE, d.footer_spacing),
        logo_position: raw.logo_position.unwrap_or(d.logo_position),
        layout_style: raw.layout_style.unwrap_or(d.layout_style),
        certificate_type: raw.certificate_type.unwrap_or(d.certificate_type),
    }
}

fn clamp_or(value: Option<i64>, (lo, hi): (i64, i64), default: u32) -> u32 {
    match value {
        Some(v) => v.clamp(lo, hi) as u32,
        None => default,
    }
}

/// Accepts `#rgb` and `#rrggbb`. Anything else is a silent fallback to the
/// default, not an error: a template must stay renderable.
fn color_or(value: Option<String>, default: String) -> String {
    match value {
        Some(c) if is_valid_color(&c) => c,
        _ => default,
    }
}

pub fn is_valid_color(value: &str) -> bool {
    static HEX_COLOR: OnceLock<Regex> = OnceLock::new();
    HEX_COLOR
        .get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap())
        .is_match(value)
}

/// Deserialize a field to `None` instead of failing when the JSON value has
/// the wrong type. Normalization then supplies the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_template_normalizes_to_defaults() {
        let t = normalize(PartialTemplate::default());
        assert_eq!(t, CertificateTemplate::default());
    }

    #[test]
    fn every_field_in_range_after_normalize() {
        let raw = PartialTemplate {
            title_font_size: Some(500),
            subtitle_font_size: Some(-3),
            name_font_size: Some(0),
            body_font_size: Some(1000),
            border_width: Some(99),
            header_spacing: Some(1),
            body_spacing: Some(100_000),
            footer_spacing: Some(-40),
            ..Default::default()
        };
        let t = normalize(raw);
        assert_eq!(t.title_font_size, 96);
        assert_eq!(t.subtitle_font_size, 14);
        assert_eq!(t.name_font_size, 24);
        assert_eq!(t.body_font_size, 28);
        assert_eq!(t.border_width, 12);
        assert_eq!(t.header_spacing, 8);
        assert_eq!(t.body_spacing, 96);
        assert_eq!(t.footer_spacing, 8);
    }

    #[test]
    fn title_font_size_clamps_to_upper_bound() {
        let raw = PartialTemplate {
            title_font_size: Some(500),
            ..Default::default()
        };
        assert_eq!(normalize(raw).title_font_size, 96);
    }

    #[test]
    fn invalid_color_falls_back_silently() {
        let raw = PartialTemplate {
            background_color: Some("not-a-color".to_string()),
            primary_color: Some("#12345".to_string()),
            accent_color: Some("#abc".to_string()),
            ..Default::default()
        };
        let t = normalize(raw);
        assert_eq!(t.background_color, "#ffffff");
        assert_eq!(t.primary_color, "#1e3a5f");
        assert_eq!(t.accent_color, "#abc");
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = PartialTemplate {
            title: Some("PIAGAM".to_string()),
            title_font_size: Some(200),
            text_color: Some("zzz".to_string()),
            border_style: Some(BorderStyle::Double),
            ..Default::default()
        };
        let once = normalize(raw);
        let twice = normalize(PartialTemplate::from(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn wrong_json_types_deserialize_as_absent() {
        let raw: PartialTemplate = serde_json::from_value(serde_json::json!({
            "title": 42,
            "titleFontSize": "big",
            "cornerOrnaments": "yes",
            "borderStyle": "ornate"
        }))
        .unwrap();
        assert_eq!(raw.title, None);
        assert_eq!(raw.title_font_size, None);
        assert_eq!(raw.corner_ornaments, None);
        assert_eq!(raw.border_style, None);

        let t = normalize(raw);
        assert_eq!(t.title, "SERTIFIKAT");
        assert_eq!(t.title_font_size, 48);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw: PartialTemplate =
            serde_json::from_value(serde_json::json!({ "watermark": true })).unwrap();
        assert_eq!(raw, PartialTemplate::default());
    }
}
