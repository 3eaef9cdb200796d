// PDF export adapter for RenderSpec documents.
// Uses genpdf - requires Liberation or similar fonts in standard paths.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use genpdf::Element as _;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::render::{Align, Decoration, RenderSpec};
use crate::template::FontFamily;

/// Handle to an exported document, as stored alongside the certificate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub filename: String,
    pub path: PathBuf,
}

/// Document export collaborator. Treated as unreliable: every call may fail
/// and the failure stays scoped to the certificate being exported.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    async fn export(&self, spec: &RenderSpec, filename: &str)
        -> Result<DocumentHandle, ExportError>;
}

pub struct PdfExporter {
    results_folder: PathBuf,
}

impl PdfExporter {
    pub fn new(results_folder: PathBuf) -> Self {
        Self { results_folder }
    }
}

#[async_trait]
impl DocumentExporter for PdfExporter {
    async fn export(
        &self,
        spec: &RenderSpec,
        filename: &str,
    ) -> Result<DocumentHandle, ExportError> {
        let path = self.results_folder.join(filename);
        let spec = spec.clone();
        let out = path.clone();
        tokio::task::spawn_blocking(move || write_pdf(&spec, &out))
            .await
            .map_err(|e| ExportError(e.to_string()))??;

        Ok(DocumentHandle {
            filename: filename.to_string(),
            path,
        })
    }
}

// A4 landscape in millimeters; the spec is scaled down to this width so every
// position keeps its proportion from the preview.
const PAGE_WIDTH_MM: f64 = 297.0;
const PAGE_HEIGHT_MM: f64 = 210.0;
const PAGE_MARGIN_MM: f64 = 15.0;
const PT_PER_MM: f64 = 72.0 / 25.4;

fn write_pdf(spec: &RenderSpec, output_path: &Path) -> Result<(), ExportError> {
    // Try common font paths - genpdf needs actual font files for metrics
    let font_paths = [
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
    ];

    let font_dir = font_paths
        .iter()
        .find(|p| Path::new(p).exists())
        .ok_or_else(|| {
            ExportError("No suitable fonts found. Install: apt install fonts-liberation".to_string())
        })?;

    let default_family = load_family(font_dir, &["LiberationSerif", "DejaVuSerif", "LiberationSans", "DejaVuSans"])
        .ok_or_else(|| ExportError(format!("No usable font family under {}", font_dir)))?;

    let mut doc = genpdf::Document::new(default_family);
    doc.set_title("Sertifikat");
    doc.set_paper_size(genpdf::Size::new(PAGE_WIDTH_MM, PAGE_HEIGHT_MM));

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    let sans = load_family(font_dir, &["LiberationSans", "DejaVuSans"])
        .map(|f| doc.add_font_family(f));
    let mono = load_family(font_dir, &["LiberationMono", "DejaVuSansMono"])
        .map(|f| doc.add_font_family(f));

    // Work in page millimeters so vertical gaps from the spec survive.
    let spec_mm = spec.scaled(PAGE_WIDTH_MM);

    let mut layout = genpdf::elements::LinearLayout::vertical();
    let mut cursor_mm = PAGE_MARGIN_MM;

    for region in &spec_mm.regions {
        let gap_mm = (region.rect.y - cursor_mm).max(0.0);
        if gap_mm > 1.0 {
            layout.push(genpdf::elements::Break::new(gap_mm / 5.0));
        }

        let mut style = genpdf::style::Style::new()
            .with_font_size((region.font_size * PT_PER_MM).round().max(6.0) as u8);
        if let Some((r, g, b)) = parse_hex_color(&region.color) {
            style.set_color(genpdf::style::Color::Rgb(r, g, b));
        }
        let family = match region.font_family {
            FontFamily::SansSerif => sans.clone(),
            FontFamily::Monospace => mono.clone(),
            // No cursive face ships in the standard paths; the serif default
            // stands in for it.
            FontFamily::Serif | FontFamily::Cursive => None,
        };
        if let Some(handle) = family {
            style.set_font_family(handle);
        }

        let alignment = match region.align {
            Align::Left => genpdf::Alignment::Left,
            Align::Center => genpdf::Alignment::Center,
            Align::Right => genpdf::Alignment::Right,
        };

        layout.push(
            genpdf::elements::Paragraph::new(&region.text)
                .aligned(alignment)
                .styled(style),
        );

        cursor_mm = region.rect.y + region.rect.height;
    }

    let has_frame = spec_mm
        .decorations
        .iter()
        .any(|d| matches!(d, Decoration::Frame { .. }));
    if has_frame {
        doc.push(genpdf::elements::FramedElement::new(layout));
    } else {
        doc.push(layout);
    }

    doc.render_to_file(output_path)
        .map_err(|e| ExportError(e.to_string()))
}

fn load_family(
    dir: &str,
    candidates: &[&str],
) -> Option<genpdf::fonts::FontFamily<genpdf::fonts::FontData>> {
    candidates
        .iter()
        .find_map(|name| genpdf::fonts::from_files(dir, name, None).ok())
}

fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    match hex.len() {
        3 => {
            let mut c = hex.chars();
            let (r, g, b) = (c.next()?, c.next()?, c.next()?);
            let channel = |ch: char| {
                ch.to_digit(16).map(|d| {
                    let d = d as u8;
                    d << 4 | d
                })
            };
            Some((channel(r)?, channel(g)?, channel(b)?))
        }
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;
    use crate::template::{normalize, resolve_template, ParticipantBinding, PartialTemplate};

    #[tokio::test]
    async fn exports_a_pdf_into_the_results_folder() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = PdfExporter::new(dir.path().to_path_buf());

        let template = normalize(PartialTemplate::default());
        let text = resolve_template(&template, &ParticipantBinding::sample());
        let spec = render(&template, &text);

        match exporter.export(&spec, "ev1_p1_certificate.pdf").await {
            Ok(handle) => {
                assert_eq!(handle.filename, "ev1_p1_certificate.pdf");
                assert!(handle.path.exists());
            }
            // Hosts without the Liberation/DejaVu fonts cannot render PDFs;
            // the exporter reports that instead of panicking.
            Err(e) => assert!(e.to_string().contains("font")),
        }
    }

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(parse_hex_color("#1e3a5f"), Some((0x1e, 0x3a, 0x5f)));
        assert_eq!(parse_hex_color("#abc"), Some((0xaa, 0xbb, 0xcc)));
        assert_eq!(parse_hex_color("blue"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }
}
