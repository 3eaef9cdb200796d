//! Layout renderer: normalized template + resolved text in, declarative
//! `RenderSpec` out. The preview surface and the document exporter both
//! consume the same spec and only ever scale it uniformly, which is what
//! keeps preview and export visually identical.

use serde::{Deserialize, Serialize};

use crate::template::{BorderStyle, CertificateTemplate, FontFamily, LayoutStyle, LogoPosition, ResolvedText};

/// Canonical canvas: A4 landscape ratio (1.4142:1) at 4 px/mm. All positions
/// and sizes in a `RenderSpec` are absolute pixels at this width.
pub const REFERENCE_WIDTH: f64 = 1188.0;
pub const REFERENCE_HEIGHT: f64 = 840.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    Title,
    Subtitle,
    PresentedLine,
    Name,
    Body,
    Footer,
    Signature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub kind: RegionKind,
    pub text: String,
    pub rect: Rect,
    pub font_size: f64,
    pub font_family: FontFamily,
    pub color: String,
    pub align: Align,
    pub underline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Decoration {
    /// Rectangular frame inset from the canvas edge on all sides.
    Frame { inset: f64, stroke_width: f64, color: String },
    CornerOrnament { corner: Corner, size: f64, color: String },
    /// Horizontal ornamental rule centered at `y`.
    Flourish { y: f64, width: f64, color: String },
    Seal { cx: f64, cy: f64, radius: f64, color: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoSlot {
    pub position: LogoPosition,
    pub rect: Rect,
}

/// Declarative description of one certificate's final visual layout.
/// Decorations draw first (back to front), then text regions in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub width: f64,
    pub height: f64,
    pub background_color: String,
    pub logo: LogoSlot,
    pub decorations: Vec<Decoration>,
    pub regions: Vec<TextRegion>,
}

impl RenderSpec {
    /// Uniformly scale the whole spec so it fills `target_width`. This is the
    /// only transform consumers are allowed to apply.
    pub fn scaled(&self, target_width: f64) -> RenderSpec {
        let s = target_width / self.width;
        let rect = |r: &Rect| Rect {
            x: r.x * s,
            y: r.y * s,
            width: r.width * s,
            height: r.height * s,
        };
        RenderSpec {
            width: self.width * s,
            height: self.height * s,
            background_color: self.background_color.clone(),
            logo: LogoSlot {
                position: self.logo.position,
                rect: rect(&self.logo.rect),
            },
            decorations: self
                .decorations
                .iter()
                .map(|d| match d {
                    Decoration::Frame { inset, stroke_width, color } => Decoration::Frame {
                        inset: inset * s,
                        stroke_width: stroke_width * s,
                        color: color.clone(),
                    },
                    Decoration::CornerOrnament { corner, size, color } => Decoration::CornerOrnament {
                        corner: *corner,
                        size: size * s,
                        color: color.clone(),
                    },
                    Decoration::Flourish { y, width, color } => Decoration::Flourish {
                        y: y * s,
                        width: width * s,
                        color: color.clone(),
                    },
                    Decoration::Seal { cx, cy, radius, color } => Decoration::Seal {
                        cx: cx * s,
                        cy: cy * s,
                        radius: radius * s,
                        color: color.clone(),
                    },
                })
                .collect(),
            regions: self
                .regions
                .iter()
                .map(|r| TextRegion {
                    kind: r.kind,
                    text: r.text.clone(),
                    rect: rect(&r.rect),
                    font_size: r.font_size * s,
                    font_family: r.font_family,
                    color: r.color.clone(),
                    align: r.align,
                    underline: r.underline,
                })
                .collect(),
        }
    }
}

// Layout constants at reference size. Line height is 1.35x the font size.
const LINE_HEIGHT: f64 = 1.35;
const FRAME_INSET: f64 = 24.0;
const INNER_FRAME_INSET: f64 = 36.0;
const LOGO_BAND_TOP: f64 = 56.0;
const LOGO_SIZE: f64 = 72.0;
const ORNAMENT_SIZE: f64 = 48.0;
const FLOURISH_WIDTH: f64 = 320.0;
const SEAL_RADIUS: f64 = 56.0;

fn content_margin(style: LayoutStyle) -> f64 {
    match style {
        LayoutStyle::Classic => 120.0,
        LayoutStyle::Modern => 96.0,
        LayoutStyle::Formal => 150.0,
    }
}

fn text_align(style: LayoutStyle) -> Align {
    match style {
        LayoutStyle::Modern => Align::Left,
        LayoutStyle::Classic | LayoutStyle::Formal => Align::Center,
    }
}

/// Pure layout: every size, color and spacing comes straight from the
/// normalized template, so identical inputs always produce an identical spec.
pub fn render(template: &CertificateTemplate, text: &ResolvedText) -> RenderSpec {
    let margin = content_margin(template.layout_style);
    let align = text_align(template.layout_style);
    let content_width = REFERENCE_WIDTH - 2.0 * margin;

    let mut decorations = Vec::new();

    let border_width = template.border_width as f64;
    match template.border_style {
        BorderStyle::Elegant => {
            decorations.push(Decoration::Frame {
                inset: FRAME_INSET,
                stroke_width: border_width,
                color: template.primary_color.clone(),
            });
            decorations.push(Decoration::Frame {
                inset: INNER_FRAME_INSET,
                stroke_width: 1.0,
                color: template.accent_color.clone(),
            });
        }
        BorderStyle::Simple => {
            decorations.push(Decoration::Frame {
                inset: FRAME_INSET,
                stroke_width: border_width,
                color: template.primary_color.clone(),
            });
        }
        BorderStyle::Double => {
            decorations.push(Decoration::Frame {
                inset: FRAME_INSET,
                stroke_width: border_width,
                color: template.primary_color.clone(),
            });
            decorations.push(Decoration::Frame {
                inset: FRAME_INSET + 8.0,
                stroke_width: border_width,
                color: template.primary_color.clone(),
            });
        }
    }

    // The elegant style carries ornaments by itself; the toggle adds them to
    // any style. Never emitted twice.
    if template.border_style == BorderStyle::Elegant || template.corner_ornaments {
        for corner in [
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomLeft,
            Corner::BottomRight,
        ] {
            decorations.push(Decoration::CornerOrnament {
                corner,
                size: ORNAMENT_SIZE,
                color: template.accent_color.clone(),
            });
        }
    }

    let logo_rect = Rect {
        x: match template.logo_position {
            LogoPosition::TopLeft => margin,
            LogoPosition::TopCenter => (REFERENCE_WIDTH - LOGO_SIZE) / 2.0,
            LogoPosition::TopRight => REFERENCE_WIDTH - margin - LOGO_SIZE,
        },
        y: LOGO_BAND_TOP,
        width: LOGO_SIZE,
        height: LOGO_SIZE,
    };

    let header_spacing = template.header_spacing as f64;
    let body_spacing = template.body_spacing as f64;
    let footer_spacing = template.footer_spacing as f64;

    let mut regions = Vec::new();
    let mut y = LOGO_BAND_TOP + LOGO_SIZE + header_spacing;

    if template.top_flourish {
        decorations.push(Decoration::Flourish {
            y,
            width: FLOURISH_WIDTH,
            color: template.accent_color.clone(),
        });
        y += header_spacing;
    }

    let push = |regions: &mut Vec<TextRegion>,
                    y: &mut f64,
                    kind: RegionKind,
                    text: &str,
                    font_size: u32,
                    font_family: FontFamily,
                    color: &str,
                    underline: bool,
                    spacing_after: f64| {
        let font_size = font_size as f64;
        let height = font_size * LINE_HEIGHT;
        regions.push(TextRegion {
            kind,
            text: text.to_string(),
            rect: Rect {
                x: margin,
                y: *y,
                width: content_width,
                height,
            },
            font_size,
            font_family,
            color: color.to_string(),
            align,
            underline,
        });
        *y += height + spacing_after;
    };

    push(
        &mut regions,
        &mut y,
        RegionKind::Title,
        &text.title,
        template.title_font_size,
        template.title_font_family,
        &template.primary_color,
        false,
        8.0,
    );
    push(
        &mut regions,
        &mut y,
        RegionKind::Subtitle,
        &text.subtitle,
        template.subtitle_font_size,
        template.title_font_family,
        &template.accent_color,
        false,
        header_spacing,
    );
    push(
        &mut regions,
        &mut y,
        RegionKind::PresentedLine,
        &text.presented_line,
        template.body_font_size,
        template.body_font_family,
        &template.text_color,
        false,
        body_spacing / 2.0,
    );
    push(
        &mut regions,
        &mut y,
        RegionKind::Name,
        &text.participant_name,
        template.name_font_size,
        template.title_font_family,
        &template.primary_color,
        template.name_underline,
        body_spacing,
    );
    // Body gets two text lines of room; long content wraps inside its rect.
    let body_height = template.body_font_size as f64 * LINE_HEIGHT * 2.0;
    regions.push(TextRegion {
        kind: RegionKind::Body,
        text: text.body.clone(),
        rect: Rect {
            x: margin,
            y,
            width: content_width,
            height: body_height,
        },
        font_size: template.body_font_size as f64,
        font_family: template.body_font_family,
        color: template.text_color.clone(),
        align,
        underline: false,
    });
    y += body_height + footer_spacing;

    if template.bottom_flourish {
        decorations.push(Decoration::Flourish {
            y,
            width: FLOURISH_WIDTH,
            color: template.accent_color.clone(),
        });
        y += footer_spacing;
    }

    push(
        &mut regions,
        &mut y,
        RegionKind::Footer,
        &text.footer,
        template.body_font_size,
        template.body_font_family,
        &template.text_color,
        false,
        footer_spacing,
    );

    // Signature block sits on the lower right regardless of layout alignment.
    let signature_width = 320.0;
    regions.push(TextRegion {
        kind: RegionKind::Signature,
        text: text.signature.clone(),
        rect: Rect {
            x: REFERENCE_WIDTH - margin - signature_width,
            y,
            width: signature_width,
            height: template.body_font_size as f64 * LINE_HEIGHT,
        },
        font_size: template.body_font_size as f64,
        font_family: template.body_font_family,
        color: template.text_color.clone(),
        align: Align::Center,
        underline: false,
    });

    if template.show_seal {
        decorations.push(Decoration::Seal {
            cx: REFERENCE_WIDTH - margin - SEAL_RADIUS,
            cy: REFERENCE_HEIGHT - margin - SEAL_RADIUS,
            radius: SEAL_RADIUS,
            color: template.accent_color.clone(),
        });
    }

    RenderSpec {
        width: REFERENCE_WIDTH,
        height: REFERENCE_HEIGHT,
        background_color: template.background_color.clone(),
        logo: LogoSlot {
            position: template.logo_position,
            rect: logo_rect,
        },
        decorations,
        regions,
    }
}
