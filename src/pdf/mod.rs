// Certificate PDF generation
// Uses genpdf with an embedded bold TrueType font; genpdf needs the font file for metrics.
use genpdf::elements::Image;
use genpdf::fonts::{FontData, FontFamily};
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Context, Element, Mm, Position, RenderResult, Scale, Size};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

pub const PAGE_WIDTH_PT: f64 = 842.0;
pub const PAGE_HEIGHT_PT: f64 = 595.0;
pub const NAME_FONT_SIZE: u8 = 28;
/// Distance of the name's baseline above the middle of the page.
pub const NAME_BASELINE_OFFSET_PT: f64 = 10.0;

const MM_PER_PT: f64 = 25.4 / 72.0;
const IMAGE_DPI: f64 = 300.0;

const BOLD_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/LiberationSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
];

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("participant name is empty")]
    EmptyName,
    #[error("no usable bold font: {0}")]
    Font(String),
    #[error("background image could not be decoded: {0}")]
    Image(#[from] image::ImageError),
    #[error("background image has no pixels")]
    EmptyImage,
    #[error("pdf rendering failed: {0}")]
    Render(#[from] genpdf::error::Error),
}

/// Loads the bold face used for the participant name. An explicit path
/// wins; otherwise the usual system locations are searched.
pub fn load_font(configured: Option<&Path>) -> Result<FontFamily<FontData>, CertificateError> {
    let bold = match configured {
        Some(path) => FontData::load(path, None)
            .map_err(|e| CertificateError::Font(format!("{}: {}", path.display(), e)))?,
        None => BOLD_FONT_CANDIDATES
            .iter()
            .filter(|p| Path::new(p).exists())
            .find_map(|p| FontData::load(p, None).ok())
            .ok_or_else(|| {
                CertificateError::Font(
                    "none installed; install fonts-liberation or set CERTIFICATE_FONT".to_string(),
                )
            })?,
    };

    // Only the bold face is ever drawn.
    Ok(FontFamily {
        regular: bold.clone(),
        bold: bold.clone(),
        italic: bold.clone(),
        bold_italic: bold,
    })
}

/// Left edge that centers a run of `text_width` within `available`.
fn centered(available: Mm, text_width: Mm) -> Mm {
    (available - text_width) / 2.0
}

/// Baseline of the name, in points from the bottom edge.
pub fn name_baseline_pt() -> f64 {
    PAGE_HEIGHT_PT / 2.0 + NAME_BASELINE_OFFSET_PT
}

fn pt(value: f64) -> Mm {
    Mm::from(value * MM_PER_PT)
}

/// Background stretched over the whole page with the name drawn on top.
struct CertificatePage {
    background: Image,
    name: String,
}

impl Element for CertificatePage {
    fn render(
        &mut self,
        context: &Context,
        area: Area<'_>,
        style: Style,
    ) -> Result<RenderResult, genpdf::error::Error> {
        self.background.render(context, area.clone(), style)?;

        let name_style = style.bold().with_font_size(NAME_FONT_SIZE);
        let text_width = name_style.str_width(&context.font_cache, &self.name);
        let x = centered(area.size().width, text_width);

        // genpdf puts the baseline one glyph height below the given top, measured from the top edge.
        let baseline_from_top = pt(PAGE_HEIGHT_PT - name_baseline_pt());
        let glyph_height = name_style.font(&context.font_cache).glyph_height(NAME_FONT_SIZE);
        let y = baseline_from_top - glyph_height;

        area.print_str(&context.font_cache, Position::new(x, y), name_style, &self.name)?;

        Ok(RenderResult {
            size: area.size(),
            has_more: false,
        })
    }
}

fn background_image(bytes: &[u8]) -> Result<Image, CertificateError> {
    // genpdf refuses alpha channels, so flatten to RGB first.
    let decoded = image::load_from_memory(bytes)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let (width_px, height_px) = rgb.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(CertificateError::EmptyImage);
    }

    let mm_per_px = 25.4 / IMAGE_DPI;
    let scale = Scale::new(
        PAGE_WIDTH_PT * MM_PER_PT / (f64::from(width_px) * mm_per_px),
        PAGE_HEIGHT_PT * MM_PER_PT / (f64::from(height_px) * mm_per_px),
    );

    Ok(Image::from_dynamic_image(rgb)?
        .with_position(Position::new(0.0, 0.0))
        .with_dpi(IMAGE_DPI)
        .with_scale(scale))
}

pub fn generate_certificate(
    participant_name: &str,
    background: &[u8],
    font: &FontFamily<FontData>,
) -> Result<Vec<u8>, CertificateError> {
    let name = participant_name.trim();
    if name.is_empty() {
        return Err(CertificateError::EmptyName);
    }

    let mut doc = genpdf::Document::new(font.clone());
    doc.set_title(format!("Certificate - {}", name));
    doc.set_paper_size(Size::new(pt(PAGE_WIDTH_PT), pt(PAGE_HEIGHT_PT)));
    doc.push(CertificatePage {
        background: background_image(background)?,
        name: name.to_string(),
    });

    let mut buffer = Vec::new();
    doc.render(&mut buffer)?;
    info!("Rendered certificate for {} ({} bytes)", name, buffer.len());
    Ok(buffer)
}

/// Generation entry point for the submission flow: the cause is logged and
/// the caller only learns that no document was produced.
pub fn render_certificate(
    participant_name: &str,
    background: &[u8],
    font: Option<&FontFamily<FontData>>,
) -> Option<Vec<u8>> {
    let result = match font {
        Some(font) => generate_certificate(participant_name, background, font),
        None => Err(CertificateError::Font("no font loaded".to_string())),
    };
    result
        .map_err(|e| error!("PDF generation failed: {}", e))
        .ok()
}
