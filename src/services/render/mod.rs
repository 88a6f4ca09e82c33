use crate::{FactsheetError, FundRecord, Result, WarningKind};
use printpdf::image_crate::{self, DynamicImage, ImageFormat};

pub mod html;
pub mod pdf;

pub use html::*;
pub use pdf::*;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderAssets<'a> {
    pub logo: Option<&'a [u8]>,
    pub template: Option<&'a str>,
}

#[derive(Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
    pub pages: usize,
    pub warnings: Vec<RenderWarning>,
}

// A problem that degraded one row's output without stopping it.
#[derive(Debug)]
pub struct RenderWarning {
    pub kind: WarningKind,
    pub error: FactsheetError,
}

pub trait ReportRenderer: Send + Sync {
    fn render(&self, record: &FundRecord, assets: &RenderAssets<'_>) -> Result<RenderedReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Pdf,
    Html,
}

impl RendererKind {
    pub fn for_assets(assets: &RenderAssets<'_>) -> Self {
        if assets.template.is_some() {
            RendererKind::Html
        } else {
            RendererKind::Pdf
        }
    }
}

pub fn make_renderer(kind: RendererKind) -> Box<dyn ReportRenderer> {
    match kind {
        RendererKind::Pdf => Box::new(PdfRenderer::new()),
        RendererKind::Html => Box::new(HtmlRenderer::new()),
    }
}

pub(crate) fn logo_warning(record: &FundRecord, reason: impl Into<String>) -> RenderWarning {
    RenderWarning {
        kind: WarningKind::Logo,
        error: FactsheetError::RowProjection {
            row: record.row_index,
            fund_name: record.fund_name.clone(),
            reason: format!("Error with logo: {}", reason.into()),
        },
    }
}

pub(crate) fn decode_logo(bytes: &[u8]) -> std::result::Result<DynamicImage, String> {
    image_crate::load_from_memory(bytes).map_err(|e| e.to_string())
}

pub(crate) fn logo_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image_crate::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}
