use super::{
    decode_logo, logo_warning, RenderAssets, RenderWarning, RenderedReport, ReportRenderer,
    PDF_CONTENT_TYPE,
};
use crate::{FactsheetError, FundRecord, Month, Result, WarningKind};
use printpdf::image_crate::DynamicImage;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};
use tracing::debug;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const SPACER: f32 = 5.0;
const ROW_HEIGHT: f32 = 7.0;
const LOGO_SIZE: f32 = 25.4;
const LOGO_DPI: f32 = 300.0;
const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = BODY_SIZE * 0.45;
const TITLE_SIZE: f32 = 20.0;
const TITLE_LEADING: f32 = TITLE_SIZE * 0.35;
const WRAP_CHARS: usize = 90;
const TITLE_WRAP_CHARS: usize = 45;
const CHART_HEIGHT: f32 = 50.0;
const CHART_BLOCK: f32 = BODY_LEADING + SPACER + CHART_HEIGHT + 3.0 + SPACER + 3.0;

// Characters 0x80-0x9F of WinAnsiEncoding that are not Latin-1.
const WIN_ANSI_EXTRA: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

fn grey() -> Color {
    Color::Rgb(Rgb::new(0.8, 0.8, 0.8, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn portfolio_colour() -> Color {
    Color::Rgb(Rgb::new(0.18, 0.36, 0.62, None))
}

fn benchmark_colour() -> Color {
    Color::Rgb(Rgb::new(0.93, 0.55, 0.17, None))
}

pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// Whether the builtin Helvetica fonts can draw `c`.
pub fn is_win_ansi(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}') || WIN_ANSI_EXTRA.contains(c)
}

fn to_win_ansi(text: &str) -> String {
    text.chars()
        .map(|c| if is_win_ansi(c) { c } else { '?' })
        .collect()
}

// Distinct characters in the record's text that will print as '?'.
pub fn unsupported_chars(record: &FundRecord) -> Vec<char> {
    let mut fields: Vec<&str> = vec![
        &record.fund_name,
        &record.investment_strategy,
        &record.management_fee,
        &record.brokerage_fee,
    ];
    fields.extend(record.investment_objective.as_deref());
    fields.extend(record.fund_composition.as_deref());
    for (_, portfolio, benchmark) in record.performance.rows() {
        fields.extend(portfolio.as_str());
        fields.extend(benchmark.and_then(|b| b.as_str()));
    }

    let mut found = Vec::new();
    for c in fields.iter().flat_map(|f| f.chars()) {
        if !c.is_whitespace() && !is_win_ansi(c) && !found.contains(&c) {
            found.push(c);
        }
    }
    found
}

struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    // Distance from the bottom of the page to the next free line.
    cursor: f32,
    pages: usize,
}

impl<'a> Canvas<'a> {
    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(to_win_ansi(text), size, Mm(x), Mm(y), font);
    }

    fn line(&self, from: (f32, f32), to: (f32, f32)) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0), Mm(from.1)), false),
                (Point::new(Mm(to.0), Mm(to.1)), false),
            ],
            is_closed: false,
        });
    }

    fn filled_rect(&self, x: f32, y: f32, width: f32, height: f32, colour: Color) {
        self.layer.set_fill_color(colour);
        self.layer
            .add_rect(Rect::new(Mm(x), Mm(y), Mm(x + width), Mm(y + height)).with_mode(PaintMode::Fill));
        self.layer.set_fill_color(black());
    }

    // Moves to a fresh page unless `height` still fits above the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height >= MARGIN {
            return;
        }
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn heading(&mut self, text: &str) {
        for line in wrap_text(text, TITLE_WRAP_CHARS) {
            self.reserve(TITLE_LEADING);
            self.cursor -= TITLE_LEADING;
            self.text(&line, TITLE_SIZE, MARGIN, self.cursor, true);
            self.cursor -= 2.0;
        }
        self.cursor -= SPACER;
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.reserve(BODY_LEADING);
            self.cursor -= BODY_LEADING;
            self.text(&line, BODY_SIZE, MARGIN, self.cursor, false);
        }
        self.cursor -= SPACER;
    }

    // Grid table with a grey header row, kept together on one page.
    fn table(&mut self, rows: &[Vec<String>], widths: &[f32]) {
        self.reserve(ROW_HEIGHT * rows.len() as f32);
        let top = self.cursor;
        let total_width: f32 = widths.iter().sum();

        self.filled_rect(MARGIN, top - ROW_HEIGHT, total_width, ROW_HEIGHT, grey());

        for (i, row) in rows.iter().enumerate() {
            let baseline = top - ROW_HEIGHT * (i as f32 + 1.0) + 2.0;
            let mut x = MARGIN;
            for (cell, width) in row.iter().zip(widths) {
                self.text(cell, BODY_SIZE - 1.0, x + 2.0, baseline, i == 0);
                x += width;
            }
        }

        let bottom = top - ROW_HEIGHT * rows.len() as f32;
        self.layer.set_outline_color(black());
        self.layer.set_outline_thickness(1.0);
        for i in 0..=rows.len() {
            let y = top - ROW_HEIGHT * i as f32;
            self.line((MARGIN, y), (MARGIN + total_width, y));
        }
        let mut x = MARGIN;
        self.line((x, top), (x, bottom));
        for width in widths {
            x += width;
            self.line((x, top), (x, bottom));
        }

        self.cursor = bottom - SPACER;
    }

    fn logo(&mut self, image: &DynamicImage) {
        let buffer = image.to_rgb8();
        let (width, height) = (buffer.width().max(1) as f32, buffer.height().max(1) as f32);
        let rgb = DynamicImage::ImageRgb8(buffer);
        // At LOGO_DPI one pixel is 1/LOGO_DPI inch; scale both axes to one inch.
        let transform = ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(self.cursor - LOGO_SIZE)),
            scale_x: Some(LOGO_DPI / width),
            scale_y: Some(LOGO_DPI / height),
            dpi: Some(LOGO_DPI),
            ..Default::default()
        };
        Image::from_dynamic_image(&rgb).add_to_layer(self.layer.clone(), transform);
        self.cursor -= LOGO_SIZE + SPACER;
    }

    fn chart(&mut self, record: &FundRecord) {
        let points: Vec<(Month, Option<f64>, Option<f64>)> = record
            .performance
            .rows()
            .map(|(m, p, b)| (m, p.as_percent(), b.and_then(|b| b.as_percent())))
            .collect();

        let max_abs = points
            .iter()
            .flat_map(|(_, p, b)| [*p, *b])
            .flatten()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_abs == 0.0 {
            return;
        }

        self.reserve(CHART_BLOCK);
        self.cursor -= BODY_LEADING;
        self.text("Monthly returns (%)", BODY_SIZE, MARGIN, self.cursor, true);
        self.cursor -= SPACER;

        let top = self.cursor;
        let baseline = top - CHART_HEIGHT / 2.0;
        let half = CHART_HEIGHT / 2.0 - 2.0;
        let slot = (PAGE_WIDTH - 2.0 * MARGIN) / Month::ALL.len() as f32;
        let bar = slot / 3.0;

        self.layer.set_outline_color(black());
        self.layer.set_outline_thickness(0.5);
        self.line((MARGIN, baseline), (PAGE_WIDTH - MARGIN, baseline));

        for (i, (month, portfolio, benchmark)) in points.iter().enumerate() {
            let x = MARGIN + slot * i as f32 + bar / 2.0;
            for (offset, value, colour) in [
                (0.0, portfolio, portfolio_colour()),
                (bar, benchmark, benchmark_colour()),
            ] {
                if let Some(v) = value {
                    let h = (*v / max_abs) as f32 * half;
                    let (y, h) = if h >= 0.0 { (baseline, h) } else { (baseline + h, -h) };
                    self.filled_rect(x + offset, y, bar, h.max(0.2), colour);
                }
            }
            self.text(&month.name()[..3], BODY_SIZE - 3.0, x, top - CHART_HEIGHT - 3.0, false);
        }

        self.cursor = top - CHART_HEIGHT - 3.0 - SPACER;
        self.filled_rect(MARGIN, self.cursor, 3.0, 3.0, portfolio_colour());
        self.text("Portfolio", BODY_SIZE - 2.0, MARGIN + 5.0, self.cursor, false);
        self.filled_rect(MARGIN + 30.0, self.cursor, 3.0, 3.0, benchmark_colour());
        self.text("SAPY", BODY_SIZE - 2.0, MARGIN + 35.0, self.cursor, false);
        self.cursor -= 3.0;
    }
}

// Greedy word wrap on character count; words wider than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(width) {
            if current_len > 0 && current_len + 1 + piece.len() > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(piece);
            current_len += piece.len();
        }
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn fee_rows(record: &FundRecord) -> Vec<Vec<String>> {
    vec![
        vec!["Metric".to_string(), "Value".to_string()],
        vec!["Management Fee".to_string(), record.management_fee.clone()],
        vec!["Brokerage Fee".to_string(), record.brokerage_fee.clone()],
    ]
}

// Header plus one row per month; an absent value is an empty cell.
pub fn performance_rows(record: &FundRecord) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["Month".to_string(), "Portfolio".to_string(), "SAPY".to_string()]];
    rows.extend(record.performance.rows().map(|(month, portfolio, benchmark)| {
        vec![
            month.to_string(),
            portfolio.display().to_string(),
            benchmark.map(|b| b.display()).unwrap_or("").to_string(),
        ]
    }));
    rows
}

impl ReportRenderer for PdfRenderer {
    fn render(&self, record: &FundRecord, assets: &RenderAssets<'_>) -> Result<RenderedReport> {
        let title = format!("{} Factsheet", record.fund_name);
        let (doc, page, layer) = PdfDocument::new(to_win_ansi(&title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let mut canvas = Canvas {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
            cursor: PAGE_HEIGHT - MARGIN,
            pages: 1,
        };

        let mut warnings = Vec::new();
        if let Some(bytes) = assets.logo {
            match decode_logo(bytes) {
                Ok(image) => canvas.logo(&image),
                Err(reason) => warnings.push(logo_warning(record, reason)),
            }
        }

        let unsupported = unsupported_chars(record);
        if !unsupported.is_empty() {
            warnings.push(RenderWarning {
                kind: WarningKind::LossyText,
                error: FactsheetError::RowProjection {
                    row: record.row_index,
                    fund_name: record.fund_name.clone(),
                    reason: format!(
                        "characters not supported by the PDF font were replaced with '?': {}",
                        unsupported.iter().collect::<String>()
                    ),
                },
            });
        }

        canvas.heading(&title);
        canvas.paragraph(&format!("Investment Strategy: {}", record.investment_strategy));
        if let Some(objective) = &record.investment_objective {
            canvas.paragraph(&format!("Investment Objective: {}", objective));
        }
        if let Some(composition) = &record.fund_composition {
            canvas.paragraph(&format!("Fund Composition: {}", composition));
        }

        canvas.table(&fee_rows(record), &[60.0, 40.0]);
        canvas.table(&performance_rows(record), &[40.0, 35.0, 35.0]);
        canvas.chart(record);

        let pages = canvas.pages;
        drop(canvas);
        let bytes = doc.save_to_bytes()?;
        debug!(fund = %record.fund_name, size = bytes.len(), pages, "rendered pdf");

        Ok(RenderedReport {
            bytes,
            content_type: PDF_CONTENT_TYPE,
            extension: "pdf",
            pages,
            warnings,
        })
    }
}
