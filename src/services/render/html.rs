use super::{
    logo_mime_type, logo_warning, performance_rows, RenderAssets, RenderWarning, RenderedReport,
    ReportRenderer, HTML_CONTENT_TYPE,
};
use crate::{FactsheetError, FundRecord, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn performance_table_html(record: &FundRecord) -> String {
    let rows = performance_rows(record);
    let mut html = String::from("<table class=\"performance\">\n");
    for (i, row) in rows.iter().enumerate() {
        let tag = if i == 0 { "th" } else { "td" };
        html.push_str("  <tr>");
        for cell in row {
            html.push_str(&format!("<{tag}>{}</{tag}>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

fn logo_html(record: &FundRecord, logo: &[u8], warnings: &mut Vec<RenderWarning>) -> String {
    match logo_mime_type(logo) {
        Some(mime) => format!(
            "<img class=\"logo\" src=\"data:{};base64,{}\" alt=\"logo\" width=\"96\" height=\"96\">",
            mime,
            STANDARD.encode(logo)
        ),
        None => {
            warnings.push(logo_warning(record, "unrecognized image format"));
            String::new()
        }
    }
}

// Unknown `{{ name }}` slots are copied through untouched.
pub fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl ReportRenderer for HtmlRenderer {
    fn render(&self, record: &FundRecord, assets: &RenderAssets<'_>) -> Result<RenderedReport> {
        let template = assets
            .template
            .ok_or_else(|| FactsheetError::Render("HTML output requires a template".to_string()))?;

        let mut warnings = Vec::new();
        let logo = assets
            .logo
            .map(|bytes| logo_html(record, bytes, &mut warnings))
            .unwrap_or_default();
        let table = performance_table_html(record);

        let html = fill_template(template, |name| {
            let value = match name {
                "fund_name" => escape_html(&record.fund_name),
                "investment_strategy" => escape_html(&record.investment_strategy),
                "management_fee" => escape_html(&record.management_fee),
                "brokerage_fee" => escape_html(&record.brokerage_fee),
                "investment_objective" => escape_html(record.investment_objective.as_deref().unwrap_or("")),
                "fund_composition" => escape_html(record.fund_composition.as_deref().unwrap_or("")),
                "performance_table" => table.clone(),
                "logo" => logo.clone(),
                _ => return None,
            };
            Some(value)
        });

        Ok(RenderedReport {
            bytes: html.into_bytes(),
            content_type: HTML_CONTENT_TYPE,
            extension: "html",
            pages: 1,
            warnings,
        })
    }
}
