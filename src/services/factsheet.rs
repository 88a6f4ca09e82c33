use crate::services::render::{make_renderer, RenderAssets, RendererKind, ReportRenderer};
use crate::{
    duplicate_fund_names, project_row, validate, FactsheetError, Result, SchemaProfile, Table,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FactsheetRequest {
    pub table: Table,
    pub logo: Option<Vec<u8>>,
    pub template: Option<String>,
    pub profile: SchemaProfile,
}

impl FactsheetRequest {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            logo: None,
            template: None,
            profile: SchemaProfile::Standard,
        }
    }

    pub fn with_logo(mut self, logo: Vec<u8>) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_template(mut self, template: String) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_profile(mut self, profile: SchemaProfile) -> Self {
        self.profile = profile;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub row_index: usize,
    pub fund_name: String,
    pub file_name: String,
    pub content_type: String,
    pub pages: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Logo,
    LossyText,
    DuplicateFundName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    pub row: usize,
    pub fund_name: String,
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub rows: usize,
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<RowWarning>,
    // Set when a row failed and the remaining rows were skipped.
    pub aborted: Option<String>,
}

impl BatchReport {
    pub fn artifact(&self, file_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.file_name == file_name)
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.artifacts.len() == self.rows
    }
}

pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem.to_string()
    }
}

pub fn artifact_file_name(fund_name: &str, extension: &str) -> String {
    format!("factsheet_{}.{}", sanitize_file_stem(fund_name), extension)
}

pub struct FactsheetService {
    renderer: Option<Box<dyn ReportRenderer>>,
}

impl FactsheetService {
    pub fn new() -> Self {
        Self { renderer: None }
    }

    pub fn with_renderer(renderer: Box<dyn ReportRenderer>) -> Self {
        Self {
            renderer: Some(renderer),
        }
    }

    pub fn generate(&self, request: &FactsheetRequest) -> Result<BatchReport> {
        let batch_id = Uuid::new_v4().to_string();
        validate(&request.table, request.profile)?;

        let assets = RenderAssets {
            logo: request.logo.as_deref(),
            template: request.template.as_deref(),
        };
        let chosen;
        let renderer: &dyn ReportRenderer = match &self.renderer {
            Some(renderer) => renderer.as_ref(),
            None => {
                chosen = make_renderer(RendererKind::for_assets(&assets));
                chosen.as_ref()
            }
        };
        info!(batch_id = %batch_id, rows = request.table.len(), "generating factsheets");

        let mut report = BatchReport {
            batch_id,
            created_at: Utc::now(),
            rows: request.table.len(),
            artifacts: Vec::with_capacity(request.table.len()),
            warnings: Vec::new(),
            aborted: None,
        };
        let mut used_names = HashSet::new();
        let mut records = Vec::with_capacity(request.table.len());

        for row in request.table.rows() {
            let record = project_row(&row);

            let rendered = match renderer.render(&record, &assets) {
                Ok(rendered) => rendered,
                Err(e) => {
                    error!(batch_id = %report.batch_id, row = row.index, fund = %record.fund_name, "generation aborted: {}", e);
                    report.aborted = Some(format!("An error occurred: {}", e));
                    break;
                }
            };

            for w in rendered.warnings {
                warn!(batch_id = %report.batch_id, row = row.index, fund = %record.fund_name, kind = ?w.kind, "{}", w.error);
                report.warnings.push(RowWarning {
                    row: row.index,
                    fund_name: record.fund_name.clone(),
                    kind: w.kind,
                    message: row_warning_message(w.error),
                });
            }

            let mut file_name = artifact_file_name(&record.fund_name, rendered.extension);
            let mut suffix = row.index + 1;
            while !used_names.insert(file_name.clone()) {
                let stem = format!("{}_{}", sanitize_file_stem(&record.fund_name), suffix);
                file_name = format!("factsheet_{}.{}", stem, rendered.extension);
                suffix += 1;
            }

            report.artifacts.push(Artifact {
                row_index: row.index,
                fund_name: record.fund_name.clone(),
                file_name,
                content_type: rendered.content_type.to_string(),
                pages: rendered.pages,
                bytes: rendered.bytes,
            });
            records.push(record);
        }

        for (name, rows) in duplicate_fund_names(&records) {
            for &row in &rows[1..] {
                warn!(batch_id = %report.batch_id, row, fund = %name, "duplicate fund name");
                report.warnings.push(RowWarning {
                    row,
                    fund_name: name.clone(),
                    kind: WarningKind::DuplicateFundName,
                    message: format!(
                        "fund name \"{}\" already used on row {}",
                        name,
                        rows[0] + 1
                    ),
                });
            }
        }

        info!(
            batch_id = %report.batch_id,
            artifacts = report.artifacts.len(),
            warnings = report.warnings.len(),
            aborted = report.aborted.is_some(),
            "batch finished"
        );
        Ok(report)
    }
}

impl Default for FactsheetService {
    fn default() -> Self {
        Self::new()
    }
}

fn row_warning_message(error: FactsheetError) -> String {
    match error {
        FactsheetError::RowProjection { reason, .. } => reason,
        other => other.to_string(),
    }
}

pub fn write_artifacts(report: &BatchReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(report.artifacts.len());
    for artifact in &report.artifacts {
        let path = dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)?;
        written.push(path);
    }
    Ok(written)
}
