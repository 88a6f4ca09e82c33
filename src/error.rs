use thiserror::Error;

pub type Result<T> = std::result::Result<T, FactsheetError>;

#[derive(Error, Debug)]
pub enum FactsheetError {
    #[error("CSV is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Row {row} ({fund_name}): {reason}")]
    RowProjection {
        row: usize,
        fund_name: String,
        reason: String,
    },

    #[error("Input contains no header row")]
    EmptyInput,

    #[error("Rendering error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] printpdf::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FactsheetError {
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            FactsheetError::Schema { .. } | FactsheetError::EmptyInput | FactsheetError::Csv(_)
        )
    }
}
