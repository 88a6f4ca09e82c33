use crate::{FactsheetError, Month, Result, Table};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const FUND_NAME: &str = "Fund Name";
pub const INVESTMENT_STRATEGY: &str = "Investment Strategy";
pub const MANAGEMENT_FEE: &str = "Management Fee";
pub const BROKERAGE_FEE: &str = "Brokerage Fee";
pub const INVESTMENT_OBJECTIVE: &str = "Investment Objective";
pub const FUND_COMPOSITION: &str = "Fund Composition";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaProfile {
    #[default]
    Standard,
    Extended,
}

impl SchemaProfile {
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![FUND_NAME, INVESTMENT_STRATEGY, MANAGEMENT_FEE, BROKERAGE_FEE];
        columns.extend(Month::ALL.iter().map(Month::portfolio_column));
        columns.extend(Month::ALL.iter().map(Month::benchmark_column));
        if *self == SchemaProfile::Extended {
            columns.extend([INVESTMENT_OBJECTIVE, FUND_COMPOSITION]);
        }
        columns
    }
}

impl FromStr for SchemaProfile {
    type Err = FactsheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(SchemaProfile::Standard),
            "extended" => Ok(SchemaProfile::Extended),
            other => Err(FactsheetError::Configuration(format!("unknown schema profile: {}", other))),
        }
    }
}

// Only names are checked; blank or non-numeric cells pass.
pub fn validate_columns(table: &Table, required: &[&str]) -> Result<()> {
    let present = table.column_set();
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !present.contains(**name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FactsheetError::Schema { missing })
    }
}

pub fn validate(table: &Table, profile: SchemaProfile) -> Result<()> {
    validate_columns(table, &profile.required_columns())
}
