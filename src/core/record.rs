use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
}

impl Month {
    pub const ALL: [Month; 6] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
        }
    }

    pub fn portfolio_column(&self) -> &'static str {
        self.name()
    }

    pub fn benchmark_column(&self) -> &'static str {
        match self {
            Month::January => "SAPY_January",
            Month::February => "SAPY_February",
            Month::March => "SAPY_March",
            Month::April => "SAPY_April",
            Month::May => "SAPY_May",
            Month::June => "SAPY_June",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Value(String),
    NoValue,
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Value(v) => Some(v),
            CellValue::NoValue => None,
        }
    }

    pub fn is_no_value(&self) -> bool {
        matches!(self, CellValue::NoValue)
    }

    pub fn display(&self) -> &str {
        self.as_str().unwrap_or("")
    }

    pub fn as_percent(&self) -> Option<f64> {
        let raw = self.as_str()?.trim();
        let raw = raw.strip_suffix('%').unwrap_or(raw).trim();
        raw.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

pub type MonthlyValues = [(Month, CellValue); 6];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceMap {
    pub portfolio: MonthlyValues,
    pub benchmark: Option<MonthlyValues>,
}

impl PerformanceMap {
    pub fn portfolio_value(&self, month: Month) -> &CellValue {
        &self.portfolio[month as usize].1
    }

    pub fn benchmark_value(&self, month: Month) -> Option<&CellValue> {
        self.benchmark.as_ref().map(|b| &b[month as usize].1)
    }

    pub fn rows(&self) -> impl Iterator<Item = (Month, &CellValue, Option<&CellValue>)> + '_ {
        Month::ALL
            .iter()
            .map(move |&m| (m, self.portfolio_value(m), self.benchmark_value(m)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRecord {
    pub row_index: usize,
    pub fund_name: String,
    pub investment_strategy: String,
    pub management_fee: String,
    pub brokerage_fee: String,
    pub investment_objective: Option<String>,
    pub fund_composition: Option<String>,
    pub performance: PerformanceMap,
}
