use crate::core::schema::{
    BROKERAGE_FEE, FUND_COMPOSITION, FUND_NAME, INVESTMENT_OBJECTIVE, INVESTMENT_STRATEGY,
    MANAGEMENT_FEE,
};
use crate::{CellValue, FundRecord, Month, MonthlyValues, PerformanceMap, Row, Table};
use std::collections::HashMap;

fn monthly(row: &Row<'_>, column: fn(&Month) -> &'static str) -> MonthlyValues {
    Month::ALL.map(|month| {
        let value = match row.get(column(&month)) {
            Some(cell) => CellValue::Value(cell.to_string()),
            None => CellValue::NoValue,
        };
        (month, value)
    })
}

fn text(row: &Row<'_>, column: &str) -> String {
    row.get(column).unwrap_or_default().to_string()
}

// Cells are copied verbatim; a missing month column becomes `NoValue`.
pub fn project_row(row: &Row<'_>) -> FundRecord {
    let table = row.table();
    let has_benchmark = Month::ALL
        .iter()
        .any(|m| table.has_column(m.benchmark_column()));

    FundRecord {
        row_index: row.index,
        fund_name: text(row, FUND_NAME),
        investment_strategy: text(row, INVESTMENT_STRATEGY),
        management_fee: text(row, MANAGEMENT_FEE),
        brokerage_fee: text(row, BROKERAGE_FEE),
        investment_objective: row.get(INVESTMENT_OBJECTIVE).map(String::from),
        fund_composition: row.get(FUND_COMPOSITION).map(String::from),
        performance: PerformanceMap {
            portfolio: monthly(row, Month::portfolio_column),
            benchmark: has_benchmark.then(|| monthly(row, Month::benchmark_column)),
        },
    }
}

pub fn project_table(table: &Table) -> Vec<FundRecord> {
    table.rows().map(|row| project_row(&row)).collect()
}

// A later record with the same fund name replaces the earlier one.
pub fn index_by_name(records: &[FundRecord]) -> HashMap<&str, &FundRecord> {
    records
        .iter()
        .map(|record| (record.fund_name.as_str(), record))
        .collect()
}

pub fn duplicate_fund_names(records: &[FundRecord]) -> Vec<(String, Vec<usize>)> {
    let mut seen: Vec<(String, Vec<usize>)> = Vec::new();
    for record in records {
        match seen.iter_mut().find(|(name, _)| *name == record.fund_name) {
            Some((_, rows)) => rows.push(record.row_index),
            None => seen.push((record.fund_name.clone(), vec![record.row_index])),
        }
    }
    seen.retain(|(_, rows)| rows.len() > 1);
    seen
}
