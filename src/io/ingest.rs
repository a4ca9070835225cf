//! CSV loan-book ingest.
//!
//! Expected columns (header names, any order):
//!
//! `loan_id, principal, monthly_rate, tenure_months, monthly_income, status,
//! months_on_book` and optionally `recovered`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Deserialize;

use crate::domain::{LoanRecord, LoanStatus};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 7] = [
    "loan_id",
    "principal",
    "monthly_rate",
    "tenure_months",
    "monthly_income",
    "status",
    "months_on_book",
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: valid loans plus the rows that were skipped.
#[derive(Debug, Clone)]
pub struct IngestedBook {
    pub loans: Vec<LoanRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

#[derive(Debug, Deserialize)]
struct LoanRow {
    loan_id: String,
    principal: f64,
    monthly_rate: f64,
    tenure_months: f64,
    monthly_income: f64,
    status: String,
    #[serde(default)]
    recovered: Option<f64>,
    months_on_book: f64,
}

/// Load a loan book from a CSV file.
pub fn load_loan_book(path: &Path) -> Result<IngestedBook, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_loan_book(file)
}

/// Load a loan book from any CSV reader.
pub fn read_loan_book<R: Read>(input: R) -> Result<IngestedBook, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    ensure_required_columns_exist(&headers)?;

    let mut loans = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = headers
            .iter()
            .position(|h| h == "loan_id")
            .and_then(|i| record.get(i))
            .map(str::to_string);

        match parse_row(&record, &headers) {
            Ok(loan) => loans.push(loan),
            Err(message) => row_errors.push(RowError { line, id, message }),
        }
    }

    if loans.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "No valid loans in CSV ({rows_read} row(s) read, {} rejected).",
                row_errors.len()
            ),
        ));
    }

    Ok(IngestedBook {
        loans,
        row_errors,
        rows_read,
    })
}

fn ensure_required_columns_exist(headers: &StringRecord) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::new(
            2,
            format!("CSV is missing required column(s): {}", missing.join(", ")),
        ))
    }
}

fn parse_row(record: &StringRecord, headers: &StringRecord) -> Result<LoanRecord, String> {
    let row: LoanRow = record
        .deserialize(Some(headers))
        .map_err(|e| format!("invalid row: {e}"))?;
    let status: LoanStatus = row.status.parse()?;
    let recovered = row.recovered.unwrap_or(0.0);

    let checks = [
        ("principal", row.principal, row.principal > 0.0),
        ("monthly_rate", row.monthly_rate, row.monthly_rate >= 0.0),
        ("tenure_months", row.tenure_months, row.tenure_months > 0.0),
        ("monthly_income", row.monthly_income, row.monthly_income >= 0.0),
        ("months_on_book", row.months_on_book, row.months_on_book >= 0.0),
        ("recovered", recovered, recovered >= 0.0),
    ];
    for (name, value, ok) in checks {
        if !(value.is_finite() && ok) {
            return Err(format!("{name} out of range: {value}"));
        }
    }

    Ok(LoanRecord {
        loan_id: row.loan_id,
        principal: row.principal,
        monthly_rate: row.monthly_rate,
        tenure_months: row.tenure_months,
        monthly_income: row.monthly_income,
        status,
        recovered,
        months_on_book: row.months_on_book,
    })
}
