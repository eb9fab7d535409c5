use std::fs;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{Expense, Ledger};

#[derive(Clone, Debug, Deserialize)]
struct RawExpense {
    name: String,
    amount: f64,
    date: String,
}

pub fn load_ledger(path: &str) -> Result<Ledger> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let expenses = parse_expenses(&raw).with_context(|| format!("parsing {path}"))?;
    Ok(Ledger::new(expenses))
}

fn parse_expenses(raw: &str) -> Result<Vec<Expense>> {
    let records: Vec<RawExpense> =
        serde_json::from_str(raw).context("invalid expense JSON; expected an array of records")?;

    let mut expenses = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        if !record.amount.is_finite() || record.amount < 0.0 {
            bail!("record {index} ({:?}) has invalid amount", record.name);
        }

        let date = parse_date(&record.date)
            .with_context(|| format!("record {index} ({:?}) has invalid date", record.name))?;

        expenses.push(Expense {
            id: index as u64,
            name: record.name,
            amount: record.amount,
            date,
            category_count: 0,
        });
    }

    if expenses.is_empty() {
        bail!("no expense records found");
    }

    Ok(expenses)
}

// Accepts plain dates and full timestamps; the time of day is irrelevant to
// weekly grouping.
fn parse_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.date_naive());
    }
    if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime.date());
    }
    bail!("unrecognized date {value:?}")
}
