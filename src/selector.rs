//! Month and key selection over loaded tables.
//!
//! A [`Slice`] borrows rows from its [`Table`]; selecting never copies or
//! modifies the table, and any number of slices can coexist.
use chrono::Datelike;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::error::{KpiError, KpiResult};
use crate::types::{Record, Table};
use crate::util::parse_f64_safe;

/// A calendar month, optionally pinned to a year.
///
/// With `year: None` the window matches that month in every year present in
/// the table. This is the historical behaviour of the dashboard and stays the
/// default; `year_bound` in the config switches to pinned windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub month: u32,
    pub year: Option<i32>,
}

impl MonthWindow {
    pub fn any_year(month: u32) -> KpiResult<Self> {
        Self::validate(month)?;
        Ok(MonthWindow { month, year: None })
    }

    pub fn in_year(year: i32, month: u32) -> KpiResult<Self> {
        Self::validate(month)?;
        Ok(MonthWindow {
            month,
            year: Some(year),
        })
    }

    fn validate(month: u32) -> KpiResult<()> {
        if (1..=12).contains(&month) {
            Ok(())
        } else {
            Err(KpiError::InvalidMonth(month))
        }
    }

    /// The month before this one. January wraps to December, and a pinned
    /// window moves back a year when it wraps.
    pub fn previous(self) -> Self {
        if self.month == 1 {
            MonthWindow {
                month: 12,
                year: self.year.map(|y| y.saturating_sub(1)),
            }
        } else {
            MonthWindow {
                month: self.month - 1,
                year: self.year,
            }
        }
    }

    pub fn contains(&self, record: &Record) -> bool {
        record.date.month() == self.month && self.year.map_or(true, |y| record.date.year() == y)
    }
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let name = NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("?");
        match self.year {
            Some(y) => write!(f, "{} {}", name, y),
            None => write!(f, "{}", name),
        }
    }
}

/// Read-only view over a subset of a table's rows, in table order.
#[derive(Debug, Clone)]
pub struct Slice<'a> {
    table: &'a Table,
    rows: Vec<&'a Record>,
}

impl<'a> Slice<'a> {
    pub fn all(table: &'a Table) -> Self {
        Slice {
            table,
            rows: table.rows.iter().collect(),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn rows(&self) -> &[&'a Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw cell text of `column`, one entry per row.
    pub fn text_column(&self, column: &str) -> KpiResult<Vec<&'a str>> {
        let idx = self.table.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .copied()
            .map(|r| r.cells.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Numeric values of `column`, one entry per row. The first cell that is
    /// not a number fails the whole column.
    pub fn numeric_column(&self, column: &str) -> KpiResult<Vec<f64>> {
        let idx = self.table.column_index(column)?;
        self.rows
            .iter()
            .map(|r| {
                let cell = r.cells.get(idx).map(String::as_str);
                parse_f64_safe(cell).ok_or_else(|| KpiError::NonNumeric {
                    column: column.to_string(),
                    row: r.row,
                    value: cell.unwrap_or("").to_string(),
                })
            })
            .collect()
    }
}

/// Rows of `table` whose date falls in `month`, in any year.
pub fn select_month<'a>(table: &'a Table, date_column: &str, month: u32) -> KpiResult<Slice<'a>> {
    select_window(table, date_column, MonthWindow::any_year(month)?)
}

pub fn select_window<'a>(
    table: &'a Table,
    date_column: &str,
    window: MonthWindow,
) -> KpiResult<Slice<'a>> {
    if date_column != table.date_column {
        if !table.has_column(date_column) {
            return Err(KpiError::UnknownColumn(date_column.to_string()));
        }
        return Err(KpiError::NotDateColumn {
            requested: date_column.to_string(),
            actual: table.date_column.clone(),
        });
    }
    let rows: Vec<&Record> = table.rows.iter().filter(|r| window.contains(r)).collect();
    debug!(table = %table.name, window = %window, rows = rows.len(), "month selected");
    Ok(Slice { table, rows })
}

/// Keep the rows of `slice` whose `column` equals `value`. An empty result is
/// a normal outcome, not an error.
pub fn filter_eq<'a>(slice: &Slice<'a>, column: &str, value: &str) -> KpiResult<Slice<'a>> {
    let idx = slice.table.column_index(column)?;
    let rows = slice
        .rows
        .iter()
        .copied()
        .filter(|r| r.cells.get(idx).map(String::as_str) == Some(value))
        .collect();
    Ok(Slice {
        table: slice.table,
        rows,
    })
}

/// Distinct values of `column` in first-appearance order.
pub fn distinct_values<'a>(slice: &Slice<'a>, column: &str) -> KpiResult<Vec<&'a str>> {
    let mut seen = HashSet::new();
    Ok(slice
        .text_column(column)?
        .into_iter()
        .filter(|v| seen.insert(*v))
        .collect())
}
