use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tabled::Tabled;

use crate::error::{KpiError, KpiResult};

/// One data row of an input table. `row` is the 1-based data row number
/// (header excluded) and is what error messages refer to.
#[derive(Debug, Clone)]
pub struct Record {
    pub row: usize,
    pub date: NaiveDate,
    pub cells: Vec<String>,
}

/// A loaded input table. Immutable once built; every selection borrows it.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub date_column: String,
    pub rows: Vec<Record>,
    index: HashMap<String, usize>,
}

impl Table {
    pub fn new(name: &str, headers: Vec<String>, date_column: &str, rows: Vec<Record>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Table {
            name: name.to_string(),
            headers,
            date_column: date_column.to_string(),
            rows,
            index,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn column_index(&self, column: &str) -> KpiResult<usize> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| KpiError::UnknownColumn(column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A display cell of a projected table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

/// Current-side value of a scalar KPI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Reading {
    Value(f64),
    NoData,
}

impl Reading {
    pub fn value(self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::NoData => None,
        }
    }
}

/// Month-over-month change of a scalar KPI. Only `Change` carries a number;
/// a missing period is never reported as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Delta {
    Change(f64),
    NoPriorData,
    NoCurrentData,
}

impl Delta {
    pub fn value(self) -> Option<f64> {
        match self {
            Delta::Change(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub reading: Reading,
    pub delta: Delta,
    pub current_rows: usize,
    pub prior_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub group: String,
    pub current: Reading,
    pub prior: Reading,
}

/// Small row-aligned table handed to the renderer as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KpiValue {
    Metric(Metric),
    Breakdown { shares: Vec<Share> },
    Comparison { groups: Vec<GroupComparison> },
    Table(KpiTable),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub name: String,
    pub value: KpiValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: String,
    pub kpis: Vec<Kpi>,
}

impl Section {
    pub fn kpi(&self, name: &str) -> Option<&KpiValue> {
        self.kpis.iter().find(|k| k.name == name).map(|k| &k.value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tab {
    pub title: String,
    pub selection: Option<String>,
    pub notice: Option<String>,
    pub sections: Vec<Section>,
}

impl Tab {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub period: String,
    pub prior_period: String,
    pub tabs: Vec<Tab>,
}

/// Flat view of one scalar KPI for CSV export and console previews.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MetricRow {
    #[serde(rename = "Tab")]
    #[tabled(rename = "Tab")]
    pub tab: String,
    #[serde(rename = "Section")]
    #[tabled(rename = "Section")]
    pub section: String,
    #[serde(rename = "Kpi")]
    #[tabled(rename = "Kpi")]
    pub kpi: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Delta")]
    #[tabled(rename = "Delta")]
    pub delta: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ShareRow {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ComparisonRow {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Current")]
    pub current: String,
    #[tabled(rename = "Prior")]
    pub prior: String,
}
