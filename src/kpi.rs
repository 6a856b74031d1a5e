//! KPI aggregation over month slices.
//!
//! Every function here is read-only over its inputs and returns new values.
//! Column errors (unknown column, non-numeric cell) come back as `KpiError`
//! for the caller to isolate.
use std::collections::HashMap;

use crate::error::KpiResult;
use crate::selector::Slice;
use crate::types::{Cell, Delta, GroupComparison, KpiTable, Metric, Reading, Share};
use crate::util::{mean, parse_f64_safe, round2};

/// Sum of `column`; 0 for an empty slice.
pub fn sum_column(slice: &Slice, column: &str) -> KpiResult<f64> {
    Ok(slice.numeric_column(column)?.iter().sum())
}

/// Mean of `column` rounded to two decimals, or `NoData` for an empty slice.
pub fn mean_column(slice: &Slice, column: &str) -> KpiResult<Reading> {
    Ok(match mean(&slice.numeric_column(column)?) {
        Some(m) => Reading::Value(round2(m)),
        None => Reading::NoData,
    })
}

fn delta_between(current: &Slice, prior: &Slice, now: f64, before: f64) -> Delta {
    if current.is_empty() {
        Delta::NoCurrentData
    } else if prior.is_empty() {
        Delta::NoPriorData
    } else {
        Delta::Change(now - before)
    }
}

/// Total of `column` this month and its change against the prior month.
pub fn sum_metric(current: &Slice, prior: &Slice, column: &str) -> KpiResult<Metric> {
    let now = sum_column(current, column)?;
    let before = sum_column(prior, column)?;
    Ok(Metric {
        reading: Reading::Value(now),
        delta: delta_between(current, prior, now, before),
        current_rows: current.len(),
        prior_rows: prior.len(),
    })
}

/// Rounded mean of `column` this month. The delta subtracts the two
/// already-rounded means, so it always agrees with the displayed values;
/// the difference is rounded again only to drop float noise.
pub fn mean_metric(current: &Slice, prior: &Slice, column: &str) -> KpiResult<Metric> {
    let now = mean_column(current, column)?;
    let before = mean_column(prior, column)?;
    let delta = match (now, before) {
        (Reading::Value(n), Reading::Value(b)) => Delta::Change(round2(n - b)),
        (Reading::NoData, _) => Delta::NoCurrentData,
        (_, Reading::NoData) => Delta::NoPriorData,
    };
    Ok(Metric {
        reading: now,
        delta,
        current_rows: current.len(),
        prior_rows: prior.len(),
    })
}

/// Row-wise `needed - current`, aligned with the slice's rows.
pub fn capacity_gap(slice: &Slice, needed: &str, current: &str) -> KpiResult<Vec<f64>> {
    let needed = slice.numeric_column(needed)?;
    let current = slice.numeric_column(current)?;
    Ok(needed.iter().zip(&current).map(|(n, c)| n - c).collect())
}

fn to_cell(raw: &str) -> Cell {
    match parse_f64_safe(Some(raw)) {
        Some(v) => Cell::Number(v),
        None => Cell::Text(raw.to_string()),
    }
}

/// Copy `columns` of the slice into a standalone display table.
pub fn project(slice: &Slice, columns: &[&str]) -> KpiResult<KpiTable> {
    let cols = columns
        .iter()
        .map(|c| slice.text_column(c))
        .collect::<KpiResult<Vec<_>>>()?;
    let rows = (0..slice.len())
        .map(|i| cols.iter().map(|col| to_cell(col[i])).collect())
        .collect();
    Ok(KpiTable {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    })
}

/// `project` plus a trailing capacity-gap column named `gap_name`.
pub fn with_gap_column(
    slice: &Slice,
    columns: &[&str],
    needed: &str,
    current: &str,
    gap_name: &str,
) -> KpiResult<KpiTable> {
    let gap = capacity_gap(slice, needed, current)?;
    let mut table = project(slice, columns)?;
    table.columns.push(gap_name.to_string());
    for (row, g) in table.rows.iter_mut().zip(gap) {
        row.push(Cell::Number(g));
    }
    Ok(table)
}

/// One (category, value) pair per distinct category, in first-appearance
/// order. Rows sharing a category are summed.
pub fn breakdown(slice: &Slice, category: &str, value: &str) -> KpiResult<Vec<Share>> {
    let labels = slice.text_column(category)?;
    let values = slice.numeric_column(value)?;
    let mut shares: Vec<Share> = Vec::new();
    let mut pos: HashMap<&str, usize> = HashMap::new();
    for (label, v) in labels.into_iter().zip(values) {
        match pos.get(label) {
            Some(&i) => shares[i].value += v,
            None => {
                pos.insert(label, shares.len());
                shares.push(Share {
                    category: label.to_string(),
                    value: v,
                });
            }
        }
    }
    Ok(shares)
}

fn group_means<'a>(slice: &Slice<'a>, group: &str, value: &str) -> KpiResult<Vec<(&'a str, f64)>> {
    let labels = slice.text_column(group)?;
    let values = slice.numeric_column(value)?;
    let mut order: Vec<&'a str> = Vec::new();
    let mut acc: HashMap<&'a str, Vec<f64>> = HashMap::new();
    for (label, v) in labels.into_iter().zip(values) {
        acc.entry(label)
            .or_insert_with(|| {
                order.push(label);
                Vec::new()
            })
            .push(v);
    }
    Ok(order
        .into_iter()
        .filter_map(|label| mean(&acc[label]).map(|m| (label, m)))
        .collect())
}

/// Mean of `value` per `group` for both months, aligned by group label.
/// Groups of the current month come first, then groups only seen in the
/// prior month. A group missing from one side reads `NoData` there.
pub fn grouped_mean_comparison(
    current: &Slice,
    prior: &Slice,
    group: &str,
    value: &str,
) -> KpiResult<Vec<GroupComparison>> {
    let now = group_means(current, group, value)?;
    let before = group_means(prior, group, value)?;
    let before_map: HashMap<&str, f64> = before.iter().copied().collect();
    let now_map: HashMap<&str, f64> = now.iter().copied().collect();

    let reading = |m: Option<&f64>| m.map_or(Reading::NoData, |v| Reading::Value(*v));
    let mut out: Vec<GroupComparison> = now
        .iter()
        .map(|(label, m)| GroupComparison {
            group: label.to_string(),
            current: Reading::Value(*m),
            prior: reading(before_map.get(label)),
        })
        .collect();
    out.extend(
        before
            .iter()
            .filter(|(label, _)| !now_map.contains_key(label))
            .map(|(label, m)| GroupComparison {
                group: label.to_string(),
                current: Reading::NoData,
                prior: Reading::Value(*m),
            }),
    );
    Ok(out)
}
