use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::types::{
    Cell, ComparisonRow, Dashboard, Delta, KpiTable, KpiValue, MetricRow, Reading, Share,
    ShareRow, Tab,
};
use crate::util::{format_number, format_signed};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn format_reading(r: Reading) -> String {
    match r {
        Reading::Value(v) => format_number(v, 2),
        Reading::NoData => "no data".to_string(),
    }
}

pub fn format_delta(d: Delta) -> String {
    match d {
        Delta::Change(v) => format_signed(v, 2),
        Delta::NoPriorData => "no prior data".to_string(),
        Delta::NoCurrentData => "no current data".to_string(),
    }
}

fn format_cell(c: &Cell) -> String {
    match c {
        Cell::Number(v) => format_number(*v, 2),
        Cell::Text(s) => s.clone(),
    }
}

fn tab_label(tab: &Tab) -> String {
    match &tab.selection {
        Some(sel) => format!("{} / {}", tab.title, sel),
        None => tab.title.clone(),
    }
}

/// One row per scalar KPI (and per unavailable KPI) across the dashboard.
pub fn metric_rows(dashboard: &Dashboard) -> Vec<MetricRow> {
    let mut rows = Vec::new();
    for tab in &dashboard.tabs {
        let label = tab_label(tab);
        for section in &tab.sections {
            for kpi in &section.kpis {
                let (value, delta) = match &kpi.value {
                    KpiValue::Metric(m) => (format_reading(m.reading), format_delta(m.delta)),
                    KpiValue::Unavailable { reason } => {
                        (format!("unavailable: {}", reason), String::new())
                    }
                    _ => continue,
                };
                rows.push(MetricRow {
                    tab: label.clone(),
                    section: section.title.clone(),
                    kpi: kpi.name.clone(),
                    value,
                    delta,
                });
            }
        }
    }
    rows
}

fn share_rows(shares: &[Share]) -> Vec<ShareRow> {
    let total: f64 = shares.iter().map(|s| s.value).sum();
    shares
        .iter()
        .map(|s| ShareRow {
            category: s.category.clone(),
            value: format_number(s.value, 2),
            share: if total.abs() < f64::EPSILON {
                "-".to_string()
            } else {
                format!("{}%", format_number(s.value / total * 100.0, 1))
            },
        })
        .collect()
}

fn render_kpi_table(t: &KpiTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(t.columns.iter().cloned());
    for row in &t.rows {
        builder.push_record(row.iter().map(format_cell));
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Print one tab as markdown: scalar metrics first, then each chart/table
/// KPI under its own heading.
pub fn print_tab(dashboard: &Dashboard, tab: &Tab) {
    println!(
        "== {} ({} vs {}) ==\n",
        tab_label(tab),
        dashboard.period,
        dashboard.prior_period
    );
    if let Some(notice) = &tab.notice {
        println!("{}\n", notice);
    }
    for section in &tab.sections {
        println!("### {}\n", section.title);
        let metrics: Vec<MetricRow> = section
            .kpis
            .iter()
            .filter_map(|k| match &k.value {
                KpiValue::Metric(m) => Some(MetricRow {
                    tab: tab.title.clone(),
                    section: section.title.clone(),
                    kpi: k.name.clone(),
                    value: format_reading(m.reading),
                    delta: format_delta(m.delta),
                }),
                _ => None,
            })
            .collect();
        if !metrics.is_empty() {
            preview_table_rows(&metrics, metrics.len());
        }
        for k in &section.kpis {
            match &k.value {
                KpiValue::Metric(_) => {}
                KpiValue::Breakdown { shares } => {
                    println!("{}:", k.name);
                    let rows = share_rows(shares);
                    preview_table_rows(&rows, rows.len());
                }
                KpiValue::Comparison { groups } => {
                    println!("{}:", k.name);
                    let rows: Vec<ComparisonRow> = groups
                        .iter()
                        .map(|g| ComparisonRow {
                            group: g.group.clone(),
                            current: format_reading(g.current),
                            prior: format_reading(g.prior),
                        })
                        .collect();
                    preview_table_rows(&rows, rows.len());
                }
                KpiValue::Table(t) => {
                    println!("{}:", k.name);
                    if t.rows.is_empty() {
                        println!("(no rows)\n");
                    } else {
                        println!("{}\n", render_kpi_table(t));
                    }
                }
                KpiValue::Unavailable { reason } => {
                    println!("{}: unavailable ({})\n", k.name, reason);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Kpi, Metric, Section};

    fn dashboard() -> Dashboard {
        let metric = Metric {
            reading: Reading::Value(1234.5),
            delta: Delta::NoPriorData,
            current_rows: 2,
            prior_rows: 0,
        };
        Dashboard {
            period: "Feb".into(),
            prior_period: "Jan".into(),
            tabs: vec![Tab {
                title: "BU1".into(),
                selection: Some("Retail".into()),
                notice: None,
                sections: vec![Section {
                    title: "Financial".into(),
                    kpis: vec![
                        Kpi {
                            name: "Revenue".into(),
                            value: KpiValue::Metric(metric),
                        },
                        Kpi {
                            name: "Expense per BU".into(),
                            value: KpiValue::Breakdown { shares: vec![] },
                        },
                        Kpi {
                            name: "Usage %".into(),
                            value: KpiValue::Unavailable {
                                reason: "unknown column 'Usage'".into(),
                            },
                        },
                    ],
                }],
            }],
        }
    }

    #[test]
    fn test_format_reading_and_delta() {
        assert_eq!(format_reading(Reading::NoData), "no data");
        assert_eq!(format_reading(Reading::Value(1234.5)), "1,234.50");
        assert_eq!(format_delta(Delta::Change(-2.0)), "-2.00");
        assert_eq!(format_delta(Delta::NoPriorData), "no prior data");
        assert_eq!(format_delta(Delta::NoCurrentData), "no current data");
    }

    #[test]
    fn test_metric_rows_skip_charts_keep_unavailable() {
        let rows = metric_rows(&dashboard());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tab, "BU1 / Retail");
        assert_eq!(rows[0].value, "1,234.50");
        assert_eq!(rows[0].delta, "no prior data");
        assert!(rows[1].value.starts_with("unavailable"));
    }

    #[test]
    fn test_share_rows_percentages() {
        let rows = share_rows(&[
            Share { category: "A".into(), value: 150.0 },
            Share { category: "B".into(), value: 50.0 },
        ]);
        assert_eq!(rows[0].share, "75.0%");
        assert_eq!(rows[1].share, "25.0%");
    }

    #[test]
    fn test_exports_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("dashboard.json");
        let csv_path = dir.path().join("metrics.csv");
        let dash = dashboard();
        write_json(&json_path, &dash).unwrap();
        write_csv(&csv_path, &metric_rows(&dash)).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        let kpi = &json["tabs"][0]["sections"][0]["kpis"][0]["value"];
        assert_eq!(kpi["kind"], "metric");
        assert_eq!(kpi["reading"]["status"], "value");
        assert_eq!(kpi["delta"]["status"], "no_prior_data");

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("Tab,Section,Kpi,Value,Delta"));
        assert!(csv.contains("no prior data"));
    }

    #[test]
    fn test_render_kpi_table() {
        let t = KpiTable {
            columns: vec!["BU".into(), "MP_Gap".into()],
            rows: vec![vec![Cell::Text("BU1".into()), Cell::Number(-2.0)]],
        };
        let out = render_kpi_table(&t);
        assert!(out.contains("MP_Gap"));
        assert!(out.contains("-2.00"));
    }
}
