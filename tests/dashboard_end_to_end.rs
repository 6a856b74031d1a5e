//! Loads both tables from disk and builds the full dashboard, the same path
//! the binary takes in `--batch` mode.

use std::fs;
use std::path::Path;

use kpi_dashboard::config::DashboardConfig;
use kpi_dashboard::dashboard::{build_dashboard, subdivisions};
use kpi_dashboard::error::LoadError;
use kpi_dashboard::loader::load_dataset;
use kpi_dashboard::output::metric_rows;
use kpi_dashboard::types::{Delta, KpiValue, Reading};

const OVERALL: &str = "\
BU,Bulan Quality,Expense Finance,Usage Finance,Revenue Finance,Profit Finance,#of customer Customer,Customer satisfaction Customer,Target vs Real Quality,Velocity Quality,Quality,Current MP Employee,Needed MP Employee,Competency Employee,Turnover ratio Employee
BU1,15/01/2024,90,50,500,100,40,3.0,70%,5,70,8,10,60,0.30
BU1,10/01/2025,100,70,1000,200,50,4.0,90%,8,85,10,12,80,0.10
BU1,10/02/2025,120,75,1100,250,55,4.2,95%,9,88,11,12,82,0.05
BU2,10/02/2025,130,65,1600,320,75,3.9,85%,6,82,20,22,70,0.15
";

const DETAIL: &str = "\
Bulan,Subdiv,Produk,Budget,Expense,Usage,Revenue,Profit,#of customer,Customer satisfaction,Target,Realization,Target vs Real,Velocity,Quality,Current MP,Needed MP,Competency,Turnover ratio
05/01/2025,Retail,Kartu,500,400,80,900,100,30,4.1,100,90,90%,7,80,5,6,70,0.1
05/02/2025,Retail,Kartu,500,450,90,950,120,35,4.3,100,95,95%,8,85,5,7,72,0.1
";

fn write_inputs(dir: &Path) -> DashboardConfig {
    let overall = dir.join("Overall_BU.csv");
    let detail = dir.join("BU1.csv");
    fs::write(&overall, OVERALL).unwrap();
    fs::write(&detail, DETAIL).unwrap();
    DashboardConfig {
        overall_path: overall,
        detail_path: detail,
        ..DashboardConfig::default()
    }
}

fn revenue(config: &DashboardConfig) -> (Reading, Delta) {
    let (data, _) = load_dataset(config).unwrap();
    let dash = build_dashboard(&data, config, &[]).unwrap();
    let tab = &dash.tabs[0];
    match tab.section("Financial").and_then(|s| s.kpi("Total Revenue")) {
        Some(KpiValue::Metric(m)) => (m.reading, m.delta),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn month_only_selection_mixes_years() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());
    // January 2024 and January 2025 both count as the prior month
    let (reading, delta) = revenue(&config);
    assert_eq!(reading, Reading::Value(2700.0));
    assert_eq!(delta, Delta::Change(1200.0));
}

#[test]
fn year_bound_selection_ignores_other_years() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path());
    config.year_bound = true;
    config.year = Some(2025);
    let (reading, delta) = revenue(&config);
    assert_eq!(reading, Reading::Value(2700.0));
    assert_eq!(delta, Delta::Change(1700.0));
}

#[test]
fn full_dashboard_has_every_tab_and_flat_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());
    let (data, reports) = load_dataset(&config).unwrap();
    assert_eq!(reports.len(), 2);
    let subdivs = subdivisions(&data.detail, &config.detail).unwrap();
    let dash = build_dashboard(&data, &config, &subdivs).unwrap();
    assert_eq!(dash.tabs.len(), 4);

    let rows = metric_rows(&dash);
    let retail_revenue = rows
        .iter()
        .find(|r| r.tab == "BU1 / Retail" && r.kpi == "Revenue")
        .unwrap();
    assert_eq!(retail_revenue.value, "950.00");
    assert_eq!(retail_revenue.delta, "+50.00");
}

#[test]
fn missing_required_column_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());
    fs::write(&config.detail_path, "Bulan,Subdiv\n05/02/2025,Retail\n").unwrap();
    match load_dataset(&config) {
        Err(LoadError::MissingColumns { table, columns }) => {
            assert_eq!(table, "BU1");
            assert!(columns.contains(&"Produk".to_string()));
            assert!(columns.contains(&"Turnover ratio".to_string()));
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}
