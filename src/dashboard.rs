//! Assembles the dashboard tabs from the two loaded tables.
//!
//! Each KPI is computed on its own; a failing KPI becomes
//! `KpiValue::Unavailable` and its siblings still render.
use tracing::{info, warn};

use crate::config::{DashboardConfig, DetailColumns, OverallColumns};
use crate::error::KpiResult;
use crate::kpi::{
    breakdown, grouped_mean_comparison, mean_metric, project, sum_metric, with_gap_column,
};
use crate::loader::Dataset;
use crate::selector::{distinct_values, filter_eq, select_window, MonthWindow, Slice};
use crate::types::{Dashboard, Kpi, KpiValue, Metric, Section, Share, Tab, Table};

pub const GAP_COLUMN: &str = "MP_Gap";
pub const PLACEHOLDER_NOTICE: &str = "Data not yet available.";

/// The compared pair of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periods {
    pub current: MonthWindow,
    pub prior: MonthWindow,
}

impl Periods {
    pub fn from_config(config: &DashboardConfig) -> KpiResult<Self> {
        let current = match (config.year_bound, config.year) {
            (true, Some(year)) => MonthWindow::in_year(year, config.current_month)?,
            _ => MonthWindow::any_year(config.current_month)?,
        };
        Ok(Periods {
            current,
            prior: current.previous(),
        })
    }
}

fn kpi(name: &str, result: KpiResult<KpiValue>) -> Kpi {
    let value = result.unwrap_or_else(|e| {
        warn!(kpi = name, error = %e, "KPI unavailable");
        KpiValue::Unavailable {
            reason: e.to_string(),
        }
    });
    Kpi {
        name: name.to_string(),
        value,
    }
}

fn metric(result: KpiResult<Metric>) -> KpiResult<KpiValue> {
    result.map(KpiValue::Metric)
}

fn shares(result: KpiResult<Vec<Share>>) -> KpiResult<KpiValue> {
    result.map(|shares| KpiValue::Breakdown { shares })
}

fn month_slices<'a>(table: &'a Table, periods: &Periods) -> KpiResult<(Slice<'a>, Slice<'a>)> {
    let current = select_window(table, &table.date_column, periods.current)?;
    let prior = select_window(table, &table.date_column, periods.prior)?;
    Ok((current, prior))
}

fn unavailable_tab(title: &str, selection: Option<String>, reason: String) -> Tab {
    Tab {
        title: title.to_string(),
        selection,
        notice: Some(reason),
        sections: Vec::new(),
    }
}

/// Overall BU tab: one row per business unit, all units side by side.
pub fn overall_tab(table: &Table, cols: &OverallColumns, periods: &Periods) -> Tab {
    let (cur, prev) = match month_slices(table, periods) {
        Ok(pair) => pair,
        Err(e) => return unavailable_tab("Overall BU", None, e.to_string()),
    };
    let bu = cols.business_unit.as_str();

    let financial = Section {
        title: "Financial".into(),
        kpis: vec![
            kpi("Expense per BU", shares(breakdown(&cur, bu, &cols.expense))),
            kpi("Avg Usage %", metric(mean_metric(&cur, &prev, &cols.usage))),
            kpi("Total Revenue", metric(sum_metric(&cur, &prev, &cols.revenue))),
            kpi("Total Profit", metric(sum_metric(&cur, &prev, &cols.profit))),
        ],
    };
    let customer = Section {
        title: "Customer n Service".into(),
        kpis: vec![
            kpi("# of Customers", shares(breakdown(&cur, bu, &cols.customers))),
            kpi(
                "Avg Satisfaction",
                metric(mean_metric(&cur, &prev, &cols.satisfaction)),
            ),
            kpi(
                "Satisfaction per BU",
                grouped_mean_comparison(&cur, &prev, bu, &cols.satisfaction)
                    .map(|groups| KpiValue::Comparison { groups }),
            ),
        ],
    };
    let quality = Section {
        title: "Quality".into(),
        kpis: vec![
            kpi(
                "Target vs Real Quality",
                project(&cur, &[bu, cols.target_vs_real.as_str()]).map(KpiValue::Table),
            ),
            kpi("Avg Velocity", metric(mean_metric(&cur, &prev, &cols.velocity))),
            kpi("Avg Quality", metric(mean_metric(&cur, &prev, &cols.quality))),
        ],
    };
    let employee = Section {
        title: "Employee".into(),
        kpis: vec![
            kpi(
                "Manpower",
                with_gap_column(
                    &cur,
                    &[bu, cols.current_mp.as_str(), cols.needed_mp.as_str()],
                    &cols.needed_mp,
                    &cols.current_mp,
                    GAP_COLUMN,
                )
                .map(KpiValue::Table),
            ),
            kpi("Competency", shares(breakdown(&cur, bu, &cols.competency))),
            kpi(
                "Average Competency",
                metric(mean_metric(&cur, &prev, &cols.competency)),
            ),
            kpi("Turnover Ratio", metric(mean_metric(&cur, &prev, &cols.turnover))),
        ],
    };

    Tab {
        title: "Overall BU".into(),
        selection: None,
        notice: None,
        sections: vec![financial, customer, quality, employee],
    }
}

/// Sub-divisions offered by the BU1 selector, over the whole table.
pub fn subdivisions(table: &Table, cols: &DetailColumns) -> KpiResult<Vec<String>> {
    Ok(distinct_values(&Slice::all(table), &cols.subdivision)?
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// BU1 tab for one sub-division; KPIs are broken down by product.
pub fn detail_tab(table: &Table, cols: &DetailColumns, periods: &Periods, subdiv: &str) -> Tab {
    let title = "BU1";
    let selection = Some(subdiv.to_string());
    let slices = month_slices(table, periods).and_then(|(cur, prev)| {
        Ok((
            filter_eq(&cur, &cols.subdivision, subdiv)?,
            filter_eq(&prev, &cols.subdivision, subdiv)?,
        ))
    });
    let (cur, prev) = match slices {
        Ok(pair) => pair,
        Err(e) => return unavailable_tab(title, selection, e.to_string()),
    };
    let product = cols.product.as_str();

    let financial = Section {
        title: "Financial".into(),
        kpis: vec![
            kpi(
                "Budget vs Expense",
                project(&cur, &[product, cols.budget.as_str(), cols.expense.as_str()])
                    .map(KpiValue::Table),
            ),
            kpi("Usage %", metric(mean_metric(&cur, &prev, &cols.usage))),
            kpi("Revenue", metric(sum_metric(&cur, &prev, &cols.revenue))),
            kpi("Profit", metric(sum_metric(&cur, &prev, &cols.profit))),
        ],
    };
    let customer = Section {
        title: "Customer".into(),
        kpis: vec![
            kpi(
                "Customers per Product",
                shares(breakdown(&cur, product, &cols.customers)),
            ),
            kpi("Total Customer", metric(sum_metric(&cur, &prev, &cols.customers))),
            kpi(
                "Satisfaction per Product",
                grouped_mean_comparison(&cur, &prev, product, &cols.satisfaction)
                    .map(|groups| KpiValue::Comparison { groups }),
            ),
        ],
    };
    let quality = Section {
        title: "Quality".into(),
        kpis: vec![
            kpi(
                "Target vs Real",
                project(
                    &cur,
                    &[
                        cols.target.as_str(),
                        cols.realization.as_str(),
                        cols.target_vs_real.as_str(),
                    ],
                )
                .map(KpiValue::Table),
            ),
            kpi("Velocity", metric(mean_metric(&cur, &prev, &cols.velocity))),
            kpi("Quality", metric(mean_metric(&cur, &prev, &cols.quality))),
        ],
    };
    let employee = Section {
        title: "Employee".into(),
        kpis: vec![
            kpi(
                "Manpower",
                with_gap_column(
                    &cur,
                    &[cols.current_mp.as_str(), cols.needed_mp.as_str()],
                    &cols.needed_mp,
                    &cols.current_mp,
                    GAP_COLUMN,
                )
                .map(KpiValue::Table),
            ),
            kpi("Competency", shares(breakdown(&cur, product, &cols.competency))),
            kpi(
                "Average Competency",
                metric(mean_metric(&cur, &prev, &cols.competency)),
            ),
            kpi("Turnover Ratio", metric(mean_metric(&cur, &prev, &cols.turnover))),
        ],
    };

    Tab {
        title: title.into(),
        selection,
        notice: None,
        sections: vec![financial, customer, quality, employee],
    }
}

/// BU2 and BU3 have no data source yet.
pub fn placeholder_tab(title: &str) -> Tab {
    Tab {
        title: title.to_string(),
        selection: None,
        notice: Some(PLACEHOLDER_NOTICE.to_string()),
        sections: Vec::new(),
    }
}

/// Full dashboard: Overall BU, one BU1 tab per requested sub-division,
/// then the BU2/BU3 placeholders.
pub fn build_dashboard(
    data: &Dataset,
    config: &DashboardConfig,
    subdivs: &[String],
) -> KpiResult<Dashboard> {
    let periods = Periods::from_config(config)?;
    info!(
        current = %periods.current,
        prior = %periods.prior,
        subdivs = subdivs.len(),
        "building dashboard"
    );
    let mut tabs = vec![overall_tab(&data.overall, &config.overall, &periods)];
    for subdiv in subdivs {
        tabs.push(detail_tab(&data.detail, &config.detail, &periods, subdiv));
    }
    tabs.push(placeholder_tab("BU2"));
    tabs.push(placeholder_tab("BU3"));
    Ok(Dashboard {
        period: periods.current.to_string(),
        prior_period: periods.prior.to_string(),
        tabs,
    })
}
