use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Column layout of the aggregate (one row per business unit) table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverallColumns {
    pub date: String,
    pub business_unit: String,
    pub expense: String,
    pub usage: String,
    pub revenue: String,
    pub profit: String,
    pub customers: String,
    pub satisfaction: String,
    pub target_vs_real: String,
    pub velocity: String,
    pub quality: String,
    pub current_mp: String,
    pub needed_mp: String,
    pub competency: String,
    pub turnover: String,
}

impl Default for OverallColumns {
    fn default() -> Self {
        OverallColumns {
            date: "Bulan Quality".into(),
            business_unit: "BU".into(),
            expense: "Expense Finance".into(),
            usage: "Usage Finance".into(),
            revenue: "Revenue Finance".into(),
            profit: "Profit Finance".into(),
            customers: "#of customer Customer".into(),
            satisfaction: "Customer satisfaction Customer".into(),
            target_vs_real: "Target vs Real Quality".into(),
            velocity: "Velocity Quality".into(),
            quality: "Quality".into(),
            current_mp: "Current MP Employee".into(),
            needed_mp: "Needed MP Employee".into(),
            competency: "Competency Employee".into(),
            turnover: "Turnover ratio Employee".into(),
        }
    }
}

impl OverallColumns {
    /// Every column a KPI of the Overall BU tab reads.
    pub fn required(&self) -> Vec<&str> {
        vec![
            self.date.as_str(),
            self.business_unit.as_str(),
            self.expense.as_str(),
            self.usage.as_str(),
            self.revenue.as_str(),
            self.profit.as_str(),
            self.customers.as_str(),
            self.satisfaction.as_str(),
            self.target_vs_real.as_str(),
            self.velocity.as_str(),
            self.quality.as_str(),
            self.current_mp.as_str(),
            self.needed_mp.as_str(),
            self.competency.as_str(),
            self.turnover.as_str(),
        ]
    }
}

/// Column layout of the BU1 detail (one row per sub-division/product) table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetailColumns {
    pub date: String,
    pub subdivision: String,
    pub product: String,
    pub budget: String,
    pub expense: String,
    pub usage: String,
    pub revenue: String,
    pub profit: String,
    pub customers: String,
    pub satisfaction: String,
    pub target: String,
    pub realization: String,
    pub target_vs_real: String,
    pub velocity: String,
    pub quality: String,
    pub current_mp: String,
    pub needed_mp: String,
    pub competency: String,
    pub turnover: String,
}

impl Default for DetailColumns {
    fn default() -> Self {
        DetailColumns {
            date: "Bulan".into(),
            subdivision: "Subdiv".into(),
            product: "Produk".into(),
            budget: "Budget".into(),
            expense: "Expense".into(),
            usage: "Usage".into(),
            revenue: "Revenue".into(),
            profit: "Profit".into(),
            customers: "#of customer".into(),
            satisfaction: "Customer satisfaction".into(),
            target: "Target".into(),
            realization: "Realization".into(),
            target_vs_real: "Target vs Real".into(),
            velocity: "Velocity".into(),
            quality: "Quality".into(),
            current_mp: "Current MP".into(),
            needed_mp: "Needed MP".into(),
            competency: "Competency".into(),
            turnover: "Turnover ratio".into(),
        }
    }
}

impl DetailColumns {
    pub fn required(&self) -> Vec<&str> {
        vec![
            self.date.as_str(),
            self.subdivision.as_str(),
            self.product.as_str(),
            self.budget.as_str(),
            self.expense.as_str(),
            self.usage.as_str(),
            self.revenue.as_str(),
            self.profit.as_str(),
            self.customers.as_str(),
            self.satisfaction.as_str(),
            self.target.as_str(),
            self.realization.as_str(),
            self.target_vs_real.as_str(),
            self.velocity.as_str(),
            self.quality.as_str(),
            self.current_mp.as_str(),
            self.needed_mp.as_str(),
            self.competency.as_str(),
            self.turnover.as_str(),
        ]
    }
}

/// Dashboard settings. Every field has a default matching the stock
/// `Overall_BU.csv` / `BU1.csv` exports, so an empty TOML file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub overall_path: PathBuf,
    pub detail_path: PathBuf,
    /// Month compared against the one before it.
    pub current_month: u32,
    /// Restrict selections to `year` as well as the month. Off by default:
    /// month-only selection matches rows of every year in the file.
    pub year_bound: bool,
    pub year: Option<i32>,
    /// Accepted date formats, tried in order. All are day-before-month.
    pub date_formats: Vec<String>,
    pub overall: OverallColumns,
    pub detail: DetailColumns,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            overall_path: PathBuf::from("Overall_BU.csv"),
            detail_path: PathBuf::from("BU1.csv"),
            current_month: 2,
            year_bound: false,
            year: None,
            date_formats: vec![
                "%d/%m/%Y".into(),
                "%d-%m-%Y".into(),
                "%d.%m.%Y".into(),
                "%Y-%m-%d".into(),
            ],
            overall: OverallColumns::default(),
            detail: DetailColumns::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=12).contains(&self.current_month) {
            return Err(ConfigError::Invalid(format!(
                "current_month must be 1-12, got {}",
                self.current_month
            )));
        }
        if self.year_bound && self.year.is_none() {
            return Err(ConfigError::Invalid(
                "year_bound is set but no year was given".into(),
            ));
        }
        if let Some(y) = self.year {
            // the prior month of January needs `y - 1` as a real date year
            let min = NaiveDate::MIN.year() + 1;
            let max = NaiveDate::MAX.year();
            if !(min..=max).contains(&y) {
                return Err(ConfigError::Invalid(format!(
                    "year must be within {min}..={max}, got {y}"
                )));
            }
        }
        if self.date_formats.is_empty() {
            return Err(ConfigError::Invalid("date_formats is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let cfg = DashboardConfig::from_toml_str("", "inline").unwrap();
        assert_eq!(cfg.current_month, 2);
        assert!(!cfg.year_bound);
        assert_eq!(cfg.overall.date, "Bulan Quality");
        assert_eq!(cfg.detail.date, "Bulan");
        assert_eq!(cfg.overall_path, PathBuf::from("Overall_BU.csv"));
    }

    #[test]
    fn test_partial_override() {
        let toml = r#"
            current_month = 3
            year_bound = true
            year = 2025
            detail_path = "data/bu1.csv"

            [detail]
            subdivision = "Sub Division"
        "#;
        let cfg = DashboardConfig::from_toml_str(toml, "inline").unwrap();
        assert_eq!(cfg.current_month, 3);
        assert_eq!(cfg.year, Some(2025));
        assert_eq!(cfg.detail.subdivision, "Sub Division");
        assert_eq!(cfg.detail.product, "Produk");
        assert_eq!(cfg.detail_path, PathBuf::from("data/bu1.csv"));
    }

    #[test]
    fn test_invalid_month_rejected() {
        let err = DashboardConfig::from_toml_str("current_month = 13", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_year_bound_needs_year() {
        let err = DashboardConfig::from_toml_str("year_bound = true", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_year_outside_date_range_rejected() {
        let err = DashboardConfig::from_toml_str("year = -2147483648", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = DashboardConfig::from_toml_str("year = 999999", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(DashboardConfig::from_toml_str("year = 2024", "inline").is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let err = DashboardConfig::from_toml_str("current_month = \"two\"", "x.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_required_columns_cover_key_and_date() {
        let cols = DetailColumns::default();
        let req = cols.required();
        assert!(req.contains(&"Bulan"));
        assert!(req.contains(&"Subdiv"));
        assert_eq!(req.len(), 19);
        assert_eq!(OverallColumns::default().required().len(), 15);
    }
}
