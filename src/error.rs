use thiserror::Error;

/// Fatal errors raised while reading one of the input tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {table}: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: missing required columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("{table}: file is empty (no header row)")]
    EmptyFile { table: String },

    #[error("{table}: row {row}: cannot parse date '{value}' in column '{column}'")]
    DateParse {
        table: String,
        column: String,
        row: usize,
        value: String,
    },
}

/// Errors scoped to a single KPI computation. The dashboard turns these
/// into an "unavailable" value for that KPI only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KpiError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{column}', row {row}: '{value}' is not a number")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("month {0} is outside 1-12")]
    InvalidMonth(u32),

    #[error("'{requested}' is not the date column of this table (expected '{actual}')")]
    NotDateColumn { requested: String, actual: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type KpiResult<T> = Result<T, KpiError>;
