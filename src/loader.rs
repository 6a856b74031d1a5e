use crate::config::DashboardConfig;
use crate::error::LoadError;
use crate::types::{Record, Table};
use crate::util::parse_date_dayfirst;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: String,
    pub total_rows: usize,
    pub columns: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Both input tables, loaded once and only ever borrowed afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub overall: Table,
    pub detail: Table,
}

/// Describes one input table: its display name, date column and the columns
/// that must be present in the header.
pub struct TableSpec<'a> {
    pub name: &'a str,
    pub date_column: &'a str,
    pub required: Vec<&'a str>,
    pub date_formats: &'a [String],
}

pub fn load_dataset(config: &DashboardConfig) -> Result<(Dataset, Vec<LoadReport>), LoadError> {
    let overall_spec = TableSpec {
        name: "Overall BU",
        date_column: &config.overall.date,
        required: config.overall.required(),
        date_formats: &config.date_formats,
    };
    let (overall, r1) = load_table(&config.overall_path, &overall_spec)?;

    let detail_spec = TableSpec {
        name: "BU1",
        date_column: &config.detail.date,
        required: config.detail.required(),
        date_formats: &config.date_formats,
    };
    let (detail, r2) = load_table(&config.detail_path, &detail_spec)?;

    Ok((Dataset { overall, detail }, vec![r1, r2]))
}

pub fn load_table(path: &Path, spec: &TableSpec) -> Result<(Table, LoadReport), LoadError> {
    info!(table = spec.name, path = %path.display(), "loading table");
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_table_from_reader(BufReader::new(file), spec)
}

/// Core loading logic over any `Read` source; tests feed it strings.
///
/// Every date is parsed here, up front. A single unparseable date rejects the
/// whole table rather than dropping the row.
pub fn load_table_from_reader<R: Read>(
    reader: R,
    spec: &TableSpec,
) -> Result<(Table, LoadReport), LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        table: spec.name.to_string(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::EmptyFile {
            table: spec.name.to_string(),
        });
    }

    let missing: Vec<String> = spec
        .required
        .iter()
        .filter(|c| !headers.iter().any(|h| h.as_str() == **c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            table: spec.name.to_string(),
            columns: missing,
        });
    }
    let date_idx = headers
        .iter()
        .position(|h| h.as_str() == spec.date_column)
        .ok_or_else(|| LoadError::MissingColumns {
            table: spec.name.to_string(),
            columns: vec![spec.date_column.to_string()],
        })?;

    let mut rows: Vec<Record> = Vec::new();
    let mut raw = StringRecord::new();
    while rdr.read_record(&mut raw).map_err(csv_err)? {
        let row = rows.len() + 1;
        let value = raw.get(date_idx).unwrap_or("");
        let date = parse_date_dayfirst(value, spec.date_formats).ok_or_else(|| {
            LoadError::DateParse {
                table: spec.name.to_string(),
                column: spec.date_column.to_string(),
                row,
                value: value.to_string(),
            }
        })?;
        rows.push(Record {
            row,
            date,
            cells: raw.iter().map(str::to_string).collect(),
        });
    }
    if rows.is_empty() {
        warn!(table = spec.name, "table has a header but no data rows");
    }

    let report = LoadReport {
        table: spec.name.to_string(),
        total_rows: rows.len(),
        columns: headers.len(),
        first_date: rows.iter().map(|r| r.date).min(),
        last_date: rows.iter().map(|r| r.date).max(),
    };
    debug!(table = spec.name, rows = report.total_rows, "table loaded");
    Ok((Table::new(spec.name, headers, spec.date_column, rows), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn formats() -> Vec<String> {
        DashboardConfig::default().date_formats
    }

    fn spec<'a>(required: Vec<&'a str>, formats: &'a [String]) -> TableSpec<'a> {
        TableSpec {
            name: "test",
            date_column: "Bulan",
            required,
            date_formats: formats,
        }
    }

    #[test]
    fn test_load_parses_day_first() {
        let fmts = formats();
        let csv = "Bulan,Subdiv,Revenue\n05/02/2025,A,100\n01/01/2025,A,40\n";
        let (table, report) =
            load_table_from_reader(csv.as_bytes(), &spec(vec!["Bulan", "Revenue"], &fmts)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].date, NaiveDate::from_ymd_opt(2025, 2, 5).unwrap());
        assert_eq!(table.rows[0].row, 1);
        assert_eq!(table.rows[1].cells, vec!["01/01/2025", "A", "40"]);
        assert_eq!(report.first_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(report.last_date, NaiveDate::from_ymd_opt(2025, 2, 5));
        assert_eq!(report.columns, 3);
    }

    #[test]
    fn test_load_missing_columns_lists_all() {
        let fmts = formats();
        let csv = "Bulan,Subdiv\n05/02/2025,A\n";
        let err = load_table_from_reader(
            csv.as_bytes(),
            &spec(vec!["Bulan", "Revenue", "Profit"], &fmts),
        )
        .unwrap_err();
        match err {
            LoadError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["Revenue".to_string(), "Profit".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_bad_date_fails_whole_table() {
        let fmts = formats();
        let csv = "Bulan,Revenue\n05/02/2025,1\nsoon,2\n07/02/2025,3\n";
        let err = load_table_from_reader(csv.as_bytes(), &spec(vec!["Bulan"], &fmts)).unwrap_err();
        match err {
            LoadError::DateParse { row, value, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "soon");
                assert_eq!(column, "Bulan");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_headers_only_is_empty_table() {
        let fmts = formats();
        let (table, report) =
            load_table_from_reader("Bulan,Revenue\n".as_bytes(), &spec(vec!["Revenue"], &fmts))
                .unwrap();
        assert!(table.is_empty());
        assert!(table.has_column("Revenue"));
        assert_eq!(report.total_rows, 0);
        assert_eq!(report.first_date, None);

        let err = load_table_from_reader("".as_bytes(), &spec(vec![], &fmts)).unwrap_err();
        assert!(matches!(err, LoadError::EmptyFile { .. }));
    }

    #[test]
    fn test_load_accepts_dotted_and_iso_dates() {
        let fmts = formats();
        let csv = "Bulan,Revenue\n05.02.2025,1\n2025-02-05,2\n05-02-2025,3\n";
        let (table, _) = load_table_from_reader(csv.as_bytes(), &spec(vec![], &fmts)).unwrap();
        let feb5 = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.rows.iter().all(|r| r.date == feb5));
    }

    #[test]
    fn test_load_ragged_row_is_csv_error() {
        let fmts = formats();
        let csv = "Bulan,Revenue\n05/02/2025,1,extra\n";
        let err = load_table_from_reader(csv.as_bytes(), &spec(vec![], &fmts)).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn test_load_table_from_path_and_missing_file() {
        let fmts = formats();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Bulan,Revenue").unwrap();
        writeln!(file, "15/02/2025,10").unwrap();
        let (table, _) = load_table(file.path(), &spec(vec!["Revenue"], &fmts)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.date_column, "Bulan");

        let err = load_table(Path::new("/nonexistent/BU1.csv"), &spec(vec![], &fmts)).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
