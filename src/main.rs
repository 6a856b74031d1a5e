// Entry point and console flow.
//
// - `--batch` loads both tables, builds every tab and exports/prints them.
// - Otherwise an interactive menu loads the files once and then shows the
//   Overall BU tab, the BU1 tab for a chosen sub-division, or the BU2/BU3
//   placeholders until the user exits.
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kpi_dashboard::config::DashboardConfig;
use kpi_dashboard::dashboard::{
    build_dashboard, detail_tab, overall_tab, placeholder_tab, subdivisions, Periods,
};
use kpi_dashboard::loader::{self, Dataset};
use kpi_dashboard::types::{Dashboard, Tab};
use kpi_dashboard::{output, util};

#[derive(Parser, Debug)]
#[command(name = "kpi-dashboard")]
#[command(author, version, long_about = None)]
#[command(about = "Month-over-month KPI dashboard for business units")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML config file; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Aggregate table (one row per business unit per month)
    #[arg(long, value_name = "PATH", env = "KPI_OVERALL_CSV")]
    overall: Option<PathBuf>,

    /// BU1 detail table (one row per sub-division/product per month)
    #[arg(long, value_name = "PATH", env = "KPI_DETAIL_CSV")]
    detail: Option<PathBuf>,

    /// Current month (1-12); compared against the month before it
    #[arg(short, long)]
    month: Option<u32>,

    /// Year used with --year-bound
    #[arg(long)]
    year: Option<i32>,

    /// Only match rows of --year instead of that month in every year
    #[arg(long)]
    year_bound: bool,

    /// BU1 sub-division to show (batch mode defaults to all of them)
    #[arg(long, value_name = "NAME")]
    subdiv: Option<String>,

    /// Write the whole dashboard as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write scalar KPIs as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Build and print every tab without prompting
    #[arg(long)]
    batch: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(p) = &self.overall {
            config.overall_path = p.clone();
        }
        if let Some(p) = &self.detail {
            config.detail_path = p.clone();
        }
        if let Some(m) = self.month {
            config.current_month = m;
        }
        if self.year.is_some() {
            config.year = self.year;
        }
        if self.year_bound {
            config.year_bound = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Read a single line of input after printing `prompt`. `None` on EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn handle_load(config: &DashboardConfig) -> Option<Dataset> {
    match loader::load_dataset(config) {
        Ok((data, reports)) => {
            for r in &reports {
                let range = match (r.first_date, r.last_date) {
                    (Some(a), Some(b)) => {
                        format!("{} to {}", a.format("%d/%m/%Y"), b.format("%d/%m/%Y"))
                    }
                    _ => "-".to_string(),
                };
                println!(
                    "Loaded {}: {} rows, {} columns ({})",
                    r.table,
                    util::format_int(r.total_rows as u64),
                    r.columns,
                    range
                );
            }
            println!();
            Some(data)
        }
        Err(e) => {
            error!(error = %e, "load failed");
            eprintln!("Failed to load data: {}\n", e);
            None
        }
    }
}

/// Ask which BU1 sub-division to show; accepts a list number or a name.
fn prompt_subdiv(options: &[String]) -> Option<String> {
    if options.is_empty() {
        println!("No sub-divisions found in the detail table.\n");
        return None;
    }
    println!("Select Subdiv:");
    for (i, name) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, name);
    }
    let choice = read_line("Enter choice: ")?;
    let picked = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i).cloned())
        .or_else(|| options.iter().find(|o| **o == choice).cloned());
    if picked.is_none() {
        println!("Invalid choice.\n");
    }
    picked
}

fn single_tab_dashboard(periods: &Periods, tab: Tab) -> Dashboard {
    Dashboard {
        period: periods.current.to_string(),
        prior_period: periods.prior.to_string(),
        tabs: vec![tab],
    }
}

fn export(cli: &Cli, dash: &Dashboard) {
    if let Some(path) = &cli.json {
        match output::write_json(path, dash) {
            Ok(()) => println!("(Dashboard exported to {})", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
    if let Some(path) = &cli.csv {
        match output::write_csv(path, &output::metric_rows(dash)) {
            Ok(()) => println!("(Metrics exported to {})", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
}

fn run_batch(cli: &Cli, config: &DashboardConfig) -> Result<()> {
    let (data, reports) = loader::load_dataset(config).context("loading input tables")?;
    for r in &reports {
        info!(table = %r.table, rows = r.total_rows, "loaded");
    }
    let subdivs = match &cli.subdiv {
        Some(s) => vec![s.clone()],
        None => subdivisions(&data.detail, &config.detail)?,
    };
    let dash = build_dashboard(&data, config, &subdivs)?;
    for tab in &dash.tabs {
        output::print_tab(&dash, tab);
    }
    export(cli, &dash);
    Ok(())
}

fn run_interactive(cli: &Cli, config: &DashboardConfig) -> Result<()> {
    let periods = Periods::from_config(config)?;
    let mut data: Option<Dataset> = None;
    loop {
        println!("KPI Dashboard ({} vs {})", periods.current, periods.prior);
        println!("[1] Load the files");
        println!("[2] Overall BU");
        println!("[3] BU1");
        println!("[4] BU2");
        println!("[5] BU3");
        println!("[0] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else {
            return Ok(());
        };
        println!();
        let tab = match choice.as_str() {
            "1" => {
                if let Some(d) = handle_load(config) {
                    data = Some(d);
                }
                continue;
            }
            "2" | "3" => {
                let Some(d) = &data else {
                    println!("Error: No data loaded. Please load the files first (option 1).\n");
                    continue;
                };
                if choice == "2" {
                    overall_tab(&d.overall, &config.overall, &periods)
                } else {
                    let options = subdivisions(&d.detail, &config.detail)?;
                    let picked = match &cli.subdiv {
                        Some(s) => Some(s.clone()),
                        None => prompt_subdiv(&options),
                    };
                    let Some(subdiv) = picked else { continue };
                    detail_tab(&d.detail, &config.detail, &periods, &subdiv)
                }
            }
            "4" => placeholder_tab("BU2"),
            "5" => placeholder_tab("BU3"),
            "0" => {
                println!("Exiting the program.");
                return Ok(());
            }
            _ => {
                println!("Invalid choice. Please enter 0-5.\n");
                continue;
            }
        };
        let dash = single_tab_dashboard(&periods, tab);
        output::print_tab(&dash, &dash.tabs[0]);
        export(cli, &dash);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = cli.resolve_config().context("resolving configuration")?;
    if cli.batch {
        run_batch(&cli, &config)
    } else {
        run_interactive(&cli, &config)
    }
}
