//! Starmart CLI - Command-line interface for the star-schema sales mart

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use starmart::config;
use starmart::loader::{Loader, populate_date_range};
use starmart::output;
use starmart::query::{AggregateQuery, QueryEngine};
use starmart::storage::MartStore;
use starmart::{GroupField, Measure, TotalsPolicy};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "starmart")]
#[command(version = "0.0.1")]
#[command(about = "Embedded star-schema sales mart - dimensional loading and aggregate queries")]
#[command(long_about = r#"
Starmart maintains a star schema on SQLite: four dimension tables (date,
customer, product, store) and one append-only sales fact table, with an
aggregate query surface over any subset of dimension attributes.

Example usage:
  starmart init
  starmart dates --start 2025-01-01 --end 2025-12-31
  starmart load --file sales.jsonl
  starmart query --group-by year,month --measures revenue,units
  starmart query --group-by category --measures revenue --where channel=online
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the star schema (idempotent)
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Drop and recreate all tables, discarding loaded data
        #[arg(short, long)]
        force: bool,
    },

    /// Populate the date dimension for a calendar range
    Dates {
        /// First date, inclusive (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,

        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(short, long)]
        end: NaiveDate,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Load dimension and fact records from a JSONL file
    Load {
        /// Path to the JSONL file
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Totals policy: enforce or trust
        #[arg(short, long)]
        policy: Option<TotalsPolicyArg>,
    },

    /// Run an aggregate query over the star
    Query {
        /// Comma-separated dimension attributes to group by
        /// (year, quarter, month, day_of_week, weekend, country, gender,
        /// age_band, customer, category, brand, product, region, channel, store)
        #[arg(short, long)]
        group_by: Option<String>,

        /// Comma-separated measures (revenue, units, orders, avg_unit_price)
        #[arg(short, long, default_value = "revenue")]
        measures: String,

        /// Equality filters, attribute=value (repeatable)
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show row counts for every star table
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TotalsPolicyArg {
    Enforce,
    Trust,
}

impl From<TotalsPolicyArg> for TotalsPolicy {
    fn from(arg: TotalsPolicyArg) -> Self {
        match arg {
            TotalsPolicyArg::Enforce => TotalsPolicy::Enforce,
            TotalsPolicyArg::Trust => TotalsPolicy::Trust,
        }
    }
}

/// Database path: explicit flag, then starmart.toml, then ./starmart.db
fn resolve_database(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(cfg) = config::load_config(None)? {
        if let Some(database) = cfg.database {
            return Ok(PathBuf::from(database));
        }
    }
    Ok(PathBuf::from("starmart.db"))
}

/// Totals policy: explicit flag, then starmart.toml, then Enforce
fn resolve_policy(flag: Option<TotalsPolicyArg>) -> anyhow::Result<TotalsPolicy> {
    if let Some(policy) = flag {
        return Ok(policy.into());
    }
    if let Some(cfg) = config::load_config(None)? {
        if let Some(policy) = cfg.totals_policy {
            return Ok(policy);
        }
    }
    Ok(TotalsPolicy::default())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { database, force } => {
            let database = resolve_database(database)?;
            config::ensure_db_dir(&database)?;

            let mut store = MartStore::open(&database)?;
            if force {
                println!("♻️  Dropping and recreating the star schema...");
                store.reset_schema()?;
            }

            let config_path = config::default_config_path();
            if !config_path.exists() {
                let cfg = config::MartConfig {
                    database: Some(database.display().to_string()),
                    totals_policy: None,
                };
                config::write_config(&config_path, &cfg, false)?;
                println!("📝 Wrote {:?}", config_path);
            }

            println!("✅ Star schema ready");
            println!("🗄️  Database: {:?}", database);
        }

        Commands::Dates { start, end, database } => {
            let database = resolve_database(database)?;
            let store = MartStore::open(&database)?;

            println!("📅 Populating date dimension: {} .. {}", start, end);
            let inserted = populate_date_range(&store, start, end)?;

            println!("✅ {} date rows inserted ({} total)", inserted, store.count_dates()?);
        }

        Commands::Load { file, database, policy } => {
            let database = resolve_database(database)?;
            let policy = resolve_policy(policy)?;
            let store = MartStore::open(&database)?;

            println!("🚚 Loading records from {:?} (totals policy: {})", file, policy);
            let loader = Loader::new(&store, policy);
            let report = loader.load_path(&file)?;

            println!("{}", report);
            if report.failed > 0 {
                println!("⚠️  {} records rejected; see the log for details.", report.failed);
            } else {
                println!("✅ Load complete!");
            }
        }

        Commands::Query { group_by, measures, filters, database, format } => {
            let database = resolve_database(database)?;
            let store = MartStore::open(&database)?;

            let mut query = AggregateQuery::new();
            if let Some(fields) = group_by {
                for field in fields.split(',') {
                    let parsed: GroupField = field.trim().parse()?;
                    query = query.group_by(parsed);
                }
            }
            for measure in measures.split(',') {
                let parsed: Measure = measure.trim().parse()?;
                query = query.measure(parsed);
            }
            for clause in &filters {
                let (field, value) = clause.split_once('=').ok_or_else(|| {
                    anyhow::anyhow!("filter must be attribute=value, got: {}", clause)
                })?;
                let parsed: GroupField = field.trim().parse()?;
                query = query.filter(parsed, value.trim());
            }

            let engine = QueryEngine::new(&store);
            let report = engine.run(&query)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_empty() {
                println!("∅ No matching facts.");
            } else {
                println!("{}", output::report_table(&report));
            }
        }

        Commands::Stats { database } => {
            let database = resolve_database(database)?;
            let store = MartStore::open(&database)?;
            let stats = store.stats()?;

            println!("📊 Starmart Statistics ({:?})", database);
            println!("{}", output::stats_table(&stats));
        }
    }

    Ok(())
}
