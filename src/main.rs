use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use fd_discovery::{
    AttributeUniverse, DataFrameSource, DiscoveryConfig, DiscoveryReport, DiscoveryRun,
    SqliteSource, Strategy, TabularDataSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Naive,
    Refinement,
    /// Run both strategies and compare their covers
    Both,
}

#[derive(Parser)]
#[command(name = "fd-discovery")]
#[command(about = "Discover minimal functional dependencies in a relation")]
struct Args {
    /// CSV file with a header row
    #[arg(long, conflicts_with = "sqlite")]
    csv: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Table to read from the SQLite database
    #[arg(long, default_value = "normalization")]
    table: String,

    /// Surrogate key column (default: generated index for CSV, rowid for SQLite)
    #[arg(long)]
    row_id: Option<String>,

    /// Comma-separated attribute universe (default: every non-key column)
    #[arg(long, value_delimiter = ',')]
    attributes: Vec<String>,

    /// Validation strategy (or set FD_STRATEGY)
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Largest left-hand side to test (or set FD_MAX_ARITY)
    #[arg(long)]
    max_arity: Option<usize>,

    /// Worker pool size (or set FD_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = DiscoveryConfig::from_env()?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.max_arity.is_some() {
        config.max_arity = args.max_arity;
    }
    let strategies = match args.strategy {
        Some(StrategyArg::Naive) => vec![Strategy::Naive],
        Some(StrategyArg::Refinement) => vec![Strategy::Refinement],
        Some(StrategyArg::Both) => vec![Strategy::Naive, Strategy::Refinement],
        None => vec![config.strategy],
    };

    let (source, columns): (Arc<dyn TabularDataSource>, Vec<String>) =
        match (&args.csv, &args.sqlite) {
            (Some(path), None) => {
                let source = DataFrameSource::from_csv(path, args.row_id.as_deref())?;
                let columns = source.attribute_columns();
                let source: Arc<dyn TabularDataSource> = Arc::new(source);
                (source, columns)
            }
            (None, Some(path)) => {
                let source = SqliteSource::open(path, &args.table, args.row_id.as_deref())?;
                let columns = source.columns()?;
                let source: Arc<dyn TabularDataSource> = Arc::new(source);
                (source, columns)
            }
            _ => bail!("Specify exactly one of --csv or --sqlite"),
        };

    let universe = if args.attributes.is_empty() {
        AttributeUniverse::new(columns)?
    } else {
        AttributeUniverse::new(args.attributes.clone())?
    };
    info!("Attribute universe: {} attributes", universe.len());

    let mut reports = Vec::new();
    for strategy in strategies {
        let run = DiscoveryRun::new(
            Arc::clone(&source),
            universe.clone(),
            config.clone().with_strategy(strategy),
        )?;
        let report = if config.workers > 1 {
            run.run_parallel().await?
        } else {
            run.run()?
        };
        print_report(&report, args.json)?;
        reports.push(report);
    }

    if let [first, second] = reports.as_slice() {
        if first.max_arity != second.max_arity {
            info!(
                "Strategies ran with different arity bounds ({} vs {}); \
                 covers are only comparable up to the smaller one",
                first.max_arity, second.max_arity
            );
        } else if first.same_cover(second) {
            info!("Both strategies produced the same cover");
        } else {
            error!("Strategies disagree on the dependency cover");
            bail!("naive and refinement strategies produced different covers");
        }
    }

    Ok(())
}

fn print_report(report: &DiscoveryReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("\n=== {} (max arity {}) ===", report.strategy, report.max_arity);
        print!("{}", report);
        println!(
            "--- {:.3} seconds for {} ---",
            report.elapsed_secs(),
            report.strategy
        );
    }
    Ok(())
}
