//! Meridian CLI — financial and HR analytics pipelines.
//!
//! Commands:
//! - `financial` — prices, ARIMA forecasts, Monte Carlo risk
//! - `hr` — attrition, drivers, pay gap, diversity, classifier
//! - `all` — both pipelines, concurrently
//! - `cache status` — report the cached price matrix
//! - `cache clean` — delete the price cache to force a refresh
//!
//! Logging goes to stderr and is filtered by `MERIDIAN_LOG` (default `info`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use meridian_core::data::{PriceCache, PriceProvider, YahooProvider};
use meridian_core::forecast::TickerOutcome;
use meridian_runner::{
    dataset_hash, run_financial, run_hr, ConfigOverrides, FinancialOutcome, HrOutcome,
    LoadOptions, PipelineConfig, RunLog,
};

#[derive(Parser)]
#[command(
    name = "meridian",
    about = "Meridian CLI — forecasting, portfolio risk and HR analytics"
)]
struct Cli {
    /// Path to the TOML config file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "meridian.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the financial pipeline.
    Financial(FinancialArgs),
    /// Run the HR pipeline.
    Hr(HrArgs),
    /// Run both pipelines concurrently.
    All {
        #[command(flatten)]
        financial: FinancialArgs,
        #[command(flatten)]
        hr: HrArgs,
    },
    /// Price cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Clone, Default)]
struct FinancialArgs {
    /// Offline mode: never contact the price source.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Number of Monte Carlo trajectories.
    #[arg(long)]
    n_simulations: Option<usize>,

    /// Ignore the price cache and acquire fresh prices.
    #[arg(long, default_value_t = false)]
    refresh: bool,

    /// End of the price history window (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<String>,
}

#[derive(Args, Clone, Default)]
struct HrArgs {
    /// Employee CSV file.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Restrict the analysis to these departments (repeatable).
    #[arg(long = "department")]
    departments: Vec<String>,

    /// Restrict the analysis to these genders (repeatable).
    #[arg(long = "gender")]
    genders: Vec<String>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report the cached tickers, rows and date range.
    Status,
    /// Delete the price cache.
    Clean,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Financial(args) => {
            let config = load_config(&cli.config, &args, &HrArgs::default())?;
            let outcome = financial(&config, &args)?;
            print_financial(&outcome);
            Ok(())
        }
        Commands::Hr(args) => {
            let config = load_config(&cli.config, &FinancialArgs::default(), &args)?;
            let outcome = run_hr(&config, &run_log(&config))?;
            print_hr(&outcome);
            Ok(())
        }
        Commands::All { financial: fin_args, hr: hr_args } => {
            let config = load_config(&cli.config, &fin_args, &hr_args)?;
            let log = run_log(&config);
            let (fin, hr) = rayon::join(
                || financial(&config, &fin_args),
                || run_hr(&config, &log),
            );
            report_all(fin, hr)
        }
        Commands::Cache { action } => {
            let config = PipelineConfig::load_or_default(&cli.config)?;
            let cache = PriceCache::new(config.paths.price_cache());
            match action {
                CacheAction::Status => cache_status(&cache),
                CacheAction::Clean => cache_clean(&cache),
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MERIDIAN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &std::path::Path, fin: &FinancialArgs, hr: &HrArgs) -> Result<PipelineConfig> {
    let overrides = ConfigOverrides {
        n_simulations: fin.n_simulations,
        offline: fin.offline,
        hr_source: hr.source.clone(),
        departments: hr.departments.clone(),
        genders: hr.genders.clone(),
    };
    let config = PipelineConfig::load_or_default(path)
        .with_context(|| format!("load config {}", path.display()))?
        .with_overrides(&overrides)?;
    Ok(config)
}

fn run_log(config: &PipelineConfig) -> RunLog {
    RunLog::new(&config.paths.log_file)
}

fn financial(config: &PipelineConfig, args: &FinancialArgs) -> Result<FinancialOutcome> {
    let as_of = match &args.as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of date '{s}'"))?,
        None => chrono::Local::now().date_naive(),
    };

    let yahoo = if config.financial.offline {
        None
    } else {
        match YahooProvider::new() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "price provider unavailable, continuing offline");
                None
            }
        }
    };
    let provider = yahoo.as_ref().map(|p| p as &dyn PriceProvider);

    run_financial(
        config,
        provider,
        as_of,
        LoadOptions {
            force_refresh: args.refresh,
        },
        &run_log(config),
    )
}

fn report_all(fin: Result<FinancialOutcome>, hr: Result<HrOutcome>) -> Result<()> {
    let mut failures = Vec::new();
    match fin {
        Ok(outcome) => print_financial(&outcome),
        Err(e) => {
            eprintln!("Financial pipeline failed: {e:#}");
            failures.push("financial");
        }
    }
    match hr {
        Ok(outcome) => print_hr(&outcome),
        Err(e) => {
            eprintln!("HR pipeline failed: {e:#}");
            failures.push("hr");
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("pipelines failed: {}", failures.join(", "))
    }
}

// ─── Output ──────────────────────────────────────────────────────────

fn print_financial(outcome: &FinancialOutcome) {
    println!();
    println!("=== Financial ===");
    println!(
        "Prices:    {} ({} rows, hash {})",
        outcome.source.label(),
        outcome.prices.len(),
        &outcome.dataset_hash[..12.min(outcome.dataset_hash.len())]
    );
    println!();
    println!("{:<8} {:<10} {:>12} {:>12} {:>10}", "Ticker", "Order", "Last", "Forecast", "Return");
    println!("{}", "-".repeat(56));
    for t in &outcome.forecast.tickers {
        match &t.outcome {
            TickerOutcome::Forecast { order, .. } => {
                if let Some(r) = outcome.forecast.returns.iter().find(|r| r.ticker == t.ticker) {
                    println!(
                        "{:<8} {:<10} {:>12.2} {:>12.2} {:>9.2}%",
                        t.ticker,
                        order.to_string(),
                        r.last_price,
                        r.final_forecast,
                        r.return_pct
                    );
                }
            }
            TickerOutcome::Skipped(reason) => {
                println!("{:<8} skipped: {reason:?}", t.ticker);
            }
        }
    }
    println!();
    match &outcome.risk {
        Ok((_, sim)) => println!("{}", sim.metrics.summary_line()),
        Err(e) => println!("Monte Carlo failed: {e}"),
    }
    for f in &outcome.files {
        println!("  wrote {}", f.display());
    }
}

fn print_hr(outcome: &HrOutcome) {
    let r = &outcome.report;
    println!();
    println!("=== HR ===");
    println!("Employees: {} analyzed of {} loaded", r.employees, outcome.employees_loaded);
    if let Some(rate) = r.global_attrition_rate {
        println!("Attrition: {:.1}%", rate * 100.0);
    }
    if !r.drivers.is_empty() {
        println!();
        println!("{:<28} {:>10} {:>10}", "Driver", "Spearman", "p-value");
        println!("{}", "-".repeat(50));
        for d in r.drivers.iter().take(10) {
            println!("{:<28} {:>+10.4} {:>10.4}", d.feature, d.spearman_r, d.p_value);
        }
    }
    if let Some(g) = r.pay_gap.as_ref().and_then(|g| g.global.as_ref()) {
        println!();
        println!(
            "Pay gap:   {:.1}% (t={:.3}, p={:.4}, {})",
            g.gap_pct,
            g.t_statistic,
            g.p_value,
            if g.significant { "significant" } else { "not significant" }
        );
    }
    if let Some(m) = &r.model {
        println!(
            "Classifier: accuracy={:.3} precision={:.3} recall={:.3} f1={:.3}",
            m.metrics.accuracy, m.metrics.precision, m.metrics.recall, m.metrics.f1
        );
    }
    for f in &outcome.files {
        println!("  wrote {}", f.display());
    }
}

// ─── Cache ───────────────────────────────────────────────────────────

fn cache_status(cache: &PriceCache) -> Result<()> {
    if !cache.exists() {
        println!("No price cache at {}", cache.path().display());
        return Ok(());
    }
    let matrix = cache
        .load()
        .with_context(|| format!("read cache {}", cache.path().display()))?;
    let size = std::fs::metadata(cache.path())
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Cache:   {}", cache.path().display());
    println!("Tickers: {}", matrix.tickers().join(", "));
    println!("Rows:    {}", matrix.len());
    if let (Some(first), Some(last)) = (matrix.dates().first(), matrix.last_date()) {
        println!("Range:   {first} to {last}");
    }
    println!("Size:    {size} bytes");
    println!("Hash:    {}", dataset_hash(&matrix));
    Ok(())
}

fn cache_clean(cache: &PriceCache) -> Result<()> {
    let removed = cache
        .clear()
        .with_context(|| format!("remove cache {}", cache.path().display()))?;
    if removed {
        println!("Removed {}", cache.path().display());
    } else {
        println!("No price cache at {}", cache.path().display());
    }
    Ok(())
}
