use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use proxy_checker::{
    init_logger,
    proxy::{Candidate, GeoLocator, GeoNodeSource, Progress, ProxyParser, Summary, ValidationEngine},
    report,
    tui::ValidationDashboard,
    AppConfig, EngineError, ValidationResult,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Fetch, validate and rank HTTP/HTTPS proxies
#[derive(Parser)]
#[command(name = "proxy-checker")]
#[command(about = "Fetch, validate and rank HTTP/HTTPS proxies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxies listed in a file (one per line)
    Check {
        /// Input file containing proxies
        input: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Fetch proxies from the GeoNode listing API and check them
    Fetch {
        /// Number of pages to fetch
        #[arg(short, long)]
        pages: Option<usize>,
        /// Proxies requested per page
        #[arg(long)]
        limit: Option<usize>,
        /// Listing API endpoint
        #[arg(long)]
        base_url: Option<String>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Output file for the full results log
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output file for working proxies in IP:PORT format
    #[arg(long)]
    working_file: Option<PathBuf>,
    /// Output file for the fastest proxies table
    #[arg(long)]
    fastest_file: Option<PathBuf>,
    /// Also write results as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,
    /// Timeout in seconds for each probe
    #[arg(short, long)]
    timeout: Option<u64>,
    /// Number of concurrent probes
    #[arg(short, long)]
    workers: Option<usize>,
    /// Number of fastest proxies to display
    #[arg(long)]
    top: Option<usize>,
    /// Liveness endpoint for HTTP probes
    #[arg(long)]
    http_url: Option<String>,
    /// Liveness endpoint for HTTPS probes
    #[arg(long)]
    https_url: Option<String>,
    /// MaxMind database used to fill in missing countries
    #[arg(long)]
    mmdb: Option<PathBuf>,
    /// Show the interactive dashboard while checking
    #[arg(long)]
    tui: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.output {
            config.output.results_file = path.clone();
        }
        if let Some(path) = &self.working_file {
            config.output.working_file = path.clone();
        }
        if let Some(path) = &self.fastest_file {
            config.output.fastest_file = path.clone();
        }
        if let Some(path) = &self.json {
            config.output.json_file = Some(path.clone());
        }
        if let Some(timeout) = self.timeout {
            config.checker.timeout_secs = timeout;
        }
        if let Some(workers) = self.workers {
            config.checker.workers = workers;
        }
        if let Some(top) = self.top {
            config.checker.top = top;
        }
        if let Some(url) = &self.http_url {
            config.checker.http_url = url.clone();
        }
        if let Some(url) = &self.https_url {
            config.checker.https_url = url.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let use_tui = matches!(
        &cli.command,
        Commands::Check { run, .. } | Commands::Fetch { run, .. } if run.tui
    );
    // Keep log lines off the alternate screen while the dashboard is up
    init_logger(if use_tui {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    });

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::PrintConfig => {
            print!("{}", config.to_toml()?);
        }
        Commands::Check { input, run } => {
            run.apply(&mut config);
            config.validate()?;

            let candidates = ProxyParser::parse_file(&input)
                .with_context(|| format!("failed to read proxy list {:?}", input))?;
            println!("Loaded {} proxies from {:?}", candidates.len(), input);

            run_validation(candidates, &config, &run).await?;
        }
        Commands::Fetch {
            pages,
            limit,
            base_url,
            run,
        } => {
            run.apply(&mut config);
            if let Some(pages) = pages {
                config.geonode.pages = pages;
            }
            if let Some(limit) = limit {
                config.geonode.limit = limit;
            }
            if let Some(url) = base_url {
                config.geonode.base_url = url;
            }
            config.validate()?;

            println!("Fetching proxies from {}...", config.geonode.base_url);
            let source = GeoNodeSource::with_config(config.geonode_config())?;
            let candidates = source.fetch_all().await;
            println!("Total proxies found: {}", candidates.len());

            run_validation(candidates, &config, &run).await?;
        }
    }

    Ok(())
}

async fn run_validation(
    mut candidates: Vec<Candidate>,
    config: &AppConfig,
    run: &RunArgs,
) -> Result<()> {
    if candidates.is_empty() {
        println!("No proxies found!");
        return Ok(());
    }

    if let Some(path) = &run.mmdb {
        let geo = GeoLocator::from_path(path)
            .with_context(|| format!("failed to open MMDB file {:?}", path))?;
        let updated = geo.enrich(&mut candidates);
        info!(updated, "filled in missing countries");
    }

    println!(
        "Checking {} proxies with {} workers, timeout: {}s",
        candidates.len(),
        config.checker.workers,
        config.checker.timeout_secs
    );

    let engine =
        ValidationEngine::with_probe_config(config.engine_config(), config.probe_config());

    let outcome = if run.tui {
        ValidationDashboard::new(engine, candidates).run().await
    } else {
        let bar = progress_bar(candidates.len() as u64)?;
        let outcome = engine
            .validate_with_progress(candidates, |progress: Progress| {
                bar.set_position(progress.completed as u64);
                bar.set_message(format!(
                    "Working: {}/{}",
                    progress.working, progress.completed
                ));
            })
            .await;
        bar.finish();
        outcome.map_err(anyhow::Error::from)
    };

    let (results, fault) = match outcome {
        Ok(results) => (results, None),
        Err(e) => match e.downcast::<EngineError>() {
            Ok(EngineError::Aborted { completed, source }) => (completed, Some(*source)),
            Ok(other) => return Err(other.into()),
            Err(e) => return Err(e),
        },
    };

    if matches!(fault, Some(EngineError::Cancelled)) {
        warn!(
            completed = results.len(),
            "validation cancelled, reports cover a partial run"
        );
    }

    write_reports(&results, config)?;

    match fault {
        Some(fault) => Err(anyhow!(fault).context(format!(
            "validation aborted after {} results",
            results.len()
        ))),
        None => Ok(()),
    }
}

fn progress_bar(total: u64) -> Result<ProgressBar> {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn write_reports(results: &[ValidationResult], config: &AppConfig) -> Result<()> {
    let output = &config.output;

    report::write_results_log(results, &output.results_file)?;
    println!("Results saved to {:?}", output.results_file);

    let working = report::write_working_list(results, &output.working_file)?;
    println!("Saved {} working proxies to {:?}", working, output.working_file);

    if let Some(path) = &output.json_file {
        report::write_json(results, path)?;
        println!("JSON results saved to {:?}", path);
    }

    let summary = Summary::from_results(results);
    println!();
    print!("{}", report::format_summary(&summary));

    if summary.working == 0 {
        warn!("no working proxies found");
        return Ok(());
    }

    let top = config.checker.top;
    println!("\n=== Top {} Fastest Proxies ===", top);
    print!("{}", report::fastest_table(results, top));

    report::write_fastest(results, top, &output.fastest_file)?;
    println!("\nFastest proxies saved to {:?}", output.fastest_file);

    Ok(())
}
