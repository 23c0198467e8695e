#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::error::Error;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use pfemale::analysis::run_plan;
use pfemale::grouped::{BootstrapProgress, GroupKey, estimate_grouped_with_progress};
use pfemale::io::{delimiter_for, read_signals};
use pfemale::plan::AnalysisPlan;
use pfemale::quartile::JournalQuartiles;
use pfemale::signal::columns;
use pfemale::trend::fit_trend_grouped;
use pfemale::{BootstrapConfig, DEFAULT_ITERATIONS, Estimate};

#[derive(Parser)]
#[command(
    name = "pfemale",
    version,
    about = "Bootstrap estimates of female authorship probability",
    long_about = "Estimates the expected probability that an author is female, with bootstrap \
                 confidence intervals, across groups of author records such as dataset, \
                 author position, publication year or journal quartile."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis of a plan and write one table per analysis
    #[command(about = "Run an analysis plan (outputs: analysis_<name>.csv)")]
    Analyze {
        /// AuthorSignal table (.csv, or .tsv for tab separated)
        #[arg(value_name = "SIGNALS")]
        signals: PathBuf,

        /// TOML analysis plan; the built-in plan is used when omitted
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,

        /// Journal quartile reference table with journal_name and quartile columns
        #[arg(long, value_name = "PATH")]
        quartiles: Option<PathBuf>,

        /// Overrides the plan's resample count
        #[arg(long, value_name = "N")]
        iterations: Option<usize>,

        /// Overrides the plan's seed
        #[arg(long)]
        seed: Option<u64>,

        /// Directory receiving the result tables
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Bootstrap one grouping of an AuthorSignal table
    #[command(about = "Bootstrap p_female per group")]
    Bootstrap {
        #[arg(value_name = "SIGNALS")]
        signals: PathBuf,

        /// Comma-separated grouping columns, e.g. dataset,position
        #[arg(long, value_name = "COLUMNS", value_delimiter = ',', required = true)]
        group_by: Vec<String>,

        #[arg(long, default_value = columns::P_FEMALE)]
        value_column: String,

        #[arg(long, value_name = "N", default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Output path; the separator follows its extension
        #[arg(long, value_name = "PATH", default_value = "bootstrap.csv")]
        output: PathBuf,
    },

    /// Fit a least-squares trend of p_female over publication year
    #[command(about = "Fit p_female trends over years")]
    Trend {
        #[arg(value_name = "SIGNALS")]
        signals: PathBuf,

        /// Comma-separated grouping columns
        #[arg(long, value_name = "COLUMNS", value_delimiter = ',', default_value = columns::DATASET)]
        group_by: Vec<String>,

        #[arg(long, default_value = columns::YEAR)]
        year_column: String,

        #[arg(long, default_value = columns::P_FEMALE)]
        value_column: String,

        #[arg(long, value_name = "PATH", default_value = "trend.csv")]
        output: PathBuf,
    },

    /// Print the built-in analysis plan as TOML
    #[command(about = "Print the default analysis plan")]
    Plan,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = Cli::parse();

    let result = match command {
        Some(Commands::Analyze {
            signals,
            plan,
            quartiles,
            iterations,
            seed,
            out_dir,
        }) => run_analyze(&signals, plan, quartiles, iterations, seed, &out_dir),
        Some(Commands::Bootstrap {
            signals,
            group_by,
            value_column,
            iterations,
            seed,
            output,
        }) => run_bootstrap(
            &signals,
            &group_by,
            &value_column,
            BootstrapConfig { iterations, seed },
            &output,
        ),
        Some(Commands::Trend {
            signals,
            group_by,
            year_column,
            value_column,
            output,
        }) => run_trend(&signals, &group_by, &year_column, &value_column, &output),
        Some(Commands::Plan) => print_default_plan(),
        None => {
            let _ = Cli::command().print_help();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(0), draw_target);
    if let Ok(style) = ProgressStyle::with_template(
        "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} groups ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb.set_message(message.to_string());
    pb
}

/// Drives a progress bar from bootstrap callbacks.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(message: &str) -> Self {
        Self {
            bar: create_progress_bar(message),
        }
    }
}

impl BootstrapProgress for BarProgress {
    fn on_start(&self, total_groups: usize) {
        self.bar.reset();
        self.bar.set_length(total_groups as u64);
    }

    fn on_group_finished(&self, key: &GroupKey, estimate: &Estimate) {
        let _ = estimate;
        self.bar.set_message(key.to_string());
        self.bar.inc(1);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn run_analyze(
    signals: &Path,
    plan_path: Option<PathBuf>,
    quartiles_path: Option<PathBuf>,
    iterations: Option<usize>,
    seed: Option<u64>,
    out_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut plan = match plan_path {
        Some(path) => {
            log::info!("Loading analysis plan from '{}'", path.display());
            AnalysisPlan::load(&path)?
        }
        None => AnalysisPlan::default(),
    };
    if let Some(iterations) = iterations {
        plan.iterations = iterations;
    }
    if seed.is_some() {
        plan.seed = seed;
    }

    let df = read_signals(signals, &plan.value_column)?;
    let quartiles = match quartiles_path {
        Some(path) => Some(JournalQuartiles::load(&path, delimiter_for(&path))?),
        None => None,
    };

    let progress = BarProgress::new("Bootstrapping...");
    let outputs = run_plan(&df, &plan, quartiles.as_ref(), &progress)?;

    fs::create_dir_all(out_dir)?;
    for output in &outputs {
        let path = out_dir.join(format!("analysis_{}.csv", output.name));
        output.table.write_delimited(&path, b',')?;
        log::info!(
            "Wrote {} groups for '{}' to '{}'",
            output.table.len(),
            output.name,
            path.display()
        );
    }
    println!(
        "Finished {} analyses; results are in '{}'",
        outputs.len(),
        out_dir.display()
    );
    Ok(())
}

fn run_bootstrap(
    signals: &Path,
    group_by: &[String],
    value_column: &str,
    config: BootstrapConfig,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let df = read_signals(signals, value_column)?;
    let progress = BarProgress::new("Bootstrapping...");
    let mut table = estimate_grouped_with_progress(&df, group_by, value_column, &config, &progress)?;
    table.sort_canonical();
    table.write_delimited(output, delimiter_for(output))?;
    println!("Wrote {} groups to '{}'", table.len(), output.display());
    Ok(())
}

fn run_trend(
    signals: &Path,
    group_by: &[String],
    year_column: &str,
    value_column: &str,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let df = read_signals(signals, value_column)?;
    let trends = fit_trend_grouped(&df, group_by, year_column, value_column)?;
    trends.write_delimited(output, delimiter_for(output))?;
    println!("Wrote {} trends to '{}'", trends.rows.len(), output.display());
    Ok(())
}

fn print_default_plan() -> Result<(), Box<dyn Error>> {
    print!("{}", AnalysisPlan::default().to_toml_string()?);
    Ok(())
}
