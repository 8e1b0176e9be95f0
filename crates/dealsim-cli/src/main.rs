mod commands;
mod input;
mod output;
mod store;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::{AnalyzeArgs, ValidateArgs};
use commands::financing::{AmortizeArgs, IrrArgs};
use commands::proforma::ProformaArgs;
use commands::scenarios::{ScenarioArgs, SensitivityArgs};
use commands::waterfall::WaterfallArgs;

/// Deterministic real-estate deal simulation
#[derive(Parser)]
#[command(
    name = "dealsim",
    version,
    about = "Deterministic real-estate deal simulation",
    long_about = "A CLI for simulating rental, BRRRR and syndication deals with decimal \
                  precision. Builds amortization schedules and monthly pro formas, values \
                  the exit, computes IRR / cash-on-cash / DSCR, allocates LP/GP waterfalls \
                  and runs sensitivity tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine settings file (YAML or JSON): sensitivity steps, warning thresholds
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis: pro forma, exit, returns, waterfall, sensitivity
    Analyze(AnalyzeArgs),
    /// Validate deal inputs and report every error and warning
    Validate(ValidateArgs),
    /// Build a loan amortization schedule
    Amortize(AmortizeArgs),
    /// Project the monthly pro forma and annual summaries
    Proforma(ProformaArgs),
    /// Allocate project cash between LP and GP
    Waterfall(WaterfallArgs),
    /// One-way sensitivity tables and the rent x exit-cap grid
    Sensitivity(SensitivityArgs),
    /// IRR of a periodic cash-flow series
    Irr(IrrArgs),
    /// Save, load, delete or list stored scenarios
    Scenario(ScenarioArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dealsim_core=debug,dealsim=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match input::settings::load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analysis::run_analyze(args, &settings),
        Commands::Validate(args) => commands::analysis::run_validate(args, &settings),
        Commands::Amortize(args) => commands::financing::run_amortize(args),
        Commands::Proforma(args) => commands::proforma::run_proforma(args, &settings),
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args, &settings),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args, &settings),
        Commands::Irr(args) => commands::financing::run_irr(args),
        Commands::Scenario(args) => commands::scenarios::run_scenario(args),
        Commands::Version => {
            println!("dealsim {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
