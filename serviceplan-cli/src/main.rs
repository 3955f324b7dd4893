//! Serviceplan CLI - plan a billable service in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{config, cost, finance, new, plan, rate, show};

/// Serviceplan - capacity and finance planning for billable services
#[derive(Parser)]
#[command(name = "sp", version, about, long_about = None)]
struct Cli {
    /// Service document to operate on (defaults to <data dir>/service.json)
    #[arg(long, short, global = true, env = "SERVICEPLAN_FILE")]
    file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new service document
    New {
        /// Service name
        name: Option<String>,
        /// Service kind (time, project, usage)
        #[arg(long, default_value = "time")]
        kind: String,
        /// Rate amount per billing unit
        #[arg(long)]
        rate: Option<String>,
        /// Billing unit (hour, day, session, ...); defaults from the kind
        #[arg(long)]
        unit: Option<String>,
        /// Currency code; defaults from settings
        #[arg(long)]
        currency: Option<String>,
        /// Generate a plan with this many units per month
        #[arg(long)]
        base: Option<f64>,
        /// Number of months to generate (defaults from settings)
        #[arg(long)]
        months: Option<usize>,
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },

    /// Change the billing rate
    Rate {
        /// Rate amount per billing unit
        amount: String,
        /// Billing unit (keeps the current unit when omitted)
        #[arg(long)]
        unit: Option<String>,
        /// Currency code (keeps the current currency when omitted)
        #[arg(long)]
        currency: Option<String>,
    },

    /// Manage the capacity plan
    Plan {
        #[command(subcommand)]
        command: plan::PlanCommands,
    },

    /// Manage cost-of-service items
    Cost {
        #[command(subcommand)]
        command: cost::CostCommands,
    },

    /// Show the service and its capacity plan
    Show,

    /// Show or change the planning defaults in settings.json
    Config {
        /// Default currency code
        #[arg(long)]
        currency: Option<String>,
        /// Default number of months to plan
        #[arg(long)]
        months: Option<usize>,
        /// Default month-over-month growth rate
        #[arg(long)]
        growth: Option<f64>,
        /// Default recompute mode (default, distribute)
        #[arg(long)]
        mode: Option<String>,
    },

    /// Show revenue, cost, profit and margins
    Finance {
        /// Restrict to a single month (YYYY-MM) and show net figures
        #[arg(long)]
        month: Option<String>,
        /// Discounts deducted from the month's revenue
        #[arg(long, requires = "month")]
        discounts: Option<String>,
        /// Returns deducted from the month's revenue
        #[arg(long, requires = "month")]
        returns: Option<String>,
        /// Allowances deducted from the month's revenue
        #[arg(long, requires = "month")]
        allowances: Option<String>,
        /// Operating expenses deducted from net revenue
        #[arg(long, requires = "month")]
        opex: Option<String>,
        /// Taxes deducted from net revenue
        #[arg(long, requires = "month")]
        taxes: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    output::init_logger(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = commands::resolve_file(cli.file)?;
    let json = cli.json;

    match cli.command {
        Commands::New {
            name,
            kind,
            rate,
            unit,
            currency,
            base,
            months,
            force,
        } => new::run(
            &file,
            new::NewArgs {
                name,
                kind,
                rate,
                unit,
                currency,
                base,
                months,
                force,
            },
            json,
        ),
        Commands::Rate {
            amount,
            unit,
            currency,
        } => rate::run(&file, &amount, unit, currency, json),
        Commands::Plan { command } => plan::run(&file, command, json),
        Commands::Cost { command } => cost::run(&file, command, json),
        Commands::Show => show::run(&file, json),
        Commands::Config {
            currency,
            months,
            growth,
            mode,
        } => config::run(
            config::ConfigArgs {
                currency,
                months,
                growth,
                mode,
            },
            json,
        ),
        Commands::Finance {
            month,
            discounts,
            returns,
            allowances,
            opex,
            taxes,
        } => finance::run(
            &file,
            finance::FinanceArgs {
                month,
                discounts,
                returns,
                allowances,
                opex,
                taxes,
            },
            json,
        ),
    }
}
