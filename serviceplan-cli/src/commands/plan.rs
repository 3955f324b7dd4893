//! Plan command - manage the capacity plan

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serviceplan_core::{MonthlyCapacityEntry, OperationResult, RecomputeMode};

use super::{get_config, parse_month, with_service};
use crate::output;

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Replace the plan with consecutive, optionally growing months
    Generate {
        /// Units in the first month
        base: f64,
        /// Number of months (defaults from settings)
        #[arg(long, short)]
        months: Option<usize>,
        /// Month-over-month growth rate, e.g. 0.05 (defaults from settings)
        #[arg(long, short)]
        growth: Option<f64>,
        /// First month (YYYY-MM); defaults to the current month
        #[arg(long, short)]
        start: Option<String>,
    },
    /// Replace the plan with entries read from a JSON file
    Set {
        /// JSON array of {"month", "capacity", "adjustment"?} objects
        path: PathBuf,
    },
    /// Add a month that is not planned yet
    Add {
        /// Month (YYYY-MM)
        month: String,
        /// Planned units
        capacity: u32,
        /// Signed adjustment on top of the planned units
        #[arg(long, allow_hyphen_values = true)]
        adjustment: Option<i32>,
    },
    /// Change the planned units of a month
    Update {
        /// Month (YYYY-MM)
        month: String,
        /// Planned units
        capacity: u32,
    },
    /// Set or clear the adjustment of a month
    Adjust {
        /// Month (YYYY-MM)
        month: String,
        /// Signed adjustment; omit to clear it
        #[arg(allow_hyphen_values = true)]
        adjustment: Option<i32>,
    },
    /// Remove a month from the plan
    Remove {
        /// Month (YYYY-MM)
        month: String,
    },
    /// Remove every month from the plan
    Clear,
    /// Set every month's planned units to the same amount
    Normalize {
        /// Planned units
        amount: u32,
    },
    /// Fit the plan to a new month range
    Recompute {
        /// First month (YYYY-MM)
        start: String,
        /// Last month (YYYY-MM), inclusive
        end: String,
        /// default (re-date and hold last) or distribute (spread the total)
        #[arg(long)]
        mode: Option<String>,
    },
}

pub fn run(file: &Path, command: PlanCommands, json: bool) -> Result<()> {
    let (service, message) = with_service(file, |service| {
        let message = match command {
            PlanCommands::Generate { base, months, growth, start } => {
                let config = get_config()?;
                let months = months.unwrap_or(config.default_plan_months);
                let growth = growth.unwrap_or(config.default_growth_rate);
                let start = start.as_deref().map(parse_month).transpose()?;
                service.generate_capacity_plan(months, base, growth, start)?;
                format!("Generated {} months", months)
            }
            PlanCommands::Set { path } => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?;
                let entries: Vec<MonthlyCapacityEntry> = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid capacity entries in {:?}", path))?;
                service.set_capacity(&entries)?;
                format!("Plan replaced with {} months", entries.len())
            }
            PlanCommands::Add { month, capacity, adjustment } => {
                let month = parse_month(&month)?;
                service.add_capacity(month, capacity, adjustment)?;
                format!("Added {}", month)
            }
            PlanCommands::Update { month, capacity } => {
                let month = parse_month(&month)?;
                service.update_capacity_units(month, capacity)?;
                format!("Updated {}", month)
            }
            PlanCommands::Adjust { month, adjustment } => {
                let month = parse_month(&month)?;
                service.update_capacity_adjustment(month, adjustment)?;
                match adjustment {
                    Some(delta) => format!("Adjusted {} by {:+}", month, delta),
                    None => format!("Cleared adjustment for {}", month),
                }
            }
            PlanCommands::Remove { month } => {
                let month = parse_month(&month)?;
                service.remove_capacity(month)?;
                format!("Removed {}", month)
            }
            PlanCommands::Clear => {
                service.clear_capacity();
                "Plan cleared".to_string()
            }
            PlanCommands::Normalize { amount } => {
                service.normalize_capacity_units(amount)?;
                format!("Normalized planned units to {}", amount)
            }
            PlanCommands::Recompute { start, end, mode } => {
                let start = parse_month(&start)?;
                let end = parse_month(&end)?;
                let mode: RecomputeMode = match mode {
                    Some(mode) => mode.parse()?,
                    None => get_config()?.default_recompute_mode,
                };
                service.recompute_capacity_period(start, end, mode)?;
                format!("Recomputed plan for {} to {} ({})", start, end, mode)
            }
        };
        Ok(message)
    })?;

    if json {
        return output::print_json(&OperationResult::ok(service.capacity_plan()));
    }
    output::success(&message);
    println!("  Months: {}", service.capacity_plan().len());
    println!("  Total units: {}", service.total_capacity());
    Ok(())
}
