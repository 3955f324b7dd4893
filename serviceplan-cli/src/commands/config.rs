//! Config command - show or change the planning defaults

use anyhow::Result;
use serviceplan_core::{CurrencyCode, OperationResult, RecomputeMode};

use super::{get_config, get_data_dir};
use crate::output;

pub struct ConfigArgs {
    pub currency: Option<String>,
    pub months: Option<usize>,
    pub growth: Option<f64>,
    pub mode: Option<String>,
}

impl ConfigArgs {
    fn is_empty(&self) -> bool {
        self.currency.is_none()
            && self.months.is_none()
            && self.growth.is_none()
            && self.mode.is_none()
    }
}

pub fn run(args: ConfigArgs, json: bool) -> Result<()> {
    let mut config = get_config()?;
    let changed = !args.is_empty();

    if let Some(code) = &args.currency {
        config.default_currency = CurrencyCode::parse(code)?;
    }
    if let Some(months) = args.months {
        if months == 0 {
            anyhow::bail!("--months must be greater than zero");
        }
        config.default_plan_months = months;
    }
    if let Some(growth) = args.growth {
        if !growth.is_finite() || growth < 0.0 {
            anyhow::bail!("--growth must be a non-negative number");
        }
        config.default_growth_rate = growth;
    }
    if let Some(mode) = &args.mode {
        config.default_recompute_mode = mode.parse::<RecomputeMode>()?;
    }

    if changed {
        let data_dir = get_data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        config.save(&data_dir)?;
    }

    if json {
        return output::print_json(&OperationResult::ok(&config));
    }
    if changed {
        output::success("Planning defaults saved");
    }
    println!("  Currency:       {}", config.default_currency);
    println!("  Plan months:    {}", config.default_plan_months);
    println!("  Growth rate:    {}", config.default_growth_rate);
    println!("  Recompute mode: {}", config.default_recompute_mode);
    Ok(())
}
