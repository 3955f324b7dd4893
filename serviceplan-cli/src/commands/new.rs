//! New command - create a service document

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Input;
use serviceplan_core::{BillingUnit, CurrencyCode, OperationResult, Rate, Service, ServiceKind};

use super::{get_config, parse_money, save_service};
use crate::output;

pub struct NewArgs {
    pub name: Option<String>,
    pub kind: String,
    pub rate: Option<String>,
    pub unit: Option<String>,
    pub currency: Option<String>,
    pub base: Option<f64>,
    pub months: Option<usize>,
    pub force: bool,
}

pub fn run(file: &Path, args: NewArgs, json: bool) -> Result<()> {
    if file.exists() && !args.force {
        anyhow::bail!("Service document {:?} already exists (use --force to overwrite)", file);
    }

    let config = get_config()?;

    // Get name interactively if not provided
    let name = match args.name {
        Some(name) => name,
        None => Input::new().with_prompt("Service name").interact_text()?,
    };

    let kind: ServiceKind = args.kind.parse()?;

    let currency = match args.currency {
        Some(code) => CurrencyCode::parse(&code)?,
        None => config.default_currency,
    };

    // Get rate interactively if not provided
    let rate_str = match args.rate {
        Some(rate) => rate,
        None => Input::new()
            .with_prompt(format!("Rate ({})", currency))
            .interact_text()?,
    };

    let unit: BillingUnit = match args.unit {
        Some(unit) => unit.parse()?,
        None => kind.default_unit(),
    };

    let rate = Rate::new(parse_money(&rate_str, currency)?, unit);
    let mut service = Service::new(name, kind, rate).context("Failed to create service")?;

    if let Some(base) = args.base {
        let months = args.months.unwrap_or(config.default_plan_months);
        service.generate_capacity_plan(months, base, config.default_growth_rate, None)?;
    }

    if file.exists() {
        output::warning(&format!("Overwriting {:?}", file));
    }
    save_service(file, &service)?;

    if json {
        return output::print_json(&OperationResult::ok(service.to_snapshot()));
    }

    println!("{}", "Service created".green());
    println!("  ID:       {}", service.id());
    println!("  Name:     {}", service.name());
    println!("  Rate:     {}", service.rate());
    println!("  Months:   {}", service.capacity_plan().len());
    println!("  Document: {}", file.display());
    Ok(())
}
