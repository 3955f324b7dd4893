//! Finance command - revenue, cost, profit and margins

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use serviceplan_core::{CurrencyCode, Deductions, Money, OperationResult, Service, YearMonth};

use super::{load_service, parse_month, parse_money};
use crate::output;

pub struct FinanceArgs {
    pub month: Option<String>,
    pub discounts: Option<String>,
    pub returns: Option<String>,
    pub allowances: Option<String>,
    pub opex: Option<String>,
    pub taxes: Option<String>,
}

pub fn run(file: &Path, args: FinanceArgs, json: bool) -> Result<()> {
    let service = load_service(file)?;

    match args.month.as_deref() {
        Some(month) => {
            let month = parse_month(month)?;
            show_month(&service, month, &args, json)
        }
        None => show_plan(&service, json),
    }
}

fn parse_optional(value: &Option<String>, currency: CurrencyCode) -> Result<Option<Money>> {
    value.as_deref().map(|v| parse_money(v, currency)).transpose()
}

fn show_plan(service: &Service, json: bool) -> Result<()> {
    let snapshot = service.finance_snapshot()?;
    let breakdown = service.monthly_breakdown()?;

    if json {
        let mut context = HashMap::new();
        context.insert("months".to_string(), serde_json::to_value(&breakdown)?);
        return output::print_json(&OperationResult::ok_with_context(snapshot, context));
    }

    if breakdown.is_empty() {
        output::warning("No capacity planned yet (run `sp plan generate`)");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Month", "Units", "Revenue", "Cost", "Profit", "Margin"]);
    for row in &breakdown {
        table.add_row(vec![
            Cell::new(row.month),
            Cell::new(row.units),
            Cell::new(row.revenue),
            Cell::new(row.cost),
            Cell::new(output::format_money(&row.profit)),
            Cell::new(output::format_margin(row.margin)),
        ]);
    }
    println!("{}", table);

    println!("{}", service.name().bold());
    println!("  Units:           {}", snapshot.total_units);
    println!("  Gross revenue:   {}", output::format_money(&snapshot.gross_revenue));
    println!("  Cost of service: {}", output::format_money(&snapshot.gross_cost));
    println!("  Gross profit:    {}", output::format_money(&snapshot.gross_profit));
    println!("  Gross margin:    {}", output::format_margin(snapshot.gross_margin));
    println!(
        "  Monthly average: {} revenue, {} profit",
        output::format_money(&snapshot.average_monthly_revenue),
        output::format_money(&snapshot.average_monthly_profit)
    );
    println!(
        "  Per {}: {} cost, {} profit ({})",
        service.rate().unit,
        output::format_money(&snapshot.unit_cost),
        output::format_money(&snapshot.unit_profit),
        output::format_margin(snapshot.unit_margin)
    );
    Ok(())
}

fn show_month(service: &Service, month: YearMonth, args: &FinanceArgs, json: bool) -> Result<()> {
    let currency = service.rate().currency();
    let deductions = Deductions {
        discounts: parse_optional(&args.discounts, currency)?,
        returns: parse_optional(&args.returns, currency)?,
        allowances: parse_optional(&args.allowances, currency)?,
    };
    let op_ex = parse_optional(&args.opex, currency)?;
    let taxes = parse_optional(&args.taxes, currency)?;

    let figures = service.monthly_finance(month)?;
    let net_revenue = service.net_revenue(month, &deductions)?;
    let net_profit = service.net_profit(month, op_ex, taxes, &deductions)?;

    if json {
        let mut context = HashMap::new();
        context.insert("netRevenue".to_string(), serde_json::to_value(net_revenue)?);
        context.insert("netProfit".to_string(), serde_json::to_value(net_profit)?);
        return output::print_json(&OperationResult::ok_with_context(figures, context));
    }

    if service.capacity_for(month).is_none() {
        output::warning(&format!("{} is not in the capacity plan", month));
    }

    println!("{}", format!("{} - {}", service.name(), month).bold());
    println!("  Units:       {}", figures.units);
    println!("  Revenue:     {}", output::format_money(&figures.revenue));
    println!("  Cost:        {}", output::format_money(&figures.cost));
    println!("  Profit:      {}", output::format_money(&figures.profit));
    println!("  Margin:      {}", output::format_margin(figures.margin));
    println!("  Net revenue: {}", output::format_money(&net_revenue));
    println!("  Net profit:  {}", output::format_money(&net_profit));
    if !net_profit.is_negative() {
        output::success("Month is profitable after deductions");
    }
    Ok(())
}
