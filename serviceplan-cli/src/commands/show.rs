//! Show command - print the service and its capacity plan

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use serviceplan_core::OperationResult;

use super::load_service;
use crate::output;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let service = load_service(file)?;

    if json {
        return output::print_json(&OperationResult::ok(service.to_snapshot()));
    }

    println!("{}", service.name().bold());
    if let Some(description) = service.description() {
        println!("  {}", description.dimmed());
    }
    println!("  ID:      {}", service.id());
    println!("  Kind:    {}", service.kind());
    println!("  Rate:    {}", service.rate());
    println!("  Updated: {}", service.updated_at().format("%Y-%m-%d %H:%M"));
    println!();

    let plan = service.capacity_plan();
    if plan.is_empty() {
        output::warning("No capacity planned yet (run `sp plan generate`)");
    } else {
        let mut table = output::create_table();
        table.set_header(vec!["Month", "Planned", "Adjustment", "Effective"]);
        for entry in &plan {
            table.add_row(vec![
                Cell::new(entry.month),
                Cell::new(entry.capacity),
                Cell::new(entry.adjustment.map(|a| format!("{:+}", a)).unwrap_or_default()),
                Cell::new(entry.effective_units()),
            ]);
        }
        println!("{}", table);
        println!(
            "  {} months, {} units, {:.1} per month",
            plan.len(),
            service.total_capacity(),
            service.average_monthly_capacity()
        );
    }

    let items = service.cost_items();
    if !items.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["ID", "Name", "Unit cost", "Quantity", "Unit", "Subtotal"]);
        for item in &items {
            table.add_row(vec![
                Cell::new(item.id()),
                Cell::new(item.name()),
                Cell::new(item.unit_cost()),
                Cell::new(item.quantity()),
                Cell::new(item.unit().unwrap_or("-")),
                Cell::new(item.subtotal()),
            ]);
        }
        println!("{}", table);
    }

    Ok(())
}
