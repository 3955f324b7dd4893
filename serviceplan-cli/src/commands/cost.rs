//! Cost command - manage cost-of-service items

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use rust_decimal::Decimal;
use serviceplan_core::{CostItem, CostItemUpdate, OperationResult};

use super::{parse_money, with_service};
use crate::output;

#[derive(Subcommand)]
pub enum CostCommands {
    /// Add a per-unit cost item
    Add {
        /// Item name
        name: String,
        /// Cost per item, in the rate's currency
        #[arg(long)]
        unit_cost: String,
        /// Items consumed per unit of capacity
        #[arg(long, default_value = "1")]
        quantity: Decimal,
        /// Unit label (e.g. "hour", "license")
        #[arg(long)]
        unit: Option<String>,
    },
    /// Update an existing cost item
    Update {
        /// Cost item ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        unit_cost: Option<String>,
        #[arg(long)]
        quantity: Option<Decimal>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Remove a cost item
    Remove {
        /// Cost item ID
        id: String,
    },
    /// Remove every cost item
    Clear,
}

pub fn run(file: &Path, command: CostCommands, json: bool) -> Result<()> {
    let (service, message) = with_service(file, |service| {
        let currency = service.rate().currency();
        let message = match command {
            CostCommands::Add { name, unit_cost, quantity, unit } => {
                let item = CostItem::new(name, parse_money(&unit_cost, currency)?, quantity, unit)?;
                let message = format!("Added cost item {} ({})", item.name(), item.id());
                service.add_cost_item(item)?;
                message
            }
            CostCommands::Update { id, name, unit_cost, quantity, unit } => {
                let update = CostItemUpdate {
                    name,
                    unit_cost: unit_cost
                        .as_deref()
                        .map(|amount| parse_money(amount, currency))
                        .transpose()?,
                    quantity,
                    unit: unit.map(Some),
                };
                service.update_cost_item(&id, update)?;
                format!("Updated cost item {}", id)
            }
            CostCommands::Remove { id } => {
                let removed = service.remove_cost_item(&id)?;
                format!("Removed cost item {}", removed.name())
            }
            CostCommands::Clear => {
                service.clear_cost_items();
                "Cost items cleared".to_string()
            }
        };
        Ok(message)
    })?;

    if json {
        return output::print_json(&OperationResult::ok(service.cost_items()));
    }
    output::success(&message);
    println!("  Unit cost: {}", service.unit_cost()?);
    Ok(())
}
