//! Rate command - change the billing rate

use std::path::Path;

use anyhow::Result;
use serviceplan_core::{BillingUnit, CurrencyCode, OperationResult, Rate};

use super::{parse_money, with_service};
use crate::output;

pub fn run(
    file: &Path,
    amount: &str,
    unit: Option<String>,
    currency: Option<String>,
    json: bool,
) -> Result<()> {
    let (service, rate) = with_service(file, |service| {
        let current = service.rate();
        let currency = match &currency {
            Some(code) => CurrencyCode::parse(code)?,
            None => current.currency(),
        };
        let unit: BillingUnit = match &unit {
            Some(unit) => unit.parse()?,
            None => current.unit,
        };
        let rate = Rate::new(parse_money(amount, currency)?, unit);
        service.set_rate(rate)?;
        Ok(rate)
    })?;

    if json {
        return output::print_json(&OperationResult::ok(rate));
    }
    output::success(&format!("Rate for {} set to {}", service.name(), rate));
    Ok(())
}
