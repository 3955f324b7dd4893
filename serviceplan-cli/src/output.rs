//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;
use serviceplan_core::Money;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr log subscriber (`RUST_LOG` wins over `--verbose`)
pub fn init_logger(verbose: bool) {
    let default = if verbose {
        "serviceplan_core=debug,serviceplan_cli=debug,info"
    } else {
        "serviceplan_core=warn,serviceplan_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format a margin ratio as a percentage
pub fn format_margin(ratio: Decimal) -> String {
    format!("{:.1}%", (ratio * Decimal::ONE_HUNDRED).round_dp(1))
}

/// Format money, coloring negative amounts red
pub fn format_money(money: &Money) -> String {
    if money.is_negative() {
        money.to_string().red().to_string()
    } else {
        money.to_string()
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_margin() {
        assert_eq!(format_margin(Decimal::new(5, 1)), "50.0%");
        assert_eq!(format_margin(Decimal::new(-125, 3)), "-12.5%");
        assert_eq!(format_margin(Decimal::ZERO), "0.0%");
    }
}
