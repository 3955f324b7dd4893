//! CLI command implementations

pub mod config;
pub mod cost;
pub mod finance;
pub mod new;
pub mod plan;
pub mod rate;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serviceplan_core::config::Config;
use serviceplan_core::{CurrencyCode, Money, Service, YearMonth};
use tracing::debug;

const DEFAULT_FILE: &str = "service.json";

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SERVICEPLAN_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".serviceplan"))
}

/// Load planning defaults from the data directory
pub fn get_config() -> Result<Config> {
    let data_dir = get_data_dir()?;
    Config::load(&data_dir)
        .with_context(|| format!("Failed to load settings from {:?}", data_dir))
}

/// The service document path: the explicit one, else the default in the
/// data directory
pub fn resolve_file(file: Option<PathBuf>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path),
        None => Ok(get_data_dir()?.join(DEFAULT_FILE)),
    }
}

pub fn load_service(path: &Path) -> Result<Service> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!("Failed to read service document {:?} (run `sp new` first)", path)
    })?;
    let service = Service::from_json(&content)
        .with_context(|| format!("Invalid service document {:?}", path))?;
    debug!(path = %path.display(), service = %service.id(), "loaded service");
    Ok(service)
}

pub fn save_service(path: &Path, service: &Service) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    std::fs::write(path, service.to_json()?)
        .with_context(|| format!("Failed to write service document {:?}", path))?;
    debug!(path = %path.display(), "saved service");
    Ok(())
}

/// Load, mutate and save a service document in one step
pub fn with_service<T>(
    path: &Path,
    f: impl FnOnce(&mut Service) -> Result<T>,
) -> Result<(Service, T)> {
    let mut service = load_service(path)?;
    let value = f(&mut service)?;
    save_service(path, &service)?;
    Ok((service, value))
}

pub fn parse_month(value: &str) -> Result<YearMonth> {
    YearMonth::parse(value).with_context(|| format!("Invalid month {:?}. Use YYYY-MM", value))
}

pub fn parse_money(value: &str, currency: CurrencyCode) -> Result<Money> {
    Money::parse(value, currency).with_context(|| format!("Invalid amount {:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_explicit_file() {
        let path = resolve_file(Some(PathBuf::from("plans/acme.json"))).unwrap();
        assert_eq!(path, PathBuf::from("plans/acme.json"));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_month("2025-04").unwrap().to_string(), "2025-04");
        assert!(parse_month("April").is_err());
        assert!(parse_money("12.5", CurrencyCode::USD).is_ok());
        assert!(parse_money("twelve", CurrencyCode::USD).is_err());
    }
}
