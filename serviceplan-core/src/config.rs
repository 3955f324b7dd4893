//! Configuration management
//!
//! Planning defaults live in `settings.json` under the data directory:
//! ```json
//! {
//!   "planning": {
//!     "defaultCurrency": "USD",
//!     "defaultPlanMonths": 12,
//!     "defaultGrowthRate": 0.0,
//!     "defaultRecomputeMode": "default"
//!   }
//! }
//! ```
//! Keys this crate does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::CurrencyCode;
use crate::services::RecomputeMode;

const SETTINGS_FILE: &str = "settings.json";
const CURRENCY_ENV: &str = "SERVICEPLAN_CURRENCY";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    planning: PlanningSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanningSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_plan_months: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_growth_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_recompute_mode: Option<RecomputeMode>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Planning defaults (simplified view of settings)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub default_currency: CurrencyCode,
    pub default_plan_months: usize,
    pub default_growth_rate: f64,
    pub default_recompute_mode: RecomputeMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::USD,
            default_plan_months: 12,
            default_growth_rate: 0.0,
            default_recompute_mode: RecomputeMode::Default,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unparsable settings file yields the defaults. The
    /// currency can be overridden with `SERVICEPLAN_CURRENCY`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = Self::read_settings(data_dir)?;
        let defaults = Self::default();
        let planning = raw.planning;

        let currency_setting = std::env::var(CURRENCY_ENV).ok().or(planning.default_currency);
        let default_currency = match currency_setting {
            Some(code) => CurrencyCode::parse(&code).unwrap_or_else(|e| {
                warn!(code = %code, error = %e, "ignoring invalid default currency");
                defaults.default_currency
            }),
            None => defaults.default_currency,
        };

        let default_plan_months = planning
            .default_plan_months
            .filter(|months| *months > 0)
            .unwrap_or(defaults.default_plan_months);

        let default_growth_rate = planning
            .default_growth_rate
            .filter(|rate| rate.is_finite() && *rate >= 0.0)
            .unwrap_or(defaults.default_growth_rate);

        Ok(Self {
            default_currency,
            default_plan_months,
            default_growth_rate,
            default_recompute_mode: planning
                .default_recompute_mode
                .unwrap_or(defaults.default_recompute_mode),
        })
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = Self::read_settings(data_dir)?;

        settings.planning.default_currency = Some(self.default_currency.to_string());
        settings.planning.default_plan_months = Some(self.default_plan_months);
        settings.planning.default_growth_rate = Some(self.default_growth_rate);
        settings.planning.default_recompute_mode = Some(self.default_recompute_mode);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(&settings_path)?;
        Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(
                path = %settings_path.display(),
                error = %e,
                "unparsable settings, using defaults"
            );
            SettingsFile::default()
        }))
    }
}
