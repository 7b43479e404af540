//! Configuration for the practice tracker

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::Path;

use crate::constants;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub business: BusinessConfig,
    #[serde(default)]
    pub team: TeamConfig,
}

/// Business rules that the practice may tune
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// Tax rate captured on receivables when they are paid (0.155 = 15.5%)
    pub tax_rate: f64,
    /// Civil time zone offset from UTC, in hours
    pub utc_offset_hours: i32,
    /// Days before the due date used as a synthetic start on the timeline
    pub timeline_offset_days: i64,
    /// Days after today that count as "urgent"
    pub urgent_window_days: i64,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            tax_rate: constants::DEFAULT_TAX_RATE,
            utc_offset_hours: constants::DEFAULT_UTC_OFFSET_HOURS,
            timeline_offset_days: constants::DEFAULT_TIMELINE_OFFSET_DAYS,
            urgent_window_days: constants::DEFAULT_URGENT_WINDOW_DAYS,
        }
    }
}

/// Staff allowed as task responsibles
#[derive(Debug, Default, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub members: Vec<String>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Load the config file if present, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| {
            "Failed to parse config.toml. Check for:\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - Incorrect data types (tax_rate must be a number, members a list of strings)"
        })
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Main configuration struct with validated values
#[derive(Debug, Clone)]
pub struct Config {
    /// Tax rate applied when a receivable is paid
    pub tax_rate: f64,
    /// Practice time zone (fixed offset, no daylight saving)
    pub timezone: FixedOffset,
    /// Synthetic start offset for timeline bars
    pub timeline_offset_days: i64,
    /// Urgent window length in days
    pub urgent_window_days: i64,
    /// Named staff; empty means anyone may be assigned
    pub team: Vec<String>,
}

impl Config {
    /// Create config from file config
    pub fn from_file(file_config: &FileConfig) -> Result<Self> {
        let business = &file_config.business;

        if !(0.0..1.0).contains(&business.tax_rate) {
            anyhow::bail!("business.tax_rate must be in [0, 1), got {}", business.tax_rate);
        }

        let timezone = business
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("Invalid business.utc_offset_hours: {}", business.utc_offset_hours))?;

        if business.timeline_offset_days < 0 || business.urgent_window_days < 0 {
            anyhow::bail!("business.timeline_offset_days and business.urgent_window_days must not be negative");
        }

        Ok(Self {
            tax_rate: business.tax_rate,
            timezone,
            timeline_offset_days: business.timeline_offset_days,
            urgent_window_days: business.urgent_window_days,
            team: file_config.team.members.clone(),
        })
    }

    /// Check whether a name may be assigned as task responsible
    pub fn is_team_member(&self, name: &str) -> bool {
        self.team.is_empty() || self.team.iter().any(|m| m.eq_ignore_ascii_case(name))
    }
}
