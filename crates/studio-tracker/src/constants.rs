//! Centralized constants for the practice tracker
//!
//! Defaults for values that can be overridden in config.toml live here too.

// =============================================================================
// Finance
// =============================================================================

/// Tax withheld on a receivable when it is marked paid (15.5%)
pub const DEFAULT_TAX_RATE: f64 = 0.155;

/// Offset of the practice's civil time zone from UTC, in hours (UTC-3)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

// =============================================================================
// Tasks
// =============================================================================

/// Days subtracted from the due date when a task has no start date (timeline only)
pub const DEFAULT_TIMELINE_OFFSET_DAYS: i64 = 3;

/// Width of the "urgent" window after today, in days
pub const DEFAULT_URGENT_WINDOW_DAYS: i64 = 1;

// =============================================================================
// File Names
// =============================================================================

/// Config file looked up in the working directory
pub const CONFIG_FILENAME: &str = "config.toml";

/// Record store database filename (inside the data directory)
pub const STORE_FILENAME: &str = "tracker.sqlite";

/// Status report filename prefix (suffixed with the project id)
pub const REPORT_FILENAME_PREFIX: &str = "relatorio_projeto_";

// =============================================================================
// Date Formats
// =============================================================================

/// Storage format for dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for dates
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Display format for change-log timestamps
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

// =============================================================================
// Dashboard Exports
// =============================================================================

/// Monthly inflow/outflow series
pub const CASH_FLOW_FILENAME: &str = "fluxo_mensal.csv";

/// Effective hourly rate ranking
pub const EFFICIENCY_FILENAME: &str = "eficiencia_horas.csv";

/// Revenue by origin, type and city
pub const REVENUE_BREAKDOWN_FILENAME: &str = "receita_por_dimensao.csv";
