//! Application configuration.
//!
//! Layered sources, lowest to highest precedence: core TOML file,
//! optional params overlay file, `MAKER__`-prefixed environment
//! variables, repeatable `--override key=value` CLI pairs. The merged
//! tree deserializes into [`AppConfig`]; call [`AppConfig::validate`]
//! once logging is up so range errors and warnings are visible.

use config::{Config, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use maker_exec::ExecutionConfig;
use maker_feed::FeedConfig;
use maker_mm::{InventoryConfig, ObiConfig, SpreadConfig};
use maker_registry::EndpointConfig;
use maker_risk::GovernorConfig;

use crate::error::{AppError, AppResult};

/// Cancel-replace pass configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelReplaceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum milliseconds between cancel-replace passes.
    #[serde(default = "default_cr_interval_ms")]
    pub interval_ms: u64,
    /// Replace a side only when the price moved at least this many ticks.
    #[serde(default = "default_cr_min_ticks")]
    pub min_ticks: u32,
}

impl Default for CancelReplaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_cr_interval_ms(),
            min_ticks: default_cr_min_ticks(),
        }
    }
}

/// One-sided flow guard. When tripped the tick is skipped entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToxicityGuardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ToxicityGuardConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Metrics exporter and log filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

/// Shutdown drain behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Cancel all live orders before exiting.
    #[serde(default = "default_true")]
    pub cancel_on_shutdown: bool,
    /// Overall budget for the shutdown cancel fan-out.
    #[serde(default = "default_cancel_timeout_ms")]
    pub cancel_timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            cancel_on_shutdown: true,
            cancel_timeout_ms: default_cancel_timeout_ms(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Market symbol used in book queries.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Numeric market identifier carried in order envelopes.
    #[serde(default)]
    pub market_id: u32,

    /// Price quantum of the quoted market.
    #[serde(default = "default_tick_size")]
    pub tick_size: Decimal,

    /// Base order size before volatility and skew adjustment.
    #[serde(default = "default_base_order_size")]
    pub base_order_size: Decimal,

    #[serde(default)]
    pub spread: SpreadConfig,

    #[serde(default)]
    pub obi: ObiConfig,

    #[serde(default)]
    pub inventory: InventoryConfig,

    #[serde(default)]
    pub cancel_replace: CancelReplaceConfig,

    #[serde(default)]
    pub toxicity_guard: ToxicityGuardConfig,

    #[serde(default)]
    pub risk: GovernorConfig,

    /// Ledger read endpoints, highest priority first by convention.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            market_id: 0,
            tick_size: default_tick_size(),
            base_order_size: default_base_order_size(),
            spread: SpreadConfig::default(),
            obi: ObiConfig::default(),
            inventory: InventoryConfig::default(),
            cancel_replace: CancelReplaceConfig::default(),
            toxicity_guard: ToxicityGuardConfig::default(),
            risk: GovernorConfig::default(),
            endpoints: Vec::new(),
            execution: ExecutionConfig::default(),
            feed: FeedConfig::default(),
            telemetry: TelemetryConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the layered configuration and deserialize it.
    pub fn load(
        config_path: &str,
        params_path: Option<&str>,
        overrides: &[String],
    ) -> AppResult<Self> {
        let mut builder = Config::builder().add_source(File::with_name(config_path));

        if let Some(params) = params_path {
            builder = builder.add_source(File::with_name(params).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("MAKER").separator("__"));

        for entry in overrides {
            let (key, raw) = entry.split_once('=').ok_or_else(|| {
                AppError::Config(format!("Override must be key=value: {entry}"))
            })?;
            builder = builder
                .set_override(key, parse_override_value(raw))
                .map_err(|e| AppError::Config(format!("Bad override {key}: {e}")))?;
        }

        builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to load config: {e}")))?
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Range checks that must hold before the loop starts. Emits
    /// warnings for legal but unusual values.
    pub fn validate(&self) -> AppResult<()> {
        if self.spread.min <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "spread.min must be positive, got {}",
                self.spread.min
            )));
        }
        if self.spread.max <= self.spread.min {
            return Err(AppError::Config(format!(
                "spread.max ({}) must exceed spread.min ({})",
                self.spread.max, self.spread.min
            )));
        }
        if self.base_order_size <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "base_order_size must be positive, got {}",
                self.base_order_size
            )));
        }
        if self.inventory.max_abs <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "inventory.max_abs must be positive, got {}",
                self.inventory.max_abs
            )));
        }
        if self.obi.levels == 0 || self.obi.levels > 50 {
            return Err(AppError::Config(format!(
                "obi.levels must be in 1..=50, got {}",
                self.obi.levels
            )));
        }
        if self.cancel_replace.interval_ms < 100 {
            return Err(AppError::Config(format!(
                "cancel_replace.interval_ms must be at least 100, got {}",
                self.cancel_replace.interval_ms
            )));
        }
        if self.tick_size <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }

        if self.spread.min < Decimal::TWO {
            warn!(min = %self.spread.min, "Very tight min spread");
        }
        if self.inventory.max_abs > dec!(1000) {
            warn!(max_abs = %self.inventory.max_abs, "Very large max position");
        }

        Ok(())
    }
}

/// CLI override values arrive as strings; recover the most specific
/// TOML-compatible type.
fn parse_override_value(raw: &str) -> config::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    if let Ok(i) = raw.parse::<i64>() {
        return i.into();
    }
    if let Ok(f) = raw.parse::<f64>() {
        return f.into();
    }
    raw.to_string().into()
}

fn default_symbol() -> String {
    "SOL-PERP".to_string()
}

fn default_tick_size() -> Decimal {
    dec!(0.001)
}

fn default_base_order_size() -> Decimal {
    dec!(0.05)
}

fn default_cr_interval_ms() -> u64 {
    900
}

fn default_cr_min_ticks() -> u32 {
    2
}

fn default_metrics_port() -> u16 {
    9300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cancel_timeout_ms() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}
