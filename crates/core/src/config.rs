//! Trade and engine configuration.
//!
//! A trade request is a small JSON document naming the symbol, side and
//! quantity, with everything else optional. Credentials may live in the
//! file or in `BYBIT_`-prefixed environment variables; the environment
//! wins.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One configured trade request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Option symbol, or a template for risk-based selection.
    pub symbol: String,
    /// "Buy" or "Sell".
    pub side: String,
    /// Contract quantity; zero defers to risk-based sizing.
    pub quantity: Decimal,
    /// Limit price; absent means a market order.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Risk budget in quote currency; zero disables selection/sizing.
    #[serde(default)]
    pub risk_usd: Decimal,
    #[serde(default)]
    pub auto_trade: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_tif")]
    pub time_in_force: String,
}

fn default_tif() -> String {
    "GTC".to_string()
}

impl TradeConfig {
    /// Checks the fields that have no usable default.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("missing required field in trade config: symbol");
        }
        if self.side.trim().is_empty() {
            bail!("missing required field in trade config: side");
        }
        Ok(())
    }

    /// Resolved API credentials, or an error naming what is missing.
    pub fn credentials(&self) -> Result<(String, String)> {
        match (&self.api_key, &self.api_secret) {
            (Some(k), Some(s)) if !k.is_empty() && !s.is_empty() => Ok((k.clone(), s.clone())),
            _ => bail!(
                "API credentials not provided; set BYBIT_API_KEY and BYBIT_API_SECRET \
                 or include api_key/api_secret in the trade config"
            ),
        }
    }
}

/// Loads a trade config, layering `BYBIT_`-prefixed environment variables
/// over the JSON file.
pub fn load_trade_config(path: &Path) -> Result<TradeConfig> {
    let cfg: TradeConfig = Figment::new()
        .merge(Json::file(path))
        .merge(Env::prefixed("BYBIT_"))
        .extract()
        .with_context(|| format!("loading trade config from {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Engine policy constants.
///
/// Defaults mirror the venue's observed behavior: 7-day history windows,
/// a 3× take-profit on long premium, and a 2 s fill-poll cadence.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// REST endpoint (demo environment by default).
    pub base_url: String,
    /// Signature receive window in milliseconds.
    pub recv_window_ms: u64,
    /// Abort a trade when the wallet holds less than this.
    pub min_balance: Decimal,
    /// Exit target as a multiple of entry price.
    pub profit_multiple: Decimal,
    /// Fast post-placement execution checks before the long poll.
    pub fast_retries: u32,
    /// Delay between fast checks (seconds).
    pub fast_retry_delay_secs: u64,
    /// Overall fill-poll timeout (seconds).
    pub fill_timeout_secs: u64,
    /// Sleep between fill polls (seconds).
    pub poll_interval_secs: u64,
    /// Maximum history window span the venue permits (days).
    pub window_days: i64,
    /// Consecutive empty windows before history paging stops.
    pub max_empty_windows: u32,
    /// Directory for per-order audit artifacts.
    pub audit_dir: PathBuf,
    /// Fixed UTC offset for localized report timestamps (minutes).
    pub tz_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-demo.bybit.com".to_string(),
            recv_window_ms: 5000,
            min_balance: dec!(10),
            profit_multiple: dec!(3),
            fast_retries: 5,
            fast_retry_delay_secs: 2,
            fill_timeout_secs: 60,
            poll_interval_secs: 2,
            window_days: 7,
            max_empty_windows: 3,
            audit_dir: PathBuf::from("trade_logs"),
            tz_offset_minutes: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_config_with_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "trade_config.json",
                r#"{"symbol": "BTC-7JUN25-114000-P-USDT", "side": "Buy", "quantity": 0.1}"#,
            )?;
            let cfg = load_trade_config(Path::new("trade_config.json")).unwrap();
            assert_eq!(cfg.symbol, "BTC-7JUN25-114000-P-USDT");
            assert_eq!(cfg.risk_usd, Decimal::ZERO);
            assert!(!cfg.auto_trade);
            assert_eq!(cfg.time_in_force, "GTC");
            assert!(cfg.limit_price.is_none());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file_credentials() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "trade_config.json",
                r#"{"symbol": "S", "side": "Buy", "quantity": 1,
                    "api_key": "file-key", "api_secret": "file-secret"}"#,
            )?;
            jail.set_env("BYBIT_API_KEY", "env-key");
            jail.set_env("BYBIT_API_SECRET", "env-secret");
            let cfg = load_trade_config(Path::new("trade_config.json")).unwrap();
            let (key, secret) = cfg.credentials().unwrap();
            assert_eq!(key, "env-key");
            assert_eq!(secret, "env-secret");
            Ok(())
        });
    }

    #[test]
    fn file_credentials_used_without_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "trade_config.json",
                r#"{"symbol": "S", "side": "Buy", "quantity": 1,
                    "api_key": "K", "api_secret": "SEC"}"#,
            )?;
            let cfg = load_trade_config(Path::new("trade_config.json")).unwrap();
            assert_eq!(cfg.credentials().unwrap(), ("K".into(), "SEC".into()));
            Ok(())
        });
    }

    #[test]
    fn missing_required_field_fails() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("trade_config.json", r#"{"symbol": "S", "side": "Buy"}"#)?;
            assert!(load_trade_config(Path::new("trade_config.json")).is_err());
            Ok(())
        });
    }

    #[test]
    fn empty_side_fails_validation() {
        let cfg = TradeConfig {
            symbol: "S".into(),
            side: "".into(),
            quantity: Decimal::ONE,
            limit_price: None,
            risk_usd: Decimal::ZERO,
            auto_trade: false,
            api_key: None,
            api_secret: None,
            time_in_force: default_tif(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn engine_defaults_match_observed_policy() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.profit_multiple, dec!(3));
        assert_eq!(cfg.window_days, 7);
        assert_eq!(cfg.max_empty_windows, 3);
        assert_eq!(cfg.min_balance, dec!(10));
    }
}
