//! Core types, traits, and configuration for the options execution engine.

pub mod config;
pub mod greeks;
pub mod sizing;
pub mod symbol;

pub use config::{load_trade_config, EngineConfig, TradeConfig};
pub use greeks::{estimate_greeks, PositionGreeks};
pub use sizing::{order_qty, MIN_ORDER_QTY};
pub use symbol::{format_expiry, parse_expiry_token, OptionSymbol, OptionType, ParseSymbolError};
