//! Bybit v5 options REST integration.
//!
//! Provides a signed HTTP client for the option category of the v5 API:
//! order placement and management, executions, positions, tickers,
//! instrument metadata, and time-windowed history pagination. The exchange
//! owns all order state; this crate only submits and observes.

pub mod auth;
pub mod client;
pub mod error;
pub mod history;
pub mod models;

pub use auth::Credentials;
pub use client::{BybitClient, DEMO_API_URL};
pub use error::{ExchangeError, CODE_NO_ACTIVE_ORDERS};
pub use history::TimeWindows;
pub use models::{
    DeliveryRecord, ExecutionRecord, Instrument, OrderAck, OrderDetail, OrderRequest, OrderStatus,
    PositionEntry, Side, Ticker,
};
