//! Order execution and risk sizing against the options venue.
//!
//! The exchange is the sole owner of order state — everything here either
//! submits intents or polls for what happened:
//! - pick an instrument under a risk budget and size the order
//! - drive an entry order through its fill lifecycle and hang a
//!   reduce-only profit-target exit off the realized entry price
//! - reconcile windowed trade history into a running-balance ledger

pub mod engine;
pub mod lifecycle;
pub mod reconcile;
pub mod selector;
pub mod targets;
pub mod ticks;

pub use engine::{run_trade, ExposureRow, TradeReport};
pub use lifecycle::{
    await_fill, cancel_all_and_close, place_and_track, EntryOrder, OrderStates, TradeOutcome,
};
pub use reconcile::{reconcile, report_offset, ReconciledTrade};
pub use selector::choose_symbol_by_risk;
pub use targets::set_profit_targets;
pub use ticks::{round_to_tick, TickCache};
