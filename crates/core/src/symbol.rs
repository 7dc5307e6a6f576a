//! Option instrument symbols.
//!
//! Bybit option symbols are dash-separated:
//! `{baseCoin}-{expiry}-{strike}-{C|P}-{quoteCoin}`, e.g.
//! `BTC-7JUN25-114000-P-USDT`. The expiry token is day-month-year with the
//! day listed either with or without a leading zero depending on the venue's
//! mood, so parsing accepts both forms while construction always renders the
//! canonical zero-free day.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Option contract type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter symbol code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }

    /// Spelled-out form used by the instruments-info query parameter.
    #[must_use]
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Put => "Put",
        }
    }

    /// Parses `"C"`, `"CALL"`, `"P"`, `"put"`, etc.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error parsing an option symbol string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseSymbolError {
    /// Not five dash-separated fields.
    #[error("malformed option symbol: {0}")]
    Malformed(String),

    /// Expiry token is not a valid day-month-year date.
    #[error("invalid expiry token: {0}")]
    BadExpiry(String),

    /// Strike is not a decimal number.
    #[error("invalid strike: {0}")]
    BadStrike(String),

    /// Option type is neither call nor put.
    #[error("invalid option type: {0}")]
    BadOptionType(String),
}

/// A fully-specified option instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSymbol {
    pub base_coin: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub option_type: OptionType,
    pub quote_coin: String,
}

impl OptionSymbol {
    /// Assembles a symbol from parts. Textual parts are case-insensitive.
    pub fn new(
        base_coin: &str,
        strike: Decimal,
        option_type: OptionType,
        expiry: NaiveDate,
        quote_coin: &str,
    ) -> Self {
        Self {
            base_coin: base_coin.to_uppercase(),
            expiry,
            strike,
            option_type,
            quote_coin: quote_coin.to_uppercase(),
        }
    }
}

impl FromStr for OptionSymbol {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 5 {
            return Err(ParseSymbolError::Malformed(s.to_string()));
        }
        let expiry = parse_expiry_token(parts[1])
            .ok_or_else(|| ParseSymbolError::BadExpiry(parts[1].to_string()))?;
        let strike = Decimal::from_str(parts[2])
            .map_err(|_| ParseSymbolError::BadStrike(parts[2].to_string()))?;
        let option_type = OptionType::parse(parts[3])
            .ok_or_else(|| ParseSymbolError::BadOptionType(parts[3].to_string()))?;
        Ok(Self {
            base_coin: parts[0].to_uppercase(),
            expiry,
            strike,
            option_type,
            quote_coin: parts[4].to_uppercase(),
        })
    }
}

impl fmt::Display for OptionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.base_coin,
            format_expiry(self.expiry),
            self.strike,
            self.option_type,
            self.quote_coin
        )
    }
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Parses an expiry token like `7JUN25` or `07JUN25`.
#[must_use]
pub fn parse_expiry_token(token: &str) -> Option<NaiveDate> {
    let tok = token.to_ascii_uppercase();
    let tok = if tok.len() == 6 {
        format!("0{tok}")
    } else {
        tok
    };
    if tok.len() != 7 {
        return None;
    }
    let day: u32 = tok[0..2].parse().ok()?;
    let month = MONTHS.iter().position(|m| *m == &tok[2..5])? as u32 + 1;
    let year: i32 = tok[5..7].parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

/// Renders the canonical expiry token: day without a leading zero,
/// uppercase month, two-digit year (`7JUN25`).
#[must_use]
pub fn format_expiry(date: NaiveDate) -> String {
    format!(
        "{}{}{:02}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year() % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn builds_canonical_put_symbol() {
        let expiry = parse_expiry_token("7JUN25").unwrap();
        let sym = OptionSymbol::new("btc", dec!(114000), OptionType::Put, expiry, "usdt");
        assert_eq!(sym.to_string(), "BTC-7JUN25-114000-P-USDT");
    }

    #[test]
    fn builds_canonical_call_symbol() {
        let expiry = NaiveDate::from_ymd_opt(2024, 11, 12).unwrap();
        let sym = OptionSymbol::new("eth", dec!(2500), OptionType::Call, expiry, "usdc");
        assert_eq!(sym.to_string(), "ETH-12NOV24-2500-C-USDC");
    }

    #[test]
    fn parse_accepts_leading_zero_day() {
        let a: OptionSymbol = "BTC-7JUN25-114000-P-USDT".parse().unwrap();
        let b: OptionSymbol = "BTC-07JUN25-114000-P-USDT".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.expiry, NaiveDate::from_ymd_opt(2025, 6, 7).unwrap());
    }

    #[test]
    fn round_trips_through_display() {
        let cases = [
            "BTC-7JUN25-114000-P-USDT",
            "ETH-12NOV24-2500-C-USDC",
            "SOL-1JAN26-150-C-USDT",
        ];
        for s in cases {
            let sym: OptionSymbol = s.parse().unwrap();
            let rendered = sym.to_string();
            let reparsed: OptionSymbol = rendered.parse().unwrap();
            assert_eq!(sym, reparsed);
            assert_eq!(rendered, s);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        let sym: OptionSymbol = "btc-7jun25-114000-p-usdt".parse().unwrap();
        assert_eq!(sym.to_string(), "BTC-7JUN25-114000-P-USDT");
    }

    #[test]
    fn rejects_malformed_symbols() {
        assert!(matches!(
            "BTC-7JUN25-114000-P".parse::<OptionSymbol>(),
            Err(ParseSymbolError::Malformed(_))
        ));
        assert!(matches!(
            "BTC-NOPE-114000-P-USDT".parse::<OptionSymbol>(),
            Err(ParseSymbolError::BadExpiry(_))
        ));
        assert!(matches!(
            "BTC-7JUN25-x-P-USDT".parse::<OptionSymbol>(),
            Err(ParseSymbolError::BadStrike(_))
        ));
        assert!(matches!(
            "BTC-7JUN25-114000-Z-USDT".parse::<OptionSymbol>(),
            Err(ParseSymbolError::BadOptionType(_))
        ));
    }

    #[test]
    fn expiry_token_rejects_garbage() {
        assert!(parse_expiry_token("31FEB25").is_none());
        assert!(parse_expiry_token("JUNJUN25").is_none());
        assert!(parse_expiry_token("7JUN").is_none());
    }
}
