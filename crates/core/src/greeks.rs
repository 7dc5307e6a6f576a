//! Black-Scholes fallback Greek estimator.
//!
//! The exchange ticker usually carries its own Greeks; this closed form is
//! used only when they are absent. Zero rate, zero dividend. A misleading
//! zero is worse than a gap, so out-of-domain inputs yield `None` rather
//! than zeroed Greeks.

use crate::symbol::OptionType;

const SQRT_2: f64 = std::f64::consts::SQRT_2;
const DAYS_PER_YEAR: f64 = 365.0;

/// Position-scaled Greeks: theta per calendar day, vega per 1% vol move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta_per_day: f64,
    pub vega_per_pct: f64,
}

/// Estimates position Greeks from the Black-Scholes-Merton closed form.
///
/// `quantity` is signed (negative for short). Returns `None` when any input
/// is non-finite, when spot or strike is non-positive, or when
/// time-to-expiry or volatility is non-positive.
#[must_use]
pub fn estimate_greeks(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    years_to_expiry: f64,
    implied_vol: f64,
    quantity: f64,
) -> Option<PositionGreeks> {
    let inputs = [spot, strike, years_to_expiry, implied_vol, quantity];
    if inputs.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if spot <= 0.0 || strike <= 0.0 || years_to_expiry <= 0.0 || implied_vol <= 0.0 {
        return None;
    }

    let sqrt_t = years_to_expiry.sqrt();
    let d1 = ((spot / strike).ln() + 0.5 * implied_vol * implied_vol * years_to_expiry)
        / (implied_vol * sqrt_t);

    let delta = match option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };
    let pdf_d1 = norm_pdf(d1);
    let gamma = pdf_d1 / (spot * implied_vol * sqrt_t);
    // At zero rate the theta of calls and puts coincides.
    let theta_per_year = -(spot * pdf_d1 * implied_vol) / (2.0 * sqrt_t);
    let vega = spot * pdf_d1 * sqrt_t;

    Some(PositionGreeks {
        delta: delta * quantity,
        gamma: gamma * quantity,
        theta_per_day: theta_per_year / DAYS_PER_YEAR * quantity,
        vega_per_pct: vega / 100.0 * quantity,
    })
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / SQRT_2))
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_or_flat_vol_is_undefined() {
        assert!(estimate_greeks(OptionType::Call, 100.0, 100.0, 0.0, 0.5, 1.0).is_none());
        assert!(estimate_greeks(OptionType::Call, 100.0, 100.0, -0.1, 0.5, 1.0).is_none());
        assert!(estimate_greeks(OptionType::Put, 100.0, 100.0, 0.25, 0.0, 1.0).is_none());
        assert!(estimate_greeks(OptionType::Put, 100.0, 100.0, 0.25, f64::NAN, 1.0).is_none());
        assert!(estimate_greeks(OptionType::Put, 0.0, 100.0, 0.25, 0.5, 1.0).is_none());
    }

    #[test]
    fn at_the_money_call_delta_is_near_half() {
        let g = estimate_greeks(OptionType::Call, 100.0, 100.0, 0.25, 0.5, 1.0).unwrap();
        assert!(g.delta > 0.5 && g.delta < 0.6, "delta = {}", g.delta);
        assert!(g.gamma > 0.0);
        assert!(g.theta_per_day < 0.0);
        assert!(g.vega_per_pct > 0.0);
        assert!(g.delta.is_finite() && g.gamma.is_finite());
    }

    #[test]
    fn put_call_deltas_differ_by_one() {
        let call = estimate_greeks(OptionType::Call, 105.0, 100.0, 0.5, 0.4, 1.0).unwrap();
        let put = estimate_greeks(OptionType::Put, 105.0, 100.0, 0.5, 0.4, 1.0).unwrap();
        assert!((call.delta - put.delta - 1.0).abs() < 1e-12);
        // Gamma and vega are identical across rights.
        assert!((call.gamma - put.gamma).abs() < 1e-12);
        assert!((call.vega_per_pct - put.vega_per_pct).abs() < 1e-12);
    }

    #[test]
    fn greeks_scale_with_signed_quantity() {
        let unit = estimate_greeks(OptionType::Call, 100.0, 110.0, 0.25, 0.6, 1.0).unwrap();
        let short = estimate_greeks(OptionType::Call, 100.0, 110.0, 0.25, 0.6, -2.0).unwrap();
        assert!((short.delta + 2.0 * unit.delta).abs() < 1e-12);
        assert!((short.theta_per_day + 2.0 * unit.theta_per_day).abs() < 1e-12);
    }

    #[test]
    fn theta_is_per_calendar_day() {
        // Per-day theta must be ~1/365th of the annual decay rate.
        let g = estimate_greeks(OptionType::Call, 100.0, 100.0, 1.0, 0.2, 1.0).unwrap();
        let annual = -(100.0 * norm_pdf(0.1) * 0.2) / 2.0;
        assert!((g.theta_per_day - annual / 365.0).abs() < 1e-9);
    }
}
