//! Logarithmic market scoring rule
//!
//! The market maker's potential is `C(q) = B * ln(e^(qYes/B) + e^(qNo/B))`.
//! A trade of `delta` shares of one outcome costs `C(q_after) - C(q_before)`;
//! a sell is a buy of negative `delta` and yields a negative cost (a refund).
//!
//! All exponentials go through a max-shifted log-sum-exp so that large share
//! counts never overflow `f64`.

use crate::value_objects::Outcome;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Liquidity parameter used when none is configured
pub const DEFAULT_LIQUIDITY: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PricingError {
    #[error("liquidity parameter must be finite and positive, got {0}")]
    InvalidLiquidity(f64),
}

/// Marginal prices of both outcomes. `yes + no == 1` by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    pub yes: f64,
    pub no: f64,
}

impl Prices {
    /// Price of a single outcome
    #[inline]
    pub fn of(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }
}

#[inline]
fn log_sum_exp(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}

/// Market maker potential `C(q)`
#[inline]
pub fn potential(yes_shares: f64, no_shares: f64, liquidity: f64) -> f64 {
    liquidity * log_sum_exp(yes_shares / liquidity, no_shares / liquidity)
}

/// Cost of shifting `outcome`'s outstanding shares by `delta`.
///
/// Positive for buys, negative for sells.
pub fn cost(yes_shares: f64, no_shares: f64, delta: f64, outcome: Outcome, liquidity: f64) -> f64 {
    let (yes_after, no_after) = match outcome {
        Outcome::Yes => (yes_shares + delta, no_shares),
        Outcome::No => (yes_shares, no_shares + delta),
    };
    potential(yes_after, no_after, liquidity) - potential(yes_shares, no_shares, liquidity)
}

/// Marginal prices for the given share state.
///
/// `pYes = 1 / (1 + e^((qNo - qYes)/B))` is the softmax written so that the
/// exponent can only overflow to infinity, which drives the price to 0
/// instead of producing NaN.
///
/// Prices saturate in f64: once `|qYes - qNo|` exceeds roughly `36.7·B`
/// (about 734 shares at B = 20) the leading price rounds to exactly 1.0.
/// With YES ahead the NO price is then exactly 0.0.
pub fn price(yes_shares: f64, no_shares: f64, liquidity: f64) -> Prices {
    let yes = 1.0 / (1.0 + ((no_shares - yes_shares) / liquidity).exp());
    Prices { yes, no: 1.0 - yes }
}

/// Pricing engine bound to one liquidity parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lmsr {
    liquidity: f64,
}

impl Lmsr {
    pub fn new(liquidity: f64) -> Result<Self, PricingError> {
        if !liquidity.is_finite() || liquidity <= 0.0 {
            return Err(PricingError::InvalidLiquidity(liquidity));
        }
        Ok(Self { liquidity })
    }

    #[inline]
    pub fn liquidity(&self) -> f64 {
        self.liquidity
    }

    /// Cost of a signed share delta on one outcome
    #[inline]
    pub fn cost(&self, yes_shares: u64, no_shares: u64, delta: i64, outcome: Outcome) -> f64 {
        cost(
            yes_shares as f64,
            no_shares as f64,
            delta as f64,
            outcome,
            self.liquidity,
        )
    }

    #[inline]
    pub fn prices(&self, yes_shares: u64, no_shares: u64) -> Prices {
        price(yes_shares as f64, no_shares as f64, self.liquidity)
    }
}

impl Default for Lmsr {
    fn default() -> Self {
        Self {
            liquidity: DEFAULT_LIQUIDITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const B: f64 = DEFAULT_LIQUIDITY;

    #[test]
    fn test_even_market_prices_at_half() {
        let prices = price(0.0, 0.0, B);
        assert_relative_eq!(prices.yes, 0.5);
        assert_relative_eq!(prices.no, 0.5);
    }

    #[test]
    fn test_prices_sum_to_one_and_stay_in_range() {
        for yes in [0.0, 1.0, 7.5, 40.0, 200.0] {
            for no in [0.0, 3.0, 25.0, 90.0] {
                for b in [20.0, 100.0] {
                    let p = price(yes, no, b);
                    assert_relative_eq!(p.yes + p.no, 1.0, epsilon = 1e-12);
                    assert!(p.yes > 0.0 && p.yes < 1.0, "yes={yes} no={no} b={b}");
                    assert!(p.no > 0.0 && p.no < 1.0, "yes={yes} no={no} b={b}");
                }
            }
        }
    }

    #[test]
    fn test_buy_ten_yes_from_empty_market() {
        let c = cost(0.0, 0.0, 10.0, Outcome::Yes, B);
        let expected = 20.0 * ((0.5f64).exp() + 1.0).ln() - 20.0 * 2.0f64.ln();
        assert_relative_eq!(c, expected, epsilon = 1e-9);
        assert_relative_eq!(c, 5.618596, epsilon = 1e-6);

        let p = price(10.0, 0.0, B);
        assert_relative_eq!(p.yes, 0.622459, epsilon = 1e-6);
    }

    #[test]
    fn test_cost_is_positive_and_monotonic_in_size() {
        for (yes, no) in [(0.0, 0.0), (15.0, 3.0), (0.0, 80.0)] {
            for outcome in [Outcome::Yes, Outcome::No] {
                for delta in [1.0, 4.0, 10.0, 50.0] {
                    let full = cost(yes, no, delta, outcome, B);
                    let half = cost(yes, no, delta / 2.0, outcome, B);
                    assert!(full > 0.0);
                    assert!(full > half);
                }
            }
        }
    }

    #[test]
    fn test_cost_increases_with_outstanding_shares() {
        let cheap = cost(0.0, 0.0, 5.0, Outcome::Yes, B);
        let dear = cost(30.0, 0.0, 5.0, Outcome::Yes, B);
        assert!(dear > cheap);
    }

    #[test]
    fn test_round_trip_spread_is_non_negative() {
        let bought = cost(12.0, 4.0, 6.0, Outcome::No, B);
        let refund = -cost(12.0, 10.0, -6.0, Outcome::No, B);
        assert!(refund <= bought + 1e-9);
    }

    #[test]
    fn test_path_independence_along_one_outcome() {
        let single = cost(0.0, 0.0, 10.0, Outcome::Yes, B);
        let stepped: f64 = (0..5)
            .map(|i| cost(2.0 * i as f64, 0.0, 2.0, Outcome::Yes, B))
            .sum();
        assert_relative_eq!(single, stepped, epsilon = 1e-9);
    }

    #[test]
    fn test_large_share_counts_do_not_overflow() {
        let c = cost(1.0e6, 0.0, 10.0, Outcome::Yes, B);
        assert!(c.is_finite());
        assert_relative_eq!(c, 10.0, epsilon = 1e-6);

        let p = price(0.0, 1.0e6, B);
        assert!(p.yes.is_finite());
        assert_relative_eq!(p.yes + p.no, 1.0);
    }

    #[test]
    fn test_prices_saturate_past_the_f64_limit() {
        let engine = Lmsr::default();

        // Still strictly inside (0, 1) at a 700 share lead
        let p = engine.prices(700, 0);
        assert!(p.yes < 1.0);
        assert!(p.no > 0.0);

        // An 800 share lead is affordable from a fresh market and saturates
        assert_relative_eq!(engine.cost(0, 0, 800, Outcome::Yes), 786.137, epsilon = 1e-3);
        let p = engine.prices(800, 0);
        assert_eq!(p.yes, 1.0);
        assert_eq!(p.no, 0.0);

        // With NO ahead the YES price stays representable, NO rounds to 1
        let p = engine.prices(0, 800);
        assert!(p.yes > 0.0 && p.yes < 1e-15);
        assert_eq!(p.no, 1.0);
    }

    #[test]
    fn test_engine_rejects_bad_liquidity() {
        assert!(Lmsr::new(0.0).is_err());
        assert!(Lmsr::new(-3.0).is_err());
        assert!(Lmsr::new(f64::NAN).is_err());
        assert_eq!(Lmsr::new(20.0).unwrap(), Lmsr::default());
    }

    #[test]
    fn test_engine_sell_is_negative_buy() {
        let engine = Lmsr::default();
        let refund = engine.cost(10, 0, -10, Outcome::Yes);
        assert_relative_eq!(refund, -engine.cost(0, 0, 10, Outcome::Yes), epsilon = 1e-9);
    }
}
