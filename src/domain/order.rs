//! Order decisions and the validation contract applied before the ledger.

use std::fmt;
use std::str::FromStr;

/// Exposure may exceed the rate limit by this much before a non-reducing
/// proposal is rejected.
pub const EXPOSURE_BREACH_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderKind::Buy => "buy",
            OrderKind::Sell => "sell",
            OrderKind::Hold => "hold",
        };
        write!(f, "{name}")
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderKind::Buy),
            "sell" => Ok(OrderKind::Sell),
            "hold" => Ok(OrderKind::Hold),
            _ => Err(format!("unknown order kind '{s}'")),
        }
    }
}

/// A proposed trade: `amount` is a fraction of total portfolio value to
/// move, not a unit quantity. Hold always carries 0.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderDecision {
    pub kind: OrderKind,
    pub amount: f64,
}

impl OrderDecision {
    pub fn new(kind: OrderKind, amount: f64) -> Self {
        OrderDecision { kind, amount }
    }

    pub fn hold() -> Self {
        OrderDecision {
            kind: OrderKind::Hold,
            amount: 0.0,
        }
    }
}

/// Why a proposal was refused. The display text is fed back verbatim to
/// the decision source on retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderRejection {
    #[error("buy amount {amount:.4} exceeds rate limit {rate_limit:.4}")]
    BuyAboveLimit { amount: f64, rate_limit: f64 },

    #[error(
        "buy amount {amount:.4} would push exposure {asset_ratio:.4} past rate limit {rate_limit:.4}"
    )]
    BuyBreachesLimit {
        amount: f64,
        asset_ratio: f64,
        rate_limit: f64,
    },

    #[error("buy amount {amount:.4} exceeds cash ratio {cash_ratio:.4}")]
    BuyExceedsCash { amount: f64, cash_ratio: f64 },

    #[error("sell amount {amount:.4} exceeds asset ratio {asset_ratio:.4}")]
    SellExceedsHoldings { amount: f64, asset_ratio: f64 },

    #[error(
        "exposure {asset_ratio:.4} exceeds rate limit {rate_limit:.4} by more than {tolerance}; only a sell is allowed"
    )]
    ExposureBreach {
        asset_ratio: f64,
        rate_limit: f64,
        tolerance: f64,
    },
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Check a proposed order against the current ratios and the active
/// exposure limit. Comparisons happen at 4-decimal rounding, boundaries
/// inclusive. Returns the decision to apply (Hold is normalized to amount
/// 0.0 regardless of what the source proposed).
pub fn validate_order(
    decision: OrderDecision,
    cash_ratio: f64,
    asset_ratio: f64,
    rate_limit: f64,
) -> Result<OrderDecision, OrderRejection> {
    // Once exposure sits more than the tolerance above the limit, any
    // proposal that does not reduce it is refused, Hold included. The
    // orchestrator's forced Hold after retry exhaustion bypasses this.
    let breached = asset_ratio > rate_limit + EXPOSURE_BREACH_TOLERANCE;
    let reduces = decision.kind == OrderKind::Sell && decision.amount > 0.0;
    if breached && !reduces {
        return Err(OrderRejection::ExposureBreach {
            asset_ratio,
            rate_limit,
            tolerance: EXPOSURE_BREACH_TOLERANCE,
        });
    }

    if decision.kind == OrderKind::Hold {
        return Ok(OrderDecision::hold());
    }

    match decision.kind {
        OrderKind::Buy => {
            if round4(decision.amount) > round4(rate_limit) {
                return Err(OrderRejection::BuyAboveLimit {
                    amount: decision.amount,
                    rate_limit,
                });
            }
            if round4(asset_ratio + decision.amount) > round4(rate_limit) {
                return Err(OrderRejection::BuyBreachesLimit {
                    amount: decision.amount,
                    asset_ratio,
                    rate_limit,
                });
            }
            if round4(decision.amount) > round4(cash_ratio) {
                return Err(OrderRejection::BuyExceedsCash {
                    amount: decision.amount,
                    cash_ratio,
                });
            }
        }
        OrderKind::Sell => {
            if round4(decision.amount) > round4(asset_ratio) {
                return Err(OrderRejection::SellExceedsHoldings {
                    amount: decision.amount,
                    asset_ratio,
                });
            }
        }
        OrderKind::Hold => unreachable!(),
    }

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hold_is_normalized_to_zero_amount() {
        let decision = OrderDecision::new(OrderKind::Hold, 0.7);
        let accepted = validate_order(decision, 0.6, 0.4, 0.5).unwrap();
        assert_eq!(accepted, OrderDecision::hold());
    }

    #[test]
    fn buy_at_exact_limit_gap_is_accepted() {
        // asset 0.3, limit 0.5: the remaining 0.2 is inclusive.
        let decision = OrderDecision::new(OrderKind::Buy, 0.2);
        assert!(validate_order(decision, 0.7, 0.3, 0.5).is_ok());
    }

    #[test]
    fn buy_just_past_limit_gap_is_rejected() {
        let decision = OrderDecision::new(OrderKind::Buy, 0.2001);
        let err = validate_order(decision, 0.7, 0.3, 0.5).unwrap_err();
        assert!(matches!(err, OrderRejection::BuyBreachesLimit { .. }));
    }

    #[test]
    fn buy_above_limit_itself_is_rejected() {
        let decision = OrderDecision::new(OrderKind::Buy, 0.6);
        let err = validate_order(decision, 1.0, 0.0, 0.5).unwrap_err();
        assert!(matches!(err, OrderRejection::BuyAboveLimit { .. }));
    }

    #[test]
    fn buy_beyond_cash_is_rejected() {
        // Limit allows it, cash does not.
        let decision = OrderDecision::new(OrderKind::Buy, 0.3);
        let err = validate_order(decision, 0.2, 0.1, 0.9).unwrap_err();
        assert!(matches!(err, OrderRejection::BuyExceedsCash { .. }));
    }

    #[test]
    fn buy_sub_rounding_excess_is_tolerated() {
        // 4-decimal rounding absorbs a 1e-5 overshoot.
        let decision = OrderDecision::new(OrderKind::Buy, 0.20001);
        assert!(validate_order(decision, 0.8, 0.3, 0.5).is_ok());
    }

    #[test]
    fn sell_at_holdings_boundary_is_accepted() {
        let decision = OrderDecision::new(OrderKind::Sell, 0.3);
        assert!(validate_order(decision, 0.7, 0.3, 0.5).is_ok());
    }

    #[test]
    fn sell_above_holdings_is_rejected() {
        let decision = OrderDecision::new(OrderKind::Sell, 0.3001);
        let err = validate_order(decision, 0.7, 0.3, 0.5).unwrap_err();
        assert!(matches!(err, OrderRejection::SellExceedsHoldings { .. }));
    }

    #[test]
    fn breach_within_tolerance_allows_hold_and_buyless_stand() {
        // 0.505 exposure against a 0.5 limit is inside the 1% band.
        let hold = OrderDecision::hold();
        assert!(validate_order(hold, 0.495, 0.505, 0.5).is_ok());
    }

    #[test]
    fn breach_past_tolerance_rejects_non_reducing_proposals() {
        let buy = OrderDecision::new(OrderKind::Buy, 0.01);
        let err = validate_order(buy, 0.48, 0.52, 0.5).unwrap_err();
        assert!(matches!(err, OrderRejection::ExposureBreach { .. }));

        // A sell walks the exposure back and passes.
        let sell = OrderDecision::new(OrderKind::Sell, 0.02);
        assert!(validate_order(sell, 0.48, 0.52, 0.5).is_ok());
    }

    #[test]
    fn breach_past_tolerance_rejects_hold_too() {
        // Exposure must be walked back, not held in place.
        let hold = OrderDecision::new(OrderKind::Hold, 0.0);
        let err = validate_order(hold, 0.4, 0.6, 0.5).unwrap_err();
        assert!(matches!(err, OrderRejection::ExposureBreach { .. }));
    }

    #[test]
    fn rejection_text_is_readable_feedback() {
        let err = validate_order(
            OrderDecision::new(OrderKind::Sell, 0.9),
            0.7,
            0.3,
            0.5,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "sell amount 0.9000 exceeds asset ratio 0.3000"
        );
    }

    proptest! {
        #[test]
        fn oversell_is_always_rejected(
            asset_ratio in 0.0_f64..0.99,
            excess in 0.001_f64..1.0,
        ) {
            let decision = OrderDecision::new(OrderKind::Sell, asset_ratio + excess);
            let result = validate_order(decision, 1.0 - asset_ratio, asset_ratio, 1.0);
            prop_assert!(result.is_err());
        }

        #[test]
        fn accepted_buys_never_exceed_the_limit(
            asset_ratio in 0.0_f64..1.0,
            amount in 0.0_f64..1.0,
            rate_limit in 0.0_f64..1.0,
        ) {
            let cash_ratio = 1.0 - asset_ratio;
            let decision = OrderDecision::new(OrderKind::Buy, amount);
            if let Ok(accepted) =
                validate_order(decision, cash_ratio, asset_ratio, rate_limit)
            {
                prop_assert!(
                    round4(asset_ratio + accepted.amount) <= round4(rate_limit)
                );
            }
        }
    }
}
