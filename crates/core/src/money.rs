//! Commission and net-capital arithmetic.
//!
//! Commission is rounded half away from zero to cents; net capital is
//! the exact difference, so `commission + net_capital == gross_total`
//! always holds.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::DisbursementFigures;

/// Round a monetary value to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the disbursement figures for a validated gross total.
pub fn disbursement_figures(gross_total: Decimal, commission_rate: Decimal) -> DisbursementFigures {
    let commission = round_cents(gross_total * commission_rate);
    DisbursementFigures {
        gross_total,
        commission_rate,
        commission,
        net_capital: gross_total - commission,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
