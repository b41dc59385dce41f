//! Partitioning of an approved capital total into irregular tranches.
//!
//! Every tranche lies in the closed policy interval, carries non-round
//! cents, avoids exact repeats where possible, and the tranches sum to
//! the total exactly at cent precision. All arithmetic is Decimal at
//! scale 2, so the exact-sum invariant is not a rounding accident.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Policy bounds for a single tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionPolicy {
    pub min: Decimal,
    pub max: Decimal,
    /// Randomization retries per tranche before accepting a repeat.
    pub max_retries: u32,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        PartitionPolicy {
            min: Decimal::new(100_000_00, 2),
            max: Decimal::new(349_999_99, 2),
            max_retries: 10,
        }
    }
}

/// Split `total` into tranches within `[policy.min, policy.max]` that
/// sum to `total` exactly. Totals at or below the minimum come back as
/// a single tranche.
pub fn partition(total: Decimal, policy: &PartitionPolicy, rng: &mut impl Rng) -> Vec<Decimal> {
    let total = quantize(total);
    if total <= policy.min {
        return vec![total];
    }

    let mut tranches: Vec<Decimal> = Vec::new();
    let mut remaining = total;

    // Plan the tranche count off the interval midpoint so the final
    // tranche is not left tiny.
    let average = (policy.min + policy.max) / Decimal::from(2);
    let planned = (total / average).trunc().to_i64().unwrap_or(1).max(1);

    for i in 0..planned {
        if remaining <= policy.min {
            break;
        }

        // Reserve at least `min` for every tranche still to come.
        let left_after_this = planned - i - 1;
        let reserve = policy.min * Decimal::from(left_after_this);
        let mut cap = (remaining - reserve).min(policy.max);
        if cap < policy.min {
            cap = policy.min;
        }
        if cap > remaining {
            cap = remaining;
        }

        let mut amount = random_amount(policy.min, cap, rng);
        let mut attempts = 0;
        while tranches.contains(&amount) && attempts < policy.max_retries {
            amount = random_amount(policy.min, cap, rng);
            attempts += 1;
        }

        tranches.push(amount);
        remaining -= amount;
    }

    reconcile_remainder(&mut tranches, remaining, total, policy, rng);

    debug_assert_eq!(tranches.iter().sum::<Decimal>(), total);
    tranches
}

/// Fold a leftover remainder back into the tranche list without
/// breaking the interval invariant.
fn reconcile_remainder(
    tranches: &mut Vec<Decimal>,
    remaining: Decimal,
    total: Decimal,
    policy: &PartitionPolicy,
    rng: &mut impl Rng,
) {
    if remaining <= Decimal::ZERO {
        if tranches.is_empty() {
            tranches.push(total);
        }
        return;
    }

    if remaining >= policy.min && remaining <= policy.max {
        tranches.push(remaining);
        return;
    }

    if remaining > policy.max {
        // Too big for one tranche: partition the remainder itself.
        tranches.extend(partition(remaining, policy, rng));
        return;
    }

    // Small remainder: merge into the last tranche, splitting in two
    // if the merge would overflow the interval.
    match tranches.pop() {
        None => tranches.push(remaining),
        Some(last) => {
            let combined = last + remaining;
            if combined <= policy.max {
                tranches.push(combined);
            } else {
                let half = quantize(combined / Decimal::from(2));
                let rest = combined - half;
                if half >= policy.min && rest >= policy.min {
                    tranches.push(half);
                    tranches.push(rest);
                } else {
                    // Degenerate policy (max < 2 * min): a repeat or an
                    // out-of-interval tranche is unavoidable here.
                    tranches.push(last);
                    tranches.push(remaining);
                }
            }
        }
    }
}

/// Uniformly random cent amount in `[min, cap]`.
fn random_amount(min: Decimal, cap: Decimal, rng: &mut impl Rng) -> Decimal {
    let range_cents = ((cap - min) * Decimal::from(100))
        .trunc()
        .to_i64()
        .unwrap_or(0);
    if range_cents <= 0 {
        return min;
    }
    min + Decimal::new(rng.gen_range(0..=range_cents), 2)
}

fn quantize(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
