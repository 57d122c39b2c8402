//! Passive income, experience, and energy accrual over an elapsed window.
//!
//! All rates are integer units per hour. Accrual is computed in
//! dollar-seconds (`rate x elapsed_secs`) with the sub-hour remainder
//! carried on the player, so splitting one window into any number of
//! smaller ones yields exactly the same totals. Energy regeneration uses
//! the same elapsed window and the same carry discipline; partial
//! application of a window to only some subsystems is the bug class this
//! module exists to prevent.

use contracts::{Business, CaporegimeUnit, SessionConfig, Territory, TerritoryStatus, SECS_PER_HOUR};

/// Cash/XP earned over a window, plus the carries to store back on the
/// player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccrualOutcome {
    pub cash_delta: i64,
    pub xp_delta: i64,
    pub new_income_residue: i64,
    pub new_xp_residue: i64,
}

/// Accrue income and passive experience for `elapsed_secs` at the given
/// per-hour rates. Pure; the caller commits the outcome.
pub fn accrue(
    income_per_hour: i64,
    xp_per_hour: i64,
    income_residue: i64,
    xp_residue: i64,
    elapsed_secs: u64,
) -> AccrualOutcome {
    let (cash_delta, new_income_residue) = split_accrual(income_per_hour, income_residue, elapsed_secs);
    let (xp_delta, new_xp_residue) = split_accrual(xp_per_hour, xp_residue, elapsed_secs);
    AccrualOutcome {
        cash_delta,
        xp_delta,
        new_income_residue,
        new_xp_residue,
    }
}

fn split_accrual(rate_per_hour: i64, residue: i64, elapsed_secs: u64) -> (i64, i64) {
    let total = i128::from(residue) + i128::from(rate_per_hour) * i128::from(elapsed_secs);
    let delta = total / i128::from(SECS_PER_HOUR);
    let remainder = total % i128::from(SECS_PER_HOUR);
    (delta as i64, remainder as i64)
}

/// Energy regenerated over a window: one point per
/// `secs_per_point`, capped at `max_energy`. Returns the new energy, the
/// carry in seconds, and the points actually gained. The carry resets at
/// the cap; energy does not bank beyond full.
pub fn regen_energy(
    energy: i64,
    max_energy: i64,
    residue_secs: u64,
    elapsed_secs: u64,
    secs_per_point: u64,
) -> (i64, u64, i64) {
    if energy >= max_energy {
        return (energy, 0, 0);
    }
    let secs_per_point = secs_per_point.max(1);
    let total = residue_secs + elapsed_secs;
    let points = (total / secs_per_point) as i64;
    let gained = points.min(max_energy - energy);
    let new_energy = energy + gained;
    let new_residue = if new_energy >= max_energy {
        0
    } else {
        total % secs_per_point
    };
    (new_energy, new_residue, gained)
}

/// Derived business income per hour:
/// `base x level x (efficiency/100) x active feature multipliers`.
/// A business that has never been built (level 0) earns nothing.
pub fn business_income_per_hour(business: &Business) -> i64 {
    if business.level == 0 {
        return 0;
    }
    let mut acc = i128::from(business.base_income_per_hour) * i128::from(business.level);
    acc = acc * i128::from(business.efficiency.min(100)) / 100;
    for feature in &business.features {
        if feature.unlocked && feature.active {
            acc = acc * i128::from(feature.income_multiplier_bps) / 10_000;
        }
    }
    acc as i64
}

/// Income contribution of an owned territory, including the boost from an
/// assigned subordinate unit.
pub fn territory_income_per_hour(territory: &Territory, assigned_unit: Option<&CaporegimeUnit>) -> i64 {
    if territory.status != TerritoryStatus::Owned {
        return 0;
    }
    let boost = assigned_unit.map(unit_boost_per_hour).unwrap_or(0);
    territory.income_per_hour + boost
}

/// Per-hour income boost an assigned unit adds to its territory. The same
/// amount accrues on the unit as `earnings_accrued` for display.
pub fn unit_boost_per_hour(unit: &CaporegimeUnit) -> i64 {
    unit.strength / 2
}

/// Passive XP rate: each owned territory generates a fixed trickle.
pub fn passive_xp_per_hour(territories_owned: u32, config: &SessionConfig) -> i64 {
    i64::from(territories_owned) * config.territory_xp_per_hour
}
