//! Probabilistic crime resolution.
//!
//! The draw itself is pure given a generator; all gating (level, energy,
//! cooldown) happens in the orchestrator before any state changes. The
//! generator is the session-seeded one the orchestrator owns, never
//! ambient process randomness, so test runs replay exactly.

use contracts::catalog::CrimeDefinition;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrimeOutcome {
    pub success: bool,
    pub reward: i64,
    pub xp: i64,
}

/// Draw a crime outcome. A `success_bps` of 10_000 always succeeds and 0
/// always fails; the reward is sampled uniformly from the definition's
/// range on success. Failure earns nothing; the energy the caller
/// already spent is the cost of getting caught.
pub fn resolve_crime(definition: &CrimeDefinition, rng: &mut impl Rng) -> CrimeOutcome {
    let roll: u32 = rng.gen_range(0..10_000);
    if roll >= definition.success_bps {
        return CrimeOutcome {
            success: false,
            reward: 0,
            xp: 0,
        };
    }
    let reward = if definition.max_reward > definition.min_reward {
        rng.gen_range(definition.min_reward..=definition.max_reward)
    } else {
        definition.min_reward
    };
    CrimeOutcome {
        success: true,
        reward,
        xp: definition.xp_reward,
    }
}
