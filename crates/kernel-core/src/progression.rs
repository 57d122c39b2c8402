//! Leveling curve and experience resolution.
//!
//! `apply_experience` is multi-level-up capable: one large offline grant
//! walks the curve as many steps as it covers, carrying leftover XP into
//! the new level's counter. The curve is strictly increasing in level, so
//! the loop always terminates.

use contracts::{PlayerState, Rank, SessionConfig};

/// XP required to clear `level`. Table lookup while the catalog curve
/// covers the level; quadratic extension past the end of the table. Both
/// branches are strictly increasing in level.
pub fn xp_to_next(curve: &[i64], level: u32) -> i64 {
    let index = level.saturating_sub(1) as usize;
    if let Some(required) = curve.get(index) {
        return *required;
    }
    let last = curve.last().copied().unwrap_or(100);
    let past_end = (index - curve.len()) as i64 + 1;
    last + 1_000 * past_end + 100 * past_end * past_end
}

/// Outcome of one experience resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelUpSummary {
    pub levels_gained: u32,
    pub points_granted: u32,
    pub new_level: u32,
    pub rank_promoted: bool,
    pub new_rank: Rank,
}

/// Apply earned experience to the player, resolving every level-up it
/// covers and recomputing rank and level-derived caps. Leftover XP stays
/// strictly below the new requirement.
pub fn apply_experience(
    player: &mut PlayerState,
    xp_delta: i64,
    curve: &[i64],
    config: &SessionConfig,
) -> LevelUpSummary {
    debug_assert!(xp_delta >= 0, "experience grants are non-negative");
    let previous_rank = player.rank;
    player.experience += xp_delta.max(0);

    let mut levels_gained = 0_u32;
    while player.experience >= player.experience_to_next {
        player.experience -= player.experience_to_next;
        player.level += 1;
        levels_gained += 1;
        player.experience_to_next = xp_to_next(curve, player.level);
    }

    if levels_gained > 0 {
        player.unspent_attribute_points += levels_gained * config.attribute_points_per_level;
        player.rank = Rank::for_level(player.level);
        player.max_energy = config.max_energy_at(player.level);
        player.energy = player.energy.min(player.max_energy);
    }

    LevelUpSummary {
        levels_gained,
        points_granted: levels_gained * config.attribute_points_per_level,
        new_level: player.level,
        rank_promoted: player.rank != previous_rank,
        new_rank: player.rank,
    }
}
