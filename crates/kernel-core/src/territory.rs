//! Territory attack strength and outcome resolution.
//!
//! Unlike crimes, attack outcomes are deterministic: committed force
//! against stored defense, strict greater-than. The time cost and the
//! soldier-loss penalty are the risk; there is no dice roll to blame.

use contracts::{Attributes, SessionConfig, TerritoryOwner, TerritoryStatus};

/// Effective attacking strength: ten points per committed soldier, scaled
/// by the player's strength and speed attributes (two percent each).
pub fn attack_strength(committed_soldiers: u32, attributes: &Attributes) -> i64 {
    let base = i64::from(committed_soldiers) * 10;
    let modifier = 100 + 2 * i64::from(attributes.strength) + 2 * i64::from(attributes.speed);
    base * modifier / 100
}

/// Capture requires strictly more strength than defense; a tie holds.
pub fn attack_succeeds(strength: i64, defense: i64) -> bool {
    strength > defense
}

/// Soldiers lost when an attack is repelled.
pub fn failure_losses(committed_soldiers: u32, config: &SessionConfig) -> u32 {
    let lost =
        u64::from(committed_soldiers) * u64::from(config.soldier_loss_bps.min(10_000)) / 10_000;
    lost as u32
}

/// Status a territory reverts to when an attack on it fails.
pub fn status_for_owner(owner: TerritoryOwner) -> TerritoryStatus {
    match owner {
        TerritoryOwner::Player => TerritoryStatus::Owned,
        TerritoryOwner::Enemy => TerritoryStatus::Enemy,
        TerritoryOwner::Neutral => TerritoryStatus::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmodified_strength_is_ten_per_soldier() {
        let raw = Attributes::default();
        assert_eq!(attack_strength(12, &raw), 120);
    }

    #[test]
    fn attributes_scale_strength() {
        let honed = Attributes {
            strength: 10,
            speed: 5,
            ..Attributes::default()
        };
        // 12 soldiers x 10 x 130%.
        assert_eq!(attack_strength(12, &honed), 156);
    }

    #[test]
    fn ties_hold_the_territory() {
        assert!(!attack_succeeds(100, 100));
        assert!(!attack_succeeds(99, 100));
        assert!(attack_succeeds(101, 100));
    }

    #[test]
    fn failure_losses_round_down() {
        let config = SessionConfig::default();
        // 2_500 bps of 10 soldiers.
        assert_eq!(failure_losses(10, &config), 2);
        assert_eq!(failure_losses(3, &config), 0);
        assert_eq!(failure_losses(0, &config), 0);
    }

    #[test]
    fn revert_status_follows_owner_tag() {
        assert_eq!(
            status_for_owner(TerritoryOwner::Enemy),
            TerritoryStatus::Enemy
        );
        assert_eq!(
            status_for_owner(TerritoryOwner::Neutral),
            TerritoryStatus::Neutral
        );
        assert_eq!(
            status_for_owner(TerritoryOwner::Player),
            TerritoryStatus::Owned
        );
    }
}
