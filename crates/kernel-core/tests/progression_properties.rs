use contracts::catalog::Catalog;
use contracts::{EventType, SessionConfig};
use kernel_core::world::EmpireWorld;
use kernel_core::{clock, economy, progression};
use proptest::prelude::*;

const T0: u64 = 1_700_000_000;

proptest! {
    #[test]
    fn accrual_split_equals_whole(
        rate in 0_i64..5_000,
        elapsed in 0_u64..200_000,
        cut in 0_u64..200_000,
    ) {
        let cut = cut.min(elapsed);
        let whole = economy::accrue(rate, 0, 0, 0, elapsed);
        let first = economy::accrue(rate, 0, 0, 0, cut);
        let second = economy::accrue(rate, 0, first.new_income_residue, 0, elapsed - cut);
        prop_assert_eq!(
            whole.cash_delta,
            first.cash_delta + second.cash_delta
        );
        prop_assert_eq!(whole.new_income_residue, second.new_income_residue);
    }

    #[test]
    fn accrual_is_never_negative(rate in 0_i64..5_000, elapsed in 0_u64..500_000) {
        let outcome = economy::accrue(rate, 0, 0, 0, elapsed);
        prop_assert!(outcome.cash_delta >= 0);
        prop_assert!(outcome.new_income_residue >= 0);
        prop_assert!(outcome.new_income_residue < 3_600);
    }

    #[test]
    fn elapsed_never_exceeds_ceiling(
        last in 0_u64..u64::MAX / 2,
        delta in 0_u64..u64::MAX / 4,
        ceiling in 1_u64..1_000_000,
    ) {
        let window = clock::elapsed_since(last, last + delta, ceiling);
        prop_assert!(window.seconds <= ceiling);
        prop_assert!(!window.skew_detected);
        prop_assert_eq!(window.seconds, delta.min(ceiling));
    }

    #[test]
    fn experience_grants_split_cleanly(first in 0_i64..50_000, second in 0_i64..50_000) {
        let catalog = Catalog::default();
        let mut config = SessionConfig::default();
        config.territory_xp_per_hour = 0;

        // Granting `first + second` at once must land exactly where
        // granting `first`, resolving, then granting `second` does.
        let grant = |world: &mut EmpireWorld, amount: i64, resolve_at: u64| {
            let mut snapshot = world.snapshot();
            snapshot.player.experience += amount;
            *world = EmpireWorld::from_snapshot(
                world.config().clone(),
                world.catalog().clone(),
                snapshot,
            );
            world.advance_to(resolve_at);
        };

        let mut whole = EmpireWorld::new(config.clone(), catalog.clone(), T0);
        grant(&mut whole, first + second, T0 + 60);
        whole.advance_to(T0 + 120);

        let mut split = EmpireWorld::new(config, catalog, T0);
        grant(&mut split, first, T0 + 60);
        grant(&mut split, second, T0 + 120);

        prop_assert_eq!(whole.player().level, split.player().level);
        prop_assert_eq!(whole.player().experience, split.player().experience);
        prop_assert_eq!(
            whole.player().unspent_attribute_points,
            split.player().unspent_attribute_points
        );
        prop_assert_eq!(whole.player().cash, split.player().cash);
    }

    #[test]
    fn regen_never_exceeds_cap(
        energy in 0_i64..50,
        max in 1_i64..50,
        elapsed in 0_u64..1_000_000,
        residue in 0_u64..1_000,
    ) {
        let energy = energy.min(max);
        let (new_energy, new_residue, gained) =
            economy::regen_energy(energy, max, residue, elapsed, 180);
        prop_assert!(new_energy <= max);
        prop_assert!(new_energy >= energy);
        prop_assert!(gained >= 0);
        prop_assert!(new_residue < 180 || new_energy == max);
    }

    #[test]
    fn leveling_resolves_any_backlog_in_one_pass(xp in 0_i64..2_000_000) {
        let catalog = Catalog::default();
        let config = SessionConfig::default();
        let world = EmpireWorld::new(config, catalog.clone(), T0);
        // Inject an arbitrary XP backlog through the snapshot boundary; the
        // next pass must resolve every level it covers.
        let mut snapshot = world.snapshot();
        snapshot.player.experience += xp;
        let mut world =
            EmpireWorld::from_snapshot(world.config().clone(), catalog.clone(), snapshot);
        world.advance_to(T0 + 60);

        let player = world.player();
        prop_assert!(player.experience < player.experience_to_next);
        prop_assert_eq!(
            player.experience_to_next,
            progression::xp_to_next(&catalog.leveling_curve, player.level)
        );
    }
}

#[test]
fn offline_catch_up_resolves_everything_in_one_pass() {
    let catalog = Catalog::default();
    let config = SessionConfig::default();
    let mut world = EmpireWorld::new(config, catalog, T0);

    world.start_build("biz:laundromat", T0).expect("build starts");
    world
        .commit_crime("crime:pickpocket", T0)
        .expect("crime commits");

    // Come back half a day later: the build resolved, income accrued,
    // energy refilled, and the pass committed exactly once.
    let events = world.advance_to(T0 + 43_200);
    let types: Vec<EventType> = events.iter().map(|event| event.event_type).collect();
    assert!(types.contains(&EventType::BuildCompleted));
    assert!(types.contains(&EventType::CatchUpApplied));
    assert_eq!(world.player().last_income_collection, T0 + 43_200);
    assert_eq!(world.player().energy, world.player().max_energy);

    let laundromat = world
        .businesses()
        .find(|business| business.business_id == "biz:laundromat")
        .expect("exists");
    assert_eq!(laundromat.level, 1);
    assert!(laundromat.pending_action.is_none());
}

#[test]
fn snapshot_json_round_trip_is_lossless() {
    let catalog = Catalog::default();
    let config = SessionConfig::default();
    let mut world = EmpireWorld::new(config, catalog, T0);
    world.start_build("biz:laundromat", T0).expect("build starts");
    world.advance_to(T0 + 60);

    let snapshot = world.snapshot();
    let raw = serde_json::to_string(&snapshot).expect("serialize");
    let back: contracts::Snapshot = serde_json::from_str(&raw).expect("deserialize");
    assert_eq!(back, snapshot);
}
