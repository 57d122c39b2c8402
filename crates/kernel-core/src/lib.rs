//! Deterministic progression/economy kernel for the empire simulation.
//!
//! The kernel owns one player's state tree (player, businesses,
//! territories, subordinate units, missions) and advances it over elapsed
//! wall-clock time: passive income and energy regeneration accrue for the
//! offline window, due timed actions (builds, upgrades, territory attacks)
//! resolve in deterministic order, and every mutation is validated fully
//! before any state changes. All randomness flows through a session-seeded
//! generator so identical inputs replay identically.

pub mod clock;
pub mod crime;
pub mod economy;
pub mod ledger;
pub mod progression;
pub mod territory;
pub mod world;

pub use world::{EmpireWorld, EngineError};
