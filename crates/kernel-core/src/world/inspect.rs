use super::*;

use contracts::TerritoryStatus;
use serde_json::{json, Value};

use crate::ledger;

impl EmpireWorld {
    /// Player view for the API layer: the state plus the derived numbers
    /// the UI renders on the profile screen.
    pub fn inspect_player(&self) -> Value {
        let businesses_owned = self
            .businesses
            .values()
            .filter(|business| business.level > 0)
            .count();
        let territories_owned = self
            .territories
            .values()
            .filter(|territory| territory.status == TerritoryStatus::Owned)
            .count();
        let income_per_hour: i64 = self
            .businesses
            .values()
            .map(|business| business.current_income_per_hour)
            .sum::<i64>()
            + self
                .territories
                .values()
                .filter(|territory| territory.status == TerritoryStatus::Owned)
                .map(|territory| territory.income_per_hour)
                .sum::<i64>();
        json!({
            "player": self.player,
            "rank": self.player.rank.as_str(),
            "businesses_owned": businesses_owned,
            "territories_owned": territories_owned,
            "passive_income_per_hour": income_per_hour,
            "soldiers_available": self.units.values().map(|unit| unit.garrison).sum::<u32>(),
            "max_units": self.config.max_units_at(self.player.level),
            "units_commanded": self.units.len(),
        })
    }

    /// Business view with live timer progress at `now`.
    pub fn inspect_business(&self, business_id: &str, now: u64) -> Option<Value> {
        let business = self.businesses.get(business_id)?;
        let pending = business.pending_action.as_ref().map(|action| {
            json!({
                "action": action,
                "progress": ledger::progress(action, now),
                "completes_at": action.ends_at(),
            })
        });
        Some(json!({
            "business": business,
            "pending": pending,
        }))
    }

    /// Territory view with live attack progress at `now`.
    pub fn inspect_territory(&self, territory_id: &str, now: u64) -> Option<Value> {
        let territory = self.territories.get(territory_id)?;
        let pending = territory.pending_attack.as_ref().map(|action| {
            json!({
                "action": action,
                "progress": ledger::progress(action, now),
                "resolves_at": action.ends_at(),
            })
        });
        Some(json!({
            "territory": territory,
            "assigned_unit": territory
                .assigned_unit_id
                .as_deref()
                .and_then(|unit_id| self.units.get(unit_id)),
            "pending": pending,
        }))
    }
}
