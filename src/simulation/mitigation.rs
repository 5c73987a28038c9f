//! Damage taken channels and defensive stats.

use crate::bag::StatBag;
use crate::rules::CombatRules;
use crate::stat::Stat;
use serde::{Deserialize, Serialize};

use super::Capped;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationMetrics {
    pub dt: Capped,
    pub pdt: Capped,
    pub mdt: Capped,
    /// DT + PDT.
    pub physical: Capped,
    /// DT + MDT.
    pub magical: Capped,
    pub hp: f64,
    pub defense: f64,
    pub evasion: f64,
    pub magic_evasion: f64,
}

impl MitigationMetrics {
    /// Physical damage reduction as a positive percentage.
    pub fn physical_reduction(&self) -> f64 {
        -self.physical.effective
    }

    pub fn magical_reduction(&self) -> f64 {
        -self.magical.effective
    }
}

/// A damage-taken channel: negative values reduce damage, floored by the rules.
fn channel(rules: &CombatRules, raw: f64) -> Capped {
    Capped {
        raw,
        effective: raw.max(rules.damage_taken_floor),
        capped: raw <= rules.damage_taken_floor,
    }
}

pub fn simulate(rules: &CombatRules, stats: &StatBag) -> MitigationMetrics {
    let dt = stats.get(Stat::DamageTaken);
    let pdt = stats.get(Stat::PhysicalDamageTaken);
    let mdt = stats.get(Stat::MagicalDamageTaken);
    MitigationMetrics {
        dt: channel(rules, dt),
        pdt: channel(rules, pdt),
        mdt: channel(rules, mdt),
        physical: channel(rules, dt + pdt),
        magical: channel(rules, dt + mdt),
        hp: stats.get(Stat::Hp),
        defense: stats.get(Stat::Defense),
        evasion: stats.get(Stat::Evasion),
        magic_evasion: stats.get(Stat::MagicEvasion),
    }
}
