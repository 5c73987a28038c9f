//! Expected nuke damage.

use crate::bag::StatBag;
use crate::context::SpellSpec;
use crate::derive::{Derived, DerivedStats};
use crate::rules::CombatRules;
use crate::stat::Stat;
use crate::target::Target;
use serde::{Deserialize, Serialize};

use super::hit::magic_hit_rate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicMetrics {
    pub spell: String,
    pub magic_accuracy: f64,
    pub hit_rate: f64,
    /// Expected damage fraction after resist tiers.
    pub resist_factor: f64,
    pub mab_ratio: f64,
    pub dstat: f64,
    pub base_damage: f64,
    pub weather_factor: f64,
    pub burst_factor: f64,
    pub damage: f64,
}

/// `(100 + MAB) / (100 + target MDB)`.
pub fn mab_ratio(stats: &StatBag, target: &Target) -> f64 {
    (100.0 + stats.get(Stat::MagicAttack)) / (100.0 + target.magic_defense).max(1.0)
}

/// Expected damage fraction for a hit probability `p`.
///
/// Each resist check lands at `p`; the first success deals full damage,
/// then half, then a quarter, and three failures leave an eighth.
pub fn resist_factor(p: f64) -> f64 {
    let miss = 1.0 - p;
    p + miss * p * 0.5 + miss * miss * p * 0.25 + miss * miss * miss * 0.125
}

/// Target attribute opposing a stat in dSTAT.
pub fn target_attribute(target: &Target, stat: Stat) -> f64 {
    match stat {
        Stat::Int => target.int,
        Stat::Mnd => target.mnd,
        Stat::Vit => target.vit,
        Stat::Agi => target.agi,
        _ => 0.0,
    }
}

/// Burst multiplier: skillchain step times `1 + min(MBB, cap) + MBB II`.
pub fn burst_factor(rules: &CombatRules, stats: &StatBag, spell: &SpellSpec) -> f64 {
    if !spell.magic_burst {
        return 1.0;
    }
    let mbb = stats
        .get(Stat::MagicBurstBonus)
        .clamp(0.0, rules.magic_burst_bonus_cap);
    let mbb2 = stats.get(Stat::MagicBurstBonusII).max(0.0);
    rules.skillchain_multiplier(spell.skillchain_steps) * (1.0 + (mbb + mbb2) / 100.0)
}

pub fn simulate(
    rules: &CombatRules,
    stats: &StatBag,
    derived: &DerivedStats,
    target: &Target,
    spell: &SpellSpec,
    weather: f64,
) -> MagicMetrics {
    let magic_accuracy = derived.get(Derived::MagicAccuracy);
    let hit_rate = magic_hit_rate(rules, magic_accuracy, target.magic_evasion);
    let resist = resist_factor(hit_rate);
    let mab = mab_ratio(stats, target);
    let dstat = stats.get(spell.dstat) - target_attribute(target, spell.dstat);
    let base_damage =
        (spell.base_damage + stats.get(Stat::MagicDamage) + dstat * spell.dstat_multiplier).max(0.0);
    let burst = burst_factor(rules, stats, spell);

    MagicMetrics {
        spell: spell.name.clone(),
        magic_accuracy,
        hit_rate,
        resist_factor: resist,
        mab_ratio: mab,
        dstat,
        base_damage,
        weather_factor: weather,
        burst_factor: burst,
        damage: base_damage * mab * resist * weather * burst,
    }
}
