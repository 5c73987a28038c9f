//! Expected weaponskill damage.

use crate::bag::StatBag;
use crate::context::WeaponskillSpec;
use crate::derive::{Derived, DerivedStats};
use crate::item::WeaponInfo;
use crate::rules::CombatRules;
use crate::stat::{Stat, StatKey};
use crate::target::Target;
use serde::{Deserialize, Serialize};

use super::hit::{hit_rate, magic_hit_rate};
use super::magic::{mab_ratio, resist_factor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponskillMetrics {
    pub name: String,
    pub tp_used: f64,
    pub ftp: f64,
    pub wsc: f64,
    pub fstr: f64,
    /// Per-hit base damage before fTP and pDIF.
    pub base_damage: f64,
    /// Expected pDIF including crits; for magical weaponskills the MAB ratio.
    pub pdif: f64,
    pub crit_rate: f64,
    pub hit_rate: f64,
    pub expected_hits: f64,
    pub damage: f64,
    pub magical: bool,
}

/// fTP at a TP value, linear between the 1000/2000/3000 points.
pub fn ftp_at(ftp: &[f64; 3], tp: f64) -> f64 {
    let tp = tp.clamp(1000.0, 3000.0);
    if tp <= 2000.0 {
        ftp[0] + (ftp[1] - ftp[0]) * (tp - 1000.0) / 1000.0
    } else {
        ftp[1] + (ftp[2] - ftp[1]) * (tp - 2000.0) / 1000.0
    }
}

/// Weighted sum of modifier stats.
pub fn wsc(modifiers: &StatBag, stats: &StatBag) -> f64 {
    modifiers
        .iter()
        .filter_map(|(key, ratio)| match key {
            StatKey::Known(stat) => Some(stats.get(stat) * ratio),
            StatKey::Passthrough(_) => None,
        })
        .sum()
}

pub struct WeaponskillInput<'a> {
    pub spec: &'a WeaponskillSpec,
    pub weapon: &'a WeaponInfo,
    pub stats: &'a StatBag,
    pub derived: &'a DerivedStats,
    pub target: &'a Target,
    pub rules: &'a CombatRules,
    pub threshold: f64,
    /// Expected main-hand swings per round, for multi-attack extra hits.
    pub main_swings: f64,
    /// Weather multiplier for magical weaponskills.
    pub weather: f64,
}

pub fn simulate(input: &WeaponskillInput<'_>) -> WeaponskillMetrics {
    let WeaponskillInput {
        spec,
        weapon,
        stats,
        derived,
        target,
        rules,
        ..
    } = *input;

    let tp_used = (input.threshold + stats.get(Stat::TpBonus)).min(rules.tp_max);
    let ftp = ftp_at(&spec.ftp, tp_used);
    let wsc = wsc(&spec.modifiers, stats);
    let wsd = 1.0 + stats.get(Stat::WeaponskillDamage) / 100.0;

    if spec.magical.is_some() {
        let macc = derived.get(Derived::MagicAccuracy);
        let hit = magic_hit_rate(rules, macc, target.magic_evasion);
        let mab = mab_ratio(stats, target);
        let base_damage = spec.base_damage + weapon.damage + wsc;
        let damage = base_damage * ftp * mab * resist_factor(hit) * input.weather * wsd;
        return WeaponskillMetrics {
            name: spec.name.clone(),
            tp_used,
            ftp,
            wsc,
            fstr: 0.0,
            base_damage,
            pdif: mab,
            crit_rate: 0.0,
            hit_rate: hit,
            expected_hits: 1.0,
            damage,
            magical: true,
        };
    }

    let rank = (weapon.damage / rules.weapon_rank_divisor).floor();
    let fstr = rules
        .fstr(stats.get(Stat::Str) - target.vit)
        .clamp(-rank, rank + 8.0);
    let base_damage = weapon.damage + fstr + wsc;

    let pdif_cap = if weapon.is_two_handed() {
        rules.pdif_cap_two_handed
    } else {
        rules.pdif_cap_one_handed
    };
    let ratio = if target.defense > 0.0 {
        derived.get(Derived::MainAttack) / target.defense
    } else {
        pdif_cap
    };
    let pdif = ratio.min(pdif_cap);
    let crit_pdif =
        (ratio + rules.crit_pdif_bonus).min(pdif_cap) * (1.0 + stats.get(Stat::CritDamage) / 100.0);
    let crit_rate = if spec.crit {
        derived.get(Derived::CritRate) / 100.0
    } else {
        0.0
    };
    let expected_pdif = (1.0 - crit_rate) * pdif + crit_rate * crit_pdif;

    let hit = hit_rate(
        rules,
        derived.get(Derived::WeaponskillAccuracy),
        target.evasion,
    );
    let extra_swings = (input.main_swings - 1.0).max(0.0);
    let max_extra = (rules.max_swings as f64 - f64::from(spec.hits)).max(0.0);
    let additional_hits = f64::from(spec.hits.saturating_sub(1)) + extra_swings.min(max_extra);
    let additional_ftp = if spec.ftp_replicating { ftp } else { 1.0 };

    let first = base_damage * ftp * expected_pdif;
    let additional = base_damage * additional_ftp * expected_pdif;
    let damage = (hit * first + hit * additional_hits * additional) * wsd;

    WeaponskillMetrics {
        name: spec.name.clone(),
        tp_used,
        ftp,
        wsc,
        fstr,
        base_damage,
        pdif: expected_pdif,
        crit_rate,
        hit_rate: hit,
        expected_hits: hit * (1.0 + additional_hits),
        damage,
        magical: false,
    }
}
