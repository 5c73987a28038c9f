//! Delay, TP gain and time to weaponskill.

use crate::bag::StatBag;
use crate::item::WeaponInfo;
use crate::rules::CombatRules;
use crate::stat::Stat;
use serde::{Deserialize, Serialize};

/// Steady-state TP figures for one gear set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpMetrics {
    pub gear_haste: f64,
    pub magic_haste: f64,
    pub ability_haste: f64,
    /// Dual wield percentage applied; zero when not dual wielding.
    pub dual_wield: f64,
    /// Delay of one attack round in ticks after haste and dual wield.
    pub round_delay: f64,
    /// True when the delay reduction floor was hit.
    pub delay_floored: bool,
    pub round_seconds: f64,
    pub base_tp: f64,
    pub tp_per_hit: f64,
    pub expected_hits: f64,
    pub tp_per_round: f64,
    pub tp_per_second: f64,
}

/// Weapons taking part in auto-attack rounds.
#[derive(Debug, Clone, Copy)]
pub struct Weapons<'a> {
    pub main: &'a WeaponInfo,
    /// Present only when dual wielding.
    pub sub: Option<&'a WeaponInfo>,
}

/// Round delay and TP per hit, without hit counts.
pub fn tp_metrics(
    rules: &CombatRules,
    stats: &StatBag,
    weapons: Weapons<'_>,
    landed: &[f64],
) -> TpMetrics {
    let gear_haste = stats.get(Stat::Haste).clamp(0.0, rules.gear_haste_cap);
    let magic_haste = stats.get(Stat::MagicHaste).clamp(0.0, rules.magic_haste_cap);
    let ability_haste = stats.get(Stat::JobAbilityHaste).clamp(0.0, rules.ability_haste_cap);
    let haste = (gear_haste + magic_haste + ability_haste) / 100.0;

    let dual_wield = match weapons.sub {
        Some(_) => stats.get(Stat::DualWield).clamp(0.0, rules.dual_wield_cap),
        None => 0.0,
    };
    let dw = dual_wield / 100.0;

    let raw_delay = weapons.main.delay + weapons.sub.map(|w| w.delay).unwrap_or(0.0);
    let reduced = raw_delay * (1.0 - dw) * (1.0 - haste);
    let floor = raw_delay * (1.0 - rules.delay_reduction_cap / 100.0);
    let delay_floored = reduced < floor;
    let round_delay = reduced.max(floor);
    let round_seconds = round_delay / 60.0;

    let tp_delay = match weapons.sub {
        Some(sub) => (weapons.main.delay + sub.delay) / 2.0 * (1.0 - dw),
        None => weapons.main.delay,
    };
    let base_tp = rules.base_tp(tp_delay);
    let tp_per_hit = (base_tp * (1.0 + stats.get(Stat::StoreTp) / 100.0)).floor();

    let expected_hits = super::hit::expected(landed);
    let tp_per_round = expected_hits * tp_per_hit;
    let tp_per_second = if round_seconds > 0.0 {
        tp_per_round / round_seconds
    } else {
        0.0
    };

    TpMetrics {
        gear_haste,
        magic_haste,
        ability_haste,
        dual_wield,
        round_delay,
        delay_floored,
        round_seconds,
        base_tp,
        tp_per_hit,
        expected_hits,
        tp_per_round,
        tp_per_second,
    }
}

/// Closed-form time to weaponskill: TP needed over mean TP per second.
pub fn approximate_time_to_ws(tp: &TpMetrics, starting_tp: f64, threshold: f64) -> Option<f64> {
    let needed = (threshold - starting_tp).max(0.0);
    if needed == 0.0 {
        return Some(0.0);
    }
    if tp.tp_per_second <= 0.0 {
        return None;
    }
    Some(needed / tp.tp_per_second)
}

/// Largest number of hit states the exact expectation will solve.
const MAX_HIT_STATES: f64 = 10_000.0;

/// Exact expected time to weaponskill.
///
/// TP only moves in whole hits of `tp_per_hit`, so the state is the number of
/// hits landed so far. With `q[k]` the probability of landing `k` hits in a
/// round, the expected rounds from state `j` are
/// `E(j) = (1 + sum_{k>=1} q[k] E(j + k)) / (1 - q[0])`, solved backwards from
/// the first state at or above the threshold. Returns `None` when the
/// threshold can never be reached or needs more than `MAX_HIT_STATES` hits.
pub fn exact_time_to_ws(
    tp: &TpMetrics,
    landed: &[f64],
    starting_tp: f64,
    threshold: f64,
) -> Option<f64> {
    let needed = threshold - starting_tp;
    if needed <= 0.0 {
        return Some(0.0);
    }
    let q0 = landed.first().copied().unwrap_or(1.0);
    if tp.tp_per_hit <= 0.0 || tp.round_seconds <= 0.0 || q0 >= 1.0 {
        return None;
    }
    let states = (needed / tp.tp_per_hit).ceil();
    if !states.is_finite() || states > MAX_HIT_STATES {
        return None;
    }
    let states = states as usize;
    let mut rounds = vec![0.0; states + landed.len()];
    for j in (0..states).rev() {
        let ahead: f64 = landed
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, q)| q * rounds[j + k])
            .sum();
        rounds[j] = (1.0 + ahead) / (1.0 - q0);
    }
    Some(rounds[0] * tp.round_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::SkillType;
    use crate::simulation::hit::{landed_distribution, swing_distribution};

    fn sword() -> WeaponInfo {
        WeaponInfo::new(150.0, 240.0, SkillType::Sword)
    }

    #[test]
    fn test_single_wield_round() {
        let rules = CombatRules::default();
        let stats = StatBag::new()
            .with(Stat::StoreTp, 10.0)
            .with(Stat::Haste, 10.0);
        let landed = landed_distribution(&swing_distribution(&rules, 10.0, 0.0, 0.0), 0.95);
        let main = sword();
        let tp = tp_metrics(&rules, &stats, Weapons { main: &main, sub: None }, &landed);
        assert_eq!(tp.base_tp, 75.0);
        assert_eq!(tp.tp_per_hit, 82.0);
        assert!((tp.round_seconds - 3.6).abs() < 1e-9);
        assert!((tp.tp_per_round - 85.69).abs() < 1e-9);
    }

    #[test]
    fn test_delay_floor() {
        let rules = CombatRules::default();
        let stats = StatBag::new()
            .with(Stat::Haste, 25.0)
            .with(Stat::MagicHaste, 43.75)
            .with(Stat::JobAbilityHaste, 25.0)
            .with(Stat::DualWield, 80.0);
        let main = sword();
        let sub = sword();
        let tp = tp_metrics(&rules, &stats, Weapons { main: &main, sub: Some(&sub) }, &[0.0, 1.0]);
        assert!(tp.delay_floored);
        assert!((tp.round_delay - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_dual_wield_ignored_without_sub() {
        let rules = CombatRules::default();
        let stats = StatBag::new().with(Stat::DualWield, 30.0);
        let main = sword();
        let tp = tp_metrics(&rules, &stats, Weapons { main: &main, sub: None }, &[0.0, 1.0]);
        assert_eq!(tp.dual_wield, 0.0);
        assert_eq!(tp.round_delay, 240.0);
    }

    #[test]
    fn test_zero_delay_is_unreachable_at_both_depths() {
        let rules = CombatRules::default();
        let main = WeaponInfo::new(150.0, 0.0, SkillType::Sword);
        let landed = [0.0, 1.0];
        let tp = tp_metrics(&rules, &StatBag::new(), Weapons { main: &main, sub: None }, &landed);
        assert_eq!(tp.round_seconds, 0.0);
        assert_eq!(approximate_time_to_ws(&tp, 0.0, 1000.0), None);
        assert_eq!(exact_time_to_ws(&tp, &landed, 0.0, 1000.0), None);
    }

    #[test]
    fn test_exact_time_bounds_state_count() {
        let rules = CombatRules::default();
        let main = sword();
        let landed = [0.0, 1.0];
        let tp = tp_metrics(&rules, &StatBag::new(), Weapons { main: &main, sub: None }, &landed);
        assert_eq!(exact_time_to_ws(&tp, &landed, -1e15, 1000.0), None);
    }

    #[test]
    fn test_exact_time_with_certain_hits() {
        let rules = CombatRules::default();
        let main = sword();
        let tp = tp_metrics(&rules, &StatBag::new(), Weapons { main: &main, sub: None }, &[0.0, 1.0]);
        // 75 TP per hit, one hit per 4 second round: 14 rounds to reach 1000.
        let time = exact_time_to_ws(&tp, &[0.0, 1.0], 0.0, 1000.0).unwrap();
        assert!((time - 56.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_time_accounts_for_misses() {
        let rules = CombatRules::default();
        let main = sword();
        let landed = [0.5, 0.5];
        let tp = tp_metrics(&rules, &StatBag::new(), Weapons { main: &main, sub: None }, &landed);
        let time = exact_time_to_ws(&tp, &landed, 0.0, 1000.0).unwrap();
        assert!((time - 112.0).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_threshold() {
        let rules = CombatRules::default();
        let main = sword();
        let tp = tp_metrics(&rules, &StatBag::new(), Weapons { main: &main, sub: None }, &[1.0]);
        assert!(exact_time_to_ws(&tp, &[1.0], 0.0, 1000.0).is_none());
        assert!(approximate_time_to_ws(&tp, 0.0, 1000.0).is_none());
        assert_eq!(exact_time_to_ws(&tp, &[1.0], 1200.0, 1000.0), Some(0.0));
    }
}
