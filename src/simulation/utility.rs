//! Fast cast, burst bonus, enhancing duration and healing potency.

use crate::bag::StatBag;
use crate::rules::CombatRules;
use crate::stat::Stat;
use serde::{Deserialize, Serialize};

use super::Capped;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityMetrics {
    pub fast_cast: Capped,
    pub magic_burst_bonus: Capped,
    /// Not subject to any ceiling.
    pub magic_burst_bonus_ii: f64,
    pub enhancing_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingMetrics {
    pub cure_potency: Capped,
    pub cure_potency_ii: Capped,
    /// Effective cure potency I and II combined.
    pub total: f64,
}

/// Clamp a value into `[0, cap]`, flagging when the cap is reached.
fn ceiling(raw: f64, cap: f64) -> Capped {
    Capped {
        raw,
        effective: raw.clamp(0.0, cap),
        capped: raw >= cap,
    }
}

pub fn simulate(rules: &CombatRules, stats: &StatBag) -> UtilityMetrics {
    UtilityMetrics {
        fast_cast: ceiling(stats.get(Stat::FastCast), rules.fast_cast_cap),
        magic_burst_bonus: ceiling(
            stats.get(Stat::MagicBurstBonus),
            rules.magic_burst_bonus_cap,
        ),
        magic_burst_bonus_ii: stats.get(Stat::MagicBurstBonusII),
        enhancing_duration: stats.get(Stat::EnhancingDuration),
    }
}

pub fn healing(rules: &CombatRules, stats: &StatBag) -> HealingMetrics {
    let cure_potency = ceiling(stats.get(Stat::CurePotency), rules.cure_potency_cap);
    let cure_potency_ii = ceiling(stats.get(Stat::CurePotencyII), rules.cure_potency_ii_cap);
    let total = cure_potency.effective + cure_potency_ii.effective;
    HealingMetrics {
        cure_potency,
        cure_potency_ii,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_cast_bounds() {
        let rules = CombatRules::default();
        let high = simulate(&rules, &StatBag::new().with(Stat::FastCast, 95.0));
        assert_eq!(high.fast_cast.effective, 80.0);
        assert!(high.fast_cast.capped);
        let negative = simulate(&rules, &StatBag::new().with(Stat::FastCast, -5.0));
        assert_eq!(negative.fast_cast.effective, 0.0);
    }

    #[test]
    fn test_burst_ii_unbounded() {
        let rules = CombatRules::default();
        let stats = StatBag::new()
            .with(Stat::MagicBurstBonus, 55.0)
            .with(Stat::MagicBurstBonusII, 70.0);
        let metrics = simulate(&rules, &stats);
        assert_eq!(metrics.magic_burst_bonus.effective, 40.0);
        assert_eq!(metrics.magic_burst_bonus_ii, 70.0);
    }

    #[test]
    fn test_cure_potency_caps() {
        let rules = CombatRules::default();
        let stats = StatBag::new()
            .with(Stat::CurePotency, 56.0)
            .with(Stat::CurePotencyII, 12.0);
        let metrics = healing(&rules, &stats);
        assert_eq!(metrics.cure_potency.effective, 50.0);
        assert!(!metrics.cure_potency_ii.capped);
        assert_eq!(metrics.total, 62.0);
    }
}
