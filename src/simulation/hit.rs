//! Hit rate and per-round hit distributions.

use crate::rules::CombatRules;
use serde::{Deserialize, Serialize};

/// Accuracy and hit rate for one hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandAccuracy {
    pub accuracy: f64,
    /// Probability in `[0, 1]`.
    pub hit_rate: f64,
}

/// How accuracy was built, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyBreakdown {
    pub skill: f64,
    pub dex: f64,
    pub flat: f64,
    pub target_evasion: f64,
    pub main: HandAccuracy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<HandAccuracy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranged: Option<HandAccuracy>,
}

/// Physical hit rate as a probability.
///
/// `base + (accuracy - evasion) / 2`, clamped to the rules' floor and ceiling.
pub fn hit_rate(rules: &CombatRules, accuracy: f64, evasion: f64) -> f64 {
    let percent = rules.base_hit_rate + (accuracy - evasion) / 2.0;
    percent.clamp(rules.hit_rate_floor, rules.hit_rate_ceiling) / 100.0
}

/// Magic hit rate as a probability.
pub fn magic_hit_rate(rules: &CombatRules, accuracy: f64, evasion: f64) -> f64 {
    let percent = rules.base_magic_hit_rate + (accuracy - evasion) / 2.0;
    percent.clamp(rules.magic_hit_rate_floor, rules.magic_hit_rate_ceiling) / 100.0
}

/// Distribution of swings per round for one hand, indexed by swing count.
///
/// Quad attack is checked first, then triple, then double; each rate is a
/// percentage capped by the rules.
pub fn swing_distribution(rules: &CombatRules, da: f64, ta: f64, qa: f64) -> [f64; 5] {
    let qa = qa.clamp(0.0, rules.quad_attack_cap) / 100.0;
    let ta = ta.clamp(0.0, rules.triple_attack_cap) / 100.0;
    let da = da.clamp(0.0, rules.double_attack_cap) / 100.0;

    let p4 = qa;
    let p3 = (1.0 - qa) * ta;
    let p2 = (1.0 - qa) * (1.0 - ta) * da;
    let p1 = 1.0 - p4 - p3 - p2;
    [0.0, p1, p2, p3, p4]
}

/// Distribution of landed hits given a swing distribution and a hit rate.
pub fn landed_distribution(swings: &[f64], hit_rate: f64) -> Vec<f64> {
    let mut landed = vec![0.0; swings.len()];
    for (n, p_swings) in swings.iter().enumerate() {
        if *p_swings == 0.0 {
            continue;
        }
        for (k, slot) in landed.iter_mut().enumerate().take(n + 1) {
            *slot += p_swings * binomial(n, k, hit_rate);
        }
    }
    landed
}

/// Sum of two independent hit counts, with anything past `max` folded into `max`.
pub fn convolve(a: &[f64], b: &[f64], max: usize) -> Vec<f64> {
    let mut out = vec![0.0; max + 1];
    for (i, pa) in a.iter().enumerate() {
        for (j, pb) in b.iter().enumerate() {
            out[(i + j).min(max)] += pa * pb;
        }
    }
    out
}

/// Fold any mass past `max` into `max`.
pub fn cap(distribution: &[f64], max: usize) -> Vec<f64> {
    convolve(distribution, &[1.0], max)
}

pub fn expected(distribution: &[f64]) -> f64 {
    distribution
        .iter()
        .enumerate()
        .map(|(k, p)| k as f64 * p)
        .sum()
}

fn binomial(n: usize, k: usize, p: f64) -> f64 {
    let mut coefficient = 1.0;
    for i in 0..k {
        coefficient = coefficient * (n - i) as f64 / (i + 1) as f64;
    }
    coefficient * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_clamped() {
        let rules = CombatRules::default();
        assert_eq!(hit_rate(&rules, 1200.0, 1000.0), 0.95);
        assert_eq!(hit_rate(&rules, 500.0, 1000.0), 0.20);
        assert_eq!(hit_rate(&rules, 1000.0, 1000.0), 0.75);
    }

    #[test]
    fn test_swing_precedence() {
        let rules = CombatRules::default();
        let dist = swing_distribution(&rules, 50.0, 20.0, 10.0);
        assert!((dist[4] - 0.10).abs() < 1e-12);
        assert!((dist[3] - 0.18).abs() < 1e-12);
        assert!((dist[2] - 0.36).abs() < 1e-12);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_landed_expectation() {
        let rules = CombatRules::default();
        let swings = swing_distribution(&rules, 10.0, 0.0, 0.0);
        let landed = landed_distribution(&swings, 0.95);
        assert!((expected(&landed) - 1.045).abs() < 1e-12);
        assert!((landed.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_convolve_caps_total() {
        let four = [0.0, 0.0, 0.0, 0.0, 1.0];
        let out = convolve(&four, &four, 8);
        assert_eq!(out.len(), 9);
        assert_eq!(out[8], 1.0);
        let capped = convolve(&four, &four, 6);
        assert_eq!(capped[6], 1.0);
    }
}
