//! Combat formula constants.
//!
//! Every coefficient, cap and lookup table used by the derivation rules and
//! the simulation lives in [`CombatRules`]. The defaults follow the common
//! community reference values; callers can load a different table from JSON
//! without touching any formula code.

use crate::error::GearError;
use serde::{Deserialize, Serialize};

/// One band of the skill-to-accuracy conversion.
///
/// Skill above `from` converts at `ratio` until the next band starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillAccuracyTier {
    pub from: f64,
    pub ratio: f64,
}

/// One linear segment of the delay-to-TP table.
///
/// TP for a delay `d >= from` is `base + (d - from) * per_360 / 360`. The
/// first segment also covers delays below its `from`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpSegment {
    pub from: f64,
    pub base: f64,
    pub per_360: f64,
}

/// A threshold step: at or above `from`, the value is `value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub from: f64,
    pub value: f64,
}

/// The rules table.
///
/// Percent values are in percent units. Delay is in ticks (60 per second).
///
/// # Examples
///
/// ```rust
/// use zzgear::CombatRules;
///
/// let rules = CombatRules::from_json(r#"{"hit_rate_ceiling": 99.0}"#).unwrap();
/// assert_eq!(rules.hit_rate_ceiling, 99.0);
/// assert_eq!(rules.hit_rate_floor, 20.0);
/// assert_eq!(rules.base_tp(240.0), 75.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub base_hit_rate: f64,
    pub hit_rate_floor: f64,
    pub hit_rate_ceiling: f64,
    pub dex_accuracy_ratio: f64,
    pub agi_ranged_accuracy_ratio: f64,
    pub skill_accuracy: Vec<SkillAccuracyTier>,
    /// Flat attack every character has before skill and STR.
    pub base_attack: f64,
    pub sub_str_ratio: f64,

    pub double_attack_cap: f64,
    pub triple_attack_cap: f64,
    pub quad_attack_cap: f64,
    pub max_swings: usize,

    pub gear_haste_cap: f64,
    pub magic_haste_cap: f64,
    pub ability_haste_cap: f64,
    /// Maximum total delay reduction from haste and dual wield combined.
    pub delay_reduction_cap: f64,
    pub dual_wield_cap: f64,

    pub base_crit_rate: f64,
    pub crit_rate_cap: f64,
    /// Crit rate bonus by DEX minus target AGI.
    pub crit_ddex: Vec<Step>,

    /// fSTR offset by STR minus target VIT: `fSTR = (dSTR + offset) / 4`.
    pub fstr: Vec<Step>,
    /// Weapon rank is weapon damage divided by this.
    pub weapon_rank_divisor: f64,
    pub pdif_cap_one_handed: f64,
    pub pdif_cap_two_handed: f64,
    /// pDIF bonus added on critical hits before the cap.
    pub crit_pdif_bonus: f64,

    pub base_magic_hit_rate: f64,
    pub magic_hit_rate_floor: f64,
    pub magic_hit_rate_ceiling: f64,

    /// Most negative damage taken that counts.
    pub damage_taken_floor: f64,
    pub fast_cast_cap: f64,
    pub magic_burst_bonus_cap: f64,
    pub cure_potency_cap: f64,
    pub cure_potency_ii_cap: f64,
    /// Burst multiplier by skillchain step, starting at step 1.
    pub skillchain_multipliers: Vec<f64>,
    pub weather_bonus: f64,
    /// Chance that a weather or day bonus triggers without an affinity item.
    pub weather_proc_chance: f64,

    pub tp_table: Vec<TpSegment>,
    pub tp_max: f64,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            base_hit_rate: 75.0,
            hit_rate_floor: 20.0,
            hit_rate_ceiling: 95.0,
            dex_accuracy_ratio: 0.75,
            agi_ranged_accuracy_ratio: 0.75,
            skill_accuracy: vec![
                SkillAccuracyTier { from: 0.0, ratio: 1.0 },
                SkillAccuracyTier { from: 200.0, ratio: 0.9 },
                SkillAccuracyTier { from: 400.0, ratio: 0.8 },
                SkillAccuracyTier { from: 600.0, ratio: 0.9 },
            ],
            base_attack: 8.0,
            sub_str_ratio: 0.5,

            double_attack_cap: 100.0,
            triple_attack_cap: 100.0,
            quad_attack_cap: 100.0,
            max_swings: 8,

            gear_haste_cap: 25.0,
            magic_haste_cap: 43.75,
            ability_haste_cap: 25.0,
            delay_reduction_cap: 80.0,
            dual_wield_cap: 80.0,

            base_crit_rate: 5.0,
            crit_rate_cap: 100.0,
            crit_ddex: vec![
                Step { from: 7.0, value: 1.0 },
                Step { from: 14.0, value: 2.0 },
                Step { from: 20.0, value: 3.0 },
                Step { from: 30.0, value: 4.0 },
                Step { from: 40.0, value: 5.0 },
                Step { from: 50.0, value: 6.0 },
            ],

            fstr: vec![
                Step { from: f64::MIN, value: 13.0 },
                Step { from: -21.0, value: 12.0 },
                Step { from: -15.0, value: 10.0 },
                Step { from: -7.0, value: 9.0 },
                Step { from: -2.0, value: 8.0 },
                Step { from: 1.0, value: 7.0 },
                Step { from: 6.0, value: 6.0 },
                Step { from: 12.0, value: 4.0 },
            ],
            weapon_rank_divisor: 9.0,
            pdif_cap_one_handed: 3.25,
            pdif_cap_two_handed: 3.75,
            crit_pdif_bonus: 1.0,

            base_magic_hit_rate: 50.0,
            magic_hit_rate_floor: 5.0,
            magic_hit_rate_ceiling: 95.0,

            damage_taken_floor: -50.0,
            fast_cast_cap: 80.0,
            magic_burst_bonus_cap: 40.0,
            cure_potency_cap: 50.0,
            cure_potency_ii_cap: 30.0,
            skillchain_multipliers: vec![1.35, 1.45, 1.55, 1.65, 1.75],
            weather_bonus: 10.0,
            weather_proc_chance: 1.0 / 3.0,

            tp_table: vec![
                TpSegment { from: 0.0, base: 29.5, per_360: 63.0 },
                TpSegment { from: 180.0, base: 61.0, per_360: 88.0 },
                TpSegment { from: 540.0, base: 149.0, per_360: 20.0 },
                TpSegment { from: 630.0, base: 154.0, per_360: 28.0 },
                TpSegment { from: 720.0, base: 161.0, per_360: 24.0 },
                TpSegment { from: 900.0, base: 173.0, per_360: 28.0 },
            ],
            tp_max: 3000.0,
        }
    }
}

impl CombatRules {
    /// Load a rules table from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GearError> {
        let rules: CombatRules = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check bounds and table ordering.
    pub fn validate(&self) -> Result<(), GearError> {
        let bounds = [
            ("hit_rate", self.hit_rate_floor, self.hit_rate_ceiling),
            ("magic_hit_rate", self.magic_hit_rate_floor, self.magic_hit_rate_ceiling),
        ];
        for (name, floor, ceiling) in bounds {
            if !(0.0..=100.0).contains(&floor) || !(floor..=100.0).contains(&ceiling) {
                return Err(GearError::InvalidConfig(format!(
                    "{} bounds must satisfy 0 <= floor <= ceiling <= 100",
                    name
                )));
            }
        }
        if self.max_swings == 0 {
            return Err(GearError::InvalidConfig("max_swings must be at least 1".into()));
        }
        if !(0.0..100.0).contains(&self.delay_reduction_cap) {
            return Err(GearError::InvalidConfig(
                "delay_reduction_cap must be in [0, 100)".into(),
            ));
        }
        if self.damage_taken_floor > 0.0 {
            return Err(GearError::InvalidConfig(
                "damage_taken_floor must not be positive".into(),
            ));
        }
        if self.weapon_rank_divisor <= 0.0 {
            return Err(GearError::InvalidConfig(
                "weapon_rank_divisor must be positive".into(),
            ));
        }
        check_sorted("skill_accuracy", self.skill_accuracy.iter().map(|t| t.from))?;
        check_sorted("tp_table", self.tp_table.iter().map(|s| s.from))?;
        check_sorted("crit_ddex", self.crit_ddex.iter().map(|s| s.from))?;
        check_sorted("fstr", self.fstr.iter().map(|s| s.from))?;
        if self.skillchain_multipliers.is_empty() {
            return Err(GearError::InvalidConfig(
                "skillchain_multipliers must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Accuracy granted by a combat skill rating.
    pub fn skill_accuracy(&self, skill: f64) -> f64 {
        let mut total = 0.0;
        for (i, tier) in self.skill_accuracy.iter().enumerate() {
            if skill <= tier.from {
                break;
            }
            let end = self
                .skill_accuracy
                .get(i + 1)
                .map(|next| next.from.min(skill))
                .unwrap_or(skill);
            total += (end - tier.from) * tier.ratio;
        }
        total.floor()
    }

    /// Base TP per hit for a delay, floored.
    pub fn base_tp(&self, delay: f64) -> f64 {
        let segment = self
            .tp_table
            .iter()
            .rev()
            .find(|s| delay >= s.from)
            .or_else(|| self.tp_table.first());
        match segment {
            Some(s) => (s.base + (delay - s.from) * s.per_360 / 360.0).floor(),
            None => 0.0,
        }
    }

    /// Crit rate bonus from DEX minus target AGI.
    pub fn crit_bonus(&self, ddex: f64) -> f64 {
        step_value(&self.crit_ddex, ddex).unwrap_or(0.0)
    }

    /// fSTR before weapon-rank bounds.
    pub fn fstr(&self, dstr: f64) -> f64 {
        let offset = step_value(&self.fstr, dstr).unwrap_or(0.0);
        (dstr + offset) / 4.0
    }

    /// Burst multiplier for a skillchain step; steps past the table use its last entry.
    pub fn skillchain_multiplier(&self, step: u8) -> f64 {
        let index = usize::from(step.max(1)) - 1;
        self.skillchain_multipliers
            .get(index)
            .or_else(|| self.skillchain_multipliers.last())
            .copied()
            .unwrap_or(1.0)
    }
}

fn step_value(steps: &[Step], x: f64) -> Option<f64> {
    steps.iter().rev().find(|s| x >= s.from).map(|s| s.value)
}

fn check_sorted(name: &str, keys: impl Iterator<Item = f64>) -> Result<(), GearError> {
    let keys: Vec<f64> = keys.collect();
    if keys.is_empty() {
        return Err(GearError::InvalidConfig(format!("{} must not be empty", name)));
    }
    if keys.windows(2).any(|w| w[0] >= w[1]) {
        return Err(GearError::InvalidConfig(format!(
            "{} must be strictly ascending",
            name
        )));
    }
    Ok(())
}
