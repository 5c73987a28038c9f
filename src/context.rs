//! Per-request scenario context.
//!
//! A [`ScenarioContext`] holds everything about one request that is not
//! gear: the job, the debuffed target, buffs and scenario parameters. It is
//! built once and shared read-only by every evaluation of that request.

use crate::bag::StatBag;
use crate::buffs::BuffConfiguration;
use crate::error::GearError;
use crate::item::{Element, SkillType};
use crate::job::JobProfile;
use crate::stat::Stat;
use crate::target::Target;
use serde::{Deserialize, Serialize};

/// A weaponskill to simulate.
///
/// `modifiers` holds the stat modifiers (WSC) as ratios, e.g. `STR: 0.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponskillSpec {
    pub name: String,
    /// Weapon skill the weaponskill belongs to; `None` fits any weapon.
    #[serde(default)]
    pub skill: Option<SkillType>,
    pub hits: u32,
    /// fTP at 1000, 2000 and 3000 TP.
    pub ftp: [f64; 3],
    /// Whether additional hits use the full fTP instead of 1.0.
    #[serde(default)]
    pub ftp_replicating: bool,
    #[serde(default)]
    pub modifiers: StatBag,
    #[serde(default)]
    pub crit: bool,
    /// Element of a magical weaponskill.
    #[serde(default)]
    pub magical: Option<Element>,
    /// Flat base damage of a magical weaponskill.
    #[serde(default)]
    pub base_damage: f64,
}

/// A nuke to simulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellSpec {
    pub name: String,
    pub element: Element,
    #[serde(default = "default_magic_skill")]
    pub skill: Stat,
    pub base_damage: f64,
    #[serde(default = "default_dstat")]
    pub dstat: Stat,
    #[serde(default = "default_dstat_multiplier")]
    pub dstat_multiplier: f64,
    #[serde(default)]
    pub magic_burst: bool,
    /// Skillchain step the burst lands on, starting at 1.
    #[serde(default = "default_skillchain_steps")]
    pub skillchain_steps: u8,
}

fn default_magic_skill() -> Stat {
    Stat::ElementalMagicSkill
}

fn default_dstat() -> Stat {
    Stat::Int
}

fn default_dstat_multiplier() -> f64 {
    2.0
}

fn default_skillchain_steps() -> u8 {
    1
}

/// Scenario knobs shared by every evaluation of a request.
///
/// # Examples
///
/// ```rust
/// use zzgear::ScenarioParams;
///
/// let params: ScenarioParams = serde_json::from_str(r#"{"tp_threshold": 500}"#).unwrap();
/// assert_eq!(params.threshold(), 1000.0);
/// assert_eq!(ScenarioParams::default().starting_tp, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    /// TP at which the weaponskill is used; see [`ScenarioParams::threshold`].
    pub tp_threshold: f64,
    pub starting_tp: f64,
    pub weaponskill: Option<WeaponskillSpec>,
    pub spell: Option<SpellSpec>,
    pub weather: Option<Element>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            tp_threshold: 1000.0,
            starting_tp: 0.0,
            weaponskill: None,
            spell: None,
            weather: None,
        }
    }
}

impl ScenarioParams {
    /// The TP threshold clamped to the usable range 1000..=3000.
    pub fn threshold(&self) -> f64 {
        self.tp_threshold.clamp(1000.0, MAX_TP)
    }

    /// Reject TP values no scenario can start from.
    pub fn validate(&self) -> Result<(), GearError> {
        if !self.tp_threshold.is_finite() {
            return Err(GearError::InvalidConfig(format!(
                "tp_threshold must be finite, got {}",
                self.tp_threshold
            )));
        }
        if !(0.0..=MAX_TP).contains(&self.starting_tp) {
            return Err(GearError::InvalidConfig(format!(
                "starting_tp must be within 0..={}, got {}",
                MAX_TP, self.starting_tp
            )));
        }
        Ok(())
    }

    /// Magic skill used for magic accuracy.
    pub fn magic_skill(&self) -> Stat {
        self.spell
            .as_ref()
            .map(|spell| spell.skill)
            .unwrap_or(Stat::ElementalMagicSkill)
    }
}

/// Upper bound of the TP gauge.
pub const MAX_TP: f64 = 3000.0;

/// Immutable request context.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub job: JobProfile,
    /// Target with the request's debuffs already applied.
    pub target: Target,
    pub buffs: BuffConfiguration,
    pub params: ScenarioParams,
    pub master_level: u8,
}

impl ScenarioContext {
    pub fn new(
        job: JobProfile,
        target: &Target,
        buffs: BuffConfiguration,
        params: ScenarioParams,
        master_level: u8,
    ) -> Self {
        let target = target.apply_debuffs(buffs.target_debuffs());
        Self {
            job,
            target,
            buffs,
            params,
            master_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffs::BuffEffect;

    #[test]
    fn test_threshold_clamped() {
        let mut params = ScenarioParams::default();
        params.tp_threshold = 3500.0;
        assert_eq!(params.threshold(), 3000.0);
        params.tp_threshold = 1750.0;
        assert_eq!(params.threshold(), 1750.0);
    }

    #[test]
    fn test_validate_tp_bounds() {
        assert!(ScenarioParams::default().validate().is_ok());

        let mut params = ScenarioParams::default();
        params.starting_tp = -1e15;
        assert!(matches!(params.validate(), Err(GearError::InvalidConfig(_))));
        params.starting_tp = 3001.0;
        assert!(params.validate().is_err());
        params.starting_tp = f64::NAN;
        assert!(params.validate().is_err());

        let mut params = ScenarioParams::default();
        params.tp_threshold = f64::INFINITY;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_context_applies_debuffs() {
        let mut buffs = BuffConfiguration::new();
        buffs.add_target_debuff(BuffEffect::new(
            "Frazzle III",
            StatBag::new().with(Stat::MagicEvasion, -100.0),
        ));
        let target = Target::new("Dummy", 1).with_magic_evasion(600.0);
        let context = ScenarioContext::new(
            JobProfile::new(crate::job::Job::Blm),
            &target,
            buffs,
            ScenarioParams::default(),
            0,
        );
        assert_eq!(context.target.magic_evasion, 500.0);
    }

    #[test]
    fn test_spell_defaults() {
        let spell: SpellSpec = serde_json::from_str(
            r#"{"name":"Thunder VI","element":"lightning","base_damage":800}"#,
        )
        .unwrap();
        assert_eq!(spell.dstat, Stat::Int);
        assert_eq!(spell.skill, Stat::ElementalMagicSkill);
        assert_eq!(spell.skillchain_steps, 1);
    }
}
