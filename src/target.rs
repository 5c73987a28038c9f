//! The enemy a scenario is simulated against.

use crate::buffs::BuffEffect;
use crate::stat::Stat;
use serde::{Deserialize, Serialize};

/// Target defensive stats.
///
/// # Examples
///
/// ```rust
/// use zzgear::{BuffEffect, Stat, StatBag, Target};
///
/// let target = Target::new("Apex Bat", 129)
///     .with_evasion(1100.0)
///     .with_defense(1200.0);
/// let dia = BuffEffect::new("Dia III", StatBag::new().with(Stat::DefensePercent, -15.0));
/// let distract = BuffEffect::new("Distract III", StatBag::new().with(Stat::Evasion, -280.0));
///
/// let debuffed = target.apply_debuffs(&[dia, distract]);
/// assert_eq!(debuffed.evasion, 820.0);
/// assert_eq!(debuffed.defense, 1020.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub level: u32,
    pub evasion: f64,
    pub defense: f64,
    #[serde(default)]
    pub magic_evasion: f64,
    #[serde(default)]
    pub magic_defense: f64,
    #[serde(default)]
    pub vit: f64,
    #[serde(default)]
    pub agi: f64,
    #[serde(default)]
    pub int: f64,
    #[serde(default)]
    pub mnd: f64,
}

impl Target {
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            level,
            evasion: 0.0,
            defense: 0.0,
            magic_evasion: 0.0,
            magic_defense: 0.0,
            vit: 0.0,
            agi: 0.0,
            int: 0.0,
            mnd: 0.0,
        }
    }

    pub fn with_evasion(mut self, evasion: f64) -> Self {
        self.evasion = evasion;
        self
    }

    pub fn with_defense(mut self, defense: f64) -> Self {
        self.defense = defense;
        self
    }

    pub fn with_magic_evasion(mut self, magic_evasion: f64) -> Self {
        self.magic_evasion = magic_evasion;
        self
    }

    pub fn with_magic_defense(mut self, magic_defense: f64) -> Self {
        self.magic_defense = magic_defense;
        self
    }

    pub fn with_attributes(mut self, vit: f64, agi: f64, int: f64, mnd: f64) -> Self {
        self.vit = vit;
        self.agi = agi;
        self.int = int;
        self.mnd = mnd;
        self
    }

    /// The target with debuffs applied.
    ///
    /// Flat reductions are summed first, then `DEF%` scales defense. Every
    /// value is floored at zero.
    pub fn apply_debuffs(&self, debuffs: &[BuffEffect]) -> Target {
        let sum = |stat: Stat| -> f64 { debuffs.iter().map(|d| d.stats.get(stat)).sum() };
        let floor = |value: f64| value.max(0.0);

        let defense = (self.defense + sum(Stat::Defense)) * (1.0 + sum(Stat::DefensePercent) / 100.0);
        Target {
            name: self.name.clone(),
            level: self.level,
            evasion: floor(self.evasion + sum(Stat::Evasion)),
            defense: floor(defense),
            magic_evasion: floor(self.magic_evasion + sum(Stat::MagicEvasion)),
            magic_defense: floor(self.magic_defense + sum(Stat::MagicDefense)),
            vit: floor(self.vit + sum(Stat::Vit)),
            agi: floor(self.agi + sum(Stat::Agi)),
            int: floor(self.int + sum(Stat::Int)),
            mnd: floor(self.mnd + sum(Stat::Mnd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::StatBag;

    #[test]
    fn test_debuffs_floor_at_zero() {
        let target = Target::new("Dummy", 1).with_evasion(50.0);
        let debuff = BuffEffect::new("Huge", StatBag::new().with(Stat::Evasion, -500.0));
        assert_eq!(target.apply_debuffs(&[debuff]).evasion, 0.0);
    }

    #[test]
    fn test_no_debuffs_is_identity() {
        let target = Target::new("Dummy", 119)
            .with_evasion(1000.0)
            .with_defense(900.0)
            .with_attributes(300.0, 280.0, 250.0, 240.0);
        assert_eq!(target.apply_debuffs(&[]), target);
    }

    #[test]
    fn test_deserialize_optional_fields() {
        let target: Target =
            serde_json::from_str(r#"{"name":"Crab","level":100,"evasion":500,"defense":600}"#)
                .unwrap();
        assert_eq!(target.magic_evasion, 0.0);
        assert_eq!(target.vit, 0.0);
    }
}
