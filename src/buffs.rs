//! Support effects active during a scenario.
//!
//! Buffs are grouped by category, each with a fixed cardinality limit.
//! Self-side effects feed the stat aggregation; target debuffs are applied
//! to the [`Target`](crate::target::Target) instead.

use crate::bag::StatBag;
use crate::error::GearError;
use serde::{Deserialize, Serialize};

/// Buff category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffCategory {
    Song,
    Roll,
    Bubble,
    Spell,
    Ability,
}

impl BuffCategory {
    /// Maximum simultaneous effects of this category.
    pub fn limit(self) -> usize {
        match self {
            BuffCategory::Song => 4,
            BuffCategory::Roll => 2,
            BuffCategory::Bubble => 3,
            BuffCategory::Spell => 32,
            BuffCategory::Ability => 16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuffCategory::Song => "song",
            BuffCategory::Roll => "roll",
            BuffCategory::Bubble => "bubble",
            BuffCategory::Spell => "spell",
            BuffCategory::Ability => "ability",
        }
    }
}

impl std::fmt::Display for BuffCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named effect and the stats it grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffEffect {
    pub name: String,
    pub stats: StatBag,
}

impl BuffEffect {
    pub fn new(name: impl Into<String>, stats: StatBag) -> Self {
        Self {
            name: name.into(),
            stats,
        }
    }
}

/// An active self-side buff, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "effect", rename_all = "snake_case")]
pub enum ActiveBuff {
    Song(BuffEffect),
    Roll(BuffEffect),
    Bubble(BuffEffect),
    Spell(BuffEffect),
    Ability(BuffEffect),
}

impl ActiveBuff {
    pub fn category(&self) -> BuffCategory {
        match self {
            ActiveBuff::Song(_) => BuffCategory::Song,
            ActiveBuff::Roll(_) => BuffCategory::Roll,
            ActiveBuff::Bubble(_) => BuffCategory::Bubble,
            ActiveBuff::Spell(_) => BuffCategory::Spell,
            ActiveBuff::Ability(_) => BuffCategory::Ability,
        }
    }

    pub fn effect(&self) -> &BuffEffect {
        match self {
            ActiveBuff::Song(e)
            | ActiveBuff::Roll(e)
            | ActiveBuff::Bubble(e)
            | ActiveBuff::Spell(e)
            | ActiveBuff::Ability(e) => e,
        }
    }
}

#[derive(Deserialize)]
struct RawBuffConfiguration {
    #[serde(default)]
    buffs: Vec<ActiveBuff>,
    #[serde(default)]
    food: Option<BuffEffect>,
    #[serde(default)]
    target_debuffs: Vec<BuffEffect>,
    #[serde(default)]
    custom: StatBag,
}

/// All support effects for one request.
///
/// Additions are checked against category limits and duplicate names,
/// including when deserialized.
///
/// # Examples
///
/// ```rust
/// use zzgear::{ActiveBuff, BuffConfiguration, BuffEffect, Stat, StatBag};
///
/// let march = BuffEffect::new("Honor March", StatBag::new().with(Stat::MagicHaste, 12.5));
/// let mut buffs = BuffConfiguration::new();
/// buffs.add(ActiveBuff::Song(march)).unwrap();
///
/// let total = buffs
///     .self_contributions()
///     .fold(StatBag::new(), |acc, (_, bag)| acc.plus(bag));
/// assert_eq!(total.get(Stat::MagicHaste), 12.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBuffConfiguration")]
pub struct BuffConfiguration {
    buffs: Vec<ActiveBuff>,
    food: Option<BuffEffect>,
    target_debuffs: Vec<BuffEffect>,
    custom: StatBag,
}

impl TryFrom<RawBuffConfiguration> for BuffConfiguration {
    type Error = GearError;

    fn try_from(raw: RawBuffConfiguration) -> Result<Self, Self::Error> {
        let mut config = BuffConfiguration::new();
        for buff in raw.buffs {
            config.add(buff)?;
        }
        config.food = raw.food;
        config.target_debuffs = raw.target_debuffs;
        config.custom = raw.custom;
        Ok(config)
    }
}

impl BuffConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a self-side buff.
    pub fn add(&mut self, buff: ActiveBuff) -> Result<(), GearError> {
        let category = buff.category();
        let same: Vec<&ActiveBuff> = self
            .buffs
            .iter()
            .filter(|b| b.category() == category)
            .collect();
        if same.iter().any(|b| b.effect().name == buff.effect().name) {
            return Err(GearError::DuplicateBuff {
                category,
                name: buff.effect().name.clone(),
            });
        }
        if same.len() >= category.limit() {
            return Err(GearError::BuffLimit {
                category,
                limit: category.limit(),
            });
        }
        self.buffs.push(buff);
        Ok(())
    }

    /// Builder-style [`BuffConfiguration::add`].
    pub fn with(mut self, buff: ActiveBuff) -> Result<Self, GearError> {
        self.add(buff)?;
        Ok(self)
    }

    /// Replace the food.
    pub fn set_food(&mut self, food: Option<BuffEffect>) {
        self.food = food;
    }

    pub fn add_target_debuff(&mut self, debuff: BuffEffect) {
        self.target_debuffs.push(debuff);
    }

    /// Free-form stat overrides for what-if testing.
    pub fn set_custom(&mut self, custom: StatBag) {
        self.custom = custom;
    }

    pub fn buffs(&self) -> &[ActiveBuff] {
        &self.buffs
    }

    pub fn food(&self) -> Option<&BuffEffect> {
        self.food.as_ref()
    }

    pub fn target_debuffs(&self) -> &[BuffEffect] {
        &self.target_debuffs
    }

    /// Every self-side contribution with a source label, in a fixed order:
    /// buffs as added, then food, then custom overrides.
    pub fn self_contributions(&self) -> impl Iterator<Item = (String, &StatBag)> {
        let buffs = self.buffs.iter().map(|b| {
            (
                format!("{}: {}", b.category(), b.effect().name),
                &b.effect().stats,
            )
        });
        let food = self
            .food
            .iter()
            .map(|f| (format!("food: {}", f.name), &f.stats));
        let custom = std::iter::once(("custom".to_string(), &self.custom));
        buffs.chain(food).chain(custom)
    }
}
