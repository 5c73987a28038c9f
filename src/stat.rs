//! Stat identifier module.
//!
//! Provides the closed [`Stat`] enum of every stat the engine understands,
//! and [`StatKey`], which extends it with an interned passthrough bucket for
//! stat names that item data may carry but the engine does not interpret.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

macro_rules! stats {
    ($($(#[$meta:meta])* $variant:ident => $name:literal),+ $(,)?) => {
        /// A known stat identifier.
        ///
        /// Every variant has a canonical display name used by item data and
        /// serialized output. Percentage stats are stored in percent units
        /// (`10.0` means 10%).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Stat {
            $($(#[$meta])* $variant),+
        }

        impl Stat {
            /// All known stats, in declaration order.
            pub const ALL: &'static [Stat] = &[$(Stat::$variant),+];

            /// Number of known stats.
            pub const COUNT: usize = Stat::ALL.len();

            /// Canonical display name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Stat::$variant => $name),+
                }
            }

            /// Look up a stat by its canonical display name.
            ///
            /// # Examples
            ///
            /// ```rust
            /// use zzgear::Stat;
            ///
            /// assert_eq!(Stat::parse("Store TP"), Some(Stat::StoreTp));
            /// assert_eq!(Stat::parse("Shiny"), None);
            /// ```
            pub fn parse(name: &str) -> Option<Stat> {
                match name {
                    $($name => Some(Stat::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

stats! {
    Str => "STR",
    Dex => "DEX",
    Vit => "VIT",
    Agi => "AGI",
    Int => "INT",
    Mnd => "MND",
    Chr => "CHR",
    Hp => "HP",
    Mp => "MP",

    Accuracy => "Accuracy",
    Attack => "Attack",
    /// Multiplicative attack bonus, applied after flat attack is summed.
    AttackPercent => "Attack%",
    RangedAccuracy => "Ranged Accuracy",
    RangedAttack => "Ranged Attack",
    MagicAccuracy => "Magic Accuracy",
    MagicAttack => "Magic Attack Bonus",
    MagicDamage => "Magic Damage",
    Evasion => "Evasion",
    Defense => "DEF",
    /// Percentage defense change; only meaningful on target debuffs.
    DefensePercent => "DEF%",
    MagicEvasion => "Magic Evasion",
    MagicDefense => "Magic Defense Bonus",

    DoubleAttack => "DA",
    TripleAttack => "TA",
    QuadAttack => "QA",
    DualWield => "Dual Wield",
    StoreTp => "Store TP",
    /// Equipment haste.
    Haste => "Gear Haste",
    MagicHaste => "Magic Haste",
    JobAbilityHaste => "JA Haste",
    CritRate => "Crit Rate",
    CritDamage => "Crit Damage",
    WeaponskillDamage => "Weapon Skill Damage",
    WeaponskillAccuracy => "Weapon Skill Accuracy",
    TpBonus => "TP Bonus",

    DamageTaken => "DT",
    PhysicalDamageTaken => "PDT",
    MagicalDamageTaken => "MDT",

    FastCast => "Fast Cast",
    MagicBurstBonus => "Magic Burst Damage",
    /// Second magic burst tier; not subject to the gear burst ceiling.
    MagicBurstBonusII => "Magic Burst Damage II",
    EnhancingDuration => "Enhancing Magic Duration",
    CurePotency => "Cure Potency",
    CurePotencyII => "Cure Potency II",

    HandToHandSkill => "Hand-to-Hand Skill",
    DaggerSkill => "Dagger Skill",
    SwordSkill => "Sword Skill",
    GreatSwordSkill => "Great Sword Skill",
    AxeSkill => "Axe Skill",
    GreatAxeSkill => "Great Axe Skill",
    ScytheSkill => "Scythe Skill",
    PolearmSkill => "Polearm Skill",
    KatanaSkill => "Katana Skill",
    GreatKatanaSkill => "Great Katana Skill",
    ClubSkill => "Club Skill",
    StaffSkill => "Staff Skill",
    ArcherySkill => "Archery Skill",
    MarksmanshipSkill => "Marksmanship Skill",
    ThrowingSkill => "Throwing Skill",
    ElementalMagicSkill => "Elemental Magic Skill",
    EnhancingMagicSkill => "Enhancing Magic Skill",
    HealingMagicSkill => "Healing Magic Skill",
    DarkMagicSkill => "Dark Magic Skill",
}

impl Stat {
    /// Dense index of this stat, in `0..Stat::COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier for any stat appearing in item or buff data.
///
/// Known names resolve to [`StatKey::Known`]. Anything else is kept as an
/// interned [`StatKey::Passthrough`] so newer item data still aggregates
/// instead of being rejected.
///
/// # Examples
///
/// ```rust
/// use zzgear::{Stat, StatKey};
///
/// assert_eq!(StatKey::parse("DEX"), StatKey::Known(Stat::Dex));
///
/// let odd = StatKey::parse("Pet: Regen");
/// assert!(!odd.is_known());
/// assert_eq!(odd.as_str(), "Pet: Regen");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatKey {
    Known(Stat),
    Passthrough(Arc<str>),
}

impl StatKey {
    /// Resolve a stat name against the closed set of known stats.
    pub fn parse(name: &str) -> Self {
        match Stat::parse(name) {
            Some(stat) => StatKey::Known(stat),
            None => StatKey::Passthrough(Arc::from(name)),
        }
    }

    /// Get the string representation of this key.
    pub fn as_str(&self) -> &str {
        match self {
            StatKey::Known(stat) => stat.as_str(),
            StatKey::Passthrough(name) => name,
        }
    }

    /// Whether this key names a stat the engine interprets.
    pub fn is_known(&self) -> bool {
        matches!(self, StatKey::Known(_))
    }
}

impl From<Stat> for StatKey {
    fn from(stat: Stat) -> Self {
        StatKey::Known(stat)
    }
}

impl From<&str> for StatKey {
    fn from(s: &str) -> Self {
        StatKey::parse(s)
    }
}

impl From<String> for StatKey {
    fn from(s: String) -> Self {
        StatKey::parse(&s)
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatKey::from(s))
    }
}

impl Serialize for Stat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Stat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Stat::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown stat: {}", s)))
    }
}
