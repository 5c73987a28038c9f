//! Derived combat values.
//!
//! Accuracy, attack, crit rate and magic accuracy are not plain sums: they
//! combine aggregated stats with weapon skill, the target and the rules
//! table. Each is produced by a [`DerivationRule`]. A [`DerivationPlan`]
//! orders the rules by their declared dependencies and rejects cycles.

use crate::bag::StatBag;
use crate::error::GearError;
use crate::graph::DerivationGraph;
use crate::item::WeaponInfo;
use crate::rules::CombatRules;
use crate::stat::Stat;
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A derived combat value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derived {
    MainAccuracy,
    SubAccuracy,
    RangedAccuracy,
    MainAttack,
    SubAttack,
    RangedAttack,
    MagicAccuracy,
    CritRate,
    WeaponskillAccuracy,
}

impl Derived {
    pub const ALL: [Derived; 9] = [
        Derived::MainAccuracy,
        Derived::SubAccuracy,
        Derived::RangedAccuracy,
        Derived::MainAttack,
        Derived::SubAttack,
        Derived::RangedAttack,
        Derived::MagicAccuracy,
        Derived::CritRate,
        Derived::WeaponskillAccuracy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Derived::MainAccuracy => "main_accuracy",
            Derived::SubAccuracy => "sub_accuracy",
            Derived::RangedAccuracy => "ranged_accuracy",
            Derived::MainAttack => "main_attack",
            Derived::SubAttack => "sub_attack",
            Derived::RangedAttack => "ranged_attack",
            Derived::MagicAccuracy => "magic_accuracy",
            Derived::CritRate => "crit_rate",
            Derived::WeaponskillAccuracy => "weaponskill_accuracy",
        }
    }
}

impl std::fmt::Display for Derived {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a derivation rule may read.
#[derive(Debug, Clone, Copy)]
pub struct DeriveInput<'a> {
    pub stats: &'a StatBag,
    pub main: Option<&'a WeaponInfo>,
    pub sub: Option<&'a WeaponInfo>,
    pub ranged: Option<&'a WeaponInfo>,
    pub target: &'a Target,
    pub rules: &'a CombatRules,
    /// Magic skill used for magic accuracy.
    pub magic_skill: Stat,
}

impl DeriveInput<'_> {
    fn weapon(&self, hand: Hand) -> Option<&WeaponInfo> {
        match hand {
            Hand::Main => self.main,
            Hand::Sub => self.sub,
            Hand::Ranged => self.ranged,
        }
    }

    /// Skill rating for the weapon in a hand; zero when empty or unskilled.
    fn skill_rating(&self, hand: Hand) -> f64 {
        self.weapon(hand)
            .and_then(|w| w.skill)
            .map(|skill| self.stats.get(skill.skill_stat()))
            .unwrap_or(0.0)
    }
}

/// Derived values computed so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    values: BTreeMap<Derived, f64>,
}

impl DerivedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a derived stat; `0.0` if it was not computed.
    pub fn get(&self, value: Derived) -> f64 {
        self.values.get(&value).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, value: Derived, amount: f64) {
        self.values.insert(value, amount);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Derived, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// Computes one derived value.
///
/// Rules must be pure functions of their input and the values they
/// declare in [`DerivationRule::depends_on`].
pub trait DerivationRule: Send + Sync {
    fn output(&self) -> Derived;

    fn depends_on(&self) -> Vec<Derived> {
        Vec::new()
    }

    fn apply(&self, input: &DeriveInput<'_>, derived: &DerivedStats) -> f64;

    /// Human-readable formula, for reports.
    fn description(&self) -> String;
}

/// Which weapon a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Main,
    Sub,
    Ranged,
}

/// Skill accuracy plus DEX (or AGI for ranged) plus flat accuracy.
#[derive(Debug, Clone, Copy)]
pub struct AccuracyRule {
    pub hand: Hand,
}

impl DerivationRule for AccuracyRule {
    fn output(&self) -> Derived {
        match self.hand {
            Hand::Main => Derived::MainAccuracy,
            Hand::Sub => Derived::SubAccuracy,
            Hand::Ranged => Derived::RangedAccuracy,
        }
    }

    fn apply(&self, input: &DeriveInput<'_>, _derived: &DerivedStats) -> f64 {
        let rules = input.rules;
        let skill = rules.skill_accuracy(input.skill_rating(self.hand));
        match self.hand {
            Hand::Ranged => {
                skill
                    + input.stats.get(Stat::Agi) * rules.agi_ranged_accuracy_ratio
                    + input.stats.get(Stat::RangedAccuracy)
            }
            Hand::Main | Hand::Sub => {
                skill
                    + input.stats.get(Stat::Dex) * rules.dex_accuracy_ratio
                    + input.stats.get(Stat::Accuracy)
            }
        }
    }

    fn description(&self) -> String {
        match self.hand {
            Hand::Ranged => "skill accuracy + AGI x ratio + Ranged Accuracy".to_string(),
            _ => format!("{:?} skill accuracy + DEX x ratio + Accuracy", self.hand),
        }
    }
}

/// (base + skill + STR + flat attack) x (1 + Attack%).
#[derive(Debug, Clone, Copy)]
pub struct AttackRule {
    pub hand: Hand,
}

impl DerivationRule for AttackRule {
    fn output(&self) -> Derived {
        match self.hand {
            Hand::Main => Derived::MainAttack,
            Hand::Sub => Derived::SubAttack,
            Hand::Ranged => Derived::RangedAttack,
        }
    }

    fn apply(&self, input: &DeriveInput<'_>, _derived: &DerivedStats) -> f64 {
        let rules = input.rules;
        let stats = input.stats;
        let strength = match self.hand {
            Hand::Sub => stats.get(Stat::Str) * rules.sub_str_ratio,
            _ => stats.get(Stat::Str),
        };
        let flat = match self.hand {
            Hand::Ranged => stats.get(Stat::RangedAttack),
            _ => stats.get(Stat::Attack),
        };
        let raw = rules.base_attack + input.skill_rating(self.hand) + strength + flat;
        raw * (1.0 + stats.get(Stat::AttackPercent) / 100.0)
    }

    fn description(&self) -> String {
        format!("{:?} (base + skill + STR + Attack) x (1 + Attack%)", self.hand)
    }
}

/// Magic skill plus magic accuracy.
#[derive(Debug, Clone, Copy)]
pub struct MagicAccuracyRule;

impl DerivationRule for MagicAccuracyRule {
    fn output(&self) -> Derived {
        Derived::MagicAccuracy
    }

    fn apply(&self, input: &DeriveInput<'_>, _derived: &DerivedStats) -> f64 {
        input.stats.get(input.magic_skill) + input.stats.get(Stat::MagicAccuracy)
    }

    fn description(&self) -> String {
        "magic skill + Magic Accuracy".to_string()
    }
}

/// Base crit rate plus gear plus the dDEX bonus, clamped.
#[derive(Debug, Clone, Copy)]
pub struct CritRateRule;

impl DerivationRule for CritRateRule {
    fn output(&self) -> Derived {
        Derived::CritRate
    }

    fn apply(&self, input: &DeriveInput<'_>, _derived: &DerivedStats) -> f64 {
        let rules = input.rules;
        let ddex = input.stats.get(Stat::Dex) - input.target.agi;
        (rules.base_crit_rate + input.stats.get(Stat::CritRate) + rules.crit_bonus(ddex))
            .clamp(0.0, rules.crit_rate_cap)
    }

    fn description(&self) -> String {
        "base crit + Crit Rate + dDEX bonus".to_string()
    }
}

/// Main-hand accuracy plus weaponskill accuracy.
#[derive(Debug, Clone, Copy)]
pub struct WeaponskillAccuracyRule;

impl DerivationRule for WeaponskillAccuracyRule {
    fn output(&self) -> Derived {
        Derived::WeaponskillAccuracy
    }

    fn depends_on(&self) -> Vec<Derived> {
        vec![Derived::MainAccuracy]
    }

    fn apply(&self, input: &DeriveInput<'_>, derived: &DerivedStats) -> f64 {
        derived.get(Derived::MainAccuracy) + input.stats.get(Stat::WeaponskillAccuracy)
    }

    fn description(&self) -> String {
        "main accuracy + Weapon Skill Accuracy".to_string()
    }
}

/// An ordered, cycle-checked set of derivation rules.
///
/// # Examples
///
/// ```rust
/// use zzgear::derive::{DeriveInput, Derived, DerivationPlan};
/// use zzgear::{CombatRules, SkillType, Stat, StatBag, Target, WeaponInfo};
///
/// let plan = DerivationPlan::standard().unwrap();
/// let rules = CombatRules::default();
/// let target = Target::new("Dummy", 1);
/// let sword = WeaponInfo::new(150.0, 240.0, SkillType::Sword);
/// let stats = StatBag::new()
///     .with(Stat::SwordSkill, 100.0)
///     .with(Stat::Dex, 40.0)
///     .with(Stat::Accuracy, 20.0);
///
/// let derived = plan.evaluate(&DeriveInput {
///     stats: &stats,
///     main: Some(&sword),
///     sub: None,
///     ranged: None,
///     target: &target,
///     rules: &rules,
///     magic_skill: Stat::ElementalMagicSkill,
/// });
/// assert_eq!(derived.get(Derived::MainAccuracy), 150.0);
/// ```
pub struct DerivationPlan {
    rules: Vec<Box<dyn DerivationRule>>,
}

impl DerivationPlan {
    /// Order `rules` by dependency.
    ///
    /// Fails on duplicate outputs, dependencies no rule produces, and cycles.
    pub fn new(rules: Vec<Box<dyn DerivationRule>>) -> Result<Self, GearError> {
        let mut outputs = HashSet::new();
        for rule in &rules {
            if !outputs.insert(rule.output()) {
                return Err(GearError::DuplicateRule(rule.output()));
            }
        }

        let mut graph = DerivationGraph::new();
        for rule in &rules {
            graph.add_node(rule.output());
            for dependency in rule.depends_on() {
                if !outputs.contains(&dependency) {
                    return Err(GearError::MissingRule {
                        rule: rule.output(),
                        dependency,
                    });
                }
                graph.add_edge(rule.output(), dependency);
            }
        }

        let order = graph.topological_sort()?;
        let mut slots: Vec<Option<Box<dyn DerivationRule>>> = rules.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        for output in order {
            if let Some(rule) = slots
                .iter_mut()
                .find(|slot| matches!(slot, Some(rule) if rule.output() == output))
                .and_then(Option::take)
            {
                ordered.push(rule);
            }
        }
        Ok(Self { rules: ordered })
    }

    /// The built-in rule set.
    pub fn standard() -> Result<Self, GearError> {
        Self::new(vec![
            Box::new(AccuracyRule { hand: Hand::Main }),
            Box::new(AccuracyRule { hand: Hand::Sub }),
            Box::new(AccuracyRule { hand: Hand::Ranged }),
            Box::new(AttackRule { hand: Hand::Main }),
            Box::new(AttackRule { hand: Hand::Sub }),
            Box::new(AttackRule { hand: Hand::Ranged }),
            Box::new(MagicAccuracyRule),
            Box::new(CritRateRule),
            Box::new(WeaponskillAccuracyRule),
        ])
    }

    /// Run every rule in dependency order.
    pub fn evaluate(&self, input: &DeriveInput<'_>) -> DerivedStats {
        let mut derived = DerivedStats::new();
        for rule in &self.rules {
            let value = rule.apply(input, &derived);
            derived.set(rule.output(), value);
        }
        derived
    }

    /// `(output, formula)` for each rule, in evaluation order.
    pub fn describe(&self) -> Vec<(Derived, String)> {
        self.rules
            .iter()
            .map(|rule| (rule.output(), rule.description()))
            .collect()
    }
}

impl std::fmt::Debug for DerivationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.output()))
            .finish()
    }
}
