//! Optimization profiles.
//!
//! An [`Objective`] is a declarative record: a score function over
//! [`ScenarioMetrics`], the caps that matter for the scenario, a tie-break
//! order, and the request data the scenario needs. Higher scores are always
//! better; minimizing objectives negate. The [`ProfileRegistry`] maps
//! [`ProfileId`]s to objectives, so new scenarios are added by registering
//! a record rather than by touching the search or the simulation.

use crate::error::GearError;
use crate::simulation::ScenarioMetrics;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Interned optimization profile name.
///
/// # Examples
///
/// ```rust
/// use zzgear::ProfileId;
///
/// let id = ProfileId::from("pure_tp");
/// assert_eq!(id.as_str(), "pure_tp");
/// assert_eq!(id, ProfileId::from("pure_tp".to_string()));
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProfileId(Arc<str>);

impl ProfileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ProfileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProfileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ProfileId::from(s))
    }
}

/// A scalar read from scenario metrics, used by caps and tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TpPerSecond,
    TimeToWs,
    HitRate,
    WeaponskillDamage,
    MagicDamage,
    MagicHitRate,
    /// Physical damage reduction as a positive percentage.
    PhysicalReduction,
    MagicalReduction,
    Hp,
    MagicEvasion,
    FastCast,
    EnhancingDuration,
    CurePotency,
    CurePotencyII,
    GearHaste,
}

impl Metric {
    /// The metric's value, or `None` when the scenario did not produce it.
    pub fn read(self, m: &ScenarioMetrics) -> Option<f64> {
        match self {
            Metric::TpPerSecond => m.tp.as_ref().map(|tp| tp.tp_per_second),
            Metric::TimeToWs => m.time_to_ws,
            Metric::HitRate => Some(m.accuracy.main.hit_rate),
            Metric::WeaponskillDamage => m.weaponskill.as_ref().map(|ws| ws.damage),
            Metric::MagicDamage => m.magic.as_ref().map(|magic| magic.damage),
            Metric::MagicHitRate => m.magic.as_ref().map(|magic| magic.hit_rate),
            Metric::PhysicalReduction => Some(m.mitigation.physical_reduction()),
            Metric::MagicalReduction => Some(m.mitigation.magical_reduction()),
            Metric::Hp => Some(m.mitigation.hp),
            Metric::MagicEvasion => Some(m.mitigation.magic_evasion),
            Metric::FastCast => Some(m.utility.fast_cast.effective),
            Metric::EnhancingDuration => Some(m.utility.enhancing_duration),
            Metric::CurePotency => Some(m.healing.cure_potency.effective),
            Metric::CurePotencyII => Some(m.healing.cure_potency_ii.effective),
            Metric::GearHaste => m.tp.as_ref().map(|tp| tp.gear_haste),
        }
    }
}

/// Which end of a metric is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prefer {
    Higher,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TieBreak {
    pub metric: Metric,
    pub prefer: Prefer,
}

impl TieBreak {
    pub fn higher(metric: Metric) -> Self {
        Self {
            metric,
            prefer: Prefer::Higher,
        }
    }

    pub fn lower(metric: Metric) -> Self {
        Self {
            metric,
            prefer: Prefer::Lower,
        }
    }
}

/// A cap the scenario cares about: reached when `metric >= limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapRule {
    pub name: String,
    pub metric: Metric,
    pub limit: f64,
}

impl CapRule {
    pub fn new(name: impl Into<String>, metric: Metric, limit: f64) -> Self {
        Self {
            name: name.into(),
            metric,
            limit,
        }
    }
}

/// Evaluated [`CapRule`] for one gear set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapStatus {
    pub name: String,
    pub value: Option<f64>,
    pub limit: f64,
    pub reached: bool,
}

/// Request data a profile cannot be scored without.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub weapon: bool,
    pub weaponskill: bool,
    pub spell: bool,
}

/// A scoring profile.
#[derive(Debug, Clone)]
pub struct Objective {
    pub id: ProfileId,
    pub description: String,
    pub score: fn(&ScenarioMetrics) -> f64,
    pub caps: Vec<CapRule>,
    pub tie_break: Vec<TieBreak>,
    pub requires: Requirements,
}

impl Objective {
    pub fn new(id: impl Into<ProfileId>, description: impl Into<String>, score: fn(&ScenarioMetrics) -> f64) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            score,
            caps: Vec::new(),
            tie_break: Vec::new(),
            requires: Requirements::default(),
        }
    }

    pub fn with_cap(mut self, cap: CapRule) -> Self {
        self.caps.push(cap);
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break.push(tie_break);
        self
    }

    pub fn requiring(mut self, requires: Requirements) -> Self {
        self.requires = requires;
        self
    }

    pub fn score_of(&self, metrics: &ScenarioMetrics) -> f64 {
        (self.score)(metrics)
    }

    pub fn cap_status(&self, metrics: &ScenarioMetrics) -> Vec<CapStatus> {
        self.caps
            .iter()
            .map(|cap| {
                let value = cap.metric.read(metrics);
                CapStatus {
                    name: cap.name.clone(),
                    value,
                    limit: cap.limit,
                    reached: value.map(|v| v >= cap.limit).unwrap_or(false),
                }
            })
            .collect()
    }

    /// Ordering with the better set first: score, then each tie-break.
    /// A missing tie-break metric ranks after a present one.
    pub fn compare(&self, a: &ScenarioMetrics, b: &ScenarioMetrics) -> Ordering {
        let mut ordering = b.score.total_cmp(&a.score);
        for tie in &self.tie_break {
            if ordering != Ordering::Equal {
                break;
            }
            ordering = match (tie.metric.read(a), tie.metric.read(b)) {
                (Some(x), Some(y)) => match tie.prefer {
                    Prefer::Higher => y.total_cmp(&x),
                    Prefer::Lower => x.total_cmp(&y),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
        }
        ordering
    }
}

/// Public description of a registered profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub id: ProfileId,
    pub description: String,
    pub caps: Vec<CapRule>,
    pub tie_break: Vec<TieBreak>,
    pub requires: Requirements,
}

impl From<&Objective> for ProfileSummary {
    fn from(objective: &Objective) -> Self {
        Self {
            id: objective.id.clone(),
            description: objective.description.clone(),
            caps: objective.caps.clone(),
            tie_break: objective.tie_break.clone(),
            requires: objective.requires,
        }
    }
}

/// Registered profiles by id.
///
/// # Examples
///
/// ```rust
/// use zzgear::{ProfileId, ProfileRegistry};
///
/// let registry = ProfileRegistry::standard();
/// assert!(registry.get(&ProfileId::from("damage_taken")).is_ok());
/// assert!(registry.get(&ProfileId::from("speed")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<ProfileId, Objective>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile, returning the one it replaced.
    pub fn register(&mut self, objective: Objective) -> Option<Objective> {
        self.profiles.insert(objective.id.clone(), objective)
    }

    pub fn get(&self, id: &ProfileId) -> Result<&Objective, GearError> {
        self.profiles
            .get(id)
            .ok_or_else(|| GearError::UnknownProfile(id.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Objective> {
        self.profiles.values()
    }

    /// The built-in profiles.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for objective in standard_profiles() {
            registry.register(objective);
        }
        registry
    }
}

fn or_worst(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NEG_INFINITY)
}

fn standard_profiles() -> Vec<Objective> {
    let weapon = Requirements {
        weapon: true,
        ..Requirements::default()
    };
    vec![
        Objective::new("pure_tp", "Maximize TP gained per second", |m| {
            or_worst(Metric::TpPerSecond.read(m))
        })
        .with_cap(CapRule::new("gear haste", Metric::GearHaste, 25.0))
        .with_tie_break(TieBreak::higher(Metric::HitRate))
        .requiring(weapon),
        Objective::new("time_to_ws", "Minimize time to reach the TP threshold", |m| {
            m.time_to_ws.map(|t| -t).unwrap_or(f64::NEG_INFINITY)
        })
        .with_cap(CapRule::new("gear haste", Metric::GearHaste, 25.0))
        .with_tie_break(TieBreak::higher(Metric::TpPerSecond))
        .with_tie_break(TieBreak::higher(Metric::HitRate))
        .requiring(weapon),
        Objective::new(
            "hybrid_tp",
            "TP per second weighted by physical damage reduction",
            |m| {
                let tps = or_worst(Metric::TpPerSecond.read(m));
                tps * (1.0 + m.mitigation.physical_reduction() / 100.0)
            },
        )
        .with_cap(CapRule::new("physical damage taken", Metric::PhysicalReduction, 50.0))
        .with_tie_break(TieBreak::higher(Metric::PhysicalReduction))
        .with_tie_break(TieBreak::higher(Metric::HitRate))
        .requiring(weapon),
        Objective::new("weaponskill", "Maximize expected weaponskill damage", |m| {
            or_worst(Metric::WeaponskillDamage.read(m))
        })
        .with_tie_break(TieBreak::higher(Metric::HitRate))
        .requiring(Requirements {
            weapon: true,
            weaponskill: true,
            spell: false,
        }),
        Objective::new("magic", "Maximize expected spell damage", |m| {
            or_worst(Metric::MagicDamage.read(m))
        })
        .with_tie_break(TieBreak::higher(Metric::MagicHitRate))
        .requiring(Requirements {
            spell: true,
            ..Requirements::default()
        }),
        Objective::new(
            "damage_taken",
            "Reach the physical and magical damage taken caps",
            |m| m.mitigation.physical_reduction() + m.mitigation.magical_reduction(),
        )
        .with_cap(CapRule::new("physical damage taken", Metric::PhysicalReduction, 50.0))
        .with_cap(CapRule::new("magical damage taken", Metric::MagicalReduction, 50.0))
        .with_tie_break(TieBreak::higher(Metric::Hp))
        .with_tie_break(TieBreak::higher(Metric::MagicEvasion)),
        Objective::new("fast_cast", "Maximize fast cast up to its cap", |m| {
            m.utility.fast_cast.effective
        })
        .with_cap(CapRule::new("fast cast", Metric::FastCast, 80.0))
        .with_tie_break(TieBreak::higher(Metric::Hp)),
        Objective::new("enhancing", "Maximize enhancing magic duration", |m| {
            m.utility.enhancing_duration
        })
        .with_tie_break(TieBreak::higher(Metric::FastCast)),
        Objective::new("healing", "Maximize cure potency up to its caps", |m| {
            m.healing.total
        })
        .with_cap(CapRule::new("cure potency", Metric::CurePotency, 50.0))
        .with_cap(CapRule::new("cure potency II", Metric::CurePotencyII, 30.0))
        .with_tie_break(TieBreak::higher(Metric::FastCast))
        .with_tie_break(TieBreak::higher(Metric::Hp)),
    ]
}
