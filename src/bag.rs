//! Stat bag module.
//!
//! A [`StatBag`] is the unit of stat contribution: items, augment tiers,
//! buffs, traits and gifts each carry one, and aggregation is plain
//! summation of bags. Summation is additive and order-free for known stats,
//! so any contributor may be added in any order.

use crate::stat::{Stat, StatKey};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Numeric stat storage with a passthrough bucket.
///
/// Known stats live in a dense array indexed by [`Stat::index`]. Unknown
/// names from item data are summed in an ordered map so they survive
/// aggregation untouched. Missing stats read as `0.0`.
///
/// # Examples
///
/// ```rust
/// use zzgear::{Stat, StatBag};
///
/// let mut gear = StatBag::new().with(Stat::Str, 10.0).with(Stat::Accuracy, 25.0);
/// let food = StatBag::new().with(Stat::Accuracy, 90.0);
///
/// gear.merge(&food);
/// assert_eq!(gear.get(Stat::Accuracy), 115.0);
/// assert_eq!(gear.get(Stat::Dex), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StatBag {
    known: [f64; Stat::COUNT],
    passthrough: BTreeMap<Arc<str>, f64>,
}

impl StatBag {
    /// An empty bag.
    pub const EMPTY: StatBag = StatBag {
        known: [0.0; Stat::COUNT],
        passthrough: BTreeMap::new(),
    };

    /// Create an empty bag.
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Builder-style add.
    pub fn with(mut self, stat: Stat, value: f64) -> Self {
        self.add(stat, value);
        self
    }

    /// Build a bag from `(name, value)` pairs, parsing each name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzgear::{Stat, StatBag};
    ///
    /// let bag = StatBag::from_named([("DA", 5.0), ("DA", 3.0), ("Pet: Haste", 4.0)]);
    /// assert_eq!(bag.get(Stat::DoubleAttack), 8.0);
    /// assert_eq!(bag.passthrough("Pet: Haste"), Some(4.0));
    /// ```
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut bag = Self::new();
        for (name, value) in pairs {
            bag.add_key(&StatKey::parse(name), value);
        }
        bag
    }

    /// Value of a known stat, `0.0` when absent.
    pub fn get(&self, stat: Stat) -> f64 {
        self.known[stat.index()]
    }

    /// Value of a passthrough stat, if any contributor supplied it.
    pub fn passthrough(&self, name: &str) -> Option<f64> {
        self.passthrough.get(name).copied()
    }

    /// Overwrite a known stat.
    pub fn set(&mut self, stat: Stat, value: f64) {
        self.known[stat.index()] = value;
    }

    /// Add to a known stat.
    pub fn add(&mut self, stat: Stat, value: f64) {
        self.known[stat.index()] += value;
    }

    /// Add to any stat key.
    pub fn add_key(&mut self, key: &StatKey, value: f64) {
        match key {
            StatKey::Known(stat) => self.add(*stat, value),
            StatKey::Passthrough(name) => {
                *self.passthrough.entry(name.clone()).or_insert(0.0) += value;
            }
        }
    }

    /// Sum another bag into this one.
    pub fn merge(&mut self, other: &StatBag) {
        for (slot, value) in self.known.iter_mut().zip(other.known.iter()) {
            *slot += *value;
        }
        for (name, value) in &other.passthrough {
            *self.passthrough.entry(name.clone()).or_insert(0.0) += *value;
        }
    }

    /// Sum of this bag and another, leaving both untouched.
    pub fn plus(&self, other: &StatBag) -> StatBag {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Whether every entry is zero.
    pub fn is_empty(&self) -> bool {
        self.known.iter().all(|v| *v == 0.0) && self.passthrough.values().all(|v| *v == 0.0)
    }

    /// Non-zero entries, known stats first in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (StatKey, f64)> + '_ {
        let known = Stat::ALL
            .iter()
            .filter(|stat| self.get(**stat) != 0.0)
            .map(|stat| (StatKey::Known(*stat), self.get(*stat)));
        let passthrough = self
            .passthrough
            .iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|(name, v)| (StatKey::Passthrough(name.clone()), *v));
        known.chain(passthrough)
    }

    /// Componentwise `self >= other` over every key present in either bag.
    pub fn dominates(&self, other: &StatBag) -> bool {
        let known = self
            .known
            .iter()
            .zip(other.known.iter())
            .all(|(a, b)| a >= b);
        let ours = self.passthrough.iter().all(|(name, v)| {
            *v >= other.passthrough.get(name).copied().unwrap_or(0.0)
        });
        let theirs = other
            .passthrough
            .iter()
            .all(|(name, v)| self.passthrough.get(name).copied().unwrap_or(0.0) >= *v);
        known && ours && theirs
    }
}

impl Default for StatBag {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(Stat, f64)> for StatBag {
    fn from_iter<T: IntoIterator<Item = (Stat, f64)>>(iter: T) -> Self {
        let mut bag = StatBag::new();
        for (stat, value) in iter {
            bag.add(stat, value);
        }
        bag
    }
}

impl Serialize for StatBag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(StatKey, f64)> = self.iter().collect();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

struct StatBagVisitor;

impl<'de> Visitor<'de> for StatBagVisitor {
    type Value = StatBag;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of stat names to numbers")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut bag = StatBag::new();
        while let Some((name, value)) = access.next_entry::<String, f64>()? {
            bag.add_key(&StatKey::from(name), value);
        }
        Ok(bag)
    }
}

impl<'de> Deserialize<'de> for StatBag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(StatBagVisitor)
    }
}
