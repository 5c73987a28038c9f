//! Path augment resolution.
//!
//! Some items carry rank-selectable augment tracks ("paths"). Each path is a
//! step function: the stats at a rank are those of the highest tier whose
//! rank does not exceed it. Nothing is interpolated.

use crate::bag::StatBag;
use crate::item::{ItemId, Slot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named augment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AugmentPath {
    A,
    B,
    C,
    D,
}

impl AugmentPath {
    pub const ALL: [AugmentPath; 4] = [AugmentPath::A, AugmentPath::B, AugmentPath::C, AugmentPath::D];

    pub fn parse(name: &str) -> Option<AugmentPath> {
        match name.trim() {
            "A" | "a" => Some(AugmentPath::A),
            "B" | "b" => Some(AugmentPath::B),
            "C" | "c" => Some(AugmentPath::C),
            "D" | "d" => Some(AugmentPath::D),
            _ => None,
        }
    }
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTier {
    pub rank: u32,
    pub stats: StatBag,
}

/// All paths of one item, each sorted by rank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<AugmentPath, Vec<PathTier>>",
    into = "BTreeMap<AugmentPath, Vec<PathTier>>"
)]
pub struct AugmentPathSpec {
    paths: BTreeMap<AugmentPath, Vec<PathTier>>,
}

impl From<BTreeMap<AugmentPath, Vec<PathTier>>> for AugmentPathSpec {
    fn from(mut paths: BTreeMap<AugmentPath, Vec<PathTier>>) -> Self {
        for tiers in paths.values_mut() {
            tiers.sort_by_key(|tier| tier.rank);
        }
        Self { paths }
    }
}

impl From<AugmentPathSpec> for BTreeMap<AugmentPath, Vec<PathTier>> {
    fn from(spec: AugmentPathSpec) -> Self {
        spec.paths
    }
}

impl AugmentPathSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tier to a path, keeping the path sorted by rank.
    pub fn with_tier(mut self, path: AugmentPath, rank: u32, stats: StatBag) -> Self {
        let tiers = self.paths.entry(path).or_default();
        let at = tiers.partition_point(|tier| tier.rank <= rank);
        tiers.insert(at, PathTier { rank, stats });
        self
    }

    pub fn paths(&self) -> impl Iterator<Item = AugmentPath> + '_ {
        self.paths.keys().copied()
    }

    /// Highest rank defined for a path.
    pub fn max_rank(&self, path: AugmentPath) -> Option<u32> {
        self.paths.get(&path)?.last().map(|tier| tier.rank)
    }

    /// Stats at `rank` on `path`.
    ///
    /// Ranks above the top tier resolve to the top tier; ranks below the
    /// first tier resolve to an empty bag. Returns `None` when the item has
    /// no such path.
    pub fn resolve(&self, path: AugmentPath, rank: u32) -> Option<&StatBag> {
        let tiers = self.paths.get(&path)?;
        let reached = tiers.partition_point(|tier| tier.rank <= rank);
        match reached {
            0 => Some(&EMPTY),
            n => Some(&tiers[n - 1].stats),
        }
    }
}

static EMPTY: StatBag = StatBag::EMPTY;

/// Path augment table keyed by item augment reference.
///
/// # Examples
///
/// ```rust
/// use zzgear::{AugmentPath, AugmentPathSpec, PathTable, Stat, StatBag};
///
/// let spec = AugmentPathSpec::new()
///     .with_tier(AugmentPath::A, 1, StatBag::new().with(Stat::Accuracy, 5.0))
///     .with_tier(AugmentPath::A, 15, StatBag::new().with(Stat::Accuracy, 20.0));
///
/// let mut table = PathTable::new();
/// table.insert(900, spec);
///
/// assert!(table.has_path(900));
/// assert_eq!(table.resolve(900, AugmentPath::A, 14).unwrap().get(Stat::Accuracy), 5.0);
/// assert_eq!(table.resolve(900, AugmentPath::A, 999).unwrap().get(Stat::Accuracy), 20.0);
/// assert!(table.resolve(900, AugmentPath::B, 15).is_none());
/// assert!(table.resolve(901, AugmentPath::A, 15).is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathTable {
    specs: HashMap<ItemId, AugmentPathSpec>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ItemId, spec: AugmentPathSpec) {
        self.specs.insert(key, spec);
    }

    pub fn has_path(&self, key: ItemId) -> bool {
        self.specs.contains_key(&key)
    }

    pub fn spec(&self, key: ItemId) -> Option<&AugmentPathSpec> {
        self.specs.get(&key)
    }

    pub fn resolve(&self, key: ItemId, path: AugmentPath, rank: u32) -> Option<&StatBag> {
        self.specs.get(&key)?.resolve(path, rank)
    }
}

/// A path and rank bound to an equipped item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathChoice {
    pub path: AugmentPath,
    pub rank: u32,
}

/// The path chosen for whatever item occupies a slot.
///
/// Only meaningful while `item_id` is the item actually in that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    pub item_id: ItemId,
    pub path: AugmentPath,
    pub rank: u32,
}

impl PathConfig {
    pub fn choice(&self) -> PathChoice {
        PathChoice {
            path: self.path,
            rank: self.rank,
        }
    }
}

/// Per-slot path configuration for dream-set mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathConfigs {
    by_slot: BTreeMap<Slot, PathConfig>,
}

impl PathConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: Slot, config: PathConfig) {
        self.by_slot.insert(slot, config);
    }

    pub fn get(&self, slot: Slot) -> Option<&PathConfig> {
        self.by_slot.get(&slot)
    }

    /// The choice for `slot` if it was configured for `item_id`.
    pub fn choice_for(&self, slot: Slot, item_id: ItemId) -> Option<PathChoice> {
        self.by_slot
            .get(&slot)
            .filter(|config| config.item_id == item_id)
            .map(PathConfig::choice)
    }

    /// Drop the config for `slot` unless it is bound to `item_id`.
    pub fn rebind(&mut self, slot: Slot, item_id: ItemId) {
        if self.choice_for(slot, item_id).is_none() {
            self.by_slot.remove(&slot);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &PathConfig)> {
        self.by_slot.iter().map(|(slot, config)| (*slot, config))
    }
}
