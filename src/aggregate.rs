//! Stat aggregation.
//!
//! Turns a gear set plus buffs and job-side data into one [`StatBag`].
//! Every contribution is additive: item stats, bound path augments, self
//! buffs, food, custom overrides, base stats, traits, gifts and master level.
//! Multiplicative effects such as `Attack%` or the haste kinds stay separate
//! percentage stats and are interpreted by the simulation.
//!
//! The order of summation is fixed (gear in slot order, then everything
//! else), so the same inputs always produce bit-identical totals.

use crate::augment::PathTable;
use crate::bag::StatBag;
use crate::buffs::BuffConfiguration;
use crate::gear::{Equipped, GearSet};
use crate::job::{JobProfile, MasterLevelTable};
use serde::{Deserialize, Serialize};

/// One labelled contribution to a [`StatProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub source: String,
    pub stats: StatBag,
}

/// Aggregated stats for one gear set and buff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatProfile {
    pub totals: StatBag,
    /// Per-source contributions, in summation order. Only recorded on request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<Contribution>>,
}

impl StatProfile {
    pub fn new(totals: StatBag) -> Self {
        Self {
            totals,
            breakdown: None,
        }
    }
}

/// Sums stat contributions against the reference tables.
///
/// # Examples
///
/// ```rust
/// use zzgear::{
///     Aggregator, BuffConfiguration, EquipSlot, GearSet, Item, Job, JobProfile,
///     MasterLevelTable, PathTable, Slot, Stat, StatBag,
/// };
///
/// let paths = PathTable::new();
/// let levels = MasterLevelTable::default();
/// let aggregator = Aggregator::new(&paths, &levels);
///
/// let gear = GearSet::new()
///     .with(Slot::Head, Item::new(1, "Hat", EquipSlot::Head)
///         .with_stats(StatBag::new().with(Stat::Accuracy, 30.0)))
///     .unwrap();
/// let job = JobProfile::new(Job::War).with_base(StatBag::new().with(Stat::Accuracy, 10.0));
///
/// let profile = aggregator.aggregate(&gear, &BuffConfiguration::new(), &job, 0);
/// assert_eq!(profile.totals.get(Stat::Accuracy), 40.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    paths: &'a PathTable,
    master_levels: &'a MasterLevelTable,
}

impl<'a> Aggregator<'a> {
    pub fn new(paths: &'a PathTable, master_levels: &'a MasterLevelTable) -> Self {
        Self {
            paths,
            master_levels,
        }
    }

    /// Path augment stats for an equipped item, if a path is bound and the
    /// item has path data for it.
    pub fn path_stats(&self, equipped: &Equipped) -> Option<&'a StatBag> {
        let choice = equipped.path?;
        self.paths
            .resolve(equipped.item.path_key(), choice.path, choice.rank)
    }

    /// Add one equipped item (and its bound path) to a bag.
    pub fn add_equipped(&self, bag: &mut StatBag, equipped: &Equipped) {
        bag.merge(&equipped.item.stats);
        if let Some(path) = self.path_stats(equipped) {
            bag.merge(path);
        }
    }

    /// Sum of every equipped item in slot order.
    pub fn gear_bag(&self, gear: &GearSet) -> StatBag {
        let mut bag = StatBag::new();
        for (_, equipped) in gear.iter() {
            self.add_equipped(&mut bag, equipped);
        }
        bag
    }

    /// Everything except gear: buffs, food, custom, base, traits, gifts and
    /// master level. Constant for a whole search.
    pub fn base_bag(&self, buffs: &BuffConfiguration, job: &JobProfile, master_level: u8) -> StatBag {
        let mut bag = StatBag::new();
        for (_, stats) in self.non_gear(buffs, job, master_level) {
            bag.merge(&stats);
        }
        bag
    }

    /// Aggregate a gear set.
    pub fn aggregate(
        &self,
        gear: &GearSet,
        buffs: &BuffConfiguration,
        job: &JobProfile,
        master_level: u8,
    ) -> StatProfile {
        let totals = self.gear_bag(gear).plus(&self.base_bag(buffs, job, master_level));
        StatProfile::new(totals)
    }

    /// Aggregate a gear set, recording every contribution by source.
    ///
    /// Totals are identical to [`Aggregator::aggregate`].
    pub fn aggregate_with_breakdown(
        &self,
        gear: &GearSet,
        buffs: &BuffConfiguration,
        job: &JobProfile,
        master_level: u8,
    ) -> StatProfile {
        let mut breakdown = Vec::new();
        for (slot, equipped) in gear.iter() {
            breakdown.push(Contribution {
                source: format!("{}: {}", slot, equipped.item.name),
                stats: equipped.item.stats.clone(),
            });
            if let (Some(choice), Some(stats)) = (equipped.path, self.path_stats(equipped)) {
                breakdown.push(Contribution {
                    source: format!(
                        "{}: {} (path {:?} rank {})",
                        slot, equipped.item.name, choice.path, choice.rank
                    ),
                    stats: stats.clone(),
                });
            }
        }
        breakdown.extend(
            self.non_gear(buffs, job, master_level)
                .map(|(source, stats)| Contribution { source, stats }),
        );
        let totals = self.gear_bag(gear).plus(&self.base_bag(buffs, job, master_level));
        StatProfile {
            totals,
            breakdown: Some(breakdown),
        }
    }

    fn non_gear<'b>(
        &self,
        buffs: &'b BuffConfiguration,
        job: &'b JobProfile,
        master_level: u8,
    ) -> impl Iterator<Item = (String, StatBag)> + 'b {
        let master = self.master_levels.bonus(job, master_level);
        buffs
            .self_contributions()
            .map(|(source, stats)| (source, stats.clone()))
            .chain([
                ("base".to_string(), job.base.clone()),
                ("traits".to_string(), job.traits.clone()),
                ("gifts".to_string(), job.gifts.clone()),
                (format!("master level {}", master_level.min(self.master_levels.max_level)), master),
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{AugmentPath, AugmentPathSpec, PathChoice};
    use crate::buffs::{ActiveBuff, BuffEffect};
    use crate::item::{EquipSlot, Item, Slot};
    use crate::job::Job;
    use crate::stat::Stat;

    fn tables() -> (PathTable, MasterLevelTable) {
        let mut paths = PathTable::new();
        paths.insert(
            100,
            AugmentPathSpec::new()
                .with_tier(AugmentPath::A, 15, StatBag::new().with(Stat::StoreTp, 10.0)),
        );
        (paths, MasterLevelTable::default())
    }

    #[test]
    fn test_path_stats_added_when_bound() {
        let (paths, levels) = tables();
        let aggregator = Aggregator::new(&paths, &levels);
        let hat = Item::new(100, "Hat", EquipSlot::Head).with_stats(StatBag::new().with(Stat::StoreTp, 5.0));
        let equipped = Equipped::from(hat).with_path(PathChoice {
            path: AugmentPath::A,
            rank: 15,
        });
        let mut gear = GearSet::new();
        gear.equip(Slot::Head, equipped).unwrap();

        let profile = aggregator.aggregate(&gear, &BuffConfiguration::new(), &JobProfile::new(Job::Sam), 0);
        assert_eq!(profile.totals.get(Stat::StoreTp), 15.0);
    }

    #[test]
    fn test_unbound_path_ignored() {
        let (paths, levels) = tables();
        let aggregator = Aggregator::new(&paths, &levels);
        let gear = GearSet::new()
            .with(Slot::Head, Item::new(100, "Hat", EquipSlot::Head))
            .unwrap();
        let profile = aggregator.aggregate(&gear, &BuffConfiguration::new(), &JobProfile::new(Job::Sam), 0);
        assert_eq!(profile.totals.get(Stat::StoreTp), 0.0);
    }

    #[test]
    fn test_breakdown_matches_totals() {
        let (paths, levels) = tables();
        let aggregator = Aggregator::new(&paths, &levels);
        let gear = GearSet::new()
            .with(
                Slot::Neck,
                Item::new(7, "Nodowa", EquipSlot::Neck).with_stats(StatBag::new().with(Stat::Accuracy, 15.0)),
            )
            .unwrap();
        let buffs = BuffConfiguration::new()
            .with(ActiveBuff::Song(BuffEffect::new(
                "Madrigal",
                StatBag::new().with(Stat::Accuracy, 60.0),
            )))
            .unwrap();
        let job = JobProfile::new(Job::Sam).with_job_points(2100);

        let plain = aggregator.aggregate(&gear, &buffs, &job, 20);
        let detailed = aggregator.aggregate_with_breakdown(&gear, &buffs, &job, 20);
        assert_eq!(plain.totals, detailed.totals);

        let breakdown = detailed.breakdown.unwrap();
        assert_eq!(breakdown[0].source, "neck: Nodowa");
        assert!(breakdown.iter().any(|c| c.source == "song: Madrigal"));
        assert!(breakdown.iter().any(|c| c.source == "master level 20"));
        let summed = breakdown
            .iter()
            .fold(StatBag::new(), |acc, c| acc.plus(&c.stats));
        assert_eq!(summed.get(Stat::Accuracy), plain.totals.get(Stat::Accuracy));
    }

    #[test]
    fn test_incremental_form_matches_full() {
        let (paths, levels) = tables();
        let aggregator = Aggregator::new(&paths, &levels);
        let gear = GearSet::new()
            .with(Slot::Head, Item::new(1, "Hat", EquipSlot::Head).with_stats(StatBag::new().with(Stat::Str, 7.0)))
            .unwrap()
            .with(Slot::Feet, Item::new(2, "Boots", EquipSlot::Feet).with_stats(StatBag::new().with(Stat::Str, 3.5)))
            .unwrap();
        let job = JobProfile::new(Job::War).with_base(StatBag::new().with(Stat::Str, 120.0));
        let buffs = BuffConfiguration::new();

        let mut running = StatBag::new();
        for (_, equipped) in gear.iter() {
            aggregator.add_equipped(&mut running, equipped);
        }
        let incremental = running.plus(&aggregator.base_bag(&buffs, &job, 0));
        assert_eq!(incremental, aggregator.aggregate(&gear, &buffs, &job, 0).totals);
    }
}
