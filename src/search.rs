//! Beam search over per-slot candidate pools.
//!
//! The search is a fold over [`Slot::ALL`]. Each step expands every beam
//! entry by every legal option for the slot (including leaving it empty
//! unless the slot is required), scores the children on the partial set,
//! stable-sorts them with the objective's comparator and selects up to
//! `beam_width` survivors, skipping mirrored duplicates. After the last slot
//! the survivors are re-aggregated and fully simulated, then ranked again.
//!
//! Selection is nested: beam position `m` takes the best unused child of
//! the parents at positions `0..=m`. The first `m` survivors therefore
//! depend only on the first `m` parents, and a narrower beam is always a
//! prefix of a wider one.
//!
//! Every step is deterministic: candidate order is fixed by the pools,
//! parallel evaluation preserves input order, and sorting is stable.

use crate::aggregate::Aggregator;
use crate::bag::StatBag;
use crate::config::OptimizerConfig;
use crate::context::ScenarioContext;
use crate::error::GearError;
use crate::gear::{Equipped, GearSet};
use crate::item::Slot;
use crate::job::JobProfile;
use crate::objective::Objective;
use crate::simulation::{ScenarioMetrics, SimDepth, Simulator};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Candidate items for each slot.
///
/// A required slot never offers "equip nothing"; a required slot with no
/// candidates therefore empties the beam.
#[derive(Debug, Clone, Default)]
pub struct SlotPools {
    pools: [Vec<Equipped>; 16],
    required: [bool; 16],
}

impl SlotPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot's candidates, dropping any the job cannot wear there.
    pub fn set(&mut self, slot: Slot, candidates: Vec<Equipped>, job: &JobProfile) {
        let before = candidates.len();
        let kept: Vec<Equipped> = candidates
            .into_iter()
            .filter(|equipped| {
                let item = &equipped.item;
                item.equippable_by(job.job)
                    && item.slot.fits(slot)
                    && !(slot == Slot::Sub && item.is_weapon() && !job.dual_wield)
            })
            .collect();
        if kept.len() < before {
            debug!(
                slot = %slot,
                dropped = before - kept.len(),
                "dropped ineligible candidates"
            );
        }
        self.pools[slot.index()] = kept;
    }

    /// Builder-style [`SlotPools::set`].
    pub fn with(mut self, slot: Slot, candidates: Vec<Equipped>, job: &JobProfile) -> Self {
        self.set(slot, candidates, job);
        self
    }

    /// Mark a slot as required: it must hold one of its candidates.
    pub fn require(&mut self, slot: Slot) {
        self.required[slot.index()] = true;
    }

    pub fn candidates(&self, slot: Slot) -> &[Equipped] {
        &self.pools[slot.index()]
    }

    pub fn is_required(&self, slot: Slot) -> bool {
        self.required[slot.index()]
    }

    /// Total number of candidates across all slots.
    pub fn len(&self) -> usize {
        self.pools.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cooperative cancellation flag, checked once per slot boundary.
///
/// # Examples
///
/// ```rust
/// use zzgear::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A partial gear set in the beam.
#[derive(Debug, Clone)]
pub struct BeamEntry {
    pub gear: GearSet,
    /// Sum of the equipped items (and their paths) in slot order.
    pub gear_sum: StatBag,
    pub metrics: ScenarioMetrics,
    /// Position in the beam. A child carries its parent's position until
    /// it is selected.
    pub position: usize,
}

impl BeamEntry {
    pub fn score(&self) -> f64 {
        self.metrics.score
    }
}

/// The beam after some number of slots.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub beam: Vec<BeamEntry>,
    /// Slots filled so far, in [`Slot::ALL`] order.
    pub filled: usize,
}

impl SearchState {
    pub fn is_exhausted(&self) -> bool {
        self.beam.is_empty()
    }
}

/// One complete gear set in the final ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RankedGearSet {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub gear: GearSet,
    pub score: f64,
    pub metrics: ScenarioMetrics,
}

/// Scores gear sets for one request: aggregation, simulation and the objective.
#[derive(Debug)]
pub struct Evaluator<'a> {
    aggregator: Aggregator<'a>,
    simulator: Simulator<'a>,
    objective: &'a Objective,
    context: &'a ScenarioContext,
    base: StatBag,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        aggregator: Aggregator<'a>,
        simulator: Simulator<'a>,
        objective: &'a Objective,
        context: &'a ScenarioContext,
    ) -> Self {
        let base = aggregator.base_bag(&context.buffs, &context.job, context.master_level);
        Self {
            aggregator,
            simulator,
            objective,
            context,
            base,
        }
    }

    pub fn objective(&self) -> &Objective {
        self.objective
    }

    /// Score a partial set from its running gear sum.
    fn partial(&self, gear: GearSet, gear_sum: StatBag) -> Result<BeamEntry, GearError> {
        let stats = gear_sum.plus(&self.base);
        let metrics =
            self.simulator
                .simulate(self.context, &gear, &stats, self.objective, SimDepth::Partial)?;
        Ok(BeamEntry {
            gear,
            gear_sum,
            metrics,
            position: 0,
        })
    }

    /// Extend an entry with one option for `slot`.
    fn extend(
        &self,
        entry: &BeamEntry,
        slot: Slot,
        choice: Option<&Equipped>,
    ) -> Result<BeamEntry, GearError> {
        let mut gear = entry.gear.clone();
        let mut gear_sum = entry.gear_sum.clone();
        if let Some(equipped) = choice {
            self.aggregator.add_equipped(&mut gear_sum, equipped);
        }
        gear.place(slot, choice.cloned());
        let child = self.partial(gear, gear_sum)?;
        Ok(BeamEntry {
            position: entry.position,
            ..child
        })
    }

    /// Re-aggregate a complete set from scratch and simulate it fully.
    pub fn full(&self, gear: &GearSet) -> Result<ScenarioMetrics, GearError> {
        let context = self.context;
        let profile = self.aggregator.aggregate(
            gear,
            &context.buffs,
            &context.job,
            context.master_level,
        );
        self.simulator
            .simulate(context, gear, &profile.totals, self.objective, SimDepth::Full)
    }

    fn finalize(&self, entry: BeamEntry) -> Result<BeamEntry, GearError> {
        let metrics = self.full(&entry.gear)?;
        Ok(BeamEntry { metrics, ..entry })
    }
}

/// Beam search driver for one request.
pub struct BeamSearch<'a> {
    evaluator: &'a Evaluator<'a>,
    pools: &'a SlotPools,
    config: &'a OptimizerConfig,
    cancel: Option<&'a CancelToken>,
}

impl<'a> BeamSearch<'a> {
    pub fn new(
        evaluator: &'a Evaluator<'a>,
        pools: &'a SlotPools,
        config: &'a OptimizerConfig,
        cancel: Option<&'a CancelToken>,
    ) -> Self {
        Self {
            evaluator,
            pools,
            config,
            cancel,
        }
    }

    /// Run the search and return the top `top_k` complete sets, best first.
    ///
    /// An empty beam at any point yields an empty ranking, not an error.
    pub fn run(&self) -> Result<Vec<RankedGearSet>, GearError> {
        let seed = self.evaluator.partial(GearSet::new(), StatBag::new())?;
        let state = Slot::ALL.iter().try_fold(
            SearchState {
                beam: vec![seed],
                filled: 0,
            },
            |state, slot| self.step(state, *slot),
        )?;
        self.finish(state)
    }

    /// Fill one slot.
    pub fn step(&self, state: SearchState, slot: Slot) -> Result<SearchState, GearError> {
        if self.cancel.map(CancelToken::is_cancelled).unwrap_or(false) {
            warn!(slot = %slot, filled = state.filled, "search cancelled");
            return Err(GearError::Cancelled(slot));
        }
        if state.is_exhausted() {
            return Ok(state);
        }

        let dual_wield = self.evaluator.context.job.dual_wield;
        let expansions: Vec<(&BeamEntry, Option<&Equipped>)> = state
            .beam
            .iter()
            .flat_map(|entry| {
                self.options(slot, &entry.gear, dual_wield)
                    .into_iter()
                    .map(move |choice| (entry, choice))
            })
            .collect();

        let evaluator = self.evaluator;
        let children: Vec<BeamEntry> = if self.config.parallel {
            expansions
                .par_iter()
                .map(|(entry, choice)| evaluator.extend(entry, slot, *choice))
                .collect::<Result<_, _>>()?
        } else {
            expansions
                .iter()
                .map(|(entry, choice)| evaluator.extend(entry, slot, *choice))
                .collect::<Result<_, _>>()?
        };

        let evaluated = children.len();
        let children = self.select(children);
        debug!(
            slot = %slot,
            evaluated,
            beam = children.len(),
            best = children.iter().map(BeamEntry::score).fold(f64::NEG_INFINITY, f64::max),
            "slot filled"
        );
        Ok(SearchState {
            beam: children,
            filled: state.filled + 1,
        })
    }

    /// Legal options for `slot` given what the partial set already holds.
    fn options(&self, slot: Slot, gear: &GearSet, dual_wield: bool) -> Vec<Option<&'a Equipped>> {
        if slot == Slot::Sub && gear.is_two_handed_main() {
            return vec![None];
        }
        let mut options = Vec::new();
        if !self.pools.is_required(slot) {
            options.push(None);
        }
        let partner = slot.paired().and_then(|other| gear.item(other));
        options.extend(
            self.pools
                .candidates(slot)
                .iter()
                .filter(|equipped| {
                    let item = &equipped.item;
                    if slot == Slot::Sub && item.is_weapon() && !dual_wield {
                        return false;
                    }
                    !matches!(partner, Some(other) if item.rare && other.id == item.id)
                })
                .map(Some),
        );
        options
    }

    /// Pick up to `beam_width` survivors in beam position order.
    ///
    /// Position `m` is filled by the best child whose parent sits at a
    /// position `<= m` and which is neither taken nor a mirror of a taken
    /// set. A position with no such child stays empty.
    fn select(&self, children: Vec<BeamEntry>) -> Vec<BeamEntry> {
        let objective = self.evaluator.objective;
        let mut order: Vec<usize> = (0..children.len()).collect();
        order.sort_by(|&a, &b| objective.compare(&children[a].metrics, &children[b].metrics));

        let last_parent = children.iter().map(|c| c.position).max().unwrap_or(0);
        let mut taken = vec![false; children.len()];
        let mut seen = HashSet::new();
        let mut picks = Vec::new();
        for position in 0..self.config.beam_width {
            let mut pick = None;
            for &i in &order {
                if taken[i] || children[i].position > position {
                    continue;
                }
                taken[i] = true;
                if self.config.dedupe_mirrored && !seen.insert(children[i].gear.signature()) {
                    continue;
                }
                pick = Some(i);
                break;
            }
            match pick {
                Some(i) => picks.push((i, position)),
                None if position >= last_parent => break,
                None => {}
            }
        }

        let mut slots: Vec<Option<BeamEntry>> = children.into_iter().map(Some).collect();
        picks
            .into_iter()
            .filter_map(|(i, position)| {
                slots[i]
                    .take()
                    .map(|entry| BeamEntry { position, ..entry })
            })
            .collect()
    }

    fn rank(&self, entries: &mut [BeamEntry]) {
        let objective = self.evaluator.objective;
        entries.sort_by(|a, b| objective.compare(&a.metrics, &b.metrics));
    }

    /// Fully re-simulate the final beam, re-rank it and take the top K.
    pub fn finish(&self, state: SearchState) -> Result<Vec<RankedGearSet>, GearError> {
        let evaluator = self.evaluator;
        let mut finals: Vec<BeamEntry> = if self.config.parallel {
            state
                .beam
                .into_par_iter()
                .map(|entry| evaluator.finalize(entry))
                .collect::<Result<_, _>>()?
        } else {
            state
                .beam
                .into_iter()
                .map(|entry| evaluator.finalize(entry))
                .collect::<Result<_, _>>()?
        };
        self.rank(&mut finals);
        Ok(finals
            .into_iter()
            .take(self.config.top_k)
            .enumerate()
            .map(|(i, entry)| RankedGearSet {
                rank: i + 1,
                score: entry.metrics.score,
                gear: entry.gear,
                metrics: entry.metrics,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::PathTable;
    use crate::buffs::BuffConfiguration;
    use crate::context::ScenarioParams;
    use crate::derive::DerivationPlan;
    use crate::item::{EquipSlot, Item, ItemId, SkillType, WeaponInfo};
    use crate::job::{Job, MasterLevelTable};
    use crate::objective::{ProfileId, ProfileRegistry};
    use crate::rules::CombatRules;
    use crate::stat::Stat;
    use crate::target::Target;

    struct Fixture {
        paths: PathTable,
        levels: MasterLevelTable,
        rules: CombatRules,
        plan: DerivationPlan,
        registry: ProfileRegistry,
        context: ScenarioContext,
    }

    impl Fixture {
        fn new(job: JobProfile) -> Self {
            Self {
                paths: PathTable::new(),
                levels: MasterLevelTable::default(),
                rules: CombatRules::default(),
                plan: DerivationPlan::standard().unwrap(),
                registry: ProfileRegistry::standard(),
                context: ScenarioContext::new(
                    job,
                    &Target::new("Dummy", 1),
                    BuffConfiguration::new(),
                    ScenarioParams::default(),
                    0,
                ),
            }
        }

        fn run(
            &self,
            profile: &str,
            pools: &SlotPools,
            config: &OptimizerConfig,
            cancel: Option<&CancelToken>,
        ) -> Result<Vec<RankedGearSet>, GearError> {
            let objective = self.registry.get(&ProfileId::from(profile)).unwrap();
            let evaluator = Evaluator::new(
                Aggregator::new(&self.paths, &self.levels),
                Simulator::new(&self.rules, &self.plan),
                objective,
                &self.context,
            );
            BeamSearch::new(&evaluator, pools, config, cancel).run()
        }
    }

    fn ring(id: ItemId, fast_cast: f64) -> Equipped {
        Item::new(id, format!("Ring {}", id), EquipSlot::Ring)
            .with_stats(StatBag::new().with(Stat::FastCast, fast_cast))
            .into()
    }

    #[test]
    fn test_picks_best_rings() {
        let job = JobProfile::new(Job::Rdm);
        let fixture = Fixture::new(job.clone());
        let rings = vec![ring(1, 2.0), ring(2, 5.0), ring(3, 4.0)];
        let pools = SlotPools::new()
            .with(Slot::Ring1, rings.clone(), &job)
            .with(Slot::Ring2, rings, &job);
        let ranked = fixture
            .run("fast_cast", &pools, &OptimizerConfig::default(), None)
            .unwrap();
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].score, 10.0);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rare_item_fills_one_slot_only() {
        let job = JobProfile::new(Job::Rdm);
        let fixture = Fixture::new(job.clone());
        let rare: Equipped = Item::new(9, "Rare Ring", EquipSlot::Ring)
            .with_stats(StatBag::new().with(Stat::FastCast, 8.0))
            .rare()
            .into();
        let pools = SlotPools::new()
            .with(Slot::Ring1, vec![rare.clone()], &job)
            .with(Slot::Ring2, vec![rare], &job);
        let ranked = fixture
            .run("fast_cast", &pools, &OptimizerConfig::default(), None)
            .unwrap();
        assert_eq!(ranked[0].score, 8.0);
        for set in &ranked {
            assert!(set.gear.validate(Job::Rdm, false).is_ok());
        }
    }

    #[test]
    fn test_mirrored_sets_deduplicated() {
        let job = JobProfile::new(Job::Rdm);
        let fixture = Fixture::new(job.clone());
        let rings = vec![ring(1, 3.0), ring(2, 3.0)];
        let pools = SlotPools::new()
            .with(Slot::Ring1, rings.clone(), &job)
            .with(Slot::Ring2, rings, &job);
        let ranked = fixture
            .run("fast_cast", &pools, &OptimizerConfig::default(), None)
            .unwrap();
        let signatures: HashSet<_> = ranked.iter().map(|r| r.gear.signature()).collect();
        assert_eq!(signatures.len(), ranked.len());
    }

    #[test]
    fn test_sub_weapon_dropped_without_dual_wield() {
        let job = JobProfile::new(Job::War);
        let dagger: Equipped = Item::new(5, "Dagger", EquipSlot::Main)
            .with_weapon(WeaponInfo::new(100.0, 186.0, SkillType::Dagger))
            .into();
        let pools = SlotPools::new().with(Slot::Sub, vec![dagger], &job);
        assert!(pools.candidates(Slot::Sub).is_empty());
    }

    #[test]
    fn test_required_slot_without_candidates_empties_beam() {
        let job = JobProfile::new(Job::War);
        let fixture = Fixture::new(job);
        let mut pools = SlotPools::new();
        pools.require(Slot::Main);
        let ranked = fixture
            .run("damage_taken", &pools, &OptimizerConfig::default(), None)
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_cancelled_before_first_slot() {
        let job = JobProfile::new(Job::War);
        let fixture = Fixture::new(job);
        let token = CancelToken::new();
        token.cancel();
        let result = fixture.run(
            "damage_taken",
            &SlotPools::new(),
            &OptimizerConfig::default(),
            Some(&token),
        );
        assert_eq!(result.unwrap_err(), GearError::Cancelled(Slot::Main));
    }

    fn dt_piece(id: ItemId, slot: EquipSlot, pdt: f64, mdt: f64) -> Equipped {
        Item::new(id, format!("Piece {}", id), slot)
            .with_stats(
                StatBag::new()
                    .with(Stat::PhysicalDamageTaken, pdt)
                    .with(Stat::MagicalDamageTaken, mdt),
            )
            .into()
    }

    /// Both damage taken channels cap at -50, so greedy prefixes matter.
    fn capped_pools(job: &JobProfile) -> SlotPools {
        SlotPools::new()
            .with(
                Slot::Head,
                vec![
                    dt_piece(1, EquipSlot::Head, -10.0, -45.0),
                    dt_piece(2, EquipSlot::Head, -50.0, 0.0),
                ],
                job,
            )
            .with(
                Slot::Body,
                vec![
                    dt_piece(3, EquipSlot::Body, 0.0, -40.0),
                    dt_piece(4, EquipSlot::Body, 0.0, -39.0),
                    dt_piece(5, EquipSlot::Body, -8.0, 0.0),
                ],
                job,
            )
            .with(Slot::Legs, vec![dt_piece(6, EquipSlot::Legs, -40.0, 0.0)], job)
    }

    #[test]
    fn test_wider_beam_keeps_narrow_lineage() {
        let job = JobProfile::new(Job::Pld);
        let fixture = Fixture::new(job.clone());
        let pools = capped_pools(&job);
        let best = |width: usize| {
            let config = OptimizerConfig::default().with_beam_width(width);
            fixture.run("damage_taken", &pools, &config, None).unwrap()[0].score
        };
        assert_eq!(best(1), 95.0);
        assert_eq!(best(2), 95.0);
        for width in 2..=8 {
            assert!(best(width) >= best(width - 1), "width {} regressed", width);
        }
        assert_eq!(best(20), 100.0);
    }

    #[test]
    fn test_narrow_beam_is_prefix_of_wide() {
        let job = JobProfile::new(Job::Pld);
        let fixture = Fixture::new(job.clone());
        let pools = capped_pools(&job);
        let objective = fixture.registry.get(&ProfileId::from("damage_taken")).unwrap();
        let evaluator = Evaluator::new(
            Aggregator::new(&fixture.paths, &fixture.levels),
            Simulator::new(&fixture.rules, &fixture.plan),
            objective,
            &fixture.context,
        );
        let narrow_config = OptimizerConfig::default().with_beam_width(2);
        let wide_config = OptimizerConfig::default().with_beam_width(5);
        let narrow = BeamSearch::new(&evaluator, &pools, &narrow_config, None);
        let wide = BeamSearch::new(&evaluator, &pools, &wide_config, None);

        let seed = evaluator.partial(GearSet::new(), StatBag::new()).unwrap();
        let mut narrow_state = SearchState {
            beam: vec![seed.clone()],
            filled: 0,
        };
        let mut wide_state = SearchState {
            beam: vec![seed],
            filled: 0,
        };
        for slot in Slot::ALL {
            narrow_state = narrow.step(narrow_state, slot).unwrap();
            wide_state = wide.step(wide_state, slot).unwrap();
            let signatures = |state: &SearchState| -> Vec<_> {
                state.beam.iter().map(|e| e.gear.signature()).collect()
            };
            let narrow_sigs = signatures(&narrow_state);
            let wide_sigs = signatures(&wide_state);
            assert_eq!(narrow_sigs[..], wide_sigs[..narrow_sigs.len()], "diverged at {}", slot);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let job = JobProfile::new(Job::Rdm);
        let fixture = Fixture::new(job.clone());
        let rings: Vec<Equipped> = (1..8).map(|id| ring(id, f64::from(id % 4))).collect();
        let pools = SlotPools::new()
            .with(Slot::Ring1, rings.clone(), &job)
            .with(Slot::Ring2, rings, &job);
        let config = OptimizerConfig::default().with_beam_width(3);
        let parallel = fixture.run("fast_cast", &pools, &config, None).unwrap();
        let sequential = fixture
            .run("fast_cast", &pools, &config.clone().with_parallel(false), None)
            .unwrap();
        let ids = |ranked: &[RankedGearSet]| -> Vec<_> {
            ranked.iter().map(|r| r.gear.signature()).collect()
        };
        assert_eq!(ids(&parallel), ids(&sequential));
    }
}
