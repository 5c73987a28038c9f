//! Request facade: the engine, item catalogs and the two entry points.
//!
//! [`Engine`] owns the read-only reference tables (path augments, master
//! levels, combat rules, derivation plan and profile registry) and is shared
//! by reference across requests. [`Engine::optimize`] builds slot pools from
//! an [`ItemCatalog`] and runs the beam search; [`Engine::calculate_stats`]
//! reports one fixed gear set in full detail.

use crate::aggregate::{Aggregator, StatProfile};
use crate::augment::{PathChoice, PathConfigs, PathTable};
use crate::buffs::BuffConfiguration;
use crate::config::OptimizerConfig;
use crate::context::{ScenarioContext, ScenarioParams};
use crate::derive::{DerivationPlan, DerivedStats};
use crate::error::GearError;
use crate::gear::{Equipped, GearSet};
use crate::item::{EquipSlot, Item, ItemId, Slot};
use crate::job::{Job, JobProfile, MasterLevelTable};
use crate::objective::{Objective, ProfileId, ProfileRegistry, ProfileSummary};
use crate::rules::CombatRules;
use crate::search::{BeamSearch, CancelToken, Evaluator, RankedGearSet, SlotPools};
use crate::simulation::{ScenarioMetrics, SimDepth, Simulator};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of candidate items.
///
/// Implementations must return candidates in a stable order; the search
/// breaks score ties by that order.
pub trait ItemCatalog: Send + Sync {
    /// Items `job` can wear in `slot`.
    fn candidates(&self, job: Job, slot: Slot) -> Vec<Arc<Item>>;

    /// Look an item up by id.
    fn item(&self, id: ItemId) -> Option<Arc<Item>>;
}

/// An in-memory catalog, ordered by insertion.
///
/// # Examples
///
/// ```rust
/// use zzgear::{EquipSlot, Item, ItemCatalog, Job, MemoryCatalog, Slot};
///
/// let catalog: MemoryCatalog = vec![
///     Item::new(1, "Moonlight Ring", EquipSlot::Ring),
///     Item::new(2, "Loricate Torque", EquipSlot::Neck),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(catalog.candidates(Job::War, Slot::Ring2).len(), 1);
/// assert!(catalog.item(2).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: Vec<Arc<Item>>,
    by_id: BTreeMap<ItemId, usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, replacing any earlier item with the same id in place.
    pub fn insert(&mut self, item: Item) {
        let item = Arc::new(item);
        match self.by_id.get(&item.id) {
            Some(&index) => self.items[index] = item,
            None => {
                self.by_id.insert(item.id, self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn with(mut self, item: Item) -> Self {
        self.insert(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Item> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut catalog = MemoryCatalog::new();
        for item in iter {
            catalog.insert(item);
        }
        catalog
    }
}

impl ItemCatalog for MemoryCatalog {
    fn candidates(&self, job: Job, slot: Slot) -> Vec<Arc<Item>> {
        self.items
            .iter()
            .filter(|item| item.equippable_by(job) && item.slot.fits(slot))
            .cloned()
            .collect()
    }

    fn item(&self, id: ItemId) -> Option<Arc<Item>> {
        self.by_id.get(&id).map(|&index| Arc::clone(&self.items[index]))
    }
}

/// Where path-augmented candidates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Items as owned; path configs are ignored.
    #[default]
    Inventory,
    /// "Dream set": every path of a path item is offered at its maximum
    /// rank, unless a path config pins the slot's item to one path.
    Unconstrained,
}

/// An optimization request.
///
/// Weapons are fixed by id rather than searched. A profile that needs a
/// weapon fails validation without `main_weapon`; without one, the main slot
/// stays empty. Shields and grips are searched for `sub` unless
/// `sub_weapon` fixes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub job: JobProfile,
    #[serde(default)]
    pub main_weapon: Option<ItemId>,
    #[serde(default)]
    pub sub_weapon: Option<ItemId>,
    pub profile: ProfileId,
    pub target: Target,
    #[serde(default)]
    pub buffs: BuffConfiguration,
    #[serde(default)]
    pub params: ScenarioParams,
    #[serde(default)]
    pub master_level: u8,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub path_configs: PathConfigs,
    #[serde(default)]
    pub config: OptimizerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResponse {
    pub profile: ProfileId,
    pub ranked_gear_sets: Vec<RankedGearSet>,
}

fn default_stats_profile() -> ProfileId {
    ProfileId::from("damage_taken")
}

/// A request to report one fixed gear set.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsRequest {
    pub job: JobProfile,
    pub gear: GearSet,
    #[serde(default)]
    pub buffs: BuffConfiguration,
    pub target: Target,
    #[serde(default)]
    pub master_level: u8,
    #[serde(default)]
    pub params: ScenarioParams,
    /// Profile used to score the set; defaults to `damage_taken`.
    #[serde(default = "default_stats_profile")]
    pub profile: ProfileId,
    #[serde(default)]
    pub path_configs: PathConfigs,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    /// Totals with a per-source breakdown.
    pub stats: StatProfile,
    pub derived: DerivedStats,
    pub metrics: ScenarioMetrics,
}

/// The gear engine.
///
/// # Examples
///
/// ```rust
/// use zzgear::{CombatRules, Engine, MasterLevelTable, PathTable};
///
/// let engine = Engine::new(PathTable::new(), MasterLevelTable::default(), CombatRules::default()).unwrap();
/// assert!(engine.profiles().iter().any(|p| p.id.as_str() == "pure_tp"));
/// ```
#[derive(Debug)]
pub struct Engine {
    paths: PathTable,
    master_levels: MasterLevelTable,
    rules: CombatRules,
    plan: DerivationPlan,
    registry: ProfileRegistry,
}

impl Engine {
    /// Build an engine with the standard derivation rules and profiles.
    pub fn new(
        paths: PathTable,
        master_levels: MasterLevelTable,
        rules: CombatRules,
    ) -> Result<Self, GearError> {
        rules.validate()?;
        Ok(Self {
            paths,
            master_levels,
            rules,
            plan: DerivationPlan::standard()?,
            registry: ProfileRegistry::standard(),
        })
    }

    /// Add or replace a scoring profile.
    pub fn register_profile(&mut self, objective: Objective) -> Option<Objective> {
        self.registry.register(objective)
    }

    pub fn profiles(&self) -> Vec<ProfileSummary> {
        self.registry.iter().map(ProfileSummary::from).collect()
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(&self.paths, &self.master_levels)
    }

    pub fn simulator(&self) -> Simulator<'_> {
        Simulator::new(&self.rules, &self.plan)
    }

    /// Aggregate and fully simulate one gear set under a context.
    pub fn simulate(
        &self,
        context: &ScenarioContext,
        gear: &GearSet,
        profile: &ProfileId,
    ) -> Result<ScenarioMetrics, GearError> {
        let objective = self.registry.get(profile)?;
        context.params.validate()?;
        let stats = self
            .aggregator()
            .aggregate(gear, &context.buffs, &context.job, context.master_level);
        self.simulator()
            .simulate(context, gear, &stats.totals, objective, SimDepth::Full)
    }

    /// Search for the best gear sets.
    ///
    /// Validation happens before any search work. Cancellation is observed
    /// at the next slot boundary and reported as [`GearError::Cancelled`].
    pub fn optimize(
        &self,
        catalog: &dyn ItemCatalog,
        request: OptimizeRequest,
        cancel: Option<&CancelToken>,
    ) -> Result<OptimizeResponse, GearError> {
        let objective = self.registry.get(&request.profile)?;
        request.config.validate()?;
        request.params.validate()?;
        check_requirements(objective, &request)?;

        let job = &request.job;
        let mut pools = SlotPools::new();
        self.fix_weapons(catalog, objective, &request, &mut pools)?;
        for slot in Slot::ALL.iter().copied().skip(1) {
            // Shields and grips are searched; a sub weapon only when fixed.
            if slot == Slot::Sub && request.sub_weapon.is_some() {
                continue;
            }
            let candidates = catalog
                .candidates(job.job, slot)
                .into_iter()
                .filter(|item| slot != Slot::Sub || !item.is_weapon())
                .flat_map(|item| self.expand(item, slot, request.mode, &request.path_configs))
                .collect();
            pools.set(slot, candidates, job);
        }

        info!(
            profile = %request.profile,
            job = %job.job,
            beam_width = request.config.beam_width,
            top_k = request.config.top_k,
            candidates = pools.len(),
            "optimize started"
        );

        let context = ScenarioContext::new(
            request.job.clone(),
            &request.target,
            request.buffs,
            request.params,
            request.master_level,
        );
        let evaluator = Evaluator::new(self.aggregator(), self.simulator(), objective, &context);
        let ranked = BeamSearch::new(&evaluator, &pools, &request.config, cancel).run()?;

        info!(
            profile = %request.profile,
            results = ranked.len(),
            best = ranked.first().map(|set| set.score),
            "optimize finished"
        );
        Ok(OptimizeResponse {
            profile: request.profile,
            ranked_gear_sets: ranked,
        })
    }

    /// Report one gear set: totals with breakdown, derived values and metrics.
    pub fn calculate_stats(&self, request: StatsRequest) -> Result<StatsReport, GearError> {
        let objective = self.registry.get(&request.profile)?;
        request.params.validate()?;
        let job = &request.job;
        request.gear.validate(job.job, job.dual_wield)?;

        let mut gear = request.gear;
        gear.bind_paths(&request.path_configs);

        let context = ScenarioContext::new(
            request.job,
            &request.target,
            request.buffs,
            request.params,
            request.master_level,
        );
        let stats = self.aggregator().aggregate_with_breakdown(
            &gear,
            &context.buffs,
            &context.job,
            context.master_level,
        );
        let metrics =
            self.simulator()
                .simulate(&context, &gear, &stats.totals, objective, SimDepth::Full)?;
        debug!(profile = %objective.id, items = gear.len(), "stats calculated");
        Ok(StatsReport {
            stats,
            derived: metrics.derived.clone(),
            metrics,
        })
    }

    /// Resolve the request's weapons into required single-item pools.
    fn fix_weapons(
        &self,
        catalog: &dyn ItemCatalog,
        objective: &Objective,
        request: &OptimizeRequest,
        pools: &mut SlotPools,
    ) -> Result<(), GearError> {
        let job = &request.job;
        let mut main_two_handed = false;
        for (slot, id) in [
            (Slot::Main, request.main_weapon),
            (Slot::Sub, request.sub_weapon),
        ] {
            let Some(id) = id else { continue };
            let item = catalog.item(id).ok_or(GearError::UnknownItem(id))?;
            if !item.equippable_by(job.job) {
                return Err(GearError::JobRestricted {
                    item: item.name.clone(),
                    job: job.job,
                });
            }
            let fits = match slot {
                Slot::Main => item.slot == EquipSlot::Main,
                _ => item.slot.fits(slot),
            };
            if !fits {
                return Err(GearError::SlotMismatch {
                    item: item.name.clone(),
                    slot,
                });
            }
            if slot == Slot::Main {
                check_weaponskill_skill(objective, request, &item)?;
                main_two_handed = item.is_two_handed();
            } else if main_two_handed {
                return Err(GearError::TwoHandedConflict(item.name.clone()));
            } else if item.is_weapon() && !job.dual_wield {
                return Err(GearError::DualWieldRequired(item.name.clone()));
            }
            let candidates = self.expand(item, slot, request.mode, &request.path_configs);
            pools.set(slot, candidates, job);
            pools.require(slot);
        }
        Ok(())
    }

    /// Candidate variants of one item for a slot.
    fn expand(
        &self,
        item: Arc<Item>,
        slot: Slot,
        mode: SearchMode,
        configs: &PathConfigs,
    ) -> Vec<Equipped> {
        if mode == SearchMode::Inventory {
            return vec![Equipped::new(item)];
        }
        if let Some(choice) = configs.choice_for(slot, item.id) {
            return vec![Equipped::new(item).with_path(choice)];
        }
        let Some(spec) = self.paths.spec(item.path_key()) else {
            return vec![Equipped::new(item)];
        };
        let variants: Vec<Equipped> = spec
            .paths()
            .filter_map(|path| {
                spec.max_rank(path).map(|rank| {
                    Equipped::new(Arc::clone(&item)).with_path(PathChoice { path, rank })
                })
            })
            .collect();
        if variants.is_empty() {
            vec![Equipped::new(item)]
        } else {
            variants
        }
    }
}

fn check_requirements(objective: &Objective, request: &OptimizeRequest) -> Result<(), GearError> {
    let missing = |reason: &str| GearError::MissingScenarioData {
        profile: objective.id.clone(),
        reason: reason.to_string(),
    };
    let requires = objective.requires;
    if requires.weapon && request.main_weapon.is_none() {
        return Err(missing("a main weapon is required"));
    }
    if requires.weaponskill && request.params.weaponskill.is_none() {
        return Err(missing("a weaponskill is required"));
    }
    if requires.spell && request.params.spell.is_none() {
        return Err(missing("a spell is required"));
    }
    Ok(())
}

/// A weaponskill profile cannot score a main weapon of another skill.
fn check_weaponskill_skill(
    objective: &Objective,
    request: &OptimizeRequest,
    main: &Item,
) -> Result<(), GearError> {
    if !objective.requires.weaponskill {
        return Ok(());
    }
    let Some(spec) = &request.params.weaponskill else {
        return Ok(());
    };
    let held = main.weapon.as_ref().and_then(|weapon| weapon.skill);
    match (spec.skill, held) {
        (Some(wanted), Some(held)) if wanted != held => Err(GearError::MissingScenarioData {
            profile: objective.id.clone(),
            reason: format!(
                "{} uses {} but {} uses {}",
                spec.name,
                wanted.skill_stat(),
                main.name,
                held.skill_stat()
            ),
        }),
        (_, None) => Err(GearError::MissingScenarioData {
            profile: objective.id.clone(),
            reason: format!("main weapon {} has no skill type for {}", main.name, spec.name),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{AugmentPath, AugmentPathSpec, PathConfig};
    use crate::bag::StatBag;
    use crate::item::{SkillType, WeaponInfo};
    use crate::stat::Stat;

    fn engine(paths: PathTable) -> Engine {
        Engine::new(paths, MasterLevelTable::default(), CombatRules::default()).unwrap()
    }

    fn request(profile: &str) -> OptimizeRequest {
        OptimizeRequest {
            job: JobProfile::new(Job::War),
            main_weapon: None,
            sub_weapon: None,
            profile: ProfileId::from(profile),
            target: Target::new("Dummy", 1),
            buffs: BuffConfiguration::new(),
            params: ScenarioParams::default(),
            master_level: 0,
            mode: SearchMode::Inventory,
            path_configs: PathConfigs::new(),
            config: OptimizerConfig::default(),
        }
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let result = engine(PathTable::new()).optimize(&MemoryCatalog::new(), request("speed"), None);
        assert!(matches!(result, Err(GearError::UnknownProfile(_))));
    }

    #[test]
    fn test_weapon_required_for_tp_profiles() {
        let result = engine(PathTable::new()).optimize(&MemoryCatalog::new(), request("pure_tp"), None);
        assert!(matches!(result, Err(GearError::MissingScenarioData { .. })));
    }

    #[test]
    fn test_unknown_weapon_rejected() {
        let mut req = request("pure_tp");
        req.main_weapon = Some(404);
        let result = engine(PathTable::new()).optimize(&MemoryCatalog::new(), req, None);
        assert_eq!(result.unwrap_err(), GearError::UnknownItem(404));
    }

    #[test]
    fn test_sub_weapon_needs_dual_wield() {
        let catalog: MemoryCatalog = [
            Item::new(1, "Sword", EquipSlot::Main)
                .with_weapon(WeaponInfo::new(150.0, 240.0, SkillType::Sword)),
            Item::new(2, "Dagger", EquipSlot::Main)
                .with_weapon(WeaponInfo::new(100.0, 186.0, SkillType::Dagger)),
        ]
        .into_iter()
        .collect();
        let mut req = request("pure_tp");
        req.main_weapon = Some(1);
        req.sub_weapon = Some(2);
        let result = engine(PathTable::new()).optimize(&catalog, req, None);
        assert!(matches!(result, Err(GearError::DualWieldRequired(_))));
    }

    #[test]
    fn test_unconstrained_expands_paths() {
        let mut paths = PathTable::new();
        paths.insert(
            7,
            AugmentPathSpec::new()
                .with_tier(AugmentPath::A, 15, StatBag::new().with(Stat::FastCast, 5.0))
                .with_tier(AugmentPath::B, 15, StatBag::new().with(Stat::FastCast, 3.0)),
        );
        let engine = engine(paths);
        let item = Arc::new(Item::new(7, "Cape", EquipSlot::Back));

        let variants = engine.expand(Arc::clone(&item), Slot::Back, SearchMode::Unconstrained, &PathConfigs::new());
        assert_eq!(variants.len(), 2);

        let mut configs = PathConfigs::new();
        configs.set(
            Slot::Back,
            PathConfig {
                item_id: 7,
                path: AugmentPath::B,
                rank: 15,
            },
        );
        let pinned = engine.expand(Arc::clone(&item), Slot::Back, SearchMode::Unconstrained, &configs);
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].path.unwrap().path, AugmentPath::B);

        let owned = engine.expand(item, Slot::Back, SearchMode::Inventory, &configs);
        assert!(owned[0].path.is_none());
    }

    #[test]
    fn test_catalog_insert_replaces_in_place() {
        let catalog = MemoryCatalog::new()
            .with(Item::new(1, "Old", EquipSlot::Head))
            .with(Item::new(2, "Other", EquipSlot::Head))
            .with(Item::new(1, "New", EquipSlot::Head));
        let heads = catalog.candidates(Job::War, Slot::Head);
        assert_eq!(heads.len(), 2);
        assert_eq!(heads[0].name, "New");
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
