//! # zzgear - Deterministic Gear-Set Search and Combat Simulation
//!
//! A gear optimizer for MMORPG characters that provides:
//! - **Stat aggregation** of items, path augments, buffs, traits, gifts and
//!   master levels into one additive stat bag
//! - **Combat simulation** turning a stat bag into expected-value metrics
//!   (hit rate, TP per second, time to weaponskill, weaponskill and spell
//!   damage, damage taken, fast cast, healing)
//! - **Pluggable objectives** selected by profile id
//! - **Beam search** over per-slot candidate pools, deterministic and
//!   parallel
//!
//! ## Core Concepts
//!
//! ### Pipeline
//!
//! ```text
//! [GearSet + buffs + job] → Aggregator → [StatBag] → Simulator → [ScenarioMetrics] → Objective → score
//! ```
//!
//! 1. **Aggregation** sums every contribution in a fixed order
//! 2. **Derivation** computes accuracy, attack, crit rate and magic accuracy
//!    from dependency-ordered rules
//! 3. **Simulation** applies the [`CombatRules`] table to produce metrics
//! 4. **Objectives** score the metrics; higher is always better
//!
//! The [`Engine`] wraps all of this behind two entry points,
//! [`Engine::optimize`] and [`Engine::calculate_stats`].
//!
//! ## Example
//!
//! ```rust
//! use zzgear::*;
//!
//! let engine = Engine::new(PathTable::new(), MasterLevelTable::default(), CombatRules::default()).unwrap();
//!
//! let catalog: MemoryCatalog = vec![
//!     Item::new(1, "Sakpata's Helm", EquipSlot::Head)
//!         .with_stats(StatBag::new().with(Stat::DamageTaken, -7.0)),
//!     Item::new(2, "Nyame Helm", EquipSlot::Head)
//!         .with_stats(StatBag::new().with(Stat::DamageTaken, -7.0).with(Stat::Hp, 91.0)),
//!     Item::new(3, "Defending Ring", EquipSlot::Ring)
//!         .with_stats(StatBag::new().with(Stat::DamageTaken, -10.0))
//!         .rare(),
//! ]
//! .into_iter()
//! .collect();
//!
//! let request = OptimizeRequest {
//!     job: JobProfile::new(Job::Pld),
//!     main_weapon: None,
//!     sub_weapon: None,
//!     profile: ProfileId::from("damage_taken"),
//!     target: Target::new("Apex Bat", 129),
//!     buffs: BuffConfiguration::new(),
//!     params: ScenarioParams::default(),
//!     master_level: 0,
//!     mode: SearchMode::Inventory,
//!     path_configs: PathConfigs::new(),
//!     config: OptimizerConfig::default(),
//! };
//!
//! let response = engine.optimize(&catalog, request, None).unwrap();
//! let best = &response.ranked_gear_sets[0];
//! assert_eq!(best.gear.item(Slot::Head).unwrap().name, "Nyame Helm");
//! assert_eq!(best.metrics.mitigation.physical.effective, -17.0);
//! assert!(best.metrics.time_to_ws.is_none());
//! ```
//!
//! ## Modules
//!
//! - [`stat`], [`bag`] - Stat identifiers and stat bags
//! - [`item`], [`job`], [`gear`], [`buffs`], [`target`] - Data model
//! - [`augment`] - Path augment tables
//! - [`aggregate`] - Stat aggregation
//! - [`rules`], [`derive`], [`graph`] - Formula constants and derived values
//! - [`simulation`] - Combat simulation
//! - [`objective`] - Scoring profiles
//! - [`search`], [`config`] - Beam search
//! - [`api`], [`context`] - Requests and the engine
//! - [`error`] - Error types

pub mod aggregate;
pub mod api;
pub mod augment;
pub mod bag;
pub mod buffs;
pub mod config;
pub mod context;
pub mod derive;
pub mod error;
pub mod gear;
pub mod graph;
pub mod item;
pub mod job;
pub mod objective;
pub mod rules;
pub mod search;
pub mod simulation;
pub mod stat;
pub mod target;

pub use aggregate::{Aggregator, Contribution, StatProfile};
pub use api::{
    Engine, ItemCatalog, MemoryCatalog, OptimizeRequest, OptimizeResponse, SearchMode,
    StatsReport, StatsRequest,
};
pub use augment::{AugmentPath, AugmentPathSpec, PathChoice, PathConfig, PathConfigs, PathTable};
pub use bag::StatBag;
pub use buffs::{ActiveBuff, BuffCategory, BuffConfiguration, BuffEffect};
pub use config::OptimizerConfig;
pub use context::{ScenarioContext, ScenarioParams, SpellSpec, WeaponskillSpec};
pub use error::GearError;
pub use gear::{Equipped, GearSet};
pub use item::{Element, EquipSlot, Item, ItemId, SkillType, Slot, WeaponInfo};
pub use job::{Job, JobProfile, JobSet, MasterLevelTable};
pub use objective::{Metric, Objective, ProfileId, ProfileRegistry, ProfileSummary};
pub use rules::CombatRules;
pub use search::{CancelToken, RankedGearSet};
pub use simulation::{ScenarioMetrics, SimDepth, Simulator};
pub use stat::{Stat, StatKey};
pub use target::Target;
