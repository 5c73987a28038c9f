//! Combat simulation.
//!
//! Converts an aggregated stat bag for one gear set into
//! [`ScenarioMetrics`]: hit rates, TP gain, time to weaponskill, weaponskill
//! and spell damage, mitigation and utility figures, plus the active
//! profile's score and cap flags. Everything is an expected value; nothing
//! is sampled, so identical inputs always produce identical metrics.

pub mod hit;
pub mod magic;
pub mod mitigation;
pub mod tp;
pub mod utility;
pub mod weaponskill;

use crate::bag::StatBag;
use crate::context::ScenarioContext;
use crate::derive::{DeriveInput, DerivationPlan, Derived, DerivedStats};
use crate::error::GearError;
use crate::gear::GearSet;
use crate::item::{Element, SkillType};
use crate::objective::{CapStatus, Objective, ProfileId};
use crate::rules::CombatRules;
use crate::stat::Stat;
use serde::{Deserialize, Serialize};

use hit::{AccuracyBreakdown, HandAccuracy};
use magic::MagicMetrics;
use mitigation::MitigationMetrics;
use tp::{TpMetrics, Weapons};
use utility::{HealingMetrics, UtilityMetrics};
use weaponskill::{WeaponskillInput, WeaponskillMetrics};

/// A capped quantity: the summed value, the value that applies, and
/// whether the cap was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capped {
    pub raw: f64,
    pub effective: f64,
    pub capped: bool,
}

/// How much of the simulation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimDepth {
    /// Partial gear sets during search: time to weaponskill uses the closed form.
    Partial,
    /// Complete gear sets: time to weaponskill uses the exact expectation.
    Full,
}

/// Everything the simulation reports for one gear set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub profile: ProfileId,
    pub score: f64,
    pub caps: Vec<CapStatus>,
    pub depth: SimDepth,
    pub derived: DerivedStats,
    pub accuracy: AccuracyBreakdown,
    pub tp: Option<TpMetrics>,
    /// Seconds to reach the TP threshold; `None` without a weapon or when
    /// the threshold is unreachable.
    pub time_to_ws: Option<f64>,
    pub weaponskill: Option<WeaponskillMetrics>,
    pub magic: Option<MagicMetrics>,
    pub mitigation: MitigationMetrics,
    pub utility: UtilityMetrics,
    pub healing: HealingMetrics,
}

/// Runs derivation rules and scenario formulas against the rules table.
#[derive(Debug, Clone, Copy)]
pub struct Simulator<'a> {
    rules: &'a CombatRules,
    plan: &'a DerivationPlan,
}

impl<'a> Simulator<'a> {
    pub fn new(rules: &'a CombatRules, plan: &'a DerivationPlan) -> Self {
        Self { rules, plan }
    }

    /// Simulate one gear set whose aggregated stats are `stats`.
    ///
    /// Fails only when a weaponskill is requested and the main weapon has
    /// no skill type to check it against.
    pub fn simulate(
        &self,
        context: &ScenarioContext,
        gear: &GearSet,
        stats: &StatBag,
        objective: &Objective,
        depth: SimDepth,
    ) -> Result<ScenarioMetrics, GearError> {
        let rules = self.rules;
        let params = &context.params;
        let target = &context.target;

        let main = gear.main_weapon();
        let sub = if context.job.dual_wield {
            gear.sub_weapon()
        } else {
            None
        };
        let ranged = gear.ranged_weapon();

        if let (Some(spec), Some(weapon)) = (&params.weaponskill, main) {
            if weapon.skill.is_none() {
                return Err(GearError::MissingScenarioData {
                    profile: objective.id.clone(),
                    reason: format!("main weapon has no skill type for {}", spec.name),
                });
            }
        }

        let derived = self.plan.evaluate(&DeriveInput {
            stats,
            main,
            sub,
            ranged,
            target,
            rules,
            magic_skill: params.magic_skill(),
        });

        let hand = |accuracy: f64| HandAccuracy {
            accuracy,
            hit_rate: hit::hit_rate(rules, accuracy, target.evasion),
        };
        let main_skill = main
            .and_then(|w| w.skill)
            .map(|s| stats.get(s.skill_stat()))
            .unwrap_or(0.0);
        let accuracy = AccuracyBreakdown {
            skill: rules.skill_accuracy(main_skill),
            dex: stats.get(Stat::Dex) * rules.dex_accuracy_ratio,
            flat: stats.get(Stat::Accuracy),
            target_evasion: target.evasion,
            main: hand(derived.get(Derived::MainAccuracy)),
            sub: sub.map(|_| hand(derived.get(Derived::SubAccuracy))),
            ranged: ranged.map(|_| hand(derived.get(Derived::RangedAccuracy))),
        };

        let swings = hit::swing_distribution(
            rules,
            stats.get(Stat::DoubleAttack),
            stats.get(Stat::TripleAttack),
            stats.get(Stat::QuadAttack),
        );
        let round = main.map(|main_weapon| {
            let main_landed = hit::landed_distribution(&swings, accuracy.main.hit_rate);
            let landed = match (sub, &accuracy.sub) {
                (Some(_), Some(sub_hand)) => hit::convolve(
                    &main_landed,
                    &hit::landed_distribution(&swings, sub_hand.hit_rate),
                    rules.max_swings,
                ),
                _ => hit::cap(&main_landed, rules.max_swings),
            };
            let metrics = tp::tp_metrics(
                rules,
                stats,
                Weapons {
                    main: main_weapon,
                    sub,
                },
                &landed,
            );
            (metrics, landed)
        });

        let threshold = params.threshold();
        let time_to_ws = round.as_ref().and_then(|(metrics, landed)| match depth {
            SimDepth::Partial => tp::approximate_time_to_ws(metrics, params.starting_tp, threshold),
            SimDepth::Full => tp::exact_time_to_ws(metrics, landed, params.starting_tp, threshold),
        });

        let weaponskill = match (&params.weaponskill, main) {
            (Some(spec), Some(weapon)) if skill_matches(spec.skill, weapon.skill) => {
                Some(weaponskill::simulate(&WeaponskillInput {
                    spec,
                    weapon,
                    stats,
                    derived: &derived,
                    target,
                    rules,
                    threshold,
                    main_swings: hit::expected(&swings),
                    weather: spec
                        .magical
                        .map(|element| self.weather_factor(context, gear, element))
                        .unwrap_or(1.0),
                }))
            }
            _ => None,
        };

        let magic = params.spell.as_ref().map(|spell| {
            let weather = self.weather_factor(context, gear, spell.element);
            magic::simulate(rules, stats, &derived, target, spell, weather)
        });

        let mut metrics = ScenarioMetrics {
            profile: objective.id.clone(),
            score: 0.0,
            caps: Vec::new(),
            depth,
            derived,
            accuracy,
            tp: round.map(|(metrics, _)| metrics),
            time_to_ws,
            weaponskill,
            magic,
            mitigation: mitigation::simulate(rules, stats),
            utility: utility::simulate(rules, stats),
            healing: utility::healing(rules, stats),
        };
        metrics.score = objective.score_of(&metrics);
        metrics.caps = objective.cap_status(&metrics);
        Ok(metrics)
    }

    /// Expected weather multiplier for an element.
    ///
    /// Certain when an equipped item has affinity with the element,
    /// otherwise it procs at the rules' chance.
    fn weather_factor(&self, context: &ScenarioContext, gear: &GearSet, element: Element) -> f64 {
        if context.params.weather != Some(element) {
            return 1.0;
        }
        let bonus = self.rules.weather_bonus / 100.0;
        let has_affinity = gear
            .iter()
            .any(|(_, equipped)| equipped.item.affinity.contains(&element));
        if has_affinity {
            1.0 + bonus
        } else {
            1.0 + bonus * self.rules.weather_proc_chance
        }
    }
}

fn skill_matches(wanted: Option<SkillType>, held: Option<SkillType>) -> bool {
    match (wanted, held) {
        (Some(wanted), Some(held)) => wanted == held,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffs::BuffConfiguration;
    use crate::context::{ScenarioParams, SpellSpec, WeaponskillSpec};
    use crate::item::{EquipSlot, Item, SkillType, Slot, WeaponInfo};
    use crate::job::{Job, JobProfile};
    use crate::objective::{ProfileId, ProfileRegistry};
    use crate::target::Target;

    fn context(params: ScenarioParams) -> ScenarioContext {
        ScenarioContext::new(
            JobProfile::new(Job::War),
            &Target::new("Dummy", 1).with_evasion(100.0).with_defense(100.0),
            BuffConfiguration::new(),
            params,
            0,
        )
    }

    fn savage_blade(skill: Option<SkillType>) -> WeaponskillSpec {
        WeaponskillSpec {
            name: "Savage Blade".to_string(),
            skill,
            hits: 2,
            ftp: [4.0, 10.25, 13.75],
            ftp_replicating: false,
            modifiers: StatBag::new().with(Stat::Str, 0.5),
            crit: false,
            magical: None,
            base_damage: 0.0,
        }
    }

    fn run(params: ScenarioParams, gear: &GearSet, profile: &str) -> Result<ScenarioMetrics, GearError> {
        let rules = CombatRules::default();
        let plan = DerivationPlan::standard()?;
        let registry = ProfileRegistry::standard();
        let objective = registry.get(&ProfileId::from(profile))?;
        let stats = StatBag::new().with(Stat::Accuracy, 300.0);
        Simulator::new(&rules, &plan).simulate(&context(params), gear, &stats, objective, SimDepth::Full)
    }

    #[test]
    fn test_no_weapon_omits_tp() {
        let metrics = run(ScenarioParams::default(), &GearSet::new(), "damage_taken").unwrap();
        assert!(metrics.tp.is_none());
        assert!(metrics.time_to_ws.is_none());
        assert!(metrics.weaponskill.is_none());
    }

    #[test]
    fn test_unskilled_weapon_with_weaponskill_errors() {
        let club = Item::new(1, "Odd Stick", EquipSlot::Main).with_weapon(WeaponInfo {
            damage: 50.0,
            delay: 200.0,
            skill: None,
        });
        let gear = GearSet::new().with(Slot::Main, club).unwrap();
        let params = ScenarioParams {
            weaponskill: Some(savage_blade(Some(SkillType::Sword))),
            ..ScenarioParams::default()
        };
        assert!(matches!(
            run(params, &gear, "weaponskill"),
            Err(GearError::MissingScenarioData { .. })
        ));
    }

    #[test]
    fn test_skill_mismatch_omits_weaponskill() {
        let dagger = Item::new(1, "Dagger", EquipSlot::Main)
            .with_weapon(WeaponInfo::new(100.0, 186.0, SkillType::Dagger));
        let gear = GearSet::new().with(Slot::Main, dagger).unwrap();
        let params = ScenarioParams {
            weaponskill: Some(savage_blade(Some(SkillType::Sword))),
            ..ScenarioParams::default()
        };
        let metrics = run(params, &gear, "weaponskill").unwrap();
        assert!(metrics.weaponskill.is_none());
        assert!(metrics.tp.is_some());
        assert_eq!(metrics.score, f64::NEG_INFINITY);
    }

    #[test]
    fn test_weather_affinity_is_certain() {
        let staff = Item::new(2, "Thunder Staff", EquipSlot::Main)
            .with_weapon(WeaponInfo::new(80.0, 366.0, SkillType::Staff))
            .with_affinity(Element::Lightning);
        let spell = SpellSpec {
            name: "Thunder".to_string(),
            element: Element::Lightning,
            skill: Stat::ElementalMagicSkill,
            base_damage: 100.0,
            dstat: Stat::Int,
            dstat_multiplier: 1.0,
            magic_burst: false,
            skillchain_steps: 1,
        };
        let params = ScenarioParams {
            spell: Some(spell),
            weather: Some(Element::Lightning),
            ..ScenarioParams::default()
        };
        let with = run(params.clone(), &GearSet::new().with(Slot::Main, staff).unwrap(), "magic").unwrap();
        let without = run(params, &GearSet::new(), "magic").unwrap();
        assert!((with.magic.unwrap().weather_factor - 1.1).abs() < 1e-12);
        assert!((without.magic.unwrap().weather_factor - (1.0 + 0.1 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_partial_and_full_time_to_ws_both_present() {
        let sword = Item::new(3, "Sword", EquipSlot::Main)
            .with_weapon(WeaponInfo::new(150.0, 240.0, SkillType::Sword));
        let gear = GearSet::new().with(Slot::Main, sword).unwrap();
        let rules = CombatRules::default();
        let plan = DerivationPlan::standard().unwrap();
        let registry = ProfileRegistry::standard();
        let objective = registry.get(&ProfileId::from("time_to_ws")).unwrap();
        let simulator = Simulator::new(&rules, &plan);
        let ctx = context(ScenarioParams::default());
        let stats = StatBag::new();
        let partial = simulator
            .simulate(&ctx, &gear, &stats, objective, SimDepth::Partial)
            .unwrap();
        let full = simulator
            .simulate(&ctx, &gear, &stats, objective, SimDepth::Full)
            .unwrap();
        assert!(partial.time_to_ws.is_some());
        assert!(full.time_to_ws.unwrap() >= partial.time_to_ws.unwrap());
    }
}
