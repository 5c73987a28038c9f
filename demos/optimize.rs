//! Optimize example: search a small inventory for a Store TP set
//!
//! This example demonstrates:
//! - Filling an in-memory item catalog
//! - Running a beam search for the `time_to_ws` profile
//! - Reporting one gear set with a per-source stat breakdown

use zzgear::*;

fn catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with(
            Item::new(1, "Naegling", EquipSlot::Main)
                .with_weapon(WeaponInfo::new(166.0, 240.0, SkillType::Sword)),
        )
        .with(
            Item::new(2, "Blurred Shield", EquipSlot::Sub)
                .with_stats(StatBag::new().with(Stat::DamageTaken, -3.0)),
        )
        .with(
            Item::new(3, "Adhemar Bonnet", EquipSlot::Head)
                .with_stats(StatBag::new().with(Stat::StoreTp, 6.0).with(Stat::Dex, 33.0)),
        )
        .with(
            Item::new(4, "Sakpata's Helm", EquipSlot::Head)
                .with_stats(StatBag::new().with(Stat::DoubleAttack, 5.0).with(Stat::DamageTaken, -7.0)),
        )
        .with(
            Item::new(5, "Tatenashi Haramaki", EquipSlot::Body)
                .with_stats(StatBag::new().with(Stat::StoreTp, 10.0).with(Stat::Haste, 4.0)),
        )
        .with(
            Item::new(6, "Sherida Earring", EquipSlot::Ear)
                .with_stats(StatBag::new().with(Stat::StoreTp, 5.0)),
        )
        .with(
            Item::new(7, "Dedition Earring", EquipSlot::Ear)
                .with_stats(StatBag::new().with(Stat::StoreTp, 8.0).with(Stat::Accuracy, -10.0)),
        )
        .with(
            Item::new(8, "Chirich Ring", EquipSlot::Ring)
                .with_stats(StatBag::new().with(Stat::StoreTp, 6.0).with(Stat::Accuracy, 10.0)),
        )
}

fn main() -> Result<(), GearError> {
    let engine = Engine::new(PathTable::new(), MasterLevelTable::default(), CombatRules::default())?;
    let catalog = catalog();

    let job = JobProfile::new(Job::War)
        .with_base(StatBag::new().with(Stat::Dex, 100.0).with(Stat::SwordSkill, 420.0))
        .with_traits(StatBag::new().with(Stat::DoubleAttack, 18.0));
    let buffs = BuffConfiguration::new().with(ActiveBuff::Song(BuffEffect::new(
        "Honor March",
        StatBag::new().with(Stat::MagicHaste, 16.0).with(Stat::Accuracy, 50.0),
    )))?;
    let target = Target::new("Apex Toad", 135).with_evasion(1100.0);

    let request = OptimizeRequest {
        job: job.clone(),
        main_weapon: Some(1),
        sub_weapon: None,
        profile: ProfileId::from("time_to_ws"),
        target: target.clone(),
        buffs: buffs.clone(),
        params: ScenarioParams::default(),
        master_level: 0,
        mode: SearchMode::Inventory,
        path_configs: PathConfigs::new(),
        config: OptimizerConfig::default().with_beam_width(20).with_top_k(3),
    };

    println!("Searching {} items for {}...", catalog.len(), request.profile);
    let response = engine.optimize(&catalog, request, None)?;

    for set in &response.ranked_gear_sets {
        let seconds = set
            .metrics
            .time_to_ws
            .map(|t| format!("{:.2}s", t))
            .unwrap_or_else(|| "never".to_string());
        println!("\n=== Rank {} (time to WS {}) ===", set.rank, seconds);
        for (slot, equipped) in set.gear.iter() {
            println!("  {:>6}: {}", slot, equipped.item.name);
        }
        if let Some(tp) = &set.metrics.tp {
            println!(
                "  TP/hit {:.0}, TP/round {:.1}, round {:.2}s, hit rate {:.1}%",
                tp.tp_per_hit,
                tp.tp_per_round,
                tp.round_seconds,
                set.metrics.accuracy.main.hit_rate * 100.0
            );
        }
    }

    let Some(best) = response.ranked_gear_sets.first() else {
        println!("\nNo gear set fits this job.");
        return Ok(());
    };

    let report = engine.calculate_stats(StatsRequest {
        job,
        gear: best.gear.clone(),
        buffs,
        target,
        master_level: 0,
        params: ScenarioParams::default(),
        profile: ProfileId::from("time_to_ws"),
        path_configs: PathConfigs::new(),
    })?;

    println!("\nStore TP breakdown of the best set:");
    for contribution in report.stats.breakdown.iter().flatten() {
        let store_tp = contribution.stats.get(Stat::StoreTp);
        if store_tp != 0.0 {
            println!("  {}: {:+}", contribution.source, store_tp);
        }
    }
    println!("  total: {}", report.stats.totals.get(Stat::StoreTp));

    Ok(())
}
