//! Headless replay driver
//!
//! Runs a scripted encounter through the full decision loop, rebuilds
//! the learning tables from the recorded history, and prints the
//! metrics snapshot as JSON.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tactician::catalog::{load_build, LoadedBuild};
use tactician::core::{EngineConfig, Result};
use tactician::engine::{CombatEngine, InstantAckSink, Target};
use tactician::history::{HistoryStore, MemoryHistoryStore, SessionResult};
use tactician::learning::{
    rebuild_tables, BatchLearner, EffectivenessLearner, RecommendationService,
    TacticalInsightMiner,
};
use tactician::perception::{PerceptionFrame, PerceptionSource, ReplaySource};

#[derive(Parser, Debug)]
#[command(name = "replay_sim")]
#[command(about = "Replay a scripted encounter through the combat engine")]
struct Args {
    /// Directory holding catalog.toml, weapon_classes.toml, profiles/
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Build identifier (profiles/<build>.toml)
    #[arg(long, default_value = "medic")]
    build: String,

    /// Enemy classification for the scripted encounter
    #[arg(long, default_value = "stormtrooper")]
    enemy: String,

    /// Optional JSON perception trace; a synthetic one is generated
    /// when omitted
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Number of scripted encounters to run
    #[arg(long, default_value_t = 5)]
    encounters: u32,

    /// Random seed for deterministic runs
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Synthetic trace: target appears, health grinds down, we take fire
fn synthetic_trace(ticks: u32) -> ReplaySource {
    let frames = (0..ticks).map(|i| PerceptionFrame {
        target_present: true,
        target_health_percent: Some((100.0 - i as f32 * 2.0).max(0.0)),
        self_health_percent: (100.0 - i as f32 * 1.2).max(10.0),
        cast_busy: false,
        perception_age_ms: 40,
    });
    ReplaySource::new(frames)
}

fn run_encounter(
    engine: &mut CombatEngine,
    mut source: impl PerceptionSource,
    enemy: &str,
    store: &mut dyn HistoryStore,
) {
    let mut session = engine.start_session(enemy);
    let mut sink = InstantAckSink;
    let mut target_health = 100.0f32;

    while let Some(frame) = source.next_frame() {
        let targets = vec![Target {
            id: tactician::core::TargetId::new(),
            health_percent: target_health,
            distance_meters: 12.0,
            threat_level: 4.0,
            classification: enemy.to_string(),
        }];

        let report = engine.tick(&frame, &targets, &mut session, &mut sink, store);
        if let Some(event) = report.executed {
            target_health = (target_health - event.damage_dealt / 10.0).max(0.0);
        }
        if target_health <= 0.0 {
            break;
        }
    }

    let result = if target_health <= 0.0 {
        SessionResult::Victory
    } else {
        SessionResult::Defeat
    };
    engine.end_session(session, result, store);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        deterministic_damage: true,
        ..Default::default()
    };

    let LoadedBuild {
        catalog,
        profile,
        weapon_classes,
    } = load_build(&args.data_dir, &args.build)?;

    let service = Arc::new(RecommendationService::new());
    let mut engine = CombatEngine::new(
        catalog.clone(),
        profile,
        config.clone(),
        service.clone(),
        args.seed,
    )?;

    let mut store = MemoryHistoryStore::new();
    for _ in 0..args.encounters {
        let source: ReplaySource = match &args.trace {
            Some(path) => ReplaySource::from_json_file(path)?,
            None => synthetic_trace(240),
        };
        run_encounter(&mut engine, source, &args.enemy, &mut store);
    }

    // Offline batch path, run inline at the end of the replay
    let learner = BatchLearner::new(
        EffectivenessLearner::new(weapon_classes, &config),
        TacticalInsightMiner::new(&config),
    );
    let tables = rebuild_tables(&learner, store.sessions(), &catalog);
    let snapshot = tactician::metrics::snapshot(store.sessions(), &tables);
    service.publish(tables);

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
