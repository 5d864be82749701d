// Headless driver for the terrain world.
// Runs the demo stage at a fixed tick rate and prints a status block once a
// simulated second. Debug keys from a windowed host are replaced by a
// schedule: the pack's flock level cycles every 10 s and the NPC is forced
// into its next mode every 25 s.
//
// Usage: pack_trail [config.toml] [ticks]

use anyhow::Context;
use pack_trail::engine::{SimConfig, Stage};

// ============================================================================
// CONSTANTS
// ============================================================================

const TICKS_PER_SECOND: u64 = 60;
const DEFAULT_TICKS: u64 = 60 * TICKS_PER_SECOND;
const FLOCK_LEVEL_PERIOD: u64 = 10 * TICKS_PER_SECOND;
const MODE_SWITCH_PERIOD: u64 = 25 * TICKS_PER_SECOND;

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => SimConfig::default(),
    };
    let ticks = match args.next() {
        Some(n) => n.parse::<u64>().with_context(|| format!("bad tick count {:?}", n))?,
        None => DEFAULT_TICKS,
    };

    let (mut stage, player, npc, pack) = Stage::demo(config).context("building demo stage")?;
    log::info!("Stage ready: {} ticks to run", ticks);

    let mut turns = 0;
    let mut flocked = 0;
    for _ in 0..ticks {
        let summary = stage.update();
        turns += summary.flock.turns;
        flocked += summary.flock.members_flocked;

        if summary.tick % FLOCK_LEVEL_PERIOD == 0 {
            stage.change_flock_level(pack);
        }
        if summary.tick % MODE_SWITCH_PERIOD == 0 {
            stage.switch_agent_mode(npc);
        }

        if summary.tick % TICKS_PER_SECOND == 0 {
            let mode = stage.agent(npc).map(|a| a.mode());
            let level = stage.pack(pack).map(|p| p.level_value()).unwrap_or(0);
            log::info!(
                "t={}s | npc {:?} tagged {} | player tagged {} | flock {}% turns {} flocked {}",
                summary.tick / TICKS_PER_SECOND,
                mode,
                stage.tagged_count(npc).unwrap_or(0),
                stage.tagged_count(player).unwrap_or(0),
                level,
                turns,
                flocked,
            );
            for (index, text) in stage.info().lines() {
                log::debug!("  [{:2}] {}", index, text);
            }
            turns = 0;
            flocked = 0;
        }
    }

    Ok(())
}
