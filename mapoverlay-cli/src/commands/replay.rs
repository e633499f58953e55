//! Replay command - drive the engine from a JSON-lines script.
//!
//! Each non-blank line is `{"command": "<name>", "payload": <json>}`. Lines
//! starting with `#` are comments. Commands run in order against a
//! [`RecordingSurface`]; afterwards the animation clock is advanced in fixed
//! steps of virtual time and the resulting surface state is printed.

use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::CliError;
use crate::runner::CliRunner;
use mapoverlay::animation::AnimationEvent;
use mapoverlay::dispatch::{CommandDispatcher, CommandResult};
use mapoverlay::engine::OverlayEngine;
use mapoverlay::surface::RecordingSurface;

/// Arguments for the replay command.
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to the JSON-lines command script
    pub script: PathBuf,

    /// Animation frames to run after the script
    #[arg(long, default_value = "0")]
    pub ticks: u32,

    /// Virtual time between animation frames, in milliseconds
    #[arg(long, default_value = "16")]
    pub tick_ms: u64,

    /// Enable debug logging to stdout
    #[arg(long)]
    pub debug: bool,
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptLine {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

/// Parse a script, reporting the 1-based line number of the first bad line.
pub fn parse_script(contents: &str) -> Result<Vec<ScriptLine>, CliError> {
    contents
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_number, line)| {
            serde_json::from_str(line).map_err(|e| CliError::Script {
                line: line_number,
                message: e.to_string(),
            })
        })
        .collect()
}

fn read_script(path: &Path) -> Result<Vec<ScriptLine>, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|error| CliError::ScriptRead {
        path: path.to_path_buf(),
        error,
    })?;
    parse_script(&contents)
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("replay");

    let script = read_script(&args.script)?;
    info!(
        script = %args.script.display(),
        commands = script.len(),
        "Replaying script"
    );

    let engine_config = runner.engine_config();
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;

    runtime.block_on(async move {
        // Icon fetches spawn onto the ambient runtime, so the engine is
        // built inside it.
        let engine = OverlayEngine::new(engine_config, RecordingSurface::new())?;
        let mut dispatcher = CommandDispatcher::new(engine);

        for (index, line) in script.into_iter().enumerate() {
            let result = dispatcher.dispatch(&line.command, line.payload);
            debug!(index, command = %line.command, result = %describe(&result), "Command dispatched");
            println!("{:>4}  {:<28} {}", index + 1, line.command, describe(&result));
        }

        let resolved = dispatcher.engine_mut().wait_icons().await;
        if resolved > 0 {
            println!("Resolved {} pending icons", resolved);
        }

        run_ticks(dispatcher.engine_mut(), args.ticks, args.tick_ms);
        dispatcher.engine_mut().wait_icons().await;

        print_summary(dispatcher.engine());
        Ok::<(), CliError>(())
    })
}

fn run_ticks(engine: &mut OverlayEngine<RecordingSurface>, ticks: u32, tick_ms: u64) {
    if ticks == 0 {
        return;
    }

    let start = Instant::now();
    let step = Duration::from_millis(tick_ms);
    let mut completed = 0usize;

    for frame in 1..=ticks {
        let report = engine.tick(start + step * frame);
        for event in &report.events {
            match event {
                AnimationEvent::Completed { id, effect } => {
                    completed += 1;
                    println!("      frame {:>5}: {:?} finished on {}", frame, effect, id);
                }
                AnimationEvent::Dropped { id, effect } => {
                    println!("      frame {:>5}: {:?} dropped for {}", frame, effect, id);
                }
                AnimationEvent::CycleFinished { .. } => {}
            }
        }
    }

    info!(ticks, tick_ms, completed, "Animation frames replayed");
}

fn describe(result: &CommandResult) -> String {
    match result {
        CommandResult::Done => "ok".to_string(),
        CommandResult::Snapshot(Some(png)) => format!("snapshot ({} bytes)", png.len()),
        CommandResult::Snapshot(None) => "snapshot unavailable".to_string(),
        CommandResult::NotImplemented => "not implemented".to_string(),
    }
}

fn print_summary(engine: &OverlayEngine<RecordingSurface>) {
    let surface = engine.surface();
    let stats = engine.icon_stats();
    let camera = engine.camera();

    println!();
    println!("Surface");
    println!("=======");
    println!("Markers:        {}", surface.marker_count());
    println!("Clusters:       {}", surface.cluster_count());
    println!("Polylines:      {}", surface.polyline_count());
    println!("Tile overlays:  {}", surface.tile_overlay_count());
    println!(
        "Heatmap:        {}",
        if surface.heatmap().is_some() { "yes" } else { "no" }
    );
    println!("Pulse circles:  {}", surface.circle_count());
    println!("Camera zoom:    {:.1}", camera.zoom);
    println!("Animations:     {}", engine.animations().active_tracks());

    println!();
    println!("Icons");
    println!("=====");
    println!(
        "Memory:         {} entries, {} hits / {} misses ({:.1}%)",
        stats.memory_entries,
        stats.memory_hits,
        stats.memory_misses,
        stats.memory_hit_rate() * 100.0
    );
    println!("Disk hits:      {}", stats.disk_hits);
    println!(
        "Fetches:        {} started, {} coalesced, {} failed",
        stats.fetches_started, stats.fetches_coalesced, stats.failures
    );
}
