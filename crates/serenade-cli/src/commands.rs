//! CLI command implementations

use crate::output::{format_json, format_rows};
use crate::sim::{SimInjector, SimPlatform, Trace};
use anyhow::{bail, Context};
use serde::Serialize;
use serenade_core::{
    resolve_with_shape, BackgroundMusic, ControllerOptions, MountPoint, MusicConfig,
    PlaybackRuntime, RegistryStats,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::Tabled;
use tokio::time::sleep;
use tracing::info;

/// Mount point id used by simulations
const SIM_MOUNT: &str = "bg-music";

/// Slack added on top of the computed run time of each mount
const SETTLE: Duration = Duration::from_millis(40);

#[derive(Debug, Serialize, Tabled)]
struct ResolveRow {
    reference: String,
    shape: String,
    canonical_id: String,
}

/// Resolve media references to canonical ids
pub fn resolve(references: &[String], format: &str) -> anyhow::Result<()> {
    let rows: Vec<ResolveRow> = references
        .iter()
        .map(|reference| {
            let resolved = resolve_with_shape(reference);
            ResolveRow {
                reference: reference.clone(),
                shape: resolved
                    .as_ref()
                    .map(|(_, shape)| shape.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                canonical_id: resolved
                    .map(|(id, _)| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    println!(
        "{}",
        format_rows(&rows, format, |row| format!("{} -> {}", row.reference, row.canonical_id))
    );

    let unresolved = rows.iter().filter(|row| row.canonical_id == "-").count();
    if unresolved > 0 {
        bail!("{unresolved} of {} references did not resolve", rows.len());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct Inspection {
    music: MusicConfig,
    canonical_id: Option<String>,
    shape: Option<String>,
    will_auto_start: bool,
    options: ControllerOptions,
}

/// Show what the controller would do with a site configuration
pub fn inspect(site: &Path, options: Option<PathBuf>, format: &str) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(site)
        .with_context(|| format!("reading {}", site.display()))?;
    let music = MusicConfig::from_site_json(&json).context("parsing music settings")?;
    let options = load_options(options.as_deref())?;

    let resolved = resolve_with_shape(&music.media_reference);
    let inspection = Inspection {
        canonical_id: resolved.as_ref().map(|(id, _)| id.to_string()),
        shape: resolved.as_ref().map(|(_, shape)| shape.to_string()),
        will_auto_start: music.enabled && resolved.is_some(),
        music,
        options,
    };

    if let Some(json) = format_json(&inspection, format) {
        println!("{json}");
        return Ok(());
    }

    println!("Music settings: {}", site.display());
    println!("  Reference:    {}", display_or_dash(&inspection.music.media_reference));
    println!("  Enabled:      {}", inspection.music.enabled);
    println!("  Loop:         {}", inspection.music.loop_playback);
    println!(
        "  Canonical id: {}",
        inspection.canonical_id.as_deref().unwrap_or("- (does not resolve)")
    );
    if let Some(shape) = &inspection.shape {
        println!("  Shape:        {shape}");
    }
    println!("  Auto-start:   {}", inspection.will_auto_start);
    println!("\nController options:");
    println!("  Script:       {}", inspection.options.script_url);
    println!("  Optimistic:   {}", inspection.options.optimistic_play);
    println!(
        "  Volume:       {}",
        inspection
            .options
            .volume
            .map(|v| v.to_string())
            .unwrap_or_else(|| "platform default".to_string())
    );
    Ok(())
}

/// Parameters of a simulated run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub reference: String,
    pub enabled: bool,
    pub loop_playback: bool,
    pub load_delay: Duration,
    pub track: Duration,
    pub loops: u32,
    pub missing_mount: bool,
    pub remounts: u32,
    pub toggles: u32,
}

#[derive(Debug, Serialize)]
struct SimReport {
    reference: String,
    canonical_id: Option<String>,
    injections: usize,
    sessions: RegistryStats,
    final_state: String,
    ended_events: usize,
    trace: Vec<crate::sim::TraceEntry>,
}

/// Drive the controller against the simulated platform.
///
/// Must run inside a `LocalSet`.
pub async fn simulate(
    scenario: Scenario,
    options: Option<PathBuf>,
    format: &str,
) -> anyhow::Result<()> {
    let options = load_options(options.as_deref())?;
    let trace = Trace::new();

    let platform = SimPlatform::new(scenario.track, trace.clone());
    if !scenario.missing_mount {
        platform.add_mount(SIM_MOUNT);
    }
    let runtime = PlaybackRuntime::new(
        SimInjector::new(scenario.load_delay, trace.clone()),
        platform,
        options,
    );

    let music = BackgroundMusic::new(&runtime, MountPoint::new(SIM_MOUNT));
    let mut rx = music.subscribe();
    let watcher = {
        let trace = trace.clone();
        tokio::task::spawn_local(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                trace.record("state", state.to_string());
            }
        })
    };

    let config = MusicConfig::new(
        scenario.reference.clone(),
        scenario.enabled,
        scenario.loop_playback,
    );

    for round in 0..=scenario.remounts {
        info!(round, "Mounting");
        trace.record("host", "mount");
        music.mount(config.clone());

        let mut budget = mount_run_time(&scenario, round == 0);
        for _ in 0..scenario.toggles {
            sleep(budget / 2).await;
            trace.record("host", "toggle");
            music.toggle_playback();
            budget = SETTLE;
        }
        sleep(budget).await;

        trace.record("host", "unmount");
        music.unmount();
        tokio::task::yield_now().await;
    }

    let final_state = music.state().to_string();
    drop(music);
    tokio::task::yield_now().await;
    watcher.abort();

    let report = SimReport {
        canonical_id: serenade_core::resolve(&scenario.reference).map(|id| id.to_string()),
        reference: scenario.reference,
        injections: runtime.loader().injections(),
        sessions: runtime.registry().stats(),
        final_state,
        ended_events: trace.count("event", "ended"),
        trace: trace.entries(),
    };

    if let Some(json) = format_json(&report, format) {
        println!("{json}");
        return Ok(());
    }

    println!(
        "{}",
        format_rows(&report.trace, format, |entry| {
            format!("{:>6}ms  {:<7} {}", entry.at_ms, entry.source, entry.what)
        })
    );
    println!("\nSimulation summary:");
    println!("  Canonical id:   {}", report.canonical_id.as_deref().unwrap_or("-"));
    println!("  Injections:     {}", report.injections);
    println!(
        "  Sessions:       {} created, {} destroyed, {} live ({} releases)",
        report.sessions.created,
        report.sessions.destroyed,
        report.sessions.live,
        report.sessions.releases
    );
    println!("  Track endings:  {}", report.ended_events);
    println!("  Final state:    {}", report.final_state);

    if report.sessions.live != 0 {
        bail!("a session survived unmount");
    }
    Ok(())
}

/// Time to let one mount play before unmounting
fn mount_run_time(scenario: &Scenario, first: bool) -> Duration {
    let load = if first { scenario.load_delay } else { Duration::ZERO };
    let plays = if scenario.loop_playback {
        scenario.loops.max(1)
    } else {
        1
    };
    // ready + one start delay per play, then half a track into the last one
    load + Duration::from_millis(10)
        + (scenario.track + Duration::from_millis(5)) * plays
        + scenario.track / 2
        + SETTLE
}

fn load_options(path: Option<&Path>) -> anyhow::Result<ControllerOptions> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            ControllerOptions::from_json(&json)
                .with_context(|| format!("invalid controller options in {}", path.display()))
        }
        None => Ok(ControllerOptions::default()),
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}
