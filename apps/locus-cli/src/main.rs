mod config;
mod demo;

use anyhow::Context;
use clap::{Parser, Subcommand};
use locus_atmos::AtmosphereSystem;
use locus_common::{Direction, EntityId, Position};
use locus_kernel::{World, WorldCommand};
use locus_persist::{SnapshotStore, WorldSnapshot, encode_json};
use locus_tools::{WorldInspector, render_atmosphere, render_level, render_visibility};
use locus_vision::LineOfSight;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::SimulationConfig;

#[derive(Parser)]
#[command(name = "locus", about = "Tile world simulation: demo station, visibility and snapshots")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML simulation config; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and a summary of the demo station
    Info,
    /// Run the demo station and print its maps afterwards
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "40")]
        ticks: u64,
        /// Pace ticks in real time at the configured tick rate
        #[arg(long)]
        realtime: bool,
        /// Override the configured tick rate
        #[arg(long)]
        tick_rate: Option<u32>,
    },
    /// Print what a viewer standing at (x, y) can see
    Los {
        x: i32,
        y: i32,
        /// Manhattan view range
        #[arg(short, long, default_value = "6")]
        range: i32,
        /// Treat an opaque target cell as hidden
        #[arg(long)]
        target_blocks: bool,
    },
    /// Run the demo, store a snapshot and verify it restores identically
    Snapshot {
        /// Store directory
        dir: PathBuf,
        /// Ticks to run before capturing
        #[arg(short, long, default_value = "20")]
        ticks: u64,
        /// Also write the snapshot as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = SimulationConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("locus v{}", env!("CARGO_PKG_VERSION"));
            let (world, _) = demo::build(&config)?;
            println!("{}", WorldInspector::summary(&world));
            for map in WorldInspector::maps(&world) {
                println!("  {map}");
            }
        }
        Commands::Run {
            ticks,
            realtime,
            tick_rate,
        } => {
            if let Some(rate) = tick_rate {
                config.world.tick_rate = rate;
            }
            let (mut world, station) = demo::build(&config)?;

            // Moves are submitted from another thread and applied on the
            // first tick.
            let sender = world.command_sender();
            let person = station.person;
            std::thread::spawn(move || {
                for _ in 0..3 {
                    sender.send(WorldCommand::Move {
                        id: person,
                        dir: Direction::East,
                    });
                }
                sender.send(WorldCommand::ModifyHealth {
                    id: person,
                    delta: -15,
                });
            })
            .join()
            .map_err(|_| anyhow::anyhow!("command thread panicked"))?;

            if realtime {
                let summary = world.run(Some(ticks));
                println!(
                    "Ran {} ticks: average {:?}, max {:?}, overruns {}",
                    summary.ticks, summary.average_tick, summary.max_tick, summary.overruns
                );
            } else {
                run_fast(&mut world, ticks);
            }
            print_world(&world, station.person);
        }
        Commands::Los {
            x,
            y,
            range,
            target_blocks,
        } => {
            let (world, _) = demo::build(&config)?;
            let grid = world.active_map().context("no active map")?;
            let center = Position::new(x, y, 0);
            anyhow::ensure!(grid.valid(center), "{center} is outside map '{}'", grid.name());
            let los = LineOfSight::from_config(&config.vision)
                .with_target_blocks(target_blocks || config.vision.target_blocks);
            let visible = los.visible_cells(center, range, grid);
            println!("Visible from {center} within {range}: {} cells", visible.len());
            println!("{}", render_visibility(grid, &los, center, range));
        }
        Commands::Snapshot { dir, ticks, json } => {
            let (mut world, _) = demo::build(&config)?;
            run_fast(&mut world, ticks);

            let snap = WorldSnapshot::capture(&world);
            let digest = snap.digest()?;
            let mut store = SnapshotStore::open(&dir)
                .with_context(|| format!("opening store {}", dir.display()))?;
            let index = store.save(&snap)?;
            store.append_events(&world.drain_events())?;
            println!(
                "Snapshot {index}: tick={} maps={} entities={} sha256={digest}",
                snap.tick,
                snap.maps.len(),
                snap.entities.len()
            );

            if let Some(path) = json {
                std::fs::write(&path, encode_json(&snap)?)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("JSON written to {}", path.display());
            }

            store.verify_integrity()?;
            let restored = store.load_latest()?.restore(demo::factory())?;
            let round_trip = WorldSnapshot::capture(&restored).digest()?;
            println!(
                "Restore: tick={} entities={} match={}",
                restored.tick_count(),
                restored.entity_count(),
                if round_trip == digest { "OK" } else { "MISMATCH" }
            );
            anyhow::ensure!(round_trip == digest, "restored world differs from the snapshot");
        }
    }

    Ok(())
}

/// Tick without pacing, using the configured tick rate for `dt`.
fn run_fast(world: &mut World, ticks: u64) {
    let dt = 1.0 / f64::from(world.tick_rate());
    world.start();
    for _ in 0..ticks {
        world.tick(dt);
    }
    world.stop();
}

fn print_world(world: &World, person: EntityId) {
    println!("{}", WorldInspector::summary(world));
    for map in WorldInspector::maps(world) {
        println!("  {map}");
    }
    if let Some(info) = WorldInspector::inspect_entity(world, person) {
        println!("  {info}");
    }
    let Some(grid) = world.active_map() else {
        return;
    };
    println!("\n{}", render_level(grid, 0));
    if let Some(system) = world.system::<AtmosphereSystem>() {
        let atmos = system.atmosphere();
        println!(
            "\nAtmosphere: {} tiles, {} burning, {} smoky",
            atmos.len(),
            atmos.fire_positions().len(),
            atmos.smoky_positions().len()
        );
        println!("{}", render_atmosphere(grid, atmos, 0));
    }
}
