#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates, replicates and prints Fantomo fields.

use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use fantomo_core::{Event, FieldConfig};
use fantomo_rendering::{scene, FieldPresenter, TextPresenter};
use fantomo_replication::FieldSnapshot;
use fantomo_system_bootstrap::{Bootstrap, Role};
use fantomo_world::{query, Field};
use tracing::{debug, info};

/// Procedural escape-room field generator.
#[derive(Parser, Debug)]
#[command(name = "fantomo")]
#[command(author, version, about = "Generate a mine, key and spawn field", long_about = None)]
struct Args {
    /// Rooms along each side of the square grid
    #[arg(short = 'w', long)]
    width: Option<u32>,

    /// Number of mines to place
    #[arg(short = 'm', long)]
    mines: Option<u32>,

    /// Number of keys to place
    #[arg(short = 'k', long)]
    keys: Option<u32>,

    /// Number of player spawn points to place
    #[arg(short = 'p', long)]
    spawns: Option<u32>,

    /// Fraction of door slots to close during pruning
    #[arg(short = 'r', long)]
    door_removal_rate: Option<f32>,

    /// World-space edge length of one room
    #[arg(long)]
    room_size: Option<f32>,

    /// Seed for the generator; random when omitted
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Advance one attempt per step interval and log progress
    #[arg(long)]
    stepwise: bool,

    /// Milliseconds between stepwise iterations
    #[arg(long, requires = "stepwise")]
    step_interval_ms: Option<u64>,

    /// Print the replication string after the map
    #[arg(long, conflicts_with = "decode")]
    snapshot: bool,

    /// Accept a replicated field instead of generating one
    #[arg(long, value_name = "STRING")]
    decode: Option<String>,
}

impl Args {
    fn config(&self) -> FieldConfig {
        let defaults = FieldConfig::default();
        FieldConfig {
            width: self.width.unwrap_or(defaults.width),
            mines: self.mines.unwrap_or(defaults.mines),
            keys: self.keys.unwrap_or(defaults.keys),
            spawns: self.spawns.unwrap_or(defaults.spawns),
            door_removal_rate: self.door_removal_rate.unwrap_or(defaults.door_removal_rate),
            room_size: self.room_size.unwrap_or(defaults.room_size),
            step_interval: self
                .step_interval_ms
                .map_or(defaults.step_interval, Duration::from_millis),
            ..defaults
        }
    }
}

/// Entry point for the Fantomo command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args = Args::parse();
    let config = args.config();
    config.validate().context("invalid field configuration")?;
    let seed = args.seed.unwrap_or_else(rand::random);

    let field = match &args.decode {
        Some(encoded) => accept_replicated(config, seed, encoded)?,
        None if args.stepwise => generate_stepwise(config, seed)?,
        None => Bootstrap::new(Role::Owner)
            .acquire(config, seed, None)
            .with_context(|| format!("failed to generate field for seed {seed}"))?,
    };

    let placements = scene(&field, config.room_size);
    let width = query::geometry(&field).width();
    TextPresenter::new(io::stdout().lock()).present(&placements, width)?;

    info!(
        seed,
        keys = query::key_rooms(&field).len(),
        mines = query::mine_rooms(&field).len(),
        spawns = query::spawn_rooms(&field).len(),
        "field ready"
    );

    if args.snapshot {
        let encoded = FieldSnapshot::capture(&field)
            .encode()
            .context("failed to encode field snapshot")?;
        println!("{encoded}");
    }

    Ok(())
}

fn accept_replicated(config: FieldConfig, seed: u64, encoded: &str) -> Result<Field> {
    let replicated = FieldSnapshot::decode(encoded)
        .and_then(FieldSnapshot::into_field)
        .context("rejected replicated field")?;
    let field = Bootstrap::new(Role::Participant).acquire(config, seed, Some(replicated))?;
    Ok(field)
}

fn generate_stepwise(config: FieldConfig, seed: u64) -> Result<Field> {
    let mut generator = Bootstrap::new(Role::Owner)
        .generator(config, seed)?
        .context("owner bootstrap produced no generator")?;

    let mut events = Vec::new();
    while !generator.is_finished() {
        generator
            .step(&mut events)
            .with_context(|| format!("generation failed for seed {seed}"))?;
        for event in events.drain(..) {
            match event {
                Event::PhaseStarted { phase, target } => info!(%phase, target, "phase started"),
                Event::CandidateAccepted { phase, room } => debug!(%phase, room, "accepted"),
                Event::ProgressAdvanced { progress } => info!(
                    progress = format_args!("{:.1}%", progress.get() * 100.0),
                    "progress"
                ),
                Event::PhaseCompleted { phase, attempts } => {
                    info!(%phase, attempts, "phase completed")
                }
                Event::FieldCompleted => info!("field completed"),
            }
        }
        if !generator.is_finished() {
            thread::sleep(config.step_interval);
        }
    }

    Ok(generator.into_field()?)
}
