use fantomo_core::{
    ConfigError, Direction, Event, FieldConfig, GenerationError, GridGeometry, Item, Phase,
    RoomFlags,
};
use fantomo_system_generator::{generate_field, FieldGenerator};
use fantomo_world::{
    query,
    reachability::{first_walkable, has_surrounded_mine, one_sided_door, reachable_count},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SEEDS: [u64; 6] = [0, 1, 7, 42, 0x5eed, 0xdead_beef];

fn pruning_config() -> FieldConfig {
    FieldConfig {
        width: 6,
        mines: 5,
        keys: 4,
        spawns: 3,
        door_removal_rate: 0.1,
        ..FieldConfig::default()
    }
}

fn closed_interior_doors(rooms: &[RoomFlags], width: usize) -> usize {
    let geometry = GridGeometry::new(width);
    (0..rooms.len())
        .flat_map(|index| [(index, Direction::South), (index, Direction::East)])
        .filter(|(index, direction)| {
            geometry.neighbor_index(*index, *direction).is_some()
                && !rooms[*index].is_open(*direction)
        })
        .count()
}

fn closed_boundary_bits(rooms: &[RoomFlags], width: usize) -> usize {
    let geometry = GridGeometry::new(width);
    (0..rooms.len())
        .flat_map(|index| Direction::ALL.map(|direction| (index, direction)))
        .filter(|(index, direction)| {
            geometry.neighbor_index(*index, *direction).is_none()
                && !rooms[*index].is_open(*direction)
        })
        .count()
}

#[test]
fn pruning_keeps_every_room_reachable() {
    for seed in SEEDS {
        let mut generator = FieldGenerator::seeded(pruning_config(), seed).expect("valid config");
        let mut events = Vec::new();
        let next = generator.complete_phase(&mut events).expect("pruning succeeds");
        assert_eq!(next, Phase::MinePlacement);

        let rooms = generator.rooms();
        assert_eq!(reachable_count(rooms, 6, 0), 36, "seed {seed} disconnected");
        // floor(36 * 4 * 0.1) = 14
        assert_eq!(
            closed_interior_doors(rooms, 6) + closed_boundary_bits(rooms, 6),
            14,
            "seed {seed}"
        );
        assert_eq!(one_sided_door(rooms, 6), None, "seed {seed}");
        assert!(rooms.iter().all(|room| !room.has_any_item()));
    }
}

#[test]
fn heavy_pruning_also_closes_boundary_doors() {
    let config = FieldConfig {
        door_removal_rate: 0.2,
        ..FieldConfig::default()
    };

    let mut boundary_closed = 0;
    for seed in SEEDS {
        let mut generator = FieldGenerator::seeded(config, seed).expect("valid config");
        let mut events = Vec::new();
        let _ = generator.complete_phase(&mut events).expect("pruning succeeds");

        let rooms = generator.rooms();
        assert_eq!(reachable_count(rooms, 8, 0), 64, "seed {seed} disconnected");
        // floor(64 * 4 * 0.2) = 51, more than the 49 interior doors a spanning tree spares.
        let boundary = closed_boundary_bits(rooms, 8);
        assert_eq!(closed_interior_doors(rooms, 8) + boundary, 51, "seed {seed}");
        assert_eq!(one_sided_door(rooms, 8), None, "seed {seed}");
        boundary_closed += boundary;
    }
    assert!(boundary_closed > 0);

    let mut rng = ChaCha8Rng::seed_from_u64(0x2020);
    let field = generate_field(config, &mut rng).expect("generation succeeds");
    assert_eq!(query::reachable_rooms(&field), 64 - 9);
}

#[test]
fn mine_placement_keeps_walkable_rooms_connected() {
    for seed in SEEDS {
        let mut generator = FieldGenerator::seeded(FieldConfig::default(), seed)
            .expect("default config is valid");
        let mut events = Vec::new();
        let _ = generator.complete_phase(&mut events).expect("pruning succeeds");
        let next = generator.complete_phase(&mut events).expect("mines succeed");
        assert_eq!(next, Phase::KeyPlacement);

        let rooms = generator.rooms();
        let mines = rooms.iter().filter(|room| room.has_mine()).count();
        assert_eq!(mines, 9);

        let start = first_walkable(rooms).expect("walkable room exists");
        assert_eq!(reachable_count(rooms, 8, start), 64 - 9, "seed {seed}");
        assert!(!has_surrounded_mine(rooms, 8), "seed {seed}");
    }
}

#[test]
fn finished_field_holds_disjoint_item_sets() {
    for seed in SEEDS {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let field = generate_field(FieldConfig::default(), &mut rng).expect("generation succeeds");

        for room in query::rooms(&field) {
            assert!(room.item_count() <= 1);
        }
        assert_eq!(query::mine_rooms(&field).len(), 9);
        assert_eq!(query::key_rooms(&field).len(), 9);
        assert_eq!(query::spawn_rooms(&field).len(), 3);
        assert_eq!(query::reachable_rooms(&field), 64 - 9);
    }
}

#[test]
fn items_may_fill_every_room() {
    let config = FieldConfig {
        width: 3,
        mines: 0,
        keys: 5,
        spawns: 4,
        door_removal_rate: 0.0,
        ..FieldConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let field = generate_field(config, &mut rng).expect("generation succeeds");
    assert!(query::rooms(&field).iter().all(|room| room.item_count() == 1));
}

#[test]
fn analysis_of_a_finished_field_is_stable() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let field = generate_field(FieldConfig::default(), &mut rng).expect("generation succeeds");
    let rooms = query::rooms(&field);
    let start = first_walkable(rooms).expect("walkable room exists");

    let first = (reachable_count(rooms, 8, start), has_surrounded_mine(rooms, 8));
    for _ in 0..5 {
        assert_eq!((reachable_count(rooms, 8, start), has_surrounded_mine(rooms, 8)), first);
    }
}

#[test]
fn capacity_overflow_is_rejected_before_generation() {
    let config = FieldConfig {
        width: 4,
        mines: 17,
        keys: 0,
        spawns: 0,
        ..FieldConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert_eq!(
        generate_field(config, &mut rng),
        Err(GenerationError::Config(ConfigError::CapacityExceeded {
            requested: 17,
            capacity: 16,
        }))
    );
}

#[test]
fn unreachable_mine_target_trips_the_guard() {
    // Mining all nine rooms of a 3x3 grid always surrounds the centre mine.
    let config = FieldConfig {
        width: 3,
        mines: 9,
        keys: 0,
        spawns: 0,
        door_removal_rate: 0.0,
        attempt_factor: 1,
        ..FieldConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let result = generate_field(config, &mut rng);
    assert!(
        matches!(
            result,
            Err(GenerationError::Infeasible {
                phase: Phase::MinePlacement,
                ..
            })
        ),
        "unexpected result: {result:?}"
    );
}

#[test]
fn unfinished_generator_publishes_nothing() {
    let mut generator = FieldGenerator::seeded(FieldConfig::default(), 4).expect("valid config");
    let mut events = Vec::new();
    generator.step(&mut events).expect("first step succeeds");
    assert_eq!(
        generator.into_field(),
        Err(GenerationError::Incomplete {
            phase: Phase::DoorPruning,
        })
    );
}

#[test]
fn progress_is_monotonic_and_ends_complete() {
    let mut generator = FieldGenerator::seeded(FieldConfig::default(), 12).expect("valid config");
    let mut events = Vec::new();
    generator.run(&mut events).expect("generation succeeds");

    let progress: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            Event::ProgressAdvanced { progress } => Some(progress.get()),
            _ => None,
        })
        .collect();

    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(progress.last().copied(), Some(1.0));
    assert!(progress.iter().all(|value| (0.0..=1.0).contains(value)));
}

#[test]
fn phases_start_and_complete_in_order() {
    let mut generator = FieldGenerator::seeded(FieldConfig::default(), 30).expect("valid config");
    let mut events = Vec::new();
    generator.run(&mut events).expect("generation succeeds");

    let started: Vec<Phase> = events
        .iter()
        .filter_map(|event| match event {
            Event::PhaseStarted { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect();
    let completed: Vec<Phase> = events
        .iter()
        .filter_map(|event| match event {
            Event::PhaseCompleted { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect();
    let expected = vec![
        Phase::DoorPruning,
        Phase::MinePlacement,
        Phase::KeyPlacement,
        Phase::SpawnPlacement,
    ];

    assert_eq!(started, expected);
    assert_eq!(completed, expected);
    assert_eq!(events.last(), Some(&Event::FieldCompleted));

    let accepted_spawns = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::CandidateAccepted {
                    phase: Phase::SpawnPlacement,
                    ..
                }
            )
        })
        .count();
    assert_eq!(accepted_spawns, FieldConfig::default().item_target(Item::Spawn) as usize);
}
