use rescue_replay_core::{
    AgentId, AgentRole, AgentSeed, BoardDescriptor, CellCoord, DoorSpec, HazardState,
    PortraitKind, ReplayError, Side, WallFlags, WallState,
};
use rescue_replay_system_builder::{build, BuildError, DescriptorItem};
use rescue_replay_world::query;

fn open_descriptor(width: u32, height: u32) -> BoardDescriptor {
    BoardDescriptor {
        width,
        height,
        walls: vec![vec![WallFlags::default(); width as usize]; height as usize],
        ..BoardDescriptor::default()
    }
}

fn walled_descriptor(width: u32, height: u32) -> BoardDescriptor {
    BoardDescriptor {
        width,
        height,
        walls: vec![vec![WallFlags::new(true, true, true, true); width as usize]; height as usize],
        ..BoardDescriptor::default()
    }
}

#[test]
fn wall_flags_become_solid_sides() {
    let mut descriptor = open_descriptor(2, 1);
    descriptor.walls[0][0] = WallFlags::new(true, false, true, false);

    let built = build(&descriptor).expect("valid descriptor");
    let walls = query::walls_at(&built.board, CellCoord::new(0, 0)).expect("in bounds");

    assert_eq!(
        walls,
        [WallState::Solid, WallState::Open, WallState::Solid, WallState::Open]
    );
    assert!(built.warnings.is_empty());
}

#[test]
fn every_door_is_symmetric_after_build() {
    let mut descriptor = walled_descriptor(3, 3);
    descriptor.doors = vec![
        DoorSpec {
            first: CellCoord::new(0, 0),
            second: CellCoord::new(1, 0),
        },
        DoorSpec {
            first: CellCoord::new(1, 2),
            second: CellCoord::new(1, 1),
        },
        DoorSpec {
            first: CellCoord::new(2, 2),
            second: CellCoord::new(2, 1),
        },
    ];

    let built = build(&descriptor).expect("valid descriptor");

    assert!(
        query::door_mismatches(&built.board).is_empty(),
        "door sides must agree after build"
    );
    let below = built.board.cell(CellCoord::new(1, 2)).expect("cell");
    let above = built.board.cell(CellCoord::new(1, 1)).expect("cell");
    assert_eq!(below.wall(Side::Top), WallState::DoorClosed);
    assert_eq!(above.wall(Side::Bottom), WallState::DoorClosed);
}

#[test]
fn non_adjacent_door_is_skipped_with_warning() {
    let mut descriptor = walled_descriptor(3, 1);
    descriptor.doors = vec![DoorSpec {
        first: CellCoord::new(0, 0),
        second: CellCoord::new(2, 0),
    }];

    let built = build(&descriptor).expect("shape is valid");

    assert_eq!(built.warnings.len(), 1);
    assert_eq!(built.warnings[0].item, DescriptorItem::Door);
    assert!(matches!(
        built.warnings[0].error,
        ReplayError::InvalidTransition { .. }
    ));
    let first = built.board.cell(CellCoord::new(0, 0)).expect("cell");
    assert_eq!(first.wall(Side::Right), WallState::Solid);
}

#[test]
fn door_leaving_the_board_is_skipped_with_warning() {
    let mut descriptor = walled_descriptor(2, 2);
    descriptor.doors = vec![DoorSpec {
        first: CellCoord::new(1, 1),
        second: CellCoord::new(2, 1),
    }];

    let built = build(&descriptor).expect("shape is valid");

    assert!(matches!(
        built.warnings.as_slice(),
        [warning] if matches!(warning.error, ReplayError::OutOfBounds { .. })
    ));
}

#[test]
fn entrances_open_the_perimeter_side() {
    let mut descriptor = walled_descriptor(3, 3);
    descriptor.entrances = vec![
        CellCoord::new(1, 0),
        CellCoord::new(0, 1),
        CellCoord::new(1, 2),
        CellCoord::new(2, 1),
    ];

    let built = build(&descriptor).expect("valid descriptor");

    let expectations = [
        (CellCoord::new(1, 0), Side::Top),
        (CellCoord::new(0, 1), Side::Left),
        (CellCoord::new(1, 2), Side::Bottom),
        (CellCoord::new(2, 1), Side::Right),
    ];
    for (cell, side) in expectations {
        let built_cell = built.board.cell(cell).expect("cell");
        assert_eq!(built_cell.wall(side), WallState::Open, "{cell} {side:?}");
        assert!(built_cell.is_entrance(side), "{cell} {side:?}");
    }
    assert!(built.warnings.is_empty());
}

#[test]
fn interior_entrance_is_skipped_with_warning() {
    let mut descriptor = walled_descriptor(3, 3);
    descriptor.entrances = vec![CellCoord::new(1, 1)];

    let built = build(&descriptor).expect("shape is valid");

    assert_eq!(built.warnings.len(), 1);
    assert_eq!(built.warnings[0].item, DescriptorItem::Entrance);
    let cell = built.board.cell(CellCoord::new(1, 1)).expect("cell");
    assert!(Side::ALL.iter().all(|side| !cell.is_entrance(*side)));
}

#[test]
fn hazards_and_portraits_are_placed_with_bounds_checks() {
    let mut descriptor = open_descriptor(4, 3);
    descriptor.fires = vec![CellCoord::new(0, 0), CellCoord::new(9, 9)];
    descriptor.smoke = vec![CellCoord::new(1, 0), CellCoord::new(0, 0)];
    descriptor.victims = vec![CellCoord::new(2, 2)];
    descriptor.false_alarms = vec![CellCoord::new(3, 1), CellCoord::new(2, 2)];

    let built = build(&descriptor).expect("shape is valid");

    assert_eq!(
        query::hazard_at(&built.board, CellCoord::new(0, 0)),
        Ok(HazardState::Fire)
    );
    assert_eq!(
        query::hazard_at(&built.board, CellCoord::new(1, 0)),
        Ok(HazardState::Smoke)
    );
    assert_eq!(
        query::portrait_at(&built.board, CellCoord::new(2, 2)),
        Some(PortraitKind::Victim)
    );
    assert_eq!(
        query::portrait_at(&built.board, CellCoord::new(3, 1)),
        Some(PortraitKind::FalseAlarm)
    );

    let skipped: Vec<DescriptorItem> = built.warnings.iter().map(|w| w.item).collect();
    assert_eq!(
        skipped,
        vec![
            DescriptorItem::Fire,
            DescriptorItem::Smoke,
            DescriptorItem::FalseAlarm
        ],
        "out-of-bounds fire, stacked smoke and stacked portrait are skipped in order"
    );
}

#[test]
fn agents_are_seeded_and_duplicates_skipped() {
    let mut descriptor = open_descriptor(2, 2);
    descriptor.agents = vec![
        AgentSeed {
            id: AgentId::new(0),
            role: AgentRole::Rescuer,
            cell: CellCoord::new(0, 0),
        },
        AgentSeed {
            id: AgentId::new(1),
            role: AgentRole::Firefighter,
            cell: CellCoord::new(1, 1),
        },
        AgentSeed {
            id: AgentId::new(1),
            role: AgentRole::Rescuer,
            cell: CellCoord::new(0, 1),
        },
        AgentSeed {
            id: AgentId::new(2),
            role: AgentRole::Rescuer,
            cell: CellCoord::new(5, 0),
        },
    ];

    let built = build(&descriptor).expect("shape is valid");
    let snapshot = query::snapshot(&built.board);

    assert_eq!(snapshot.agents.len(), 2);
    assert_eq!(snapshot.agents[1].role, AgentRole::Firefighter);
    assert_eq!(snapshot.agents[1].position, CellCoord::new(1, 1));
    assert_eq!(built.warnings.len(), 2);
    assert_eq!(
        built.warnings[0].item,
        DescriptorItem::Agent(AgentId::new(1))
    );
}

#[test]
fn empty_dimensions_are_fatal() {
    let descriptor = open_descriptor(0, 3);
    assert_eq!(
        build(&descriptor).err(),
        Some(BuildError::EmptyBoard {
            width: 0,
            height: 3,
        })
    );
}

#[test]
fn ragged_wall_grid_is_fatal() {
    let mut descriptor = open_descriptor(3, 2);
    descriptor.walls[1].pop();

    assert_eq!(
        build(&descriptor).err(),
        Some(BuildError::WallColumnCount {
            row: 1,
            expected: 3,
            actual: 2,
        })
    );

    descriptor.walls.pop();
    assert_eq!(
        build(&descriptor).err(),
        Some(BuildError::WallRowCount {
            expected: 2,
            actual: 1,
        })
    );
}
