#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state for the rescue replay.
//!
//! The [`Board`] owns every cell, wall side, hazard, portrait and agent. The
//! mutators on [`Board`] are the only way to change that state; each of them
//! validates its input first, so a failed call leaves the board untouched.

mod portraits;

use std::collections::{BTreeMap, BTreeSet};

use rescue_replay_core::{
    AgentId, AgentRole, AgentSeed, CellCoord, HazardState, PortraitKind, ReplayError, Side,
    SideInference, WallState,
};

use portraits::PortraitRegistry;
pub use portraits::PortraitLocation;

/// Single square of the board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    walls: [WallState; 4],
    entrances: [bool; 4],
    occupants: BTreeSet<AgentId>,
    hazard: HazardState,
}

impl Cell {
    /// State of the provided side.
    #[must_use]
    pub fn wall(&self, side: Side) -> WallState {
        self.walls[side.index()]
    }

    /// Reports whether the provided side opens to the outside of the board.
    #[must_use]
    pub fn is_entrance(&self, side: Side) -> bool {
        self.entrances[side.index()]
    }

    /// Hazard currently present on the cell.
    #[must_use]
    pub fn hazard(&self) -> HazardState {
        self.hazard
    }

    /// Agents standing on the cell in identifier order.
    pub fn occupants(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.occupants.iter().copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Agent {
    role: AgentRole,
    position: CellCoord,
}

/// Sides written by a door mutator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorSides {
    /// Side of the first cell that holds the door.
    pub first: Side,
    /// Side of the second cell that holds the door.
    pub second: Side,
    /// State both sides held before the call.
    pub previous: WallState,
}

/// Authoritative grid of cells together with portraits and agents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    agents: BTreeMap<AgentId, Agent>,
    portraits: PortraitRegistry,
}

impl Board {
    /// Creates a board of open cells. Returns `None` when either dimension is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let capacity = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
        Some(Self {
            width,
            height,
            cells: vec![Cell::default(); capacity],
            agents: BTreeMap::new(),
            portraits: PortraitRegistry::new(),
        })
    }

    /// Number of columns on the board.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows on the board.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the coordinate lies on the board.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Fails with [`ReplayError::OutOfBounds`] when the coordinate lies off the board.
    pub fn ensure_contains(&self, cell: CellCoord) -> Result<(), ReplayError> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(ReplayError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Retrieves the cell at the provided coordinate.
    pub fn cell(&self, cell: CellCoord) -> Result<&Cell, ReplayError> {
        let index = self.index(cell)?;
        Ok(&self.cells[index])
    }

    /// Overwrites one side of a cell and returns the state it replaced.
    ///
    /// Door states are rejected here; doors are written through
    /// [`Board::install_door`] and [`Board::toggle_door`]. Replacing a door side
    /// also rewrites the facing side of the neighbour so both halves agree.
    pub fn set_wall_state(
        &mut self,
        cell: CellCoord,
        side: Side,
        state: WallState,
    ) -> Result<WallState, ReplayError> {
        if state.is_door() {
            return Err(ReplayError::invalid(format!(
                "door state {state:?} on {cell} {side:?} must be written through the door mutators"
            )));
        }

        let index = self.index(cell)?;
        let previous = self.cells[index].walls[side.index()];
        self.cells[index].walls[side.index()] = state;

        if previous.is_door() {
            if let Some(neighbor) = self.neighbor_index(cell, side) {
                self.cells[neighbor].walls[side.opposite().index()] = state;
            }
        }

        Ok(previous)
    }

    /// Opens a perimeter side to the outside of the board.
    pub fn mark_entrance(&mut self, cell: CellCoord, side: Side) -> Result<(), ReplayError> {
        let index = self.index(cell)?;
        if self.neighbor_index(cell, side).is_some() {
            return Err(ReplayError::invalid(format!(
                "{side:?} side of {cell} is not on the board perimeter"
            )));
        }

        let target = &mut self.cells[index];
        target.walls[side.index()] = WallState::Open;
        target.entrances[side.index()] = true;
        Ok(())
    }

    /// Places a closed door between two adjacent cells.
    pub fn install_door(
        &mut self,
        first: CellCoord,
        second: CellCoord,
    ) -> Result<DoorSides, ReplayError> {
        self.write_door(first, second, WallState::DoorClosed)
    }

    /// Opens the door between two adjacent cells, writing both facing sides.
    ///
    /// Any previous state of the sides is replaced, so opening an already open
    /// door succeeds and reports `previous == DoorOpen`.
    pub fn toggle_door(
        &mut self,
        first: CellCoord,
        second: CellCoord,
    ) -> Result<DoorSides, ReplayError> {
        self.write_door(first, second, WallState::DoorOpen)
    }

    /// Replaces the hazard on a cell and returns the hazard it replaced.
    pub fn set_hazard(
        &mut self,
        cell: CellCoord,
        hazard: HazardState,
    ) -> Result<HazardState, ReplayError> {
        let index = self.index(cell)?;
        let previous = self.cells[index].hazard;
        self.cells[index].hazard = hazard;
        Ok(previous)
    }

    /// Places a new portrait on an empty cell.
    pub fn place_portrait(&mut self, cell: CellCoord, kind: PortraitKind) -> Result<(), ReplayError> {
        self.ensure_contains(cell)?;
        self.portraits.place(cell, kind)
    }

    /// Removes the portrait resting on a cell.
    pub fn remove_portrait(&mut self, cell: CellCoord) -> Result<PortraitKind, ReplayError> {
        self.ensure_contains(cell)?;
        self.portraits.take(cell)
    }

    /// Moves the portrait resting on `cell` into the hands of `agent`.
    ///
    /// The carried portrait takes the `revealed` kind; the kind it rested as
    /// is returned.
    pub fn attach_portrait(
        &mut self,
        cell: CellCoord,
        agent: AgentId,
        revealed: PortraitKind,
    ) -> Result<PortraitKind, ReplayError> {
        self.ensure_contains(cell)?;
        let _ = self.agent(agent)?;
        self.portraits.attach(cell, agent, revealed)
    }

    /// Drops the portrait carried by `agent` off the board.
    pub fn release_portrait(&mut self, agent: AgentId) -> Result<PortraitKind, ReplayError> {
        let _ = self.agent(agent)?;
        self.portraits.release(agent)
    }

    /// Registers an agent on its starting cell.
    pub fn add_agent(&mut self, seed: AgentSeed) -> Result<(), ReplayError> {
        let index = self.index(seed.cell)?;
        if self.agents.contains_key(&seed.id) {
            return Err(ReplayError::invalid(format!(
                "{} is already on the board",
                seed.id
            )));
        }

        let _ = self.agents.insert(
            seed.id,
            Agent {
                role: seed.role,
                position: seed.cell,
            },
        );
        let _ = self.cells[index].occupants.insert(seed.id);
        Ok(())
    }

    /// Moves an agent to a new cell and returns the cell it left.
    pub fn move_agent(&mut self, agent: AgentId, to: CellCoord) -> Result<CellCoord, ReplayError> {
        let destination = self.index(to)?;
        let previous = self.agent(agent)?.position;
        let origin = self.index(previous)?;

        let _ = self.cells[origin].occupants.remove(&agent);
        let _ = self.cells[destination].occupants.insert(agent);
        if let Some(entry) = self.agents.get_mut(&agent) {
            entry.position = to;
        }

        Ok(previous)
    }

    fn agent(&self, agent: AgentId) -> Result<&Agent, ReplayError> {
        self.agents
            .get(&agent)
            .ok_or_else(|| ReplayError::missing(agent.to_string()))
    }

    fn write_door(
        &mut self,
        first: CellCoord,
        second: CellCoord,
        state: WallState,
    ) -> Result<DoorSides, ReplayError> {
        let first_index = self.index(first)?;
        let second_index = self.index(second)?;
        let (first_side, second_side) = facing_sides(first, second).ok_or_else(|| {
            ReplayError::invalid(format!("door between {first} and {second} is not adjacent"))
        })?;

        let previous = self.cells[first_index].walls[first_side.index()];
        self.cells[first_index].walls[first_side.index()] = state;
        self.cells[second_index].walls[second_side.index()] = state;

        Ok(DoorSides {
            first: first_side,
            second: second_side,
            previous,
        })
    }

    fn index(&self, cell: CellCoord) -> Result<usize, ReplayError> {
        self.ensure_contains(cell)?;
        let row = usize::try_from(cell.row()).unwrap_or(usize::MAX);
        let column = usize::try_from(cell.column()).unwrap_or(usize::MAX);
        let width = usize::try_from(self.width).unwrap_or(usize::MAX);
        Ok(row * width + column)
    }

    fn neighbor_index(&self, cell: CellCoord, side: Side) -> Option<usize> {
        cell.neighbor(side)
            .and_then(|neighbor| self.index(neighbor).ok())
    }
}

fn facing_sides(first: CellCoord, second: CellCoord) -> Option<(Side, Side)> {
    match SideInference::between(first, second) {
        SideInference::Facing { origin, target } => Some((origin, target)),
        _ => None,
    }
}

/// Query functions that provide read-only access to the board.
pub mod query {
    use rescue_replay_core::{
        AgentId, AgentRole, CellCoord, HazardKind, HazardState, PortraitKind, ReplayError, Side,
        WallState,
    };

    use super::{Board, PortraitLocation};

    /// Provides the `(width, height)` of the board.
    #[must_use]
    pub fn dimensions(board: &Board) -> (u32, u32) {
        (board.width, board.height)
    }

    /// Wall states of a cell in [`Side::ALL`] order.
    pub fn walls_at(board: &Board, cell: CellCoord) -> Result<[WallState; 4], ReplayError> {
        Ok(board.cell(cell)?.walls)
    }

    /// Hazard present on a cell.
    pub fn hazard_at(board: &Board, cell: CellCoord) -> Result<HazardState, ReplayError> {
        Ok(board.cell(cell)?.hazard)
    }

    /// Kind of the portrait resting on a cell, if any.
    #[must_use]
    pub fn portrait_at(board: &Board, cell: CellCoord) -> Option<PortraitKind> {
        board.portraits.at(cell)
    }

    /// Kind of the portrait carried by an agent, if any.
    #[must_use]
    pub fn carried_by(board: &Board, agent: AgentId) -> Option<PortraitKind> {
        board.portraits.carried_by(agent)
    }

    /// Captures a read-only view of a single agent.
    #[must_use]
    pub fn agent(board: &Board, agent: AgentId) -> Option<AgentView> {
        board.agents.get(&agent).map(|entry| AgentView {
            id: agent,
            role: entry.role,
            position: entry.position,
            carried: board.portraits.carried_by(agent),
        })
    }

    /// Lists every side whose facing half disagrees about holding a door.
    ///
    /// An empty result means every door on the board is written symmetrically.
    #[must_use]
    pub fn door_mismatches(board: &Board) -> Vec<(CellCoord, Side)> {
        let mut mismatches = Vec::new();
        for row in 0..board.height {
            for column in 0..board.width {
                let cell = CellCoord::new(column, row);
                let Ok(current) = board.cell(cell) else {
                    continue;
                };
                for side in Side::ALL {
                    let state = current.wall(side);
                    let facing = cell
                        .neighbor(side)
                        .and_then(|neighbor| board.cell(neighbor).ok())
                        .map(|neighbor| neighbor.wall(side.opposite()));
                    let agrees = match facing {
                        Some(other) => !(state.is_door() || other.is_door()) || state == other,
                        None => !state.is_door(),
                    };
                    if !agrees {
                        mismatches.push((cell, side));
                    }
                }
            }
        }
        mismatches
    }

    /// Captures a deterministic snapshot of hazards, portraits and agents.
    #[must_use]
    pub fn snapshot(board: &Board) -> BoardSnapshot {
        let mut hazards = Vec::new();
        for row in 0..board.height {
            for column in 0..board.width {
                let cell = CellCoord::new(column, row);
                if let Some(kind) = board.cell(cell).ok().and_then(|c| c.hazard.kind()) {
                    hazards.push((cell, kind));
                }
            }
        }

        BoardSnapshot {
            width: board.width,
            height: board.height,
            hazards,
            portraits: board
                .portraits
                .iter()
                .map(|(location, kind)| PortraitView { kind, location })
                .collect(),
            agents: board
                .agents
                .keys()
                .filter_map(|id| agent(board, *id))
                .collect(),
        }
    }

    /// Immutable representation of a single agent.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AgentView {
        /// Identifier of the agent.
        pub id: AgentId,
        /// Role of the agent.
        pub role: AgentRole,
        /// Cell the agent stands on.
        pub position: CellCoord,
        /// Portrait the agent carries, if any.
        pub carried: Option<PortraitKind>,
    }

    /// Immutable representation of a single portrait.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PortraitView {
        /// Kind of the portrait.
        pub kind: PortraitKind,
        /// Where the portrait lives.
        pub location: PortraitLocation,
    }

    /// Read-only summary of the mutable board contents.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct BoardSnapshot {
        /// Number of columns.
        pub width: u32,
        /// Number of rows.
        pub height: u32,
        /// Hazards in row-major order.
        pub hazards: Vec<(CellCoord, HazardKind)>,
        /// Portraits on cells first, then carried ones.
        pub portraits: Vec<PortraitView>,
        /// Agents in identifier order.
        pub agents: Vec<AgentView>,
    }
}

#[cfg(test)]
mod tests {
    use super::{query, Board};
    use rescue_replay_core::{
        AgentId, AgentRole, AgentSeed, CellCoord, HazardState, PortraitKind, ReplayError, Side,
        WallState,
    };

    fn board_with_agent() -> Board {
        let mut board = Board::new(3, 2).expect("non-empty board");
        board
            .add_agent(AgentSeed {
                id: AgentId::new(1),
                role: AgentRole::Rescuer,
                cell: CellCoord::new(0, 0),
            })
            .expect("agent fits on the board");
        board
    }

    #[test]
    fn zero_sized_boards_are_rejected() {
        assert!(Board::new(0, 4).is_none());
        assert!(Board::new(4, 0).is_none());
    }

    #[test]
    fn cell_lookup_outside_bounds_fails() {
        let board = Board::new(2, 2).expect("board");
        let result = board.cell(CellCoord::new(2, 0));
        assert_eq!(
            result.err(),
            Some(ReplayError::OutOfBounds {
                cell: CellCoord::new(2, 0),
                width: 2,
                height: 2,
            })
        );
    }

    #[test]
    fn toggled_door_writes_both_facing_sides() {
        let mut board = Board::new(2, 1).expect("board");
        let sides = board
            .toggle_door(CellCoord::new(0, 0), CellCoord::new(1, 0))
            .expect("adjacent cells");

        assert_eq!(sides.first, Side::Right);
        assert_eq!(sides.second, Side::Left);
        assert_eq!(
            board.cell(CellCoord::new(0, 0)).expect("cell").wall(Side::Right),
            WallState::DoorOpen
        );
        assert_eq!(
            board.cell(CellCoord::new(1, 0)).expect("cell").wall(Side::Left),
            WallState::DoorOpen
        );
        assert!(query::door_mismatches(&board).is_empty());
    }

    #[test]
    fn door_between_distant_cells_is_rejected_without_change() {
        let mut board = Board::new(3, 1).expect("board");
        let before = board.clone();

        let result = board.toggle_door(CellCoord::new(0, 0), CellCoord::new(2, 0));

        assert!(matches!(result, Err(ReplayError::InvalidTransition { .. })));
        assert_eq!(board, before, "failed mutator must leave the board unchanged");
    }

    #[test]
    fn door_states_cannot_be_written_one_side_at_a_time() {
        let mut board = Board::new(2, 1).expect("board");
        let result = board.set_wall_state(CellCoord::new(0, 0), Side::Right, WallState::DoorOpen);
        assert!(matches!(result, Err(ReplayError::InvalidTransition { .. })));
    }

    #[test]
    fn replacing_a_door_side_rewrites_its_neighbour() {
        let mut board = Board::new(2, 1).expect("board");
        let _ = board
            .install_door(CellCoord::new(0, 0), CellCoord::new(1, 0))
            .expect("door");

        let previous = board
            .set_wall_state(CellCoord::new(1, 0), Side::Left, WallState::Open)
            .expect("in bounds");

        assert_eq!(previous, WallState::DoorClosed);
        assert_eq!(
            board.cell(CellCoord::new(0, 0)).expect("cell").wall(Side::Right),
            WallState::Open
        );
        assert!(query::door_mismatches(&board).is_empty());
    }

    #[test]
    fn entrances_must_face_outside() {
        let mut board = Board::new(3, 3).expect("board");
        board
            .mark_entrance(CellCoord::new(1, 0), Side::Top)
            .expect("top row faces outside");
        let interior = board.mark_entrance(CellCoord::new(1, 1), Side::Top);

        assert!(board.cell(CellCoord::new(1, 0)).expect("cell").is_entrance(Side::Top));
        assert!(matches!(interior, Err(ReplayError::InvalidTransition { .. })));
    }

    #[test]
    fn moving_an_agent_updates_occupancy() {
        let mut board = board_with_agent();
        let agent = AgentId::new(1);

        let previous = board
            .move_agent(agent, CellCoord::new(2, 1))
            .expect("agent exists");

        assert_eq!(previous, CellCoord::new(0, 0));
        assert_eq!(
            board.cell(CellCoord::new(0, 0)).expect("cell").occupants().count(),
            0
        );
        assert_eq!(
            board
                .cell(CellCoord::new(2, 1))
                .expect("cell")
                .occupants()
                .collect::<Vec<_>>(),
            vec![agent]
        );
        assert_eq!(
            query::agent(&board, agent).map(|view| view.position),
            Some(CellCoord::new(2, 1))
        );
    }

    #[test]
    fn moving_an_unknown_agent_leaves_board_unchanged() {
        let mut board = board_with_agent();
        let before = board.clone();

        let result = board.move_agent(AgentId::new(99), CellCoord::new(1, 1));

        assert!(matches!(result, Err(ReplayError::ReferenceNotFound { .. })));
        assert_eq!(board, before);
    }

    #[test]
    fn duplicate_agents_are_rejected() {
        let mut board = board_with_agent();
        let result = board.add_agent(AgentSeed {
            id: AgentId::new(1),
            role: AgentRole::Firefighter,
            cell: CellCoord::new(1, 1),
        });
        assert!(matches!(result, Err(ReplayError::InvalidTransition { .. })));
    }

    #[test]
    fn attach_requires_known_agent() {
        let mut board = board_with_agent();
        let cell = CellCoord::new(1, 0);
        board
            .place_portrait(cell, PortraitKind::Victim)
            .expect("empty cell");

        let result = board.attach_portrait(cell, AgentId::new(7), PortraitKind::Victim);

        assert!(matches!(result, Err(ReplayError::ReferenceNotFound { .. })));
        assert_eq!(query::portrait_at(&board, cell), Some(PortraitKind::Victim));
    }

    #[test]
    fn hazard_replacement_reports_previous_state() {
        let mut board = Board::new(1, 1).expect("board");
        let cell = CellCoord::new(0, 0);

        let first = board.set_hazard(cell, HazardState::Smoke).expect("cell");
        let second = board.set_hazard(cell, HazardState::Fire).expect("cell");

        assert_eq!(first, HazardState::None);
        assert_eq!(second, HazardState::Smoke);
        assert_eq!(query::hazard_at(&board, cell), Ok(HazardState::Fire));
    }

    #[test]
    fn snapshot_lists_contents_in_deterministic_order() {
        let mut board = board_with_agent();
        let _ = board
            .set_hazard(CellCoord::new(2, 1), HazardState::Fire)
            .expect("cell");
        let _ = board
            .set_hazard(CellCoord::new(1, 0), HazardState::Smoke)
            .expect("cell");

        let snapshot = query::snapshot(&board);

        assert_eq!(snapshot.hazards.len(), 2);
        assert_eq!(snapshot.hazards[0].0, CellCoord::new(1, 0));
        assert_eq!(snapshot.agents.len(), 1);
        assert!(snapshot.portraits.is_empty());
    }
}
