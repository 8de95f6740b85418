#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the rescue replay engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative board, and pure systems. Adapters decode the simulator output
//! into [`Step`] values carrying [`ReplayEvent`]s, the replay system applies
//! those events to the board in log order, and every visible consequence is
//! requested through the [`PresentationPort`] trait implemented by the
//! rendering layer.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delay the presentation layer waits before discarding a revealed false alarm.
pub const FALSE_ALARM_DISCARD_DELAY: Duration = Duration::from_secs(2);

/// Location of a single board cell expressed as column and row coordinates.
///
/// Row zero is the top row of the board. Coordinates are always zero-based;
/// conversion from the one-based wire format happens once, in the wire adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new board cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the neighbouring coordinate across the provided side.
    ///
    /// Neighbours above row zero or left of column zero do not exist and yield
    /// `None`; neighbours past the far edges are returned unchecked because the
    /// coordinate type does not know the board dimensions.
    #[must_use]
    pub fn neighbor(self, side: Side) -> Option<CellCoord> {
        match side {
            Side::Top => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Side::Left => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
            Side::Right => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Side::Bottom => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
        }
    }

    /// Centre of the cell expressed in cell units, as consumed by presentation.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.column as f32 + 0.5, self.row as f32 + 0.5)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Unique identifier assigned to an agent for the duration of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent {}", self.0)
    }
}

/// Responsibilities an agent carries during the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    /// Searches for portraits and carries victims to safety.
    Rescuer,
    /// Extinguishes smoke and fire.
    Firefighter,
}

/// Kinds of points of interest hidden on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortraitKind {
    /// A victim that must be carried to an entrance.
    Victim,
    /// A decoy that disappears once examined.
    FalseAlarm,
}

/// Hazard kinds a cell may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Smoke marker.
    Smoke,
    /// Fire marker.
    Fire,
}

/// Hazard condition of a single cell. A cell holds at most one hazard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardState {
    /// The cell is clear.
    #[default]
    None,
    /// The cell is filled with smoke.
    Smoke,
    /// The cell is on fire.
    Fire,
}

impl HazardState {
    /// Returns the hazard kind held by the cell, if any.
    #[must_use]
    pub const fn kind(self) -> Option<HazardKind> {
        match self {
            Self::None => None,
            Self::Smoke => Some(HazardKind::Smoke),
            Self::Fire => Some(HazardKind::Fire),
        }
    }
}

impl From<HazardKind> for HazardState {
    fn from(kind: HazardKind) -> Self {
        match kind {
            HazardKind::Smoke => Self::Smoke,
            HazardKind::Fire => Self::Fire,
        }
    }
}

/// The four sides of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Side facing decreasing row indices.
    Top,
    /// Side facing decreasing column indices.
    Left,
    /// Side facing increasing column indices.
    Right,
    /// Side facing increasing row indices.
    Bottom,
}

impl Side {
    /// Every side in storage order.
    pub const ALL: [Side; 4] = [Side::Top, Side::Left, Side::Right, Side::Bottom];

    /// Side of the neighbouring cell that faces this side.
    #[must_use]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
        }
    }

    /// Storage index of the side within per-cell arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Left => 1,
            Side::Right => 2,
            Side::Bottom => 3,
        }
    }
}

/// State of one side of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallState {
    /// Nothing separates the cell from its neighbour.
    #[default]
    Open,
    /// An intact wall.
    Solid,
    /// A wall that took damage but still stands.
    Damaged,
    /// A closed door.
    DoorClosed,
    /// An open door.
    DoorOpen,
}

impl WallState {
    /// Reports whether the side holds a door in either position.
    #[must_use]
    pub const fn is_door(self) -> bool {
        matches!(self, Self::DoorClosed | Self::DoorOpen)
    }

    /// Reports whether the side is a standing wall, damaged or not.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::Solid | Self::Damaged)
    }
}

/// Relation between a wall/door event origin and its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideInference {
    /// The cells share an edge; each side faces the other cell.
    Facing {
        /// Side of the origin cell that faces the target.
        origin: Side,
        /// Side of the target cell that faces the origin.
        target: Side,
    },
    /// Origin and target coincide; every side of the origin is affected.
    Area,
    /// The cells are neither equal nor orthogonally adjacent.
    Unrelated,
}

impl SideInference {
    /// Infers which sides a wall or door event between `origin` and `target` touches.
    ///
    /// Columns act as the x axis and rows as the y axis, so a target with a
    /// smaller row sits above the origin.
    #[must_use]
    pub fn between(origin: CellCoord, target: CellCoord) -> Self {
        if origin == target {
            return Self::Area;
        }

        if origin.manhattan_distance(target) != 1 {
            return Self::Unrelated;
        }

        let origin_side = if origin.column() == target.column() {
            if target.row() < origin.row() {
                Side::Top
            } else {
                Side::Bottom
            }
        } else if target.column() > origin.column() {
            Side::Right
        } else {
            Side::Left
        };

        Self::Facing {
            origin: origin_side,
            target: origin_side.opposite(),
        }
    }

    /// Expands the inference into concrete `(cell, side)` pairs.
    #[must_use]
    pub fn affected(self, origin: CellCoord, target: CellCoord) -> Vec<(CellCoord, Side)> {
        match self {
            Self::Facing {
                origin: origin_side,
                target: target_side,
            } => vec![(origin, origin_side), (target, target_side)],
            Self::Area => Side::ALL.iter().map(|side| (origin, *side)).collect(),
            Self::Unrelated => Vec::new(),
        }
    }
}

/// Annotation attached to a waypoint, dispatched once the agent arrives there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaypointAction {
    /// The agent examined the portrait on the waypoint cell.
    PortraitFound {
        /// Kind revealed by the examination.
        kind: PortraitKind,
    },
    /// The agent delivered its carried victim.
    PortraitRescued,
    /// The agent put out the fire on the waypoint cell.
    FireExtinguished,
    /// The agent cleared the smoke on the waypoint cell.
    SmokeExtinguished,
}

/// Single stop along an agent path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waypoint {
    /// Cell the agent travels to.
    pub cell: CellCoord,
    /// Actions dispatched in order after the agent arrives.
    pub actions: Vec<WaypointAction>,
}

impl Waypoint {
    /// Creates a waypoint without attached actions.
    #[must_use]
    pub fn at(cell: CellCoord) -> Self {
        Self {
            cell,
            actions: Vec::new(),
        }
    }

    /// Attaches an action to the waypoint.
    #[must_use]
    pub fn with_action(mut self, action: WaypointAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Events recorded by the simulator, replayed strictly in log order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayEvent {
    /// An agent stepped between two cells.
    AgentMove {
        /// Agent that moved.
        agent: AgentId,
        /// Cell the agent left.
        from: CellCoord,
        /// Cell the agent entered.
        to: CellCoord,
    },
    /// An agent followed a multi-waypoint path.
    AgentPath {
        /// Agent following the path.
        agent: AgentId,
        /// Ordered waypoints of the path.
        path: Vec<Waypoint>,
    },
    /// Smoke appeared on a cell.
    SmokeAdded {
        /// Affected cell.
        position: CellCoord,
    },
    /// Smoke was cleared from a cell.
    SmokeExtinguished {
        /// Affected cell.
        position: CellCoord,
    },
    /// Fire appeared on, or spread into, a cell.
    FireAdded {
        /// Affected cell.
        position: CellCoord,
    },
    /// Fire was put out on a cell.
    FireExtinguished {
        /// Affected cell.
        position: CellCoord,
    },
    /// A new portrait was placed on the board.
    PortraitAdded {
        /// Cell receiving the portrait.
        position: CellCoord,
        /// Kind of the new portrait.
        kind: PortraitKind,
    },
    /// An agent examined a portrait.
    PortraitFound {
        /// Agent that examined the portrait.
        agent: AgentId,
        /// Cell holding the portrait.
        at: CellCoord,
        /// Kind revealed by the examination.
        kind: PortraitKind,
    },
    /// An agent delivered its carried victim to safety.
    PortraitRescued {
        /// Agent carrying the victim.
        agent: AgentId,
    },
    /// A portrait on the board was consumed by fire.
    PortraitLost {
        /// Cell holding the lost portrait.
        position: CellCoord,
    },
    /// A wall took damage.
    WallDamaged {
        /// Origin cell of the damage.
        position: CellCoord,
        /// Cell on the other side of the wall, or the origin for area damage.
        target: CellCoord,
        /// Running damage total reported by the simulator, when the log carries one.
        damage: Option<u32>,
    },
    /// A wall was destroyed.
    WallDestroyed {
        /// Origin cell of the damage.
        position: CellCoord,
        /// Cell on the other side of the wall, or the origin for area damage.
        target: CellCoord,
        /// Running damage total reported by the simulator, when the log carries one.
        damage: Option<u32>,
    },
    /// A door between two cells was opened.
    DoorOpened {
        /// Cell on one side of the door.
        position: CellCoord,
        /// Cell on the other side of the door.
        target: CellCoord,
    },
}

impl ReplayEvent {
    /// Stable name of the event kind used in logs and reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AgentMove { .. } => "agent_move",
            Self::AgentPath { .. } => "agent_path",
            Self::SmokeAdded { .. } => "smoke_added",
            Self::SmokeExtinguished { .. } => "smoke_extinguished",
            Self::FireAdded { .. } => "fire_added",
            Self::FireExtinguished { .. } => "fire_extinguished",
            Self::PortraitAdded { .. } => "portrait_added",
            Self::PortraitFound { .. } => "portrait_found",
            Self::PortraitRescued { .. } => "portrait_rescued",
            Self::PortraitLost { .. } => "portrait_lost",
            Self::WallDamaged { .. } => "wall_damaged",
            Self::WallDestroyed { .. } => "wall_destroyed",
            Self::DoorOpened { .. } => "door_opened",
        }
    }

    /// Converts a waypoint annotation into the event it stands for.
    #[must_use]
    pub fn from_waypoint_action(agent: AgentId, cell: CellCoord, action: WaypointAction) -> Self {
        match action {
            WaypointAction::PortraitFound { kind } => Self::PortraitFound {
                agent,
                at: cell,
                kind,
            },
            WaypointAction::PortraitRescued => Self::PortraitRescued { agent },
            WaypointAction::FireExtinguished => Self::FireExtinguished { position: cell },
            WaypointAction::SmokeExtinguished => Self::SmokeExtinguished { position: cell },
        }
    }
}

/// One simulator turn and the events recorded during it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Turn number reported by the simulator.
    pub turn: u32,
    /// Events of the turn in log order.
    pub events: Vec<ReplayEvent>,
}

impl Step {
    /// Creates a step for the provided turn.
    #[must_use]
    pub fn new(turn: u32, events: Vec<ReplayEvent>) -> Self {
        Self { turn, events }
    }
}

/// Running counters exposed to the presentation layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Portraits lost to fire.
    pub casualties: u32,
    /// Structural damage total reported by the simulator.
    pub damage: u32,
    /// Victims carried to safety.
    pub saved: u32,
}

/// Wall flags of a single cell as described by the board descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WallFlags {
    /// Wall present on the top side.
    pub top: bool,
    /// Wall present on the left side.
    pub left: bool,
    /// Wall present on the right side.
    pub right: bool,
    /// Wall present on the bottom side.
    pub bottom: bool,
}

impl WallFlags {
    /// Creates wall flags from explicit per-side values.
    #[must_use]
    pub const fn new(top: bool, left: bool, right: bool, bottom: bool) -> Self {
        Self {
            top,
            left,
            right,
            bottom,
        }
    }

    /// Reports whether the provided side carries a wall.
    #[must_use]
    pub const fn has(&self, side: Side) -> bool {
        match side {
            Side::Top => self.top,
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
        }
    }
}

/// Door relation between two cells as listed by the board descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DoorSpec {
    /// First cell of the door.
    pub first: CellCoord,
    /// Second cell of the door.
    pub second: CellCoord,
}

/// Agent present at the start of the replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AgentSeed {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Role of the agent.
    pub role: AgentRole,
    /// Cell the agent starts on.
    pub cell: CellCoord,
}

/// Zero-based description of the initial board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardDescriptor {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Wall flags indexed `[row][column]`.
    pub walls: Vec<Vec<WallFlags>>,
    /// Doors between adjacent cells.
    pub doors: Vec<DoorSpec>,
    /// Perimeter cells that open to the outside.
    pub entrances: Vec<CellCoord>,
    /// Cells initially on fire.
    pub fires: Vec<CellCoord>,
    /// Cells initially filled with smoke.
    pub smoke: Vec<CellCoord>,
    /// Cells holding a false alarm portrait.
    pub false_alarms: Vec<CellCoord>,
    /// Cells holding a victim portrait.
    pub victims: Vec<CellCoord>,
    /// Agents present at the start of the replay.
    pub agents: Vec<AgentSeed>,
}

/// Recoverable failures raised while applying a single event.
///
/// None of these abort a replay: the offending event is skipped, logged and
/// recorded in the run report.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// A coordinate lies outside the board.
    #[error("cell {cell} lies outside the {width}x{height} board")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
        /// Board width.
        width: u32,
        /// Board height.
        height: u32,
    },
    /// The requested change would break a board invariant.
    #[error("invalid transition: {reason}")]
    InvalidTransition {
        /// Human readable description of the violated invariant.
        reason: String,
    },
    /// An agent, portrait or hazard referenced by the event does not exist.
    #[error("{what} not found")]
    ReferenceNotFound {
        /// Description of the missing reference.
        what: String,
    },
    /// The event payload lacks fields required by its kind.
    #[error("malformed `{kind}` event: {reason}")]
    MalformedEvent {
        /// Declared kind of the event.
        kind: String,
        /// Description of the defect.
        reason: String,
    },
}

impl ReplayError {
    /// Builds an [`ReplayError::InvalidTransition`] from any displayable reason.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            reason: reason.into(),
        }
    }

    /// Builds a [`ReplayError::ReferenceNotFound`] from any displayable description.
    #[must_use]
    pub fn missing(what: impl Into<String>) -> Self {
        Self::ReferenceNotFound { what: what.into() }
    }

    /// Builds a [`ReplayError::MalformedEvent`] for the provided kind.
    #[must_use]
    pub fn malformed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Cosmetic appearance chosen for a victim when it is revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VictimVariant(u8);

impl VictimVariant {
    /// Creates a new variant index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Index of the variant within the presentation palette.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.0
    }
}

/// Visual transition requested for a portrait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortraitEffect {
    /// Grow the portrait in place.
    Appear,
    /// Attach the portrait to the agent that found it.
    Attach {
        /// Appearance drawn for the revealed victim.
        variant: VictimVariant,
    },
    /// Reveal the portrait as a false alarm and discard it after `after`.
    Discard {
        /// Delay before the portrait disappears.
        after: Duration,
    },
    /// Remove the portrait immediately.
    Remove,
}

/// Portrait change forwarded to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortraitChange {
    /// Cell the portrait occupied or occupies.
    pub cell: CellCoord,
    /// Kind of the portrait.
    pub kind: PortraitKind,
    /// Agent carrying the portrait after the change, if any.
    pub carrier: Option<AgentId>,
    /// Visual transition to play.
    pub effect: PortraitEffect,
}

/// Interface implemented by the rendering layer.
///
/// Every call is advisory: the replay proceeds without waiting for the
/// requested transition to finish. The only synchronisation point is agent
/// movement, where the replay polls [`PresentationPort::agent_position`] until
/// the rendered agent is close enough to its destination.
pub trait PresentationPort {
    /// Requests a linear motion of `agent` from `from` to `to`.
    fn on_agent_moved(&mut self, agent: AgentId, from: CellCoord, to: CellCoord);

    /// Requests a grow-in-place (`appearing`) or shrink-and-remove transition.
    fn on_hazard_changed(&mut self, cell: CellCoord, kind: HazardKind, appearing: bool);

    /// Requests a portrait transition.
    fn on_portrait_changed(&mut self, change: PortraitChange);

    /// Requests a recolor or removal of one side of a cell.
    fn on_wall_changed(&mut self, cell: CellCoord, side: Side, state: WallState);

    /// Requests the door-lowering transition on one side of a cell.
    fn on_door_opened(&mut self, cell: CellCoord, side: Side);

    /// Publishes the latest counters.
    fn on_stats_changed(&mut self, snapshot: StatsSnapshot);

    /// Rendered position of `agent` in cell units, if the agent is displayed.
    fn agent_position(&mut self, agent: AgentId) -> Option<Vec2>;
}

/// Shared flag used to stop a replay from another owner, e.g. on scene teardown.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes the request.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
