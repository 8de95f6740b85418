#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Builds the authoritative board from a zero-based board descriptor.
//!
//! Shape problems in the descriptor are fatal and reported as [`BuildError`].
//! Every other defect (a door between distant cells, an entrance in the
//! middle of the board, two victims on one cell) only drops the offending
//! entry and is reported as a [`BuildWarning`] alongside the built board.

use std::fmt;

use rescue_replay_core::{
    AgentId, BoardDescriptor, CellCoord, HazardState, PortraitKind, ReplayError, Side, WallState,
};
use rescue_replay_world::{query, Board};
use thiserror::Error;
use tracing::{debug, warn};

/// Fatal defects in the shape of a board descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Width or height is zero.
    #[error("board dimensions must be positive, got {width}x{height}")]
    EmptyBoard {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// The wall grid does not provide one row per board row.
    #[error("wall grid has {actual} rows, expected {expected}")]
    WallRowCount {
        /// Board height.
        expected: u32,
        /// Rows present in the wall grid.
        actual: usize,
    },
    /// A wall row does not provide one entry per board column.
    #[error("wall row {row} has {actual} entries, expected {expected}")]
    WallColumnCount {
        /// Zero-based row index.
        row: usize,
        /// Board width.
        expected: u32,
        /// Entries present in the row.
        actual: usize,
    },
}

/// Descriptor entry a warning refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorItem {
    /// A door between two cells.
    Door,
    /// A perimeter entrance.
    Entrance,
    /// An initial fire.
    Fire,
    /// An initial smoke marker.
    Smoke,
    /// A false alarm portrait.
    FalseAlarm,
    /// A victim portrait.
    Victim,
    /// An initial agent.
    Agent(AgentId),
}

impl fmt::Display for DescriptorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Door => f.write_str("door"),
            Self::Entrance => f.write_str("entrance"),
            Self::Fire => f.write_str("fire"),
            Self::Smoke => f.write_str("smoke"),
            Self::FalseAlarm => f.write_str("false alarm"),
            Self::Victim => f.write_str("victim"),
            Self::Agent(id) => write!(f, "{id}"),
        }
    }
}

/// Non-fatal defect that caused a descriptor entry to be skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildWarning {
    /// Entry that was skipped.
    pub item: DescriptorItem,
    /// Cell the entry referred to.
    pub cell: CellCoord,
    /// Reason the entry was skipped.
    pub error: ReplayError,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} skipped: {}", self.item, self.cell, self.error)
    }
}

/// Board produced by [`build`] together with the entries it skipped.
#[derive(Clone, Debug)]
pub struct BuiltBoard {
    /// Board ready for replay.
    pub board: Board,
    /// Entries skipped while building, in descriptor order.
    pub warnings: Vec<BuildWarning>,
}

/// Builds a board from the provided descriptor.
///
/// Cells are created from the wall flags first, then doors, entrances,
/// hazards, portraits and agents are layered on in that order.
pub fn build(descriptor: &BoardDescriptor) -> Result<BuiltBoard, BuildError> {
    validate_shape(descriptor)?;
    let mut board = Board::new(descriptor.width, descriptor.height).ok_or(BuildError::EmptyBoard {
        width: descriptor.width,
        height: descriptor.height,
    })?;
    let mut warnings = Vec::new();

    for (row, flags_row) in descriptor.walls.iter().enumerate() {
        for (column, flags) in flags_row.iter().enumerate() {
            let cell = CellCoord::new(column as u32, row as u32);
            for side in Side::ALL {
                if !flags.has(side) {
                    continue;
                }
                if let Err(error) = board.set_wall_state(cell, side, WallState::Solid) {
                    debug!(%cell, ?side, %error, "wall_flag_ignored");
                }
            }
        }
    }

    for door in &descriptor.doors {
        if let Err(error) = board.install_door(door.first, door.second) {
            record(&mut warnings, DescriptorItem::Door, door.first, error);
        }
    }

    for entrance in &descriptor.entrances {
        if let Err(error) = mark_entrance(&mut board, *entrance) {
            record(&mut warnings, DescriptorItem::Entrance, *entrance, error);
        }
    }

    let hazards = descriptor
        .fires
        .iter()
        .map(|cell| (DescriptorItem::Fire, *cell, HazardState::Fire))
        .chain(
            descriptor
                .smoke
                .iter()
                .map(|cell| (DescriptorItem::Smoke, *cell, HazardState::Smoke)),
        );
    for (item, cell, hazard) in hazards {
        if let Err(error) = place_hazard(&mut board, cell, hazard) {
            record(&mut warnings, item, cell, error);
        }
    }

    let portraits = descriptor
        .victims
        .iter()
        .map(|cell| (DescriptorItem::Victim, *cell, PortraitKind::Victim))
        .chain(
            descriptor
                .false_alarms
                .iter()
                .map(|cell| (DescriptorItem::FalseAlarm, *cell, PortraitKind::FalseAlarm)),
        );
    for (item, cell, kind) in portraits {
        if let Err(error) = board.place_portrait(cell, kind) {
            record(&mut warnings, item, cell, error);
        }
    }

    for seed in &descriptor.agents {
        if let Err(error) = board.add_agent(*seed) {
            record(&mut warnings, DescriptorItem::Agent(seed.id), seed.cell, error);
        }
    }

    debug_assert!(query::door_mismatches(&board).is_empty());
    debug!(
        width = descriptor.width,
        height = descriptor.height,
        warnings = warnings.len(),
        "board_built"
    );

    Ok(BuiltBoard { board, warnings })
}

/// Side of a perimeter cell that faces outside, checked top, left, bottom, right.
#[must_use]
pub fn perimeter_side(cell: CellCoord, width: u32, height: u32) -> Option<Side> {
    if cell.column() >= width || cell.row() >= height {
        return None;
    }

    if cell.row() == 0 {
        Some(Side::Top)
    } else if cell.column() == 0 {
        Some(Side::Left)
    } else if cell.row() + 1 == height {
        Some(Side::Bottom)
    } else if cell.column() + 1 == width {
        Some(Side::Right)
    } else {
        None
    }
}

fn validate_shape(descriptor: &BoardDescriptor) -> Result<(), BuildError> {
    if descriptor.width == 0 || descriptor.height == 0 {
        return Err(BuildError::EmptyBoard {
            width: descriptor.width,
            height: descriptor.height,
        });
    }

    if descriptor.walls.len() != descriptor.height as usize {
        return Err(BuildError::WallRowCount {
            expected: descriptor.height,
            actual: descriptor.walls.len(),
        });
    }

    for (row, flags_row) in descriptor.walls.iter().enumerate() {
        if flags_row.len() != descriptor.width as usize {
            return Err(BuildError::WallColumnCount {
                row,
                expected: descriptor.width,
                actual: flags_row.len(),
            });
        }
    }

    Ok(())
}

fn mark_entrance(board: &mut Board, cell: CellCoord) -> Result<(), ReplayError> {
    board.ensure_contains(cell)?;
    let side = perimeter_side(cell, board.width(), board.height()).ok_or_else(|| {
        ReplayError::invalid(format!("entrance {cell} is not on the board perimeter"))
    })?;
    board.mark_entrance(cell, side)
}

fn place_hazard(board: &mut Board, cell: CellCoord, hazard: HazardState) -> Result<(), ReplayError> {
    let existing = query::hazard_at(board, cell)?;
    if existing != HazardState::None {
        return Err(ReplayError::invalid(format!(
            "cell {cell} already holds {existing:?}"
        )));
    }

    let _ = board.set_hazard(cell, hazard)?;
    Ok(())
}

fn record(warnings: &mut Vec<BuildWarning>, item: DescriptorItem, cell: CellCoord, error: ReplayError) {
    let warning = BuildWarning { item, cell, error };
    warn!(%warning, "descriptor_entry_skipped");
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::perimeter_side;
    use rescue_replay_core::{CellCoord, Side};

    #[test]
    fn corners_prefer_top_then_left() {
        assert_eq!(perimeter_side(CellCoord::new(0, 0), 4, 3), Some(Side::Top));
        assert_eq!(perimeter_side(CellCoord::new(3, 0), 4, 3), Some(Side::Top));
        assert_eq!(perimeter_side(CellCoord::new(0, 2), 4, 3), Some(Side::Left));
        assert_eq!(perimeter_side(CellCoord::new(3, 2), 4, 3), Some(Side::Bottom));
    }

    #[test]
    fn right_edge_is_checked_last() {
        assert_eq!(perimeter_side(CellCoord::new(3, 1), 4, 3), Some(Side::Right));
    }

    #[test]
    fn interior_and_outside_cells_have_no_perimeter_side() {
        assert_eq!(perimeter_side(CellCoord::new(1, 1), 4, 3), None);
        assert_eq!(perimeter_side(CellCoord::new(4, 0), 4, 3), None);
    }
}
