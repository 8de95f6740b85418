//! Board descriptor document.

use rescue_replay_core::{BoardDescriptor, CellCoord, DoorSpec, ReplayError, WallFlags};
use serde::Deserialize;
use tracing::warn;

use crate::{deserialize, OneBased, WireError, WireIssue};

#[derive(Debug, Deserialize)]
struct WireBoard {
    width: u32,
    height: u32,
    walls: Vec<Vec<WireWalls>>,
    #[serde(default)]
    doors: Vec<WireDoor>,
    #[serde(default)]
    entrances: Vec<WireCell>,
    #[serde(default)]
    fires: Vec<WireCell>,
    #[serde(default)]
    smoke: Vec<WireCell>,
    #[serde(default)]
    fake_alarms: Vec<WireCell>,
    #[serde(default)]
    victims: Vec<WireCell>,
}

#[derive(Debug, Default, Deserialize)]
struct WireWalls {
    #[serde(default)]
    top: u8,
    #[serde(default)]
    left: u8,
    #[serde(default)]
    right: u8,
    #[serde(default)]
    bottom: u8,
}

#[derive(Debug, Deserialize)]
struct WireDoor {
    r1: OneBased,
    c1: OneBased,
    r2: OneBased,
    c2: OneBased,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    row: OneBased,
    col: OneBased,
}

impl WireCell {
    fn to_cell(&self) -> Option<CellCoord> {
        to_cell(self.col, self.row)
    }
}

/// Board descriptor converted to zero-based coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedBoard {
    /// Descriptor ready for the board builder. Agents are added from the simulation log.
    pub descriptor: BoardDescriptor,
    /// Entries dropped during conversion.
    pub issues: Vec<WireIssue>,
}

/// Parses a board descriptor document.
pub fn parse_board(raw: &str) -> Result<DecodedBoard, WireError> {
    let wire: WireBoard = deserialize("board", raw)?;
    let mut issues = Vec::new();

    let walls = wire
        .walls
        .iter()
        .map(|row| {
            row.iter()
                .map(|walls| {
                    WallFlags::new(walls.top != 0, walls.left != 0, walls.right != 0, walls.bottom != 0)
                })
                .collect()
        })
        .collect();

    let mut doors = Vec::with_capacity(wire.doors.len());
    for (index, door) in wire.doors.iter().enumerate() {
        match (to_cell(door.c1, door.r1), to_cell(door.c2, door.r2)) {
            (Some(first), Some(second)) => doors.push(DoorSpec { first, second }),
            _ => reject(&mut issues, format!("doors[{index}]"), "door"),
        }
    }

    let descriptor = BoardDescriptor {
        width: wire.width,
        height: wire.height,
        walls,
        doors,
        entrances: convert_cells(&wire.entrances, "entrances", &mut issues),
        fires: convert_cells(&wire.fires, "fires", &mut issues),
        smoke: convert_cells(&wire.smoke, "smoke", &mut issues),
        false_alarms: convert_cells(&wire.fake_alarms, "fake_alarms", &mut issues),
        victims: convert_cells(&wire.victims, "victims", &mut issues),
        agents: Vec::new(),
    };

    Ok(DecodedBoard { descriptor, issues })
}

fn to_cell(column: OneBased, row: OneBased) -> Option<CellCoord> {
    Some(CellCoord::new(column.to_index()?, row.to_index()?))
}

fn convert_cells(cells: &[WireCell], field: &str, issues: &mut Vec<WireIssue>) -> Vec<CellCoord> {
    let mut converted = Vec::with_capacity(cells.len());
    for (index, cell) in cells.iter().enumerate() {
        match cell.to_cell() {
            Some(coord) => converted.push(coord),
            None => reject(issues, format!("{field}[{index}]"), field),
        }
    }
    converted
}

fn reject(issues: &mut Vec<WireIssue>, location: String, entry: &str) {
    let issue = WireIssue::Rejected {
        location,
        error: ReplayError::malformed(entry, "coordinate below the one-based origin"),
    };
    warn!(%issue, "board_entry_rejected");
    issues.push(issue);
}
