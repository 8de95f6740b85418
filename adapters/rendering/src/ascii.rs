//! Plain-text board rendering.

use rescue_replay_core::{CellCoord, HazardState, PortraitKind, Side, WallState};
use rescue_replay_world::{query, Board};

/// Renders the board as text, two characters per cell edge.
///
/// Cells show the first agent standing there (its id modulo ten), otherwise a
/// resting portrait (`V` victim, `?` false alarm), otherwise the hazard (`F`
/// fire, `s` smoke), otherwise `.`. Edges show `|`/`-` for walls, `:`/`~` for
/// damaged walls, `D` for closed doors and `/` for open doors.
#[must_use]
pub fn render_ascii(board: &Board) -> String {
    let (width, height) = query::dimensions(board);
    let mut out = String::new();

    for row in 0..height {
        push_horizontal_edge(&mut out, board, row, Side::Top);
        for column in 0..width {
            let cell = CellCoord::new(column, row);
            out.push(vertical_edge(board, cell, Side::Left));
            out.push(cell_glyph(board, cell));
        }
        out.push(vertical_edge(
            board,
            CellCoord::new(width - 1, row),
            Side::Right,
        ));
        out.push('\n');
    }
    push_horizontal_edge(&mut out, board, height - 1, Side::Bottom);

    out
}

fn push_horizontal_edge(out: &mut String, board: &Board, row: u32, side: Side) {
    let (width, _) = query::dimensions(board);
    for column in 0..width {
        out.push('+');
        let state = wall(board, CellCoord::new(column, row), side);
        out.push(match state {
            WallState::Open => ' ',
            WallState::Solid => '-',
            WallState::Damaged => '~',
            WallState::DoorClosed => 'D',
            WallState::DoorOpen => '/',
        });
    }
    out.push('+');
    out.push('\n');
}

fn vertical_edge(board: &Board, cell: CellCoord, side: Side) -> char {
    match wall(board, cell, side) {
        WallState::Open => ' ',
        WallState::Solid => '|',
        WallState::Damaged => ':',
        WallState::DoorClosed => 'D',
        WallState::DoorOpen => '/',
    }
}

fn wall(board: &Board, cell: CellCoord, side: Side) -> WallState {
    board
        .cell(cell)
        .map_or(WallState::Open, |current| current.wall(side))
}

fn cell_glyph(board: &Board, cell: CellCoord) -> char {
    let Ok(current) = board.cell(cell) else {
        return ' ';
    };

    if let Some(agent) = current.occupants().next() {
        return char::from_digit(agent.get() % 10, 10).unwrap_or('A');
    }

    match query::portrait_at(board, cell) {
        Some(PortraitKind::Victim) => return 'V',
        Some(PortraitKind::FalseAlarm) => return '?',
        None => {}
    }

    match current.hazard() {
        HazardState::Fire => 'F',
        HazardState::Smoke => 's',
        HazardState::None => '.',
    }
}

#[cfg(test)]
mod tests {
    use super::render_ascii;
    use rescue_replay_core::{
        AgentId, AgentRole, AgentSeed, CellCoord, HazardState, PortraitKind, Side, WallState,
    };
    use rescue_replay_world::Board;

    #[test]
    fn renders_walls_doors_and_contents() {
        let mut board = Board::new(2, 1).expect("board");
        for side in [Side::Top, Side::Left, Side::Bottom] {
            let _ = board
                .set_wall_state(CellCoord::new(0, 0), side, WallState::Solid)
                .expect("in bounds");
        }
        for side in [Side::Top, Side::Right, Side::Bottom] {
            let _ = board
                .set_wall_state(CellCoord::new(1, 0), side, WallState::Damaged)
                .expect("in bounds");
        }
        let _ = board
            .install_door(CellCoord::new(0, 0), CellCoord::new(1, 0))
            .expect("adjacent");
        let _ = board
            .set_hazard(CellCoord::new(1, 0), HazardState::Fire)
            .expect("in bounds");
        board
            .add_agent(AgentSeed {
                id: AgentId::new(3),
                role: AgentRole::Firefighter,
                cell: CellCoord::new(0, 0),
            })
            .expect("agent fits");

        assert_eq!(render_ascii(&board), "+-+~+\n|3DF:\n+-+~+\n");
    }

    #[test]
    fn portraits_take_precedence_over_hazards() {
        let mut board = Board::new(1, 1).expect("board");
        let cell = CellCoord::new(0, 0);
        let _ = board.set_hazard(cell, HazardState::Smoke).expect("in bounds");
        board
            .place_portrait(cell, PortraitKind::FalseAlarm)
            .expect("empty cell");

        assert_eq!(render_ascii(&board), "+ +\n ? \n+ +\n");
    }
}
