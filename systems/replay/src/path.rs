//! Path resume and arrival rules used while an agent walks its waypoints.

use glam::Vec2;
use rescue_replay_core::{CellCoord, Waypoint};

/// Distance, in cells, under which a rendered agent counts as arrived.
pub const ARRIVAL_EPSILON: f32 = 0.1;

/// Index of the waypoint the agent resumes from.
///
/// The lowest index whose waypoint is nearest (Manhattan) to `position` wins,
/// so an agent that already walked part of the path skips the covered prefix.
/// An empty path resumes at zero.
#[must_use]
pub fn resume_index(path: &[Waypoint], position: CellCoord) -> usize {
    path.iter()
        .enumerate()
        .min_by_key(|(index, waypoint)| (waypoint.cell.manhattan_distance(position), *index))
        .map_or(0, |(index, _)| index)
}

/// Reports whether a rendered position is close enough to the centre of `cell`.
#[must_use]
pub fn has_arrived(rendered: Vec2, cell: CellCoord) -> bool {
    rendered.distance(cell.center()) < ARRIVAL_EPSILON
}
