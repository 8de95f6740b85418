#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless presentation adapter for the rescue replay.
//!
//! [`RecordingPort`] implements the presentation contract by recording every
//! requested transition as an [`Effect`] and simulating agent travel, which is
//! enough to drive the replay without a window. [`render_ascii`] draws a board
//! snapshot for terminals.

mod ascii;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use rescue_replay_core::{
    AgentId, CellCoord, HazardKind, PortraitChange, PresentationPort, Side, StatsSnapshot,
    WallState,
};

pub use ascii::render_ascii;

/// Duration of an agent moving between two cells.
pub const AGENT_MOVE_DURATION: Duration = Duration::from_secs(1);

/// Duration of a hazard growing in place or shrinking away.
pub const HAZARD_TRANSITION: Duration = Duration::from_secs(2);

/// Duration of a door lowering into the floor.
pub const DOOR_TRANSITION: Duration = Duration::from_secs(1);

/// RGBA color used when presenting walls and hazards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

const SOLID_WALL: Color = Color::from_rgb_u8(0x4a, 0x3b, 0x2c);
const DOOR: Color = Color::from_rgb_u8(0x8b, 0x5a, 0x2b);
const SMOKE: Color = Color::from_rgb_u8(0x9e, 0x9e, 0x9e);
const FIRE: Color = Color::from_rgb_u8(0xe2, 0x58, 0x22);

/// Color a side is drawn with, or `None` when nothing is drawn.
#[must_use]
pub fn wall_color(state: WallState) -> Option<Color> {
    match state {
        WallState::Open => None,
        WallState::Solid => Some(SOLID_WALL),
        WallState::Damaged => Some(SOLID_WALL.lighten(0.45)),
        WallState::DoorClosed => Some(DOOR),
        WallState::DoorOpen => Some(Color { alpha: 0.0, ..DOOR }),
    }
}

/// Color a hazard marker is drawn with.
#[must_use]
pub const fn hazard_color(kind: HazardKind) -> Color {
    match kind {
        HazardKind::Smoke => SMOKE,
        HazardKind::Fire => FIRE,
    }
}

/// Transition requested through the presentation port.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Linear motion of an agent between two cells.
    AgentMoved {
        /// Agent in motion.
        agent: AgentId,
        /// Cell the motion starts on.
        from: CellCoord,
        /// Cell the motion ends on.
        to: CellCoord,
        /// Length of the motion.
        duration: Duration,
    },
    /// Hazard growing in place or shrinking away.
    HazardChanged {
        /// Affected cell.
        cell: CellCoord,
        /// Hazard kind.
        kind: HazardKind,
        /// `true` when the hazard appears.
        appearing: bool,
        /// Marker color.
        color: Color,
        /// Length of the transition.
        duration: Duration,
    },
    /// Portrait transition.
    PortraitChanged(PortraitChange),
    /// Side recolored or removed.
    WallChanged {
        /// Affected cell.
        cell: CellCoord,
        /// Affected side.
        side: Side,
        /// New state of the side.
        state: WallState,
        /// New color, `None` once the side is removed.
        color: Option<Color>,
    },
    /// Door lowering into the floor.
    DoorOpened {
        /// Affected cell.
        cell: CellCoord,
        /// Side holding the door.
        side: Side,
        /// Length of the transition.
        duration: Duration,
    },
    /// Counters published.
    StatsChanged(StatsSnapshot),
}

#[derive(Clone, Copy, Debug)]
struct Motion {
    from: Vec2,
    to: Vec2,
    elapsed: u32,
}

/// Presentation port that records effects and simulates agent travel.
///
/// With zero travel frames agents reach their destination as soon as motion
/// is requested. Otherwise every call to
/// [`PresentationPort::agent_position`] advances the motion by one frame.
#[derive(Clone, Debug, Default)]
pub struct RecordingPort {
    effects: Vec<Effect>,
    motions: BTreeMap<AgentId, Motion>,
    travel_frames: u32,
}

impl RecordingPort {
    /// Creates a port whose agents arrive instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a port whose agents need `frames` polls to finish a motion.
    #[must_use]
    pub fn with_travel_frames(frames: u32) -> Self {
        Self {
            travel_frames: frames,
            ..Self::default()
        }
    }

    /// Effects recorded so far, in request order.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Consumes the port, yielding the recorded effects.
    #[must_use]
    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

impl PresentationPort for RecordingPort {
    fn on_agent_moved(&mut self, agent: AgentId, from: CellCoord, to: CellCoord) {
        let _ = self.motions.insert(
            agent,
            Motion {
                from: from.center(),
                to: to.center(),
                elapsed: 0,
            },
        );
        self.effects.push(Effect::AgentMoved {
            agent,
            from,
            to,
            duration: AGENT_MOVE_DURATION,
        });
    }

    fn on_hazard_changed(&mut self, cell: CellCoord, kind: HazardKind, appearing: bool) {
        self.effects.push(Effect::HazardChanged {
            cell,
            kind,
            appearing,
            color: hazard_color(kind),
            duration: HAZARD_TRANSITION,
        });
    }

    fn on_portrait_changed(&mut self, change: PortraitChange) {
        self.effects.push(Effect::PortraitChanged(change));
    }

    fn on_wall_changed(&mut self, cell: CellCoord, side: Side, state: WallState) {
        self.effects.push(Effect::WallChanged {
            cell,
            side,
            state,
            color: wall_color(state),
        });
    }

    fn on_door_opened(&mut self, cell: CellCoord, side: Side) {
        self.effects.push(Effect::DoorOpened {
            cell,
            side,
            duration: DOOR_TRANSITION,
        });
    }

    fn on_stats_changed(&mut self, snapshot: StatsSnapshot) {
        self.effects.push(Effect::StatsChanged(snapshot));
    }

    fn agent_position(&mut self, agent: AgentId) -> Option<Vec2> {
        let frames = self.travel_frames;
        let motion = self.motions.get_mut(&agent)?;
        if frames == 0 || motion.elapsed >= frames {
            return Some(motion.to);
        }

        motion.elapsed += 1;
        let progress = motion.elapsed as f32 / frames as f32;
        Some(motion.from.lerp(motion.to, progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damaged_walls_are_lighter_than_solid_walls() {
        let solid = wall_color(WallState::Solid).expect("solid walls are drawn");
        let damaged = wall_color(WallState::Damaged).expect("damaged walls are drawn");
        assert!(damaged.red > solid.red);
        assert!(damaged.green > solid.green);
        assert!(damaged.blue > solid.blue);
        assert_eq!(wall_color(WallState::Open), None);
    }

    #[test]
    fn agents_arrive_instantly_without_travel_frames() {
        let mut port = RecordingPort::new();
        let agent = AgentId::new(2);
        port.on_agent_moved(agent, CellCoord::new(0, 0), CellCoord::new(3, 1));

        assert_eq!(port.agent_position(agent), Some(Vec2::new(3.5, 1.5)));
    }

    #[test]
    fn agents_travel_over_the_configured_frames() {
        let mut port = RecordingPort::with_travel_frames(2);
        let agent = AgentId::new(0);
        port.on_agent_moved(agent, CellCoord::new(0, 0), CellCoord::new(2, 0));

        assert_eq!(port.agent_position(agent), Some(Vec2::new(1.5, 0.5)));
        assert_eq!(port.agent_position(agent), Some(Vec2::new(2.5, 0.5)));
        assert_eq!(port.agent_position(agent), Some(Vec2::new(2.5, 0.5)));
    }

    #[test]
    fn unknown_agents_have_no_rendered_position() {
        let mut port = RecordingPort::new();
        assert_eq!(port.agent_position(AgentId::new(5)), None);
    }

    #[test]
    fn effects_are_recorded_in_request_order() {
        let mut port = RecordingPort::new();
        let cell = CellCoord::new(1, 1);
        port.on_hazard_changed(cell, HazardKind::Fire, true);
        port.on_door_opened(cell, Side::Left);

        let effects = port.into_effects();
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            effects[0],
            Effect::HazardChanged {
                kind: HazardKind::Fire,
                appearing: true,
                ..
            }
        ));
        assert!(matches!(effects[1], Effect::DoorOpened { side: Side::Left, .. }));
    }
}
