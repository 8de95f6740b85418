//! Per-event handlers of the replay engine.
//!
//! Every handler validates its event against the board before the first
//! mutation, so an `Err` always leaves the board as it was.

use rand::{Rng, RngCore};
use rescue_replay_core::{
    AgentId, CellCoord, HazardKind, HazardState, PortraitChange, PortraitEffect, PortraitKind,
    PresentationPort, ReplayError, ReplayEvent, Side, SideInference, VictimVariant, WallState,
    Waypoint, FALSE_ALARM_DISCARD_DELAY,
};
use rescue_replay_world::query;
use tracing::{debug, warn};

use crate::{
    path::{has_arrived, resume_index},
    Progress, ReplayEngine,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WallChange {
    Damage,
    Destroy,
}

impl<P: PresentationPort, R: RngCore> ReplayEngine<P, R> {
    pub(crate) fn apply(&mut self, turn: u32, event: &ReplayEvent) -> Result<Progress, ReplayError> {
        match event {
            ReplayEvent::AgentMove { agent, from, to } => self.move_agent(*agent, *from, *to),
            ReplayEvent::AgentPath { agent, path } => self.follow_path(turn, *agent, path),
            ReplayEvent::SmokeAdded { position } => self.add_hazard(*position, HazardKind::Smoke),
            ReplayEvent::FireAdded { position } => self.add_hazard(*position, HazardKind::Fire),
            ReplayEvent::SmokeExtinguished { position } => {
                self.extinguish(*position, HazardKind::Smoke)
            }
            ReplayEvent::FireExtinguished { position } => {
                self.extinguish(*position, HazardKind::Fire)
            }
            ReplayEvent::PortraitAdded { position, kind } => self.add_portrait(*position, *kind),
            ReplayEvent::PortraitFound { agent, at, kind } => {
                self.reveal_portrait(*agent, *at, *kind)
            }
            ReplayEvent::PortraitRescued { agent } => self.rescue_portrait(*agent),
            ReplayEvent::PortraitLost { position } => self.lose_portrait(*position),
            ReplayEvent::WallDamaged {
                position, target, ..
            } => self.change_walls(*position, *target, WallChange::Damage),
            ReplayEvent::WallDestroyed {
                position, target, ..
            } => self.change_walls(*position, *target, WallChange::Destroy),
            ReplayEvent::DoorOpened { position, target } => self.open_door(*position, *target),
        }
    }

    fn move_agent(
        &mut self,
        agent: AgentId,
        from: CellCoord,
        to: CellCoord,
    ) -> Result<Progress, ReplayError> {
        self.board.ensure_contains(from)?;
        self.board.ensure_contains(to)?;
        let tracked = self.tracked_position(agent)?;
        if tracked != from {
            warn!(%agent, %tracked, %from, "agent_position_desync");
        }

        let _ = self.board.move_agent(agent, to)?;
        self.port.on_agent_moved(agent, from, to);
        Ok(self.await_arrival(agent, to))
    }

    fn follow_path(
        &mut self,
        turn: u32,
        agent: AgentId,
        path: &[Waypoint],
    ) -> Result<Progress, ReplayError> {
        if path.is_empty() {
            return Err(ReplayError::malformed("agent_path", "path has no waypoints"));
        }

        let tracked = self.tracked_position(agent)?;
        let start = resume_index(path, tracked);
        debug!(%agent, start, waypoints = path.len(), "path_resumed");

        for waypoint in &path[start..] {
            if self.cancel.is_cancelled() {
                return Ok(Progress::Cancelled);
            }

            if let Err(error) = self.board.ensure_contains(waypoint.cell) {
                self.skip(turn, "agent_path", error);
                continue;
            }

            let from = self.tracked_position(agent)?;
            let _ = self.board.move_agent(agent, waypoint.cell)?;
            self.port.on_agent_moved(agent, from, waypoint.cell);
            if self.await_arrival(agent, waypoint.cell) == Progress::Cancelled {
                return Ok(Progress::Cancelled);
            }

            for action in &waypoint.actions {
                let event = ReplayEvent::from_waypoint_action(agent, waypoint.cell, *action);
                if self.process(turn, event) == Progress::Cancelled {
                    return Ok(Progress::Cancelled);
                }
            }

            if self.cancel.is_cancelled() {
                return Ok(Progress::Cancelled);
            }
        }

        Ok(Progress::Continue)
    }

    fn add_hazard(&mut self, cell: CellCoord, kind: HazardKind) -> Result<Progress, ReplayError> {
        let previous = self.board.set_hazard(cell, HazardState::from(kind))?;
        match previous.kind() {
            Some(existing) if existing == kind => {
                debug!(%cell, ?kind, "hazard_already_present");
            }
            Some(existing) => {
                self.port.on_hazard_changed(cell, existing, false);
                self.port.on_hazard_changed(cell, kind, true);
            }
            None => self.port.on_hazard_changed(cell, kind, true),
        }
        Ok(Progress::Continue)
    }

    fn extinguish(&mut self, cell: CellCoord, kind: HazardKind) -> Result<Progress, ReplayError> {
        if query::hazard_at(&self.board, cell)?.kind() != Some(kind) {
            return Err(ReplayError::missing(format!("{kind:?} at {cell}")));
        }

        let _ = self.board.set_hazard(cell, HazardState::None)?;
        self.port.on_hazard_changed(cell, kind, false);
        Ok(Progress::Continue)
    }

    fn add_portrait(&mut self, cell: CellCoord, kind: PortraitKind) -> Result<Progress, ReplayError> {
        self.board.ensure_contains(cell)?;
        if query::portrait_at(&self.board, cell).is_some() {
            return Err(ReplayError::invalid(format!(
                "cell {cell} already holds a portrait"
            )));
        }

        if let Some(hazard) = self.board.set_hazard(cell, HazardState::None)?.kind() {
            self.port.on_hazard_changed(cell, hazard, false);
        }
        self.board.place_portrait(cell, kind)?;
        self.port.on_portrait_changed(PortraitChange {
            cell,
            kind,
            carrier: None,
            effect: PortraitEffect::Appear,
        });
        Ok(Progress::Continue)
    }

    fn reveal_portrait(
        &mut self,
        agent: AgentId,
        cell: CellCoord,
        kind: PortraitKind,
    ) -> Result<Progress, ReplayError> {
        let _ = self.tracked_position(agent)?;
        let resting = query::portrait_at(&self.board, cell)
            .ok_or_else(|| ReplayError::missing(format!("portrait at {cell}")))?;
        if resting != kind {
            debug!(%cell, ?resting, revealed = ?kind, "portrait_kind_revealed");
        }

        match kind {
            PortraitKind::Victim => {
                let _ = self.board.attach_portrait(cell, agent, kind)?;
                let variant = self.draw_variant();
                self.port.on_portrait_changed(PortraitChange {
                    cell,
                    kind,
                    carrier: Some(agent),
                    effect: PortraitEffect::Attach { variant },
                });
            }
            PortraitKind::FalseAlarm => {
                let _ = self.board.remove_portrait(cell)?;
                self.port.on_portrait_changed(PortraitChange {
                    cell,
                    kind,
                    carrier: None,
                    effect: PortraitEffect::Discard {
                        after: FALSE_ALARM_DISCARD_DELAY,
                    },
                });
            }
        }
        Ok(Progress::Continue)
    }

    fn rescue_portrait(&mut self, agent: AgentId) -> Result<Progress, ReplayError> {
        let cell = self.tracked_position(agent)?;
        let kind = self.board.release_portrait(agent)?;
        self.port.on_portrait_changed(PortraitChange {
            cell,
            kind,
            carrier: None,
            effect: PortraitEffect::Remove,
        });
        Ok(Progress::Continue)
    }

    fn lose_portrait(&mut self, cell: CellCoord) -> Result<Progress, ReplayError> {
        let kind = self.board.remove_portrait(cell)?;
        self.port.on_portrait_changed(PortraitChange {
            cell,
            kind,
            carrier: None,
            effect: PortraitEffect::Remove,
        });
        Ok(Progress::Continue)
    }

    fn change_walls(
        &mut self,
        origin: CellCoord,
        target: CellCoord,
        change: WallChange,
    ) -> Result<Progress, ReplayError> {
        self.board.ensure_contains(origin)?;

        let inference = SideInference::between(origin, target);
        if inference == SideInference::Unrelated {
            debug!(%origin, %target, "wall_target_not_adjacent");
        }

        let mut updates: Vec<(CellCoord, Side, WallState)> = Vec::new();
        for (cell, side) in inference.affected(origin, target) {
            let Ok(current) = self.board.cell(cell).map(|c| c.wall(side)) else {
                continue;
            };
            let next = match change {
                WallChange::Damage if current == WallState::Solid => WallState::Damaged,
                WallChange::Destroy if current != WallState::Open => WallState::Open,
                _ => continue,
            };
            updates.push((cell, side, next));
        }

        for (cell, side, state) in updates.iter().copied() {
            let previous = self.board.set_wall_state(cell, side, state)?;
            self.port.on_wall_changed(cell, side, state);

            if previous.is_door() {
                let mirrored = cell
                    .neighbor(side)
                    .filter(|neighbor| self.board.contains(*neighbor))
                    .map(|neighbor| (neighbor, side.opposite(), state));
                if let Some((neighbor, facing, state)) = mirrored {
                    if !updates.contains(&(neighbor, facing, state)) {
                        self.port.on_wall_changed(neighbor, facing, state);
                    }
                }
            }
        }

        Ok(Progress::Continue)
    }

    fn open_door(&mut self, first: CellCoord, second: CellCoord) -> Result<Progress, ReplayError> {
        let sides = self.board.toggle_door(first, second)?;
        if sides.previous == WallState::DoorOpen {
            debug!(%first, %second, "door_already_open");
        } else {
            self.port.on_door_opened(first, sides.first);
            self.port.on_door_opened(second, sides.second);
        }
        Ok(Progress::Continue)
    }

    fn tracked_position(&self, agent: AgentId) -> Result<CellCoord, ReplayError> {
        query::agent(&self.board, agent)
            .map(|view| view.position)
            .ok_or_else(|| ReplayError::missing(agent.to_string()))
    }

    fn await_arrival(&mut self, agent: AgentId, cell: CellCoord) -> Progress {
        loop {
            if self.cancel.is_cancelled() {
                return Progress::Cancelled;
            }

            match self.port.agent_position(agent) {
                Some(rendered) if has_arrived(rendered, cell) => return Progress::Continue,
                _ => self.pacer.wait_frame(),
            }
        }
    }

    fn draw_variant(&mut self) -> VictimVariant {
        let count = self.config.victim_variants;
        if count == 0 {
            return VictimVariant::new(0);
        }
        VictimVariant::new(self.rng.gen_range(0..count))
    }
}
