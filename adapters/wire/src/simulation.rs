//! Simulation log document.
//!
//! Steps arrive either grouped by turn (`{"turn": 3, "details": [...]}`) or as
//! a flat list of event objects carrying an optional `step` number. Both
//! shapes decode to the same ordered [`Step`] list. Entries are decoded one at
//! a time, so a malformed entry is reported and dropped without losing the
//! rest of the log.

use rescue_replay_core::{
    AgentId, AgentRole, AgentSeed, CellCoord, PortraitKind, ReplayError, ReplayEvent, Step,
    Waypoint, WaypointAction,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{deserialize, OneBased, WireError, WireIssue};

#[derive(Debug, Deserialize)]
struct WireSimulation {
    #[serde(default)]
    agents: Vec<Value>,
    #[serde(default)]
    steps: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireAgent {
    id: u32,
    role: Option<String>,
    initial_position: Option<Vec<OneBased>>,
}

#[derive(Debug, Deserialize)]
struct WireTurn {
    turn: Option<u32>,
    details: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireDetail {
    #[serde(rename = "type")]
    kind: String,
    agent: Option<u32>,
    from: Option<Vec<OneBased>>,
    to: Option<Vec<OneBased>>,
    at: Option<Vec<OneBased>>,
    position: Option<Vec<OneBased>>,
    target: Option<Vec<OneBased>>,
    damage: Option<u32>,
    portrait_type: Option<String>,
    path: Option<Vec<WireWaypoint>>,
}

#[derive(Debug, Deserialize)]
struct WireWaypoint {
    position: Vec<OneBased>,
    #[serde(default)]
    actions: Vec<WireAction>,
}

#[derive(Debug, Deserialize)]
struct WireAction {
    #[serde(rename = "type")]
    kind: String,
    portrait_type: Option<String>,
}

/// Simulation log converted to zero-based coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedSimulation {
    /// Agents present at the start of the replay.
    pub agents: Vec<AgentSeed>,
    /// Steps in log order.
    pub steps: Vec<Step>,
    /// Entries ignored or dropped during conversion.
    pub issues: Vec<WireIssue>,
}

/// Parses a simulation log document.
pub fn parse_simulation(raw: &str) -> Result<DecodedSimulation, WireError> {
    let wire: WireSimulation = deserialize("simulation", raw)?;
    let mut issues = Vec::new();

    let mut agents = Vec::with_capacity(wire.agents.len());
    for (index, value) in wire.agents.into_iter().enumerate() {
        let seed = entry::<WireAgent>(value, "agent").and_then(|agent| decode_agent(&agent));
        match seed {
            Ok(seed) => agents.push(seed),
            Err(error) => record(
                &mut issues,
                WireIssue::Rejected {
                    location: format!("agents[{index}]"),
                    error,
                },
            ),
        }
    }

    let mut steps: Vec<Step> = Vec::new();
    let mut flat_turn: Option<u32> = None;
    for (index, value) in wire.steps.into_iter().enumerate() {
        if value.get("details").is_some() {
            let wire_turn = match entry::<WireTurn>(value, "turn") {
                Ok(wire_turn) => wire_turn,
                Err(error) => {
                    record(
                        &mut issues,
                        WireIssue::Rejected {
                            location: format!("steps[{index}]"),
                            error,
                        },
                    );
                    continue;
                }
            };

            let turn = wire_turn
                .turn
                .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX));
            let mut step = Step::new(turn, Vec::with_capacity(wire_turn.details.len()));
            for (position, detail) in wire_turn.details.into_iter().enumerate() {
                let location = format!("steps[{index}].details[{position}]");
                if let Some(event) = convert(detail, location, &mut issues) {
                    step.events.push(event);
                }
            }
            flat_turn = None;
            steps.push(step);
        } else {
            let turn = value
                .get("step")
                .and_then(Value::as_u64)
                .and_then(|step| u32::try_from(step).ok())
                .or(flat_turn)
                .unwrap_or(0);
            if flat_turn != Some(turn) {
                steps.push(Step::new(turn, Vec::new()));
            }
            flat_turn = Some(turn);
            if let Some(event) = convert(value, format!("steps[{index}]"), &mut issues) {
                if let Some(step) = steps.last_mut() {
                    step.events.push(event);
                }
            }
        }
    }

    debug!(
        agents = agents.len(),
        steps = steps.len(),
        issues = issues.len(),
        "simulation_decoded"
    );

    Ok(DecodedSimulation {
        agents,
        steps,
        issues,
    })
}

fn record(issues: &mut Vec<WireIssue>, issue: WireIssue) {
    warn!(%issue, "simulation_entry_skipped");
    issues.push(issue);
}

fn convert(value: Value, location: String, issues: &mut Vec<WireIssue>) -> Option<ReplayEvent> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("detail")
        .to_owned();

    let decoded = entry::<WireDetail>(value, &kind).and_then(|detail| {
        decode_detail(&detail).map(|event| event.ok_or(detail.kind))
    });
    match decoded {
        Ok(Ok(event)) => Some(event),
        Ok(Err(kind)) => {
            record(issues, WireIssue::UnknownType { location, kind });
            None
        }
        Err(error) => {
            record(issues, WireIssue::Rejected { location, error });
            None
        }
    }
}

/// Decodes one entry of the log, reporting shape errors as a malformed `kind`.
fn entry<T: DeserializeOwned>(value: Value, kind: &str) -> Result<T, ReplayError> {
    serde_path_to_error::deserialize(value).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            ReplayError::malformed(kind, source.to_string())
        } else {
            ReplayError::malformed(kind, format!("at `{path}`: {source}"))
        }
    })
}

fn decode_agent(agent: &WireAgent) -> Result<AgentSeed, ReplayError> {
    let role = match agent.role.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("rescuer") => AgentRole::Rescuer,
        Some("firefighter") => AgentRole::Firefighter,
        Some(other) => {
            return Err(ReplayError::malformed(
                "agent",
                format!("unknown role `{other}`"),
            ))
        }
        None => return Err(ReplayError::malformed("agent", "missing field `role`")),
    };
    let cell = point("agent", "initial_position", agent.initial_position.as_deref())?;

    Ok(AgentSeed {
        id: AgentId::new(agent.id),
        role,
        cell,
    })
}

/// Decodes one detail. `Ok(None)` marks an unknown event type.
fn decode_detail(detail: &WireDetail) -> Result<Option<ReplayEvent>, ReplayError> {
    let kind = detail.kind.as_str();
    let fields = Fields { kind, detail };

    let event = match kind {
        "agent_move" => ReplayEvent::AgentMove {
            agent: fields.agent()?,
            from: fields.cell("from", &detail.from)?,
            to: fields.cell("to", &detail.to)?,
        },
        "agent_path" => ReplayEvent::AgentPath {
            agent: fields.agent()?,
            path: fields.path()?,
        },
        "smoke_added" => ReplayEvent::SmokeAdded {
            position: fields.cell("position", &detail.position)?,
        },
        "smoke_extinguished" => ReplayEvent::SmokeExtinguished {
            position: fields.cell_either(("position", &detail.position), ("at", &detail.at))?,
        },
        "fire_added" => ReplayEvent::FireAdded {
            position: fields.cell("position", &detail.position)?,
        },
        "fire_extended" => ReplayEvent::FireAdded {
            position: fields.cell("to", &detail.to)?,
        },
        "fire_extinguished" => ReplayEvent::FireExtinguished {
            position: fields.cell_either(("at", &detail.at), ("position", &detail.position))?,
        },
        "portrait_added" => ReplayEvent::PortraitAdded {
            position: fields.cell("position", &detail.position)?,
            kind: fields.portrait_kind()?,
        },
        "portrait_found" | "found_portrait" => ReplayEvent::PortraitFound {
            agent: fields.agent()?,
            at: fields.cell_either(("at", &detail.at), ("position", &detail.position))?,
            kind: fields.portrait_kind()?,
        },
        "portrait_rescued" | "rescued_portrait" => ReplayEvent::PortraitRescued {
            agent: fields.agent()?,
        },
        "portrait_lost" => ReplayEvent::PortraitLost {
            position: fields.cell("position", &detail.position)?,
        },
        "wall_damaged" | "damage_wall" | "damage_door" => ReplayEvent::WallDamaged {
            position: fields.cell_either(("position", &detail.position), ("from", &detail.from))?,
            target: fields.cell_either(("target", &detail.target), ("to", &detail.to))?,
            damage: detail.damage,
        },
        "wall_destroyed" => ReplayEvent::WallDestroyed {
            position: fields.cell_either(("position", &detail.position), ("from", &detail.from))?,
            target: fields.cell_either(("target", &detail.target), ("to", &detail.to))?,
            damage: detail.damage,
        },
        "door_opened" | "open_door" => ReplayEvent::DoorOpened {
            position: fields.cell("position", &detail.position)?,
            target: fields.cell("target", &detail.target)?,
        },
        _ => return Ok(None),
    };

    Ok(Some(event))
}

struct Fields<'a> {
    kind: &'a str,
    detail: &'a WireDetail,
}

impl Fields<'_> {
    fn agent(&self) -> Result<AgentId, ReplayError> {
        self.detail
            .agent
            .map(AgentId::new)
            .ok_or_else(|| missing(self.kind, "agent"))
    }

    fn cell(&self, name: &str, value: &Option<Vec<OneBased>>) -> Result<CellCoord, ReplayError> {
        point(self.kind, name, value.as_deref())
    }

    fn cell_either(
        &self,
        preferred: (&str, &Option<Vec<OneBased>>),
        fallback: (&str, &Option<Vec<OneBased>>),
    ) -> Result<CellCoord, ReplayError> {
        match (preferred.1, fallback.1) {
            (Some(_), _) | (None, None) => self.cell(preferred.0, preferred.1),
            (None, Some(_)) => self.cell(fallback.0, fallback.1),
        }
    }

    fn portrait_kind(&self) -> Result<PortraitKind, ReplayError> {
        let value = self
            .detail
            .portrait_type
            .as_deref()
            .ok_or_else(|| missing(self.kind, "portrait_type"))?;
        portrait_kind(self.kind, value)
    }

    fn path(&self) -> Result<Vec<Waypoint>, ReplayError> {
        let waypoints = self
            .detail
            .path
            .as_ref()
            .ok_or_else(|| missing(self.kind, "path"))?;

        waypoints
            .iter()
            .map(|waypoint| {
                let cell = point(self.kind, "path.position", Some(&waypoint.position))?;
                let actions = waypoint
                    .actions
                    .iter()
                    .map(|action| waypoint_action(self.kind, action))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Waypoint { cell, actions })
            })
            .collect()
    }
}

fn waypoint_action(kind: &str, action: &WireAction) -> Result<WaypointAction, ReplayError> {
    match action.kind.as_str() {
        "portrait_found" | "found_portrait" => {
            let value = action
                .portrait_type
                .as_deref()
                .ok_or_else(|| missing(kind, "path.actions.portrait_type"))?;
            Ok(WaypointAction::PortraitFound {
                kind: portrait_kind(kind, value)?,
            })
        }
        "portrait_rescued" | "rescued_portrait" => Ok(WaypointAction::PortraitRescued),
        "fire_extinguished" => Ok(WaypointAction::FireExtinguished),
        "smoke_extinguished" => Ok(WaypointAction::SmokeExtinguished),
        other => Err(ReplayError::malformed(
            kind,
            format!("unknown waypoint action `{other}`"),
        )),
    }
}

fn portrait_kind(kind: &str, value: &str) -> Result<PortraitKind, ReplayError> {
    match value.to_ascii_lowercase().as_str() {
        "victim" => Ok(PortraitKind::Victim),
        "false" | "false_alarm" | "falsealarm" | "fake_alarm" => Ok(PortraitKind::FalseAlarm),
        _ => Err(ReplayError::malformed(
            kind,
            format!("unknown portrait_type `{value}`"),
        )),
    }
}

fn point(kind: &str, name: &str, value: Option<&[OneBased]>) -> Result<CellCoord, ReplayError> {
    let [x, y] = value.ok_or_else(|| missing(kind, name))? else {
        return Err(ReplayError::malformed(
            kind,
            format!("field `{name}` must hold exactly two coordinates"),
        ));
    };

    match (x.to_index(), y.to_index()) {
        (Some(column), Some(row)) => Ok(CellCoord::new(column, row)),
        _ => Err(ReplayError::malformed(
            kind,
            format!(
                "field `{name}` [{}, {}] is below the one-based origin",
                x.get(),
                y.get()
            ),
        )),
    }
}

fn missing(kind: &str, name: &str) -> ReplayError {
    ReplayError::malformed(kind, format!("missing field `{name}`"))
}

#[cfg(test)]
mod tests {
    use super::parse_simulation;
    use crate::WireIssue;
    use rescue_replay_core::{AgentId, CellCoord, PortraitKind, ReplayError, ReplayEvent};

    #[test]
    fn turn_grouped_steps_keep_their_turn_numbers() {
        let raw = r#"{
            "agents": [{"id": 1, "role": "rescuer", "initial_position": [1, 1]}],
            "steps": [
                {"turn": 4, "details": [
                    {"type": "agent_move", "agent": 1, "from": [1, 1], "to": [2, 1]},
                    {"type": "smoke_added", "position": [3, 2]}
                ]}
            ]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        assert_eq!(decoded.agents.len(), 1);
        assert_eq!(decoded.agents[0].cell, CellCoord::new(0, 0));
        assert_eq!(decoded.steps.len(), 1);
        assert_eq!(decoded.steps[0].turn, 4);
        assert_eq!(
            decoded.steps[0].events,
            vec![
                ReplayEvent::AgentMove {
                    agent: AgentId::new(1),
                    from: CellCoord::new(0, 0),
                    to: CellCoord::new(1, 0),
                },
                ReplayEvent::SmokeAdded {
                    position: CellCoord::new(2, 1),
                },
            ]
        );
    }

    #[test]
    fn flat_details_are_grouped_by_step_number() {
        let raw = r#"{
            "steps": [
                {"type": "smoke_added", "position": [1, 1], "step": 1},
                {"type": "fire_extended", "from": [1, 1], "to": [1, 2], "step": 1},
                {"type": "found_portrait", "agent": 2, "at": [2, 2], "portrait_type": "False", "step": 2}
            ]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        assert_eq!(decoded.steps.len(), 2);
        assert_eq!(decoded.steps[0].events.len(), 2);
        assert_eq!(
            decoded.steps[0].events[1],
            ReplayEvent::FireAdded {
                position: CellCoord::new(0, 1),
            }
        );
        assert_eq!(
            decoded.steps[1].events,
            vec![ReplayEvent::PortraitFound {
                agent: AgentId::new(2),
                at: CellCoord::new(1, 1),
                kind: PortraitKind::FalseAlarm,
            }]
        );
    }

    #[test]
    fn unknown_types_are_ignored_and_reported() {
        let raw = r#"{
            "steps": [{"turn": 1, "details": [
                {"type": "fire_to_smoke", "position": [1, 1]},
                {"type": "smoke_added", "position": [1, 1]}
            ]}]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        assert_eq!(decoded.steps[0].events.len(), 1);
        assert!(matches!(
            decoded.issues.as_slice(),
            [WireIssue::UnknownType { kind, .. }] if kind == "fire_to_smoke"
        ));
    }

    #[test]
    fn missing_fields_reject_only_that_event() {
        let raw = r#"{
            "steps": [{"turn": 1, "details": [
                {"type": "agent_move", "agent": 1, "to": [2, 1]},
                {"type": "door_opened", "position": [1, 1], "target": [2, 1]}
            ]}]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        assert_eq!(decoded.steps[0].events.len(), 1);
        assert!(matches!(
            decoded.issues.as_slice(),
            [WireIssue::Rejected {
                error: ReplayError::MalformedEvent { .. },
                ..
            }]
        ));
    }

    #[test]
    fn wall_events_accept_producer_field_names() {
        let raw = r#"{
            "steps": [{"turn": 2, "details": [
                {"type": "wall_destroyed", "from": [2, 2], "to": [3, 2], "damage": 5}
            ]}]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        assert_eq!(
            decoded.steps[0].events,
            vec![ReplayEvent::WallDestroyed {
                position: CellCoord::new(1, 1),
                target: CellCoord::new(2, 1),
                damage: Some(5),
            }]
        );
    }

    #[test]
    fn agent_paths_decode_waypoint_actions() {
        let raw = r#"{
            "steps": [{"turn": 1, "details": [
                {"type": "agent_path", "agent": 3, "path": [
                    {"position": [1, 1]},
                    {"position": [2, 1], "actions": [{"type": "portrait_found", "portrait_type": "Victim"}]}
                ]}
            ]}]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        let ReplayEvent::AgentPath { agent, path } = &decoded.steps[0].events[0] else {
            panic!("expected an agent path, got {:?}", decoded.steps[0].events);
        };
        assert_eq!(*agent, AgentId::new(3));
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].cell, CellCoord::new(1, 0));
        assert_eq!(path[1].actions.len(), 1);
    }

    #[test]
    fn agents_with_unknown_roles_are_rejected() {
        let raw = r#"{
            "agents": [
                {"id": 0, "role": "Firefighter", "initial_position": [2, 3]},
                {"id": 1, "role": "pilot", "initial_position": [1, 1]}
            ]
        }"#;

        let decoded = parse_simulation(raw).expect("valid document");

        assert_eq!(decoded.agents.len(), 1);
        assert_eq!(decoded.agents[0].cell, CellCoord::new(1, 2));
        assert_eq!(decoded.issues.len(), 1);
        assert!(decoded.steps.is_empty());
    }
}
