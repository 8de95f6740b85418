//! Portrait bookkeeping for the board.

use std::collections::BTreeMap;

use rescue_replay_core::{AgentId, CellCoord, PortraitKind, ReplayError};

/// Where a portrait currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortraitLocation {
    /// The portrait rests on a board cell.
    OnCell(CellCoord),
    /// The portrait is carried by an agent.
    CarriedBy(AgentId),
}

/// Registry holding every portrait, indexed by cell and by carrier.
///
/// A portrait is stored in exactly one of the two maps, so it can never be on a
/// cell and carried at the same time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PortraitRegistry {
    on_board: BTreeMap<CellCoord, PortraitKind>,
    carried: BTreeMap<AgentId, PortraitKind>,
}

impl PortraitRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn at(&self, cell: CellCoord) -> Option<PortraitKind> {
        self.on_board.get(&cell).copied()
    }

    pub(crate) fn carried_by(&self, agent: AgentId) -> Option<PortraitKind> {
        self.carried.get(&agent).copied()
    }

    pub(crate) fn place(&mut self, cell: CellCoord, kind: PortraitKind) -> Result<(), ReplayError> {
        if self.on_board.contains_key(&cell) {
            return Err(ReplayError::invalid(format!(
                "cell {cell} already holds a portrait"
            )));
        }

        let _ = self.on_board.insert(cell, kind);
        Ok(())
    }

    pub(crate) fn take(&mut self, cell: CellCoord) -> Result<PortraitKind, ReplayError> {
        self.on_board
            .remove(&cell)
            .ok_or_else(|| ReplayError::missing(format!("portrait at {cell}")))
    }

    /// Hands the portrait on `cell` to `agent` as `revealed`, returning the kind it rested as.
    pub(crate) fn attach(
        &mut self,
        cell: CellCoord,
        agent: AgentId,
        revealed: PortraitKind,
    ) -> Result<PortraitKind, ReplayError> {
        if self.carried.contains_key(&agent) {
            return Err(ReplayError::invalid(format!(
                "{agent} already carries a portrait"
            )));
        }

        let resting = self.take(cell)?;
        let _ = self.carried.insert(agent, revealed);
        Ok(resting)
    }

    pub(crate) fn release(&mut self, agent: AgentId) -> Result<PortraitKind, ReplayError> {
        self.carried
            .remove(&agent)
            .ok_or_else(|| ReplayError::missing(format!("portrait carried by {agent}")))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PortraitLocation, PortraitKind)> + '_ {
        let resting = self
            .on_board
            .iter()
            .map(|(cell, kind)| (PortraitLocation::OnCell(*cell), *kind));
        let carried = self
            .carried
            .iter()
            .map(|(agent, kind)| (PortraitLocation::CarriedBy(*agent), *kind));
        resting.chain(carried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_starts_empty() {
        let registry = PortraitRegistry::new();
        assert_eq!(registry.iter().count(), 0);
    }

    #[test]
    fn second_portrait_on_a_cell_is_rejected() {
        let mut registry = PortraitRegistry::new();
        let cell = CellCoord::new(1, 1);
        registry
            .place(cell, PortraitKind::Victim)
            .expect("first placement succeeds");

        let result = registry.place(cell, PortraitKind::FalseAlarm);

        assert!(matches!(result, Err(ReplayError::InvalidTransition { .. })));
        assert_eq!(registry.at(cell), Some(PortraitKind::Victim));
    }

    #[test]
    fn attach_moves_portrait_from_cell_to_carrier() {
        let mut registry = PortraitRegistry::new();
        let cell = CellCoord::new(0, 2);
        let agent = AgentId::new(4);
        registry
            .place(cell, PortraitKind::Victim)
            .expect("placement succeeds");

        let kind = registry
            .attach(cell, agent, PortraitKind::Victim)
            .expect("attach succeeds");

        assert_eq!(kind, PortraitKind::Victim);
        assert_eq!(registry.at(cell), None);
        assert_eq!(registry.carried_by(agent), Some(PortraitKind::Victim));
        assert_eq!(
            registry.iter().collect::<Vec<_>>(),
            vec![(PortraitLocation::CarriedBy(agent), PortraitKind::Victim)]
        );
    }

    #[test]
    fn agent_carrying_a_portrait_cannot_pick_up_another() {
        let mut registry = PortraitRegistry::new();
        let agent = AgentId::new(1);
        let first = CellCoord::new(0, 0);
        let second = CellCoord::new(1, 0);
        registry.place(first, PortraitKind::Victim).expect("place");
        registry.place(second, PortraitKind::Victim).expect("place");
        let _ = registry
            .attach(first, agent, PortraitKind::Victim)
            .expect("attach");

        let result = registry.attach(second, agent, PortraitKind::Victim);

        assert!(matches!(result, Err(ReplayError::InvalidTransition { .. })));
        assert_eq!(registry.at(second), Some(PortraitKind::Victim));
    }

    #[test]
    fn release_without_carried_portrait_reports_missing_reference() {
        let mut registry = PortraitRegistry::new();
        let result = registry.release(AgentId::new(9));
        assert!(matches!(result, Err(ReplayError::ReferenceNotFound { .. })));
    }

    #[test]
    fn carried_portrait_takes_the_revealed_kind() {
        let mut registry = PortraitRegistry::new();
        let cell = CellCoord::new(2, 2);
        let agent = AgentId::new(3);
        registry
            .place(cell, PortraitKind::FalseAlarm)
            .expect("placement succeeds");

        let resting = registry
            .attach(cell, agent, PortraitKind::Victim)
            .expect("attach succeeds");

        assert_eq!(resting, PortraitKind::FalseAlarm);
        assert_eq!(registry.carried_by(agent), Some(PortraitKind::Victim));
        assert_eq!(registry.release(agent), Ok(PortraitKind::Victim));
    }
}
