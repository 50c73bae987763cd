/// Collaborator seams implemented by the host game.
use crate::schema::entity::EntityId;

/// Removes the consumable a proposal requires from the initiating player.
pub trait InventoryCollaborator {
    /// Try to take one unit of the required item; `true` if it was taken.
    fn consume_required_item(&mut self, entity: EntityId) -> bool;
}

/// Periodic environment scan for a production (cooking) station.
pub trait CapabilityProbe {
    fn nearby_production_station_exists(&self, entity: EntityId) -> bool;
}

impl<F> InventoryCollaborator for F
where
    F: FnMut(EntityId) -> bool,
{
    fn consume_required_item(&mut self, entity: EntityId) -> bool {
        self(entity)
    }
}

impl<F> CapabilityProbe for F
where
    F: Fn(EntityId) -> bool,
{
    fn nearby_production_station_exists(&self, entity: EntityId) -> bool {
        self(entity)
    }
}
