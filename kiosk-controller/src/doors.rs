//! Table-to-door mapping

/// Maps a table number to the robot compartment door serving it.
///
/// Injected so venues with a real wiring table can swap the policy without
/// touching the staging workflow.
pub trait DoorPolicy: Send + Sync {
    fn door_for(&self, table: u32) -> u32;
}

/// Placeholder policy: table N is served by door N
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityDoors;

impl DoorPolicy for IdentityDoors {
    fn door_for(&self, table: u32) -> u32 {
        table
    }
}
