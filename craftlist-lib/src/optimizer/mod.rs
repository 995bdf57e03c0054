//! Inventory optimizations.
//!
//! An [`InventoryOptimizer`] looks at one item of a [`UserInventory`] at a time and suggests
//! a way to free up space. Items in ignored containers (see [`ContainerKind::is_ignored`]) are
//! never considered.

mod duplicates;
mod inventory;

pub use duplicates::Duplicates;
pub use inventory::{ContainerKind, InventoryItem, StackSize, StackSizes, UserInventory};

/// A suggestion produced by an optimizer for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimization {
    /// Id of the optimizer that produced this suggestion
    pub optimizer: &'static str,
    pub item: InventoryItem,
    /// Places holding the entries the suggestion refers to
    pub containers: Vec<String>,
}

pub trait InventoryOptimizer {
    fn id(&self) -> &'static str;

    /// Check a single item. Only called for items outside ignored containers.
    fn optimization(&self, item: &InventoryItem, inventory: &UserInventory)
    -> Option<Optimization>;
}

/// Run every optimizer over every eligible item of the inventory.
pub fn optimize(
    optimizers: &[&dyn InventoryOptimizer],
    inventory: &UserInventory,
) -> Vec<Optimization> {
    inventory
        .iter()
        .filter(|item| !item.container.is_ignored())
        .flat_map(|item| {
            optimizers
                .iter()
                .filter_map(move |optimizer| optimizer.optimization(item, inventory))
        })
        .collect()
}
