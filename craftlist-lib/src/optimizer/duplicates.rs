use crate::optimizer::{InventoryItem, InventoryOptimizer, Optimization, UserInventory};

/// Finds partial stacks of the same item that could be merged into one.
///
/// Two entries count as duplicates when they hold the same item with the same quality, the
/// other entry carries no spiritbond, they sit in different places, and their combined
/// quantity stays below the item's stack size. Items without a known stack size are never
/// reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Duplicates;

impl InventoryOptimizer for Duplicates {
    fn id(&self) -> &'static str {
        "DUPLICATES"
    }

    fn optimization(
        &self,
        item: &InventoryItem,
        inventory: &UserInventory,
    ) -> Option<Optimization> {
        let stack_size = inventory.stack_sizes.get(item.item_id)?;

        let containers: Vec<String> = inventory
            .iter()
            .filter(|other| !other.container.is_ignored())
            .filter(|other| {
                other.item_id == item.item_id
                    && other.hq == item.hq
                    && other.spirit_bond == 0
                    && !other.same_location(item)
                    && item.quantity.saturating_add(other.quantity) < stack_size
            })
            .map(InventoryItem::location_name)
            .collect();

        if containers.is_empty() {
            return None;
        }

        Some(Optimization {
            optimizer: self.id(),
            item: item.clone(),
            containers,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::optimizer::{ContainerKind, StackSizes, optimize};

    const WIND_SHARD: u32 = 4;

    fn item(container: ContainerKind, slot: u32, quantity: u32) -> InventoryItem {
        InventoryItem {
            item_id: WIND_SHARD,
            quantity,
            hq: false,
            spirit_bond: 0,
            container,
            slot,
            retainer_name: None,
        }
    }

    fn inventory(items: Vec<InventoryItem>) -> UserInventory {
        UserInventory::new(items, [(WIND_SHARD, 999)].into_iter().collect())
    }

    #[test]
    fn test_finds_duplicate_in_other_bag() {
        let inventory = inventory(vec![
            item(ContainerKind::Bag0, 0, 100),
            item(ContainerKind::Bag2, 7, 50),
        ]);
        let first = inventory.items.first().unwrap();

        let optimization = Duplicates.optimization(first, &inventory).unwrap();

        assert_eq!(optimization.optimizer, "DUPLICATES");
        assert_eq!(optimization.containers, vec!["Bag 3"]);
    }

    #[test]
    fn test_lists_retainers_by_name() {
        let mut retained = item(ContainerKind::Retainer, 0, 10);
        retained.retainer_name = Some("Mimi".into());
        let inventory = inventory(vec![
            item(ContainerKind::Bag0, 0, 10),
            retained,
            item(ContainerKind::SaddleBag, 3, 10),
        ]);
        let first = inventory.items.first().unwrap();

        let optimization = Duplicates.optimization(first, &inventory).unwrap();

        assert_eq!(optimization.containers, vec!["Mimi", "Saddlebag"]);
    }

    #[test]
    fn test_full_stacks_are_not_duplicates() {
        let inventory = inventory(vec![
            item(ContainerKind::Bag0, 0, 900),
            item(ContainerKind::Bag1, 0, 99),
        ]);
        let first = inventory.items.first().unwrap();

        assert!(Duplicates.optimization(first, &inventory).is_none());
    }

    #[test]
    fn test_quality_and_spiritbond_must_match() {
        let mut hq = item(ContainerKind::Bag1, 0, 1);
        hq.hq = true;
        let mut bound = item(ContainerKind::Bag1, 1, 1);
        bound.spirit_bond = 40;
        let inventory = inventory(vec![item(ContainerKind::Bag0, 0, 1), hq, bound]);
        let first = inventory.items.first().unwrap();

        assert!(Duplicates.optimization(first, &inventory).is_none());
    }

    #[test]
    fn test_same_slot_in_other_container_is_duplicate() {
        let inventory = inventory(vec![
            item(ContainerKind::Bag0, 5, 1),
            item(ContainerKind::Bag1, 5, 1),
        ]);
        let first = inventory.items.first().unwrap();

        assert!(Duplicates.optimization(first, &inventory).is_some());
    }

    #[test]
    fn test_ignored_containers_and_unknown_stack_sizes() {
        let inventory = inventory(vec![
            item(ContainerKind::Bag0, 0, 1),
            item(ContainerKind::Crystals, 0, 1),
        ]);
        let first = inventory.items.first().unwrap();
        assert!(Duplicates.optimization(first, &inventory).is_none());

        let unknown = UserInventory::new(
            vec![
                item(ContainerKind::Bag0, 0, 1),
                item(ContainerKind::Bag1, 0, 1),
            ],
            StackSizes::default(),
        );
        let first = unknown.items.first().unwrap();
        assert!(Duplicates.optimization(first, &unknown).is_none());
    }

    #[test]
    fn test_optimize_reports_each_side() {
        let inventory = inventory(vec![
            item(ContainerKind::Bag0, 0, 1),
            item(ContainerKind::Bag1, 0, 1),
        ]);

        assert_eq!(optimize(&[&Duplicates], &inventory).len(), 2);
    }
}
