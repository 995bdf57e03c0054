use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use strum::{Display, EnumIter};

use crate::Result;

/// Where an inventory item is kept.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    #[strum(to_string = "Bag 1")]
    Bag0,
    #[strum(to_string = "Bag 2")]
    Bag1,
    #[strum(to_string = "Bag 3")]
    Bag2,
    #[strum(to_string = "Bag 4")]
    Bag3,
    #[strum(to_string = "Saddlebag")]
    SaddleBag,
    #[strum(to_string = "Premium saddlebag")]
    PremiumSaddleBag,
    #[strum(to_string = "Armoury chest")]
    Armoury,
    #[strum(to_string = "Retainer")]
    Retainer,
    #[strum(to_string = "Equipped gear")]
    EquippedGear,
    #[strum(to_string = "Currency")]
    Currency,
    #[strum(to_string = "Crystals")]
    Crystals,
    #[strum(to_string = "Retainer crystals")]
    RetainerCrystals,
    #[strum(to_string = "Retainer market")]
    RetainerMarket,
}

impl ContainerKind {
    /// Containers whose contents are never worth rearranging.
    pub fn is_ignored(self) -> bool {
        matches!(
            self,
            Self::EquippedGear
                | Self::Currency
                | Self::Crystals
                | Self::RetainerCrystals
                | Self::RetainerMarket
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryItem {
    pub item_id: u32,
    pub quantity: u32,
    #[serde(default)]
    pub hq: bool,
    /// Spiritbond progress; anything above zero is bound to its owner's gear routine
    #[serde(default)]
    pub spirit_bond: u32,
    pub container: ContainerKind,
    pub slot: u32,
    /// Set when the item sits with a retainer
    #[serde(default)]
    pub retainer_name: Option<String>,
}

impl InventoryItem {
    /// Whether both entries occupy the same physical slot.
    pub fn same_location(&self, other: &InventoryItem) -> bool {
        self.container == other.container
            && self.slot == other.slot
            && self.retainer_name == other.retainer_name
    }

    /// Human readable place this item is kept in.
    pub fn location_name(&self) -> String {
        match self.retainer_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => self.container.to_string(),
        }
    }
}

/// One entry of the stack size table as written in inventory files.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StackSize {
    pub item_id: u32,
    pub size: u32,
}

/// Maximum stack size per item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<StackSize>")]
pub struct StackSizes(HashMap<u32, u32>);

impl StackSizes {
    pub fn get(&self, item_id: u32) -> Option<u32> {
        self.0.get(&item_id).copied()
    }

    pub fn insert(&mut self, item_id: u32, size: u32) {
        self.0.insert(item_id, size);
    }
}

impl From<Vec<StackSize>> for StackSizes {
    fn from(entries: Vec<StackSize>) -> Self {
        entries.into_iter().map(|e| (e.item_id, e.size)).collect()
    }
}

impl FromIterator<(u32, u32)> for StackSizes {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything a user owns, together with the stack sizes of those items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserInventory {
    #[serde(default)]
    pub items: Vec<InventoryItem>,
    #[serde(default)]
    pub stack_sizes: StackSizes,
}

impl UserInventory {
    pub fn new(items: Vec<InventoryItem>, stack_sizes: StackSizes) -> Self {
        Self { items, stack_sizes }
    }

    /// Read an inventory from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.iter()
    }
}
