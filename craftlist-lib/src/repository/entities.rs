//! Core domain entities for craftlist.
//!
//! A [`List`] is a named collection of [`ListRow`]s owned by exactly one author. Lists are
//! plain values: stores hand out copies and take them back through
//! [`ListStore::update`](super::ListStore::update).

use chrono::{DateTime, SubsecRound, Utc};
use derive_more::{AsRef, Deref, Display};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identifiers must not be empty")]
pub struct InvalidId;

/// Opaque identifier of a user who owns lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRef, Deref)]
#[as_ref(forward)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidId> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidId);
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for UserId {
    type Error = InvalidId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Opaque identifier of a persisted list, assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRef, Deref)]
#[as_ref(forward)]
pub struct ListId(String);

impl ListId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidId> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidId);
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_uid(uid: u64) -> Self {
        Self(uid.to_string())
    }
}

impl TryFrom<&str> for ListId {
    type Error = InvalidId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A single item entry of a [`List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRow {
    pub item_id: u32,
    /// How many of the item are wanted
    pub amount: u32,
    /// How many have been obtained so far, never above `amount`
    pub done: u32,
}

impl ListRow {
    pub fn new(item_id: u32, amount: u32) -> Self {
        Self {
            item_id,
            amount,
            done: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.done >= self.amount
    }
}

/// A named, user-owned collection of items.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub(crate) id: Option<ListId>,
    pub name: String,
    pub author: UserId,
    pub(crate) created_at: DateTime<Utc>,
    pub public: bool,
    pub(crate) items: Vec<ListRow>,
}

impl List {
    /// Create a fresh, unsaved list.
    pub fn new(name: &str, author: UserId) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            author,
            // Stores keep millisecond precision
            created_at: Utc::now().trunc_subsecs(3),
            public: false,
            items: Vec::new(),
        }
    }

    /// The store-assigned id, `None` until the list has been added to a store.
    pub fn id(&self) -> Option<&ListId> {
        self.id.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn items(&self) -> &[ListRow] {
        &self.items
    }

    /// Add `amount` of an item, merging into the existing row for that item if present.
    pub fn add_item(&mut self, item_id: u32, amount: u32) {
        if amount == 0 {
            return;
        }

        match self.items.iter_mut().find(|row| row.item_id == item_id) {
            Some(row) => row.amount = row.amount.saturating_add(amount),
            None => self.items.push(ListRow::new(item_id, amount)),
        }
    }

    /// Record progress on an item. The value is clamped to the row's amount.
    pub fn set_done(&mut self, item_id: u32, done: u32) -> bool {
        match self.items.iter_mut().find(|row| row.item_id == item_id) {
            Some(row) => {
                row.done = done.min(row.amount);
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, item_id: u32) -> bool {
        let before = self.items.len();
        self.items.retain(|row| row.item_id != item_id);
        self.items.len() != before
    }

    pub fn is_complete(&self) -> bool {
        self.items.iter().all(ListRow::is_complete)
    }

    /// Two handles refer to the same list when both the id and the creation time match.
    pub fn is_same_list(&self, other: &List) -> bool {
        self.id.is_some() && self.id == other.id && self.created_at == other.created_at
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn author() -> UserId {
        UserId::new("u1").unwrap()
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert_eq!(UserId::new(""), Err(InvalidId));
        assert_eq!(UserId::new("   "), Err(InvalidId));
        assert_eq!(ListId::try_from(""), Err(InvalidId));
        assert_eq!(UserId::new("u1").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_new_list_is_unsaved() {
        let list = List::new("Gathering", author());

        assert!(!list.is_saved());
        assert!(list.items().is_empty());
        assert!(list.is_complete());
    }

    #[test]
    fn test_add_item_merges() {
        let mut list = List::new("Crafting", author());

        list.add_item(5057, 3);
        list.add_item(5111, 1);
        list.add_item(5057, 2);
        list.add_item(9999, 0);

        assert_eq!(
            list.items(),
            &[ListRow::new(5057, 5), ListRow::new(5111, 1)]
        );
    }

    #[test]
    fn test_set_done_clamps() {
        let mut list = List::new("Crafting", author());
        list.add_item(5057, 3);

        assert!(list.set_done(5057, 10));
        assert_eq!(list.items().first().unwrap().done, 3);
        assert!(list.is_complete());
        assert!(!list.set_done(1, 1));
    }

    #[test]
    fn test_remove_item() {
        let mut list = List::new("Crafting", author());
        list.add_item(5057, 3);

        assert!(list.remove_item(5057));
        assert!(!list.remove_item(5057));
        assert!(list.items().is_empty());
    }

    #[test]
    fn test_unsaved_lists_are_never_the_same() {
        let list = List::new("Crafting", author());

        assert!(!list.is_same_list(&list.clone()));

        let mut saved = list.clone();
        saved.id = Some(ListId::new("1").unwrap());

        assert!(saved.is_same_list(&saved.clone()));
    }
}
