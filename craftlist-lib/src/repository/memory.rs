use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

use crate::repository::{
    DeleteReport, ListRepository, ListStore, Lists,
    entities::{List, ListId, UserId},
    error::StoreError,
};

/// In-memory list store.
///
/// Cloning shares the underlying data. Failures of the backing medium can be simulated with
/// [`set_unavailable`](Self::set_unavailable) and [`fail_delete`](Self::fail_delete), which
/// makes this store the test double for anything that consumes a [`ListRepository`].
#[derive(Debug, Clone, Default)]
pub struct MemoryListStore {
    lists: Arc<RwLock<HashMap<ListId, List>>>,
    next_uid: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
    undeletable: Arc<Mutex<HashSet<ListId>>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with lists. Each list is assigned a fresh id.
    pub async fn with_lists(lists: impl IntoIterator<Item = List>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.lists.write().await;
            for list in lists {
                let list = store.assign_id(list);
                if let Some(id) = list.id.clone() {
                    stored.insert(id, list);
                }
            }
        }
        store
    }

    /// While set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make deletes of the given list fail until [`clear`](Self::clear) is called.
    pub fn fail_delete(&self, id: &ListId) {
        self.undeletable.lock().insert(id.clone());
    }

    /// Every stored list, in no particular order.
    pub async fn snapshot(&self) -> Vec<List> {
        self.lists.read().await.values().cloned().collect()
    }

    /// Remove all lists and injected failures.
    pub async fn clear(&self) {
        self.lists.write().await.clear();
        self.undeletable.lock().clear();
        self.set_unavailable(false);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }

        Ok(())
    }

    fn is_undeletable(&self, id: &ListId) -> bool {
        self.undeletable.lock().contains(id)
    }

    fn assign_id(&self, list: List) -> List {
        let uid = self.next_uid.fetch_add(1, Ordering::SeqCst);
        let id = ListId::new(format!("mem-{uid}")).ok();
        List { id, ..list }
    }
}

#[async_trait]
impl ListRepository for MemoryListStore {
    async fn find_by_author(&self, author: &UserId) -> Result<Lists, StoreError> {
        self.check_available()?;

        let lists = self.lists.read().await;
        Ok(lists
            .values()
            .filter(|list| &list.author == author)
            .cloned()
            .collect::<Vec<_>>()
            .into())
    }

    async fn delete_by_author(&self, author: &UserId) -> Result<(), StoreError> {
        self.check_available()?;

        let mut lists = self.lists.write().await;
        let owned: Vec<ListId> = lists
            .values()
            .filter(|list| &list.author == author)
            .filter_map(|list| list.id.clone())
            .collect();

        let mut report = DeleteReport::new(author);
        for id in owned {
            if self.is_undeletable(&id) {
                report.failed(id, "list is locked");
            } else {
                lists.remove(&id);
                report.deleted();
            }
        }

        debug!("Removed lists of {author}");

        report.finish()
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn add(&self, list: List) -> Result<List, StoreError> {
        self.check_available()?;

        let list = self.assign_id(list);
        let id = list.id.clone().ok_or(StoreError::Unsaved)?;
        self.lists.write().await.insert(id, list.clone());

        Ok(list)
    }

    async fn get(&self, id: &ListId) -> Result<Option<List>, StoreError> {
        self.check_available()?;

        Ok(self.lists.read().await.get(id).cloned())
    }

    async fn update(&self, list: &List) -> Result<(), StoreError> {
        self.check_available()?;

        let id = list.id.as_ref().ok_or(StoreError::Unsaved)?;
        let mut lists = self.lists.write().await;
        let stored = lists
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        *stored = List {
            created_at: stored.created_at,
            ..list.clone()
        };

        Ok(())
    }

    async fn remove(&self, id: &ListId) -> Result<(), StoreError> {
        self.check_available()?;

        if self.is_undeletable(id) {
            return Err(StoreError::unavailable(format!("list {id} is locked")));
        }

        self.lists
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
