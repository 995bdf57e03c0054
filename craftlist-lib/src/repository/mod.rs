//! Persistence for lists.
//!
//! [`ListRepository`] is the author-scoped contract the rest of the application talks to.
//! [`ListStore`] adds the single-list operations every backend also offers. Two backends are
//! provided: [`GraphListStore`] on an embedded graph database, and [`MemoryListStore`] for
//! tests and ephemeral use.

use async_trait::async_trait;

mod db;
mod entities;
mod error;
mod graph;
mod memory;

pub use entities::{InvalidId, List, ListId, ListRow, UserId};
pub use error::StoreError;
pub use graph::GraphListStore;
pub use memory::MemoryListStore;

/// Author-scoped access to persisted lists.
///
/// Concurrent calls for the same author are not ordered with respect to each other: a
/// [`find_by_author`](Self::find_by_author) racing a
/// [`delete_by_author`](Self::delete_by_author) may observe either state. Go through
/// [`ListService`](crate::ListService) when a consistent view is needed.
#[async_trait]
pub trait ListRepository: Send + Sync {
    /// Every list currently owned by `author`. An author without lists yields an empty
    /// sequence.
    ///
    /// Fails only with [`StoreError::Unavailable`].
    async fn find_by_author(&self, author: &UserId) -> Result<Lists, StoreError>;

    /// Delete every list owned by `author`.
    ///
    /// Succeeds trivially when the author owns nothing. The lists are removed one at a time, so
    /// a failure midway yields [`StoreError::PartialDelete`] naming the lists that remain. If
    /// nothing could be removed the error is [`StoreError::Unavailable`].
    async fn delete_by_author(&self, author: &UserId) -> Result<(), StoreError>;
}

/// Full list storage: the author-scoped operations plus single-list CRUD.
#[async_trait]
pub trait ListStore: ListRepository {
    /// Persist a new list. The store assigns a fresh id, replacing any the list carried.
    async fn add(&self, list: List) -> Result<List, StoreError>;

    async fn get(&self, id: &ListId) -> Result<Option<List>, StoreError>;

    /// Replace the stored name, author, visibility and rows of an existing list.
    async fn update(&self, list: &List) -> Result<(), StoreError>;

    /// Remove one list together with its rows.
    async fn remove(&self, id: &ListId) -> Result<(), StoreError>;
}

/// The lists returned by [`ListRepository::find_by_author`].
///
/// A finite sequence that is consumed as it is read.
#[derive(Debug)]
pub struct Lists {
    inner: std::vec::IntoIter<List>,
}

impl Lists {
    pub fn empty() -> Self {
        Vec::new().into()
    }
}

impl From<Vec<List>> for Lists {
    fn from(lists: Vec<List>) -> Self {
        Self {
            inner: lists.into_iter(),
        }
    }
}

impl Iterator for Lists {
    type Item = List;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Lists {}

/// Outcome bookkeeping shared by the stores' bulk deletes.
#[derive(Debug)]
pub(crate) struct DeleteReport {
    author: UserId,
    deleted: usize,
    remaining: Vec<ListId>,
    first_failure: Option<String>,
}

impl DeleteReport {
    pub(crate) fn new(author: &UserId) -> Self {
        Self {
            author: author.clone(),
            deleted: 0,
            remaining: Vec::new(),
            first_failure: None,
        }
    }

    pub(crate) fn deleted(&mut self) {
        self.deleted = self.deleted.saturating_add(1);
    }

    pub(crate) fn failed(&mut self, id: ListId, reason: impl ToString) {
        if self.first_failure.is_none() {
            self.first_failure = Some(reason.to_string());
        }
        self.remaining.push(id);
    }

    pub(crate) fn finish(self) -> Result<(), StoreError> {
        if self.remaining.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            "Bulk delete for {} left {} list(s) behind",
            self.author,
            self.remaining.len()
        );

        if self.deleted == 0 {
            return Err(StoreError::unavailable(
                self.first_failure
                    .unwrap_or_else(|| "no list could be removed".into()),
            ));
        }

        Err(StoreError::PartialDelete {
            author: self.author,
            deleted: self.deleted,
            remaining: self.remaining,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn id(s: &str) -> ListId {
        ListId::new(s).unwrap()
    }

    #[test]
    fn test_lists_is_consumed() {
        let author = UserId::new("u1").unwrap();
        let mut lists: Lists = vec![List::new("a", author.clone()), List::new("b", author)].into();

        assert_eq!(lists.len(), 2);
        assert_eq!(lists.next().unwrap().name, "a");
        assert_eq!(lists.len(), 1);
        assert_eq!(lists.next().unwrap().name, "b");
        assert!(lists.next().is_none());
        assert_eq!(Lists::empty().count(), 0);
    }

    #[test]
    fn test_report_all_deleted() {
        let mut report = DeleteReport::new(&UserId::new("u1").unwrap());
        report.deleted();
        report.deleted();

        assert!(report.finish().is_ok());
    }

    #[test]
    fn test_report_partial() {
        let mut report = DeleteReport::new(&UserId::new("u1").unwrap());
        report.deleted();
        report.failed(id("2"), "locked");

        match report.finish() {
            Err(StoreError::PartialDelete {
                deleted, remaining, ..
            }) => {
                assert_eq!(deleted, 1);
                assert_eq!(remaining, vec![id("2")]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_report_nothing_deleted_is_unavailable() {
        let mut report = DeleteReport::new(&UserId::new("u1").unwrap());
        report.failed(id("1"), "disk gone");
        report.failed(id("2"), "still gone");

        match report.finish() {
            Err(StoreError::Unavailable { reason }) => assert_eq!(reason, "disk gone"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
