use agdb::DbError;
use thiserror::Error;

use crate::repository::entities::{ListId, UserId};

/// Errors produced by list stores.
///
/// [`ListRepository`](super::ListRepository) operations only ever fail with
/// [`StoreError::Unavailable`] or [`StoreError::PartialDelete`]; the remaining variants belong
/// to the single-list operations of [`ListStore`](super::ListStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be reached. Retrying may succeed.
    #[error("List store is unavailable: {reason}")]
    Unavailable { reason: String },
    /// A bulk delete removed some but not all of an author's lists.
    #[error(
        "Removed {deleted} list(s) of author {author} but {} remain: {}",
        .remaining.len(),
        join_ids(.remaining)
    )]
    PartialDelete {
        author: UserId,
        deleted: usize,
        remaining: Vec<ListId>,
    },
    #[error("List {0} does not exist")]
    NotFound(ListId),
    #[error("List has not been added to a store yet")]
    Unsaved,
    #[error("Stored list data is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(reason: impl ToString) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Narrow an error to the kinds [`ListRepository`](super::ListRepository) operations report.
    /// Anything else means the store could not serve the request.
    pub(crate) fn for_repository(self) -> Self {
        match self {
            Self::Unavailable { .. } | Self::PartialDelete { .. } => self,
            other => Self::unavailable(other),
        }
    }

    /// Whether the failed operation may succeed when issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::PartialDelete { .. })
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::unavailable(err)
    }
}

fn join_ids(ids: &[ListId]) -> String {
    ids.iter()
        .map(ListId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
