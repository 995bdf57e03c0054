use agdb::{DbId, DbType};

use crate::repository::{
    entities::{List, ListRow},
    error::StoreError,
};

pub(crate) const CURRENT_MODEL_VERSION: u64 = 1;

#[derive(Debug, Clone, DbType, PartialEq, PartialOrd)]
pub(crate) struct ModelVersion {
    db_id: Option<DbId>,
    version: u64,
}

impl ModelVersion {
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Default for ModelVersion {
    fn default() -> Self {
        Self {
            db_id: None,
            version: CURRENT_MODEL_VERSION,
        }
    }
}

#[derive(Debug, Clone, DbType, PartialEq, PartialOrd)]
pub(crate) struct ListModel {
    pub(crate) db_id: Option<DbId>,
    /// Never reused, even after the list is removed
    pub(crate) uid: u64,
    pub(crate) name: String,
    pub(crate) author: String,
    /// Milliseconds since the Unix epoch
    pub(crate) created_at: i64,
    pub(crate) public: bool,
}

impl ListModel {
    pub fn new(uid: u64, list: &List) -> Self {
        Self {
            db_id: None,
            uid,
            name: list.name.clone(),
            author: list.author.to_string(),
            created_at: list.created_at.timestamp_millis(),
            public: list.public,
        }
    }
}

#[derive(Debug, Clone, DbType, PartialEq, PartialOrd)]
pub(crate) struct ListRowModel {
    pub(crate) db_id: Option<DbId>,
    /// Index of the row within its list
    pub(crate) position: u64,
    pub(crate) item_id: u64,
    pub(crate) amount: u64,
    pub(crate) done: u64,
}

impl ListRowModel {
    pub fn new(position: usize, row: &ListRow) -> Self {
        Self {
            db_id: None,
            position: u64::try_from(position).unwrap_or(u64::MAX),
            item_id: u64::from(row.item_id),
            amount: u64::from(row.amount),
            done: u64::from(row.done),
        }
    }
}

impl TryFrom<&ListRowModel> for ListRow {
    type Error = StoreError;

    fn try_from(model: &ListRowModel) -> Result<Self, Self::Error> {
        let narrow = |field: &str, value: u64| {
            u32::try_from(value)
                .map_err(|_| StoreError::Corrupt(format!("{field} {value} is out of range")))
        };

        Ok(Self {
            item_id: narrow("item_id", model.item_id)?,
            amount: narrow("amount", model.amount)?,
            done: narrow("done", model.done)?,
        })
    }
}
