use std::{path::Path, sync::Arc};

use agdb::{DbAny, DbError, DbId, QueryBuilder};
use derive_more::Deref;
use parking_lot::RwLock;
use tracing::debug;

use crate::repository::{
    db::models::{CURRENT_MODEL_VERSION, ModelVersion},
    error::StoreError,
};

pub(crate) mod models;

/// Shared handle to the list database.
#[derive(Debug, Clone, Deref)]
pub(crate) struct Db {
    #[deref]
    db: Arc<RwLock<DbAny>>,
}

impl Db {
    /// Open (or create) a file backed database.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StoreError::unavailable(format!("{} is not UTF-8", path.display())))?;

        let db = Self {
            db: Arc::new(RwLock::new(DbAny::new_file(path_str)?)),
        };

        db.init()?;

        debug!("Opened list database at {}", path.display());

        Ok(db)
    }

    /// Create a memory backed database
    pub fn in_memory(name: &str) -> Result<Self, StoreError> {
        let db = Self {
            db: Arc::new(RwLock::new(DbAny::new_memory(name)?)),
        };

        db.init()?;

        Ok(db)
    }

    fn init(&self) -> Result<(), StoreError> {
        let alias_count = self
            .db
            .read()
            .exec(QueryBuilder::select().aliases().query())?
            .result;

        if alias_count == 0 {
            self.db
                .write()
                .transaction_mut(|t| -> Result<(), DbError> {
                    t.exec_mut(
                        QueryBuilder::insert()
                            .nodes()
                            .aliases([
                                // Root element nodes
                                "lists",
                                // State nodes
                                "model_version",
                                "next_uid",
                            ])
                            .query(),
                    )?;

                    // The UID handed to the next inserted list, incremented on every insert
                    t.exec_mut(
                        QueryBuilder::insert()
                            .values([[("next_uid", 0_u64).into()]])
                            .ids("next_uid")
                            .query(),
                    )?;

                    Ok(())
                })?;
        }

        let result = self.db.read().exec(
            QueryBuilder::select()
                .elements::<ModelVersion>()
                .search()
                .from("model_version")
                .where_()
                .neighbor()
                .query(),
        )?;
        let model_version: Vec<ModelVersion> = result.try_into()?;

        match model_version.first() {
            Some(mv) if mv.version() > CURRENT_MODEL_VERSION => {
                return Err(StoreError::unavailable(format!(
                    "database model version {} is newer than supported version {}",
                    mv.version(),
                    CURRENT_MODEL_VERSION
                )));
            }
            Some(_) => {}
            None => {
                self.db
                    .write()
                    .transaction_mut(|t| -> Result<(), StoreError> {
                        let model_version_id = first_id(t.exec_mut(
                            QueryBuilder::insert()
                                .element(ModelVersion::default())
                                .query(),
                        )?)?;

                        t.exec_mut(
                            QueryBuilder::insert()
                                .edges()
                                .from("model_version")
                                .to(model_version_id)
                                .query(),
                        )?;

                        Ok(())
                    })?;
            }
        }

        Ok(())
    }

    /// Write a consistent copy of the database to `path`
    pub fn backup(&self, path: &Path) -> Result<(), StoreError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StoreError::unavailable(format!("{} is not UTF-8", path.display())))?;

        self.db.write().backup(path_str)?;

        debug!("Backed up list database to {}", path.display());

        Ok(())
    }
}

/// The id of the first element of a query result.
pub(crate) fn first_id(result: agdb::QueryResult) -> Result<DbId, StoreError> {
    result
        .elements
        .first()
        .map(|e| e.id)
        .ok_or_else(|| StoreError::Corrupt("insert returned no element".into()))
}
