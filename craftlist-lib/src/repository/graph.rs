use std::path::Path;

use agdb::{
    Comparison, DbAny, DbAnyTransactionMut, DbError, DbId, Query, QueryBuilder, QueryResult,
};
use async_trait::async_trait;
use chrono::DateTime;
use tracing::debug;

use crate::repository::{
    DeleteReport, ListRepository, ListStore, Lists,
    db::{
        Db, first_id,
        models::{ListModel, ListRowModel},
    },
    entities::{List, ListId, ListRow, UserId},
    error::StoreError,
};

/// List store backed by an embedded graph database.
///
/// Every list is a node hanging off the `lists` root node, and each of its rows is a node
/// hanging off the list. Ids are the decimal form of a per-database counter, so an id is never
/// handed out twice.
#[derive(Debug, Clone)]
pub struct GraphListStore {
    db: Db,
}

impl GraphListStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self { db: Db::open(path)? })
    }

    /// Create a store whose data lives only as long as the store does.
    pub fn in_memory(name: &str) -> Result<Self, StoreError> {
        Ok(Self {
            db: Db::in_memory(name)?,
        })
    }

    pub async fn backup(&self, path: &Path) -> Result<(), StoreError> {
        let db = self.db.clone();
        let path = path.to_path_buf();
        blocking(move || db.backup(&path)).await
    }
}

#[async_trait]
impl ListRepository for GraphListStore {
    async fn find_by_author(&self, author: &UserId) -> Result<Lists, StoreError> {
        let db = self.db.clone();
        let author = author.clone();
        blocking(move || Ok(query::by_author(&db, &author)?.into()))
            .await
            .map_err(StoreError::for_repository)
    }

    async fn delete_by_author(&self, author: &UserId) -> Result<(), StoreError> {
        let db = self.db.clone();
        let author = author.clone();
        blocking(move || {
            let uids = query::uids_by_author(&db, &author)?;
            let mut report = DeleteReport::new(&author);

            for uid in uids {
                // A list someone else removed in the meantime is gone all the same
                match query::remove(&db, uid) {
                    Ok(_) => report.deleted(),
                    Err(err) => report.failed(ListId::from_uid(uid), err),
                }
            }

            debug!("Removed lists of {author}");

            report.finish()
        })
        .await
        .map_err(StoreError::for_repository)
    }
}

#[async_trait]
impl ListStore for GraphListStore {
    async fn add(&self, list: List) -> Result<List, StoreError> {
        let db = self.db.clone();
        blocking(move || {
            let uid = query::insert(&db, &list)?;
            debug!("Added list {uid}: {}", list.name);
            Ok(List {
                id: Some(ListId::from_uid(uid)),
                ..list
            })
        })
        .await
    }

    async fn get(&self, id: &ListId) -> Result<Option<List>, StoreError> {
        let Some(uid) = parse_uid(id) else {
            return Ok(None);
        };
        let db = self.db.clone();
        blocking(move || query::get(&db, uid)).await
    }

    async fn update(&self, list: &List) -> Result<(), StoreError> {
        let id = list.id.clone().ok_or(StoreError::Unsaved)?;
        let uid = parse_uid(&id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let db = self.db.clone();
        let list = list.clone();
        blocking(move || {
            if !query::replace(&db, uid, &list)? {
                return Err(StoreError::NotFound(id));
            }
            debug!("Updated list {id}");
            Ok(())
        })
        .await
    }

    async fn remove(&self, id: &ListId) -> Result<(), StoreError> {
        let uid = parse_uid(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let db = self.db.clone();
        let id = id.clone();
        blocking(move || {
            if !query::remove(&db, uid)? {
                return Err(StoreError::NotFound(id));
            }
            debug!("Removed list {id}");
            Ok(())
        })
        .await
    }
}

/// Run a database operation on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(StoreError::unavailable)?
}

fn parse_uid(id: &ListId) -> Option<u64> {
    id.as_str().parse().ok()
}

/// Synchronous queries against the database. Callers are expected to be on the blocking pool.
///
/// Anything that reads a list and then changes it does both inside one write transaction, so a
/// concurrent writer can never swap the rows out in between.
mod query {
    use super::*;

    /// Read access shared by plain reads and write transactions.
    pub(super) trait Reader {
        fn run<Q: Query>(&self, query: Q) -> Result<QueryResult, DbError>;
    }

    impl Reader for DbAny {
        fn run<Q: Query>(&self, query: Q) -> Result<QueryResult, DbError> {
            self.exec(query)
        }
    }

    impl Reader for DbAnyTransactionMut<'_> {
        fn run<Q: Query>(&self, query: Q) -> Result<QueryResult, DbError> {
            self.exec(query)
        }
    }

    fn list_nodes(r: &impl Reader, author: &UserId) -> Result<Vec<ListModel>, StoreError> {
        Ok(r.run(
            QueryBuilder::select()
                .elements::<ListModel>()
                .search()
                .from("lists")
                .where_()
                .neighbor()
                .and()
                .key("author")
                .value(Comparison::Equal(author.as_str().into()))
                .query(),
        )?
        .try_into()?)
    }

    fn find(r: &impl Reader, uid: u64) -> Result<Option<ListModel>, StoreError> {
        let models: Vec<ListModel> = r
            .run(
                QueryBuilder::select()
                    .elements::<ListModel>()
                    .search()
                    .from("lists")
                    .where_()
                    .neighbor()
                    .and()
                    .key("uid")
                    .value(Comparison::Equal(uid.into()))
                    .query(),
            )?
            .try_into()?;

        Ok(models.into_iter().next())
    }

    fn rows(r: &impl Reader, list_db_id: DbId) -> Result<Vec<ListRowModel>, StoreError> {
        let mut rows: Vec<ListRowModel> = r
            .run(
                QueryBuilder::select()
                    .elements::<ListRowModel>()
                    .search()
                    .from(list_db_id)
                    .where_()
                    .neighbor()
                    .query(),
            )?
            .try_into()?;

        rows.sort_by_key(|row| row.position);

        Ok(rows)
    }

    fn row_ids(r: &impl Reader, list_db_id: DbId) -> Result<Vec<DbId>, StoreError> {
        Ok(rows(r, list_db_id)?
            .iter()
            .filter_map(|row| row.db_id)
            .collect())
    }

    fn load(r: &impl Reader, model: ListModel) -> Result<List, StoreError> {
        let db_id = model
            .db_id
            .ok_or_else(|| StoreError::Corrupt(format!("list {} has no node id", model.uid)))?;

        let items = rows(r, db_id)?
            .iter()
            .map(ListRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let author = UserId::new(model.author)
            .map_err(|_| StoreError::Corrupt(format!("list {} has no author", model.uid)))?;
        let created_at = DateTime::from_timestamp_millis(model.created_at).ok_or_else(|| {
            StoreError::Corrupt(format!("list {} has an invalid creation time", model.uid))
        })?;

        Ok(List {
            id: Some(ListId::from_uid(model.uid)),
            name: model.name,
            author,
            created_at,
            public: model.public,
            items,
        })
    }

    /// Every list owned by `author`, read under a single lock.
    pub(super) fn by_author(db: &Db, author: &UserId) -> Result<Vec<List>, StoreError> {
        let db = db.read();
        list_nodes(&*db, author)?
            .into_iter()
            .map(|model| load(&*db, model))
            .collect()
    }

    pub(super) fn uids_by_author(db: &Db, author: &UserId) -> Result<Vec<u64>, StoreError> {
        Ok(list_nodes(&*db.read(), author)?
            .into_iter()
            .map(|model| model.uid)
            .collect())
    }

    pub(super) fn get(db: &Db, uid: u64) -> Result<Option<List>, StoreError> {
        let db = db.read();
        find(&*db, uid)?.map(|model| load(&*db, model)).transpose()
    }

    /// Insert a list and its rows, returning the allocated UID.
    pub(super) fn insert(db: &Db, list: &List) -> Result<u64, StoreError> {
        db.write().transaction_mut(|t| -> Result<u64, StoreError> {
            let uid = t
                .exec(
                    QueryBuilder::select()
                        .values("next_uid")
                        .ids("next_uid")
                        .query(),
                )?
                .elements
                .pop()
                .and_then(|mut e| e.values.pop())
                .ok_or_else(|| StoreError::Corrupt("missing UID counter".into()))?
                .value
                .to_u64()?;
            t.exec_mut(
                QueryBuilder::insert()
                    .values([[("next_uid", uid.saturating_add(1)).into()]])
                    .ids("next_uid")
                    .query(),
            )?;

            let list_db_id = first_id(
                t.exec_mut(
                    QueryBuilder::insert()
                        .element(ListModel::new(uid, list))
                        .query(),
                )?,
            )?;
            t.exec_mut(
                QueryBuilder::insert()
                    .edges()
                    .from("lists")
                    .to(list_db_id)
                    .query(),
            )?;

            insert_rows(t, list_db_id, list)?;

            Ok(uid)
        })
    }

    fn insert_rows(
        t: &mut DbAnyTransactionMut<'_>,
        list_db_id: DbId,
        list: &List,
    ) -> Result<(), StoreError> {
        for (position, row) in list.items.iter().enumerate() {
            let row_id = first_id(
                t.exec_mut(
                    QueryBuilder::insert()
                        .element(ListRowModel::new(position, row))
                        .query(),
                )?,
            )?;
            t.exec_mut(
                QueryBuilder::insert()
                    .edges()
                    .from(list_db_id)
                    .to(row_id)
                    .query(),
            )?;
        }

        Ok(())
    }

    /// Overwrite the fields and rows of the list with `uid`. Returns `false` when there is no
    /// such list.
    pub(super) fn replace(db: &Db, uid: u64, list: &List) -> Result<bool, StoreError> {
        db.write().transaction_mut(|t| -> Result<bool, StoreError> {
            let Some(list_db_id) = find(&*t, uid)?.and_then(|model| model.db_id) else {
                return Ok(false);
            };
            let old_rows = row_ids(&*t, list_db_id)?;

            t.exec_mut(
                QueryBuilder::insert()
                    .values([[
                        ("name", list.name.clone()).into(),
                        ("author", list.author.to_string()).into(),
                        ("public", list.public).into(),
                    ]])
                    .ids(list_db_id)
                    .query(),
            )?;

            if !old_rows.is_empty() {
                t.exec_mut(QueryBuilder::remove().ids(old_rows).query())?;
            }

            insert_rows(t, list_db_id, list)?;

            Ok(true)
        })
    }

    /// Remove the list with `uid` and every row node attached to it. Returns `false` when there
    /// is no such list.
    pub(super) fn remove(db: &Db, uid: u64) -> Result<bool, StoreError> {
        db.write().transaction_mut(|t| -> Result<bool, StoreError> {
            let Some(list_db_id) = find(&*t, uid)?.and_then(|model| model.db_id) else {
                return Ok(false);
            };
            let mut ids = row_ids(&*t, list_db_id)?;
            ids.push(list_db_id);

            t.exec_mut(QueryBuilder::remove().ids(ids).query())?;

            Ok(true)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn author(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn store() -> GraphListStore {
        GraphListStore::in_memory("test").unwrap()
    }

    async fn add(store: &GraphListStore, name: &str, owner: &str) -> List {
        let mut list = List::new(name, author(owner));
        list.add_item(5057, 3);
        list.add_item(5111, 1);
        store.add(list).await.unwrap()
    }

    fn node_count(store: &GraphListStore) -> u64 {
        store
            .db
            .read()
            .exec(QueryBuilder::select().node_count().query())
            .unwrap()
            .elements
            .first()
            .unwrap()
            .values
            .first()
            .unwrap()
            .value
            .to_u64()
            .unwrap()
    }

    fn names(lists: Lists) -> Vec<String> {
        let mut names: Vec<String> = lists.map(|l| l.name).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_find_by_author_without_lists() {
        let store = store();

        assert_eq!(store.find_by_author(&author("u1")).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_find_and_delete_by_author() {
        let store = store();
        add(&store, "L1", "u1").await;
        add(&store, "L2", "u1").await;
        add(&store, "Other", "u2").await;

        let found = store.find_by_author(&author("u1")).await.unwrap();
        assert_eq!(names(found), vec!["L1", "L2"]);

        store.delete_by_author(&author("u1")).await.unwrap();

        assert_eq!(store.find_by_author(&author("u1")).await.unwrap().len(), 0);
        assert_eq!(
            names(store.find_by_author(&author("u2")).await.unwrap()),
            vec!["Other"]
        );

        // Deleting an author that owns nothing succeeds
        store.delete_by_author(&author("u1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_is_read_only() {
        let store = store();
        add(&store, "L1", "u1").await;

        let first: Vec<List> = store.find_by_author(&author("u1")).await.unwrap().collect();
        let second: Vec<List> = store.find_by_author(&author("u1")).await.unwrap().collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_add_assigns_unique_ids() {
        let store = store();
        let a = add(&store, "A", "u1").await;
        let b = add(&store, "B", "u1").await;

        assert!(a.is_saved());
        assert_ne!(a.id(), b.id());

        store.remove(a.id().unwrap()).await.unwrap();
        let c = add(&store, "C", "u1").await;

        // Ids are never reused
        assert_ne!(a.id(), c.id());
        assert_ne!(b.id(), c.id());
    }

    #[tokio::test]
    async fn test_get_round_trip() {
        let store = store();
        let list = add(&store, "Round trip", "u1").await;

        let loaded = store.get(list.id().unwrap()).await.unwrap().unwrap();

        assert_eq!(loaded, list);
        assert!(loaded.is_same_list(&list));
        assert_eq!(
            loaded.items(),
            &[ListRow::new(5057, 3), ListRow::new(5111, 1)]
        );
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = store();

        assert!(
            store
                .get(&ListId::new("42").unwrap())
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .get(&ListId::new("not-a-number").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_update() {
        let store = store();
        let mut list = add(&store, "Before", "u1").await;

        list.name = "After".into();
        list.public = true;
        list.set_done(5057, 2);
        list.remove_item(5111);
        list.add_item(7, 9);
        store.update(&list).await.unwrap();

        let loaded = store.get(list.id().unwrap()).await.unwrap().unwrap();
        assert_eq!(loaded.name, "After");
        assert!(loaded.public);
        assert_eq!(
            loaded.items(),
            &[
                ListRow {
                    item_id: 5057,
                    amount: 3,
                    done: 2
                },
                ListRow::new(7, 9)
            ]
        );
    }

    #[tokio::test]
    async fn test_update_moves_ownership() {
        let store = store();
        let mut list = add(&store, "Handed over", "u1").await;

        list.author = author("u2");
        store.update(&list).await.unwrap();

        assert_eq!(store.find_by_author(&author("u1")).await.unwrap().len(), 0);
        assert_eq!(store.find_by_author(&author("u2")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unsaved() {
        let store = store();
        let list = List::new("Never added", author("u1"));

        assert!(matches!(
            store.update(&list).await,
            Err(StoreError::Unsaved)
        ));
    }

    #[tokio::test]
    async fn test_remove_missing() {
        let store = store();

        assert!(matches!(
            store.remove(&ListId::new("3").unwrap()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_backed_persists_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists.db");

        {
            let store = GraphListStore::open(&path).unwrap();
            add(&store, "Persisted", "u1").await;
            store.backup(&dir.path().join("lists.db.bak")).await.unwrap();
        }

        let reopened = GraphListStore::open(&path).unwrap();
        assert_eq!(
            names(reopened.find_by_author(&author("u1")).await.unwrap()),
            vec!["Persisted"]
        );
        assert!(dir.path().join("lists.db.bak").exists());

        let added = add(&reopened, "Second", "u1").await;
        assert_eq!(added.id().unwrap().as_str(), "1");
    }

    #[tokio::test]
    async fn test_remove_and_delete_leave_no_row_nodes() {
        let store = store();
        let empty = node_count(&store);

        let first = add(&store, "L1", "u1").await;
        add(&store, "L2", "u1").await;
        add(&store, "L3", "u1").await;
        assert!(node_count(&store) > empty);

        store.remove(first.id().unwrap()).await.unwrap();
        store.delete_by_author(&author("u1")).await.unwrap();

        assert_eq!(node_count(&store), empty);
    }

    #[tokio::test]
    async fn test_update_racing_delete_leaves_no_row_nodes() {
        let store = store();
        let empty = node_count(&store);

        for _ in 0..50 {
            let mut list = List::new("Big", author("u1"));
            for item in 0..400 {
                list.add_item(item, 1);
            }
            let mut changed = store.add(list).await.unwrap();
            changed.add_item(9999, 1);

            let u1 = author("u1");
            let (updated, deleted) = tokio::join!(
                store.update(&changed),
                store.delete_by_author(&u1)
            );

            deleted.unwrap();
            assert!(matches!(updated, Ok(()) | Err(StoreError::NotFound(_))));
            assert_eq!(store.find_by_author(&author("u1")).await.unwrap().len(), 0);
            assert_eq!(node_count(&store), empty);
        }
    }

    #[tokio::test]
    async fn test_corrupt_list_reports_unavailable() {
        let store = store();
        store
            .db
            .write()
            .transaction_mut(|t| -> Result<(), StoreError> {
                let list_db_id = first_id(
                    t.exec_mut(
                        QueryBuilder::insert()
                            .element(ListModel {
                                db_id: None,
                                uid: 99,
                                name: "Broken".into(),
                                author: "u1".into(),
                                created_at: i64::MAX,
                                public: false,
                            })
                            .query(),
                    )?,
                )?;
                t.exec_mut(
                    QueryBuilder::insert()
                        .edges()
                        .from("lists")
                        .to(list_db_id)
                        .query(),
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.find_by_author(&author("u1")).await,
            Err(StoreError::Unavailable { .. })
        ));
        // The single-list read still names the real problem
        assert!(matches!(
            store.get(&ListId::new("99").unwrap()).await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
