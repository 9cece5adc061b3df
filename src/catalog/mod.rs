//! The catalog store: five typed collections behind one explicitly owned handle.
//!
//! A [`Catalog`] starts uninitialized. The first operation (or an explicit
//! [`Catalog::init`]) opens the pool and runs the migrations; a failure is
//! remembered and reported as [`StoreError::StorageUnavailable`] until a
//! later `init` succeeds.

mod comments;
mod favorites;
mod recipes;
mod snapshot;
mod stats;
mod users;

pub use snapshot::Snapshot;
pub use stats::Statistics;

use rusqlite::TransactionBehavior;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::auth::{FileSessionSlot, SessionSlot, SessionUser};
use crate::config::Config;
use crate::db::collection::{Collection, IndexQuery, Record};
use crate::db::{self, records, DbPool, MigrationContext};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    File(PathBuf),
    /// Private database that disappears with the catalog.
    Memory,
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub target: StorageTarget,
    pub pool_size: u32,
    pub password_cost: u32,
}

impl CatalogOptions {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: StorageTarget::File(path.into()),
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self {
            target: StorageTarget::Memory,
            ..Self::default()
        }
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            target: StorageTarget::Memory,
            pool_size: 4,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

enum InitState {
    Uninitialized,
    Ready(DbPool),
    Failed(String),
}

pub struct Catalog {
    options: CatalogOptions,
    state: Mutex<InitState>,
    session: Arc<dyn SessionSlot>,
    current: RwLock<Option<SessionUser>>,
}

impl Catalog {
    pub fn new(options: CatalogOptions, session: Arc<dyn SessionSlot>) -> Self {
        Self {
            options,
            state: Mutex::new(InitState::Uninitialized),
            session,
            current: RwLock::new(None),
        }
    }

    /// File-backed catalog and session slot as laid out by the config.
    pub fn from_config(config: &Config) -> Self {
        let options = CatalogOptions {
            target: StorageTarget::File(config.db_path()),
            pool_size: config.database.pool_size,
            password_cost: config.auth.password_cost,
        };
        let session = Arc::new(FileSessionSlot::new(&config.session_dir()));
        Self::new(options, session)
    }

    /// Open storage and apply migrations. Safe to call any number of times,
    /// concurrently or not; retries after an earlier failure.
    pub async fn init(&self) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let InitState::Ready(_) = &*state {
            return Ok(());
        }
        self.initialize(&mut state).await.map(|_| ())
    }

    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.lock().await, InitState::Ready(_))
    }

    /// The shared pool, initializing on first use.
    pub(crate) async fn pool(&self) -> StoreResult<DbPool> {
        let mut state = self.state.lock().await;
        match &*state {
            InitState::Ready(pool) => return Ok(pool.clone()),
            InitState::Failed(reason) => {
                return Err(StoreError::StorageUnavailable(reason.clone()))
            }
            InitState::Uninitialized => {}
        }
        self.initialize(&mut state).await
    }

    async fn initialize(&self, state: &mut InitState) -> StoreResult<DbPool> {
        match self.open() {
            Ok(pool) => {
                *state = InitState::Ready(pool.clone());
                self.restore_session().await;
                tracing::info!("Catalog initialized");
                Ok(pool)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!("Catalog initialization failed: {}", reason);
                *state = InitState::Failed(reason.clone());
                Err(StoreError::StorageUnavailable(reason))
            }
        }
    }

    fn open(&self) -> StoreResult<DbPool> {
        let pool = match &self.options.target {
            StorageTarget::File(path) => db::create_pool(path, self.options.pool_size)?,
            StorageTarget::Memory => db::create_memory_pool()?,
        };
        let ctx = MigrationContext {
            password_cost: self.options.password_cost,
        };
        db::run_migrations(&pool, &ctx)?;
        Ok(pool)
    }

    async fn restore_session(&self) {
        match self.session.load().await {
            Ok(user) => *self.current.write().await = user,
            Err(e) => tracing::warn!("Ignoring unreadable session slot: {}", e),
        }
    }

    pub(crate) fn password_cost(&self) -> u32 {
        self.options.password_cost
    }

    /// Persist a record and return its key, generated for users and comments.
    pub async fn add<R: Record>(&self, mut record: R) -> StoreResult<R::Key> {
        let pool = self.pool().await?;
        let mut conn = pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let key = records::insert(&tx, &mut record)?;
        tx.commit()?;
        tracing::debug!("Added {} {}", R::COLLECTION, key);
        Ok(key)
    }

    pub async fn get<R: Record>(&self, key: R::Key) -> StoreResult<Option<R>> {
        let pool = self.pool().await?;
        let conn = pool.get()?;
        records::fetch(&conn, key)
    }

    /// All records of a collection, or those matching an index query, in key order.
    pub async fn list<R: Record>(&self, query: Option<IndexQuery>) -> StoreResult<Vec<R>> {
        let pool = self.pool().await?;
        let conn = pool.get()?;
        records::fetch_all(&conn, query.as_ref())
    }

    /// Shallow-merge `changes` (a JSON object) into the stored record.
    /// Key fields keep their stored values.
    pub async fn update<R: Record>(
        &self,
        key: R::Key,
        changes: serde_json::Value,
    ) -> StoreResult<R> {
        let serde_json::Value::Object(changes) = changes else {
            return Err(StoreError::Validation(format!(
                "{} changes must be a JSON object",
                R::COLLECTION
            )));
        };

        let pool = self.pool().await?;
        let mut conn = pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut merged = records::fetch_json::<R>(&tx, key)?.ok_or_else(|| StoreError::NotFound {
            collection: R::COLLECTION,
            key: key.to_string(),
        })?;
        if let serde_json::Value::Object(fields) = &mut merged {
            fields.extend(changes);
        }
        let mut record: R = serde_json::from_value(merged).map_err(|e| {
            StoreError::Validation(format!("invalid {} update: {}", R::COLLECTION, e))
        })?;
        record.set_key(key);

        records::replace(&tx, &record)?;
        tx.commit()?;
        tracing::debug!("Updated {} {}", R::COLLECTION, key);
        Ok(record)
    }

    /// Remove a record. Deleting an absent key is not an error; returns whether a row went away.
    pub async fn delete<R: Record>(&self, key: R::Key) -> StoreResult<bool> {
        let pool = self.pool().await?;
        let conn = pool.get()?;
        let removed = records::remove::<R>(&conn, key)?;
        tracing::debug!("Deleted {} {} (existed: {})", R::COLLECTION, key, removed);
        Ok(removed)
    }

    /// Empty every collection. Schema and key generators stay.
    pub async fn clear(&self) -> StoreResult<()> {
        let pool = self.pool().await?;
        let mut conn = pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for collection in Collection::ALL {
            let rows = records::clear(&tx, collection)?;
            tracing::debug!("Cleared {} {}", rows, collection);
        }
        tx.commit()?;
        Ok(())
    }

    pub(crate) async fn count(&self, collection: Collection) -> StoreResult<usize> {
        let pool = self.pool().await?;
        let conn = pool.get()?;
        records::count(&conn, collection)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::{password, MemorySessionSlot};
    use crate::db::models::{Category, Favorite, FavoriteKey, Recipe, User};
    use serde_json::json;

    pub(crate) fn test_catalog() -> Catalog {
        Catalog::new(
            CatalogOptions::memory().with_password_cost(password::MIN_COST),
            Arc::new(MemorySessionSlot::new()),
        )
    }

    #[tokio::test]
    async fn first_operation_initializes_lazily() {
        let catalog = test_catalog();
        assert!(!catalog.is_ready().await);

        let categories: Vec<Category> = catalog.list(None).await.unwrap();
        assert_eq!(categories.len(), 6);
        assert!(catalog.is_ready().await);
    }

    #[tokio::test]
    async fn concurrent_inits_seed_once() {
        let catalog = test_catalog();
        let (a, b, c) = tokio::join!(catalog.init(), catalog.init(), catalog.init());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let users: Vec<User> = catalog.list(None).await.unwrap();
        assert_eq!(users.len(), 3);
    }

    #[tokio::test]
    async fn failed_init_blocks_until_a_successful_retry() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let catalog = Catalog::new(
            CatalogOptions::file(blocker.join("flavors.db"))
                .with_password_cost(password::MIN_COST),
            Arc::new(MemorySessionSlot::new()),
        );

        let err = catalog.init().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));

        // Later callers see the failure without retrying.
        std::fs::remove_file(&blocker).unwrap();
        let err = catalog.get::<Recipe>(1).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));

        catalog.init().await.unwrap();
        assert!(catalog.get::<Recipe>(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let catalog = test_catalog();
        assert!(catalog.get::<Recipe>(999).await.unwrap().is_none());
        assert!(catalog
            .get::<Favorite>(FavoriteKey::new(1, 2))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn add_rejects_duplicate_unique_fields() {
        let catalog = test_catalog();
        let err = catalog
            .add(Category {
                id: 7,
                name: "Супы".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniquenessViolation {
                collection: Collection::Categories,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn list_filters_by_index() {
        let catalog = test_catalog();
        let soups: Vec<Recipe> = catalog
            .list(Some(IndexQuery::eq("categoryId", 1i64)))
            .await
            .unwrap();
        assert_eq!(soups.len(), 6);
        assert!(soups.iter().all(|r| r.category_id == 1));

        let admin_favorites: Vec<Favorite> = catalog
            .list(Some(IndexQuery::eq("userId", 1i64)))
            .await
            .unwrap();
        assert_eq!(admin_favorites.len(), 3);
    }

    #[tokio::test]
    async fn update_merges_shallowly_and_keeps_the_key() {
        let catalog = test_catalog();
        let updated: Recipe = catalog
            .update(
                1,
                json!({ "views": 1501, "id": 77, "title": "Хаш по-еревански" }),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, 1);
        assert_eq!(updated.views, 1501);
        assert_eq!(updated.title, "Хаш по-еревански");
        assert_eq!(updated.cooking_time, 360);

        let stored: Recipe = catalog.get(1).await.unwrap().unwrap();
        assert_eq!(stored, updated);
        assert!(catalog.get::<Recipe>(77).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_key_is_not_found() {
        let catalog = test_catalog();
        let err = catalog
            .update::<Recipe>(999, json!({ "views": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_with_wrong_type_is_validation_error() {
        let catalog = test_catalog();
        let err = catalog
            .update::<Recipe>(1, json!({ "views": "many" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = catalog
            .update::<Recipe>(1, json!(["views"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn update_into_a_taken_login_is_a_uniqueness_violation() {
        let catalog = test_catalog();
        let err = catalog
            .update::<User>(2, json!({ "login": "admin" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniquenessViolation { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let catalog = test_catalog();
        assert!(catalog.delete::<Recipe>(40).await.unwrap());
        assert!(!catalog.delete::<Recipe>(40).await.unwrap());
        assert!(catalog.get::<Recipe>(40).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_empties_every_collection() {
        let catalog = test_catalog();
        catalog.clear().await.unwrap();
        for collection in Collection::ALL {
            assert_eq!(catalog.count(collection).await.unwrap(), 0);
        }
    }
}
