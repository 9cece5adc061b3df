pub mod collection;
pub mod models;
pub mod records;
pub mod seed;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Transaction, TransactionBehavior};
use std::path::Path;

use crate::db::collection::Collection;
use crate::error::StoreResult;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Settings a migration may need beyond the transaction itself.
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext {
    pub password_cost: u32,
}

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub apply: fn(&Transaction<'_>, &MigrationContext) -> StoreResult<()>,
}

/// Applied in order; each version runs once per database.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "collections",
        apply: create_collections,
    },
    Migration {
        version: 2,
        name: "recipe_indexes",
        apply: recipe_indexes,
    },
];

/// Create every missing collection and seed only the ones created here.
fn create_collections(tx: &Transaction<'_>, ctx: &MigrationContext) -> StoreResult<()> {
    for collection in Collection::ALL {
        if records::table_exists(tx, collection)? {
            continue;
        }
        tracing::info!("Creating collection {}", collection);
        tx.execute_batch(collection.schema())?;
        seed::seed_collection(tx, collection, ctx.password_cost)?;
    }
    Ok(())
}

fn recipe_indexes(tx: &Transaction<'_>, _ctx: &MigrationContext) -> StoreResult<()> {
    tx.execute_batch(include_str!("../../migrations/002_recipe_indexes.sql"))?;
    Ok(())
}

pub fn create_pool(db_path: &Path, max_size: u32) -> StoreResult<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(max_size.max(1)).build(manager)?;

    Ok(pool)
}

/// Every in-memory connection is its own database, so the pool holds exactly one.
pub fn create_memory_pool() -> StoreResult<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool, ctx: &MigrationContext) -> StoreResult<()> {
    let mut conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for migration in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
            params![migration.version],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!(
                "Applying migration {:03}_{}",
                migration.version,
                migration.name
            );
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            (migration.apply)(&tx, ctx)?;
            tx.execute(
                "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
                params![migration.version, migration.name],
            )?;
            tx.commit()?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password;

    const CTX: MigrationContext = MigrationContext {
        password_cost: password::MIN_COST,
    };

    fn schema_versions(pool: &DbPool) -> Vec<i64> {
        let conn = pool.get().unwrap();
        let mut stmt = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path, 4).unwrap();
        assert!(db_path.exists());
        // Verify we can get a connection
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn migrations_create_and_seed_all_collections() {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool, &CTX).unwrap();

        assert_eq!(schema_versions(&pool), vec![1, 2]);

        let conn = pool.get().unwrap();
        let expected = [
            (Collection::Users, 3),
            (Collection::Categories, 6),
            (Collection::Recipes, 40),
            (Collection::Comments, 4),
            (Collection::Favorites, 7),
        ];
        for (collection, rows) in expected {
            assert_eq!(records::count(&conn, collection).unwrap(), rows, "{collection}");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool, &CTX).unwrap();
        run_migrations(&pool, &CTX).unwrap(); // Should not error on second run

        assert_eq!(schema_versions(&pool), vec![1, 2]);
        let conn = pool.get().unwrap();
        assert_eq!(records::count(&conn, Collection::Recipes).unwrap(), 40);
    }

    #[test]
    fn existing_collections_are_not_reseeded() {
        let pool = create_memory_pool().unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(Collection::Categories.schema()).unwrap();
        }
        run_migrations(&pool, &CTX).unwrap();

        let conn = pool.get().unwrap();
        assert_eq!(records::count(&conn, Collection::Categories).unwrap(), 0);
        assert_eq!(records::count(&conn, Collection::Recipes).unwrap(), 40);
    }

    #[test]
    fn recipe_indexes_exist_after_migration() {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool, &CTX).unwrap();

        let conn = pool.get().unwrap();
        let indexes: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'index' AND tbl_name = 'recipes'",
                )
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        for name in [
            "idx_recipes_category",
            "idx_recipes_user",
            "idx_recipes_title",
            "idx_recipes_difficulty",
            "idx_recipes_cooking_time",
        ] {
            assert!(indexes.contains(&name.to_string()), "missing {name}");
        }
    }
}
