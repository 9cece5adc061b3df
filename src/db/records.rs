// Row-level access shared by the catalog and the seeding migration.
// Every function takes a plain connection so callers decide on transactions.
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::db::collection::{Collection, IndexQuery, Record, RecordKey};
use crate::error::{StoreError, StoreResult};

fn key_condition(collection: Collection, first_param: usize) -> String {
    collection
        .key_columns()
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ?{}", first_param + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn key_order(collection: Collection) -> String {
    collection.key_columns().join(", ")
}

/// Insert a record, assigning its key first if the collection generates keys.
pub fn insert<R: Record>(conn: &Connection, record: &mut R) -> StoreResult<R::Key> {
    let collection = R::COLLECTION;
    let key = record.key();

    let mut columns: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    match key {
        Some(key) => {
            columns.extend(collection.key_columns());
            values.extend(key.to_params());
        }
        None if collection.auto_key() => {}
        None => {
            return Err(StoreError::Validation(format!(
                "{collection} records need an explicit key"
            )))
        }
    }
    columns.extend(collection.value_columns());
    values.extend(record.column_values());
    columns.push("body");
    values.push(Value::Text(serde_json::to_string(record)?));

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        collection.table(),
        columns.join(", "),
        placeholders
    );
    conn.execute(&sql, params_from_iter(values))
        .map_err(|e| StoreError::from_constraint(collection, e))?;

    if let Some(key) = key {
        return Ok(key);
    }

    // The body was written before the key existed; rewrite it with the key.
    let rowid = conn.last_insert_rowid();
    let key = R::Key::from_rowid(rowid).ok_or_else(|| {
        StoreError::Validation(format!("{collection} keys cannot be generated"))
    })?;
    record.set_key(key);
    conn.execute(
        &format!("UPDATE {} SET body = ?1 WHERE rowid = ?2", collection.table()),
        params![serde_json::to_string(record)?, rowid],
    )?;

    Ok(key)
}

pub fn fetch<R: Record>(conn: &Connection, key: R::Key) -> StoreResult<Option<R>> {
    match fetch_json::<R>(conn, key)? {
        Some(body) => Ok(Some(serde_json::from_value(body)?)),
        None => Ok(None),
    }
}

/// Raw JSON body of a record, for merges that should not lose unknown fields.
pub fn fetch_json<R: Record>(
    conn: &Connection,
    key: R::Key,
) -> StoreResult<Option<serde_json::Value>> {
    let collection = R::COLLECTION;
    let sql = format!(
        "SELECT body FROM {} WHERE {}",
        collection.table(),
        key_condition(collection, 1)
    );
    let body: Option<String> = conn
        .query_row(&sql, params_from_iter(key.to_params()), |row| row.get(0))
        .optional()?;

    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

pub fn fetch_all<R: Record>(conn: &Connection, query: Option<&IndexQuery>) -> StoreResult<Vec<R>> {
    let collection = R::COLLECTION;
    let (condition, params) = match query {
        Some(query) => query.to_sql(collection)?,
        None => ("1 = 1".to_string(), Vec::new()),
    };
    let sql = format!(
        "SELECT body FROM {} WHERE {} ORDER BY {}",
        collection.table(),
        condition,
        key_order(collection)
    );

    let mut stmt = conn.prepare(&sql)?;
    let bodies: Vec<String> = stmt
        .query_map(params_from_iter(params), |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    bodies
        .iter()
        .map(|body| serde_json::from_str(body).map_err(StoreError::from))
        .collect()
}

/// Overwrite an existing record in place. Returns false if no row has its key.
pub fn replace<R: Record>(conn: &Connection, record: &R) -> StoreResult<bool> {
    let collection = R::COLLECTION;
    let key = record.key().ok_or_else(|| {
        StoreError::Validation(format!("cannot replace a {collection} record without a key"))
    })?;

    let mut assignments: Vec<String> = collection
        .value_columns()
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ?{}", i + 1))
        .collect();
    let mut values = record.column_values();
    values.push(Value::Text(serde_json::to_string(record)?));
    assignments.push(format!("body = ?{}", values.len()));
    let condition = key_condition(collection, values.len() + 1);
    values.extend(key.to_params());

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        collection.table(),
        assignments.join(", "),
        condition
    );
    let rows = conn
        .execute(&sql, params_from_iter(values))
        .map_err(|e| StoreError::from_constraint(collection, e))?;

    Ok(rows > 0)
}

pub fn remove<R: Record>(conn: &Connection, key: R::Key) -> StoreResult<bool> {
    let collection = R::COLLECTION;
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        collection.table(),
        key_condition(collection, 1)
    );
    let rows = conn.execute(&sql, params_from_iter(key.to_params()))?;
    Ok(rows > 0)
}

pub fn count(conn: &Connection, collection: Collection) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", collection.table()),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

pub fn clear(conn: &Connection, collection: Collection) -> StoreResult<usize> {
    let rows = conn.execute(&format!("DELETE FROM {}", collection.table()), [])?;
    Ok(rows)
}

pub fn table_exists(conn: &Connection, collection: Collection) -> StoreResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![collection.table()],
        |row| row.get(0),
    )?;
    Ok(exists)
}
