// Collection descriptors and the record abstraction the catalog stores.
use rusqlite::types::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::Difficulty;
use crate::error::{StoreError, StoreResult};

/// The five named collections of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Categories,
    Recipes,
    Comments,
    Favorites,
}

impl Collection {
    /// Import order: parents before the rows that reference them.
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Categories,
        Collection::Recipes,
        Collection::Comments,
        Collection::Favorites,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Categories => "categories",
            Collection::Recipes => "recipes",
            Collection::Comments => "comments",
            Collection::Favorites => "favorites",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        self.name()
    }

    pub(crate) fn key_columns(self) -> &'static [&'static str] {
        match self {
            Collection::Favorites => &["user_id", "recipe_id"],
            _ => &["id"],
        }
    }

    /// Whether a record without a key gets one from the table's key generator.
    pub(crate) fn auto_key(self) -> bool {
        matches!(self, Collection::Users | Collection::Comments)
    }

    /// Non-key columns mirrored out of the JSON body, in `Record::column_values` order.
    pub(crate) fn value_columns(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["login", "email"],
            Collection::Categories => &["name"],
            Collection::Recipes => &[
                "category_id",
                "user_id",
                "title",
                "difficulty",
                "cooking_time",
            ],
            Collection::Comments => &["recipe_id", "user_id"],
            Collection::Favorites => &[],
        }
    }

    /// Queryable indexes as (index name, column).
    pub fn indexes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Collection::Users => &[("login", "login"), ("email", "email")],
            Collection::Categories => &[("name", "name")],
            Collection::Recipes => &[
                ("categoryId", "category_id"),
                ("userId", "user_id"),
                ("title", "title"),
                ("difficulty", "difficulty"),
                ("cookingTime", "cooking_time"),
            ],
            Collection::Comments => &[("recipeId", "recipe_id"), ("userId", "user_id")],
            Collection::Favorites => &[("userId", "user_id"), ("recipeId", "recipe_id")],
        }
    }

    pub(crate) fn index_column(self, index: &str) -> Option<&'static str> {
        self.indexes()
            .iter()
            .find(|(name, _)| *name == index)
            .map(|(_, column)| *column)
    }

    pub(crate) fn schema(self) -> &'static str {
        match self {
            Collection::Users => {
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    login TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL UNIQUE,
                    body TEXT NOT NULL
                );"
            }
            Collection::Categories => {
                "CREATE TABLE categories (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    body TEXT NOT NULL
                );"
            }
            Collection::Recipes => {
                "CREATE TABLE recipes (
                    id INTEGER PRIMARY KEY,
                    category_id INTEGER NOT NULL,
                    user_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    cooking_time INTEGER NOT NULL,
                    body TEXT NOT NULL
                );
                CREATE INDEX idx_recipes_category ON recipes(category_id);
                CREATE INDEX idx_recipes_user ON recipes(user_id);"
            }
            Collection::Comments => {
                "CREATE TABLE comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL,
                    user_id INTEGER NOT NULL,
                    body TEXT NOT NULL
                );
                CREATE INDEX idx_comments_recipe ON comments(recipe_id);
                CREATE INDEX idx_comments_user ON comments(user_id);"
            }
            Collection::Favorites => {
                "CREATE TABLE favorites (
                    user_id INTEGER NOT NULL,
                    recipe_id INTEGER NOT NULL,
                    body TEXT NOT NULL,
                    PRIMARY KEY (user_id, recipe_id)
                );
                CREATE INDEX idx_favorites_recipe ON favorites(recipe_id);"
            }
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primary key of some collection.
pub trait RecordKey: Copy + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Values bound to the collection's key columns, in order.
    fn to_params(self) -> Vec<Value>;

    /// Build a key from a generated rowid. `None` for keys that are never generated.
    fn from_rowid(rowid: i64) -> Option<Self>;
}

impl RecordKey for i64 {
    fn to_params(self) -> Vec<Value> {
        vec![Value::Integer(self)]
    }

    fn from_rowid(rowid: i64) -> Option<Self> {
        Some(rowid)
    }
}

/// A typed row of one collection, stored as JSON alongside its key and indexed columns.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Key: RecordKey;

    const COLLECTION: Collection;

    /// The record's key. `None` asks an auto-key collection to assign one.
    fn key(&self) -> Option<Self::Key>;

    fn set_key(&mut self, key: Self::Key);

    /// Values for `Collection::value_columns`, in the same order.
    fn column_values(&self) -> Vec<Value>;
}

/// Bounds of an index lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRange {
    Only(Value),
    /// Inclusive on both ends; a missing bound is open.
    Bound {
        lower: Option<Value>,
        upper: Option<Value>,
    },
}

/// Restricts `list` to records whose indexed field matches a range.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub index: String,
    pub range: KeyRange,
}

impl IndexQuery {
    pub fn eq(index: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            index: index.into(),
            range: KeyRange::Only(value.into()),
        }
    }

    pub fn range(
        index: impl Into<String>,
        lower: Option<Value>,
        upper: Option<Value>,
    ) -> Self {
        Self {
            index: index.into(),
            range: KeyRange::Bound { lower, upper },
        }
    }

    /// SQL condition and parameters against `collection`'s table.
    pub(crate) fn to_sql(&self, collection: Collection) -> StoreResult<(String, Vec<Value>)> {
        let column = collection.index_column(&self.index).ok_or_else(|| {
            StoreError::Validation(format!(
                "{collection} has no index named '{}'",
                self.index
            ))
        })?;

        let stored = |value: &Value| normalize(collection, column, value);
        match &self.range {
            KeyRange::Only(value) => Ok((format!("{column} = ?1"), vec![stored(value)])),
            KeyRange::Bound { lower, upper } => {
                let mut conditions = Vec::new();
                let mut params = Vec::new();
                if let Some(lower) = lower {
                    params.push(stored(lower));
                    conditions.push(format!("{column} >= ?{}", params.len()));
                }
                if let Some(upper) = upper {
                    params.push(stored(upper));
                    conditions.push(format!("{column} <= ?{}", params.len()));
                }
                if conditions.is_empty() {
                    conditions.push("1 = 1".to_string());
                }
                Ok((conditions.join(" AND "), params))
            }
        }
    }
}

/// Index values as they are stored: difficulty names become catalog labels.
fn normalize(collection: Collection, column: &str, value: &Value) -> Value {
    match (collection, column, value) {
        (Collection::Recipes, "difficulty", Value::Text(name)) => Difficulty::from_name(name)
            .map(|d| Value::Text(d.as_str().to_string()))
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}
