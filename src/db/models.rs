use chrono::NaiveDate;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::collection::{Collection, Record, RecordKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub avatar: String,
    pub created_at: NaiveDate,
}

/// Input to `Catalog::register`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Легкая", alias = "Easy")]
    Easy,
    #[serde(rename = "Средняя", alias = "Medium")]
    Medium,
    #[serde(rename = "Сложная", alias = "Hard")]
    Hard,
}

impl Difficulty {
    /// Catalog label, also the stored index value.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Легкая",
            Difficulty::Medium => "Средняя",
            Difficulty::Hard => "Сложная",
        }
    }

    /// Parse a catalog label or an English name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Легкая" | "Easy" => Some(Difficulty::Easy),
            "Средняя" | "Medium" => Some(Difficulty::Medium),
            "Сложная" | "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub cooking_time: u32,
    pub difficulty: Difficulty,
    pub category_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub favorites: u32,
    #[serde(default)]
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    pub created_at: NaiveDate,
}

/// Input to `Catalog::add_recipe`. Derived counters and the date are optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub cooking_time: u32,
    pub difficulty: Difficulty,
    pub category_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub favorites: Option<u32>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub tips: Option<String>,
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub recipe_id: i64,
    pub user_id: i64,
    /// Author login at the time the comment was written.
    pub user_name: String,
    pub text: String,
    pub rating: u8,
    pub date: NaiveDate,
    #[serde(default)]
    pub likes: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub recipe_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub user_name: Option<String>,
    pub text: String,
    pub rating: u8,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub likes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: i64,
    pub recipe_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteKey {
    pub user_id: i64,
    pub recipe_id: i64,
}

impl FavoriteKey {
    pub fn new(user_id: i64, recipe_id: i64) -> Self {
        Self { user_id, recipe_id }
    }
}

impl fmt::Display for FavoriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.user_id, self.recipe_id)
    }
}

impl RecordKey for FavoriteKey {
    fn to_params(self) -> Vec<Value> {
        vec![Value::Integer(self.user_id), Value::Integer(self.recipe_id)]
    }

    fn from_rowid(_rowid: i64) -> Option<Self> {
        None
    }
}

/// Integer ids are positive; zero means "not assigned yet".
fn assigned(id: i64) -> Option<i64> {
    (id > 0).then_some(id)
}

impl Record for User {
    type Key = i64;
    const COLLECTION: Collection = Collection::Users;

    fn key(&self) -> Option<i64> {
        assigned(self.id)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.login.clone()),
            Value::Text(self.email.clone()),
        ]
    }
}

impl Record for Category {
    type Key = i64;
    const COLLECTION: Collection = Collection::Categories;

    fn key(&self) -> Option<i64> {
        assigned(self.id)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }
}

impl Record for Recipe {
    type Key = i64;
    const COLLECTION: Collection = Collection::Recipes;

    fn key(&self) -> Option<i64> {
        assigned(self.id)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.category_id),
            Value::Integer(self.user_id),
            Value::Text(self.title.clone()),
            Value::Text(self.difficulty.as_str().to_string()),
            Value::Integer(i64::from(self.cooking_time)),
        ]
    }
}

impl Record for Comment {
    type Key = i64;
    const COLLECTION: Collection = Collection::Comments;

    fn key(&self) -> Option<i64> {
        assigned(self.id)
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![Value::Integer(self.recipe_id), Value::Integer(self.user_id)]
    }
}

impl Record for Favorite {
    type Key = FavoriteKey;
    const COLLECTION: Collection = Collection::Favorites;

    fn key(&self) -> Option<FavoriteKey> {
        Some(FavoriteKey::new(self.user_id, self.recipe_id))
    }

    fn set_key(&mut self, key: FavoriteKey) {
        self.user_id = key.user_id;
        self.recipe_id = key.recipe_id;
    }

    fn column_values(&self) -> Vec<Value> {
        Vec::new()
    }
}
