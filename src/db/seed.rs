// Initial catalog contents, inserted into a collection the run it is created.
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::password;
use crate::db::collection::{Collection, Record};
use crate::db::models::{Category, Comment, Favorite, Recipe, User};
use crate::db::records;
use crate::error::StoreResult;

const USERS: &str = include_str!("../../seed/users.json");
const CATEGORIES: &str = include_str!("../../seed/categories.json");
const RECIPES: &str = include_str!("../../seed/recipes.json");
const COMMENTS: &str = include_str!("../../seed/comments.json");
const FAVORITES: &str = include_str!("../../seed/favorites.json");

/// Seed users carry plaintext passwords; they are hashed before storage.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedUser {
    id: i64,
    login: String,
    email: String,
    password: String,
    #[serde(default)]
    avatar: String,
    created_at: NaiveDate,
}

pub fn users(password_cost: u32) -> StoreResult<Vec<User>> {
    let seeds: Vec<SeedUser> = serde_json::from_str(USERS)?;
    seeds
        .into_iter()
        .map(|seed| {
            Ok(User {
                id: seed.id,
                login: seed.login,
                email: seed.email,
                password_hash: password::hash(&seed.password, password_cost)?,
                avatar: seed.avatar,
                created_at: seed.created_at,
            })
        })
        .collect()
}

pub fn categories() -> StoreResult<Vec<Category>> {
    Ok(serde_json::from_str(CATEGORIES)?)
}

pub fn recipes() -> StoreResult<Vec<Recipe>> {
    Ok(serde_json::from_str(RECIPES)?)
}

pub fn comments() -> StoreResult<Vec<Comment>> {
    Ok(serde_json::from_str(COMMENTS)?)
}

pub fn favorites() -> StoreResult<Vec<Favorite>> {
    Ok(serde_json::from_str(FAVORITES)?)
}

fn insert_all<R: Record>(conn: &Connection, rows: Vec<R>) -> StoreResult<usize> {
    let count = rows.len();
    for mut row in rows {
        records::insert(conn, &mut row)?;
    }
    Ok(count)
}

/// Insert the seed rows of one freshly created collection.
pub fn seed_collection(
    conn: &Connection,
    collection: Collection,
    password_cost: u32,
) -> StoreResult<usize> {
    let inserted = match collection {
        Collection::Users => insert_all(conn, users(password_cost)?)?,
        Collection::Categories => insert_all(conn, categories()?)?,
        Collection::Recipes => insert_all(conn, recipes()?)?,
        Collection::Comments => insert_all(conn, comments()?)?,
        Collection::Favorites => insert_all(conn, favorites()?)?,
    };
    tracing::info!("Seeded {} {}", inserted, collection);
    Ok(inserted)
}
