use serde::{Deserialize, Serialize};

use super::Catalog;
use crate::db::collection::Record;
use crate::db::models::{Category, Comment, Favorite, Recipe, User};
use crate::error::StoreResult;

/// Full backup of the catalog, keyed by collection name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub categories: Vec<Category>,
    pub recipes: Vec<Recipe>,
    pub comments: Vec<Comment>,
    pub favorites: Vec<Favorite>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.users.len()
            + self.categories.len()
            + self.recipes.len()
            + self.comments.len()
            + self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Catalog {
    pub async fn export_data(&self) -> StoreResult<Snapshot> {
        let snapshot = Snapshot {
            users: self.list(None).await?,
            categories: self.list(None).await?,
            recipes: self.list(None).await?,
            comments: self.list(None).await?,
            favorites: self.list(None).await?,
        };
        tracing::info!("Exported {} records", snapshot.len());
        Ok(snapshot)
    }

    /// Replace the whole catalog with a snapshot: clear, then add collection by collection.
    pub async fn import_data(&self, snapshot: Snapshot) -> StoreResult<()> {
        let total = snapshot.len();
        self.clear().await?;

        self.add_all(snapshot.users).await?;
        self.add_all(snapshot.categories).await?;
        self.add_all(snapshot.recipes).await?;
        self.add_all(snapshot.comments).await?;
        self.add_all(snapshot.favorites).await?;

        tracing::info!("Imported {} records", total);
        Ok(())
    }

    async fn add_all<R: Record>(&self, records: Vec<R>) -> StoreResult<()> {
        for record in records {
            self.add(record).await?;
        }
        Ok(())
    }
}
