use chrono::Utc;

use super::Catalog;
use crate::db::collection::IndexQuery;
use crate::db::models::{Favorite, FavoriteKey, Recipe};
use crate::error::{StoreError, StoreResult};

impl Catalog {
    pub async fn is_favorite(&self, user_id: i64, recipe_id: i64) -> StoreResult<bool> {
        let favorite: Option<Favorite> = self.get(FavoriteKey::new(user_id, recipe_id)).await?;
        Ok(favorite.is_some())
    }

    pub async fn user_favorites(&self, user_id: i64) -> StoreResult<Vec<Favorite>> {
        self.list(Some(IndexQuery::eq("userId", user_id))).await
    }

    /// The recipes a user has favorited, skipping ones that no longer exist.
    pub async fn favorite_recipes(&self, user_id: i64) -> StoreResult<Vec<Recipe>> {
        let mut recipes = Vec::new();
        for favorite in self.user_favorites(user_id).await? {
            if let Some(recipe) = self.recipe(favorite.recipe_id).await? {
                recipes.push(recipe);
            }
        }
        Ok(recipes)
    }

    /// Favorite a recipe. Returns false (and leaves the counter alone) if the pair exists.
    pub async fn add_to_favorites(&self, user_id: i64, recipe_id: i64) -> StoreResult<bool> {
        if self.is_favorite(user_id, recipe_id).await? {
            return Ok(false);
        }

        let favorite = Favorite {
            user_id,
            recipe_id,
            date: Utc::now().date_naive(),
        };
        match self.add(favorite).await {
            Ok(_) => {}
            // Lost a race with another writer for the same pair.
            Err(StoreError::UniquenessViolation { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }

        if let Some(recipe) = self.recipe(recipe_id).await? {
            let favorites = recipe.favorites + 1;
            self.update::<Recipe>(recipe_id, serde_json::json!({ "favorites": favorites }))
                .await?;
        }
        tracing::debug!("User {} favorited recipe {}", user_id, recipe_id);
        Ok(true)
    }

    /// Unfavorite a recipe. Returns false if the pair was not stored.
    pub async fn remove_from_favorites(&self, user_id: i64, recipe_id: i64) -> StoreResult<bool> {
        let removed = self
            .delete::<Favorite>(FavoriteKey::new(user_id, recipe_id))
            .await?;
        if !removed {
            return Ok(false);
        }

        if let Some(recipe) = self.recipe(recipe_id).await? {
            let favorites = recipe.favorites.saturating_sub(1);
            self.update::<Recipe>(recipe_id, serde_json::json!({ "favorites": favorites }))
                .await?;
        }
        tracing::debug!("User {} unfavorited recipe {}", user_id, recipe_id);
        Ok(true)
    }
}
