use chrono::Utc;
use rusqlite::types::Value;
use std::collections::HashMap;

use super::Catalog;
use crate::db::collection::{Collection, IndexQuery};
use crate::db::models::{Category, Difficulty, NewRecipe, Recipe};
use crate::error::{StoreError, StoreResult};

impl Catalog {
    pub async fn recipes(&self) -> StoreResult<Vec<Recipe>> {
        self.list(None).await
    }

    pub async fn recipe(&self, id: i64) -> StoreResult<Option<Recipe>> {
        self.get(id).await
    }

    pub async fn categories(&self) -> StoreResult<Vec<Category>> {
        self.list(None).await
    }

    pub async fn category(&self, id: i64) -> StoreResult<Option<Category>> {
        self.get(id).await
    }

    /// Case-insensitive match on title, description, ingredients and category name.
    /// A blank term returns every recipe.
    pub async fn search_recipes(&self, term: &str) -> StoreResult<Vec<Recipe>> {
        let term = term.trim().to_lowercase();
        let recipes = self.recipes().await?;
        if term.is_empty() {
            return Ok(recipes);
        }

        let category_names: HashMap<i64, String> = self
            .categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name.to_lowercase()))
            .collect();

        Ok(recipes
            .into_iter()
            .filter(|recipe| {
                recipe.title.to_lowercase().contains(&term)
                    || recipe.description.to_lowercase().contains(&term)
                    || recipe
                        .ingredients
                        .iter()
                        .any(|i| i.to_lowercase().contains(&term))
                    || category_names
                        .get(&recipe.category_id)
                        .is_some_and(|name| name.contains(&term))
            })
            .collect())
    }

    pub async fn recipes_by_category(&self, category_id: i64) -> StoreResult<Vec<Recipe>> {
        self.list(Some(IndexQuery::eq("categoryId", category_id)))
            .await
    }

    pub async fn recipes_by_author(&self, user_id: i64) -> StoreResult<Vec<Recipe>> {
        self.list(Some(IndexQuery::eq("userId", user_id))).await
    }

    pub async fn recipes_by_difficulty(&self, difficulty: Difficulty) -> StoreResult<Vec<Recipe>> {
        self.list(Some(IndexQuery::eq(
            "difficulty",
            difficulty.as_str().to_string(),
        )))
        .await
    }

    /// Recipes whose cooking time (minutes) lies within the inclusive bounds.
    pub async fn recipes_by_cooking_time(
        &self,
        min: Option<u32>,
        max: Option<u32>,
    ) -> StoreResult<Vec<Recipe>> {
        let bound = |minutes: u32| Value::Integer(i64::from(minutes));
        self.list(Some(IndexQuery::range(
            "cookingTime",
            min.map(bound),
            max.map(bound),
        )))
        .await
    }

    /// Most viewed first; ties keep storage order.
    pub async fn popular_recipes(&self, limit: usize) -> StoreResult<Vec<Recipe>> {
        let mut recipes = self.recipes().await?;
        recipes.sort_by(|a, b| b.views.cmp(&a.views));
        recipes.truncate(limit);
        Ok(recipes)
    }

    /// Highest id first; ids follow creation order.
    pub async fn new_recipes(&self, limit: usize) -> StoreResult<Vec<Recipe>> {
        let mut recipes = self.recipes().await?;
        recipes.sort_by(|a, b| b.id.cmp(&a.id));
        recipes.truncate(limit);
        Ok(recipes)
    }

    pub async fn add_recipe(&self, new_recipe: NewRecipe) -> StoreResult<Recipe> {
        if new_recipe.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }

        let recipes = self.recipes().await?;
        let next_id = recipes.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        let recipe = Recipe {
            id: next_id,
            title: new_recipe.title,
            description: new_recipe.description,
            cooking_time: new_recipe.cooking_time,
            difficulty: new_recipe.difficulty,
            category_id: new_recipe.category_id,
            user_id: new_recipe.user_id,
            steps: new_recipe.steps,
            ingredients: new_recipe.ingredients,
            rating: new_recipe.rating.unwrap_or(0.0),
            favorites: new_recipe.favorites.unwrap_or(0),
            views: new_recipe.views.unwrap_or(0),
            tips: new_recipe.tips,
            history: new_recipe.history,
            created_at: new_recipe
                .created_at
                .unwrap_or_else(|| Utc::now().date_naive()),
        };
        let id = self.add(recipe).await?;
        tracing::info!("Added recipe {}", id);

        self.recipe(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: Collection::Recipes,
            key: id.to_string(),
        })
    }

    /// Merge changes into a recipe; `None` if it does not exist.
    pub async fn update_recipe(
        &self,
        id: i64,
        changes: serde_json::Value,
    ) -> StoreResult<Option<Recipe>> {
        if self.recipe(id).await?.is_none() {
            return Ok(None);
        }
        self.update(id, changes).await.map(Some)
    }

    /// Count one view. Read and write are separate steps, so concurrent views may race.
    pub async fn increment_recipe_views(&self, id: i64) -> StoreResult<()> {
        let Some(recipe) = self.recipe(id).await? else {
            return Ok(());
        };
        let views = recipe.views + 1;
        self.update::<Recipe>(id, serde_json::json!({ "views": views }))
            .await?;
        Ok(())
    }
}
