use serde::Serialize;

use super::Catalog;
use crate::db::collection::Collection;
use crate::db::models::Recipe;
use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_recipes: usize,
    pub total_users: usize,
    pub total_categories: usize,
    pub total_comments: usize,
    pub total_favorites: usize,
    pub most_popular_recipe: Option<Recipe>,
    pub newest_recipe: Option<Recipe>,
}

impl Catalog {
    pub async fn statistics(&self) -> StoreResult<Statistics> {
        let recipes = self.recipes().await?;

        // max_by_key keeps the last maximum; scan in reverse so ties go to storage order.
        let most_popular_recipe = recipes.iter().rev().max_by_key(|r| r.views).cloned();
        let newest_recipe = recipes.iter().max_by_key(|r| r.id).cloned();

        Ok(Statistics {
            total_recipes: recipes.len(),
            total_users: self.count(Collection::Users).await?,
            total_categories: self.count(Collection::Categories).await?,
            total_comments: self.count(Collection::Comments).await?,
            total_favorites: self.count(Collection::Favorites).await?,
            most_popular_recipe,
            newest_recipe,
        })
    }
}
