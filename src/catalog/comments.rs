use chrono::Utc;

use super::Catalog;
use crate::db::collection::IndexQuery;
use crate::db::models::{Comment, NewComment, Recipe, User};
use crate::error::{StoreError, StoreResult};

/// Mean rating rounded half up to one decimal. `None` without ratings.
///
/// Works in integer tenths so the result never depends on float rounding.
pub(crate) fn average_rating(ratings: &[u8]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u64 = ratings.iter().map(|&r| u64::from(r)).sum();
    let count = ratings.len() as u64;
    let tenths = (sum * 20 + count) / (count * 2);
    Some(tenths as f64 / 10.0)
}

impl Catalog {
    pub async fn comments_for_recipe(&self, recipe_id: i64) -> StoreResult<Vec<Comment>> {
        self.list(Some(IndexQuery::eq("recipeId", recipe_id)))
            .await
    }

    pub async fn comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>> {
        self.list(Some(IndexQuery::eq("userId", user_id))).await
    }

    /// Store a comment, then recompute the recipe's rating from all its comments.
    pub async fn add_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        if new_comment.text.trim().is_empty() {
            return Err(StoreError::Validation("comment text is required".to_string()));
        }
        if !(1..=5).contains(&new_comment.rating) {
            return Err(StoreError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                new_comment.rating
            )));
        }

        let user_name = match new_comment.user_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self
                .get::<User>(new_comment.user_id)
                .await?
                .map(|u| u.login)
                .ok_or_else(|| {
                    StoreError::Validation(format!(
                        "unknown comment author {}",
                        new_comment.user_id
                    ))
                })?,
        };

        let mut comment = Comment {
            id: 0,
            recipe_id: new_comment.recipe_id,
            user_id: new_comment.user_id,
            user_name,
            text: new_comment.text,
            rating: new_comment.rating,
            date: new_comment.date.unwrap_or_else(|| Utc::now().date_naive()),
            likes: new_comment.likes.unwrap_or(0),
        };
        comment.id = self.add(comment.clone()).await?;
        tracing::debug!(
            "Comment {} added to recipe {}",
            comment.id,
            comment.recipe_id
        );

        self.refresh_recipe_rating(comment.recipe_id).await?;
        Ok(comment)
    }

    /// Recompute a recipe's rating from its comments. No-op without comments or recipe.
    pub async fn refresh_recipe_rating(&self, recipe_id: i64) -> StoreResult<Option<f64>> {
        let ratings: Vec<u8> = self
            .comments_for_recipe(recipe_id)
            .await?
            .iter()
            .map(|c| c.rating)
            .collect();
        let Some(rating) = average_rating(&ratings) else {
            return Ok(None);
        };

        let updated = self
            .update_recipe(recipe_id, serde_json::json!({ "rating": rating }))
            .await?;
        Ok(updated.map(|recipe: Recipe| recipe.rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::test_catalog;

    fn comment(recipe_id: i64, rating: u8) -> NewComment {
        NewComment {
            recipe_id,
            user_id: 2,
            user_name: None,
            text: "Очень вкусно".into(),
            rating,
            date: None,
            likes: None,
        }
    }

    #[test]
    fn average_rounds_half_up() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[5, 4]), Some(4.5));
        assert_eq!(average_rating(&[5, 4, 4]), Some(4.3));
        assert_eq!(average_rating(&[5, 5, 4]), Some(4.7));
        // 85 / 20 = 4.25 exactly
        let mut ratings = vec![5u8; 5];
        ratings.extend(vec![4u8; 15]);
        assert_eq!(average_rating(&ratings), Some(4.3));
    }

    #[tokio::test]
    async fn add_comment_recomputes_rating() {
        let catalog = test_catalog();
        // Seeded comments on recipe 1 rate it 5 and 4.
        let added = catalog.add_comment(comment(1, 3)).await.unwrap();
        assert_eq!(added.id, 5);
        assert_eq!(added.user_name, "армен");
        assert_eq!(added.likes, 0);

        let recipe = catalog.recipe(1).await.unwrap().unwrap();
        assert_eq!(recipe.rating, 4.0);

        catalog.add_comment(comment(1, 5)).await.unwrap();
        let recipe = catalog.recipe(1).await.unwrap().unwrap();
        assert_eq!(recipe.rating, 4.3);
    }

    #[tokio::test]
    async fn first_comment_sets_rating() {
        let catalog = test_catalog();
        catalog.add_comment(comment(40, 2)).await.unwrap();
        assert_eq!(catalog.recipe(40).await.unwrap().unwrap().rating, 2.0);
    }

    #[tokio::test]
    async fn explicit_user_name_is_kept() {
        let catalog = test_catalog();
        let mut input = comment(2, 5);
        input.user_name = Some("гость".into());
        input.user_id = 99;
        let added = catalog.add_comment(input).await.unwrap();
        assert_eq!(added.user_name, "гость");
    }

    #[tokio::test]
    async fn invalid_comments_are_rejected() {
        let catalog = test_catalog();
        for rating in [0, 6] {
            let err = catalog.add_comment(comment(1, rating)).await.unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }

        let mut blank = comment(1, 4);
        blank.text = "  ".into();
        assert!(catalog.add_comment(blank).await.is_err());

        let mut anonymous = comment(1, 4);
        anonymous.user_id = 99;
        assert!(catalog.add_comment(anonymous).await.is_err());

        assert_eq!(catalog.comments_for_recipe(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn comments_by_user_uses_the_index() {
        let catalog = test_catalog();
        let by_gayane = catalog.comments_by_user(3).await.unwrap();
        let recipes: Vec<i64> = by_gayane.iter().map(|c| c.recipe_id).collect();
        assert_eq!(recipes, vec![1, 7]);
    }

    #[tokio::test]
    async fn refreshing_without_comments_changes_nothing() {
        let catalog = test_catalog();
        assert_eq!(catalog.refresh_recipe_rating(2).await.unwrap(), None);
        assert_eq!(catalog.recipe(2).await.unwrap().unwrap().rating, 4.5);
    }
}
