//! Recipe entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tempero_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `recipes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recipe {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    /// Base serving size the ingredient quantities are written for.
    pub portions: i32,
    pub created_at: Timestamp,
}

/// A row from the `recipe_ingredients` table. Rows are executed in
/// ascending `id` order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecipeIngredient {
    pub id: DbId,
    pub recipe_id: DbId,
    pub label: String,
    pub quantity_grams: i32,
}

/// A recipe together with its ordered ingredient list, as returned by the
/// read endpoints.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
}

/// DTO for `POST /recipes`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipe {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(range(min = 1, max = 20))]
    pub portions: i32,
    #[validate(length(min = 1, max = 4), nested)]
    pub ingredients: Vec<CreateIngredient>,
}

/// One ingredient in a create/update payload.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateIngredient {
    #[validate(length(min = 1, max = 60))]
    pub label: String,
    #[validate(range(min = 1, max = 500))]
    pub quantity_grams: i32,
}

/// DTO for `PUT /recipes/{id}`. Absent fields are left unchanged; a
/// present `ingredients` list replaces the previous one wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipe {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 20))]
    pub portions: Option<i32>,
    #[validate(length(min = 1, max = 4), nested)]
    pub ingredients: Option<Vec<CreateIngredient>>,
}
