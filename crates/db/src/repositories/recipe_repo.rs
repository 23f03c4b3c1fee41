//! Repository for the `recipes` and `recipe_ingredients` tables.
//!
//! A recipe and its ingredients are always written together in one
//! transaction; ingredient order (ascending id) is the execution order.

use sqlx::{PgPool, Postgres, Transaction};
use tempero_core::types::DbId;

use crate::models::recipe::{CreateIngredient, CreateRecipe, Recipe, RecipeDetail, RecipeIngredient, UpdateRecipe};

/// Column list for `recipes` queries.
const COLUMNS: &str = "id, user_id, name, portions, created_at";

/// Column list for `recipe_ingredients` queries.
const INGREDIENT_COLUMNS: &str = "id, recipe_id, label, quantity_grams";

/// Provides CRUD operations for recipes.
pub struct RecipeRepo;

impl RecipeRepo {
    /// Create a recipe with its ingredients in one transaction.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateRecipe,
    ) -> Result<RecipeDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO recipes (user_id, name, portions) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(user_id)
            .bind(&input.name)
            .bind(input.portions)
            .fetch_one(&mut *tx)
            .await?;

        let ingredients = Self::insert_ingredients(&mut tx, recipe.id, &input.ingredients).await?;

        tx.commit().await?;
        Ok(RecipeDetail {
            recipe,
            ingredients,
        })
    }

    /// Find a recipe row by ID (without ingredients).
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Recipe>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recipes WHERE id = $1");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load a recipe with its ordered ingredient list.
    pub async fn detail(pool: &PgPool, id: DbId) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let Some(recipe) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let ingredients = Self::ingredients_for(pool, id).await?;
        Ok(Some(RecipeDetail {
            recipe,
            ingredients,
        }))
    }

    /// List a user's recipes with their ingredients, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<RecipeDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM recipes WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let recipes = sqlx::query_as::<_, Recipe>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        let ids: Vec<DbId> = recipes.iter().map(|r| r.id).collect();
        let query = format!(
            "SELECT {INGREDIENT_COLUMNS} FROM recipe_ingredients \
             WHERE recipe_id = ANY($1) ORDER BY id ASC"
        );
        let all_ingredients = sqlx::query_as::<_, RecipeIngredient>(&query)
            .bind(&ids)
            .fetch_all(pool)
            .await?;

        let mut by_recipe: std::collections::HashMap<DbId, Vec<RecipeIngredient>> =
            std::collections::HashMap::new();
        for ingredient in all_ingredients {
            by_recipe
                .entry(ingredient.recipe_id)
                .or_default()
                .push(ingredient);
        }

        Ok(recipes
            .into_iter()
            .map(|recipe| {
                let ingredients = by_recipe.remove(&recipe.id).unwrap_or_default();
                RecipeDetail {
                    recipe,
                    ingredients,
                }
            })
            .collect())
    }

    /// Update a recipe; a present `ingredients` list replaces the old one.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRecipe,
    ) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE recipes SET \
                name = COALESCE($2, name), \
                portions = COALESCE($3, portions) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let Some(recipe) = sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.portions)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let ingredients = match &input.ingredients {
            Some(list) => {
                sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                Self::insert_ingredients(&mut tx, id, list).await?
            }
            None => {
                let query = format!(
                    "SELECT {INGREDIENT_COLUMNS} FROM recipe_ingredients \
                     WHERE recipe_id = $1 ORDER BY id ASC"
                );
                sqlx::query_as::<_, RecipeIngredient>(&query)
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?
            }
        };

        tx.commit().await?;
        Ok(Some(RecipeDetail {
            recipe,
            ingredients,
        }))
    }

    /// Delete a recipe. Jobs created from it keep running; their
    /// `recipe_id` goes NULL via the foreign key.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ordered ingredient list for one recipe.
    pub async fn ingredients_for(
        pool: &PgPool,
        recipe_id: DbId,
    ) -> Result<Vec<RecipeIngredient>, sqlx::Error> {
        let query = format!(
            "SELECT {INGREDIENT_COLUMNS} FROM recipe_ingredients \
             WHERE recipe_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, RecipeIngredient>(&query)
            .bind(recipe_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct ingredient labels across all of a user's recipes. Feeds
    /// the spice catalog.
    pub async fn ingredient_labels_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT ri.label FROM recipe_ingredients ri \
             JOIN recipes r ON r.id = ri.recipe_id \
             WHERE r.user_id = $1 \
             ORDER BY ri.label ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(label,)| label).collect())
    }

    async fn insert_ingredients(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: DbId,
        list: &[CreateIngredient],
    ) -> Result<Vec<RecipeIngredient>, sqlx::Error> {
        let mut out = Vec::with_capacity(list.len());
        let query = format!(
            "INSERT INTO recipe_ingredients (recipe_id, label, quantity_grams) \
             VALUES ($1, $2, $3) \
             RETURNING {INGREDIENT_COLUMNS}"
        );
        for ingredient in list {
            let row = sqlx::query_as::<_, RecipeIngredient>(&query)
                .bind(recipe_id)
                .bind(&ingredient.label)
                .bind(ingredient.quantity_grams)
                .fetch_one(&mut **tx)
                .await?;
            out.push(row);
        }
        Ok(out)
    }
}
