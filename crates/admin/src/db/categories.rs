//! Category editing.

use sqlx::PgPool;

use malmequer_core::CategoryId;
use malmequer_storefront::models::Category;

use super::RepositoryError;
use crate::models::{AdminCategory, ValidCategory};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, parent_id";

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories with product counts (every product status).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AdminCategory>, RepositoryError> {
        let categories = sqlx::query_as::<_, AdminCategory>(
            r"
            SELECT c.id, c.name, c.slug, c.description, c.parent_id,
                   COUNT(p.id) AS product_count
            FROM shop.category c
            LEFT JOIN shop.product p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM shop.category WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, valid: &ValidCategory) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            INSERT INTO shop.category (name, slug, description, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(valid.input.name.trim())
        .bind(&valid.slug)
        .bind(valid.input.description.as_deref())
        .bind(valid.input.parent_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "category slug"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such category, or
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        valid: &ValidCategory,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            UPDATE shop.category
            SET name = $2, slug = $3, description = $4, parent_id = $5, updated_at = now()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(valid.input.name.trim())
        .bind(&valid.slug)
        .bind(valid.input.description.as_deref())
        .bind(valid.input.parent_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "category slug"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category that no product uses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` while products reference it, or
    /// `RepositoryError::NotFound` if there is no such category.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.product WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if in_use > 0 {
            return Err(RepositoryError::Conflict(format!(
                "category is used by {in_use} product(s)"
            )));
        }

        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::Conflict("category is still referenced".to_string())
                }
                other => RepositoryError::Database(other),
            })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
