//! Merchandising overrides: admin-owned fields keyed by `sync_key`.
//!
//! Sync never writes this table. A `NULL` column means "no override" and the
//! catalog fact shows through at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CatalogOverrideRow {
    pub sync_key: String,
    pub custom_name: Option<String>,
    pub custom_price: Option<i64>,
    pub image_url: Option<String>,
    pub is_featured: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewCatalogOverride {
    pub custom_name: Option<String>,
    pub custom_price: Option<i64>,
    pub image_url: Option<String>,
    pub is_featured: Option<bool>,
}

impl NewCatalogOverride {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.custom_name.is_none()
            && self.custom_price.is_none()
            && self.image_url.is_none()
            && self.is_featured.is_none()
    }
}

/// Create the override for `sync_key`, or merge `fields` into the existing
/// one. Fields left `None` keep their stored value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_catalog_override(
    pool: &PgPool,
    sync_key: &str,
    fields: &NewCatalogOverride,
) -> Result<CatalogOverrideRow, DbError> {
    let row = sqlx::query_as::<_, CatalogOverrideRow>(
        "INSERT INTO catalog_overrides \
             (sync_key, custom_name, custom_price, image_url, is_featured) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (sync_key) DO UPDATE SET \
             custom_name  = COALESCE(EXCLUDED.custom_name, catalog_overrides.custom_name), \
             custom_price = COALESCE(EXCLUDED.custom_price, catalog_overrides.custom_price), \
             image_url    = COALESCE(EXCLUDED.image_url, catalog_overrides.image_url), \
             is_featured  = COALESCE(EXCLUDED.is_featured, catalog_overrides.is_featured), \
             updated_at   = NOW() \
         RETURNING sync_key, custom_name, custom_price, image_url, is_featured, \
                   created_at, updated_at",
    )
    .bind(sync_key)
    .bind(fields.custom_name.as_deref())
    .bind(fields.custom_price)
    .bind(fields.image_url.as_deref())
    .bind(fields.is_featured)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// The stored override for `sync_key`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_catalog_override(
    pool: &PgPool,
    sync_key: &str,
) -> Result<Option<CatalogOverrideRow>, DbError> {
    let row = sqlx::query_as::<_, CatalogOverrideRow>(
        "SELECT sync_key, custom_name, custom_price, image_url, is_featured, \
                created_at, updated_at \
         FROM catalog_overrides \
         WHERE sync_key = $1",
    )
    .bind(sync_key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Remove the override for `sync_key`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no override exists, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn delete_catalog_override(pool: &PgPool, sync_key: &str) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM catalog_overrides WHERE sync_key = $1")
        .bind(sync_key)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
