//! Database operations for the `catalog_rows` table.
//!
//! Writes take batches of [`CatalogRow`] and bind them column-wise through
//! `UNNEST`, so one batch is one round-trip. Reads join `catalog_overrides` so
//! admin edits win over sync-owned facts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row};

use vitrina_core::CatalogRow;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

/// A catalog row as the storefront sees it: sync facts with merchandising
/// overrides applied.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CatalogItemRow {
    pub id: i64,
    pub sync_key: String,
    pub external_product_id: i64,
    pub external_code: String,
    pub external_variety_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: i64,
    pub source_price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub attributes_inferred: bool,
    pub image_url: String,
    pub is_featured: bool,
    pub has_override: bool,
    pub is_active: bool,
    pub synced_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for [`list_catalog`]. `brand` is compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl CatalogFilter {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Column-major copy of a batch, shaped for `UNNEST` binding.
struct CatalogColumns {
    sync_keys: Vec<String>,
    product_ids: Vec<i64>,
    codes: Vec<String>,
    variety_ids: Vec<Option<i64>>,
    names: Vec<String>,
    slugs: Vec<String>,
    descriptions: Vec<Option<String>>,
    short_descriptions: Vec<Option<String>>,
    prices: Vec<i64>,
    source_prices: Vec<Decimal>,
    tax_multipliers: Vec<Decimal>,
    stocks: Vec<i32>,
    categories: Vec<Option<String>>,
    subcategories: Vec<Option<String>>,
    brands: Vec<Option<String>>,
    colors: Vec<Option<String>>,
    sizes: Vec<Option<String>>,
    inferred: Vec<bool>,
    image_urls: Vec<String>,
    featured: Vec<bool>,
    payloads: Vec<serde_json::Value>,
    synced_ats: Vec<DateTime<Utc>>,
}

impl CatalogColumns {
    fn from_rows(rows: &[CatalogRow]) -> Self {
        let n = rows.len();
        let mut cols = Self {
            sync_keys: Vec::with_capacity(n),
            product_ids: Vec::with_capacity(n),
            codes: Vec::with_capacity(n),
            variety_ids: Vec::with_capacity(n),
            names: Vec::with_capacity(n),
            slugs: Vec::with_capacity(n),
            descriptions: Vec::with_capacity(n),
            short_descriptions: Vec::with_capacity(n),
            prices: Vec::with_capacity(n),
            source_prices: Vec::with_capacity(n),
            tax_multipliers: Vec::with_capacity(n),
            stocks: Vec::with_capacity(n),
            categories: Vec::with_capacity(n),
            subcategories: Vec::with_capacity(n),
            brands: Vec::with_capacity(n),
            colors: Vec::with_capacity(n),
            sizes: Vec::with_capacity(n),
            inferred: Vec::with_capacity(n),
            image_urls: Vec::with_capacity(n),
            featured: Vec::with_capacity(n),
            payloads: Vec::with_capacity(n),
            synced_ats: Vec::with_capacity(n),
        };

        for row in rows {
            cols.sync_keys.push(row.sync_key.clone());
            cols.product_ids.push(row.external_product_id);
            cols.codes.push(row.external_code.clone());
            cols.variety_ids.push(row.external_variety_id);
            cols.names.push(row.name.clone());
            cols.slugs.push(row.slug.clone());
            cols.descriptions.push(row.description.clone());
            cols.short_descriptions.push(row.short_description.clone());
            cols.prices.push(row.price);
            cols.source_prices.push(row.source_price);
            cols.tax_multipliers.push(row.tax_multiplier);
            cols.stocks.push(row.stock);
            cols.categories.push(row.category.clone());
            cols.subcategories.push(row.subcategory.clone());
            cols.brands.push(row.brand.clone());
            cols.colors.push(row.color.clone());
            cols.sizes.push(row.size.clone());
            cols.inferred.push(row.attributes_inferred);
            cols.image_urls.push(row.image_url.clone());
            cols.featured.push(row.is_featured);
            cols.payloads.push(row.raw_payload.clone());
            cols.synced_ats.push(row.synced_at);
        }

        cols
    }

    fn bind<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        query
            .bind(&self.sync_keys)
            .bind(&self.product_ids)
            .bind(&self.codes)
            .bind(&self.variety_ids)
            .bind(&self.names)
            .bind(&self.slugs)
            .bind(&self.descriptions)
            .bind(&self.short_descriptions)
            .bind(&self.prices)
            .bind(&self.source_prices)
            .bind(&self.tax_multipliers)
            .bind(&self.stocks)
            .bind(&self.categories)
            .bind(&self.subcategories)
            .bind(&self.brands)
            .bind(&self.colors)
            .bind(&self.sizes)
            .bind(&self.inferred)
            .bind(&self.image_urls)
            .bind(&self.featured)
            .bind(&self.payloads)
            .bind(&self.synced_ats)
    }
}

const INSERT_COLUMNS: &str = "(sync_key, external_product_id, external_code, external_variety_id, \
      name, slug, description, short_description, price, source_price, tax_multiplier, \
      stock, category, subcategory, brand, color, size, attributes_inferred, image_url, \
      is_featured, raw_payload, synced_at)";

const UNNEST_SOURCE: &str = "SELECT * FROM UNNEST(\
      $1::text[], $2::int8[], $3::text[], $4::int8[], $5::text[], $6::text[], $7::text[], \
      $8::text[], $9::int8[], $10::numeric[], $11::numeric[], $12::int4[], $13::text[], \
      $14::text[], $15::text[], $16::text[], $17::text[], $18::bool[], $19::text[], \
      $20::bool[], $21::jsonb[], $22::timestamptz[])";

/// Insert a batch of rows. Used by the full-replace strategy after
/// [`delete_all_catalog_rows`]; a duplicate `sync_key` fails the whole batch.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_catalog_rows(pool: &PgPool, rows: &[CatalogRow]) -> Result<u64, sqlx::Error> {
    if rows.is_empty() {
        return Ok(0);
    }

    let cols = CatalogColumns::from_rows(rows);
    let sql = format!("INSERT INTO catalog_rows {INSERT_COLUMNS} {UNNEST_SOURCE}");

    let rows_affected = cols
        .bind(sqlx::query(&sql))
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected)
}

/// Insert new rows and update existing ones by `sync_key`.
///
/// Returns `(inserted, updated)`. Existing rows keep their surrogate `id`,
/// `image_url` and `is_featured`, and are reactivated if they had been
/// soft-deleted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn upsert_catalog_rows(
    pool: &PgPool,
    rows: &[CatalogRow],
) -> Result<(u64, u64), sqlx::Error> {
    if rows.is_empty() {
        return Ok((0, 0));
    }

    let cols = CatalogColumns::from_rows(rows);
    let sql = format!(
        "INSERT INTO catalog_rows {INSERT_COLUMNS} {UNNEST_SOURCE} \
         ON CONFLICT (sync_key) DO UPDATE SET \
             external_product_id  = EXCLUDED.external_product_id, \
             external_code        = EXCLUDED.external_code, \
             external_variety_id  = EXCLUDED.external_variety_id, \
             name                 = EXCLUDED.name, \
             slug                 = EXCLUDED.slug, \
             description          = EXCLUDED.description, \
             short_description    = EXCLUDED.short_description, \
             price                = EXCLUDED.price, \
             source_price         = EXCLUDED.source_price, \
             tax_multiplier       = EXCLUDED.tax_multiplier, \
             stock                = EXCLUDED.stock, \
             category             = EXCLUDED.category, \
             subcategory          = EXCLUDED.subcategory, \
             brand                = EXCLUDED.brand, \
             color                = EXCLUDED.color, \
             size                 = EXCLUDED.size, \
             attributes_inferred  = EXCLUDED.attributes_inferred, \
             raw_payload          = EXCLUDED.raw_payload, \
             synced_at            = EXCLUDED.synced_at, \
             is_active            = TRUE, \
             updated_at           = NOW() \
         RETURNING (xmax = 0) AS is_new"
    );

    let flags: Vec<bool> = cols
        .bind(sqlx::query(&sql))
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.try_get("is_new"))
        .collect::<Result<_, _>>()?;

    let inserted = flags.iter().filter(|&&is_new| is_new).count() as u64;
    let updated = flags.len() as u64 - inserted;

    Ok((inserted, updated))
}

/// Delete every catalog row. Overrides are untouched.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn delete_all_catalog_rows(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let rows_affected = sqlx::query("DELETE FROM catalog_rows")
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected)
}

/// Mark active rows whose `sync_key` is NOT in `seen_keys` as inactive.
///
/// With an empty `seen_keys` every active row is deactivated;
/// `sync_key != ALL('{}')` is `TRUE` for every row.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn deactivate_missing_catalog_rows(
    pool: &PgPool,
    seen_keys: &[String],
) -> Result<u64, sqlx::Error> {
    let rows_affected = sqlx::query(
        "UPDATE catalog_rows \
         SET is_active = FALSE, updated_at = NOW() \
         WHERE is_active = TRUE \
           AND sync_key != ALL($1::text[])",
    )
    .bind(seen_keys)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

const SELECT_ITEM: &str = "SELECT \
        c.id, c.sync_key, c.external_product_id, c.external_code, c.external_variety_id, \
        COALESCE(o.custom_name, c.name) AS name, \
        c.slug, c.description, c.short_description, \
        COALESCE(o.custom_price, c.price) AS price, \
        c.source_price, c.stock, c.category, c.subcategory, c.brand, c.color, c.size, \
        c.attributes_inferred, \
        COALESCE(o.image_url, c.image_url) AS image_url, \
        COALESCE(o.is_featured, c.is_featured) AS is_featured, \
        (o.sync_key IS NOT NULL) AS has_override, \
        c.is_active, c.synced_at, c.updated_at \
     FROM catalog_rows c \
     LEFT JOIN catalog_overrides o ON o.sync_key = c.sync_key";

/// List catalog rows with overrides applied, ordered by code then variety.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_catalog(
    pool: &PgPool,
    filter: &CatalogFilter,
) -> Result<Vec<CatalogItemRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_ITEM} \
         WHERE ($1::text IS NULL OR LOWER(c.subcategory) = LOWER($1)) \
           AND ($2::text IS NULL OR c.brand = UPPER($2)) \
           AND ($3 OR c.is_active) \
         ORDER BY c.external_code, c.external_variety_id NULLS FIRST \
         LIMIT $4 OFFSET $5"
    );

    sqlx::query_as::<_, CatalogItemRow>(&sql)
        .bind(filter.subcategory.as_deref())
        .bind(filter.brand.as_deref())
        .bind(filter.include_inactive)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(pool)
        .await
}

/// Fetch one catalog row by `sync_key`, active or not.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn get_catalog_item(
    pool: &PgPool,
    sync_key: &str,
) -> Result<Option<CatalogItemRow>, sqlx::Error> {
    let sql = format!("{SELECT_ITEM} WHERE c.sync_key = $1");

    sqlx::query_as::<_, CatalogItemRow>(&sql)
        .bind(sync_key)
        .fetch_optional(pool)
        .await
}
