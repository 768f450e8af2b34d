use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One sellable unit of the storefront catalog: a stocked Zureo variety, or a
/// whole product when it has no stocked varieties.
///
/// Sync owns every field here. Admin edits live in a separate overrides table
/// keyed by [`CatalogRow::sync_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub external_product_id: i64,
    pub external_code: String,
    /// `None` for variantless products.
    pub external_variety_id: Option<i64>,
    /// Natural key, see [`sync_key`].
    pub sync_key: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// Storefront price in whole currency units, tax applied.
    pub price: i64,
    /// Price as Zureo reports it, before the tax multiplier.
    pub source_price: Decimal,
    pub tax_multiplier: Decimal,
    pub stock: i32,
    /// Zureo product-type label, verbatim.
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Uppercased brand label.
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    /// `true` when color/size came from the variety name rather than its
    /// structured attributes.
    pub attributes_inferred: bool,
    pub image_url: String,
    pub is_featured: bool,
    /// Raw Zureo product JSON, kept for audit and debugging.
    pub raw_payload: serde_json::Value,
    pub synced_at: DateTime<Utc>,
}

impl CatalogRow {
    #[must_use]
    pub fn has_price(&self) -> bool {
        self.price > 0
    }

    #[must_use]
    pub fn is_variantless(&self) -> bool {
        self.external_variety_id.is_none()
    }
}

/// Builds the natural key of a catalog row from `(code, variety id)`.
///
/// Variantless rows end with a bare colon (`"AB1:"`), so the key stays
/// reversible and never collides with a variety row of the same code.
#[must_use]
pub fn sync_key(code: &str, variety_id: Option<i64>) -> String {
    match variety_id {
        Some(id) => format!("{code}:{id}"),
        None => format!("{code}:"),
    }
}
