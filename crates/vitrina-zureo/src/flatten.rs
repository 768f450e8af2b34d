//! Flattens nested Zureo products into catalog rows.

use chrono::{DateTime, Utc};

use vitrina_core::{sync_key, CatalogRow};

use crate::attributes::{extract_attributes, ExtractedAttributes};
use crate::pricing::price_breakdown;
use crate::types::{round_stock, ZureoProduct, ZureoVariety};

/// Values shared by every row produced in one sync run.
#[derive(Debug, Clone)]
pub struct FlattenContext {
    pub synced_at: DateTime<Utc>,
    pub placeholder_image_url: String,
}

/// Expands one product into catalog rows.
///
/// One row per variety with stock; if no variety has stock, one variantless
/// row when the product itself has stock; otherwise nothing. Stock counts
/// after rounding, so no row is ever written with zero stock. `subcategory` is
/// the mapper's result for the product's type label.
#[must_use]
pub fn flatten_product(
    product: &ZureoProduct,
    subcategory: Option<&str>,
    ctx: &FlattenContext,
) -> Vec<CatalogRow> {
    let stocked: Vec<&ZureoVariety> = product
        .varieties
        .iter()
        .filter(|v| v.is_active())
        .collect();

    if !stocked.is_empty() {
        return stocked
            .into_iter()
            .map(|variety| {
                build_row(
                    product,
                    Some(variety),
                    extract_attributes(variety),
                    subcategory,
                    ctx,
                )
            })
            .collect();
    }

    if round_stock(product.stock) > 0 {
        return vec![build_row(
            product,
            None,
            ExtractedAttributes::default(),
            subcategory,
            ctx,
        )];
    }

    Vec::new()
}

fn build_row(
    product: &ZureoProduct,
    variety: Option<&ZureoVariety>,
    attributes: ExtractedAttributes,
    subcategory: Option<&str>,
    ctx: &FlattenContext,
) -> CatalogRow {
    let variety_id = variety.map(|v| v.id);
    let stock = variety.map_or(product.stock, |v| v.stock);
    let pricing = price_breakdown(
        product.base_price,
        variety.and_then(|v| v.price),
        product.tax_multiplier,
    );

    let short_description = non_empty(product.short_description.as_deref());
    let description =
        non_empty(product.long_description.as_deref()).or_else(|| short_description.clone());

    CatalogRow {
        external_product_id: product.id,
        external_code: product.code.trim().to_owned(),
        external_variety_id: variety_id,
        sync_key: sync_key(product.code.trim(), variety_id),
        name: product.name.trim().to_owned(),
        slug: slugify(&product.name, variety_id),
        description,
        short_description,
        price: pricing.price,
        source_price: pricing.source_price,
        tax_multiplier: pricing.tax_multiplier,
        stock: round_stock(stock),
        category: non_empty(product.product_type.as_deref()),
        subcategory: subcategory.map(str::to_owned),
        brand: normalize_brand(product.brand.as_deref()),
        color: attributes.color,
        size: attributes.size,
        attributes_inferred: attributes.inferred,
        image_url: ctx.placeholder_image_url.clone(),
        is_featured: false,
        raw_payload: product.raw.clone(),
        synced_at: ctx.synced_at,
    }
}

/// URL slug for a product name, suffixed with the variety id when present.
///
/// `"Remera Básica Niño"` with variety `7` becomes `"remera-basica-nino-7"`.
#[must_use]
pub fn slugify(name: &str, variety_id: Option<i64>) -> String {
    let mut slug = String::with_capacity(name.len() + 8);
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let c = fold_diacritic(c);
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if let Some(id) = variety_id {
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&id.to_string());
    }

    slug
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

fn normalize_brand(brand: Option<&str>) -> Option<String> {
    non_empty(brand).map(|b| b.to_uppercase())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "flatten_test.rs"]
mod tests;
