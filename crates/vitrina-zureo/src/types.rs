//! Zureo SDK response types.
//!
//! ## Product shape (`GET /sdk/v1/product/all`)
//!
//! The page envelope is `{ "data": [ ... ] }`. Field names are Spanish:
//!
//! | Zureo field          | Rust field          | Notes                                  |
//! |----------------------|---------------------|----------------------------------------|
//! | `id`                 | `id`                | numeric                                |
//! | `codigo`             | `code`              | merchant SKU code, part of natural key |
//! | `nombre`             | `name`              |                                        |
//! | `descripcion_larga`  | `long_description`  | may be `null` or `""`                  |
//! | `descripcion_corta`  | `short_description` | may be `null` or `""`                  |
//! | `precio`             | `base_price`        | pre-tax, may be `null`                 |
//! | `impuesto`           | `tax_multiplier`    | e.g. `1.22`; `null` or `0` when unset  |
//! | `stock`              | `stock`             | may be fractional                      |
//! | `tipo`               | `product_type`      | free-text product-type label           |
//! | `marca`              | `brand`             | free-text brand label                  |
//! | `variedades`         | `varieties`         | `null` for variantless products        |
//!
//! Varieties carry `id`, `nombre`, `stock`, `precio` and `atributos`, the
//! latter a list of `{ "atributo": ..., "valor": ... }` pairs. English
//! spellings are accepted as aliases.
//!
//! ## Login (`POST /sdk/v1/security/login`)
//!
//! `{ "token": "...", "valid_to": ... }` where `valid_to` has been seen as an
//! RFC 3339 timestamp, a naive UTC timestamp, and epoch seconds.

use serde::{Deserialize, Deserializer};

/// A single product from the Zureo inventory.
#[derive(Debug, Clone, Deserialize)]
pub struct ZureoProduct {
    pub id: i64,

    #[serde(rename = "codigo", alias = "code")]
    pub code: String,

    #[serde(rename = "nombre", alias = "name")]
    pub name: String,

    #[serde(default, rename = "descripcion_larga", alias = "long_description")]
    pub long_description: Option<String>,

    #[serde(default, rename = "descripcion_corta", alias = "short_description")]
    pub short_description: Option<String>,

    #[serde(default, rename = "precio", alias = "price")]
    pub base_price: Option<f64>,

    #[serde(default, rename = "impuesto", alias = "tax")]
    pub tax_multiplier: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub stock: f64,

    #[serde(default, rename = "tipo", alias = "type")]
    pub product_type: Option<String>,

    #[serde(default, rename = "marca", alias = "brand")]
    pub brand: Option<String>,

    #[serde(
        default,
        rename = "variedades",
        alias = "varieties",
        deserialize_with = "null_as_default"
    )]
    pub varieties: Vec<ZureoVariety>,

    /// The product JSON exactly as received, filled in by the page parser.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// A SKU-level variant of a [`ZureoProduct`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZureoVariety {
    pub id: i64,

    #[serde(default, rename = "nombre", alias = "name")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub stock: f64,

    #[serde(default, rename = "precio", alias = "price")]
    pub price: Option<f64>,

    #[serde(
        default,
        rename = "atributos",
        alias = "attributes",
        deserialize_with = "null_as_default"
    )]
    pub attributes: Vec<ZureoAttribute>,
}

impl ZureoVariety {
    /// Active when the stored, rounded stock is positive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        round_stock(self.stock) > 0
    }
}

/// Stock as written to the catalog: rounded, never negative.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn round_stock(stock: f64) -> i32 {
    // `as` saturates at the i32 bounds and maps NaN to 0.
    stock.round().max(0.0) as i32
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ZureoAttribute {
    #[serde(default, rename = "atributo", alias = "nombre", alias = "name")]
    pub name: Option<String>,

    #[serde(default, rename = "valor", alias = "value")]
    pub value: Option<String>,
}

/// One image from `GET /sdk/v1/product/image`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZureoImage {
    pub base64: String,

    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default, rename = "descripcion", alias = "description")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    #[serde(alias = "validTo")]
    pub valid_to: ValidTo,
}

/// Token expiry as sent by Zureo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ValidTo {
    EpochSeconds(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagesResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<ZureoImage>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
