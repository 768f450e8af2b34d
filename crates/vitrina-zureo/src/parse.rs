//! Body parsers for Zureo responses.
//!
//! Every parser is strict: a body that is not JSON, lacks the expected
//! envelope, or contains an item that does not match the product shape fails
//! the whole response. A silently truncated page would look like the end of
//! the catalog.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::ZureoError;
use crate::types::{ImagesResponse, LoginResponse, ValidTo, ZureoImage, ZureoProduct};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses one `product/all` page. Each product keeps its raw JSON in
/// [`ZureoProduct::raw`].
///
/// # Errors
///
/// Returns [`ZureoError::MalformedResponse`] if the body is not JSON, has no
/// `data` array, or any item fails to deserialize.
pub fn parse_products_page(body: &str, context: &str) -> Result<Vec<ZureoProduct>, ZureoError> {
    let envelope: serde_json::Value =
        serde_json::from_str(body).map_err(|e| malformed(context, e.to_string()))?;

    let items = match envelope.get("data") {
        Some(serde_json::Value::Array(items)) => items,
        Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(_) => return Err(malformed(context, "`data` is not an array")),
        None => return Err(malformed(context, "missing `data` field")),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut product: ZureoProduct = serde_json::from_value(item.clone())
                .map_err(|e| malformed(context, format!("item {index}: {e}")))?;
            product.raw = item.clone();
            Ok(product)
        })
        .collect()
}

/// Parses the login body into `(token, expiry)`.
///
/// # Errors
///
/// Returns [`ZureoError::MalformedResponse`] if the body does not carry a
/// token and a recognizable `valid_to`.
pub(crate) fn parse_login_response(body: &str) -> Result<(String, DateTime<Utc>), ZureoError> {
    let login: LoginResponse =
        serde_json::from_str(body).map_err(|e| malformed("login", e.to_string()))?;

    if login.token.trim().is_empty() {
        return Err(malformed("login", "empty token"));
    }

    let expires_at = parse_valid_to(&login.valid_to)
        .ok_or_else(|| malformed("login", format!("unrecognized valid_to {:?}", login.valid_to)))?;

    Ok((login.token, expires_at))
}

/// Parses a `product/image` body.
///
/// # Errors
///
/// Returns [`ZureoError::MalformedResponse`] if the body does not match the
/// `{ data: [...] }` shape.
pub fn parse_images(body: &str, context: &str) -> Result<Vec<ZureoImage>, ZureoError> {
    let parsed: ImagesResponse =
        serde_json::from_str(body).map_err(|e| malformed(context, e.to_string()))?;
    Ok(parsed.data)
}

pub(crate) fn parse_valid_to(valid_to: &ValidTo) -> Option<DateTime<Utc>> {
    match valid_to {
        ValidTo::EpochSeconds(secs) => Utc.timestamp_opt(*secs, 0).single(),
        ValidTo::Text(text) => {
            let text = text.trim();
            if let Ok(secs) = text.parse::<i64>() {
                return Utc.timestamp_opt(secs, 0).single();
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|naive| naive.and_utc())
        }
    }
}

fn malformed(context: &str, reason: impl Into<String>) -> ZureoError {
    ZureoError::MalformedResponse {
        context: context.to_owned(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
