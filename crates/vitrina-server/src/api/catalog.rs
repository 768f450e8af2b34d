//! Catalog read and merchandising override handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use vitrina_db::{CatalogFilter, CatalogItemRow, CatalogOverrideRow, DbError, NewCatalogOverride};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CatalogQuery {
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub include_inactive: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/catalog
pub(super) async fn list_catalog(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<ApiResponse<Vec<CatalogItemRow>>>, ApiError> {
    let filter = CatalogFilter {
        subcategory: query.subcategory,
        brand: query.brand,
        include_inactive: query.include_inactive.unwrap_or(false),
        limit: query.limit,
        offset: query.offset,
    };

    let rows = vitrina_db::list_catalog(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &DbError::Sqlx(e)))?;

    Ok(Json(ApiResponse {
        data: rows,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/catalog/{sync_key}
pub(super) async fn get_catalog_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(sync_key): Path<String>,
) -> Result<Json<ApiResponse<CatalogItemRow>>, ApiError> {
    let item = resolve_item(&state, &sync_key, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: item,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/catalog/{sync_key}/overrides
pub(super) async fn get_override(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(sync_key): Path<String>,
) -> Result<Json<ApiResponse<CatalogOverrideRow>>, ApiError> {
    let row = vitrina_db::get_catalog_override(&state.pool, &sync_key)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("no override for '{sync_key}'"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/catalog/{sync_key}/overrides
///
/// Merges into any existing override; omitted fields keep their value.
pub(super) async fn put_override(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(sync_key): Path<String>,
    Json(body): Json<NewCatalogOverride>,
) -> Result<Json<ApiResponse<CatalogOverrideRow>>, ApiError> {
    let rid = &req_id.0;
    let body = validate_override(rid, body)?;
    resolve_item(&state, &sync_key, rid).await?;

    let row = vitrina_db::upsert_catalog_override(&state.pool, &sync_key, &body)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(sync_key = %sync_key, "catalog override saved");

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/catalog/{sync_key}/overrides
pub(super) async fn delete_override(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(sync_key): Path<String>,
) -> Result<StatusCode, ApiError> {
    match vitrina_db::delete_catalog_override(&state.pool, &sync_key).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(DbError::NotFound) => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no override for '{sync_key}'"),
        )),
        Err(e) => Err(map_db_error(req_id.0, &e)),
    }
}

async fn resolve_item(
    state: &AppState,
    sync_key: &str,
    request_id: &str,
) -> Result<CatalogItemRow, ApiError> {
    vitrina_db::get_catalog_item(&state.pool, sync_key)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &DbError::Sqlx(e)))?
        .ok_or_else(|| {
            ApiError::new(
                request_id,
                "not_found",
                format!("catalog item '{sync_key}' not found"),
            )
        })
}

/// Trims text fields and rejects overrides that would set nothing or hold
/// nonsensical values.
fn validate_override(
    req_id: &str,
    mut body: NewCatalogOverride,
) -> Result<NewCatalogOverride, ApiError> {
    let invalid = |message: &str| ApiError::new(req_id, "validation_error", message);

    body.custom_name = body.custom_name.map(|n| n.trim().to_owned());
    if body.custom_name.as_deref() == Some("") {
        return Err(invalid("custom_name must not be blank"));
    }

    if body.custom_price.is_some_and(|p| p < 0) {
        return Err(invalid("custom_price must not be negative"));
    }

    body.image_url = body.image_url.map(|u| u.trim().to_owned());
    if let Some(url) = body.image_url.as_deref() {
        let is_relative = url.starts_with('/');
        let is_http = reqwest::Url::parse(url)
            .is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"));
        if !is_relative && !is_http {
            return Err(invalid(
                "image_url must be an http(s) URL or a path starting with '/'",
            ));
        }
    }

    if body.is_empty() {
        return Err(invalid("override must set at least one field"));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_override_is_rejected() {
        let err = validate_override("req", NewCatalogOverride::default()).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn blank_name_is_rejected() {
        let body = NewCatalogOverride {
            custom_name: Some("   ".to_string()),
            ..NewCatalogOverride::default()
        };
        assert!(validate_override("req", body).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let body = NewCatalogOverride {
            custom_price: Some(-1),
            ..NewCatalogOverride::default()
        };
        assert!(validate_override("req", body).is_err());
    }

    #[test]
    fn image_url_must_be_http_or_path() {
        for ok in ["https://cdn.example.com/a.jpg", "/img/a.jpg"] {
            let body = NewCatalogOverride {
                image_url: Some(ok.to_string()),
                ..NewCatalogOverride::default()
            };
            assert!(validate_override("req", body).is_ok(), "{ok} should pass");
        }

        let body = NewCatalogOverride {
            image_url: Some("ftp://example.com/a.jpg".to_string()),
            ..NewCatalogOverride::default()
        };
        assert!(validate_override("req", body).is_err());
    }

    #[test]
    fn name_is_trimmed() {
        let body = NewCatalogOverride {
            custom_name: Some("  Remera Destacada ".to_string()),
            is_featured: Some(true),
            ..NewCatalogOverride::default()
        };
        let cleaned = validate_override("req", body).unwrap();
        assert_eq!(cleaned.custom_name.as_deref(), Some("Remera Destacada"));
    }
}
