//! Product image lookup, consumed by the separate image sync.

use reqwest::StatusCode;

use crate::error::ZureoError;
use crate::parse::parse_images;
use crate::types::ZureoImage;

use super::{truncate_body, ZureoClient};

impl ZureoClient {
    /// Fetches the images Zureo stores for a product, or for one of its
    /// varieties when `variety_id` is given.
    ///
    /// # Errors
    ///
    /// - [`ZureoError::RateLimited`] on HTTP 429 (not retried here).
    /// - [`ZureoError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ZureoError::MalformedResponse`] if the body does not parse.
    /// - [`ZureoError::Authentication`] / [`ZureoError::Http`] as for any data call.
    pub async fn fetch_product_images(
        &self,
        product_id: i64,
        variety_id: Option<i64>,
    ) -> Result<Vec<ZureoImage>, ZureoError> {
        let mut params = vec![("id", product_id.to_string())];
        if let Some(variety_id) = variety_id {
            params.push(("var", variety_id.to_string()));
        }
        let url = self.endpoint("sdk/v1/product/image", &params)?;
        let context = match variety_id {
            Some(v) => format!("product/image id={product_id} var={v}"),
            None => format!("product/image id={product_id}"),
        };

        let response = self.get_authorized(&url).await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ZureoError::RateLimited { endpoint: context });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZureoError::UnexpectedStatus {
                status: status.as_u16(),
                context,
                body: truncate_body(&body),
            });
        }

        let body = response.text().await?;
        parse_images(&body, &context)
    }
}
