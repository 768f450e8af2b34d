//! Multi-page product fetch loop for `ZureoClient`.

use std::time::Duration;

use crate::error::ZureoError;
use crate::rate_limit::{retry_rate_limited, RateLimitPolicy};
use crate::types::ZureoProduct;

use super::ZureoClient;
use super::MAX_PAGES;

impl ZureoClient {
    /// Fetches the whole Zureo catalog by walking `from`/`qty` offsets.
    ///
    /// Pages are requested one at a time. Before every page except the first
    /// the client sleeps `page_delay`, or `slow_page_delay` after every
    /// `slow_page_every` pages. A 429 retries the same offset with bounded
    /// exponential backoff. The loop ends on the first page shorter than
    /// `page_size`, including an empty one. An empty first page (`[]` or a
    /// `null` envelope) is an error: Zureo never reports a store with no
    /// products, and reconciling against it would deactivate the catalog.
    ///
    /// **All-or-nothing semantics**: on any page failure, already-fetched
    /// products are discarded and the error is returned. A partial list would
    /// make reconciliation deactivate everything past the failed page.
    ///
    /// # Errors
    ///
    /// - [`ZureoError::MalformedResponse`] when the first page is empty.
    /// - [`ZureoError::RateLimitExhausted`] when 429s outlast the retry budget.
    /// - [`ZureoError::PaginationLimit`] if more than [`MAX_PAGES`] pages are
    ///   returned.
    /// - Any other error from [`Self::fetch_products_page`].
    pub async fn fetch_all_products(
        &self,
        page_size: u32,
    ) -> Result<Vec<ZureoProduct>, ZureoError> {
        let page_size = page_size.max(1);
        let policy = RateLimitPolicy {
            max_retries: self.settings.max_rate_limit_retries,
            cooldown: self.settings.rate_limit_cooldown,
        };

        let mut all_products: Vec<ZureoProduct> = Vec::new();
        let mut offset: u64 = 0;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ZureoError::PaginationLimit {
                    max_pages: MAX_PAGES,
                });
            }

            if page_count > 1 {
                let delay = self.delay_before_page(page_count);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let page = retry_rate_limited(policy, offset, || {
                self.fetch_products_page(offset, page_size)
            })
            .await?;

            let received = page.len();
            if page_count == 1 && received == 0 {
                return Err(ZureoError::MalformedResponse {
                    context: format!("product/all from={offset}"),
                    reason: "first page has no products".to_owned(),
                });
            }
            all_products.extend(page);

            tracing::debug!(
                offset,
                received,
                total = all_products.len(),
                "fetched zureo product page"
            );

            if received < page_size as usize {
                break;
            }
            offset += received as u64;
        }

        tracing::info!(
            pages = page_count,
            products = all_products.len(),
            "zureo catalog fetch complete"
        );

        Ok(all_products)
    }

    /// Delay before the 1-based page `page_number` (never called for page 1).
    pub(super) fn delay_before_page(&self, page_number: usize) -> Duration {
        let every = self.settings.slow_page_every as usize;
        if every > 0 && (page_number - 1) % every == 0 {
            self.settings.slow_page_delay
        } else {
            self.settings.page_delay
        }
    }
}
