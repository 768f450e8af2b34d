pub mod attributes;
pub mod category;
pub mod client;
pub mod error;
pub mod flatten;
pub mod parse;
pub mod pricing;
mod rate_limit;
pub mod types;

pub use attributes::{extract_attributes, ExtractedAttributes};
pub use category::CategoryMapper;
pub use client::{ZureoClient, ZureoSettings};
pub use error::ZureoError;
pub use flatten::{flatten_product, slugify, FlattenContext};
pub use pricing::{compute_price, price_breakdown, PriceBreakdown, DEFAULT_TAX_MULTIPLIER};
pub use types::{ZureoAttribute, ZureoImage, ZureoProduct, ZureoVariety};
