//! URL handling module for Listing-Harvester
//!
//! This module builds the marketplace endpoint URLs (search index, seller
//! profile index, listing detail pages) and parses seller hashes out of
//! storefront URLs.

mod endpoints;
mod seller;

// Re-export main functions
pub use endpoints::{
    detail_url, search_index_url, shop_index_url, DetailPathError, MINIMUM_PRICE,
    SEARCH_INDEX_PATH, SHOP_INDEX_PATH,
};
pub use seller::{parse_seller_hash, SellerHash, ShopUrlError, MARKETPLACE_TOKEN};
