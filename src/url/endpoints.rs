use crate::url::SellerHash;
use thiserror::Error;
use url::Url;

/// Path of the search listing-index endpoint
pub const SEARCH_INDEX_PATH: &str = "/web/1/js/items";

/// Path of the seller profile listing-index endpoint
pub const SHOP_INDEX_PATH: &str = "/web/1/profile/public/items";

/// Lowest price a search result may carry
pub const MINIMUM_PRICE: u32 = 1;

/// Builds the search index URL for one page of results
///
/// The query carries the search text, the page number, the region id and
/// the fixed filters (minimum price 1, private and business sellers).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use listing_harvester::url::search_index_url;
///
/// let base = Url::parse("https://www.avito.ru").unwrap();
/// let url = search_index_url(&base, "lamp", 637640, 2).unwrap();
/// assert!(url.as_str().starts_with("https://www.avito.ru/web/1/js/items?name=lamp&p=2&locationId=637640"));
/// ```
pub fn search_index_url(
    base: &Url,
    text: &str,
    region_id: u32,
    page_number: u32,
) -> Result<Url, url::ParseError> {
    let mut url = base.join(SEARCH_INDEX_PATH)?;
    url.query_pairs_mut()
        .append_pair("name", text)
        .append_pair("p", &page_number.to_string())
        .append_pair("locationId", &region_id.to_string())
        .append_pair("bt", "1")
        .append_pair("pmin", &MINIMUM_PRICE.to_string())
        .append_pair("cd", "0")
        .append_pair("localPriority", "1");
    Ok(url)
}

/// Builds the seller profile index URL for one window of listings
pub fn shop_index_url(
    base: &Url,
    seller: &SellerHash,
    offset: u32,
    limit: u32,
) -> Result<Url, url::ParseError> {
    let mut url = base.join(SHOP_INDEX_PATH)?;
    url.query_pairs_mut()
        .append_pair("hashUserId", seller.as_str())
        .append_pair("shortcut", "active")
        .append_pair("offset", &offset.to_string())
        .append_pair("limit", &limit.to_string());
    Ok(url)
}

/// Reasons a listing path does not resolve to a detail page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetailPathError {
    #[error("path is not origin-relative: {0:?}")]
    NotOriginRelative(String),

    #[error("path leaves the marketplace origin: {0}")]
    ForeignOrigin(String),

    #[error(transparent)]
    Parse(#[from] url::ParseError),
}

/// Resolves a listing's relative path against the marketplace origin
///
/// Only plain origin-relative paths (a single leading `/`) are accepted.
/// Absolute and protocol-relative references are rejected, and so is any
/// path whose resolution lands on a different scheme, host or port, so a
/// detail request never leaves the marketplace.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use listing_harvester::url::detail_url;
///
/// let base = Url::parse("https://www.avito.ru").unwrap();
/// assert!(detail_url(&base, "/moskva/lamp_1").is_ok());
/// assert!(detail_url(&base, "//elsewhere.example/lamp_1").is_err());
/// ```
pub fn detail_url(base: &Url, path: &str) -> Result<Url, DetailPathError> {
    let path = path.trim();
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(DetailPathError::NotOriginRelative(path.to_string()));
    }

    let url = base.join(path)?;
    let same_origin = url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default();
    if !same_origin {
        return Err(DetailPathError::ForeignOrigin(url.to_string()));
    }

    Ok(url)
}
