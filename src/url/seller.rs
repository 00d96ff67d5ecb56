use std::fmt;
use thiserror::Error;

/// Literal token identifying the marketplace host segment of a shop URL
pub const MARKETPLACE_TOKEN: &str = "avito";

/// Number of path segments between the marketplace segment and the seller hash
const HASH_SEGMENT_OFFSET: usize = 2;

/// Reasons a shop URL does not yield a seller hash
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ShopUrlError {
    #[error("no segment of the URL contains the marketplace token")]
    MarketplaceTokenMissing,

    #[error("the URL ends before the seller hash segment")]
    HashSegmentMissing,

    #[error("the seller hash segment is empty")]
    EmptyHash,
}

/// Opaque seller identifier taken from a storefront URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SellerHash(String);

impl SellerHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SellerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses the seller hash out of a storefront URL
///
/// The URL is split on `/`; the first segment containing the marketplace
/// token is located and the hash is the segment two positions after it.
/// Any query string or fragment glued to the hash segment is dropped.
///
/// # Examples
///
/// ```
/// use listing_harvester::url::parse_seller_hash;
///
/// let hash = parse_seller_hash("https://www.avito.ru/user/a43b7a7e/profile/all?src=search").unwrap();
/// assert_eq!(hash.as_str(), "a43b7a7e");
/// ```
pub fn parse_seller_hash(shop_url: &str) -> Result<SellerHash, ShopUrlError> {
    let segments: Vec<&str> = shop_url.split('/').collect();

    let token_index = segments
        .iter()
        .position(|segment| segment.contains(MARKETPLACE_TOKEN))
        .ok_or(ShopUrlError::MarketplaceTokenMissing)?;

    let raw = segments
        .get(token_index + HASH_SEGMENT_OFFSET)
        .ok_or(ShopUrlError::HashSegmentMissing)?;

    let hash = raw.split(['?', '#']).next().unwrap_or_default().trim();

    if hash.is_empty() {
        return Err(ShopUrlError::EmptyHash);
    }

    Ok(SellerHash(hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_url() {
        let hash = parse_seller_hash(
            "https://www.avito.ru/user/a43b7a7e9992eabd892b62f44ae4c412/profile/all?src=search_seller_info",
        )
        .unwrap();
        assert_eq!(hash.as_str(), "a43b7a7e9992eabd892b62f44ae4c412");
    }

    #[test]
    fn test_bare_segments() {
        let hash = parse_seller_hash("x/avito/user/abc123/profile").unwrap();
        assert_eq!(hash.as_str(), "abc123");
    }

    #[test]
    fn test_query_glued_to_hash() {
        let hash = parse_seller_hash("https://www.avito.ru/user/abc123?src=share").unwrap();
        assert_eq!(hash.as_str(), "abc123");
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(
            parse_seller_hash("https://example.com/user/abc123/profile"),
            Err(ShopUrlError::MarketplaceTokenMissing)
        );
        assert_eq!(parse_seller_hash(""), Err(ShopUrlError::MarketplaceTokenMissing));
    }

    #[test]
    fn test_url_too_short() {
        assert_eq!(
            parse_seller_hash("https://www.avito.ru/user"),
            Err(ShopUrlError::HashSegmentMissing)
        );
    }

    #[test]
    fn test_empty_hash_segment() {
        assert_eq!(
            parse_seller_hash("https://www.avito.ru/user/"),
            Err(ShopUrlError::EmptyHash)
        );
        assert_eq!(
            parse_seller_hash("https://www.avito.ru/user/?src=x"),
            Err(ShopUrlError::EmptyHash)
        );
    }

    #[test]
    fn test_first_token_match_wins() {
        let hash = parse_seller_hash("https://www.avito.ru/user/first/avito/user/second").unwrap();
        assert_eq!(hash.as_str(), "first");
    }
}
