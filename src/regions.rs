//! Region name to marketplace location id lookup

use crate::HarvestError;
use std::collections::BTreeMap;

/// Static mapping from human-readable region names to location ids
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    ids: BTreeMap<String, u32>,
}

impl RegionTable {
    pub fn new(ids: BTreeMap<String, u32>) -> Self {
        Self { ids }
    }

    /// Resolves a region name to its location id
    ///
    /// An unknown name is a configuration error: the crawl cannot start.
    pub fn resolve(&self, region_name: &str) -> Result<u32, HarvestError> {
        self.ids
            .get(region_name)
            .copied()
            .ok_or_else(|| HarvestError::Configuration {
                message: format!("unknown region '{}'", region_name),
            })
    }

    pub fn contains(&self, region_name: &str) -> bool {
        self.ids.contains_key(region_name)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl FromIterator<(String, u32)> for RegionTable {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
