//! JSON export of crawl results

use crate::catalogue::{AdRecord, Catalogue};
use crate::HarvestError;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the catalogue records as a pretty-printed JSON array
///
/// Parent directories are created as needed; an existing file is replaced.
pub fn write_catalogue_json(catalogue: &Catalogue, path: &Path) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, catalogue.records())?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Wrote {} listings to {}", catalogue.len(), path.display());
    Ok(())
}

/// Reads records previously written by [`write_catalogue_json`]
pub fn read_catalogue_json(path: &Path) -> Result<Vec<AdRecord>, HarvestError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
