use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::models::{Catalog, ProductRecord};
use crate::utils::error::{Result, ScrapeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
}

/// JSON catalog file merged one record at a time.
///
/// Every merge is a full read-modify-write. The new document goes to a
/// temporary file next to the target and is renamed over it, so a crash
/// mid-write leaves the previous catalog intact.
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted catalog, or a fresh one if the file does not exist yet.
    pub fn load(&self) -> Result<Catalog> {
        if !self.path.exists() {
            debug!("No catalog at {}; starting a new one", self.path.display());
            return Ok(Catalog::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| ScrapeError::Persistence {
            message: format!("catalog {} is unreadable: {}", self.path.display(), e),
        })
    }

    pub fn merge(&self, record: &ProductRecord, source_url: &str) -> Result<MergeOutcome> {
        let mut catalog = self.load()?;
        let mut stored = record.clone();
        stored.source_url = source_url.to_string();

        let outcome = match catalog.position_of(&stored.link) {
            Some(index) => {
                let previous_source = std::mem::replace(&mut catalog.products[index], stored).source_url;
                // Records without a source predate source tracking; their count stays put
                if !previous_source.is_empty() && previous_source != source_url {
                    if let Some(info) = catalog.sources.get_mut(&previous_source) {
                        info.product_count = info.product_count.saturating_sub(1);
                    }
                    catalog.source_mut(source_url).product_count += 1;
                }
                MergeOutcome::Updated
            }
            None => {
                catalog.products.push(stored);
                catalog.source_mut(source_url).product_count += 1;
                MergeOutcome::Inserted
            }
        };

        catalog.source_mut(source_url).last_updated = Utc::now();
        catalog.total_products = catalog.products.len();

        self.write(&catalog)?;
        info!(
            "Saved {} ({:?}); catalog now holds {} products",
            record.name, outcome, catalog.total_products
        );
        Ok(outcome)
    }

    fn write(&self, catalog: &Catalog) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, catalog)?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}
