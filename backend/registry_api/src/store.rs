//! Record store — one JSON array file per collection.
//!
//! Every save serialises the whole collection to `<name>.json.tmp` and
//! renames it over `<name>.json`, so a concurrent reader sees either the old
//! or the new array, never a partial write. The store assumes a single
//! writer process; [`crate::api::ApiState`] serialises writers within it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use registry_protocol::{Collection, Registry};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open (and create if needed) the data directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        info!("Record store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_of(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    /// Read a whole collection. A missing file is an empty collection.
    pub async fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let path = self.path_of(collection);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace a whole collection via temp file + rename.
    pub async fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<()> {
        let path = self.path_of(collection);
        let tmp = self.dir.join(format!("{}.tmp", collection.file_name()));
        let bytes = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Saved {} {} records", records.len(), collection.name());
        Ok(())
    }

    /// Load every collection into a [`Registry`].
    pub async fn load_registry(&self) -> Result<Registry> {
        let mut registry = Registry::new();
        registry.projects = self.load(Collection::Projects).await?;
        registry.stakeholders = self.load(Collection::Stakeholders).await?;
        registry.mrv_data = self.load(Collection::MrvData).await?;
        registry.credits = self.load(Collection::Credits).await?;
        registry.transactions = self.load(Collection::Transactions).await?;
        registry.notifications = self.load(Collection::Notifications).await?;
        Ok(registry)
    }

    /// Write back the collections the registry marked as modified.
    ///
    /// Returns the number of files written.
    pub async fn persist(&self, registry: &mut Registry) -> Result<usize> {
        let dirty = registry.take_dirty();
        for collection in &dirty {
            match collection {
                Collection::Projects => self.save(*collection, &registry.projects).await?,
                Collection::Stakeholders => self.save(*collection, &registry.stakeholders).await?,
                Collection::MrvData => self.save(*collection, &registry.mrv_data).await?,
                Collection::Credits => self.save(*collection, &registry.credits).await?,
                Collection::Transactions => self.save(*collection, &registry.transactions).await?,
                Collection::Notifications => {
                    self.save(*collection, &registry.notifications).await?
                }
            }
        }
        Ok(dirty.len())
    }
}
