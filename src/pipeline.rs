//! Generation pipeline orchestration.
//!
//! Coordinates one run: acquire a local copy → scan → serialize within the
//! snapshot budget → generate → save to history → remove the local copy.
//!
//! The local copy is owned by [`Pipeline::run`] for the whole run and is
//! removed whether the run succeeds or fails. A failed history save is
//! logged and reported in [`Generated::saved`]; the document is still
//! returned.

use tracing::{debug, info, warn};

use crate::clone::{LocalCopy, RepositorySource};
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::generate::DocumentGenerator;
use crate::history::HistoryStore;
use crate::models::RecordId;
use crate::snapshot;

/// What happened to the history save.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(RecordId),
    /// No store was attached.
    Skipped,
    Failed(Error),
}

/// Result of a successful run.
#[derive(Debug)]
pub struct Generated {
    pub artifact: String,
    pub files_scanned: usize,
    /// Characters of serialized snapshot sent to the generator.
    pub snapshot_chars: usize,
    pub saved: SaveOutcome,
}

impl Generated {
    pub fn record_id(&self) -> Option<RecordId> {
        match self.saved {
            SaveOutcome::Saved(id) => Some(id),
            _ => None,
        }
    }
}

pub struct Pipeline {
    scan: ScanConfig,
    source: Box<dyn RepositorySource>,
    generator: Box<dyn DocumentGenerator>,
    store: Option<HistoryStore>,
}

impl Pipeline {
    pub fn new(
        scan: ScanConfig,
        source: Box<dyn RepositorySource>,
        generator: Box<dyn DocumentGenerator>,
    ) -> Self {
        Self {
            scan,
            source,
            generator,
            store: None,
        }
    }

    /// Record every generated document in `store`.
    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&HistoryStore> {
        self.store.as_ref()
    }

    /// Generate documentation for the repository at `locator`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLocator`] for a blank locator; nothing is cloned.
    /// - [`Error::Clone`] if the copy cannot be made; nothing else runs.
    /// - [`Error::InvalidRoot`] or [`Error::Generation`] from later steps.
    ///
    /// History failures are not errors; see [`SaveOutcome::Failed`].
    pub async fn run(&self, locator: &str) -> Result<Generated> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::InvalidLocator);
        }

        let copy = self.source.acquire(locator).await?;
        let result = self.run_on_copy(locator, &copy).await;

        let path = copy.path().to_path_buf();
        match copy.close() {
            Ok(()) => debug!("removed local copy {}", path.display()),
            Err(e) => warn!("failed to remove local copy {}: {}", path.display(), e),
        }

        result
    }

    async fn run_on_copy(&self, locator: &str, copy: &LocalCopy) -> Result<Generated> {
        let snapshot = snapshot::scan(copy.path(), &self.scan)?;
        info!("scanned {} files from {}", snapshot.len(), locator);

        let snapshot_json = snapshot::to_budgeted_json(&snapshot, self.scan.max_snapshot_chars);
        let snapshot_chars = snapshot_json.chars().count();
        let files_scanned = snapshot.len();
        drop(snapshot);

        info!(
            "generating with {} ({} snapshot chars)",
            self.generator.model_name(),
            snapshot_chars
        );
        let artifact = self.generator.generate(&snapshot_json).await?;

        let saved = self.save(locator, &artifact).await;

        Ok(Generated {
            artifact,
            files_scanned,
            snapshot_chars,
            saved,
        })
    }

    async fn save(&self, locator: &str, artifact: &str) -> SaveOutcome {
        let Some(store) = &self.store else {
            return SaveOutcome::Skipped;
        };

        match store.append(locator, artifact).await {
            Ok(id) => SaveOutcome::Saved(id),
            Err(e) => {
                warn!("generated document was not saved to history: {}", e);
                SaveOutcome::Failed(e)
            }
        }
    }
}
