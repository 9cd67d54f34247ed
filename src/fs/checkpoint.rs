use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use tracker::DatasetTracker;

use super::Fs;

/// Bumped whenever the layout of the checkpoint document changes.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("Unable to {0} checkpoint {1:?}: {2}")]
    Io(&'static str, PathBuf, #[source] io::Error),
    #[error("Unable to encode checkpoint: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Checkpoint {0:?} is corrupt: {1}")]
    Decode(PathBuf, #[source] serde_json::Error),
    #[error("Checkpoint {0:?} has version {1}, expected {CHECKPOINT_VERSION}")]
    Version(PathBuf, u32),
    #[error("Checkpoint {0:?} is inconsistent in dataset {1}")]
    Inconsistent(PathBuf, String),
}

#[derive(Serialize)]
struct CheckpointOut<'a> {
    version: u32,
    datasets: &'a [DatasetTracker],
}

#[derive(Deserialize)]
struct CheckpointIn {
    version: u32,
    datasets: Vec<DatasetTracker>,
}

/// Saves and restores every tracker as one JSON document.
///
/// Saves go to a temp file in the same directory, which is then renamed over the
/// old checkpoint, so a failed save leaves the previous checkpoint intact.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(fs: &Fs) -> Self {
        let mut path = PathBuf::new();
        fs.checkpoint_json(&mut path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, datasets: &[DatasetTracker]) -> Result<(), PersistenceError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let io_err = |what, e| PersistenceError::Io(what, self.path.clone(), e);

        let tmp = NamedTempFile::new_in(dir).map_err(|e| io_err("create", e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            let doc = CheckpointOut {
                version: CHECKPOINT_VERSION,
                datasets,
            };
            serde_json::to_writer_pretty(&mut writer, &doc).map_err(PersistenceError::Encode)?;
            writer.flush().map_err(|e| io_err("write", e))?;
        }
        tmp.as_file().sync_all().map_err(|e| io_err("sync", e))?;
        tmp.persist(&self.path)
            .map_err(|e| io_err("replace", e.error))?;

        log::debug!("saved checkpoint to {:?}", self.path);
        Ok(())
    }

    /// Returns `None` if there is no checkpoint yet.
    pub fn load(&self) -> Result<Option<Vec<DatasetTracker>>, PersistenceError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::Io("read", self.path.clone(), e)),
        };
        let doc: CheckpointIn = serde_json::from_str(&text)
            .map_err(|e| PersistenceError::Decode(self.path.clone(), e))?;
        if doc.version != CHECKPOINT_VERSION {
            return Err(PersistenceError::Version(self.path.clone(), doc.version));
        }
        if let Some(bad) = doc.datasets.iter().find(|d| !d.is_consistent()) {
            return Err(PersistenceError::Inconsistent(
                self.path.clone(),
                bad.name().to_owned(),
            ));
        }
        log::debug!("loaded {} datasets from {:?}", doc.datasets.len(), self.path);
        Ok(Some(doc.datasets))
    }
}
