use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tracker::DatasetTracker;
use util::PathEncodingError;

/// Defines fns for creating common paths in the work directory
mod paths;

/// Saving and loading tracker state
mod checkpoint;
pub use checkpoint::{CheckpointStore, PersistenceError};

/// Looking for task outputs on disk
mod output;
pub use output::FsOutputCheck;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Specified work directory \"{0}\" is not a directory")]
    NotDirectory(String),
    #[error("Work directory \"{0}\" is not writable")]
    NotWritable(String),
}

/// All file operations on the work directory should go through this struct.
#[derive(Debug)]
pub struct Fs {
    /// The directory we are allowed to modify
    workdir: PathBuf,
}

impl Fs {
    /// Create a new `Fs` with the given work directory.
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Check whether the work dir exists and is writable, and create it if not.
    pub fn ensure_workdir_exists(&mut self, verbose: bool) -> Result<()> {
        if !self.workdir.exists() {
            eprintln!(
                "Work directory {:?} doesn't exist. Creating.",
                self.workdir
            );
            fs::create_dir_all(&self.workdir).context("creating work directory")?;
        } else if !self.workdir.is_dir() {
            return Err(Error::NotDirectory(self.workdir_str()?).into());
        } else if verbose {
            eprintln!(
                "Work directory {:?} already exists. Not creating.",
                self.workdir
            );
        }

        self.workdir = self.workdir.canonicalize()?;

        if tempfile::tempfile_in(&self.workdir).is_err() {
            return Err(Error::NotWritable(self.workdir_str()?).into());
        }
        Ok(())
    }

    /// Create a file, and return a writable `File` handle.
    pub fn create_file<T: AsRef<Path>>(&self, path: T) -> Result<fs::File> {
        let path = path.as_ref();
        let f = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        Ok(f)
    }

    /// Write one line per missing output, followed by its submit file.
    pub fn write_missing_files(&self, datasets: &[DatasetTracker]) -> Result<()> {
        let mut buf = PathBuf::new();
        let path = self.missing_files_txt(&mut buf);
        let mut f = BufWriter::new(self.create_file(path)?);
        for dataset in datasets {
            for task in dataset.missing() {
                writeln!(
                    f,
                    "{} {}",
                    task.output().display(),
                    task.submit_file().display()
                )?;
            }
        }
        f.flush().context("writing missing files list")?;
        Ok(())
    }

    fn workdir_str(&self) -> Result<String> {
        Ok(self.workdir.to_str().ok_or(PathEncodingError)?.to_owned())
    }
}
