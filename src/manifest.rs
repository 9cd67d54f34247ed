use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use tracker::{DatasetTracker, TaskRecord};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Dataset name {0:?} appears more than once in the manifest")]
    DuplicateDataset(String),
    #[error("Dataset {0:?} has more tasks than can be tracked")]
    TooManyTasks(String),
}

/// Datasets and tasks produced by the descriptor generator.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetEntry {
    pub name: String,
    #[serde(default)]
    pub aggregate_to: Option<PathBuf>,
    pub tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub submit_file: PathBuf,
    pub output: PathBuf,
}

impl Manifest {
    /// Read a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {:?}", path))?;
        let mut manifest: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing manifest {:?}", path))?;
        if let Some(base) = path.parent() {
            manifest.resolve_relative_to(base);
        }
        Ok(manifest)
    }

    /// Relative paths in the manifest are relative to the manifest's own directory.
    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for dataset in &mut self.datasets {
            if let Some(target) = dataset.aggregate_to.as_mut() {
                resolve(target);
            }
            for task in &mut dataset.tasks {
                resolve(&mut task.submit_file);
                resolve(&mut task.output);
            }
        }
    }

    /// Create a fresh tracker for every non-empty dataset. Datasets without an
    /// explicit merge target merge into `merge_dir/<name>.root`.
    pub fn into_trackers(
        self,
        retry_budget: i32,
        merge_dir: &Path,
    ) -> Result<Vec<DatasetTracker>> {
        let mut trackers: Vec<DatasetTracker> = Vec::with_capacity(self.datasets.len());
        for entry in self.datasets {
            if entry.tasks.is_empty() {
                log::info!("dropping dataset {} with no tasks", entry.name);
                continue;
            }
            if trackers.iter().any(|t| t.name() == entry.name) {
                return Err(Error::DuplicateDataset(entry.name).into());
            }
            let mut tasks = Vec::with_capacity(entry.tasks.len());
            for (i, task) in entry.tasks.into_iter().enumerate() {
                let index =
                    u32::try_from(i).map_err(|_| Error::TooManyTasks(entry.name.clone()))?;
                tasks.push(TaskRecord::new(index, task.submit_file, task.output, retry_budget));
            }
            let target = entry
                .aggregate_to
                .unwrap_or_else(|| merge_dir.join(format!("{}.root", entry.name)));
            trackers.push(DatasetTracker::new(entry.name, Some(target), tasks));
        }
        Ok(trackers)
    }
}

/// Replace fresh trackers with checkpointed ones of the same name.
///
/// Checkpointed datasets that are no longer in the manifest are dropped.
pub fn merge_checkpoint(
    fresh: Vec<DatasetTracker>,
    saved: Vec<DatasetTracker>,
) -> Vec<DatasetTracker> {
    let mut saved: util::HashMap<String, DatasetTracker> = saved
        .into_iter()
        .map(|d| (d.name().to_owned(), d))
        .collect();

    fresh
        .into_iter()
        .map(|d| match saved.remove(d.name()) {
            Some(restored) => {
                log::debug!("restored dataset {} from checkpoint", d.name());
                restored
            }
            None => d,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    const MANIFEST: &str = r#"{
        "datasets": [
            {
                "name": "ttbar",
                "aggregate_to": "merged/ttbar.root",
                "tasks": [
                    { "submit_file": "jobs/ttbar_0.submit", "output": "/data/ttbar_0.root" },
                    { "submit_file": "jobs/ttbar_1.submit", "output": "/data/ttbar_1.root" }
                ]
            },
            { "name": "empty", "tasks": [] }
        ]
    }"#;

    #[test]
    fn test_load_manifest() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, MANIFEST)?;

        let manifest = Manifest::load(&path)?;
        let trackers = manifest.into_trackers(3, dir.path())?;
        assert_eq!(trackers.len(), 1);

        let ttbar = &trackers[0];
        assert_eq!(ttbar.name(), "ttbar");
        assert_eq!(ttbar.expected_tasks(), 2);
        assert_eq!(
            ttbar.aggregate_to(),
            Some(dir.path().join("merged/ttbar.root").as_path())
        );
        assert_eq!(ttbar.tasks()[1].index(), 1);
        assert_eq!(
            ttbar.tasks()[1].submit_file(),
            dir.path().join("jobs/ttbar_1.submit")
        );
        assert_eq!(ttbar.tasks()[0].output(), Path::new("/data/ttbar_0.root"));
        assert_eq!(ttbar.tasks()[0].retry_budget(), 3);
        Ok(())
    }

    #[test]
    fn test_duplicate_dataset() -> Result<()> {
        let manifest: Manifest = serde_json::from_str(
            r#"{ "datasets": [
                { "name": "a", "tasks": [ { "submit_file": "x", "output": "y" } ] },
                { "name": "a", "tasks": [ { "submit_file": "x", "output": "y" } ] }
            ] }"#,
        )?;
        assert!(manifest.into_trackers(1, Path::new("w")).is_err());
        Ok(())
    }

    #[test]
    fn test_merge_checkpoint() -> Result<()> {
        let manifest: Manifest = serde_json::from_str(
            r#"{ "datasets": [
                { "name": "a", "tasks": [ { "submit_file": "x", "output": "y" } ] },
                { "name": "b", "tasks": [ { "submit_file": "x", "output": "y" } ] }
            ] }"#,
        )?;
        let fresh = manifest.into_trackers(1, Path::new("w"))?;
        let mut saved_a = fresh[0].clone();
        saved_a.reset_budgets(0);
        let gone = DatasetTracker::new(
            "gone".into(),
            None,
            vec![TaskRecord::new(0, "s".into(), "o".into(), 1)],
        );

        let merged = merge_checkpoint(fresh, vec![gone, saved_a]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].tasks()[0].retry_budget(), 0);
        assert_eq!(merged[1].name(), "b");
        assert_eq!(merged[1].aggregate_to(), Some(Path::new("w/b.root")));
        assert_eq!(merged[1].tasks()[0].retry_budget(), 1);
        Ok(())
    }
}
