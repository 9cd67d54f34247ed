use std::path::{Path, PathBuf};

use super::Fs;

/// Utility fns for making common types of paths in the work directory.
impl Fs {
    /// $WORKDIR/checkpoint.json
    pub fn checkpoint_json<'a>(&self, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(&self.workdir, "checkpoint.json", buf)
    }

    /// $WORKDIR/missing_files.txt
    pub fn missing_files_txt<'a>(&self, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(&self.workdir, "missing_files.txt", buf)
    }

    /// $WORKDIR/dataset.merge.out.txt
    pub fn merge_stdout<'a>(&self, dataset: &str, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(&self.workdir, format!("{dataset}.merge.out.txt"), buf)
    }

    /// $WORKDIR/dataset.merge.err.txt
    pub fn merge_stderr<'a>(&self, dataset: &str, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(&self.workdir, format!("{dataset}.merge.err.txt"), buf)
    }

    fn parts2<'a, T, U>(&self, p1: T, p2: U, buf: &'a mut PathBuf) -> &'a Path
    where
        T: AsRef<Path>,
        U: AsRef<Path>,
    {
        buf.clear();
        buf.push(p1);
        buf.push(p2);
        &*buf
    }
}
