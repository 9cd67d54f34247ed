use std::path::Path;
use std::time::SystemTime;

use tracker::{OutputCheck, OutputStatus};

/// Checks task outputs on the local filesystem, by modification time.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOutputCheck;

impl OutputCheck for FsOutputCheck {
    fn check(&self, path: &Path, since: SystemTime) -> OutputStatus {
        match path.metadata().and_then(|m| m.modified()) {
            Ok(mtime) if mtime > since => OutputStatus::Fresh,
            Ok(_) => OutputStatus::Stale,
            Err(_) => OutputStatus::Missing,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_output_check() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.root");
        let check = FsOutputCheck;
        let before = SystemTime::now() - Duration::from_secs(3600);

        assert_eq!(check.check(&path, before), OutputStatus::Missing);
        std::fs::write(&path, "x")?;
        assert_eq!(check.check(&path, before), OutputStatus::Fresh);

        let after = SystemTime::now() + Duration::from_secs(3600);
        assert_eq!(check.check(&path, after), OutputStatus::Stale);

        // a file last written at the submission instant predates the job:
        let mtime = path.metadata()?.modified()?;
        assert_eq!(check.check(&path, mtime), OutputStatus::Stale);
        Ok(())
    }
}
