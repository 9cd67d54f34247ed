//! Scheduler job identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// separates cluster id from process index e.g. "4211.7"
const PROCESS_DELIM: char = '.';

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseJobIdError {
    #[error("Empty job id")]
    Empty,
    #[error("Invalid job id \"{0}\" (should be formatted 'cluster[.process]')")]
    Invalid(String),
}

/// A scheduler job: a cluster id plus the process index within that cluster.
///
/// Ids are parsed once, when the scheduler hands them to us, so a bare cluster id
/// like `"4211"` and its explicit form `"4211.0"` compare equal everywhere else.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub cluster: u64,
    pub process: u32,
}

impl JobId {
    pub fn new(cluster: u64, process: u32) -> Self {
        Self { cluster, process }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PROCESS_DELIM}{}", self.cluster, self.process)
    }
}

impl FromStr for JobId {
    type Err = ParseJobIdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseJobIdError::Empty);
        }
        let invalid = || ParseJobIdError::Invalid(s.to_owned());
        let (cluster, process) = match s.split_once(PROCESS_DELIM) {
            Some((c, p)) => (c, p.parse().map_err(|_| invalid())?),
            None => (s, 0),
        };
        let cluster = cluster.parse().map_err(|_| invalid())?;
        Ok(Self { cluster, process })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn test_parse() {
        assert_eq!("4211.7".parse(), Ok(JobId::new(4211, 7)));
        assert_eq!(" 4211.0\n".parse(), Ok(JobId::new(4211, 0)));
    }
    #[test]
    fn test_bare_cluster_is_process_zero() {
        let bare: JobId = "4211".parse().unwrap();
        let full: JobId = "4211.0".parse().unwrap();
        assert_eq!(bare, full);
        assert_eq!(bare.to_string(), "4211.0");
    }
    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<JobId>(), Err(ParseJobIdError::Empty));
        assert!("abc".parse::<JobId>().is_err());
        assert!("12.x".parse::<JobId>().is_err());
        assert!("12.3.4".parse::<JobId>().is_err());
    }
}
