use serde::Deserialize;

use tracker::{JobId, ProbeError, QueueProbe, QueueSnapshot, QueueState};

use crate::cmd::{summarize, CommandLine};

/// Harmless stderr noise from some condor_q versions when ProcId isn't requested.
const DUPLICATE_ID_NOTICE: &str = "Two results with the same ID";

/// Reads the queue with `condor_q -json`.
pub struct CondorProbe {
    queue_cmd: CommandLine,
}

impl CondorProbe {
    pub fn new(queue_cmd: CommandLine) -> Self {
        Self { queue_cmd }
    }
}

impl QueueProbe for CondorProbe {
    fn poll(&mut self) -> Result<QueueSnapshot, ProbeError> {
        let output = self
            .queue_cmd
            .command()
            .args(["-json", "-attributes", "JobStatus,GlobalJobId"])
            .output()
            .map_err(|e| ProbeError::Spawn(self.queue_cmd.to_string(), e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.lines().any(|l| !l.trim().is_empty() && !l.contains(DUPLICATE_ID_NOTICE)) {
            log::warn!("{} printed to stderr:\n{}", self.queue_cmd, stderr.trim_end());
        }

        if !output.status.success() {
            return Err(ProbeError::Failed(
                self.queue_cmd.to_string(),
                format!("{}: {}", output.status, summarize(&output.stderr)),
            ));
        }

        let snapshot = parse_queue(&output.stdout)?;
        log::debug!("{} jobs in queue", snapshot.len());
        Ok(snapshot)
    }
}

#[derive(Deserialize)]
struct RawJob {
    #[serde(rename = "GlobalJobId")]
    global_job_id: String,
    #[serde(rename = "JobStatus")]
    job_status: i64,
}

/// Parse `condor_q -json` output. An empty queue prints nothing at all.
///
/// Entries that can't be understood, and repeats of a job already seen,
/// are logged and skipped.
pub fn parse_queue(stdout: &[u8]) -> Result<QueueSnapshot, ProbeError> {
    let text = std::str::from_utf8(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(QueueSnapshot::default());
    }

    let entries: Vec<serde_json::Value> =
        serde_json::from_str(text).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let mut snapshot = QueueSnapshot::with_capacity(entries.len());
    for entry in entries {
        match parse_entry(entry) {
            Ok((job, state)) => {
                if !snapshot.insert(job, state) {
                    log::debug!("ignoring duplicate queue entry for job {job}");
                }
            }
            Err(e) => log::warn!("ignoring malformed queue entry: {e}"),
        }
    }
    Ok(snapshot)
}

fn parse_entry(entry: serde_json::Value) -> Result<(JobId, QueueState), String> {
    let raw: RawJob = serde_json::from_value(entry).map_err(|e| e.to_string())?;
    // GlobalJobId looks like "schedd.example.org#1234.0#1700000000":
    let id_str = raw
        .global_job_id
        .split('#')
        .nth(1)
        .ok_or_else(|| format!("unexpected GlobalJobId \"{}\"", raw.global_job_id))?;
    let job = id_str.parse::<JobId>().map_err(|e| e.to_string())?;
    Ok((job, QueueState::from_condor_code(raw.job_status)))
}
