//! Incident persistence for fail-closed paths: a JSON record accompanies
//! every protective or flatten failure for post-hoc review.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct IncidentRecord<'a> {
    pub intent_id: &'a str,
    pub reason: &'a str,
    pub failed_legs: &'a str,
    pub occurred_at_utc: DateTime<Utc>,
}

pub fn incident_path(incident_dir: &Path, intent_id: &str, occurred_at_utc: DateTime<Utc>) -> PathBuf {
    incident_dir.join(format!(
        "protective_failure_{intent_id}_{}.json",
        occurred_at_utc.format("%Y%m%d%H%M%S")
    ))
}

/// Best-effort: a write failure here is not itself a fail-closed trigger
/// (the stand-down and emergency notification have already happened by the
/// time this is called) — matching `CanonicalMarketLock::release`'s
/// swallow-on-I/O-error discipline for non-critical cleanup/record paths.
pub fn persist_incident(incident_dir: &Path, record: &IncidentRecord) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(incident_dir)?;
    let path = incident_path(incident_dir, record.intent_id, record.occurred_at_utc);
    let body = serde_json::to_string_pretty(record).expect("IncidentRecord serializes infallibly");
    std::fs::write(&path, body)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_incident_json_at_expected_path() {
        let dir = tempfile::tempdir().unwrap();
        let utc: DateTime<Utc> = "2024-05-10T14:31:05Z".parse().unwrap();
        let record = IncidentRecord {
            intent_id: "abc123",
            reason: "protective leg(s) failed after 3 attempts",
            failed_legs: "STOP",
            occurred_at_utc: utc,
        };
        let path = persist_incident(dir.path(), &record).unwrap();
        assert!(path.ends_with("protective_failure_abc123_20240510143105.json"));
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("\"failed_legs\": \"STOP\""));
    }
}
