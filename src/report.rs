//! Serialized run artifacts for downstream consumers.
//!
//! The dashboard and broker-integration collaborators read these files; the
//! layout is stable JSON so they never have to parse log output.

use crate::error::StatArbError;
use crate::pipeline::RunReport;
use crate::scanner::ScanOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Scan-only artifact: candidates plus failure report.
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub candidates: &'a [crate::scanner::PairCandidate],
    pub failures: &'a [crate::error::PairFailure],
    pub pairs_tested: usize,
    pub pairs_skipped: usize,
    pub cancelled: bool,
}

impl<'a> ScanReport<'a> {
    pub fn from_outcome(outcome: &'a ScanOutcome) -> Self {
        Self {
            generated_at: Utc::now(),
            candidates: &outcome.candidates,
            failures: &outcome.failures,
            pairs_tested: outcome.tested,
            pairs_skipped: outcome.skipped,
            cancelled: outcome.cancelled,
        }
    }
}

/// Full run artifact: the report plus a generation timestamp.
#[derive(Debug, Serialize)]
struct RunArtifact<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Write a scan report to `<output_dir>/candidates.json`.
pub fn write_scan_report(outcome: &ScanOutcome, output_dir: &Path) -> Result<(), StatArbError> {
    write_json(
        &ScanReport::from_outcome(outcome),
        output_dir,
        "candidates.json",
    )
}

/// Write a full run report to `<output_dir>/report.json`.
pub fn write_run_report(report: &RunReport, output_dir: &Path) -> Result<(), StatArbError> {
    let artifact = RunArtifact {
        generated_at: Utc::now(),
        report,
    };
    write_json(&artifact, output_dir, "report.json")
}

fn write_json<T: Serialize>(value: &T, output_dir: &Path, name: &str) -> Result<(), StatArbError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(&path)?;
    file.write_all(json.as_bytes())?;
    info!(path = %path.display(), "Results written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{PairCandidate, PairStats};
    use crate::types::PairId;

    #[test]
    fn test_scan_report_round_trips_as_json() {
        let outcome = ScanOutcome {
            candidates: vec![PairCandidate {
                pair: PairId::new("A", "B"),
                stats: PairStats {
                    test_statistic: -4.2,
                    p_value: 0.003,
                    hedge_ratio: 1.4,
                    intercept: 0.1,
                    half_life: 6.5,
                    spread_std: 0.8,
                },
            }],
            failures: vec![],
            tested: 1,
            skipped: 0,
            cancelled: false,
        };
        let dir = tempfile::tempdir().unwrap();
        write_scan_report(&outcome, dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("candidates.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["pairs_tested"], 1);
        assert_eq!(parsed["candidates"][0]["p_value"], 0.003);
        assert_eq!(parsed["candidates"][0]["pair"]["symbol_a"], "A");
    }
}
