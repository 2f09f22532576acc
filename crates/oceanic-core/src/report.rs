//! Per-cycle probe output grouped for downstream consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConflictRecord, Severity};

/// Per-bucket conflict counts, also carried on the wire so consumers can
/// show totals without walking the buckets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub actual: usize,
    pub imminent: usize,
    pub advisory: usize,
}

/// One probe cycle's results, partitioned by severity.
///
/// Every conflict sits in exactly one severity bucket; `all` keeps the flat
/// list in scan order. Reports are rebuilt from scratch each cycle, they
/// carry no state from the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub actual: Vec<ConflictRecord>,
    pub imminent: Vec<ConflictRecord>,
    pub advisory: Vec<ConflictRecord>,
    pub all: Vec<ConflictRecord>,
}

impl ProbeReport {
    pub fn new(conflicts: Vec<ConflictRecord>, generated_at: DateTime<Utc>) -> Self {
        let mut actual = Vec::new();
        let mut imminent = Vec::new();
        let mut advisory = Vec::new();

        for conflict in &conflicts {
            match conflict.severity {
                Severity::Actual => actual.push(conflict.clone()),
                Severity::Imminent => imminent.push(conflict.clone()),
                Severity::Advisory => advisory.push(conflict.clone()),
            }
        }

        Self {
            generated_at,
            summary: ReportSummary {
                actual: actual.len(),
                imminent: imminent.len(),
                advisory: advisory.len(),
            },
            actual,
            imminent,
            advisory,
            all: conflicts,
        }
    }

    /// Bucket sizes as (actual, imminent, advisory).
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.summary.actual, self.summary.imminent, self.summary.advisory)
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackClass;
    use chrono::TimeZone;

    fn conflict(callsign: &str, severity: Severity) -> ConflictRecord {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ConflictRecord {
            intruder_callsign: callsign.to_string(),
            active_callsign: "OTHER".to_string(),
            severity,
            conflict_type: TrackClass::Crossing,
            earliest_los: t,
            latest_los: t,
            lat_sep_nm: 50.0,
            vertical_sep_ft: 1000,
            vertical_act_ft: 0,
            trk_angle_deg: 90.0,
            long_time_act_s: 300,
            long_dist_act_nm: 40.0,
        }
    }

    #[test]
    fn buckets_partition_by_severity() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let report = ProbeReport::new(
            vec![
                conflict("A", Severity::Advisory),
                conflict("B", Severity::Actual),
                conflict("C", Severity::Imminent),
                conflict("D", Severity::Advisory),
            ],
            now,
        );

        assert_eq!(report.counts(), (1, 1, 2));
        assert_eq!(report.all.len(), 4);
        assert_eq!(report.actual[0].intruder_callsign, "B");
        assert_eq!(report.imminent[0].intruder_callsign, "C");
        // Scan order is preserved in both the flat list and the buckets.
        assert_eq!(report.advisory[0].intruder_callsign, "A");
        assert_eq!(report.advisory[1].intruder_callsign, "D");
        assert_eq!(report.all[1].intruder_callsign, "B");
    }

    #[test]
    fn empty_report() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let report = ProbeReport::new(Vec::new(), now);
        assert!(report.is_empty());
        assert_eq!(report.counts(), (0, 0, 0));
    }

    #[test]
    fn serializes_with_camel_case_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let report = ProbeReport::new(vec![conflict("A", Severity::Actual)], now);
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["generatedAt"].is_string());
        assert_eq!(json["summary"]["actual"], 1);
        assert_eq!(json["summary"]["imminent"], 0);
        assert_eq!(json["actual"].as_array().unwrap().len(), 1);
        assert_eq!(json["imminent"].as_array().unwrap().len(), 0);
        assert_eq!(json["all"][0]["intruderCallsign"], "A");
    }
}
