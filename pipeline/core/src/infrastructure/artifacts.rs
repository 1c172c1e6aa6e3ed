// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! CSV artifacts: the intermediate journeys file and the channel report.
//!
//! Both files are overwritten on every write, header first.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::journey::{Journey, JourneyRow};
use crate::domain::report::ChannelReportRow;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ArtifactError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        ArtifactError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), ArtifactError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn write_rows<T: serde::Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, ArtifactError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| ArtifactError::csv(path, e))?;
    let mut written = 0;
    for row in rows {
        writer.serialize(row).map_err(|e| ArtifactError::csv(path, e))?;
        written += 1;
    }
    writer.flush().map_err(|e| ArtifactError::io(path, e))?;
    Ok(written)
}

/// Write journeys as flat rows. Returns the number of rows written.
pub fn write_journeys(path: &Path, journeys: &[Journey]) -> Result<usize, ArtifactError> {
    write_rows(path, journeys.iter().flat_map(Journey::to_rows))
}

/// Read a journeys file back into journeys, in order of first appearance.
pub fn read_journeys(path: &Path) -> Result<Vec<Journey>, ArtifactError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ArtifactError::csv(path, e))?;
    let rows = reader
        .deserialize::<JourneyRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ArtifactError::csv(path, e))?;
    Ok(Journey::from_rows(rows))
}

pub fn write_channel_report(path: &Path, rows: &[ChannelReportRow]) -> Result<usize, ArtifactError> {
    write_rows(path, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::journey::JourneyTouchpoint;
    use chrono::NaiveDate;

    fn journey(conversion: &str, sessions: &[(&str, u32)]) -> Journey {
        let touchpoints = sessions
            .iter()
            .map(|(session, hour)| JourneyTouchpoint {
                session_id: (*session).into(),
                occurred_at: NaiveDate::from_ymd_opt(2024, 3, 4)
                    .unwrap()
                    .and_hms_opt(*hour, 15, 0)
                    .unwrap(),
                channel_label: "Paid Social".to_string(),
                holder_engagement: *hour % 2 == 0,
                closer_engagement: true,
                impression_interaction: false,
                is_conversion_event: false,
            })
            .collect();
        Journey::new(conversion.into(), touchpoints)
    }

    #[test]
    fn test_journeys_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("customer_journeys.csv");
        let journeys = vec![
            journey("c1", &[("s1", 8), ("s2", 9)]),
            journey("c2", &[("s1", 8)]),
        ];

        let written = write_journeys(&path, &journeys).unwrap();
        assert_eq!(written, 3);

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "conversion_id,session_id,timestamp,channel_label,holder_engagement,closer_engagement,conversion,impression_interaction"
        );
        assert_eq!(lines.next().unwrap(), "c1,s1,2024-03-04 08:15:00,Paid Social,1,1,0,0");

        assert_eq!(read_journeys(&path).unwrap(), journeys);
    }

    #[test]
    fn test_rewrite_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        write_journeys(&first, &[journey("c9", &[("s4", 1), ("s5", 2)])]).unwrap();

        let journeys = read_journeys(&first).unwrap();
        write_journeys(&second, &journeys).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_channel_report_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel_reporting.csv");
        let rows = vec![ChannelReportRow {
            channel_name: "SEA".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            cost: 10.0,
            ihc: 0.5,
            ihc_revenue: 40.0,
            cpo: 20.0,
            roas: 4.0,
        }];

        assert_eq!(write_channel_report(&path, &rows).unwrap(), 1);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "channel_name,date,cost,ihc,ihc_revenue,CPO,ROAS"
        );
        assert_eq!(content.lines().nth(1).unwrap(), "SEA,2024-03-04,10.0,0.5,40.0,20.0,4.0");
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_journeys(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ArtifactError::Csv { .. }));
    }
}
