// CSV event source adapter - Reads the event sheet into typed rows

use std::path::Path;

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// CSV-backed event source
#[derive(Debug, Default, Clone)]
pub struct CsvEventSource;

/// Column positions resolved from the header row
#[derive(Debug)]
struct Columns {
    camera: usize,
    timestamp: usize,
    placement: Option<usize>,
    side: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Option<Self> {
        Some(Self {
            camera: Self::position(header, &["camera"])?,
            timestamp: Self::position(header, &["timestamp", "time"])?,
            placement: Self::position(header, &["placement"]),
            side: Self::position(header, &["side"]),
        })
    }

    fn position(header: &StringRecord, names: &[&str]) -> Option<usize> {
        header
            .iter()
            .position(|cell| names.iter().any(|name| cell.eq_ignore_ascii_case(name)))
    }

    fn has_camera(header: &StringRecord) -> bool {
        header.iter().any(|cell| cell.eq_ignore_ascii_case("camera"))
    }
}

impl CsvEventSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse an event sheet. A first row without a `Camera` column is a
    /// date preamble and the header is taken from the next row.
    pub fn parse(data: &[u8]) -> Result<EventSheet, DomainError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data);
        let mut records = reader.records();

        let mut header = match records.next() {
            Some(record) => record?,
            None => return Ok(EventSheet::default()),
        };
        if !Columns::has_camera(&header) {
            debug!("Skipping preamble row: {:?}", header);
            header = match records.next() {
                Some(record) => record?,
                None => return Ok(EventSheet::default()),
            };
        }
        let header_line = header.position().map(|p| p.line() as usize).unwrap_or(1);
        let columns = Columns::from_header(&header).ok_or_else(|| DomainError::InvalidRow {
            line: header_line,
            message: "header needs a Camera column and a timestamp or time column".to_string(),
        })?;

        let mut sheet = EventSheet::default();
        let mut ordinal = 0u32;
        for record in records {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            ordinal += 1;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            match Self::parse_row(&columns, &record, line, ordinal) {
                Ok(row) => sheet.rows.push(row),
                Err(reason) => {
                    warn!("Skipping row {}: {}", line, reason);
                    let camera = record
                        .get(columns.camera)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string);
                    sheet.invalid.push(RejectedRow {
                        line,
                        camera,
                        placement: None,
                        reason,
                    });
                }
            }
        }

        debug!(
            "Read {} event rows ({} rejected)",
            sheet.rows.len(),
            sheet.invalid.len()
        );
        Ok(sheet)
    }

    fn parse_row(
        columns: &Columns,
        record: &StringRecord,
        line: usize,
        ordinal: u32,
    ) -> Result<EventRow, String> {
        let cell = |index: Option<usize>| index.and_then(|i| record.get(i)).unwrap_or("");

        let camera = cell(Some(columns.camera));
        if camera.is_empty() {
            return Err("missing camera".to_string());
        }

        let timestamp = TimeSpec::parse(cell(Some(columns.timestamp))).map_err(|e| e.to_string())?;

        let placement = match cell(columns.placement) {
            "" => ordinal,
            raw => Self::parse_placement(raw)
                .ok_or_else(|| format!("invalid placement '{}'", raw))?,
        };

        let side = match cell(columns.side) {
            "" => Side::Center,
            raw => Side::from_label(raw).unwrap_or_else(|| {
                warn!("Row {}: unknown side '{}', using center", line, raw);
                Side::Center
            }),
        };

        Ok(EventRow {
            line,
            camera: camera.to_string(),
            timestamp,
            placement,
            side,
        })
    }

    /// Spreadsheet exports write integers as `3` or `3.0`
    fn parse_placement(raw: &str) -> Option<u32> {
        let value: f64 = raw.parse().ok()?;
        (value.fract() == 0.0 && value >= 1.0 && value <= u32::MAX as f64).then_some(value as u32)
    }
}

#[async_trait]
impl EventSourcePort for CsvEventSource {
    async fn read_events(&self, path: &Path) -> Result<EventSheet, DomainError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            DomainError::FsFail(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_with_defaults() {
        let data = b"Camera,Timestamp,Placement,Side\n\
            cam1,00:05:10,3,left\n\
            Cam2,95.5,,\n\
            cam3,1:02,7.0,RIGHT\n";
        let sheet = CsvEventSource::parse(data).unwrap();

        assert!(sheet.invalid.is_empty());
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0].camera, "cam1");
        assert_eq!(sheet.rows[0].timestamp.seconds, 310.0);
        assert_eq!(sheet.rows[0].placement, 3);
        assert_eq!(sheet.rows[0].side, Side::Left);
        assert_eq!(sheet.rows[1].placement, 2);
        assert_eq!(sheet.rows[1].side, Side::Center);
        assert_eq!(sheet.rows[2].timestamp.seconds, 62.0);
        assert_eq!(sheet.rows[2].placement, 7);
        assert_eq!(sheet.rows[2].side, Side::Right);
    }

    #[test]
    fn test_skips_date_preamble() {
        let data = b"Week of 2024-03-04\ncamera,time\ncam1,10\n";
        let sheet = CsvEventSource::parse(data).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].line, 3);
        assert_eq!(sheet.rows[0].placement, 1);
    }

    #[test]
    fn test_bad_rows_are_rejected_not_fatal() {
        let data = b"Camera,Timestamp,Placement\n\
            cam1,abc,1\n\
            ,00:00:10,2\n\
            cam3,00:00:10,zero\n\
            cam4,00:00:20,4\n";
        let sheet = CsvEventSource::parse(data).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].camera, "cam4");
        assert_eq!(sheet.invalid.len(), 3);
        assert_eq!(sheet.invalid[0].line, 2);
        assert_eq!(sheet.invalid[0].camera.as_deref(), Some("cam1"));
        assert_eq!(sheet.invalid[1].camera, None);
        assert!(sheet.invalid[2].reason.contains("placement"));
    }

    #[test]
    fn test_missing_required_columns() {
        let result = CsvEventSource::parse(b"Camera,Notes\ncam1,x\n");
        assert!(matches!(result, Err(DomainError::InvalidRow { line: 1, .. })));
    }

    #[tokio::test]
    async fn test_read_events_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "Camera,Time,Side\ncam1,00:01:00,sideways\n").unwrap();

        let sheet = CsvEventSource::new().read_events(&path).await.unwrap();
        assert_eq!(sheet.rows[0].side, Side::Center);
        assert!(CsvEventSource::new()
            .read_events(&dir.path().join("missing.csv"))
            .await
            .is_err());
    }
}
