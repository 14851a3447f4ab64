//! Arduino serial reader: one JSON object per line.

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info, warn};

use crate::ingest::{self, SensorBatch};
use crate::notify::Notifier;
use crate::plant_health::PlantHealthConfig;

// ---

/// Parse one serial line. Blank and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<SensorBatch> {
    // ---
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            warn!("Skipping unparseable serial line {:?}: {}", line, e);
            return None;
        }
    };

    match SensorBatch::from_json(&value) {
        Ok(batch) => Some(batch),
        Err(e) => {
            warn!("Skipping serial line {:?}: {}", line, e);
            None
        }
    }
}

/// Ingest newline-delimited JSON from `reader` until EOF.
///
/// Line noise (invalid UTF-8, partial JSON) is skipped; only an I/O error
/// ends the loop. Returns the number of batches ingested.
pub async fn ingest_lines<R>(
    mut reader: R,
    pool: &SqlitePool,
    health: &PlantHealthConfig,
    alert_cap: u32,
    notifier: &Notifier,
) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    // ---
    let mut buf = Vec::new();
    let mut ingested = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(ingested);
        }

        let line = String::from_utf8_lossy(&buf);
        debug!("Received serial data: {}", line.trim_end());
        let Some(batch) = parse_line(&line) else {
            continue;
        };

        match ingest::ingest(pool, &batch, health, alert_cap, Utc::now()).await {
            Ok(report) => {
                ingested += 1;
                notifier.dispatch(pool, report.alerts_created);
            }
            Err(e) => error!("Failed to ingest serial data: {}", e),
        }
    }
}

/// Read the port until it closes or fails, ingesting each line.
pub async fn run(
    pool: SqlitePool,
    health: PlantHealthConfig,
    alert_cap: u32,
    port: String,
    baud: u32,
    notifier: Notifier,
) {
    // ---
    let stream = match tokio_serial::new(&port, baud).open_native_async() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open serial port {}: {}", port, e);
            return;
        }
    };
    info!("Serial port {} opened at {} baud", port, baud);

    let reader = BufReader::new(stream);
    match ingest_lines(reader, &pool, &health, alert_cap, &notifier).await {
        Ok(n) => info!("Serial port {} closed after {} batches", port, n),
        Err(e) => error!("Serial port {} error: {}", port, e),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::notify::NotifyConfig;
    use crate::{readings, schema};

    #[test]
    fn test_parse_arduino_line() {
        // ---
        let batch = parse_line("{\"temperature\":23.4,\"humidity\":58.0}\r\n").unwrap();
        assert_eq!(batch.readings.len(), 2);
        assert_eq!(batch.plant_id, None);
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        // ---
        assert!(parse_line("").is_none());
        assert!(parse_line("   \r").is_none());
        assert!(parse_line("{\"temperature\": 23.").is_none());
        assert!(parse_line("42").is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_stop_reader() {
        // ---
        let pool = schema::connect("sqlite::memory:", 1).await.unwrap();
        schema::create_schema(&pool).await.unwrap();
        let notifier = Notifier::from_config(&NotifyConfig::default());

        let input: &[u8] = b"\xff\xfe\n{\"temperature\":23.4}\n";
        let n = ingest_lines(input, &pool, &PlantHealthConfig::default(), 3, &notifier)
            .await
            .unwrap();
        assert_eq!(n, 1);

        let latest = readings::latest_per_type(&pool).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].sensor_type, "temperature");
        assert_eq!(latest[0].value, 23.4);
    }

    #[tokio::test]
    async fn test_last_line_without_newline_is_ingested() {
        // ---
        let pool = schema::connect("sqlite::memory:", 1).await.unwrap();
        schema::create_schema(&pool).await.unwrap();
        let notifier = Notifier::from_config(&NotifyConfig::default());

        let input: &[u8] = b"garbage\n\n{\"humidity\":61.0}";
        let n = ingest_lines(input, &pool, &PlantHealthConfig::default(), 3, &notifier)
            .await
            .unwrap();
        assert_eq!(n, 1);
    }
}
