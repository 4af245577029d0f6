use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppResult;

/// Append-only JSONL buffer for pipeline outcome events (degradations,
/// demo substitutions, annotation failures). Buffered in memory and
/// persisted in batches; the file is truncated when it outgrows its cap.
#[derive(Clone)]
pub struct TelemetryClient {
    enabled: Arc<AtomicBool>,
    queue: Arc<Mutex<Vec<TelemetryEvent>>>,
    buffer_path: PathBuf,
    batch_size: usize,
    max_file_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl TelemetryClient {
    pub fn new<P: AsRef<Path>>(data_dir: P, config: &AppConfig) -> AppResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let buffer_path = data_dir.join("curation-events.jsonl");
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&buffer_path)?;

        Ok(Self {
            enabled: Arc::new(AtomicBool::new(config.telemetry_enabled_by_default)),
            queue: Arc::new(Mutex::new(Vec::new())),
            buffer_path,
            batch_size: config.telemetry_batch_size.max(1),
            max_file_bytes: config.telemetry_buffer_max_bytes,
        })
    }

    pub fn record(&self, name: impl Into<String>, payload: serde_json::Value) -> AppResult<()> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Ok(());
        }

        let mut queue = self.queue.lock();
        queue.push(TelemetryEvent {
            name: name.into(),
            timestamp: Utc::now(),
            payload,
        });
        if queue.len() >= self.batch_size {
            self.persist_locked(&mut queue)?;
        }
        Ok(())
    }

    pub fn flush(&self) -> AppResult<()> {
        let mut queue = self.queue.lock();
        self.persist_locked(&mut queue)
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn buffer_path(&self) -> &Path {
        &self.buffer_path
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn persist_locked(&self, queue: &mut Vec<TelemetryEvent>) -> AppResult<()> {
        if queue.is_empty() {
            return Ok(());
        }

        let mut lines = Vec::with_capacity(queue.len());
        let mut incoming = 0_u64;
        for event in queue.iter() {
            let line = serde_json::to_vec(event)?;
            incoming += (line.len() + 1) as u64;
            lines.push(line);
        }

        let current = std::fs::metadata(&self.buffer_path)
            .map(|m| m.len())
            .unwrap_or(0);
        if current + incoming > self.max_file_bytes {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.buffer_path)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.buffer_path)?;
        for line in &lines {
            file.write_all(line)?;
            file.write_all(b"\n")?;
        }
        file.flush()?;
        queue.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::from_env();
        config.telemetry_enabled_by_default = true;
        config.telemetry_batch_size = 2;
        config.telemetry_buffer_max_bytes = 1024;
        config
    }

    #[test]
    fn flushes_events_to_disk() {
        let dir = tempdir().unwrap();
        let client = TelemetryClient::new(dir.path(), &test_config()).unwrap();
        client
            .record("curation_degraded", json!({ "reason": "no_provider" }))
            .unwrap();
        assert_eq!(client.queue_depth(), 1);
        client.flush().unwrap();

        let buffer = std::fs::read_to_string(client.buffer_path()).unwrap();
        assert!(buffer.contains("curation_degraded"));
        assert_eq!(client.queue_depth(), 0);
    }

    #[test]
    fn truncates_when_exceeding_capacity() {
        let dir = tempdir().unwrap();
        let mut config = test_config();
        config.telemetry_buffer_max_bytes = 96;
        config.telemetry_batch_size = 1;
        let client = TelemetryClient::new(dir.path(), &config).unwrap();

        for i in 0..6 {
            client.record("noisy", json!({ "idx": i })).unwrap();
        }

        let size = std::fs::metadata(client.buffer_path()).unwrap().len();
        assert!(size <= 192, "buffer grew unbounded: {size}");
    }

    #[test]
    fn disabled_client_records_nothing() {
        let dir = tempdir().unwrap();
        let client = TelemetryClient::new(dir.path(), &test_config()).unwrap();
        client.set_enabled(false);
        client.record("ignored", json!({})).unwrap();
        client.flush().unwrap();

        let buffer = std::fs::read_to_string(client.buffer_path()).unwrap();
        assert!(buffer.is_empty());
    }
}
