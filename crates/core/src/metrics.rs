//! Statistics for one compress or extract run.
//!
//! Collected by the framing pipeline at each stage and reported through
//! `tracing` once the run completes. The CRC32 of the raw bytes is recorded
//! on both sides, so a compress summary and the matching extract summary can
//! be compared by eye.

use std::time::{Duration, Instant};

use tracing::info;

/// Which direction a run went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Extract,
}

/// Counters for a single run.
#[derive(Debug, Clone)]
pub struct CompressionStats {
    pub direction: Direction,

    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on completion)
    pub end_time: Option<Instant>,

    /// Uncompressed bytes (input when compressing, output when extracting)
    pub raw_bytes: u64,

    /// Bytes after the run-length pre-pass, if it ran
    pub run_length_bytes: Option<u64>,

    /// Framed artifact bytes
    pub archive_bytes: u64,

    /// Serialized tree bits
    pub tree_bits: u64,

    /// Meaningful payload bits
    pub payload_bits: u64,

    /// CRC32 of the raw bytes
    pub raw_crc32: u32,
}

impl CompressionStats {
    /// Create new stats with start time set to now.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            start_time: Instant::now(),
            end_time: None,
            raw_bytes: 0,
            run_length_bytes: None,
            archive_bytes: 0,
            tree_bits: 0,
            payload_bits: 0,
            raw_crc32: 0,
        }
    }

    /// Record the uncompressed side of the run.
    pub fn record_raw(&mut self, raw: &[u8]) {
        self.raw_bytes = raw.len() as u64;
        self.raw_crc32 = crc32fast::hash(raw);
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Archive size over raw size.
    ///
    /// Returns 0.0 if there were no raw bytes.
    pub fn compression_ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            0.0
        } else {
            self.archive_bytes as f64 / self.raw_bytes as f64
        }
    }

    /// Raw bytes processed per second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.raw_bytes as f64 / duration_secs
        }
    }

    /// Log a one-line summary at info level.
    pub fn log_summary(&self) {
        info!(
            direction = ?self.direction,
            raw_bytes = self.raw_bytes,
            archive_bytes = self.archive_bytes,
            run_length_bytes = ?self.run_length_bytes,
            tree_bits = self.tree_bits,
            payload_bits = self.payload_bits,
            ratio = %format!("{:.1}%", self.compression_ratio() * 100.0),
            crc32 = %format!("{:#010x}", self.raw_crc32),
            duration_ms = self.duration().as_millis() as u64,
            throughput_mb_s = %format!("{:.2}", self.throughput_bps() / 1_000_000.0),
            "run complete"
        );
    }

    /// Export as `key=value` lines (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "direction={:?}\n\
             raw_bytes={}\n\
             run_length_bytes={}\n\
             archive_bytes={}\n\
             tree_bits={}\n\
             payload_bits={}\n\
             compression_ratio={:.4}\n\
             raw_crc32={:#010x}\n",
            self.direction,
            self.raw_bytes,
            self.run_length_bytes
                .map_or_else(|| "-".to_string(), |bytes| bytes.to_string()),
            self.archive_bytes,
            self.tree_bits,
            self.payload_bits,
            self.compression_ratio(),
            self.raw_crc32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_creation() {
        let stats = CompressionStats::new(Direction::Compress);
        assert!(stats.end_time.is_none());
        assert!(stats.duration().as_millis() < 100);
    }

    #[test]
    fn test_compression_ratio() {
        let mut stats = CompressionStats::new(Direction::Compress);
        assert_eq!(stats.compression_ratio(), 0.0);

        stats.raw_bytes = 1000;
        stats.archive_bytes = 750;
        assert_eq!(stats.compression_ratio(), 0.75);
    }

    #[test]
    fn test_record_raw() {
        let mut stats = CompressionStats::new(Direction::Extract);
        stats.record_raw(b"123456789");
        assert_eq!(stats.raw_bytes, 9);
        // Standard CRC-32 check value
        assert_eq!(stats.raw_crc32, 0xCBF4_3926);
    }

    #[test]
    fn test_export_text() {
        let mut stats = CompressionStats::new(Direction::Compress);
        stats.raw_bytes = 1000;
        stats.archive_bytes = 500;
        stats.run_length_bytes = Some(800);
        stats.complete();

        let text = stats.export_text();
        assert!(text.contains("direction=Compress"));
        assert!(text.contains("raw_bytes=1000"));
        assert!(text.contains("run_length_bytes=800"));
        assert!(text.contains("compression_ratio=0.5000"));
    }
}
