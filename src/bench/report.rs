//! Session records and reporters

use serde::Serialize;
use std::io::Write;

use crate::backend::Content;
use crate::bench::metrics::MetricsSummary;
use crate::bench::stats::StatsResult;
use crate::core::error::{HarnessError, HarnessResult};
use crate::platform::HostInfo;

/// Result of one (target, case, size) session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub target: String,
    pub content: Content,
    pub case: String,
    pub size: u32,
    /// Samples collected before filtering
    pub raw_count: usize,
    pub outcome: SessionOutcome,
    /// Sorted raw samples in seconds, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Measured { stats: StatsResult },
    /// The statistics engine rejected the sample set
    NoData { reason: String },
}

impl SessionRecord {
    pub fn stats(&self) -> Option<&StatsResult> {
        match &self.outcome {
            SessionOutcome::Measured { stats } => Some(stats),
            SessionOutcome::NoData { .. } => None,
        }
    }
}

/// Sink for session records.
pub trait Reporter {
    /// Called once before the first session.
    fn begin(&mut self, _host: &HostInfo) -> HarnessResult<()> {
        Ok(())
    }

    fn record(&mut self, record: &SessionRecord) -> HarnessResult<()>;

    /// Called once after the last session.
    fn finish(&mut self, _summary: &MetricsSummary) -> HarnessResult<()> {
        Ok(())
    }
}

impl Reporter for Vec<SessionRecord> {
    fn record(&mut self, record: &SessionRecord) -> HarnessResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Text
// ============================================================================

/// One aligned line per session, times in milliseconds.
pub struct TextReporter<W: Write> {
    out: W,
    index: usize,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, index: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn begin(&mut self, host: &HostInfo) -> HarnessResult<()> {
        writeln!(
            self.out,
            "# {} {} ({}), {}, {} CPUs",
            host.os_name,
            host.os_version.as_deref().unwrap_or(""),
            host.arch,
            host.cpu_brand,
            host.cpu_count
        )?;
        writeln!(
            self.out,
            "# clock: {} at {} Hz, started {}",
            host.clock, host.clock_frequency, host.started_at
        )?;
        writeln!(
            self.out,
            "[  #] {:>10} {:<12} {:>5} {:>12} {:>12} {:>8} {:>11}",
            "target", "case", "size", "min(ms)", "median(ms)", "stddev", "iterations"
        )?;
        Ok(())
    }

    fn record(&mut self, record: &SessionRecord) -> HarnessResult<()> {
        write!(
            self.out,
            "[{:3}] {:>10} {:<12} {:>5} ",
            self.index, record.target, record.case, record.size
        )?;
        self.index += 1;

        match &record.outcome {
            SessionOutcome::Measured { stats } => writeln!(
                self.out,
                "{:>12.4} {:>12.4} {:>7.2}% {:>5}/{:<5}",
                stats.min * 1e3,
                stats.median * 1e3,
                stats.std_dev * 100.0,
                stats.iterations,
                record.raw_count
            )?,
            SessionOutcome::NoData { reason } => writeln!(
                self.out,
                "no data ({} samples): {}",
                record.raw_count, reason
            )?,
        }

        if let Some(samples) = &record.samples {
            let rendered: Vec<String> = samples.iter().map(|s| format!("{:.4}", s * 1e3)).collect();
            writeln!(self.out, "      raw(ms): {}", rendered.join(" "))?;
        }
        Ok(())
    }

    fn finish(&mut self, summary: &MetricsSummary) -> HarnessResult<()> {
        writeln!(
            self.out,
            "# {} measured, {} no data, {} skipped, {} abandoned; {} samples ({} kept) in {:.1}s",
            summary.sessions_measured,
            summary.sessions_no_data,
            summary.pairs_skipped,
            summary.sessions_abandoned,
            summary.total_samples,
            summary.kept_samples,
            summary.elapsed_secs
        )?;
        self.out.flush()?;
        Ok(())
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Newline-delimited JSON: a host object, one object per session, a summary.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> HarnessResult<()> {
        serde_json::to_writer(&mut self.out, value)
            .map_err(|e| HarnessError::Io(format!("Failed to write JSON record: {}", e)))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn begin(&mut self, host: &HostInfo) -> HarnessResult<()> {
        self.write_line(&serde_json::json!({ "host": host }))
    }

    fn record(&mut self, record: &SessionRecord) -> HarnessResult<()> {
        self.write_line(record)
    }

    fn finish(&mut self, summary: &MetricsSummary) -> HarnessResult<()> {
        self.write_line(&serde_json::json!({ "summary": summary }))?;
        self.out.flush()?;
        Ok(())
    }
}
