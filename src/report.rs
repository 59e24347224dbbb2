//! Rendering of batch outcomes

use std::io::Write;
use serde::Serialize;

use crate::error::Result;
use crate::parallel::OutcomeStream;
use crate::processing::Outcome;

/// Line printed after the last outcome
pub const COMPLETION_MARKER: &str = "Processing complete.";

/// Output style of the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One human-readable line per outcome
    #[default]
    Text,
    /// One JSON object per outcome, then a summary object
    Json,
}

/// Tally of a drained batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn add(&mut self, outcome: &Outcome) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    event: &'static str,
    message: &'a str,
    #[serde(flatten)]
    summary: BatchSummary,
}

/// Sink that renders outcomes in arrival order
pub struct ResultReporter<W> {
    writer: W,
    format: ReportFormat,
    summary: BatchSummary,
}

impl<W: Write> ResultReporter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer,
            format,
            summary: BatchSummary::default(),
        }
    }

    /// Render one outcome
    pub fn report(&mut self, outcome: &Outcome) -> Result<()> {
        self.summary.add(outcome);
        match self.format {
            ReportFormat::Text => writeln!(self.writer, "{}", render_line(outcome))?,
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.writer, outcome)?;
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }

    /// Render the completion marker and return the tally
    pub fn finish(&mut self) -> Result<BatchSummary> {
        match self.format {
            ReportFormat::Text => writeln!(self.writer, "{}", COMPLETION_MARKER)?,
            ReportFormat::Json => {
                let record = SummaryRecord {
                    event: "complete",
                    message: COMPLETION_MARKER,
                    summary: self.summary,
                };
                serde_json::to_writer(&mut self.writer, &record)?;
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()?;
        Ok(self.summary)
    }

    /// Report every outcome of `stream` until it closes, then the marker
    pub async fn drain(&mut self, mut stream: OutcomeStream) -> Result<BatchSummary> {
        while let Some(outcome) = stream.next_outcome().await {
            if let Err(e) = self.report(&outcome) {
                stream.close().await;
                return Err(e);
            }
        }
        stream.finish().await;
        self.finish()
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Text rendering of a single outcome
pub fn render_line(outcome: &Outcome) -> String {
    if outcome.is_success() {
        format!("Processed file at {}", outcome.input_path.display())
    } else {
        format!(
            "Error when processing {}: {}",
            outcome.input_path.display(),
            outcome.detail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrayBatchError;

    fn outcomes() -> Vec<Outcome> {
        vec![
            Outcome::success("a.png", "out/a.png"),
            Outcome::failure("c.bmp", &GrayBatchError::unsupported_format(Some("bmp".into()))),
        ]
    }

    #[test]
    fn test_text_lines() {
        let mut reporter = ResultReporter::new(Vec::new(), ReportFormat::Text);
        for outcome in outcomes() {
            reporter.report(&outcome).unwrap();
        }
        let summary = reporter.finish().unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        assert_eq!(
            text,
            "Processed file at a.png\n\
             Error when processing c.bmp: unsupported image format\n\
             Processing complete.\n"
        );
        assert_eq!(summary, BatchSummary { total: 2, succeeded: 1, failed: 1 });
        assert!(summary.has_failures());
    }

    #[test]
    fn test_json_lines() {
        let mut reporter = ResultReporter::new(Vec::new(), ReportFormat::Json);
        for outcome in outcomes() {
            reporter.report(&outcome).unwrap();
        }
        reporter.finish().unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"], "success");
        assert_eq!(lines[0]["output_path"], "out/a.png");
        assert_eq!(lines[1]["kind"], "unsupported_format");
        assert_eq!(lines[2]["event"], "complete");
        assert_eq!(lines[2]["failed"], 1);
    }

    #[test]
    fn test_empty_report_prints_marker_only() {
        let mut reporter = ResultReporter::new(Vec::new(), ReportFormat::Text);
        let summary = reporter.finish().unwrap();
        assert_eq!(String::from_utf8(reporter.into_inner()).unwrap(), "Processing complete.\n");
        assert_eq!(summary.total, 0);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drain_write_error_stops_workers() {
        let out = tempfile::TempDir::new().unwrap();
        let inputs: Vec<String> = (0..32).map(|i| format!("gone-{}.png", i)).collect();
        let stream = crate::BatchCoordinator::new()
            .concurrency(crate::Concurrency::Bounded(2))
            .channel_capacity(1)
            .run(inputs, out.path());

        let mut reporter = ResultReporter::new(BrokenPipe, ReportFormat::Text);
        let result = tokio::time::timeout(std::time::Duration::from_secs(10), reporter.drain(stream))
            .await
            .expect("drain should return once the workers have exited");

        assert!(matches!(result, Err(GrayBatchError::IoError(_))));
        assert_eq!(reporter.summary().total, 1);
    }

    #[tokio::test]
    async fn test_drain_puts_marker_last() {
        let out = tempfile::TempDir::new().unwrap();
        let stream = crate::BatchCoordinator::new().run(["x.png", "y.jpg"], out.path());

        let mut reporter = ResultReporter::new(Vec::new(), ReportFormat::Text);
        let summary = reporter.drain(stream).await.unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(summary.failed, 2);
        assert_eq!(lines.len(), 3);
        assert!(lines[..2].iter().all(|l| l.starts_with("Error when processing ")));
        assert_eq!(lines[2], COMPLETION_MARKER);
    }
}
