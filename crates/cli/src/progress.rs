//! Terminal progress reporting for benchmark runs.

use async_trait::async_trait;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use medbench_benchmarks::{BenchmarkEvent, EventSink, SinkClosed};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Event sink driving an indicatif progress bar.
pub struct ProgressBarSink {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressBarSink {
    /// Sink drawing to stderr.
    pub fn new(verbose: bool) -> Self {
        Self::with_bar(ProgressBar::new(0), verbose)
    }

    /// Sink drawing to an existing bar.
    pub fn with_bar(bar: ProgressBar, verbose: bool) -> Self {
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar, verbose }
    }

    /// The underlying bar.
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

#[async_trait]
impl EventSink for ProgressBarSink {
    async fn emit(&mut self, event: BenchmarkEvent) -> Result<(), SinkClosed> {
        match event {
            BenchmarkEvent::Start {
                total,
                dropped_question_ids,
                ..
            } => {
                self.bar.set_length(total as u64);
                if !dropped_question_ids.is_empty() {
                    self.bar.println(format!(
                        "{} unknown question ids ignored: {}",
                        "warning:".yellow().bold(),
                        dropped_question_ids.join(", ")
                    ));
                }
            }
            BenchmarkEvent::Testing {
                model, question_id, ..
            } => {
                self.bar.set_message(format!("{} / {}", model, question_id));
            }
            BenchmarkEvent::Result {
                model,
                question_id,
                result,
            } => {
                if self.verbose {
                    let line = if result.success {
                        format!(
                            "{} {} / {} ({} ms, {:.1} tok/s)",
                            "ok".green(),
                            model,
                            question_id,
                            result.response_time_ms,
                            result.tokens_per_second
                        )
                    } else {
                        format!(
                            "{} {} / {}: {}",
                            "FAIL".red(),
                            model,
                            question_id,
                            result.error.unwrap_or_default()
                        )
                    };
                    self.bar.println(line);
                }
            }
            BenchmarkEvent::Progress { completed, .. } => {
                self.bar.set_position(completed as u64);
            }
            BenchmarkEvent::Complete { .. } => {
                self.bar.finish_with_message("done");
            }
            BenchmarkEvent::Error { message } => {
                self.bar.abandon_with_message(message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bar_follows_progress_events() {
        let mut sink = ProgressBarSink::with_bar(ProgressBar::hidden(), false);

        sink.emit(BenchmarkEvent::Start {
            run_id: "run_1".into(),
            models: vec!["m1".into()],
            question_ids: vec!["q1".into(), "q2".into()],
            dropped_question_ids: Vec::new(),
            total: 2,
        })
        .await
        .unwrap();
        assert_eq!(sink.bar().length(), Some(2));

        sink.emit(BenchmarkEvent::progress(1, 2)).await.unwrap();
        assert_eq!(sink.bar().position(), 1);

        sink.emit(BenchmarkEvent::Error {
            message: "disk full".into(),
        })
        .await
        .unwrap();
        assert!(sink.bar().is_finished());
    }
}
