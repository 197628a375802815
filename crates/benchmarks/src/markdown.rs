//! Markdown output generation for benchmark runs.
//!
//! This module renders stored runs as human-readable reports for the CLI
//! and for sharing results outside the dashboard.

use medbench_core::BenchmarkRun;
use std::fmt::{self, Write};

const PREVIEW_CHARS: usize = 60;

/// Generate a markdown summary table over several runs.
pub fn generate_summary(runs: &[BenchmarkRun]) -> String {
    let mut output = String::new();
    let _ = write_summary(&mut output, runs);
    output
}

/// Generate a detailed markdown report for one run.
pub fn generate_run_report(run: &BenchmarkRun) -> String {
    let mut output = String::new();
    let _ = write_run_report(&mut output, run);
    output
}

fn write_summary(output: &mut String, runs: &[BenchmarkRun]) -> fmt::Result {
    writeln!(output, "# Benchmark Summary")?;
    writeln!(output)?;
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(output)?;
    writeln!(output, "| Run ID | Timestamp | Models | Questions | Success | Avg Time (ms) |")?;
    writeln!(output, "|--------|-----------|--------|-----------|---------|---------------|")?;

    for run in runs {
        writeln!(
            output,
            "| {} | {} | {} | {} | {}/{} | {:.0} |",
            run.id,
            run.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            run.models_tested,
            run.questions_tested,
            run.summary.successful_tests,
            run.summary.total_tests,
            run.summary.average_response_time_ms
        )?;
    }

    writeln!(output)?;
    writeln!(output, "---")?;
    writeln!(output, "Total runs: {}", runs.len())?;
    Ok(())
}

fn write_run_report(output: &mut String, run: &BenchmarkRun) -> fmt::Result {
    writeln!(output, "# Benchmark Run {}", run.id)?;
    writeln!(output)?;
    writeln!(output, "**Timestamp:** {}", run.timestamp.to_rfc3339())?;
    writeln!(
        output,
        "**Tests:** {} total, {} successful, {} failed",
        run.summary.total_tests, run.summary.successful_tests, run.summary.failed_tests
    )?;
    writeln!(
        output,
        "**Duration:** {:.1}s",
        run.summary.total_duration_ms as f64 / 1000.0
    )?;
    if !run.dropped_question_ids.is_empty() {
        writeln!(
            output,
            "**Unknown question ids:** {}",
            run.dropped_question_ids.join(", ")
        )?;
    }
    writeln!(output)?;

    writeln!(output, "## Models")?;
    writeln!(output)?;
    writeln!(output, "| Model | Success Rate | Avg Time (ms) | Avg Tokens/s | Total Time (ms) |")?;
    writeln!(output, "|-------|--------------|---------------|--------------|-----------------|")?;
    for (model, summary) in run.results.iter() {
        writeln!(
            output,
            "| {} | {:.0}% | {:.0} | {:.1} | {} |",
            model,
            summary.success_rate_percent,
            summary.average_response_time_ms,
            summary.average_tokens_per_second,
            summary.total_response_time_ms
        )?;
    }
    writeln!(output)?;

    for (model, summary) in run.results.iter() {
        writeln!(output, "## {}", model)?;
        writeln!(output)?;
        for (question_id, result) in summary.questions_results.iter() {
            if result.success {
                writeln!(
                    output,
                    "- **{}** ({} ms, {:.1} tok/s): {}",
                    question_id,
                    result.response_time_ms,
                    result.tokens_per_second,
                    preview(&result.response)
                )?;
            } else {
                writeln!(
                    output,
                    "- **{}** FAILED: {}",
                    question_id,
                    result.error.as_deref().unwrap_or("unknown error")
                )?;
            }
            if let Some(rating) = result.user_rating {
                writeln!(output, "  - Rating: {}/5", rating)?;
            }
        }
        writeln!(output)?;
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}
