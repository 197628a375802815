//! Terminal formatting helpers.

use colored::Colorize;
use medbench_adapters::EndpointHealth;
use medbench_core::{BenchmarkQuestion, BenchmarkRun};

/// Print a section header.
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {} ===", title).cyan().bold());
}

/// Print a key-value pair.
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Colour a success rate: green when perfect, red when nothing passed.
pub(crate) fn rate(percent: f64) -> String {
    let text = format!("{:.0}%", percent);
    if percent >= 100.0 {
        text.green().to_string()
    } else if percent <= 0.0 {
        text.red().to_string()
    } else {
        text.yellow().to_string()
    }
}

pub(crate) fn print_run_summary(run: &BenchmarkRun) {
    section(&format!("Run {}", run.id));
    kv("Models", run.models_tested);
    kv("Questions", run.questions_tested);
    kv(
        "Tests",
        format!(
            "{} total, {} ok, {} failed",
            run.summary.total_tests, run.summary.successful_tests, run.summary.failed_tests
        ),
    );
    kv("Avg response", format!("{:.0} ms", run.summary.average_response_time_ms));
    kv(
        "Duration",
        format!("{:.1}s", run.summary.total_duration_ms as f64 / 1000.0),
    );

    println!();
    println!(
        "  {:<28} {:>8} {:>12} {:>10}",
        "MODEL".bold(),
        "SUCCESS".bold(),
        "AVG MS".bold(),
        "TOK/S".bold()
    );
    for (model, summary) in run.results.iter() {
        println!(
            "  {:<28} {:>8} {:>12.0} {:>10.1}",
            model,
            rate(summary.success_rate_percent),
            summary.average_response_time_ms,
            summary.average_tokens_per_second
        );
    }
}

pub(crate) fn print_run_line(run: &BenchmarkRun) {
    println!(
        "  {}  {}  {} models x {} questions  {}/{} ok",
        run.id.bold(),
        run.timestamp.format("%Y-%m-%d %H:%M:%S"),
        run.models_tested,
        run.questions_tested,
        run.summary.successful_tests,
        run.summary.total_tests
    );
}

pub(crate) fn print_question(question: &BenchmarkQuestion) {
    println!(
        "  {:<30} {:<11} {:<7} {}",
        question.id.bold(),
        question.category.as_str(),
        format!("{:?}", question.difficulty).to_lowercase(),
        question.prompt.dimmed()
    );
}

pub(crate) fn print_health(health: &EndpointHealth) {
    if health.reachable {
        println!(
            "  {} {} ({} ms, {} models)",
            "UP".green().bold(),
            health.endpoint,
            health.latency_ms,
            health.models.len()
        );
    } else {
        println!(
            "  {} {}: {}",
            "DOWN".red().bold(),
            health.endpoint,
            health.error.as_deref().unwrap_or("unreachable")
        );
    }
}
