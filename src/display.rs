use cachelytics::controller::DashboardView;
use cachelytics::filters::DateRange;
use cachelytics::health::{HealthCheckFailure, HealthCheckResult, HealthCheckSuccess};
use cachelytics::models::{CacheActivityReport, Facets, SeriesPoint, SummaryMetrics};
use chrono::Local;
use colored::*;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use serde::Serialize;

pub fn display_activity_report_enhanced(view: &DashboardView, range: &DateRange) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    println!("{}", "═".repeat(80).bright_black());
    println!(
        "{}  {}",
        "📊 Cache Activity".bright_blue().bold(),
        format!("Generated {}", timestamp).dimmed()
    );
    println!(
        "{}",
        format!(
            "Window {} → {}",
            range.start().format("%Y-%m-%d %H:%M:%S%.3f"),
            range.end().format("%Y-%m-%d %H:%M:%S%.3f")
        )
        .dimmed()
    );
    println!("{}", "═".repeat(80).bright_black());
    println!();

    display_summary_card(&view.report.summary);
    println!();

    if view.report.series.is_empty() {
        println!("{}", "No cache activity for the current selection".yellow());
    } else {
        println!("{}", "─".repeat(80).bright_black());
        println!("{}", "📋 Requests by Call Type".bright_green().bold());
        println!("{}", "─".repeat(80).bright_black());
        display_series_bars(&view.report.series);
        println!();
        display_activity_report_table(&view.report);
    }

    println!();
    println!("{}", "═".repeat(80).bright_black());
}

fn display_summary_card(summary: &SummaryMetrics) {
    println!("{}", "🎯 CACHE SUMMARY".bright_yellow().bold());
    println!("┌─────────────────────────────────────────────────────────────────────────────┐");
    println!(
        "│ ✅ Cache Hits: {}  │  💾 Cached Tokens: {}  │  📈 Hit Ratio: {}% │",
        format_count_text(&summary.cache_hits).bright_green().bold(),
        format_count_text(&summary.cached_tokens).bright_magenta().bold(),
        summary.cache_hit_ratio.bright_cyan().bold()
    );
    println!("└─────────────────────────────────────────────────────────────────────────────┘");
}

/// Stacked bar per call type: cache hits in green, model calls in blue
fn display_series_bars(series: &[SeriesPoint]) {
    const BAR_WIDTH: usize = 40;

    let max_total = series
        .iter()
        .map(|point| point.total_requests().max(0))
        .max()
        .unwrap_or(0);
    let name_width = series
        .iter()
        .map(|point| point.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);

    for point in series {
        let (hits, calls) = bar_widths(point, max_total, BAR_WIDTH);
        println!(
            "{:<width$} {}{} {} / {}",
            truncate_text(&point.name, name_width),
            "█".repeat(hits).green(),
            "█".repeat(calls).blue(),
            format_count(point.cache_hits).green(),
            format_count(point.llm_api_requests).blue(),
            width = name_width
        );
    }
    println!(
        "{} {}   {} {}",
        "█".green(),
        "Cache hit".dimmed(),
        "█".blue(),
        "LLM API requests".dimmed()
    );
}

/// Green and blue segment widths; together they never exceed `width`
fn bar_widths(point: &SeriesPoint, max_total: i64, width: usize) -> (usize, usize) {
    let hits = scaled_width(point.cache_hits, max_total, width).min(width);
    let calls = scaled_width(point.llm_api_requests, max_total, width).min(width - hits);
    (hits, calls)
}

fn scaled_width(value: i64, max: i64, width: usize) -> usize {
    if value <= 0 || max <= 0 {
        return 0;
    }
    ((value as f64 / max as f64) * width as f64).round() as usize
}

pub fn display_activity_report_table(report: &CacheActivityReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Call Type").fg(Color::Cyan),
            Cell::new("LLM API Requests").fg(Color::Cyan),
            Cell::new("Cache Hits").fg(Color::Cyan),
            Cell::new("Cached Completion Tokens").fg(Color::Cyan),
            Cell::new("Generated Completion Tokens").fg(Color::Cyan),
        ]);

    for point in &report.series {
        table.add_row(vec![
            Cell::new(&point.name),
            Cell::new(format_count(point.llm_api_requests)),
            Cell::new(format_count(point.cache_hits)),
            Cell::new(format_count(point.cached_completion_tokens)),
            Cell::new(format_count(point.generated_completion_tokens)),
        ]);
    }

    if !report.series.is_empty() {
        let generated: i64 = report
            .series
            .iter()
            .map(|point| point.generated_completion_tokens)
            .sum();
        table.add_row(vec![
            Cell::new("Total").fg(Color::Yellow),
            Cell::new(format_count(report.totals.llm_api_requests)).fg(Color::Yellow),
            Cell::new(format_count(report.totals.cache_hits)).fg(Color::Yellow),
            Cell::new(format_count(report.totals.cached_tokens)).fg(Color::Yellow),
            Cell::new(format_count(generated)).fg(Color::Yellow),
        ]);
    }

    println!("{}", table);
    println!(
        "Cache hit ratio: {}%",
        report.summary.cache_hit_ratio.bright_cyan()
    );
}

pub fn display_facets(facets: &Facets) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Facet").fg(Color::Cyan),
            Cell::new("Count").fg(Color::Cyan),
            Cell::new("Values").fg(Color::Cyan),
        ]);

    for (label, values) in [
        ("API keys", &facets.api_keys),
        ("Models", &facets.models),
        ("Call types", &facets.call_types),
    ] {
        let rendered: Vec<String> = values
            .iter()
            .map(|value| {
                if value.is_empty() {
                    "(empty)".to_string()
                } else {
                    truncate_text(value, 40)
                }
            })
            .collect();
        table.add_row(vec![
            Cell::new(label),
            Cell::new(values.len()),
            Cell::new(rendered.join("\n")),
        ]);
    }

    println!("{}", table);
}

pub fn display_health_result(result: &HealthCheckResult) {
    match result {
        HealthCheckResult::Success(success) => display_health_success(success),
        HealthCheckResult::Failure(failure) => display_health_failure(failure),
    }
}

fn display_health_success(success: &HealthCheckSuccess) {
    println!("{}", "✅ Cache health check passed".bright_green().bold());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Field").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    table.add_row(vec![Cell::new("Status"), Cell::new(&success.status)]);
    table.add_row(vec![Cell::new("Cache Type"), Cell::new(&success.cache_type)]);
    table.add_row(vec![
        Cell::new("Ping Response"),
        Cell::new(success.ping_response).fg(if success.ping_response {
            Color::Green
        } else {
            Color::Red
        }),
    ]);
    table.add_row(vec![
        Cell::new("Set Cache Response"),
        Cell::new(&success.set_cache_response),
    ]);
    println!("{}", table);

    if let Some(params) = &success.cache_params {
        println!("{}", "Cache Params".bright_blue().bold());
        println!("{}", pretty_value(params));
    }
    if let Some(params) = &success.health_check_cache_params {
        println!("{}", "Health Check Cache Params".bright_blue().bold());
        println!("{}", pretty_value(params));
    }
}

fn display_health_failure(failure: &HealthCheckFailure) {
    println!("{}", "❌ Cache health check failed".bright_red().bold());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Field").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    table.add_row(vec![
        Cell::new("Error Message").fg(Color::Red),
        Cell::new(&failure.message).fg(Color::Red),
    ]);
    for (key, value) in &failure.extra {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    println!("{}", table);
}

fn pretty_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn display_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report to JSON: {}", e),
    }
}

fn format_count(num: i64) -> String {
    let digits = num.unsigned_abs().to_string();
    let chars: Vec<char> = digits.chars().collect();
    let mut result = String::new();

    if num < 0 {
        result.push('-');
    }
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Summary metrics arrive as strings; group digits when they are plain integers
fn format_count_text(text: &str) -> String {
    text.parse::<i64>()
        .map(format_count)
        .unwrap_or_else(|_| text.to_string())
}

fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue(), message);
}
