//! Report writers for validation results
//!
//! Everything here is formatting and file output layered over the ranking
//! helpers; nothing feeds back into validation.

use crate::proxy::ranking::{fastest, Summary};
use crate::proxy::ValidationResult;
use crate::Result;
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::info;

const SEPARATOR_WIDTH: usize = 100;

/// Column headers of the fastest-proxies table
pub const TABLE_HEADERS: [&str; 7] = [
    "Proxy",
    "Country",
    "Anonymity",
    "Response Time",
    "Protocols",
    "Speed",
    "UpTime",
];

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Full per-proxy log
pub fn format_results_log(results: &[ValidationResult], timestamp: &str) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut out = format!("Proxy Check Results - {}\n{}\n", timestamp, separator);
    for result in results {
        out.push_str(&format_log_entry(result));
        out.push_str(&separator);
        out.push('\n');
    }
    out
}

fn format_log_entry(result: &ValidationResult) -> String {
    let metadata = &result.metadata;
    let mut entry = format!(
        "Proxy: {}\n\
         Country: {}\n\
         Anonymity Level: {}\n\
         Speed: {}\n\
         UpTime: {}\n\
         HTTP Working: {}\n\
         HTTPS Working: {}\n",
        result.address,
        metadata.country_display(),
        metadata.anonymity_display(),
        metadata.speed_display(),
        metadata.uptime_display(),
        result.http_ok,
        result.https_ok
    );
    if let Some(ms) = result.latency_ms {
        entry.push_str(&format!("Response Time: {}ms\n", ms));
    }
    if let Some(error) = &result.error {
        entry.push_str(&format!("Error: {}\n", error));
    }
    entry
}

pub fn write_results_log<P: AsRef<Path>>(results: &[ValidationResult], path: P) -> Result<()> {
    fs::write(&path, format_results_log(results, &timestamp()))?;
    info!(path = %path.as_ref().display(), count = results.len(), "saved results log");
    Ok(())
}

/// Results as pretty-printed JSON
pub fn write_json<P: AsRef<Path>>(results: &[ValidationResult], path: P) -> Result<()> {
    fs::write(&path, serde_json::to_string_pretty(results)?)?;
    info!(path = %path.as_ref().display(), "saved JSON results");
    Ok(())
}

/// One `host:port` line per working proxy
pub fn format_working_list(results: &[ValidationResult]) -> String {
    results
        .iter()
        .filter(|r| r.is_working())
        .map(|r| format!("{}\n", r.address))
        .collect()
}

/// Returns the number of proxies written
pub fn write_working_list<P: AsRef<Path>>(results: &[ValidationResult], path: P) -> Result<usize> {
    let content = format_working_list(results);
    let count = content.lines().count();
    fs::write(&path, content)?;
    info!(path = %path.as_ref().display(), count, "saved working proxies");
    Ok(count)
}

pub fn format_summary(summary: &Summary) -> String {
    format!(
        "=== Summary ===\n\
         Total proxies checked: {}\n\
         Working proxies: {}\n\
         HTTP working: {}\n\
         HTTPS working: {}\n\
         Failed proxies: {}\n",
        summary.total_checked,
        summary.working,
        summary.http_working,
        summary.https_working,
        summary.failed
    )
}

/// Rows of the fastest-proxies table
pub fn fastest_rows(results: &[ValidationResult], top_n: usize) -> Vec<Vec<String>> {
    fastest(results, top_n)
        .into_iter()
        .map(|r| {
            vec![
                r.address.to_string(),
                r.metadata.country_display().to_string(),
                r.metadata.anonymity_display().to_string(),
                r.latency_ms
                    .map(|ms| format!("{}ms", ms))
                    .unwrap_or_else(|| "-".to_string()),
                r.protocols_label(),
                r.metadata.speed_display(),
                r.metadata.uptime_display(),
            ]
        })
        .collect()
}

/// Render rows as a grid table with a `=` rule under the header
pub fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = grid_rule('-', &widths);
    out.push_str(&grid_line(headers.iter().copied(), &widths));
    out.push_str(&grid_rule('=', &widths));
    for row in rows {
        out.push_str(&grid_line(row.iter().map(String::as_str), &widths));
        out.push_str(&grid_rule('-', &widths));
    }
    out
}

fn grid_rule(fill: char, widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.extend(std::iter::repeat(fill).take(width + 2));
        line.push('+');
    }
    line.push('\n');
    line
}

fn grid_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        line.push_str(&format!(" {}{} |", cell, " ".repeat(pad)));
    }
    line.push('\n');
    line
}

pub fn fastest_table(results: &[ValidationResult], top_n: usize) -> String {
    render_grid(&TABLE_HEADERS, &fastest_rows(results, top_n))
}

pub fn write_fastest<P: AsRef<Path>>(
    results: &[ValidationResult],
    top_n: usize,
    path: P,
) -> Result<()> {
    let content = format!(
        "Top {} Fastest Proxies - {}\n{}",
        top_n,
        timestamp(),
        fastest_table(results, top_n)
    );
    fs::write(&path, content)?;
    info!(path = %path.as_ref().display(), "saved fastest proxies");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{CandidateMetadata, ProxyAddress};

    fn sample() -> Vec<ValidationResult> {
        vec![
            ValidationResult {
                address: ProxyAddress::new("1.2.3.4", 8080),
                metadata: CandidateMetadata {
                    country: Some("US".to_string()),
                    anonymity_level: Some("elite".to_string()),
                    speed: Some(1.0),
                    uptime: Some(99.0),
                },
                http_ok: true,
                https_ok: false,
                latency_ms: Some(120),
                error: Some("timed out after 10s".to_string()),
            },
            ValidationResult {
                address: ProxyAddress::new("5.6.7.8", 3128),
                metadata: CandidateMetadata::default(),
                http_ok: false,
                https_ok: false,
                latency_ms: None,
                error: Some("connection failed".to_string()),
            },
            ValidationResult {
                address: ProxyAddress::new("9.9.9.9", 80),
                metadata: CandidateMetadata::default(),
                http_ok: true,
                https_ok: true,
                latency_ms: Some(45),
                error: None,
            },
        ]
    }

    #[test]
    fn test_results_log() {
        let log = format_results_log(&sample(), "2024-01-01 00:00:00");
        assert!(log.starts_with("Proxy Check Results - 2024-01-01 00:00:00\n"));
        assert!(log.contains("Proxy: 1.2.3.4:8080\nCountry: US\nAnonymity Level: elite\n"));
        assert!(log.contains("UpTime: 99%\nHTTP Working: true\nHTTPS Working: false\n"));
        assert!(log.contains("Response Time: 120ms\nError: timed out after 10s\n"));
        assert!(!log.contains("Response Time: 0ms"));
        assert_eq!(log.matches(&"-".repeat(SEPARATOR_WIDTH)).count(), 4);
    }

    #[test]
    fn test_results_log_entry_without_latency_or_error() {
        let result = ValidationResult {
            address: ProxyAddress::new("7.7.7.7", 1080),
            metadata: CandidateMetadata::default(),
            http_ok: false,
            https_ok: false,
            latency_ms: None,
            error: None,
        };
        let separator = "-".repeat(SEPARATOR_WIDTH);
        let log = format_results_log(&[result], "now");
        let expected = format!(
            "Proxy Check Results - now\n{sep}\n\
             Proxy: 7.7.7.7:1080\n\
             Country: Unknown\n\
             Anonymity Level: Unknown\n\
             Speed: 0\n\
             UpTime: 0%\n\
             HTTP Working: false\n\
             HTTPS Working: false\n\
             {sep}\n",
            sep = separator
        );
        assert_eq!(log, expected);
    }

    #[test]
    fn test_working_list() {
        assert_eq!(format_working_list(&sample()), "1.2.3.4:8080\n9.9.9.9:80\n");
    }

    #[test]
    fn test_summary_text() {
        let text = format_summary(&Summary::from_results(&sample()));
        assert!(text.contains("Total proxies checked: 3\n"));
        assert!(text.contains("Working proxies: 2\n"));
        assert!(text.contains("HTTPS working: 1\n"));
        assert!(text.contains("Failed proxies: 1\n"));
    }

    #[test]
    fn test_fastest_rows_sorted() {
        let rows = fastest_rows(&sample(), 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "9.9.9.9:80");
        assert_eq!(rows[0][3], "45ms");
        assert_eq!(rows[0][4], "HTTP, HTTPS");
        assert_eq!(rows[1][1], "US");
        assert_eq!(rows[1][6], "99%");
    }

    #[test]
    fn test_render_grid() {
        let table = render_grid(
            &["Proxy", "Ms"],
            &[vec!["1.1.1.1:80".to_string(), "5ms".to_string()]],
        );
        let expected = "\
+------------+-----+
| Proxy      | Ms  |
+============+=====+
| 1.1.1.1:80 | 5ms |
+------------+-----+
";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let results = sample();

        let working = dir.path().join("working.txt");
        assert_eq!(write_working_list(&results, &working).unwrap(), 2);
        assert_eq!(fs::read_to_string(&working).unwrap(), "1.2.3.4:8080\n9.9.9.9:80\n");

        let log = dir.path().join("results.txt");
        write_results_log(&results, &log).unwrap();
        assert!(fs::read_to_string(&log).unwrap().contains("Proxy: 5.6.7.8:3128"));

        let json = dir.path().join("results.json");
        write_json(&results, &json).unwrap();
        let parsed: Vec<ValidationResult> =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed, results);

        let fastest = dir.path().join("fastest.txt");
        write_fastest(&results, 1, &fastest).unwrap();
        let content = fs::read_to_string(&fastest).unwrap();
        assert!(content.starts_with("Top 1 Fastest Proxies - "));
        assert!(content.contains("9.9.9.9:80"));
        assert!(!content.contains("1.2.3.4:8080"));
    }
}
