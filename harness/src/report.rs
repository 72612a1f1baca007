//! Pass/fail bookkeeping for a run.
//!
//! Every check produces one [`TestResult`]. A [`Report`] collects the results
//! of one suite and prints a line per result as it arrives; a [`RunReport`]
//! aggregates the suites for the final summary and the optional JSON file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(test_name: impl Into<String>, success: bool, message: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            success,
            message: message.into(),
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn render_line(&self, color: bool) -> String {
        let (mark, paint) = if self.success {
            ("✓ PASS", GREEN)
        } else {
            ("✗ FAIL", RED)
        };

        if color {
            format!(
                "{}{}{} {} ({}ms): {}",
                paint, mark, RESET, self.test_name, self.duration_ms, self.message
            )
        } else {
            format!(
                "{} {} ({}ms): {}",
                mark, self.test_name, self.duration_ms, self.message
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub suite: String,
    pub results: Vec<TestResult>,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    color: bool,
    #[serde(skip)]
    echo: bool,
}

impl Report {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            results: Vec::new(),
            started_at: Utc::now(),
            color: false,
            echo: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Collect without printing; used by tests.
    pub fn silent(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn log_result(&mut self, test_name: &str, success: bool, message: impl Into<String>) {
        self.record(TestResult::new(test_name, success, message));
    }

    pub fn record(&mut self, result: TestResult) {
        if self.echo {
            println!("  {}", result.render_line(self.color));
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.passed() as f64 / self.total() as f64 * 100.0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn result(&self, test_name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.test_name == test_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub suites: Vec<Report>,
}

impl RunReport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            started_at: Utc::now(),
            finished_at: None,
            suites: Vec::new(),
        }
    }

    pub fn push(&mut self, report: Report) {
        self.suites.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn suite(&self, name: &str) -> Option<&Report> {
        self.suites.iter().find(|s| s.suite == name)
    }

    pub fn total(&self) -> usize {
        self.suites.iter().map(Report::total).sum()
    }

    pub fn passed(&self) -> usize {
        self.suites.iter().map(Report::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.suites.iter().map(Report::failed).sum()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.passed() as f64 / total as f64 * 100.0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_summary(&self, color: bool) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        out.push_str(&rule);
        out.push('\n');
        if color {
            out.push_str(&format!("{}TEST SUMMARY{}\n", BOLD, RESET));
        } else {
            out.push_str("TEST SUMMARY\n");
        }
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("Target: {}\n", self.base_url));

        for suite in &self.suites {
            out.push_str(&format!(
                "  {:<14} {:>3}/{:<3} passed\n",
                suite.suite,
                suite.passed(),
                suite.total()
            ));
        }

        out.push_str(&format!(
            "Total: {}  Passed: {}  Failed: {}  Success rate: {:.1}%\n",
            self.total(),
            self.passed(),
            self.failed(),
            self.success_rate()
        ));

        if !self.all_passed() {
            out.push_str("\nFailed tests:\n");
            for suite in &self.suites {
                for failure in suite.failures() {
                    out.push_str(&format!(
                        "  - {}::{}: {}\n",
                        suite.suite, failure.test_name, failure.message
                    ));
                }
            }
        }

        let verdict = if self.all_passed() {
            "ALL TESTS PASSED"
        } else {
            "SOME TESTS FAILED"
        };
        if color {
            let paint = if self.all_passed() { GREEN } else { RED };
            out.push_str(&format!("\n{}{}{}\n", paint, verdict, RESET));
        } else {
            out.push_str(&format!("\n{}\n", verdict));
        }

        out
    }
}
