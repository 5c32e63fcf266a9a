//! Report formatter
//!
//! Renders a run report according to the verbosity tier:
//! 0 prints only the summary, 1 adds the output of failed shards and 2+
//! adds the output of every shard.

#![allow(dead_code)]

use std::io::{self, Write};

use crate::models::{RunReport, ShardStatus, WorkerOutcome};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Verbosity-aware report formatter
pub struct ReportFormatter {
    verbosity: u8,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn with_color(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    /// Shards whose captured output belongs in the report, in index order
    pub fn shown_shards<'a>(&self, report: &'a RunReport) -> Vec<&'a WorkerOutcome> {
        match self.verbosity {
            0 => Vec::new(),
            1 => report.failures().collect(),
            _ => report.outcomes.iter().collect(),
        }
    }

    /// Format the complete report
    pub fn format_report(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str(&self.format_summary(report));
        output.push('\n');

        for outcome in self.shown_shards(report) {
            output.push('\n');
            output.push_str(&self.format_shard(outcome));
        }

        output.push('\n');
        output.push_str(&self.format_banner(report));
        output.push('\n');
        output
    }

    /// Write the complete report and flush
    pub fn write_report<W: Write>(&self, out: &mut W, report: &RunReport) -> io::Result<()> {
        out.write_all(self.format_report(report).as_bytes())?;
        out.flush()
    }

    /// One-line summary: counts and the overall verdict
    pub fn format_summary(&self, report: &RunReport) -> String {
        let summary = report.to_string();
        if !self.colorize {
            return summary;
        }
        let color = if report.is_success() { GREEN } else { RED };
        let verdict = report.verdict();
        summary.replacen(
            &format!("overall: {verdict}"),
            &format!("overall: {color}{verdict}{RESET}"),
            1,
        )
    }

    /// Header line plus the shard's captured output
    pub fn format_shard(&self, outcome: &WorkerOutcome) -> String {
        let mut output = String::new();

        let label = format!(
            "[{}] {} ({}ms)",
            outcome.shard,
            outcome.status.describe(),
            outcome.duration_ms()
        );
        output.push_str(RULE);
        output.push('\n');
        if self.colorize {
            let color = status_color(&outcome.status);
            output.push_str(&format!("{color}{label}{RESET}\n"));
        } else {
            output.push_str(&label);
            output.push('\n');
        }
        output.push_str(RULE);
        output.push('\n');

        if outcome.output.is_empty() {
            output.push_str("(no output)\n");
        } else {
            output.push_str(&outcome.output);
            if !outcome.output.ends_with('\n') {
                output.push('\n');
            }
        }

        output
    }

    fn format_banner(&self, report: &RunReport) -> String {
        let (color, text) = if report.is_success() {
            (GREEN, "[PASS]")
        } else {
            (RED, "[FAIL]")
        };
        if self.colorize {
            format!("{color}{BOLD}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn status_color(status: &ShardStatus) -> &'static str {
    if status.is_success() {
        GREEN
    } else {
        RED
    }
}
