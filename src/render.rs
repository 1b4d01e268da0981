//! Terminal and JSON rendering of dispatch reports.

use std::io::{self, Write};

use crossterm::style::{Color, Stylize};
use serde::Serialize;

use crate::directives::{DispatchReport, ExecutionResult};

const INDENT: &str = "  ";
const GLYPH: &str = "•";

/// Writes human-readable reports, colored when enabled.
#[derive(Debug, Clone, Copy)]
pub struct ReportRenderer {
    color: bool,
}

impl ReportRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn render(&self, report: &DispatchReport, out: &mut impl Write) -> io::Result<()> {
        if report.is_empty() {
            return writeln!(out, "No directives found.");
        }
        for result in &report.results {
            self.result(result, out)?;
        }
        Ok(())
    }

    fn result(&self, result: &ExecutionResult, out: &mut impl Write) -> io::Result<()> {
        let (label, color) = status(result);
        if self.color {
            writeln!(
                out,
                "{} {} {} {}",
                GLYPH.with(Color::DarkGrey),
                result.protocol.as_str().with(Color::Cyan).bold(),
                label.with(color).bold(),
                result.command.as_str().with(Color::White),
            )?;
        } else {
            writeln!(out, "{GLYPH} {} {label} {}", result.protocol, result.command)?;
        }
        for (key, value) in &result.meta {
            if self.color {
                writeln!(out, "{INDENT}{} {value}", format!("{key}:").with(Color::DarkGrey))?;
            } else {
                writeln!(out, "{INDENT}{key}: {value}")?;
            }
        }
        if let Some(error) = &result.error {
            if self.color {
                writeln!(out, "{INDENT}{} {error}", "error:".with(Color::Red))?;
            } else {
                writeln!(out, "{INDENT}error: {error}")?;
            }
        }
        if result.error.as_deref() == Some(result.output.as_str()) {
            return Ok(());
        }
        for line in result.output.lines() {
            writeln!(out, "{INDENT}{INDENT}{line}")?;
        }
        Ok(())
    }
}

fn status(result: &ExecutionResult) -> (&'static str, Color) {
    if result.is_denied() {
        ("denied", Color::Yellow)
    } else if result.is_error() {
        ("error", Color::Red)
    } else {
        ("ok", Color::Green)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [ExecutionResult],
    by_protocol: std::collections::BTreeMap<String, Vec<&'a ExecutionResult>>,
    follow_up: String,
}

/// Report as pretty JSON: the ordered results, the per-protocol grouping,
/// and the follow-up prompt text.
pub fn report_json(report: &DispatchReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        results: &report.results,
        by_protocol: report.by_protocol(),
        follow_up: report.follow_up_prompt(),
    })
}
