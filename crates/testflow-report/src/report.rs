//! Report generation: JSON, HTML, JUnit XML, and colored terminal output,
//! all built from one `Report` assembled out of a scheduler run.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use testflow_exec::{Status, StepResult, SuiteResult};
use testflow_scheduler::AggregatedResult;

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Terminal,
    Json,
    Html,
    JUnit,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "term" | "console" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            "junit" | "xml" => Ok(ReportFormat::JUnit),
            _ => Err(format!("unknown report format: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub suites: Vec<SuiteReport>,
    pub summary: ReportSummary,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub node_id: String,
    pub name: String,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub failed_assertions: Vec<String>,
    pub stdout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub pass_rate: f64,
}

pub struct Reporter {
    max_output_length: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self { max_output_length: 2000 }
    }

    pub fn with_max_output_length(mut self, len: usize) -> Self {
        self.max_output_length = len;
        self
    }

    pub fn generate(&self, result: &AggregatedResult) -> Report {
        let suites: Vec<SuiteReport> = result.suites.iter().map(|s| self.suite_report(s)).collect();
        let duration_ms = suites.iter().map(|s| s.duration_ms).sum();

        Report {
            timestamp: Utc::now(),
            summary: ReportSummary {
                total: result.total,
                passed: result.successful,
                failed: result.failed,
                skipped: result.skipped,
                duration_ms,
                pass_rate: result.success_rate,
            },
            cancelled: result.cancelled,
            suites,
        }
    }

    fn suite_report(&self, result: &SuiteResult) -> SuiteReport {
        SuiteReport {
            node_id: result.node_id.as_str().to_string(),
            name: result.suite_name.clone(),
            steps: result.steps.iter().map(|s| self.step_report(s)).collect(),
            duration_ms: result.duration_ms,
            status: status_str(result.status).to_string(),
            error: result.error_message.clone(),
        }
    }

    fn step_report(&self, result: &StepResult) -> StepReport {
        let failed_assertions = result
            .assertions
            .iter()
            .filter(|a| !a.passed)
            .map(|a| format!("{}: {}", a.field_path, a.message))
            .collect();

        let stdout = result
            .response
            .as_ref()
            .map(|r| self.truncate(&r.to_string()));

        StepReport {
            name: result.step_name.clone(),
            status: status_str(result.status).to_string(),
            duration_ms: result.duration_ms,
            error: result.error_message.clone(),
            failed_assertions,
            stdout,
        }
    }

    fn truncate(&self, s: &str) -> String {
        if s.len() <= self.max_output_length {
            s.to_string()
        } else {
            format!("{}... (truncated)", &s[..self.max_output_length])
        }
    }

    pub fn write_terminal<W: Write>(&self, report: &Report, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer)?;
        writeln!(writer, "{}", "Test Results".bold())?;
        writeln!(writer, "{}", "=".repeat(60))?;
        writeln!(writer)?;

        for suite in &report.suites {
            self.write_suite_terminal(suite, writer)?;
        }

        self.write_summary_terminal(&report.summary, report.cancelled, writer)?;
        Ok(())
    }

    fn write_suite_terminal<W: Write>(&self, suite: &SuiteReport, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{} {} ({})", "Suite:".bold(), suite.name, suite.node_id.dimmed())?;
        writeln!(writer, "{}", "-".repeat(60))?;

        for step in &suite.steps {
            let status_icon = match step.status.as_str() {
                "success" => "PASS".green(),
                "failure" => "FAIL".red(),
                "skipped" => "SKIP".yellow(),
                _ => "????".normal(),
            };

            writeln!(
                writer,
                "  [{}] {}{}",
                status_icon,
                step.name,
                format!(" ({:.2}s)", step.duration_ms as f64 / 1000.0).dimmed()
            )?;

            if let Some(error) = &step.error {
                writeln!(writer, "         {}: {}", "Error".red(), error)?;
            }
            for failure in &step.failed_assertions {
                writeln!(writer, "         {}: {}", "Assertion".red(), failure)?;
            }
        }

        if let Some(error) = &suite.error {
            writeln!(writer, "  {}: {}", "Suite error".red(), error)?;
        }

        writeln!(writer)?;
        Ok(())
    }

    fn write_summary_terminal<W: Write>(&self, summary: &ReportSummary, cancelled: bool, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", "=".repeat(60))?;
        writeln!(writer, "{}", "Summary".bold())?;
        writeln!(writer)?;

        writeln!(writer, "  Total:   {} suites", summary.total.to_string().bold())?;
        writeln!(writer, "  Passed:  {}", summary.passed.to_string().green())?;
        writeln!(
            writer,
            "  Failed:  {}",
            if summary.failed > 0 { summary.failed.to_string().red() } else { summary.failed.to_string().normal() }
        )?;
        writeln!(
            writer,
            "  Skipped: {}",
            if summary.skipped > 0 { summary.skipped.to_string().yellow() } else { summary.skipped.to_string().normal() }
        )?;

        writeln!(writer)?;
        writeln!(writer, "  Duration:  {:.2}s", summary.duration_ms as f64 / 1000.0)?;
        writeln!(writer, "  Pass rate: {:.1}%", summary.pass_rate * 100.0)?;
        if cancelled {
            writeln!(writer, "  {}", "Run was cancelled before completion".yellow())?;
        }
        writeln!(writer)?;

        if summary.failed == 0 {
            writeln!(writer, "{}", "All tests passed!".green().bold())?;
        } else {
            writeln!(writer, "{}", format!("{} suite(s) failed", summary.failed).red().bold())?;
        }

        writeln!(writer)?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, report: &Report, writer: &mut W) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
        writeln!(writer, "{json}")
    }

    pub fn write_html<W: Write>(&self, report: &Report, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "<!DOCTYPE html>")?;
        writeln!(writer, "<html lang=\"en\">")?;
        writeln!(writer, "<head>")?;
        writeln!(writer, "  <meta charset=\"UTF-8\">")?;
        writeln!(writer, "  <title>testflow Report</title>")?;
        writeln!(writer, "  <style>")?;
        writeln!(writer, "    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 2em; }}")?;
        writeln!(writer, "    .success {{ color: #22c55e; }}")?;
        writeln!(writer, "    .failure {{ color: #ef4444; }}")?;
        writeln!(writer, "    .skipped {{ color: #eab308; }}")?;
        writeln!(writer, "    table {{ border-collapse: collapse; width: 100%; }}")?;
        writeln!(writer, "    th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}")?;
        writeln!(writer, "    th {{ background-color: #f3f4f6; }}")?;
        writeln!(writer, "    .summary {{ background-color: #f9fafb; padding: 1em; margin: 1em 0; border-radius: 8px; }}")?;
        writeln!(writer, "  </style>")?;
        writeln!(writer, "</head>")?;
        writeln!(writer, "<body>")?;

        writeln!(writer, "<h1>testflow Report</h1>")?;
        writeln!(writer, "<p>Generated: {}</p>", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;

        writeln!(writer, "<div class=\"summary\">")?;
        writeln!(writer, "<h2>Summary</h2>")?;
        writeln!(
            writer,
            "<p>Total: {} | <span class=\"success\">Passed: {}</span> | <span class=\"failure\">Failed: {}</span> | <span class=\"skipped\">Skipped: {}</span></p>",
            report.summary.total, report.summary.passed, report.summary.failed, report.summary.skipped
        )?;
        writeln!(
            writer,
            "<p>Duration: {:.2}s | Pass rate: {:.1}%</p>",
            report.summary.duration_ms as f64 / 1000.0,
            report.summary.pass_rate * 100.0
        )?;
        writeln!(writer, "</div>")?;

        for suite in &report.suites {
            writeln!(writer, "<h2>Suite: {}</h2>", html_escape(&suite.name))?;
            writeln!(writer, "<table>")?;
            writeln!(writer, "<tr><th>Status</th><th>Step</th><th>Duration</th><th>Details</th></tr>")?;

            for step in &suite.steps {
                let duration = format!("{:.2}s", step.duration_ms as f64 / 1000.0);
                let details = step
                    .error
                    .clone()
                    .or_else(|| step.failed_assertions.first().cloned())
                    .unwrap_or_default();

                writeln!(
                    writer,
                    "<tr><td class=\"{}\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    step.status,
                    step.status.to_uppercase(),
                    html_escape(&step.name),
                    duration,
                    html_escape(&details)
                )?;
            }

            writeln!(writer, "</table>")?;
        }

        writeln!(writer, "</body>")?;
        writeln!(writer, "</html>")?;
        Ok(())
    }

    pub fn write_junit<W: Write>(&self, report: &Report, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            writer,
            "<testsuites tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
            report.summary.total,
            report.summary.failed,
            report.summary.skipped,
            report.summary.duration_ms as f64 / 1000.0
        )?;

        for suite in &report.suites {
            writeln!(
                writer,
                "  <testsuite name=\"{}\" tests=\"{}\" time=\"{:.3}\">",
                xml_escape(&suite.name),
                suite.steps.len(),
                suite.duration_ms as f64 / 1000.0
            )?;

            for step in &suite.steps {
                writeln!(
                    writer,
                    "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\">",
                    xml_escape(&step.name),
                    xml_escape(&suite.name),
                    step.duration_ms as f64 / 1000.0
                )?;

                match step.status.as_str() {
                    "failure" => {
                        let message = step.error.clone().or_else(|| step.failed_assertions.first().cloned()).unwrap_or_default();
                        writeln!(writer, "      <failure message=\"{}\"/>", xml_escape(&message))?;
                    }
                    "skipped" => {
                        writeln!(writer, "      <skipped message=\"{}\"/>", xml_escape(step.error.as_deref().unwrap_or("")))?;
                    }
                    _ => {}
                }

                if let Some(stdout) = &step.stdout {
                    writeln!(writer, "      <system-out><![CDATA[{stdout}]]></system-out>")?;
                }

                writeln!(writer, "    </testcase>")?;
            }

            writeln!(writer, "  </testsuite>")?;
        }

        writeln!(writer, "</testsuites>")?;
        Ok(())
    }

    pub fn write<W: Write>(&self, report: &Report, format: ReportFormat, writer: &mut W) -> std::io::Result<()> {
        match format {
            ReportFormat::Terminal => self.write_terminal(report, writer),
            ReportFormat::Json => self.write_json(report, writer),
            ReportFormat::Html => self.write_html(report, writer),
            ReportFormat::JUnit => self.write_junit(report, writer),
        }
    }

    pub fn save(&self, report: &Report, format: ReportFormat, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        self.write(report, format, &mut file)
    }
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Success => "success",
        Status::Failure => "failure",
        Status::Skipped => "skipped",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&#39;")
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use testflow_core::ident::NodeId;

    fn suite(name: &str, status: Status) -> SuiteResult {
        let mut step = StepResult::new("check status");
        if status == Status::Failure {
            step.assertions.push(testflow_exec::AssertionResult {
                field_path: "status_code".to_string(),
                rule: "equals".to_string(),
                passed: false,
                expected: serde_json::json!(200),
                actual: serde_json::json!(null),
                message: "expected 200, got null".to_string(),
            });
        }
        step.finalize_status();

        SuiteResult {
            node_id: NodeId::new(name),
            suite_name: name.to_string(),
            status,
            duration_ms: 100,
            steps: vec![step],
            captured_promoted: HashMap::new(),
            error_message: None,
        }
    }

    fn aggregated(suites: Vec<SuiteResult>) -> AggregatedResult {
        AggregatedResult::from_suites(suites, false)
    }

    #[test]
    fn generate_counts_suites_by_status() {
        let reporter = Reporter::new();
        let result = aggregated(vec![suite("ok", Status::Success), suite("bad", Status::Failure)]);
        let report = reporter.generate(&result);

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn json_output_round_trips_through_serde() {
        let reporter = Reporter::new();
        let result = aggregated(vec![suite("ok", Status::Success)]);
        let report = reporter.generate(&result);

        let mut output = Vec::new();
        reporter.write_json(&report, &mut output).unwrap();
        let json_str = String::from_utf8(output).unwrap();
        assert!(json_str.contains("\"passed\": 1"));
    }

    #[test]
    fn format_parsing_accepts_known_aliases() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("html".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("console".parse::<ReportFormat>().unwrap(), ReportFormat::Terminal);
        assert_eq!("xml".parse::<ReportFormat>().unwrap(), ReportFormat::JUnit);
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn junit_output_marks_failed_step_as_failure() {
        let reporter = Reporter::new();
        let result = aggregated(vec![suite("bad", Status::Failure)]);
        let report = reporter.generate(&result);

        let mut output = Vec::new();
        reporter.write_junit(&report, &mut output).unwrap();
        let xml = String::from_utf8(output).unwrap();
        assert!(xml.contains("<failure"));
    }
}
