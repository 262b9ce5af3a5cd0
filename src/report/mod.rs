pub mod document;
pub mod docx;
pub mod html;
pub mod pdf;
pub mod types;

pub use types::{Defect, DefectSummary, ReportRecord, ReportTotals, TestBuild};

use chrono::NaiveDate;
use colored::Colorize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use types::{DefectStatus, ReportField};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to build DOCX document: {0}")]
    Docx(String),

    #[error("Failed to build PDF document: {0}")]
    Pdf(String),
}

/// Placeholder for absent general fields.
pub const NOT_AVAILABLE: &str = "N/A";
/// Placeholder for absent artifact links.
pub const NOT_AVAILABLE_SHORT: &str = "NA";
pub const RTM_PLACEHOLDER: &str = "NA (optional)";
pub const NO_BUILDS: &str = "No test execution data available";
pub const NO_DEFECTS: &str = "No defects reported";

pub const REPORT_TITLE: &str = "TEST SUMMARY REPORT";
pub const PURPOSE_TEXT: &str = "The purpose of this Test Summary Report (TSR) is to demonstrate the establishment of the qualified state of the Apps system, summarize overall the activities as outlined in the associated Test Plan (TP) including result and conclusion of the testing & validation activities performed for implementing/upgrading the Kissflow application.";

pub const AUDIT_LOG_ROWS: [(&str, ReportField); 5] = [
    ("Prepared By", ReportField::PreparedBy),
    ("Tested By", ReportField::TestedBy),
    ("Developed By", ReportField::DevelopedBy),
    ("Designed By", ReportField::DesignedBy),
    ("Reviewed By", ReportField::ReviewedBy),
];

pub const FEATURE_ARTIFACTS: [(&str, ReportField); 3] = [
    ("Spec Document", ReportField::SpecDocLink),
    ("Design Document", ReportField::DesignLink),
    ("TDD Document", ReportField::TddLink),
];

pub const TEST_DELIVERABLES: [(&str, ReportField); 3] = [
    ("Test Case Document", ReportField::TestCaseDocLink),
    ("Test Case Execution Document", ReportField::TestCaseExecutionLink),
    ("Evidence Document", ReportField::EvidenceDocLink),
];

pub const BUILD_TABLE_HEADERS: [&str; 8] = [
    "Builds/Build Date",
    "Total Designed Test Cases",
    "Total Test Cases Executed",
    "No. Of Test Cases Passed",
    "% Of Passed Test Cases",
    "No. Of Test Cases Failed",
    "% Of Failed Test Cases",
    "Defects Found",
];

pub const SEVERITY_TABLE_HEADERS: [&str; 4] = [
    "Severity Level Of Defect",
    "Total No. Of Defects Found In The Test Level",
    "Total No. Of Defects Closed At The End Of The Test Level",
    "Total No. Of Defects Open At The End Of The Test Level",
];

pub const DEFECT_TABLE_HEADERS: [&str; 3] = ["Defect ID", "Status", "Severity Level of Defect"];

pub const APPROVAL_HEADERS: [&str; 4] = ["TITLE", "NAME", "STATUS", "DATE"];
pub const APPROVAL_ROLES: [&str; 4] = [
    "Test Lead",
    "Test Manager",
    "Technical Manager",
    "Project Manager",
];

/// Output artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ExportFormat {
    Html,
    Pdf,
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Html, ExportFormat::Pdf, ExportFormat::Docx];
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Html => write!(f, "HTML"),
            ExportFormat::Pdf => write!(f, "PDF"),
            ExportFormat::Docx => write!(f, "DOCX"),
        }
    }
}

/// Everything a renderer needs, aggregated once per generate step.
/// Renderers only read from it, so both formats report the same figures.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub record: &'a ReportRecord,
    pub summary: DefectSummary,
    pub totals: ReportTotals,
    pub summary_date: NaiveDate,
}

/// Roll defects up by severity in one pass.
pub fn compute_defect_summary(defects: &[Defect]) -> DefectSummary {
    let mut summary = DefectSummary::default();
    for defect in defects {
        let bucket = summary.get_mut(defect.severity);
        bucket.total += 1;
        if defect.status.is_closed() {
            bucket.closed += 1;
        } else {
            bucket.open += 1;
        }
    }
    summary
}

/// Sum build counts and derive the overall pass rate.
///
/// Sums are widened to `u64`, so any number of `u32` builds fits.
/// Defect figures come from the defect list (open = Open or In Progress),
/// independent of each build's `defects_found`.
pub fn compute_totals(builds: &[TestBuild], defects: &[Defect]) -> ReportTotals {
    let mut totals = builds.iter().fold(ReportTotals::default(), |mut acc, build| {
        acc.total_designed += u64::from(build.total_designed);
        acc.total_executed += u64::from(build.total_executed);
        acc.total_passed += u64::from(build.total_passed);
        acc.total_failed += u64::from(build.total_failed);
        acc
    });
    totals.pass_rate = whole_percent(totals.total_passed, totals.total_executed);
    totals.total_defects = defects.len();
    totals.open_defects = defects
        .iter()
        .filter(|d| matches!(d.status, DefectStatus::Open | DefectStatus::InProgress))
        .count();
    totals
}

/// `round(100 * part / whole)`, or 0 when `whole` is 0.
pub fn whole_percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// Build the shared rendering context for a record.
pub fn assemble(record: &ReportRecord, summary_date: NaiveDate) -> ReportContext<'_> {
    ReportContext {
        record,
        summary: compute_defect_summary(&record.defects),
        totals: compute_totals(&record.test_builds, &record.defects),
        summary_date,
    }
}

impl ReportContext<'_> {
    /// Field value, treating empty strings as absent.
    pub fn field(&self, field: ReportField) -> Option<&str> {
        self.record.get(field).filter(|v| !v.is_empty())
    }

    pub fn field_or(&self, field: ReportField, placeholder: &'static str) -> &str {
        self.field(field).unwrap_or(placeholder)
    }

    /// "Month D, YYYY", as printed in the General Information block.
    pub fn formatted_date(&self) -> String {
        self.summary_date.format("%B %-d, %Y").to_string()
    }

    pub fn file_name(&self, format: ExportFormat) -> String {
        let date = self.summary_date.format("%Y-%m-%d");
        match format {
            ExportFormat::Html => format!("QSR_Report_{date}.html"),
            ExportFormat::Pdf => format!("QSR_Report_{date}.pdf"),
            ExportFormat::Docx => {
                let feature = self.field_or(ReportField::FeatureName, NOT_AVAILABLE_SHORT);
                format!("QSR_{}_{date}.docx", sanitize_file_component(feature))
            }
        }
    }

    /// Render one artifact to bytes.
    pub fn render(&self, format: ExportFormat) -> Result<Vec<u8>, ReportError> {
        match format {
            ExportFormat::Html => Ok(html::render(self).into_bytes()),
            ExportFormat::Pdf => pdf::to_bytes(&document::render(self)),
            ExportFormat::Docx => docx::to_bytes(&document::render(self)),
        }
    }
}

/// Replace every character that is not an ASCII letter or digit with `_`.
pub fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// "Build N / Cycle N" label for a build row.
pub fn build_label(build: &TestBuild) -> String {
    format!("Build {0} / Cycle {0}", build.build_number)
}

/// "start - end" with blanks for missing dates.
pub fn build_dates(build: &TestBuild) -> String {
    format!(
        "{} - {}",
        build.start_date.as_deref().unwrap_or(""),
        build.end_date.as_deref().unwrap_or("")
    )
}

pub fn percent(value: f64) -> String {
    format!("{value}%")
}

/// Severity-table cells show "-" instead of zero.
pub fn count_or_dash(count: usize) -> String {
    if count == 0 {
        "-".to_string()
    } else {
        count.to_string()
    }
}

/// Write one rendered artifact into `dir`, returning the written path.
#[instrument(skip(context, bytes), fields(format = %format))]
pub fn export(
    context: &ReportContext<'_>,
    format: ExportFormat,
    bytes: &[u8],
    dir: &Path,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(context.file_name(format));
    debug!(path = %path.display(), bytes = bytes.len(), "writing report artifact");
    std::fs::write(&path, bytes)?;
    info!(path = %path.display(), "report artifact written");
    Ok(path)
}

/// Print the export-step metrics panel to the terminal.
pub fn print_summary(context: &ReportContext<'_>) {
    let totals = &context.totals;
    println!();
    println!(
        "{}",
        format!("QSR: {}", context.field_or(ReportField::FeatureName, NOT_AVAILABLE)).bold()
    );
    println!(
        "Team: {} | Release: {} | Builds: {}",
        context.field_or(ReportField::TeamName, NOT_AVAILABLE),
        context.field_or(ReportField::QuarterRelease, NOT_AVAILABLE),
        context.record.test_builds.len()
    );
    println!();
    println!("═══ Test Execution ═══");
    println!("  Designed: {}", totals.total_designed);
    println!("  Executed: {}", totals.total_executed);
    println!("  Passed:   {}", totals.total_passed.to_string().green());
    println!("  Failed:   {}", totals.total_failed.to_string().red());
    println!("  Pass rate: {}", colorize_pass_rate(totals.pass_rate));
    println!();
    println!("═══ Defects ═══");
    println!("  Total: {}", totals.total_defects);
    println!("  Open:  {}", totals.open_defects.to_string().yellow());
    println!();
}

/// Print the validation checklist for fields that still need a value.
pub fn print_missing_fields(missing: &[String]) {
    println!();
    println!("{}", format!("═══ Missing Fields ({}) ═══", missing.len()).bold());
    for name in missing {
        println!("  {} {}", "✗".red(), name);
    }
    println!();
}

fn colorize_pass_rate(rate: u32) -> colored::ColoredString {
    let text = format!("{rate}%");
    match rate {
        90.. => text.green().bold(),
        70..=89 => text.yellow().bold(),
        _ => text.red().bold(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use types::Severity;

    pub fn defect(id: &str, status: DefectStatus, severity: Severity) -> Defect {
        Defect {
            defect_id: id.to_string(),
            status,
            severity,
        }
    }

    pub fn summary_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 12).unwrap()
    }

    /// A record with every field filled and plain-text values.
    pub fn full_record() -> ReportRecord {
        let mut record = ReportRecord::default();
        for field in ReportField::ALL {
            record.set(field, format!("value-{}", field.as_str()));
        }
        let build = record.add_test_build();
        build.total_designed = 12;
        build.start_date = Some("2025-11-01".to_string());
        build.end_date = Some("2025-11-03".to_string());
        build.set_executed(10);
        build.set_passed(7);
        build.defects_found = 2;
        record.defects = vec![
            defect("FL-001", DefectStatus::Closed, Severity::High),
            defect("FL-002", DefectStatus::Open, Severity::Critical),
        ];
        record
    }

    #[test]
    fn test_defect_summary_buckets() {
        let defects = vec![
            defect("A", DefectStatus::Closed, Severity::High),
            defect("B", DefectStatus::Resolved, Severity::High),
            defect("C", DefectStatus::InProgress, Severity::High),
            defect("D", DefectStatus::Open, Severity::Critical),
            defect("D", DefectStatus::Open, Severity::Low),
        ];
        let summary = compute_defect_summary(&defects);
        assert_eq!(summary.high.total, 3);
        assert_eq!(summary.high.closed, 2);
        assert_eq!(summary.high.open, 1);
        assert_eq!(summary.critical.open, 1);
        assert_eq!(summary.medium.total, 0);

        let counted: usize = Severity::ALL
            .iter()
            .map(|s| summary.get(*s).closed + summary.get(*s).open)
            .sum();
        assert_eq!(counted, defects.len());
    }

    #[test]
    fn test_defect_summary_empty() {
        assert_eq!(compute_defect_summary(&[]), DefectSummary::default());
    }

    #[test]
    fn test_totals_sum_builds() {
        let mut record = ReportRecord::default();
        for (designed, executed, passed) in [(45, 42, 35), (45, 45, 40), (45, 45, 43)] {
            let build = record.add_test_build();
            build.total_designed = designed;
            build.set_executed(executed);
            build.set_passed(passed);
        }
        let totals = compute_totals(&record.test_builds, &[]);
        assert_eq!(totals.total_designed, 135);
        assert_eq!(totals.total_executed, 132);
        assert_eq!(totals.total_passed, 118);
        assert_eq!(totals.total_failed, 14);
        assert_eq!(totals.pass_rate, 89);
        assert_eq!(totals.total_defects, 0);
    }

    #[test]
    fn test_totals_do_not_overflow_u32() {
        let mut record = ReportRecord::default();
        for _ in 0..2 {
            let build = record.add_test_build();
            build.set_executed(3_000_000_000);
            build.set_passed(3_000_000_000);
        }
        let totals = compute_totals(&record.test_builds, &[]);
        assert_eq!(totals.total_executed, 6_000_000_000);
        assert_eq!(totals.total_passed, 6_000_000_000);
        assert_eq!(totals.total_failed, 0);
        assert_eq!(totals.pass_rate, 100);
    }

    #[test]
    fn test_totals_zero_executed() {
        let mut record = ReportRecord::default();
        record.add_test_build();
        let totals = compute_totals(&record.test_builds, &[]);
        assert_eq!(totals.pass_rate, 0);
    }

    #[test]
    fn test_totals_defects_independent_of_builds() {
        let mut build = TestBuild::new(1);
        build.defects_found = 9;
        let defects = vec![
            defect("A", DefectStatus::Open, Severity::Low),
            defect("B", DefectStatus::InProgress, Severity::Low),
            defect("C", DefectStatus::Resolved, Severity::Low),
        ];
        let totals = compute_totals(&[build], &defects);
        assert_eq!(totals.total_defects, 3);
        assert_eq!(totals.open_defects, 2);
    }

    #[test]
    fn test_file_names() {
        let mut record = ReportRecord::default();
        record.set(ReportField::FeatureName, "[ Enhancement ] Flow Lock");
        let context = assemble(&record, summary_date());
        assert_eq!(context.file_name(ExportFormat::Pdf), "QSR_Report_2025-11-12.pdf");
        assert_eq!(context.file_name(ExportFormat::Html), "QSR_Report_2025-11-12.html");
        assert_eq!(
            context.file_name(ExportFormat::Docx),
            "QSR___Enhancement___Flow_Lock_2025-11-12.docx"
        );

        let empty = ReportRecord::default();
        let context = assemble(&empty, summary_date());
        assert_eq!(context.file_name(ExportFormat::Docx), "QSR_NA_2025-11-12.docx");
    }

    #[test]
    fn test_formatted_date() {
        let record = ReportRecord::default();
        let context = assemble(&record, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(context.formatted_date(), "March 7, 2025");
    }

    #[test]
    fn test_whole_percent() {
        assert_eq!(whole_percent(7, 10), 70);
        assert_eq!(whole_percent(1, 3), 33);
        assert_eq!(whole_percent(2, 3), 67);
        assert_eq!(whole_percent(5, 0), 0);
    }

    #[test]
    fn test_count_or_dash_and_percent() {
        assert_eq!(count_or_dash(0), "-");
        assert_eq!(count_or_dash(3), "3");
        assert_eq!(percent(70.0), "70%");
        assert_eq!(percent(83.33), "83.33%");
    }

    #[test]
    fn test_export_html_to_file() {
        let record = full_record();
        let context = assemble(&record, summary_date());
        let dir = std::env::temp_dir().join("qsr_report_export_test");
        let bytes = context.render(ExportFormat::Html).unwrap();
        let path = export(&context, ExportFormat::Html, &bytes, &dir).unwrap();
        assert!(path.ends_with("QSR_Report_2025-11-12.html"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(REPORT_TITLE));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_print_summary_does_not_panic() {
        let record = full_record();
        print_summary(&assemble(&record, summary_date()));
        print_missing_fields(&["env".to_string(), "URL".to_string()]);
    }
}
