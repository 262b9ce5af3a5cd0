//! Format-neutral document tree for the Test Summary Report.
//!
//! `render` lays out the same sections as the HTML preview; the DOCX and PDF
//! writers only walk the tree and never look at the record themselves.

use super::types::{ReportField, Severity};
use super::{
    build_dates, build_label, count_or_dash, percent, whole_percent, ReportContext,
    APPROVAL_HEADERS, APPROVAL_ROLES, AUDIT_LOG_ROWS, BUILD_TABLE_HEADERS, DEFECT_TABLE_HEADERS,
    FEATURE_ARTIFACTS, NOT_AVAILABLE, NOT_AVAILABLE_SHORT, NO_BUILDS, NO_DEFECTS, PURPOSE_TEXT,
    REPORT_TITLE, RTM_PLACEHOLDER, SEVERITY_TABLE_HEADERS, TEST_DELIVERABLES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    /// Centered document title
    Title,
    Section,
    Subsection,
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    /// Start this run on a new line within the paragraph
    pub break_before: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            break_before: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    fn on_new_line(mut self) -> Self {
        self.break_before = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub lines: Vec<String>,
    pub bold: bool,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::text(text)
        }
    }
}

/// A table; `header` is empty for key/value tables such as the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Number of columns, taken from the widest row.
    pub fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: HeadingLevel, text: String },
    Paragraph(Vec<Run>),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    fn heading(&mut self, level: HeadingLevel, text: impl Into<String>) {
        self.blocks.push(Block::Heading {
            level,
            text: text.into(),
        });
    }

    fn paragraph(&mut self, runs: Vec<Run>) {
        self.blocks.push(Block::Paragraph(runs));
    }

    fn table(&mut self, header: &[&str], rows: Vec<Vec<Cell>>) {
        self.blocks.push(Block::Table(Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        }));
    }
}

/// Lay the report out as a document tree.
pub fn render(ctx: &ReportContext<'_>) -> Document {
    let feature = ctx.field_or(ReportField::FeatureName, NOT_AVAILABLE);
    let mut doc = Document::default();

    doc.heading(HeadingLevel::Title, REPORT_TITLE);

    doc.heading(HeadingLevel::Section, "1. Purpose");
    doc.paragraph(vec![Run::plain(PURPOSE_TEXT)]);

    doc.heading(HeadingLevel::Section, "2. Scope");
    doc.paragraph(vec![
        Run::plain("The scope of the "),
        Run::bold(ctx.field_or(ReportField::TeamName, NOT_AVAILABLE)),
        Run::plain(" squad release is limited to the items specified in the "),
        Run::bold(feature),
        Run::plain(" feature under description of change section."),
    ]);

    let env = ctx.field_or(ReportField::Env, NOT_AVAILABLE);
    doc.heading(HeadingLevel::Section, "3. Environmental Details");
    doc.paragraph(vec![
        Run::bold("Pesagi Env: "),
        Run::plain(env),
        Run::bold("TST Env: ").on_new_line(),
        Run::plain(env),
    ]);

    doc.heading(HeadingLevel::Section, "4. System Risk Assessment Summary");
    doc.heading(HeadingLevel::Subsection, "AUDIT LOG");
    let audit_rows = AUDIT_LOG_ROWS
        .iter()
        .map(|(label, field)| {
            vec![Cell::bold(*label), Cell::text(ctx.field_or(*field, NOT_AVAILABLE))]
        })
        .collect();
    doc.table(&[], audit_rows);

    doc.heading(
        HeadingLevel::Section,
        format!("Test Summary Report for {feature} feature"),
    );
    doc.heading(HeadingLevel::Subsection, "GENERAL INFORMATION");
    doc.paragraph(vec![
        Run::bold("Test Level: "),
        Run::plain("System Testing"),
        Run::bold("Summary Date: ").on_new_line(),
        Run::plain(ctx.formatted_date()),
        Run::bold("Application: ").on_new_line(),
        Run::plain(format!(
            "Pesagi URL: {}",
            ctx.field_or(ReportField::Url, NOT_AVAILABLE)
        )),
        Run::bold("Priority: ").on_new_line(),
        Run::plain("High"),
        Run::bold("Frontend PR: ").on_new_line(),
        Run::plain(ctx.field_or(ReportField::FrontendPrLink, NOT_AVAILABLE)),
        Run::bold("Backend PR: ").on_new_line(),
        Run::plain(ctx.field_or(ReportField::BackendPrLink, NOT_AVAILABLE)),
        Run::bold("PBR Numbers: ").on_new_line(),
        Run::plain(ctx.field_or(ReportField::PrNumber, NOT_AVAILABLE)),
    ]);

    doc.heading(HeadingLevel::Subsection, "FEATURE ARTIFACTS");
    doc.paragraph(link_lines(ctx, &FEATURE_ARTIFACTS));

    doc.heading(HeadingLevel::Subsection, "TEST DELIVERABLES & REUSABLE ASSETS");
    let mut deliverables = link_lines(ctx, &TEST_DELIVERABLES);
    deliverables.push(Run::bold("RTM: ").on_new_line());
    deliverables.push(Run::plain(ctx.field_or(ReportField::RtmDocLink, RTM_PLACEHOLDER)));
    doc.paragraph(deliverables);

    render_execution_summary(&mut doc, ctx, feature);
    render_defect_report(&mut doc, ctx);

    doc.heading(HeadingLevel::Section, "Approvals");
    let approval_rows = APPROVAL_ROLES
        .iter()
        .map(|role| {
            let mut row = vec![Cell::text(*role)];
            row.extend((1..APPROVAL_HEADERS.len()).map(|_| Cell::text("")));
            row
        })
        .collect();
    doc.table(&APPROVAL_HEADERS, approval_rows);

    doc
}

fn link_lines(ctx: &ReportContext<'_>, rows: &[(&str, ReportField)]) -> Vec<Run> {
    let mut runs = Vec::new();
    for (i, (label, field)) in rows.iter().enumerate() {
        let label = Run::bold(format!("{label}: "));
        runs.push(if i == 0 { label } else { label.on_new_line() });
        runs.push(Run::plain(ctx.field_or(*field, NOT_AVAILABLE_SHORT)));
    }
    runs
}

fn render_execution_summary(doc: &mut Document, ctx: &ReportContext<'_>, feature: &str) {
    doc.heading(HeadingLevel::Section, "Test Execution Summary");
    doc.paragraph(vec![
        Run::plain("The table below summarizes the overall test results for the builds that were tested for "),
        Run::bold(feature),
        Run::plain(" feature during "),
        Run::bold(ctx.field_or(ReportField::QuarterRelease, NOT_AVAILABLE)),
        Run::plain("."),
    ]);

    let builds = &ctx.record.test_builds;
    let mut rows: Vec<Vec<Cell>> = builds
        .iter()
        .map(|build| {
            vec![
                Cell {
                    lines: vec![build_label(build), build_dates(build)],
                    bold: false,
                },
                Cell::text(build.total_designed.to_string()),
                Cell::text(build.total_executed.to_string()),
                Cell::text(build.total_passed.to_string()),
                Cell::text(percent(build.pass_percentage)),
                Cell::text(build.total_failed.to_string()),
                Cell::text(percent(build.fail_percentage)),
                Cell::text(build.defects_found.to_string()),
            ]
        })
        .collect();

    if builds.is_empty() {
        rows.push(vec![Cell::text(NO_BUILDS)]);
    } else {
        let totals = &ctx.totals;
        rows.push(vec![
            Cell::bold("Total"),
            Cell::bold(totals.total_designed.to_string()),
            Cell::bold(totals.total_executed.to_string()),
            Cell::bold(totals.total_passed.to_string()),
            Cell::bold(format!("{}%", totals.pass_rate)),
            Cell::bold(totals.total_failed.to_string()),
            Cell::bold(format!(
                "{}%",
                whole_percent(totals.total_failed, totals.total_executed)
            )),
            Cell::bold(totals.total_defects.to_string()),
        ]);
    }
    doc.table(&BUILD_TABLE_HEADERS, rows);
}

fn render_defect_report(doc: &mut Document, ctx: &ReportContext<'_>) {
    doc.heading(HeadingLevel::Section, "Defect Report");
    let severity_rows = Severity::ALL
        .iter()
        .map(|severity| {
            let count = ctx.summary.get(*severity);
            vec![
                Cell::text(severity.to_string()),
                Cell::text(count_or_dash(count.total)),
                Cell::text(count_or_dash(count.closed)),
                Cell::text(count_or_dash(count.open)),
            ]
        })
        .collect();
    doc.table(&SEVERITY_TABLE_HEADERS, severity_rows);

    doc.heading(HeadingLevel::Subsection, "Defect Summary");
    let mut defect_rows: Vec<Vec<Cell>> = ctx
        .record
        .defects
        .iter()
        .map(|defect| {
            vec![
                Cell::text(defect.defect_id.clone()),
                Cell::text(defect.status.to_string()),
                Cell::text(defect.severity.to_string()),
            ]
        })
        .collect();
    if defect_rows.is_empty() {
        defect_rows.push(vec![Cell::text(NO_DEFECTS)]);
    }
    doc.table(&DEFECT_TABLE_HEADERS, defect_rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::{full_record, summary_date};
    use crate::report::{assemble, html, ReportRecord};

    /// Every piece of text in document order, one entry per run, heading,
    /// header or cell line.
    fn all_texts(doc: &Document) -> Vec<&str> {
        let mut texts = Vec::new();
        for block in &doc.blocks {
            match block {
                Block::Heading { text, .. } => texts.push(text.as_str()),
                Block::Paragraph(runs) => texts.extend(runs.iter().map(|r| r.text.as_str())),
                Block::Table(table) => {
                    texts.extend(table.header.iter().map(String::as_str));
                    for row in &table.rows {
                        for cell in row {
                            texts.extend(cell.lines.iter().map(String::as_str));
                        }
                    }
                }
            }
        }
        texts
    }

    fn headings(doc: &Document) -> Vec<&str> {
        doc.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn tables(doc: &Document) -> Vec<&Table> {
        doc.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_section_structure() {
        let record = full_record();
        let doc = render(&assemble(&record, summary_date()));
        assert_eq!(
            headings(&doc),
            vec![
                "TEST SUMMARY REPORT",
                "1. Purpose",
                "2. Scope",
                "3. Environmental Details",
                "4. System Risk Assessment Summary",
                "AUDIT LOG",
                "Test Summary Report for value-FeatureName feature",
                "GENERAL INFORMATION",
                "FEATURE ARTIFACTS",
                "TEST DELIVERABLES & REUSABLE ASSETS",
                "Test Execution Summary",
                "Defect Report",
                "Defect Summary",
                "Approvals",
            ]
        );
        // audit log, builds, severities, defects, approvals
        assert_eq!(tables(&doc).len(), 5);
    }

    #[test]
    fn test_execution_table_rows() {
        let record = full_record();
        let doc = render(&assemble(&record, summary_date()));
        let builds = tables(&doc)[1];
        assert_eq!(builds.columns(), 8);
        assert_eq!(builds.rows.len(), 2);
        assert_eq!(
            builds.rows[0][0].lines,
            vec!["Build 1 / Cycle 1".to_string(), "2025-11-01 - 2025-11-03".to_string()]
        );
        assert_eq!(builds.rows[0][4], Cell::text("70%"));
        assert_eq!(builds.rows[0][6], Cell::text("30%"));
        assert_eq!(builds.rows[1][0], Cell::bold("Total"));
    }

    #[test]
    fn test_placeholders_for_empty_record() {
        let record = ReportRecord::default();
        let doc = render(&assemble(&record, summary_date()));
        let texts = all_texts(&doc);
        assert!(texts.contains(&"N/A"));
        assert!(texts.contains(&"NA"));
        assert!(texts.contains(&RTM_PLACEHOLDER));
        assert!(texts.contains(&NO_BUILDS));
        assert!(texts.contains(&NO_DEFECTS));

        let severities = tables(&doc)[2];
        assert_eq!(severities.rows[0][1], Cell::text("-"));
    }

    #[test]
    fn test_same_values_as_html() {
        let record = full_record();
        let ctx = assemble(&record, summary_date());
        let doc = render(&ctx);
        let html = html::render(&ctx);
        let texts = all_texts(&doc).join("\n");
        for field in ReportField::ALL {
            let value = record.get(field).unwrap();
            assert!(texts.contains(value), "{field} missing from document");
            assert!(html.contains(value), "{field} missing from html");
        }
        for defect in &record.defects {
            assert!(texts.contains(&defect.defect_id));
            assert!(html.contains(&defect.defect_id));
        }
    }

    #[test]
    fn test_same_placeholders_as_html() {
        let mut record = ReportRecord::default();
        record.set(ReportField::FeatureName, "Flow Lock");
        let ctx = assemble(&record, summary_date());
        let doc = render(&ctx);
        let texts = all_texts(&doc).join("\n");
        let html = html::render(&ctx);
        let placeholders = [
            NOT_AVAILABLE,
            NOT_AVAILABLE_SHORT,
            RTM_PLACEHOLDER,
            NO_BUILDS,
            NO_DEFECTS,
        ];
        for placeholder in placeholders {
            assert!(texts.contains(placeholder));
            assert!(html.contains(placeholder));
        }
        assert!(texts.contains("Flow Lock"));
        assert!(html.contains("Flow Lock"));
    }
}
