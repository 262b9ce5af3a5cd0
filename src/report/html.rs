//! HTML rendering of the Test Summary Report.
//!
//! The output is a standalone preview page with its own print stylesheet.

use std::fmt::Write;

use super::types::{ReportField, Severity};
use super::{
    build_dates, build_label, count_or_dash, percent, whole_percent, ReportContext,
    APPROVAL_HEADERS, APPROVAL_ROLES, AUDIT_LOG_ROWS, BUILD_TABLE_HEADERS, DEFECT_TABLE_HEADERS,
    FEATURE_ARTIFACTS, NOT_AVAILABLE, NOT_AVAILABLE_SHORT, NO_BUILDS, NO_DEFECTS, PURPOSE_TEXT,
    REPORT_TITLE, RTM_PLACEHOLDER, SEVERITY_TABLE_HEADERS, TEST_DELIVERABLES,
};

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 100%; margin: 0; padding: 15px; overflow-wrap: break-word; }
    h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; font-size: 18px; }
    h2 { color: #34495e; margin-top: 30px; font-size: 16px; }
    h3 { color: #7f8c8d; font-size: 14px; }
    table { width: 100%; border-collapse: collapse; margin: 20px 0; table-layout: fixed; }
    th, td { border: 1px solid #ddd; padding: 6px; text-align: left; overflow-wrap: break-word; font-size: 12px; }
    th { background-color: #f2f2f2; font-weight: bold; }
    .section { margin-bottom: 25px; }
    .metadata { background-color: #f9f9f9; padding: 12px; border-radius: 5px; }
    a { color: #3498db; text-decoration: none; overflow-wrap: break-word; }
    p { overflow-wrap: break-word; margin: 10px 0; }
"#;

/// Render the full report as a standalone HTML document.
pub fn render(ctx: &ReportContext<'_>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_document(&mut out, ctx);
    out
}

fn write_document(out: &mut String, ctx: &ReportContext<'_>) -> std::fmt::Result {
    let feature = escape(ctx.field_or(ReportField::FeatureName, NOT_AVAILABLE));
    let team = escape(ctx.field_or(ReportField::TeamName, NOT_AVAILABLE));
    let env = escape(ctx.field_or(ReportField::Env, NOT_AVAILABLE));

    writeln!(out, "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{REPORT_TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>")?;
    writeln!(out, "<h1>{REPORT_TITLE}</h1>")?;

    writeln!(
        out,
        "<div class=\"section\">\n<h2>1. Purpose</h2>\n<p>{}</p>\n</div>",
        escape(PURPOSE_TEXT)
    )?;

    writeln!(
        out,
        "<div class=\"section\">\n<h2>2. Scope</h2>\n<p>The scope of the <strong>{team}</strong> squad release is limited to the items specified in the <strong>{feature}</strong> feature under description of change section.</p>\n</div>"
    )?;

    writeln!(
        out,
        "<div class=\"section\">\n<h2>3. Environmental Details</h2>\n<p><strong>Pesagi Env:</strong> {env}<br/>\n<strong>TST Env:</strong> {env}</p>\n</div>"
    )?;

    writeln!(
        out,
        "<div class=\"section\">\n<h2>4. System Risk Assessment Summary</h2>\n<h3>AUDIT LOG</h3>\n<table>"
    )?;
    for (label, field) in AUDIT_LOG_ROWS {
        writeln!(
            out,
            "<tr><td><strong>{label}</strong></td><td>{}</td></tr>",
            escape(ctx.field_or(field, NOT_AVAILABLE))
        )?;
    }
    writeln!(out, "</table>\n</div>")?;

    write_general_information(out, ctx, &feature)?;
    write_execution_summary(out, ctx, &feature)?;
    write_defect_report(out, ctx)?;

    writeln!(out, "<div class=\"section\">\n<h2>Approvals</h2>\n<table>")?;
    write_header_row(out, &APPROVAL_HEADERS)?;
    writeln!(out, "<tbody>")?;
    for role in APPROVAL_ROLES {
        writeln!(out, "<tr><td>{role}</td><td></td><td></td><td></td></tr>")?;
    }
    writeln!(out, "</tbody>\n</table>\n</div>")?;

    writeln!(out, "</body>\n</html>")
}

fn write_general_information(
    out: &mut String,
    ctx: &ReportContext<'_>,
    feature: &str,
) -> std::fmt::Result {
    writeln!(out, "<div class=\"section\">\n<h2>Test Summary Report for {feature} feature</h2>")?;
    writeln!(out, "<h3>GENERAL INFORMATION</h3>\n<div class=\"metadata\">")?;
    writeln!(
        out,
        "<p><strong>Test Level:</strong> System Testing &nbsp;&nbsp;&nbsp;&nbsp; <strong>Summary Date:</strong> {}</p>",
        ctx.formatted_date()
    )?;
    writeln!(
        out,
        "<p><strong>Application:</strong> Pesagi URL: {} &nbsp;&nbsp;&nbsp;&nbsp; <strong>Priority:</strong> High</p>",
        escape(ctx.field_or(ReportField::Url, NOT_AVAILABLE))
    )?;
    writeln!(
        out,
        "<p><strong>Frontend PR:</strong> {}</p>",
        link(ctx.field(ReportField::FrontendPrLink), NOT_AVAILABLE)
    )?;
    writeln!(
        out,
        "<p><strong>Backend PR:</strong> {}</p>",
        link(ctx.field(ReportField::BackendPrLink), NOT_AVAILABLE)
    )?;
    writeln!(
        out,
        "<p><strong>PBR Numbers:</strong> {}</p>\n</div>",
        escape(ctx.field_or(ReportField::PrNumber, NOT_AVAILABLE))
    )?;

    writeln!(out, "<h3>FEATURE ARTIFACTS</h3>\n<p>")?;
    write_link_lines(out, ctx, &FEATURE_ARTIFACTS)?;
    writeln!(out, "</p>\n<h3>TEST DELIVERABLES &amp; REUSABLE ASSETS</h3>\n<p>")?;
    write_link_lines(out, ctx, &TEST_DELIVERABLES)?;
    writeln!(
        out,
        "<strong>RTM:</strong> {}\n</p>\n</div>",
        link(ctx.field(ReportField::RtmDocLink), RTM_PLACEHOLDER)
    )
}

fn write_link_lines(
    out: &mut String,
    ctx: &ReportContext<'_>,
    rows: &[(&str, ReportField)],
) -> std::fmt::Result {
    for (label, field) in rows {
        writeln!(
            out,
            "<strong>{label}:</strong> {}<br/>",
            link(ctx.field(*field), NOT_AVAILABLE_SHORT)
        )?;
    }
    Ok(())
}

fn write_execution_summary(
    out: &mut String,
    ctx: &ReportContext<'_>,
    feature: &str,
) -> std::fmt::Result {
    writeln!(
        out,
        "<div class=\"section\">\n<h2>Test Execution Summary</h2>\n<p>The table below summarizes the overall test results for the builds that were tested for <strong>{feature}</strong> feature during <strong>{}</strong>.</p>",
        escape(ctx.field_or(ReportField::QuarterRelease, NOT_AVAILABLE))
    )?;
    writeln!(out, "<table>")?;
    write_header_row(out, &BUILD_TABLE_HEADERS)?;
    writeln!(out, "<tbody>")?;

    let builds = &ctx.record.test_builds;
    if builds.is_empty() {
        writeln!(out, "<tr><td colspan=\"8\">{NO_BUILDS}</td></tr>")?;
    }
    for build in builds {
        writeln!(
            out,
            "<tr><td>{}<br/>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            build_label(build),
            escape(&build_dates(build)),
            build.total_designed,
            build.total_executed,
            build.total_passed,
            percent(build.pass_percentage),
            build.total_failed,
            percent(build.fail_percentage),
            build.defects_found,
        )?;
    }
    if !builds.is_empty() {
        let totals = &ctx.totals;
        writeln!(
            out,
            "<tr><th>Total</th><th>{}</th><th>{}</th><th>{}</th><th>{}%</th><th>{}</th><th>{}%</th><th>{}</th></tr>",
            totals.total_designed,
            totals.total_executed,
            totals.total_passed,
            totals.pass_rate,
            totals.total_failed,
            whole_percent(totals.total_failed, totals.total_executed),
            totals.total_defects,
        )?;
    }
    writeln!(out, "</tbody>\n</table>\n</div>")
}

fn write_defect_report(out: &mut String, ctx: &ReportContext<'_>) -> std::fmt::Result {
    writeln!(out, "<div class=\"section\">\n<h2>Defect Report</h2>\n<table>")?;
    write_header_row(out, &SEVERITY_TABLE_HEADERS)?;
    writeln!(out, "<tbody>")?;
    for severity in Severity::ALL {
        let count = ctx.summary.get(severity);
        writeln!(
            out,
            "<tr><td>{severity}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            count_or_dash(count.total),
            count_or_dash(count.closed),
            count_or_dash(count.open),
        )?;
    }
    writeln!(out, "</tbody>\n</table>")?;

    writeln!(out, "<h3>Defect Summary</h3>\n<table>")?;
    write_header_row(out, &DEFECT_TABLE_HEADERS)?;
    writeln!(out, "<tbody>")?;
    if ctx.record.defects.is_empty() {
        writeln!(out, "<tr><td colspan=\"3\">{NO_DEFECTS}</td></tr>")?;
    }
    for defect in &ctx.record.defects {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&defect.defect_id),
            defect.status,
            defect.severity,
        )?;
    }
    writeln!(out, "</tbody>\n</table>\n</div>")
}

fn write_header_row(out: &mut String, headers: &[&str]) -> std::fmt::Result {
    write!(out, "<thead><tr>")?;
    for header in headers {
        write!(out, "<th>{}</th>", escape(header))?;
    }
    writeln!(out, "</tr></thead>")
}

/// Anchor for a present link, bare placeholder otherwise.
fn link(url: Option<&str>, placeholder: &str) -> String {
    match url {
        Some(url) => {
            let url = escape(url);
            format!("<a href=\"{url}\">{url}</a>")
        }
        None => escape(placeholder),
    }
}

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::{full_record, summary_date};
    use crate::report::{assemble, ReportRecord};

    #[test]
    fn test_render_sections_in_order() {
        let record = full_record();
        let html = render(&assemble(&record, summary_date()));
        let sections = [
            "1. Purpose",
            "2. Scope",
            "3. Environmental Details",
            "AUDIT LOG",
            "GENERAL INFORMATION",
            "FEATURE ARTIFACTS",
            "Test Execution Summary",
            "Defect Report",
            "Defect Summary",
            "Approvals",
        ];
        let mut last = 0;
        for section in sections {
            let pos = html[last..]
                .find(section)
                .unwrap_or_else(|| panic!("missing section {section}"));
            last += pos;
        }
    }

    #[test]
    fn test_render_populated_fields_verbatim() {
        let record = full_record();
        let html = render(&assemble(&record, summary_date()));
        for field in ReportField::ALL {
            let value = record.get(field).unwrap();
            assert!(html.contains(value), "{field} not rendered");
        }
        assert!(html.contains("November 12, 2025"));
        assert!(html.contains("Build 1 / Cycle 1<br/>2025-11-01 - 2025-11-03"));
        assert!(html.contains("<td>70%</td>"));
        assert!(html.contains("<td>30%</td>"));
        assert!(html.contains("<td>FL-002</td><td>Open</td><td>Critical</td>"));
    }

    #[test]
    fn test_render_placeholders_for_empty_record() {
        let record = ReportRecord::default();
        let html = render(&assemble(&record, summary_date()));
        assert!(html.contains("<strong>Pesagi Env:</strong> N/A"));
        assert!(html.contains("<tr><td><strong>Reviewed By</strong></td><td>N/A</td></tr>"));
        assert!(html.contains("<strong>Spec Document:</strong> NA<br/>"));
        assert!(html.contains("<strong>RTM:</strong> NA (optional)"));
        assert!(html.contains(NO_BUILDS));
        assert!(html.contains(NO_DEFECTS));
        assert!(html.contains("<tr><td>Critical</td><td>-</td><td>-</td><td>-</td></tr>"));
        assert!(!html.contains("<th>Total</th>"));
    }

    #[test]
    fn test_render_severity_counts() {
        let record = full_record();
        let html = render(&assemble(&record, summary_date()));
        assert!(html.contains("<tr><td>High</td><td>1</td><td>1</td><td>-</td></tr>"));
        assert!(html.contains("<tr><td>Critical</td><td>1</td><td>-</td><td>1</td></tr>"));
    }

    #[test]
    fn test_render_totals_row() {
        let record = full_record();
        let html = render(&assemble(&record, summary_date()));
        assert!(html.contains(
            "<tr><th>Total</th><th>12</th><th>10</th><th>7</th><th>70%</th><th>3</th><th>30%</th><th>2</th></tr>"
        ));
    }

    #[test]
    fn test_render_escapes_markup() {
        let mut record = ReportRecord::default();
        record.set(ReportField::FeatureName, "<script>alert(1)</script>");
        record.set(ReportField::TddLink, "https://coda.io/d?a=1&view=full");
        let html = render(&assemble(&record, summary_date()));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("https://coda.io/d?a=1&amp;view=full"));
    }
}
