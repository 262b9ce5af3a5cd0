use docx_rs::{AlignmentType, BreakType, Docx, Style, StyleType};

use super::document::{self, Block, Cell, Document, HeadingLevel};
use super::ReportError;

const TITLE_STYLE: &str = "Heading1";
const SECTION_STYLE: &str = "Heading2";
const SUBSECTION_STYLE: &str = "Heading3";

/// Serialize a document tree as a DOCX package.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>, ReportError> {
    let mut docx = Docx::new()
        .add_style(heading_style(TITLE_STYLE, "Heading 1", 32))
        .add_style(heading_style(SECTION_STYLE, "Heading 2", 26))
        .add_style(heading_style(SUBSECTION_STYLE, "Heading 3", 22));

    for block in &doc.blocks {
        docx = match block {
            Block::Heading { level, text } => docx.add_paragraph(heading(*level, text)),
            Block::Paragraph(runs) => docx.add_paragraph(paragraph(runs)),
            Block::Table(table) => docx.add_table(self::table(table)),
        };
    }

    let mut buf = Vec::new();
    docx.build()
        .pack(std::io::Cursor::new(&mut buf))
        .map_err(|e| ReportError::Docx(e.to_string()))?;
    Ok(buf)
}

/// Sizes are in half-points.
fn heading_style(id: &str, name: &str, size: usize) -> Style {
    Style::new(id, StyleType::Paragraph).name(name).size(size).bold()
}

fn heading(level: HeadingLevel, text: &str) -> docx_rs::Paragraph {
    let run = docx_rs::Run::new().add_text(text);
    let paragraph = docx_rs::Paragraph::new().add_run(run);
    match level {
        HeadingLevel::Title => paragraph.style(TITLE_STYLE).align(AlignmentType::Center),
        HeadingLevel::Section => paragraph.style(SECTION_STYLE),
        HeadingLevel::Subsection => paragraph.style(SUBSECTION_STYLE),
    }
}

fn paragraph(runs: &[document::Run]) -> docx_rs::Paragraph {
    runs.iter().fold(docx_rs::Paragraph::new(), |paragraph, run| {
        let mut out = docx_rs::Run::new();
        if run.break_before {
            out = out.add_break(BreakType::TextWrapping);
        }
        out = out.add_text(&run.text);
        if run.bold {
            out = out.bold();
        }
        paragraph.add_run(out)
    })
}

fn table(table: &document::Table) -> docx_rs::Table {
    let columns = table.columns();
    let mut rows = Vec::with_capacity(table.rows.len() + 1);
    if !table.header.is_empty() {
        let header = table.header.iter().map(|h| cell(&Cell::bold(h.as_str()), 1)).collect();
        rows.push(docx_rs::TableRow::new(header));
    }
    for row in &table.rows {
        // a single-cell row (placeholder text) spans the full width
        let span = if row.len() == 1 { columns } else { 1 };
        rows.push(docx_rs::TableRow::new(row.iter().map(|c| cell(c, span)).collect()));
    }
    docx_rs::Table::new(rows)
}

fn cell(cell: &Cell, span: usize) -> docx_rs::TableCell {
    let mut out = docx_rs::TableCell::new();
    if span > 1 {
        out = out.grid_span(span);
    }
    for line in &cell.lines {
        let mut run = docx_rs::Run::new().add_text(line);
        if cell.bold {
            run = run.bold();
        }
        out = out.add_paragraph(docx_rs::Paragraph::new().add_run(run));
    }
    out
}
