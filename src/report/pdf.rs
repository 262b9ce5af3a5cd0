//! PDF output: a simple flow layout of the document tree on A4 pages using
//! the built-in Helvetica faces, so no font files are needed.

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};

use super::document::{Block, Cell, Document, HeadingLevel, Run, Table};
use super::{ReportError, REPORT_TITLE};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BODY_SIZE: f32 = 9.0;
const TABLE_SIZE: f32 = 7.5;
const CELL_PADDING: f32 = 1.5;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Serialize a document tree as an A4 portrait PDF with 10 mm margins.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>, ReportError> {
    let (pdf, page, layer) =
        PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    let layer = pdf.get_page(page).get_layer(layer);

    let mut writer = PageWriter {
        pdf: &pdf,
        layer,
        regular,
        bold,
        y: PAGE_HEIGHT - MARGIN,
    };
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => writer.heading(*level, text),
            Block::Paragraph(runs) => writer.paragraph(runs),
            Block::Table(table) => writer.table(table),
        }
    }

    pdf.save_to_bytes().map_err(|e| ReportError::Pdf(e.to_string()))
}

/// Cursor over the current page; `y` is the top of the next line in mm.
struct PageWriter<'a> {
    pdf: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter<'_> {
    fn heading(&mut self, level: HeadingLevel, text: &str) {
        let size = match level {
            HeadingLevel::Title => 16.0,
            HeadingLevel::Section => 12.0,
            HeadingLevel::Subsection => 10.0,
        };
        self.y -= line_height(size) * 0.5;
        for line in wrap(text, chars_per_line(CONTENT_WIDTH, size)) {
            self.ensure_space(line_height(size));
            let x = if level == HeadingLevel::Title {
                MARGIN + (CONTENT_WIDTH - text_width(&line, size)).max(0.0) / 2.0
            } else {
                MARGIN
            };
            self.y -= line_height(size);
            self.layer.use_text(line, size, Mm(x), Mm(self.y), &self.bold);
        }
        if level == HeadingLevel::Title {
            self.rule(self.y - 2.0);
            self.y -= 3.0;
        }
    }

    /// Runs flow inline; a run with `break_before` starts a new line.
    fn paragraph(&mut self, runs: &[Run]) {
        let mut lines: Vec<Vec<(String, bool)>> = vec![Vec::new()];
        let mut used = 0usize;
        let limit = chars_per_line(CONTENT_WIDTH, BODY_SIZE);
        for run in runs {
            if run.break_before {
                lines.push(Vec::new());
                used = 0;
            }
            for (i, piece) in wrap_from(&run.text, limit, used).into_iter().enumerate() {
                if i > 0 {
                    lines.push(Vec::new());
                    used = 0;
                }
                used += piece.chars().count();
                if let Some(line) = lines.last_mut() {
                    line.push((piece, run.bold));
                }
            }
        }

        for line in lines {
            self.ensure_space(line_height(BODY_SIZE));
            self.y -= line_height(BODY_SIZE);
            let mut x = MARGIN;
            for (text, bold) in line {
                let font = if bold { &self.bold } else { &self.regular };
                let width = text_width(&text, BODY_SIZE);
                self.layer.use_text(text, BODY_SIZE, Mm(x), Mm(self.y), font);
                x += width;
            }
        }
        self.y -= line_height(BODY_SIZE) * 0.5;
    }

    fn table(&mut self, table: &Table) {
        let columns = table.columns().max(1);
        let column_width = CONTENT_WIDTH / columns as f32;
        self.y -= 2.0;

        if !table.header.is_empty() {
            let header: Vec<Cell> = table.header.iter().map(|h| Cell::bold(h.as_str())).collect();
            self.table_row(&header, columns, column_width);
        }
        for row in &table.rows {
            self.table_row(row, columns, column_width);
        }
        self.y -= line_height(BODY_SIZE) * 0.5;
    }

    fn table_row(&mut self, row: &[Cell], columns: usize, column_width: f32) {
        // a lone cell spans the whole row
        let span = if row.len() == 1 { columns } else { 1 };
        let limit = chars_per_line(column_width * span as f32 - 2.0 * CELL_PADDING, TABLE_SIZE);
        let wrapped: Vec<Vec<String>> = row
            .iter()
            .map(|cell| cell.lines.iter().flat_map(|line| wrap(line, limit)).collect())
            .collect();
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = line_count as f32 * line_height(TABLE_SIZE) + 2.0 * CELL_PADDING;

        self.ensure_space(height);
        let top = self.y;
        for (i, (cell, lines)) in row.iter().zip(&wrapped).enumerate() {
            let font = if cell.bold { &self.bold } else { &self.regular };
            let x = MARGIN + i as f32 * column_width + CELL_PADDING;
            let mut y = top - CELL_PADDING;
            for line in lines {
                y -= line_height(TABLE_SIZE);
                self.layer.use_text(line.as_str(), TABLE_SIZE, Mm(x), Mm(y + 1.0), font);
            }
        }
        self.y -= height;
        self.rule(self.y);
    }

    fn rule(&self, y: f32) {
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        };
        self.layer.add_line(line);
    }

    /// Start a new page when `needed` mm would cross the bottom margin.
    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed >= MARGIN {
            return;
        }
        let (page, layer) = self.pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.pdf.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVG_GLYPH_WIDTH
}

fn chars_per_line(width: f32, size: f32) -> usize {
    ((width / (size * PT_TO_MM * AVG_GLYPH_WIDTH)) as usize).max(1)
}

/// Greedy word wrap to `limit` characters; words longer than a line (URLs)
/// are split hard.
fn wrap(text: &str, limit: usize) -> Vec<String> {
    wrap_from(text, limit, 0)
}

/// Like `wrap`, but the first line already has `used` characters on it.
fn wrap_from(text: &str, limit: usize, used: usize) -> Vec<String> {
    let mut lines = vec![String::new()];
    let mut width = used;
    for word in text.split_inclusive(' ') {
        let mut word: Vec<char> = word.chars().collect();
        if width + word.len() > limit && width > 0 {
            lines.push(String::new());
            width = 0;
        }
        while word.len() > limit {
            let rest = word.split_off(limit);
            if let Some(line) = lines.last_mut() {
                line.extend(word);
            }
            lines.push(String::new());
            width = 0;
            word = rest;
        }
        width += word.len();
        if let Some(line) = lines.last_mut() {
            line.extend(word);
        }
    }
    lines
}
