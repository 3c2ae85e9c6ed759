//! Report elements built on top of `genpdf` primitives.
//!
//! `genpdf` ships paragraphs, images and a weighted table, but nothing with fixed row heights,
//! cell backgrounds or vertically centred content. The elements here fill that gap:
//!
//! - [`TextBlock`] prints pre-split lines with wrapping, indent, leading and alignment;
//! - [`PhotoCell`] centres an image at its fitted size inside a box;
//! - [`FixedTable`] lays out fixed-size cells with fills and rules, breaking between rows.
//!
//! `genpdf` strokes every line with the PDF default width of 1pt and offers no fill operator, so
//! fills are hatched with overlapping strokes and wider rules are built from parallel strokes.

use genpdf::elements::Image;
use genpdf::error::{Error, ErrorKind};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{render, Alignment, Element, Margins, Mm, Position, RenderResult, Scale, Size};
use image::GenericImageView;
use log::{debug, warn};

use crate::model::{CellContent, CellPadding, RecordTable, Rule, TextParagraph, VerticalAlignment};
use crate::photo::{FittedPhoto, EMBED_DPI};
use crate::styles::{pt_to_mm, HorizontalAlignment};

const MM_PER_INCH: f64 = 25.4;

/// Tolerance for comparing millimetre lengths that went through float arithmetic.
const EPSILON_MM: f64 = 1e-6;

/// Width of every stroke `genpdf` draws, in points.
const STROKE_WIDTH_PT: f64 = 1.0;

/// Distance between hatch strokes. Slightly below the stroke width so neighbours overlap.
const HATCH_SPACING_MM: f64 = 0.3;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn position(x: f64, y: f64) -> Position {
    Position::new(mm_from_f64(x), mm_from_f64(y))
}

/// Splits `text` into lines no wider than `max_width`, as measured by `measure`.
///
/// Breaks at whitespace where possible and inside words that are wider than a whole line.
/// Blank input yields a single empty line so explicit empty lines keep their height.
pub fn wrap_line<F>(text: &str, max_width: f64, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_owned();
            continue;
        }

        for ch in word.chars() {
            let mut next = current.clone();
            next.push(ch);
            if measure(&next) > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            } else {
                current = next;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Vertical positions of the strokes that hatch a band `height` millimetres tall.
fn hatch_offsets(height: f64) -> Vec<f64> {
    let half_stroke = pt_to_mm(STROKE_WIDTH_PT) / 2.0;
    if height <= 2.0 * half_stroke {
        return vec![height / 2.0];
    }

    let span = height - 2.0 * half_stroke;
    let steps = (span / HATCH_SPACING_MM).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|step| half_stroke + span * step as f64 / steps as f64)
        .collect()
}

/// Offsets from the rule centre line of the parallel strokes that make up a rule `width` points
/// wide. Rules up to one stroke wide are a single stroke.
fn stroke_offsets(width: f64) -> Vec<f64> {
    if width <= STROKE_WIDTH_PT + EPSILON_MM {
        return vec![0.0];
    }

    let spread = pt_to_mm(width - STROKE_WIDTH_PT);
    let strokes = (width / STROKE_WIDTH_PT).ceil() as usize;
    (0..strokes)
        .map(|stroke| -spread / 2.0 + spread * stroke as f64 / (strokes - 1) as f64)
        .collect()
}

fn fill_rect(area: &render::Area<'_>, width: f64, height: f64, color: Color) {
    let style = Style::new().with_color(color);
    for y in hatch_offsets(height) {
        area.draw_line(vec![position(0.0, y), position(width, y)], style);
    }
}

fn padding_margins(padding: CellPadding) -> Margins {
    Margins::trbl(
        mm_from_f64(pt_to_mm(padding.top)),
        mm_from_f64(pt_to_mm(padding.right)),
        mm_from_f64(pt_to_mm(padding.bottom)),
        mm_from_f64(pt_to_mm(padding.left)),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Overflow {
    /// Continue on the next page.
    Flow,
    /// Keep drawing past the bottom of the area.
    Spill,
}

/// Multi-line text with explicit line breaks, wrapped to the available width.
///
/// As a top-level document element the block continues on the next page when it runs out of
/// space. Inside a table cell it is vertically centred and every line is drawn, running past
/// the cell edges when the text is taller than the cell.
pub struct TextBlock {
    paragraph: TextParagraph,
    vertical_alignment: VerticalAlignment,
    overflow: Overflow,
    wrapped: Option<Vec<String>>,
    next_line: usize,
    space_before_applied: bool,
}

impl TextBlock {
    fn new(
        paragraph: TextParagraph,
        vertical_alignment: VerticalAlignment,
        overflow: Overflow,
    ) -> Self {
        Self {
            paragraph,
            vertical_alignment,
            overflow,
            wrapped: None,
            next_line: 0,
            space_before_applied: false,
        }
    }

    /// Creates a block that flows across pages.
    pub fn flowing(paragraph: TextParagraph) -> Self {
        Self::new(paragraph, VerticalAlignment::Top, Overflow::Flow)
    }

    /// Creates a block drawn in full inside the area it is rendered into.
    pub fn boxed(paragraph: TextParagraph, vertical_alignment: VerticalAlignment) -> Self {
        Self::new(paragraph, vertical_alignment, Overflow::Spill)
    }

    /// Returns the space to leave above the block in millimetres, once per block.
    fn take_space_before(&mut self) -> f64 {
        if self.space_before_applied || self.overflow != Overflow::Flow {
            return 0.0;
        }
        self.space_before_applied = true;
        pt_to_mm(self.paragraph.style().space_before())
    }

    fn line_x(&self, line_width: f64, text_width: f64) -> f64 {
        let indent = pt_to_mm(self.paragraph.style().left_indent());
        let x = match self.paragraph.style().alignment() {
            HorizontalAlignment::Left => indent,
            HorizontalAlignment::Center => indent + (text_width - line_width) / 2.0,
            HorizontalAlignment::Right => indent + text_width - line_width,
        };
        x.max(0.0)
    }
}

impl Element for TextBlock {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let pdf_style = style.and(self.paragraph.style().to_style());
        let measure = |s: &str| {
            mm_to_f64(StyledString::new(s.to_owned(), pdf_style).width(&context.font_cache))
        };

        let leading = pt_to_mm(self.paragraph.style().leading());
        let indent = pt_to_mm(self.paragraph.style().left_indent());
        let text_width = (mm_to_f64(area.size().width) - indent).max(0.0);

        let paragraph = &self.paragraph;
        let lines = self
            .wrapped
            .get_or_insert_with(|| {
                paragraph
                    .lines()
                    .iter()
                    .flat_map(|line| wrap_line(line, text_width, &measure))
                    .collect()
            })
            .clone();

        let mut result = RenderResult::default();

        let space_before = self.take_space_before();
        if space_before > 0.0 {
            area.add_offset(position(0.0, space_before));
            result.size = result
                .size
                .stack_vertical(Size::new(0, mm_from_f64(space_before)));
        }

        let area_height = mm_to_f64(area.size().height);
        let block_height = (lines.len() - self.next_line) as f64 * leading;

        if self.overflow == Overflow::Spill {
            let top = match self.vertical_alignment {
                VerticalAlignment::Middle => (area_height - block_height) / 2.0,
                VerticalAlignment::Top => 0.0,
            };
            if block_height > area_height + EPSILON_MM {
                warn!(
                    "Cell text runs {:.1}mm past its {:.1}mm cell",
                    block_height - area_height,
                    area_height
                );
            }
            // The canvas is tall enough for every line, wherever the cell ends.
            area.add_offset(position(0.0, top));
            area.set_height(mm_from_f64(block_height + leading));
        }

        let mut y = 0.0;
        while self.next_line < lines.len() {
            let line = &lines[self.next_line];
            let fits = self.overflow == Overflow::Spill
                || y + leading <= area_height + EPSILON_MM;
            let x = self.line_x(measure(line), text_width);
            let section = if fits {
                area.text_section(&context.font_cache, position(x, y), pdf_style)
            } else {
                None
            };

            match section {
                Some(mut section) => section.print_str(line, pdf_style)?,
                None if self.overflow == Overflow::Flow => {
                    result.has_more = true;
                    break;
                }
                None => {
                    return Err(Error::new(
                        "Cell text line could not be placed",
                        ErrorKind::PageSizeExceeded,
                    ))
                }
            }

            y += leading;
            self.next_line += 1;
        }

        let used = match self.overflow {
            Overflow::Flow if !result.has_more => {
                (y + pt_to_mm(self.paragraph.style().space_after())).min(area_height)
            }
            Overflow::Flow => y.min(area_height),
            Overflow::Spill => area_height.min(y),
        };
        result.size = result
            .size
            .stack_vertical(Size::new(area.size().width, mm_from_f64(used)));

        Ok(result)
    }
}

/// Where a photo lands inside a cell, in millimetres relative to the cell's top edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhotoPlacement {
    /// Distance from the top of the cell; negative when the photo is taller than the cell.
    pub top: f64,
    /// Drawn width.
    pub width: f64,
    /// Drawn height.
    pub height: f64,
}

/// A photo drawn at its fitted size, centred in the area it is rendered into.
///
/// Photos larger than the area keep their fitted size and extend past the cell edges.
pub struct PhotoCell {
    image: Image,
    natural_size: (f64, f64),
    fitted_size: (f64, f64),
}

impl PhotoCell {
    /// Prepares the photo for embedding.
    pub fn new(photo: &FittedPhoto) -> Result<Self, Error> {
        let (px_width, px_height) = photo.image().dimensions();
        let natural_size = (
            MM_PER_INCH * f64::from(px_width) / EMBED_DPI,
            MM_PER_INCH * f64::from(px_height) / EMBED_DPI,
        );
        let mut image = Image::from_dynamic_image(photo.image().clone())?;
        image.set_alignment(Alignment::Center);
        Ok(Self {
            image,
            natural_size,
            fitted_size: (photo.width_mm(), photo.height_mm()),
        })
    }

    /// Returns the placement of the photo in a `box_width` × `box_height` cell.
    pub fn placement(&self, box_width: f64, box_height: f64) -> PhotoPlacement {
        let (width, height) = self.fitted_size;
        if width > box_width + EPSILON_MM || height > box_height + EPSILON_MM {
            debug!(
                "Photo {:.1}x{:.1}mm extends past its {:.1}x{:.1}mm cell",
                width, height, box_width, box_height
            );
        }
        PhotoPlacement {
            top: (box_height - height) / 2.0,
            width,
            height,
        }
    }
}

impl Element for PhotoCell {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let box_width = mm_to_f64(area.size().width);
        let box_height = mm_to_f64(area.size().height);
        let placement = self.placement(box_width, box_height);
        let (natural_width, natural_height) = self.natural_size;

        if natural_width > EPSILON_MM && natural_height > EPSILON_MM {
            self.image.set_scale(Scale::new(
                placement.width / natural_width,
                placement.height / natural_height,
            ));
        }

        area.add_offset(position(0.0, placement.top));
        self.image.render(context, area, style)?;

        let mut result = RenderResult::default();
        result.size = Size::new(mm_from_f64(box_width), mm_from_f64(box_height));
        Ok(result)
    }
}

struct Cell {
    element: Box<dyn Element>,
    background: Option<Color>,
    padding: CellPadding,
}

struct Row {
    height: f64,
    cells: Vec<Cell>,
}

/// A table with fixed column widths and row heights, cell fills and ruled borders.
///
/// Rows never split. When the next row does not fit on the current page the table reports
/// `has_more` and continues with that row on the following page, framed anew.
pub struct FixedTable {
    column_widths: Vec<f64>,
    width: f64,
    rows: Vec<Row>,
    outer_rule: Rule,
    inner_rule: Rule,
    next_row: usize,
}

fn cell_element(content: CellContent, vertical_alignment: VerticalAlignment) -> Box<dyn Element> {
    match content {
        CellContent::Text(paragraph) => Box::new(TextBlock::boxed(paragraph, vertical_alignment)),
        CellContent::Photo { photo, fallback } => match PhotoCell::new(&photo) {
            Ok(cell) => Box::new(cell),
            Err(err) => {
                warn!("Photo could not be embedded, showing placeholder: {}", err);
                Box::new(TextBlock::boxed(fallback, vertical_alignment))
            }
        },
    }
}

impl FixedTable {
    /// Converts the layout table into a renderable element.
    pub fn new(table: RecordTable) -> Self {
        let column_widths = table.column_widths().to_vec();
        let width = table.width();
        let outer_rule = table.outer_rule();
        let inner_rule = table.inner_rule();
        let rows = table
            .into_rows()
            .into_iter()
            .map(|row| Row {
                height: row.height(),
                cells: row
                    .into_cells()
                    .into_iter()
                    .map(|cell| {
                        let background = cell.background();
                        let padding = cell.padding();
                        let vertical_alignment = cell.vertical_alignment();
                        Cell {
                            element: cell_element(cell.into_content(), vertical_alignment),
                            background,
                            padding,
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            column_widths,
            width,
            rows,
            outer_rule,
            inner_rule,
            next_row: 0,
        }
    }

    fn draw_rules(&self, area: &render::Area<'_>, row_edges: &[f64]) {
        let Some(&bottom) = row_edges.last() else {
            return;
        };
        let width = self.width;

        let inner = Style::new().with_color(self.inner_rule.color);
        for offset in stroke_offsets(self.inner_rule.width) {
            for &edge in &row_edges[1..row_edges.len() - 1] {
                let y = edge + offset;
                area.draw_line(vec![position(0.0, y), position(width, y)], inner);
            }

            let mut x = 0.0;
            for column_width in &self.column_widths[..self.column_widths.len().saturating_sub(1)] {
                x += column_width;
                area.draw_line(
                    vec![position(x + offset, 0.0), position(x + offset, bottom)],
                    inner,
                );
            }
        }

        let outer = Style::new().with_color(self.outer_rule.color);
        for offset in stroke_offsets(self.outer_rule.width) {
            area.draw_line(
                vec![
                    position(-offset, -offset),
                    position(width + offset, -offset),
                    position(width + offset, bottom + offset),
                    position(-offset, bottom + offset),
                    position(-offset, -offset),
                ],
                outer,
            );
        }
    }
}

impl Element for FixedTable {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let available = mm_to_f64(area.size().height);
        let mut row_edges = vec![0.0];
        let mut offset = 0.0;

        while self.next_row < self.rows.len() {
            let row = &mut self.rows[self.next_row];
            if offset + row.height > available + EPSILON_MM {
                result.has_more = true;
                break;
            }

            let mut x = 0.0;
            for (cell, &width) in row.cells.iter_mut().zip(&self.column_widths) {
                let mut cell_area = area.clone();
                cell_area.add_offset(position(x, offset));
                cell_area.set_width(mm_from_f64(width));
                cell_area.set_height(mm_from_f64(row.height));
                if let Some(color) = cell.background {
                    fill_rect(&cell_area, width, row.height, color);
                }

                cell_area.add_margins(padding_margins(cell.padding));
                cell.element.render(context, cell_area, style)?;
                x += width;
            }

            offset += row.height;
            row_edges.push(offset);
            self.next_row += 1;
        }

        if row_edges.len() > 1 {
            self.draw_rules(&area, &row_edges);
        }

        result.size = Size::new(mm_from_f64(self.width), mm_from_f64(offset));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::ResolvedFont;
    use crate::photo;
    use crate::styles::{self, StyleRole};
    use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb([90u8, 120, 150]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .expect("encode png");
        bytes
    }

    fn photo_cell(width: u32, height: u32) -> PhotoCell {
        let fitted = photo::fit(Some(&solid_png(width, height)));
        PhotoCell::new(fitted.photo().expect("fitted photo")).expect("embeddable photo")
    }

    fn paragraph(role: StyleRole, text: &str) -> TextParagraph {
        let styles = styles::derive(&ResolvedFont::unavailable());
        TextParagraph::new(text, styles.get(role).clone())
    }

    /// One unit per character keeps the expectations readable.
    fn chars(s: &str) -> f64 {
        s.chars().count() as f64
    }

    #[test]
    fn wrap_keeps_short_lines_intact() {
        assert_eq!(wrap_line("line1", 10.0, chars), ["line1"]);
    }

    #[test]
    fn wrap_breaks_at_whitespace() {
        assert_eq!(
            wrap_line("회의 안건 검토 및 결과 공유", 7.0, chars),
            ["회의 안건 검토", "및 결과 공유"]
        );
    }

    #[test]
    fn wrap_splits_words_longer_than_a_line() {
        assert_eq!(wrap_line("abcdefghij", 4.0, chars), ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn blank_lines_keep_their_slot() {
        assert_eq!(wrap_line("", 10.0, chars), [""]);
        assert_eq!(wrap_line("   ", 10.0, chars), [""]);
    }

    #[test]
    fn single_point_rules_are_one_stroke() {
        assert_eq!(stroke_offsets(1.0), [0.0]);
        assert_eq!(stroke_offsets(0.5), [0.0]);
    }

    #[test]
    fn wider_rules_are_spread_parallel_strokes() {
        let offsets = stroke_offsets(1.5);
        let quarter_point = pt_to_mm(0.25);
        assert_eq!(offsets.len(), 2);
        assert!((offsets[0] + quarter_point).abs() < EPSILON_MM);
        assert!((offsets[1] - quarter_point).abs() < EPSILON_MM);

        let offsets = stroke_offsets(3.0);
        assert_eq!(offsets.len(), 3);
        assert!((offsets[0] + pt_to_mm(1.0)).abs() < EPSILON_MM);
        assert!(offsets[1].abs() < EPSILON_MM);
    }

    #[test]
    fn hatching_covers_the_band_edge_to_edge() {
        let half_stroke = pt_to_mm(STROKE_WIDTH_PT) / 2.0;
        let offsets = hatch_offsets(10.0);
        assert!((offsets[0] - half_stroke).abs() < EPSILON_MM);
        assert!((offsets[offsets.len() - 1] - (10.0 - half_stroke)).abs() < EPSILON_MM);
        for pair in offsets.windows(2) {
            assert!(pair[1] - pair[0] <= HATCH_SPACING_MM + EPSILON_MM);
        }
    }

    #[test]
    fn narrow_photo_is_drawn_at_minimum_width() {
        let cell = photo_cell(300, 1000);
        let placement = cell.placement(140.0, 110.0 - pt_to_mm(40.0));

        assert!(placement.width >= 80.0 - EPSILON_MM);
        assert!((placement.width - 80.0).abs() < EPSILON_MM);
        assert!((placement.height - 80.0 * 1000.0 / 300.0).abs() < EPSILON_MM);
        assert!(placement.top < 0.0);
    }

    #[test]
    fn photo_fitting_the_cell_is_centred() {
        let cell = photo_cell(1000, 1000);
        let placement = cell.placement(140.0, 125.0);

        assert!((placement.width - 115.0).abs() < EPSILON_MM);
        assert!((placement.height - 115.0).abs() < EPSILON_MM);
        assert!((placement.top - 5.0).abs() < EPSILON_MM);
    }

    #[test]
    fn space_before_is_applied_once() {
        let mut block = TextBlock::flowing(paragraph(StyleRole::Sign, "홍길동 (인)"));
        assert!((block.take_space_before() - pt_to_mm(10.0)).abs() < EPSILON_MM);
        assert_eq!(block.take_space_before(), 0.0);
    }

    #[test]
    fn cell_text_has_no_space_before() {
        let mut block = TextBlock::boxed(
            paragraph(StyleRole::Sign, "홍길동 (인)"),
            VerticalAlignment::Middle,
        );
        assert_eq!(block.take_space_before(), 0.0);
    }

    #[test]
    fn unit_conversion_round_trips() {
        assert!((mm_to_f64(mm_from_f64(12.5)) - 12.5).abs() < EPSILON_MM);
    }
}
