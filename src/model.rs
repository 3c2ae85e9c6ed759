//! Data structures describing a report request and the laid-out report document.
//!
//! The layout model is deliberately independent of `genpdf` elements: the layout builder produces
//! plain values that tests can inspect, and the renderer turns them into flowable elements at the
//! last moment. Lengths are millimetres unless a field says points.

use genpdf::style::Color;

use crate::photo::FittedPhoto;
use crate::styles::TextStyle;

/// Title used when the caller does not supply one.
pub const DEFAULT_TITLE: &str = "활동 기록";

/// Form value that older clients send to mean "no reviewer".
pub const REVIEWER_SENTINEL: &str = "None";

/// Input of a single report build. Text fields are expected to be validated by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRequest {
    committee_name: String,
    datetime_location: String,
    organizer: String,
    participants: String,
    activity_content: String,
    title: String,
    reviewer_name: Option<String>,
    image: Option<Vec<u8>>,
}

impl ReportRequest {
    /// Creates a request with the default title, no reviewer and no photo.
    pub fn new(
        committee_name: impl Into<String>,
        datetime_location: impl Into<String>,
        organizer: impl Into<String>,
        participants: impl Into<String>,
        activity_content: impl Into<String>,
    ) -> Self {
        Self {
            committee_name: committee_name.into(),
            datetime_location: datetime_location.into(),
            organizer: organizer.into(),
            participants: participants.into(),
            activity_content: activity_content.into(),
            title: DEFAULT_TITLE.to_owned(),
            reviewer_name: None,
            image: None,
        }
    }

    /// Interprets a reviewer form value: the `"None"` sentinel and blank values mean absent.
    pub fn reviewer_from_form(value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == REVIEWER_SENTINEL {
            None
        } else {
            Some(value.to_owned())
        }
    }

    /// Sets the title and returns the updated request.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the reviewer and returns the updated request.
    pub fn with_reviewer(mut self, reviewer_name: impl Into<Option<String>>) -> Self {
        self.reviewer_name = reviewer_name.into();
        self
    }

    /// Attaches raw photo bytes and returns the updated request.
    pub fn with_image(mut self, image: impl Into<Option<Vec<u8>>>) -> Self {
        self.image = image.into();
        self
    }

    /// Returns the committee name.
    pub fn committee_name(&self) -> &str {
        &self.committee_name
    }

    /// Returns the date, time and place of the activity.
    pub fn datetime_location(&self) -> &str {
        &self.datetime_location
    }

    /// Returns the organizing body.
    pub fn organizer(&self) -> &str {
        &self.organizer
    }

    /// Returns the participants as entered.
    pub fn participants(&self) -> &str {
        &self.participants
    }

    /// Returns the activity description with its line breaks.
    pub fn activity_content(&self) -> &str {
        &self.activity_content
    }

    /// Returns the document title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the reviewer, if the report is signed.
    pub fn reviewer_name(&self) -> Option<&str> {
        self.reviewer_name.as_deref()
    }

    /// Returns the raw photo bytes, if attached.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }
}

/// Styled text split into explicit lines.
#[derive(Clone, Debug, PartialEq)]
pub struct TextParagraph {
    lines: Vec<String>,
    style: TextStyle,
}

impl TextParagraph {
    /// Creates a paragraph, turning every line break in `text` into a separate line.
    pub fn new(text: &str, style: TextStyle) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
            style,
        }
    }

    /// The explicit lines of the paragraph. Long lines are wrapped further when rendered.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the style shared by every line.
    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// The lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Vertical placement of content inside a table cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    #[default]
    Middle,
}

/// Cell padding in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellPadding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl CellPadding {
    /// Creates padding from top, right, bottom and left values.
    pub fn trbl(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl Default for CellPadding {
    fn default() -> Self {
        Self::trbl(3.0, 6.0, 3.0, 6.0)
    }
}

/// What a table cell displays.
#[derive(Clone, Debug)]
pub enum CellContent {
    Text(TextParagraph),
    /// A photo, with the text shown instead if it cannot be embedded.
    Photo {
        photo: FittedPhoto,
        fallback: TextParagraph,
    },
}

impl CellContent {
    /// Returns the text paragraph, if the cell holds text.
    pub fn as_text(&self) -> Option<&TextParagraph> {
        match self {
            CellContent::Text(paragraph) => Some(paragraph),
            CellContent::Photo { .. } => None,
        }
    }
}

/// A single table cell with its decoration.
#[derive(Clone, Debug)]
pub struct TableCell {
    content: CellContent,
    background: Option<Color>,
    padding: CellPadding,
    vertical_alignment: VerticalAlignment,
}

impl TableCell {
    /// Creates an unfilled cell with default padding, vertically centred.
    pub fn new(content: CellContent) -> Self {
        Self {
            content,
            background: None,
            padding: CellPadding::default(),
            vertical_alignment: VerticalAlignment::default(),
        }
    }

    /// Fills the cell with `color`.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Sets the inner padding.
    pub fn with_padding(mut self, padding: CellPadding) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the vertical placement of the content.
    pub fn with_vertical_alignment(mut self, alignment: VerticalAlignment) -> Self {
        self.vertical_alignment = alignment;
        self
    }

    /// Returns what the cell displays.
    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// Returns the fill color; unfilled cells show the page.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Returns the inner padding in points.
    pub fn padding(&self) -> CellPadding {
        self.padding
    }

    /// Returns how the content is placed vertically.
    pub fn vertical_alignment(&self) -> VerticalAlignment {
        self.vertical_alignment
    }

    /// Returns the content, consuming the cell.
    pub fn into_content(self) -> CellContent {
        self.content
    }
}

/// A fixed-height row of cells.
#[derive(Clone, Debug)]
pub struct TableRow {
    height: f64,
    cells: Vec<TableCell>,
}

impl TableRow {
    /// Creates a row `height` millimetres tall.
    pub fn new(height: f64, cells: Vec<TableCell>) -> Self {
        Self { height, cells }
    }

    /// Row height in millimetres.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns the cells left to right.
    pub fn cells(&self) -> &[TableCell] {
        &self.cells
    }

    /// Returns the cells, consuming the row.
    pub fn into_cells(self) -> Vec<TableCell> {
        self.cells
    }
}

/// Stroke color and width (in points) of a table rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rule {
    pub color: Color,
    pub width: f64,
}

/// A table with fixed column widths and row heights.
#[derive(Clone, Debug)]
pub struct RecordTable {
    column_widths: Vec<f64>,
    rows: Vec<TableRow>,
    outer_rule: Rule,
    inner_rule: Rule,
}

impl RecordTable {
    /// Creates an empty table.
    pub fn new(column_widths: Vec<f64>, outer_rule: Rule, inner_rule: Rule) -> Self {
        Self {
            column_widths,
            rows: Vec::new(),
            outer_rule,
            inner_rule,
        }
    }

    /// Appends a row and returns the updated table.
    pub fn with_row(mut self, row: TableRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Column widths in millimetres.
    pub fn column_widths(&self) -> &[f64] {
        &self.column_widths
    }

    /// Returns the rows top to bottom.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Returns the rule framing the table.
    pub fn outer_rule(&self) -> Rule {
        self.outer_rule
    }

    /// Returns the rule between rows and columns.
    pub fn inner_rule(&self) -> Rule {
        self.inner_rule
    }

    /// Total width in millimetres.
    pub fn width(&self) -> f64 {
        self.column_widths.iter().sum()
    }

    /// Returns the rows, consuming the table.
    pub fn into_rows(self) -> Vec<TableRow> {
        self.rows
    }
}

/// Blocks laid onto the page top to bottom.
#[derive(Clone, Debug)]
pub enum Block {
    Paragraph(TextParagraph),
    Table(RecordTable),
}

/// Paper size and margins in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl PageGeometry {
    /// ISO A4 with 2 cm margins and a 3 cm bottom margin.
    pub fn a4_report() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin_top: 20.0,
            margin_right: 20.0,
            margin_bottom: 30.0,
            margin_left: 20.0,
        }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4_report()
    }
}

/// A fully laid-out report, ready to render.
#[derive(Clone, Debug)]
pub struct ReportDocument {
    title: String,
    geometry: PageGeometry,
    blocks: Vec<Block>,
}

impl ReportDocument {
    /// Creates an empty document.
    pub fn new(title: impl Into<String>, geometry: PageGeometry) -> Self {
        Self {
            title: title.into(),
            geometry,
            blocks: Vec::new(),
        }
    }

    /// Appends a block and returns the updated document.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Title written to the PDF metadata.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the paper size and margins.
    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Returns the blocks in page order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The record table, if the document has one.
    pub fn table(&self) -> Option<&RecordTable> {
        self.blocks.iter().find_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }

    /// Returns the blocks, consuming the document.
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::ResolvedFont;
    use crate::styles::{self, StyleRole};

    #[test]
    fn reviewer_sentinel_and_blank_values_mean_absent() {
        assert_eq!(ReportRequest::reviewer_from_form("None"), None);
        assert_eq!(ReportRequest::reviewer_from_form("  "), None);
        assert_eq!(
            ReportRequest::reviewer_from_form("홍길동"),
            Some("홍길동".to_owned())
        );
    }

    #[test]
    fn request_defaults_to_activity_record_title() {
        let request = ReportRequest::new("a", "b", "c", "d", "e");
        assert_eq!(request.title(), DEFAULT_TITLE);
        assert_eq!(request.reviewer_name(), None);
        assert_eq!(request.image(), None);
    }

    #[test]
    fn paragraph_splits_on_line_breaks() {
        let style = styles::derive(&ResolvedFont::unavailable())
            .get(StyleRole::Content)
            .clone();
        let paragraph = TextParagraph::new("line1\nline2\r\nline3", style);
        assert_eq!(paragraph.lines(), ["line1", "line2", "line3"]);
        assert_eq!(paragraph.text(), "line1\nline2\nline3");
    }

    #[test]
    fn cells_are_unfilled_unless_given_a_background() {
        let style = styles::derive(&ResolvedFont::unavailable())
            .get(StyleRole::Content)
            .clone();
        let content = CellContent::Text(TextParagraph::new("value", style));
        let plain = TableCell::new(content.clone());
        assert_eq!(plain.background(), None);
        assert_eq!(plain.vertical_alignment(), VerticalAlignment::Middle);

        let filled = TableCell::new(content).with_background(Color::Rgb(0x34, 0x49, 0x5e));
        assert_eq!(filled.background(), Some(Color::Rgb(0x34, 0x49, 0x5e)));
    }
}
