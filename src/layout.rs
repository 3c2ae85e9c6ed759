//! Composition of the fixed report layout: title, record table and signature line.

use genpdf::style::Color;

use crate::model::{
    Block, CellContent, CellPadding, PageGeometry, RecordTable, ReportDocument, ReportRequest,
    Rule, TableCell, TableRow, TextParagraph, VerticalAlignment,
};
use crate::photo::{FittedImage, LOAD_FAILED_PLACEHOLDER};
use crate::styles::{StyleRole, StyleSet};

/// Width of the label column in millimetres.
pub const LABEL_COLUMN_WIDTH: f64 = 30.0;

/// Width of the value column in millimetres.
pub const VALUE_COLUMN_WIDTH: f64 = 140.0;

/// Row labels in table order.
pub const ROW_LABELS: [&str; 6] = [
    "위원회명",
    "일시/장소",
    "주최",
    "참석자",
    "활동내용",
    "활동사진",
];

/// Row heights in millimetres, matching [`ROW_LABELS`].
pub const ROW_HEIGHTS: [f64; 6] = [10.0, 10.0, 10.0, 10.0, 70.0, 110.0];

/// Suffix of the reviewer signature line (seal mark).
pub const SIGNATURE_MARK: &str = "(인)";

const LABEL_BACKGROUND: Color = Color::Rgb(0x6c, 0x7a, 0x89);

const OUTER_RULE: Rule = Rule {
    color: Color::Rgb(0x2c, 0x3e, 0x50),
    width: 1.5,
};

const INNER_RULE: Rule = Rule {
    color: Color::Rgb(0x95, 0xa5, 0xa6),
    width: 1.0,
};

/// Photo cell padding: room above and below, none at the sides.
const PHOTO_PADDING: CellPadding = CellPadding {
    top: 20.0,
    right: 0.0,
    bottom: 20.0,
    left: 0.0,
};

/// Formats the signature line for `reviewer`.
pub fn signature_text(reviewer: &str) -> String {
    format!("{} {}", reviewer, SIGNATURE_MARK)
}

fn text_cell(text: &str, styles: &StyleSet, role: StyleRole) -> TableCell {
    TableCell::new(CellContent::Text(TextParagraph::new(
        text,
        styles.get(role).clone(),
    )))
    .with_vertical_alignment(VerticalAlignment::Middle)
}

fn photo_cell(photo: &FittedImage, styles: &StyleSet) -> TableCell {
    let placeholder =
        |text: &str| TextParagraph::new(text, styles.get(StyleRole::Content).clone());
    let content = match photo {
        FittedImage::Fitted(photo) => CellContent::Photo {
            photo: photo.clone(),
            fallback: placeholder(LOAD_FAILED_PLACEHOLDER),
        },
        FittedImage::Degraded(reason) => CellContent::Text(placeholder(reason.placeholder_text())),
    };

    TableCell::new(content)
        .with_padding(PHOTO_PADDING)
        .with_vertical_alignment(VerticalAlignment::Middle)
}

fn record_table(request: &ReportRequest, styles: &StyleSet, photo: &FittedImage) -> RecordTable {
    let values = [
        request.committee_name(),
        request.datetime_location(),
        request.organizer(),
        request.participants(),
        request.activity_content(),
    ];

    let mut table = RecordTable::new(
        vec![LABEL_COLUMN_WIDTH, VALUE_COLUMN_WIDTH],
        OUTER_RULE,
        INNER_RULE,
    );

    for (index, label) in ROW_LABELS.iter().enumerate() {
        let label_cell =
            text_cell(label, styles, StyleRole::Header).with_background(LABEL_BACKGROUND);
        let value_cell = match values.get(index) {
            Some(value) => text_cell(value, styles, StyleRole::Content),
            None => photo_cell(photo, styles),
        };
        table = table.with_row(TableRow::new(ROW_HEIGHTS[index], vec![label_cell, value_cell]));
    }

    table
}

/// Lays out the report for `request`.
///
/// The signature line is appended only when the request names a reviewer.
pub fn build(request: &ReportRequest, styles: &StyleSet, photo: &FittedImage) -> ReportDocument {
    let mut document = ReportDocument::new(request.title(), PageGeometry::a4_report())
        .with_block(Block::Paragraph(TextParagraph::new(
            request.title(),
            styles.get(StyleRole::Title).clone(),
        )))
        .with_block(Block::Table(record_table(request, styles, photo)));

    if let Some(reviewer) = request.reviewer_name() {
        document = document.with_block(Block::Paragraph(TextParagraph::new(
            &signature_text(reviewer),
            styles.get(StyleRole::Sign).clone(),
        )));
    }

    document
}
