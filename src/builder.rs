//! Assembly of `genpdf` documents from laid-out reports.

use std::io::Cursor;

use genpdf::error::Error;
use genpdf::style;
use genpdf::{self, Margins, Mm, PageDecorator, Size};
use log::{debug, info};

use crate::elements::{FixedTable, TextBlock};
use crate::fonts::ResolvedFont;
use crate::model::{Block, PageGeometry, ReportDocument};

/// Errors that can occur while turning a report into PDF bytes.
#[derive(Debug)]
pub enum ReportError {
    /// No font file could be loaded, so text cannot be measured or embedded.
    FontUnavailable {
        /// Name of the font the resolver settled on.
        name: String,
    },
    /// `genpdf` failed while laying out or writing the document.
    Render(Error),
    /// The output buffer could not be written.
    Io(std::io::Error),
}

impl From<Error> for ReportError {
    fn from(err: Error) -> Self {
        Self::Render(err)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FontUnavailable { name } => write!(
                f,
                "No embeddable font is available (resolved to {name}); install a Korean TTF font or set REPORT_FONTS_DIR"
            ),
            Self::Render(err) => write!(f, "Failed to render PDF: {err}"),
            Self::Io(err) => write!(f, "Failed to write PDF output: {err}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FontUnavailable { .. } => None,
            Self::Render(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

fn mm(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// Builder for `genpdf::Document` instances configured from a [`PageGeometry`].
pub struct DocumentBuilder {
    title: String,
    geometry: PageGeometry,
}

impl DocumentBuilder {
    /// Creates a builder for an A4 report with the given metadata title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            geometry: PageGeometry::default(),
        }
    }

    /// Sets paper size and margins.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Builds an empty document that uses `font` for every text style.
    pub fn build(self, font: &ResolvedFont) -> Result<genpdf::Document, ReportError> {
        let family = font.family().ok_or_else(|| ReportError::FontUnavailable {
            name: font.name().to_owned(),
        })?;

        let mut document = genpdf::Document::new(family.clone());
        document.set_title(self.title);
        document.set_paper_size(Size::new(
            mm(self.geometry.width),
            mm(self.geometry.height),
        ));
        document.set_page_decorator(ReportPageDecorator::new(&self.geometry));
        Ok(document)
    }
}

/// Applies the report margins and keeps count of the pages produced.
struct ReportPageDecorator {
    page: usize,
    margins: Margins,
}

impl ReportPageDecorator {
    fn new(geometry: &PageGeometry) -> Self {
        Self {
            page: 0,
            margins: Margins::trbl(
                mm(geometry.margin_top),
                mm(geometry.margin_right),
                mm(geometry.margin_bottom),
                mm(geometry.margin_left),
            ),
        }
    }
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        _context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        _style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        debug!("Starting page {}", self.page);
        area.add_margins(self.margins);
        Ok(area)
    }
}

/// Renders a laid-out report into an in-memory PDF positioned at its start.
pub fn render(
    document: ReportDocument,
    font: &ResolvedFont,
) -> Result<Cursor<Vec<u8>>, ReportError> {
    let mut pdf = DocumentBuilder::new(document.title())
        .with_geometry(document.geometry())
        .build(font)?;

    for block in document.into_blocks() {
        match block {
            Block::Paragraph(paragraph) => pdf.push(TextBlock::flowing(paragraph)),
            Block::Table(table) => pdf.push(FixedTable::new(table)),
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    pdf.render(&mut buffer)?;
    info!("Rendered PDF ({} bytes)", buffer.get_ref().len());
    buffer.set_position(0);
    Ok(buffer)
}
