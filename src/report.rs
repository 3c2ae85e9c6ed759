//! End-to-end report generation: photo fitting, layout and rendering.

use std::io::Cursor;
use std::sync::Arc;

use log::{info, warn};

use crate::builder::{self, ReportError};
use crate::fonts::{self, ResolvedFont};
use crate::layout;
use crate::model::{ReportDocument, ReportRequest};
use crate::photo::{self, FittedImage};
use crate::styles;

fn request_summary(request: &ReportRequest) -> String {
    format!(
        "title={:?} committee={:?} datetime_location={:?} organizer={:?} participants={:?} activity_content={:?} reviewer={:?} image_bytes={}",
        request.title(),
        request.committee_name(),
        request.datetime_location(),
        request.organizer(),
        request.participants(),
        request.activity_content(),
        request.reviewer_name(),
        request.image().map_or(0, <[u8]>::len),
    )
}

/// Generates activity report PDFs with one resolved font.
///
/// Generators are cheap to clone and can be shared between threads; every call to
/// [`ReportGenerator::generate`] builds its own document.
#[derive(Clone, Debug)]
pub struct ReportGenerator {
    font: Arc<ResolvedFont>,
}

impl ReportGenerator {
    /// Creates a generator that renders with `font`.
    pub fn new(font: Arc<ResolvedFont>) -> Self {
        Self { font }
    }

    /// Creates a generator using the process-wide font resolved from the system.
    pub fn from_system_fonts() -> Self {
        Self::new(fonts::resolve())
    }

    /// Returns the font reports are rendered with.
    pub fn font(&self) -> &ResolvedFont {
        &self.font
    }

    /// Lays out `request` without rendering it.
    pub fn build_document(&self, request: &ReportRequest) -> ReportDocument {
        let styles = styles::derive(&self.font);
        let fitted = photo::fit(request.image());
        match &fitted {
            FittedImage::Fitted(photo) => info!(
                "Photo fitted at {:.1}x{:.1}mm",
                photo.width_mm(),
                photo.height_mm()
            ),
            FittedImage::Degraded(reason) => warn!("Photo cell shows a placeholder: {}", reason),
        }
        layout::build(request, &styles, &fitted)
    }

    /// Generates the PDF for `request`, returning a buffer positioned at its start.
    pub fn generate(&self, request: &ReportRequest) -> Result<Cursor<Vec<u8>>, ReportError> {
        info!("Generating report: {}", request_summary(request));

        let document = self.build_document(request);
        builder::render(document, &self.font)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_system_fonts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;

    fn request() -> ReportRequest {
        ReportRequest::new("환경위원회", "2024-05-01 / 본관", "총무팀", "김철수", "회의")
    }

    #[test]
    fn missing_font_surfaces_as_error() {
        let generator = ReportGenerator::new(Arc::new(ResolvedFont::unavailable()));
        let err = generator.generate(&request()).unwrap_err();
        assert!(matches!(err, ReportError::FontUnavailable { .. }));
    }

    #[test]
    fn build_document_degrades_broken_photo() {
        let generator = ReportGenerator::new(Arc::new(ResolvedFont::unavailable()));
        let document = generator.build_document(&request().with_image(b"not an image".to_vec()));
        let table = document.table().expect("table");
        let cell = table.rows()[5].cells()[1].content();
        assert_eq!(
            cell.as_text().map(|text| text.text()).as_deref(),
            Some(photo::LOAD_FAILED_PLACEHOLDER)
        );
    }

    #[test]
    fn request_log_carries_every_field() {
        let summary = request_summary(
            &request()
                .with_title("분기 활동 보고")
                .with_reviewer(Some("홍길동".to_owned())),
        );
        for expected in [
            "title=\"분기 활동 보고\"",
            "committee=\"환경위원회\"",
            "activity_content=\"회의\"",
            "reviewer=Some(\"홍길동\")",
            "image_bytes=0",
        ] {
            assert!(summary.contains(expected), "{expected} missing from {summary}");
        }
    }

    #[test]
    fn build_document_without_reviewer_ends_with_table() {
        let generator = ReportGenerator::new(Arc::new(ResolvedFont::unavailable()));
        let document = generator.build_document(&request());
        assert!(matches!(document.blocks().last(), Some(Block::Table(_))));
    }
}
