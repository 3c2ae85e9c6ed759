//! Activity report PDF generation on top of `genpdf`.
//!
//! A [`ReportRequest`] describes one committee activity. [`ReportGenerator::generate`] fits the
//! optional photo, lays out the fixed six-row record table and renders an A4 PDF using the first
//! Korean-capable font found on the system.

pub mod builder;
pub mod elements;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod photo;
pub mod report;
pub mod styles;

pub use builder::ReportError;
pub use fonts::ResolvedFont;
pub use model::ReportRequest;
pub use report::ReportGenerator;
