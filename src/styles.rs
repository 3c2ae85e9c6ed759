//! Named text styles used by the report layout.
//!
//! The catalog is a small, fixed table of style descriptors keyed by [`StyleRole`]. Descriptors are
//! plain values measured in points so they can be inspected in tests; the element layer converts
//! them into [`genpdf::style::Style`] and millimetre offsets when rendering.

use genpdf::style::{Color, Style};

use crate::fonts::ResolvedFont;

const MM_PER_POINT: f64 = 25.4 / 72.0;

/// Converts typographic points to millimetres.
pub fn pt_to_mm(points: f64) -> f64 {
    points * MM_PER_POINT
}

/// Horizontal placement of text within its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// The roles a piece of report text can play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleRole {
    /// Document title above the table.
    Title,
    /// Creation date line. Kept in the catalog, not placed by the current layout.
    Date,
    /// Label column of the record table.
    Header,
    /// Value column of the record table.
    Content,
    /// Reviewer signature line below the table.
    Sign,
}

impl StyleRole {
    /// All roles in catalog order.
    pub const ALL: [StyleRole; 5] = [
        StyleRole::Title,
        StyleRole::Date,
        StyleRole::Header,
        StyleRole::Content,
        StyleRole::Sign,
    ];

    /// Short lowercase name of the role.
    pub fn name(self) -> &'static str {
        match self {
            StyleRole::Title => "title",
            StyleRole::Date => "date",
            StyleRole::Header => "header",
            StyleRole::Content => "content",
            StyleRole::Sign => "sign",
        }
    }
}

/// Style descriptor for one text role. Sizes and spacing are in points.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    font_name: String,
    font_size: u8,
    color: Color,
    alignment: HorizontalAlignment,
    leading: f64,
    space_before: f64,
    space_after: f64,
    left_indent: f64,
}

impl TextStyle {
    fn new(font_name: &str, font_size: u8, color: Color, alignment: HorizontalAlignment) -> Self {
        Self {
            font_name: font_name.to_owned(),
            font_size,
            color,
            alignment,
            leading: f64::from(font_size) * 1.2,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
        }
    }

    fn with_leading(mut self, leading: f64) -> Self {
        self.leading = leading;
        self
    }

    fn with_space_before(mut self, space: f64) -> Self {
        self.space_before = space;
        self
    }

    fn with_space_after(mut self, space: f64) -> Self {
        self.space_after = space;
        self
    }

    fn with_left_indent(mut self, indent: f64) -> Self {
        self.left_indent = indent;
        self
    }

    /// Returns the name of the font family.
    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    /// Returns the font size in points.
    pub fn font_size(&self) -> u8 {
        self.font_size
    }

    /// Returns the text color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Returns the horizontal alignment of each line.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Baseline-to-baseline distance in points.
    pub fn leading(&self) -> f64 {
        self.leading
    }

    /// Returns the space above the paragraph in points.
    pub fn space_before(&self) -> f64 {
        self.space_before
    }

    /// Returns the space below the paragraph in points.
    pub fn space_after(&self) -> f64 {
        self.space_after
    }

    /// Returns the left indent in points.
    pub fn left_indent(&self) -> f64 {
        self.left_indent
    }

    /// Builds the `genpdf` style carrying size and color. The font itself is the document default.
    pub fn to_style(&self) -> Style {
        Style::new()
            .with_font_size(self.font_size)
            .with_color(self.color)
    }
}

/// The full set of report styles derived from one resolved font.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleSet {
    title: TextStyle,
    date: TextStyle,
    header: TextStyle,
    content: TextStyle,
    sign: TextStyle,
}

impl StyleSet {
    /// Returns the descriptor for `role`.
    pub fn get(&self, role: StyleRole) -> &TextStyle {
        match role {
            StyleRole::Title => &self.title,
            StyleRole::Date => &self.date,
            StyleRole::Header => &self.header,
            StyleRole::Content => &self.content,
            StyleRole::Sign => &self.sign,
        }
    }
}

const DARK: Color = Color::Rgb(0x2c, 0x3e, 0x50);
const GRAY: Color = Color::Rgb(0x7f, 0x8c, 0x8d);
const WHITE: Color = Color::Rgb(0xff, 0xff, 0xff);

/// Derives the report styles for `font`.
///
/// With a fallback font the styles are the same; glyphs the font lacks simply render as boxes.
pub fn derive(font: &ResolvedFont) -> StyleSet {
    let name = font.name();
    StyleSet {
        title: TextStyle::new(name, 24, DARK, HorizontalAlignment::Center)
            .with_leading(29.0)
            .with_space_after(20.0),
        date: TextStyle::new(name, 10, GRAY, HorizontalAlignment::Center).with_leading(12.0),
        header: TextStyle::new(name, 11, WHITE, HorizontalAlignment::Center).with_leading(14.0),
        content: TextStyle::new(name, 11, DARK, HorizontalAlignment::Left)
            .with_leading(14.0)
            .with_left_indent(10.0),
        sign: TextStyle::new(name, 11, DARK, HorizontalAlignment::Right)
            .with_leading(12.0)
            .with_space_before(10.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_uses_the_resolved_font() {
        let font = ResolvedFont::unavailable();
        let styles = derive(&font);
        for role in StyleRole::ALL {
            assert_eq!(styles.get(role).font_name(), font.name(), "{}", role.name());
        }
    }

    #[test]
    fn role_constants_match_the_report_design() {
        let styles = derive(&ResolvedFont::unavailable());

        let title = styles.get(StyleRole::Title);
        assert_eq!(title.font_size(), 24);
        assert_eq!(title.alignment(), HorizontalAlignment::Center);
        assert_eq!(title.space_after(), 20.0);

        let header = styles.get(StyleRole::Header);
        assert_eq!(header.color(), Color::Rgb(255, 255, 255));
        assert_eq!(header.alignment(), HorizontalAlignment::Center);

        let content = styles.get(StyleRole::Content);
        assert_eq!(content.alignment(), HorizontalAlignment::Left);
        assert_eq!(content.left_indent(), 10.0);
        assert_eq!(content.leading(), 14.0);

        let sign = styles.get(StyleRole::Sign);
        assert_eq!(sign.alignment(), HorizontalAlignment::Right);
        assert_eq!(sign.space_before(), 10.0);

        assert_eq!(styles.get(StyleRole::Date).font_size(), 10);
    }

    #[test]
    fn derivation_is_deterministic() {
        let font = ResolvedFont::unavailable();
        assert_eq!(derive(&font), derive(&font));
    }

    #[test]
    fn points_convert_to_millimetres() {
        assert!((pt_to_mm(72.0) - 25.4).abs() < 1e-9);
    }
}
