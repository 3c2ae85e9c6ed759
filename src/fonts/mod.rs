//! Font resolution for Hangul-capable report rendering.
//!
//! Reports are written in Korean, so the document font must carry Hangul glyphs. The resolver
//! walks a fixed list of candidate files (configured directory, project `fonts/`, then the usual
//! per-OS system locations) and registers the first one `genpdf` can parse. When none is usable
//! it falls back to a Latin system font; Hangul then renders as missing-glyph boxes.
//!
//! Resolution happens once per process. Call [`init`] at startup before handing the font to
//! concurrent workers; [`resolve`] returns the same value on every later call.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::{debug, info, warn};

/// Environment variable naming an extra directory searched before all other locations.
pub const FONTS_DIR_ENV: &str = "REPORT_FONTS_DIR";

/// Logical name reported when not even a Latin fallback file could be loaded.
pub const BUILTIN_FALLBACK_NAME: &str = "Helvetica";

/// File extension of multi-face font collections, which `genpdf` cannot register.
const COLLECTION_EXTENSION: &str = "ttc";

/// Hangul font files looked up inside a configured fonts directory, with their logical names.
const CONFIGURED_DIR_FILES: &[(&str, &str)] = &[
    ("GowunBatang-Regular.ttf", "GowunBatang-Regular"),
    ("malgun.ttf", "MalgunGothic"),
    ("NanumGothic.ttf", "NanumGothic"),
];

static RESOLVED: OnceLock<Arc<ResolvedFont>> = OnceLock::new();

/// A font file together with the logical name it is registered under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontCandidate {
    path: PathBuf,
    name: String,
}

impl FontCandidate {
    /// Creates a candidate for the file at `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Returns the font file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the logical font name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn is_collection(&self) -> bool {
        self.path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(COLLECTION_EXTENSION))
            .unwrap_or(false)
    }
}

/// The font selected for the lifetime of the process.
#[derive(Clone)]
pub struct ResolvedFont {
    name: String,
    is_fallback: bool,
    source: Option<PathBuf>,
    family: Option<FontFamily<FontData>>,
}

impl ResolvedFont {
    fn registered(
        candidate: &FontCandidate,
        family: FontFamily<FontData>,
        is_fallback: bool,
    ) -> Self {
        Self {
            name: candidate.name.clone(),
            is_fallback,
            source: Some(candidate.path.clone()),
            family: Some(family),
        }
    }

    /// A fallback without any loadable font data. Documents cannot be rendered with it.
    pub fn unavailable() -> Self {
        Self {
            name: BUILTIN_FALLBACK_NAME.to_owned(),
            is_fallback: true,
            source: None,
            family: None,
        }
    }

    /// Logical name of the registered font.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the font is a Latin fallback that may lack Hangul glyphs.
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// Path of the registered font file, if one was loaded.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Font family handed to `genpdf` documents, if font data could be loaded.
    pub fn family(&self) -> Option<&FontFamily<FontData>> {
        self.family.as_ref()
    }

    /// Whether documents can be rendered with this font.
    pub fn is_available(&self) -> bool {
        self.family.is_some()
    }
}

impl fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("name", &self.name)
            .field("is_fallback", &self.is_fallback)
            .field("source", &self.source)
            .field("loaded", &self.family.is_some())
            .finish()
    }
}

impl PartialEq for ResolvedFont {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_fallback == other.is_fallback
            && self.source == other.source
    }
}

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|var| env::var_os(var))
        .map(PathBuf::from)
        .find(|path| !path.as_os_str().is_empty())
}

fn env_fonts_dir() -> Option<PathBuf> {
    env::var_os(FONTS_DIR_ENV).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

/// Hangul font candidates in priority order.
///
/// `configured_dir` (usually `REPORT_FONTS_DIR`) comes first, then `fonts/` under the current
/// working directory, then Windows, macOS and Linux system locations.
pub fn font_candidates(configured_dir: Option<&Path>) -> Vec<FontCandidate> {
    let mut candidates = Vec::new();

    if let Some(dir) = configured_dir {
        candidates.extend(
            CONFIGURED_DIR_FILES
                .iter()
                .map(|(file, name)| FontCandidate::new(dir.join(file), *name)),
        );
    }

    let project_fonts = env::current_dir()
        .map(|dir| dir.join("fonts"))
        .unwrap_or_else(|_| PathBuf::from("fonts"));
    candidates.push(FontCandidate::new(
        project_fonts.join("GowunBatang-Regular.ttf"),
        "GowunBatang-Regular",
    ));
    candidates.push(FontCandidate::new(project_fonts.join("malgun.ttf"), "MalgunGothic"));

    candidates.push(FontCandidate::new("C:/Windows/Fonts/malgun.ttf", "MalgunGothic"));
    candidates.push(FontCandidate::new("C:/Windows/Fonts/malgunbd.ttf", "MalgunGothicBold"));

    candidates.push(FontCandidate::new("/Library/Fonts/NanumGothic.ttf", "NanumGothic"));
    if let Some(home) = home_dir() {
        candidates.push(FontCandidate::new(
            home.join("Library/Fonts/NanumGothic.ttf"),
            "NanumGothic",
        ));
    }

    candidates.push(FontCandidate::new(
        "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
        "NanumGothic",
    ));

    candidates
}

/// Latin fonts used for metrics and glyphs when no Hangul font is available.
pub fn fallback_candidates() -> Vec<FontCandidate> {
    vec![
        FontCandidate::new(
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "LiberationSans",
        ),
        FontCandidate::new(
            "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
            "LiberationSans",
        ),
        FontCandidate::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf", "DejaVuSans"),
        FontCandidate::new("/usr/share/fonts/TTF/DejaVuSans.ttf", "DejaVuSans"),
        FontCandidate::new("/usr/share/fonts/dejavu/DejaVuSans.ttf", "DejaVuSans"),
        FontCandidate::new("/Library/Fonts/Arial.ttf", "Arial"),
        FontCandidate::new("/System/Library/Fonts/Supplemental/Arial.ttf", "Arial"),
        FontCandidate::new("C:/Windows/Fonts/arial.ttf", "Arial"),
    ]
}

/// Parses the font file into a family that uses the same face for every style.
fn register(candidate: &FontCandidate) -> Result<FontFamily<FontData>, Error> {
    let data = FontData::load(&candidate.path, None)?;
    Ok(FontFamily {
        regular: data.clone(),
        bold: data.clone(),
        italic: data.clone(),
        bold_italic: data,
    })
}

fn first_registered(
    candidates: &[FontCandidate],
) -> Option<(&FontCandidate, FontFamily<FontData>)> {
    for candidate in candidates {
        if !candidate.path.is_file() {
            debug!("Font not found: {}", candidate.path.display());
            continue;
        }

        if candidate.is_collection() {
            info!(
                "Skipping font collection {} (.ttc files are not supported)",
                candidate.path.display()
            );
            continue;
        }

        match register(candidate) {
            Ok(family) => {
                info!(
                    "Registered font {} -> {}",
                    candidate.path.display(),
                    candidate.name
                );
                return Some((candidate, family));
            }
            Err(err) => {
                warn!(
                    "Failed to register font {}: {}",
                    candidate.path.display(),
                    err
                );
            }
        }
    }

    None
}

/// Resolves a font from explicit candidate lists without touching the process-wide cache.
pub fn resolve_from(candidates: &[FontCandidate], fallbacks: &[FontCandidate]) -> ResolvedFont {
    if let Some((candidate, family)) = first_registered(candidates) {
        return ResolvedFont::registered(candidate, family, false);
    }

    warn!("No Hangul font could be registered; falling back to a Latin default font");

    match first_registered(fallbacks) {
        Some((candidate, family)) => ResolvedFont::registered(candidate, family, true),
        None => {
            warn!(
                "No fallback font file found either; reports cannot be rendered until a font is installed or {} is set",
                FONTS_DIR_ENV
            );
            ResolvedFont::unavailable()
        }
    }
}

/// Resolves the process font once, searching `configured_dir` first.
///
/// Only the first call performs resolution; later calls return the cached value and ignore
/// their argument.
pub fn init(configured_dir: Option<&Path>) -> Arc<ResolvedFont> {
    RESOLVED
        .get_or_init(|| {
            Arc::new(resolve_from(
                &font_candidates(configured_dir),
                &fallback_candidates(),
            ))
        })
        .clone()
}

/// Returns the process font, resolving it on first use with `REPORT_FONTS_DIR`.
pub fn resolve() -> Arc<ResolvedFont> {
    if let Some(font) = RESOLVED.get() {
        return font.clone();
    }
    init(env_fonts_dir().as_deref())
}
