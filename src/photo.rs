//! Activity photo processing: compression to a byte budget and fitting into the photo cell.
//!
//! Photo problems never abort a report. Missing or undecodable input produces
//! [`FittedImage::Degraded`] with a [`Degradation`] reason, which the layout renders as
//! placeholder text.

use std::borrow::Cow;
use std::fmt;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageError};
use log::{info, warn};

/// Byte size above which photos are re-encoded as JPEG (2.0 MiB).
pub const COMPRESSION_THRESHOLD_BYTES: usize = 2 * 1024 * 1024;

/// First JPEG quality tried when compressing.
pub const INITIAL_QUALITY: u8 = 85;

/// Quality decrement between compression passes.
pub const QUALITY_STEP: u8 = 10;

/// Lowest JPEG quality the compressor will use.
pub const MIN_QUALITY: u8 = 30;

/// Resolution at which fitted photos are embedded.
pub const EMBED_DPI: f64 = 300.0;

const MM_PER_INCH: f64 = 25.4;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Placeholder shown when no photo was attached.
pub const MISSING_PLACEHOLDER: &str = "첨부된 이미지가 없습니다";

/// Placeholder shown when the attached photo could not be processed.
pub const LOAD_FAILED_PLACEHOLDER: &str = "이미지 로드 실패";

/// Bounding box for fitted photos, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitBounds {
    /// Maximum width of the box.
    pub max_width: f64,
    /// Maximum height of the box.
    pub max_height: f64,
    /// Width below which a fitted photo is scaled up.
    pub min_width: f64,
}

impl Default for FitBounds {
    fn default() -> Self {
        Self {
            max_width: 135.0,
            max_height: 115.0,
            min_width: 80.0,
        }
    }
}

impl FitBounds {
    fn aspect(&self) -> f64 {
        self.max_width / self.max_height
    }
}

/// Why a photo could not be placed in the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Degradation {
    /// The request carried no photo.
    Missing,
    /// The photo could not be decoded or resized.
    LoadFailed(String),
}

impl Degradation {
    /// Placeholder text rendered in place of the photo.
    pub fn placeholder_text(&self) -> &'static str {
        match self {
            Degradation::Missing => MISSING_PLACEHOLDER,
            Degradation::LoadFailed(_) => LOAD_FAILED_PLACEHOLDER,
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::Missing => write!(f, "no photo attached"),
            Degradation::LoadFailed(reason) => write!(f, "photo could not be loaded: {reason}"),
        }
    }
}

/// Outcome of a JPEG compression run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionReport {
    /// Size of the source bytes.
    pub original_len: usize,
    /// Size of the final JPEG.
    pub compressed_len: usize,
    /// Quality of the final JPEG.
    pub quality: u8,
    /// Number of encoder runs.
    pub passes: usize,
}

/// A photo ready to be placed, with its display size in millimetres.
#[derive(Clone)]
pub struct FittedPhoto {
    image: DynamicImage,
    width_mm: f64,
    height_mm: f64,
    compression: Option<CompressionReport>,
}

impl FittedPhoto {
    /// Pixels to embed. Always opaque RGB or greyscale.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Returns the display width in millimetres.
    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    /// Returns the display height in millimetres.
    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    /// Compression details, if the source exceeded the byte threshold.
    pub fn compression(&self) -> Option<CompressionReport> {
        self.compression
    }
}

impl fmt::Debug for FittedPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedPhoto")
            .field("pixels", &self.image.dimensions())
            .field("width_mm", &self.width_mm)
            .field("height_mm", &self.height_mm)
            .field("compression", &self.compression)
            .finish()
    }
}

/// A fitted photo or the reason it is replaced by a placeholder.
#[derive(Clone, Debug)]
pub enum FittedImage {
    /// The photo decoded and was sized for the cell.
    Fitted(FittedPhoto),
    /// The photo is absent or unusable.
    Degraded(Degradation),
}

impl FittedImage {
    /// Returns the fitted photo, if any.
    pub fn photo(&self) -> Option<&FittedPhoto> {
        match self {
            FittedImage::Fitted(photo) => Some(photo),
            FittedImage::Degraded(_) => None,
        }
    }

    /// Returns the degradation reason, if the photo is not available.
    pub fn degradation(&self) -> Option<&Degradation> {
        match self {
            FittedImage::Fitted(_) => None,
            FittedImage::Degraded(reason) => Some(reason),
        }
    }
}

/// Compressed image bytes. Borrowed when the source was already within budget.
#[derive(Debug)]
pub struct Compressed<'a> {
    pub bytes: Cow<'a, [u8]>,
    pub report: Option<CompressionReport>,
}

/// Returns the `APP1` Exif segment (marker included) of a JPEG, if present.
fn exif_segment(bytes: &[u8]) -> Option<&[u8]> {
    if !bytes.starts_with(&JPEG_SOI) {
        return None;
    }

    let mut index = 2;
    while index + 4 <= bytes.len() {
        if bytes[index] != 0xFF {
            return None;
        }
        let marker = bytes[index + 1];
        // Start of scan: no more metadata segments follow.
        if marker == 0xDA {
            return None;
        }
        let length = u16::from_be_bytes([bytes[index + 2], bytes[index + 3]]) as usize;
        let end = index + 2 + length;
        if length < 2 || end > bytes.len() {
            return None;
        }
        if marker == 0xE1 && bytes[index + 4..end].starts_with(EXIF_HEADER) {
            return Some(&bytes[index..end]);
        }
        index = end;
    }

    None
}

/// Inserts `segment` directly after the JPEG start-of-image marker.
fn with_exif_segment(jpeg: Vec<u8>, segment: Option<&[u8]>) -> Vec<u8> {
    match segment {
        Some(segment) if jpeg.starts_with(&JPEG_SOI) => {
            let mut out = Vec::with_capacity(jpeg.len() + segment.len());
            out.extend_from_slice(&JPEG_SOI);
            out.extend_from_slice(segment);
            out.extend_from_slice(&jpeg[2..]);
            out
        }
        _ => jpeg,
    }
}

/// JPEG has no alpha or palette support; everything except greyscale becomes opaque RGB.
fn jpeg_ready(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image.clone(),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let (width, height) = image.dimensions();
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        match image {
            DynamicImage::ImageLuma8(luma) => {
                encoder.encode(luma.as_raw(), width, height, ColorType::L8)?
            }
            other => {
                let rgb = other.to_rgb8();
                encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb8)?
            }
        }
    }
    Ok(buffer)
}

fn next_quality(quality: u8) -> u8 {
    quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY)
}

fn mebibytes(len: usize) -> String {
    format!("{:.1}MiB", len as f64 / (1024.0 * 1024.0))
}

/// Re-encodes `image` (decoded from `source`) as JPEG until it fits into `limit` bytes.
///
/// Sources at or under the limit are returned unchanged. Otherwise quality starts at
/// [`INITIAL_QUALITY`] and drops by [`QUALITY_STEP`] per pass, never below [`MIN_QUALITY`].
pub fn compress<'a>(
    source: &'a [u8],
    image: &DynamicImage,
    limit: usize,
) -> Result<Compressed<'a>, ImageError> {
    if source.len() <= limit {
        return Ok(Compressed {
            bytes: Cow::Borrowed(source),
            report: None,
        });
    }

    let exif = exif_segment(source);
    let prepared = jpeg_ready(image);
    let mut quality = INITIAL_QUALITY;
    let mut passes = 1;
    let mut encoded = with_exif_segment(encode_jpeg(&prepared, quality)?, exif);

    while encoded.len() > limit && quality > MIN_QUALITY {
        quality = next_quality(quality);
        passes += 1;
        encoded = with_exif_segment(encode_jpeg(&prepared, quality)?, exif);
    }

    let report = CompressionReport {
        original_len: source.len(),
        compressed_len: encoded.len(),
        quality,
        passes,
    };
    info!(
        "Compressed photo {} -> {} (quality {}, {} passes)",
        mebibytes(report.original_len),
        mebibytes(report.compressed_len),
        report.quality,
        report.passes
    );

    Ok(Compressed {
        bytes: Cow::Owned(encoded),
        report: Some(report),
    })
}

/// Computes the display size in millimetres for a `width_px` × `height_px` image.
///
/// Wide images are bound to the box width, tall ones to the box height. Results narrower than
/// `bounds.min_width` are scaled up uniformly, which may exceed the box height.
pub fn fit_dimensions(width_px: u32, height_px: u32, bounds: FitBounds) -> Option<(f64, f64)> {
    if width_px == 0 || height_px == 0 {
        return None;
    }

    let aspect = f64::from(width_px) / f64::from(height_px);
    let (mut width, mut height) = if aspect > bounds.aspect() {
        (bounds.max_width, bounds.max_width / aspect)
    } else {
        (bounds.max_height * aspect, bounds.max_height)
    };

    if width < bounds.min_width {
        let scale = bounds.min_width / width;
        width *= scale;
        height *= scale;
    }

    Some((width, height))
}

/// Downsamples `image` so it carries no more pixels than the display size needs at [`EMBED_DPI`].
fn limit_resolution(image: DynamicImage, width_mm: f64, height_mm: f64) -> DynamicImage {
    let max_width = (width_mm / MM_PER_INCH * EMBED_DPI).ceil().max(1.0) as u32;
    let max_height = (height_mm / MM_PER_INCH * EMBED_DPI).ceil().max(1.0) as u32;
    let (width, height) = image.dimensions();
    if width <= max_width && height <= max_height {
        image
    } else {
        image.resize(max_width, max_height, FilterType::Triangle)
    }
}

fn load_failed(reason: impl fmt::Display) -> FittedImage {
    let degradation = Degradation::LoadFailed(reason.to_string());
    warn!("Photo replaced by placeholder: {}", degradation);
    FittedImage::Degraded(degradation)
}

/// Compresses and fits the optional photo bytes using the default bounds and threshold.
pub fn fit(raw: Option<&[u8]>) -> FittedImage {
    fit_with(raw, FitBounds::default(), COMPRESSION_THRESHOLD_BYTES)
}

/// Compresses `raw` to `limit` bytes and fits it into `bounds`.
pub fn fit_with(raw: Option<&[u8]>, bounds: FitBounds, limit: usize) -> FittedImage {
    let raw = match raw {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return FittedImage::Degraded(Degradation::Missing),
    };

    let decoded = match image::load_from_memory(raw) {
        Ok(image) => image,
        Err(err) => return load_failed(err),
    };

    let (image, compression) = match compress(raw, &decoded, limit) {
        Ok(Compressed {
            bytes: Cow::Owned(jpeg),
            report,
        }) => match image::load_from_memory(&jpeg) {
            Ok(image) => (image, report),
            Err(err) => return load_failed(err),
        },
        Ok(Compressed { report, .. }) => (decoded, report),
        Err(err) => {
            warn!("Photo compression failed, using the original: {}", err);
            (decoded, None)
        }
    };

    let (width_px, height_px) = image.dimensions();
    let Some((width_mm, height_mm)) = fit_dimensions(width_px, height_px, bounds) else {
        return load_failed(format!("image has no area ({width_px}x{height_px})"));
    };

    let image = jpeg_ready(&limit_resolution(image, width_mm, height_mm));

    FittedImage::Fitted(FittedPhoto {
        image,
        width_mm,
        height_mm,
        compression,
    })
}
