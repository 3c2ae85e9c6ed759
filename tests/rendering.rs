use std::io::Read;
use std::sync::Arc;
use std::thread;

use activity_report::fonts::{self, ResolvedFont};
use activity_report::{ReportGenerator, ReportRequest};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use sha2::{Digest, Sha256};

fn system_font() -> Option<Arc<ResolvedFont>> {
    let font = fonts::resolve();
    if font.is_available() {
        Some(font)
    } else {
        None
    }
}

fn skip(test: &str) {
    eprintln!(
        "Skipping {test}: no usable TTF font found. Install a Korean font or set {}.",
        fonts::FONTS_DIR_ENV
    );
}

fn sample_request() -> ReportRequest {
    ReportRequest::new(
        "환경위원회",
        "2024-05-01 14:00 / 본관 3층 회의실",
        "총무팀",
        "김철수, 이영희, 박민수",
        "분리수거 현황 점검\n개선 방안 논의\n\n다음 회의 일정 확정",
    )
}

fn render(generator: &ReportGenerator, request: &ReportRequest) -> Vec<u8> {
    let mut cursor = generator.generate(request).expect("render report");
    let mut bytes = Vec::new();
    cursor.read_to_end(&mut bytes).expect("read rendered bytes");
    bytes
}

/// Noise does not compress, so the encoded PNG stays close to the raw pixel size.
fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x1234_5678;
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("parse rendered pdf")
        .get_pages()
        .len()
}

/// Number of text-showing operators across all pages, one per printed line.
fn text_show_count(bytes: &[u8]) -> usize {
    let document = lopdf::Document::load_mem(bytes).expect("parse rendered pdf");
    document
        .get_pages()
        .values()
        .map(|&page| {
            let content = document.get_page_content(page).expect("page content");
            lopdf::content::Content::decode(&content)
                .expect("decode page content")
                .operations
                .iter()
                .filter(|operation| matches!(operation.operator.as_str(), "Tj" | "TJ"))
                .count()
        })
        .sum()
}

/// Overwrites the values of fields that change from run to run.
fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn blank_between(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while let Some(found) = data[offset..]
            .windows(start.len())
            .position(|window| window == start)
        {
            let value_start = offset + found + start.len();
            let Some(length) = data[value_start..]
                .windows(end.len())
                .position(|window| window == end)
            else {
                break;
            };
            for byte in &mut data[value_start..value_start + length] {
                if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                    *byte = b'0';
                }
            }
            offset = value_start + length + end.len();
        }
    }

    const VOLATILE: [(&[u8], &[u8]); 10] = [
        (b"/CreationDate(", b")"),
        (b"/ModDate(", b")"),
        (b"/ID[", b"]"),
        (b"/Producer(", b")"),
        (b"<xmp:CreateDate>", b"</xmp:CreateDate>"),
        (b"<xmp:ModifyDate>", b"</xmp:ModifyDate>"),
        (b"<xmp:MetadataDate>", b"</xmp:MetadataDate>"),
        (b"<xmpMM:DocumentID>", b"</xmpMM:DocumentID>"),
        (b"<xmpMM:InstanceID>", b"</xmpMM:InstanceID>"),
        (b"<xmpMM:VersionID>", b"</xmpMM:VersionID>"),
    ];

    let mut normalized = bytes.to_vec();
    for (start, end) in VOLATILE {
        blank_between(&mut normalized, start, end);
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn renders_a_pdf_document() {
    let Some(font) = system_font() else {
        return skip("renders_a_pdf_document");
    };
    let generator = ReportGenerator::new(font);
    let bytes = render(&generator, &sample_request());

    assert!(bytes.starts_with(b"%PDF"), "output should carry a PDF header");
    assert!(page_count(&bytes) >= 1);
}

#[test]
fn title_is_written_to_metadata() {
    let Some(font) = system_font() else {
        return skip("title_is_written_to_metadata");
    };
    let generator = ReportGenerator::new(font);
    let bytes = render(
        &generator,
        &sample_request().with_title("Quarterly Activity Record"),
    );

    assert!(bytes
        .windows(b"Quarterly Activity Record".len())
        .any(|window| window == b"Quarterly Activity Record"));
}

#[test]
fn rendering_is_deterministic() {
    let Some(font) = system_font() else {
        return skip("rendering_is_deterministic");
    };
    let generator = ReportGenerator::new(font);
    let request = sample_request().with_reviewer(Some("홍길동".to_owned()));

    let first = render(&generator, &request);
    let second = render(&generator, &request);

    assert_eq!(
        normalized_hash(&first),
        normalized_hash(&second),
        "report renders must match after metadata normalization"
    );
}

#[test]
fn undecodable_photo_still_renders() {
    let Some(font) = system_font() else {
        return skip("undecodable_photo_still_renders");
    };
    let generator = ReportGenerator::new(font);
    let request = sample_request().with_image(b"definitely not an image".to_vec());

    let bytes = render(&generator, &request);
    assert_eq!(page_count(&bytes), 1);
}

#[test]
fn oversized_photo_is_compressed_and_embedded() {
    let Some(font) = system_font() else {
        return skip("oversized_photo_is_compressed_and_embedded");
    };
    let photo = noisy_png(1400, 1000);
    assert!(photo.len() > activity_report::photo::COMPRESSION_THRESHOLD_BYTES);

    let generator = ReportGenerator::new(font);
    let bytes = render(&generator, &sample_request().with_image(photo));
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(page_count(&bytes), 1);
}

#[test]
fn long_activity_text_is_kept_in_full() {
    let Some(font) = system_font() else {
        return skip("long_activity_text_is_kept_in_full");
    };
    let generator = ReportGenerator::new(font);
    let activity = (1..=60)
        .map(|n| format!("{n}. 세부 활동 내용 기록"))
        .collect::<Vec<_>>()
        .join("\n");

    let short = render(
        &generator,
        &ReportRequest::new("위원회", "일시", "주최", "참석자", "1. 세부 활동 내용 기록"),
    );
    let long = render(
        &generator,
        &ReportRequest::new("위원회", "일시", "주최", "참석자", activity),
    );

    assert_eq!(page_count(&long), 1);
    assert!(
        text_show_count(&long) >= text_show_count(&short) + 59,
        "every activity line must be printed: {} vs {}",
        text_show_count(&long),
        text_show_count(&short)
    );
}

#[test]
fn long_participant_list_overflows_its_row() {
    let Some(font) = system_font() else {
        return skip("long_participant_list_overflows_its_row");
    };
    let generator = ReportGenerator::new(font);
    let participants = (1..=40)
        .map(|n| format!("참석자{n:02}"))
        .collect::<Vec<_>>()
        .join(", ");

    let single = render(
        &generator,
        &ReportRequest::new("위원회", "일시", "주최", "참석자01", "회의"),
    );
    let crowded = render(
        &generator,
        &ReportRequest::new("위원회", "일시", "주최", participants, "회의"),
    );

    assert_eq!(page_count(&crowded), 1);
    assert!(text_show_count(&crowded) > text_show_count(&single));
}

#[test]
fn concurrent_generation_produces_independent_documents() {
    let Some(font) = system_font() else {
        return skip("concurrent_generation_produces_independent_documents");
    };
    let generator = ReportGenerator::new(font);

    let outputs: Vec<Vec<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let generator = &generator;
                scope.spawn(move || {
                    let request = sample_request().with_title(format!("Report {n}"));
                    render(generator, &request)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("generation thread"))
            .collect()
    });

    for (n, bytes) in outputs.iter().enumerate() {
        let title = format!("Report {n}");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes
            .windows(title.len())
            .any(|window| window == title.as_bytes()));
    }
}
