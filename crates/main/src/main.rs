use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use activity_report::fonts;
use activity_report::{ReportGenerator, ReportRequest};
use clap::{Args, Parser, Subcommand};
use log::info;
use tracing_subscriber::EnvFilter;

/// Largest photo accepted from the command line.
const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Generates single-page committee activity reports as PDF files.
///
/// A Korean-capable TTF font is looked up in `REPORT_FONTS_DIR`, `./fonts` and the usual
/// system font directories. Set `RUST_LOG` to adjust log verbosity.
#[derive(Parser)]
#[command(author, version, about = "Activity report PDF generator")]
struct Cli {
    /// Directory searched first for report fonts.
    #[arg(long, global = true, env = fonts::FONTS_DIR_ENV)]
    fonts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report to a PDF file.
    Generate(GenerateArgs),

    /// Show which font reports are rendered with.
    #[command(aliases = ["health", "font-status"])]
    Font,
}

#[derive(Args)]
struct GenerateArgs {
    /// Committee name.
    #[arg(long)]
    committee: String,

    /// Date, time and place of the activity.
    #[arg(long)]
    datetime_location: String,

    /// Organizing body.
    #[arg(long)]
    organizer: String,

    /// Participants.
    #[arg(long)]
    participants: String,

    /// Activity description; line breaks are kept.
    #[arg(long, required_unless_present = "activity_file", conflicts_with = "activity_file")]
    activity_content: Option<String>,

    /// Read the activity description from a file.
    #[arg(long)]
    activity_file: Option<PathBuf>,

    /// Document title.
    #[arg(long)]
    title: Option<String>,

    /// Reviewer signing the report; `None` or blank omits the signature line.
    #[arg(long)]
    reviewer: Option<String>,

    /// Activity photo (JPEG, PNG, GIF, BMP or WebP).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Output file. Defaults to a timestamped name in `--out-dir`.
    #[arg(long, short, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for the timestamped output file.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Debug)]
enum InputError {
    ImageTooLarge { path: PathBuf, size: u64 },
    UnsupportedImage { path: PathBuf },
    Read { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImageTooLarge { path, size } => write!(
                f,
                "Image {} is {} bytes; the limit is {} bytes",
                path.display(),
                size,
                MAX_IMAGE_BYTES
            ),
            Self::UnsupportedImage { path } => {
                write!(f, "Image {} is not in a supported format", path.display())
            }
            Self::Read { path, .. } => write!(f, "Failed to read {}", path.display()),
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::ImageTooLarge { .. } | Self::UnsupportedImage { .. } => None,
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, InputError> {
    fs::read(path).map_err(|source| InputError::Read {
        path: path.to_owned(),
        source,
    })
}

fn load_image(path: &Path) -> Result<Vec<u8>, InputError> {
    let size = fs::metadata(path)
        .map_err(|source| InputError::Read {
            path: path.to_owned(),
            source,
        })?
        .len();
    check_image_size(path, size)?;

    let bytes = read_file(path)?;
    if image::guess_format(&bytes).is_err() {
        return Err(InputError::UnsupportedImage {
            path: path.to_owned(),
        });
    }
    Ok(bytes)
}

fn check_image_size(path: &Path, size: u64) -> Result<(), InputError> {
    if size > MAX_IMAGE_BYTES {
        return Err(InputError::ImageTooLarge {
            path: path.to_owned(),
            size,
        });
    }
    Ok(())
}

fn default_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("report_{}.pdf", now.format("%Y%m%d_%H%M%S"))
}

fn build_request(args: &GenerateArgs) -> Result<ReportRequest, Box<dyn Error>> {
    let activity = match (&args.activity_content, &args.activity_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => String::from_utf8(read_file(path)?)?,
        (None, None) => String::new(),
    };

    let mut request = ReportRequest::new(
        args.committee.as_str(),
        args.datetime_location.as_str(),
        args.organizer.as_str(),
        args.participants.as_str(),
        activity,
    )
    .with_reviewer(
        args.reviewer
            .as_deref()
            .and_then(ReportRequest::reviewer_from_form),
    );

    if let Some(title) = &args.title {
        request = request.with_title(title.as_str());
    }
    if let Some(path) = &args.image {
        request = request.with_image(load_image(path)?);
    }
    Ok(request)
}

fn generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let request = build_request(&args)?;
    let output = args
        .output
        .unwrap_or_else(|| args.out_dir.join(default_file_name(chrono::Local::now())));

    let pdf = ReportGenerator::from_system_fonts().generate(&request)?;
    fs::write(&output, pdf.into_inner())?;
    info!("Wrote {}", output.display());
    println!("{}", output.display());
    Ok(())
}

fn font_status() -> Result<(), Box<dyn Error>> {
    let font = fonts::resolve();
    println!("font: {}", font.name());
    println!("fallback: {}", font.is_fallback());
    match font.source() {
        Some(path) => println!("source: {}", path.display()),
        None => println!("source: none (reports cannot be rendered)"),
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    fonts::init(cli.fonts_dir.as_deref());

    let result = match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Font => font_status(),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
