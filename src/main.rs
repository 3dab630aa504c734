//! bindery - package a book record as EPUB

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bindery::{BookRecord, ExportFormat, Normalizer, Packager, UserSettings};

#[derive(Parser)]
#[command(name = "bindery")]
#[command(version, about = "Package a book record as EPUB", long_about = None)]
#[command(after_help = "EXAMPLES:
    bindery book.json                  Write <title>.epub to the current directory
    bindery book.json out.epub         Write to an explicit path
    bindery book.json -c cover.png     Embed a cover image file
    bindery -i book.json               Show normalized metadata and chapter order")]
struct Cli {
    /// Book record (JSON)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (defaults to the sanitized title in the current directory)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output format: epub, azw3, pdf, markdown
    #[arg(short, long)]
    format: Option<ExportFormat>,

    /// User settings document (JSON)
    #[arg(short, long, value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Cover image file, overrides any coverImage in the record
    #[arg(short, long, value_name = "IMAGE")]
    cover: Option<PathBuf>,

    /// Mime type of the cover file (sniffed when omitted)
    #[arg(long, requires = "cover")]
    cover_type: Option<String>,

    /// Deflate level 0-9
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: Option<u32>,

    /// Show normalized metadata without exporting
    #[arg(short, long)]
    info: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "bindery=warn" } else { "bindery=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = if cli.info { show_info(&cli) } else { export(&cli) };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> bindery::Result<UserSettings> {
    match &cli.settings {
        Some(path) => UserSettings::from_path(path),
        None => Ok(UserSettings::default()),
    }
}

fn load_record(cli: &Cli) -> bindery::Result<BookRecord> {
    let json = read_file(&cli.input)?;
    let mut record = BookRecord::from_json(&String::from_utf8_lossy(&json))?;
    if let Some(path) = &cli.cover {
        let bytes = read_file(path)?;
        record = record.with_cover_file(bytes, cli.cover_type.clone().unwrap_or_default());
    }
    Ok(record)
}

fn read_file(path: &Path) -> bindery::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        bindery::Error::Validation(format!("cannot read {}: {e}", path.display()))
    })
}

fn show_info(cli: &Cli) -> bindery::Result<()> {
    let settings = load_settings(cli)?;
    let input = Normalizer::new()
        .with_defaults(settings.metadata_defaults())
        .normalize(load_record(cli)?)?;

    println!("File: {}", cli.input.display());
    println!("Title: {}", input.title);
    println!("Creator: {}", input.creator);
    println!("Language: {}", input.language);
    println!("Identifier: {}", input.identifier);
    if !input.isbn.is_empty() {
        println!("ISBN: {}", input.isbn);
    }
    if !input.publisher.is_empty() {
        println!("Publisher: {}", input.publisher);
    }
    let desc = input.description.trim();
    if !desc.is_empty() {
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }
    match &input.cover_image {
        Some(cover) => println!("Cover: {} ({} bytes)", cover.mime_type, cover.bytes.len()),
        None => println!("Cover: none"),
    }
    println!("Chapters: {}", input.chapters.len());
    for (i, chapter) in input.sorted_chapters().iter().enumerate() {
        println!("  {}. {} (order {})", i + 1, chapter.title, chapter.order);
    }
    Ok(())
}

fn export(cli: &Cli) -> bindery::Result<()> {
    let settings = load_settings(cli)?;
    let mut packager = Packager::new().with_settings(&settings);
    if let Some(level) = cli.level {
        packager = packager.with_compression_level(level);
    }
    let format = cli.format.unwrap_or(packager.default_format());

    let download = packager.export(load_record(cli)?, format)?;
    let path = match &cli.output {
        Some(path) => {
            download.save_as(path)?;
            path.clone()
        }
        None => download.save_to(".")?,
    };

    if !cli.quiet {
        println!("Wrote {} ({} bytes)", path.display(), download.bytes.len());
    }
    Ok(())
}
