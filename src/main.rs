use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gedcom_pdf::{ConvertOptions, DEFAULT_CACHE_DIR, DEFAULT_LOCALE};

/// Convert a GEDCOM family tree into an HTML and/or PDF document.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// GEDCOM file to read
    file: PathBuf,

    /// Directory for downloaded images
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    cache: PathBuf,

    /// Write the rendered PDF here
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Write the HTML document here
    #[arg(long)]
    html: Option<PathBuf>,

    /// Export every image into this directory as NNN-title.ext
    #[arg(long)]
    images: Option<PathBuf>,

    /// Locale for dates and section labels
    #[arg(long, default_value = DEFAULT_LOCALE)]
    locale: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.pdf.is_none() && cli.html.is_none() && cli.images.is_none() {
        log::warn!("No --pdf, --html or --images given; only checking {}", cli.file.display());
    }

    let options = ConvertOptions {
        source: cli.file,
        cache_dir: std::path::absolute(&cli.cache).unwrap_or(cli.cache),
        html: cli.html,
        pdf: cli.pdf,
        images: cli.images,
        locale: cli.locale,
    };

    match gedcom_pdf::convert(&options) {
        Ok(conversion) => {
            for skipped in &conversion.document.skipped {
                eprintln!("Skipped image {} ({}): {}", skipped.serial, skipped.title, skipped.reason);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
