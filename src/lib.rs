pub mod compose;
mod error;
mod fonts;
pub mod gedcom;
pub mod html;
pub mod images;
pub mod layout;
pub mod model;
mod pdf;
pub mod tree;

pub use compose::{Document, Labels, compose};
pub use error::Error;
pub use gedcom::date::{DateLocale, PartialDate};
pub use images::{ImageCache, ImageSource};
pub use pdf::render as render_pdf;
pub use tree::Tree;

use std::path::{Path, PathBuf};
use std::time::Instant;

pub const DEFAULT_LOCALE: &str = "da_DK";
pub const DEFAULT_CACHE_DIR: &str = ".image_cache";

/// Inputs and outputs of one conversion.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub source: PathBuf,
    pub cache_dir: PathBuf,
    pub html: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
    pub images: Option<PathBuf>,
    pub locale: String,
}

impl ConvertOptions {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        ConvertOptions {
            source: source.into(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            html: None,
            pdf: None,
            images: None,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

/// What a conversion produced, for callers that want more than the files.
pub struct Conversion {
    pub tree: Tree,
    pub document: Document,
    pub exported: Vec<PathBuf>,
}

/// Parse, assemble and compose a tree with an arbitrary image source.
pub fn convert_source(
    source: &str,
    images: &dyn ImageSource,
    locale: &str,
) -> Result<(Tree, Document), Error> {
    let date_locale = DateLocale::new(locale)?;
    let tree = Tree::from_source(source)?;
    let document = compose(&tree, images, &date_locale, Labels::for_locale(locale))?;
    Ok((tree, document))
}

pub fn convert(options: &ConvertOptions) -> Result<Conversion, Error> {
    let t0 = Instant::now();

    let date_locale = DateLocale::new(&options.locale)?;
    let tree = Tree::read(&options.source)?;
    let t_parse = t0.elapsed();

    let cache = ImageCache::new(&options.cache_dir);
    let document = compose(&tree, &cache, &date_locale, Labels::for_locale(&options.locale))?;
    let t_compose = t0.elapsed();

    if let Some(path) = &options.html {
        write_output(path, html::to_html(&document).as_bytes())?;
    }
    if let Some(path) = &options.pdf {
        let bytes = pdf::render(&document)?;
        write_output(path, &bytes)?;
    }
    let exported = match &options.images {
        Some(dir) => images::export_images(tree.images(), &cache, dir)?,
        None => Vec::new(),
    };
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, compose={:.1}ms, output={:.1}ms, total={:.1}ms ({} individuals, {} image pages)",
        t_parse.as_secs_f64() * 1000.0,
        (t_compose - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_compose).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        tree.len(),
        document.image_pages.len(),
    );

    Ok(Conversion {
        tree,
        document,
        exported,
    })
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    std::fs::write(path, bytes).map_err(Error::Io)?;
    log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
