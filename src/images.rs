use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;

use crate::error::Error;
use crate::model::Image;

/// Where image bytes come from. Implementations must hand out the same local
/// path for repeated requests of a URL without fetching it again.
pub trait ImageSource {
    fn local_path(&self, url: &str) -> Result<PathBuf, Error>;

    /// Pixel width and height.
    fn dimensions(&self, url: &str) -> Result<(u32, u32), Error> {
        let path = self.local_path(url)?;
        image::image_dimensions(&path).map_err(|e| access_error(url, e))
    }
}

fn access_error(url: &str, reason: impl ToString) -> Error {
    Error::ImageAccess {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

static CACHE_NAME_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\d.]+").unwrap());

/// File name an URL is cached under inside the cache directory.
pub fn cache_file_name(url: &str) -> String {
    CACHE_NAME_UNSAFE.replace_all(url, "_").into_owned()
}

/// Downloads remote images once into a cache directory. Local paths and
/// `file:` URLs are used in place.
pub struct ImageCache {
    dir: PathBuf,
    client: OnceCell<reqwest::blocking::Client>,
    resolved: RefCell<HashMap<String, PathBuf>>,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ImageCache {
            dir: dir.into(),
            client: OnceCell::new(),
            resolved: RefCell::new(HashMap::new()),
        }
    }

    fn fetch(&self, url: &str) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(&self.dir).map_err(|e| access_error(url, e))?;
        let cached = self.dir.join(cache_file_name(url));
        if cached.exists() {
            log::debug!("Cache hit for {url}: {}", cached.display());
            return Ok(cached);
        }

        log::info!("Fetching {url}");
        let client = self
            .client
            .get_or_try_init(|| reqwest::blocking::Client::builder().build())
            .map_err(|e| access_error(url, e))?;
        let response = client.get(url).send().map_err(|e| access_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(access_error(url, format!("server responded {status}")));
        }
        let bytes = response.bytes().map_err(|e| access_error(url, e))?;

        // Write-then-rename: an interrupted download never looks like a cache hit.
        let partial = self.dir.join(format!("{}.part", cache_file_name(url)));
        std::fs::write(&partial, &bytes)
            .and_then(|()| std::fs::rename(&partial, &cached))
            .map_err(|e| {
                let _ = std::fs::remove_file(&partial);
                access_error(url, e)
            })?;
        log::debug!("Fetched {} bytes into {}", bytes.len(), cached.display());
        Ok(cached)
    }
}

fn local_file(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if let Some(rest) = url.strip_prefix("file:") {
        return Some(PathBuf::from(rest));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return None;
    }
    Some(PathBuf::from(url))
}

impl ImageSource for ImageCache {
    fn local_path(&self, url: &str) -> Result<PathBuf, Error> {
        if let Some(path) = self.resolved.borrow().get(url) {
            return Ok(path.clone());
        }
        let path = match local_file(url) {
            Some(path) if path.is_file() => path,
            Some(path) => {
                return Err(access_error(url, format!("{} does not exist", path.display())));
            }
            None => self.fetch(url)?,
        };
        self.resolved
            .borrow_mut()
            .insert(url.to_string(), path.clone());
        Ok(path)
    }
}

static TITLE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\d]+").unwrap());

/// Lower-case, file-name friendly form of an image title.
pub fn simplify_title(title: &str) -> String {
    let dashed = TITLE_UNSAFE.replace_all(&title.to_lowercase(), "-").into_owned();
    let mut out = String::with_capacity(dashed.len());
    for c in dashed.chars() {
        match c {
            'å' => out.push_str("aa"),
            'ø' => out.push_str("oe"),
            'æ' => out.push_str("ae"),
            _ => out.push(c),
        }
    }
    out
}

/// Export file name: `NNN-title.ext`, NNN being the global image serial.
pub fn export_file_name(serial: u32, title: &str, source: &Path) -> String {
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{serial:03}-{}{ext}", simplify_title(title))
}

/// Copy every image into `dir` under its export name. Images that cannot be
/// accessed are skipped with a warning.
pub fn export_images<'a>(
    images: impl IntoIterator<Item = &'a Image>,
    source: &dyn ImageSource,
    dir: &Path,
) -> Result<Vec<PathBuf>, Error> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (index, image) in images.into_iter().enumerate() {
        let serial = image.serial().unwrap_or(index as u32 + 1);
        let src = match source.local_path(&image.url) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Not exporting image {serial} ({}): {e}", image.title);
                continue;
            }
        };
        let dest = dir.join(export_file_name(serial, &image.title, &src));
        std::fs::copy(&src, &dest)?;
        written.push(dest);
    }
    log::info!("Exported {} images to {}", written.len(), dir.display());
    Ok(written)
}
