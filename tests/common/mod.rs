#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gedcom_pdf::{Error, ImageSource};

pub const FAMILY: &str = include_str!("../fixtures/family.ged");

/// The family fixture with image paths pointing into `dir`.
pub fn family_source(dir: &Path) -> String {
    FAMILY.replace("{DIR}", &dir.to_string_lossy())
}

/// Write a solid-colour PNG of the given pixel size.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 90, 60]));
    img.save(&path).expect("write test png");
    path
}

/// Create the images the family fixture refers to (peter.png is left out on purpose).
pub fn write_family_images(dir: &Path) {
    write_png(dir, "anna.png", 300, 200);
    write_png(dir, "karen.png", 100, 200);
}

/// In-memory image source: fixed dimensions per URL, everything else fails.
#[derive(Default)]
pub struct StubImages {
    dims: HashMap<String, (u32, u32)>,
    pub requests: RefCell<Vec<String>>,
}

impl StubImages {
    pub fn with(mut self, url: &str, width: u32, height: u32) -> Self {
        self.dims.insert(url.to_string(), (width, height));
        self
    }
}

impl ImageSource for StubImages {
    fn local_path(&self, url: &str) -> Result<PathBuf, Error> {
        self.requests.borrow_mut().push(url.to_string());
        if self.dims.contains_key(url) {
            Ok(PathBuf::from(url))
        } else {
            Err(Error::ImageAccess {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    fn dimensions(&self, url: &str) -> Result<(u32, u32), Error> {
        self.local_path(url)?;
        Ok(self.dims[url])
    }
}

/// Build a minimal individual record.
pub fn person(xref: &str, given: &str, surname: &str, birth: Option<&str>) -> String {
    let mut out = format!("0 {xref} INDI\n1 NAME {given} /{surname}/\n2 GIVN {given}\n2 SURN {surname}\n");
    if let Some(date) = birth {
        out.push_str(&format!("1 BIRT\n2 DATE {date}\n"));
    }
    out
}
