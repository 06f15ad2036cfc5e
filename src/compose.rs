//! Builds the structured document from an assembled tree: one block per
//! individual in roster order, then one page per image in serial order.

use std::path::PathBuf;

use crate::error::Error;
use crate::gedcom::date::DateLocale;
use crate::images::ImageSource;
use crate::layout::{Placement, place_on_a4};
use crate::model::{Image, Individual};
use crate::tree::Tree;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels {
    pub parents: &'static str,
    pub children: &'static str,
    pub images: &'static str,
}

impl Labels {
    pub fn for_locale(tag: &str) -> Self {
        if tag.starts_with("en") {
            Labels {
                parents: "Parents",
                children: "Children",
                images: "Images",
            }
        } else {
            Labels {
                parents: "Forældre",
                children: "Børn",
                images: "Billeder",
            }
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Labels::for_locale("da")
    }
}

pub const BIRTH_MARKER: char = '★';
pub const DEATH_MARKER: char = '✝';
pub const BULLET: char = '•';

/// Name line for an individual, as used in headings and relation lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub name: String,
    pub serial: Option<u32>,
    pub birth: Option<String>,
    pub death: Option<String>,
}

impl Summary {
    fn of(person: &Individual, locale: &DateLocale) -> Self {
        Summary {
            name: person.name().to_string(),
            serial: person.serial(),
            birth: person.birth().map(|d| d.format(locale)),
            death: person.death().map(|d| d.format(locale)),
        }
    }

    /// `(birth-death)`, present when at least one of the dates is known.
    pub fn lifespan(&self) -> Option<String> {
        if self.birth.is_none() && self.death.is_none() {
            return None;
        }
        Some(format!(
            "({}-{})",
            self.birth.as_deref().unwrap_or(""),
            self.death.as_deref().unwrap_or("")
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEntry {
    pub serial: u32,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonBlock {
    pub xref: String,
    pub summary: Summary,
    pub parents: Vec<Summary>,
    pub children: Vec<Summary>,
    pub images: Vec<ImageEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImagePage {
    pub serial: u32,
    pub title: String,
    pub path: PathBuf,
    pub placement: Placement,
    pub note: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedImage {
    pub serial: u32,
    pub title: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub labels: Labels,
    pub people: Vec<PersonBlock>,
    pub image_pages: Vec<ImagePage>,
    pub skipped: Vec<SkippedImage>,
}

pub fn compose(
    tree: &Tree,
    source: &dyn ImageSource,
    locale: &DateLocale,
    labels: Labels,
) -> Result<Document, Error> {
    let mut people = Vec::with_capacity(tree.len());
    let mut image_pages = Vec::new();
    let mut skipped = Vec::new();

    for person in tree.roster() {
        people.push(person_block(tree, person, locale)?);

        for image in person.images() {
            let serial = image.serial().unwrap_or_default();
            match image_page(image, source) {
                Ok(Some(page)) => image_pages.push(page),
                Ok(None) => {
                    log::warn!("Image for {} has no note", person.name());
                    skipped.push(SkippedImage {
                        serial,
                        title: image.title.clone(),
                        reason: "no note".to_string(),
                    });
                }
                Err(e) if e.is_image_local() => {
                    log::warn!("Skipping image {serial} ({}): {e}", image.title);
                    skipped.push(SkippedImage {
                        serial,
                        title: image.title.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    log::debug!(
        "Composed {} person blocks, {} image pages, {} images skipped",
        people.len(),
        image_pages.len(),
        skipped.len()
    );
    Ok(Document {
        labels,
        people,
        image_pages,
        skipped,
    })
}

fn person_block(tree: &Tree, person: &Individual, locale: &DateLocale) -> Result<PersonBlock, Error> {
    let summarize = |people: Vec<&Individual>| -> Vec<Summary> {
        people.into_iter().map(|p| Summary::of(p, locale)).collect()
    };
    Ok(PersonBlock {
        xref: person.xref().to_string(),
        summary: Summary::of(person, locale),
        parents: summarize(tree.parents(person)?),
        children: summarize(tree.children(person)?),
        images: person
            .images()
            .iter()
            .map(|i| ImageEntry {
                serial: i.serial().unwrap_or_default(),
                title: i.title.clone(),
            })
            .collect(),
    })
}

fn image_page(image: &Image, source: &dyn ImageSource) -> Result<Option<ImagePage>, Error> {
    let Some(note) = image.note.clone() else {
        return Ok(None);
    };
    let path = source.local_path(&image.url)?;
    let (width, height) = source.dimensions(&image.url)?;
    let placement = place_on_a4(width, height)?;
    Ok(Some(ImagePage {
        serial: image.serial().unwrap_or_default(),
        title: image.title.clone(),
        path,
        placement,
        note,
    }))
}
