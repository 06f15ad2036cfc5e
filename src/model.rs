use std::fmt;

use chrono::NaiveDate;

use crate::error::Error;
use crate::gedcom::date::{PartialDate, sentinel_date};
use crate::gedcom::{Record, RecordTree, expand_line_breaks};

/// Personal name parts. Rendering through `Display` is also the key that
/// decides whether two individuals need disambiguation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name {
    pub given: Option<String>,
    pub surname: Option<String>,
    pub maiden: Option<String>,
}

impl Name {
    pub fn from_record(tree: &RecordTree, record: &Record) -> Self {
        let (fallback_given, fallback_surname) = split_name_value(&record.value);
        Name {
            given: tree
                .first_value(record, "GIVN")
                .map(str::to_string)
                .or(fallback_given),
            surname: tree
                .first_value(record, "SURN")
                .map(str::to_string)
                .or(fallback_surname),
            maiden: tree.first_value(record, "_MARNM").map(str::to_string),
        }
    }

    /// Maiden name when recorded, otherwise the surname.
    pub fn last_name(&self) -> &str {
        self.maiden
            .as_deref()
            .or(self.surname.as_deref())
            .unwrap_or("")
    }
}

/// `Given /Surname/` as written in the NAME value itself.
fn split_name_value(value: &str) -> (Option<String>, Option<String>) {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    match value.split_once('/') {
        Some((given, rest)) => {
            let surname = rest.split('/').next().unwrap_or("");
            (non_empty(given), non_empty(surname))
        }
        None => (non_empty(value), None),
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let given = self.given.as_deref().unwrap_or("");
        let surname = self.surname.as_deref().unwrap_or("");
        match &self.maiden {
            Some(maiden) => write!(f, "{given} {maiden} (f. {surname})"),
            None => write!(f, "{given} {surname}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Image {
    pub url: String,
    pub title: String,
    /// Note text with line breaks restored.
    pub note: Option<String>,
    serial: Option<u32>,
}

impl Image {
    /// An OBJE record becomes an image only when it has a title.
    pub fn from_record(tree: &RecordTree, record: &Record) -> Result<Option<Self>, Error> {
        let Some(title) = tree.first_value(record, "TITL") else {
            return Ok(None);
        };
        let url = tree
            .first_value(record, "FILE")
            .ok_or_else(|| Error::MalformedRecord {
                line: record.line,
                reason: format!("image {title:?} has no FILE"),
            })?;
        Ok(Some(Image {
            url: url.to_string(),
            title: title.to_string(),
            note: tree.first_value(record, "NOTE").map(expand_line_breaks),
            serial: None,
        }))
    }

    /// Document-wide image number, assigned once the roster is ordered.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    pub(crate) fn set_serial(&mut self, serial: u32) {
        self.serial = Some(serial);
    }
}

#[derive(Debug)]
pub struct Individual {
    xref: String,
    name: Name,
    birth: Option<PartialDate>,
    death: Option<PartialDate>,
    images: Vec<Image>,
    spouse_families: Vec<String>,
    parent_families: Vec<String>,
    serial: Option<u32>,
}

fn event_date(tree: &RecordTree, record: &Record, tag: &str) -> Result<Option<PartialDate>, Error> {
    match tree.first_child(record, tag) {
        Some(event) => PartialDate::resolve(tree.first_value(event, "DATE")),
        None => Ok(None),
    }
}

fn xref_values(tree: &RecordTree, record: &Record, tag: &str) -> Vec<String> {
    tree.children_tagged(record, tag)
        .filter_map(Record::text)
        .map(str::to_string)
        .collect()
}

impl Individual {
    pub fn from_record(tree: &RecordTree, record: &Record) -> Result<Self, Error> {
        let xref = record.xref.clone().ok_or_else(|| Error::MalformedRecord {
            line: record.line,
            reason: "individual without identifier".to_string(),
        })?;
        let name = tree
            .first_child(record, "NAME")
            .map(|n| Name::from_record(tree, n))
            .unwrap_or_default();

        let mut images = Vec::new();
        for obje in tree.children_tagged(record, "OBJE") {
            if let Some(image) = Image::from_record(tree, obje)? {
                images.push(image);
            }
        }

        Ok(Individual {
            birth: event_date(tree, record, "BIRT")?,
            death: event_date(tree, record, "DEAT")?,
            spouse_families: xref_values(tree, record, "FAMS"),
            parent_families: xref_values(tree, record, "FAMC"),
            xref,
            name,
            images,
            serial: None,
        })
    }

    pub fn xref(&self) -> &str {
        &self.xref
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn birth(&self) -> Option<PartialDate> {
        self.birth
    }

    pub fn death(&self) -> Option<PartialDate> {
        self.death
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub(crate) fn images_mut(&mut self) -> &mut [Image] {
        &mut self.images
    }

    /// Families this individual is a partner in (FAMS).
    pub fn spouse_families(&self) -> &[String] {
        &self.spouse_families
    }

    /// Families this individual is a child of (FAMC).
    pub fn parent_families(&self) -> &[String] {
        &self.parent_families
    }

    /// Set only when another individual renders with the same name.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    pub(crate) fn set_serial(&mut self, serial: u32) {
        self.serial = Some(serial);
    }

    /// Birth date for ordering, with unknown births first.
    pub fn effective_birth(&self) -> NaiveDate {
        self.birth.map(|b| b.sort_date()).unwrap_or_else(sentinel_date)
    }
}
