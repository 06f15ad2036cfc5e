pub mod date;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

/// Joins the physical lines of a multi-line value. Kept as the two characters
/// `\` `n` so a value always fits on one logical line.
pub const LINE_BREAK_MARKER: &str = "\\n";

static LINE_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<level>[0-9]) (?:(?P<xref>@[-a-zA-Z0-9]+@) )?(?P<tag>[_A-Z0-9]+)(?: (?P<value>.*))?$")
        .unwrap()
});

/// One logical entry: `LEVEL [XREF] TAG [VALUE]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// 1-based physical line the entry starts on.
    pub number: usize,
    pub level: u8,
    pub xref: Option<String>,
    pub tag: String,
    pub value: String,
}

fn parse_line(number: usize, text: &str) -> Option<Line> {
    let caps = LINE_FORMAT.captures(text)?;
    let level = caps["level"].parse::<u8>().ok()?;
    Some(Line {
        number,
        level,
        xref: caps.name("xref").map(|m| m.as_str().to_string()),
        tag: caps["tag"].to_string(),
        value: caps.name("value").map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}

/// Split raw text into logical entries. Physical lines that do not look like an
/// entry header continue the previous entry's value, joined with
/// [`LINE_BREAK_MARKER`].
pub fn tokenize(source: &str) -> Result<Vec<Line>, Error> {
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    let mut lines: Vec<Line> = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let text = raw.trim();
        if let Some(line) = parse_line(idx + 1, text) {
            lines.push(line);
            continue;
        }
        match lines.last_mut() {
            Some(prev) => {
                prev.value.push_str(LINE_BREAK_MARKER);
                prev.value.push_str(text);
            }
            None if text.is_empty() => {}
            None => {
                return Err(Error::MalformedRecord {
                    line: idx + 1,
                    reason: format!("expected an entry header, found {text:?}"),
                });
            }
        }
    }
    Ok(lines)
}

/// Turn the embedded line-break markers of a continuation-joined value back
/// into real line breaks.
pub fn expand_line_breaks(value: &str) -> String {
    value.replace(LINE_BREAK_MARKER, "\n")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Individual,
    Family,
    Attribute,
}

impl RecordKind {
    fn classify(level: u8, tag: &str) -> Self {
        match (level, tag) {
            (0, "INDI") => RecordKind::Individual,
            (0, "FAM") => RecordKind::Family,
            _ => RecordKind::Attribute,
        }
    }
}

#[derive(Debug)]
pub struct Record {
    pub id: RecordId,
    pub level: u8,
    pub xref: Option<String>,
    pub tag: String,
    pub value: String,
    pub kind: RecordKind,
    pub line: usize,
    children: Vec<RecordId>,
}

impl Record {
    /// The value, or `None` when the entry carried no text.
    pub fn text(&self) -> Option<&str> {
        if self.value.is_empty() {
            None
        } else {
            Some(&self.value)
        }
    }
}

/// The parsed document: every record in input order, the level-0 roots and an
/// index from cross-reference identifier to record.
#[derive(Debug, Default)]
pub struct RecordTree {
    records: Vec<Record>,
    roots: Vec<RecordId>,
    index: HashMap<String, RecordId>,
}

impl RecordTree {
    pub fn parse(source: &str) -> Result<Self, Error> {
        Self::from_lines(tokenize(source)?)
    }

    /// Attach every entry to the most recent entry one level up.
    pub fn from_lines(lines: Vec<Line>) -> Result<Self, Error> {
        let mut tree = RecordTree::default();
        // path[n] is the open record at level n
        let mut path: Vec<RecordId> = Vec::new();

        for line in lines {
            let level = line.level as usize;
            if level > path.len() {
                let reason = if path.is_empty() {
                    format!("level {level} entry {} before any level 0 entry", line.tag)
                } else {
                    format!(
                        "level {level} entry {} has no parent at level {}",
                        line.tag,
                        level - 1
                    )
                };
                return Err(Error::MalformedRecord {
                    line: line.number,
                    reason,
                });
            }
            path.truncate(level);

            let id = RecordId(tree.records.len());
            if let Some(xref) = &line.xref {
                if tree.index.insert(xref.clone(), id).is_some() {
                    return Err(Error::MalformedRecord {
                        line: line.number,
                        reason: format!("duplicate identifier {xref}"),
                    });
                }
            }
            match path.last() {
                Some(&parent) => tree.records[parent.0].children.push(id),
                None => tree.roots.push(id),
            }
            tree.records.push(Record {
                id,
                level: line.level,
                kind: RecordKind::classify(line.level, &line.tag),
                xref: line.xref,
                tag: line.tag,
                value: line.value,
                line: line.number,
                children: Vec::new(),
            });
            path.push(id);
        }

        log::debug!(
            "Record tree: {} records, {} roots, {} identifiers",
            tree.records.len(),
            tree.roots.len(),
            tree.index.len()
        );
        Ok(tree)
    }

    pub fn get(&self, id: RecordId) -> &Record {
        &self.records[id.0]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Record> + '_ {
        self.roots.iter().map(|&id| self.get(id))
    }

    pub fn lookup(&self, xref: &str) -> Option<&Record> {
        self.index.get(xref).map(|&id| self.get(id))
    }

    /// Look up `xref` and require it to be a record of `kind`.
    pub fn resolve(&self, xref: &str, kind: RecordKind, context: &str) -> Result<&Record, Error> {
        match self.lookup(xref) {
            Some(record) if record.kind == kind => Ok(record),
            Some(record) => Err(Error::UnresolvedReference {
                xref: xref.to_string(),
                context: format!("{context}: expected {kind:?}, found {}", record.tag),
            }),
            None => Err(Error::UnresolvedReference {
                xref: xref.to_string(),
                context: context.to_string(),
            }),
        }
    }

    pub fn children<'a>(&'a self, record: &'a Record) -> impl Iterator<Item = &'a Record> + 'a {
        record.children.iter().map(|&id| self.get(id))
    }

    pub fn children_tagged<'a>(
        &'a self,
        record: &'a Record,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.children(record).filter(move |c| c.tag == tag)
    }

    pub fn first_child<'a>(&'a self, record: &'a Record, tag: &str) -> Option<&'a Record> {
        self.children(record).find(|c| c.tag == tag)
    }

    /// Text of the first child tagged `tag`, if it has any.
    pub fn first_value<'a>(&'a self, record: &'a Record, tag: &str) -> Option<&'a str> {
        self.first_child(record, tag).and_then(Record::text)
    }

    pub fn individuals(&self) -> impl Iterator<Item = &Record> + '_ {
        self.roots().filter(|r| r.kind == RecordKind::Individual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_xref_and_value() {
        let line = parse_line(3, "0 @I1@ INDI").unwrap();
        assert_eq!(line.level, 0);
        assert_eq!(line.xref.as_deref(), Some("@I1@"));
        assert_eq!(line.tag, "INDI");
        assert_eq!(line.value, "");

        let line = parse_line(4, "2 GIVN Anna Marie").unwrap();
        assert_eq!(line.xref, None);
        assert_eq!(line.value, "Anna Marie");
    }

    #[test]
    fn rejects_lowercase_tag_and_two_digit_level() {
        assert!(parse_line(1, "1 name Anna").is_none());
        assert!(parse_line(1, "10 NAME Anna").is_none());
        assert!(parse_line(1, "some free text").is_none());
    }

    #[test]
    fn custom_underscore_tags_are_headers() {
        let line = parse_line(1, "2 _MARNM Hansen").unwrap();
        assert_eq!(line.tag, "_MARNM");
    }
}
