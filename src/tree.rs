use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::Error;
use crate::gedcom::{Record, RecordKind, RecordTree};
use crate::model::{Image, Individual};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PersonId(usize);

/// One `Individual` per identifier, created on first request. Every path to a
/// person (roster, parent link, child link) ends at the same entry, so the
/// serial written by the assembler is seen everywhere.
#[derive(Default)]
struct IndividualCache {
    people: Vec<Individual>,
    by_xref: HashMap<String, PersonId>,
}

impl IndividualCache {
    fn individual_by_id(&mut self, records: &RecordTree, xref: &str) -> Result<PersonId, Error> {
        if let Some(&id) = self.by_xref.get(xref) {
            return Ok(id);
        }
        let record = records.resolve(xref, RecordKind::Individual, "individual")?;
        let person = Individual::from_record(records, record)?;
        let id = PersonId(self.people.len());
        self.people.push(person);
        self.by_xref.insert(xref.to_string(), id);
        Ok(id)
    }

    fn get(&self, id: PersonId) -> &Individual {
        &self.people[id.0]
    }

    fn get_mut(&mut self, id: PersonId) -> &mut Individual {
        &mut self.people[id.0]
    }
}

/// Roster ordering: last name, then rendered full name, then birth date
/// (unknown births first). Remaining ties keep input order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub last_name: String,
    pub full_name: String,
    pub birth: NaiveDate,
}

impl SortKey {
    pub fn of(person: &Individual) -> Self {
        SortKey {
            last_name: person.name().last_name().to_string(),
            full_name: person.name().to_string(),
            birth: person.effective_birth(),
        }
    }
}

/// A fully assembled family tree: parsed records, the individuals built from
/// them and the final roster order. Serials are assigned here and nowhere else.
pub struct Tree {
    records: RecordTree,
    cache: IndividualCache,
    roster: Vec<PersonId>,
}

impl Tree {
    pub fn read(path: &Path) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path)?;
        Self::from_source(&source)
    }

    pub fn from_source(source: &str) -> Result<Self, Error> {
        Self::build(RecordTree::parse(source)?)
    }

    pub fn build(records: RecordTree) -> Result<Self, Error> {
        let mut cache = IndividualCache::default();
        let mut keyed: Vec<(SortKey, PersonId)> = Vec::new();
        for record in records.individuals() {
            let xref = record.xref.as_deref().ok_or_else(|| Error::MalformedRecord {
                line: record.line,
                reason: "individual without identifier".to_string(),
            })?;
            let id = cache.individual_by_id(&records, xref)?;
            keyed.push((SortKey::of(cache.get(id)), id));
        }

        // sort_by is stable: equal keys keep input order
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let roster: Vec<PersonId> = keyed.into_iter().map(|(_, id)| id).collect();

        assign_name_serials(&mut cache, &roster);
        let image_count = assign_image_serials(&mut cache, &roster);

        let tree = Tree {
            records,
            cache,
            roster,
        };
        for person in tree.roster() {
            tree.parents(person)?;
            tree.children(person)?;
        }

        log::debug!(
            "Assembled {} individuals with {} images",
            tree.roster.len(),
            image_count
        );
        Ok(tree)
    }

    /// Individuals in final display order.
    pub fn roster(&self) -> impl Iterator<Item = &Individual> + '_ {
        self.roster.iter().map(|&id| self.cache.get(id))
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn individual_by_id(&self, xref: &str) -> Option<&Individual> {
        self.cache.by_xref.get(xref).map(|&id| self.cache.get(id))
    }

    /// Every image in global serial order.
    pub fn images(&self) -> impl Iterator<Item = &Image> + '_ {
        self.roster().flat_map(|p| p.images().iter())
    }

    fn person_by_xref(&self, xref: &str, context: impl Fn() -> String) -> Result<&Individual, Error> {
        if let Some(person) = self.individual_by_id(xref) {
            return Ok(person);
        }
        // Produces the precise reason (missing vs. wrong record kind).
        self.records.resolve(xref, RecordKind::Individual, &context())?;
        Err(Error::UnresolvedReference {
            xref: xref.to_string(),
            context: context(),
        })
    }

    /// Partners of every family the person is listed as a child of.
    pub fn parents(&self, person: &Individual) -> Result<Vec<&Individual>, Error> {
        let mut result = Vec::new();
        for fam in person.parent_families() {
            let context = || format!("FAMC of {}", person.xref());
            let family = self.records.resolve(fam, RecordKind::Family, &context())?;
            for partner in partners(&self.records, family) {
                result.push(self.person_by_xref(partner, || format!("partner in {fam}"))?);
            }
        }
        Ok(result)
    }

    /// Children of every family the person is a partner in. A FAMS link to a
    /// family that does not list the person as a partner is ignored.
    pub fn children(&self, person: &Individual) -> Result<Vec<&Individual>, Error> {
        let mut result = Vec::new();
        for fam in person.spouse_families() {
            let context = || format!("FAMS of {}", person.xref());
            let family = self.records.resolve(fam, RecordKind::Family, &context())?;
            if !partners(&self.records, family).any(|p| p == person.xref()) {
                log::debug!("{} links to {fam} but is not a partner there", person.xref());
                continue;
            }
            for child in self.records.children_tagged(family, "CHIL").filter_map(Record::text) {
                result.push(self.person_by_xref(child, || format!("child in {fam}"))?);
            }
        }
        Ok(result)
    }
}

fn partners<'a>(records: &'a RecordTree, family: &'a Record) -> impl Iterator<Item = &'a str> + 'a {
    records
        .children_tagged(family, "HUSB")
        .chain(records.children_tagged(family, "WIFE"))
        .filter_map(Record::text)
}

/// Number individuals sharing a rendered name 1, 2, ... in roster order.
fn assign_name_serials(cache: &mut IndividualCache, roster: &[PersonId]) {
    let mut groups: HashMap<String, Vec<PersonId>> = HashMap::new();
    for &id in roster {
        groups
            .entry(cache.get(id).name().to_string())
            .or_default()
            .push(id);
    }
    for members in groups.values().filter(|m| m.len() > 1) {
        for (i, &id) in members.iter().enumerate() {
            cache.get_mut(id).set_serial(i as u32 + 1);
        }
    }
}

/// Number every image 1..=N in roster order, then per-person order.
fn assign_image_serials(cache: &mut IndividualCache, roster: &[PersonId]) -> u32 {
    let mut next_serial = 1;
    for &id in roster {
        for image in cache.get_mut(id).images_mut() {
            image.set_serial(next_serial);
            next_serial += 1;
        }
    }
    next_serial - 1
}
