//! Composite-key deduplication of directory contacts
//!
//! A contact's dedup key is `phone|department`, where the department is the
//! full breadcrumb joined with " -> " for ordinary contacts, or just the
//! department root for enquiry-like ones. A key seen again never creates a
//! second record; the existing record accumulates the extra discovery URLs
//! and breadcrumbs instead.

use crate::crawler::collapse_whitespace;
use crate::directory::abbrev::Abbreviations;
use crate::directory::contacts::Contact;
use crate::output::UrlRecord;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const PATH_SEPARATOR: &str = " -> ";

/// Whether an observation created a record or merged into one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Created,
    Merged,
    /// The record cap was reached; nothing was stored
    Full,
}

/// Department root of a contact: the service row's own department, else the first breadcrumb level
pub fn department_root(contact: &Contact, path: &[String]) -> Option<String> {
    contact
        .department_override
        .as_deref()
        .or(path.first().map(String::as_str))
        .map(collapse_whitespace)
        .filter(|root| !root.is_empty())
}

/// Department identifier used in the dedup key
pub fn department_id(contact: &Contact, root: Option<&str>, path: &[String]) -> String {
    if contact.is_enquiry_like {
        root.unwrap_or_default().to_string()
    } else {
        collapse_whitespace(&path.join(PATH_SEPARATOR))
    }
}

pub fn dedup_key(phone: &str, department_id: &str) -> String {
    format!("{}|{}", phone, collapse_whitespace(department_id))
}

/// Deduplicated contact records for one directory crawl
#[derive(Debug)]
pub struct ContactBook {
    source: String,
    discovered_at_utc: String,
    abbreviations: Abbreviations,
    limit: usize,

    records: Vec<UrlRecord>,
    by_key: HashMap<String, usize>,

    /// Contacts found on each fetched page, replayed when the page is
    /// linked again under another breadcrumb
    page_contacts: HashMap<String, Vec<Contact>>,
}

impl ContactBook {
    pub fn new(
        source: impl Into<String>,
        discovered_at_utc: impl Into<String>,
        abbreviations: Abbreviations,
        limit: usize,
    ) -> Self {
        Self {
            source: source.into(),
            discovered_at_utc: discovered_at_utc.into(),
            abbreviations,
            limit,
            records: Vec::new(),
            by_key: HashMap::new(),
            page_contacts: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.limit
    }

    pub fn get(&self, key: &str) -> Option<&UrlRecord> {
        self.by_key.get(key).map(|&idx| &self.records[idx])
    }

    /// Records one sighting of `contact` on `page_url` under breadcrumb `path`
    pub fn observe(&mut self, page_url: &str, path: &[String], contact: &Contact) -> Observation {
        let root = department_root(contact, path);
        let effective_path: Vec<String> = if contact.is_enquiry_like {
            match &root {
                Some(root) => vec![root.clone()],
                None => Vec::new(),
            }
        } else {
            path.to_vec()
        };
        let department = department_id(contact, root.as_deref(), &effective_path);
        let key = dedup_key(&contact.office_tel_norm, &department);

        if let Some(&idx) = self.by_key.get(&key) {
            merge_sighting(&mut self.records[idx], page_url, path, contact, &self.abbreviations);
            return Observation::Merged;
        }

        if self.is_full() {
            return Observation::Full;
        }

        let record = self.new_record(page_url, path, contact, &key, root, department);
        self.by_key.insert(key, self.records.len());
        self.records.push(record);
        Observation::Created
    }

    /// Stores the contacts found on a fetched page
    pub fn remember_page(&mut self, page_url: &str, contacts: Vec<Contact>) {
        self.page_contacts.insert(page_url.to_string(), contacts);
    }

    /// Re-observes a visited page's contacts under another breadcrumb without refetching
    ///
    /// Returns the number of records created.
    pub fn reobserve(&mut self, page_url: &str, path: &[String]) -> usize {
        let Some(contacts) = self.page_contacts.get(page_url).cloned() else {
            return 0;
        };

        contacts
            .iter()
            .map(|contact| self.observe(page_url, path, contact))
            .filter(|observation| *observation == Observation::Created)
            .count()
    }

    /// Consumes the book, returning records sorted by URL then dedup key
    pub fn into_records(self) -> Vec<UrlRecord> {
        let mut records = self.records;
        records.sort_by(|a, b| {
            a.url
                .cmp(&b.url)
                .then_with(|| a.meta_str("dedup_key").cmp(&b.meta_str("dedup_key")))
        });
        records
    }

    fn new_record(
        &self,
        page_url: &str,
        path: &[String],
        contact: &Contact,
        key: &str,
        root: Option<String>,
        department: String,
    ) -> UrlRecord {
        let (post_title_long, applied) = match contact.post_title.as_deref() {
            Some(title) => {
                let (long, applied) = self.abbreviations.expand(title);
                (Some(long), applied)
            }
            None => (None, Vec::new()),
        };

        let department_paths = if path.is_empty() {
            Vec::new()
        } else {
            vec![path.to_vec()]
        };

        let mut meta = Map::new();
        meta.insert("department_root".into(), json!(root));
        meta.insert("department_id".into(), json!(department));
        meta.insert("department_paths".into(), json!(department_paths));
        meta.insert("discovered_from".into(), json!(page_url));
        meta.insert("discovered_from_urls".into(), json!([page_url]));
        meta.insert("other_person_urls".into(), json!([]));
        meta.insert("dedup_key".into(), json!(key));
        meta.insert("post_title".into(), json!(contact.post_title));
        meta.insert("post_title_long".into(), json!(post_title_long));
        meta.insert("post_title_abbreviations".into(), json!(applied));
        meta.insert("office_tel".into(), json!(contact.office_tel));
        meta.insert("office_tel_norm".into(), json!(contact.office_tel_norm));
        meta.insert("email".into(), json!(contact.email));
        meta.insert("is_enquiry_like".into(), json!(contact.is_enquiry_like));

        UrlRecord {
            url: contact.url.clone().unwrap_or_else(|| page_url.to_string()),
            name: Some(contact.name.clone()),
            discovered_at_utc: self.discovered_at_utc.clone(),
            source: self.source.clone(),
            meta,
        }
    }
}

/// Folds a repeated sighting into an existing record
fn merge_sighting(
    record: &mut UrlRecord,
    page_url: &str,
    path: &[String],
    contact: &Contact,
    abbreviations: &Abbreviations,
) {
    push_unique(&mut record.meta, "discovered_from_urls", json!(page_url));

    let url = contact.url.as_deref().unwrap_or(page_url);
    if url != record.url {
        push_unique(&mut record.meta, "other_person_urls", json!(url));
    }

    if !path.is_empty() {
        push_unique(&mut record.meta, "department_paths", json!(path));
    }

    let missing_title = record.meta.get("post_title").map_or(true, Value::is_null);
    if let (true, Some(title)) = (missing_title, contact.post_title.as_deref()) {
        let (long, applied) = abbreviations.expand(title);
        record.set_meta("post_title", title);
        record.set_meta("post_title_long", long);
        record.set_meta("post_title_abbreviations", json!(applied));
    }
}

fn push_unique(meta: &mut Map<String, Value>, key: &str, value: Value) {
    let entry = meta
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    if let Value::Array(items) = entry {
        if !items.contains(&value) {
            items.push(value);
        }
    }
}
