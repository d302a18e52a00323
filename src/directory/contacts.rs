//! Contact rows from directory result tables
//!
//! People and service rows live in tables whose class contains
//! `result-table`; `full-list-service` marks service rows and `full-list`
//! marks people rows. A row must carry a name anchor (class containing
//! `name`) and a parseable office telephone number to become a contact.

use crate::crawler::element_text;
use crate::url::{canonicalize, CanonicalizeOptions};
use scraper::{ElementRef, Html, Selector};
use url::Url;

const GENERIC_NAMES: [&str; 4] = ["enquiry", "general enquiry", "general inquiry", "enquiries"];
const GENERIC_POST_TITLES: [&str; 3] = ["-", "enquiry", "general enquiry"];
const SERVICE_DEPARTMENT_LABEL: &str = "Bureau / Department / Related Organisation";

/// Which kind of result table a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    People,
    Service,
}

impl TableKind {
    fn from_class(class: &str) -> Option<Self> {
        let class = class.to_lowercase();
        if !class.contains("result-table") {
            None
        } else if class.contains("full-list-service") {
            Some(Self::Service)
        } else if class.contains("full-list") {
            Some(Self::People)
        } else {
            None
        }
    }
}

/// A person or service line extracted from one directory page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,

    /// Canonical detail-page URL, if the name anchor had a usable one
    pub url: Option<String>,

    pub post_title: Option<String>,

    /// Office telephone as displayed
    pub office_tel: Option<String>,

    /// Digits only, without the leading 852 country code
    pub office_tel_norm: String,

    pub email: Option<String>,

    /// Generic enquiry lines are pinned to the department root
    pub is_enquiry_like: bool,

    /// Department root named by a service row
    pub department_override: Option<String>,
}

/// Digits of a phone number with a leading `852` country code removed
///
/// # Examples
///
/// ```
/// use hkgov_crawler::directory::normalize_phone;
///
/// assert_eq!(normalize_phone("(852) 2123 4567").as_deref(), Some("21234567"));
/// assert_eq!(normalize_phone("2123 4567").as_deref(), Some("21234567"));
/// assert_eq!(normalize_phone("n/a"), None);
/// ```
pub fn normalize_phone(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    match digits.strip_prefix("852") {
        Some(local) if digits.len() > 8 => Some(local.to_string()),
        _ => Some(digits),
    }
}

/// Lowercased address, or `None` when it does not contain `@`
pub fn normalize_email(value: &str) -> Option<String> {
    let email = value.trim().to_lowercase();
    email.contains('@').then_some(email)
}

/// Removes a leading label such as "Post Title" (case-insensitive)
pub fn strip_label(text: &str, label: &str) -> String {
    let text = text.trim();
    match text.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => text[label.len()..].trim().to_string(),
        _ => text.to_string(),
    }
}

/// Whether a contact is a generic enquiry line rather than a person
pub fn is_enquiry_like(name: &str, post_title: Option<&str>, href: Option<&str>) -> bool {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if GENERIC_NAMES.contains(&name.as_str()) {
        return true;
    }

    let title = post_title
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if title.is_empty() || GENERIC_POST_TITLES.contains(&title.as_str()) {
        return true;
    }

    href.is_some_and(|h| h.to_lowercase().contains("service"))
}

#[derive(Debug, Default)]
struct RawRow {
    cells: Vec<String>,
    name_text: Option<String>,
    name_href: Option<String>,
    tel_text: Option<String>,
    email_text: Option<String>,
}

/// Extracts every contact row from a parsed directory page
pub fn extract_contacts(document: &Html, base_url: &Url) -> Vec<Contact> {
    let Ok(rows) = Selector::parse("tr") else {
        return Vec::new();
    };
    let Ok(anchors) = Selector::parse("a") else {
        return Vec::new();
    };
    let canon = CanonicalizeOptions::default();

    document
        .select(&rows)
        .filter_map(|row| {
            let kind = table_kind(row)?;
            let raw = read_row(row, &anchors, base_url);
            contact_from_row(kind, raw, &canon)
        })
        .collect()
}

/// Kind of the innermost enclosing result table
fn table_kind(row: ElementRef<'_>) -> Option<TableKind> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case("table"))
        .find_map(|table| table.value().attr("class").and_then(TableKind::from_class))
}

fn read_row(row: ElementRef<'_>, anchors: &Selector, base_url: &Url) -> RawRow {
    let mut raw = RawRow::default();

    let cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"));

    for cell in cells {
        raw.cells.push(element_text(cell));

        for anchor in cell.select(anchors) {
            let href = anchor.value().attr("href").map(str::trim).unwrap_or_default();
            let absolute = if href.is_empty() {
                None
            } else {
                base_url.join(href).ok().map(String::from)
            };
            let class = anchor.value().attr("class").unwrap_or_default().to_lowercase();
            let href_lower = href.to_lowercase();

            if class.contains("name") && absolute.is_some() {
                if raw.name_href.is_none() {
                    raw.name_href = absolute;
                    raw.name_text = Some(element_text(anchor));
                }
            } else if class.contains("tel") || href_lower.starts_with("tel:") {
                if raw.tel_text.is_none() {
                    raw.tel_text = Some(element_text(anchor));
                }
            } else if (href_lower.starts_with("mailto:") || class.contains("mail"))
                && raw.email_text.is_none()
            {
                let address = href_lower
                    .starts_with("mailto:")
                    .then(|| href["mailto:".len()..].trim().to_string())
                    .filter(|a| !a.is_empty());
                raw.email_text = address.or_else(|| Some(element_text(anchor)));
            }
        }
    }

    raw
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn contact_from_row(kind: TableKind, raw: RawRow, canon: &CanonicalizeOptions) -> Option<Contact> {
    let name_href = raw.name_href?;
    if raw.cells.len() < 2 {
        return None;
    }

    let name = strip_label(raw.name_text.as_deref().unwrap_or_default(), "Full Name");
    if name.is_empty() || name.eq_ignore_ascii_case("(vacant)") {
        return None;
    }

    let post_title_raw = raw.cells[1].trim();
    let post_title = non_empty(Some(strip_label(post_title_raw, "Post Title")));

    let tel_full = non_empty(raw.tel_text).or_else(|| raw.cells.get(2).cloned());
    let office_tel = non_empty(tel_full.map(|t| strip_label(&t, "Office Tel")));
    let office_tel_norm = normalize_phone(office_tel.as_deref()?)?;

    let email_full = non_empty(raw.email_text).or_else(|| raw.cells.get(3).cloned());
    let email = email_full
        .map(|e| strip_label(&e, "Email"))
        .and_then(|e| normalize_email(&e));

    let is_service =
        kind == TableKind::Service || name_href.to_lowercase().contains("service_details.jsp");
    let department_override = if is_service {
        non_empty(Some(strip_label(post_title_raw, SERVICE_DEPARTMENT_LABEL)))
    } else {
        None
    };

    Some(Contact {
        is_enquiry_like: is_service
            || is_enquiry_like(&name, post_title.as_deref(), Some(&name_href)),
        url: canonicalize(&name_href, canon),
        name,
        post_title,
        office_tel,
        office_tel_norm,
        email,
        department_override,
    })
}
