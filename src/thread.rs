use std::sync::LazyLock;

use chrono::DateTime;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::article::{Article, UNCLASSIFIED};

static CHATGPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://chatgpt\.com/share/[a-zA-Z0-9\-]+").unwrap());
static GITHUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://github\.com/[a-zA-Z0-9\-_/]+").unwrap());

const DEK_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Normalize one Ed thread into an article.
///
/// `listed` is the entry from the thread listing, `full` the thread fetched
/// on its own (the same value when that fetch failed). Returns `None` for
/// threads outside `category`.
pub fn parse_post(listed: &Value, full: &Value, course_id: u64, category: &str) -> Option<Article> {
    let thread_category = str_field(listed, "category");
    if !thread_category.eq_ignore_ascii_case(category) {
        return None;
    }

    let thread_id = id_string(listed.get("id").or_else(|| full.get("id")));
    let title = match str_field(full, "title") {
        "" if full.get("title").is_none() => "Untitled",
        t => t,
    };
    let content_xml = str_field(full, "content");
    let content_text = str_field(full, "document");
    let subcategory = match str_field(full, "subcategory") {
        "" => UNCLASSIFIED,
        s => s,
    };

    let attachments = extract_attachments(content_xml);
    let mut links = Map::new();
    links.insert(
        "ed".to_string(),
        Value::String(format!(
            "https://edstem.org/us/courses/{}/discussion/{}",
            course_id, thread_id
        )),
    );
    for (kind, url) in extract_share_links(&format!("{} {}", content_xml, content_text)) {
        links.insert(kind.to_string(), Value::String(url));
    }

    let fields = json!({
        "id": format!("ed-{}", thread_id),
        "category": thread_category,
        "subcategory": subcategory,
        "title": title,
        "dek": dek(content_text),
        "student": author(listed).or_else(|| author(full)).unwrap_or_default(),
        "date": normalize_date(str_field(full, "created_at")),
        "tags": [],
        "links": links,
        "body_html": content_text,
        "attachments": attachments
            .iter()
            .map(|a| json!({ "name": a.name, "url": a.url }))
            .collect::<Vec<_>>(),
        "highlight": false,
    });
    Some(Article::from(fields))
}

/// `<file url=".." filename=".."/>` elements of an Ed content document.
///
/// Best-effort: parsing stops at the first malformed element and whatever
/// was collected so far is returned.
pub fn extract_attachments(content_xml: &str) -> Vec<Attachment> {
    let mut reader = quick_xml::Reader::from_str(content_xml);
    reader.config_mut().check_end_names = false;
    let mut attachments = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"file" => {
                if let Some(a) = file_attachment(&e) {
                    attachments.push(a);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "Stopped reading content XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    attachments
}

fn file_attachment(e: &BytesStart) -> Option<Attachment> {
    let mut url = None;
    let mut name = None;
    for attr in e.attributes().flatten() {
        let slot = match attr.key.as_ref() {
            b"url" => &mut url,
            b"filename" => &mut name,
            _ => continue,
        };
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        *slot = Some(value);
    }
    Some(Attachment {
        name: name?,
        url: url?,
    })
}

/// First ChatGPT share link and first GitHub link, when present.
pub fn extract_share_links(content: &str) -> Vec<(&'static str, String)> {
    let mut links = Vec::new();
    if let Some(m) = CHATGPT_RE.find(content) {
        links.push(("chatgpt", m.as_str().to_string()));
    }
    if let Some(m) = GITHUB_RE.find(content) {
        links.push(("github", m.as_str().to_string()));
    }
    links
}

/// `YYYY-MM-DD` from an RFC 3339 timestamp, else its first ten chars.
pub fn normalize_date(created_at: &str) -> String {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) => created_at.chars().take(10).collect(),
    }
}

fn dek(text: &str) -> String {
    if text.chars().count() > DEK_CHARS {
        let head: String = text.chars().take(DEK_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn author(thread: &Value) -> Option<String> {
    match thread.get("user")? {
        Value::Object(user) => Some(user.get("name").and_then(Value::as_str).unwrap_or("").to_string()),
        Value::String(name) => Some(name.clone()),
        _ => None,
    }
}

fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or("")
}

fn id_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

// ── Tests ──
