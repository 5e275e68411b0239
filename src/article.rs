use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subcategory value meaning "not classified yet".
pub const UNCLASSIFIED: &str = "General";

/// One normalized forum post.
///
/// Backed by the raw JSON object so fields the tool never touches
/// (author, attachments, anything added by other tools) survive a
/// load/save cycle unchanged. Text accessors are best-effort: a missing
/// or non-string field reads as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Article(Map<String, Value>);

impl Article {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn text(&self, field: &str) -> &str {
        self.0.get(field).and_then(Value::as_str).unwrap_or("")
    }

    pub fn id(&self) -> &str {
        self.text("id")
    }

    pub fn title(&self) -> &str {
        self.text("title")
    }

    pub fn body_html(&self) -> &str {
        self.text("body_html")
    }

    pub fn summary(&self) -> &str {
        self.text("summary")
    }

    pub fn dek(&self) -> &str {
        self.text("dek")
    }

    /// `None` when the field is absent or not a string.
    pub fn subcategory(&self) -> Option<&str> {
        self.0.get("subcategory").and_then(Value::as_str)
    }

    pub fn set_subcategory(&mut self, label: &str) {
        self.set("subcategory", Value::String(label.to_string()));
    }

    pub fn string_list(&self, field: &str) -> Vec<&str> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn set_string_list(&mut self, field: &str, items: Vec<String>) {
        let items = items.into_iter().map(Value::String).collect();
        self.set(field, Value::Array(items));
    }

    pub fn external_links(&self) -> Vec<&str> {
        self.string_list("external_links")
    }

    pub fn tags(&self) -> Vec<&str> {
        self.string_list("tags")
    }

    pub fn attachment_count(&self) -> usize {
        self.0
            .get("attachments")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }
}

impl From<Value> for Article {
    /// Non-object values become an empty article.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }
}
