use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::article::Article;

pub const STORE_PATH: &str = "data/articles.json";

/// Read the whole article list into memory.
pub fn load(path: &Path) -> Result<Vec<Article>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read articles from {}", path.display()))?;
    let doc: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;

    let Value::Array(items) = doc else {
        bail!("{} must hold a JSON array of articles", path.display());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| -> Result<Article> {
            match item {
                Value::Object(fields) => Ok(Article::from_map(fields)),
                other => bail!(
                    "{}: entry {} is not an object (found {})",
                    path.display(),
                    i,
                    kind(&other)
                ),
            }
        })
        .collect()
}

/// Write the whole article list back, pretty-printed.
///
/// The document goes to a sibling temp file first and is renamed over the
/// target, so a failed write leaves the previous file intact.
pub fn save(path: &Path, articles: &[Article]) -> Result<()> {
    let json = serde_json::to_string_pretty(articles)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = std::fs::write(&tmp, json) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to write {}", tmp.display()));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "articles.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ed_curiosity-{}-{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("articles.json")
    }

    #[test]
    fn fixture_loads() {
        let articles = load(Path::new("tests/fixtures/articles.json")).unwrap();
        assert_eq!(articles.len(), 10);
        assert!(articles.iter().all(|a| a.id().starts_with("ed-")));
    }

    #[test]
    fn save_then_load_keeps_content() {
        let path = scratch("roundtrip");
        let articles = vec![
            Article::from(json!({ "id": "ed-1", "title": "Ünïcode ✓", "tags": [] })),
            Article::from(json!({ "id": "ed-2", "extra": { "k": [1, 2] } })),
        ];
        save(&path, &articles).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Ünïcode ✓"));
        assert!(raw.contains("\n  {"));
        assert_eq!(load(&path).unwrap(), articles);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn failed_save_leaves_previous_file() {
        let path = scratch("failed-save");
        let before = r#"[{ "id": "ed-1" }]"#;
        std::fs::write(&path, before).unwrap();
        // A directory in the temp file's place makes the write fail.
        let tmp = temp_path(&path);
        std::fs::create_dir_all(&tmp).unwrap();

        let articles = vec![Article::from(json!({ "id": "ed-2" }))];
        assert!(save(&path, &articles).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        std::fs::remove_dir(&tmp).unwrap();
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load(Path::new("tests/fixtures/nope.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.json"));
    }

    #[test]
    fn rejects_non_array_document() {
        let path = scratch("object");
        std::fs::write(&path, r#"{ "id": "ed-1" }"#).unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn rejects_non_object_entry() {
        let path = scratch("entry");
        std::fs::write(&path, r#"[{ "id": "ed-1" }, "oops"]"#).unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }
}
