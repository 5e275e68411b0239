use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::article::Article;
use crate::thread;

pub const API_BASE: &str = "https://us.edstem.org/api/";
pub const BATCH_SIZE: usize = 50;

/// Where threads come from. Passed in explicitly so the fetch loop can be
/// driven by the Ed API or by an in-memory source.
#[allow(async_fn_in_trait)]
pub trait ThreadSource {
    /// One page of the course's thread listing.
    async fn list_threads(&self, course_id: u64, limit: usize, offset: usize)
        -> Result<Vec<Value>>;

    /// A single thread with its full content.
    async fn get_thread(&self, thread_id: u64) -> Result<Value>;
}

/// Minimal Ed REST client authenticated with a personal API token.
pub struct EdClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl EdClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base(token, API_BASE)
    }

    pub fn with_base(token: impl Into<String>, base: &str) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(anyhow!("ED_API_TOKEN is empty"));
        }
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("ed_curiosity/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base: Url::parse(base).with_context(|| format!("Invalid API base {}", base))?,
            token,
        })
    }

    /// Check the token and return the account name.
    pub async fn login(&self) -> Result<String> {
        let body = self.get_json("user", &[]).await.context("Ed login failed")?;
        Ok(body
            .pointer("/user/name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string())
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.base.join(path)?;
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Unsuccessful response from {}", url))?;
        resp.json::<Value>()
            .await
            .with_context(|| format!("Failed to decode JSON from {}", url))
    }
}

impl ThreadSource for EdClient {
    async fn list_threads(&self, course_id: u64, limit: usize, offset: usize) -> Result<Vec<Value>> {
        let body = self
            .get_json(
                &format!("courses/{}/threads", course_id),
                &[
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "new".to_string()),
                ],
            )
            .await?;
        match body.get("threads") {
            Some(Value::Array(threads)) => Ok(threads.clone()),
            _ => Err(anyhow!("Thread listing has no 'threads' array")),
        }
    }

    async fn get_thread(&self, thread_id: u64) -> Result<Value> {
        let mut body = self.get_json(&format!("threads/{}", thread_id), &[]).await?;
        body.get_mut("thread")
            .map(Value::take)
            .ok_or_else(|| anyhow!("Thread {} response has no 'thread' object", thread_id))
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub course_id: u64,
    pub category: String,
    pub batch_size: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            course_id: 84647,
            category: "curiosity".to_string(),
            batch_size: BATCH_SIZE,
        }
    }
}

/// Scrape stats returned after completion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeStats {
    pub threads: usize,
    pub articles: usize,
    pub attachments: usize,
    pub with_attachments: usize,
}

impl ScrapeStats {
    pub fn print(&self) {
        println!("Statistics:");
        println!("    Total threads listed: {}", self.threads);
        println!("    Articles: {}", self.articles);
        println!("    Total attachments: {}", self.attachments);
        println!("    Articles with attachments: {}", self.with_attachments);
    }
}

/// Page through the listing until a short or empty batch.
pub async fn fetch_all_threads<S: ThreadSource>(
    source: &S,
    course_id: u64,
    batch_size: usize,
) -> Result<Vec<Value>> {
    let batch_size = batch_size.max(1);
    let mut all = Vec::new();
    let mut offset = 0;

    loop {
        info!("Fetching batch: offset={}, limit={}", offset, batch_size);
        let batch = source
            .list_threads(course_id, batch_size, offset)
            .await
            .with_context(|| format!("Failed to list threads at offset {}", offset))?;
        if batch.is_empty() {
            break;
        }
        let got = batch.len();
        all.extend(batch);
        info!("Got {} threads (total: {})", got, all.len());
        if got < batch_size {
            break;
        }
        offset += batch_size;
    }
    Ok(all)
}

/// List every thread, fetch full content for the matching category and
/// normalize each into an article.
pub async fn scrape_articles<S: ThreadSource>(
    source: &S,
    config: &ScrapeConfig,
) -> Result<(Vec<Article>, ScrapeStats)> {
    let threads = fetch_all_threads(source, config.course_id, config.batch_size).await?;
    info!("Found {} total threads", threads.len());

    let pb = ProgressBar::new(threads.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut articles = Vec::new();
    for listed in &threads {
        pb.inc(1);
        let category = listed.get("category").and_then(Value::as_str).unwrap_or("");
        if !category.eq_ignore_ascii_case(&config.category) {
            continue;
        }

        let full = match listed.get("id").and_then(Value::as_u64) {
            Some(id) => match source.get_thread(id).await {
                Ok(full) => full,
                Err(e) => {
                    warn!("Could not get full content for {}: {:#}", id, e);
                    listed.clone()
                }
            },
            None => {
                warn!("Thread without numeric id, using listing entry");
                listed.clone()
            }
        };

        if let Some(article) = thread::parse_post(listed, &full, config.course_id, &config.category) {
            debug!(
                "{} ({} files)",
                truncate(article.title(), 50),
                article.attachment_count()
            );
            articles.push(article);
        }
    }
    pb.finish_and_clear();

    let stats = ScrapeStats {
        threads: threads.len(),
        articles: articles.len(),
        attachments: articles.iter().map(Article::attachment_count).sum(),
        with_attachments: articles.iter().filter(|a| a.attachment_count() > 0).count(),
    };
    info!("Processed {} {} threads", stats.articles, config.category);
    Ok((articles, stats))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

// ── Tests ──
