mod article;
mod config;
mod curate;
mod scraper;
mod store;
mod thread;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use config::Rules;
use curate::classify::Classifier;
use curate::links::LinkExtractor;
use curate::similar;
use curate::tags::Tagger;
use curate::TitleFilter;
use scraper::{EdClient, ScrapeConfig};

#[derive(Parser)]
#[command(name = "ed_curiosity", about = "Ed Stem Curiosity thread scraper and curator")]
struct Cli {
    /// Article store (JSON array of articles)
    #[arg(long, global = true, default_value = store::STORE_PATH)]
    store: PathBuf,
    /// JSON file overriding the built-in keyword rules
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch threads from Ed and overwrite the store
    Scrape {
        /// Ed course id
        #[arg(long, env = "ED_COURSE_ID", default_value_t = 84647)]
        course: u64,
        /// Ed API token
        #[arg(long, env = "ED_API_TOKEN", hide_env_values = true)]
        token: String,
        /// Thread category to keep
        #[arg(long, default_value = "curiosity")]
        category: String,
        /// Threads per listing request
        #[arg(long, default_value_t = scraper::BATCH_SIZE)]
        batch_size: usize,
    },
    /// Attach external links found in each article's body and summary
    Links,
    /// Keep Special Participation E posts and fill in missing subcategories
    Filter {
        /// Where to write the filtered list (default: overwrite the store)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Assign course-topic tags
    Tag,
    /// Record the most related posts of each article
    Similar {
        /// Related posts per article
        #[arg(short = 'n', long, default_value_t = similar::DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let rules = Rules::resolve(cli.rules.as_deref())?;

    let result = match cli.command {
        Commands::Scrape {
            course,
            token,
            category,
            batch_size,
        } => {
            let ed = EdClient::new(token)?;
            let who = ed.login().await?;
            info!("Logged in to Ed as {}", who);

            let config = ScrapeConfig {
                course_id: course,
                category,
                batch_size,
            };
            let (articles, stats) = scraper::scrape_articles(&ed, &config).await?;
            store::save(&cli.store, &articles)?;
            println!("Saved {} articles to {}", articles.len(), cli.store.display());
            stats.print();
            Ok(())
        }
        Commands::Links => {
            let mut articles = load(&cli.store)?;
            let extractor = LinkExtractor::new(&rules.internal_domains);
            let report = curate::annotate_links(&mut articles, &extractor);
            store::save(&cli.store, &articles)?;
            println!("Updated {}", cli.store.display());
            report.print();
            Ok(())
        }
        Commands::Filter { output } => {
            let articles = load(&cli.store)?;
            let filter = TitleFilter::new(&rules.title_phrases);
            let classifier = Classifier::new(
                rules.categories.clone(),
                &rules.default_category,
                &rules.unclassified_label,
            );
            let (kept, report) = curate::filter_and_classify(articles, &filter, &classifier);
            let out = output.unwrap_or_else(|| cli.store.clone());
            store::save(&out, &kept)?;
            report.print();
            println!("\nSaved {} articles to {}", kept.len(), out.display());
            Ok(())
        }
        Commands::Tag => {
            let mut articles = load(&cli.store)?;
            let tagger = Tagger::new(&rules.topics)?;
            let tagged = tagger.tag_all(&mut articles);
            store::save(&cli.store, &articles)?;
            println!("Tagged {} articles out of {}", tagged, articles.len());
            Ok(())
        }
        Commands::Similar { limit } => {
            let mut articles = load(&cli.store)?;
            let linked = similar::annotate_similar(&mut articles, limit);
            store::save(&cli.store, &articles)?;
            println!("Recorded related posts for {} articles", linked);
            Ok(())
        }
        Commands::Stats => {
            let articles = load(&cli.store)?;
            let with_links = articles.iter().filter(|a| !a.external_links().is_empty()).count();
            let links: usize = articles.iter().map(|a| a.external_links().len()).sum();
            let with_attachments = articles.iter().filter(|a| a.attachment_count() > 0).count();
            let tagged = articles.iter().filter(|a| !a.tags().is_empty()).count();
            println!("Articles:          {}", articles.len());
            println!("With links:        {} ({} links)", with_links, links);
            println!("With attachments:  {}", with_attachments);
            println!("Tagged:            {}", tagged);
            println!("\nSubcategories:");
            for (label, count) in curate::distribution(&articles) {
                let label = if label.is_empty() { "(none)" } else { label.as_str() };
                println!("  {}: {}", label, count);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load(path: &Path) -> Result<Vec<article::Article>> {
    info!("Reading articles from {}", path.display());
    let articles = store::load(path)?;
    info!("Processing {} articles", articles.len());
    Ok(articles)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
