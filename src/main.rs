mod catalog;
mod fetch;
mod phash;
mod pipeline;
mod rank;
mod search;
mod title;
mod translate;

pub const USER_AGENT: &str = concat!("covermatch/", env!("CARGO_PKG_VERSION"));

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

use catalog::CatalogClient;
use pipeline::{CancelFlag, ImageSource, PipelineRequest, PipelineResult};
use rank::RankOptions;
use search::SearchOptions;
use translate::HttpTranslator;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

/// Find catalog book covers visually similar to an image.
///
/// Configuration via environment variables:
/// - `BOOKS_API_KEY`: catalog access credential (required)
/// - `BOOKS_API_BASE`: catalog endpoint override (optional)
/// - `TRANSLATE_API_URL`: translation endpoint for multilingual queries (optional)
#[derive(Debug, Parser)]
#[command(name = "covermatch", version, about)]
struct Args {
    /// Path to the query image.
    #[arg(required_unless_present = "url", conflicts_with = "url")]
    image: Option<PathBuf>,

    /// Fetch the query image from a URL instead of a file.
    #[arg(long)]
    url: Option<String>,

    /// Name to mine for search terms; defaults to the file or URL name.
    #[arg(long)]
    name: Option<String>,

    /// Query for the generic fallback tier.
    #[arg(long, default_value = "book cover")]
    fallback_query: String,

    /// Minimum similarity percentage to keep a match.
    #[arg(long, default_value_t = 70.0)]
    threshold: f64,

    /// Maximum number of matches to report.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Catalog results requested per title variation.
    #[arg(long, default_value_t = 5)]
    max_per_variation: u32,

    /// Catalog results requested by the generic fallback.
    #[arg(long, default_value_t = 20)]
    max_generic: u32,

    /// How many translation languages to try, in priority order.
    #[arg(long, default_value_t = 3)]
    languages: usize,

    /// Skip translation even when an endpoint is configured.
    #[arg(long)]
    no_translate: bool,

    /// Concurrent cover downloads. 1 is strictly sequential.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Extracted titles at or below this length skip the title tier.
    #[arg(long, default_value_t = 2)]
    min_title_len: usize,

    /// Print the result as JSON instead of a report.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("covermatch=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;

    let catalog = CatalogClient::from_env(http.clone())?;
    let translator = if args.no_translate {
        None
    } else {
        HttpTranslator::from_env(http.clone())
            .inspect_err(|e| warn!("translator not available: {e}"))
            .ok()
    };

    let (image, image_name) = match (&args.image, &args.url) {
        (Some(path), None) => {
            let name = args.name.clone().unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            (ImageSource::Bytes(std::fs::read(path)?), name)
        }
        (None, Some(url)) => {
            let name = args.name.clone().unwrap_or_else(|| {
                url.rsplit('/').next().unwrap_or_default().to_string()
            });
            (ImageSource::Url(url.clone()), name)
        }
        _ => return Err("provide an image path or --url".into()),
    };

    let request = PipelineRequest {
        image,
        image_name,
        fallback_query: args.fallback_query.clone(),
        search: SearchOptions {
            max_results_per_variation: args.max_per_variation,
            max_generic_results: args.max_generic,
            min_title_len: args.min_title_len,
            max_languages: args.languages,
        },
        rank: RankOptions {
            threshold: args.threshold,
            top_n: args.top,
            concurrency: args.concurrency,
        },
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let result = pipeline::run(
        &catalog,
        translator.as_ref(),
        &http,
        &request,
        &cancel,
        |done, total, current| eprintln!("  comparing {done}/{total}: {current}"),
    )
    .await?;

    info!(matches = result.matches.len(), method = %result.method, "pipeline complete");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }
    Ok(())
}

fn print_report(result: &PipelineResult) {
    println!("target hash : {}", result.target_hash);
    println!("method      : {} (query: {:?})", result.method, result.query);
    println!(
        "compared    : {} candidate cover(s), {} above threshold",
        result.compared,
        result.matches.len()
    );

    for m in &result.matches {
        let id = m.candidate.id.as_deref().unwrap_or("-");
        println!();
        println!(
            "{:>7.2}%  {}  {}",
            m.similarity,
            id,
            m.candidate.title
        );
        if !m.candidate.authors.is_empty() {
            println!("          by {}", m.candidate.authors.join(", "));
        }
        let mut provenance: Vec<&str> = Vec::new();
        if let Some(publisher) = &m.candidate.publisher {
            provenance.push(publisher.as_str());
        }
        if let Some(published) = &m.candidate.published {
            provenance.push(published.as_str());
        }
        if !provenance.is_empty() {
            println!("          {}", provenance.join(", "));
        }
        println!("          hash {}  distance {}", m.hash, m.distance);
        println!("          {}", m.candidate.cover_url);
    }
}
