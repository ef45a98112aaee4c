//! AUCTIONHAWK: multi-realm auction house scanner and bargain detector
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the item cache from disk (or starts empty), and runs one scan
//! pass, or a watch loop with graceful shutdown when an interval is set.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use auctionhawk::api::auth::Tokens;
use auctionhawk::api::blizzard::BlizzardClient;
use auctionhawk::api::MarketplaceApi;
use auctionhawk::collections::{CollectionTracker, StaticCollection};
use auctionhawk::config::AppConfig;
use auctionhawk::engine::fetcher::AuctionFetcher;
use auctionhawk::engine::realms::RealmDirectory;
use auctionhawk::engine::resolver::{DenyList, ItemResolver};
use auctionhawk::engine::scanner::{ScanContext, ScanOrchestrator, ScanSummary, SnapshotWatch};
use auctionhawk::report::ReportFormatter;
use auctionhawk::storage::ItemCache;
use auctionhawk::strategy::BargainEngine;

const BANNER: &str = r#"
    _   _   _  ___ _____ ___ ___  _  _ _  _   ___      ___  __
   /_\ | | | |/ __|_   _|_ _/ _ \| \| | || | /_\ \    / / |/ /
  / _ \| |_| | (__  | |  | | (_) | .` | __ |/ _ \ \/\/ /| ' <
 /_/ \_\\___/ \___| |_| |___\___/|_|\_|_||_/_/ \_\_/\_/ |_|\_\

  Multi-realm auction scanner
  v0.1.0
"#;

/// Env var naming an alternative config file.
const CONFIG_PATH_ENV: &str = "AUCTIONHAWK_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config_missing = !std::path::Path::new(&config_path).exists();
    let cfg = if config_missing {
        AppConfig::default()
    } else {
        AppConfig::load(&config_path)?
    };

    init_logging();

    println!("{BANNER}");
    if config_missing {
        warn!(path = %config_path, "No config file, using defaults");
    }
    info!(
        region = %cfg.api.region,
        realms = cfg.scan.realms.len(),
        interval_secs = cfg.scan.interval_secs,
        "AUCTIONHAWK starting up"
    );

    // -- Tokens (fatal if absent) ----------------------------------------

    let tokens = Tokens::from_env(&cfg.api)?;

    // -- Item cache ------------------------------------------------------

    let cache = match ItemCache::open(&cfg.cache.path) {
        Ok(cache) => cache,
        Err(e) => {
            warn!(error = %e, "Item cache unreadable, starting empty");
            ItemCache::new(&cfg.cache.path)
        }
    };
    if cfg.cache.read_through {
        info!("Read-through mode: cached item records are ignored this run");
        cache.disable_read();
    }
    let cache = Arc::new(cache);

    // -- Components ------------------------------------------------------

    let api: Arc<dyn MarketplaceApi> = Arc::new(BlizzardClient::new(&cfg.api, tokens.app)?);
    let deny = Arc::new(DenyList::new(cfg.cache.deny_list.iter().copied()));

    let tracker: Option<Arc<dyn CollectionTracker>> = match StaticCollection::load(&cfg.collections.path) {
        Ok(Some(snapshot)) => Some(Arc::new(snapshot)),
        Ok(None) => {
            warn!(
                path = %cfg.collections.path,
                "Collectible rules disabled: no collection snapshot"
            );
            None
        }
        Err(e) => {
            warn!(error = %e, "Collectible rules disabled: collection snapshot unreadable");
            None
        }
    };

    let ctx = ScanContext {
        directory: RealmDirectory::new(Arc::clone(&api), cfg.realms.known.clone()),
        fetcher: AuctionFetcher::new(Arc::clone(&api), Arc::clone(&deny)),
        resolver: ItemResolver::new(Arc::clone(&api), Arc::clone(&cache), deny),
        engine: BargainEngine::from_config(&cfg.strategy, tracker)?,
        max_age: cfg.cache.effective_max_age(),
        deadline: Duration::from_secs(cfg.scan.task_deadline_secs),
    };
    let orchestrator = ScanOrchestrator::new(ctx);

    // -- Cache maintenance -----------------------------------------------

    if let Some((max_age, limit)) = cfg.cache.startup_refresh() {
        orchestrator.context().resolver.refresh_stale(max_age, limit).await;
        save_cache(&cache);
    } else if cfg.cache.refresh_on_start > 0 {
        info!("Cached records never go stale, skipping startup refresh");
    }

    if cfg.cache.list_on_start {
        print!("{}", ReportFormatter::render_cache(&cache.entries()));
    }

    // -- Single pass -----------------------------------------------------

    if cfg.scan.interval_secs == 0 {
        let summary = orchestrator.scan_all(&cfg.scan.realms).await;
        print_report(&summary);
        save_cache(&cache);
        info!(items_cached = cache.len(), "AUCTIONHAWK finished.");
        return Ok(());
    }

    // -- Watch loop ------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.scan.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.scan.interval_secs,
        "Entering watch loop. Press Ctrl+C to stop."
    );

    let mut watch = SnapshotWatch::new();
    let mut passes: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                passes += 1;
                let summary = orchestrator.scan_all(&cfg.scan.realms).await;

                if watch.observe(&summary) {
                    print_report(&summary);
                } else {
                    info!(pass = passes, "Commodity snapshot unchanged, skipping report");
                }

                save_cache(&cache);
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    save_cache(&cache);
    info!(passes, items_cached = cache.len(), "AUCTIONHAWK shut down cleanly.");

    Ok(())
}

fn print_report(summary: &ScanSummary) {
    if summary.reports.is_empty() {
        info!(realms = summary.launched, "No signals this pass");
        return;
    }
    print!("{}", ReportFormatter::render(&summary.reports));
}

fn save_cache(cache: &ItemCache) {
    if let Err(e) = cache.save() {
        error!(error = %e, "Failed to save item cache");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("auctionhawk=info"));

    let json_logging = std::env::var("AUCTIONHAWK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
