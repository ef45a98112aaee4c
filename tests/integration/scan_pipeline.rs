//! End-to-end scan tests.
//!
//! Exercises realm resolution → listing fetch → item resolution → rule
//! evaluation → report across several realms at once, including realms
//! that fail in each stage.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use auctionhawk::api::MarketplaceApi;
use auctionhawk::engine::fetcher::AuctionFetcher;
use auctionhawk::engine::realms::RealmDirectory;
use auctionhawk::engine::resolver::{DenyList, ItemResolver};
use auctionhawk::engine::scanner::{ScanContext, ScanOrchestrator};
use auctionhawk::report::ReportFormatter;
use auctionhawk::storage::ItemCache;
use auctionhawk::strategy::arbitrage::ArbitrageRule;
use auctionhawk::strategy::watchlist::WatchListRule;
use auctionhawk::strategy::BargainEngine;
use auctionhawk::types::{MarketKind, SignalKind};

use crate::mock_api::{commodity, listing, MockMarketplace};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RUNECLOTH: i64 = 14047;
const LINEN: i64 = 2589;
const ANCHOR_WEED: i64 = 152510;

fn temp_cache_path() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("auctionhawk_it_cache_{}.json", uuid::Uuid::new_v4()));
    p
}

/// Five connected realms: two healthy, one failing, one stalled, one empty.
fn marketplace() -> MockMarketplace {
    MockMarketplace::new()
        .with_realm(
            3678,
            "Sisters of Elune",
            vec![listing(1, RUNECLOTH, 100, 2), listing(2, RUNECLOTH, 150, 3)],
        )
        .with_realm(
            11,
            "Area 52",
            vec![listing(3, ANCHOR_WEED, 900, 20), listing(4, LINEN, 5, 1)],
        )
        .with_realm(60, "Stormrage", vec![listing(5, RUNECLOTH, 1, 100)])
        .with_realm(61, "Illidan", vec![listing(6, RUNECLOTH, 1, 100)])
        .with_realm(62, "Ner'zhul", Vec::new())
        .failing(60)
        .stalled(61, Duration::from_secs(30))
        .with_commodities(vec![
            commodity(10, LINEN, 2, 400),
            commodity(11, LINEN, 3, 100),
        ])
        .with_item(RUNECLOTH, "Runecloth", 300)
        .with_item(LINEN, "Linen Cloth", 13)
        .with_item(ANCHOR_WEED, "Anchor Weed", 0)
}

fn orchestrator(api: Arc<MockMarketplace>, cache: Arc<ItemCache>) -> ScanOrchestrator {
    let api: Arc<dyn MarketplaceApi> = api;
    let deny = Arc::new(DenyList::default());

    ScanOrchestrator::new(ScanContext {
        directory: RealmDirectory::new(Arc::clone(&api), HashMap::new()),
        fetcher: AuctionFetcher::new(Arc::clone(&api), Arc::clone(&deny)),
        resolver: ItemResolver::new(Arc::clone(&api), cache, deny),
        engine: BargainEngine::new(
            WatchListRule::new(HashMap::from([(ANCHOR_WEED, 1000)])),
            ArbitrageRule::new(500),
            None,
        ),
        max_age: Some(chrono::Duration::hours(1)),
        deadline: Duration::from_millis(300),
    })
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_every_task_reports_back_despite_failures() {
    let api = Arc::new(marketplace());
    let scan = orchestrator(Arc::clone(&api), Arc::new(ItemCache::new(temp_cache_path())));

    let requested = names(&[
        "Sisters of Elune",
        "Atlantis",   // not found
        "Stormrage",  // auction fetch fails
        "Illidan",    // exceeds deadline
        "Ner'zhul",   // no listings
        "Area 52",
        "Commodities",
    ]);

    let summary = tokio::time::timeout(Duration::from_secs(10), scan.scan_all(&requested))
        .await
        .expect("scan must not hang");

    assert_eq!(summary.launched, 7);
    assert_eq!(summary.completed, 7);
    assert_eq!(summary.empty, 4);

    let realms: Vec<&str> = summary.reports.iter().map(|r| r.realm.as_str()).collect();
    assert_eq!(realms, vec!["Area 52", "Sisters of Elune", "Commodities"]);
}

#[tokio::test]
async fn test_signals_per_realm() {
    let api = Arc::new(marketplace());
    let scan = orchestrator(Arc::clone(&api), Arc::new(ItemCache::new(temp_cache_path())));
    let summary = scan
        .scan_all(&names(&["Sisters of Elune", "Area 52", "Commodities"]))
        .await;

    let by_realm: HashMap<&str, _> = summary
        .reports
        .iter()
        .map(|r| (r.realm.as_str(), r))
        .collect();

    let sisters = &by_realm["Sisters of Elune"].signals;
    assert_eq!(sisters.len(), 1);
    assert_eq!(sisters[0].kind, SignalKind::Arbitrage);
    assert_eq!(sisters[0].rank, 850);

    // Anchor Weed at 900 is under its 1000 ceiling; one linen listing is
    // only 8 copper of profit, under the arbitrage minimum.
    let area = &by_realm["Area 52"].signals;
    assert_eq!(area.len(), 1);
    assert_eq!(area[0].display, "Anchor Weed");
    assert_eq!(area[0].kind, SignalKind::NeededGood);

    // (13 - 2) * 400 + (13 - 3) * 100 = 5400
    let commodities = by_realm["Commodities"];
    assert_eq!(commodities.kind, MarketKind::Commodity);
    assert_eq!(commodities.signals[0].rank, 5400);
}

#[tokio::test]
async fn test_realm_search_runs_once_across_passes() {
    let api = Arc::new(marketplace());
    let scan = orchestrator(Arc::clone(&api), Arc::new(ItemCache::new(temp_cache_path())));

    scan.scan_all(&names(&["Sisters of Elune"])).await;
    scan.scan_all(&names(&["Sisters of Elune"])).await;
    assert_eq!(MockMarketplace::calls(&api.search_calls), 1);

    // A new name searches once more; the known one stays memoised.
    scan.scan_all(&names(&["Area 52", "Sisters of Elune"])).await;
    scan.scan_all(&names(&["Area 52", "Sisters of Elune"])).await;
    assert_eq!(MockMarketplace::calls(&api.search_calls), 2);
    assert_eq!(MockMarketplace::calls(&api.auction_calls), 6);
}

#[tokio::test]
async fn test_warm_cache_avoids_item_fetches() {
    let path = temp_cache_path();
    let api = Arc::new(marketplace());

    let cache = Arc::new(ItemCache::new(&path));
    let scan = orchestrator(Arc::clone(&api), Arc::clone(&cache));
    scan.scan_all(&names(&["Sisters of Elune", "Commodities"])).await;
    let fetched = MockMarketplace::calls(&api.item_calls);
    assert!(fetched >= 2);
    cache.save().unwrap();

    // A fresh process restoring the saved cache resolves everything locally.
    let restored = Arc::new(ItemCache::open(&path).unwrap());
    assert_eq!(restored.ids(), cache.ids());
    let scan = orchestrator(Arc::clone(&api), restored);
    let summary = scan.scan_all(&names(&["Sisters of Elune", "Commodities"])).await;

    assert_eq!(MockMarketplace::calls(&api.item_calls), fetched);
    assert_eq!(summary.reports.len(), 2);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_report_prints_commodities_last() {
    let api = Arc::new(marketplace());
    let scan = orchestrator(Arc::clone(&api), Arc::new(ItemCache::new(temp_cache_path())));
    let summary = scan
        .scan_all(&names(&["Commodities", "Sisters of Elune", "Area 52"]))
        .await;

    let text = ReportFormatter::render(&summary.reports);
    let area = text.find("=== Area 52").unwrap();
    let sisters = text.find("=== Sisters of Elune").unwrap();
    let commodities = text.find("=== Commodities").unwrap();
    assert!(area < sisters && sisters < commodities);
}
