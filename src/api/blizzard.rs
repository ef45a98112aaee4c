//! Blizzard Game Data API client.
//!
//! Read-only access to connected realms, auction feeds, and item metadata.
//!
//! API docs: https://develop.battle.net/documentation/world-of-warcraft/game-data-apis
//! Base URL: https://{region}.api.blizzard.com/data/wow
//! Auth: `Authorization: Bearer {token}` on every request.
//! Namespaces: `dynamic-{region}` for realms/auctions, `static-{region}` for items.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{
    decode_auctions, ApiError, AuctionEntry, ConnectedRealmDetail, ItemDocument, MarketplaceApi,
};
use crate::config::ApiConfig;
use crate::types::RealmId;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Upper bound on search pages, in case `pageCount` is ever wrong.
const MAX_SEARCH_PAGES: u32 = 20;

const USER_AGENT: &str = "AUCTIONHAWK/0.1.0 (auction-scanner)";

#[derive(Debug, Clone, Copy)]
enum Namespace {
    Dynamic,
    Static,
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    page_count: u32,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct AuctionsPage {
    #[serde(default)]
    auctions: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blizzard Game Data API client.
pub struct BlizzardClient {
    http: Client,
    base_url: String,
    region: String,
    locale: String,
    token: SecretString,
}

impl BlizzardClient {
    /// Create a client for the configured region.
    pub fn new(cfg: &ApiConfig, token: SecretString) -> Result<Self> {
        let base_url = format!("https://{}.api.blizzard.com/data/wow", cfg.region);
        Self::with_base_url(cfg, token, base_url)
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(cfg: &ApiConfig, token: SecretString, base_url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for Blizzard API")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            region: cfg.region.clone(),
            locale: cfg.locale.clone(),
            token,
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn url(&self, path: &str, namespace: Namespace, extra: &[(&str, String)]) -> String {
        let ns = match namespace {
            Namespace::Dynamic => format!("dynamic-{}", self.region),
            Namespace::Static => format!("static-{}", self.region),
        };
        let mut url = format!(
            "{}{}?namespace={}&locale={}",
            self.base_url,
            path,
            urlencoding::encode(&ns),
            urlencoding::encode(&self.locale),
        );
        for (key, value) in extra {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// GET a URL and decode the body into `T`, surfacing body-level error codes.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T, ApiError> {
        debug!(endpoint, "Fetching");

        let resp = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| ApiError::Http {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Http {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let value: serde_json::Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                })
            }
            Err(e) => {
                return Err(ApiError::Decode {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })
            }
        };

        check_error_body(endpoint, &value)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

/// Reject bodies that carry a numeric `code` or a `"status": "nok"` marker.
pub(crate) fn check_error_body(endpoint: &str, body: &serde_json::Value) -> Result<(), ApiError> {
    if let Some(code) = body.get("code").and_then(|c| c.as_i64()) {
        let detail = body
            .get("detail")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string();
        return Err(ApiError::Api {
            endpoint: endpoint.to_string(),
            code,
            detail,
        });
    }

    if body.get("status").and_then(|s| s.as_str()) == Some("nok") {
        let detail = body
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();
        return Err(ApiError::Api {
            endpoint: endpoint.to_string(),
            code: 0,
            detail,
        });
    }

    Ok(())
}

#[async_trait]
impl MarketplaceApi for BlizzardClient {
    async fn connected_realm_ids(&self) -> Result<Vec<RealmId>, ApiError> {
        let mut ids = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.url(
                "/search/connected-realm",
                Namespace::Dynamic,
                &[("status.type", "UP".to_string()), ("_page", page.to_string())],
            );
            let body: SearchPage = self.get_json("connected-realm search", &url).await?;
            ids.extend(body.results.into_iter().map(|r| RealmId(r.data.id)));

            if page >= body.page_count || page >= MAX_SEARCH_PAGES {
                break;
            }
            page += 1;
        }

        debug!(count = ids.len(), "Connected realms listed");
        Ok(ids)
    }

    async fn connected_realm(&self, id: RealmId) -> Result<ConnectedRealmDetail, ApiError> {
        let url = self.url(&format!("/connected-realm/{id}"), Namespace::Dynamic, &[]);
        self.get_json("connected-realm", &url).await
    }

    async fn auctions(&self, id: RealmId) -> Result<Vec<AuctionEntry>, ApiError> {
        let url = self.url(&format!("/connected-realm/{id}/auctions"), Namespace::Dynamic, &[]);
        let page: AuctionsPage = self.get_json("auctions", &url).await?;
        Ok(decode_auctions(page.auctions))
    }

    async fn commodities(&self) -> Result<Vec<AuctionEntry>, ApiError> {
        let url = self.url("/auctions/commodities", Namespace::Dynamic, &[]);
        let page: AuctionsPage = self.get_json("commodities", &url).await?;
        Ok(decode_auctions(page.auctions))
    }

    async fn item(&self, id: i64) -> Result<ItemDocument, ApiError> {
        let url = self.url(&format!("/item/{id}"), Namespace::Static, &[]);
        self.get_json("item", &url).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
