//! Bearer tokens.
//!
//! Token acquisition (OAuth client-credentials) happens outside this
//! process; the app token arrives through the environment once at start
//! and is never refreshed during a run. Collection ownership comes from a
//! local snapshot, so no user-profile token is read.

use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::config::{ApiConfig, AppConfig};

/// Tokens available for the run.
pub struct Tokens {
    /// App-level token for Game Data endpoints. Required.
    pub app: SecretString,
}

impl Tokens {
    /// Read tokens from the env vars named in config.
    ///
    /// A missing app token is fatal: nothing can be scanned without it.
    pub fn from_env(cfg: &ApiConfig) -> Result<Self> {
        let app = match AppConfig::resolve_env(&cfg.token_env) {
            Ok(token) if !token.trim().is_empty() => SecretString::new(token.trim().to_string()),
            _ => bail!(
                "No access token obtainable: set {} to an app-level bearer token",
                cfg.token_env
            ),
        };

        info!(app_token_len = app.expose_secret().len(), "Tokens loaded");

        Ok(Self { app })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(token_env: &str) -> ApiConfig {
        ApiConfig {
            token_env: token_env.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_missing_app_token_is_fatal() {
        let result = Tokens::from_env(&cfg("AUCTIONHAWK_TEST_UNSET_TOKEN_8812"));
        assert!(result.is_err());
    }

    #[test]
    fn test_app_token_loaded_and_trimmed() {
        std::env::set_var("AUCTIONHAWK_TEST_APP_TOKEN_4471", "  abc123 \n");
        let tokens = Tokens::from_env(&cfg("AUCTIONHAWK_TEST_APP_TOKEN_4471")).unwrap();
        assert_eq!(tokens.app.expose_secret(), "abc123");
    }
}
