use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sheetfront_error::Result;
use tracing::debug;

use super::credentials::ServiceAccountKey;
use crate::client::HttpClient;

/// Tokens are refreshed once they're this close to expiring.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Source of bearer tokens for Google API requests.
#[derive(Debug, Clone)]
pub enum TokenSource<C: HttpClient> {
    /// Exchange a signed service account jwt for access tokens, reusing each
    /// token until it's about to expire.
    ServiceAccount {
        client: C,
        key: Arc<ServiceAccountKey>,
        current: Arc<Mutex<Option<CachedToken>>>,
    },
    /// A fixed token.
    Static(String),
}

impl<C> TokenSource<C>
where
    C: HttpClient,
{
    pub fn service_account(client: C, key: ServiceAccountKey) -> Self {
        TokenSource::ServiceAccount {
            client,
            key: Arc::new(key),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        TokenSource::Static(token.into())
    }

    /// Get a token to use in the 'Authorization' header.
    pub async fn bearer_token(&self) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount {
                client,
                key,
                current,
            } => {
                let now = Utc::now();
                let cached = current.lock().clone();
                if let Some(cached) = cached.filter(|c| c.is_fresh(now)) {
                    return Ok(cached.token);
                }

                debug!(client_email = %key.account().client_email, "fetching access token");
                let tok = key.fetch_access_token(client, now).await?;
                let cached = CachedToken {
                    token: tok.access_token,
                    expires_at: now + Duration::seconds(tok.expires_in as i64),
                };
                let token = cached.token.clone();
                *current.lock() = Some(cached);

                Ok(token)
            }
        }
    }
}
