//! Bearer-token supply.

use async_trait::async_trait;

use crate::error::Result;

/// Supplies bearer tokens. `force_refresh` is set after the server rejected a token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self, force_refresh: bool) -> Result<String>;
}

/// A fixed token that is never refreshed.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticToken").field(&"[REDACTED]").finish()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self, _force_refresh: bool) -> Result<String> {
        Ok(self.0.clone())
    }
}
