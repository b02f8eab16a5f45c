//! Authenticated session against one organization.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::auth::TokenSource;
use super::request::{ApiRequest, endpoint};
use super::response::{ApiResponse, classify};
use super::transport::Transport;
use crate::error::{Error, Result};
use crate::types::ApiSurface;

const UNAUTHORIZED: u16 = 401;

/// Base URL, organization and credentials shared read-only by every operation.
#[derive(Clone)]
pub struct Connection {
    base_url: String,
    organization: String,
    verbosity: u8,
    surface: ApiSurface,
    tokens: Arc<dyn TokenSource>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("verbosity", &self.verbosity)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(
        base_url: impl Into<String>,
        organization: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let surface = ApiSurface::detect(&base_url);
        Self {
            base_url,
            organization: organization.into(),
            verbosity: 0,
            surface,
            tokens,
            transport,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn surface(&self) -> ApiSurface {
        self.surface
    }

    /// URL under the organization base.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        endpoint(&self.base_url, segments)
    }

    /// Send `request` with a fresh bearer token and classify the response.
    ///
    /// A 401 triggers exactly one forced token refresh and resend. Any status
    /// outside `accepted` becomes [`Error::Transport`].
    pub async fn execute(
        &self,
        request: ApiRequest,
        accepted: &[u16],
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        if self.verbosity > 0 {
            info!(method = %request.method, url = %request.url, "request");
        } else {
            debug!(method = %request.method, url = %request.url, "request");
        }

        let response = self.send_authorized(request.clone(), false, cancel).await?;
        let response = if response.status == UNAUTHORIZED && !accepted.contains(&UNAUTHORIZED) {
            debug!(url = %request.url, "token rejected, refreshing");
            self.send_authorized(request, true, cancel).await?
        } else {
            response
        };

        debug!(status = response.status, "response");
        classify(response, accepted)
    }

    async fn send_authorized(
        &self,
        request: ApiRequest,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            token = self.tokens.token(force_refresh) => token?,
        };
        let request = request.header("authorization", format!("Bearer {}", token));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            response = self.transport.send(request) => response,
        }
    }
}
