// src/fetch/mod.rs
//! Download an export from remote storage, either through a public share link
//! or after a client-credentials token exchange.

pub mod oauth;

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub use oauth::ClientCredentials;

/// Upstream requests give up after this long unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the wait between two retries.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Wait before retry number `attempt` (1-based): `initial_ms` doubled per
/// earlier attempt, capped at [`MAX_BACKOFF`].
fn backoff_delay(initial_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(initial_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no source URL configured")]
    NotConfigured,
    #[error("upstream returned HTTP {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("timed out waiting for upstream")]
    Timeout,
    #[error("network error talking to upstream")]
    Network(#[source] reqwest::Error),
    #[error("token exchange failed: {0}")]
    Auth(String),
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::from_status(status)
        } else {
            FetchError::Network(e)
        }
    }

    fn from_status(status: StatusCode) -> Self {
        FetchError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }

    /// Network failures and 5xx answers may succeed on a later attempt.
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Where the export lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A direct or share link that needs no credentials.
    PublicLink(Url),
    /// A download URL that needs a bearer token from a client-credentials grant.
    ClientCredentials {
        download_url: Url,
        credentials: ClientCredentials,
    },
}

impl Source {
    pub fn url(&self) -> &Url {
        match self {
            Source::PublicLink(url) => url,
            Source::ClientCredentials { download_url, .. } => download_url,
        }
    }
}

/// Fetches the export text for the relay and the CLI.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    source: Option<Source>,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl Relay {
    pub fn new(source: Option<Source>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(FetchError::Network)?;
        Ok(Self {
            client,
            source,
            max_retries: 0,
            initial_backoff_ms: 500,
        })
    }

    /// Retry transient failures up to `max_retries` times with exponential backoff.
    pub fn with_retries(mut self, max_retries: u32, initial_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Download the configured export as text.
    pub async fn fetch_text(&self) -> Result<String, FetchError> {
        let source = self.source.as_ref().ok_or(FetchError::NotConfigured)?;
        let mut attempts = 0;
        loop {
            match self.fetch_once(source).await {
                Ok(t) => return Ok(t),
                Err(e) if e.is_transient() && attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = backoff_delay(self.initial_backoff_ms, attempts);
                    warn!(url = %source.url(), attempt = attempts, delay = ?backoff, error = %e, "Retrying");
                    sleep(backoff).await;
                }
                Err(e) => {
                    error!(url = %source.url(), error = %e, "fetch failed");
                    return Err(e);
                }
            }
        }
    }

    /// Download an arbitrary public URL with this relay's client.
    pub async fn fetch_url(&self, url: &Url) -> Result<String, FetchError> {
        self.get_text(url, None).await
    }

    #[instrument(level = "info", skip(self, source), fields(url = %source.url()))]
    async fn fetch_once(&self, source: &Source) -> Result<String, FetchError> {
        let text = match source {
            Source::PublicLink(url) => self.get_text(url, None).await?,
            Source::ClientCredentials {
                download_url,
                credentials,
            } => {
                let token = credentials.access_token(&self.client).await?;
                self.get_text(download_url, Some(&token)).await?
            }
        };
        info!(bytes = text.len(), "downloaded export");
        Ok(text)
    }

    async fn get_text(&self, url: &Url, bearer: Option<&str>) -> Result<String, FetchError> {
        debug!("Fetching text from {}", url);
        let mut req = self.client.get(url.clone());
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }
        resp.text().await.map_err(FetchError::from_reqwest)
    }
}

/// Loopback warp server with canned replies, for exercising the relay.
#[cfg(test)]
pub(crate) mod testing {
    use std::{convert::Infallible, sync::Arc, time::Duration};

    use url::Url;
    use warp::{http::StatusCode, path::FullPath, reply::Response, Filter, Reply as _};

    #[derive(Clone)]
    pub struct Reply {
        status: u16,
        body: String,
        require_bearer: Option<String>,
        stall: bool,
    }

    impl Reply {
        pub fn ok(body: &str) -> Self {
            Self::status(200, body)
        }

        pub fn status(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                require_bearer: None,
                stall: false,
            }
        }

        /// Never answer.
        pub fn stall() -> Self {
            Self {
                stall: true,
                ..Self::ok("")
            }
        }

        /// Answer 401 unless the request carries `Authorization: Bearer <token>`.
        pub fn with_bearer(mut self, token: &str) -> Self {
            self.require_bearer = Some(token.to_string());
            self
        }
    }

    /// Serve `routes` (path → reply) until the test ends. Unknown paths get 404.
    pub async fn spawn_server(routes: Vec<(&'static str, Reply)>) -> Url {
        let routes = Arc::new(routes);
        let filter = warp::path::full()
            .and(warp::header::optional::<String>("authorization"))
            .and_then(move |path: FullPath, auth: Option<String>| {
                let routes = Arc::clone(&routes);
                async move { Ok::<_, Infallible>(answer(&routes, path.as_str(), auth).await) }
            });
        let (addr, server) = warp::serve(filter).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    async fn answer(routes: &[(&'static str, Reply)], path: &str, auth: Option<String>) -> Response {
        let reply = routes
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| Reply::status(404, "not found"));

        if reply.stall {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        let authorized = reply
            .require_bearer
            .as_ref()
            .map_or(true, |token| auth.as_deref() == Some(format!("Bearer {token}").as_str()));
        let (status, body) = if authorized {
            (reply.status, reply.body)
        } else {
            (401, "unauthorized".to_string())
        };
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        warp::reply::with_status(body, code).into_response()
    }
}
