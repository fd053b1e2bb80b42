use std::sync::OnceLock;
use std::time::Duration;

/// Header carrying the store token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// Performs authenticated GET requests against the secret store.
pub trait SecretTransport: Send + Sync {
    fn get(&self, url: &str, token: &str) -> Result<TransportResponse, TransportError>;
}

/// Blocking HTTP transport. The calling worker waits for the response.
///
/// The underlying client is built on first use and shared by every lookup.
#[derive(Debug, Default)]
pub struct HttpTransport {
    client: OnceLock<Result<reqwest::blocking::Client, TransportError>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, certificates, timeouts).
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self {
            client: OnceLock::from(Ok(client)),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        self.client
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(REQUEST_TIMEOUT)
                    .build()
                    .map_err(TransportError::from)
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl SecretTransport for HttpTransport {
    fn get(&self, url: &str, token: &str) -> Result<TransportResponse, TransportError> {
        let response = self.client()?.get(url).header(TOKEN_HEADER, token).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        tracing::debug!(url, status, "secret store responded");
        Ok(TransportResponse { status, body })
    }
}
