//! Secret-store access for the `vault` operator
//!
//! Configuration comes from an [`Environment`] so callers (and tests) can
//! supply it without touching the process environment. Requests go through a
//! [`SecretTransport`]; [`HttpTransport`] is the real one.

mod env;
mod settings;
mod transport;

pub use env::{Environment, ProcessEnvironment, StaticEnvironment};
pub use settings::{VaultSettings, TOKEN_FILE, VAULT_ADDR, VAULT_TOKEN};
pub use transport::{
    HttpTransport, SecretTransport, TransportError, TransportResponse, TOKEN_HEADER,
};

/// Value substituted for secrets when no store address is configured.
pub const REDACTED: &str = "REDACTED";

/// Failures talking to, or interpreting answers from, the secret store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("VAULT_ADDR specified, but no VAULT_TOKEN or ~/.vault-token found")]
    MissingToken,

    #[error("secret {secret} not found")]
    NotFound { secret: String },

    #[error("bad JSON response received from Vault: \"{body}\"")]
    BadJson { body: String },

    #[error("secret {secret} is not a string")]
    NotAString { secret: String },

    /// Non-success status, or the request never completed
    #[error("failed to retrieve {secret} from Vault ({address}): {message}")]
    Retrieve {
        secret: String,
        address: String,
        message: String,
    },
}
