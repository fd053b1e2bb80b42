use std::io;

use super::Environment;

pub const VAULT_ADDR: &str = "VAULT_ADDR";
pub const VAULT_TOKEN: &str = "VAULT_TOKEN";
/// Token file looked up in the home directory when `VAULT_TOKEN` is unset.
pub const TOKEN_FILE: &str = ".vault-token";

/// How the secret store is reached for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultSettings {
    /// No address configured; secrets are redacted
    Disconnected,
    Connected { address: String, token: String },
    /// An address but no token; every lookup fails
    MissingToken { address: String },
}

impl VaultSettings {
    /// Read `VAULT_ADDR`, then `VAULT_TOKEN` or `~/.vault-token`.
    ///
    /// Empty values count as unset.
    pub fn resolve(env: &dyn Environment) -> Self {
        let Some(address) = non_empty(env.var(VAULT_ADDR)) else {
            return Self::Disconnected;
        };

        match non_empty(env.var(VAULT_TOKEN)).or_else(|| token_file(env)) {
            Some(token) => Self::Connected { address, token },
            None => Self::MissingToken { address },
        }
    }
}

impl VaultSettings {
    /// Short label for logs; never includes the token.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected { .. } => "connected",
            Self::MissingToken { .. } => "missing-token",
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn token_file(env: &dyn Environment) -> Option<String> {
    let path = env.home_dir()?.join(TOKEN_FILE);
    match std::fs::read_to_string(&path) {
        Ok(contents) => non_empty(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unable to read vault token file");
            None
        }
    }
}
