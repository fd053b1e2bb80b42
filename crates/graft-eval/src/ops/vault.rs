use std::sync::{Arc, Mutex, PoisonError};

use graft_tree::Tree;
use serde::Deserialize;

use crate::expr::{Expr, Resolved};
use crate::operator::{OpContext, Operator, OperatorError, Response};
use crate::vault::{Environment, SecretTransport, VaultError, VaultSettings, REDACTED};

/// `(( vault "path/to/secret:key" ))`: fetch a secret from the store.
///
/// Without `VAULT_ADDR` every lookup yields `REDACTED`. Settings are read
/// during setup and reused for the rest of the run.
pub struct VaultOperator {
    env: Arc<dyn Environment>,
    transport: Arc<dyn SecretTransport>,
    settings: Mutex<Option<VaultSettings>>,
}

#[derive(Deserialize)]
struct SecretBody {
    data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

impl VaultOperator {
    pub fn new(env: Arc<dyn Environment>, transport: Arc<dyn SecretTransport>) -> Self {
        Self {
            env,
            transport,
            settings: Mutex::new(None),
        }
    }

    fn settings(&self) -> VaultSettings {
        let mut cached = self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cached
            .get_or_insert_with(|| VaultSettings::resolve(self.env.as_ref()))
            .clone()
    }

    /// The `path:key` text an argument stands for.
    fn secret_name(ctx: &OpContext<'_>, arg: &Expr) -> Result<String, OperatorError> {
        let value = match ctx.resolve(arg)? {
            Resolved::Reference { cursor, value } => match value {
                Tree::String(text) => return Ok(text.clone()),
                _ => {
                    return Err(OperatorError::argument(format!(
                        "tried to look up $.{cursor}, which is not a string scalar"
                    )));
                }
            },
            Resolved::Literal(value) => value,
            Resolved::Call { name, args } => ctx.call(name, args)?,
        };

        match value {
            Tree::String(text) => Ok(text),
            other => Err(invalid_argument(
                &other.scalar_text().unwrap_or_else(|| arg.to_string()),
            )),
        }
    }

    fn fetch(
        &self,
        address: &str,
        token: &str,
        path: &str,
        key: &str,
    ) -> Result<String, VaultError> {
        let secret = format!("{path}:{key}");
        let url = format!("{}/v1/{}", address.trim_end_matches('/'), path);
        tracing::debug!(%secret, "fetching secret");

        let response = self
            .transport
            .get(&url, token)
            .map_err(|err| VaultError::Retrieve {
                secret: secret.clone(),
                address: address.to_string(),
                message: err.to_string(),
            })?;

        match response.status {
            404 => return Err(VaultError::NotFound { secret }),
            200..=299 => {}
            status => {
                let message = serde_json::from_str::<ErrorBody>(&response.body)
                    .ok()
                    .filter(|body| !body.errors.is_empty())
                    .map(|body| body.errors.join(", "))
                    .unwrap_or_else(|| format!("status {status}"));
                return Err(VaultError::Retrieve {
                    secret,
                    address: address.to_string(),
                    message,
                });
            }
        }

        let body: SecretBody =
            serde_json::from_str(&response.body).map_err(|_| VaultError::BadJson {
                body: response.body.clone(),
            })?;
        match body.data.get(key) {
            None => Err(VaultError::NotFound { secret }),
            Some(serde_json::Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(VaultError::NotAString { secret }),
        }
    }
}

fn invalid_argument(arg: &str) -> OperatorError {
    OperatorError::argument(format!(
        "invalid argument {arg}; must be in the form path/to/secret:key"
    ))
}

impl Operator for VaultOperator {
    fn setup(&self) -> Result<(), OperatorError> {
        let settings = VaultSettings::resolve(self.env.as_ref());
        tracing::debug!(mode = settings.mode(), "resolved vault settings");
        *self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(settings);
        Ok(())
    }

    fn run(&self, ctx: &OpContext<'_>, args: &[Expr]) -> Result<Response, OperatorError> {
        if args.len() != 1 {
            return Err(OperatorError::argument(
                "vault operator requires exactly one argument",
            ));
        }

        let name = Self::secret_name(ctx, &args[0])?;
        let (path, key) = name
            .split_once(':')
            .filter(|(path, key)| !path.is_empty() && !key.is_empty())
            .ok_or_else(|| invalid_argument(&name))?;

        let secret = match self.settings() {
            VaultSettings::Disconnected => REDACTED.to_string(),
            VaultSettings::MissingToken { .. } => return Err(VaultError::MissingToken.into()),
            VaultSettings::Connected { address, token } => {
                self.fetch(&address, &token, path, key)?
            }
        };
        Ok(Response::Replace(Tree::String(secret)))
    }
}
