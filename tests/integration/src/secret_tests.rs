//! Secret lookups end to end with a canned store

use std::collections::HashMap;
use std::sync::Arc;

use graft_eval::{
    OperatorRegistry, SecretTransport, StaticEnvironment, TransportError, TransportResponse,
    evaluate,
};
use graft_tree::{Tree, merge};
use pretty_assertions::assert_eq;

/// Serves fixed bodies per URL; anything else is a 404.
struct CannedStore {
    secrets: HashMap<String, String>,
}

impl SecretTransport for CannedStore {
    fn get(&self, url: &str, token: &str) -> Result<TransportResponse, TransportError> {
        if token != "root" {
            return Ok(TransportResponse {
                status: 403,
                body: r#"{"errors":["permission denied"]}"#.to_string(),
            });
        }
        Ok(match self.secrets.get(url) {
            Some(body) => TransportResponse {
                status: 200,
                body: body.clone(),
            },
            None => TransportResponse {
                status: 404,
                body: r#"{"errors":[]}"#.to_string(),
            },
        })
    }
}

fn registry(token: &str) -> OperatorRegistry {
    let store = CannedStore {
        secrets: HashMap::from([(
            "https://vault.test/v1/secret/prod/db".to_string(),
            r#"{"data":{"user":"app","password":"s3cr3t"}}"#.to_string(),
        )]),
    };
    let env = StaticEnvironment::new()
        .with_var("VAULT_ADDR", "https://vault.test")
        .with_var("VAULT_TOKEN", token);
    OperatorRegistry::with_builtins_using(Arc::new(env), Arc::new(store))
}

fn doc(yaml: &str) -> Tree {
    Tree::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap())
}

const BASE: &str = r#"
meta:
  env: dev
database:
  user: (( vault (concat "secret/" meta.env "/db:user") ))
  url: (( concat "postgres://" database.user "@db" ))
"#;

#[test]
fn test_secrets_feed_other_operators() {
    let merged = merge(&[doc(BASE), doc("meta:\n  env: prod\n")]).unwrap();

    let out = evaluate(merged, &registry("root")).unwrap();
    assert_eq!(
        out,
        doc("meta:\n  env: prod\ndatabase:\n  user: app\n  url: postgres://app@db\n")
    );
}

#[test]
fn test_rejected_token() {
    let out = evaluate(
        doc("pw: (( vault \"secret/prod/db:password\" ))\n"),
        &registry("guest"),
    );
    assert_eq!(
        out.unwrap_err().to_string(),
        "1 error(s) detected:\n - $.pw: failed to retrieve secret/prod/db:password from Vault (https://vault.test): permission denied\n"
    );
}

#[test]
fn test_unknown_secret_path() {
    let out = evaluate(
        doc("pw: (( vault \"secret/dev/db:password\" ))\n"),
        &registry("root"),
    );
    assert_eq!(
        out.unwrap_err().to_string(),
        "1 error(s) detected:\n - $.pw: secret secret/dev/db:password not found\n"
    );
}
