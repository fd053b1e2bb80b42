//! Merge, evaluate and emit across crates

use graft_eval::{Error, OperatorRegistry, evaluate};
use graft_tree::{Cursor, Tree, merge};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn doc(yaml: &str) -> Tree {
    Tree::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap())
}

fn pipeline(layers: &[&str]) -> Result<Tree, Error> {
    let sources: Vec<Tree> = layers.iter().map(|layer| doc(layer)).collect();
    let merged = merge(&sources)?;
    evaluate(merged, &OperatorRegistry::with_builtins())
}

const BASE: &str = r#"
meta:
  name: shop
  domain: example.com
defaults:
  replicas: 1
  resources:
    cpu: 100m
jobs:
- name: api
  host: (( concat meta.name "." meta.domain ))
  settings: (( grab defaults ))
- name: worker
  settings: (( grab defaults ))
"#;

const PROD: &str = r#"
meta:
  domain: shop.io
defaults:
  replicas: 3
jobs:
- (( merge ))
- name: worker
  queue: (( concat "q-" meta.name ))
- name: cron
  _: (( inject defaults ))
"#;

#[test]
fn test_layered_environment() {
    let out = pipeline(&[BASE, PROD]).unwrap();

    let expected = doc(
        r#"
meta:
  name: shop
  domain: shop.io
defaults:
  replicas: 3
  resources:
    cpu: 100m
jobs:
- name: api
  host: shop.shop.io
  settings:
    replicas: 3
    resources:
      cpu: 100m
- name: worker
  settings:
    replicas: 3
    resources:
      cpu: 100m
  queue: q-shop
- name: cron
  replicas: 3
  resources:
    cpu: 100m
"#,
    );
    assert_eq!(out, expected);
}

#[test]
fn test_named_entry_references() {
    let out = pipeline(&[
        "jobs:\n- name: api\n  port: 8080\n- name: web\n  port: (( grab jobs.api.port ))\n",
    ])
    .unwrap();
    let port = Cursor::parse("jobs.web.port").unwrap();
    assert_eq!(out.get(&port), Some(&Tree::from(8080)));
}

#[test]
fn test_emitted_json_is_string_keyed() {
    let out = pipeline(&["1: (( grab name ))\nname: x\nnested:\n  true: yes\n"]).unwrap();
    assert_eq!(
        serde_json::to_string(&out).unwrap(),
        r#"{"1":"x","name":"x","nested":{"true":"yes"}}"#
    );
}

#[rstest]
#[case::merge_failure(
    &["list: {a: 1}\n", "list:\n- (( append ))\n- b\n"],
    "1 error(s) detected:\n - $.list: cannot append into a map\n"
)]
#[case::unknown_operator(
    &["a: (( explode ))\n"],
    "1 error(s) detected:\n - $.a: unknown operator 'explode'\n"
)]
#[case::cycle_in_merge_phase(
    &["a:\n  _: (( inject b ))\nb:\n  _: (( inject a ))\n"],
    "cycle detected in merge phase: $.a._ -> $.b._ -> $.a._"
)]
#[case::several_failures(
    &["z: (( grab nope ))\na: (( concat only ))\n"],
    "2 error(s) detected:\n - $.a: concat operator requires at least two arguments\n - $.z: Unable to resolve `nope`: `$.nope` could not be found in the YAML datastructure\n"
)]
fn test_failures(#[case] layers: &[&str], #[case] message: &str) {
    assert_eq!(pipeline(layers).unwrap_err().to_string(), message);
}
