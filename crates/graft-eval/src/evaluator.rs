//! Two-phase evaluation of placeholder call sites
//!
//! For each phase the evaluator discovers call sites, asks their operators
//! for dependencies, orders the sites into waves and runs them. Sites in one
//! wave are independent of each other and may run in parallel against the
//! same tree; their responses are applied one by one, in document order,
//! before the next wave starts.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use graft_tree::{merge_pair, placeholder_body, Cursor, MultiError, PathError, Segment, Tree};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::graph::DependencyGraph;
use crate::operator::{OpContext, Operator, OperatorError, Phase, Response};
use crate::registry::OperatorRegistry;

/// Knobs for an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Run the call sites of one wave on the rayon pool
    pub parallel: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl EvaluatorOptions {
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// A placeholder call found in the tree.
struct CallSite {
    cursor: Cursor,
    name: String,
    args: Vec<Expr>,
    operator: Arc<dyn Operator>,
}

/// Owns a tree for the duration of a run and resolves its placeholders.
///
/// ```
/// use graft_eval::{Evaluator, OperatorRegistry};
/// use graft_tree::Tree;
///
/// let doc: serde_yaml::Value = serde_yaml::from_str(
///     "name: web\nurl: (( concat \"http://\" name \".local\" ))\n",
/// ).unwrap();
/// let registry = OperatorRegistry::with_builtins();
/// let mut evaluator = Evaluator::new(Tree::from(doc), &registry);
/// evaluator.run().unwrap();
/// let url = graft_tree::Cursor::parse("url").unwrap();
/// assert_eq!(evaluator.tree().get(&url), Some(&Tree::from("http://web.local")));
/// ```
pub struct Evaluator<'r> {
    tree: Tree,
    registry: &'r OperatorRegistry,
    options: EvaluatorOptions,
}

impl<'r> Evaluator<'r> {
    pub fn new(tree: Tree, registry: &'r OperatorRegistry) -> Self {
        Self {
            tree,
            registry,
            options: EvaluatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Run every phase in order, stopping at the first failing one.
    pub fn run(&mut self) -> Result<()> {
        for phase in Phase::ALL {
            self.run_phase(phase)?;
        }
        Ok(())
    }

    /// Discover, order, execute and apply the call sites of one phase.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if any placeholder in the tree is unusable
    /// - [`Error::Setup`] if an operator fails to prepare
    /// - [`Error::Cycle`] if the phase's call sites depend on each other in a loop
    /// - [`Error::Evaluation`] with every call site that failed
    ///
    /// Only the last leaves the tree partially evaluated.
    pub fn run_phase(&mut self, phase: Phase) -> Result<()> {
        let sites: Vec<CallSite> = self
            .discover()?
            .into_iter()
            .filter(|site| site.operator.phase() == phase)
            .collect();
        debug!(%phase, count = sites.len(), "discovered call sites");
        if sites.is_empty() {
            return Ok(());
        }

        self.setup(&sites)?;

        let graph = self.build_graph(&sites);
        let waves = graph.waves().map_err(|cycle| Error::Cycle {
            phase,
            cycle: cycle.into_iter().map(|i| sites[i].cursor.clone()).collect(),
        })?;

        let mut errors = MultiError::default();
        let mut failed: HashSet<usize> = HashSet::new();

        for wave in waves {
            // Sites waiting on a failed site would read unresolved text.
            let (ready, blocked): (Vec<usize>, Vec<usize>) = wave
                .into_iter()
                .partition(|&i| graph.dependencies_of(i).all(|dep| !failed.contains(&dep)));
            for i in blocked {
                debug!(path = %sites[i].cursor, "skipping call site with failed dependency");
                failed.insert(i);
            }

            let outcomes = self.execute_wave(&sites, &ready);
            for (i, outcome) in ready.into_iter().zip(outcomes) {
                let site = &sites[i];
                let applied = outcome.and_then(|response| self.apply(&site.cursor, response));
                if let Err(err) = applied {
                    debug!(path = %site.cursor, operator = %site.name, error = %err, "call site failed");
                    errors.push(PathError::new(site.cursor.clone(), err.to_string()));
                    failed.insert(i);
                }
            }
        }

        errors.into_result().map_err(Error::Evaluation)
    }

    /// Walk the tree in document order collecting every placeholder call.
    fn discover(&self) -> Result<Vec<CallSite>> {
        let mut found = Vec::new();
        collect_placeholders(&self.tree, Cursor::root(), &mut found);

        let mut sites = Vec::new();
        let mut errors = MultiError::default();
        for (cursor, body) in found {
            let expr = match Expr::parse(body) {
                Ok(expr) => expr,
                Err(err) => {
                    errors.push(PathError::new(cursor, format!("{err} in (( {body} ))")));
                    continue;
                }
            };
            let Expr::Call { name, args } = expr else {
                trace!(path = %cursor, "placeholder is not a call");
                continue;
            };

            let unknown: BTreeSet<&str> = args
                .iter()
                .flat_map(Expr::call_names)
                .chain(std::iter::once(name.as_str()))
                .filter(|name| !self.registry.contains(name))
                .collect();
            if !unknown.is_empty() {
                for missing in unknown {
                    errors.push(PathError::new(
                        cursor.clone(),
                        format!("unknown operator '{missing}'"),
                    ));
                }
                continue;
            }
            if cursor.is_root() {
                errors.push(PathError::new(
                    cursor,
                    "operators cannot target the document root",
                ));
                continue;
            }

            let Some(operator) = self.registry.get(&name).cloned() else {
                continue;
            };
            sites.push(CallSite {
                cursor,
                name,
                args,
                operator,
            });
        }

        if errors.is_empty() {
            Ok(sites)
        } else {
            Err(Error::Discovery(errors))
        }
    }

    /// Call `setup` once per operator name used in the phase.
    fn setup(&self, sites: &[CallSite]) -> Result<()> {
        let mut seen = HashSet::new();
        for site in sites {
            if seen.insert(site.name.as_str()) {
                debug!(operator = %site.name, "setting up operator");
                site.operator.setup().map_err(|source| Error::Setup {
                    operator: site.name.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    fn build_graph(&self, sites: &[CallSite]) -> DependencyGraph {
        let locations: Vec<Cursor> = sites.iter().map(|site| site.cursor.clone()).collect();
        let index: HashMap<&Cursor, usize> = locations
            .iter()
            .enumerate()
            .map(|(i, cursor)| (cursor, i))
            .collect();

        let mut graph = DependencyGraph::new(sites.len());
        for (i, site) in sites.iter().enumerate() {
            let ctx = OpContext::new(&self.tree, &site.cursor, self.registry);
            for dependency in site.operator.dependencies(&ctx, &site.args, &locations) {
                if let Some(&j) = index.get(&dependency) {
                    trace!(from = %site.cursor, to = %dependency, "dependency edge");
                    graph.add_edge(i, j);
                }
            }
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built dependency graph"
        );
        graph
    }

    fn execute_wave(
        &self,
        sites: &[CallSite],
        wave: &[usize],
    ) -> Vec<std::result::Result<Response, OperatorError>> {
        if self.options.parallel && wave.len() > 1 {
            wave.par_iter().map(|&i| self.execute(&sites[i])).collect()
        } else {
            wave.iter().map(|&i| self.execute(&sites[i])).collect()
        }
    }

    fn execute(&self, site: &CallSite) -> std::result::Result<Response, OperatorError> {
        debug!(operator = %site.name, path = %site.cursor, "running operator");
        let ctx = OpContext::new(&self.tree, &site.cursor, self.registry);
        let outcome = site.operator.run(&ctx, &site.args);
        debug!(
            operator = %site.name,
            path = %site.cursor,
            ok = outcome.is_ok(),
            "operator finished"
        );
        outcome
    }

    fn apply(
        &mut self,
        cursor: &Cursor,
        response: Response,
    ) -> std::result::Result<(), OperatorError> {
        match response {
            Response::Replace(value) => Ok(self.tree.set(cursor, value)?),
            Response::Inject(injected) => {
                let not_a_map_key =
                    || OperatorError::argument("inject operator can only be used on a map key");
                let (Some(parent), Some(Segment::Key(key))) = (cursor.parent(), cursor.last())
                else {
                    return Err(not_a_map_key());
                };
                let map = self
                    .tree
                    .get_mut(&parent)
                    .and_then(Tree::as_mapping_mut)
                    .ok_or_else(not_a_map_key)?;

                map.shift_remove(key);
                for (name, value) in injected {
                    let merged = match map.get(&name) {
                        Some(existing) => merge_pair(&value, existing)?,
                        None => value,
                    };
                    map.insert(name, merged);
                }
                Ok(())
            }
        }
    }
}

/// Collect `(cursor, body)` for every placeholder string under `node`.
fn collect_placeholders<'t>(node: &'t Tree, cursor: Cursor, out: &mut Vec<(Cursor, &'t str)>) {
    match node {
        Tree::String(text) => {
            if let Some(body) = placeholder_body(text) {
                out.push((cursor, body));
            }
        }
        Tree::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_placeholders(item, cursor.child_index(i), out);
            }
        }
        Tree::Mapping(map) => {
            for (key, value) in map {
                collect_placeholders(value, cursor.child_key(key.as_str()), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree(yaml: &str) -> Tree {
        Tree::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap())
    }

    fn evaluate(yaml: &str) -> Result<Tree> {
        let registry = OperatorRegistry::with_builtins();
        let mut evaluator = Evaluator::new(tree(yaml), &registry);
        evaluator.run()?;
        Ok(evaluator.into_tree())
    }

    #[test]
    fn test_document_order_discovery() {
        let doc = tree("b: (( grab a ))\na: 1\nlist:\n- (( grab a ))\n- plain\n");
        let mut found = Vec::new();
        collect_placeholders(&doc, Cursor::root(), &mut found);
        let paths: Vec<String> = found.iter().map(|(c, _)| c.to_string()).collect();
        assert_eq!(paths, vec!["b", "list.0"]);
    }

    #[test]
    fn test_chained_grabs() {
        let out = evaluate("a: (( grab b ))\nb: (( grab c ))\nc: value\n").unwrap();
        assert_eq!(out, tree("a: value\nb: value\nc: value\n"));
    }

    #[test]
    fn test_grab_waits_on_ancestor_placeholder() {
        let out = evaluate("x: (( grab src.inner ))\nsrc: (( grab real ))\nreal:\n  inner: 42\n")
            .unwrap();
        assert_eq!(out, tree("x: 42\nsrc:\n  inner: 42\nreal:\n  inner: 42\n"));
    }

    #[test]
    fn test_inject_keeps_existing_keys() {
        let out = evaluate(
            "base:\n  size: small\n  tags: [a]\njob:\n  extend: (( inject base ))\n  size: large\n",
        )
        .unwrap();
        assert_eq!(
            out,
            tree("base:\n  size: small\n  tags: [a]\njob:\n  size: large\n  tags: [a]\n")
        );
    }

    #[test]
    fn test_cycle_is_fatal() {
        let err = evaluate("a: (( grab b ))\nb: (( grab a ))\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cycle detected in eval phase: $.a -> $.b -> $.a"
        );
    }

    #[test]
    fn test_unknown_operator_is_fatal() {
        let err = evaluate("a: (( frobnicate b ))\nb: (( concat (nope) \"x\" ))\n").unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
        assert_eq!(
            err.to_string(),
            "2 error(s) detected:\n - $.a: unknown operator 'frobnicate'\n - $.b: unknown operator 'nope'\n"
        );
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let err = evaluate("a: (( grab \"open ))\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 error(s) detected:\n - $.a: unterminated string literal in (( grab \"open ))\n"
        );
    }

    #[test]
    fn test_root_call_is_rejected() {
        let registry = OperatorRegistry::with_builtins();
        let mut evaluator = Evaluator::new(Tree::from("(( grab a ))"), &registry);
        let err = evaluator.run().unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 error(s) detected:\n - $.: operators cannot target the document root\n"
        );
    }

    #[test]
    fn test_errors_are_isolated_per_call_site() {
        let err = evaluate("ok: (( grab val ))\nbad: (( grab missing ))\nval: 1\n").unwrap_err();
        let Error::Evaluation(errors) = &err else {
            panic!("expected evaluation error, got {err:?}");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(
            err.to_string(),
            "1 error(s) detected:\n - $.bad: Unable to resolve `missing`: `$.missing` could not be found in the YAML datastructure\n"
        );
    }

    #[test]
    fn test_dependents_of_failures_are_skipped() {
        let err = evaluate("a: (( grab missing ))\nb: (( grab a ))\n").unwrap_err();
        assert_eq!(err.failures().map(MultiError::len), Some(1));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let yaml = "a: (( concat b \"-\" c ))\nb: (( grab c ))\nc: x\nd: [(( grab c )), (( grab b ))]\n";
        let registry = OperatorRegistry::with_builtins();

        let mut parallel = Evaluator::new(tree(yaml), &registry);
        parallel.run().unwrap();
        let mut sequential = Evaluator::new(tree(yaml), &registry)
            .with_options(EvaluatorOptions::default().parallel(false));
        sequential.run().unwrap();

        assert_eq!(parallel.tree(), sequential.tree());
        assert_eq!(parallel.into_tree(), tree("a: x-x\nb: x\nc: x\nd: [x, x]\n"));
    }

    #[test]
    fn test_non_call_placeholder_left_alone() {
        let out = evaluate("a: (( \"just text\" ))\n").unwrap();
        assert_eq!(out, tree("a: (( \"just text\" ))\n"));
    }
}
