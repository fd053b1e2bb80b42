//! Operator registry
//!
//! Maps operator names to their implementations. Built once before a run and
//! shared read-only with the evaluator.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::operator::Operator;
use crate::ops::{ConcatOperator, GrabOperator, InjectOperator, VaultOperator};
use crate::vault::{Environment, HttpTransport, ProcessEnvironment, SecretTransport};

/// Number of built-in operators.
pub const BUILTIN_COUNT: usize = 4;

/// Returns all built-in operator registrations.
///
/// This is the single source of the built-in list; [`OperatorRegistry::with_builtins`]
/// and [`OperatorRegistry::with_builtins_using`] both derive from it.
pub fn builtin_registrations(
    env: Arc<dyn Environment>,
    transport: Arc<dyn SecretTransport>,
) -> Vec<(&'static str, Arc<dyn Operator>)> {
    let vault: Arc<dyn Operator> = Arc::new(VaultOperator::new(env, transport));
    vec![
        ("concat", Arc::new(ConcatOperator) as Arc<dyn Operator>),
        ("grab", Arc::new(GrabOperator) as Arc<dyn Operator>),
        ("inject", Arc::new(InjectOperator) as Arc<dyn Operator>),
        ("vault", vault),
    ]
}

/// Registry mapping operator names to implementations.
///
/// # Example
///
/// ```
/// use graft_eval::OperatorRegistry;
///
/// let registry = OperatorRegistry::with_builtins();
/// assert!(registry.contains("grab"));
/// assert_eq!(registry.names(), vec!["concat", "grab", "inject", "vault"]);
/// ```
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, Arc<dyn Operator>>,
}

impl OperatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Built-in operators backed by the process environment and HTTP.
    pub fn with_builtins() -> Self {
        Self::with_builtins_using(Arc::new(ProcessEnvironment), Arc::new(HttpTransport::new()))
    }

    /// Built-in operators with explicit secret-store configuration and transport.
    pub fn with_builtins_using(
        env: Arc<dyn Environment>,
        transport: Arc<dyn SecretTransport>,
    ) -> Self {
        let mut registry = Self::new();
        for (name, operator) in builtin_registrations(env, transport) {
            registry.register(name, operator);
        }
        registry
    }

    /// Register an operator, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, operator: Arc<dyn Operator>) {
        self.operators.insert(name.into(), operator);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operator>> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}
