//! Operator registry: operator name to handler table of a query builder
//!
//! Registries are built once per builder type (typically in a `OnceLock`)
//! and are read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::entity::Entity;
use crate::error::EngineResult;
use crate::predicate::Predicate;

/// Builds the predicate for one `name:value` application
pub type OperatorFn<B, T> = fn(&B, &str) -> EngineResult<Predicate<T>>;

/// A registered operator
pub struct Operator<B, T: Entity> {
    name: String,
    handler: OperatorFn<B, T>,
    pattern: Option<Regex>,
}

impl<B, T: Entity> Operator<B, T> {
    /// Canonical operator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `value` satisfies the operator's value pattern, if any
    pub fn accepts(&self, value: &str) -> bool {
        self.pattern.as_ref().map_or(true, |re| re.is_match(value))
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    pub fn invoke(&self, builder: &B, value: &str) -> EngineResult<Predicate<T>> {
        (self.handler)(builder, value)
    }
}

/// Operator table keyed by lower-case name; aliases share an entry
pub struct OperatorRegistry<B, T: Entity> {
    operators: Vec<Operator<B, T>>,
    names: BTreeMap<String, usize>,
}

impl<B, T: Entity> OperatorRegistry<B, T> {
    pub fn builder() -> RegistryBuilder<B, T> {
        RegistryBuilder {
            registry: OperatorRegistry {
                operators: Vec::new(),
                names: BTreeMap::new(),
            },
        }
    }

    /// Look up an operator or alias, case-insensitively
    pub fn get(&self, name: &str) -> Option<&Operator<B, T>> {
        self.names
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.operators[i])
    }

    /// Every registered name, aliases included, in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

impl<B, T: Entity> fmt::Debug for OperatorRegistry<B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("names", &self.names.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Declares the operators of an [`OperatorRegistry`]
///
/// Registration happens once at initialization with literal names and
/// patterns; an invalid pattern or an alias of an unknown operator is a
/// programming error and panics.
pub struct RegistryBuilder<B, T: Entity> {
    registry: OperatorRegistry<B, T>,
}

impl<B, T: Entity> RegistryBuilder<B, T> {
    pub fn operator(self, name: &str, handler: OperatorFn<B, T>) -> Self {
        self.register(name, handler, None)
    }

    /// Register an operator whose value must fully match `pattern`
    pub fn validated(self, name: &str, pattern: &str, handler: OperatorFn<B, T>) -> Self {
        let anchored = format!("^(?:{})$", pattern);
        let re = Regex::new(&anchored).expect("operator pattern is a valid regex");
        self.register(name, handler, Some(re))
    }

    /// Make `alias` resolve to the already registered `target`
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        let index = *self
            .registry
            .names
            .get(&target.to_ascii_lowercase())
            .expect("alias target is registered");
        self.registry.names.insert(alias.to_ascii_lowercase(), index);
        self
    }

    pub fn build(self) -> OperatorRegistry<B, T> {
        self.registry
    }

    fn register(mut self, name: &str, handler: OperatorFn<B, T>, pattern: Option<Regex>) -> Self {
        let key = name.to_ascii_lowercase();
        self.registry.names.insert(key.clone(), self.registry.operators.len());
        self.registry.operators.push(Operator {
            name: key,
            handler,
            pattern,
        });
        self
    }
}
