//! Compiler from parse trees to predicates

use super::errors::{ParseResult, QueryParseError};
use super::parser;
use super::registry::OperatorRegistry;
use super::tree::{FieldArg, QueryNode, Term};
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_event, Event};
use crate::predicate::Predicate;
use crate::rewrite::{VariablePredicate, WildcardPredicate};

/// Compiles query text into predicates over `T` using a static operator
/// registry
///
/// Implementors supply the registry and may override the handling of bare
/// terms; everything else is provided.
pub trait QueryBuilder<T: Entity>: Sized {
    fn registry(&self) -> &OperatorRegistry<Self, T>;

    /// Predicate for a bare term with no operator
    fn default_field(&self, term: &Term) -> EngineResult<Predicate<T>> {
        Err(QueryParseError::UnsupportedQuery(term.to_string()).into())
    }

    /// Parse and compile query text
    fn parse(&self, query: &str) -> ParseResult<Predicate<T>> {
        let tree = parser::parse(query)?;
        let pred = self.to_predicate(&tree)?;
        let compiled = pred.to_string();
        log_event(
            Event::QueryParsed,
            &[("query", query), ("predicate", compiled.as_str())],
        );
        Ok(pred)
    }

    /// Compile a rewrite pattern; variables and `field:*` are allowed
    fn compile_pattern(&self, pattern: &str) -> ParseResult<Predicate<T>> {
        let tree = parser::parse_pattern(pattern)?;
        self.to_predicate(&tree)
    }

    /// Compile a parse tree
    fn to_predicate(&self, tree: &QueryNode) -> ParseResult<Predicate<T>> {
        compile(self, tree)
    }
}

/// Report an operator failure, keeping query errors as they are
fn operator_failed(operator: &str, value: &str, err: EngineError) -> QueryParseError {
    match err {
        EngineError::Parse(e) => e,
        other => QueryParseError::OperatorFailed {
            operator: operator.to_string(),
            value: value.to_string(),
            reason: other.to_string(),
        },
    }
}

fn compile<B: QueryBuilder<T>, T: Entity>(builder: &B, node: &QueryNode) -> ParseResult<Predicate<T>> {
    match node {
        QueryNode::And(children) => Ok(Predicate::and(compile_all(builder, children)?)),
        QueryNode::Or(children) => {
            Predicate::or(compile_all(builder, children)?).map_err(|e| operator_failed("OR", "", e))
        }
        QueryNode::Not(child) => Ok(Predicate::not(compile(builder, child)?)),
        QueryNode::DefaultField(term) => builder
            .default_field(term)
            .map_err(|e| operator_failed("default", term.text(), e)),
        QueryNode::FieldName { name, arg } => match arg {
            FieldArg::Term(term) => apply_operator(builder, name, term.text()),
            FieldArg::Group(group) => compile(builder, &group.apply_operator(name)),
            FieldArg::Wildcard => {
                let canonical = builder
                    .registry()
                    .get(name)
                    .map_or_else(|| name.to_ascii_lowercase(), |op| op.name().to_string());
                Ok(Predicate::new(WildcardPredicate::new(canonical)))
            }
        },
        QueryNode::Variable { name, pattern } => {
            let pattern = pattern
                .as_ref()
                .map(|p| compile(builder, p))
                .transpose()?;
            Ok(Predicate::new(VariablePredicate::new(name.clone(), pattern)))
        }
    }
}

fn compile_all<B: QueryBuilder<T>, T: Entity>(
    builder: &B,
    children: &[QueryNode],
) -> ParseResult<Vec<Predicate<T>>> {
    children.iter().map(|c| compile(builder, c)).collect()
}

fn apply_operator<B: QueryBuilder<T>, T: Entity>(
    builder: &B,
    name: &str,
    value: &str,
) -> ParseResult<Predicate<T>> {
    let op = builder
        .registry()
        .get(name)
        .ok_or_else(|| QueryParseError::UnsupportedOperator(name.to_string()))?;
    if !op.accepts(value) {
        return Err(QueryParseError::invalid_value(
            name,
            value,
            format!("must match {}", op.pattern().unwrap_or_default()),
        ));
    }
    op.invoke(builder, value)
        .map_err(|e| operator_failed(op.name(), value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{MatchablePredicate, NodeKind, OperatorPredicate};
    use std::sync::OnceLock;

    #[derive(Debug, Clone)]
    struct Item {
        id: u32,
        color: &'static str,
    }

    impl Entity for Item {
        type Id = u32;
        fn id(&self) -> u32 {
            self.id
        }
    }

    struct ItemQueryBuilder;

    fn color(_: &ItemQueryBuilder, value: &str) -> EngineResult<Predicate<Item>> {
        Ok(Predicate::new(MatchablePredicate::new("color", value, 1, |i: &Item, v| {
            i.color == v
        })))
    }

    fn size(_: &ItemQueryBuilder, value: &str) -> EngineResult<Predicate<Item>> {
        Ok(Predicate::new(OperatorPredicate::new("size", value)))
    }

    fn broken(_: &ItemQueryBuilder, _: &str) -> EngineResult<Predicate<Item>> {
        Err(EngineError::Storage("backend down".into()))
    }

    fn registry() -> &'static OperatorRegistry<ItemQueryBuilder, Item> {
        static REGISTRY: OnceLock<OperatorRegistry<ItemQueryBuilder, Item>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            OperatorRegistry::builder()
                .validated("color", "[a-z]+", color)
                .alias("c", "color")
                .validated("size", "[0-9]+", size)
                .operator("broken", broken)
                .build()
        })
    }

    impl QueryBuilder<Item> for ItemQueryBuilder {
        fn registry(&self) -> &OperatorRegistry<Self, Item> {
            registry()
        }

        fn default_field(&self, term: &Term) -> EngineResult<Predicate<Item>> {
            if term.text().chars().all(|c| c.is_ascii_digit()) {
                return size(self, term.text());
            }
            Err(QueryParseError::UnsupportedQuery(term.to_string()).into())
        }
    }

    fn compile(query: &str) -> String {
        ItemQueryBuilder.parse(query).unwrap().to_string()
    }

    #[test]
    fn test_operators_and_combinators() {
        assert_eq!(compile("color:red size:3"), "(color:red size:3)");
        assert_eq!(compile("C:red OR size:3"), "(color:red OR size:3)");
        assert_eq!(compile("-color:red"), "-color:red");
        assert_eq!(compile("--color:red"), "color:red");
    }

    /// `field:(a b)` becomes an explicit AND of single-value applications.
    #[test]
    fn test_group_expansion() {
        let grouped = ItemQueryBuilder.parse("color:(red OR -blue)").unwrap();
        let explicit = ItemQueryBuilder.parse("color:red OR -color:blue").unwrap();
        assert_eq!(grouped, explicit);
        assert_eq!(compile("size:(1 2)"), "(size:1 size:2)");
    }

    #[test]
    fn test_compiled_predicate_matches() {
        let p = ItemQueryBuilder.parse("color:red OR color:blue").unwrap();
        assert!(p.matches(&Item { id: 1, color: "blue" }).unwrap());
        assert!(!p.matches(&Item { id: 2, color: "green" }).unwrap());
    }

    #[test]
    fn test_default_field() {
        assert_eq!(compile("42"), "size:42");
        assert_eq!(
            ItemQueryBuilder.parse("hello").unwrap_err(),
            QueryParseError::UnsupportedQuery("hello".into())
        );
    }

    #[test]
    fn test_unknown_operator() {
        assert_eq!(
            ItemQueryBuilder.parse("shape:round").unwrap_err(),
            QueryParseError::UnsupportedOperator("shape".into())
        );
    }

    #[test]
    fn test_value_pattern_violation() {
        let err = ItemQueryBuilder.parse("size:big").unwrap_err();
        assert_eq!(err.code(), "QDX_INVALID_VALUE");
        assert!(err.to_string().contains("size:big"));
    }

    /// Handler failures name the operator and value.
    #[test]
    fn test_operator_failure_is_wrapped() {
        match ItemQueryBuilder.parse("broken:x").unwrap_err() {
            QueryParseError::OperatorFailed {
                operator,
                value,
                reason,
            } => {
                assert_eq!(operator, "broken");
                assert_eq!(value, "x");
                assert!(reason.contains("backend down"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_compile_pattern() {
        let pattern = ItemQueryBuilder.compile_pattern("X=(c:*) size:1").unwrap();
        assert_eq!(pattern.kind(), NodeKind::And);
        let var = pattern.child(0).unwrap();
        assert_eq!(var.kind(), NodeKind::Variable { name: "X" });
        assert_eq!(var.child(0).unwrap().kind(), NodeKind::Wildcard { name: "color" });
    }
}
