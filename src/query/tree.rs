//! Parse tree produced from query text

use std::fmt;

/// Terminal value of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Word(String),
    /// Double-quoted text, quotes removed and escapes resolved
    Phrase(String),
}

impl Term {
    pub fn text(&self) -> &str {
        match self {
            Term::Word(s) | Term::Phrase(s) => s,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Word(s) => f.write_str(s),
            Term::Phrase(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }
}

/// Argument of an operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldArg {
    Term(Term),
    /// `field:(a OR b)`: bare terms inside apply to the same operator
    Group(Box<QueryNode>),
    /// `field:*` in a rewrite pattern
    Wildcard,
}

/// Node of the parse tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
    /// A bare term with no operator
    DefaultField(Term),
    /// `name:arg`
    FieldName { name: String, arg: FieldArg },
    /// `Name=(subpattern)` or `$Name` in a rewrite pattern
    Variable {
        name: String,
        pattern: Option<Box<QueryNode>>,
    },
}

impl QueryNode {
    /// Replace every bare term with an application of operator `name`
    pub fn apply_operator(&self, name: &str) -> QueryNode {
        match self {
            QueryNode::And(children) => {
                QueryNode::And(children.iter().map(|c| c.apply_operator(name)).collect())
            }
            QueryNode::Or(children) => {
                QueryNode::Or(children.iter().map(|c| c.apply_operator(name)).collect())
            }
            QueryNode::Not(child) => QueryNode::Not(Box::new(child.apply_operator(name))),
            QueryNode::DefaultField(term) => QueryNode::FieldName {
                name: name.to_string(),
                arg: FieldArg::Term(term.clone()),
            },
            other => other.clone(),
        }
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, tag: &str, children: &[QueryNode]) -> fmt::Result {
    write!(f, "({}", tag)?;
    for child in children {
        write!(f, " {}", child)?;
    }
    f.write_str(")")
}

/// S-expression form
impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::And(children) => write_children(f, "AND", children),
            QueryNode::Or(children) => write_children(f, "OR", children),
            QueryNode::Not(child) => write!(f, "(NOT {})", child),
            QueryNode::DefaultField(term) => write!(f, "(DEFAULT_FIELD {})", term),
            QueryNode::FieldName { name, arg } => match arg {
                FieldArg::Term(term) => write!(f, "(FIELD_NAME {} {})", name, term),
                FieldArg::Group(group) => write!(f, "(FIELD_NAME {} {})", name, group),
                FieldArg::Wildcard => write!(f, "(FIELD_NAME {} *)", name),
            },
            QueryNode::Variable { name, pattern } => match pattern {
                Some(p) => write!(f, "(VARIABLE {} {})", name, p),
                None => write!(f, "(VARIABLE {})", name),
            },
        }
    }
}
