// used to overload common operations for queries
use std::ops;

/// A composable predicate over the keys of one stored map attribute.
///
/// Leaves compare the entry key against a literal; `and`/`or`/`not` combine
/// sub-predicates. A query renders itself into a backend-neutral expression
/// string plus named parameters, so the same tree can be executed or just
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrQuery {
    And(Box<AttrQuery>, Box<AttrQuery>),
    Or(Box<AttrQuery>, Box<AttrQuery>),
    Not(Box<AttrQuery>),
    Gt(String),
    Lt(String),
    Like(String),
}

/// A rendered query: the expression references each parameter as `:nameN`,
/// and `parameters` pairs every `nameN` with its literal in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub expression: String,
    pub parameters: Vec<(String, String)>,
}

impl AttrQuery {
    pub fn gt(key: impl Into<String>) -> AttrQuery {
        AttrQuery::Gt(key.into())
    }
    pub fn lt(key: impl Into<String>) -> AttrQuery {
        AttrQuery::Lt(key.into())
    }
    /// SQL-style pattern match: `%` matches any run, `_` a single character.
    pub fn like(pattern: impl Into<String>) -> AttrQuery {
        AttrQuery::Like(pattern.into())
    }
    pub fn and(self, other: AttrQuery) -> AttrQuery {
        AttrQuery::And(Box::new(self), Box::new(other))
    }
    pub fn or(self, other: AttrQuery) -> AttrQuery {
        AttrQuery::Or(Box::new(self), Box::new(other))
    }
    pub fn negate(self) -> AttrQuery {
        AttrQuery::Not(Box::new(self))
    }

    /// Renders the query. Parameter suffixes count up per render, so repeated
    /// leaves in one query always get distinct names.
    pub fn predicate(&self) -> Predicate {
        let mut counter = 0usize;
        let mut parameters = Vec::new();
        let expression = self.render(&mut counter, &mut parameters);
        Predicate {
            expression,
            parameters,
        }
    }

    fn render(&self, counter: &mut usize, parameters: &mut Vec<(String, String)>) -> String {
        match self {
            AttrQuery::And(left, right) => {
                let left = left.render(counter, parameters);
                let right = right.render(counter, parameters);
                format!("({} and {})", left, right)
            }
            AttrQuery::Or(left, right) => {
                let left = left.render(counter, parameters);
                let right = right.render(counter, parameters);
                format!("({} or {})", left, right)
            }
            AttrQuery::Not(inner) => {
                format!("(not {})", inner.render(counter, parameters))
            }
            AttrQuery::Gt(literal) => {
                format!("Entry_Key > :{}", bind(counter, parameters, literal))
            }
            AttrQuery::Lt(literal) => {
                format!("Entry_Key < :{}", bind(counter, parameters, literal))
            }
            AttrQuery::Like(literal) => {
                format!("Entry_Key like :{}", bind(counter, parameters, literal))
            }
        }
    }
}

fn bind(counter: &mut usize, parameters: &mut Vec<(String, String)>, literal: &str) -> String {
    let name = format!("name{}", *counter);
    *counter += 1;
    parameters.push((name.clone(), literal.to_owned()));
    name
}

impl ops::BitAnd for AttrQuery {
    type Output = AttrQuery;
    fn bitand(self, other: AttrQuery) -> AttrQuery {
        self.and(other)
    }
}
impl ops::BitOr for AttrQuery {
    type Output = AttrQuery;
    fn bitor(self, other: AttrQuery) -> AttrQuery {
        self.or(other)
    }
}
impl ops::Not for AttrQuery {
    type Output = AttrQuery;
    fn not(self) -> AttrQuery {
        self.negate()
    }
}
