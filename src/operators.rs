// src/operators.rs

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{grow_stack, Term, TermKind};
use crate::memory::TermPool;

/// Marks the application it builds as strict instead of naming an alias.
pub const STRICT_OPERATOR: &str = "~";

/// Characters operator tokens are made of.
pub const OPERATOR_CHARS: &str = "+-*/=<>!~:&|^$%@";

pub fn is_operator_char(c: char) -> bool {
    OPERATOR_CHARS.contains(c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

/// Binding strength of an infix operator. Higher precedence binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub precedence: u8,
    pub assoc: Assoc,
}

// Operators known before any declaration. Each one except `~` needs an alias
// of the same name, which the prelude provides.
static DEFAULT_OPERATORS: phf::Map<&'static str, (u8, Assoc)> = phf::phf_map! {
    "$" => (0, Assoc::Right),
    "||" => (2, Assoc::Right),
    "&&" => (3, Assoc::Right),
    "==" => (4, Assoc::NonAssoc),
    "<=" => (4, Assoc::NonAssoc),
    ":" => (5, Assoc::Right),
    "++" => (5, Assoc::Right),
    "+" => (6, Assoc::Left),
    "-" => (6, Assoc::Left),
    "*" => (7, Assoc::Left),
    "^" => (8, Assoc::Right),
    "~" => (9, Assoc::Left),
};

/// Operator declarations, keyed by token.
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    operators: IndexMap<String, Operator>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut entries: Vec<(&str, (u8, Assoc))> = DEFAULT_OPERATORS.entries().map(|(k, v)| (*k, *v)).collect();
        // phf iteration order is arbitrary
        entries.sort_by_key(|(token, (precedence, _))| (*precedence, *token));

        let mut table = OperatorTable::new();
        for (token, (precedence, assoc)) in entries {
            table.declare(token, Operator { precedence, assoc });
        }
        table
    }

    /// Adds or redefines an operator, returning the previous declaration.
    pub fn declare(&mut self, token: impl Into<String>, operator: Operator) -> Option<Operator> {
        let token = token.into();
        debug!(%token, precedence = operator.precedence, assoc = ?operator.assoc, "declare operator");
        self.operators.insert(token, operator)
    }

    pub fn get(&self, token: &str) -> Option<Operator> {
        self.operators.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.operators.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Operator)> {
        self.operators.iter().map(|(token, op)| (token.as_str(), *op))
    }
}

impl Term {
    /// Rewrites infix applications bottom-up: `a op b` becomes `((op) a) b`
    /// with `(op)` an alias reference, and `f ~ x` becomes a strict `f x`.
    pub fn desugar_operators(&mut self, pool: &mut TermPool) {
        grow_stack(|| self.desugar_node(pool))
    }

    fn desugar_node(&mut self, pool: &mut TermPool) {
        match &mut self.kind {
            TermKind::Var(_) | TermKind::Alias(_) => {}
            TermKind::Abs(_, body) => body.desugar_operators(pool),
            TermKind::App { left, right, strict, op } => {
                left.desugar_operators(pool);
                right.desugar_operators(pool);

                match op.take() {
                    None => {}
                    Some(token) if token == STRICT_OPERATOR => *strict = true,
                    Some(token) => {
                        let operand = left.take();
                        // the alias is closed, so the partial application is as closed as its operand
                        let closed = operand.closed;
                        **left = Term {
                            kind: TermKind::App {
                                left: pool.acquire(Term::alias(token)),
                                right: pool.acquire(operand),
                                strict: false,
                                op: None,
                            },
                            closed,
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = OperatorTable::with_defaults();
        assert_eq!(table.get("+"), Some(Operator { precedence: 6, assoc: Assoc::Left }));
        assert_eq!(table.get("^").map(|op| op.assoc), Some(Assoc::Right));
        assert!(table.contains(STRICT_OPERATOR));
        assert!(table.get("<>").is_none());

        // sorted by precedence
        let first = table.iter().next().map(|(token, _)| token.to_string());
        assert_eq!(first.as_deref(), Some("$"));
    }

    #[test]
    fn test_declare_replaces() {
        let mut table = OperatorTable::with_defaults();
        let previous = table.declare("+", Operator { precedence: 1, assoc: Assoc::Right });
        assert_eq!(previous.map(|op| op.precedence), Some(6));
        assert_eq!(table.get("+").map(|op| op.precedence), Some(1));
    }

    #[test]
    fn test_desugar_infix_application() {
        let mut pool = TermPool::new();
        let mut term = Term::operator("+", Term::var("a"), Term::var("b"));
        term.desugar_operators(&mut pool);
        assert_eq!(
            term,
            Term::app(Term::app(Term::alias("+"), Term::var("a")), Term::var("b"))
        );
        assert!(matches!(&term.kind, TermKind::App { op: None, strict: false, .. }));
    }

    #[test]
    fn test_desugar_strict_marker() {
        let mut pool = TermPool::new();
        let mut term = Term::operator(STRICT_OPERATOR, Term::var("f"), Term::var("x"));
        term.desugar_operators(&mut pool);
        assert_eq!(term, Term::app(Term::var("f"), Term::var("x")));
        assert!(matches!(&term.kind, TermKind::App { strict: true, op: None, .. }));
    }

    #[test]
    fn test_desugar_is_bottom_up() {
        let mut pool = TermPool::new();
        // \x. (x * x) + 1
        let inner = Term::operator("*", Term::var("x"), Term::var("x"));
        let mut term = Term::abs("x", Term::operator("+", inner, Term::alias("One")));
        term.desugar_operators(&mut pool);

        let times = Term::app(Term::app(Term::alias("*"), Term::var("x")), Term::var("x"));
        let expected = Term::abs("x", Term::app(Term::app(Term::alias("+"), times), Term::alias("One")));
        assert_eq!(term, expected);
        assert!(term.alias_references().contains("*"));
    }
}
