// src/ast.rs

use std::fmt;

use crate::readable::{DisplayOptions, Printer};

// A numeral `n` nests `n` applications, so the recursive walks over terms
// switch to a heap-allocated stack segment when the current one runs low.
const STACK_RED_ZONE: usize = 256 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Runs `f`, first moving to a fresh stack segment if less than the red zone is left.
pub(crate) fn grow_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, f)
}

// --- Term Definition ---

/// A lambda term node.
///
/// `closed` is a conservative annotation: `true` guarantees the term has no
/// free variables, `false` only means "not known to be closed".
#[derive(Debug)]
pub struct Term {
    pub kind: TermKind,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Var(String),
    /// Reference to a declaration. Aliases always denote closed terms.
    Alias(String),
    Abs(String, Box<Term>),
    App {
        left: Box<Term>,
        right: Box<Term>,
        /// Call-by-value marker: the argument is reduced before the redex fires.
        strict: bool,
        /// Operator token of an infix application that has not been desugared yet.
        op: Option<String>,
    },
}

// Children are detached onto a work list so that dropping a deep spine does
// not recurse once per node.
impl Drop for Term {
    fn drop(&mut self) {
        if !matches!(self.kind, TermKind::Abs(..) | TermKind::App { .. }) {
            return;
        }
        let mut pending: Vec<Box<Term>> = Vec::new();
        detach_children(&mut self.kind, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_children(&mut node.kind, &mut pending);
        }
    }
}

fn detach_children(kind: &mut TermKind, pending: &mut Vec<Box<Term>>) {
    match std::mem::replace(kind, TermKind::Var(String::new())) {
        TermKind::Var(_) | TermKind::Alias(_) => {}
        TermKind::Abs(_, body) => pending.push(body),
        TermKind::App { left, right, .. } => {
            pending.push(left);
            pending.push(right);
        }
    }
}

impl Clone for Term {
    fn clone(&self) -> Self {
        grow_stack(|| Term { kind: self.kind.clone(), closed: self.closed })
    }
}

// Structural equality; the closed flag is an annotation, not part of the term.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        grow_stack(|| self.kind == other.kind)
    }
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term { kind: TermKind::Var(name.into()), closed: false }
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Term { kind: TermKind::Alias(name.into()), closed: true }
    }

    pub fn abs(param: impl Into<String>, body: Term) -> Self {
        Term { kind: TermKind::Abs(param.into(), Box::new(body)), closed: false }
    }

    pub fn app(left: Term, right: Term) -> Self {
        Term {
            kind: TermKind::App { left: Box::new(left), right: Box::new(right), strict: false, op: None },
            closed: false,
        }
    }

    /// An infix application `left op right` as produced by the parser.
    pub fn operator(op: impl Into<String>, left: Term, right: Term) -> Self {
        Term {
            kind: TermKind::App {
                left: Box::new(left),
                right: Box::new(right),
                strict: false,
                op: Some(op.into()),
            },
            closed: false,
        }
    }

    /// Cheap stand-in left behind when a node's content is moved out.
    pub(crate) fn placeholder() -> Self {
        Term { kind: TermKind::Var(String::new()), closed: true }
    }

    pub(crate) fn take(&mut self) -> Term {
        std::mem::replace(self, Term::placeholder())
    }

    /// Moves the node's content out, leaving an empty shell to be dropped.
    pub(crate) fn into_kind(mut self) -> TermKind {
        std::mem::replace(&mut self.kind, TermKind::Var(String::new()))
    }

    /// `f^n(a)`: `a` when `n == 0`, otherwise `f (f^(n-1)(a))`.
    pub fn power(f: &Term, a: &Term, n: usize) -> Term {
        let mut acc = a.clone();
        for _ in 0..n {
            acc = Term::app(f.clone(), acc);
        }
        acc
    }

    /// The Church numeral `\f.\x.f^n(x)`.
    pub fn church_numeral(n: usize) -> Term {
        let body = Term::power(&Term::var("f"), &Term::var("x"), n);
        let mut numeral = Term::abs("f", Term::abs("x", body));
        // Inner nodes keep the conservative flag until a full scan.
        numeral.closed = true;
        numeral
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, TermKind::Var(_))
    }

    pub fn is_abs(&self) -> bool {
        matches!(self.kind, TermKind::Abs(..))
    }

    pub fn is_app(&self) -> bool {
        matches!(self.kind, TermKind::App { .. })
    }

    /// Name carried by a variable or alias node.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TermKind::Var(name) | TermKind::Alias(name) => Some(name),
            _ => None,
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        grow_stack(|| match &self.kind {
            TermKind::Var(_) | TermKind::Alias(_) => 1,
            TermKind::Abs(_, body) => 1 + body.size(),
            TermKind::App { left, right, .. } => 1 + left.size() + right.size(),
        })
    }

    /// Renders with explicit display options (see `readable`).
    pub fn render(&self, options: &DisplayOptions) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = Printer::new(options).print(&mut out, self, true);
        out
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer::new(&DisplayOptions::raw()).print(f, self, true)
    }
}
