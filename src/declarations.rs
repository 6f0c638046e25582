// src/declarations.rs

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::ast::{grow_stack, Term, TermKind};
use crate::error::EvalError;
use crate::memory::TermPool;

/// A named term together with the aliases its definition references.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub term: Term,
    pub aliases: IndexSet<String>,
}

/// Insertion-ordered table of alias declarations.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    decls: IndexMap<String, Declaration>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `name`. A replaced term goes back to the pool.
    /// The closed flags of `term` are recomputed before it is stored.
    pub fn define(&mut self, name: impl Into<String>, mut term: Term, pool: &mut TermPool) {
        let name = name.into();
        term.set_closed_flag();
        let aliases = term.alias_references();
        debug!(%name, references = aliases.len(), "define");

        if let Some(previous) = self.decls.insert(name, Declaration { term, aliases }) {
            pool.discard(previous.term);
        }
    }

    /// Removes `name`, keeping the order of the remaining declarations.
    pub fn remove(&mut self, name: &str, pool: &mut TermPool) -> bool {
        match self.decls.shift_remove(name) {
            Some(decl) => {
                pool.discard(decl.term);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Declaration> {
        self.decls.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    /// A fresh copy of the definition of `name`; the stored term is never handed out.
    pub fn instantiate(&self, name: &str, pool: &mut TermPool) -> Option<Term> {
        self.decls.get(name).map(|decl| pool.clone_term(&decl.term))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decls.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Declaration)> {
        self.decls.iter().map(|(name, decl)| (name.as_str(), decl))
    }

    /// Applies `rewrite` to every stored term. Alias lists are not refreshed;
    /// call [`Declarations::refresh_alias_references`] afterwards.
    pub fn rewrite_terms(&mut self, mut rewrite: impl FnMut(&str, &mut Term)) {
        for (name, decl) in self.decls.iter_mut() {
            rewrite(name, &mut decl.term);
        }
    }

    pub fn refresh_alias_references(&mut self) {
        for decl in self.decls.values_mut() {
            decl.aliases = decl.term.alias_references();
        }
    }

    /// Replaces alias nodes in `term` by copies of their definitions, one level
    /// deep: aliases introduced by an expansion are kept. With `only`, just the
    /// listed aliases are expanded.
    pub fn expand_aliases(&self, term: &mut Term, only: Option<&[String]>, pool: &mut TermPool) -> Result<(), EvalError> {
        grow_stack(|| self.expand_node(term, only, pool))
    }

    fn expand_node(&self, term: &mut Term, only: Option<&[String]>, pool: &mut TermPool) -> Result<(), EvalError> {
        match &mut term.kind {
            TermKind::Var(_) => Ok(()),
            TermKind::Abs(_, body) => self.expand_aliases(body, only, pool),
            TermKind::App { left, right, .. } => {
                self.expand_aliases(left, only, pool)?;
                self.expand_aliases(right, only, pool)
            }
            TermKind::Alias(name) => {
                let selected = only.map_or(true, |names| names.iter().any(|n| n.as_str() == name.as_str()));
                if selected {
                    term.expand_alias(self, pool)
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl Term {
    /// Turns every reference to `alias` into the variable `var`.
    /// Closed flags above the rewritten nodes become stale; rescan afterwards.
    pub fn alias_to_var(&mut self, alias: &str, var: &str) {
        grow_stack(|| match &mut self.kind {
            TermKind::Var(_) => {}
            TermKind::Abs(_, body) => body.alias_to_var(alias, var),
            TermKind::App { left, right, .. } => {
                left.alias_to_var(alias, var);
                right.alias_to_var(alias, var);
            }
            TermKind::Alias(name) => {
                if name.as_str() == alias {
                    *self = Term::var(var);
                }
            }
        })
    }

    /// Replaces every reference to `alias` with a copy of `with`, which must be closed.
    pub fn replace_alias(&mut self, alias: &str, with: &Term, pool: &mut TermPool) {
        grow_stack(|| match &mut self.kind {
            TermKind::Var(_) => {}
            TermKind::Abs(_, body) => body.replace_alias(alias, with, pool),
            TermKind::App { left, right, .. } => {
                left.replace_alias(alias, with, pool);
                right.replace_alias(alias, with, pool);
            }
            TermKind::Alias(name) => {
                if name.as_str() == alias {
                    *self = pool.clone_term(with);
                }
            }
        })
    }
}
