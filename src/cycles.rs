// src/cycles.rs

use std::collections::HashMap;

use tracing::{debug, info};

use crate::ast::Term;
use crate::declarations::Declarations;
use crate::error::EvalError;
use crate::memory::TermPool;

/// Alias of the fixed-point combinator used to close recursive definitions.
pub const FIXED_POINT_COMBINATOR: &str = "Y";

/// Variable standing for the recursive definition itself. The parser never
/// produces names starting with an underscore. When the body already
/// mentions it (a member closed by an earlier elimination), a numbered
/// variant is used instead.
pub const SELF_VARIABLE: &str = "_self";

const SELECTOR_VARIABLE: &str = "s";

// --- Cycle Search ---

#[derive(Debug, Clone, Copy, PartialEq)]
enum Visit {
    OnStack,
    Finished,
}

struct CycleSearch<'d> {
    decls: &'d Declarations,
    state: HashMap<&'d str, Visit>,
    // DFS tree parent and stack depth of every node on the current path
    parent: HashMap<&'d str, &'d str>,
    depth: HashMap<&'d str, usize>,
    largest: Option<Vec<&'d str>>,
}

impl<'d> CycleSearch<'d> {
    fn visit(&mut self, node: &'d str, depth: usize) {
        self.state.insert(node, Visit::OnStack);
        self.depth.insert(node, depth);

        let decls = self.decls;
        let Some(decl) = decls.lookup(node) else {
            self.state.insert(node, Visit::Finished);
            return;
        };

        for dependency in decl.aliases.iter().map(String::as_str) {
            if !decls.contains(dependency) {
                continue;
            }
            match self.state.get(dependency).copied() {
                None => {
                    self.parent.insert(dependency, node);
                    self.visit(dependency, depth + 1);
                }
                Some(Visit::OnStack) => self.close_cycle(node, dependency, depth),
                Some(Visit::Finished) => {}
            }
        }

        self.state.insert(node, Visit::Finished);
    }

    // The edge `from -> to` reaches a node on the stack.
    fn close_cycle(&mut self, from: &'d str, to: &'d str, from_depth: usize) {
        let length = from_depth - self.depth.get(to).copied().unwrap_or(from_depth) + 1;
        if self.largest.as_ref().map_or(false, |best| best.len() >= length) {
            return;
        }

        let mut members = vec![from];
        let mut current = from;
        while current != to {
            match self.parent.get(current) {
                Some(&previous) => {
                    members.push(previous);
                    current = previous;
                }
                None => return,
            }
        }
        members.reverse();
        debug!(?members, "cycle found");
        self.largest = Some(members);
    }
}

/// Largest dependency cycle among the declarations, listed so that each
/// member references the next and the last references the first. Ties keep
/// the cycle found first.
pub fn find_largest_cycle(decls: &Declarations) -> Option<Vec<String>> {
    let mut search = CycleSearch {
        decls,
        state: HashMap::new(),
        parent: HashMap::new(),
        depth: HashMap::new(),
        largest: None,
    };
    for name in decls.names() {
        if !search.state.contains_key(name) {
            search.visit(name, 0);
        }
    }
    search
        .largest
        .map(|members| members.into_iter().map(str::to_string).collect())
}

// --- Cycle Elimination ---

/// Removes one cycle by closing it with the fixed-point combinator.
///
/// A single self-recursive declaration is wrapped directly. A larger cycle is
/// first merged into a tuple declaration named after the concatenation of its
/// members; each member becomes a projection out of that tuple and every
/// other declaration is rewritten to use the projections. Returns the name of
/// the declaration that now carries the recursion.
pub fn eliminate_cycle(decls: &mut Declarations, cycle: &[String], pool: &mut TermPool) -> Result<String, EvalError> {
    if !decls.contains(FIXED_POINT_COMBINATOR) {
        return Err(EvalError::UndeclaredAlias(FIXED_POINT_COMBINATOR.to_string()));
    }
    info!(members = ?cycle, "eliminating recursion");

    let recursive = match cycle {
        [] => return Err(EvalError::Internal("empty cycle".to_string())),
        [single] => {
            let body = decls
                .instantiate(single, pool)
                .ok_or_else(|| EvalError::UndeclaredAlias(single.clone()))?;
            close_recursion(decls, single, body, pool);
            single.clone()
        }
        members => {
            let name = members.concat();
            let mut tuple = tuple_term(members);
            decls.expand_aliases(&mut tuple, Some(members), pool)?;

            let projections: Vec<(String, Term)> = members
                .iter()
                .enumerate()
                .map(|(index, member)| (member.clone(), projection_term(&name, index, members.len())))
                .collect();
            for (member, projection) in &projections {
                decls.define(member.as_str(), projection.clone(), pool);
            }
            decls.rewrite_terms(|_, term| {
                for (member, projection) in &projections {
                    term.replace_alias(member, projection, pool);
                }
            });
            for (member, projection) in &projections {
                tuple.replace_alias(member, projection, pool);
            }

            close_recursion(decls, &name, tuple, pool);
            name
        }
    };

    decls.refresh_alias_references();
    Ok(recursive)
}

// name = Y (\self. body[name:=self])
fn close_recursion(decls: &mut Declarations, name: &str, mut body: Term, pool: &mut TermPool) {
    let self_variable = self_variable_for(&body);
    body.alias_to_var(name, &self_variable);
    let wrapped = Term::app(Term::alias(FIXED_POINT_COMBINATOR), Term::abs(self_variable, body));
    decls.define(name, wrapped, pool);
}

// Neither bound nor free in `body`, so no inner binder can capture it.
fn self_variable_for(body: &Term) -> String {
    std::iter::once(SELF_VARIABLE.to_string())
        .chain((1usize..).map(|n| format!("{}{}", SELF_VARIABLE, n)))
        .find(|name| !body.mentions_variable(name))
        .unwrap_or_default()
}

/// `\s. s M0 M1 ... Mk-1` over alias references to the members.
fn tuple_term(members: &[String]) -> Term {
    let body = members
        .iter()
        .fold(Term::var(SELECTOR_VARIABLE), |acc, member| Term::app(acc, Term::alias(member.as_str())));
    Term::abs(SELECTOR_VARIABLE, body)
}

/// `Tuple (\x0.\x1. ... \x{size-1}. x{index})`
fn projection_term(tuple: &str, index: usize, size: usize) -> Term {
    let selector = (0..size)
        .rev()
        .fold(Term::var(format!("x{}", index)), |body, i| Term::abs(format!("x{}", i), body));
    let mut projection = Term::app(Term::alias(tuple), selector);
    projection.set_closed_flag();
    projection
}
