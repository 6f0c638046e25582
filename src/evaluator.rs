// src/evaluator.rs

use tracing::warn;

use crate::ast::{grow_stack, Term, TermKind};
use crate::declarations::Declarations;
use crate::error::EvalError;
use crate::freevars::fresh_variable;
use crate::memory::TermPool;

/// Outcome of a single call to [`Term::reduce_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Reduced,
    NoRedex,
}

// --- Substitution ---

/// Source of the term placed at each substituted occurrence.
enum Replacement<'r> {
    /// Every occurrence receives a fresh copy.
    Shared(&'r Term),
    /// Copies for all but the last occurrence, which takes the term itself.
    Owned { term: Option<Term>, remaining: usize },
}

impl Replacement<'_> {
    fn term(&self) -> Option<&Term> {
        match self {
            Replacement::Shared(term) => Some(*term),
            Replacement::Owned { term, .. } => term.as_ref(),
        }
    }

    fn exhausted(&self) -> bool {
        matches!(self, Replacement::Owned { remaining: 0, .. })
    }

    fn instance(&mut self, pool: &mut TermPool) -> Result<Term, EvalError> {
        match self {
            Replacement::Shared(term) => Ok(pool.clone_term(term)),
            Replacement::Owned { term, remaining } => {
                *remaining = remaining.saturating_sub(1);
                let instance = if *remaining == 0 {
                    term.take()
                } else {
                    term.as_ref().map(|t| pool.clone_term(t))
                };
                instance.ok_or_else(|| EvalError::Internal("substitution outran its occurrence count".to_string()))
            }
        }
    }
}

fn substitute_in(
    target: &mut Term,
    var: &str,
    with: &mut Replacement<'_>,
    pool: &mut TermPool,
) -> Result<bool, EvalError> {
    // nothing can be substituted in closed terms
    if target.closed || with.exhausted() {
        return Ok(false);
    }
    grow_stack(|| substitute_node(target, var, with, pool))
}

fn substitute_node(
    target: &mut Term,
    var: &str,
    with: &mut Replacement<'_>,
    pool: &mut TermPool,
) -> Result<bool, EvalError> {
    match &mut target.kind {
        TermKind::Var(name) => {
            if name.as_str() != var {
                return Ok(false);
            }
            *target = with.instance(pool)?;
            Ok(true)
        }

        TermKind::App { left, right, .. } => {
            let found_left = substitute_in(left, var, with, pool)?;
            let found_right = substitute_in(right, var, with, pool)?;
            target.closed = left.closed && right.closed;
            Ok(found_left || found_right)
        }

        TermKind::Abs(param, body) => {
            if param.as_str() == var {
                return Ok(false);
            }

            // The bound name must be renamed when it is free in the replacement,
            // unless `var` does not occur in the body anyway.
            let fresh = match with.term() {
                Some(replacement)
                    if !replacement.closed
                        && !body.closed
                        && replacement.is_free_var(param)
                        && body.is_free_var(var) =>
                {
                    Some(fresh_variable(replacement, body))
                }
                _ => None,
            };
            if let Some(fresh) = fresh {
                let renamed = Term::var(fresh.clone());
                substitute_in(body, param, &mut Replacement::Shared(&renamed), pool)?;
                *param = fresh;
            }

            let found = substitute_in(body, var, with, pool)?;
            target.closed = body.closed;
            Ok(found)
        }

        TermKind::Alias(name) => Err(EvalError::Internal(format!(
            "substitution reached alias {}, aliases must be closed",
            name
        ))),
    }
}

impl Term {
    /// Replaces every free occurrence of `var` with a copy of `replacement`,
    /// renaming binders that would capture its free variables.
    /// Returns whether any occurrence was found.
    pub fn substitute(&mut self, var: &str, replacement: &Term, pool: &mut TermPool) -> Result<bool, EvalError> {
        substitute_in(self, var, &mut Replacement::Shared(replacement), pool)
    }

    /// Like [`Term::substitute`], but consumes `replacement`: earlier occurrences
    /// receive copies and the last one takes the term itself. An unused
    /// replacement goes back to the pool.
    pub fn substitute_owned(&mut self, var: &str, replacement: Term, pool: &mut TermPool) -> Result<bool, EvalError> {
        let occurrences = self.free_occurrences(var);
        if occurrences == 0 {
            pool.discard(replacement);
            return Ok(false);
        }
        let mut with = Replacement::Owned { term: Some(replacement), remaining: occurrences };
        let found = substitute_in(self, var, &mut with, pool)?;
        if let Replacement::Owned { term: Some(leftover), .. } = with {
            pool.discard(leftover);
        }
        Ok(found)
    }

    // --- Reduction ---

    /// Performs the leftmost-outermost reduction, preferring eta over beta at
    /// an abstraction. Strict applications reduce their argument first.
    pub fn reduce_step(&mut self, decls: &Declarations, pool: &mut TermPool) -> Result<Step, EvalError> {
        grow_stack(|| self.reduce_node(decls, pool))
    }

    fn reduce_node(&mut self, decls: &Declarations, pool: &mut TermPool) -> Result<Step, EvalError> {
        match &mut self.kind {
            TermKind::Var(_) => Ok(Step::NoRedex),

            TermKind::Abs(param, body) => {
                if is_eta_redex(param, body) {
                    self.eta_reduce(pool)?;
                    return Ok(Step::Reduced);
                }
                body.reduce_step(decls, pool)
            }

            TermKind::App { left, right, strict, .. } => {
                // the head may expand to another alias
                while matches!(left.kind, TermKind::Alias(_)) {
                    left.expand_alias(decls, pool)?;
                }

                if !left.is_abs() {
                    return match left.reduce_step(decls, pool)? {
                        Step::NoRedex => right.reduce_step(decls, pool),
                        reduced => Ok(reduced),
                    };
                }

                if *strict && right.reduce_step(decls, pool)? == Step::Reduced {
                    return Ok(Step::Reduced);
                }

                self.beta_reduce(pool)?;
                Ok(Step::Reduced)
            }

            TermKind::Alias(_) => {
                self.expand_alias(decls, pool)?;
                self.reduce_step(decls, pool)
            }
        }
    }

    /// Replaces an alias node with a fresh copy of its definition. Other nodes
    /// are left alone.
    pub fn expand_alias(&mut self, decls: &Declarations, pool: &mut TermPool) -> Result<(), EvalError> {
        let TermKind::Alias(name) = &self.kind else {
            return Ok(());
        };
        match decls.instantiate(name, pool) {
            Some(definition) => {
                *self = definition;
                Ok(())
            }
            None => {
                warn!(alias = %name, "expansion of undeclared alias");
                Err(EvalError::UndeclaredAlias(name.clone()))
            }
        }
    }

    // (\x.M) N -> M[x:=N]
    fn beta_reduce(&mut self, pool: &mut TermPool) -> Result<(), EvalError> {
        let was_closed = self.closed;
        let TermKind::App { left, right, .. } = self.take().into_kind() else {
            return Err(EvalError::Internal("beta reduction outside an application".to_string()));
        };
        let TermKind::Abs(param, body) = pool.unbox(left).into_kind() else {
            return Err(EvalError::Internal("beta reduction without an abstraction".to_string()));
        };
        let mut body = pool.unbox(body);
        let argument = pool.unbox(right);
        body.substitute_owned(&param, argument, pool)?;

        // Beta reduction never introduces free variables, so a closed redex
        // stays closed; the body may also have become closed on its own.
        body.closed = body.closed || was_closed;
        *self = body;
        Ok(())
    }

    // \x.M x -> M
    fn eta_reduce(&mut self, pool: &mut TermPool) -> Result<(), EvalError> {
        let TermKind::Abs(_, body) = self.take().into_kind() else {
            return Err(EvalError::Internal("eta reduction outside an abstraction".to_string()));
        };
        let TermKind::App { left, right, .. } = pool.unbox(body).into_kind() else {
            return Err(EvalError::Internal("eta reduction without an application".to_string()));
        };
        pool.release(right);
        *self = pool.unbox(left);
        Ok(())
    }
}

fn is_eta_redex(param: &str, body: &Term) -> bool {
    match &body.kind {
        TermKind::App { left, right, .. } => {
            matches!(&right.kind, TermKind::Var(name) if name == param) && !left.is_free_var(param)
        }
        _ => false,
    }
}
