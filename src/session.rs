// src/session.rs

//! Interpreter state shared by the script runner and the REPL.

use tracing::{debug, info, warn};

use crate::ast::Term;
use crate::cycles::{eliminate_cycle, find_largest_cycle};
use crate::declarations::Declarations;
use crate::error::EvalError;
use crate::evaluator::Step;
use crate::memory::TermPool;
use crate::operators::{Operator, OperatorTable};
use crate::parser::{self, Statement};
use crate::readable::DisplayOptions;

/// Definitions loaded into every session unless disabled.
pub const PRELUDE_SRC: &str = include_str!("prelude.lc");

/// Reduction cap used when none is configured.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub display: DisplayOptions,
    /// `None` lets a diverging term run forever.
    pub step_limit: Option<usize>,
    pub load_prelude: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            display: DisplayOptions::default(),
            step_limit: Some(DEFAULT_STEP_LIMIT),
            load_prelude: true,
        }
    }
}

/// What executing one statement produced.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Blank or comment-only input.
    Empty,
    /// `name` was stored; `recursive` lists the declarations that had
    /// recursion eliminated as a consequence.
    Defined { name: String, recursive: Vec<String> },
    OperatorDeclared { token: String, operator: Operator },
    Normalized { term: Term, steps: usize },
}

pub struct Session {
    declarations: Declarations,
    operators: OperatorTable,
    pool: TermPool,
    config: SessionConfig,
}

impl Session {
    /// A session with the default operators, and the prelude if configured.
    pub fn new(config: SessionConfig) -> Result<Self, EvalError> {
        let load_prelude = config.load_prelude;
        let mut session = Session {
            declarations: Declarations::new(),
            operators: OperatorTable::with_defaults(),
            pool: TermPool::new(),
            config,
        };
        if load_prelude {
            session.load(PRELUDE_SRC)?;
            info!(declarations = session.declarations.len(), "prelude loaded");
        }
        Ok(session)
    }

    pub fn with_prelude() -> Result<Self, EvalError> {
        Self::new(SessionConfig::default())
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    pub fn pool(&self) -> &TermPool {
        &self.pool
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    /// Runs every statement of `source`, one per line, stopping at the first
    /// error. Parse errors report the line within `source`.
    pub fn load(&mut self, source: &str) -> Result<Vec<Outcome>, EvalError> {
        let mut outcomes = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let outcome = self.execute(line).map_err(|e| match e {
                EvalError::Parse(mut error) => {
                    error.line += index;
                    EvalError::Parse(error)
                }
                other => other,
            })?;
            if outcome != Outcome::Empty {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    pub fn execute(&mut self, line: &str) -> Result<Outcome, EvalError> {
        self.execute_traced(line, |_, _| {})
    }

    /// Like [`Session::execute`], calling `observe` with each intermediate
    /// term of a normalization.
    pub fn execute_traced(&mut self, line: &str, observe: impl FnMut(usize, &Term)) -> Result<Outcome, EvalError> {
        let Some(statement) = parser::parse_statement(line, &self.operators)? else {
            return Ok(Outcome::Empty);
        };

        match statement {
            Statement::Definition { name, term } => {
                let recursive = self.define(&name, term)?;
                Ok(Outcome::Defined { name, recursive })
            }
            Statement::OperatorDeclaration { token, operator } => {
                self.operators.declare(token.clone(), operator);
                Ok(Outcome::OperatorDeclared { token, operator })
            }
            Statement::Evaluation(term) => {
                let (term, steps) = self.normalize_traced(term, observe)?;
                Ok(Outcome::Normalized { term, steps })
            }
        }
    }

    /// Parses a term with the session's operators and desugars it.
    pub fn parse_term(&mut self, input: &str) -> Result<Term, EvalError> {
        let mut term = parser::parse(input, &self.operators)?;
        self.prepare(&mut term);
        Ok(term)
    }

    fn prepare(&mut self, term: &mut Term) {
        term.desugar_operators(&mut self.pool);
        term.set_closed_flag();
    }

    /// Stores a closed definition and removes any recursion it completes.
    /// Returns the declarations that now carry eliminated recursion.
    ///
    /// If the recursion cannot be eliminated the store is left exactly as it
    /// was before the call.
    pub fn define(&mut self, name: &str, mut term: Term) -> Result<Vec<String>, EvalError> {
        term.desugar_operators(&mut self.pool);
        let free = term.free_variables();
        if !free.is_empty() {
            self.pool.discard(term);
            let free: Vec<&str> = free.iter().map(String::as_str).collect();
            return Err(EvalError::OpenDefinition { name: name.to_string(), free: free.join(", ") });
        }

        let previous = self.declarations.lookup(name).map(|decl| decl.term.clone());
        self.declarations.define(name, term, &mut self.pool);
        if find_largest_cycle(&self.declarations).is_none() {
            return Ok(Vec::new());
        }

        // Elimination rewrites other declarations too; on failure the whole
        // store goes back to its state before this definition.
        let mut before = self.declarations.clone();
        match previous {
            Some(term) => before.define(name, term, &mut self.pool),
            None => {
                before.remove(name, &mut self.pool);
            }
        }

        match self.eliminate_cycles() {
            Ok(recursive) => Ok(recursive),
            Err(e) => {
                warn!(%name, error = %e, "recursion elimination failed, definition rolled back");
                self.declarations = before;
                Err(e)
            }
        }
    }

    /// Eliminates dependency cycles, largest first, until none are left.
    pub fn eliminate_cycles(&mut self) -> Result<Vec<String>, EvalError> {
        let mut recursive = Vec::new();
        while let Some(cycle) = find_largest_cycle(&self.declarations) {
            let name = eliminate_cycle(&mut self.declarations, &cycle, &mut self.pool)?;
            recursive.push(name);
        }
        Ok(recursive)
    }

    pub fn normalize(&mut self, term: Term) -> Result<(Term, usize), EvalError> {
        self.normalize_traced(term, |_, _| {})
    }

    /// Reduces `term` to normal form, returning it with the number of steps
    /// taken. Fails with [`EvalError::StepLimit`] when the configured cap is
    /// reached first. The pool is collected afterwards either way.
    pub fn normalize_traced(
        &mut self,
        mut term: Term,
        mut observe: impl FnMut(usize, &Term),
    ) -> Result<(Term, usize), EvalError> {
        self.prepare(&mut term);
        let limit = self.config.step_limit;

        let mut steps = 0;
        let result = loop {
            if limit.map_or(false, |limit| steps >= limit) {
                break Err(EvalError::StepLimit(steps));
            }
            match term.reduce_step(&self.declarations, &mut self.pool) {
                Ok(Step::Reduced) => {
                    steps += 1;
                    observe(steps, &term);
                }
                Ok(Step::NoRedex) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        debug!(steps, size = term.size(), "normalization finished");
        let result = match result {
            Ok(()) => Ok((term, steps)),
            Err(e) => {
                self.pool.discard(term);
                Err(e)
            }
        };
        self.pool.collect();
        result
    }

    /// Evaluates a single term given as source text.
    pub fn evaluate(&mut self, input: &str) -> Result<(Term, usize), EvalError> {
        let term = self.parse_term(input)?;
        self.normalize(term)
    }

    pub fn render(&self, term: &Term) -> String {
        term.render(&self.config.display)
    }
}
