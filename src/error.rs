// src/error.rs

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    /// An alias or operator has no declaration at expansion time.
    #[error("Alias {0} is not declared.")]
    UndeclaredAlias(String),
    /// A broken engine invariant. Callers must not continue with the affected terms.
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Definition of {name} is not closed (free variables: {free})")]
    OpenDefinition { name: String, free: String },
    #[error("Reduction stopped after {0} steps")]
    StepLimit(usize),
}

impl EvalError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvalError::Internal(_))
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Parse error at {line}:{col}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("Unexpected character: '{0}'")]
    UnexpectedChar(char),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),
    #[error("Unknown operator: '{0}'")]
    UnknownOperator(String),
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),
}
