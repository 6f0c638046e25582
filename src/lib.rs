// src/lib.rs

// --- Module Declarations ---
pub mod ast;
pub mod cycles;
pub mod declarations;
pub mod error;
pub mod evaluator;
pub mod freevars;
pub mod memory;
pub mod operators;
pub mod parser;
pub mod readable;
pub mod session;

// --- Public API Re-exports ---
pub use ast::{Term, TermKind};
pub use cycles::{eliminate_cycle, find_largest_cycle};
pub use declarations::{Declaration, Declarations};
pub use error::{EvalError, ParseError, ParseErrorKind};
pub use evaluator::Step;
pub use memory::TermPool;
pub use operators::{Assoc, Operator, OperatorTable};
pub use parser::{parse, parse_statement, Statement};
pub use readable::DisplayOptions;
pub use session::{Outcome, Session, SessionConfig};
